//! WebSocket connection utilities

use anyhow::{Context, Result};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use url::Url;

pub type ChannelStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Default delay between reconnect attempts to the bot channel
pub const DEFAULT_RECONNECT_INTERVAL: Duration = Duration::from_millis(1500);

/// Bot channel connection options
#[derive(Debug, Clone)]
pub struct ChannelOptions {
    pub reconnect_interval: Duration,
}

impl Default for ChannelOptions {
    fn default() -> Self {
        Self {
            reconnect_interval: DEFAULT_RECONNECT_INTERVAL,
        }
    }
}

/// Open one WebSocket connection to the bot channel
pub async fn connect(url: &Url) -> Result<ChannelStream> {
    let (stream, _) = connect_async(url.as_str())
        .await
        .with_context(|| format!("Failed to connect to bot channel at {}", url))?;
    Ok(stream)
}

/// Parse and validate a bot channel URL
pub fn parse_channel_url(url_str: &str) -> Result<Url> {
    let trimmed = url_str.trim();

    if trimmed.is_empty() {
        return Err(anyhow::anyhow!("URL cannot be empty"));
    }

    let url = Url::parse(trimmed).with_context(|| format!("Invalid URL format: {}", trimmed))?;

    match url.scheme() {
        "ws" | "wss" => Ok(url),
        other => Err(anyhow::anyhow!(
            "Unsupported channel scheme '{}', expected ws or wss",
            other
        )),
    }
}
