//! WebSocket client for the bot process channel

use super::connection::{self, ChannelOptions, ChannelStream};
use super::pending::PendingCallRegistry;
use super::BotChannel;
use crate::error::{BridgeError, Result};
use crate::models::{Configuration, Envelope};
use async_trait::async_trait;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_util::sync::CancellationToken;
use url::Url;
use uuid::Uuid;

/// A frame waiting for the connection. Call frames carry their call id so
/// they can be dropped once the call has ended.
#[derive(Debug)]
struct Outbound {
    call_id: Option<Uuid>,
    text: String,
}

impl Outbound {
    fn is_stale(&self, pending: &PendingCallRegistry) -> bool {
        self.call_id.map_or(false, |id| !pending.is_pending(&id))
    }
}

/// Client side of the shared bot channel.
///
/// The connection is opened on first use by a background task that keeps it
/// alive, reconnecting after `reconnect_interval` whenever it drops. All calls
/// share that one connection; responses are matched to calls by id. Frames
/// of calls that ended (timeout, dropped future) before the bot was reachable
/// are discarded, never sent late.
pub struct ChannelClient {
    url: Url,
    options: ChannelOptions,
    pending: PendingCallRegistry,
    outbound: OnceLock<mpsc::UnboundedSender<Outbound>>,
    /// Frames handed to the supervisor so far
    queued: AtomicU64,
    /// Frames the supervisor has written or discarded so far
    flushed: Arc<watch::Sender<u64>>,
    cancel: CancellationToken,
}

impl ChannelClient {
    pub fn new(url: &str, options: ChannelOptions) -> Result<Self> {
        let url = connection::parse_channel_url(url)
            .map_err(|e| BridgeError::Transport(format!("{:#}", e)))?;
        Ok(Self {
            url,
            options,
            pending: PendingCallRegistry::new(),
            outbound: OnceLock::new(),
            queued: AtomicU64::new(0),
            flushed: Arc::new(watch::channel(0).0),
            cancel: CancellationToken::new(),
        })
    }

    pub fn from_config(config: &Configuration) -> Result<Self> {
        Self::new(
            &config.channel_url,
            ChannelOptions {
                reconnect_interval: config.reconnect_interval(),
            },
        )
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Number of calls currently waiting for a response
    pub fn pending_calls(&self) -> usize {
        self.pending.len()
    }

    /// Stop the connection task. Waiting calls fail with `Closed`.
    pub fn shutdown(&self) {
        self.cancel.cancel();
        self.pending.close_all();
    }

    pub fn is_shut_down(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Wait until every frame queued so far has been written to the socket
    /// or discarded as stale. Fails with `Timeout` after `limit`.
    pub async fn flush(&self, limit: Duration) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(BridgeError::Closed);
        }
        if self.outbound.get().is_none() {
            return Ok(());
        }

        let target = self.queued.load(Ordering::SeqCst);
        let mut progress = self.flushed.subscribe();
        let waited = tokio::time::timeout(limit, progress.wait_for(|done| *done >= target))
            .await
            .map(|reached| reached.is_ok());
        match waited {
            Ok(true) => Ok(()),
            Ok(false) => Err(BridgeError::Closed),
            Err(_) => {
                let done = *self.flushed.borrow();
                tracing::warn!(url = %self.url, pending_frames = target.saturating_sub(done), "Flush timed out");
                Err(BridgeError::Timeout)
            }
        }
    }

    fn sender(&self) -> Result<mpsc::UnboundedSender<Outbound>> {
        if self.cancel.is_cancelled() {
            return Err(BridgeError::Closed);
        }
        if let Some(tx) = self.outbound.get() {
            return Ok(tx.clone());
        }

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| BridgeError::Transport("no async runtime available".to_string()))?;
        let tx = self.outbound.get_or_init(|| {
            let (tx, rx) = mpsc::unbounded_channel();
            runtime.spawn(supervise(
                self.url.clone(),
                self.options.clone(),
                rx,
                self.pending.clone(),
                Arc::clone(&self.flushed),
                self.cancel.clone(),
            ));
            tx
        });
        Ok(tx.clone())
    }

    fn enqueue(&self, envelope: &Envelope) -> Result<()> {
        let frame = Outbound {
            call_id: envelope.id,
            text: serde_json::to_string(envelope)?,
        };
        let tx = self.sender()?;
        self.queued.fetch_add(1, Ordering::SeqCst);
        tx.send(frame).map_err(|_| {
            self.queued.fetch_sub(1, Ordering::SeqCst);
            BridgeError::Closed
        })
    }
}

impl Drop for ChannelClient {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[async_trait]
impl BotChannel for ChannelClient {
    async fn call(&self, kind: &str, payload: Value, timeout: Option<Duration>) -> Result<Value> {
        let (id, rx, _registration) = self.pending.register(kind);
        self.enqueue(&Envelope::request(kind, id, payload))?;
        tracing::debug!(kind = kind, id = %id, "Channel call sent");

        let response = match timeout {
            Some(limit) => match tokio::time::timeout(limit, rx).await {
                Ok(response) => response,
                Err(_) => {
                    tracing::warn!(kind = kind, id = %id, timeout_ms = limit.as_millis() as u64, "Channel call timed out");
                    return Err(BridgeError::Timeout);
                }
            },
            None => rx.await,
        };
        response.map_err(|_| BridgeError::Closed)
    }

    fn notify(&self, kind: &str, payload: Value) -> Result<()> {
        self.enqueue(&Envelope::notification(kind, payload))?;
        tracing::debug!(kind = kind, "Channel notification queued");
        Ok(())
    }
}

enum SessionEnd {
    Disconnected,
    Stopped,
}

/// Connection supervisor: connect, pump frames, reconnect until cancelled.
async fn supervise(
    url: Url,
    options: ChannelOptions,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
    pending: PendingCallRegistry,
    flushed: Arc<watch::Sender<u64>>,
    cancel: CancellationToken,
) {
    // Frames taken off the queue but not yet written, oldest first
    let mut backlog: VecDeque<Outbound> = VecDeque::new();

    loop {
        let attempt = tokio::select! {
            _ = cancel.cancelled() => break,
            attempt = connection::connect(&url) => attempt,
        };

        match attempt {
            Ok(stream) => {
                tracing::info!(url = %url, "Connected to bot channel");
                let mut session = Session {
                    outbound: &mut outbound,
                    backlog: &mut backlog,
                    pending: &pending,
                    flushed: &flushed,
                };
                match session.pump(stream, &cancel).await {
                    SessionEnd::Stopped => break,
                    SessionEnd::Disconnected => {
                        tracing::warn!(url = %url, "Bot channel disconnected");
                    }
                }
            }
            Err(e) => {
                tracing::debug!(url = %url, error = %format!("{:#}", e), "Bot channel unavailable");
            }
        }

        prune_backlog(&mut outbound, &mut backlog, &pending, &flushed);

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(options.reconnect_interval) => {}
        }
    }

    pending.close_all();
    tracing::debug!(url = %url, "Bot channel supervisor stopped");
}

/// While disconnected, move queued frames into the backlog and discard the
/// ones whose call already ended, so dead calls do not pile up.
fn prune_backlog(
    outbound: &mut mpsc::UnboundedReceiver<Outbound>,
    backlog: &mut VecDeque<Outbound>,
    pending: &PendingCallRegistry,
    flushed: &watch::Sender<u64>,
) {
    while let Ok(frame) = outbound.try_recv() {
        backlog.push_back(frame);
    }
    let before = backlog.len();
    backlog.retain(|frame| !frame.is_stale(pending));
    let dropped = (before - backlog.len()) as u64;
    if dropped > 0 {
        tracing::debug!(dropped = dropped, "Discarded frames of finished calls");
        flushed.send_modify(|done| *done += dropped);
    }
}

type ChannelSink = SplitSink<ChannelStream, WsMessage>;

struct Session<'a> {
    outbound: &'a mut mpsc::UnboundedReceiver<Outbound>,
    backlog: &'a mut VecDeque<Outbound>,
    pending: &'a PendingCallRegistry,
    flushed: &'a watch::Sender<u64>,
}

impl Session<'_> {
    async fn pump(&mut self, stream: ChannelStream, cancel: &CancellationToken) -> SessionEnd {
        let (mut sink, mut source) = stream.split();

        while let Some(frame) = self.backlog.pop_front() {
            if let Err(frame) = deliver(&mut sink, frame, self.pending, self.flushed).await {
                self.backlog.push_front(frame);
                return SessionEnd::Disconnected;
            }
        }

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    let _ = sink.close().await;
                    return SessionEnd::Stopped;
                }
                frame = self.outbound.recv() => {
                    let Some(frame) = frame else {
                        let _ = sink.close().await;
                        return SessionEnd::Stopped;
                    };
                    if let Err(frame) = deliver(&mut sink, frame, self.pending, self.flushed).await {
                        self.backlog.push_front(frame);
                        return SessionEnd::Disconnected;
                    }
                }
                inbound = source.next() => match inbound {
                    Some(Ok(WsMessage::Text(text))) => dispatch_inbound(&text, self.pending),
                    Some(Ok(WsMessage::Close(_))) | None => return SessionEnd::Disconnected,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::debug!(error = %e, "Receive on bot channel failed");
                        return SessionEnd::Disconnected;
                    }
                },
            }
        }
    }
}

/// Write one frame, or discard it when its call has ended. Hands the frame
/// back when the socket fails so it can go out on the next connection.
async fn deliver(
    sink: &mut ChannelSink,
    frame: Outbound,
    pending: &PendingCallRegistry,
    flushed: &watch::Sender<u64>,
) -> std::result::Result<(), Outbound> {
    if frame.is_stale(pending) {
        tracing::debug!(call_id = ?frame.call_id, "Discarded frame of finished call");
        flushed.send_modify(|done| *done += 1);
        return Ok(());
    }

    match sink.send(WsMessage::Text(frame.text.clone())).await {
        Ok(()) => {
            flushed.send_modify(|done| *done += 1);
            Ok(())
        }
        Err(e) => {
            tracing::debug!(error = %e, "Send on bot channel failed");
            Err(frame)
        }
    }
}

fn dispatch_inbound(text: &str, pending: &PendingCallRegistry) {
    match serde_json::from_str::<Envelope>(text) {
        Ok(envelope) => {
            let kind = envelope.kind.clone();
            if !pending.resolve(envelope) {
                tracing::debug!(kind = %kind, "Unmatched frame from bot channel");
            }
        }
        Err(e) => tracing::warn!(error = %e, "Malformed frame from bot channel"),
    }
}
