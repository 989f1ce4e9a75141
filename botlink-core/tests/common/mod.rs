//! Shared fixtures: an in-process WebSocket bot, a scripted in-memory channel
//! and a chat message that records its edits.

#![allow(dead_code)]

use async_trait::async_trait;
use botlink_core::models::Envelope;
use botlink_core::polling::ChatMessage;
use botlink_core::transport::BotChannel;
use botlink_core::{BridgeError, Result};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::{accept_async, tungstenite::Message as WsMessage};

// --- WebSocket bot ---

/// How the bot answers one request.
pub struct Reply {
    pub data: Value,
    pub delay: Duration,
    /// Echo the request id; false mimics a bot that only echoes the type.
    pub echo_id: bool,
}

impl Reply {
    pub fn now(data: Value) -> Self {
        Self {
            data,
            delay: Duration::ZERO,
            echo_id: true,
        }
    }

    pub fn after(data: Value, delay: Duration) -> Self {
        Self {
            data,
            delay,
            echo_id: true,
        }
    }

    pub fn without_id(data: Value) -> Self {
        Self {
            data,
            delay: Duration::ZERO,
            echo_id: false,
        }
    }
}

pub type Responder = Arc<dyn Fn(&Envelope) -> Option<Reply> + Send + Sync>;

pub struct MockBot {
    pub addr: SocketAddr,
    frames: mpsc::UnboundedReceiver<Envelope>,
    handle: tokio::task::JoinHandle<()>,
}

impl MockBot {
    pub async fn start(responder: Responder) -> MockBot {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind mock bot");
        Self::serve(listener, responder)
    }

    pub async fn start_on(addr: SocketAddr, responder: Responder) -> MockBot {
        let listener = TcpListener::bind(addr)
            .await
            .expect("failed to bind mock bot on fixed address");
        Self::serve(listener, responder)
    }

    fn serve(listener: TcpListener, responder: Responder) -> MockBot {
        let addr = listener.local_addr().expect("listener address");
        let (frames_tx, frames) = mpsc::unbounded_channel();

        let handle = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let responder = Arc::clone(&responder);
                let frames_tx = frames_tx.clone();
                tokio::spawn(async move {
                    let Ok(ws) = accept_async(stream).await else {
                        return;
                    };
                    let (mut sink, mut source) = ws.split();
                    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();

                    let writer = tokio::spawn(async move {
                        while let Some(text) = out_rx.recv().await {
                            if sink.send(WsMessage::Text(text)).await.is_err() {
                                break;
                            }
                        }
                    });

                    while let Some(Ok(frame)) = source.next().await {
                        let WsMessage::Text(text) = frame else {
                            continue;
                        };
                        let envelope: Envelope =
                            serde_json::from_str(&text).expect("client sent malformed frame");
                        let _ = frames_tx.send(envelope.clone());

                        if let Some(reply) = responder(&envelope) {
                            let out_tx = out_tx.clone();
                            tokio::spawn(async move {
                                tokio::time::sleep(reply.delay).await;
                                let mut response = envelope.reply(reply.data);
                                if !reply.echo_id {
                                    response.id = None;
                                }
                                let text = serde_json::to_string(&response).expect("serialize reply");
                                let _ = out_tx.send(text);
                            });
                        }
                    }
                    writer.abort();
                });
            }
        });

        MockBot {
            addr,
            frames,
            handle,
        }
    }

    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Next frame the bot received from the client.
    pub async fn next_frame(&mut self) -> Envelope {
        tokio::time::timeout(Duration::from_secs(5), self.frames.recv())
            .await
            .expect("no frame received by mock bot")
            .expect("mock bot stopped")
    }

    pub fn stop(self) {
        self.handle.abort();
    }
}

/// Bot answering each type with a fixed value, ignoring unknown types.
pub fn answers(table: &[(&str, Value)]) -> Responder {
    let table: HashMap<String, Value> = table
        .iter()
        .map(|(kind, value)| (kind.to_string(), value.clone()))
        .collect();
    Arc::new(move |envelope: &Envelope| table.get(&envelope.kind).cloned().map(Reply::now))
}

// --- in-memory channel ---

/// `BotChannel` answering from a table. Types without an answer never
/// respond, so calls run into their timeout.
#[derive(Default)]
pub struct ScriptedChannel {
    answers: Mutex<HashMap<String, Value>>,
    calls: Mutex<Vec<(String, Value)>>,
    notifications: Mutex<Vec<(String, Value)>>,
    call_count: AtomicUsize,
}

impl ScriptedChannel {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_answers(table: &[(&str, Value)]) -> Arc<Self> {
        let channel = Self::default();
        for (kind, value) in table {
            channel.answer(kind, value.clone());
        }
        Arc::new(channel)
    }

    pub fn answer(&self, kind: &str, value: Value) {
        self.answers
            .lock()
            .unwrap()
            .insert(kind.to_string(), value);
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn notifications(&self) -> Vec<(String, Value)> {
        self.notifications.lock().unwrap().clone()
    }
}

#[async_trait]
impl BotChannel for ScriptedChannel {
    async fn call(&self, kind: &str, payload: Value, timeout: Option<Duration>) -> Result<Value> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.calls
            .lock()
            .unwrap()
            .push((kind.to_string(), payload));

        let answer = self.answers.lock().unwrap().get(kind).cloned();
        match (answer, timeout) {
            (Some(value), _) => Ok(value),
            (None, Some(limit)) => {
                tokio::time::sleep(limit).await;
                Err(BridgeError::Timeout)
            }
            (None, None) => std::future::pending().await,
        }
    }

    fn notify(&self, kind: &str, payload: Value) -> Result<()> {
        self.notifications
            .lock()
            .unwrap()
            .push((kind.to_string(), payload));
        Ok(())
    }
}

// --- chat message ---

#[derive(Default)]
pub struct RecordingMessage {
    edits: Mutex<Vec<String>>,
    notices: Mutex<Vec<String>>,
    fail_edits: AtomicBool,
}

impl RecordingMessage {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        let message = Self::default();
        message.fail_edits.store(true, Ordering::SeqCst);
        Arc::new(message)
    }

    pub fn edits(&self) -> Vec<String> {
        self.edits.lock().unwrap().clone()
    }

    pub fn notices(&self) -> Vec<String> {
        self.notices.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatMessage for RecordingMessage {
    async fn edit(&self, content: &str) -> Result<()> {
        self.edits.lock().unwrap().push(content.to_string());
        if self.fail_edits.load(Ordering::SeqCst) {
            return Err(BridgeError::Transport("message was deleted".into()));
        }
        Ok(())
    }

    async fn send_to_channel(&self, content: &str) -> Result<()> {
        self.notices.lock().unwrap().push(content.to_string());
        Ok(())
    }
}
