//! Pending call registry: match bot responses to waiting calls

use crate::models::Envelope;
use dashmap::DashMap;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::oneshot;
use uuid::Uuid;

#[derive(Debug)]
struct PendingCall {
    kind: String,
    seq: u64,
    tx: oneshot::Sender<Value>,
}

/// In-memory registry of calls awaiting a response. Match by id, or by the
/// oldest call of the same type when the response carries no id.
#[derive(Clone, Default)]
pub struct PendingCallRegistry {
    inner: Arc<DashMap<Uuid, PendingCall>>,
    next_seq: Arc<AtomicU64>,
}

/// Removes its registry entry when dropped, whichever way the call ended.
#[must_use = "dropping the guard deregisters the call immediately"]
pub struct PendingGuard {
    id: Uuid,
    inner: Arc<DashMap<Uuid, PendingCall>>,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.inner.remove(&self.id);
    }
}

impl PendingCallRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a call of the given type. Returns its correlation id, the
    /// receiver for the response and the guard owning the registration.
    pub fn register(&self, kind: &str) -> (Uuid, oneshot::Receiver<Value>, PendingGuard) {
        let id = Uuid::new_v4();
        let (tx, rx) = oneshot::channel();
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        self.inner.insert(
            id,
            PendingCall {
                kind: kind.to_string(),
                seq,
                tx,
            },
        );
        let guard = PendingGuard {
            id,
            inner: Arc::clone(&self.inner),
        };
        (id, rx, guard)
    }

    /// Deliver an inbound envelope. Returns true if a waiting call took it.
    pub fn resolve(&self, envelope: Envelope) -> bool {
        let Envelope { kind, id, data } = envelope;
        match id {
            Some(id) => self.complete(&id, data).is_ok(),
            None => {
                let mut data = data;
                // The oldest entry may vanish between lookup and removal; retry with the next one.
                while let Some(oldest) = self.oldest_of_kind(&kind) {
                    match self.complete(&oldest, data) {
                        Ok(()) => return true,
                        Err(returned) => data = returned,
                    }
                }
                false
            }
        }
    }

    fn complete(&self, id: &Uuid, data: Value) -> Result<(), Value> {
        match self.inner.remove(id) {
            Some((_, call)) => call.tx.send(data),
            None => Err(data),
        }
    }

    fn oldest_of_kind(&self, kind: &str) -> Option<Uuid> {
        self.inner
            .iter()
            .filter(|entry| entry.value().kind == kind)
            .min_by_key(|entry| entry.value().seq)
            .map(|entry| *entry.key())
    }

    /// Drop every pending call; their receivers observe a closed channel.
    pub fn close_all(&self) {
        self.inner.clear();
    }

    /// Whether the call with this id is still waiting for its response.
    pub fn is_pending(&self, id: &Uuid) -> bool {
        self.inner.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
