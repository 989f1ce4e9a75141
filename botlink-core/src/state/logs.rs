//! Bounded log buffer with FIFO eviction

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

/// Maximum number of log lines kept in memory
pub const MAX_LOG_LINES: usize = 100;

/// Ordered, bounded sequence of log lines. Oldest lines are dropped first.
pub struct LogBuffer {
    lines: RwLock<VecDeque<String>>,
    capacity: usize,
    eviction_count: AtomicU64,
}

impl LogBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: RwLock::new(VecDeque::with_capacity(capacity)),
            capacity,
            eviction_count: AtomicU64::new(0),
        }
    }

    /// Append a line, evicting the oldest ones beyond capacity
    pub async fn push(&self, line: String) {
        let mut lines = self.lines.write().await;
        lines.push_back(line);
        while lines.len() > self.capacity {
            lines.pop_front();
            self.eviction_count.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Copy of all lines, oldest first
    pub async fn snapshot(&self) -> Vec<String> {
        self.lines.read().await.iter().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.lines.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.lines.read().await.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total number of lines dropped since creation
    pub fn eviction_count(&self) -> u64 {
        self.eviction_count.load(Ordering::Relaxed)
    }
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new(MAX_LOG_LINES)
    }
}
