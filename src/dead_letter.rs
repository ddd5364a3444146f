use std::collections::VecDeque;

use tokio::sync::Mutex;
use tracing::warn;

use crate::types::DeadLetterEntry;

/// Bounded, in-memory list of envelopes that will not be retried.
#[derive(Debug)]
pub struct DeadLetterQueue {
    entries: Mutex<VecDeque<DeadLetterEntry>>,
    capacity: usize,
}

impl DeadLetterQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }

    /// Append an entry, dropping the oldest once over capacity.
    pub async fn push(&self, entry: DeadLetterEntry) {
        let mut guard = self.entries.lock().await;
        guard.push_back(entry);
        while guard.len() > self.capacity {
            if let Some(dropped) = guard.pop_front() {
                warn!(
                    envelope_id = %dropped.envelope.id(),
                    capacity = self.capacity,
                    "dead-letter list full, dropping oldest entry"
                );
            }
        }
    }

    pub async fn snapshot(&self) -> Vec<DeadLetterEntry> {
        let guard = self.entries.lock().await;
        guard.iter().cloned().collect()
    }

    /// Remove every entry, oldest first.
    pub async fn take_all(&self) -> Vec<DeadLetterEntry> {
        let mut guard = self.entries.lock().await;
        guard.drain(..).collect()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}
