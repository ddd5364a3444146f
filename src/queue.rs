use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{Mutex, Notify};

use crate::envelope::Envelope;
use crate::types::Priority;

/// Priority scheduler feeding the single delivery worker.
///
/// Entries are ordered by priority tier, then by a sequence number taken
/// at enqueue time, so equal priorities come out in enqueue order. A
/// requeued envelope takes a fresh sequence number and lands at the back
/// of its tier.
#[derive(Debug, Default)]
pub struct AlertQueue {
    heap: Mutex<Heap>,
    notify: Notify,
    draining: AtomicBool,
    halted: AtomicBool,
}

#[derive(Debug, Default)]
struct Heap {
    entries: BinaryHeap<Queued>,
    next_seq: u64,
}

#[derive(Debug)]
struct Queued {
    priority: Priority,
    seq: u64,
    envelope: Envelope,
}

impl Eq for Queued {}

impl PartialEq for Queued {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}

impl Ord for Queued {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        // Max-heap: higher priority first, then the lower sequence number.
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Queued {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl AlertQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an envelope at the back of its priority tier.
    pub async fn push(&self, envelope: Envelope) {
        {
            let mut heap = self.heap.lock().await;
            let seq = heap.next_seq;
            heap.next_seq += 1;
            heap.entries.push(Queued {
                priority: envelope.priority(),
                seq,
                envelope,
            });
        }
        self.notify.notify_one();
    }

    /// Wait for the highest-priority, oldest envelope.
    ///
    /// Returns `None` once the queue is draining and empty, or halted.
    pub async fn pop(&self) -> Option<Envelope> {
        loop {
            {
                let mut heap = self.heap.lock().await;
                if self.halted.load(Ordering::SeqCst) {
                    return None;
                }
                if let Some(queued) = heap.entries.pop() {
                    return Some(queued.envelope);
                }
                if self.draining.load(Ordering::SeqCst) {
                    return None;
                }
            }
            // notify_one stores a permit, so a push between the check above
            // and this await is not lost.
            self.notify.notified().await;
        }
    }

    /// Let the consumer finish once the queue runs dry.
    pub fn drain(&self) {
        self.draining.store(true, Ordering::SeqCst);
        self.notify.notify_one();
    }

    /// Stop handing out envelopes, even if some are pending.
    pub fn halt(&self) {
        self.halted.store(true, Ordering::SeqCst);
        self.notify.notify_one();
    }

    /// Remove and return everything still pending, in delivery order.
    pub async fn take_pending(&self) -> Vec<Envelope> {
        let mut heap = self.heap.lock().await;
        let mut pending = Vec::with_capacity(heap.entries.len());
        while let Some(queued) = heap.entries.pop() {
            pending.push(queued.envelope);
        }
        pending
    }

    pub async fn len(&self) -> usize {
        self.heap.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.heap.lock().await.entries.is_empty()
    }
}
