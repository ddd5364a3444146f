use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use sha2::{Digest, Sha256};
use tokio::time::Instant;

use crate::envelope::Envelope;

/// Number of body characters that take part in the fingerprint.
const BODY_PREFIX_CHARS: usize = 100;

/// Bounded set of recently enqueued content fingerprints.
///
/// Recency is best-effort: once the bound is exceeded the oldest half
/// is dropped in one go, and entries older than the retention window
/// are swept lazily on every insert. This only has to stop the same
/// alert from being re-posted seconds apart, and keep memory bounded.
#[derive(Debug)]
pub struct DedupCache {
    seen: HashMap<String, Instant>,
    order: VecDeque<(String, Instant)>,
    capacity: usize,
    retention: Duration,
}

impl DedupCache {
    pub fn new(capacity: usize, retention: Duration) -> Self {
        Self {
            seen: HashMap::new(),
            order: VecDeque::new(),
            capacity: capacity.max(2),
            retention,
        }
    }

    /// SHA-256 over category, title and the first characters of the body.
    pub fn fingerprint(envelope: &Envelope) -> String {
        let prefix: String = envelope.body().chars().take(BODY_PREFIX_CHARS).collect();
        let content = format!("{}_{}_{}", envelope.category(), envelope.title(), prefix);
        hex::encode(Sha256::digest(content.as_bytes()))
    }

    /// Whether an envelope with the same fingerprint was recorded inside
    /// the retention window.
    pub fn should_suppress(&self, envelope: &Envelope) -> bool {
        self.contains_fresh(&Self::fingerprint(envelope), Instant::now())
    }

    pub fn record(&mut self, hash: String) {
        let now = Instant::now();
        self.sweep(now);
        self.seen.insert(hash.clone(), now);
        self.order.push_back((hash, now));
        if self.seen.len() > self.capacity {
            self.evict_oldest_half();
        }
    }

    /// Suppression check and insert as one step.
    ///
    /// Returns `true` when the envelope is a duplicate; nothing is
    /// recorded in that case.
    pub fn check_and_record(&mut self, envelope: &Envelope) -> bool {
        let hash = Self::fingerprint(envelope);
        if self.contains_fresh(&hash, Instant::now()) {
            return true;
        }
        self.record(hash);
        false
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    fn contains_fresh(&self, hash: &str, now: Instant) -> bool {
        self.seen
            .get(hash)
            .is_some_and(|inserted| now.duration_since(*inserted) < self.retention)
    }

    fn sweep(&mut self, now: Instant) {
        while let Some((_, inserted)) = self.order.front() {
            if now.duration_since(*inserted) < self.retention {
                break;
            }
            if let Some((hash, inserted)) = self.order.pop_front() {
                self.forget(&hash, inserted);
            }
        }
    }

    fn evict_oldest_half(&mut self) {
        let target = self.seen.len() / 2;
        while self.seen.len() > target {
            let Some((hash, inserted)) = self.order.pop_front() else { break };
            self.forget(&hash, inserted);
        }
    }

    // A re-recorded hash has a newer instant in `seen`; its stale queue
    // slot must not evict it.
    fn forget(&mut self, hash: &str, inserted: Instant) {
        if self.seen.get(hash) == Some(&inserted) {
            self.seen.remove(hash);
        }
    }
}
