use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;

/// Weight of the previous average in the rolling response time.
const EWMA_DECAY: f64 = 0.9;

/// Delivery counters shared between the worker and readers.
///
/// Only the worker writes. Readers take a [`DeliveryStatistics`]
/// snapshot from plain atomic loads and never wait on the worker.
#[derive(Debug, Default)]
pub struct DeliveryStats {
    total_sent: AtomicU64,
    successful: AtomicU64,
    failed: AtomicU64,
    retry_attempts: AtomicU64,
    /// f64 milliseconds, stored as bits. Zero means no sample yet.
    avg_response_ms: AtomicU64,
    last_success_ms: AtomicU64,
}

/// Point-in-time view of the delivery counters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeliveryStatistics {
    pub total_sent: u64,
    pub successful: u64,
    pub failed: u64,
    pub retry_attempts: u64,
    pub success_rate: f64,
    pub failure_rate: f64,
    pub average_response_time_ms: f64,
    pub last_success_at: Option<DateTime<Utc>>,
}

impl DeliveryStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one HTTP attempt and fold its duration into the average.
    pub fn record_attempt(&self, success: bool, elapsed: Duration) {
        self.total_sent.fetch_add(1, Ordering::Relaxed);
        if success {
            self.successful.fetch_add(1, Ordering::Relaxed);
            self.last_success_ms
                .store(Utc::now().timestamp_millis().max(0) as u64, Ordering::Relaxed);
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }

        let sample = elapsed.as_secs_f64() * 1_000.0;
        let previous = f64::from_bits(self.avg_response_ms.load(Ordering::Relaxed));
        let next = if previous == 0.0 {
            sample
        } else {
            previous * EWMA_DECAY + sample * (1.0 - EWMA_DECAY)
        };
        self.avg_response_ms.store(next.to_bits(), Ordering::Relaxed);
    }

    pub fn record_retry(&self) {
        self.retry_attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DeliveryStatistics {
        let total_sent = self.total_sent.load(Ordering::Relaxed);
        let successful = self.successful.load(Ordering::Relaxed);
        let failed = self.failed.load(Ordering::Relaxed);
        let (success_rate, failure_rate) = if total_sent == 0 {
            (0.0, 0.0)
        } else {
            (
                successful as f64 / total_sent as f64,
                failed as f64 / total_sent as f64,
            )
        };
        let last_success_ms = self.last_success_ms.load(Ordering::Relaxed);

        DeliveryStatistics {
            total_sent,
            successful,
            failed,
            retry_attempts: self.retry_attempts.load(Ordering::Relaxed),
            success_rate,
            failure_rate,
            average_response_time_ms: f64::from_bits(self.avg_response_ms.load(Ordering::Relaxed)),
            last_success_at: if last_success_ms == 0 {
                None
            } else {
                Utc.timestamp_millis_opt(last_success_ms as i64).single()
            },
        }
    }
}
