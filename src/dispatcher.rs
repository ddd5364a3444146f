use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{timeout, Instant};
use tracing::{info, warn};

use crate::dead_letter::DeadLetterQueue;
use crate::dedup::DedupCache;
use crate::envelope::Envelope;
use crate::error::SendError;
use crate::queue::AlertQueue;
use crate::retry::RetryPolicy;
use crate::router::{Router, DEFAULT_ICON};
use crate::stats::{DeliveryStatistics, DeliveryStats};
use crate::transport::Transport;
use crate::types::{Alert, DeadLetterEntry, EnvelopeId};
use crate::worker::{worker_loop, WorkerContext};

#[cfg(feature = "metrics")]
fn metric_inc(name: &'static str) {
    metrics::increment_counter!(name);
}

#[cfg(not(feature = "metrics"))]
fn metric_inc(_name: &'static str) {}

/// Engine settings.
///
/// Durations are plain integers so the struct can be read straight from
/// a config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Retries after the initial attempt.
    pub max_retries: u32,
    pub retry_base_ms: u64,
    pub retry_max_ms: u64,
    pub request_timeout_ms: u64,
    pub dedup_capacity: usize,
    pub dedup_window_secs: u64,
    pub dead_letter_capacity: usize,
    /// Reject `send` as soon as a shutdown starts, rather than only
    /// after it completes.
    pub reject_sends_while_draining: bool,
    /// Use the short test retry schedule (0.5 s base, 2 s cap).
    pub test_mode: bool,
    pub default_icon: String,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_base_ms: 1_000,
            retry_max_ms: 60_000,
            request_timeout_ms: 10_000,
            dedup_capacity: 1_000,
            dedup_window_secs: 300,
            dead_letter_capacity: 10_000,
            reject_sends_while_draining: true,
            test_mode: false,
            default_icon: DEFAULT_ICON.to_string(),
        }
    }
}

impl DispatcherConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        if self.test_mode {
            return RetryPolicy::fast(self.max_retries);
        }
        RetryPolicy::new(
            self.max_retries,
            Duration::from_millis(self.retry_base_ms),
            Duration::from_millis(self.retry_max_ms),
        )
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Snapshot of queue-side state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueStatus {
    pub pending_count: usize,
    pub dead_letter_count: usize,
    pub dedup_cache_size: usize,
    pub running: bool,
}

/// What happened during [`Dispatcher::shutdown`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ShutdownReport {
    /// The queue emptied before the timeout.
    pub drained: bool,
    /// Pending envelopes thrown away when the timeout hit.
    pub discarded: usize,
    /// An attempt or backoff sleep was cut short by the timeout.
    pub interrupted_in_flight: bool,
}

/// Prioritized, deduplicating webhook delivery engine.
///
/// Producers share the dispatcher through an `Arc` and only call
/// [`send`](Self::send). A single worker task, spawned on construction,
/// performs every delivery. Must be created inside a tokio runtime.
pub struct Dispatcher {
    queue: Arc<AlertQueue>,
    dedup: Mutex<DedupCache>,
    router: Arc<Router>,
    dead_letters: Arc<DeadLetterQueue>,
    stats: Arc<DeliveryStats>,
    ctx: Arc<WorkerContext>,
    worker_handle: Mutex<Option<JoinHandle<()>>>,
    accepting: AtomicBool,
    is_running: AtomicBool,
    config: DispatcherConfig,
}

impl Dispatcher {
    /// Dispatcher delivering over HTTP.
    #[cfg(feature = "http")]
    pub fn new(config: DispatcherConfig, router: Router) -> Self {
        let transport = Arc::new(crate::transport::HttpTransport::with_timeout(
            config.request_timeout(),
        ));
        Self::with_transport(config, router, transport)
    }

    /// Dispatcher delivering through a caller-supplied transport.
    pub fn with_transport(
        config: DispatcherConfig,
        router: Router,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let queue = Arc::new(AlertQueue::new());
        let router = Arc::new(router);
        let dead_letters = Arc::new(DeadLetterQueue::new(config.dead_letter_capacity));
        let stats = Arc::new(DeliveryStats::new());

        let ctx = Arc::new(WorkerContext {
            queue: queue.clone(),
            router: router.clone(),
            transport,
            dead_letters: dead_letters.clone(),
            stats: stats.clone(),
            retry: config.retry_policy(),
            in_flight: AtomicBool::new(false),
        });

        let worker_handle = tokio::spawn(worker_loop(ctx.clone()));

        info!(
            max_retries = config.max_retries,
            test_mode = config.test_mode,
            "alert dispatcher started"
        );

        Self {
            queue,
            dedup: Mutex::new(DedupCache::new(
                config.dedup_capacity,
                Duration::from_secs(config.dedup_window_secs),
            )),
            router,
            dead_letters,
            stats,
            ctx,
            worker_handle: Mutex::new(Some(worker_handle)),
            accepting: AtomicBool::new(true),
            is_running: AtomicBool::new(true),
            config,
        }
    }

    /// Validate, deduplicate and enqueue an alert.
    ///
    /// Returns the new envelope's id. Delivery happens later on the
    /// worker; its failures never come back to the caller.
    pub async fn send(&self, alert: Alert) -> Result<EnvelopeId, SendError> {
        if !self.accepting.load(Ordering::SeqCst) {
            metric_inc("alert.send.shutdown");
            return Err(SendError::Shutdown);
        }

        let profile = self.router.profile(alert.category);
        let envelope = Envelope::build(alert, profile).inspect_err(|err| {
            metric_inc("alert.send.invalid");
            warn!(error = %err, "rejecting invalid alert");
        })?;

        {
            let mut dedup = self.dedup.lock().await;
            if dedup.check_and_record(&envelope) {
                metric_inc("alert.send.duplicate");
                warn!(
                    envelope_id = %envelope.id(),
                    category = %envelope.category(),
                    "duplicate alert suppressed"
                );
                return Err(SendError::Duplicate);
            }
        }

        let id = envelope.id().clone();
        info!(
            envelope_id = %id,
            category = %envelope.category(),
            priority = %envelope.priority(),
            test_mode = envelope.test_mode(),
            "alert enqueued"
        );
        self.queue.push(envelope).await;
        metric_inc("alert.send.enqueued");
        Ok(id)
    }

    pub async fn queue_status(&self) -> QueueStatus {
        QueueStatus {
            pending_count: self.queue.len().await,
            dead_letter_count: self.dead_letters.len().await,
            dedup_cache_size: self.dedup.lock().await.len(),
            running: self.is_running(),
        }
    }

    pub fn statistics(&self) -> DeliveryStatistics {
        self.stats.snapshot()
    }

    pub async fn dead_letters(&self) -> Vec<DeadLetterEntry> {
        self.dead_letters.snapshot().await
    }

    /// Forget every dead letter, returning how many there were.
    pub async fn clear_dead_letters(&self) -> usize {
        let cleared = self.dead_letters.take_all().await.len();
        info!(cleared, "dead-letter list cleared");
        cleared
    }

    /// Put every dead-lettered envelope back on the queue with a fresh
    /// retry budget. Dedup is bypassed.
    pub async fn replay_dead_letters(&self) -> usize {
        if !self.is_running() {
            return 0;
        }
        let entries = self.dead_letters.take_all().await;
        let replayed = entries.len();
        for entry in entries {
            let mut envelope = entry.envelope;
            envelope.reset_retries();
            self.queue.push(envelope).await;
        }
        if replayed > 0 {
            info!(replayed, "dead letters replayed");
        }
        replayed
    }

    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::SeqCst)
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Stop intake and drain the queue for at most `drain_timeout`.
    ///
    /// If the queue has not emptied by then, the worker is aborted,
    /// including any attempt or backoff sleep in progress, and whatever
    /// is still pending is discarded and counted in the report.
    pub async fn shutdown(&self, drain_timeout: Duration) -> ShutdownReport {
        if self.config.reject_sends_while_draining {
            self.accepting.store(false, Ordering::SeqCst);
        }

        let Some(mut handle) = self.worker_handle.lock().await.take() else {
            return ShutdownReport::default();
        };

        let started = Instant::now();
        let pending = self.queue.len().await;
        info!(
            pending,
            timeout_ms = drain_timeout.as_millis() as u64,
            "shutting down alert dispatcher"
        );

        self.queue.drain();
        let report = match timeout(drain_timeout, &mut handle).await {
            Ok(_) => ShutdownReport {
                drained: true,
                discarded: 0,
                interrupted_in_flight: false,
            },
            Err(_) => {
                self.queue.halt();
                handle.abort();
                let _ = handle.await;

                let discarded = self.queue.take_pending().await.len();
                let interrupted_in_flight = self.ctx.in_flight.load(Ordering::SeqCst);
                warn!(
                    discarded,
                    interrupted_in_flight,
                    "drain timeout elapsed, discarding undelivered alerts"
                );
                ShutdownReport {
                    drained: false,
                    discarded,
                    interrupted_in_flight,
                }
            }
        };

        self.accepting.store(false, Ordering::SeqCst);
        self.is_running.store(false, Ordering::SeqCst);
        info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            "alert dispatcher stopped"
        );
        report
    }
}
