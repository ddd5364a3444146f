use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::time::{sleep, Instant};
use tracing::{error, info, warn};

use crate::dead_letter::DeadLetterQueue;
use crate::envelope::Envelope;
use crate::error::FailureReason;
use crate::queue::AlertQueue;
use crate::retry::RetryPolicy;
use crate::router::Router;
use crate::stats::DeliveryStats;
use crate::transport::{Transport, WebhookPayload};
use crate::types::{DeadLetterEntry, DeliveryResult};

#[cfg(feature = "metrics")]
fn metric_inc(name: &'static str) {
    metrics::increment_counter!(name);
}

#[cfg(not(feature = "metrics"))]
fn metric_inc(_name: &'static str) {}

#[cfg(feature = "metrics")]
fn metric_inc_category(name: &'static str, category: crate::types::Category) {
    metrics::increment_counter!(name, "category" => category.as_str());
}

#[cfg(not(feature = "metrics"))]
fn metric_inc_category(_name: &'static str, _category: crate::types::Category) {}

/// Everything the delivery worker touches.
pub(crate) struct WorkerContext {
    pub queue: Arc<AlertQueue>,
    pub router: Arc<Router>,
    pub transport: Arc<dyn Transport>,
    pub dead_letters: Arc<DeadLetterQueue>,
    pub stats: Arc<DeliveryStats>,
    pub retry: RetryPolicy,
    /// Set while an envelope is between `pop` and its final outcome.
    pub in_flight: AtomicBool,
}

/// The single consumer loop.
///
/// Deliveries are strictly sequential, and a backoff sleep holds up the
/// whole pipeline. Alert volume is low, and this keeps load on the chat
/// endpoint predictable and priority order intact end to end.
pub(crate) async fn worker_loop(ctx: Arc<WorkerContext>) {
    while let Some(envelope) = ctx.queue.pop().await {
        ctx.in_flight.store(true, Ordering::SeqCst);
        process_envelope(envelope, &ctx).await;
        ctx.in_flight.store(false, Ordering::SeqCst);
    }
    info!("delivery worker exiting");
}

async fn process_envelope(mut envelope: Envelope, ctx: &WorkerContext) {
    let result = attempt_delivery(&envelope, ctx).await;

    if result.success {
        metric_inc("alert.delivery.success");
        metric_inc_category("alert.delivery.success.category", envelope.category());
        info!(
            envelope_id = %envelope.id(),
            category = %envelope.category(),
            priority = %envelope.priority(),
            retry_count = envelope.retry_count(),
            status = result.status_code,
            elapsed_ms = result.processing_time.as_millis() as u64,
            "alert delivered"
        );
        return;
    }

    let reason = result.failure.clone().unwrap_or(FailureReason::Network);

    if !reason.is_retryable() {
        dead_letter(envelope, result, ctx).await;
        return;
    }

    if envelope.retry_count() >= ctx.retry.max_retries {
        dead_letter(envelope, result, ctx).await;
        return;
    }

    let retry_count = envelope.advance_retry();
    ctx.stats.record_retry();
    metric_inc("alert.delivery.retry_scheduled");

    let delay = ctx.retry.delay_for(retry_count);
    warn!(
        envelope_id = %envelope.id(),
        category = %envelope.category(),
        retry_count,
        max_retries = ctx.retry.max_retries,
        delay_ms = delay.as_millis() as u64,
        reason = %reason,
        "delivery failed, retrying after backoff"
    );

    sleep(delay).await;
    ctx.queue.push(envelope).await;
}

/// Resolve, post, and classify one attempt.
async fn attempt_delivery(envelope: &Envelope, ctx: &WorkerContext) -> DeliveryResult {
    let started = Instant::now();

    let url = match ctx.router.resolve(envelope.category(), envelope.endpoint()) {
        Ok(url) => url,
        Err(err) => {
            error!(
                envelope_id = %envelope.id(),
                category = %envelope.category(),
                endpoint = %envelope.endpoint(),
                error = %err,
                "no route for alert"
            );
            return DeliveryResult::failed(
                envelope,
                None,
                FailureReason::Unroutable,
                err.to_string(),
                started.elapsed(),
            );
        }
    };

    let payload = WebhookPayload::from_envelope(envelope);
    let response = ctx.transport.post(url, &payload).await;
    let elapsed = started.elapsed();

    let result = match response {
        Ok(status) if status == 200 || status == 204 => {
            DeliveryResult::delivered(envelope, status, elapsed)
        }
        Ok(status) => {
            let reason = FailureReason::from_status(status);
            DeliveryResult::failed(envelope, Some(status), reason.clone(), reason.to_string(), elapsed)
        }
        Err(err) => DeliveryResult::failed(envelope, None, FailureReason::from(&err), err.to_string(), elapsed),
    };

    ctx.stats.record_attempt(result.success, elapsed);
    if !result.success {
        metric_inc("alert.delivery.failure");
        warn!(
            envelope_id = %envelope.id(),
            category = %envelope.category(),
            retry_count = envelope.retry_count(),
            status = result.status_code,
            error = result.error.as_deref().unwrap_or_default(),
            "delivery attempt failed"
        );
    }

    result
}

async fn dead_letter(envelope: Envelope, last_result: DeliveryResult, ctx: &WorkerContext) {
    metric_inc("alert.dlq.inserted");
    error!(
        envelope_id = %envelope.id(),
        category = %envelope.category(),
        priority = %envelope.priority(),
        retry_count = envelope.retry_count(),
        error = last_result.error.as_deref().unwrap_or_default(),
        "alert moved to dead-letter list"
    );
    ctx.dead_letters
        .push(DeadLetterEntry {
            envelope,
            last_result,
        })
        .await;
}
