mod support;

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use webhook_alerter::{
    Alert, Category, Dispatcher, DispatcherConfig, EndpointKey, FailureReason, Priority, Router,
    SendError, ShutdownReport, ValidationError,
};

use support::{alert, dispatcher, full_router, wait_until, ScriptedTransport};

fn config(max_retries: u32) -> DispatcherConfig {
    DispatcherConfig {
        max_retries,
        retry_base_ms: 1_000,
        retry_max_ms: 60_000,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_higher_priority_overtakes_earlier_low_priority() {
    let transport = ScriptedTransport::always(200);
    let dispatcher = dispatcher(config(3), transport.clone());

    dispatcher.send(alert(Priority::Critical, "M1")).await.unwrap();
    dispatcher.send(alert(Priority::Low, "M2")).await.unwrap();
    dispatcher.send(alert(Priority::Critical, "M3")).await.unwrap();

    wait_until(|| async { transport.call_count() == 3 }).await;
    assert_eq!(transport.titles(), vec!["M1", "M3", "M2"]);

    dispatcher.shutdown(Duration::from_secs(1)).await;
}

#[tokio::test]
async fn test_fifo_within_a_tier_while_worker_is_busy() {
    let transport = ScriptedTransport::gated();
    let dispatcher = dispatcher(config(3), transport.clone());

    dispatcher.send(alert(Priority::High, "blocker")).await.unwrap();
    transport.started.notified().await;

    for title in ["a", "b", "c"] {
        dispatcher.send(alert(Priority::Normal, title)).await.unwrap();
    }
    dispatcher.send(alert(Priority::High, "urgent")).await.unwrap();
    transport.release.notify_one();

    wait_until(|| async { transport.call_count() == 5 }).await;
    assert_eq!(transport.titles(), vec!["blocker", "urgent", "a", "b", "c"]);

    dispatcher.shutdown(Duration::from_secs(1)).await;
}

#[tokio::test]
async fn test_identical_alert_is_suppressed() {
    let transport = ScriptedTransport::gated();
    let dispatcher = dispatcher(config(3), transport.clone());

    dispatcher.send(alert(Priority::Critical, "blocker")).await.unwrap();
    transport.started.notified().await;

    let first = dispatcher.send(alert(Priority::Low, "disk full")).await;
    let second = dispatcher.send(alert(Priority::Low, "disk full")).await;

    assert!(first.is_ok());
    assert_eq!(second, Err(SendError::Duplicate));

    let status = dispatcher.queue_status().await;
    assert_eq!(status.pending_count, 1);
    assert_eq!(status.dedup_cache_size, 2);

    transport.release.notify_one();
    dispatcher.shutdown(Duration::from_secs(1)).await;
    assert_eq!(transport.call_count(), 2);
}

#[tokio::test]
async fn test_same_title_different_category_is_not_a_duplicate() {
    let transport = ScriptedTransport::always(200);
    let dispatcher = dispatcher(config(3), transport.clone());

    let a = Alert::new(Category::MonitorStatus, Priority::Normal, "heartbeat", "ok");
    let b = Alert::new(Category::NewsStatus, Priority::Normal, "heartbeat", "ok");

    assert!(dispatcher.send(a).await.is_ok());
    assert!(dispatcher.send(b).await.is_ok());

    let report = dispatcher.shutdown(Duration::from_secs(1)).await;
    assert!(report.drained);
    assert_eq!(transport.call_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_window_expires() {
    let transport = ScriptedTransport::always(200);
    let dispatcher = dispatcher(
        DispatcherConfig {
            dedup_window_secs: 60,
            ..config(3)
        },
        transport.clone(),
    );

    assert!(dispatcher.send(alert(Priority::Normal, "flap")).await.is_ok());
    assert_eq!(
        dispatcher.send(alert(Priority::Normal, "flap")).await,
        Err(SendError::Duplicate)
    );

    tokio::time::advance(Duration::from_secs(61)).await;
    assert!(dispatcher.send(alert(Priority::Normal, "flap")).await.is_ok());

    dispatcher.shutdown(Duration::from_secs(1)).await;
    assert_eq!(transport.call_count(), 2);
}

#[tokio::test]
async fn test_blank_content_is_rejected_before_enqueue() {
    let transport = ScriptedTransport::always(200);
    let dispatcher = dispatcher(config(3), transport.clone());

    let result = dispatcher
        .send(Alert::new(Category::Test, Priority::Low, "", "body"))
        .await;
    assert_eq!(result, Err(SendError::Invalid(ValidationError::EmptyTitle)));

    let result = dispatcher
        .send(Alert::new(Category::Test, Priority::Low, "title", "   "))
        .await;
    assert_eq!(result, Err(SendError::Invalid(ValidationError::EmptyBody)));

    let status = dispatcher.queue_status().await;
    assert_eq!(status.pending_count, 0);
    assert_eq!(status.dedup_cache_size, 0);

    dispatcher.shutdown(Duration::from_secs(1)).await;
    assert_eq!(transport.call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_persistent_server_error_ends_in_dead_letter() {
    let transport = ScriptedTransport::always(500);
    let dispatcher = dispatcher(config(3), transport.clone());

    dispatcher.send(alert(Priority::High, "flaky")).await.unwrap();

    wait_until(|| async { dispatcher.queue_status().await.dead_letter_count == 1 }).await;
    // Give a wrongly requeued envelope the chance to show up twice.
    tokio::time::sleep(Duration::from_secs(120)).await;

    let dead = dispatcher.dead_letters().await;
    assert_eq!(dead.len(), 1);
    assert_eq!(dead[0].envelope.retry_count(), 3);
    assert_eq!(dead[0].last_result.status_code, Some(500));
    assert_eq!(dead[0].last_result.failure, Some(FailureReason::RemoteError(500)));
    assert_eq!(transport.call_count(), 4);

    let stats = dispatcher.statistics();
    assert_eq!(stats.total_sent, 4);
    assert_eq!(stats.failed, 4);
    assert_eq!(stats.successful, 0);
    assert_eq!(stats.retry_attempts, 3);
    assert_eq!(stats.success_rate, 0.0);

    dispatcher.shutdown(Duration::from_secs(1)).await;
}

#[tokio::test(start_paused = true)]
async fn test_retries_back_off_exponentially() {
    let transport = ScriptedTransport::always(503);
    let dispatcher = dispatcher(config(3), transport.clone());

    dispatcher.send(alert(Priority::Normal, "slowly")).await.unwrap();
    wait_until(|| async { dispatcher.queue_status().await.dead_letter_count == 1 }).await;

    let calls = transport.calls();
    let gaps: Vec<Duration> = calls.windows(2).map(|w| w[1].at - w[0].at).collect();
    let expected = [2, 4, 8].map(Duration::from_secs);
    assert_eq!(gaps.len(), expected.len());
    for (gap, want) in gaps.iter().zip(expected) {
        assert!(*gap >= want && *gap < want + Duration::from_millis(100), "gap {gap:?}, want {want:?}");
    }

    dispatcher.shutdown(Duration::from_secs(1)).await;
}

#[tokio::test(start_paused = true)]
async fn test_transient_failure_then_success() {
    let transport = ScriptedTransport::script(
        vec![
            Err(webhook_alerter::TransportError::Timeout),
            Ok(429),
        ],
        204,
    );
    let dispatcher = dispatcher(config(3), transport.clone());

    dispatcher.send(alert(Priority::Normal, "eventually")).await.unwrap();
    wait_until(|| async { dispatcher.statistics().successful == 1 }).await;

    let stats = dispatcher.statistics();
    assert_eq!(stats.total_sent, 3);
    assert_eq!(stats.failed, 2);
    assert_eq!(stats.retry_attempts, 2);
    assert!(stats.last_success_at.is_some());
    assert_eq!(dispatcher.queue_status().await.dead_letter_count, 0);

    dispatcher.shutdown(Duration::from_secs(1)).await;
}

#[tokio::test]
async fn test_client_error_is_dead_lettered_without_retry() {
    let transport = ScriptedTransport::always(400);
    let dispatcher = dispatcher(config(3), transport.clone());

    dispatcher.send(alert(Priority::Normal, "malformed")).await.unwrap();
    wait_until(|| async { dispatcher.queue_status().await.dead_letter_count == 1 }).await;

    let dead = dispatcher.dead_letters().await;
    assert_eq!(dead[0].envelope.retry_count(), 0);
    assert_eq!(dead[0].last_result.failure, Some(FailureReason::ClientError(400)));
    assert_eq!(transport.call_count(), 1);
    assert_eq!(dispatcher.statistics().retry_attempts, 0);

    dispatcher.shutdown(Duration::from_secs(1)).await;
}

#[tokio::test]
async fn test_unroutable_category_is_dead_lettered_immediately() {
    let transport = ScriptedTransport::always(200);
    let router = Router::new()
        .with_endpoint(EndpointKey::NewsMain, "http://hooks.test/news")
        .unwrap();
    let dispatcher = Dispatcher::with_transport(config(3), router, transport.clone());

    dispatcher
        .send(Alert::new(Category::MonitorError, Priority::Critical, "crash", "worker died"))
        .await
        .unwrap();
    wait_until(|| async { dispatcher.queue_status().await.dead_letter_count == 1 }).await;

    let dead = dispatcher.dead_letters().await;
    assert_eq!(dead[0].last_result.failure, Some(FailureReason::Unroutable));
    assert_eq!(dead[0].envelope.retry_count(), 0);
    assert_eq!(transport.call_count(), 0);
    assert_eq!(dispatcher.statistics().total_sent, 0);

    dispatcher.shutdown(Duration::from_secs(1)).await;
}

#[tokio::test]
async fn test_payload_carries_route_profile_and_url() {
    let transport = ScriptedTransport::always(200);
    let dispatcher = dispatcher(config(3), transport.clone());

    dispatcher
        .send(Alert::new(Category::MonitorError, Priority::Critical, "❌ error", "details"))
        .await
        .unwrap();
    dispatcher
        .send(
            Alert::new(Category::NewsDelay, Priority::High, "late", "30 minutes late")
                .with_color("#123456"),
        )
        .await
        .unwrap();

    wait_until(|| async { transport.call_count() == 2 }).await;
    let calls = transport.calls();

    assert_eq!(calls[0].url, "http://hooks.test/monitor");
    assert_eq!(calls[0].payload.bot_name, Category::MonitorError.default_display_name());
    assert_eq!(calls[0].payload.text, "❌ error");
    assert_eq!(calls[0].payload.attachments.len(), 1);
    assert_eq!(calls[0].payload.attachments[0].color, "#dc3545");
    assert_eq!(calls[0].payload.attachments[0].text, "details");

    assert_eq!(calls[1].url, "http://hooks.test/news");
    assert_eq!(calls[1].payload.attachments[0].color, "#123456");

    dispatcher.shutdown(Duration::from_secs(1)).await;
}

#[tokio::test]
async fn test_replay_dead_letters() {
    let transport = ScriptedTransport::script(vec![Ok(404)], 200);
    let dispatcher = dispatcher(config(3), transport.clone());

    dispatcher.send(alert(Priority::Normal, "retry me")).await.unwrap();
    wait_until(|| async { dispatcher.queue_status().await.dead_letter_count == 1 }).await;

    assert_eq!(dispatcher.replay_dead_letters().await, 1);
    wait_until(|| async { dispatcher.statistics().successful == 1 }).await;
    assert_eq!(dispatcher.queue_status().await.dead_letter_count, 0);

    dispatcher.shutdown(Duration::from_secs(1)).await;
}

#[tokio::test]
async fn test_clear_dead_letters() {
    let transport = ScriptedTransport::always(410);
    let dispatcher = dispatcher(config(3), transport.clone());

    dispatcher.send(alert(Priority::Normal, "gone 1")).await.unwrap();
    dispatcher.send(alert(Priority::Normal, "gone 2")).await.unwrap();
    wait_until(|| async { dispatcher.queue_status().await.dead_letter_count == 2 }).await;

    assert_eq!(dispatcher.clear_dead_letters().await, 2);
    assert!(dispatcher.dead_letters().await.is_empty());

    dispatcher.shutdown(Duration::from_secs(1)).await;
}

#[tokio::test]
async fn test_shutdown_drains_pending_work() {
    let transport = ScriptedTransport::always(200);
    let dispatcher = dispatcher(config(3), transport.clone());

    for title in ["one", "two", "three"] {
        dispatcher.send(alert(Priority::Low, title)).await.unwrap();
    }

    let report = dispatcher.shutdown(Duration::from_secs(5)).await;
    assert!(report.drained);
    assert_eq!(report.discarded, 0);
    assert!(!report.interrupted_in_flight);
    assert_eq!(dispatcher.statistics().successful, 3);

    let status = dispatcher.queue_status().await;
    assert!(!status.running);
    assert_eq!(status.pending_count, 0);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_is_bounded_by_drain_timeout() {
    let transport = ScriptedTransport::slow(Duration::from_secs(2));
    let dispatcher = dispatcher(config(3), transport.clone());

    for i in 0..5 {
        dispatcher
            .send(alert(Priority::Low, &format!("slow {i}")))
            .await
            .unwrap();
    }

    let started = Instant::now();
    let report = dispatcher.shutdown(Duration::from_secs(1)).await;
    let elapsed = started.elapsed();

    assert!(elapsed < Duration::from_millis(1_500), "shutdown took {elapsed:?}");
    assert!(!report.drained);
    assert_eq!(report.discarded, 4);
    assert!(report.interrupted_in_flight);
    assert_eq!(dispatcher.statistics().successful, 0);
    assert_eq!(dispatcher.queue_status().await.pending_count, 0);
}

#[tokio::test]
async fn test_sends_rejected_after_shutdown() {
    let transport = ScriptedTransport::always(200);
    let dispatcher = Arc::new(dispatcher(config(3), transport));

    dispatcher.shutdown(Duration::from_millis(100)).await;

    assert!(!dispatcher.is_running());
    assert_eq!(
        dispatcher.send(alert(Priority::Critical, "late")).await,
        Err(SendError::Shutdown)
    );
    assert_eq!(dispatcher.replay_dead_letters().await, 0);

    let again = dispatcher.shutdown(Duration::from_millis(100)).await;
    assert_eq!(again, ShutdownReport::default());
}

#[tokio::test]
async fn test_concurrent_producers() {
    let transport = ScriptedTransport::always(204);
    let dispatcher = Arc::new(Dispatcher::with_transport(
        config(3),
        full_router(),
        transport.clone(),
    ));

    let mut handles = Vec::new();
    for producer in 0..4 {
        let dispatcher = dispatcher.clone();
        handles.push(tokio::spawn(async move {
            for i in 0..5 {
                dispatcher
                    .send(alert(Priority::Normal, &format!("p{producer}-{i}")))
                    .await
                    .unwrap();
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let report = dispatcher.shutdown(Duration::from_secs(5)).await;
    assert!(report.drained);
    assert_eq!(transport.call_count(), 20);
    assert_eq!(dispatcher.statistics().successful, 20);
}
