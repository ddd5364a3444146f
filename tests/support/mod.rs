#![allow(dead_code)]

use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio::time::{sleep, Instant};
use webhook_alerter::{
    Alert, Category, Dispatcher, DispatcherConfig, EndpointKey, Priority, Router, Transport,
    TransportError, WebhookPayload,
};

/// One call seen by a fake transport.
#[derive(Debug, Clone)]
pub struct Call {
    pub url: String,
    pub payload: WebhookPayload,
    pub at: Instant,
}

/// Transport that answers from a script, then with a fallback status.
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Result<u16, TransportError>>>,
    fallback: u16,
    delay: Duration,
    hold_first: AtomicBool,
    pub started: Notify,
    pub release: Notify,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedTransport {
    pub fn always(status: u16) -> Arc<Self> {
        Arc::new(Self::build(Vec::new(), status, Duration::ZERO, false))
    }

    pub fn script(script: Vec<Result<u16, TransportError>>, fallback: u16) -> Arc<Self> {
        Arc::new(Self::build(script, fallback, Duration::ZERO, false))
    }

    /// Every call takes `delay` before answering 200.
    pub fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self::build(Vec::new(), 200, delay, false))
    }

    /// The first call blocks until `release` is notified.
    pub fn gated() -> Arc<Self> {
        Arc::new(Self::build(Vec::new(), 200, Duration::ZERO, true))
    }

    fn build(
        script: Vec<Result<u16, TransportError>>,
        fallback: u16,
        delay: Duration,
        hold_first: bool,
    ) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback,
            delay,
            hold_first: AtomicBool::new(hold_first),
            started: Notify::new(),
            release: Notify::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn titles(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.payload.text).collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn post(&self, url: &str, payload: &WebhookPayload) -> Result<u16, TransportError> {
        self.calls.lock().unwrap().push(Call {
            url: url.to_string(),
            payload: payload.clone(),
            at: Instant::now(),
        });

        if self.hold_first.swap(false, Ordering::SeqCst) {
            self.started.notify_one();
            self.release.notified().await;
        }

        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }

        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or(Ok(self.fallback))
    }
}

pub fn full_router() -> Router {
    Router::new()
        .with_endpoint(EndpointKey::NewsMain, "http://hooks.test/news")
        .unwrap()
        .with_endpoint(EndpointKey::Monitor, "http://hooks.test/monitor")
        .unwrap()
        .with_endpoint(EndpointKey::Test, "http://hooks.test/test")
        .unwrap()
}

pub fn dispatcher(config: DispatcherConfig, transport: Arc<ScriptedTransport>) -> Dispatcher {
    Dispatcher::with_transport(config, full_router(), transport)
}

pub fn alert(priority: Priority, title: &str) -> Alert {
    Alert::new(Category::NewsStatus, priority, title, format!("body of {title}"))
}

/// Poll `check` until it holds, sleeping between tries. Works with a
/// paused clock since each sleep lets time auto-advance.
pub async fn wait_until<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..2_000 {
        if check().await {
            return;
        }
        sleep(Duration::from_millis(50)).await;
    }
    panic!("condition not reached in time");
}
