//! A single-process webhook delivery engine for operational alerts.
//!
//! Producers hand rendered alerts to a [`Dispatcher`]; one background
//! worker posts them to chat incoming-webhooks, highest priority first.
//!
//! ## Guarantees
//! - Strict priority tiers, FIFO within a tier
//! - Near-identical alerts within a short window are suppressed
//! - Bounded retries with exponential backoff, then a dead-letter list
//! - Shutdown finishes within the drain timeout
//!
//! ## Non-Guarantees
//! - Durability across restarts
//! - Parallel or multi-process delivery
//! - Request authentication beyond the configured webhook URL
//!
//! ```no_run
//! use std::time::Duration;
//! use webhook_alerter::{Alert, Category, Dispatcher, DispatcherConfig, EndpointKey, Priority, Router};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let router = Router::new().with_endpoint(EndpointKey::Monitor, "https://hooks.example.com/monitor")?;
//! let dispatcher = Dispatcher::new(DispatcherConfig::default(), router);
//!
//! dispatcher
//!     .send(Alert::new(Category::MonitorError, Priority::Critical, "collector down", "no data for 15 minutes"))
//!     .await?;
//!
//! dispatcher.shutdown(Duration::from_secs(10)).await;
//! # Ok(())
//! # }
//! ```

mod config;
mod dead_letter;
mod dedup;
mod dispatcher;
mod envelope;
mod error;
mod queue;
mod retry;
mod router;
mod stats;
mod transport;
mod types;
mod worker;

pub use config::{AlerterConfig, RouteOverride};
pub use dedup::DedupCache;
pub use dispatcher::{Dispatcher, DispatcherConfig, QueueStatus, ShutdownReport};
pub use envelope::Envelope;
pub use error::{ConfigError, FailureReason, SendError, TransportError, ValidationError};
pub use queue::AlertQueue;
pub use retry::RetryPolicy;
pub use router::{RouteProfile, Router, DEFAULT_ICON};
pub use stats::DeliveryStatistics;
pub use transport::{Attachment, Transport, WebhookPayload, DEFAULT_REQUEST_TIMEOUT};
pub use types::{Alert, Category, DeadLetterEntry, DeliveryResult, EndpointKey, EnvelopeId, Priority};

#[cfg(feature = "http")]
pub use transport::HttpTransport;
