use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::envelope::Envelope;
use crate::error::FailureReason;

/// Kind of alert being raised.
///
/// The category is a closed set: each variant carries its own static
/// formatting policy (display name, color) and a default logical
/// endpoint. The router may override any of these at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Business-day comparison of published news.
    NewsComparison,
    /// A scheduled publication is late.
    NewsDelay,
    /// Daily integrated report.
    NewsReport,
    /// On-time publication status.
    NewsStatus,
    /// Upstream data has not been refreshed.
    NewsNoData,
    /// The process monitor hit an error.
    MonitorError,
    /// Periodic process monitor status.
    MonitorStatus,
    /// Test traffic.
    Test,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::NewsComparison,
        Category::NewsDelay,
        Category::NewsReport,
        Category::NewsStatus,
        Category::NewsNoData,
        Category::MonitorError,
        Category::MonitorStatus,
        Category::Test,
    ];

    /// Stable key used in configuration and content fingerprints.
    pub fn as_str(self) -> &'static str {
        match self {
            Category::NewsComparison => "news_comparison",
            Category::NewsDelay => "news_delay",
            Category::NewsReport => "news_report",
            Category::NewsStatus => "news_status",
            Category::NewsNoData => "news_no_data",
            Category::MonitorError => "monitor_error",
            Category::MonitorStatus => "monitor_status",
            Category::Test => "test",
        }
    }

    pub fn default_endpoint(self) -> EndpointKey {
        match self {
            Category::NewsComparison
            | Category::NewsDelay
            | Category::NewsReport
            | Category::NewsStatus
            | Category::NewsNoData => EndpointKey::NewsMain,
            Category::MonitorError | Category::MonitorStatus => EndpointKey::Monitor,
            Category::Test => EndpointKey::Test,
        }
    }

    pub fn default_display_name(self) -> &'static str {
        match self {
            Category::NewsComparison => "News Comparison",
            Category::NewsDelay => "News Delay",
            Category::NewsReport => "Daily Report",
            Category::NewsStatus => "News Status",
            Category::NewsNoData => "News No Data",
            Category::MonitorError => "Monitor Alert 🚨",
            Category::MonitorStatus => "Monitor Status 🛡️",
            Category::Test => "[TEST] System",
        }
    }

    pub fn default_color(self) -> &'static str {
        match self {
            Category::NewsComparison => "#007bff",
            Category::NewsDelay => "#ffc107",
            Category::NewsReport => "#17a2b8",
            Category::NewsStatus => "#28a745",
            Category::NewsNoData => "#6c757d",
            Category::MonitorError => "#dc3545",
            Category::MonitorStatus => "#28a745",
            Category::Test => "#6c757d",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Logical destination an envelope is delivered to.
///
/// Several categories share one endpoint; the URL behind each endpoint
/// comes from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointKey {
    NewsMain,
    Monitor,
    Test,
}

impl EndpointKey {
    pub fn as_str(self) -> &'static str {
        match self {
            EndpointKey::NewsMain => "news_main",
            EndpointKey::Monitor => "monitor",
            EndpointKey::Test => "test",
        }
    }
}

impl fmt::Display for EndpointKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Delivery priority tier. A higher tier is always delivered first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Critical,
    High,
    Normal,
    Low,
}

impl Priority {
    fn rank(self) -> u8 {
        match self {
            Priority::Critical => 3,
            Priority::High => 2,
            Priority::Normal => 1,
            Priority::Low => 0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Critical => "critical",
            Priority::High => "high",
            Priority::Normal => "normal",
            Priority::Low => "low",
        }
    }
}

impl Ord for Priority {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl PartialOrd for Priority {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unique identifier for an envelope.
///
/// Returned by [`Dispatcher::send`](crate::Dispatcher::send) so producers
/// can correlate their call with delivery logs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnvelopeId(pub String);

impl fmt::Display for EnvelopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An alert as described by a producer.
///
/// Title and body arrive already rendered. Anything left unset here is
/// filled from the category's route profile when the envelope is built.
#[derive(Debug, Clone)]
pub struct Alert {
    pub category: Category,
    pub priority: Priority,
    pub title: String,
    pub body: String,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub test_mode: bool,
}

impl Alert {
    pub fn new(
        category: Category,
        priority: Priority,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            category,
            priority,
            title: title.into(),
            body: body.into(),
            color: None,
            icon: None,
            test_mode: false,
        }
    }

    /// Override the category's default attachment color.
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    /// Override the category's default bot icon URL.
    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn with_test_mode(mut self, test_mode: bool) -> Self {
        self.test_mode = test_mode;
        self
    }
}

/// Outcome of a single delivery attempt.
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryResult {
    pub success: bool,
    pub envelope_id: EnvelopeId,
    /// HTTP status, when the endpoint answered at all.
    pub status_code: Option<u16>,
    pub failure: Option<FailureReason>,
    pub error: Option<String>,
    pub retry_count: u32,
    pub timestamp: DateTime<Utc>,
    pub processing_time: Duration,
}

impl DeliveryResult {
    pub(crate) fn delivered(envelope: &Envelope, status_code: u16, processing_time: Duration) -> Self {
        Self {
            success: true,
            envelope_id: envelope.id().clone(),
            status_code: Some(status_code),
            failure: None,
            error: None,
            retry_count: envelope.retry_count(),
            timestamp: Utc::now(),
            processing_time,
        }
    }

    pub(crate) fn failed(
        envelope: &Envelope,
        status_code: Option<u16>,
        failure: FailureReason,
        error: impl Into<String>,
        processing_time: Duration,
    ) -> Self {
        Self {
            success: false,
            envelope_id: envelope.id().clone(),
            status_code,
            failure: Some(failure),
            error: Some(error.into()),
            retry_count: envelope.retry_count(),
            timestamp: Utc::now(),
            processing_time,
        }
    }
}

/// Dead-letter entry: an envelope that will not be attempted again,
/// together with the result of its last attempt.
#[derive(Debug, Clone, Serialize)]
pub struct DeadLetterEntry {
    pub envelope: Envelope,
    pub last_result: DeliveryResult,
}
