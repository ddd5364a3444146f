use std::fmt;

use serde::Serialize;

use crate::types::{Category, EndpointKey};

/// Errors returned by [`Dispatcher::send`](crate::Dispatcher::send).
///
/// Every variant means the alert was *not* enqueued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendError {
    /// Required content was missing.
    Invalid(ValidationError),

    /// An identical alert was enqueued within the dedup window.
    Duplicate,

    /// The dispatcher is draining or has shut down.
    Shutdown,
}

impl fmt::Display for SendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SendError::Invalid(err) => write!(f, "invalid alert: {err}"),
            SendError::Duplicate => write!(f, "duplicate alert suppressed"),
            SendError::Shutdown => write!(f, "dispatcher is shut down"),
        }
    }
}

impl std::error::Error for SendError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SendError::Invalid(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for SendError {
    fn from(err: ValidationError) -> Self {
        SendError::Invalid(err)
    }
}

/// Envelope construction failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    EmptyTitle,
    EmptyBody,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyTitle => write!(f, "title must not be empty"),
            ValidationError::EmptyBody => write!(f, "body must not be empty"),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Configuration problems, either while loading or while routing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// No URL is configured for the endpoint a category routes to.
    Unroutable {
        category: Category,
        endpoint: EndpointKey,
    },

    /// Endpoint URL is not an http(s) URL.
    InvalidUrl {
        endpoint: EndpointKey,
        url: String,
    },

    /// Configuration document could not be parsed.
    Parse(String),

    /// Configuration file could not be read.
    Io(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Unroutable { category, endpoint } => write!(
                f,
                "no url configured for endpoint `{endpoint}` (category `{category}`)"
            ),
            ConfigError::InvalidUrl { endpoint, url } => {
                write!(f, "endpoint `{endpoint}` has invalid url `{url}`")
            }
            ConfigError::Parse(msg) => write!(f, "invalid config: {msg}"),
            ConfigError::Io(msg) => write!(f, "cannot read config: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err.to_string())
    }
}

/// Low-level failure reported by a [`Transport`](crate::Transport).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The request did not complete within the request timeout.
    Timeout,

    /// The connection could not be established.
    Connect(String),

    /// Any other request failure (encoding, protocol, body).
    Request(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Timeout => write!(f, "request timed out"),
            TransportError::Connect(msg) => write!(f, "connection failed: {msg}"),
            TransportError::Request(msg) => write!(f, "request failed: {msg}"),
        }
    }
}

impl std::error::Error for TransportError {}

/// Reasons why a delivery attempt failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum FailureReason {
    Timeout,
    Network,
    /// Non-success status that is worth retrying (5xx, 3xx, unexpected 2xx).
    RemoteError(u16),
    /// 4xx status.
    ClientError(u16),
    /// 429 Too Many Requests.
    RateLimited,
    /// The envelope's endpoint has no configured URL.
    Unroutable,
}

impl FailureReason {
    /// Classify an HTTP status that is not a delivery success.
    pub fn from_status(status: u16) -> Self {
        match status {
            429 => FailureReason::RateLimited,
            400..=499 => FailureReason::ClientError(status),
            _ => FailureReason::RemoteError(status),
        }
    }

    /// Whether another attempt could plausibly succeed.
    ///
    /// 4xx responses are permanent except 408 and 429.
    pub fn is_retryable(&self) -> bool {
        match self {
            FailureReason::Timeout
            | FailureReason::Network
            | FailureReason::RemoteError(_)
            | FailureReason::RateLimited => true,
            FailureReason::ClientError(status) => *status == 408,
            FailureReason::Unroutable => false,
        }
    }
}

impl From<&TransportError> for FailureReason {
    fn from(err: &TransportError) -> Self {
        match err {
            TransportError::Timeout => FailureReason::Timeout,
            TransportError::Connect(_) | TransportError::Request(_) => FailureReason::Network,
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Timeout => write!(f, "request timed out"),
            FailureReason::Network => write!(f, "network error"),
            FailureReason::RemoteError(status) => {
                write!(f, "remote endpoint returned HTTP {status}")
            }
            FailureReason::ClientError(status) => {
                write!(f, "client error HTTP {status} (non-retryable)")
            }
            FailureReason::RateLimited => write!(f, "rate limited by endpoint"),
            FailureReason::Unroutable => write!(f, "no route to endpoint"),
        }
    }
}
