use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use ulid::Ulid;

use crate::error::ValidationError;
use crate::router::RouteProfile;
use crate::types::{Alert, Category, EndpointKey, EnvelopeId, Priority};

/// One alert ready for delivery.
///
/// Everything except the retry counter is fixed at construction. Only the
/// delivery worker advances `retry_count`.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope {
    id: EnvelopeId,
    category: Category,
    priority: Priority,
    endpoint: EndpointKey,
    display_name: String,
    icon: String,
    title: String,
    body: String,
    color: String,
    test_mode: bool,
    retry_count: u32,
    created_at: DateTime<Utc>,
}

impl Envelope {
    /// Build an envelope from a producer's alert and the category's
    /// route profile. Colors and icons the alert leaves unset come
    /// from the profile.
    pub fn build(alert: Alert, profile: RouteProfile) -> Result<Self, ValidationError> {
        if alert.title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        if alert.body.trim().is_empty() {
            return Err(ValidationError::EmptyBody);
        }

        Ok(Self {
            id: generate_id(&alert.body),
            category: alert.category,
            priority: alert.priority,
            endpoint: profile.endpoint,
            display_name: profile.display_name,
            icon: alert.icon.unwrap_or(profile.icon),
            color: alert.color.unwrap_or(profile.color),
            title: alert.title,
            body: alert.body,
            test_mode: alert.test_mode,
            retry_count: 0,
            created_at: Utc::now(),
        })
    }

    pub fn id(&self) -> &EnvelopeId {
        &self.id
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn endpoint(&self) -> EndpointKey {
        self.endpoint
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn icon(&self) -> &str {
        &self.icon
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn color(&self) -> &str {
        &self.color
    }

    pub fn test_mode(&self) -> bool {
        self.test_mode
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub(crate) fn advance_retry(&mut self) -> u32 {
        self.retry_count = self.retry_count.saturating_add(1);
        self.retry_count
    }

    /// Fresh attempt budget for an operator-triggered replay.
    pub(crate) fn reset_retries(&mut self) {
        self.retry_count = 0;
    }
}

/// `<ULID>-<8 hex chars of SHA-256(body)>`: sortable by creation time,
/// unique per call, and recognisable by content in logs.
fn generate_id(body: &str) -> EnvelopeId {
    let digest = Sha256::digest(body.as_bytes());
    let suffix = hex::encode(&digest[..4]);
    EnvelopeId(format!("{}-{}", Ulid::new(), suffix))
}
