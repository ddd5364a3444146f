use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::{Category, EndpointKey};

/// Default bot icon shown next to every message.
pub const DEFAULT_ICON: &str = "https://example.com/assets/alert-bot.png";

/// Static formatting and routing policy for one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteProfile {
    pub endpoint: EndpointKey,
    pub display_name: String,
    pub color: String,
    pub icon: String,
}

impl RouteProfile {
    fn for_category(category: Category, icon: &str) -> Self {
        Self {
            endpoint: category.default_endpoint(),
            display_name: category.default_display_name().to_string(),
            color: category.default_color().to_string(),
            icon: icon.to_string(),
        }
    }
}

/// Load-time routing table: category → profile, endpoint → URL.
///
/// The router is immutable once built. Every category always has a
/// profile; an endpoint without a URL is what makes a category
/// unroutable.
#[derive(Debug, Clone)]
pub struct Router {
    profiles: HashMap<Category, RouteProfile>,
    urls: HashMap<EndpointKey, String>,
}

impl Router {
    /// Router with catalogue defaults and no URLs.
    pub fn new() -> Self {
        Self::with_default_icon(DEFAULT_ICON)
    }

    pub fn with_default_icon(icon: &str) -> Self {
        let profiles = Category::ALL
            .iter()
            .map(|category| (*category, RouteProfile::for_category(*category, icon)))
            .collect();
        Self {
            profiles,
            urls: HashMap::new(),
        }
    }

    /// Set the URL for an endpoint.
    ///
    /// Only `http://` and `https://` URLs are accepted.
    pub fn with_endpoint(mut self, endpoint: EndpointKey, url: impl Into<String>) -> Result<Self, ConfigError> {
        let url = url.into();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::InvalidUrl { endpoint, url });
        }
        self.urls.insert(endpoint, url);
        Ok(self)
    }

    /// Replace the profile for a category.
    pub fn with_profile(mut self, category: Category, profile: RouteProfile) -> Self {
        self.profiles.insert(category, profile);
        self
    }

    pub fn profile(&self, category: Category) -> RouteProfile {
        self.profiles
            .get(&category)
            .cloned()
            .unwrap_or_else(|| RouteProfile::for_category(category, DEFAULT_ICON))
    }

    /// Resolve the URL an envelope of `category` bound for `endpoint` goes to.
    pub fn resolve(&self, category: Category, endpoint: EndpointKey) -> Result<&str, ConfigError> {
        self.urls
            .get(&endpoint)
            .map(String::as_str)
            .ok_or(ConfigError::Unroutable { category, endpoint })
    }

    pub fn endpoints(&self) -> impl Iterator<Item = (&EndpointKey, &String)> {
        self.urls.iter()
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}
