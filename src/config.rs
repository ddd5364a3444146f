use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::dispatcher::DispatcherConfig;
use crate::error::ConfigError;
use crate::router::{RouteProfile, Router};
use crate::types::{Category, EndpointKey};

/// Startup configuration document (TOML).
///
/// ```toml
/// [dispatcher]
/// max_retries = 3
///
/// [endpoints]
/// news_main = "https://hooks.example.com/news"
/// monitor = "https://hooks.example.com/monitor"
///
/// [routes.monitor_error]
/// display_name = "Ops Monitor"
/// color = "#ff0000"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AlerterConfig {
    pub dispatcher: DispatcherConfig,
    pub endpoints: HashMap<EndpointKey, String>,
    pub routes: HashMap<Category, RouteOverride>,
}

/// Per-category changes to the catalogue defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RouteOverride {
    pub endpoint: Option<EndpointKey>,
    pub display_name: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
}

impl AlerterConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        // Surface bad URLs at load time rather than on first delivery.
        config.router()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Build the routing table described by this document.
    pub fn router(&self) -> Result<Router, ConfigError> {
        let mut router = Router::with_default_icon(&self.dispatcher.default_icon);

        for (endpoint, url) in &self.endpoints {
            router = router.with_endpoint(*endpoint, url.clone())?;
        }

        for (category, route) in &self.routes {
            let base = router.profile(*category);
            let profile = RouteProfile {
                endpoint: route.endpoint.unwrap_or(base.endpoint),
                display_name: route.display_name.clone().unwrap_or(base.display_name),
                color: route.color.clone().unwrap_or(base.color),
                icon: route.icon.clone().unwrap_or(base.icon),
            };
            router = router.with_profile(*category, profile);
        }

        Ok(router)
    }
}
