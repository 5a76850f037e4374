//! Client configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Base URL of the product API when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Settings shared by the transport and the query cache.
///
/// Every field has a default, so a partial JSON/TOML document or an empty
/// `{}` deserializes to a usable configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub base_url: String,
    /// Automatic retries after a failed query fetch before settling into the error state.
    pub retry: u32,
    pub refetch_on_window_focus: bool,
    pub timeout_secs: u64,
}

impl ClientConfig {
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            retry: 1,
            refetch_on_window_focus: false,
            timeout_secs: 10,
        }
    }
}
