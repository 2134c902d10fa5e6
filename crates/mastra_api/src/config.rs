use std::collections::BTreeMap;
use std::time::Duration;

use crate::url::DEFAULT_MASTRA_BASE_URL;

/// Transport configuration for Mastra agent requests.
#[derive(Debug, Clone)]
pub struct MastraApiConfig {
    /// Server origin, optionally with a path prefix. `/api` is added when absent.
    pub base_url: String,
    /// Optional bearer token passed to `Authorization`.
    pub api_key: Option<String>,
    /// Optional `User-Agent` override.
    pub user_agent: Option<String>,
    /// Additional headers merged into request headers.
    pub extra_headers: BTreeMap<String, String>,
    /// Optional limit on connecting and on each idle gap between reads.
    /// A stream that keeps producing bytes is never cut off.
    pub timeout: Option<Duration>,
}

impl Default for MastraApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_MASTRA_BASE_URL.to_string(),
            api_key: None,
            user_agent: None,
            extra_headers: BTreeMap::new(),
            timeout: None,
        }
    }
}

impl MastraApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn insert_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.insert(key.into(), value.into());
        self
    }

    pub fn with_headers(mut self, headers: impl IntoIterator<Item = (String, String)>) -> Self {
        self.extra_headers.extend(headers);
        self
    }
}
