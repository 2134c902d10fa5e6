use std::collections::BTreeMap;

use crate::config::MastraApiConfig;

pub const HEADER_ACCEPT: &str = "accept";
pub const HEADER_CONTENT_TYPE: &str = "content-type";
pub const HEADER_AUTHORIZATION: &str = "authorization";
pub const HEADER_USER_AGENT: &str = "user-agent";
pub const HEADER_CLIENT_TYPE: &str = "x-mastra-client-type";

const DEFAULT_USER_AGENT: &str = concat!("mastra_api/", env!("CARGO_PKG_VERSION"));

/// Build a deterministic header map for agent stream requests.
///
/// Extra headers are applied after the defaults, so they may override them.
pub fn build_headers(config: &MastraApiConfig, user_agent: Option<&str>) -> BTreeMap<String, String> {
    let mut headers = BTreeMap::new();

    headers.insert(HEADER_ACCEPT.to_owned(), "text/event-stream".to_owned());
    headers.insert(
        HEADER_CONTENT_TYPE.to_owned(),
        "application/json".to_owned(),
    );
    headers.insert(HEADER_CLIENT_TYPE.to_owned(), "rust".to_owned());

    if let Some(api_key) = config.api_key.as_deref().and_then(non_blank) {
        headers.insert(HEADER_AUTHORIZATION.to_owned(), format!("Bearer {api_key}"));
    }

    let ua = user_agent
        .and_then(non_blank)
        .or_else(|| config.user_agent.as_deref().and_then(non_blank))
        .unwrap_or(DEFAULT_USER_AGENT);
    headers.insert(HEADER_USER_AGENT.to_owned(), ua.to_owned());

    for (key, value) in &config.extra_headers {
        headers.insert(key.trim().to_ascii_lowercase(), value.trim().to_owned());
    }

    headers
}

fn non_blank(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}
