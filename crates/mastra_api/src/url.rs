use url::Url;

use crate::error::MastraApiError;

/// Default Mastra development server.
pub const DEFAULT_MASTRA_BASE_URL: &str = "http://localhost:4111";

/// Build the streaming endpoint for `agent_id`.
///
/// Normalization rules:
/// 1) a blank base falls back to [`DEFAULT_MASTRA_BASE_URL`]
/// 2) a base already ending in `/api` is not given a second `/api`
/// 3) `agent_id` is encoded as a single path segment
pub fn agent_stream_url(base_url: &str, agent_id: &str) -> Result<Url, MastraApiError> {
    let base = if base_url.trim().is_empty() {
        DEFAULT_MASTRA_BASE_URL
    } else {
        base_url.trim()
    };

    let agent_id = agent_id.trim();
    if agent_id.is_empty() {
        return Err(MastraApiError::MissingAgentId);
    }

    let mut url =
        Url::parse(base).map_err(|error| MastraApiError::InvalidBaseUrl(format!("{base}: {error}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(MastraApiError::InvalidBaseUrl(format!(
            "{base}: unsupported scheme '{}'",
            url.scheme()
        )));
    }

    let ends_with_api = url
        .path_segments()
        .and_then(|segments| segments.filter(|segment| !segment.is_empty()).last())
        == Some("api");

    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| MastraApiError::InvalidBaseUrl(format!("{base}: cannot be a base URL")))?;
        segments.pop_if_empty();
        if !ends_with_api {
            segments.push("api");
        }
        segments.extend(["agents", agent_id, "stream"]);
    }
    url.set_query(None);
    url.set_fragment(None);

    Ok(url)
}
