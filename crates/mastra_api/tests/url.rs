use mastra_api::error::MastraApiError;
use mastra_api::agent_stream_url;

#[test]
fn url_appends_api_agents_stream_to_origin() {
    assert_eq!(
        agent_stream_url("http://localhost:4111", "weather-agent")
            .expect("url")
            .as_str(),
        "http://localhost:4111/api/agents/weather-agent/stream"
    );
}

#[test]
fn url_keeps_existing_api_prefix() {
    assert_eq!(
        agent_stream_url("https://agents.example.com/api/", "weather-agent")
            .expect("url")
            .as_str(),
        "https://agents.example.com/api/agents/weather-agent/stream"
    );
}

#[test]
fn url_keeps_path_prefix_and_drops_query() {
    assert_eq!(
        agent_stream_url("https://example.com/mastra?x=1#top", "a")
            .expect("url")
            .as_str(),
        "https://example.com/mastra/api/agents/a/stream"
    );
}

#[test]
fn url_encodes_agent_id_as_one_segment() {
    assert_eq!(
        agent_stream_url("http://localhost:4111", "team/agent one")
            .expect("url")
            .as_str(),
        "http://localhost:4111/api/agents/team%2Fagent%20one/stream"
    );
}

#[test]
fn url_blank_base_uses_default_server() {
    assert_eq!(
        agent_stream_url("  ", "weather-agent")
            .expect("url")
            .as_str(),
        "http://localhost:4111/api/agents/weather-agent/stream"
    );
}

#[test]
fn url_rejects_blank_agent_and_bad_scheme() {
    assert!(matches!(
        agent_stream_url("http://localhost:4111", " "),
        Err(MastraApiError::MissingAgentId)
    ));
    assert!(matches!(
        agent_stream_url("ftp://localhost", "a"),
        Err(MastraApiError::InvalidBaseUrl(_))
    ));
    assert!(matches!(
        agent_stream_url("not a url", "a"),
        Err(MastraApiError::InvalidBaseUrl(_))
    ));
}
