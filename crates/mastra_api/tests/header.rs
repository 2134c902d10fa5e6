use mastra_api::headers::{
    build_headers, HEADER_ACCEPT, HEADER_AUTHORIZATION, HEADER_CLIENT_TYPE, HEADER_USER_AGENT,
};
use mastra_api::MastraApiConfig;

#[test]
fn headers_include_stream_defaults_without_auth() {
    let headers = build_headers(&MastraApiConfig::default(), None);

    assert_eq!(
        headers.get(HEADER_ACCEPT).map(String::as_str),
        Some("text/event-stream")
    );
    assert_eq!(headers.get(HEADER_CLIENT_TYPE).map(String::as_str), Some("rust"));
    assert!(headers.get(HEADER_AUTHORIZATION).is_none());
    assert!(headers
        .get(HEADER_USER_AGENT)
        .is_some_and(|value| value.starts_with("mastra_api/")));
}

#[test]
fn headers_add_bearer_token_when_api_key_is_set() {
    let config = MastraApiConfig::default().with_api_key(" secret ");
    let headers = build_headers(&config, None);

    assert_eq!(
        headers.get(HEADER_AUTHORIZATION).map(String::as_str),
        Some("Bearer secret")
    );
}

#[test]
fn headers_prefer_explicit_user_agent_then_config() {
    let config = MastraApiConfig::default().with_user_agent("configured/1");

    assert_eq!(
        build_headers(&config, Some("explicit/2"))
            .get(HEADER_USER_AGENT)
            .map(String::as_str),
        Some("explicit/2")
    );
    assert_eq!(
        build_headers(&config, None)
            .get(HEADER_USER_AGENT)
            .map(String::as_str),
        Some("configured/1")
    );
}

#[test]
fn extra_headers_are_lowercased_and_override_defaults() {
    let config = MastraApiConfig::default()
        .insert_header("X-Trace-Id", " abc ")
        .insert_header("Accept", "application/json");
    let headers = build_headers(&config, None);

    assert_eq!(headers.get("x-trace-id").map(String::as_str), Some("abc"));
    assert_eq!(
        headers.get(HEADER_ACCEPT).map(String::as_str),
        Some("application/json")
    );
}
