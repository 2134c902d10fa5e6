use mastra_api::events::MastraStreamEvent;
use mastra_api::SseStreamParser;
use serde_json::json;

fn frame(value: serde_json::Value) -> String {
    format!("data: {value}\n\n")
}

#[test]
fn sse_maps_text_and_tool_lifecycle_chunks() {
    let input = [
        frame(json!({"type": "text-delta", "runId": "r1", "from": "AGENT", "payload": {"text": "Hi"}})),
        frame(json!({"type": "tool-call-input-streaming-start", "runId": "r1",
            "payload": {"toolCallId": "c1", "toolName": "weatherTool"}})),
        frame(json!({"type": "tool-call-delta", "runId": "r1",
            "payload": {"toolCallId": "c1", "argsTextDelta": "{\"location\":"}})),
        frame(json!({"type": "tool-call", "runId": "r1",
            "payload": {"toolCallId": "c1", "toolName": "weatherTool", "args": {"location": "London"}}})),
        frame(json!({"type": "tool-result", "runId": "r1",
            "payload": {"toolCallId": "c1", "toolName": "weatherTool", "result": {"temperature": 14}}})),
    ]
    .concat();

    let events = SseStreamParser::parse_frames(&input);

    assert_eq!(
        events,
        vec![
            MastraStreamEvent::TextDelta {
                run_id: Some("r1".to_string()),
                text: Some("Hi".to_string()),
            },
            MastraStreamEvent::ToolCallInputStreamingStart {
                run_id: Some("r1".to_string()),
                tool_call_id: Some("c1".to_string()),
                tool_name: Some("weatherTool".to_string()),
            },
            MastraStreamEvent::ToolCallDelta {
                run_id: Some("r1".to_string()),
                tool_call_id: Some("c1".to_string()),
                args_text_delta: Some("{\"location\":".to_string()),
            },
            MastraStreamEvent::ToolCall {
                run_id: Some("r1".to_string()),
                tool_call_id: Some("c1".to_string()),
                tool_name: Some("weatherTool".to_string()),
                args: Some(json!({"location": "London"})),
            },
            MastraStreamEvent::ToolResult {
                run_id: Some("r1".to_string()),
                tool_call_id: Some("c1".to_string()),
                tool_name: Some("weatherTool".to_string()),
                result: Some(json!({"temperature": 14})),
                is_error: false,
            },
        ]
    );
}

#[test]
fn sse_finish_reason_prefers_step_result() {
    let input = [
        frame(json!({"type": "finish", "runId": "r", "payload": {"stepResult": {"reason": "stop"}}})),
        frame(json!({"type": "finish", "runId": "r", "payload": {"finishReason": "length"}})),
    ]
    .concat();

    let reasons: Vec<_> = SseStreamParser::parse_frames(&input)
        .into_iter()
        .map(|event| match event {
            MastraStreamEvent::Finish { reason, .. } => reason,
            other => panic!("unexpected event {other:?}"),
        })
        .collect();

    assert_eq!(reasons, vec![Some("stop".to_string()), Some("length".to_string())]);
}

#[test]
fn sse_error_message_accepts_string_or_object() {
    let input = [
        frame(json!({"type": "error", "payload": {"error": "plain"}})),
        frame(json!({"type": "error", "payload": {"error": {"message": "nested"}}})),
    ]
    .concat();

    let events = SseStreamParser::parse_frames(&input);

    assert!(matches!(&events[0], MastraStreamEvent::Error { message: Some(m), .. } if m == "plain"));
    assert!(matches!(&events[1], MastraStreamEvent::Error { message: Some(m), .. } if m == "nested"));
    assert!(events.iter().all(MastraStreamEvent::is_terminal));
}

#[test]
fn sse_keeps_unknown_types_and_skips_untyped_or_malformed_frames() {
    let input = concat!(
        "data: {\"type\":\"step-start\",\"runId\":\"r\",\"payload\":{}}\n\n",
        "data: {\"payload\":{}}\n\n",
        "data: {not json\n\n",
        ": keep-alive comment\n\n",
    );

    let events = SseStreamParser::parse_frames(input);

    assert_eq!(
        events,
        vec![MastraStreamEvent::Unknown {
            event_type: "step-start".to_string(),
            run_id: Some("r".to_string()),
        }]
    );
    assert_eq!(events[0].event_type(), "step-start");
    assert_eq!(events[0].run_id(), Some("r"));
}

#[test]
fn sse_null_args_and_result_are_absent() {
    let input = frame(json!({"type": "tool-result", "payload": {"toolCallId": "c", "result": null, "isError": true}}));

    let events = SseStreamParser::parse_frames(&input);

    assert_eq!(
        events,
        vec![MastraStreamEvent::ToolResult {
            run_id: None,
            tool_call_id: Some("c".to_string()),
            tool_name: None,
            result: None,
            is_error: true,
        }]
    );
}

#[test]
fn sse_multi_line_data_is_joined() {
    let input = "data: {\"type\":\"text-delta\",\ndata: \"payload\":{\"text\":\"x\"}}\n\n";

    let events = SseStreamParser::parse_frames(input);

    assert_eq!(
        events,
        vec![MastraStreamEvent::TextDelta {
            run_id: None,
            text: Some("x".to_string()),
        }]
    );
}

#[test]
fn sse_character_split_across_reads_is_decoded_intact() {
    let input = frame(json!({"type": "text-delta", "runId": "r", "payload": {"text": "14°C"}}));
    let bytes = input.as_bytes();
    let degree = input.find('°').expect("degree sign");
    let mut parser = SseStreamParser::default();

    let first = parser.feed(&bytes[..degree + 1]);
    let second = parser.feed(&bytes[degree + 1..]);

    assert!(first.is_empty());
    assert_eq!(
        second,
        vec![MastraStreamEvent::TextDelta {
            run_id: Some("r".to_string()),
            text: Some("14°C".to_string()),
        }]
    );
    assert!(parser.is_empty_buffer());
}

#[test]
fn sse_crlf_split_between_reads_still_ends_the_frame() {
    let input = frame(json!({"type": "text-delta", "payload": {"text": "ok"}})).replace('\n', "\r\n");
    let bytes = input.as_bytes();
    let mut parser = SseStreamParser::default();

    let first = parser.feed(&bytes[..bytes.len() - 1]);
    let second = parser.feed(&bytes[bytes.len() - 1..]);

    assert!(first.is_empty());
    assert_eq!(
        second,
        vec![MastraStreamEvent::TextDelta {
            run_id: None,
            text: Some("ok".to_string()),
        }]
    );
}
