use serde_json::Value;

use crate::events::{
    MastraStreamEvent, EVENT_ERROR, EVENT_FINISH, EVENT_TEXT_DELTA, EVENT_TOOL_CALL,
    EVENT_TOOL_CALL_DELTA, EVENT_TOOL_CALL_INPUT_STREAMING_START, EVENT_TOOL_RESULT,
};

const DONE_SENTINEL: &str = "[DONE]";

/// Incremental parser for SSE byte streams.
///
/// Bytes are buffered undecoded until a whole frame is available, so a
/// multi-byte character split across reads is decoded intact.
#[derive(Debug, Default)]
pub struct SseStreamParser {
    buffer: Vec<u8>,
    done: bool,
}

impl SseStreamParser {
    /// Feed arbitrary bytes into the parser and drain complete events.
    ///
    /// Frames after the `[DONE]` sentinel are discarded.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<MastraStreamEvent> {
        self.buffer.extend_from_slice(bytes);
        if self.buffer.contains(&b'\r') {
            normalize_crlf(&mut self.buffer);
        }
        let mut events = Vec::new();

        while let Some(split) = find_frame_end(&self.buffer) {
            let frame: Vec<u8> = self.buffer.drain(0..split + 2).take(split).collect();

            if self.done {
                continue;
            }

            let frame = match std::str::from_utf8(&frame) {
                Ok(frame) => frame,
                Err(error) => {
                    tracing::debug!(%error, "skipping SSE frame with invalid UTF-8");
                    continue;
                }
            };
            let Some(payload) = extract_data_payload(frame) else {
                continue;
            };
            if payload == DONE_SENTINEL {
                self.done = true;
                continue;
            }

            match serde_json::from_str::<Value>(&payload) {
                Ok(value) => events.extend(map_event(value)),
                Err(error) => tracing::debug!(%error, "skipping malformed SSE payload"),
            }
        }

        events
    }

    /// Parse a complete SSE payload string in one shot.
    pub fn parse_frames(input: &str) -> Vec<MastraStreamEvent> {
        let mut parser = Self::default();
        parser.feed(input.as_bytes())
    }

    /// True once the `[DONE]` sentinel has been seen.
    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn is_empty_buffer(&self) -> bool {
        self.buffer.iter().all(u8::is_ascii_whitespace)
    }
}

fn find_frame_end(buffer: &[u8]) -> Option<usize> {
    buffer.windows(2).position(|window| window == b"\n\n")
}

/// Rewrites `\r\n` as `\n` in place. A trailing `\r` is kept until its
/// `\n` arrives.
fn normalize_crlf(buffer: &mut Vec<u8>) {
    let mut write = 0;
    for read in 0..buffer.len() {
        let byte = buffer[read];
        if byte == b'\r' && buffer.get(read + 1) == Some(&b'\n') {
            continue;
        }
        buffer[write] = byte;
        write += 1;
    }
    buffer.truncate(write);
}

fn extract_data_payload(frame: &str) -> Option<String> {
    let data_lines: Vec<&str> = frame
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .collect();

    if data_lines.is_empty() {
        None
    } else {
        Some(data_lines.join("\n"))
    }
}

fn map_event(value: Value) -> Option<MastraStreamEvent> {
    let event_type = value.get("type")?.as_str()?;
    let run_id = string_field(&value, "runId");
    let payload = value.get("payload").unwrap_or(&Value::Null);

    Some(match event_type {
        EVENT_TEXT_DELTA => MastraStreamEvent::TextDelta {
            run_id,
            text: string_field(payload, "text"),
        },
        EVENT_TOOL_CALL_INPUT_STREAMING_START => MastraStreamEvent::ToolCallInputStreamingStart {
            run_id,
            tool_call_id: string_field(payload, "toolCallId"),
            tool_name: string_field(payload, "toolName"),
        },
        EVENT_TOOL_CALL_DELTA => MastraStreamEvent::ToolCallDelta {
            run_id,
            tool_call_id: string_field(payload, "toolCallId"),
            args_text_delta: string_field(payload, "argsTextDelta"),
        },
        EVENT_TOOL_CALL => MastraStreamEvent::ToolCall {
            run_id,
            tool_call_id: string_field(payload, "toolCallId"),
            tool_name: string_field(payload, "toolName"),
            args: present_field(payload, "args"),
        },
        EVENT_TOOL_RESULT => MastraStreamEvent::ToolResult {
            run_id,
            tool_call_id: string_field(payload, "toolCallId"),
            tool_name: string_field(payload, "toolName"),
            result: present_field(payload, "result"),
            is_error: payload
                .get("isError")
                .and_then(Value::as_bool)
                .unwrap_or(false),
        },
        EVENT_FINISH => {
            let reason = payload
                .get("stepResult")
                .and_then(|step| string_field(step, "reason"))
                .or_else(|| string_field(payload, "finishReason"));
            MastraStreamEvent::Finish { run_id, reason }
        }
        EVENT_ERROR => MastraStreamEvent::Error {
            run_id,
            message: error_message(payload),
        },
        other => MastraStreamEvent::Unknown {
            event_type: other.to_string(),
            run_id,
        },
    })
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(ToString::to_string)
}

/// Returns the field unless it is absent or JSON `null`.
fn present_field(value: &Value, key: &str) -> Option<Value> {
    value.get(key).filter(|field| !field.is_null()).cloned()
}

fn error_message(payload: &Value) -> Option<String> {
    let error = payload.get("error")?;
    match error {
        Value::String(message) => Some(message.clone()),
        Value::Object(_) => string_field(error, "message"),
        _ => None,
    }
}
