use serde_json::Value;

pub const EVENT_TEXT_DELTA: &str = "text-delta";
pub const EVENT_TOOL_CALL_INPUT_STREAMING_START: &str = "tool-call-input-streaming-start";
pub const EVENT_TOOL_CALL_DELTA: &str = "tool-call-delta";
pub const EVENT_TOOL_CALL: &str = "tool-call";
pub const EVENT_TOOL_RESULT: &str = "tool-result";
pub const EVENT_FINISH: &str = "finish";
pub const EVENT_ERROR: &str = "error";

/// Stream chunk emitted by the parser after normalization.
///
/// Payload fields are optional because the server may omit any of them;
/// consumers decide on defaults.
#[derive(Debug, Clone, PartialEq)]
pub enum MastraStreamEvent {
    TextDelta {
        run_id: Option<String>,
        text: Option<String>,
    },
    ToolCallInputStreamingStart {
        run_id: Option<String>,
        tool_call_id: Option<String>,
        tool_name: Option<String>,
    },
    ToolCallDelta {
        run_id: Option<String>,
        tool_call_id: Option<String>,
        args_text_delta: Option<String>,
    },
    /// Arguments are complete; the tool is about to execute.
    ToolCall {
        run_id: Option<String>,
        tool_call_id: Option<String>,
        tool_name: Option<String>,
        args: Option<Value>,
    },
    ToolResult {
        run_id: Option<String>,
        tool_call_id: Option<String>,
        tool_name: Option<String>,
        result: Option<Value>,
        is_error: bool,
    },
    Finish {
        run_id: Option<String>,
        reason: Option<String>,
    },
    Error {
        run_id: Option<String>,
        message: Option<String>,
    },
    /// Chunk type retained for passthrough; carries no transcript content.
    Unknown {
        event_type: String,
        run_id: Option<String>,
    },
}

impl MastraStreamEvent {
    /// Wire `type` of the chunk.
    pub fn event_type(&self) -> &str {
        match self {
            Self::TextDelta { .. } => EVENT_TEXT_DELTA,
            Self::ToolCallInputStreamingStart { .. } => EVENT_TOOL_CALL_INPUT_STREAMING_START,
            Self::ToolCallDelta { .. } => EVENT_TOOL_CALL_DELTA,
            Self::ToolCall { .. } => EVENT_TOOL_CALL,
            Self::ToolResult { .. } => EVENT_TOOL_RESULT,
            Self::Finish { .. } => EVENT_FINISH,
            Self::Error { .. } => EVENT_ERROR,
            Self::Unknown { event_type, .. } => event_type,
        }
    }

    pub fn run_id(&self) -> Option<&str> {
        match self {
            Self::TextDelta { run_id, .. }
            | Self::ToolCallInputStreamingStart { run_id, .. }
            | Self::ToolCallDelta { run_id, .. }
            | Self::ToolCall { run_id, .. }
            | Self::ToolResult { run_id, .. }
            | Self::Finish { run_id, .. }
            | Self::Error { run_id, .. }
            | Self::Unknown { run_id, .. } => run_id.as_deref(),
        }
    }

    /// Returns true for chunks that end the agent's response.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finish { .. } | Self::Error { .. })
    }
}
