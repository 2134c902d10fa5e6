//! Transport-agnostic contract for streaming one agent turn as chunk records.
//!
//! This crate defines only the chunk record shapes and the producer trait the
//! transcript assembler consumes. It excludes wire formats, HTTP details, and
//! transcript folding.

use std::fmt;
use std::sync::{atomic::AtomicBool, Arc};

use futures_util::stream::BoxStream;
use serde_json::Value;

/// Identifier for one submitted turn.
pub type TurnId = u64;

/// Shared cancellation flag for a turn.
///
/// The turn controller raises it; sources poll it between deliveries and stop
/// producing chunks once it is set.
pub type CancelSignal = Arc<AtomicBool>;

/// Ordered chunk sequence for one turn.
pub type ChunkStream = BoxStream<'static, Result<Chunk, ChunkSourceError>>;

/// Creates a fresh, unraised cancellation signal.
#[must_use]
pub fn new_cancel_signal() -> CancelSignal {
    Arc::new(AtomicBool::new(false))
}

/// Error reported by a chunk source while opening or draining a stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkSourceError {
    message: String,
}

impl ChunkSourceError {
    /// Creates a new chunk source error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the underlying error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ChunkSourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ChunkSourceError {}

impl From<String> for ChunkSourceError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for ChunkSourceError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// One atomic event of the agent's streaming protocol.
///
/// Every field beyond the kind tag is optional on the wire; consumers are
/// expected to substitute safe defaults rather than reject the chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    /// Run the chunk belongs to. Missing on the wire means the empty run.
    pub run_id: String,
    pub kind: ChunkKind,
}

impl Chunk {
    #[must_use]
    pub fn new(run_id: impl Into<String>, kind: ChunkKind) -> Self {
        Self {
            run_id: run_id.into(),
            kind,
        }
    }

    /// Text fragment for `run_id`.
    #[must_use]
    pub fn text(run_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(
            run_id,
            ChunkKind::TextDelta {
                text: Some(text.into()),
            },
        )
    }

    /// Tool call announced with an empty argument buffer.
    #[must_use]
    pub fn tool_call_started(
        run_id: impl Into<String>,
        tool_call_id: impl Into<String>,
        tool_name: impl Into<String>,
    ) -> Self {
        Self::new(
            run_id,
            ChunkKind::ToolCallStarted {
                tool_call_id: Some(tool_call_id.into()),
                tool_name: Some(tool_name.into()),
            },
        )
    }

    /// Raw JSON text appended to a tool call's argument buffer.
    #[must_use]
    pub fn tool_args_delta(
        run_id: impl Into<String>,
        tool_call_id: impl Into<String>,
        args_text_delta: impl Into<String>,
    ) -> Self {
        Self::new(
            run_id,
            ChunkKind::ToolArgsDelta {
                tool_call_id: Some(tool_call_id.into()),
                args_text_delta: Some(args_text_delta.into()),
            },
        )
    }

    /// Parsed tool arguments; the tool is now executing.
    #[must_use]
    pub fn tool_args_complete(
        run_id: impl Into<String>,
        tool_call_id: impl Into<String>,
        args: impl Into<Value>,
    ) -> Self {
        Self::new(
            run_id,
            ChunkKind::ToolArgsComplete {
                tool_call_id: Some(tool_call_id.into()),
                tool_name: None,
                args: Some(args.into()),
            },
        )
    }

    /// Tool execution result.
    #[must_use]
    pub fn tool_result(
        run_id: impl Into<String>,
        tool_call_id: impl Into<String>,
        result: impl Into<Value>,
    ) -> Self {
        Self::new(
            run_id,
            ChunkKind::ToolResult {
                tool_call_id: Some(tool_call_id.into()),
                tool_name: None,
                result: Some(result.into()),
            },
        )
    }
}

/// Kind-specific payload of a [`Chunk`].
#[derive(Debug, Clone, PartialEq)]
pub enum ChunkKind {
    TextDelta {
        text: Option<String>,
    },
    ToolCallStarted {
        tool_call_id: Option<String>,
        tool_name: Option<String>,
    },
    ToolArgsDelta {
        tool_call_id: Option<String>,
        args_text_delta: Option<String>,
    },
    ToolArgsComplete {
        tool_call_id: Option<String>,
        tool_name: Option<String>,
        args: Option<Value>,
    },
    ToolResult {
        tool_call_id: Option<String>,
        tool_name: Option<String>,
        result: Option<Value>,
    },
    /// Chunk type this contract does not know about yet.
    Unknown { chunk_type: String },
}

impl ChunkKind {
    /// Returns the tool call identifier for tool lifecycle chunks.
    #[must_use]
    pub fn tool_call_id(&self) -> Option<&str> {
        match self {
            Self::ToolCallStarted { tool_call_id, .. }
            | Self::ToolArgsDelta { tool_call_id, .. }
            | Self::ToolArgsComplete { tool_call_id, .. }
            | Self::ToolResult { tool_call_id, .. } => tool_call_id.as_deref(),
            Self::TextDelta { .. } | Self::Unknown { .. } => None,
        }
    }

    /// Returns a short stable label for logs.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::TextDelta { .. } => "text-delta",
            Self::ToolCallStarted { .. } => "tool-call-started",
            Self::ToolArgsDelta { .. } => "tool-args-delta",
            Self::ToolArgsComplete { .. } => "tool-args-complete",
            Self::ToolResult { .. } => "tool-result",
            Self::Unknown { chunk_type } => chunk_type,
        }
    }
}

/// Input required to open a turn stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnRequest {
    pub turn_id: TurnId,
    pub prompt: String,
}

/// Immutable metadata describing a chunk source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceProfile {
    pub source_id: String,
    pub agent_id: String,
}

/// Producer of chunk records for one turn.
pub trait ChunkSource: Send + Sync + 'static {
    /// Returns source/agent identity metadata.
    fn profile(&self) -> SourceProfile;

    /// Opens the chunk stream for `request`.
    ///
    /// Chunks are yielded in send order, each at most once. Failures to open
    /// the underlying transport surface as the first stream item. Once `cancel`
    /// is raised the stream must eventually end.
    fn open(&self, request: TurnRequest, cancel: CancelSignal) -> ChunkStream;
}
