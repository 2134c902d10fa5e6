//! Transport-only client for a Mastra agent server's streaming endpoint.
//!
//! This crate owns request building, SSE framing, and chunk-payload parsing for
//! `POST /api/agents/{agent_id}/stream`. It contains no transcript logic and no
//! UI coupling; callers receive normalized [`MastraStreamEvent`] values in wire
//! order.
//!
//! One request is made per stream. Failed streams are reported, never retried.

pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod headers;
pub mod payload;
pub mod sse;
pub mod url;

pub use client::{CancellationSignal, EventStream, MastraApiClient, StreamResult};
pub use config::MastraApiConfig;
pub use error::MastraApiError;
pub use events::MastraStreamEvent;
pub use payload::{AgentStreamRequest, MemoryOptions};
pub use sse::SseStreamParser;
pub use url::agent_stream_url;
