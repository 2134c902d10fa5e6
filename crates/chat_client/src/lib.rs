//! Line-oriented terminal client for streaming agent chats.
//!
//! ## Source bootstrap
//!
//! - `CHAT_CLIENT_SOURCE=mock` (default) replays a scripted weather-agent
//!   conversation, no server needed
//! - `CHAT_CLIENT_SOURCE=mastra` streams from a Mastra agent server
//!
//! `CHAT_CLIENT_CONFIG_PATH` may point at a UTF-8 JSON file:
//!
//! ```json
//! {
//!   "base_url": "http://localhost:4111",
//!   "agent_id": "weather-agent",
//!   "thread_id": "1",
//!   "resource_id": "booker",
//!   "timeout_sec": 120,
//!   "render": "text"
//! }
//! ```
//!
//! All fields are optional; unknown fields are rejected. `MASTRA_API_URL`
//! overrides `base_url`. Set `CHAT_CLIENT_LOG` (an `EnvFilter` directive) for
//! diagnostics on stderr.

pub mod commands;
pub mod config;
pub mod logging;
pub mod render;
pub mod session;
pub mod sources;
