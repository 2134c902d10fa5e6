//! Incremental transcript assembler for streaming agent chats.
//!
//! An agent backend streams typed chunks (text fragments, tool-call lifecycle
//! steps, tool results). This crate folds them into an ordered, append-only
//! transcript that renderers can read at any time without observing a
//! half-applied chunk.
//!
//! # Public API Overview
//! - [`Transcript`] holds the ordered entries; [`Transcript::upsert`] is the
//!   single mutation primitive and always returns a new snapshot.
//! - [`reduce`] applies one [`Chunk`] to a snapshot.
//! - [`TurnController`] runs one user turn against a [`ChunkSource`], publishes
//!   a [`TranscriptView`] after every chunk, and handles cancellation.
//!
//! Transport implementations live in sibling crates (`chunk_source_mastra`,
//! `chunk_source_mock`); this crate only depends on the `chunk_source`
//! contract.

pub mod controller;
pub mod reducer;
pub mod transcript;

pub use chunk_source::{CancelSignal, Chunk, ChunkKind, ChunkSource, ChunkSourceError, TurnId};

pub use crate::controller::{TranscriptView, TurnController, TurnOutcome, TurnState};
pub use crate::reducer::{reduce, reduce_all};
pub use crate::transcript::{
    AssistantRun, EntryKey, ToolArgs, ToolCall, ToolPhase, Transcript, TranscriptEntry,
    UserMessage, UNKNOWN_TOOL_NAME,
};
