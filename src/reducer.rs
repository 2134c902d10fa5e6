//! Chunk-to-transcript reducer.
//!
//! [`reduce`] is pure: it never mutates the input snapshot and every rule goes
//! through [`Transcript::upsert`]. Each chunk kind maps to exactly one rule;
//! unknown kinds and tool chunks without an identifier leave the transcript as
//! it was.

use chunk_source::{Chunk, ChunkKind};
use tracing::{debug, warn};

use crate::transcript::{
    AssistantRun, EntryKey, ToolCall, ToolPhase, Transcript, TranscriptEntry,
};

/// Applies one chunk to `transcript` and returns the next snapshot.
#[must_use]
pub fn reduce(transcript: &Transcript, chunk: &Chunk) -> Transcript {
    let run_id = chunk.run_id.as_str();

    match &chunk.kind {
        ChunkKind::TextDelta { text } => {
            append_text(transcript, run_id, text.as_deref().unwrap_or_default())
        }
        ChunkKind::ToolCallStarted {
            tool_call_id,
            tool_name,
        } => {
            let Some(tool_call_id) = tool_call_id_or_warn(chunk, tool_call_id.as_deref()) else {
                return transcript.clone();
            };
            if transcript.tool_call(tool_call_id).is_some() {
                debug!(tool_call_id, "tool call already present; start ignored");
                return transcript.clone();
            }
            upsert_tool_call(transcript, run_id, tool_call_id, tool_name.as_deref(), |_| {})
        }
        ChunkKind::ToolArgsDelta {
            tool_call_id,
            args_text_delta,
        } => {
            let Some(tool_call_id) = tool_call_id_or_warn(chunk, tool_call_id.as_deref()) else {
                return transcript.clone();
            };
            let delta = args_text_delta.as_deref().unwrap_or_default();
            upsert_tool_call(transcript, run_id, tool_call_id, None, |call| {
                call.append_args_text(delta);
            })
        }
        ChunkKind::ToolArgsComplete {
            tool_call_id,
            tool_name,
            args,
        } => {
            let Some(tool_call_id) = tool_call_id_or_warn(chunk, tool_call_id.as_deref()) else {
                return transcript.clone();
            };
            upsert_tool_call(
                transcript,
                run_id,
                tool_call_id,
                tool_name.as_deref(),
                |call| {
                    if args.is_some() {
                        call.set_parsed_args(args.clone());
                    }
                    call.advance_phase(ToolPhase::Executing);
                },
            )
        }
        ChunkKind::ToolResult {
            tool_call_id,
            tool_name,
            result,
        } => {
            let Some(tool_call_id) = tool_call_id_or_warn(chunk, tool_call_id.as_deref()) else {
                return transcript.clone();
            };
            upsert_tool_call(
                transcript,
                run_id,
                tool_call_id,
                tool_name.as_deref(),
                |call| {
                    if result.is_some() {
                        call.set_result(result.clone());
                    }
                    call.advance_phase(ToolPhase::Done);
                },
            )
        }
        ChunkKind::Unknown { chunk_type } => {
            debug!(chunk_type = chunk_type.as_str(), "ignoring unrecognized chunk");
            transcript.clone()
        }
    }
}

/// Folds `chunks` in order, starting from `transcript`.
#[must_use]
pub fn reduce_all<'a, I>(transcript: &Transcript, chunks: I) -> Transcript
where
    I: IntoIterator<Item = &'a Chunk>,
{
    chunks
        .into_iter()
        .fold(transcript.clone(), |current, chunk| reduce(&current, chunk))
}

fn append_text(transcript: &Transcript, run_id: &str, text: &str) -> Transcript {
    transcript.upsert(
        |entry| entry.key() == EntryKey::AssistantRun(run_id),
        || TranscriptEntry::AssistantRun(AssistantRun::new(run_id, text)),
        |existing| {
            let mut updated = existing.clone();
            if let TranscriptEntry::AssistantRun(run) = &mut updated {
                run.append(text);
            }
            updated
        },
    )
}

/// Updates the tool call keyed by `tool_call_id`, creating it first when the
/// stream never announced it.
fn upsert_tool_call<F>(
    transcript: &Transcript,
    run_id: &str,
    tool_call_id: &str,
    tool_name: Option<&str>,
    apply: F,
) -> Transcript
where
    F: Fn(&mut ToolCall),
{
    transcript.upsert(
        |entry| entry.key() == EntryKey::ToolCall(tool_call_id),
        || {
            let mut call = ToolCall::new(run_id, tool_call_id, tool_name);
            apply(&mut call);
            TranscriptEntry::ToolCall(call)
        },
        |existing| {
            let mut updated = existing.clone();
            if let TranscriptEntry::ToolCall(call) = &mut updated {
                apply(call);
            }
            updated
        },
    )
}

fn tool_call_id_or_warn<'a>(chunk: &Chunk, tool_call_id: Option<&'a str>) -> Option<&'a str> {
    if tool_call_id.is_none() {
        warn!(
            chunk_type = chunk.kind.label(),
            run_id = chunk.run_id.as_str(),
            "dropping tool chunk without a tool call id"
        );
    }
    tool_call_id
}
