//! Ordered, append-only transcript with copy-on-write snapshots.
//!
//! A [`Transcript`] value is a snapshot: nothing reachable from it ever changes.
//! Producers derive the next snapshot through [`Transcript::upsert`], the only
//! operation that creates or replaces entries. Entry fields that are fixed after
//! creation (identity keys, tool names, user content) have no mutators at all;
//! the mutable accumulators are only writable from inside this crate.

use std::sync::Arc;

use serde::{Serialize, Serializer};
use serde_json::Value;
use uuid::Uuid;

/// Label used when a tool call is announced without a tool name.
pub const UNKNOWN_TOOL_NAME: &str = "unknown";

/// Lifecycle stage of a tool call. Ordered: `Streaming < Executing < Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolPhase {
    /// Arguments are still arriving as raw text.
    Streaming,
    /// Arguments are complete and the tool is running.
    Executing,
    /// A result has arrived.
    Done,
}

impl ToolPhase {
    /// Returns the later of `self` and `target`; phases never move backward.
    #[must_use]
    pub fn advanced_to(self, target: Self) -> Self {
        self.max(target)
    }

    /// Three-state indicator consumed by renderers.
    #[must_use]
    pub fn indicator(self) -> &'static str {
        match self {
            Self::Streaming => "input-streaming",
            Self::Executing => "input-available",
            Self::Done => "output-available",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserMessage {
    #[serde(rename = "id")]
    entry_id: String,
    content: String,
}

impl UserMessage {
    pub(crate) fn new(content: impl Into<String>) -> Self {
        Self {
            entry_id: Uuid::new_v4().to_string(),
            content: content.into(),
        }
    }

    pub fn entry_id(&self) -> &str {
        &self.entry_id
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

/// Accumulated assistant text for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantRun {
    run_id: String,
    content: String,
}

impl AssistantRun {
    pub(crate) fn new(run_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            content: content.into(),
        }
    }

    pub(crate) fn append(&mut self, text: &str) {
        self.content.push_str(text);
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

/// One tool invocation and its lifecycle state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCall {
    tool_call_id: String,
    run_id: String,
    tool_name: String,
    args_text: String,
    #[serde(rename = "args", skip_serializing_if = "Option::is_none")]
    parsed_args: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(rename = "status")]
    phase: ToolPhase,
}

/// Argument representation a consumer should display.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ToolArgs<'a> {
    Parsed(&'a Value),
    Raw(&'a str),
}

impl ToolCall {
    pub(crate) fn new(
        run_id: impl Into<String>,
        tool_call_id: impl Into<String>,
        tool_name: Option<&str>,
    ) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            run_id: run_id.into(),
            tool_name: tool_name
                .filter(|name| !name.is_empty())
                .unwrap_or(UNKNOWN_TOOL_NAME)
                .to_string(),
            args_text: String::new(),
            parsed_args: None,
            result: None,
            phase: ToolPhase::Streaming,
        }
    }

    pub(crate) fn append_args_text(&mut self, delta: &str) {
        self.args_text.push_str(delta);
    }

    pub(crate) fn set_parsed_args(&mut self, args: Option<Value>) {
        self.parsed_args = args;
    }

    pub(crate) fn set_result(&mut self, result: Option<Value>) {
        self.result = result;
    }

    pub(crate) fn advance_phase(&mut self, target: ToolPhase) {
        self.phase = self.phase.advanced_to(target);
    }

    pub fn tool_call_id(&self) -> &str {
        &self.tool_call_id
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn tool_name(&self) -> &str {
        &self.tool_name
    }

    /// Raw argument text exactly as streamed.
    pub fn args_text(&self) -> &str {
        &self.args_text
    }

    pub fn parsed_args(&self) -> Option<&Value> {
        self.parsed_args.as_ref()
    }

    pub fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }

    pub fn phase(&self) -> ToolPhase {
        self.phase
    }

    /// Parsed arguments once available, raw text before that.
    pub fn display_args(&self) -> ToolArgs<'_> {
        match &self.parsed_args {
            Some(parsed) => ToolArgs::Parsed(parsed),
            None => ToolArgs::Raw(&self.args_text),
        }
    }
}

/// Identity of an entry, used as its merge key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKey<'a> {
    UserMessage(&'a str),
    AssistantRun(&'a str),
    ToolCall(&'a str),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum TranscriptEntry {
    #[serde(rename = "user-message")]
    UserMessage(UserMessage),
    #[serde(rename = "assistant-text")]
    AssistantRun(AssistantRun),
    #[serde(rename = "tool-call")]
    ToolCall(ToolCall),
}

impl TranscriptEntry {
    pub fn key(&self) -> EntryKey<'_> {
        match self {
            Self::UserMessage(message) => EntryKey::UserMessage(message.entry_id()),
            Self::AssistantRun(run) => EntryKey::AssistantRun(run.run_id()),
            Self::ToolCall(call) => EntryKey::ToolCall(call.tool_call_id()),
        }
    }

    pub fn as_user_message(&self) -> Option<&UserMessage> {
        match self {
            Self::UserMessage(message) => Some(message),
            _ => None,
        }
    }

    pub fn as_assistant_run(&self) -> Option<&AssistantRun> {
        match self {
            Self::AssistantRun(run) => Some(run),
            _ => None,
        }
    }

    pub fn as_tool_call(&self) -> Option<&ToolCall> {
        match self {
            Self::ToolCall(call) => Some(call),
            _ => None,
        }
    }
}

/// Immutable snapshot of the ordered transcript.
///
/// Cloning is cheap: snapshots share unchanged entries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transcript {
    entries: Arc<Vec<Arc<TranscriptEntry>>>,
}

impl Transcript {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&TranscriptEntry> {
        self.entries.get(index).map(Arc::as_ref)
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &TranscriptEntry> + '_ {
        self.entries.iter().map(Arc::as_ref)
    }

    /// Returns the last entry with identity `key`.
    pub fn find(&self, key: EntryKey<'_>) -> Option<&TranscriptEntry> {
        self.iter().rev().find(|entry| entry.key() == key)
    }

    pub fn tool_call(&self, tool_call_id: &str) -> Option<&ToolCall> {
        self.find(EntryKey::ToolCall(tool_call_id))
            .and_then(TranscriptEntry::as_tool_call)
    }

    pub fn assistant_run(&self, run_id: &str) -> Option<&AssistantRun> {
        self.find(EntryKey::AssistantRun(run_id))
            .and_then(TranscriptEntry::as_assistant_run)
    }

    /// Returns true when both snapshots are the same allocation.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.entries, &other.entries)
    }

    /// Returns true when the entry at `index` is shared with `previous`, i.e.
    /// no upsert between the two snapshots touched it.
    pub fn shares_entry(&self, previous: &Self, index: usize) -> bool {
        match (self.entries.get(index), previous.entries.get(index)) {
            (Some(current), Some(prior)) => Arc::ptr_eq(current, prior),
            _ => false,
        }
    }

    /// Derives the next snapshot.
    ///
    /// Finds the last entry satisfying `matches`; when found it is replaced by
    /// `update(existing)`, otherwise `create()` is appended. `self` is left
    /// untouched.
    #[must_use]
    pub fn upsert<M, C, U>(&self, matches: M, create: C, update: U) -> Self
    where
        M: Fn(&TranscriptEntry) -> bool,
        C: FnOnce() -> TranscriptEntry,
        U: FnOnce(&TranscriptEntry) -> TranscriptEntry,
    {
        let mut entries = self.entries.as_ref().clone();

        match entries.iter().rposition(|entry| matches(entry)) {
            Some(index) => {
                let next = update(&entries[index]);
                entries[index] = Arc::new(next);
            }
            None => entries.push(Arc::new(create())),
        }

        Self {
            entries: Arc::new(entries),
        }
    }

    /// Appends a fresh user message. Its identifier is newly generated, so the
    /// match never succeeds.
    #[must_use]
    pub fn push_user_message(&self, content: impl Into<String>) -> Self {
        let message = UserMessage::new(content);
        let entry_id = message.entry_id().to_string();
        self.upsert(
            |entry| entry.key() == EntryKey::UserMessage(&entry_id),
            || TranscriptEntry::UserMessage(message),
            Clone::clone,
        )
    }
}

impl Serialize for Transcript {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(self.iter())
    }
}
