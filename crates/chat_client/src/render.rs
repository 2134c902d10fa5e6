//! Incremental line-oriented rendering of transcript snapshots.
//!
//! A terminal cannot rewrite earlier lines, so the printer remembers what it
//! already wrote per entry and emits only the new part of each snapshot:
//! appended assistant text, and one line per tool-call phase.

use agent_transcript::{
    ToolArgs, ToolCall, ToolPhase, Transcript, TranscriptEntry, TranscriptView, TurnState,
};
use serde::Deserialize;
use tracing::warn;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    /// Human-readable transcript.
    #[default]
    Text,
    /// One JSON object per created or changed entry.
    Json,
}

#[derive(Debug, Clone, Copy, Default)]
struct Printed {
    text_len: usize,
    phase: Option<ToolPhase>,
}

#[derive(Debug)]
pub struct TranscriptPrinter {
    mode: RenderMode,
    previous: Transcript,
    printed: Vec<Printed>,
    /// Entry whose text the current output line continues.
    cursor: Option<usize>,
    mid_line: bool,
}

impl TranscriptPrinter {
    pub fn new(mode: RenderMode) -> Self {
        Self {
            mode,
            previous: Transcript::new(),
            printed: Vec::new(),
            cursor: None,
            mid_line: false,
        }
    }

    pub fn mode(&self) -> RenderMode {
        self.mode
    }

    /// Returns the output needed to bring the terminal up to `view`.
    pub fn render(&mut self, view: &TranscriptView) -> String {
        let transcript = &view.transcript;
        let mut out = String::new();

        for (index, entry) in transcript.iter().enumerate() {
            if transcript.shares_entry(&self.previous, index) {
                continue;
            }
            if self.printed.len() <= index {
                self.printed.resize(index + 1, Printed::default());
            }

            match self.mode {
                RenderMode::Json => self.render_json(entry, &mut out),
                RenderMode::Text => self.render_text(index, entry, &mut out),
            }
        }

        if view.state == TurnState::Idle {
            self.end_line(&mut out);
        }

        self.previous = transcript.clone();
        out
    }

    fn render_json(&self, entry: &TranscriptEntry, out: &mut String) {
        match serde_json::to_string(entry) {
            Ok(line) => {
                out.push_str(&line);
                out.push('\n');
            }
            Err(error) => warn!(%error, "failed to serialize transcript entry"),
        }
    }

    fn render_text(&mut self, index: usize, entry: &TranscriptEntry, out: &mut String) {
        match entry {
            TranscriptEntry::UserMessage(message) => {
                if self.printed[index].text_len > 0 {
                    return;
                }
                self.end_line(out);
                out.push_str("you> ");
                out.push_str(message.content());
                out.push('\n');
                self.printed[index].text_len = message.content().len().max(1);
            }
            TranscriptEntry::AssistantRun(run) => {
                let printed = self.printed[index].text_len;
                let Some(delta) = run.content().get(printed..).filter(|delta| !delta.is_empty())
                else {
                    return;
                };

                self.printed[index].text_len = run.content().len();

                let mut delta = delta;
                if self.cursor != Some(index) {
                    // A run resuming on a fresh line drops the spacing that
                    // joined it to its earlier text.
                    if printed > 0 {
                        delta = delta.trim_start();
                        if delta.is_empty() {
                            return;
                        }
                    }
                    self.end_line(out);
                    out.push_str("agent> ");
                }
                out.push_str(delta);
                self.cursor = Some(index);
                self.mid_line = !delta.ends_with('\n');
            }
            TranscriptEntry::ToolCall(call) => {
                if self.printed[index].phase == Some(call.phase()) {
                    return;
                }
                self.end_line(out);
                out.push_str(&tool_call_line(call));
                out.push('\n');
                self.printed[index].phase = Some(call.phase());
            }
        }
    }

    fn end_line(&mut self, out: &mut String) {
        if self.mid_line {
            out.push('\n');
        }
        self.mid_line = false;
        self.cursor = None;
    }
}

fn tool_call_line(call: &ToolCall) -> String {
    let detail = match call.phase() {
        ToolPhase::Streaming => String::new(),
        ToolPhase::Executing => match call.display_args() {
            ToolArgs::Parsed(args) => args.to_string(),
            ToolArgs::Raw(text) => text.to_string(),
        },
        ToolPhase::Done => call
            .result()
            .map(ToString::to_string)
            .unwrap_or_else(|| "(no result)".to_string()),
    };

    let line = format!("[{}] {}", call.phase().indicator(), call.tool_name());
    if detail.is_empty() {
        line
    } else {
        format!("{line} {detail}")
    }
}
