//! Interactive loop: reads prompts, drives turns, and streams the transcript.

use std::future::Future;
use std::io;

use agent_transcript::{TurnController, TurnOutcome};
use chunk_source::SourceProfile;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::commands::{parse_slash_command, SlashCommand, HELP_TEXT};
use crate::render::{RenderMode, TranscriptPrinter};

pub struct ChatSession<W> {
    controller: TurnController,
    printer: TranscriptPrinter,
    out: W,
}

impl<W> ChatSession<W>
where
    W: AsyncWrite + Unpin,
{
    pub fn new(controller: TurnController, mode: RenderMode, out: W) -> Self {
        Self {
            controller,
            printer: TranscriptPrinter::new(mode),
            out,
        }
    }

    pub fn controller(&self) -> &TurnController {
        &self.controller
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Writes the startup banner. JSON output stays machine-readable.
    pub async fn greet(&mut self, profile: &SourceProfile) -> io::Result<()> {
        if self.printer.mode() == RenderMode::Json {
            return Ok(());
        }
        let banner = format!(
            "Chatting with {} via {}. Type /help for commands.\n",
            profile.agent_id, profile.source_id
        );
        write_out(&mut self.out, &banner).await
    }

    /// Runs until `/quit`, end of input, or an interrupt while idle.
    ///
    /// `interrupt` is called for a fresh future each time the loop waits; the
    /// future resolves when the user asks to stop (Ctrl-C).
    pub async fn run<R, I, F>(&mut self, input: R, mut interrupt: I) -> io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        I: FnMut() -> F,
        F: Future<Output = ()>,
    {
        let mut lines = input.lines();

        loop {
            let line = tokio::select! {
                line = lines.next_line() => line?,
                () = interrupt() => None,
            };
            let Some(line) = line else {
                break;
            };

            match parse_slash_command(&line) {
                Some(SlashCommand::Help) => {
                    write_out(&mut self.out, HELP_TEXT).await?;
                    continue;
                }
                Some(SlashCommand::Quit) => break,
                Some(SlashCommand::Unknown(command)) => {
                    let message = format!("Unknown command {command}. Type /help for commands.\n");
                    write_out(&mut self.out, &message).await?;
                    continue;
                }
                None => {}
            }

            if line.trim().is_empty() {
                continue;
            }

            match self.run_turn(&line, &mut interrupt).await? {
                TurnOutcome::Failed { error } => {
                    write_out(&mut self.out, &format!("error: {error}\n")).await?;
                }
                TurnOutcome::Cancelled => write_out(&mut self.out, "(cancelled)\n").await?,
                TurnOutcome::Completed | TurnOutcome::Rejected => {}
            }
        }

        self.out.flush().await
    }

    async fn run_turn<I, F>(&mut self, text: &str, interrupt: &mut I) -> io::Result<TurnOutcome>
    where
        I: FnMut() -> F,
        F: Future<Output = ()>,
    {
        let controller = &self.controller;
        let mut updates = controller.subscribe();
        let submit = controller.submit(text);
        tokio::pin!(submit);

        let outcome = loop {
            tokio::select! {
                outcome = &mut submit => break outcome,
                Ok(()) = updates.changed() => {
                    let view = updates.borrow_and_update().clone();
                    let rendered = self.printer.render(&view);
                    write_out(&mut self.out, &rendered).await?;
                }
                () = interrupt() => {
                    controller.abort();
                }
            }
        };

        let rendered = self.printer.render(&controller.snapshot());
        write_out(&mut self.out, &rendered).await?;
        Ok(outcome)
    }
}

async fn write_out<W>(out: &mut W, text: &str) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    if text.is_empty() {
        return Ok(());
    }
    out.write_all(text.as_bytes()).await?;
    out.flush().await
}
