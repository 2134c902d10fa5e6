//! Turn orchestration: one submitted prompt through completion or cancellation.
//!
//! The controller is the transcript's only writer. A turn's chunk stream is
//! drained by a single loop inside [`TurnController::submit`]; each chunk is
//! reduced and the resulting snapshot published before the next one is awaited.
//! Readers subscribe to a `watch` channel and only ever see whole snapshots.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chunk_source::{new_cancel_signal, CancelSignal, ChunkSource, TurnId, TurnRequest};
use futures_util::StreamExt;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::reducer::reduce;
use crate::transcript::Transcript;

const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Controller state as seen by renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Idle,
    Busy,
    Cancelling,
}

impl TurnState {
    /// True while a turn owns the transcript.
    pub fn is_active(self) -> bool {
        !matches!(self, Self::Idle)
    }
}

/// Snapshot published after every transcript or state change.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptView {
    pub transcript: Transcript,
    pub state: TurnState,
    /// Most recent turn, if any was ever started.
    pub turn_id: Option<TurnId>,
}

/// How a call to [`TurnController::submit`] ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Empty prompt or another turn in flight; nothing changed.
    Rejected,
    Completed,
    /// The transport failed. The transcript keeps whatever arrived.
    Failed { error: String },
    Cancelled,
}

struct ActiveTurn {
    turn_id: TurnId,
    cancel: CancelSignal,
}

pub struct TurnController {
    source: Arc<dyn ChunkSource>,
    view: watch::Sender<TranscriptView>,
    active_turn: Mutex<Option<ActiveTurn>>,
    next_turn_id: AtomicU64,
}

impl TurnController {
    pub fn new(source: Arc<dyn ChunkSource>) -> Self {
        let (view, _) = watch::channel(TranscriptView {
            transcript: Transcript::new(),
            state: TurnState::Idle,
            turn_id: None,
        });

        Self {
            source,
            view,
            active_turn: Mutex::new(None),
            next_turn_id: AtomicU64::new(1),
        }
    }

    /// Returns a receiver that observes every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<TranscriptView> {
        self.view.subscribe()
    }

    /// Returns the latest published snapshot.
    pub fn snapshot(&self) -> TranscriptView {
        self.view.borrow().clone()
    }

    pub fn transcript(&self) -> Transcript {
        self.view.borrow().transcript.clone()
    }

    pub fn state(&self) -> TurnState {
        self.view.borrow().state
    }

    /// Runs one turn to its end.
    ///
    /// The user entry is published before the stream is opened. A submit while
    /// another turn is active, or with blank text, returns
    /// [`TurnOutcome::Rejected`] without touching the transcript.
    pub async fn submit(&self, text: &str) -> TurnOutcome {
        if text.trim().is_empty() {
            return TurnOutcome::Rejected;
        }

        let Some((turn_id, cancel)) = self.begin_turn(text) else {
            debug!("submit ignored while a turn is active");
            return TurnOutcome::Rejected;
        };
        info!(turn_id, "turn started");

        let outcome = self.drive(turn_id, text, &cancel).await;
        self.end_turn(turn_id);

        match &outcome {
            TurnOutcome::Failed { error } => warn!(turn_id, error = error.as_str(), "turn failed"),
            other => info!(turn_id, outcome = ?other, "turn finished"),
        }
        outcome
    }

    /// Requests cancellation of the active turn.
    ///
    /// Returns false when no turn is active or cancellation was already
    /// requested. Already applied chunks stay in the transcript.
    pub fn abort(&self) -> bool {
        let active_turn = self.lock_active_turn();
        let Some(active) = active_turn.as_ref() else {
            return false;
        };
        if active.cancel.swap(true, Ordering::SeqCst) {
            return false;
        }

        debug!(turn_id = active.turn_id, "turn cancellation requested");
        self.view.send_modify(|view| view.state = TurnState::Cancelling);
        true
    }

    fn begin_turn(&self, text: &str) -> Option<(TurnId, CancelSignal)> {
        let mut active_turn = self.lock_active_turn();
        if active_turn.is_some() {
            return None;
        }

        let turn_id = self.next_turn_id.fetch_add(1, Ordering::SeqCst);
        let cancel = new_cancel_signal();
        *active_turn = Some(ActiveTurn {
            turn_id,
            cancel: Arc::clone(&cancel),
        });

        self.view.send_modify(|view| {
            view.transcript = view.transcript.push_user_message(text);
            view.state = TurnState::Busy;
            view.turn_id = Some(turn_id);
        });

        Some((turn_id, cancel))
    }

    async fn drive(&self, turn_id: TurnId, text: &str, cancel: &CancelSignal) -> TurnOutcome {
        let request = TurnRequest {
            turn_id,
            prompt: text.to_string(),
        };
        let mut chunks = self.source.open(request, Arc::clone(cancel));

        loop {
            let Some(next) = await_or_cancel(chunks.next(), cancel).await else {
                return TurnOutcome::Cancelled;
            };
            // Anything delivered after the abort request is dropped, including
            // the transport's own cancellation error.
            if is_cancelled(cancel) {
                return TurnOutcome::Cancelled;
            }

            match next {
                None => return TurnOutcome::Completed,
                Some(Err(error)) => {
                    return TurnOutcome::Failed {
                        error: error.to_string(),
                    }
                }
                Some(Ok(chunk)) => {
                    self.view.send_modify(|view| {
                        view.transcript = reduce(&view.transcript, &chunk);
                    });
                }
            }
        }
    }

    fn end_turn(&self, turn_id: TurnId) {
        let mut active_turn = self.lock_active_turn();
        if active_turn.as_ref().map(|active| active.turn_id) == Some(turn_id) {
            active_turn.take();
        }
        self.view.send_modify(|view| view.state = TurnState::Idle);
    }

    fn lock_active_turn(&self) -> MutexGuard<'_, Option<ActiveTurn>> {
        lock_unpoisoned(&self.active_turn)
    }
}

fn is_cancelled(cancel: &CancelSignal) -> bool {
    cancel.load(Ordering::Acquire)
}

/// Awaits `future` unless `cancel` is raised first; returns `None` on cancel.
async fn await_or_cancel<F>(future: F, cancel: &CancelSignal) -> Option<F::Output>
where
    F: Future,
{
    let mut future = Box::pin(future);

    loop {
        if is_cancelled(cancel) {
            return None;
        }

        if let Ok(output) = tokio::time::timeout(CANCEL_POLL_INTERVAL, &mut future).await {
            return Some(output);
        }
    }
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
