//! Deterministic scripted implementation of the `chunk_source` contract.
//!
//! This crate contains no transport logic and is intended for local
//! development and controller-level integration testing.

use std::collections::VecDeque;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chunk_source::{
    CancelSignal, Chunk, ChunkSource, ChunkSourceError, ChunkStream, SourceProfile, TurnRequest,
};
use futures_util::{stream, StreamExt};
use serde_json::json;

/// Stable source identifier used for explicit startup selection.
pub const MOCK_SOURCE_ID: &str = "mock";

const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// One scripted action replayed by [`MockChunkSource`].
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptStep {
    Chunk(Chunk),
    Delay(Duration),
    /// Ends the stream with a transport error.
    Fail(String),
    /// Delivers nothing more until the turn is cancelled.
    Hang,
}

type ScriptFn = dyn Fn(&TurnRequest) -> Vec<ScriptStep> + Send + Sync;

/// Scripted chunk source used by tests and offline runs.
pub struct MockChunkSource {
    agent_id: String,
    script: Arc<ScriptFn>,
    chunk_delay: Duration,
    requests: Mutex<Vec<TurnRequest>>,
}

impl MockChunkSource {
    /// Replays the same `steps` on every turn.
    #[must_use]
    pub fn new(steps: Vec<ScriptStep>) -> Self {
        Self::with_script(move |_| steps.clone())
    }

    /// Replays `chunks` without delays on every turn.
    #[must_use]
    pub fn from_chunks(chunks: Vec<Chunk>) -> Self {
        Self::new(chunks.into_iter().map(ScriptStep::Chunk).collect())
    }

    /// Builds each turn's steps from its request.
    #[must_use]
    pub fn with_script<F>(script: F) -> Self
    where
        F: Fn(&TurnRequest) -> Vec<ScriptStep> + Send + Sync + 'static,
    {
        Self {
            agent_id: "mock-agent".to_string(),
            script: Arc::new(script),
            chunk_delay: Duration::ZERO,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Weather-agent conversation with a full tool-call lifecycle, paced like
    /// a live stream. Run and tool-call ids are unique per turn.
    #[must_use]
    pub fn weather_demo() -> Self {
        Self::with_script(weather_demo_script)
            .with_agent_id("weather-agent")
            .with_chunk_delay(Duration::from_millis(Self::CHUNK_DELAY_MS))
    }

    #[must_use]
    pub fn with_agent_id(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = agent_id.into();
        self
    }

    /// Pause inserted before every chunk.
    #[must_use]
    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = delay;
        self
    }

    /// Requests received so far, in order.
    pub fn requests(&self) -> Vec<TurnRequest> {
        lock_unpoisoned(&self.requests).clone()
    }

    const CHUNK_DELAY_MS: u64 = 50;
}

impl Default for MockChunkSource {
    fn default() -> Self {
        Self::weather_demo()
    }
}

impl ChunkSource for MockChunkSource {
    fn profile(&self) -> SourceProfile {
        SourceProfile {
            source_id: MOCK_SOURCE_ID.to_string(),
            agent_id: self.agent_id.clone(),
        }
    }

    fn open(&self, request: TurnRequest, cancel: CancelSignal) -> ChunkStream {
        let steps: VecDeque<ScriptStep> = (self.script)(&request).into();
        lock_unpoisoned(&self.requests).push(request);

        let playback = Playback {
            steps,
            cancel,
            chunk_delay: self.chunk_delay,
        };
        stream::unfold(playback, Playback::next_item).boxed()
    }
}

struct Playback {
    steps: VecDeque<ScriptStep>,
    cancel: CancelSignal,
    chunk_delay: Duration,
}

impl Playback {
    async fn next_item(mut self) -> Option<(Result<Chunk, ChunkSourceError>, Self)> {
        loop {
            if self.is_cancelled() {
                return None;
            }

            match self.steps.pop_front()? {
                ScriptStep::Chunk(chunk) => {
                    self.pause(self.chunk_delay).await;
                    if self.is_cancelled() {
                        return None;
                    }
                    return Some((Ok(chunk), self));
                }
                ScriptStep::Delay(delay) => self.pause(delay).await,
                ScriptStep::Fail(message) => {
                    self.steps.clear();
                    return Some((Err(ChunkSourceError::new(message)), self));
                }
                ScriptStep::Hang => {
                    while !self.is_cancelled() {
                        tokio::time::sleep(CANCEL_POLL_INTERVAL).await;
                    }
                    return None;
                }
            }
        }
    }

    /// Sleeps for `delay`, waking early when the turn is cancelled.
    async fn pause(&self, delay: Duration) {
        let mut remaining = delay;
        while !remaining.is_zero() && !self.is_cancelled() {
            let step = remaining.min(CANCEL_POLL_INTERVAL);
            tokio::time::sleep(step).await;
            remaining = remaining.saturating_sub(step);
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }
}

fn weather_demo_script(request: &TurnRequest) -> Vec<ScriptStep> {
    let run_id = format!("mock-run-{}", request.turn_id);
    let call_id = format!("mock-call-{}", request.turn_id);

    let chunks = vec![
        Chunk::text(&run_id, "Let me check "),
        Chunk::text(&run_id, "the current weather for you.\n"),
        Chunk::tool_call_started(&run_id, &call_id, "get_weather"),
        Chunk::tool_args_delta(&run_id, &call_id, "{\"location\":"),
        Chunk::tool_args_delta(&run_id, &call_id, "\"London\"}"),
        Chunk::tool_args_complete(&run_id, &call_id, json!({"location": "London"})),
        Chunk::tool_result(
            &run_id,
            &call_id,
            json!({
                "location": "London",
                "temperature": 14,
                "feelsLike": 12,
                "humidity": 82,
                "windSpeed": 19,
                "conditions": "Light rain"
            }),
        ),
        Chunk::text(&run_id, "It's currently 14°C in London "),
        Chunk::text(&run_id, "with light rain, "),
        Chunk::text(&run_id, "82% humidity and winds around 19 km/h."),
    ];

    chunks.into_iter().map(ScriptStep::Chunk).collect()
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
