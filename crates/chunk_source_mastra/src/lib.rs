//! Mastra agent server implementation of the `chunk_source` contract.
//!
//! This adapter opens one `mastra_api` event stream per turn and translates
//! each stream event into a transport-agnostic [`Chunk`].

use std::sync::Arc;
use std::time::Duration;

use chunk_source::{
    CancelSignal, Chunk, ChunkKind, ChunkSource, ChunkSourceError, ChunkStream, SourceProfile,
    TurnRequest,
};
use futures_util::stream::{self, BoxStream};
use futures_util::StreamExt;
use mastra_api::{
    AgentStreamRequest, MastraApiClient, MastraApiConfig, MastraApiError, MastraStreamEvent,
};
use tracing::debug;

/// Stable source identifier used for explicit startup selection.
pub const MASTRA_SOURCE_ID: &str = "mastra";

pub const DEFAULT_AGENT_ID: &str = "weather-agent";
pub const DEFAULT_THREAD_ID: &str = "1";
pub const DEFAULT_RESOURCE_ID: &str = "booker";

/// Runtime configuration for the Mastra chunk source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MastraSourceConfig {
    pub agent_id: String,
    pub thread_id: String,
    pub resource_id: String,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub timeout: Option<Duration>,
}

impl Default for MastraSourceConfig {
    fn default() -> Self {
        Self::new(DEFAULT_AGENT_ID)
    }
}

impl MastraSourceConfig {
    #[must_use]
    pub fn new(agent_id: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            thread_id: DEFAULT_THREAD_ID.to_string(),
            resource_id: DEFAULT_RESOURCE_ID.to_string(),
            base_url: None,
            api_key: None,
            timeout: None,
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Memory thread and resource the server stores the conversation under.
    #[must_use]
    pub fn with_memory(mut self, thread_id: impl Into<String>, resource_id: impl Into<String>) -> Self {
        self.thread_id = thread_id.into();
        self.resource_id = resource_id.into();
        self
    }

    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn to_mastra_api_config(&self) -> MastraApiConfig {
        let mut config = MastraApiConfig::default();

        if let Some(base_url) = &self.base_url {
            config = config.with_base_url(base_url.clone());
        }

        if let Some(api_key) = &self.api_key {
            config = config.with_api_key(api_key.clone());
        }

        if let Some(timeout) = self.timeout {
            config = config.with_timeout(timeout);
        }

        config
    }
}

type EventStream = BoxStream<'static, Result<MastraStreamEvent, MastraApiError>>;

trait EventClient: Send + Sync {
    fn open(&self, request: AgentStreamRequest, cancel: CancelSignal) -> EventStream;
}

#[derive(Debug)]
struct DefaultEventClient {
    client: Arc<MastraApiClient>,
}

impl EventClient for DefaultEventClient {
    fn open(&self, request: AgentStreamRequest, cancel: CancelSignal) -> EventStream {
        let client = Arc::clone(&self.client);

        stream::once(async move { client.open_stream(&request, Some(cancel)).await })
            .flat_map(|opened| match opened {
                Ok(events) => events.into_stream(),
                Err(error) => stream::iter([Err(error)]).boxed(),
            })
            .boxed()
    }
}

/// `ChunkSource` adapter backed by `mastra_api` transport primitives.
pub struct MastraChunkSource {
    agent_id: String,
    thread_id: String,
    resource_id: String,
    events: Arc<dyn EventClient>,
}

impl MastraChunkSource {
    /// Creates a source using real HTTP transport.
    ///
    /// The endpoint is resolved up front so a bad base URL or agent id fails
    /// at startup rather than on the first turn.
    pub fn new(config: MastraSourceConfig) -> Result<Self, ChunkSourceError> {
        let client = MastraApiClient::new(config.to_mastra_api_config()).map_err(map_init_error)?;
        let endpoint = client.endpoint(&config.agent_id).map_err(map_init_error)?;
        debug!(endpoint = endpoint.as_str(), "mastra chunk source ready");

        Ok(Self::with_event_client(
            config,
            Arc::new(DefaultEventClient {
                client: Arc::new(client),
            }),
        ))
    }

    fn with_event_client(config: MastraSourceConfig, events: Arc<dyn EventClient>) -> Self {
        Self {
            agent_id: config.agent_id.trim().to_string(),
            thread_id: config.thread_id,
            resource_id: config.resource_id,
            events,
        }
    }

    fn agent_request(&self, prompt: String) -> AgentStreamRequest {
        AgentStreamRequest::new(self.agent_id.clone(), prompt)
            .with_memory(self.thread_id.clone(), self.resource_id.clone())
    }
}

impl ChunkSource for MastraChunkSource {
    fn profile(&self) -> SourceProfile {
        SourceProfile {
            source_id: MASTRA_SOURCE_ID.to_string(),
            agent_id: self.agent_id.clone(),
        }
    }

    fn open(&self, request: TurnRequest, cancel: CancelSignal) -> ChunkStream {
        let turn_id = request.turn_id;
        let events = self.events.open(self.agent_request(request.prompt), cancel);

        events
            .filter_map(move |event| {
                let item = match event {
                    Ok(event) => Some(Ok(chunk_from_event(event))),
                    Err(MastraApiError::Cancelled) => {
                        debug!(turn_id, "mastra stream cancelled");
                        None
                    }
                    Err(error) => Some(Err(ChunkSourceError::new(format!(
                        "Mastra request failed: {error}"
                    )))),
                };
                futures_util::future::ready(item)
            })
            .boxed()
    }
}

/// Translates one wire event into a chunk. A missing `runId` is the empty run.
fn chunk_from_event(event: MastraStreamEvent) -> Chunk {
    let (run_id, kind) = match event {
        MastraStreamEvent::TextDelta { run_id, text } => (run_id, ChunkKind::TextDelta { text }),
        MastraStreamEvent::ToolCallInputStreamingStart {
            run_id,
            tool_call_id,
            tool_name,
        } => (
            run_id,
            ChunkKind::ToolCallStarted {
                tool_call_id,
                tool_name,
            },
        ),
        MastraStreamEvent::ToolCallDelta {
            run_id,
            tool_call_id,
            args_text_delta,
        } => (
            run_id,
            ChunkKind::ToolArgsDelta {
                tool_call_id,
                args_text_delta,
            },
        ),
        MastraStreamEvent::ToolCall {
            run_id,
            tool_call_id,
            tool_name,
            args,
        } => (
            run_id,
            ChunkKind::ToolArgsComplete {
                tool_call_id,
                tool_name,
                args,
            },
        ),
        MastraStreamEvent::ToolResult {
            run_id,
            tool_call_id,
            tool_name,
            result,
            is_error,
        } => {
            if is_error {
                debug!(tool_call_id = tool_call_id.as_deref(), "tool reported an error result");
            }
            (
                run_id,
                ChunkKind::ToolResult {
                    tool_call_id,
                    tool_name,
                    result,
                },
            )
        }
        other => {
            let chunk_type = other.event_type().to_string();
            let run_id = other.run_id().map(ToString::to_string);
            (run_id, ChunkKind::Unknown { chunk_type })
        }
    };

    Chunk::new(run_id.unwrap_or_default(), kind)
}

fn map_init_error(error: MastraApiError) -> ChunkSourceError {
    ChunkSourceError::new(format!("Failed to initialize mastra source: {error}"))
}
