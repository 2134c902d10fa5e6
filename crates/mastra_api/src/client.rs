use std::collections::VecDeque;
use std::future::Future;
use std::sync::{atomic::AtomicBool, atomic::Ordering, Arc};
use std::time::Duration;

use futures_util::stream::{self, BoxStream};
use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use crate::config::MastraApiConfig;
use crate::error::{parse_error_message, MastraApiError};
use crate::events::MastraStreamEvent;
use crate::headers::build_headers;
use crate::payload::AgentStreamRequest;
use crate::sse::SseStreamParser;
use crate::url::agent_stream_url;

/// Optional cancellation signal shared across request and stream loops.
pub type CancellationSignal = Arc<AtomicBool>;

const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(25);

type ByteStream = BoxStream<'static, Result<Vec<u8>, reqwest::Error>>;

#[derive(Debug)]
pub struct MastraApiClient {
    http: Client,
    config: MastraApiConfig,
}

#[derive(Debug, Clone)]
pub struct StreamResult {
    pub events: Vec<MastraStreamEvent>,
    /// Reason from the `finish` chunk, if the server sent one.
    pub finish_reason: Option<String>,
}

impl MastraApiClient {
    pub fn new(config: MastraApiConfig) -> Result<Self, MastraApiError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.connect_timeout(timeout).read_timeout(timeout);
        }
        let http = builder.build().map_err(MastraApiError::from)?;
        Ok(Self { http, config })
    }

    pub fn endpoint(&self, agent_id: &str) -> Result<String, MastraApiError> {
        agent_stream_url(&self.config.base_url, agent_id).map(String::from)
    }

    pub fn build_headers(&self) -> Result<HeaderMap, MastraApiError> {
        let headers = build_headers(&self.config, self.config.user_agent.as_deref());
        let mut out = HeaderMap::new();
        for (key, value) in headers {
            out.insert(
                HeaderName::from_bytes(key.as_bytes())
                    .map_err(|_| MastraApiError::InvalidHeader(format!("invalid key: {key}")))?,
                HeaderValue::from_str(&value)
                    .map_err(|_| MastraApiError::InvalidHeader(format!("invalid value for {key}")))?,
            );
        }
        Ok(out)
    }

    pub fn build_request(
        &self,
        request: &AgentStreamRequest,
    ) -> Result<reqwest::RequestBuilder, MastraApiError> {
        validate_messages(&request.messages)?;

        let endpoint = self.endpoint(&request.agent_id)?;
        let headers = self.build_headers()?;
        Ok(self.http.post(endpoint).headers(headers).json(request))
    }

    /// Sends the request once and returns the event stream on a 2xx response.
    pub async fn open_stream(
        &self,
        request: &AgentStreamRequest,
        cancellation: Option<CancellationSignal>,
    ) -> Result<EventStream, MastraApiError> {
        if is_cancelled(cancellation.as_ref()) {
            return Err(MastraApiError::Cancelled);
        }

        let builder = self.build_request(request)?;
        debug!(agent_id = request.agent_id.as_str(), "opening agent stream");
        let response = await_or_cancel(builder.send(), cancellation.as_ref())
            .await?
            .map_err(MastraApiError::from)?;

        let status = response.status();
        if !status.is_success() {
            let body = await_or_cancel(response.text(), cancellation.as_ref())
                .await?
                .unwrap_or_default();
            return Err(MastraApiError::Status(
                status,
                parse_error_message(status, &body),
            ));
        }

        let bytes = response
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()))
            .boxed();
        Ok(EventStream::new(bytes, cancellation))
    }

    pub async fn stream_with_handler<F>(
        &self,
        request: &AgentStreamRequest,
        cancellation: Option<CancellationSignal>,
        mut on_event: F,
    ) -> Result<Option<String>, MastraApiError>
    where
        F: FnMut(MastraStreamEvent),
    {
        let mut events = self.open_stream(request, cancellation).await?;
        let mut finish_reason = None;

        while let Some(event) = events.next_event().await {
            let event = event?;
            if let MastraStreamEvent::Finish { reason, .. } = &event {
                finish_reason = reason.clone();
            }
            on_event(event);
        }

        Ok(finish_reason)
    }

    pub async fn stream(
        &self,
        request: &AgentStreamRequest,
        cancellation: Option<CancellationSignal>,
    ) -> Result<StreamResult, MastraApiError> {
        let mut events = Vec::new();
        let finish_reason = self
            .stream_with_handler(request, cancellation, |event| events.push(event))
            .await?;

        Ok(StreamResult {
            events,
            finish_reason,
        })
    }
}

/// Pull-based stream of parsed events from one agent response.
///
/// Ends after `[DONE]`, at end of body, or with the first error. An `error`
/// chunk from the server surfaces as [`MastraApiError::StreamFailed`].
pub struct EventStream {
    bytes: ByteStream,
    parser: SseStreamParser,
    pending: VecDeque<MastraStreamEvent>,
    cancellation: Option<CancellationSignal>,
    finished: bool,
}

impl EventStream {
    fn new(bytes: ByteStream, cancellation: Option<CancellationSignal>) -> Self {
        Self {
            bytes,
            parser: SseStreamParser::default(),
            pending: VecDeque::new(),
            cancellation,
            finished: false,
        }
    }

    pub async fn next_event(&mut self) -> Option<Result<MastraStreamEvent, MastraApiError>> {
        loop {
            if self.finished {
                return None;
            }
            if is_cancelled(self.cancellation.as_ref()) {
                return self.fail(MastraApiError::Cancelled);
            }

            if let Some(event) = self.pending.pop_front() {
                if let Some(error) = stream_failure_from_event(&event) {
                    return self.fail(error);
                }
                return Some(Ok(event));
            }

            if self.parser.is_done() {
                self.finished = true;
                return None;
            }

            let next = match await_or_cancel(self.bytes.next(), self.cancellation.as_ref()).await {
                Ok(next) => next,
                Err(error) => return self.fail(error),
            };
            match next {
                None => {
                    self.finished = true;
                    if !self.parser.is_empty_buffer() {
                        debug!("agent stream closed with an incomplete SSE frame");
                    }
                    return None;
                }
                Some(Err(error)) => return self.fail(MastraApiError::from(error)),
                Some(Ok(chunk)) => self.pending.extend(self.parser.feed(&chunk)),
            }
        }
    }

    pub fn into_stream(self) -> BoxStream<'static, Result<MastraStreamEvent, MastraApiError>> {
        stream::unfold(self, |mut events| async move {
            let next = events.next_event().await?;
            Some((next, events))
        })
        .boxed()
    }

    fn fail(&mut self, error: MastraApiError) -> Option<Result<MastraStreamEvent, MastraApiError>> {
        self.finished = true;
        self.pending.clear();
        Some(Err(error))
    }
}

fn validate_messages(messages: &Value) -> Result<(), MastraApiError> {
    match messages {
        Value::String(text) if !text.trim().is_empty() => Ok(()),
        Value::Array(items) if !items.is_empty() => Ok(()),
        Value::String(_) | Value::Array(_) => Err(MastraApiError::InvalidRequestPayload(
            "'messages' must not be empty".to_owned(),
        )),
        other => Err(MastraApiError::InvalidRequestPayload(format!(
            "'messages' must be a string or an array, got {}",
            value_type_name(other)
        ))),
    }
}

fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn stream_failure_from_event(event: &MastraStreamEvent) -> Option<MastraApiError> {
    match event {
        MastraStreamEvent::Error { message, .. } => Some(MastraApiError::StreamFailed {
            message: message
                .clone()
                .unwrap_or_else(|| "agent reported an error".to_owned()),
        }),
        _ => None,
    }
}

fn is_cancelled(cancel: Option<&CancellationSignal>) -> bool {
    cancel.is_some_and(|token| token.load(Ordering::Acquire))
}

async fn await_or_cancel<F>(
    future: F,
    cancellation: Option<&CancellationSignal>,
) -> Result<F::Output, MastraApiError>
where
    F: Future,
{
    if cancellation.is_none() {
        return Ok(future.await);
    }

    let mut future = Box::pin(future);

    loop {
        if is_cancelled(cancellation) {
            return Err(MastraApiError::Cancelled);
        }

        if let Ok(output) = tokio::time::timeout(CANCEL_POLL_INTERVAL, &mut future).await {
            if is_cancelled(cancellation) {
                return Err(MastraApiError::Cancelled);
            }
            return Ok(output);
        }
    }
}
