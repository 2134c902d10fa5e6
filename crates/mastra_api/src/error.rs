use std::fmt;

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Error as JsonError;

#[derive(Debug)]
pub enum MastraApiError {
    InvalidBaseUrl(String),
    MissingAgentId,
    InvalidHeader(String),
    InvalidRequestPayload(String),
    Request(reqwest::Error),
    Status(StatusCode, String),
    Serde(JsonError),
    StreamFailed { message: String },
    Cancelled,
}

/// Error bodies seen from Mastra servers and the proxies in front of them.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorPayload {
    Nested { error: ErrorFields },
    Flat { error: String },
    Message { message: String },
}

#[derive(Debug, Deserialize)]
struct ErrorFields {
    message: Option<String>,
}

impl ErrorPayload {
    fn message(self) -> Option<String> {
        let message = match self {
            Self::Nested { error } => error.message?,
            Self::Flat { error } => error,
            Self::Message { message } => message,
        };
        let trimmed = message.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }
}

impl fmt::Display for MastraApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidBaseUrl(value) => write!(f, "invalid base URL: {value}"),
            Self::MissingAgentId => write!(f, "agent id is required"),
            Self::InvalidHeader(message) => write!(f, "invalid header: {message}"),
            Self::InvalidRequestPayload(message) => write!(f, "invalid request payload: {message}"),
            Self::Request(error) => write!(f, "request error: {error}"),
            Self::Status(status, message) => write!(f, "HTTP {status} {message}"),
            Self::Serde(error) => write!(f, "serialization error: {error}"),
            Self::StreamFailed { message } => write!(f, "stream failed: {message}"),
            Self::Cancelled => write!(f, "request was cancelled"),
        }
    }
}

impl std::error::Error for MastraApiError {}

impl From<reqwest::Error> for MastraApiError {
    fn from(error: reqwest::Error) -> Self {
        Self::Request(error)
    }
}

impl From<JsonError> for MastraApiError {
    fn from(error: JsonError) -> Self {
        Self::Serde(error)
    }
}

/// Extract a human-readable message from a non-success response body.
pub fn parse_error_message(status: StatusCode, body: &str) -> String {
    if let Some(message) = serde_json::from_str::<ErrorPayload>(body)
        .ok()
        .and_then(ErrorPayload::message)
    {
        return message;
    }

    let body = body.trim();
    if body.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        body.to_string()
    }
}
