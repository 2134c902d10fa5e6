use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request body for `POST /api/agents/{agent_id}/stream`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentStreamRequest {
    /// Target agent; carried in the URL, not the body.
    #[serde(skip)]
    pub agent_id: String,
    /// Either a plain string or a list of messages.
    pub messages: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<MemoryOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
}

/// Conversation memory addressing on the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryOptions {
    pub thread: String,
    pub resource: String,
}

impl AgentStreamRequest {
    pub fn new(agent_id: impl Into<String>, messages: impl Into<Value>) -> Self {
        Self {
            agent_id: agent_id.into(),
            messages: messages.into(),
            memory: None,
            run_id: None,
        }
    }

    pub fn with_memory(mut self, thread: impl Into<String>, resource: impl Into<String>) -> Self {
        self.memory = Some(MemoryOptions {
            thread: thread.into(),
            resource: resource.into(),
        });
        self
    }

    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }
}
