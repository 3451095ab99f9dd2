use portico_contract::{self as contract, RunRequest};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Role for AG-UI input/output messages.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Developer,
    System,
    #[default]
    Assistant,
    User,
    Tool,
}

/// AG-UI message in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub role: Role,
    #[serde(default)]
    pub content: String,
    /// Optional message ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Optional tool call ID (for tool messages).
    #[serde(rename = "toolCallId", skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            id: None,
            tool_call_id: None,
        }
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            id: None,
            tool_call_id: None,
        }
    }

    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
            id: None,
            tool_call_id: None,
        }
    }

    /// Create a tool result message.
    pub fn tool(content: impl Into<String>, tool_call_id: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            id: None,
            tool_call_id: Some(tool_call_id.into()),
        }
    }
}

/// AG-UI tool definition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolDef {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// JSON Schema for tool parameters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
}

/// Request to run an agent over AG-UI.
///
/// `threadId` and `runId` are assigned fresh ids when the client omits
/// them. AG-UI has no non-streaming mode, so conversion always produces
/// a streamed run request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunAgentInput {
    #[serde(rename = "threadId", default = "gen_thread_id")]
    pub thread_id: String,
    #[serde(rename = "runId", default = "gen_run_id")]
    pub run_id: String,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub tools: Vec<ToolDef>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub metadata: Option<Value>,
}

/// Generate a fresh thread id.
pub fn gen_thread_id() -> String {
    format!("thread_{}", Uuid::new_v4().simple())
}

/// Generate a fresh run id.
pub fn gen_run_id() -> String {
    format!("run_{}", Uuid::new_v4().simple())
}

impl RunAgentInput {
    /// Create a request with minimal required fields.
    pub fn new(thread_id: impl Into<String>, run_id: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
            run_id: run_id.into(),
            messages: Vec::new(),
            tools: Vec::new(),
            model: None,
            metadata: None,
        }
    }

    /// Add a message.
    #[must_use]
    pub fn with_message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }

    /// Set the model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Validate the request.
    pub fn validate(&self) -> Result<(), RequestError> {
        if self.thread_id.is_empty() {
            return Err(RequestError::invalid_field("threadId cannot be empty"));
        }
        if self.run_id.is_empty() {
            return Err(RequestError::invalid_field("runId cannot be empty"));
        }
        Ok(())
    }

    /// Convert into the normalized run request.
    pub fn into_run_request(self) -> RunRequest {
        let messages = self.messages.iter().map(core_message).collect();
        let tools = self
            .tools
            .into_iter()
            .map(|tool| contract::ToolDef {
                name: tool.name,
                description: (!tool.description.is_empty()).then_some(tool.description),
                parameters: tool.parameters,
            })
            .collect();
        RunRequest {
            messages,
            stream: true,
            model: self.model,
            tools,
            metadata: self.metadata,
        }
    }
}

/// Convert an AG-UI message to its normalized form.
fn core_message(message: &Message) -> contract::Message {
    let role = match message.role {
        Role::Developer | Role::System => contract::Role::System,
        Role::User => contract::Role::User,
        Role::Assistant => contract::Role::Assistant,
        Role::Tool => contract::Role::Tool,
    };
    contract::Message {
        role,
        content: Some(message.content.clone()),
        tool_calls: None,
        tool_call_id: message.tool_call_id.clone(),
    }
}

/// Error type for request processing.
#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
#[error("[{code}] {message}")]
pub struct RequestError {
    pub code: String,
    pub message: String,
}

impl RequestError {
    /// Create an invalid field error.
    pub fn invalid_field(message: impl Into<String>) -> Self {
        Self {
            code: "INVALID_FIELD".into(),
            message: message.into(),
        }
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self {
            code: "VALIDATION_ERROR".into(),
            message: message.into(),
        }
    }
}
