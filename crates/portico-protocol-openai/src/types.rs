use portico_contract::{Message, Role, RunRequest, ToolCall, ToolDef};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Request Types
// ============================================================================

/// Chat-completions request body.
///
/// `messages` is required; a body without it fails to parse and is
/// reported as a request error.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionRequest {
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub stream: bool,
    #[serde(default)]
    pub tools: Option<Vec<ChatToolDef>>,
    #[serde(default)]
    pub metadata: Option<Value>,
}

/// One inbound conversation message.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<ChatToolCall>>,
    #[serde(default)]
    pub tool_call_id: Option<String>,
}

/// A tool call on an assistant message, in wire shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatToolCall {
    pub id: String,
    #[serde(rename = "type", default = "function_type")]
    pub call_type: String,
    pub function: FunctionCall,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub arguments: String,
}

fn function_type() -> String {
    "function".to_string()
}

/// A tool declaration in wire shape.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatToolDef {
    #[serde(rename = "type", default = "function_type")]
    pub def_type: String,
    pub function: FunctionDef,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FunctionDef {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub parameters: Option<Value>,
}

impl ChatCompletionRequest {
    /// Convert into the normalized run request.
    pub fn into_run_request(self) -> RunRequest {
        let messages = self
            .messages
            .into_iter()
            .map(|message| Message {
                role: message.role,
                content: message.content,
                tool_calls: message.tool_calls.map(|calls| {
                    calls
                        .into_iter()
                        .map(|call| ToolCall::new(call.id, call.function.name, call.function.arguments))
                        .collect()
                }),
                tool_call_id: message.tool_call_id,
            })
            .collect();

        let tools = self
            .tools
            .unwrap_or_default()
            .into_iter()
            .map(|tool| ToolDef {
                name: tool.function.name,
                description: tool.function.description,
                parameters: tool.function.parameters,
            })
            .collect();

        RunRequest {
            messages,
            stream: self.stream,
            model: self.model,
            tools,
            metadata: self.metadata,
        }
    }
}

// ============================================================================
// Streaming Response Types
// ============================================================================

/// One streaming chunk (`object: "chat.completion.chunk"`).
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionChunk {
    pub id: String,
    pub object: String,
    pub created: u64,
    pub model: String,
    pub choices: Vec<ChunkChoice>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChunkChoice {
    pub index: usize,
    pub delta: ChunkDelta,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct ChunkDelta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCallDelta>>,
}

/// Incremental tool-call fragment within a chunk delta.
#[derive(Debug, Clone, Serialize)]
pub struct ToolCallDelta {
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub call_type: Option<String>,
    pub function: FunctionDelta,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct FunctionDelta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments: Option<String>,
}

// ============================================================================
// Aggregated Response Types
// ============================================================================

/// One aggregated completion (`object: "chat.completion"`).
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletion {
    pub id: String,
    pub object: String,
    pub created: u64,
    pub model: String,
    pub choices: Vec<CompletionChoice>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompletionChoice {
    pub index: usize,
    pub message: AssistantMessage,
    pub finish_reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssistantMessage {
    pub role: String,
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ChatToolCall>>,
}

// ============================================================================
// Model Listing & Errors
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct ModelList {
    pub object: String,
    pub data: Vec<ModelCard>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelCard {
    pub id: String,
    pub object: String,
    pub created: u64,
    pub owned_by: String,
}

/// OpenAI-style error body.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorDetail {
    pub message: String,
    #[serde(rename = "type")]
    pub error_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ErrorBody {
    /// Build an error body.
    pub fn new(error_type: impl Into<String>, message: impl Into<String>, code: Option<String>) -> Self {
        Self {
            error: ErrorDetail {
                message: message.into(),
                error_type: error_type.into(),
                code,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_without_messages_fails_to_parse() {
        let result: Result<ChatCompletionRequest, _> =
            serde_json::from_value(json!({ "model": "gpt-x" }));
        assert!(result.is_err());
    }

    #[test]
    fn request_converts_to_normalized_form() {
        let request: ChatCompletionRequest = serde_json::from_value(json!({
            "model": "gpt-x",
            "stream": true,
            "messages": [
                { "role": "system", "content": "be terse" },
                { "role": "user", "content": "hi" },
                {
                    "role": "assistant",
                    "tool_calls": [
                        { "id": "t1", "type": "function", "function": { "name": "search", "arguments": "{}" } }
                    ]
                },
                { "role": "tool", "content": "ok", "tool_call_id": "t1" }
            ],
            "tools": [
                { "type": "function", "function": { "name": "search", "description": "web search" } }
            ]
        }))
        .unwrap();

        let run = request.into_run_request();
        assert!(run.stream);
        assert_eq!(run.model.as_deref(), Some("gpt-x"));
        assert_eq!(run.messages.len(), 4);
        assert_eq!(run.messages[1].role, Role::User);
        let calls = run.messages[2].tool_calls.as_ref().unwrap();
        assert_eq!(calls[0], ToolCall::new("t1", "search", "{}"));
        assert_eq!(run.messages[3].tool_call_id.as_deref(), Some("t1"));
        assert_eq!(run.tools[0].name, "search");
    }

    #[test]
    fn chunk_serializes_with_null_finish_reason() {
        let chunk = ChatCompletionChunk {
            id: "chatcmpl-1".into(),
            object: "chat.completion.chunk".into(),
            created: 1,
            model: "m".into(),
            choices: vec![ChunkChoice {
                index: 0,
                delta: ChunkDelta::default(),
                finish_reason: None,
            }],
        };
        let value = serde_json::to_value(&chunk).unwrap();
        assert!(value["choices"][0]["finish_reason"].is_null());
        assert_eq!(value["choices"][0]["delta"], json!({}));
    }
}
