use crate::types::{
    AssistantMessage, ChatCompletion, ChatCompletionChunk, ChatToolCall, ChunkChoice, ChunkDelta,
    CompletionChoice, FunctionCall, FunctionDelta, ToolCallDelta,
};
use portico_contract::{AgentEvent, EventPayload, ProtocolEncoder, WireFrame};
use uuid::Uuid;

/// Generate a per-request completion id.
pub fn completion_id() -> String {
    format!("chatcmpl-{}", Uuid::new_v4().simple())
}

/// Current unix timestamp in seconds.
pub fn unix_timestamp() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0, |d| d.as_secs())
}

/// Stateful encoder for the chat-completions streaming protocol.
///
/// The assistant role rides on the first text chunk only. Tool-call
/// indices are assigned in order of first appearance, monotonically
/// increasing, and never reassigned for a given id within one stream.
#[derive(Debug)]
pub struct OpenAiStreamEncoder {
    id: String,
    created: u64,
    model: String,
    sent_role: bool,
    has_tool_calls: bool,
    /// Tool-call ids in order of first appearance; position = index.
    call_ids: Vec<String>,
    errored: bool,
}

impl OpenAiStreamEncoder {
    /// Create an encoder for one streamed request.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            id: completion_id(),
            created: unix_timestamp(),
            model: model.into(),
            sent_role: false,
            has_tool_calls: false,
            call_ids: Vec::new(),
            errored: false,
        }
    }

    /// Per-request completion id carried by every chunk.
    pub fn id(&self) -> &str {
        &self.id
    }

    fn chunk(&self, delta: ChunkDelta, finish_reason: Option<&str>) -> WireFrame {
        let chunk = ChatCompletionChunk {
            id: self.id.clone(),
            object: "chat.completion.chunk".to_string(),
            created: self.created,
            model: self.model.clone(),
            choices: vec![ChunkChoice {
                index: 0,
                delta,
                finish_reason: finish_reason.map(str::to_string),
            }],
        };
        WireFrame::Json(serde_json::to_value(chunk).expect("chunk serializes"))
    }
}

impl ProtocolEncoder for OpenAiStreamEncoder {
    fn on_event(&mut self, event: &AgentEvent) -> Vec<WireFrame> {
        if self.errored {
            return Vec::new();
        }
        match &event.payload {
            EventPayload::Text { delta } => {
                let mut out = ChunkDelta::default();
                if !self.sent_role {
                    self.sent_role = true;
                    out.role = Some("assistant".to_string());
                }
                if !delta.is_empty() {
                    out.content = Some(delta.clone());
                }
                vec![self.chunk(out, None)]
            }

            EventPayload::ToolCallChunk { id, name, args_delta } => {
                let mut frames = Vec::new();
                let index = match self.call_ids.iter().position(|known| known == id) {
                    Some(index) => index,
                    None => {
                        self.call_ids.push(id.clone());
                        self.has_tool_calls = true;
                        let index = self.call_ids.len() - 1;
                        frames.push(self.chunk(
                            ChunkDelta {
                                tool_calls: Some(vec![ToolCallDelta {
                                    index,
                                    id: Some(id.clone()),
                                    call_type: Some("function".to_string()),
                                    function: FunctionDelta {
                                        name: Some(name.clone().unwrap_or_default()),
                                        arguments: Some(String::new()),
                                    },
                                }]),
                                ..Default::default()
                            },
                            None,
                        ));
                        index
                    }
                };
                if let Some(args_delta) = args_delta {
                    frames.push(self.chunk(
                        ChunkDelta {
                            tool_calls: Some(vec![ToolCallDelta {
                                index,
                                id: None,
                                call_type: None,
                                function: FunctionDelta {
                                    name: None,
                                    arguments: Some(args_delta.clone()),
                                },
                            }]),
                            ..Default::default()
                        },
                        None,
                    ));
                }
                frames
            }

            EventPayload::Error { .. } => {
                self.errored = true;
                vec![self.chunk(ChunkDelta::default(), Some("error"))]
            }

            // This protocol carries text and tool calls only.
            _ => Vec::new(),
        }
    }

    fn epilogue(&mut self) -> Vec<WireFrame> {
        let mut frames = Vec::new();
        if !self.errored {
            let finish_reason = if self.has_tool_calls { "tool_calls" } else { "stop" };
            frames.push(self.chunk(ChunkDelta::default(), Some(finish_reason)));
        }
        frames.push(WireFrame::Raw("data: [DONE]".to_string()));
        frames
    }
}

/// Assembles one full completion from a canonical event sequence.
///
/// Consumes the entire sequence before anything is rendered: text
/// deltas concatenate into one content string; per tool-call id, in
/// order of first appearance, argument fragments concatenate into one
/// complete argument string.
#[derive(Debug, Default)]
pub struct CompletionCollector {
    content: String,
    saw_text: bool,
    calls: Vec<AssembledCall>,
    error: Option<(String, Option<String>)>,
}

#[derive(Debug)]
struct AssembledCall {
    id: String,
    name: String,
    arguments: String,
}

impl CompletionCollector {
    /// Feed one canonical event.
    pub fn on_event(&mut self, event: &AgentEvent) {
        if self.error.is_some() {
            return;
        }
        match &event.payload {
            EventPayload::Text { delta } => {
                self.saw_text = true;
                self.content.push_str(delta);
            }
            EventPayload::ToolCallChunk { id, name, args_delta } => {
                let call = match self.calls.iter_mut().find(|call| call.id == *id) {
                    Some(call) => call,
                    None => {
                        self.calls.push(AssembledCall {
                            id: id.clone(),
                            name: String::new(),
                            arguments: String::new(),
                        });
                        self.calls.last_mut().expect("call just pushed")
                    }
                };
                if let Some(name) = name {
                    if call.name.is_empty() {
                        call.name = name.clone();
                    }
                }
                if let Some(delta) = args_delta {
                    call.arguments.push_str(delta);
                }
            }
            EventPayload::Error { message, code } => {
                self.error = Some((message.clone(), code.clone()));
            }
            _ => {}
        }
    }

    /// Terminal error observed in the sequence, if any.
    pub fn error(&self) -> Option<&(String, Option<String>)> {
        self.error.as_ref()
    }

    /// Build the aggregated completion.
    pub fn into_completion(self, id: String, created: u64, model: String) -> ChatCompletion {
        let finish_reason = if self.calls.is_empty() { "stop" } else { "tool_calls" };
        let tool_calls = if self.calls.is_empty() {
            None
        } else {
            Some(
                self.calls
                    .into_iter()
                    .map(|call| ChatToolCall {
                        id: call.id,
                        call_type: "function".to_string(),
                        function: FunctionCall {
                            name: call.name,
                            arguments: call.arguments,
                        },
                    })
                    .collect(),
            )
        };
        let content = if self.saw_text || tool_calls.is_none() {
            Some(self.content)
        } else {
            None
        };
        ChatCompletion {
            id,
            object: "chat.completion".to_string(),
            created,
            model,
            choices: vec![CompletionChoice {
                index: 0,
                message: AssistantMessage {
                    role: "assistant".to_string(),
                    content,
                    tool_calls,
                },
                finish_reason: finish_reason.to_string(),
            }],
        }
    }
}
