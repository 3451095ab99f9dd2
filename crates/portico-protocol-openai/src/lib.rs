//! OpenAI chat-completions protocol support: request parsing, the
//! streaming chunk encoder, and non-streaming aggregation.

pub mod encoder;
pub mod service;
pub mod types;

pub use encoder::{completion_id, unix_timestamp, CompletionCollector, OpenAiStreamEncoder};
pub use service::OpenAiProtocol;
pub use types::{
    AssistantMessage, ChatCompletion, ChatCompletionChunk, ChatCompletionRequest, ChatMessage,
    ChatToolCall, ChunkChoice, ChunkDelta, CompletionChoice, ErrorBody, FunctionCall,
    FunctionDelta, ModelCard, ModelList, ToolCallDelta,
};
