use crate::event::AgentEvent;
use crate::request::RunRequest;
use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

/// Error raised by an agent computation.
///
/// Converted by the invoker into a terminal error event; never
/// propagated past the normalization boundary.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct HandlerError {
    pub message: String,
    pub code: Option<String>,
}

impl HandlerError {
    /// Create an error from its message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
        }
    }

    /// Set a machine-readable error code.
    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

impl From<String> for HandlerError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for HandlerError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// One item of a streamed handler result.
#[derive(Debug, Clone)]
pub enum StreamItem {
    /// A text fragment; becomes a text event (empty fragments are dropped).
    Text(String),
    /// A pre-built event, passed through single-event expansion.
    Event(AgentEvent),
}

impl From<String> for StreamItem {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for StreamItem {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<AgentEvent> for StreamItem {
    fn from(event: AgentEvent) -> Self {
        Self::Event(event)
    }
}

/// Lazily produced handler items.
pub type HandlerStream = Pin<Box<dyn Stream<Item = Result<StreamItem, HandlerError>> + Send>>;

/// The result shapes an agent computation may resolve to.
pub enum HandlerOutput {
    /// A single complete text response.
    Text(String),
    /// A single event.
    Event(AgentEvent),
    /// A lazy sequence of text fragments and events.
    Stream(HandlerStream),
}

impl std::fmt::Debug for HandlerOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Event(event) => f.debug_tuple("Event").field(event).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

impl From<String> for HandlerOutput {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for HandlerOutput {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<AgentEvent> for HandlerOutput {
    fn from(event: AgentEvent) -> Self {
        Self::Event(event)
    }
}

/// The external agent computation driven by the invoker.
///
/// Implementations are free to return any [`HandlerOutput`] shape; the
/// invoker normalizes all of them into one canonical event sequence.
#[async_trait]
pub trait AgentHandler: Send + Sync {
    /// Run the computation for one normalized request.
    async fn handle(&self, request: &RunRequest) -> Result<HandlerOutput, HandlerError>;
}
