use async_stream::stream;
use futures::StreamExt;
use portico_contract::{AgentEvent, AgentHandler, EventPayload, EventStream, HandlerError, HandlerOutput, RunRequest, StreamItem};
use std::sync::Arc;

pub use tokio_util::sync::CancellationToken;

/// Fixed message of the event emitted when cancellation is observed.
const ABORT_MESSAGE: &str = "Request aborted";

/// Per-invocation options.
#[derive(Debug, Clone, Default)]
pub struct InvokeOptions {
    /// Cooperative cancellation signal, observed once the handler's
    /// result resolves and again before each streamed item is consumed.
    pub cancel: Option<CancellationToken>,
}

impl InvokeOptions {
    /// Attach a cancellation token.
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }
}

/// Whether cancellation has been requested.
pub fn is_cancelled(token: Option<&CancellationToken>) -> bool {
    token.is_some_and(CancellationToken::is_cancelled)
}

/// Drives an [`AgentHandler`] and reconciles its result shapes — plain
/// text, a single event, or a lazy mixed sequence — into one canonical
/// event sequence, so protocol encoders never special-case the agent's
/// return type.
#[derive(Clone)]
pub struct Invoker {
    handler: Arc<dyn AgentHandler>,
}

impl Invoker {
    /// Create an invoker around an agent computation.
    pub fn new(handler: Arc<dyn AgentHandler>) -> Self {
        Self { handler }
    }

    /// Invoke the handler for one request.
    ///
    /// The returned sequence is finite and not restartable; a fresh
    /// call re-runs the computation. Handler errors are converted into
    /// a terminal error event — nothing follows it.
    pub fn invoke(&self, request: RunRequest, options: InvokeOptions) -> EventStream {
        let handler = self.handler.clone();
        let cancel = options.cancel;
        Box::pin(stream! {
            let output = match handler.handle(&request).await {
                Ok(output) => output,
                Err(err) => {
                    yield error_event(err);
                    return;
                }
            };

            // First checkpoint: abort before consuming the resolved result.
            if is_cancelled(cancel.as_ref()) {
                yield abort_event();
                return;
            }

            match output {
                // A bare string is always one text event, even when empty.
                HandlerOutput::Text(text) => yield AgentEvent::text(text),
                HandlerOutput::Event(event) => yield expand_single(event),
                HandlerOutput::Stream(mut items) => loop {
                    // Second checkpoint: re-check before each pull.
                    if is_cancelled(cancel.as_ref()) {
                        yield abort_event();
                        return;
                    }
                    match items.next().await {
                        None => return,
                        Some(Ok(StreamItem::Text(text))) => {
                            // Streamed empty fragments carry nothing; drop them.
                            if !text.is_empty() {
                                yield AgentEvent::text(text);
                            }
                        }
                        Some(Ok(StreamItem::Event(event))) => yield expand_single(event),
                        Some(Err(err)) => {
                            yield error_event(err);
                            return;
                        }
                    }
                },
            }
        })
    }
}

/// A complete tool call re-emits as one full-argument fragment, so
/// downstream encoders only ever deal in fragments.
fn expand_single(event: AgentEvent) -> AgentEvent {
    let AgentEvent {
        payload,
        addition,
        addition_merge,
    } = event;
    let payload = match payload {
        EventPayload::ToolCall { id, name, args } => EventPayload::ToolCallChunk {
            id,
            name: Some(name),
            args_delta: Some(args),
        },
        other => other,
    };
    AgentEvent {
        payload,
        addition,
        addition_merge,
    }
}

fn error_event(err: HandlerError) -> AgentEvent {
    AgentEvent::error(err.message, err.code)
}

fn abort_event() -> AgentEvent {
    AgentEvent::error(ABORT_MESSAGE, None)
}
