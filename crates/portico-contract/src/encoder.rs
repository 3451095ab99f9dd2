//! Protocol output boundary: canonical events in, wire frames out.

use crate::event::{AgentEvent, EventStream};
use crate::http::WireFrame;
use futures::StreamExt;
use std::pin::Pin;

/// A stateful protocol encoder.
///
/// The surrounding stream driver calls `prologue` once, `on_event` for
/// every canonical event in order, and `epilogue` once after the
/// upstream sequence ends. Encoders own all per-stream state; one
/// instance serves exactly one request.
pub trait ProtocolEncoder {
    /// Frames emitted before the event stream starts.
    fn prologue(&mut self) -> Vec<WireFrame> {
        Vec::new()
    }

    /// Map one canonical event to zero or more wire frames.
    fn on_event(&mut self, event: &AgentEvent) -> Vec<WireFrame>;

    /// Frames emitted after the event stream ends.
    fn epilogue(&mut self) -> Vec<WireFrame> {
        Vec::new()
    }
}

/// Drive an encoder over a canonical event sequence, yielding SSE wire
/// fragments one at a time.
///
/// Pulls one event, emits its frames, then pulls the next; backpressure
/// is delegated entirely to the consumer of the returned stream.
pub fn sse_stream<E>(mut events: EventStream, mut encoder: E) -> Pin<Box<dyn futures::Stream<Item = String> + Send>>
where
    E: ProtocolEncoder + Send + 'static,
{
    Box::pin(async_stream::stream! {
        for frame in encoder.prologue() {
            yield frame.to_sse();
        }
        while let Some(event) = events.next().await {
            for frame in encoder.on_event(&event) {
                yield frame.to_sse();
            }
        }
        for frame in encoder.epilogue() {
            yield frame.to_sse();
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct CountingEncoder {
        seen: usize,
    }

    impl ProtocolEncoder for CountingEncoder {
        fn prologue(&mut self) -> Vec<WireFrame> {
            vec![WireFrame::Json(json!({ "type": "START" }))]
        }

        fn on_event(&mut self, event: &AgentEvent) -> Vec<WireFrame> {
            self.seen += 1;
            vec![WireFrame::Json(json!({ "kind": event.kind() }))]
        }

        fn epilogue(&mut self) -> Vec<WireFrame> {
            vec![WireFrame::Json(json!({ "type": "END", "seen": self.seen }))]
        }
    }

    #[tokio::test]
    async fn drives_prologue_events_and_epilogue_in_order() {
        let events: EventStream = Box::pin(futures::stream::iter(vec![
            AgentEvent::text("a"),
            AgentEvent::text("b"),
        ]));
        let fragments: Vec<String> = sse_stream(events, CountingEncoder { seen: 0 }).collect().await;
        assert_eq!(fragments.len(), 4);
        assert!(fragments[0].contains("START"));
        assert!(fragments[1].contains("TEXT"));
        assert!(fragments[3].contains("\"seen\":2"));
    }
}
