use crate::events::Event;
use portico_contract::{merge_addition, AgentEvent, EventPayload, HitlRequest, ProtocolEncoder, WireFrame};
use serde_json::Value;
use std::collections::HashMap;
use tracing::warn;
use uuid::Uuid;

/// Lifecycle record for one logical tool call.
#[derive(Debug, Clone, Default)]
struct CallState {
    id: String,
    started: bool,
    ended: bool,
    has_result: bool,
    is_hitl: bool,
}

/// Per-stream mutable state.
///
/// One instance per streamed request, owned by its encoder, discarded
/// when the stream terminates. At most one text block is open at any
/// time; text and tool-call segments are mutually exclusive on the wire.
#[derive(Debug, Default)]
struct StreamState {
    /// Message id of the currently open text block, if any.
    open_text: Option<String>,
    /// Tool-call records in order of first appearance.
    calls: Vec<CallState>,
    /// Buffered result fragments awaiting a final result event.
    result_chunks: HashMap<String, String>,
}

impl StreamState {
    fn call(&self, id: &str) -> Option<&CallState> {
        self.calls.iter().find(|call| call.id == id)
    }

    fn call_mut(&mut self, id: &str) -> Option<&mut CallState> {
        self.calls.iter_mut().find(|call| call.id == id)
    }
}

/// Stateful encoder for the AG-UI event stream.
///
/// Emits `RUN_STARTED` up front, enforces block exclusivity between
/// text and tool-call segments, buffers result fragments until the
/// final result arrives, and terminates every stream in a well-formed
/// state: the normal `RUN_FINISHED` cleanup, or `RUN_ERROR` with
/// nothing after it.
#[derive(Debug)]
pub struct AgUiEncoder {
    thread_id: String,
    run_id: String,
    state: StreamState,
    errored: bool,
}

impl AgUiEncoder {
    /// Create an encoder for one run.
    pub fn new(thread_id: impl Into<String>, run_id: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
            run_id: run_id.into(),
            state: StreamState::default(),
            errored: false,
        }
    }

    fn new_message_id(&self) -> String {
        let run_prefix: String = self.run_id.chars().take(8).collect();
        format!("msg_{run_prefix}_{}", Uuid::new_v4().simple())
    }

    /// Close the open text block, if any.
    fn close_text(&mut self, frames: &mut Vec<WireFrame>) {
        if let Some(message_id) = self.state.open_text.take() {
            frames.push(frame(Event::text_message_end(message_id)));
        }
    }

    /// Close every call still open, in start order.
    fn close_open_calls(&mut self, frames: &mut Vec<WireFrame>) {
        for call in self.state.calls.iter_mut().filter(|call| call.started && !call.ended) {
            call.ended = true;
            frames.push(frame(Event::tool_call_end(call.id.clone())));
        }
    }

    /// Begin a logical call for `id`, reusing the record when the id
    /// was seen before.
    ///
    /// An id that already ended starts over as a new logical call.
    /// TODO: decide whether reusing an ended tool-call id should be
    /// rejected as a duplicate instead of starting a new call.
    fn start_call(&mut self, id: &str, name: &str, frames: &mut Vec<WireFrame>) {
        match self.state.call_mut(id) {
            Some(call) => {
                call.started = true;
                call.ended = false;
                call.has_result = false;
                call.is_hitl = false;
            }
            None => self.state.calls.push(CallState {
                id: id.to_string(),
                started: true,
                ..Default::default()
            }),
        }
        frames.push(frame(Event::tool_call_start(id, name)));
    }

    /// Render one tool-call fragment. A complete call renders
    /// identically to a fragment carrying its full argument string.
    fn render_tool_fragment(
        &mut self,
        id: &str,
        name: Option<&str>,
        args: Option<&str>,
        source: &AgentEvent,
        frames: &mut Vec<WireFrame>,
    ) {
        self.close_text(frames);
        let needs_start = match self.state.call(id) {
            None => true,
            Some(call) => call.ended || !call.started,
        };
        if needs_start {
            self.start_call(id, name.unwrap_or_default(), frames);
        }
        if let Some(delta) = args {
            frames.push(frame_with(Event::tool_call_args(id, delta), source));
        }
    }

    fn render_hitl(&mut self, request: &HitlRequest, source: &AgentEvent, frames: &mut Vec<WireFrame>) {
        self.close_text(frames);

        // A request referencing an open call closes that call in place
        // instead of synthesizing a new one.
        let open_ref = request
            .id
            .as_ref()
            .filter(|id| {
                self.state
                    .call(id)
                    .is_some_and(|call| call.started && !call.ended)
            })
            .cloned();

        if let Some(id) = open_ref {
            if let Some(call) = self.state.call_mut(&id) {
                call.ended = true;
                call.is_hitl = true;
            }
            frames.push(frame(Event::tool_call_end(id)));
            return;
        }

        let id = request
            .id
            .clone()
            .unwrap_or_else(|| format!("hitl_{}", Uuid::new_v4().simple()));
        let name = format!("hitl_{}", request.hitl_type);
        self.start_call(&id, &name, frames);
        frames.push(frame_with(Event::tool_call_args(&id, hitl_args(request)), source));
        if let Some(call) = self.state.call_mut(&id) {
            call.ended = true;
            call.is_hitl = true;
        }
        frames.push(frame(Event::tool_call_end(id)));
    }
}

impl ProtocolEncoder for AgUiEncoder {
    fn prologue(&mut self) -> Vec<WireFrame> {
        vec![frame(Event::run_started(&self.thread_id, &self.run_id))]
    }

    fn on_event(&mut self, event: &AgentEvent) -> Vec<WireFrame> {
        if self.errored {
            return Vec::new();
        }
        let mut frames = Vec::new();
        match &event.payload {
            EventPayload::Text { delta } => {
                self.close_open_calls(&mut frames);
                let message_id = match &self.state.open_text {
                    Some(id) => id.clone(),
                    None => {
                        let id = self.new_message_id();
                        frames.push(frame(Event::text_message_start(&id)));
                        self.state.open_text = Some(id.clone());
                        id
                    }
                };
                frames.push(frame_with(Event::text_message_content(message_id, delta), event));
            }

            EventPayload::ToolCall { id, name, args } => {
                self.render_tool_fragment(id, Some(name), Some(args), event, &mut frames);
            }

            EventPayload::ToolCallChunk { id, name, args_delta } => {
                self.render_tool_fragment(id, name.as_deref(), args_delta.as_deref(), event, &mut frames);
            }

            EventPayload::ToolResultChunk { id, delta } => {
                if !delta.is_empty() {
                    self.state
                        .result_chunks
                        .entry(id.clone())
                        .or_default()
                        .push_str(delta);
                }
            }

            EventPayload::ToolResult { id, result, message_id } => {
                self.close_text(&mut frames);
                if self.state.call(id).is_none() {
                    // Result for a call that was never announced upstream.
                    self.start_call(id, "", &mut frames);
                }
                if let Some(call) = self.state.call_mut(id) {
                    if call.started && !call.ended {
                        call.ended = true;
                        frames.push(frame(Event::tool_call_end(id)));
                    }
                    call.has_result = true;
                }
                let mut content = self.state.result_chunks.remove(id).unwrap_or_default();
                content.push_str(result);
                let message_id = message_id.clone().unwrap_or_else(|| format!("result_{id}"));
                frames.push(frame_with(Event::tool_call_result(message_id, id, content), event));
            }

            EventPayload::Hitl { request } => {
                self.render_hitl(request, event, &mut frames);
            }

            EventPayload::Error { message, code } => {
                self.errored = true;
                frames.push(frame_with(Event::run_error(message, code.clone()), event));
            }

            EventPayload::State { data } => {
                if let Some(snapshot) = data.get("snapshot") {
                    frames.push(frame_with(Event::state_snapshot(snapshot.clone()), event));
                } else if let Some(delta) = data.get("delta") {
                    let delta = match delta {
                        Value::Array(items) => items.clone(),
                        other => vec![other.clone()],
                    };
                    frames.push(frame_with(Event::state_delta(delta), event));
                } else {
                    frames.push(frame_with(Event::state_snapshot(data.clone()), event));
                }
            }

            EventPayload::Custom { name, value } => {
                frames.push(frame_with(Event::custom(name, value.clone()), event));
            }

            EventPayload::Raw { raw } => {
                frames.push(WireFrame::Raw(raw.clone()));
            }

            // Unknown kinds render as CUSTOM so newer producers keep
            // working against this encoder.
            EventPayload::Other { kind, data } => {
                frames.push(frame_with(Event::custom(kind, data.clone()), event));
            }
        }
        frames
    }

    fn epilogue(&mut self) -> Vec<WireFrame> {
        // An errored run terminates at RUN_ERROR; no cleanup follows.
        if self.errored {
            return Vec::new();
        }
        let mut frames = Vec::new();
        self.close_open_calls(&mut frames);
        self.close_text(&mut frames);
        frames.push(frame(Event::run_finished(&self.thread_id, &self.run_id)));
        frames
    }
}

fn frame(event: Event) -> WireFrame {
    WireFrame::Json(serde_json::to_value(event).expect("event serializes"))
}

/// Render an event and merge the source event's addition fields into it.
fn frame_with(event: Event, source: &AgentEvent) -> WireFrame {
    let mut value = serde_json::to_value(event).expect("event serializes");
    if let (Some(addition), Some(object)) = (source.addition.as_ref(), value.as_object_mut()) {
        merge_addition(object, addition, source.addition_merge);
    }
    WireFrame::Json(value)
}

fn hitl_args(request: &HitlRequest) -> String {
    let mut args = serde_json::Map::new();
    args.insert("type".to_string(), Value::String(request.hitl_type.clone()));
    args.insert("prompt".to_string(), Value::String(request.prompt.clone()));
    if let Some(options) = &request.options {
        args.insert("options".to_string(), options.clone());
    }
    if let Some(default) = &request.default {
        args.insert("default".to_string(), default.clone());
    }
    if let Some(timeout) = request.timeout {
        args.insert("timeout".to_string(), Value::from(timeout));
    }
    if let Some(schema) = &request.schema {
        args.insert("schema".to_string(), schema.clone());
    }
    match serde_json::to_string(&Value::Object(args)) {
        Ok(json) => json,
        Err(err) => {
            warn!(error = %err, "failed to serialize hitl arguments");
            "{}".to_string()
        }
    }
}
