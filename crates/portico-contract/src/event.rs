use futures::Stream;
use serde_json::{Map, Value};
use std::pin::Pin;

/// The normalized agent event sequence every protocol encoder consumes.
pub type EventStream = Pin<Box<dyn Stream<Item = AgentEvent> + Send>>;

// ============================================================================
// Event Payloads
// ============================================================================

/// Kind-specific payload of a normalized agent event.
#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    /// Incremental assistant text.
    Text { delta: String },

    /// A complete tool call. `args` is the full JSON-encoded argument
    /// string, never a fragment. `id` must be non-empty.
    ToolCall {
        id: String,
        name: String,
        args: String,
    },

    /// An incremental tool-call fragment. `id` must be non-empty;
    /// `name` is only required on the fragment that introduces the call.
    ToolCallChunk {
        id: String,
        name: Option<String>,
        args_delta: Option<String>,
    },

    /// Final result of a tool execution.
    ToolResult {
        id: String,
        result: String,
        message_id: Option<String>,
    },

    /// Incremental tool-result fragment, buffered by encoders until the
    /// final [`EventPayload::ToolResult`] for the same id arrives.
    ToolResultChunk { id: String, delta: String },

    /// Terminal error. No event may follow it in a sequence.
    Error {
        message: String,
        code: Option<String>,
    },

    /// Shared state payload. A `snapshot` or `delta` key selects the
    /// wire rendering; anything else is forwarded as a full snapshot.
    State { data: Value },

    /// Request for human confirmation or input.
    Hitl { request: HitlRequest },

    /// Application-defined event.
    Custom { name: String, value: Value },

    /// Pre-framed wire payload passed through verbatim.
    Raw { raw: String },

    /// Unrecognized kind. Consumers render it like `Custom` so new
    /// producers stay compatible with old encoders.
    Other { kind: String, data: Value },
}

impl EventPayload {
    /// Wire tag of this payload.
    pub fn kind(&self) -> &str {
        match self {
            Self::Text { .. } => "TEXT",
            Self::ToolCall { .. } => "TOOL_CALL",
            Self::ToolCallChunk { .. } => "TOOL_CALL_CHUNK",
            Self::ToolResult { .. } => "TOOL_RESULT",
            Self::ToolResultChunk { .. } => "TOOL_RESULT_CHUNK",
            Self::Error { .. } => "ERROR",
            Self::State { .. } => "STATE",
            Self::Hitl { .. } => "HITL",
            Self::Custom { .. } => "CUSTOM",
            Self::Raw { .. } => "RAW",
            Self::Other { kind, .. } => kind,
        }
    }
}

/// Human-in-the-loop request payload.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HitlRequest {
    /// Existing tool-call id this request rides on, when any.
    pub id: Option<String>,
    /// Interaction type, e.g. `confirm` or `input`.
    pub hitl_type: String,
    /// Prompt shown to the human.
    pub prompt: String,
    /// Choice list for selection-style interactions.
    pub options: Option<Value>,
    /// Default answer when the human does not respond.
    pub default: Option<Value>,
    /// Response timeout in milliseconds.
    pub timeout: Option<u64>,
    /// JSON Schema constraining structured responses.
    pub schema: Option<Value>,
}

impl HitlRequest {
    /// Create a request with the required fields.
    pub fn new(hitl_type: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            hitl_type: hitl_type.into(),
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    /// Tie the request to an existing tool-call id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

// ============================================================================
// Addition Merge
// ============================================================================

/// Controls how an event's `addition` keys merge into its rendered wire
/// object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MergeOptions {
    /// Only overwrite keys that already exist on the base object.
    pub no_new_field: bool,
    /// Concatenate arrays instead of replacing them.
    pub concat_list: bool,
    /// Skip addition values that are empty arrays.
    pub ignore_empty_list: bool,
}

/// Merge `addition` keys into `base` according to `opts`.
pub fn merge_addition(base: &mut Map<String, Value>, addition: &Map<String, Value>, opts: MergeOptions) {
    for (key, value) in addition {
        if opts.ignore_empty_list && value.as_array().is_some_and(Vec::is_empty) {
            continue;
        }
        match base.get_mut(key) {
            Some(existing) => {
                if opts.concat_list {
                    if let (Some(base_list), Some(add_list)) = (existing.as_array_mut(), value.as_array()) {
                        base_list.extend(add_list.iter().cloned());
                        continue;
                    }
                }
                *existing = value.clone();
            }
            None => {
                if !opts.no_new_field {
                    base.insert(key.clone(), value.clone());
                }
            }
        }
    }
}

// ============================================================================
// Agent Event
// ============================================================================

/// Normalized agent event: the shared vocabulary between the invoker and
/// every protocol encoder.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentEvent {
    /// Kind-specific payload.
    pub payload: EventPayload,
    /// Extra top-level fields merged into the rendered wire event.
    pub addition: Option<Map<String, Value>>,
    /// How `addition` merges into the wire event.
    pub addition_merge: MergeOptions,
}

impl From<EventPayload> for AgentEvent {
    fn from(payload: EventPayload) -> Self {
        Self {
            payload,
            addition: None,
            addition_merge: MergeOptions::default(),
        }
    }
}

impl AgentEvent {
    // ========================================================================
    // Factory Methods
    // ========================================================================

    /// Create a text event.
    pub fn text(delta: impl Into<String>) -> Self {
        EventPayload::Text { delta: delta.into() }.into()
    }

    /// Create a complete tool-call event.
    pub fn tool_call(id: impl Into<String>, name: impl Into<String>, args: impl Into<String>) -> Self {
        EventPayload::ToolCall {
            id: id.into(),
            name: name.into(),
            args: args.into(),
        }
        .into()
    }

    /// Create a tool-call fragment event.
    pub fn tool_call_chunk(
        id: impl Into<String>,
        name: Option<String>,
        args_delta: Option<String>,
    ) -> Self {
        EventPayload::ToolCallChunk {
            id: id.into(),
            name,
            args_delta,
        }
        .into()
    }

    /// Create a tool-result event.
    pub fn tool_result(id: impl Into<String>, result: impl Into<String>) -> Self {
        EventPayload::ToolResult {
            id: id.into(),
            result: result.into(),
            message_id: None,
        }
        .into()
    }

    /// Create a tool-result fragment event.
    pub fn tool_result_chunk(id: impl Into<String>, delta: impl Into<String>) -> Self {
        EventPayload::ToolResultChunk {
            id: id.into(),
            delta: delta.into(),
        }
        .into()
    }

    /// Create a terminal error event.
    pub fn error(message: impl Into<String>, code: Option<String>) -> Self {
        EventPayload::Error {
            message: message.into(),
            code,
        }
        .into()
    }

    /// Create a state event from an arbitrary state payload.
    pub fn state(data: Value) -> Self {
        EventPayload::State { data }.into()
    }

    /// Create a state event carrying a full snapshot.
    pub fn state_snapshot(snapshot: Value) -> Self {
        Self::state(serde_json::json!({ "snapshot": snapshot }))
    }

    /// Create a state event carrying an incremental delta.
    pub fn state_delta(delta: Value) -> Self {
        Self::state(serde_json::json!({ "delta": delta }))
    }

    /// Create a human-in-the-loop event.
    pub fn hitl(request: HitlRequest) -> Self {
        EventPayload::Hitl { request }.into()
    }

    /// Create a custom event.
    pub fn custom(name: impl Into<String>, value: Value) -> Self {
        EventPayload::Custom {
            name: name.into(),
            value,
        }
        .into()
    }

    /// Create a raw passthrough event.
    pub fn raw(raw: impl Into<String>) -> Self {
        EventPayload::Raw { raw: raw.into() }.into()
    }

    // ========================================================================
    // Builders
    // ========================================================================

    /// Attach extra wire fields to this event.
    #[must_use]
    pub fn with_addition(mut self, addition: Map<String, Value>) -> Self {
        self.addition = Some(addition);
        self
    }

    /// Set the addition merge behavior.
    #[must_use]
    pub fn with_merge_options(mut self, options: MergeOptions) -> Self {
        self.addition_merge = options;
        self
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Wire tag of this event.
    pub fn kind(&self) -> &str {
        self.payload.kind()
    }

    /// Whether this is a terminal error event.
    pub fn is_error(&self) -> bool {
        matches!(self.payload, EventPayload::Error { .. })
    }
}
