use bytes::Bytes;
use futures::Stream;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::pin::Pin;

/// Abstract inbound request, produced by a transport binding from
/// whatever concrete protocol it terminates.
#[derive(Debug, Clone, Default)]
pub struct ProtocolRequest {
    pub method: String,
    pub path: String,
    pub query: HashMap<String, String>,
    pub headers: HashMap<String, String>,
    pub body: Bytes,
}

impl ProtocolRequest {
    /// Create a request for the given method and path.
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            ..Default::default()
        }
    }

    /// Set the request body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Set the JSON request body.
    #[must_use]
    pub fn with_json(self, value: &Value) -> Self {
        self.with_body(value.to_string())
    }
}

/// Body of an abstract response: one payload, or a lazy sequence of
/// fragments consumed exactly once, in order.
pub enum ResponseBody {
    Full(String),
    Stream(Pin<Box<dyn Stream<Item = String> + Send>>),
}

impl std::fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Full(text) => f.debug_tuple("Full").field(text).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// Abstract outbound response, consumed by a transport binding.
#[derive(Debug)]
pub struct ProtocolResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: ResponseBody,
}

impl ProtocolResponse {
    /// Build a JSON response.
    pub fn json<T: Serialize>(status: u16, value: &T) -> Self {
        let body = serde_json::to_string(value).unwrap_or_else(|err| {
            tracing::warn!(error = %err, "failed to serialize response body");
            "{}".to_string()
        });
        Self {
            status,
            headers: HashMap::from([("content-type".to_string(), "application/json".to_string())]),
            body: ResponseBody::Full(body),
        }
    }

    /// Build a Server-Sent-Events response over a fragment stream.
    pub fn sse(stream: Pin<Box<dyn Stream<Item = String> + Send>>) -> Self {
        Self {
            status: 200,
            headers: sse_headers(),
            body: ResponseBody::Stream(stream),
        }
    }
}

/// Standard SSE response headers.
pub fn sse_headers() -> HashMap<String, String> {
    HashMap::from([
        ("content-type".to_string(), "text/event-stream".to_string()),
        ("cache-control".to_string(), "no-cache".to_string()),
        ("connection".to_string(), "keep-alive".to_string()),
    ])
}

/// One protocol encoder output unit.
#[derive(Debug, Clone, PartialEq)]
pub enum WireFrame {
    /// A JSON payload rendered as one SSE record.
    Json(Value),
    /// A pre-framed fragment passed through with its terminator
    /// normalized to the SSE double newline.
    Raw(String),
}

impl WireFrame {
    /// Render this frame as an SSE wire fragment.
    pub fn to_sse(&self) -> String {
        match self {
            Self::Json(value) => format!("data: {value}\n\n"),
            Self::Raw(raw) => format!("{}\n\n", raw.trim_end_matches('\n')),
        }
    }
}
