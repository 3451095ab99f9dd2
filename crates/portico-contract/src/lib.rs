//! Shared contracts for the portico protocol bridge: the canonical
//! event model, the normalized request, the agent-handler boundary, and
//! the transport/routing contracts every protocol formatter plugs into.

pub mod encoder;
pub mod event;
pub mod handler;
pub mod http;
pub mod request;
pub mod service;

pub use encoder::{sse_stream, ProtocolEncoder};
pub use event::{merge_addition, AgentEvent, EventPayload, EventStream, HitlRequest, MergeOptions};
pub use handler::{AgentHandler, HandlerError, HandlerOutput, HandlerStream, StreamItem};
pub use http::{sse_headers, ProtocolRequest, ProtocolResponse, ResponseBody, WireFrame};
pub use request::{Message, Role, RunRequest, ToolCall, ToolDef};
pub use service::{join_path, normalize_path, ProtocolService, RouteSpec, ServiceError};
