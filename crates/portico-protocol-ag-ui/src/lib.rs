//! AG-UI protocol support: typed wire events, request adaptation, and
//! the stateful stream encoder.

pub mod encoder;
pub mod events;
pub mod service;
pub mod types;

pub use encoder::AgUiEncoder;
pub use events::Event;
pub use service::AgUiProtocol;
pub use types::{Message, RequestError, Role, RunAgentInput, ToolDef};
