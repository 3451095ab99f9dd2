//! Server-level routing and the axum transport binding.

pub mod http;
pub mod router;

pub use router::ProtocolRouter;
