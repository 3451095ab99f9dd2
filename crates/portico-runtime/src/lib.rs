//! Drives an agent computation and normalizes whatever it returns into
//! one ordered canonical event sequence.

mod invoker;

pub use invoker::{is_cancelled, CancellationToken, InvokeOptions, Invoker};
