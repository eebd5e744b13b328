//! Platform-facing abstractions: the client port, message model and decorators.

pub mod port;
pub mod throttled;
pub mod types;
