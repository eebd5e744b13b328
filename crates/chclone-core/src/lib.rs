//! Core domain + application logic for the channel cloner.
//!
//! This crate is intentionally framework-agnostic. The messaging platform lives
//! behind the `ChannelClient` port implemented in adapter crates.

pub mod captions;
pub mod config;
pub mod dispatch;
pub mod domain;
pub mod errors;
pub mod history;
pub mod logging;
pub mod messaging;
pub mod orchestrator;
pub mod pacing;
pub mod retry;

#[cfg(test)]
pub(crate) mod testing;

pub use errors::{Error, Result};
