//! Wavelink: a realtime chat client for streaming assistant backends
//!
//! The crate is organized around one coordinator and four collaborators:
//!
//! - [`identity`]: resolves and persists the session identifier across
//!   process restarts
//! - [`transport`]: the realtime WebSocket channel, with bounded automatic
//!   reconnection
//! - [`history`]: request/response HTTP calls for transcripts and the
//!   session list
//! - [`reconciler`]: the state machine merging streamed deltas and
//!   finalized messages into an ordered transcript
//! - [`orchestrator`]: ties the above together and carries the
//!   user-visible error surface
//!
//! Transport events flow through a single dispatch loop, so event handling
//! is strictly ordered and the reconciler never sees concurrent mutation.

pub mod config;
pub mod error;
pub mod history;
pub mod identity;
pub mod model;
pub mod orchestrator;
pub mod reconciler;
pub mod transport;

pub use error::{Error, Result};
pub use orchestrator::SessionOrchestrator;
