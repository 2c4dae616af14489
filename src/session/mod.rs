// src/session/mod.rs

//! Session transport: one caller exchanging JSON text messages with the
//! engine.
//!
//! - [`protocol`] defines the inbound and outbound message shapes.
//! - [`handler`] routes inbound messages to the [`RunController`] and
//!   forwards engine events.
//! - [`stdio`] frames messages as JSON lines over any async reader/writer,
//!   including the process's stdin/stdout.
//!
//! [`RunController`]: crate::engine::RunController

use std::future::Future;
use std::pin::Pin;

use crate::errors::Result;

pub mod handler;
pub mod protocol;
pub mod stdio;

pub use handler::{SessionHandler, caller_facing_message};
pub use protocol::{ClientMessage, ControlReply, ServerMessage};
pub use stdio::{LineSink, LineSource, stdio};

/// Inbound half of a session.
pub trait MessageSource: Send {
    /// Next text message, or `None` once the caller hung up.
    ///
    /// Must be cancel-safe: the handler polls it inside `select!`.
    fn recv(&mut self) -> Pin<Box<dyn Future<Output = Result<Option<String>>> + Send + '_>>;
}

/// Outbound half of a session.
pub trait MessageSink: Send {
    fn send(&mut self, text: String) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}
