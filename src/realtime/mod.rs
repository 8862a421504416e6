//! Realtime layer: STOMP over WebSocket, topic subscriptions, and the chat session.

pub mod connection;
pub mod registry;
pub mod session;
pub mod stomp;
#[cfg(test)]
pub mod testing;
pub mod topics;
pub mod transport;
mod ws;

/// Returns the realtime module name for smoke checks.
pub fn module_name() -> &'static str {
    "realtime"
}
