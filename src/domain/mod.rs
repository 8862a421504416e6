//! Domain layer: chat entities and session-scoped state rules.

pub mod account;
pub mod events;
pub mod message;
pub mod message_log;
pub mod participants;
pub mod read_cursor;
pub mod room;
pub mod room_updates;
pub mod time;

pub type RoomId = i64;
pub type UserId = i64;
pub type MessageId = i64;

/// Returns the domain module name for smoke checks.
pub fn module_name() -> &'static str {
    "domain"
}
