//! Line-oriented terminal front end: prints the room list and the open
//! room's messages to stdout and reads commands from stdin.

pub mod chat;
pub mod frontend;
pub mod input;
pub mod prompt;
pub mod rooms;

/// Returns the console module name for smoke checks.
pub fn module_name() -> &'static str {
    "console"
}
