//! Use case layer: application workflows and orchestration.

pub mod bootstrap;
pub mod context;
pub mod guided_login;
pub mod list_rooms;
pub mod live;
pub mod load_messages;
pub mod login;
pub mod logout;
pub mod send_message;
pub mod startup;

/// Returns the usecases module name for smoke checks.
pub fn module_name() -> &'static str {
    "usecases"
}
