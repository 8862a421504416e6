//! REST collaborator: login, profile, room list and message history.

pub mod client;

pub use client::ApiClient;

/// Returns the api module name for smoke checks.
pub fn module_name() -> &'static str {
    "api"
}
