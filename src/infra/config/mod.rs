mod app_config;
mod file_config;
mod loader;

pub use app_config::{AppConfig, LogConfig, RealtimeConfig, ServerConfig, DEFAULT_PROFILE};
pub use loader::load;
