use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_PROFILE: &str = "default";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    pub logging: LogConfig,
    pub server: ServerConfig,
    pub realtime: RealtimeConfig,
    /// Selects an isolated credential/log directory.
    pub profile: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            logging: LogConfig::default(),
            server: ServerConfig::default(),
            realtime: RealtimeConfig::default(),
            profile: DEFAULT_PROFILE.to_owned(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogConfig {
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerConfig {
    pub api_url: String,
    /// SockJS endpoint (`http(s)`) or a raw WebSocket url (`ws(s)`).
    pub ws_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.gptini.org".to_owned(),
            ws_url: "https://api.gptini.org/ws".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RealtimeConfig {
    pub reconnect_delay_ms: u64,
    pub heartbeat_outgoing_ms: u64,
    pub heartbeat_incoming_ms: u64,
    pub read_flush_delay_ms: u64,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            reconnect_delay_ms: 5_000,
            heartbeat_outgoing_ms: 4_000,
            heartbeat_incoming_ms: 4_000,
            read_flush_delay_ms: 300,
        }
    }
}

impl RealtimeConfig {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn read_flush_delay(&self) -> Duration {
        Duration::from_millis(self.read_flush_delay_ms)
    }
}
