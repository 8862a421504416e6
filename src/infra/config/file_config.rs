use serde::Deserialize;

use crate::infra::config::{AppConfig, LogConfig, RealtimeConfig, ServerConfig};

#[derive(Debug, Deserialize, Default)]
pub struct FileConfig {
    pub logging: Option<FileLogConfig>,
    pub server: Option<FileServerConfig>,
    pub realtime: Option<FileRealtimeConfig>,
    pub profile: Option<String>,
}

impl FileConfig {
    pub fn merge_into(self, config: &mut AppConfig) {
        if let Some(logging) = self.logging {
            logging.merge_into(&mut config.logging);
        }

        if let Some(server) = self.server {
            server.merge_into(&mut config.server);
        }

        if let Some(realtime) = self.realtime {
            realtime.merge_into(&mut config.realtime);
        }

        if let Some(profile) = self.profile {
            config.profile = profile;
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct FileLogConfig {
    pub level: Option<String>,
}

impl FileLogConfig {
    fn merge_into(self, config: &mut LogConfig) {
        if let Some(level) = self.level {
            config.level = level;
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct FileServerConfig {
    pub api_url: Option<String>,
    pub ws_url: Option<String>,
}

impl FileServerConfig {
    fn merge_into(self, config: &mut ServerConfig) {
        if let Some(api_url) = self.api_url {
            config.api_url = api_url;
        }

        if let Some(ws_url) = self.ws_url {
            config.ws_url = ws_url;
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct FileRealtimeConfig {
    pub reconnect_delay_ms: Option<u64>,
    pub heartbeat_outgoing_ms: Option<u64>,
    pub heartbeat_incoming_ms: Option<u64>,
    pub read_flush_delay_ms: Option<u64>,
}

impl FileRealtimeConfig {
    fn merge_into(self, config: &mut RealtimeConfig) {
        if let Some(delay) = self.reconnect_delay_ms {
            config.reconnect_delay_ms = delay;
        }

        if let Some(outgoing) = self.heartbeat_outgoing_ms {
            config.heartbeat_outgoing_ms = outgoing;
        }

        if let Some(incoming) = self.heartbeat_incoming_ms {
            config.heartbeat_incoming_ms = incoming;
        }

        if let Some(delay) = self.read_flush_delay_ms {
            config.read_flush_delay_ms = delay;
        }
    }
}
