use std::{
    env, fs,
    path::{Path, PathBuf},
};

use crate::infra::{
    config::{file_config::FileConfig, AppConfig},
    error::AppError,
};

const DEFAULT_CONFIG_PATH: &str = "config.toml";

const ENV_API_URL: &str = "GPTINI_API_URL";
const ENV_WS_URL: &str = "GPTINI_WS_URL";
const ENV_PROFILE: &str = "GPTINI_PROFILE";

pub fn load(path: Option<&Path>) -> Result<AppConfig, AppError> {
    load_with_env(path, |key| env::var(key).ok())
}

/// Loads defaults, merges the config file over them, then applies
/// environment overrides looked up through `lookup`.
pub fn load_with_env<F>(path: Option<&Path>, lookup: F) -> Result<AppConfig, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    let config_path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

    let mut config = AppConfig::default();

    if config_path.exists() {
        let raw = fs::read_to_string(&config_path).map_err(|source| AppError::ConfigRead {
            path: config_path.clone(),
            source,
        })?;

        let file_config: FileConfig =
            toml::from_str(&raw).map_err(|source| AppError::ConfigParse {
                path: config_path,
                source,
            })?;

        file_config.merge_into(&mut config);
    }

    apply_env_overrides(&mut config, lookup);
    Ok(config)
}

fn apply_env_overrides<F>(config: &mut AppConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

    if let Some(api_url) = non_empty(ENV_API_URL) {
        config.server.api_url = api_url;
    }

    if let Some(ws_url) = non_empty(ENV_WS_URL) {
        config.server.ws_url = ws_url;
    }

    if let Some(profile) = non_empty(ENV_PROFILE) {
        config.profile = profile;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn returns_defaults_when_file_is_missing() {
        let config = load_with_env(Some(Path::new("./missing-config.toml")), no_env)
            .expect("config must load");

        assert_eq!(config, AppConfig::default());
        assert_eq!(config.realtime.reconnect_delay_ms, 5_000);
        assert_eq!(config.realtime.read_flush_delay_ms, 300);
    }

    #[test]
    fn merges_file_values_over_defaults() {
        let dir = tempfile::tempdir().expect("temp dir must be created");
        let config_path = dir.path().join("config.toml");

        fs::write(
            &config_path,
            r#"[logging]
level = "debug"

[server]
api_url = "http://localhost:8080"

[realtime]
read_flush_delay_ms = 500
"#,
        )
        .expect("must write test config");

        let config = load_with_env(Some(&config_path), no_env).expect("config must load");

        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.server.api_url, "http://localhost:8080");
        assert_eq!(config.server.ws_url, "https://api.gptini.org/ws");
        assert_eq!(config.realtime.read_flush_delay_ms, 500);
        assert_eq!(config.realtime.heartbeat_outgoing_ms, 4_000);
    }

    #[test]
    fn environment_overrides_file_values() {
        let dir = tempfile::tempdir().expect("temp dir must be created");
        let config_path = dir.path().join("config.toml");
        fs::write(&config_path, "[server]\nws_url = \"https://file.example/ws\"\n")
            .expect("must write test config");

        let config = load_with_env(Some(&config_path), |key| match key {
            "GPTINI_WS_URL" => Some("http://localhost:8080/ws".to_owned()),
            "GPTINI_PROFILE" => Some("work".to_owned()),
            "GPTINI_API_URL" => Some("  ".to_owned()),
            _ => None,
        })
        .expect("config must load");

        assert_eq!(config.server.ws_url, "http://localhost:8080/ws");
        assert_eq!(config.server.api_url, "https://api.gptini.org");
        assert_eq!(config.profile, "work");
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = tempfile::tempdir().expect("temp dir must be created");
        let config_path = dir.path().join("config.toml");
        fs::write(&config_path, "[realtime]\nreconnect_delay_ms = \"soon\"\n")
            .expect("must write test config");

        let error = load_with_env(Some(&config_path), no_env).expect_err("must fail");

        assert!(matches!(error, AppError::ConfigParse { .. }));
    }
}
