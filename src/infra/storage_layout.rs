use std::{env, fs, path::PathBuf};

use crate::infra::{config::DEFAULT_PROFILE, error::AppError};

const APP_DIR_NAME: &str = "gptini";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLayout {
    pub config_dir: PathBuf,
    pub logs_dir: PathBuf,
}

impl StorageLayout {
    /// Resolves the profile's directory under `$XDG_CONFIG_HOME`, falling
    /// back to the platform config directory.
    pub fn resolve(profile: &str) -> Result<Self, AppError> {
        let config_base = env::var_os("XDG_CONFIG_HOME")
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
            .or_else(dirs::config_dir)
            .ok_or_else(|| AppError::StoragePathResolution {
                details: "unable to resolve config base directory (XDG_CONFIG_HOME/HOME)".into(),
            })?;

        Ok(Self::under(config_base, profile))
    }

    pub fn under(config_base: PathBuf, profile: &str) -> Self {
        let config_dir = config_base.join(profile_dir_name(profile));
        let logs_dir = config_dir.join("logs");

        Self {
            config_dir,
            logs_dir,
        }
    }

    pub fn ensure_dirs(&self) -> Result<(), AppError> {
        for dir in [&self.config_dir, &self.logs_dir] {
            fs::create_dir_all(dir).map_err(|source| AppError::StorageDirCreate {
                path: dir.clone(),
                source,
            })?;
        }

        Ok(())
    }

    pub fn credentials_file(&self) -> PathBuf {
        self.config_dir.join("credentials.toml")
    }

    pub fn instance_lock_file(&self) -> PathBuf {
        self.config_dir.join("instance.lock")
    }
}

fn profile_dir_name(profile: &str) -> String {
    let profile = profile.trim();
    if profile.is_empty() || profile == DEFAULT_PROFILE {
        APP_DIR_NAME.to_owned()
    } else {
        format!("{APP_DIR_NAME}-{profile}")
    }
}
