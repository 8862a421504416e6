//! Credential file of one profile: tokens plus the bound user.

use std::{
    fmt, fs,
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{
    domain::UserId,
    infra::{contracts::CredentialStore, error::AppError, secrets::REDACTED},
};

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub access_token: String,
    pub refresh_token: String,
    pub user_id: UserId,
    pub nickname: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &REDACTED)
            .field("refresh_token", &REDACTED)
            .field("user_id", &self.user_id)
            .field("nickname", &self.nickname)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Result<Option<Credentials>, AppError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(source) if source.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(AppError::CredentialsRead {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        toml::from_str(&raw)
            .map(Some)
            .map_err(|source| AppError::CredentialsParse {
                path: self.path.clone(),
                source,
            })
    }

    fn save(&self, credentials: &Credentials) -> Result<(), AppError> {
        let encoded = toml::to_string(credentials).map_err(AppError::CredentialsEncode)?;
        let write_error = |source| AppError::CredentialsWrite {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(write_error)?;
        }

        let mut file = owner_only_options().open(&self.path).map_err(write_error)?;
        file.write_all(encoded.as_bytes()).map_err(write_error)?;
        restrict_permissions(&self.path).map_err(write_error)?;

        Ok(())
    }

    fn clear(&self) -> Result<bool, AppError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(source) if source.kind() == ErrorKind::NotFound => Ok(false),
            Err(source) => Err(AppError::CredentialsWrite {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

fn owner_only_options() -> fs::OpenOptions {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    options
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}
