use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to read config file at {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file at {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("failed to resolve storage path: {details}")]
    StoragePathResolution { details: String },
    #[error("failed to create storage directory at {path}: {source}")]
    StorageDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read credentials at {path}: {source}")]
    CredentialsRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse credentials at {path}: {source}")]
    CredentialsParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("failed to encode credentials: {0}")]
    CredentialsEncode(#[source] toml::ser::Error),
    #[error("failed to write credentials at {path}: {source}")]
    CredentialsWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("another gptini instance is already running for this profile (lock: {path})")]
    InstanceBusy { path: PathBuf },
    #[error("failed to acquire instance lock at {path}: {source}")]
    InstanceLock {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to initialize logging: {0}")]
    LoggingInit(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
}
