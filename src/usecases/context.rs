use std::sync::Arc;

use tracing_appender::non_blocking::WorkerGuard;

use crate::infra::{
    config::AppConfig, contracts::CredentialStore, storage_layout::StorageLayout,
};

pub struct AppContext {
    pub config: AppConfig,
    pub layout: StorageLayout,
    pub credentials: Arc<dyn CredentialStore>,
    log_guard: Option<WorkerGuard>,
}

impl AppContext {
    pub fn new(
        config: AppConfig,
        layout: StorageLayout,
        credentials: Arc<dyn CredentialStore>,
    ) -> Self {
        Self {
            config,
            layout,
            credentials,
            log_guard: None,
        }
    }

    /// Keeps the log writer flushing until the context is dropped.
    pub fn hold_log_guard(&mut self, guard: WorkerGuard) {
        self.log_guard = Some(guard);
    }
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("config", &self.config)
            .field("layout", &self.layout)
            .field("logging_active", &self.log_guard.is_some())
            .finish_non_exhaustive()
    }
}
