use std::{path::Path, sync::Arc};

use crate::{
    infra::{
        self, credentials::FileCredentialStore, error::AppError, storage_layout::StorageLayout,
    },
    usecases::context::AppContext,
};

pub fn bootstrap(config_path: Option<&Path>) -> Result<AppContext, AppError> {
    let mut context = build_context(config_path)?;
    let guard = infra::logging::init(&context.config.logging, &context.layout.logs_dir)?;
    context.hold_log_guard(guard);

    tracing::info!(
        profile = %context.config.profile,
        api_url = %context.config.server.api_url,
        "gptini started"
    );

    Ok(context)
}

fn build_context(config_path: Option<&Path>) -> Result<AppContext, AppError> {
    let config = infra::config::load(config_path)?;
    let layout = StorageLayout::resolve(&config.profile)?;
    layout.ensure_dirs()?;

    let credentials = Arc::new(FileCredentialStore::new(layout.credentials_file()));

    Ok(AppContext::new(config, layout, credentials))
}
