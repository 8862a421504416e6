use crate::infra::{
    contracts::CredentialStore, credentials::Credentials, error::AppError,
    instance_lock::InstanceLock, storage_layout::StorageLayout,
};

const STARTUP_CREDENTIALS_UNREADABLE: &str = "STARTUP_CREDENTIALS_UNREADABLE";

#[derive(Debug)]
pub enum StartupFlowState {
    LaunchSession(Credentials),
    GuidedLogin,
}

#[derive(Debug)]
pub struct StartupPlan {
    /// Held until exit so a second client cannot open the same profile.
    pub lock: InstanceLock,
    pub state: StartupFlowState,
}

pub fn plan_startup(
    layout: &StorageLayout,
    store: &dyn CredentialStore,
) -> Result<StartupPlan, AppError> {
    let lock = InstanceLock::acquire(&layout.instance_lock_file())?;

    let state = match store.load() {
        Ok(Some(credentials)) => StartupFlowState::LaunchSession(credentials),
        Ok(None) => StartupFlowState::GuidedLogin,
        Err(error @ AppError::CredentialsParse { .. }) => {
            tracing::warn!(
                code = STARTUP_CREDENTIALS_UNREADABLE,
                error = %error,
                "stored credentials are unreadable; asking for login"
            );
            StartupFlowState::GuidedLogin
        }
        Err(error) => return Err(error),
    };

    Ok(StartupPlan { lock, state })
}
