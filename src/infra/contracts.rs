use crate::infra::{credentials::Credentials, error::AppError};

/// Persistent login state of one profile.
pub trait CredentialStore: Send + Sync {
    fn load(&self) -> Result<Option<Credentials>, AppError>;

    fn save(&self, credentials: &Credentials) -> Result<(), AppError>;

    /// Removes stored credentials; returns false when none were stored.
    fn clear(&self) -> Result<bool, AppError>;

    fn is_logged_in(&self) -> bool {
        matches!(self.load(), Ok(Some(_)))
    }
}
