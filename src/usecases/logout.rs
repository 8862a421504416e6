use crate::infra::{contracts::CredentialStore, error::AppError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogoutOutcome {
    pub credentials_removed: bool,
}

/// Forgets the stored account. Safe to call when already logged out.
///
/// A running session must be disconnected by its owner before this is called.
pub fn logout(store: &dyn CredentialStore) -> Result<LogoutOutcome, AppError> {
    let credentials_removed = store.clear()?;

    Ok(LogoutOutcome {
        credentials_removed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::stubs::{sample_credentials, InMemoryCredentialStore};

    #[test]
    fn logout_clears_stored_credentials() {
        let store = InMemoryCredentialStore::with(sample_credentials());

        let outcome = logout(&store).expect("logout should succeed");

        assert!(outcome.credentials_removed);
        assert!(!store.is_logged_in());
    }

    #[test]
    fn logout_is_idempotent_when_logged_out() {
        let store = InMemoryCredentialStore::default();

        let outcome = logout(&store).expect("logout should succeed");

        assert!(!outcome.credentials_removed);
    }
}
