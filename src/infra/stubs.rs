use std::sync::Mutex;

use crate::infra::{contracts::CredentialStore, credentials::Credentials, error::AppError};

#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    stored: Mutex<Option<Credentials>>,
}

impl InMemoryCredentialStore {
    pub fn with(credentials: Credentials) -> Self {
        Self {
            stored: Mutex::new(Some(credentials)),
        }
    }

    pub fn current(&self) -> Option<Credentials> {
        self.stored
            .lock()
            .expect("credential stub lock must not be poisoned")
            .clone()
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn load(&self) -> Result<Option<Credentials>, AppError> {
        Ok(self.current())
    }

    fn save(&self, credentials: &Credentials) -> Result<(), AppError> {
        *self
            .stored
            .lock()
            .expect("credential stub lock must not be poisoned") = Some(credentials.clone());
        Ok(())
    }

    fn clear(&self) -> Result<bool, AppError> {
        Ok(self
            .stored
            .lock()
            .expect("credential stub lock must not be poisoned")
            .take()
            .is_some())
    }
}

pub fn sample_credentials() -> Credentials {
    Credentials {
        access_token: "access-token".to_owned(),
        refresh_token: "refresh-token".to_owned(),
        user_id: 5,
        nickname: "mina".to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_store_tracks_login_state() {
        let store = InMemoryCredentialStore::default();
        assert!(!store.is_logged_in());

        store.save(&sample_credentials()).expect("save must succeed");
        assert!(store.is_logged_in());

        assert!(store.clear().expect("clear must succeed"));
        assert!(!store.is_logged_in());
    }
}
