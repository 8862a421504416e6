use async_trait::async_trait;

use crate::{
    domain::account::{Profile, TokenPair},
    infra::{contracts::CredentialStore, credentials::Credentials, error::AppError},
};

const AUTH_LOGIN_SUCCEEDED: &str = "AUTH_LOGIN_SUCCEEDED";

#[derive(Clone, PartialEq, Eq)]
pub struct LoginCommand {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for LoginCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginCommand")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginSourceError {
    Unauthorized,
    Unavailable,
    InvalidData,
}

#[async_trait]
pub trait LoginSource: Send + Sync {
    async fn login(&self, email: &str, password: &str) -> Result<TokenPair, LoginSourceError>;

    /// Resolves the account behind `access_token`.
    async fn profile(&self, access_token: &str) -> Result<Profile, LoginSourceError>;
}

#[derive(Debug)]
pub enum LoginError {
    InvalidEmail,
    EmptyPassword,
    InvalidCredentials,
    TemporarilyUnavailable,
    DataContractViolation,
    Storage(AppError),
}

impl LoginError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::InvalidEmail => "Enter a valid email address.",
            Self::EmptyPassword => "Password must not be empty.",
            Self::InvalidCredentials => "Login failed: wrong email or password.",
            Self::TemporarilyUnavailable => "Server is unreachable. Try again later.",
            Self::DataContractViolation => "Server returned an unexpected response.",
            Self::Storage(_) => "Could not save credentials on this machine.",
        }
    }
}

/// Exchanges email and password for tokens, binds the account and persists
/// the result. Nothing is stored unless every step succeeds.
pub async fn login(
    source: &dyn LoginSource,
    store: &dyn CredentialStore,
    command: LoginCommand,
) -> Result<Credentials, LoginError> {
    let email = command.email.trim();
    if !email.contains('@') {
        return Err(LoginError::InvalidEmail);
    }
    if command.password.is_empty() {
        return Err(LoginError::EmptyPassword);
    }

    let tokens = source
        .login(email, &command.password)
        .await
        .map_err(map_source_error)?;
    let profile = source
        .profile(&tokens.access_token)
        .await
        .map_err(map_source_error)?;

    let credentials = Credentials {
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
        user_id: profile.id,
        nickname: profile.nickname,
    };
    store.save(&credentials).map_err(LoginError::Storage)?;

    tracing::info!(
        code = AUTH_LOGIN_SUCCEEDED,
        user_id = credentials.user_id,
        "login completed"
    );
    Ok(credentials)
}

fn map_source_error(error: LoginSourceError) -> LoginError {
    match error {
        LoginSourceError::Unauthorized => LoginError::InvalidCredentials,
        LoginSourceError::Unavailable => LoginError::TemporarilyUnavailable,
        LoginSourceError::InvalidData => LoginError::DataContractViolation,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::infra::stubs::InMemoryCredentialStore;

    struct StubSource {
        login: Result<TokenPair, LoginSourceError>,
        profile: Result<Profile, LoginSourceError>,
        captured_email: Mutex<Option<String>>,
        captured_token: Mutex<Option<String>>,
    }

    impl StubSource {
        fn ok() -> Self {
            Self {
                login: Ok(TokenPair {
                    access_token: "acc".to_owned(),
                    refresh_token: "ref".to_owned(),
                }),
                profile: Ok(Profile {
                    id: 5,
                    nickname: "mina".to_owned(),
                }),
                captured_email: Mutex::new(None),
                captured_token: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl LoginSource for StubSource {
        async fn login(&self, email: &str, _password: &str) -> Result<TokenPair, LoginSourceError> {
            *self.captured_email.lock().expect("email lock") = Some(email.to_owned());
            self.login.clone()
        }

        async fn profile(&self, access_token: &str) -> Result<Profile, LoginSourceError> {
            *self.captured_token.lock().expect("token lock") = Some(access_token.to_owned());
            self.profile.clone()
        }
    }

    fn command(email: &str, password: &str) -> LoginCommand {
        LoginCommand {
            email: email.to_owned(),
            password: password.to_owned(),
        }
    }

    #[tokio::test]
    async fn stores_tokens_and_bound_user() {
        let source = StubSource::ok();
        let store = InMemoryCredentialStore::default();

        let credentials = login(&source, &store, command(" mina@gptini.org ", "pw"))
            .await
            .expect("login should succeed");

        assert_eq!(credentials.user_id, 5);
        assert_eq!(store.current(), Some(credentials));
        assert_eq!(
            source.captured_email.lock().expect("email lock").as_deref(),
            Some("mina@gptini.org")
        );
        assert_eq!(
            source.captured_token.lock().expect("token lock").as_deref(),
            Some("acc")
        );
    }

    #[tokio::test]
    async fn rejects_email_without_at_sign() {
        let source = StubSource::ok();
        let store = InMemoryCredentialStore::default();

        let err = login(&source, &store, command("mina", "pw"))
            .await
            .expect_err("must fail");

        assert!(matches!(err, LoginError::InvalidEmail));
        assert!(source.captured_email.lock().expect("email lock").is_none());
    }

    #[tokio::test]
    async fn rejects_empty_password() {
        let source = StubSource::ok();
        let store = InMemoryCredentialStore::default();

        let err = login(&source, &store, command("mina@gptini.org", ""))
            .await
            .expect_err("must fail");

        assert!(matches!(err, LoginError::EmptyPassword));
    }

    #[tokio::test]
    async fn unauthorized_maps_to_invalid_credentials() {
        let mut source = StubSource::ok();
        source.login = Err(LoginSourceError::Unauthorized);
        let store = InMemoryCredentialStore::default();

        let err = login(&source, &store, command("mina@gptini.org", "bad"))
            .await
            .expect_err("must fail");

        assert!(matches!(err, LoginError::InvalidCredentials));
        assert!(!store.is_logged_in());
    }

    #[tokio::test]
    async fn failed_profile_lookup_stores_nothing() {
        let mut source = StubSource::ok();
        source.profile = Err(LoginSourceError::Unavailable);
        let store = InMemoryCredentialStore::default();

        let err = login(&source, &store, command("mina@gptini.org", "pw"))
            .await
            .expect_err("must fail");

        assert!(matches!(err, LoginError::TemporarilyUnavailable));
        assert!(!store.is_logged_in());
    }
}
