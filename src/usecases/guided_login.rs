//! Interactive email/password login on a line terminal.

use std::io;

use crate::infra::{contracts::CredentialStore, credentials::Credentials};

use super::login::{login, LoginCommand, LoginError, LoginSource};

const AUTH_LOGIN_FAILED: &str = "AUTH_LOGIN_FAILED";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: usize,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { attempts: 3 }
    }
}

pub trait LoginTerminal {
    fn print_line(&mut self, line: &str) -> io::Result<()>;
    fn prompt_line(&mut self, prompt: &str) -> io::Result<Option<String>>;
    fn prompt_secret(&mut self, prompt: &str) -> io::Result<Option<String>>;
}

#[derive(Debug)]
pub enum GuidedLoginOutcome {
    Authenticated(Credentials),
    ExitWithGuidance,
}

pub async fn run_guided_login(
    terminal: &mut dyn LoginTerminal,
    source: &dyn LoginSource,
    store: &dyn CredentialStore,
    retry_policy: &RetryPolicy,
) -> io::Result<GuidedLoginOutcome> {
    terminal.print_line("Not logged in. Sign in with your GPTini account.")?;

    for attempt in 1..=retry_policy.attempts {
        let attempts_left = retry_policy.attempts.saturating_sub(attempt);

        let Some(email) = terminal.prompt_line("Email: ")? else {
            terminal.print_line("Input cancelled (EOF). Run gptini again to retry.")?;
            return Ok(GuidedLoginOutcome::ExitWithGuidance);
        };
        let Some(password) = terminal.prompt_secret("Password: ")? else {
            terminal.print_line("Input cancelled (EOF). Run gptini again to retry.")?;
            return Ok(GuidedLoginOutcome::ExitWithGuidance);
        };

        match login(source, store, LoginCommand { email, password }).await {
            Ok(credentials) => {
                terminal.print_line(&format!("Welcome, {}!", credentials.nickname))?;
                return Ok(GuidedLoginOutcome::Authenticated(credentials));
            }
            Err(error) => {
                if let LoginError::Storage(source) = &error {
                    tracing::error!(code = AUTH_LOGIN_FAILED, error = %source, "credentials not saved");
                } else {
                    tracing::warn!(code = AUTH_LOGIN_FAILED, error = ?error, "login attempt rejected");
                }

                terminal.print_line(&format!(
                    "{} Attempts left: {attempts_left}",
                    error.user_message()
                ))?;

                if !is_retryable(&error) {
                    return Ok(GuidedLoginOutcome::ExitWithGuidance);
                }
            }
        }
    }

    terminal.print_line("Login failed too many times. Please restart gptini and try again.")?;
    Ok(GuidedLoginOutcome::ExitWithGuidance)
}

fn is_retryable(error: &LoginError) -> bool {
    !matches!(
        error,
        LoginError::Storage(_) | LoginError::DataContractViolation
    )
}
