use std::{env, path::Path, sync::Arc};

use anyhow::Result;

use crate::{
    api::{self, ApiClient},
    cli::{Cli, Command},
    console::{
        self,
        frontend::{spawn_stdin_lines, ConsoleFrontend},
        prompt::StdTerminal,
    },
    domain,
    infra::{
        self,
        config::DEFAULT_PROFILE,
        contracts::CredentialStore,
        credentials::{Credentials, FileCredentialStore},
        instance_lock::InstanceLock,
        storage_layout::StorageLayout,
    },
    realtime::{self, connection::StompConnector, session::ChatSession},
    usecases::{
        self, bootstrap,
        context::AppContext,
        guided_login::{run_guided_login, GuidedLoginOutcome, RetryPolicy},
        live::{connection_settings, LiveDriver, LiveExit, StoredCredentials},
        logout::logout,
        startup::{plan_startup, StartupFlowState},
    },
};

const LIVE_SESSION_ENDED: &str = "LIVE_SESSION_ENDED";

pub fn run(cli: Cli) -> Result<()> {
    tracing::debug!(
        api = api::module_name(),
        console = console::module_name(),
        domain = domain::module_name(),
        realtime = realtime::module_name(),
        usecases = usecases::module_name(),
        infra = infra::module_name(),
        "module boundaries loaded"
    );

    match cli.command_or_default() {
        Command::Run => {
            let context = bootstrap::bootstrap(cli.config.as_deref())?;
            block_on(run_chat(&context))?;
        }
        Command::Login => {
            let context = bootstrap::bootstrap(cli.config.as_deref())?;
            let _lock = InstanceLock::acquire(&context.layout.instance_lock_file())?;
            if context.credentials.is_logged_in() {
                println!("Already signed in. Signing in again replaces the stored account.");
            }
            if block_on(guided_login(&context))?.is_none() {
                tracing::info!("login cancelled");
            }
        }
        Command::Logout => {
            let store = logout_store(cli.config.as_deref())?;
            let outcome = logout(store.as_ref())?;
            tracing::info!(
                credentials_removed = outcome.credentials_removed,
                "logout completed"
            );
            println!("Logged out. Run gptini login to sign in again.");
        }
    }

    Ok(())
}

/// Runs `task` on a fresh multi-threaded runtime.
///
/// The runtime is shut down without waiting for the stdin reader, which
/// stays blocked in a read until the process exits.
fn block_on<T>(task: impl std::future::Future<Output = Result<T>>) -> Result<T> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(task);
    runtime.shutdown_background();
    result
}

async fn run_chat(context: &AppContext) -> Result<()> {
    let startup = plan_startup(&context.layout, context.credentials.as_ref())?;

    let credentials = match startup.state {
        StartupFlowState::LaunchSession(credentials) => credentials,
        StartupFlowState::GuidedLogin => match guided_login(context).await? {
            Some(credentials) => credentials,
            None => return Ok(()),
        },
    };

    let exit = run_live(context, &credentials).await?;
    tracing::info!(code = LIVE_SESSION_ENDED, exit = ?exit, "live session ended");

    match exit {
        LiveExit::Quit | LiveExit::InputClosed => println!("Bye."),
        LiveExit::LoggedOut => {
            logout(context.credentials.as_ref())?;
            println!("Logged out. Run gptini login to sign in again.");
        }
        LiveExit::AuthExpired => {
            logout(context.credentials.as_ref())?;
            eprintln!("Session expired. Run gptini login to sign in again.");
        }
    }

    drop(startup.lock);
    Ok(())
}

async fn guided_login(context: &AppContext) -> Result<Option<Credentials>> {
    let api = ApiClient::new(&context.config.server.api_url)?;
    let mut terminal = StdTerminal;

    let outcome = run_guided_login(
        &mut terminal,
        &api,
        context.credentials.as_ref(),
        &RetryPolicy::default(),
    )
    .await?;

    Ok(match outcome {
        GuidedLoginOutcome::Authenticated(credentials) => Some(credentials),
        GuidedLoginOutcome::ExitWithGuidance => None,
    })
}

async fn run_live(context: &AppContext, credentials: &Credentials) -> Result<LiveExit> {
    let server = &context.config.server;
    let api = Arc::new(ApiClient::new(&server.api_url)?.with_token(&credentials.access_token));

    let connector = StompConnector::new(
        connection_settings(&context.config.realtime),
        Arc::new(StoredCredentials::new(
            Arc::clone(&context.credentials),
            server.ws_url.clone(),
        )),
    );
    let (session, events) = ChatSession::new(connector, context.config.realtime.read_flush_delay());

    let mut driver = LiveDriver::new(
        session,
        events,
        api.clone(),
        api,
        credentials.nickname.clone(),
    );
    driver.start(credentials.user_id);

    let mut frontend = ConsoleFrontend::new(std::io::stdout());
    Ok(driver.run(spawn_stdin_lines(), &mut frontend).await)
}

/// Credential store for `logout`, reachable even when the config file is broken.
fn logout_store(config_path: Option<&Path>) -> Result<Arc<dyn CredentialStore>> {
    match bootstrap::bootstrap(config_path) {
        Ok(context) => Ok(context.credentials),
        Err(error) => {
            tracing::warn!(
                error = ?error,
                "logout fallback: bootstrap failed, clearing credentials of the env profile"
            );
            let profile = env::var("GPTINI_PROFILE")
                .ok()
                .filter(|profile| !profile.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_PROFILE.to_owned());
            let layout = StorageLayout::resolve(profile.trim())?;
            Ok(Arc::new(FileCredentialStore::new(layout.credentials_file())))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{env, fs};

    use super::*;
    use crate::{infra::stubs::sample_credentials, test_support::env_lock};

    #[test]
    fn logout_succeeds_when_config_is_broken() {
        let _guard = env_lock();
        let root = tempfile::tempdir().expect("temp dir must be created");
        let xdg = root.path().join("xdg");
        fs::create_dir_all(&xdg).expect("xdg dir should be creatable");

        let old_xdg = env::var_os("XDG_CONFIG_HOME");
        let old_profile = env::var_os("GPTINI_PROFILE");
        // SAFETY: env is guarded by process-wide test mutex.
        unsafe {
            env::set_var("XDG_CONFIG_HOME", &xdg);
            env::remove_var("GPTINI_PROFILE");
        }

        let config_path = root.path().join("broken-config.toml");
        fs::write(&config_path, "[server\napi_url = ").expect("config fixture should be writable");

        let layout = StorageLayout::resolve(DEFAULT_PROFILE).expect("layout");
        layout.ensure_dirs().expect("layout dirs should be created");
        let store = FileCredentialStore::new(layout.credentials_file());
        store
            .save(&sample_credentials())
            .expect("credentials should be written");

        let result = run(Cli {
            config: Some(config_path),
            command: Some(Command::Logout),
        });

        // SAFETY: restoring env while guard is held.
        unsafe {
            match old_xdg {
                Some(value) => env::set_var("XDG_CONFIG_HOME", value),
                None => env::remove_var("XDG_CONFIG_HOME"),
            }
            if let Some(value) = old_profile {
                env::set_var("GPTINI_PROFILE", value);
            }
        }

        result.expect("logout should succeed despite a broken config");
        assert!(!layout.credentials_file().exists());
    }
}
