use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "gptini", about = "GPTini terminal chat client")]
pub struct Cli {
    /// Path to config file (default: ./config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Open the room list and start chatting
    Run,
    /// Sign in and store the account for later runs
    Login,
    /// Forget the stored account
    Logout,
}

impl Cli {
    pub fn command_or_default(&self) -> Command {
        self.command.clone().unwrap_or(Command::Run)
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{Cli, Command};

    #[test]
    fn defaults_to_run_when_command_is_missing() {
        let cli = Cli::parse_from(["gptini"]);

        assert_eq!(cli.command_or_default(), Command::Run);
    }

    #[test]
    fn parses_explicit_run_command() {
        let cli = Cli::parse_from(["gptini", "run", "--config", "custom.toml"]);

        assert_eq!(cli.command_or_default(), Command::Run);
        assert_eq!(
            cli.config
                .as_deref()
                .map(|p| p.to_string_lossy().to_string()),
            Some("custom.toml".to_owned())
        );
    }

    #[test]
    fn parses_login_and_logout_commands() {
        assert_eq!(
            Cli::parse_from(["gptini", "login"]).command_or_default(),
            Command::Login
        );
        assert_eq!(
            Cli::parse_from(["gptini", "--config", "c.toml", "logout"]).command_or_default(),
            Command::Logout
        );
    }
}
