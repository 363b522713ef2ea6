//! Command-line interface definition using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Build version string with git hash and build date.
fn version_string() -> &'static str {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    const GIT_HASH: &str = env!("GIT_HASH");
    const BUILD_DATE: &str = env!("BUILD_DATE");

    // Format: "0.1.0 (abc1234, 2026-01-29)"
    static VERSION_STRING: std::sync::OnceLock<String> = std::sync::OnceLock::new();
    VERSION_STRING.get_or_init(|| format!("{} ({}, {})", VERSION, GIT_HASH, BUILD_DATE))
}

/// hostdeck - deploy and inspect the NixOS hosts of a flake
#[derive(Parser, Debug)]
#[command(name = "hostdeck")]
#[command(author, version = version_string(), about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to state directory
    #[arg(short, long, env = "HOSTDECK_STATE_DIR", global = true)]
    pub state_dir: Option<PathBuf>,

    /// Config file (default: <state-dir>/config/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Flake defining the hosts
    #[arg(short, long, env = "HOSTDECK_FLAKE", default_value = ".", global = true)]
    pub flake: String,

    /// Log file (default: <state-dir>/logs/hostdeck.log)
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Interactive dashboard (default)
    Tui,

    /// List the hosts defined by the flake
    Hosts,

    /// Print the default configuration
    Defaults,

    /// Collect a host's status
    Status {
        /// Host name from the flake
        #[arg(required = true)]
        host: String,
    },

    /// Run a command on a host
    Run {
        /// Host name from the flake
        #[arg(required = true)]
        host: String,

        /// Command and arguments
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },

    /// Deploy the flake's configuration to a host
    Deploy {
        /// Host name from the flake
        #[arg(required = true)]
        host: String,
    },
}

impl Cli {
    /// Flake path with `~` and environment variables expanded.
    pub fn flake_path(&self) -> PathBuf {
        match shellexpand::full(&self.flake) {
            Ok(expanded) => PathBuf::from(expanded.as_ref()),
            Err(_) => PathBuf::from(shellexpand::tilde(&self.flake).as_ref()),
        }
    }

    /// Returns the log level based on verbosity.
    pub fn log_level(&self) -> tracing::Level {
        match self.verbose {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parse_no_args() {
        let cli = Cli::parse_from(["hostdeck"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.log_level(), tracing::Level::WARN);
    }

    #[test]
    fn test_cli_parse_run() {
        let cli = Cli::parse_from(["hostdeck", "run", "web1", "ls", "-l", "/etc"]);
        match cli.command {
            Some(Commands::Run { host, command }) => {
                assert_eq!(host, "web1");
                assert_eq!(command, vec!["ls", "-l", "/etc"]);
            }
            other => panic!("Expected Run command, got {:?}", other),
        }
    }

    #[test]
    fn test_cli_parse_status_with_flake() {
        let cli = Cli::parse_from(["hostdeck", "--flake", "/srv/lab", "status", "db1"]);
        assert_eq!(cli.flake_path(), PathBuf::from("/srv/lab"));
        assert_eq!(
            cli.command,
            Some(Commands::Status {
                host: "db1".to_string()
            })
        );
    }

    #[test]
    fn test_flake_tilde_expanded() {
        let cli = Cli::parse_from(["hostdeck", "--flake", "~/lab"]);
        assert!(!cli.flake_path().starts_with("~"));
    }

    #[test]
    fn test_cli_verbose() {
        let cli = Cli::parse_from(["hostdeck", "-vvv", "hosts"]);
        assert_eq!(cli.verbose, 3);
        assert_eq!(cli.log_level(), tracing::Level::TRACE);
    }

    #[test]
    fn test_cli_help() {
        Cli::command().debug_assert();
    }
}
