//! Settings and paths shared by every hostdeck command.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use hostdeck_core::{Paths, Settings};
use hostdeck_nix::{NixEvaluator, TargetInfo};
use hostdeck_pool::WorkerPool;

use crate::cli::Cli;

/// Result type for command operations.
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

/// Everything a command needs before it touches a host.
#[derive(Debug, Clone)]
pub struct Context {
    pub paths: Paths,
    pub settings: Settings,
    pub flake: PathBuf,
}

impl Context {
    /// Resolve paths and load settings as directed by the command line.
    ///
    /// An explicit `--config` must exist; the default config file may not.
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let paths = Paths::resolve(cli.state_dir.as_deref());

        let settings = match &cli.config {
            Some(path) => Settings::load(path, true)?,
            None => Settings::load(&paths.config_file(), false)?,
        };

        let flake = cli.flake_path();
        debug!(flake = %flake.display(), state_dir = %paths.state_dir().display(), "context loaded");

        Ok(Self {
            paths,
            settings,
            flake,
        })
    }

    /// Context with default settings, for tests and tooling.
    pub fn with_settings(paths: Paths, settings: Settings, flake: impl AsRef<Path>) -> Self {
        Self {
            paths,
            settings,
            flake: flake.as_ref().to_path_buf(),
        }
    }

    /// Locate nix.
    pub fn evaluator(&self) -> Result<NixEvaluator> {
        Ok(NixEvaluator::new()?)
    }

    /// Pool bounding concurrent `nix eval` processes.
    pub fn nix_pool(&self) -> WorkerPool {
        WorkerPool::new("nix", self.settings.nix.workers.max(1))
    }

    /// Host names defined by the flake.
    pub async fn host_names(&self, eval: &NixEvaluator) -> Result<Vec<String>> {
        Ok(eval.host_names(&self.flake).await?)
    }

    /// Target info for `host` with the user's defaults applied.
    pub async fn target(&self, eval: &NixEvaluator, host: &str) -> Result<TargetInfo> {
        let mut target = eval.target_info(&self.flake, host, &self.settings.hosts).await?;
        target.apply_defaults(&self.settings.hosts);
        info!(host, dest = %target.destination(), "target resolved");
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_from_cli_missing_default_config() {
        let tmp = tempfile::tempdir().unwrap();
        let state = tmp.path().to_string_lossy().into_owned();
        let cli = Cli::parse_from(["hostdeck", "--state-dir", &state, "--flake", "/lab"]);

        let ctx = Context::from_cli(&cli).unwrap();
        assert_eq!(ctx.settings, Settings::default());
        assert_eq!(ctx.flake, PathBuf::from("/lab"));
        assert_eq!(ctx.paths.state_dir(), tmp.path());
    }

    #[test]
    fn test_from_cli_explicit_config_must_exist() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("nope.toml").to_string_lossy().into_owned();
        let cli = Cli::parse_from(["hostdeck", "--config", &missing]);

        assert!(Context::from_cli(&cli).is_err());
    }

    #[test]
    fn test_from_cli_explicit_config() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("hostdeck.toml");
        std::fs::write(&path, "[nix]\nworkers = 7\n").unwrap();
        let config = path.to_string_lossy().into_owned();

        let cli = Cli::parse_from(["hostdeck", "--config", &config]);
        let ctx = Context::from_cli(&cli).unwrap();
        assert_eq!(ctx.settings.nix.workers, 7);
        assert_eq!(ctx.nix_pool().capacity(), 7);
    }

    #[test]
    fn test_nix_pool_never_empty() {
        let mut settings = Settings::default();
        settings.nix.workers = 0;
        let ctx = Context::with_settings(Paths::with_state_dir("/tmp/x"), settings, "/lab");
        assert_eq!(ctx.nix_pool().capacity(), 1);
    }
}
