//! Directory layout for hostdeck.
//!
//! # Storage Structure
//!
//! ```text
//! ~/.hostdeck/
//! ├── config/       # config.toml
//! └── logs/         # hostdeck.log
//! ```
//!
//! # Environment Variables
//!
//! - `HOSTDECK_STATE_DIR`: Override the base state directory
//! - `HOSTDECK_LOG_DIR`: Override the log directory
//! - `HOSTDECK_CONFIG_DIR`: Override the config directory

use std::path::{Path, PathBuf};

/// Environment variable for custom state directory.
pub const STATE_DIR_ENV: &str = "HOSTDECK_STATE_DIR";

/// Environment variable for custom log directory.
pub const LOG_DIR_ENV: &str = "HOSTDECK_LOG_DIR";

/// Environment variable for custom config directory.
pub const CONFIG_DIR_ENV: &str = "HOSTDECK_CONFIG_DIR";

/// Default state directory name under home.
const DEFAULT_STATE_DIR: &str = ".hostdeck";

const LOGS_SUBDIR: &str = "logs";
const CONFIG_SUBDIR: &str = "config";

/// Resolved locations of everything hostdeck keeps on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    state_dir: PathBuf,
    config_dir: PathBuf,
    logs_dir: PathBuf,
}

impl Paths {
    /// Layout rooted at `state_dir`, ignoring environment overrides.
    pub fn with_state_dir(state_dir: impl Into<PathBuf>) -> Self {
        let state_dir = state_dir.into();
        Self {
            config_dir: state_dir.join(CONFIG_SUBDIR),
            logs_dir: state_dir.join(LOGS_SUBDIR),
            state_dir,
        }
    }

    /// Layout from the environment.
    ///
    /// The state directory is determined by:
    /// 1. `explicit`, typically from the command line
    /// 2. `HOSTDECK_STATE_DIR` environment variable if set
    /// 3. `~/.hostdeck` if home directory is available
    /// 4. `.hostdeck` in current directory as fallback
    ///
    /// `HOSTDECK_CONFIG_DIR` and `HOSTDECK_LOG_DIR` then override the
    /// subdirectories individually.
    pub fn resolve(explicit: Option<&Path>) -> Self {
        let state_dir = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(STATE_DIR_ENV).map(PathBuf::from))
            .unwrap_or_else(default_state_dir);

        let mut paths = Self::with_state_dir(state_dir);
        if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV) {
            paths.config_dir = PathBuf::from(dir);
        }
        if let Some(dir) = std::env::var_os(LOG_DIR_ENV) {
            paths.logs_dir = PathBuf::from(dir);
        }
        paths
    }

    /// Base state directory.
    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    /// User config directory.
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Log directory.
    pub fn logs_dir(&self) -> &Path {
        &self.logs_dir
    }

    /// The settings file, `config/config.toml`.
    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    /// The default log file, `logs/hostdeck.log`.
    pub fn log_file(&self) -> PathBuf {
        self.logs_dir.join("hostdeck.log")
    }

    /// Ensure the state directory and all subdirectories exist.
    ///
    /// # Errors
    /// Returns an error if any directory cannot be created.
    pub fn ensure_all_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.state_dir)?;
        std::fs::create_dir_all(&self.config_dir)?;
        std::fs::create_dir_all(&self.logs_dir)?;
        Ok(())
    }
}

fn default_state_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(DEFAULT_STATE_DIR))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_DIR))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_under_state_dir() {
        let paths = Paths::with_state_dir("/srv/hostdeck");
        assert_eq!(paths.state_dir(), Path::new("/srv/hostdeck"));
        assert_eq!(paths.config_dir(), Path::new("/srv/hostdeck/config"));
        assert_eq!(paths.logs_dir(), Path::new("/srv/hostdeck/logs"));
        assert_eq!(paths.config_file(), Path::new("/srv/hostdeck/config/config.toml"));
        assert_eq!(paths.log_file(), Path::new("/srv/hostdeck/logs/hostdeck.log"));
    }

    #[test]
    fn test_explicit_state_dir_wins() {
        let paths = Paths::resolve(Some(Path::new("/tmp/explicit")));
        assert_eq!(paths.state_dir(), Path::new("/tmp/explicit"));
    }

    #[test]
    fn test_default_state_dir_name() {
        assert!(default_state_dir().ends_with(".hostdeck"));
    }

    #[test]
    fn test_ensure_all_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = Paths::with_state_dir(tmp.path().join("state"));
        paths.ensure_all_dirs().unwrap();

        assert!(paths.config_dir().is_dir());
        assert!(paths.logs_dir().is_dir());
    }
}
