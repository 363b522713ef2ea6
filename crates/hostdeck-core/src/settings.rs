//! User settings, stored as TOML in `config/config.toml`.
//!
//! Every key is optional; a file only needs the values it changes.
//!
//! ```toml
//! [general]
//! pager = "less -R"
//!
//! [hosts]
//! default-ssh-domain = "lab.example.org"
//! default-ssh-user = "admin"
//!
//! [nix]
//! workers = 4
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ConfigError, Result};

/// All user-tunable settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Settings {
    pub general: GeneralSettings,
    pub commands: CommandSettings,
    pub hosts: HostSettings,
    pub nix: NixSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct GeneralSettings {
    /// Command line used to page runner output.
    pub pager: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            pager: "less".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CommandSettings {
    /// Commands run, in order, to collect a host's status.
    pub status_cmds: Vec<String>,
}

impl Default for CommandSettings {
    fn default() -> Self {
        Self {
            status_cmds: [
                "date",
                "systemctl --failed",
                "nixos-rebuild --no-build-nix list-generations",
                "uname -a",
                "uptime",
                "df -h -x tmpfs -x overlay",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct HostSettings {
    /// Appended to deploy hosts without a dot.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_ssh_domain: Option<String>,
    /// Used when a host does not name a deploy user.
    pub default_ssh_user: String,
    /// Attribute path, relative to the host's configuration, naming the
    /// address to deploy to.
    pub deploy_host_attr: String,
    /// Attribute path naming the user to deploy as.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deploy_user_attr: Option<String>,
}

impl Default for HostSettings {
    fn default() -> Self {
        Self {
            default_ssh_domain: None,
            default_ssh_user: "root".to_string(),
            deploy_host_attr: "target.config.networking.fqdnOrHostName".to_string(),
            deploy_user_attr: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct NixSettings {
    /// Passed as `--build-host` when deploying. `localhost` builds locally.
    pub default_build_host: String,
    /// Maximum concurrent `nix eval` processes.
    pub workers: usize,
    /// How long to wait for a free evaluation worker.
    pub worker_timeout_secs: u64,
}

impl Default for NixSettings {
    fn default() -> Self {
        Self {
            default_build_host: "localhost".to_string(),
            workers: 2,
            worker_timeout_secs: 30,
        }
    }
}

impl NixSettings {
    pub fn worker_timeout(&self) -> Duration {
        Duration::from_secs(self.worker_timeout_secs)
    }
}

impl Settings {
    /// Parse settings from TOML text, filling gaps with defaults.
    pub fn from_toml(text: &str, origin: &Path) -> Result<Self> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })
    }

    /// Load settings from `path`.
    ///
    /// A missing file yields the defaults unless `required` is set.
    pub fn load(path: &Path, required: bool) -> Result<Self> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                if required {
                    return Err(ConfigError::NotFound(path.to_path_buf()));
                }
                warn!(path = %path.display(), "config file not found, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let settings = Self::from_toml(&text, path)?;
        debug!(path = %path.display(), "config loaded");
        Ok(settings)
    }

    /// Render these settings as TOML with an explanatory header.
    pub fn to_toml_with_header(&self) -> Result<String> {
        let body = toml::to_string_pretty(self)?;
        Ok(format!(
            "# hostdeck configuration\n\
             #\n\
             # Place this file at ~/.hostdeck/config/config.toml.\n\
             # Every key is optional; omitted keys use the values below.\n\n\
             {}",
            body
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.general.pager, "less");
        assert_eq!(settings.commands.status_cmds.len(), 6);
        assert_eq!(settings.commands.status_cmds[0], "date");
        assert_eq!(settings.hosts.default_ssh_user, "root");
        assert_eq!(settings.nix.default_build_host, "localhost");
        assert_eq!(settings.nix.workers, 2);
        assert_eq!(settings.nix.worker_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_partial_file_overlays_defaults() {
        let text = r#"
            [hosts]
            default-ssh-domain = "lab.example.org"

            [nix]
            workers = 5
        "#;
        let settings = Settings::from_toml(text, Path::new("test.toml")).unwrap();

        assert_eq!(settings.hosts.default_ssh_domain.as_deref(), Some("lab.example.org"));
        assert_eq!(settings.hosts.default_ssh_user, "root");
        assert_eq!(settings.nix.workers, 5);
        assert_eq!(settings.nix.worker_timeout_secs, 30);
        assert_eq!(settings.general.pager, "less");
    }

    #[test]
    fn test_bad_toml_names_file() {
        let err = Settings::from_toml("[nix]\nworkers = \"many\"", Path::new("bad.toml"))
            .unwrap_err();
        assert!(err.to_string().contains("bad.toml"));
    }

    #[test]
    fn test_load_missing_optional() {
        let tmp = tempfile::tempdir().unwrap();
        let settings = Settings::load(&tmp.path().join("none.toml"), false).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_load_missing_required() {
        let tmp = tempfile::tempdir().unwrap();
        let err = Settings::load(&tmp.path().join("none.toml"), true).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_load_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[general]\npager = \"most\"\n").unwrap();

        let settings = Settings::load(&path, true).unwrap();
        assert_eq!(settings.general.pager, "most");
    }

    #[test]
    fn test_header_output_parses_back() {
        let text = Settings::default().to_toml_with_header().unwrap();
        assert!(text.starts_with("# hostdeck configuration"));
        assert!(text.contains("status-cmds"));

        let parsed = Settings::from_toml(&text, Path::new("defaults.toml")).unwrap();
        assert_eq!(parsed, Settings::default());
    }
}
