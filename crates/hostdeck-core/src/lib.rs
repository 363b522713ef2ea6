//! Hostdeck Core - configuration shared by the CLI and the TUI.
//!
//! - **config**: state, config and log directory layout
//! - **settings**: TOML user settings with defaults

pub mod config;
pub mod error;
pub mod settings;

pub use config::Paths;
pub use error::{ConfigError, Result};
pub use settings::{CommandSettings, GeneralSettings, HostSettings, NixSettings, Settings};
