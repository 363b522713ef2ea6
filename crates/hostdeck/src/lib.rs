//! hostdeck library.
//!
//! Command-line interface, headless commands and the interactive dashboard
//! for deploying and inspecting the NixOS hosts of a flake.

pub mod actions;
pub mod cli;
pub mod commands;
pub mod context;
pub mod tui;

pub use context::{Context, Result};
