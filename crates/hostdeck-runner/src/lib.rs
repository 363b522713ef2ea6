//! Concurrent command execution for hostdeck.
//!
//! This crate runs external processes, locally or on remote hosts over ssh,
//! and streams their output back to an interactive host application:
//! - `CommandRunner` - one process, its output buffer and lifecycle
//! - `OutputBuffer` - append-only, thread-safe output accumulator
//! - `script` - labelled multi-command scripts and their decoding
//!
//! # Example
//!
//! ```ignore
//! use hostdeck_runner::{script, CommandRunner};
//!
//! #[tokio::main]
//! async fn main() {
//!     let batch = script::compile(&["uname -a", "uptime"]);
//!     let runner = CommandRunner::remote_script("web1.lab", Some("root"), "status", batch);
//!     runner.start();
//!
//!     while let Some(update) = runner.next_update().await {
//!         if update.complete {
//!             break;
//!         }
//!     }
//!
//!     let text = script::decode(&runner.render(), |label| format!("$ {}", label));
//!     println!("{}", text);
//! }
//! ```
//!
//! # Key Concepts
//!
//! ## Update loop
//!
//! `CommandRunner::next_update` is single-shot. The caller re-arms it after
//! every update; a burst of output between two calls is delivered as one
//! wakeup. Once the runner is complete, the next call appends `[Done]` or
//! `[Failed]` to the output and every later call returns `None`.
//!
//! ## Environment
//!
//! A new runner inherits this process's environment until the first
//! `set_env` or `inherit_env` call, which replaces it with only the
//! variables set explicitly.

pub mod buffer;
pub mod destination;
pub mod error;
pub mod runner;
pub mod script;
pub mod state;

pub use buffer::OutputBuffer;
pub use destination::Destination;
pub use error::{Result, RunnerError};
pub use runner::{CommandRunner, RunnerUpdate, INTERRUPT_MARKER};
pub use script::{Segment, LABEL_END, LABEL_START};
pub use state::RunState;
