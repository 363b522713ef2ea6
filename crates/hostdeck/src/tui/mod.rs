//! Interactive dashboard for the hosts of a flake.
//!
//! Layout:
//! - Host list on the left, filterable and jumpable by first letter
//! - Status, Deploy and Run Command tabs for the selected host
//! - Footer with the runner state and scroll position
//! - Hint bar for key help, prompts and transient messages
//!
//! Hovering over a host for a second looks up its deploy target and
//! collects its status. Output of every runner stays attached to its tab
//! until replaced by the next action.

mod app;
mod events;
mod external;
mod host;
mod keys;
mod ui;

pub use events::run;
