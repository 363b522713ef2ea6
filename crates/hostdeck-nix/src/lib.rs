//! Nix flake introspection for hostdeck.
//!
//! Lists the hosts defined in a flake's `nixosConfigurations` and reads
//! each host's deploy target by evaluating small nix scripts with
//! `nix eval --file - --json`.

pub mod error;
pub mod eval;
pub mod target;

pub use error::{NixError, Result};
pub use eval::NixEvaluator;
pub use target::TargetInfo;
