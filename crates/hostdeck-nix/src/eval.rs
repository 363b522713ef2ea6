//! Evaluate nix expressions against a flake.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use serde::de::DeserializeOwned;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, trace};

use hostdeck_core::HostSettings;

use crate::error::{NixError, Result};
use crate::target::TargetInfo;

/// Runs `nix eval --file - --json` with generated scripts.
#[derive(Debug, Clone)]
pub struct NixEvaluator {
    nix_path: PathBuf,
}

impl NixEvaluator {
    /// Locate `nix` in PATH.
    ///
    /// # Errors
    ///
    /// Returns `NixError::NotFound` if nix is not available.
    pub fn new() -> Result<Self> {
        let nix_path = which::which("nix").map_err(|_| NixError::NotFound)?;
        debug!(path = %nix_path.display(), "nix found");
        Ok(Self { nix_path })
    }

    /// Use a specific nix binary.
    pub fn with_path(nix_path: impl Into<PathBuf>) -> Self {
        Self {
            nix_path: nix_path.into(),
        }
    }

    /// Check if nix is available in PATH.
    pub fn is_available() -> bool {
        which::which("nix").is_ok()
    }

    /// Names of every `nixosConfigurations` entry in the flake.
    pub async fn host_names(&self, flake: &Path) -> Result<Vec<String>> {
        let names: Vec<String> = self.eval(&names_script(flake)).await?;
        debug!(flake = %flake.display(), count = names.len(), "host names loaded");
        Ok(names)
    }

    /// Deploy address and user for `host`, as configured in the flake.
    ///
    /// Defaults are not applied; see [`TargetInfo::apply_defaults`].
    pub async fn target_info(
        &self,
        flake: &Path,
        host: &str,
        hosts: &HostSettings,
    ) -> Result<TargetInfo> {
        let info: TargetInfo = self.eval(&target_info_script(flake, host, hosts)).await?;
        debug!(host, deploy_host = %info.deploy_host, "target info loaded");
        Ok(info)
    }

    /// Evaluate `script` and decode its JSON value.
    pub async fn eval<T: DeserializeOwned>(&self, script: &str) -> Result<T> {
        trace!(script, "running nix script");

        let mut child = Command::new(&self.nix_path)
            .args(["eval", "--file", "-", "--json"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            // A nix that exits early closes the pipe; its status says why.
            if let Err(e) = stdin.write_all(script.as_bytes()).await {
                debug!(error = %e, "failed to write nix script to stdin");
            }
        }

        let output = child.wait_with_output().await?;
        trace!(
            status = %output.status,
            stdout_len = output.stdout.len(),
            stderr_len = output.stderr.len(),
            "nix eval completed"
        );

        if !output.status.success() {
            return Err(NixError::Eval {
                status: output.status,
                script: script.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        serde_json::from_slice(&output.stdout).map_err(|source| NixError::Decode {
            source,
            output: String::from_utf8_lossy(&output.stdout).into_owned(),
        })
    }
}

/// Quote `s` as a nix string literal.
fn nix_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '$' if chars.peek() == Some(&'{') => out.push_str("\\$"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn flake_ref(flake: &Path) -> String {
    nix_string(&format!("path:{}", flake.display()))
}

fn names_script(flake: &Path) -> String {
    format!(
        "let\n  flake = builtins.getFlake {};\nin\nbuiltins.attrNames flake.nixosConfigurations\n",
        flake_ref(flake)
    )
}

fn target_info_script(flake: &Path, host: &str, hosts: &HostSettings) -> String {
    let deploy_user = hosts.deploy_user_attr.as_deref().unwrap_or("null");
    format!(
        "let\n  flake = builtins.getFlake {};\n  target = flake.nixosConfigurations.${{{}}};\nin\n{{\n  deployHost = {};\n  deployUser = {};\n}}\n",
        flake_ref(flake),
        nix_string(host),
        hosts.deploy_host_attr,
        deploy_user,
    )
}
