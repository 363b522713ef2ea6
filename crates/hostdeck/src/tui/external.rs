//! Programs that take over the terminal: the pager and interactive ssh.

use std::io::{self, BufRead, Write};
use std::process::{Command, ExitStatus};

use tempfile::TempPath;
use tracing::{error, info};

use hostdeck_nix::TargetInfo;
use hostdeck_runner::CommandRunner;

/// A foreground program to run while the dashboard is suspended.
#[derive(Debug)]
pub enum External {
    /// Pager showing a copy of a runner's output.
    Pager {
        argv: Vec<String>,
        /// Removed when the request is dropped.
        file: TempPath,
    },
    /// Interactive ssh session.
    Ssh { argv: Vec<String> },
}

impl External {
    /// Copy `runner`'s output to a temp file and build the pager command.
    ///
    /// `pager` is split like a shell command line, so it may carry flags.
    pub fn pager(pager: &str, runner: &CommandRunner) -> io::Result<Self> {
        let mut argv = shell_words::split(pager)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        if argv.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "no pager configured",
            ));
        }

        let mut file = tempfile::Builder::new()
            .prefix("hostdeck-")
            .suffix(".txt")
            .tempfile()?;
        runner.copy_output_to(file.as_file_mut())?;
        file.as_file_mut().flush()?;

        let file = file.into_temp_path();
        argv.push(file.to_string_lossy().into_owned());

        Ok(External::Pager { argv, file })
    }

    /// `ssh [user@]host` for the host's deploy target.
    pub fn ssh(target: &TargetInfo) -> Self {
        External::Ssh {
            argv: vec!["ssh".to_string(), target.ssh_target()],
        }
    }

    pub fn argv(&self) -> &[String] {
        match self {
            External::Pager { argv, .. } | External::Ssh { argv } => argv,
        }
    }

    /// Short name used in messages.
    pub fn kind(&self) -> &'static str {
        match self {
            External::Pager { .. } => "Pager",
            External::Ssh { .. } => "SSH",
        }
    }

    /// Run in the foreground and wait for it to exit.
    pub fn run(&self) -> io::Result<ExitStatus> {
        let argv = self.argv();
        info!(kind = self.kind(), argv = ?argv, "running external program");

        let (program, args) = argv
            .split_first()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "empty command"))?;
        Command::new(program).args(args).status()
    }

    /// Run and turn failures into an error message.
    ///
    /// A failed ssh session leaves its message on screen until enter is
    /// pressed, since the dashboard redraws over it.
    pub fn run_reporting(&self) -> Option<String> {
        let message = match self.run() {
            Ok(status) if status.success() => return None,
            Ok(status) => format!("{}: {}", self.kind(), status),
            Err(e) => format!("{}: {}", self.kind(), e),
        };
        error!(kind = self.kind(), argv = ?self.argv(), error = %message, "external program failed");

        if let External::Ssh { .. } = self {
            let mut stderr = io::stderr();
            let _ = write!(stderr, "\n{}\n\n[Press enter to continue]", message);
            let _ = stderr.flush();
            let _ = io::stdin().lock().read_line(&mut String::new());
        }

        Some(message)
    }
}
