//! Runner lifecycle state.

use std::fmt;

/// Lifecycle of a [`CommandRunner`](crate::CommandRunner).
///
/// `NotStarted -> Running -> {Done, Failed}`. The last two are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RunState {
    /// Constructed, process not launched yet.
    #[default]
    NotStarted,
    /// Process launched and not yet exited.
    Running,
    /// Process exited successfully.
    Done,
    /// Spawn error, non-zero exit, or cancellation.
    Failed,
}

impl RunState {
    /// Human readable name, without brackets.
    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::NotStarted => "Not Started",
            RunState::Running => "Running",
            RunState::Done => "Done",
            RunState::Failed => "Failed",
        }
    }

    /// True while the runner has not reached a terminal state.
    pub fn is_running(&self) -> bool {
        matches!(self, RunState::NotStarted | RunState::Running)
    }

    /// True for `Done` and `Failed`.
    pub fn is_complete(&self) -> bool {
        matches!(self, RunState::Done | RunState::Failed)
    }

    /// True only for `Done`.
    pub fn is_successful(&self) -> bool {
        matches!(self, RunState::Done)
    }

    /// The line appended to a runner's output once it completes.
    pub fn status_suffix(&self) -> String {
        format!("\n{}", self)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.as_str())
    }
}
