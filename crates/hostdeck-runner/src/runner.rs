//! Command runner: one external process, its output, and its lifecycle.

use std::ffi::OsStr;
use std::fmt;
use std::io::{self, Write};
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::buffer::OutputBuffer;
use crate::destination::Destination;
use crate::error::{Result, RunnerError};
use crate::state::RunState;

/// Marker appended to the output when a runner is canceled.
pub const INTERRUPT_MARKER: &str = "\n[Interrupt]\n";

/// How long to keep reading output pipes after the process has exited.
///
/// Children of the process can inherit the pipes and hold them open.
const PIPE_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

const READ_CHUNK: usize = 8 * 1024;

/// Options passed to every ssh invocation: no tty, never prompt.
const SSH_OPTIONS: [&str; 2] = ["-T", "-oBatchMode=yes"];

/// Event delivered to the host application when a runner has news.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunnerUpdate {
    /// The runner reached a terminal state.
    pub complete: bool,
    /// State at the time the update was produced.
    pub state: RunState,
}

impl RunnerUpdate {
    fn from_state(state: RunState) -> Self {
        Self {
            complete: state.is_complete(),
            state,
        }
    }
}

#[derive(Debug, Default)]
struct Lifecycle {
    state: RunState,
    last_error: Option<Arc<RunnerError>>,
    /// Status suffix written; no more writes after this.
    closed: bool,
}

/// Command prepared but not yet launched.
struct Pending {
    command: Command,
    /// Set once the first explicit variable clears the inherited environment.
    env_cleared: bool,
}

struct Inner {
    program: String,
    args: Vec<String>,
    destination: Destination,
    script: Option<String>,
    pending: Mutex<Option<Pending>>,
    lifecycle: Mutex<Lifecycle>,
    output: OutputBuffer,
    notify: Arc<Notify>,
    cancel: watch::Sender<bool>,
}

/// Runs one external process, locally or over ssh, and collects its output.
///
/// Cloning is cheap and yields a handle to the same runner.
///
/// The host application drives it with a pull loop:
///
/// ```no_run
/// # async fn demo() {
/// use hostdeck_runner::CommandRunner;
///
/// let runner = CommandRunner::local(".", "uname", ["-a"]);
/// let finished = runner.start();
/// while let Some(update) = runner.next_update().await {
///     println!("{} {}", update.state, runner.render());
/// }
/// let _ = finished.await;
/// # }
/// ```
#[derive(Clone)]
pub struct CommandRunner {
    inner: Arc<Inner>,
}

impl CommandRunner {
    /// Runner for `program args...` in `dir` on this machine.
    pub fn local<I, S>(dir: impl AsRef<Path>, program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let program = program.into();
        let args: Vec<String> = args.into_iter().map(Into::into).collect();

        let mut command = Command::new(&program);
        command.args(&args).current_dir(dir.as_ref());

        debug!(prog = %program, args = ?args, "local runner created");
        Self::build(program, args, Destination::Local, command, None)
    }

    /// Runner that feeds `script` to `bash -s` in `dir` on this machine.
    ///
    /// `name` is what [`command_line`](Self::command_line) reports.
    pub fn local_script(
        dir: impl AsRef<Path>,
        name: impl Into<String>,
        script: impl Into<String>,
    ) -> Self {
        let name = name.into();

        let mut command = Command::new("bash");
        command.arg("-s").current_dir(dir.as_ref());

        debug!(script = %name, "local script runner created");
        Self::build(name, Vec::new(), Destination::Local, command, Some(script.into()))
    }

    /// Runner for `ssh -T -oBatchMode=yes [user@]host program args...`.
    pub fn remote<I, S>(
        host: &str,
        user: Option<&str>,
        program: impl Into<String>,
        args: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let program = program.into();
        let args: Vec<String> = args.into_iter().map(Into::into).collect();
        let destination = Destination::ssh(host, user);

        let mut command = ssh_command(&destination);
        command.arg(&program).args(&args);

        debug!(prog = %program, args = ?args, dest = %destination, "remote runner created");
        Self::build(program, args, destination, command, None)
    }

    /// Runner that feeds `script` to `bash -s` on a remote host.
    ///
    /// `name` labels the batch; the script text is never displayed.
    pub fn remote_script(
        host: &str,
        user: Option<&str>,
        name: impl Into<String>,
        script: impl Into<String>,
    ) -> Self {
        let name = name.into();
        let destination = Destination::ssh(host, user);

        let mut command = ssh_command(&destination);
        command.args(["bash", "-s"]);

        debug!(script = %name, dest = %destination, "remote script runner created");
        Self::build(name, Vec::new(), destination, command, Some(script.into()))
    }

    fn build(
        program: String,
        args: Vec<String>,
        destination: Destination,
        command: Command,
        script: Option<String>,
    ) -> Self {
        let notify = Arc::new(Notify::new());
        let output = {
            let notify = Arc::clone(&notify);
            // Notify keeps at most one stored permit, so bursts of writes
            // coalesce into a single pending wakeup.
            OutputBuffer::new(move || notify.notify_one())
        };
        let (cancel, _) = watch::channel(false);

        Self {
            inner: Arc::new(Inner {
                program,
                args,
                destination,
                script,
                pending: Mutex::new(Some(Pending {
                    command,
                    env_cleared: false,
                })),
                lifecycle: Mutex::new(Lifecycle::default()),
                output,
                notify,
                cancel,
            }),
        }
    }

    /// Add `name=value` to the child's environment. Must precede `start()`.
    ///
    /// The first call replaces the inherited environment entirely: after it
    /// the child only sees variables set through this method or
    /// [`inherit_env`](Self::inherit_env). Inherit `PATH` and anything else
    /// the child needs explicitly.
    pub fn set_env(&self, name: impl AsRef<OsStr>, value: impl AsRef<OsStr>) {
        let mut pending = self.inner.pending.lock();
        let Some(pending) = pending.as_mut() else {
            warn!(cmd = %self, "set_env called after start, ignored");
            return;
        };

        if !pending.env_cleared {
            pending.command.env_clear();
            pending.env_cleared = true;
        }
        pending.command.env(name, value);
    }

    /// Copy a variable from this process's environment into the child's.
    ///
    /// An unset variable is passed as empty. Counts as an explicit variable
    /// for the purposes of [`set_env`](Self::set_env).
    pub fn inherit_env(&self, name: &str) {
        let value = std::env::var_os(name).unwrap_or_default();
        self.set_env(name, value);
    }

    /// Launch the process on a background task.
    ///
    /// The returned handle resolves to the final update once the runner has
    /// reached `Done` or `Failed`. Must be called from within a tokio
    /// runtime, and only once; check [`is_running`](Self::is_running) and
    /// the state first.
    ///
    /// Output is read until both pipes close, but for at most two seconds
    /// after the process exits. A background child that inherited the pipes
    /// can keep them open; anything it writes after that window is dropped.
    pub fn start(&self) -> JoinHandle<RunnerUpdate> {
        let pending = self.inner.pending.lock().take();
        let Some(pending) = pending else {
            warn!(cmd = %self, "runner started twice");
            let update = self.update();
            return tokio::spawn(async move { update });
        };

        self.inner.lifecycle.lock().state = RunState::Running;

        let inner = Arc::clone(&self.inner);
        tokio::spawn(execute(inner, pending.command))
    }

    /// Wait for the next output or completion event.
    ///
    /// Single-shot: call it again after each returned update to keep
    /// receiving them. Once the runner has completed, the first call appends
    /// the status line (`\n[Done]` or `\n[Failed]`) and returns the final
    /// update immediately; every later call returns `None` with no side
    /// effects.
    pub async fn next_update(&self) -> Option<RunnerUpdate> {
        if let Some(closing) = self.close_if_complete() {
            return closing;
        }

        self.inner.notify.notified().await;

        // Woken by the exit itself: this is the closing call.
        match self.close_if_complete() {
            Some(closing) => closing,
            None => Some(self.update()),
        }
    }

    /// `None` while the runner is still going. Otherwise the result of the
    /// closing call: the final update the first time, `None` after that.
    fn close_if_complete(&self) -> Option<Option<RunnerUpdate>> {
        let mut lifecycle = self.inner.lifecycle.lock();
        if !lifecycle.state.is_complete() {
            return None;
        }
        if lifecycle.closed {
            return Some(None);
        }

        lifecycle.closed = true;
        let suffix = lifecycle.state.status_suffix();
        self.inner.output.write(suffix.as_bytes());
        Some(Some(RunnerUpdate::from_state(lifecycle.state)))
    }

    /// Terminate the process and mark the output.
    ///
    /// Does not wait for the process to die or change the state; the
    /// execution task moves to `Failed` once the exit is observed. A runner
    /// that already completed is left untouched.
    pub fn cancel(&self) {
        // Held across the write so completion cannot slip in between.
        let lifecycle = self.inner.lifecycle.lock();
        if lifecycle.state.is_complete() {
            debug!(cmd = %self.command_line(), state = %lifecycle.state, "cancel after completion ignored");
            return;
        }

        self.inner.cancel.send_replace(true);
        self.inner.output.write(INTERRUPT_MARKER.as_bytes());
        info!(cmd = %self.command_line(), dest = %self.inner.destination, "runner canceled");
    }

    /// Current lifecycle state.
    pub fn state(&self) -> RunState {
        self.inner.lifecycle.lock().state
    }

    /// Current state as `Not Started`, `Running`, `Done` or `Failed`.
    pub fn state_string(&self) -> &'static str {
        self.state().as_str()
    }

    /// True until the runner reaches a terminal state.
    pub fn is_running(&self) -> bool {
        self.state().is_running()
    }

    /// True once `Done` or `Failed`.
    pub fn is_complete(&self) -> bool {
        self.state().is_complete()
    }

    /// True once `Done`.
    pub fn is_successful(&self) -> bool {
        self.state().is_successful()
    }

    /// Terminal error, if the runner failed.
    pub fn last_error(&self) -> Option<Arc<RunnerError>> {
        self.inner.lifecycle.lock().last_error.clone()
    }

    /// Where the process runs.
    pub fn destination(&self) -> &Destination {
        &self.inner.destination
    }

    /// Requested command line, or the batch name for script runners.
    pub fn command_line(&self) -> String {
        let mut line = self.inner.program.clone();
        for arg in &self.inner.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }

    /// Output collected so far, as text. Labels are not decoded.
    pub fn render(&self) -> String {
        self.inner.output.contents()
    }

    /// Copy the output collected so far to `sink`.
    pub fn copy_output_to<W: Write + ?Sized>(&self, sink: &mut W) -> io::Result<u64> {
        self.inner.output.copy_to(sink)
    }

    fn update(&self) -> RunnerUpdate {
        RunnerUpdate::from_state(self.state())
    }
}

impl fmt::Display for CommandRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.command_line())
    }
}

impl fmt::Debug for CommandRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandRunner")
            .field("command", &self.command_line())
            .field("destination", &self.inner.destination)
            .field("state", &self.state())
            .field("output_len", &self.inner.output.len())
            .finish()
    }
}

fn ssh_command(destination: &Destination) -> Command {
    let mut command = Command::new("ssh");
    command.args(SSH_OPTIONS);
    if let Some(target) = destination.ssh_target() {
        command.arg(target);
    }
    command
}

/// Body of the execution task.
async fn execute(inner: Arc<Inner>, command: Command) -> RunnerUpdate {
    let cmd_line = {
        let mut parts = vec![inner.program.as_str()];
        parts.extend(inner.args.iter().map(String::as_str));
        parts.join(" ")
    };
    info!(cmd = %cmd_line, dest = %inner.destination, "running");

    let result = run_process(&inner, command).await;

    let state = match &result {
        Ok(()) => RunState::Done,
        Err(e) => {
            warn!(cmd = %cmd_line, dest = %inner.destination, error = %e, "command failed");
            RunState::Failed
        }
    };

    {
        let mut lifecycle = inner.lifecycle.lock();
        lifecycle.state = state;
        lifecycle.last_error = result.err().map(Arc::new);
    }

    // Wake anyone parked in next_update() so they observe completion even
    // when the process produced no further output.
    inner.notify.notify_waiters();
    inner.notify.notify_one();

    debug!(cmd = %cmd_line, state = %state, "runner finished");
    RunnerUpdate::from_state(state)
}

async fn run_process(inner: &Arc<Inner>, mut command: Command) -> Result<()> {
    command
        .stdin(if inner.script.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = command.spawn().map_err(|source| RunnerError::Spawn {
        program: inner.program.clone(),
        source,
    })?;

    if let (Some(mut stdin), Some(script)) = (child.stdin.take(), inner.script.clone()) {
        tokio::spawn(async move {
            if let Err(e) = stdin.write_all(script.as_bytes()).await {
                warn!(error = %e, "failed to write script to stdin");
            }
            // Dropping stdin closes it so the shell sees EOF.
        });
    }

    let mut pumps = Vec::with_capacity(2);
    if let Some(stdout) = child.stdout.take() {
        pumps.push(tokio::spawn(pump(stdout, Arc::clone(inner))));
    }
    if let Some(stderr) = child.stderr.take() {
        pumps.push(tokio::spawn(pump(stderr, Arc::clone(inner))));
    }

    let status = wait_or_cancel(&mut child, inner.cancel.subscribe()).await;

    let deadline = tokio::time::Instant::now() + PIPE_DRAIN_TIMEOUT;
    for mut handle in pumps {
        if tokio::time::timeout_at(deadline, &mut handle).await.is_err() {
            warn!(prog = %inner.program, "output pipe still open after exit, abandoning");
            handle.abort();
        }
    }

    let status = status?;
    if status.success() {
        Ok(())
    } else {
        Err(RunnerError::Exit(status))
    }
}

async fn wait_or_cancel(
    child: &mut Child,
    mut cancel: watch::Receiver<bool>,
) -> Result<ExitStatus> {
    tokio::select! {
        status = child.wait() => Ok(status?),
        canceled = async { cancel.wait_for(|c| *c).await.is_ok() } => {
            if !canceled {
                // Sender gone; nobody can cancel any more.
                return Ok(child.wait().await?);
            }
            if let Err(e) = child.start_kill() {
                warn!(error = %e, "failed to kill canceled process");
            }
            let _ = child.wait().await;
            Err(RunnerError::Canceled)
        }
    }
}

/// Copy everything from `reader` into the runner's output.
async fn pump<R>(mut reader: R, inner: Arc<Inner>)
where
    R: AsyncRead + Unpin,
{
    let mut chunk = vec![0u8; READ_CHUNK];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => {
                inner.output.write(&chunk[..n]);
            }
            Err(e) => {
                warn!(prog = %inner.program, error = %e, "failed to read process output");
                break;
            }
        }
    }
}
