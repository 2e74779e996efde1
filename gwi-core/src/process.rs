//! Subprocess invocation
//!
//! Every effect on the outside world (git, gh, fzf, hooks) goes through a
//! [`ProcessInvoker`]. The system implementation bounds non-interactive calls
//! with a timeout and aborts any in-flight call when the invocation is
//! cancelled.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::sync::watch;
use tracing::debug;

use crate::{Error, Result};

/// Where the child's standard output goes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StdoutMode {
    /// Collected into [`ProcessOutput::stdout`]
    #[default]
    Capture,
    /// Shared with our own stdout
    Inherit,
    /// Redirected onto our stderr, keeping stdout clean for machine output
    ToStderr,
}

/// Where the child's standard error goes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StderrMode {
    #[default]
    Capture,
    Inherit,
}

/// Time limit applied to a single invocation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TimeoutPolicy {
    /// The invoker's configured default
    #[default]
    Default,
    Fixed(Duration),
    /// Interactive programs wait on the operator, not on the machine
    Unbounded,
}

/// A single external command to run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessCommand {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub stdin: Option<String>,
    pub stdout: StdoutMode,
    pub stderr: StderrMode,
    pub timeout: TimeoutPolicy,
}

impl ProcessCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append a path argument
    pub fn path_arg(self, path: &Path) -> Self {
        self.arg(path.to_string_lossy().into_owned())
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Feed `data` to the child's stdin
    pub fn stdin_data(mut self, data: impl Into<String>) -> Self {
        self.stdin = Some(data.into());
        self
    }

    pub fn stdout(mut self, mode: StdoutMode) -> Self {
        self.stdout = mode;
        self
    }

    pub fn stderr(mut self, mode: StderrMode) -> Self {
        self.stderr = mode;
        self
    }

    pub fn timeout(mut self, policy: TimeoutPolicy) -> Self {
        self.timeout = policy;
        self
    }

    /// Attach the operator's terminal and drop the time limit
    pub fn interactive(self) -> Self {
        self.stdout(StdoutMode::Inherit)
            .stderr(StderrMode::Inherit)
            .timeout(TimeoutPolicy::Unbounded)
    }

    /// Command line as shown in messages
    pub fn display(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                line.push('"');
                line.push_str(arg);
                line.push('"');
            } else {
                line.push_str(arg);
            }
        }
        line
    }

    /// Short form used in error messages: program plus subcommand words
    pub fn summary(&self) -> String {
        let words: Vec<&str> = std::iter::once(self.program.as_str())
            .chain(
                self.args
                    .iter()
                    .take_while(|a| !a.starts_with('-'))
                    .take(2)
                    .map(String::as_str),
            )
            .collect();
        words.join(" ")
    }
}

/// Result of a finished command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code, `None` when killed by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    /// Successful output with the given stdout
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Failed output with the given exit code and stderr
    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    pub fn stdout_trimmed(&self) -> &str {
        self.stdout.trim()
    }

    /// Turn a non-zero exit into [`Error::CommandFailed`]
    pub fn check(self, command: &ProcessCommand) -> Result<Self> {
        if self.success() {
            return Ok(self);
        }
        let stderr = if self.stderr.trim().is_empty() {
            self.stdout.trim().to_string()
        } else {
            self.stderr.trim().to_string()
        };
        Err(Error::CommandFailed {
            command: command.summary(),
            code: self.code,
            stderr,
        })
    }
}

/// Runs external commands
///
/// `run` returns `Ok` for any exit status; `Err` is reserved for failures to
/// run at all (missing program, timeout, cancellation, I/O).
#[async_trait]
pub trait ProcessInvoker: Send + Sync {
    async fn run(&self, command: &ProcessCommand) -> Result<ProcessOutput>;

    /// Whether `program` can be found and executed
    fn is_available(&self, program: &str) -> bool;

    /// Run and treat a non-zero exit as an error
    async fn run_checked(&self, command: &ProcessCommand) -> Result<ProcessOutput> {
        let output = self.run(command).await?;
        output.check(command)
    }
}

/// Sender side of the invocation-wide cancellation signal
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

/// Receiver side, cloned into whatever needs to observe cancellation
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

impl CancelSignal {
    /// Create a linked handle/signal pair
    pub fn new() -> (CancelHandle, CancelSignal) {
        let (tx, rx) = watch::channel(false);
        (CancelHandle { tx }, CancelSignal { rx })
    }

    /// A signal that never fires
    pub fn never() -> Self {
        Self::new().1
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancellation has been requested
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        if rx.wait_for(|cancelled| *cancelled).await.is_err() {
            // handle dropped without cancelling
            std::future::pending::<()>().await;
        }
    }
}

/// Invoker backed by real OS processes
#[derive(Debug, Clone)]
pub struct SystemInvoker {
    default_timeout: Duration,
    cancel: CancelSignal,
}

impl SystemInvoker {
    pub fn new(default_timeout: Duration, cancel: CancelSignal) -> Self {
        Self {
            default_timeout,
            cancel,
        }
    }

    fn limit_for(&self, policy: TimeoutPolicy) -> Option<Duration> {
        match policy {
            TimeoutPolicy::Default => Some(self.default_timeout),
            TimeoutPolicy::Fixed(limit) => Some(limit),
            TimeoutPolicy::Unbounded => None,
        }
    }
}

#[async_trait]
impl ProcessInvoker for SystemInvoker {
    async fn run(&self, command: &ProcessCommand) -> Result<ProcessOutput> {
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        debug!(command = %command.display(), cwd = ?command.cwd, "Running command");
        let started = Instant::now();

        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args).kill_on_drop(true);
        if let Some(ref cwd) = command.cwd {
            cmd.current_dir(cwd);
        }

        let attached =
            command.stdout != StdoutMode::Capture || command.stderr == StderrMode::Inherit;
        if command.stdin.is_some() {
            cmd.stdin(Stdio::piped());
        } else if attached {
            cmd.stdin(Stdio::inherit());
        } else {
            cmd.stdin(Stdio::null());
        }

        match command.stdout {
            StdoutMode::Capture => cmd.stdout(Stdio::piped()),
            StdoutMode::Inherit => cmd.stdout(Stdio::inherit()),
            StdoutMode::ToStderr => cmd.stdout(Stdio::from(std::io::stderr())),
        };
        match command.stderr {
            StderrMode::Capture => cmd.stderr(Stdio::piped()),
            StderrMode::Inherit => cmd.stderr(Stdio::inherit()),
        };

        let mut child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::CommandNotFound(command.program.clone())
            } else {
                Error::Io(e)
            }
        })?;

        if let Some(data) = command.stdin.clone() {
            if let Some(mut stdin) = child.stdin.take() {
                tokio::spawn(async move {
                    // the child may exit without reading everything
                    let _ = stdin.write_all(data.as_bytes()).await;
                });
            }
        }

        let limit = self.limit_for(command.timeout);
        let wait = async {
            match limit {
                Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
                    .await
                    .map_err(|_| Error::Timeout {
                        command: command.summary(),
                        after: limit,
                    })?
                    .map_err(Error::Io),
                None => child.wait_with_output().await.map_err(Error::Io),
            }
        };

        let output = tokio::select! {
            result = wait => result?,
            _ = self.cancel.cancelled() => return Err(Error::Cancelled),
        };

        let output = ProcessOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        debug!(
            command = %command.summary(),
            code = ?output.code,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Command finished"
        );

        Ok(output)
    }

    fn is_available(&self, program: &str) -> bool {
        find_executable(program).is_some()
    }
}

/// Locate `program` on PATH (or verify it directly when it contains a separator)
pub fn find_executable(program: &str) -> Option<PathBuf> {
    let direct = Path::new(program);
    if direct.components().count() > 1 {
        return is_executable(direct).then(|| direct.to_path_buf());
    }

    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(program))
        .find(|candidate| is_executable(candidate))
}

/// A regular file with at least one execute permission bit
pub fn is_executable(path: &Path) -> bool {
    let Ok(metadata) = std::fs::metadata(path) else {
        return false;
    };
    if !metadata.is_file() {
        return false;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        metadata.permissions().mode() & 0o111 != 0
    }

    #[cfg(not(unix))]
    {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invoker(timeout: Duration) -> SystemInvoker {
        SystemInvoker::new(timeout, CancelSignal::never())
    }

    #[test]
    fn test_display_quotes_whitespace() {
        let cmd = ProcessCommand::new("gh")
            .args(["pr", "create", "--title"])
            .arg("Add user auth")
            .arg("--body")
            .arg("");
        assert_eq!(
            cmd.display(),
            "gh pr create --title \"Add user auth\" --body \"\""
        );
        assert_eq!(cmd.summary(), "gh pr create");
    }

    #[test]
    fn test_check_prefers_stderr() {
        let cmd = ProcessCommand::new("gh").args(["pr", "create"]);
        let err = ProcessOutput::failed(1, "no commits between main and topic\n")
            .check(&cmd)
            .unwrap_err();
        match err {
            Error::CommandFailed { command, code, stderr } => {
                assert_eq!(command, "gh pr create");
                assert_eq!(code, Some(1));
                assert_eq!(stderr, "no commits between main and topic");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(ProcessOutput::ok("x").check(&cmd).is_ok());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_captures_output() {
        let out = invoker(Duration::from_secs(10))
            .run(&ProcessCommand::new("sh").args(["-c", "echo hello; echo oops >&2; exit 3"]))
            .await
            .unwrap();
        assert_eq!(out.code, Some(3));
        assert_eq!(out.stdout_trimmed(), "hello");
        assert_eq!(out.stderr.trim(), "oops");
        assert!(!out.success());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_feeds_stdin() {
        let out = invoker(Duration::from_secs(10))
            .run(&ProcessCommand::new("cat").stdin_data("one\ntwo\n"))
            .await
            .unwrap();
        assert_eq!(out.stdout, "one\ntwo\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_respects_cwd() {
        let dir = tempfile::tempdir().unwrap();
        let out = invoker(Duration::from_secs(10))
            .run(&ProcessCommand::new("pwd").current_dir(dir.path()))
            .await
            .unwrap();
        let reported = PathBuf::from(out.stdout_trimmed());
        assert_eq!(
            reported.canonicalize().unwrap(),
            dir.path().canonicalize().unwrap()
        );
    }

    #[tokio::test]
    async fn test_missing_program() {
        let err = invoker(Duration::from_secs(10))
            .run(&ProcessCommand::new("gwi-definitely-not-installed-12345"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::CommandNotFound(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout() {
        let err = invoker(Duration::from_millis(100))
            .run(&ProcessCommand::new("sleep").arg("5"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Timeout { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_fixed_timeout_overrides_default() {
        let err = invoker(Duration::from_secs(60))
            .run(
                &ProcessCommand::new("sleep")
                    .arg("5")
                    .timeout(TimeoutPolicy::Fixed(Duration::from_millis(50))),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Timeout { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_cancellation_interrupts() {
        let (handle, signal) = CancelSignal::new();
        let invoker = SystemInvoker::new(Duration::from_secs(60), signal);

        let task = tokio::spawn(async move {
            invoker
                .run(&ProcessCommand::new("sleep").arg("5"))
                .await
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.cancel();

        let result = task.await.unwrap();
        assert!(matches!(result, Err(Error::Cancelled)));
    }

    #[tokio::test]
    async fn test_already_cancelled_short_circuits() {
        let (handle, signal) = CancelSignal::new();
        handle.cancel();
        let err = SystemInvoker::new(Duration::from_secs(1), signal)
            .run(&ProcessCommand::new("true"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled));
    }

    #[cfg(unix)]
    #[test]
    fn test_find_executable() {
        assert!(find_executable("sh").is_some());
        assert!(find_executable("gwi-definitely-not-installed-12345").is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_is_executable_requires_mode_bit() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("hook");
        std::fs::write(&script, "#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o644)).unwrap();
        assert!(!is_executable(&script));

        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o744)).unwrap();
        assert!(is_executable(&script));

        assert!(!is_executable(dir.path()));
    }
}
