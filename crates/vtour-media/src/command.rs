//! External tool command builder and runner.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

use crate::error::{MediaError, MediaResult};

/// One external tool invocation: program, arguments, working directory,
/// environment overrides, optional bounded wait.
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<String>,
    cwd: Option<PathBuf>,
    envs: Vec<(String, String)>,
    timeout: Option<Duration>,
}

impl ToolCommand {
    /// Create a command for the given executable.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            envs: Vec::new(),
            timeout: None,
        }
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set the working directory.
    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Override one environment variable for the child.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    /// Bound the wait; long stage invocations stay unbounded.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn argv(&self) -> &[String] {
        &self.args
    }

    /// `program arg1 arg2 ...` for log lines.
    pub fn display_line(&self) -> String {
        let mut line = self.program.to_string_lossy().into_owned();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

/// Captured output of a successful tool run.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Run a tool to completion, capturing both output streams.
///
/// Resolves only on exit status 0. A non-zero exit or spawn failure maps to
/// [`MediaError::StageProcess`]; a bounded wait that elapses kills the child
/// and maps to [`MediaError::Timeout`]. Holds no shared state, so
/// independent invocations may run concurrently.
pub async fn run_tool(cmd: &ToolCommand) -> MediaResult<ToolOutput> {
    let program = cmd.program.to_string_lossy().into_owned();
    debug!(command = %cmd.display_line(), "running external tool");

    let mut command = Command::new(&cmd.program);
    command
        .args(&cmd.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = &cmd.cwd {
        command.current_dir(dir);
    }
    for (key, value) in &cmd.envs {
        command.env(key, value);
    }

    let child = command
        .spawn()
        .map_err(|e| MediaError::stage_spawn(program.as_str(), &e))?;

    let output = match cmd.timeout {
        Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
            .await
            .map_err(|_| MediaError::Timeout(limit.as_secs()))??,
        None => child.wait_with_output().await?,
    };

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

    if output.status.success() {
        Ok(ToolOutput { stdout, stderr })
    } else {
        Err(MediaError::stage_exit(
            program.as_str(),
            output.status.code(),
            &stderr,
        ))
    }
}

/// Resolve a tool on PATH, as a preflight for diagnostics.
pub fn check_tool(name: &str) -> MediaResult<PathBuf> {
    which::which(name).map_err(|_| MediaError::ToolNotFound(name.to_string()))
}
