//! Error types for external tool invocations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for tool operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur when driving the pipeline's external tools.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("tool not found in PATH: {0}")]
    ToolNotFound(String),

    #[error("stage process '{program}' failed: {message}")]
    StageProcess {
        program: String,
        message: String,
        /// Exit code; `None` when the process could not be started
        exit_code: Option<i32>,
        stderr: Option<String>,
    },

    #[error("probe unavailable: {0}")]
    ProbeUnavailable(String),

    #[error("operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Longest stderr tail carried inside a process error.
const STDERR_LIMIT: usize = 4096;

impl MediaError {
    /// Non-zero exit from a launched tool.
    pub fn stage_exit(program: impl Into<String>, exit_code: Option<i32>, stderr: &str) -> Self {
        let message = match exit_code {
            Some(code) => format!("exited with code {code}"),
            None => "terminated by signal".to_string(),
        };
        let stderr = stderr.trim();
        let message = if stderr.is_empty() {
            message
        } else {
            format!("{message}\n{}", tail(stderr, STDERR_LIMIT))
        };
        Self::StageProcess {
            program: program.into(),
            message,
            exit_code,
            stderr: (!stderr.is_empty()).then(|| tail(stderr, STDERR_LIMIT)),
        }
    }

    /// Tool could not be started at all (missing executable, permissions).
    pub fn stage_spawn(program: impl Into<String>, source: &std::io::Error) -> Self {
        Self::StageProcess {
            program: program.into(),
            message: format!("could not start: {source}"),
            exit_code: None,
            stderr: None,
        }
    }

    /// Create a probe failure error.
    pub fn probe_unavailable(message: impl Into<String>) -> Self {
        Self::ProbeUnavailable(message.into())
    }
}

/// Last `limit` bytes of `s`, aligned to a character boundary.
fn tail(s: &str, limit: usize) -> String {
    if s.len() <= limit {
        return s.to_string();
    }
    let mut start = s.len() - limit;
    while !s.is_char_boundary(start) {
        start += 1;
    }
    s[start..].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_exit_carries_code_and_stderr() {
        let err = MediaError::stage_exit("python", Some(1), "CUDA out of memory");
        match err {
            MediaError::StageProcess {
                exit_code, stderr, ..
            } => {
                assert_eq!(exit_code, Some(1));
                assert_eq!(stderr.as_deref(), Some("CUDA out of memory"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_stage_spawn_has_no_exit_code() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = MediaError::stage_spawn("tttlrm", &io);
        assert!(err.to_string().contains("could not start"));
        match err {
            MediaError::StageProcess { exit_code, .. } => assert!(exit_code.is_none()),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_stderr_tail_is_bounded() {
        let long = "x".repeat(10_000);
        let err = MediaError::stage_exit("ffmpeg", Some(1), &long);
        match err {
            MediaError::StageProcess { stderr, .. } => {
                assert!(stderr.unwrap().len() <= STDERR_LIMIT);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
