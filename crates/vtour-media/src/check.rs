//! Tool-availability probing for diagnostics.

use std::path::Path;
use std::time::Duration;

use vtour_models::{truncate, EnvironmentCheck};

use crate::command::{run_tool, ToolCommand};

/// Probe one prerequisite with a bounded wait.
///
/// Never errors: a failed or missing tool becomes a failing check.
pub async fn run_check(
    name: &str,
    program: &Path,
    args: &[&str],
    timeout: Duration,
) -> EnvironmentCheck {
    let cmd = ToolCommand::new(program)
        .args(args.iter().copied())
        .timeout(timeout);
    let command_line = cmd.display_line();

    match run_tool(&cmd).await {
        Ok(output) => {
            let version = output
                .stdout
                .trim()
                .lines()
                .next()
                .filter(|l| !l.is_empty())
                .map(|l| truncate(l, 100));
            EnvironmentCheck::ok(name, command_line, version)
        }
        Err(err) => EnvironmentCheck::failed(name, command_line, err.to_string()),
    }
}
