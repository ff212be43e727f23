//! Environment diagnostics: probe every pipeline prerequisite.

use std::path::Path;
use std::time::Duration;

use vtour_media::run_check;
use vtour_models::EnvironmentCheck;

use crate::context::RunContext;
use crate::memory;

const CHECK_TIMEOUT: Duration = Duration::from_secs(10);

/// Probe the interpreter, the model packages, ffmpeg, and the model files.
///
/// Never fails; each unavailable prerequisite becomes a failing check.
pub async fn environment_checks(ctx: &RunContext) -> Vec<EnvironmentCheck> {
    let python = &ctx.python_path;
    let checkpoint = ctx.reconstruction_checkpoint.to_string_lossy().into_owned();
    let model_dir = ctx.reasoning_model.to_string_lossy().into_owned();

    let mut checks = vec![
        run_check("Python", python, &["--version"], CHECK_TIMEOUT).await,
        run_check(
            "PyTorch + MPS",
            python,
            &[
                "-c",
                "import torch; print(f'torch {torch.__version__}, MPS: {torch.backends.mps.is_available()}')",
            ],
            CHECK_TIMEOUT,
        )
        .await,
        run_check(
            "tttLRM",
            python,
            &[
                "-c",
                "import tttlrm; print(f'tttLRM {getattr(tttlrm, \"__version__\", \"installed\")}')",
            ],
            CHECK_TIMEOUT,
        )
        .await,
        run_check(
            "VBVR",
            python,
            &[
                "-c",
                "import vbvr; print(f'VBVR {getattr(vbvr, \"__version__\", \"installed\")}')",
            ],
            CHECK_TIMEOUT,
        )
        .await,
        run_check("FFmpeg", &ctx.ffmpeg_path, &["-version"], CHECK_TIMEOUT).await,
        run_check(
            "tttLRM Checkpoint",
            Path::new("/bin/test"),
            &["-f", checkpoint.as_str()],
            CHECK_TIMEOUT,
        )
        .await,
        run_check(
            "VBVR Model Dir",
            Path::new("/bin/test"),
            &["-d", model_dir.as_str()],
            CHECK_TIMEOUT,
        )
        .await,
    ];

    checks.push(memory_check().await);
    checks
}

/// System memory headroom check, from the same probe the chunk loop uses.
async fn memory_check() -> EnvironmentCheck {
    let pressure = memory::pressure().await;
    let free = 100 - pressure;
    if free > 20 {
        EnvironmentCheck::ok(
            "System Memory",
            "memory_pressure",
            Some(format!("{free}% free")),
        )
    } else {
        EnvironmentCheck::failed(
            "System Memory",
            "memory_pressure",
            format!("{free}% free, close applications to reclaim RAM"),
        )
    }
}
