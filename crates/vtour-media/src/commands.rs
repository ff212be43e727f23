//! Command lines for the four pipeline tools.
//!
//! Each builder encodes one external CLI contract; the stage executors own
//! when and how often these run.

use std::path::Path;

use crate::command::ToolCommand;

/// Keeps the MPS allocator from reserving the whole unified-memory budget.
const MPS_WATERMARK: (&str, &str) = ("PYTORCH_MPS_HIGH_WATERMARK_RATIO", "0.0");

fn arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn python_tool(python: &Path, work_dir: &Path) -> ToolCommand {
    ToolCommand::new(python)
        .cwd(work_dir)
        .env(MPS_WATERMARK.0, MPS_WATERMARK.1)
}

/// Spatial reconstruction: walkthrough video in, point cloud out.
#[allow(clippy::too_many_arguments)]
pub fn reconstruction_command(
    python: &Path,
    work_dir: &Path,
    input_video: &str,
    checkpoint: &Path,
    num_views: u32,
    max_memory_gb: u32,
    poses: Option<&str>,
    output: &Path,
) -> ToolCommand {
    let checkpoint = arg(checkpoint);
    let output = arg(output);
    let num_views = num_views.to_string();
    let max_memory_gb = max_memory_gb.to_string();

    let mut cmd = python_tool(python, work_dir).args([
        "-m",
        "tttlrm.generate",
        "--input",
        input_video,
        "--checkpoint",
        checkpoint.as_str(),
        "--output",
        output.as_str(),
        "--device",
        "mps",
        "--num-views",
        num_views.as_str(),
        "--max-memory",
        max_memory_gb.as_str(),
    ]);
    if let Some(poses) = poses {
        cmd = cmd.args(["--poses", poses]);
    }
    cmd
}

/// Tour render: point cloud in, camera-path video out.
pub fn render_command(
    python: &Path,
    work_dir: &Path,
    scene: &Path,
    trajectory: &str,
    resolution: &str,
    fps: u32,
    output: &Path,
) -> ToolCommand {
    let scene = arg(scene);
    let output = arg(output);
    let fps = fps.to_string();

    python_tool(python, work_dir).args([
        "-m",
        "gaussian_splatting.render",
        "--scene",
        scene.as_str(),
        "--trajectory",
        trajectory,
        "--resolution",
        resolution,
        "--fps",
        fps.as_str(),
        "--output",
        output.as_str(),
    ])
}

/// Vision reasoning over one chunk. Chunks after the first pass the previous
/// chunk's output as the visual-conditioning reference.
#[allow(clippy::too_many_arguments)]
pub fn reasoning_command(
    python: &Path,
    work_dir: &Path,
    model: &Path,
    chunk: &Path,
    prompt: &str,
    quantization: &str,
    cpu_offload: bool,
    condition_source: Option<&Path>,
    output: &Path,
) -> ToolCommand {
    let model = arg(model);
    let chunk = arg(chunk);
    let output = arg(output);

    let mut cmd = python_tool(python, work_dir).args([
        "-m",
        "vbvr.inference",
        "--model-path",
        model.as_str(),
        "--input",
        chunk.as_str(),
        "--prompt",
        prompt,
        "--quantize",
        quantization,
        "--output",
        output.as_str(),
    ]);
    if cpu_offload {
        cmd = cmd.arg("--cpu-offload");
    }
    if let Some(prev) = condition_source {
        let prev = arg(prev);
        cmd = cmd.args(["--condition-frame-source", prev.as_str()]);
    }
    cmd
}

/// Exact frame count of a video, printed as a bare number on stdout.
pub fn frame_count_command(ffprobe: &Path, work_dir: &Path, video: &Path) -> ToolCommand {
    let video = arg(video);
    ToolCommand::new(ffprobe).cwd(work_dir).args([
        "-v",
        "error",
        "-count_frames",
        "-select_streams",
        "v:0",
        "-show_entries",
        "stream=nb_read_frames",
        "-of",
        "csv=p=0",
        video.as_str(),
    ])
}

/// Stream-copy extraction of one time range into a chunk clip.
pub fn extract_chunk_command(
    ffmpeg: &Path,
    work_dir: &Path,
    input: &Path,
    start_secs: f64,
    duration_secs: f64,
    output: &Path,
) -> ToolCommand {
    let input = arg(input);
    let output = arg(output);
    let start = format!("{start_secs:.3}");
    let duration = format!("{duration_secs:.3}");

    ToolCommand::new(ffmpeg).cwd(work_dir).args([
        "-y", "-i", input.as_str(), "-ss", start.as_str(), "-t", duration.as_str(), "-c", "copy", output.as_str(),
    ])
}

/// Lossless concatenation of reasoned chunks via a concat-demuxer manifest.
pub fn concat_command(ffmpeg: &Path, work_dir: &Path, manifest: &Path, output: &Path) -> ToolCommand {
    let manifest = arg(manifest);
    let output = arg(output);

    ToolCommand::new(ffmpeg).cwd(work_dir).args([
        "-y", "-f", "concat", "-safe", "0", "-i", manifest.as_str(), "-c", "copy", output.as_str(),
    ])
}
