//! Chunked vision-reasoning stage.
//!
//! The reasoning tool cannot hold an arbitrarily long video in one
//! accelerator pass, so the tour is cut into sequential frame-count chunks
//! reasoned one at a time. Each chunk after the first is conditioned on the
//! previous chunk's output so overlays stay consistent across boundaries.

use std::path::PathBuf;
use tokio::fs;
use tracing::{debug, info, warn};

use vtour_media::{count_frames, extract_chunk_command, reasoning_command, run_tool};
use vtour_models::{PipelineConfig, PipelineProject, StageName};
use vtour_store::ProjectStore;

use crate::context::RunContext;
use crate::error::PipelineResult;
use crate::memory;
use crate::stages::{chunk_file, log_and_persist, reasoned_file, TOUR_FILE};

/// Run the reasoning tool over the tour video chunk by chunk.
///
/// Returns the ordered list of per-chunk output paths.
pub async fn run(
    ctx: &RunContext,
    store: &ProjectStore,
    project: &mut PipelineProject,
) -> PipelineResult<Vec<String>> {
    let work_dir = PathBuf::from(&project.output_dir);
    let tour = work_dir.join(TOUR_FILE);

    log_and_persist(
        store,
        project,
        StageName::Reasoning,
        &format!(
            "Splitting {TOUR_FILE} into {}-frame chunks",
            project.config.chunk_frames
        ),
    )
    .await?;

    let total_frames = match count_frames(&ctx.ffprobe_path(), &work_dir, &tour).await {
        Ok(frames) => frames,
        Err(err) => {
            warn!(project_id = %project.id, %err, "frame-count probe failed");
            log_and_persist(
                store,
                project,
                StageName::Reasoning,
                "Could not probe frame count, using estimate",
            )
            .await?;
            ctx.fallback_total_frames
        }
    };

    let fps = project.config.render_fps;
    let mut outputs: Vec<String> = Vec::new();
    let mut offset: u64 = 0;
    let mut index: usize = 0;

    while offset < total_frames {
        let pressure = memory::pressure().await;
        let current_chunk = effective_chunk_frames(&project.config, pressure);

        let chunk = work_dir.join(chunk_file(index));
        let output = work_dir.join(reasoned_file(index));
        let (start_secs, duration_secs) = chunk_time_range(offset, current_chunk, fps);

        run_tool(&extract_chunk_command(
            &ctx.ffmpeg_path,
            &work_dir,
            &tour,
            start_secs,
            duration_secs,
            &chunk,
        ))
        .await?;

        // Condition on the previous chunk's OUTPUT, not its input
        let condition = (index > 0).then(|| work_dir.join(reasoned_file(index - 1)));
        let cmd = reasoning_command(
            &ctx.python_path,
            &work_dir,
            &ctx.reasoning_model,
            &chunk,
            &project.config.reasoning_prompt,
            project.config.quantization.as_str(),
            project.config.cpu_offload,
            condition.as_deref(),
            &output,
        );

        log_and_persist(
            store,
            project,
            StageName::Reasoning,
            &format!(
                "Chunk {index}: frames {offset}-{} (pressure: {pressure}%)",
                offset + u64::from(current_chunk)
            ),
        )
        .await?;
        info!(project_id = %project.id, chunk = index, pressure, frames = current_chunk, "reasoning chunk");

        run_tool(&cmd).await?;
        outputs.push(output.to_string_lossy().into_owned());

        if let Err(err) = fs::remove_file(&chunk).await {
            debug!(path = %chunk.display(), %err, "chunk clip cleanup skipped");
        }

        offset += u64::from(current_chunk);
        index += 1;
    }

    Ok(outputs)
}

/// Frames for the chunk starting now, given the sampled pressure.
pub(crate) fn effective_chunk_frames(config: &PipelineConfig, pressure: u8) -> u32 {
    if config.auto_chunk_reduction {
        memory::adaptive_chunk_size(config.chunk_frames, pressure)
    } else {
        config.chunk_frames
    }
}

/// Start time and duration in seconds for a chunk at `offset`.
pub(crate) fn chunk_time_range(offset: u64, frames: u32, fps: u32) -> (f64, f64) {
    (
        offset as f64 / f64::from(fps),
        f64::from(frames) / f64::from(fps),
    )
}
