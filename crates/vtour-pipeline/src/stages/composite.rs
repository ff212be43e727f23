//! Final compositing stage.

use std::path::PathBuf;
use tokio::fs;
use tracing::{debug, info};

use vtour_media::{concat_command, run_tool, write_concat_manifest};
use vtour_models::{PipelineProject, StageName};
use vtour_store::ProjectStore;

use crate::context::RunContext;
use crate::error::PipelineResult;
use crate::stages::{log_and_persist, FINAL_FILE, MANIFEST_FILE};

/// Concatenate the reasoned chunks losslessly into the final video.
///
/// Returns the path of the final video. Intermediate chunk outputs and the
/// manifest are cleaned up best-effort after a successful concatenation.
pub async fn run(
    ctx: &RunContext,
    store: &ProjectStore,
    project: &mut PipelineProject,
    chunks: &[String],
) -> PipelineResult<String> {
    let work_dir = PathBuf::from(&project.output_dir);
    let manifest = work_dir.join(MANIFEST_FILE);
    let output = work_dir.join(FINAL_FILE);

    write_concat_manifest(&manifest, chunks).await?;

    log_and_persist(
        store,
        project,
        StageName::Composite,
        &format!("Concatenating {} chunks into {FINAL_FILE}", chunks.len()),
    )
    .await?;
    info!(project_id = %project.id, chunks = chunks.len(), "compositing final video");

    run_tool(&concat_command(
        &ctx.ffmpeg_path,
        &work_dir,
        &manifest,
        &output,
    ))
    .await?;

    for chunk in chunks {
        if let Err(err) = fs::remove_file(chunk).await {
            debug!(path = %chunk, %err, "chunk output cleanup skipped");
        }
    }
    if let Err(err) = fs::remove_file(&manifest).await {
        debug!(path = %manifest.display(), %err, "manifest cleanup skipped");
    }

    Ok(output.to_string_lossy().into_owned())
}
