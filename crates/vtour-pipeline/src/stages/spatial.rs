//! Spatial reconstruction stage.

use std::path::PathBuf;
use tracing::info;

use vtour_media::{reconstruction_command, run_tool};
use vtour_models::{PipelineProject, StageName};
use vtour_store::ProjectStore;

use crate::context::RunContext;
use crate::error::PipelineResult;
use crate::stages::{log_and_persist, SCENE_FILE};

/// Reconstruct a textured point cloud from the walkthrough video.
///
/// Returns the path of the produced scene file.
pub async fn run(
    ctx: &RunContext,
    store: &ProjectStore,
    project: &mut PipelineProject,
) -> PipelineResult<String> {
    let work_dir = PathBuf::from(&project.output_dir);
    let output = work_dir.join(SCENE_FILE);

    let cmd = reconstruction_command(
        &ctx.python_path,
        &work_dir,
        &project.input_video_path,
        &ctx.reconstruction_checkpoint,
        project.config.num_views,
        project.config.max_spatial_memory_gb,
        project.pose_data_path.as_deref(),
        &output,
    );

    log_and_persist(
        store,
        project,
        StageName::Spatial,
        &format!("Running: {}", cmd.display_line()),
    )
    .await?;
    info!(project_id = %project.id, views = project.config.num_views, "spatial reconstruction started");

    run_tool(&cmd).await?;
    Ok(output.to_string_lossy().into_owned())
}
