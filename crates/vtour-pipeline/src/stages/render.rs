//! Tour render stage.

use std::path::PathBuf;
use tracing::info;

use vtour_media::{render_command, run_tool};
use vtour_models::{PipelineProject, StageName};
use vtour_store::ProjectStore;

use crate::context::RunContext;
use crate::error::PipelineResult;
use crate::stages::{log_and_persist, SCENE_FILE, TOUR_FILE};

/// Render the camera-path tour video from the reconstructed scene.
///
/// Returns the path of the produced tour video.
pub async fn run(
    ctx: &RunContext,
    store: &ProjectStore,
    project: &mut PipelineProject,
) -> PipelineResult<String> {
    let work_dir = PathBuf::from(&project.output_dir);
    let scene = work_dir.join(SCENE_FILE);
    let output = work_dir.join(TOUR_FILE);

    let cmd = render_command(
        &ctx.python_path,
        &work_dir,
        &scene,
        project.config.camera_trajectory.as_str(),
        &project.config.render_resolution,
        project.config.render_fps,
        &output,
    );

    log_and_persist(
        store,
        project,
        StageName::Render,
        &format!("Running: {}", cmd.display_line()),
    )
    .await?;
    info!(
        project_id = %project.id,
        trajectory = %project.config.camera_trajectory,
        "tour render started"
    );

    run_tool(&cmd).await?;
    Ok(output.to_string_lossy().into_owned())
}
