//! Stage executors: one module per pipeline stage.

pub mod composite;
pub mod reasoning;
pub mod render;
pub mod spatial;

use vtour_models::{PipelineProject, StageName};
use vtour_store::ProjectStore;

use crate::error::PipelineResult;

/// Well-known file names inside a project directory.
pub(crate) const SCENE_FILE: &str = "scene.ply";
pub(crate) const TOUR_FILE: &str = "tour.mp4";
pub(crate) const FINAL_FILE: &str = "final.mp4";
pub(crate) const MANIFEST_FILE: &str = "chunks.txt";

/// Raw clip extracted for chunk `index`, deleted after reasoning consumes it.
pub(crate) fn chunk_file(index: usize) -> String {
    format!("chunk_{index}.mp4")
}

/// Reasoning output for chunk `index`.
pub(crate) fn reasoned_file(index: usize) -> String {
    format!("infographic_{index}.mp4")
}

/// Append a log line to a stage and persist, so viewers see it immediately.
pub(crate) async fn log_and_persist(
    store: &ProjectStore,
    project: &mut PipelineProject,
    stage: StageName,
    line: &str,
) -> PipelineResult<()> {
    if let Some(result) = project.stage_mut(stage) {
        result.push_log(line);
    }
    store.write(project).await?;
    Ok(())
}
