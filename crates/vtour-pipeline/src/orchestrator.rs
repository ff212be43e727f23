//! Pipeline orchestration: stage sequencing and durable status transitions.

use tracing::{error, info};

use vtour_models::{PipelineProject, PipelineStatus, StageName, StageResult};
use vtour_store::ProjectStore;

use crate::context::RunContext;
use crate::error::{PipelineError, PipelineResult};
use crate::memory;
use crate::stages::{composite, log_and_persist, reasoning, render, spatial};

/// Drives one project through the four stages, persisting every transition.
///
/// Callers that do not want to block spawn [`Orchestrator::run`] onto the
/// runtime and poll the persisted record for progress; the project file is
/// the only progress channel.
///
/// The orchestrator is the single writer for a project while a run is
/// active. Re-launching a project whose previous run is still alive is a
/// caller hazard: two runs would race on the same record, last writer wins.
pub struct Orchestrator {
    ctx: RunContext,
    store: ProjectStore,
}

impl Orchestrator {
    pub fn new(ctx: RunContext, store: ProjectStore) -> Self {
        Self { ctx, store }
    }

    pub fn store(&self) -> &ProjectStore {
        &self.store
    }

    pub fn context(&self) -> &RunContext {
        &self.ctx
    }

    /// Run all four stages in order.
    ///
    /// On any stage failure the project is marked `failed` with the error
    /// attributed to the stage that was running, later stages stay pending,
    /// and the error is returned to the caller.
    pub async fn run(&self, project: &mut PipelineProject) -> PipelineResult<()> {
        match self.run_all(project).await {
            Ok(()) => Ok(()),
            Err(err) => {
                let failing = project.running_stage().unwrap_or(StageName::Spatial);
                self.fail_stage(project, failing, &err.to_string()).await?;
                Err(err)
            }
        }
    }

    async fn run_all(&self, project: &mut PipelineProject) -> PipelineResult<()> {
        self.start_stage(project, StageName::Spatial).await?;
        let scene = spatial::run(&self.ctx, &self.store, project).await?;
        self.complete_stage(project, StageName::Spatial, Some(scene))
            .await?;
        self.flush_between(project, StageName::Spatial).await?;

        self.start_stage(project, StageName::Render).await?;
        let tour = render::run(&self.ctx, &self.store, project).await?;
        self.complete_stage(project, StageName::Render, Some(tour))
            .await?;
        self.flush_between(project, StageName::Render).await?;

        self.start_stage(project, StageName::Reasoning).await?;
        let chunks = reasoning::run(&self.ctx, &self.store, project).await?;
        self.complete_stage(project, StageName::Reasoning, Some(chunks.join(",")))
            .await?;
        self.flush_between(project, StageName::Reasoning).await?;

        self.start_stage(project, StageName::Composite).await?;
        let final_path = composite::run(&self.ctx, &self.store, project, &chunks).await?;
        self.complete_stage(project, StageName::Composite, Some(final_path))
            .await?;

        project.status = PipelineStatus::Done;
        self.store.write(project).await?;
        info!(project_id = %project.id, "pipeline completed");
        Ok(())
    }

    /// Run exactly one stage, for resuming or re-running.
    ///
    /// `composite` needs the reasoning stage's recorded chunk outputs and
    /// fails with [`PipelineError::MissingDependency`] without them.
    pub async fn run_stage(
        &self,
        project: &mut PipelineProject,
        name: StageName,
    ) -> PipelineResult<()> {
        self.start_stage(project, name).await?;

        let outcome: PipelineResult<Option<String>> = match name {
            StageName::Spatial => spatial::run(&self.ctx, &self.store, project).await.map(Some),
            StageName::Render => render::run(&self.ctx, &self.store, project).await.map(Some),
            StageName::Reasoning => reasoning::run(&self.ctx, &self.store, project)
                .await
                .map(|chunks| Some(chunks.join(","))),
            StageName::Composite => match recorded_chunk_outputs(project) {
                Some(chunks) => composite::run(&self.ctx, &self.store, project, &chunks)
                    .await
                    .map(Some),
                None => Err(PipelineError::missing_dependency(
                    "reasoning stage has no recorded chunk outputs",
                )),
            },
        };

        match outcome {
            Ok(output) => {
                self.complete_stage(project, name, output).await?;
                memory::flush_accelerator(&self.ctx.python_path).await;
                Ok(())
            }
            Err(err) => {
                self.fail_stage(project, name, &err.to_string()).await?;
                Err(err)
            }
        }
    }

    /// Reset a finished or failed project and run it again as a fresh run.
    pub async fn relaunch(&self, project: &mut PipelineProject) -> PipelineResult<()> {
        project.reset_for_relaunch();
        self.store.write(project).await?;
        info!(project_id = %project.id, "project re-launched");
        self.run(project).await
    }

    async fn start_stage(
        &self,
        project: &mut PipelineProject,
        name: StageName,
    ) -> PipelineResult<()> {
        let stage = stage_mut(project, name)?;
        stage.begin();
        stage.push_log(format!("Stage {name} started"));
        project.status = PipelineStatus::from(name);
        self.store.write(project).await?;
        info!(project_id = %project.id, stage = %name, "stage started");
        Ok(())
    }

    async fn complete_stage(
        &self,
        project: &mut PipelineProject,
        name: StageName,
        output_path: Option<String>,
    ) -> PipelineResult<()> {
        let pressure = memory::pressure().await;
        let peak = peak_memory_estimate(pressure, project.config.max_memory_gb);

        let stage = stage_mut(project, name)?;
        stage.finish(output_path);
        stage.memory_peak_gb = Some(peak);
        stage.push_log(format!("Stage {name} completed"));
        self.store.write(project).await?;
        info!(project_id = %project.id, stage = %name, pressure, "stage completed");
        Ok(())
    }

    async fn fail_stage(
        &self,
        project: &mut PipelineProject,
        name: StageName,
        message: &str,
    ) -> PipelineResult<()> {
        let stage = stage_mut(project, name)?;
        stage.fail();
        stage.push_log(format!("ERROR: {message}"));
        project.status = PipelineStatus::Failed;
        project.error = Some(message.to_string());
        self.store.write(project).await?;
        error!(project_id = %project.id, stage = %name, %message, "stage failed");
        Ok(())
    }

    /// Best-effort accelerator flush between two stages, never fatal.
    async fn flush_between(
        &self,
        project: &mut PipelineProject,
        completed: StageName,
    ) -> PipelineResult<()> {
        log_and_persist(
            &self.store,
            project,
            completed,
            "Flushing accelerator memory...",
        )
        .await?;
        memory::flush_accelerator(&self.ctx.python_path).await;
        Ok(())
    }
}

fn stage_mut(
    project: &mut PipelineProject,
    name: StageName,
) -> PipelineResult<&mut StageResult> {
    let id = project.id.clone();
    project
        .stage_mut(name)
        .ok_or_else(|| PipelineError::corrupt_project(format!("stage {name} missing in {id}")))
}

/// Peak-memory estimate from a pressure sample, in GB to one decimal.
fn peak_memory_estimate(pressure: u8, max_memory_gb: u32) -> f64 {
    (f64::from(pressure) / 100.0 * f64::from(max_memory_gb) * 10.0).round() / 10.0
}

/// Chunk outputs recorded by the reasoning stage, parsed from the
/// comma-joined output path. `None` when the stage never recorded output.
fn recorded_chunk_outputs(project: &PipelineProject) -> Option<Vec<String>> {
    let recorded = project.stage(StageName::Reasoning)?.output_path.as_deref()?;
    let chunks: Vec<String> = recorded
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect();
    (!chunks.is_empty()).then_some(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;
    use vtour_models::{PipelineConfig, StageStatus};

    fn test_project(root: &Path, config: PipelineConfig) -> PipelineProject {
        PipelineProject::new("test walkthrough", "/videos/walk.mp4", None, root, config).unwrap()
    }

    fn test_context(python: impl Into<PathBuf>, ffmpeg: impl Into<PathBuf>) -> RunContext {
        RunContext {
            python_path: python.into(),
            ffmpeg_path: ffmpeg.into(),
            reconstruction_checkpoint: PathBuf::from("/models/tttlrm.ckpt"),
            reasoning_model: PathBuf::from("/models/vbvr"),
            projects_root: PathBuf::from("/tmp"),
            fallback_total_frames: 48,
        }
    }

    #[cfg(unix)]
    fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[test]
    fn test_peak_memory_estimate() {
        assert!((peak_memory_estimate(50, 32) - 16.0).abs() < 1e-9);
        assert!((peak_memory_estimate(37, 24) - 8.9).abs() < 1e-9);
        assert!((peak_memory_estimate(0, 32) - 0.0).abs() < 1e-9);
    }

    #[test]
    fn test_recorded_chunk_outputs() {
        let dir = TempDir::new().unwrap();
        let mut project = test_project(dir.path(), PipelineConfig::default());
        assert!(recorded_chunk_outputs(&project).is_none());

        project.stage_mut(StageName::Reasoning).unwrap().output_path = Some(String::new());
        assert!(recorded_chunk_outputs(&project).is_none());

        project.stage_mut(StageName::Reasoning).unwrap().output_path =
            Some("/w/infographic_0.mp4,/w/infographic_1.mp4".into());
        assert_eq!(
            recorded_chunk_outputs(&project).unwrap(),
            vec!["/w/infographic_0.mp4", "/w/infographic_1.mp4"]
        );
    }

    #[tokio::test]
    async fn test_full_run_fails_at_spatial_and_stops() {
        let dir = TempDir::new().unwrap();
        let store = ProjectStore::new(dir.path());
        let orchestrator = Orchestrator::new(test_context("/bin/false", "/bin/false"), store);
        let mut project = test_project(dir.path(), PipelineConfig::default());

        let err = orchestrator.run(&mut project).await.unwrap_err();
        assert!(matches!(err, PipelineError::Media(_)));

        assert_eq!(project.status, PipelineStatus::Failed);
        assert_eq!(
            project.stage(StageName::Spatial).unwrap().status,
            StageStatus::Failed
        );
        for later in [StageName::Render, StageName::Reasoning, StageName::Composite] {
            assert_eq!(project.stage(later).unwrap().status, StageStatus::Pending);
        }
        assert!(project.error.as_deref().unwrap().contains("exited with code 1"));

        // The terminal state is what a polling viewer reads back
        let persisted = orchestrator.store().read(&project.id).await.unwrap();
        assert_eq!(persisted.status, PipelineStatus::Failed);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_spatial_oom_stderr_reaches_project_error() {
        let dir = TempDir::new().unwrap();
        let bin = dir.path().join("bin");
        std::fs::create_dir_all(&bin).unwrap();
        let python = write_script(&bin, "python3", "echo 'CUDA out of memory' >&2; exit 1");

        let store = ProjectStore::new(dir.path());
        let orchestrator = Orchestrator::new(test_context(python, "/bin/false"), store);
        let mut project = test_project(dir.path(), PipelineConfig::default());

        orchestrator.run(&mut project).await.unwrap_err();
        assert_eq!(project.status, PipelineStatus::Failed);
        assert!(project.error.as_deref().unwrap().contains("CUDA out of memory"));
        let spatial = project.stage(StageName::Spatial).unwrap();
        assert!(spatial.logs.iter().any(|l| l.contains("ERROR:")));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_full_run_completes_with_fake_tools() {
        let dir = TempDir::new().unwrap();
        let bin = dir.path().join("bin");
        std::fs::create_dir_all(&bin).unwrap();
        // Fake python logs every invocation so conditioning can be asserted
        let python = write_script(&bin, "python3", "echo \"$@\" >> \"$(dirname \"$0\")/args.log\"");
        let ffmpeg = write_script(&bin, "ffmpeg", "exit 0");
        // ffprobe (derived from the ffmpeg path) fails, forcing the fallback
        write_script(&bin, "ffprobe", "exit 1");

        let store = ProjectStore::new(dir.path());
        let mut config = PipelineConfig::default();
        config.auto_chunk_reduction = false;
        let mut project = test_project(dir.path(), config);

        // 48 fallback frames at 16 per chunk: 3 chunks
        let orchestrator = Orchestrator::new(test_context(python, ffmpeg), store);
        orchestrator.run(&mut project).await.unwrap();

        assert_eq!(project.status, PipelineStatus::Done);
        for stage in &project.stages {
            assert_eq!(stage.status, StageStatus::Done);
            assert!(stage.memory_peak_gb.is_some());
        }

        let reasoning = project.stage(StageName::Reasoning).unwrap();
        let chunk_outputs: Vec<&str> = reasoning
            .output_path
            .as_deref()
            .unwrap()
            .split(',')
            .collect();
        assert_eq!(chunk_outputs.len(), 3);
        assert!(chunk_outputs[0].ends_with("infographic_0.mp4"));
        assert!(reasoning
            .logs
            .iter()
            .any(|l| l.contains("Could not probe frame count")));

        // Every chunk after the first conditions on the previous OUTPUT
        let args_log = std::fs::read_to_string(bin.join("args.log")).unwrap();
        let reasoning_calls: Vec<&str> = args_log
            .lines()
            .filter(|l| l.contains("vbvr.inference"))
            .collect();
        assert_eq!(reasoning_calls.len(), 3);
        assert!(!reasoning_calls[0].contains("--condition-frame-source"));
        assert!(reasoning_calls[1].contains("--condition-frame-source"));
        assert!(reasoning_calls[1].contains("infographic_0.mp4"));
        assert!(reasoning_calls[2].contains("infographic_1.mp4"));

        let composite = project.stage(StageName::Composite).unwrap();
        assert!(composite
            .output_path
            .as_deref()
            .unwrap()
            .ends_with("final.mp4"));
    }

    #[tokio::test]
    async fn test_composite_standalone_requires_reasoning_output() {
        let dir = TempDir::new().unwrap();
        let store = ProjectStore::new(dir.path());
        let orchestrator = Orchestrator::new(test_context("/bin/false", "/bin/false"), store);
        let mut project = test_project(dir.path(), PipelineConfig::default());

        let err = orchestrator
            .run_stage(&mut project, StageName::Composite)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::MissingDependency(_)));

        assert_eq!(project.status, PipelineStatus::Failed);
        assert_eq!(
            project.stage(StageName::Composite).unwrap().status,
            StageStatus::Failed
        );
        assert!(project
            .error
            .as_deref()
            .unwrap()
            .contains("no recorded chunk outputs"));
    }

    #[tokio::test]
    async fn test_relaunch_resets_previous_failure() {
        let dir = TempDir::new().unwrap();
        let store = ProjectStore::new(dir.path());
        let orchestrator = Orchestrator::new(test_context("/bin/false", "/bin/false"), store);
        let mut project = test_project(dir.path(), PipelineConfig::default());

        // Leave every stage in a terminal state from an old run
        for stage in &mut project.stages {
            stage.begin();
            stage.push_log("old run");
            stage.fail();
        }
        project.status = PipelineStatus::Failed;
        project.error = Some("old error".into());

        orchestrator.relaunch(&mut project).await.unwrap_err();

        // The new run failed at spatial; everything later was reset and
        // never reached
        assert!(!project.error.as_deref().unwrap().contains("old error"));
        for later in [StageName::Render, StageName::Reasoning, StageName::Composite] {
            let stage = project.stage(later).unwrap();
            assert_eq!(stage.status, StageStatus::Pending);
            assert!(stage.logs.iter().all(|l| !l.contains("old run")));
        }
    }
}
