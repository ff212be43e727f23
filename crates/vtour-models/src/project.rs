//! The durable pipeline project record.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use validator::Validate;

use crate::config::PipelineConfig;
use crate::error::ModelResult;
use crate::stage::{StageName, StageResult, StageStatus, STAGE_ORDER};
use crate::utils::{sanitize_name, short_id, to_slug};

/// Overall project status, mirroring the active or last stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStatus {
    /// Created, no stage started yet
    #[default]
    Configured,
    /// Spatial reconstruction running
    Spatial,
    /// Tour render running
    Rendering,
    /// Chunked reasoning running
    Reasoning,
    /// Final concatenation running
    Compositing,
    /// All four stages completed
    Done,
    /// A stage failed; the run stopped
    Failed,
}

impl PipelineStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStatus::Configured => "configured",
            PipelineStatus::Spatial => "spatial",
            PipelineStatus::Rendering => "rendering",
            PipelineStatus::Reasoning => "reasoning",
            PipelineStatus::Compositing => "compositing",
            PipelineStatus::Done => "done",
            PipelineStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineStatus::Done | PipelineStatus::Failed)
    }
}

impl fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<StageName> for PipelineStatus {
    /// Project status shown while the given stage is running.
    fn from(stage: StageName) -> Self {
        match stage {
            StageName::Spatial => PipelineStatus::Spatial,
            StageName::Render => PipelineStatus::Rendering,
            StageName::Reasoning => PipelineStatus::Reasoning,
            StageName::Composite => PipelineStatus::Compositing,
        }
    }
}

/// Root durable entity: one walkthrough-to-tour pipeline run.
///
/// The orchestrator is the only writer while a run is active; external
/// viewers poll the persisted record.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PipelineProject {
    /// Stable id: name slug plus a random suffix
    pub id: String,

    /// Display name
    pub name: String,

    /// Overall status, derived from stage statuses
    #[serde(default)]
    pub status: PipelineStatus,

    /// Source walkthrough video
    pub input_video_path: String,

    /// Optional camera-pose metadata (skips pose estimation)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pose_data_path: Option<String>,

    /// Directory holding all intermediate and final outputs
    pub output_dir: String,

    /// Immutable run configuration
    pub config: PipelineConfig,

    /// The four stage results, in execution order
    pub stages: Vec<StageResult>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Rewritten on every persist
    pub updated_at: DateTime<Utc>,

    /// Top-level error message once `failed`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PipelineProject {
    /// Create a new `configured` project with four pending stages.
    ///
    /// The id is `slug(name)-<suffix>` and the output directory is the
    /// project's own directory under `projects_root`. Fails when the
    /// configuration violates its invariants.
    pub fn new(
        name: &str,
        input_video_path: impl Into<String>,
        pose_data_path: Option<String>,
        projects_root: &Path,
        config: PipelineConfig,
    ) -> ModelResult<Self> {
        config.validate()?;

        let name = sanitize_name(name);
        let id = format!("{}-{}", to_slug(&name), short_id());
        let output_dir = projects_root.join(&id).to_string_lossy().into_owned();
        let now = Utc::now();

        Ok(Self {
            id,
            name,
            status: PipelineStatus::Configured,
            input_video_path: input_video_path.into(),
            pose_data_path,
            output_dir,
            config,
            stages: STAGE_ORDER.iter().map(|s| StageResult::new(*s)).collect(),
            created_at: now,
            updated_at: now,
            error: None,
        })
    }

    /// Look up a stage result by name.
    pub fn stage(&self, name: StageName) -> Option<&StageResult> {
        self.stages.iter().find(|s| s.stage == name)
    }

    /// Look up a stage result by name, mutably.
    pub fn stage_mut(&mut self, name: StageName) -> Option<&mut StageResult> {
        self.stages.iter_mut().find(|s| s.stage == name)
    }

    /// The stage currently `running`, if any.
    pub fn running_stage(&self) -> Option<StageName> {
        self.stages
            .iter()
            .find(|s| s.status == StageStatus::Running)
            .map(|s| s.stage)
    }

    /// Reset every stage to pending and clear the error, ready for a fresh
    /// run over the same id.
    pub fn reset_for_relaunch(&mut self) {
        for stage in &mut self.stages {
            stage.reset();
        }
        self.status = PipelineStatus::Configured;
        self.error = None;
    }
}
