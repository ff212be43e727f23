//! Stage identities, statuses, and per-stage results.

use chrono::{DateTime, Local, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ModelError;

/// The four fixed pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum StageName {
    /// 3D reconstruction of the walkthrough video
    Spatial,
    /// Camera-path tour render of the point cloud
    Render,
    /// Chunked vision reasoning over the tour
    Reasoning,
    /// Lossless concatenation of reasoned chunks
    Composite,
}

/// Fixed execution order of the pipeline stages.
pub const STAGE_ORDER: [StageName; 4] = [
    StageName::Spatial,
    StageName::Render,
    StageName::Reasoning,
    StageName::Composite,
];

impl StageName {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageName::Spatial => "spatial",
            StageName::Render => "render",
            StageName::Reasoning => "reasoning",
            StageName::Composite => "composite",
        }
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for StageName {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "spatial" => Ok(StageName::Spatial),
            "render" => Ok(StageName::Render),
            "reasoning" => Ok(StageName::Reasoning),
            "composite" => Ok(StageName::Composite),
            other => Err(ModelError::UnknownStage(other.to_string())),
        }
    }
}

/// Status of a single stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    #[default]
    Pending,
    Running,
    Done,
    Failed,
}

impl StageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageStatus::Pending => "pending",
            StageStatus::Running => "running",
            StageStatus::Done => "done",
            StageStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, StageStatus::Done | StageStatus::Failed)
    }
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Durable result of one pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StageResult {
    /// Stage identity
    pub stage: StageName,

    /// Current status
    #[serde(default)]
    pub status: StageStatus,

    /// When the stage entered `running`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    /// When the stage reached `done` or `failed`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,

    /// Stage output; for reasoning a comma-joined list of chunk outputs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,

    /// Peak memory estimate sampled at completion, in GB
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_peak_gb: Option<f64>,

    /// Append-only timestamped log lines
    #[serde(default)]
    pub logs: Vec<String>,
}

impl StageResult {
    /// Fresh pending stage with no history.
    pub fn new(stage: StageName) -> Self {
        Self {
            stage,
            status: StageStatus::Pending,
            started_at: None,
            finished_at: None,
            output_path: None,
            memory_peak_gb: None,
            logs: Vec::new(),
        }
    }

    /// Transition to `running` and stamp the start time.
    pub fn begin(&mut self) {
        self.status = StageStatus::Running;
        self.started_at = Some(Utc::now());
    }

    /// Transition to `done`, stamping the finish time and recording output.
    pub fn finish(&mut self, output_path: Option<String>) {
        self.status = StageStatus::Done;
        self.finished_at = Some(Utc::now());
        self.output_path = output_path;
    }

    /// Transition to `failed` and stamp the finish time.
    pub fn fail(&mut self) {
        self.status = StageStatus::Failed;
        self.finished_at = Some(Utc::now());
    }

    /// Reset to a fresh pending stage, clearing logs, output, and timestamps.
    pub fn reset(&mut self) {
        *self = Self::new(self.stage);
    }

    /// Append a `[HH:MM:SS] message` log line, the format viewers render.
    pub fn push_log(&mut self, line: impl AsRef<str>) {
        self.logs
            .push(format!("[{}] {}", Local::now().format("%H:%M:%S"), line.as_ref()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_lifecycle() {
        let mut stage = StageResult::new(StageName::Spatial);
        assert_eq!(stage.status, StageStatus::Pending);
        assert!(stage.started_at.is_none());

        stage.begin();
        assert_eq!(stage.status, StageStatus::Running);
        assert!(stage.started_at.is_some());
        assert!(!stage.status.is_terminal());

        stage.finish(Some("scene.ply".into()));
        assert_eq!(stage.status, StageStatus::Done);
        assert!(stage.finished_at.is_some());
        assert_eq!(stage.output_path.as_deref(), Some("scene.ply"));
        assert!(stage.status.is_terminal());
    }

    #[test]
    fn test_stage_reset_clears_history() {
        let mut stage = StageResult::new(StageName::Reasoning);
        stage.begin();
        stage.push_log("chunk 0 done");
        stage.fail();

        stage.reset();
        assert_eq!(stage.stage, StageName::Reasoning);
        assert_eq!(stage.status, StageStatus::Pending);
        assert!(stage.started_at.is_none());
        assert!(stage.finished_at.is_none());
        assert!(stage.output_path.is_none());
        assert!(stage.logs.is_empty());
    }

    #[test]
    fn test_log_line_format() {
        let mut stage = StageResult::new(StageName::Render);
        stage.push_log("Stage render started");
        assert_eq!(stage.logs.len(), 1);
        let line = &stage.logs[0];
        assert!(line.starts_with('['));
        assert!(line.ends_with("Stage render started"));
    }

    #[test]
    fn test_stage_name_parse() {
        assert_eq!("spatial".parse::<StageName>().unwrap(), StageName::Spatial);
        assert_eq!("composite".parse::<StageName>().unwrap(), StageName::Composite);
        assert!("upload".parse::<StageName>().is_err());
    }

    #[test]
    fn test_stage_name_wire_format() {
        let json = serde_json::to_string(&StageName::Reasoning).unwrap();
        assert_eq!(json, "\"reasoning\"");
    }
}
