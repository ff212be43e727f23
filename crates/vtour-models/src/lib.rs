//! Shared data models for the VTour pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Pipeline run configuration
//! - Per-stage results and status transitions
//! - The durable project record polled by external viewers
//! - Environment diagnostics

pub mod config;
pub mod environment;
pub mod error;
pub mod project;
pub mod stage;
pub mod utils;

// Re-export common types
pub use config::{CameraTrajectory, PipelineConfig, Quantization};
pub use environment::EnvironmentCheck;
pub use error::{ModelError, ModelResult};
pub use project::{PipelineProject, PipelineStatus};
pub use stage::{StageName, StageResult, StageStatus, STAGE_ORDER};
pub use utils::{format_duration, sanitize_name, to_slug, truncate};
