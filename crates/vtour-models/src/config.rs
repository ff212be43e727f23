//! Pipeline run configuration.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

/// Camera path followed when rendering the tour video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum CameraTrajectory {
    /// Full orbit around the reconstructed scene
    #[default]
    Orbit,
    /// Linear walkthrough path
    Flythrough,
    /// Trajectory loaded from a file next to the scene
    Custom,
}

impl CameraTrajectory {
    pub fn as_str(&self) -> &'static str {
        match self {
            CameraTrajectory::Orbit => "orbit",
            CameraTrajectory::Flythrough => "flythrough",
            CameraTrajectory::Custom => "custom",
        }
    }
}

impl fmt::Display for CameraTrajectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Weight quantization mode for the reasoning model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
pub enum Quantization {
    #[serde(rename = "4bit")]
    FourBit,
    #[serde(rename = "8bit")]
    #[default]
    EightBit,
}

impl Quantization {
    pub fn as_str(&self) -> &'static str {
        match self {
            Quantization::FourBit => "4bit",
            Quantization::EightBit => "8bit",
        }
    }
}

impl fmt::Display for Quantization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Immutable per-run configuration, fixed at project creation.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PipelineConfig {
    /// Views sampled by the spatial reconstruction tool
    #[validate(range(min = 1))]
    pub num_views: u32,

    /// Memory cap handed to the reconstruction tool, in GB
    #[validate(range(min = 1))]
    pub max_spatial_memory_gb: u32,

    /// Tour render resolution, e.g. "1920x1080"
    pub render_resolution: String,

    /// Tour render frame rate
    #[validate(range(min = 1))]
    pub render_fps: u32,

    /// Camera path for the tour render
    #[serde(default)]
    pub camera_trajectory: CameraTrajectory,

    /// Overlay instructions given to the reasoning model
    pub reasoning_prompt: String,

    /// Frames per reasoning chunk before adaptive reduction
    #[validate(range(min = 1))]
    pub chunk_frames: u32,

    /// Reasoning model quantization
    #[serde(default)]
    pub quantization: Quantization,

    /// Offload reasoning model layers to CPU during inference
    #[serde(default)]
    pub cpu_offload: bool,

    /// Overall host memory budget, in GB
    #[validate(range(min = 1))]
    pub max_memory_gb: u32,

    /// Halve chunk size when memory pressure crosses the threshold
    #[serde(default)]
    pub auto_chunk_reduction: bool,
}

impl PipelineConfig {
    /// Configuration with the stock defaults used by the creation form.
    ///
    /// The spatial cap leaves 4 GB of headroom under the overall budget,
    /// clamped to 20 GB.
    pub fn with_defaults(reasoning_prompt: impl Into<String>, max_memory_gb: u32) -> Self {
        Self {
            num_views: 16,
            max_spatial_memory_gb: max_memory_gb.saturating_sub(4).clamp(1, 20),
            render_resolution: "1920x1080".to_string(),
            render_fps: 30,
            camera_trajectory: CameraTrajectory::Orbit,
            reasoning_prompt: reasoning_prompt.into(),
            chunk_frames: 16,
            quantization: Quantization::EightBit,
            cpu_offload: true,
            max_memory_gb,
            auto_chunk_reduction: true,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::with_defaults("", 24)
    }
}
