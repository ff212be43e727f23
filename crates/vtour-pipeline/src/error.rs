//! Pipeline error types.

use thiserror::Error;

pub type PipelineResult<T> = Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("missing dependency: {0}")]
    MissingDependency(String),

    #[error("project record corrupt: {0}")]
    CorruptProject(String),

    #[error("model error: {0}")]
    Model(#[from] vtour_models::ModelError),

    #[error("media error: {0}")]
    Media(#[from] vtour_media::MediaError),

    #[error("store error: {0}")]
    Store(#[from] vtour_store::StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// A stage re-run was requested before its prerequisite produced output.
    pub fn missing_dependency(msg: impl Into<String>) -> Self {
        Self::MissingDependency(msg.into())
    }

    pub fn corrupt_project(msg: impl Into<String>) -> Self {
        Self::CorruptProject(msg.into())
    }
}
