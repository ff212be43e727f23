//! Model error types.

use thiserror::Error;

pub type ModelResult<T> = Result<T, ModelError>;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("unknown stage: {0}")]
    UnknownStage(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] validator::ValidationErrors),
}
