//! Pipeline orchestration for VTour.
//!
//! This crate provides:
//! - The [`Orchestrator`] state machine sequencing the four stages with
//!   durable transitions
//! - Stage executors for reconstruction, tour render, chunked reasoning,
//!   and compositing
//! - The memory monitor driving adaptive chunk sizing and inter-stage
//!   accelerator flushes
//! - The run context resolved once from the environment

pub mod context;
pub mod diagnostics;
pub mod error;
pub mod memory;
pub mod orchestrator;
pub mod stages;

pub use context::RunContext;
pub use diagnostics::environment_checks;
pub use error::{PipelineError, PipelineResult};
pub use orchestrator::Orchestrator;
