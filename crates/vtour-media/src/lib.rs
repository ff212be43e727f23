//! External tool invocation layer for the VTour pipeline.
//!
//! This crate provides:
//! - A generic tool command builder and async runner with full output capture
//! - Command lines for the pipeline's external tools (reconstruction, tour
//!   render, chunked reasoning, ffprobe/ffmpeg plumbing)
//! - The frame-count probe and concat-manifest helpers
//! - Bounded-timeout availability checks for diagnostics

pub mod check;
pub mod command;
pub mod commands;
pub mod compose;
pub mod error;
pub mod probe;

pub use check::run_check;
pub use command::{check_tool, run_tool, ToolCommand, ToolOutput};
pub use commands::{
    concat_command, extract_chunk_command, frame_count_command, reasoning_command,
    reconstruction_command, render_command,
};
pub use compose::{concat_manifest_body, write_concat_manifest};
pub use error::{MediaError, MediaResult};
pub use probe::count_frames;
