//! Video frame-count probe.

use std::path::Path;

use crate::command::run_tool;
use crate::commands::frame_count_command;
use crate::error::{MediaError, MediaResult};

/// Count the frames of a video via ffprobe.
///
/// Callers treat any error as a soft failure and fall back to an estimate;
/// the probe itself decodes the whole stream, so it runs unbounded.
pub async fn count_frames(ffprobe: &Path, work_dir: &Path, video: &Path) -> MediaResult<u64> {
    if !video.exists() {
        return Err(MediaError::FileNotFound(video.to_path_buf()));
    }

    let output = run_tool(&frame_count_command(ffprobe, work_dir, video)).await?;
    parse_frame_count(&output.stdout)
}

fn parse_frame_count(stdout: &str) -> MediaResult<u64> {
    let raw = stdout.trim();
    raw.parse::<u64>()
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| MediaError::probe_unavailable(format!("unusable frame count {raw:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_frame_count() {
        assert_eq!(parse_frame_count("300\n").unwrap(), 300);
        assert_eq!(parse_frame_count(" 42 ").unwrap(), 42);
    }

    #[test]
    fn test_parse_frame_count_rejects_garbage() {
        assert!(parse_frame_count("N/A").is_err());
        assert!(parse_frame_count("").is_err());
        assert!(parse_frame_count("0").is_err());
    }

    #[tokio::test]
    async fn test_count_frames_missing_file() {
        let err = count_frames(
            Path::new("ffprobe"),
            Path::new("/tmp"),
            Path::new("/nonexistent/tour.mp4"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, MediaError::FileNotFound(_)));
    }
}
