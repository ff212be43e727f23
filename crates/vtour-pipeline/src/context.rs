//! Run context: tool paths and roots resolved once at startup.

use std::path::PathBuf;

/// Everything the orchestrator and stage executors need from the host
/// environment, constructed once and passed by reference. Core logic never
/// reads ambient configuration.
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Python interpreter hosting the reconstruction/render/reasoning tools
    pub python_path: PathBuf,
    /// FFmpeg binary; ffprobe is resolved as its sibling
    pub ffmpeg_path: PathBuf,
    /// Spatial reconstruction checkpoint file
    pub reconstruction_checkpoint: PathBuf,
    /// Reasoning model directory
    pub reasoning_model: PathBuf,
    /// Root directory holding one subdirectory per project
    pub projects_root: PathBuf,
    /// Total-frame estimate used when the ffprobe count fails
    pub fallback_total_frames: u64,
}

impl Default for RunContext {
    fn default() -> Self {
        Self {
            python_path: PathBuf::from("python3"),
            ffmpeg_path: PathBuf::from("ffmpeg"),
            reconstruction_checkpoint: PathBuf::from("tttlrm.ckpt"),
            reasoning_model: PathBuf::from("vbvr-model"),
            projects_root: home_dir().join("VTour"),
            fallback_total_frames: 300,
        }
    }
}

impl RunContext {
    /// Build the context from environment variables, with defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            python_path: env_path("VTOUR_PYTHON").unwrap_or(defaults.python_path),
            ffmpeg_path: env_path("VTOUR_FFMPEG").unwrap_or(defaults.ffmpeg_path),
            reconstruction_checkpoint: env_path("VTOUR_TTTLRM_CHECKPOINT")
                .unwrap_or(defaults.reconstruction_checkpoint),
            reasoning_model: env_path("VTOUR_VBVR_MODEL").unwrap_or(defaults.reasoning_model),
            projects_root: env_path("VTOUR_PROJECTS_ROOT").unwrap_or(defaults.projects_root),
            fallback_total_frames: std::env::var("VTOUR_FALLBACK_FRAMES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.fallback_total_frames),
        }
    }

    /// ffprobe next to the configured ffmpeg binary.
    pub fn ffprobe_path(&self) -> PathBuf {
        let raw = self.ffmpeg_path.to_string_lossy();
        if raw.contains("ffmpeg") {
            PathBuf::from(raw.replace("ffmpeg", "ffprobe"))
        } else {
            PathBuf::from("ffprobe")
        }
    }
}

fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.is_empty())
        .map(|v| expand_home(&v))
}

/// Expand a leading `~` to the home directory.
fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        home_dir().join(rest)
    } else if path == "~" {
        home_dir()
    } else {
        PathBuf::from(path)
    }
}

fn home_dir() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_defaults() {
        let ctx = RunContext::default();
        assert_eq!(ctx.python_path, Path::new("python3"));
        assert_eq!(ctx.fallback_total_frames, 300);
        assert!(ctx.projects_root.ends_with("VTour"));
    }

    #[test]
    fn test_ffprobe_path_derivation() {
        let mut ctx = RunContext::default();
        assert_eq!(ctx.ffprobe_path(), Path::new("ffprobe"));

        ctx.ffmpeg_path = PathBuf::from("/opt/homebrew/bin/ffmpeg");
        assert_eq!(ctx.ffprobe_path(), Path::new("/opt/homebrew/bin/ffprobe"));

        ctx.ffmpeg_path = PathBuf::from("/usr/local/bin/encoder");
        assert_eq!(ctx.ffprobe_path(), Path::new("ffprobe"));
    }

    #[test]
    fn test_expand_home() {
        let home = home_dir();
        assert_eq!(expand_home("~/models/ckpt"), home.join("models/ckpt"));
        assert_eq!(expand_home("/abs/path"), PathBuf::from("/abs/path"));
    }
}
