//! Host memory pressure and accelerator hygiene.

use std::path::Path;
use std::time::Duration;
use tracing::debug;

use vtour_media::{run_tool, ToolCommand};

/// Pressure above which adaptive chunk reduction kicks in.
const PRESSURE_THRESHOLD: u8 = 80;

/// Smallest chunk the halving rule will produce.
const MIN_CHUNK_FRAMES: u32 = 8;

/// Python snippet that releases accelerator memory between stages.
const FLUSH_SNIPPET: &str = "import gc; gc.collect()\n\
try:\n    import torch; torch.mps.empty_cache()\n\
except Exception:\n    pass\n";

/// Severity band of a pressure reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressureSeverity {
    Normal,
    Warning,
    Critical,
}

/// Current host memory pressure as a used percentage, 0..=100.
///
/// Tries the macOS `memory_pressure` tool, then `/proc/meminfo`; anywhere
/// neither probe works this returns 0 (unknown, treated as no pressure).
pub async fn pressure() -> u8 {
    if let Some(p) = darwin_pressure().await {
        return p;
    }
    if let Some(p) = linux_pressure().await {
        return p;
    }
    0
}

async fn darwin_pressure() -> Option<u8> {
    let cmd = ToolCommand::new("memory_pressure").timeout(Duration::from_secs(5));
    let output = run_tool(&cmd).await.ok()?;
    // "System-wide memory free percentage: 42%"
    let free = parse_free_percentage(&output.stdout)?;
    Some(100 - free)
}

fn parse_free_percentage(stdout: &str) -> Option<u8> {
    let rest = stdout.split("free percentage:").nth(1)?;
    let digits: String = rest
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse::<u8>().ok().filter(|p| *p <= 100)
}

async fn linux_pressure() -> Option<u8> {
    let meminfo = tokio::fs::read_to_string("/proc/meminfo").await.ok()?;
    parse_meminfo(&meminfo)
}

fn parse_meminfo(meminfo: &str) -> Option<u8> {
    let field = |name: &str| -> Option<u64> {
        meminfo
            .lines()
            .find(|l| l.starts_with(name))?
            .split_whitespace()
            .nth(1)?
            .parse()
            .ok()
    };
    let total = field("MemTotal:")?;
    let available = field("MemAvailable:")?;
    if total == 0 {
        return None;
    }
    Some((100 - (available * 100 / total).min(100)) as u8)
}

/// Chunk size under the halving rule: above the pressure threshold the base
/// is halved, floored at 8 frames; otherwise unchanged.
pub fn adaptive_chunk_size(base: u32, pressure: u8) -> u32 {
    if pressure > PRESSURE_THRESHOLD {
        (base / 2).max(MIN_CHUNK_FRAMES)
    } else {
        base
    }
}

/// Human-readable pressure label with its severity band.
pub fn pressure_label(pressure: u8) -> (String, PressureSeverity) {
    let severity = if pressure < 50 {
        PressureSeverity::Normal
    } else if pressure < 75 {
        PressureSeverity::Warning
    } else {
        PressureSeverity::Critical
    };
    let text = match severity {
        PressureSeverity::Normal => format!("{pressure}% - Normal"),
        PressureSeverity::Warning => format!("{pressure}% - Warning"),
        PressureSeverity::Critical => format!("{pressure}% - Critical"),
    };
    (text, severity)
}

/// Ask the Python runtime to drop accelerator memory between stages.
///
/// Hygiene only: every failure is absorbed and logged.
pub async fn flush_accelerator(python: &Path) {
    let cmd = ToolCommand::new(python)
        .args(["-c", FLUSH_SNIPPET])
        .env("PYTORCH_MPS_HIGH_WATERMARK_RATIO", "0.0")
        .timeout(Duration::from_secs(15));
    if let Err(err) = run_tool(&cmd).await {
        debug!(%err, "accelerator flush skipped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adaptive_chunk_unchanged_at_or_below_threshold() {
        for p in [0u8, 40, 80] {
            assert_eq!(adaptive_chunk_size(16, p), 16);
            assert_eq!(adaptive_chunk_size(32, p), 32);
        }
    }

    #[test]
    fn test_adaptive_chunk_halves_above_threshold() {
        assert_eq!(adaptive_chunk_size(16, 81), 8);
        assert_eq!(adaptive_chunk_size(32, 95), 16);
        assert_eq!(adaptive_chunk_size(24, 100), 12);
    }

    #[test]
    fn test_adaptive_chunk_floor() {
        assert_eq!(adaptive_chunk_size(8, 90), 8);
        assert_eq!(adaptive_chunk_size(10, 90), 8);
        assert_eq!(adaptive_chunk_size(4, 90), 8);
    }

    #[test]
    fn test_adaptive_chunk_monotonic_across_threshold() {
        for base in [8u32, 16, 24, 32] {
            assert!(adaptive_chunk_size(base, 81) <= adaptive_chunk_size(base, 80));
        }
    }

    #[test]
    fn test_parse_free_percentage() {
        let out = "The system has 2048 pages...\nSystem-wide memory free percentage: 42%\n";
        assert_eq!(parse_free_percentage(out), Some(42));
        assert_eq!(parse_free_percentage("no match here"), None);
        assert_eq!(parse_free_percentage("free percentage: 900%"), None);
    }

    #[test]
    fn test_parse_meminfo() {
        let meminfo = "MemTotal:       32768000 kB\nMemFree:         1000000 kB\nMemAvailable:    8192000 kB\n";
        assert_eq!(parse_meminfo(meminfo), Some(75));
        assert_eq!(parse_meminfo("MemTotal: 0 kB\nMemAvailable: 0 kB"), None);
        assert_eq!(parse_meminfo(""), None);
    }

    #[test]
    fn test_pressure_label_bands() {
        assert_eq!(pressure_label(10).1, PressureSeverity::Normal);
        assert_eq!(pressure_label(49).1, PressureSeverity::Normal);
        assert_eq!(pressure_label(50).1, PressureSeverity::Warning);
        assert_eq!(pressure_label(74).1, PressureSeverity::Warning);
        assert_eq!(pressure_label(75).1, PressureSeverity::Critical);
        assert_eq!(pressure_label(100).1, PressureSeverity::Critical);
        assert!(pressure_label(42).0.contains("42%"));
    }

    #[tokio::test]
    async fn test_pressure_never_panics() {
        let p = pressure().await;
        assert!(p <= 100);
    }

    #[tokio::test]
    async fn test_flush_absorbs_missing_python() {
        flush_accelerator(Path::new("/nonexistent/python")).await;
    }
}
