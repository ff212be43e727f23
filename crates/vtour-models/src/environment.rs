//! Environment diagnostics.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Result of probing one pipeline prerequisite.
///
/// Transient, recomputed on demand; never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentCheck {
    /// Human-readable prerequisite name
    pub name: String,

    /// The command line that was probed
    pub command: String,

    /// Whether the prerequisite is usable
    pub ok: bool,

    /// First line of the probe's output when ok
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Failure description when not ok
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EnvironmentCheck {
    /// A passing check.
    pub fn ok(name: impl Into<String>, command: impl Into<String>, version: Option<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            ok: true,
            version,
            error: None,
        }
    }

    /// A failing check.
    pub fn failed(
        name: impl Into<String>,
        command: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            ok: false,
            version: None,
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors() {
        let ok = EnvironmentCheck::ok("FFmpeg", "ffmpeg -version", Some("ffmpeg 7.0".into()));
        assert!(ok.ok);
        assert!(ok.error.is_none());

        let failed = EnvironmentCheck::failed("Python", "python --version", "not found");
        assert!(!failed.ok);
        assert_eq!(failed.error.as_deref(), Some("not found"));
    }
}
