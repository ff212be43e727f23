//! String and formatting helpers shared across the pipeline.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Strip control characters and surrounding whitespace from user input.
pub fn sanitize_name(input: &str) -> String {
    input.trim().chars().filter(|c| !c.is_control()).collect()
}

/// Lowercase slug suitable for directory names: alphanumeric runs joined by `-`.
pub fn to_slug(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_dash = true;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// Short random suffix for project ids (first segment of a v4 UUID).
pub fn short_id() -> String {
    Uuid::new_v4()
        .to_string()
        .split('-')
        .next()
        .unwrap_or_default()
        .to_string()
}

/// Truncate a string to `max_length`, appending `...` when cut.
pub fn truncate(s: &str, max_length: usize) -> String {
    if s.chars().count() > max_length {
        let cut: String = s.chars().take(max_length.saturating_sub(3)).collect();
        format!("{cut}...")
    } else {
        s.to_string()
    }
}

/// Human-readable elapsed time between two instants (`53s`, `4m 12s`, `1h 3m`).
///
/// With no end time the duration runs to now.
pub fn format_duration(start: DateTime<Utc>, end: Option<DateTime<Utc>>) -> String {
    let end = end.unwrap_or_else(Utc::now);
    let seconds = (end - start).num_seconds().max(0);
    if seconds < 60 {
        return format!("{seconds}s");
    }
    let minutes = seconds / 60;
    if minutes < 60 {
        return format!("{}m {}s", minutes, seconds % 60);
    }
    format!("{}h {}m", minutes / 60, minutes % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("  Via Roma 12\t"), "Via Roma 12");
        assert_eq!(sanitize_name("a\x00b\x1fc"), "abc");
    }

    #[test]
    fn test_to_slug() {
        assert_eq!(to_slug("Via Roma 12"), "via-roma-12");
        assert_eq!(to_slug("--Hello,  World!--"), "hello-world");
        assert_eq!(to_slug("già visto"), "gi-visto");
    }

    #[test]
    fn test_short_id_shape() {
        let id = short_id();
        assert_eq!(id.len(), 8);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a very long string", 10), "a very ...");
    }

    #[test]
    fn test_format_duration() {
        let start = Utc::now() - Duration::seconds(53);
        assert_eq!(format_duration(start, Some(start + Duration::seconds(53))), "53s");
        assert_eq!(
            format_duration(start, Some(start + Duration::seconds(252))),
            "4m 12s"
        );
        assert_eq!(
            format_duration(start, Some(start + Duration::seconds(3780))),
            "1h 3m"
        );
    }
}
