// src/utils/format.rs

use chrono::{DateTime, Utc};

/// Whole seconds from `start` to `end`, floored and never negative.
pub fn seconds_between(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    (end - start).num_seconds().max(0)
}

/// "2h 30m" when at least an hour, otherwise "45m".
pub fn format_duration(seconds: i64) -> String {
    let seconds = seconds.max(0);
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;

    if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else {
        format!("{}m", minutes)
    }
}

/// Running clock display, "m:ss".
pub fn format_clock(seconds: i64) -> String {
    let seconds = seconds.max(0);
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

/// Cuts `s` to `len` characters and appends "..." when it was longer.
pub fn truncate(s: &str, len: usize) -> String {
    if s.chars().count() <= len {
        return s.to_string();
    }
    let mut out: String = s.chars().take(len).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn durations() {
        assert_eq!(format_duration(9000), "2h 30m");
        assert_eq!(format_duration(2700), "45m");
        assert_eq!(format_duration(59), "0m");
    }

    #[test]
    fn clock() {
        assert_eq!(format_clock(0), "0:00");
        assert_eq!(format_clock(65), "1:05");
        assert_eq!(format_clock(3600), "60:00");
    }

    #[test]
    fn elapsed_is_floored_and_clamped() {
        let start = Utc::now();
        assert_eq!(seconds_between(start, start + Duration::milliseconds(1999)), 1);
        assert_eq!(seconds_between(start, start - Duration::seconds(5)), 0);
    }

    #[test]
    fn truncation() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("Project Management Crisis", 7), "Project...");
    }
}
