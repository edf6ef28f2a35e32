//! Timestamp and event-id helpers shared by the engine and the audit trail.

use ulid::Ulid;

/// Returns unix-epoch seconds with `Z` suffix (e.g. `1771220592Z`).
pub fn now_epoch_z() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    format!("{}Z", secs)
}

/// Current unix-epoch seconds, for relative-time math.
pub fn now_epoch_secs() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

pub fn new_event_id() -> String {
    Ulid::new().to_string()
}

/// Renders an epoch-`Z` timestamp relative to now: "today", "1 day ago",
/// "N days ago". Unparseable input is returned verbatim.
pub fn days_ago(ts: &str) -> String {
    let Some(secs) = ts.strip_suffix('Z').and_then(|s| s.parse::<u64>().ok()) else {
        return ts.to_string();
    };
    let now = now_epoch_secs();
    let days = now.saturating_sub(secs) / 86_400;
    match days {
        0 => "today".to_string(),
        1 => "1 day ago".to_string(),
        n => format!("{} days ago", n),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_epoch_z_format() {
        let result = now_epoch_z();
        assert!(result.ends_with('Z'));
        let numeric_part = result.trim_end_matches('Z');
        assert!(numeric_part.parse::<u64>().is_ok());
    }

    #[test]
    fn test_new_event_id_is_unique() {
        let id1 = new_event_id();
        let id2 = new_event_id();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_days_ago_today() {
        assert_eq!(days_ago(&now_epoch_z()), "today");
    }

    #[test]
    fn test_days_ago_past() {
        let two_days = now_epoch_secs() - 2 * 86_400;
        assert_eq!(days_ago(&format!("{}Z", two_days)), "2 days ago");
    }

    #[test]
    fn test_days_ago_garbage_passthrough() {
        assert_eq!(days_ago("not-a-timestamp"), "not-a-timestamp");
    }
}
