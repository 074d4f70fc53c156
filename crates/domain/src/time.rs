//! Time and timestamp helpers.

use chrono::{DateTime, SecondsFormat, Utc};

/// UTC timestamp used for creation times, transition times, log entries, etc.
pub type Timestamp = DateTime<Utc>;

/// Return the current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}

/// Fixed-width RFC 3339 rendering (microseconds, `Z` suffix).
///
/// Stored timestamps compare lexicographically in the same order as
/// chronologically, which range queries rely on.
#[must_use]
pub fn to_sortable_string(ts: Timestamp) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn should_return_current_utc_time() {
        let before = Utc::now();
        let ts = now();
        let after = Utc::now();
        assert!(ts >= before);
        assert!(ts <= after);
    }

    #[test]
    fn should_render_fixed_width_strings_that_sort_chronologically() {
        let a = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        let b = a + Duration::microseconds(1_500_000);
        let (sa, sb) = (to_sortable_string(a), to_sortable_string(b));
        assert_eq!(sa, "2026-01-02T03:04:05.000000Z");
        assert_eq!(sa.len(), sb.len());
        assert!(sa < sb);
    }
}
