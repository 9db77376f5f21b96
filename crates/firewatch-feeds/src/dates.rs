//! Date-range selection for the detection feed.

use chrono::{DateTime, Duration, Utc};

/// A user-selectable acquisition date range.
///
/// The UI offers fixed presets; `Custom` carries explicit endpoints. The
/// range is translated to concrete timestamps at request time so a preset
/// stays "last 24 hours from now", not from when it was selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateRange {
    /// The 24 hours preceding the request.
    Last24h,
    /// The 7 days preceding the request.
    Last7d,
    /// The 30 days preceding the request.
    Last30d,
    /// An explicit start/end pair.
    Custom {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

impl DateRange {
    /// Resolve the range to concrete `(start, end)` timestamps.
    #[must_use]
    pub fn window(&self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        match self {
            DateRange::Last24h => (now - Duration::hours(24), now),
            DateRange::Last7d => (now - Duration::days(7), now),
            DateRange::Last30d => (now - Duration::days(30), now),
            DateRange::Custom { start, end } => (*start, *end),
        }
    }

    /// Resolve the range to RFC 3339 strings for query parameters.
    #[must_use]
    pub fn window_rfc3339(&self, now: DateTime<Utc>) -> (String, String) {
        let (start, end) = self.window(now);
        (start.to_rfc3339(), end.to_rfc3339())
    }
}

/// Format a timestamp as the date-only string the prediction feed expects.
#[must_use]
pub fn forecast_date(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 10, 6, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_preset_windows_end_at_now() {
        let now = fixed_now();
        for range in [DateRange::Last24h, DateRange::Last7d, DateRange::Last30d] {
            let (start, end) = range.window(now);
            assert_eq!(end, now);
            assert!(start < end);
        }
    }

    #[test]
    fn test_24h_window_span() {
        let (start, end) = DateRange::Last24h.window(fixed_now());
        assert_eq!(end - start, Duration::hours(24));
    }

    #[test]
    fn test_30d_window_span() {
        let (start, end) = DateRange::Last30d.window(fixed_now());
        assert_eq!(end - start, Duration::days(30));
    }

    #[test]
    fn test_custom_window_passes_through() {
        let start = Utc.with_ymd_and_hms(2025, 9, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2025, 9, 2, 0, 0, 0).unwrap();
        let range = DateRange::Custom { start, end };
        assert_eq!(range.window(fixed_now()), (start, end));
    }

    #[test]
    fn test_forecast_date_is_date_only() {
        assert_eq!(forecast_date(fixed_now()), "2025-10-06");
    }

    #[test]
    fn test_rfc3339_formatting() {
        let (start, _end) = DateRange::Last24h.window_rfc3339(fixed_now());
        assert_eq!(start, "2025-10-05T12:00:00+00:00");
    }
}
