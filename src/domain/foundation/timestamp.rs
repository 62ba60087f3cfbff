//! Timestamp value object for immutable points in time.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Immutable point in time, always UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Creates a timestamp for the current moment.
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Creates a timestamp from a DateTime<Utc>.
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Returns the inner DateTime.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Creates a timestamp from Unix seconds as sent by Stripe.
    ///
    /// Returns `None` for values chrono cannot represent.
    pub fn from_unix_secs(secs: i64) -> Option<Self> {
        Utc.timestamp_opt(secs, 0).single().map(Self)
    }

    /// Returns the timestamp as Unix seconds.
    pub fn as_unix_secs(&self) -> i64 {
        self.0.timestamp()
    }

    /// Parses an RFC 3339 string as written by [`Timestamp::to_rfc3339`].
    pub fn parse_rfc3339(value: &str) -> Option<Self> {
        DateTime::parse_from_rfc3339(value)
            .ok()
            .map(|dt| Self(dt.with_timezone(&Utc)))
    }

    /// Parses a stored timestamp.
    ///
    /// Accepts RFC 3339, and also the offset-less ISO 8601 form
    /// (`2025-01-01T12:00:00.123456`) found in older rows, read as UTC.
    pub fn parse_stored(value: &str) -> Option<Self> {
        Self::parse_rfc3339(value).or_else(|| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|naive| Self(Utc.from_utc_datetime(&naive)))
        })
    }

    /// Formats as RFC 3339 with microsecond precision and a `Z` suffix.
    ///
    /// The fixed width keeps stored strings lexically ordered.
    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    /// Checks if this timestamp is after another.
    pub fn is_after(&self, other: &Timestamp) -> bool {
        self.0 > other.0
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_rfc3339())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn timestamp_now_creates_current_time() {
        let before = Utc::now();
        let ts = Timestamp::now();
        let after = Utc::now();

        assert!(ts.as_datetime() >= &before);
        assert!(ts.as_datetime() <= &after);
    }

    #[test]
    fn timestamp_from_unix_secs_works() {
        // 2024-01-15T00:00:00Z
        let ts = Timestamp::from_unix_secs(1705276800).unwrap();
        assert_eq!(ts.as_datetime().year(), 2024);
        assert_eq!(ts.as_datetime().month(), 1);
        assert_eq!(ts.as_datetime().day(), 15);
    }

    #[test]
    fn timestamp_from_unix_secs_rejects_out_of_range() {
        assert!(Timestamp::from_unix_secs(i64::MAX).is_none());
    }

    #[test]
    fn timestamp_as_unix_secs_matches_input() {
        let ts = Timestamp::from_unix_secs(1705276800).unwrap();
        assert_eq!(ts.as_unix_secs(), 1705276800);
    }

    #[test]
    fn timestamp_formats_with_fixed_precision() {
        let ts = Timestamp::from_unix_secs(1705276800).unwrap();
        assert_eq!(ts.to_rfc3339(), "2024-01-15T00:00:00.000000Z");
        assert_eq!(ts.to_string(), ts.to_rfc3339());
    }

    #[test]
    fn timestamp_parses_its_own_format() {
        let ts = Timestamp::from_unix_secs(1705276800).unwrap();
        assert_eq!(Timestamp::parse_rfc3339(&ts.to_rfc3339()), Some(ts));
    }

    #[test]
    fn timestamp_parse_rejects_garbage() {
        assert!(Timestamp::parse_rfc3339("yesterday").is_none());
    }

    #[test]
    fn timestamp_parse_stored_reads_naive_iso_as_utc() {
        let ts = Timestamp::parse_stored("2025-01-01T12:00:00.123456").unwrap();
        assert_eq!(ts.to_rfc3339(), "2025-01-01T12:00:00.123456Z");

        let whole_second = Timestamp::parse_stored("2025-01-01T12:00:00").unwrap();
        assert_eq!(whole_second.to_rfc3339(), "2025-01-01T12:00:00.000000Z");
    }

    #[test]
    fn timestamp_parse_stored_prefers_offset() {
        let ts = Timestamp::parse_stored("2025-01-01T12:00:00+02:00").unwrap();
        assert_eq!(ts.to_rfc3339(), "2025-01-01T10:00:00.000000Z");
        assert!(Timestamp::parse_stored("yesterday").is_none());
    }

    #[test]
    fn timestamp_is_after_works_correctly() {
        let earlier = Timestamp::from_unix_secs(1000).unwrap();
        let later = Timestamp::from_unix_secs(2000).unwrap();

        assert!(later.is_after(&earlier));
        assert!(!earlier.is_after(&later));
    }

    #[test]
    fn timestamp_deserializes_from_json() {
        let json = "\"2024-01-15T10:30:00Z\"";
        let ts: Timestamp = serde_json::from_str(json).unwrap();

        assert_eq!(ts.as_datetime().year(), 2024);
    }
}
