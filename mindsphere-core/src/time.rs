//! Time handling utilities for the time-series wire format

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::error::{MindSphereError, MindSphereResult};

/// Timestamp representing a point in time with millisecond precision
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

/// Time range for range reads and deletes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    /// Start of the range
    pub from: Timestamp,
    /// End of the range
    pub to: Timestamp,
}

impl Timestamp {
    /// Create from milliseconds since Unix epoch
    pub fn from_millis(millis: i64) -> MindSphereResult<Self> {
        match Utc.timestamp_millis_opt(millis) {
            chrono::LocalResult::Single(dt) => Ok(Self(dt)),
            _ => Err(MindSphereError::time_range(format!(
                "Invalid timestamp: {}",
                millis
            ))),
        }
    }

    /// Get milliseconds since Unix epoch
    pub fn timestamp_millis(&self) -> i64 {
        self.0.timestamp_millis()
    }

    /// Format as `YYYY-MM-DDTHH:mm:ss.sssZ`
    pub fn to_iso_millis(&self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    /// Parse from an RFC 3339 string, any offset is normalized to UTC
    pub fn from_rfc3339(s: &str) -> MindSphereResult<Self> {
        let dt = DateTime::parse_from_rfc3339(s)
            .map_err(|e| {
                MindSphereError::time_range(format!("Invalid RFC3339 timestamp: {}", e))
            })?
            .with_timezone(&Utc);
        Ok(Self(dt))
    }

    /// Interpret a `_time` field from a wire row.
    ///
    /// Strings are parsed as RFC 3339, integers as epoch milliseconds.
    /// Anything else (including `null`) yields `None`.
    pub fn from_wire(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Self::from_rfc3339(s).ok(),
            Value::Number(n) => n.as_i64().and_then(|ms| Self::from_millis(ms).ok()),
            _ => None,
        }
    }

    /// Parse a command-line style argument: RFC 3339 or epoch milliseconds
    pub fn parse_arg(s: &str) -> MindSphereResult<Self> {
        match s.trim().parse::<i64>() {
            Ok(ms) => Self::from_millis(ms),
            Err(_) => Self::from_rfc3339(s.trim()),
        }
    }
}

/// Format epoch milliseconds as `YYYY-MM-DDTHH:mm:ss.sssZ`
pub fn format_millis(millis: i64) -> MindSphereResult<String> {
    Timestamp::from_millis(millis).map(|ts| ts.to_iso_millis())
}

impl TimeRange {
    /// Create a new time range, `from` may equal `to`
    pub fn new(from: Timestamp, to: Timestamp) -> MindSphereResult<Self> {
        if from > to {
            return Err(MindSphereError::validation("from must not be after to"));
        }

        Ok(Self { from, to })
    }

    /// Create a time range from milliseconds
    pub fn from_millis(from_ms: i64, to_ms: i64) -> MindSphereResult<Self> {
        let from = Timestamp::from_millis(from_ms)?;
        let to = Timestamp::from_millis(to_ms)?;
        Self::new(from, to)
    }

    /// Query parameters `from` and `to` as ISO strings
    pub fn query_params(&self) -> Vec<(String, String)> {
        vec![
            ("from".to_string(), self.from.to_iso_millis()),
            ("to".to_string(), self.to.to_iso_millis()),
        ]
    }

    /// Get the duration of this time range in milliseconds
    pub fn duration_millis(&self) -> i64 {
        self.to.timestamp_millis() - self.from.timestamp_millis()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_iso_millis())
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} - {}]", self.from, self.to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_iso_millis_format() {
        let ts = Timestamp::from_millis(1_612_098_000_000).unwrap();
        assert_eq!(ts.to_iso_millis(), "2021-01-31T13:00:00.000Z");

        let ts = Timestamp::from_millis(1_612_098_000_123).unwrap();
        assert_eq!(ts.to_iso_millis(), "2021-01-31T13:00:00.123Z");
    }

    #[test]
    fn test_rfc3339_parsing() {
        let ts = Timestamp::from_rfc3339("2021-01-31T13:00:00Z").unwrap();
        assert_eq!(ts.timestamp_millis(), 1_612_098_000_000);

        let ts = Timestamp::from_rfc3339("2021-01-31T14:00:00.500+01:00").unwrap();
        assert_eq!(ts.timestamp_millis(), 1_612_098_000_500);

        assert!(Timestamp::from_rfc3339("not a date").is_err());
    }

    #[test]
    fn test_from_wire() {
        assert_eq!(
            Timestamp::from_wire(&json!("2021-01-31T13:00:00.000Z")).map(|t| t.timestamp_millis()),
            Some(1_612_098_000_000)
        );
        assert_eq!(
            Timestamp::from_wire(&json!(1_612_098_000_000i64)).map(|t| t.timestamp_millis()),
            Some(1_612_098_000_000)
        );
        assert!(Timestamp::from_wire(&Value::Null).is_none());
        assert!(Timestamp::from_wire(&json!(true)).is_none());
        assert!(Timestamp::from_wire(&json!("garbage")).is_none());
    }

    #[test]
    fn test_parse_arg() {
        assert_eq!(
            Timestamp::parse_arg("1612098000000").unwrap().timestamp_millis(),
            1_612_098_000_000
        );
        assert_eq!(
            Timestamp::parse_arg("2021-01-31T13:00:00Z").unwrap().timestamp_millis(),
            1_612_098_000_000
        );
    }

    #[test]
    fn test_time_range() {
        let range = TimeRange::from_millis(1000, 2000).unwrap();
        assert_eq!(range.duration_millis(), 1000);
        assert_eq!(
            range.query_params(),
            vec![
                ("from".to_string(), "1970-01-01T00:00:01.000Z".to_string()),
                ("to".to_string(), "1970-01-01T00:00:02.000Z".to_string()),
            ]
        );

        assert!(TimeRange::from_millis(1000, 1000).is_ok());
        assert!(TimeRange::from_millis(2000, 1000).is_err());
    }

    #[test]
    fn test_out_of_range_millis() {
        assert!(format_millis(i64::MAX).is_err());
    }
}
