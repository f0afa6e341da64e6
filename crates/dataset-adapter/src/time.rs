//! CF-convention time decoding.
//!
//! Zarr time coordinates carry integer offsets plus a `units` attribute of
//! the form `"<unit> since <epoch>"`. Decoding happens per slice so the
//! engine never needs the whole axis in memory.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::error::{AdapterError, Result};

/// Offset unit of a CF time coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimeUnit {
    Nanoseconds,
    Microseconds,
    Milliseconds,
    Seconds,
    Minutes,
    Hours,
    Days,
}

/// Parsed `units` attribute of a time coordinate.
#[derive(Debug, Clone, Copy)]
pub struct TimeEncoding {
    unit: TimeUnit,
    epoch: DateTime<Utc>,
}

impl TimeEncoding {
    /// Parse a CF units string such as `"seconds since 1970-01-01T00:00:00Z"`.
    pub fn parse(units: &str) -> Result<Self> {
        let mut parts = units.splitn(2, " since ");
        let unit_word = parts.next().unwrap_or("").trim().to_lowercase();
        let epoch_str = parts
            .next()
            .ok_or_else(|| {
                AdapterError::corrupt(format!("time units missing 'since' clause: '{}'", units))
            })?
            .trim();

        let unit = match unit_word.as_str() {
            "nanoseconds" | "nanosecond" | "ns" => TimeUnit::Nanoseconds,
            "microseconds" | "microsecond" | "us" => TimeUnit::Microseconds,
            "milliseconds" | "millisecond" | "ms" => TimeUnit::Milliseconds,
            "seconds" | "second" | "s" => TimeUnit::Seconds,
            "minutes" | "minute" | "min" => TimeUnit::Minutes,
            "hours" | "hour" | "h" => TimeUnit::Hours,
            "days" | "day" | "d" => TimeUnit::Days,
            other => {
                return Err(AdapterError::corrupt(format!(
                    "unsupported time unit '{}'",
                    other
                )))
            }
        };

        Ok(Self {
            unit,
            epoch: parse_epoch(epoch_str)?,
        })
    }

    /// Decode one raw offset to a UTC timestamp.
    pub fn decode(&self, value: i64) -> DateTime<Utc> {
        let delta = match self.unit {
            TimeUnit::Nanoseconds => Duration::nanoseconds(value),
            TimeUnit::Microseconds => Duration::microseconds(value),
            TimeUnit::Milliseconds => Duration::milliseconds(value),
            TimeUnit::Seconds => Duration::seconds(value),
            TimeUnit::Minutes => Duration::minutes(value),
            TimeUnit::Hours => Duration::hours(value),
            TimeUnit::Days => Duration::days(value),
        };
        self.epoch + delta
    }
}

/// Parse the epoch part of a CF units string.
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS` and plain
/// dates; naive timestamps are taken as UTC.
fn parse_epoch(s: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(Utc.from_utc_datetime(&ndt));
        }
    }
    if let Ok(nd) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        let ndt = nd.and_hms_opt(0, 0, 0).ok_or_else(|| {
            AdapterError::corrupt(format!("invalid epoch date '{}'", s))
        })?;
        return Ok(Utc.from_utc_datetime(&ndt));
    }
    Err(AdapterError::corrupt(format!(
        "unparseable time epoch '{}'",
        s
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_parse_seconds_since_epoch() {
        let enc = TimeEncoding::parse("seconds since 1970-01-01T00:00:00Z").unwrap();
        let dt = enc.decode(3600);
        assert_eq!(dt.hour(), 1);
    }

    #[test]
    fn test_parse_minutes_naive_epoch() {
        let enc = TimeEncoding::parse("minutes since 2000-01-01 00:00:00").unwrap();
        let dt = enc.decode(90);
        assert_eq!(dt, Utc.with_ymd_and_hms(2000, 1, 1, 1, 30, 0).unwrap());
    }

    #[test]
    fn test_parse_date_only_epoch() {
        let enc = TimeEncoding::parse("days since 2020-06-01").unwrap();
        let dt = enc.decode(2);
        assert_eq!(dt, Utc.with_ymd_and_hms(2020, 6, 3, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_reject_missing_since() {
        assert!(TimeEncoding::parse("seconds").is_err());
    }

    #[test]
    fn test_reject_unknown_unit() {
        assert!(TimeEncoding::parse("fortnights since 1970-01-01").is_err());
    }
}
