//! Date range for listing remote events.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};

use crate::constants::DEFAULT_SCAN_DAYS;
use crate::error::{CalSyncError, CalSyncResult};

/// Date range for filtering events.
/// None values mean unbounded in that direction.
#[derive(Debug, Clone, PartialEq)]
pub struct DateRange {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl Default for DateRange {
    /// Default range: ±DEFAULT_SCAN_DAYS from now
    fn default() -> Self {
        DateRange::around_now(DEFAULT_SCAN_DAYS, DEFAULT_SCAN_DAYS)
    }
}

impl DateRange {
    pub fn around_now(past_days: i64, future_days: i64) -> Self {
        let now = Utc::now();
        DateRange {
            from: Some(now - Duration::days(past_days)),
            to: Some(now + Duration::days(future_days)),
        }
    }

    /// Parse operator-supplied bounds.
    /// - `from`: "start" for unbounded, or YYYY-MM-DD, defaults to -past_days
    /// - `to`: YYYY-MM-DD, defaults to +future_days
    pub fn from_args(
        from: Option<&str>,
        to: Option<&str>,
        past_days: i64,
        future_days: i64,
    ) -> CalSyncResult<Self> {
        let now = Utc::now();

        let from_dt = match from {
            Some("start") => None,
            Some(s) => Some(parse_date_start(s)?),
            None => Some(now - Duration::days(past_days)),
        };

        let to_dt = match to {
            Some(s) => Some(parse_date_end(s)?),
            None => Some(now + Duration::days(future_days)),
        };

        Ok(DateRange {
            from: from_dt,
            to: to_dt,
        })
    }

    /// Get `from` as RFC3339 string, using the epoch if unbounded.
    pub fn from_rfc3339(&self) -> String {
        self.from.unwrap_or(DateTime::<Utc>::UNIX_EPOCH).to_rfc3339()
    }

    /// Get `to` as RFC3339 string, using a far future date if unbounded.
    pub fn to_rfc3339(&self) -> String {
        self.to
            .or_else(|| Utc.with_ymd_and_hms(2100, 1, 1, 0, 0, 0).single())
            .map(|dt| dt.to_rfc3339())
            .unwrap_or_else(|| "2100-01-01T00:00:00+00:00".to_string())
    }
}

/// Parse YYYY-MM-DD as start of day in UTC
fn parse_date_start(s: &str) -> CalSyncResult<DateTime<Utc>> {
    let date = parse_date(s)?;
    Ok(date.and_time(chrono::NaiveTime::MIN).and_utc())
}

/// Parse YYYY-MM-DD as end of day in UTC
fn parse_date_end(s: &str) -> CalSyncResult<DateTime<Utc>> {
    let date = parse_date(s)?;
    let end = date
        .and_hms_opt(23, 59, 59)
        .ok_or_else(|| CalSyncError::Config(format!("Invalid date '{}'", s)))?;
    Ok(end.and_utc())
}

fn parse_date(s: &str) -> CalSyncResult<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| CalSyncError::Config(format!("Invalid date format '{}'. Expected YYYY-MM-DD", s)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_args_parses_inclusive_bounds() {
        let range = DateRange::from_args(Some("2026-03-01"), Some("2026-06-30"), 1, 1).unwrap();
        assert_eq!(range.from_rfc3339(), "2026-03-01T00:00:00+00:00");
        assert_eq!(range.to_rfc3339(), "2026-06-30T23:59:59+00:00");
    }

    #[test]
    fn test_from_args_start_is_unbounded() {
        let range = DateRange::from_args(Some("start"), None, 1, 1).unwrap();
        assert!(range.from.is_none());
        assert_eq!(range.from_rfc3339(), "1970-01-01T00:00:00+00:00");
        assert!(range.to.is_some());
    }

    #[test]
    fn test_from_args_rejects_bad_dates() {
        assert!(DateRange::from_args(Some("03/01/2026"), None, 1, 1).is_err());
    }
}
