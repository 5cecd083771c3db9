use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};

use crate::bail;
use crate::error::{ErrorKind, EtlResult};

/// A half-open time interval `[start, end)` over which one run extracts records.
///
/// Invariant: `start < end`, enforced at construction. Immutable once constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeRange {
    /// Creates a new [`TimeRange`], rejecting empty or inverted intervals.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> EtlResult<Self> {
        if start >= end {
            bail!(
                ErrorKind::InvalidData,
                "Time range start must precede its end",
                format!("start {start}, end {end}")
            );
        }

        Ok(Self { start, end })
    }

    /// Parses a range from `YYYY-MM-DD` date strings.
    ///
    /// Both dates are interpreted as midnight UTC; the end date is exclusive, so
    /// `2022-01-01` to `2022-02-01` covers all of January.
    pub fn from_dates(start_date: &str, end_date: &str) -> EtlResult<Self> {
        let start = parse_utc_date(start_date)?;
        let end = parse_utc_date(end_date)?;

        Self::new(start, end)
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// One contiguous sub-interval of a [`TimeRange`].
///
/// Windows are produced lazily by the planner, consumed immediately by the fetcher,
/// and discarded. Successive windows are contiguous and non-overlapping; their union
/// covers the parent range exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Window {
    /// Window start as epoch seconds, the source's time representation (inclusive).
    pub fn start_epoch(&self) -> i64 {
        self.start.timestamp()
    }

    /// Window end as epoch seconds (exclusive).
    pub fn end_epoch(&self) -> i64 {
        self.end.timestamp()
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// Parses a `YYYY-MM-DD` date string to midnight UTC.
fn parse_utc_date(date: &str) -> EtlResult<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")?;

    Ok(date
        .and_hms_opt(0, 0, 0)
        .expect("midnight is always a valid time")
        .and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_rejects_inverted_bounds() {
        let range = TimeRange::from_dates("2024-02-01", "2024-01-01");
        assert!(range.is_err());
    }

    #[test]
    fn range_rejects_empty_interval() {
        let range = TimeRange::from_dates("2024-01-01", "2024-01-01");
        assert!(range.is_err());
    }

    #[test]
    fn dates_parse_to_midnight_utc_epochs() {
        let range = TimeRange::from_dates("2024-01-01", "2024-02-01").unwrap();

        assert_eq!(range.start().timestamp(), 1704067200);
        assert_eq!(range.end().timestamp(), 1706745600);
    }

    #[test]
    fn malformed_date_is_a_conversion_error() {
        let range = TimeRange::from_dates("01/01/2024", "2024-02-01");
        assert_eq!(
            range.unwrap_err().kind(),
            crate::error::ErrorKind::ConversionError
        );
    }
}
