//! Event time intervals and ISO 8601 interval parsing
//!
//! Supported interval forms:
//!
//! - `<start>/<end>`, e.g. `2020-06-01T10:00:00Z/2020-06-01T11:30:00Z`
//! - `<start>/<duration>`, e.g. `2020-06-01T10:00:00+02:00/PT1H30M`
//! - `<duration>/<end>`, e.g. `P1DT12H/2020-06-03`
//!
//! Date-times may carry `Z` or a numeric offset. Date-times without an offset are UTC, and
//! plain dates mean midnight UTC.

use crate::utils;
use chrono::{DateTime, Duration, Months, NaiveDate, NaiveDateTime, Utc};
use std::str::FromStr;

/// Error produced when a string is not a valid ISO 8601 interval
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{value}': {reason}")]
pub struct IntervalError {
    /// The offending text
    pub value: String,
    /// Why it was rejected
    pub reason: String,
}

impl IntervalError {
    fn new(value: &str, reason: impl Into<String>) -> Self {
        Self {
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// A closed time window `[start, end]` in UTC
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EventInterval {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl EventInterval {
    /// Create an interval. Ordering is not checked here; the catalog rejects inverted intervals.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    #[inline]
    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    #[inline]
    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Start as UTC epoch seconds
    #[inline]
    pub fn start_seconds(&self) -> f64 {
        utils::to_epoch_seconds(&self.start)
    }

    /// End as UTC epoch seconds
    #[inline]
    pub fn end_seconds(&self) -> f64 {
        utils::to_epoch_seconds(&self.end)
    }

    /// True when the end is not earlier than the start
    #[inline]
    pub fn is_ordered(&self) -> bool {
        self.start <= self.end
    }

    #[inline]
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

impl FromStr for EventInterval {
    type Err = IntervalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_interval(s)
    }
}

/// Parse an ISO 8601 time interval
pub fn parse_interval(text: &str) -> Result<EventInterval, IntervalError> {
    let trimmed = text.trim();
    let (left, right) = trimmed
        .split_once('/')
        .ok_or_else(|| IntervalError::new(text, "expected '<start>/<end>'"))?;
    if right.contains('/') {
        return Err(IntervalError::new(text, "more than one '/' separator"));
    }

    let left_is_duration = left.starts_with('P');
    let right_is_duration = right.starts_with('P');

    match (left_is_duration, right_is_duration) {
        (true, true) => Err(IntervalError::new(
            text,
            "an interval needs at least one date-time",
        )),
        (false, false) => {
            let start = parse_datetime(left).map_err(|reason| IntervalError::new(text, reason))?;
            let end = parse_datetime(right).map_err(|reason| IntervalError::new(text, reason))?;
            Ok(EventInterval::new(start, end))
        }
        (false, true) => {
            let start = parse_datetime(left).map_err(|reason| IntervalError::new(text, reason))?;
            let duration =
                parse_duration(right).map_err(|reason| IntervalError::new(text, reason))?;
            let end = duration
                .add_to(start)
                .ok_or_else(|| IntervalError::new(text, "interval end is out of range"))?;
            Ok(EventInterval::new(start, end))
        }
        (true, false) => {
            let duration =
                parse_duration(left).map_err(|reason| IntervalError::new(text, reason))?;
            let end = parse_datetime(right).map_err(|reason| IntervalError::new(text, reason))?;
            let start = duration
                .sub_from(end)
                .ok_or_else(|| IntervalError::new(text, "interval start is out of range"))?;
            Ok(EventInterval::new(start, end))
        }
    }
}

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y%m%dT%H%M%S%.f",
];

const OFFSET_DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%dT%H:%M%z"];

/// Parse an ISO 8601 date or date-time into UTC
pub fn parse_datetime(text: &str) -> Result<DateTime<Utc>, String> {
    let text = text.trim();
    if text.is_empty() {
        return Err("empty date-time".to_string());
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.with_timezone(&Utc));
    }
    for format in OFFSET_DATETIME_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(text, format) {
            return Ok(dt.with_timezone(&Utc));
        }
    }

    // A trailing Z on an otherwise naive value is UTC as well
    let naive = text.strip_suffix('Z').unwrap_or(text);
    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(naive, format) {
            return Ok(dt.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(naive, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }

    Err(format!("'{text}' is not an ISO 8601 date-time"))
}

/// A parsed ISO 8601 duration
///
/// Years and months are calendar units, everything else is exact time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IsoDuration {
    pub months: u32,
    pub exact: Duration,
}

impl IsoDuration {
    fn add_to(&self, instant: DateTime<Utc>) -> Option<DateTime<Utc>> {
        instant
            .checked_add_months(Months::new(self.months))?
            .checked_add_signed(self.exact)
    }

    fn sub_from(&self, instant: DateTime<Utc>) -> Option<DateTime<Utc>> {
        instant
            .checked_sub_months(Months::new(self.months))?
            .checked_sub_signed(self.exact)
    }
}

// Roughly 290 years, the range of a nanosecond `Duration`
const MAX_DURATION_SECONDS: f64 = 9.2e9;

/// Parse an ISO 8601 duration such as `P1Y2M10DT2H30M` or `PT0.5S`
pub fn parse_duration(text: &str) -> Result<IsoDuration, String> {
    let body = text
        .trim()
        .strip_prefix('P')
        .ok_or_else(|| format!("'{text}' is not an ISO 8601 duration"))?;
    let (date_part, time_part) = match body.split_once('T') {
        Some((date, time)) => {
            if time.is_empty() {
                return Err(format!("'{text}' has an empty time part"));
            }
            (date, Some(time))
        }
        None => (body, None),
    };
    if date_part.is_empty() && time_part.is_none() {
        return Err(format!("'{text}' has no components"));
    }

    let mut months: u32 = 0;
    let mut seconds: f64 = 0.0;

    for (value, designator) in duration_components(date_part, text)? {
        match designator {
            'Y' | 'M' => {
                if value.fract() != 0.0 {
                    return Err(format!("'{text}': fractional years or months are not supported"));
                }
                let factor = if designator == 'Y' { 12.0 } else { 1.0 };
                let add = value * factor;
                if add > f64::from(u32::MAX - months) {
                    return Err(format!("'{text}' is too long"));
                }
                months += add as u32;
            }
            'W' => seconds += value * 7.0 * 86_400.0,
            'D' => seconds += value * 86_400.0,
            other => return Err(format!("'{text}': unexpected date designator '{other}'")),
        }
    }
    if let Some(time_part) = time_part {
        for (value, designator) in duration_components(time_part, text)? {
            match designator {
                'H' => seconds += value * 3_600.0,
                'M' => seconds += value * 60.0,
                'S' => seconds += value,
                other => return Err(format!("'{text}': unexpected time designator '{other}'")),
            }
        }
    }

    if seconds > MAX_DURATION_SECONDS {
        return Err(format!("'{text}' is too long"));
    }
    Ok(IsoDuration {
        months,
        exact: Duration::nanoseconds((seconds * 1e9).round() as i64),
    })
}

/// Split `1Y2.5D` into `[(1.0, 'Y'), (2.5, 'D')]`
fn duration_components(part: &str, text: &str) -> Result<Vec<(f64, char)>, String> {
    let mut components = Vec::new();
    let mut number = String::new();
    for c in part.chars() {
        if c.is_ascii_digit() || c == '.' || c == ',' {
            number.push(if c == ',' { '.' } else { c });
        } else if c.is_ascii_uppercase() {
            let value: f64 = number
                .parse()
                .map_err(|_| format!("'{text}': missing or invalid number before '{c}'"))?;
            components.push((value, c));
            number.clear();
        } else {
            return Err(format!("'{text}': unexpected character '{c}'"));
        }
    }
    if !number.is_empty() {
        return Err(format!("'{text}': number without designator"));
    }
    Ok(components)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn test_start_end_interval() {
        let interval = parse_interval("2020-06-01T10:00:00Z/2020-06-01T11:30:00Z").unwrap();
        assert_eq!(interval.start(), utc(2020, 6, 1, 10, 0, 0));
        assert_eq!(interval.end(), utc(2020, 6, 1, 11, 30, 0));
        assert!(interval.is_ordered());
    }

    #[test]
    fn test_offsets_are_converted_to_utc() {
        let interval =
            parse_interval("2020-06-01T12:00:00+02:00/2020-06-01T13:00:00+0200").unwrap();
        assert_eq!(interval.start(), utc(2020, 6, 1, 10, 0, 0));
        assert_eq!(interval.end(), utc(2020, 6, 1, 11, 0, 0));
    }

    #[test]
    fn test_naive_datetimes_are_utc() {
        let interval = parse_interval("2020-06-01T10:00:00/2020-06-01T10:00:30.5").unwrap();
        assert_eq!(interval.start(), utc(2020, 6, 1, 10, 0, 0));
        assert!((interval.end_seconds() - interval.start_seconds() - 30.5).abs() < 1e-9);
    }

    #[test]
    fn test_plain_dates() {
        let interval = parse_interval("2020-06-01/2020-06-02").unwrap();
        assert_eq!(interval.start(), utc(2020, 6, 1, 0, 0, 0));
        assert_eq!(interval.end(), utc(2020, 6, 2, 0, 0, 0));
    }

    #[test]
    fn test_start_and_duration() {
        let interval = parse_interval("2020-06-01T10:00:00Z/PT1H30M").unwrap();
        assert_eq!(interval.end(), utc(2020, 6, 1, 11, 30, 0));

        let interval = parse_interval("2020-01-31T00:00:00Z/P1M").unwrap();
        assert_eq!(interval.end(), utc(2020, 2, 29, 0, 0, 0));
    }

    #[test]
    fn test_duration_and_end() {
        let interval = parse_interval("P1DT12H/2020-06-03T12:00:00Z").unwrap();
        assert_eq!(interval.start(), utc(2020, 6, 2, 0, 0, 0));
        assert_eq!(interval.end(), utc(2020, 6, 3, 12, 0, 0));
    }

    #[test]
    fn test_fractional_and_week_durations() {
        let duration = parse_duration("PT0,5S").unwrap();
        assert_eq!(duration.exact, Duration::milliseconds(500));

        let duration = parse_duration("P2W").unwrap();
        assert_eq!(duration.exact, Duration::days(14));
        assert_eq!(duration.months, 0);

        let duration = parse_duration("P1Y2M").unwrap();
        assert_eq!(duration.months, 14);
    }

    #[test]
    fn test_duration_limit() {
        let duration = parse_duration("P100000D").unwrap();
        assert_eq!(duration.exact, Duration::days(100_000));

        for bad in ["PT9300000000S", "P150000D", "P20000W"] {
            let err = parse_duration(bad).unwrap_err();
            assert!(err.contains("too long"), "{bad}: {err}");
        }
    }

    #[test]
    fn test_inverted_interval_parses() {
        // Ordering is a catalog concern
        let interval = parse_interval("2020-06-02T00:00:00Z/2020-06-01T00:00:00Z").unwrap();
        assert!(!interval.is_ordered());
    }

    #[test]
    fn test_malformed_intervals() {
        for bad in [
            "",
            "Start line",
            "2020-06-01T10:00:00Z",
            "P1D/PT1H",
            "2020-06-01/2020-06-02/2020-06-03",
            "2020-13-01/2020-06-02",
            "2020-06-01T10:00:00Z/P",
            "2020-06-01T10:00:00Z/PT",
            "2020-06-01T10:00:00Z/P1.5M",
            "2020-06-01T10:00:00Z/PT5",
        ] {
            assert!(parse_interval(bad).is_err(), "'{bad}' should be rejected");
        }
    }

    #[test]
    fn test_from_str() {
        let interval: EventInterval = "2020-06-01/P1D".parse().unwrap();
        assert_eq!(interval.duration(), Duration::days(1));

        let err = "nope".parse::<EventInterval>().unwrap_err();
        assert_eq!(err.value, "nope");
    }
}
