//! Utility functions for names, timestamps and angles

use chrono::{DateTime, Utc};

/// Make a human-supplied name safe to use as a single path component
///
/// Path separators, dots and spaces become `-`, so a name can neither climb out of the output
/// directory nor create nested directories.
pub fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | '.' | ' ' => '-',
            c => c,
        })
        .collect()
}

/// Convert an instant to UTC epoch seconds, keeping sub-second precision
#[inline]
pub fn to_epoch_seconds(instant: &DateTime<Utc>) -> f64 {
    instant.timestamp() as f64 + f64::from(instant.timestamp_subsec_nanos()) / 1_000_000_000.0
}

/// Normalize an angle in degrees to [0, 360)
#[inline]
pub fn normalize_degrees(degrees: f64) -> f64 {
    let normalized = degrees.rem_euclid(360.0);
    // rem_euclid of a tiny negative value rounds up to exactly 360
    if normalized >= 360.0 { 0.0 } else { normalized }
}
