//! Temporal slicing of track segments
//!
//! A slice keeps the samples whose timestamp lies in a closed window and re-expresses their time
//! relative to the window start. Sample order is never changed, so tracks with out-of-order
//! timestamps come out exactly as recorded.

use crate::{EventInterval, GeoPoint, TrackSegment};

/// Samples of one segment inside a time window
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TimeSlice {
    /// Positions of the retained samples
    pub points: Vec<GeoPoint>,
    /// Seconds since the window start, parallel to `points`
    pub times: Vec<f64>,
}

impl TimeSlice {
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Keep the samples with `start <= timestamp <= end` (epoch seconds)
///
/// Timestamps keep their sub-second part, so a sample half a second after `end` is outside the
/// window even though it falls in the same whole second.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn slice(segment: &TrackSegment, start: f64, end: f64) -> TimeSlice {
    let mut slice = TimeSlice::default();
    for sample in segment.samples() {
        if start <= sample.timestamp && sample.timestamp <= end {
            slice.points.push(sample.point);
            slice.times.push(sample.timestamp - start);
        }
    }
    slice
}

/// Slice a segment to an event window
#[inline]
pub fn slice_event(segment: &TrackSegment, interval: &EventInterval) -> TimeSlice {
    slice(segment, interval.start_seconds(), interval.end_seconds())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Sample;
    use chrono::{TimeZone, Utc};

    fn create_test_segment(timestamps: &[f64]) -> TrackSegment {
        let samples = timestamps
            .iter()
            .enumerate()
            .map(|(i, &t)| Sample::new(GeoPoint::new(45.0 + i as f64 * 1e-4, 10.0), t, i))
            .collect();
        TrackSegment::new("test", samples)
    }

    #[test]
    fn test_slice_keeps_inside_samples() {
        let segment = create_test_segment(&[-10.0, 5.0, 50.0]);
        let slice = slice(&segment, 0.0, 30.0);
        assert_eq!(slice.times, vec![5.0]);
        assert_eq!(slice.points, vec![GeoPoint::new(45.0001, 10.0)]);
    }

    #[test]
    fn test_slice_bounds_are_inclusive() {
        let segment = create_test_segment(&[99.0, 100.0, 150.0, 200.0, 201.0]);
        let slice = slice(&segment, 100.0, 200.0);
        assert_eq!(slice.times, vec![0.0, 50.0, 100.0]);
    }

    #[test]
    fn test_slice_compares_fractional_seconds() {
        let segment = create_test_segment(&[-0.5, 0.25, 29.5, 30.0, 30.5]);
        let slice = slice(&segment, 0.0, 30.0);
        assert_eq!(slice.times, vec![0.25, 29.5, 30.0]);
    }

    #[test]
    fn test_slice_preserves_order_and_ties() {
        let segment = create_test_segment(&[120.0, 110.0, 110.0, 130.0, 105.0]);
        let slice = slice(&segment, 100.0, 125.0);
        assert_eq!(slice.times, vec![20.0, 10.0, 10.0, 5.0]);
        // Tied samples keep their recording order
        assert_eq!(slice.points[1], GeoPoint::new(45.0001, 10.0));
        assert_eq!(slice.points[2], GeoPoint::new(45.0002, 10.0));
    }

    #[test]
    fn test_slice_without_overlap_is_empty() {
        let segment = create_test_segment(&[0.0, 1.0, 2.0]);
        let slice = slice(&segment, 10.0, 20.0);
        assert!(slice.is_empty());
        assert!(slice.times.is_empty());

        let empty = create_test_segment(&[]);
        assert!(super::slice(&empty, 0.0, 1.0).is_empty());
    }

    #[test]
    fn test_slice_event() {
        let start = Utc.with_ymd_and_hms(2020, 6, 1, 10, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2020, 6, 1, 10, 0, 30).unwrap();
        let base = crate::utils::to_epoch_seconds(&start);
        let segment = create_test_segment(&[base - 10.0, base + 5.0, base + 50.0]);

        let slice = slice_event(&segment, &EventInterval::new(start, end));
        assert_eq!(slice.len(), 1);
        assert_eq!(slice.times, vec![5.0]);
    }
}
