//! Geographic and local sample types shared by the slicer and the reprojector

use serde::Serialize;

/// A WGS84 position in degrees
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeoPoint {
    /// Latitude in degrees, valid range [-90, 90]
    pub latitude: f64,
    /// Longitude in degrees, valid range [-180, 180]
    pub longitude: f64,
}

impl GeoPoint {
    /// Create a point without range checks
    #[inline]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Create a point, returning `None` if either coordinate is out of range or not finite
    pub fn try_new(latitude: f64, longitude: f64) -> Option<Self> {
        let point = Self::new(latitude, longitude);
        point.is_valid().then_some(point)
    }

    /// Check the latitude/longitude range invariant
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

// geo (and therefore gpx) stores longitude in x and latitude in y
impl From<geo::Point<f64>> for GeoPoint {
    #[inline]
    fn from(point: geo::Point<f64>) -> Self {
        Self::new(point.y(), point.x())
    }
}

impl From<GeoPoint> for geo::Point<f64> {
    #[inline]
    fn from(point: GeoPoint) -> Self {
        geo::Point::new(point.longitude, point.latitude)
    }
}

/// A timestamped track point
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sample {
    /// Position of the sample
    pub point: GeoPoint,
    /// Absolute time as UTC epoch seconds (sub-second precision)
    pub timestamp: f64,
    /// Index of the point within its source segment
    pub index: usize,
}

impl Sample {
    pub const fn new(point: GeoPoint, timestamp: f64, index: usize) -> Self {
        Self {
            point,
            timestamp,
            index,
        }
    }
}

/// A sample expressed in an axis-aligned local frame
///
/// Serialized field order is the column order of the output tables.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct LocalSample {
    /// Meters across the axis (positive to the right of the axis direction)
    pub x: f64,
    /// Meters along the axis (positive towards the second endpoint)
    pub y: f64,
    /// Seconds since the event start
    pub t: f64,
}
