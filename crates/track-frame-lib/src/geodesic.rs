//! WGS84 ellipsoid constants and the geodesic azimuth between two points

use crate::{GeoPoint, utils};
use geo::{Bearing, Geodesic};

/// WGS84 semi-major axis in meters
pub const SEMI_MAJOR_AXIS: f64 = 6_378_137.0;

/// WGS84 flattening
pub const FLATTENING: f64 = 1.0 / 298.257_223_563;

/// WGS84 first eccentricity squared (2f - f²)
pub const ECCENTRICITY_SQ: f64 = 2.0 * FLATTENING - FLATTENING * FLATTENING;

/// Forward geodesic azimuth from `from` to `to` on the WGS84 ellipsoid
///
/// Solved with Karney's inverse geodesic through `geo`. The result is in degrees, 0° = north,
/// clockwise, in [0, 360). Returns `None` for coincident points, where the azimuth is undefined.
///
/// Points on the same meridian give exactly 0° or 180°, and points on the equator exactly 90°
/// or 270°.
pub fn azimuth(from: GeoPoint, to: GeoPoint) -> Option<f64> {
    if from == to {
        return None;
    }
    let bearing = Geodesic.bearing(from.into(), to.into());
    if !bearing.is_finite() {
        tracing::debug!(
            "No geodesic azimuth between ({}, {}) and ({}, {})",
            from.latitude,
            from.longitude,
            to.latitude,
            to.longitude
        );
        return None;
    }
    Some(utils::normalize_degrees(bearing))
}
