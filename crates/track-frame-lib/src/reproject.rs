//! Axis-aligned reprojection of geographic points into local meters
//!
//! An [`AxisFrame`] is built once per reference axis: it computes the geodesic azimuth from the
//! first to the second endpoint, classifies it into an [`AzimuthCase`] and configures the
//! oblique Mercator projection used for every point projected through the axis.

use crate::omerc::ObliqueMercator;
use crate::{FrameError, GeoPoint, ReferenceAxis, Result, geodesic, utils};

/// Reasons why an axis (or a point) cannot be expressed in a local frame
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum UnsupportedGeometry {
    #[error("axis is aligned with a meridian (azimuth {azimuth}°)")]
    MeridianAligned { azimuth: f64 },

    #[error("axis runs along the equator (azimuth {azimuth}°)")]
    EquatorAligned { azimuth: f64 },

    #[error("axis starts at a pole (latitude {latitude}°)")]
    Polar { latitude: f64 },

    #[error("geodesic azimuth is undefined between the endpoints")]
    UndefinedAzimuth,

    #[error("projection parameters are degenerate (azimuth {azimuth}°)")]
    DegenerateProjection { azimuth: f64 },

    #[error("point {index} cannot be represented in the oblique projection")]
    OutOfDomain { index: usize },
}

/// How an axis azimuth is fed to the oblique projection
///
/// The projection is only evaluated for bearings in the north-facing half circle
/// (`azimuth <= 90 || azimuth > 270`). South-facing axes are projected with the opposite
/// bearing and both coordinates negated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AzimuthCase {
    /// Project directly with `azimuth`
    Standard { azimuth: f64 },
    /// Project with `antipodal = (azimuth - 180) mod 360`, then negate x and y
    SouthFacing { azimuth: f64, antipodal: f64 },
    /// No local frame can be built
    Unsupported(UnsupportedGeometry),
}

impl AzimuthCase {
    /// Classify an azimuth (degrees, [0, 360)) for an axis starting at `origin_latitude`
    pub fn classify(origin_latitude: f64, azimuth: f64) -> Self {
        if origin_latitude >= 90.0 || origin_latitude <= -90.0 {
            return Self::Unsupported(UnsupportedGeometry::Polar {
                latitude: origin_latitude,
            });
        }
        if azimuth == 0.0 || azimuth == 180.0 {
            return Self::Unsupported(UnsupportedGeometry::MeridianAligned { azimuth });
        }
        if origin_latitude == 0.0 && (azimuth == 90.0 || azimuth == 270.0) {
            return Self::Unsupported(UnsupportedGeometry::EquatorAligned { azimuth });
        }

        if azimuth <= 90.0 || azimuth > 270.0 {
            Self::Standard { azimuth }
        } else {
            Self::SouthFacing {
                azimuth,
                antipodal: utils::normalize_degrees(azimuth - 180.0),
            }
        }
    }

    /// Bearing handed to the projection, if any
    pub fn projection_bearing(&self) -> Option<f64> {
        match *self {
            Self::Standard { azimuth } => Some(azimuth),
            Self::SouthFacing { antipodal, .. } => Some(antipodal),
            Self::Unsupported(_) => None,
        }
    }

    /// Whether projected coordinates must be negated
    #[inline]
    pub fn is_flipped(&self) -> bool {
        matches!(self, Self::SouthFacing { .. })
    }
}

/// Local frame of a reference axis
#[derive(Debug, Clone)]
pub struct AxisFrame {
    axis: String,
    origin: GeoPoint,
    azimuth: Option<f64>,
    case: AzimuthCase,
    projection: Option<ObliqueMercator>,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl AxisFrame {
    /// Build the frame of a reference axis
    pub fn new(axis: &ReferenceAxis) -> Self {
        Self::from_endpoints(axis.name(), axis.endpoint_a(), axis.endpoint_b())
    }

    /// Build a frame anchored at `a` and oriented towards `b`
    pub fn from_endpoints(name: &str, a: GeoPoint, b: GeoPoint) -> Self {
        match geodesic::azimuth(a, b) {
            Some(azimuth) => Self::with_azimuth(name, a, azimuth),
            None => Self {
                axis: name.to_string(),
                origin: a,
                azimuth: None,
                case: AzimuthCase::Unsupported(UnsupportedGeometry::UndefinedAzimuth),
                projection: None,
            },
        }
    }

    /// Build a frame anchored at `origin` with an explicit azimuth in degrees
    pub fn with_azimuth(name: &str, origin: GeoPoint, azimuth: f64) -> Self {
        let azimuth = utils::normalize_degrees(azimuth);
        let mut case = AzimuthCase::classify(origin.latitude, azimuth);
        let projection = case.projection_bearing().and_then(|bearing| {
            let projection = ObliqueMercator::new(origin, bearing);
            if projection.is_none() {
                case = AzimuthCase::Unsupported(UnsupportedGeometry::DegenerateProjection {
                    azimuth,
                });
            }
            projection
        });

        if let AzimuthCase::Unsupported(reason) = case {
            tracing::debug!("Axis '{}' has no local frame: {}", name, reason);
        }

        Self {
            axis: name.to_string(),
            origin,
            azimuth: Some(azimuth),
            case,
            projection,
        }
    }

    #[inline]
    pub fn axis(&self) -> &str {
        &self.axis
    }

    /// Origin of the frame (the first endpoint)
    #[inline]
    pub fn origin(&self) -> GeoPoint {
        self.origin
    }

    /// Geodesic azimuth in degrees, `None` if undefined
    #[inline]
    pub fn azimuth(&self) -> Option<f64> {
        self.azimuth
    }

    #[inline]
    pub fn case(&self) -> AzimuthCase {
        self.case
    }

    #[inline]
    pub fn is_supported(&self) -> bool {
        self.projection.is_some()
    }

    /// Project a single point to local `(x, y)` meters
    pub fn project(&self, point: GeoPoint) -> Result<(f64, f64)> {
        self.project_indexed(0, point)
    }

    /// Project points to local meters, one `(x, y)` pair per point in input order
    ///
    /// Fails without producing any coordinates if the axis is unsupported or any point falls
    /// outside the projection's domain.
    pub fn reproject(&self, points: &[GeoPoint]) -> Result<(Vec<f64>, Vec<f64>)> {
        #[cfg(feature = "profiling")]
        profiling::scope!("reproject::points");

        let mut xs = Vec::with_capacity(points.len());
        let mut ys = Vec::with_capacity(points.len());
        for (index, point) in points.iter().enumerate() {
            let (x, y) = self.project_indexed(index, *point)?;
            xs.push(x);
            ys.push(y);
        }
        Ok((xs, ys))
    }

    fn project_indexed(&self, index: usize, point: GeoPoint) -> Result<(f64, f64)> {
        let projection = match (&self.projection, self.case) {
            (Some(projection), _) => projection,
            (None, AzimuthCase::Unsupported(reason)) => return Err(self.unsupported(reason)),
            (None, _) => {
                return Err(self.unsupported(UnsupportedGeometry::DegenerateProjection {
                    azimuth: self.azimuth.unwrap_or(f64::NAN),
                }));
            }
        };

        let (x, y) = projection
            .project(point)
            .ok_or_else(|| self.unsupported(UnsupportedGeometry::OutOfDomain { index }))?;

        if self.case.is_flipped() {
            Ok((-x, -y))
        } else {
            Ok((x, y))
        }
    }

    fn unsupported(&self, reason: UnsupportedGeometry) -> FrameError {
        FrameError::UnsupportedGeometry {
            axis: self.axis.clone(),
            reason,
        }
    }
}

/// Reproject points into the local frame of `axis`
///
/// Convenience wrapper that builds the [`AxisFrame`] on every call; build the frame once and
/// reuse it when projecting many point sets through the same axis.
pub fn reproject(points: &[GeoPoint], axis: &ReferenceAxis) -> Result<(Vec<f64>, Vec<f64>)> {
    AxisFrame::new(axis).reproject(points)
}
