//! Hotine oblique Mercator projection on the WGS84 ellipsoid
//!
//! The projection is centred on a point with a given central-line azimuth and no extra
//! rectification (γ = 0, k₀ = 1). Coordinates are offset so that the centre maps to (0, 0):
//! `y` runs along the central line and `x` across it, both in meters.
//!
//! The formulation follows the common "alpha + lonc" parameterization (EPSG method 9815,
//! variant B). It is only evaluated for bearings in the north-facing half circle; see
//! [`crate::AzimuthCase`] for how other bearings are handled.

use crate::GeoPoint;
use crate::geodesic::{ECCENTRICITY_SQ, SEMI_MAJOR_AXIS};
use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

const EPS: f64 = 1e-10;
const TOL: f64 = 1e-7;

/// A configured oblique Mercator projection
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ObliqueMercator {
    /// B: constant of the conformal sphere
    b: f64,
    /// A: radius of the aposphere, scaled to meters
    a: f64,
    /// E: constant of the isometric latitude mapping
    e: f64,
    /// Longitude of the natural origin (radians)
    lam0: f64,
    sin_gamma0: f64,
    cos_gamma0: f64,
    /// A / B
    a_over_b: f64,
    /// Offset of the projection centre along the central line
    u0: f64,
    v_pole_n: f64,
    v_pole_s: f64,
}

impl ObliqueMercator {
    /// Configure a projection centred on `center` with central-line azimuth `azimuth_deg`
    ///
    /// Returns `None` when the parameters do not define a projection (centre at a pole, or a
    /// central line running exactly along the equator or a meridian through the centre).
    pub fn new(center: GeoPoint, azimuth_deg: f64) -> Option<Self> {
        let phi0 = center.latitude.to_radians();
        let lamc = center.longitude.to_radians();
        let alpha_c = azimuth_deg.to_radians();

        if (phi0.abs() - FRAC_PI_2).abs() <= TOL || alpha_c.sin().abs() <= TOL {
            return None;
        }

        let ecc = ECCENTRICITY_SQ.sqrt();
        let one_es = 1.0 - ECCENTRICITY_SQ;
        let com = one_es.sqrt();

        let (b, a, e_const, d, f) = if phi0.abs() > EPS {
            let (sin_phi0, cos_phi0) = phi0.sin_cos();
            let con = 1.0 - ECCENTRICITY_SQ * sin_phi0 * sin_phi0;
            let cos_sq = cos_phi0 * cos_phi0;
            let b = (1.0 + ECCENTRICITY_SQ * cos_sq * cos_sq / one_es).sqrt();
            let a = b * com / con;
            let d = b * com / (cos_phi0 * con.sqrt());
            let mut f = d * d - 1.0;
            if f <= 0.0 {
                f = 0.0;
            } else {
                f = f.sqrt();
                if phi0 < 0.0 {
                    f = -f;
                }
            }
            f += d;
            let e_const = f * tsfn(phi0, sin_phi0, ecc).powf(b);
            (b, a, e_const, d, f)
        } else {
            (1.0 / com, 1.0, 1.0, 1.0, 1.0)
        };

        let sin_gamma0 = alpha_c.sin() / d;
        if sin_gamma0.abs() > 1.0 {
            return None;
        }
        let gamma0 = sin_gamma0.asin();
        let cos_gamma0 = gamma0.cos();
        if cos_gamma0.abs() <= TOL {
            return None; // central line along the equator
        }

        let lam0_arg = 0.5 * (f - 1.0 / f) * gamma0.tan();
        if lam0_arg.abs() > 1.0 {
            return None;
        }
        let lam0 = lamc - lam0_arg.asin() / b;

        let a_over_b = a / b;
        let mut u0 = (a_over_b * ((d * d - 1.0).max(0.0).sqrt() / alpha_c.cos()).atan()).abs();
        if phi0 < 0.0 {
            u0 = -u0;
        }

        let half_gamma0 = 0.5 * gamma0;
        let v_pole_n = a_over_b * (FRAC_PI_4 - half_gamma0).tan().ln();
        let v_pole_s = a_over_b * (FRAC_PI_4 + half_gamma0).tan().ln();

        Some(Self {
            b,
            a,
            e: e_const,
            lam0,
            sin_gamma0,
            cos_gamma0,
            a_over_b,
            u0,
            v_pole_n,
            v_pole_s,
        })
    }

    /// Project a point to `(x, y)` meters
    ///
    /// Returns `None` for points the projection cannot represent (its own poles, 90° away
    /// from the central line).
    pub fn project(&self, point: GeoPoint) -> Option<(f64, f64)> {
        let phi = point.latitude.to_radians();
        let lam = wrap_longitude(point.longitude.to_radians() - self.lam0);

        let (u, v) = if (phi.abs() - FRAC_PI_2).abs() > EPS {
            let ecc = ECCENTRICITY_SQ.sqrt();
            let w = self.e / tsfn(phi, phi.sin(), ecc).powf(self.b);
            let inv_w = 1.0 / w;
            let s = 0.5 * (w - inv_w);
            let t = 0.5 * (w + inv_w);
            let (sin_blam, cos_blam) = (self.b * lam).sin_cos();
            let u_sphere = (s * self.sin_gamma0 - sin_blam * self.cos_gamma0) / t;
            if (u_sphere.abs() - 1.0).abs() < EPS {
                return None;
            }
            let v = 0.5 * self.a_over_b * ((1.0 - u_sphere) / (1.0 + u_sphere)).ln();
            let u = if cos_blam.abs() < TOL {
                self.a * lam
            } else {
                self.a_over_b
                    * (s * self.cos_gamma0 + sin_blam * self.sin_gamma0).atan2(cos_blam)
            };
            (u, v)
        } else {
            let v = if phi > 0.0 {
                self.v_pole_n
            } else {
                self.v_pole_s
            };
            (self.a_over_b * phi, v)
        };

        if !u.is_finite() || !v.is_finite() {
            return None;
        }

        let x = v * SEMI_MAJOR_AXIS;
        let y = (u - self.u0) * SEMI_MAJOR_AXIS;
        Some((x, y))
    }
}

/// Isometric latitude helper: tan(π/4 - φ/2) / ((1 - e·sinφ) / (1 + e·sinφ))^(e/2)
#[inline]
fn tsfn(phi: f64, sin_phi: f64, e: f64) -> f64 {
    let e_sin = e * sin_phi;
    (0.5 * (FRAC_PI_2 - phi)).tan() / ((1.0 - e_sin) / (1.0 + e_sin)).powf(0.5 * e)
}

/// Wrap a longitude difference into [-π, π]
#[inline]
fn wrap_longitude(lam: f64) -> f64 {
    if lam.abs() <= PI {
        lam
    } else {
        lam - 2.0 * PI * ((lam + PI) / (2.0 * PI)).floor()
    }
}
