// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Distance and bearing measurement in the section's coordinate system.
//!
//! Projected coordinates are measured in the plane. Geographic coordinates
//! (x = longitude, y = latitude, degrees) are measured on the WGS84 ellipsoid
//! with Vincenty's inverse formula, falling back to the haversine great-circle
//! distance for nearly antipodal points where Vincenty does not converge.

use nalgebra::{Point2, Vector2};
use xsection_core::{normalize_azimuth, CoordinateSystem};

/// WGS84 semi-major axis (metres)
const WGS84_A: f64 = 6_378_137.0;
/// WGS84 flattening
const WGS84_F: f64 = 1.0 / 298.257_223_563;
/// WGS84 semi-minor axis (metres)
const WGS84_B: f64 = WGS84_A * (1.0 - WGS84_F);

/// Mean radius of Earth in metres (IUGG)
pub const MEAN_EARTH_RADIUS: f64 = 6_371_008.8;

const VINCENTY_MAX_ITERATIONS: usize = 200;
const VINCENTY_CONVERGENCE: f64 = 1e-12;

/// Length and initial bearing of a geodesic
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeodesicSolution {
    /// Metres along the ellipsoid
    pub distance: f64,
    /// Degrees clockwise from north at the first point
    pub initial_bearing: f64,
}

/// Solve the inverse geodesic problem on WGS84.
///
/// Returns `None` when the iteration fails to converge.
pub fn vincenty_inverse(from: Point2<f64>, to: Point2<f64>) -> Option<GeodesicSolution> {
    let l = (to.x - from.x).to_radians();
    let u1 = ((1.0 - WGS84_F) * from.y.to_radians().tan()).atan();
    let u2 = ((1.0 - WGS84_F) * to.y.to_radians().tan()).atan();
    let (sin_u1, cos_u1) = u1.sin_cos();
    let (sin_u2, cos_u2) = u2.sin_cos();

    let mut lambda = l;
    let mut converged = false;
    let (mut sin_sigma, mut cos_sigma, mut sigma) = (0.0, 0.0, 0.0);
    let (mut cos_sq_alpha, mut cos_2sigma_m) = (0.0, 0.0);

    for _ in 0..VINCENTY_MAX_ITERATIONS {
        let (sin_lambda, cos_lambda) = lambda.sin_cos();
        sin_sigma = ((cos_u2 * sin_lambda).powi(2)
            + (cos_u1 * sin_u2 - sin_u1 * cos_u2 * cos_lambda).powi(2))
        .sqrt();
        if sin_sigma == 0.0 {
            // Coincident points
            return Some(GeodesicSolution {
                distance: 0.0,
                initial_bearing: 0.0,
            });
        }
        cos_sigma = sin_u1 * sin_u2 + cos_u1 * cos_u2 * cos_lambda;
        sigma = sin_sigma.atan2(cos_sigma);
        let sin_alpha = cos_u1 * cos_u2 * sin_lambda / sin_sigma;
        cos_sq_alpha = 1.0 - sin_alpha * sin_alpha;
        cos_2sigma_m = if cos_sq_alpha != 0.0 {
            cos_sigma - 2.0 * sin_u1 * sin_u2 / cos_sq_alpha
        } else {
            // Equatorial line
            0.0
        };
        let c = WGS84_F / 16.0 * cos_sq_alpha * (4.0 + WGS84_F * (4.0 - 3.0 * cos_sq_alpha));
        let previous = lambda;
        lambda = l
            + (1.0 - c)
                * WGS84_F
                * sin_alpha
                * (sigma
                    + c * sin_sigma
                        * (cos_2sigma_m
                            + c * cos_sigma * (-1.0 + 2.0 * cos_2sigma_m * cos_2sigma_m)));

        if lambda.abs() > std::f64::consts::PI * 2.0 {
            return None;
        }
        if (lambda - previous).abs() < VINCENTY_CONVERGENCE {
            converged = true;
            break;
        }
    }

    if !converged {
        return None;
    }

    let u_sq = cos_sq_alpha * (WGS84_A * WGS84_A - WGS84_B * WGS84_B) / (WGS84_B * WGS84_B);
    let a = 1.0 + u_sq / 16384.0 * (4096.0 + u_sq * (-768.0 + u_sq * (320.0 - 175.0 * u_sq)));
    let b = u_sq / 1024.0 * (256.0 + u_sq * (-128.0 + u_sq * (74.0 - 47.0 * u_sq)));
    let delta_sigma = b
        * sin_sigma
        * (cos_2sigma_m
            + b / 4.0
                * (cos_sigma * (-1.0 + 2.0 * cos_2sigma_m * cos_2sigma_m)
                    - b / 6.0
                        * cos_2sigma_m
                        * (-3.0 + 4.0 * sin_sigma * sin_sigma)
                        * (-3.0 + 4.0 * cos_2sigma_m * cos_2sigma_m)));

    let distance = WGS84_B * a * (sigma - delta_sigma);
    let (sin_lambda, cos_lambda) = lambda.sin_cos();
    let bearing = (cos_u2 * sin_lambda)
        .atan2(cos_u1 * sin_u2 - sin_u1 * cos_u2 * cos_lambda)
        .to_degrees();

    Some(GeodesicSolution {
        distance,
        initial_bearing: normalize_azimuth(bearing),
    })
}

/// Great-circle solution on a sphere of [`MEAN_EARTH_RADIUS`]
pub fn haversine(from: Point2<f64>, to: Point2<f64>) -> GeodesicSolution {
    let (phi1, phi2) = (from.y.to_radians(), to.y.to_radians());
    let d_phi = phi2 - phi1;
    let d_lambda = (to.x - from.x).to_radians();

    let h = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let distance = 2.0 * MEAN_EARTH_RADIUS * h.sqrt().min(1.0).asin();

    let y = d_lambda.sin() * phi2.cos();
    let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * d_lambda.cos();

    GeodesicSolution {
        distance,
        initial_bearing: normalize_azimuth(y.atan2(x).to_degrees()),
    }
}

fn geodesic(from: Point2<f64>, to: Point2<f64>) -> GeodesicSolution {
    vincenty_inverse(from, to).unwrap_or_else(|| {
        tracing::debug!(
            from_lon = from.x,
            from_lat = from.y,
            to_lon = to.x,
            to_lat = to.y,
            "Vincenty did not converge, using haversine"
        );
        haversine(from, to)
    })
}

/// Distance between two points in the linear unit of `crs`
pub fn measure(from: Point2<f64>, to: Point2<f64>, crs: CoordinateSystem) -> f64 {
    if crs.is_geographic() {
        geodesic(from, to).distance
    } else {
        (to - from).norm()
    }
}

/// Bearing from `from` to `to`, degrees clockwise from north
pub fn bearing(from: Point2<f64>, to: Point2<f64>, crs: CoordinateSystem) -> f64 {
    if crs.is_geographic() {
        geodesic(from, to).initial_bearing
    } else {
        let d = to - from;
        normalize_azimuth(d.x.atan2(d.y).to_degrees())
    }
}

/// Local planar frame for geometric predicates.
///
/// Projected input is only translated to `origin`. Geographic input is mapped
/// to metres with an equirectangular approximation around `origin`, which is
/// accurate enough for buffering and nearest-segment search at section scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalFrame {
    origin: Point2<f64>,
    /// Metres (or map units) per x unit
    kx: f64,
    /// Metres (or map units) per y unit
    ky: f64,
}

impl LocalFrame {
    pub fn new(origin: Point2<f64>, crs: CoordinateSystem) -> Self {
        if crs.is_geographic() {
            let phi = origin.y.to_radians();
            let e2 = WGS84_F * (2.0 - WGS84_F);
            let kx = std::f64::consts::PI / 180.0 * WGS84_A * phi.cos()
                / (1.0 - e2 * phi.sin().powi(2)).sqrt();
            let ky = 111_132.954 - 559.822 * (2.0 * phi).cos() + 1.175 * (4.0 * phi).cos();
            // Near the poles longitude degrees collapse; keep the frame invertible
            Self {
                origin,
                kx: kx.max(1e-6),
                ky,
            }
        } else {
            Self {
                origin,
                kx: 1.0,
                ky: 1.0,
            }
        }
    }

    #[inline]
    pub fn to_local(&self, p: Point2<f64>) -> Point2<f64> {
        Point2::new((p.x - self.origin.x) * self.kx, (p.y - self.origin.y) * self.ky)
    }

    #[inline]
    pub fn to_world(&self, p: Point2<f64>) -> Point2<f64> {
        Point2::new(p.x / self.kx + self.origin.x, p.y / self.ky + self.origin.y)
    }

    /// Smallest linear length of one world unit (metres per degree for
    /// geographic frames, 1 for projected ones)
    #[inline]
    pub fn unit_scale(&self) -> f64 {
        self.kx.min(self.ky)
    }

    /// Scale a local vector back to world units
    #[inline]
    pub fn vector_to_world(&self, v: Vector2<f64>) -> Vector2<f64> {
        Vector2::new(v.x / self.kx, v.y / self.ky)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    const GEO: CoordinateSystem = CoordinateSystem::Geographic { epsg: Some(4326) };
    const PLANAR: CoordinateSystem = CoordinateSystem::Projected { epsg: None };

    #[test]
    fn test_planar_measure_and_bearing() {
        let a = Point2::new(0.0, 0.0);
        let b = Point2::new(3.0, 4.0);
        assert_relative_eq!(measure(a, b, PLANAR), 5.0);
        assert_relative_eq!(bearing(a, Point2::new(1.0, 0.0), PLANAR), 90.0);
        assert_relative_eq!(bearing(a, Point2::new(0.0, -1.0), PLANAR), 180.0);
        assert_relative_eq!(bearing(a, Point2::new(-1.0, 0.0), PLANAR), 270.0);
    }

    #[test]
    fn test_one_degree_of_meridian() {
        // 0°-1° latitude along a meridian is ~110.574 km on WGS84
        let d = measure(Point2::new(0.0, 0.0), Point2::new(0.0, 1.0), GEO);
        assert_abs_diff_eq!(d, 110_574.4, epsilon = 1.0);
        assert_abs_diff_eq!(bearing(Point2::new(0.0, 0.0), Point2::new(0.0, 1.0), GEO), 0.0);
    }

    #[test]
    fn test_equator_degree() {
        // One degree of longitude on the equator is a * pi / 180
        let d = measure(Point2::new(10.0, 0.0), Point2::new(11.0, 0.0), GEO);
        assert_abs_diff_eq!(d, 111_319.49, epsilon = 0.5);
    }

    #[test]
    fn test_haversine_close_to_vincenty() {
        let a = Point2::new(-0.1278, 51.5074);
        let b = Point2::new(2.3522, 48.8566);
        let v = vincenty_inverse(a, b).unwrap();
        let h = haversine(a, b);
        assert!((v.distance - h.distance).abs() / v.distance < 0.005);
    }

    #[test]
    fn test_local_frame_round_trip() {
        let frame = LocalFrame::new(Point2::new(7.5, 46.0), GEO);
        let p = Point2::new(7.51, 46.02);
        let back = frame.to_world(frame.to_local(p));
        assert_abs_diff_eq!(back.x, p.x, epsilon = 1e-12);
        assert_abs_diff_eq!(back.y, p.y, epsilon = 1e-12);
    }
}
