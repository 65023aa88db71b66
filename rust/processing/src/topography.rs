// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Master topographic profile sampling.
//!
//! The section is densified at the raster's native resolution (or a finer
//! requested interval) and the raster is sampled at every vertex. Samples that
//! hit no-data are set to 0.0 and counted; the count is surfaced as a warning
//! diagnostic rather than failing the request.

use serde::{Deserialize, Serialize};
use xsection_core::{
    Diagnostic, ElevationRaster, Error, ProfilePoint, Result, Stage, TopographicProfile,
};
use xsection_geometry::{densify, measure, PreparedSection};

/// Elevation assigned to samples where the raster has no data
pub const NODATA_ELEVATION: f64 = 0.0;

/// Sampling options for the master profile
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TopographyOptions {
    /// Requested sample spacing; coarser values are clamped to the raster
    /// resolution
    pub interval: Option<f64>,
    /// Raster band, 1-based
    pub band: usize,
}

impl Default for TopographyOptions {
    fn default() -> Self {
        Self {
            interval: None,
            band: 1,
        }
    }
}

/// Master profile plus the diagnostics raised while sampling it
#[derive(Debug, Clone)]
pub struct SampledTopography {
    pub profile: TopographicProfile,
    pub diagnostics: Vec<Diagnostic>,
}

/// Sample the master topographic profile along `section`.
///
/// Fails when the raster is unusable (bad resolution or band) or covers none
/// of the section; either aborts the whole request.
pub fn sample_profile(
    section: &PreparedSection,
    raster: &dyn ElevationRaster,
    options: &TopographyOptions,
) -> Result<SampledTopography> {
    let band_count = raster.band_count();
    if options.band == 0 || options.band > band_count {
        return Err(Error::DataUnavailable(format!(
            "raster band {} requested, raster has {}",
            options.band, band_count
        )));
    }

    let interval = sample_interval(section, raster, options)?;
    let vertices = densify(section.vertices(), interval, section.crs())?;

    let mut points = Vec::with_capacity(vertices.len());
    let mut nodata_count = 0usize;
    let mut distance = 0.0;
    for (i, p) in vertices.iter().enumerate() {
        if i > 0 {
            distance += measure(vertices[i - 1], *p, section.crs());
        }
        let elevation = match raster.sample(p.x, p.y, options.band) {
            Some(z) => z,
            None => {
                nodata_count += 1;
                NODATA_ELEVATION
            }
        };
        points.push(ProfilePoint::new(distance, elevation));
    }

    if nodata_count == points.len() {
        return Err(Error::DataUnavailable(
            "elevation raster does not cover the section".to_string(),
        ));
    }

    let mut diagnostics = Vec::new();
    if nodata_count > 0 {
        tracing::warn!(
            nodata = nodata_count,
            samples = points.len(),
            "Raster no-data along section, elevations set to {}",
            NODATA_ELEVATION
        );
        diagnostics.push(Diagnostic::warning(
            Stage::Topography,
            format!(
                "{} of {} samples had no raster data; elevation set to {}",
                nodata_count,
                points.len(),
                NODATA_ELEVATION
            ),
        ));
    }

    tracing::debug!(
        samples = points.len(),
        interval,
        length = distance,
        "Sampled topographic profile"
    );

    Ok(SampledTopography {
        profile: TopographicProfile::new(points, interval, nodata_count),
        diagnostics,
    })
}

/// Sample spacing in the section's linear unit
fn sample_interval(
    section: &PreparedSection,
    raster: &dyn ElevationRaster,
    options: &TopographyOptions,
) -> Result<f64> {
    let resolution = raster.resolution();
    if !(resolution > 0.0) || !resolution.is_finite() {
        return Err(Error::DataUnavailable(format!(
            "raster resolution must be positive, got {}",
            resolution
        )));
    }
    // Raster pixels are in map units, densification in linear units
    let native = resolution * section.frame().unit_scale();

    match options.interval {
        Some(requested) if !(requested > 0.0) || !requested.is_finite() => Err(
            Error::InvalidParameter(format!("sample interval must be positive, got {}", requested)),
        ),
        Some(requested) => Ok(requested.min(native)),
        None => Ok(native),
    }
}

/// Master-profile elevation at `distance` (linear, clamped at the ends)
#[inline]
pub fn interpolate_elevation(profile: &TopographicProfile, distance: f64) -> Option<f64> {
    profile.interpolate(distance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use xsection_core::{CoordinateSystem, GridRaster, Point2, SectionLine};

    fn section() -> PreparedSection {
        let line = SectionLine::new(
            vec![Point2::new(0.0, 50.0), Point2::new(100.0, 50.0)],
            CoordinateSystem::default(),
        )
        .unwrap();
        PreparedSection::new(&line)
    }

    /// 10 m grid, elevation = x / 10 (cell centres), origin (0, 100)
    fn ramp() -> GridRaster {
        GridRaster::from_fn(Point2::new(0.0, 100.0), 10.0, 10, 10, |x, _| x / 10.0).unwrap()
    }

    #[test]
    fn test_samples_at_native_resolution() {
        let sampled = sample_profile(&section(), &ramp(), &TopographyOptions::default()).unwrap();
        let points = &sampled.profile.points;
        assert_eq!(points.len(), 11);
        assert_relative_eq!(points[3].distance, 30.0, epsilon = 1e-9);
        assert_relative_eq!(points[3].elevation, 3.5);
        assert_relative_eq!(sampled.profile.sample_interval, 10.0);
        // x = 100 is just off the grid
        assert_eq!(sampled.profile.nodata_count, 1);
        assert_eq!(points[10].elevation, NODATA_ELEVATION);
        assert_eq!(sampled.diagnostics.len(), 1);
    }

    #[test]
    fn test_finer_requested_interval() {
        let options = TopographyOptions {
            interval: Some(2.5),
            band: 1,
        };
        let sampled = sample_profile(&section(), &ramp(), &options).unwrap();
        assert_eq!(sampled.profile.points.len(), 41);
        for w in sampled.profile.points.windows(2) {
            assert!(w[1].distance > w[0].distance);
        }

        // Coarser than native is clamped to native
        let coarse = TopographyOptions {
            interval: Some(50.0),
            band: 1,
        };
        let sampled = sample_profile(&section(), &ramp(), &coarse).unwrap();
        assert_relative_eq!(sampled.profile.sample_interval, 10.0);
    }

    #[test]
    fn test_raster_outside_section_is_fatal() {
        let far = GridRaster::from_fn(Point2::new(5000.0, 5000.0), 10.0, 2, 2, |_, _| 1.0).unwrap();
        let err = sample_profile(&section(), &far, &TopographyOptions::default()).unwrap_err();
        assert!(matches!(err, Error::DataUnavailable(_)));
    }

    #[test]
    fn test_invalid_band_and_interval() {
        let options = TopographyOptions {
            interval: None,
            band: 2,
        };
        assert!(sample_profile(&section(), &ramp(), &options).is_err());

        let options = TopographyOptions {
            interval: Some(-1.0),
            band: 1,
        };
        assert!(matches!(
            sample_profile(&section(), &ramp(), &options),
            Err(Error::InvalidParameter(_))
        ));
    }
}
