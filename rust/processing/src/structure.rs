// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Projection of dip/strike measurements onto the section plane.

use serde::{Deserialize, Serialize};
use xsection_core::{
    parse_azimuth, parse_dip, Diagnostic, Error, Result, Stage, StructureMeasurement,
    StructurePoint, TopographicProfile,
};
use xsection_geometry::{BoundingBox, PreparedSection, SpatialIndex};

use crate::topography::NODATA_ELEVATION;

/// Below this `|cos(strike - azimuth)|` the strike is treated as perpendicular
const PERPENDICULAR_EPSILON: f64 = 1e-10;

/// Section buffer shared by structure and drillhole filtering
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BufferOptions {
    /// Half-width in linear units (metres for geographic sections)
    pub width: f64,
    /// Chords per quarter circle at the buffer caps
    pub segments: usize,
}

impl Default for BufferOptions {
    fn default() -> Self {
        Self {
            width: 100.0,
            segments: 8,
        }
    }
}

/// Boundary-inclusive buffer test: `|offset| == width` is kept
#[inline]
pub fn within_buffer(offset: f64, width: f64) -> bool {
    offset.abs() <= width
}

/// Dip seen in a vertical section at `section_azimuth`, degrees.
///
/// `atan(tan(dip) * |cos(strike - section_azimuth)|)`; 0 when the strike is
/// perpendicular to the section.
pub fn apparent_dip(true_dip: f64, strike: f64, section_azimuth: f64) -> f64 {
    let factor = (strike - section_azimuth).to_radians().cos().abs();
    if factor < PERPENDICULAR_EPSILON {
        return 0.0;
    }
    if true_dip >= 90.0 {
        return 90.0;
    }
    (true_dip.to_radians().tan() * factor).atan().to_degrees()
}

/// Structures retained inside the buffer, with their diagnostics
#[derive(Debug, Clone, Default)]
pub struct StructureProjection {
    /// Sorted by distance along the section
    pub measurements: Vec<StructureMeasurement>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Project every structure point within the buffer onto the section.
///
/// Candidates come from a grid index queried with the section's bounds
/// grown by the buffer width; the precise test is the inclusive
/// perpendicular-offset rule.
pub fn project_structures(
    section: &PreparedSection,
    topography: &TopographicProfile,
    points: &[StructurePoint],
    options: &BufferOptions,
) -> Result<StructureProjection> {
    if !(options.width > 0.0) || !options.width.is_finite() {
        return Err(Error::InvalidParameter(format!(
            "buffer width must be positive, got {}",
            options.width
        )));
    }

    let mut projection = StructureProjection::default();
    let Some(extent) = BoundingBox::from_points(section.vertices()) else {
        return Ok(projection);
    };
    if points.is_empty() {
        return Ok(projection);
    }

    let margin = options.width * (1.0 + 1e-9) / section.frame().unit_scale();
    let bounds = extent.inflate(margin);

    let index = SpatialIndex::build(points.iter().enumerate().map(|(i, p)| (i, p.location)));
    let candidates = index.query_bbox(&bounds);
    let azimuth = section.azimuth();

    let mut invalid = 0usize;
    for i in candidates {
        let point = &points[i];
        let position = section.locate(point.location);
        if !within_buffer(position.offset, options.width) {
            continue;
        }

        let oriented = parse_azimuth(&point.strike)
            .and_then(|strike| parse_dip(&point.dip).map(|dip| (strike, dip)));
        let (strike, dip) = match oriented {
            Ok(pair) => pair,
            Err(err) => {
                invalid += 1;
                tracing::warn!(feature = point.id, error = %err, "Skipping structure with bad orientation");
                projection.diagnostics.push(
                    Diagnostic::warning(Stage::Structure, err.to_string())
                        .with_subject(point.id.to_string()),
                );
                continue;
            }
        };

        projection.measurements.push(StructureMeasurement {
            feature_id: point.id,
            distance: position.distance,
            elevation: topography
                .interpolate(position.distance)
                .unwrap_or(NODATA_ELEVATION),
            offset: position.offset,
            apparent_dip: apparent_dip(dip.angle, strike, azimuth),
            dip: dip.angle,
            strike,
            dip_direction: dip.direction,
            attributes: point.attributes.clone(),
        });
    }

    projection
        .measurements
        .sort_by(|a, b| a.distance.total_cmp(&b.distance));

    let excluded = points.len() - projection.measurements.len() - invalid;
    if excluded > 0 {
        projection.diagnostics.push(Diagnostic::notice(
            Stage::Structure,
            format!(
                "{} structure point(s) outside the {} buffer",
                excluded, options.width
            ),
        ));
    }

    tracing::debug!(
        total = points.len(),
        retained = projection.measurements.len(),
        excluded,
        invalid,
        "Projected structures"
    );
    Ok(projection)
}
