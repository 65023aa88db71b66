// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Drillhole desurvey and projection onto the section.
//!
//! Desurvey uses the tangential method: each survey station's orientation
//! holds from its depth to the next station, sub-divided into steps no longer
//! than the configured step. Inclination is measured from horizontal
//! (0° horizontal, -90° straight down):
//!
//! ```text
//! standard = 90° + inclination
//! dz = -L * cos(standard)
//! dx =  L * sin(standard) * sin(azimuth)
//! dy =  L * sin(standard) * cos(azimuth)
//! ```
//!
//! The first station's orientation applies from the collar; the last one is
//! extrapolated to the end of hole. A hole without surveys is vertical.
//!
//! Step offsets are metric. On geographic sections the hole is desurveyed in
//! the section's local frame and mapped back to longitude/latitude.

use nalgebra::{Point2, Point3, Vector3};
use serde::{Deserialize, Serialize};
use xsection_core::{
    Diagnostic, Drillhole, DrillholeSectionPoint, DrillholeTrace, DrillholeTrajectoryPoint, Error,
    IntervalRecord, IntervalSegment, Result, Stage, SurveyStation,
};
use xsection_geometry::PreparedSection;

use crate::structure::within_buffer;

/// Default desurvey step, in depth units
pub const DEFAULT_DESURVEY_STEP: f64 = 1.0;

/// Orientation used for holes without survey data
const VERTICAL: SurveyStation = SurveyStation::new(0.0, 0.0, -90.0);

/// Drillhole stage options
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DrillholeOptions {
    /// Inclusive half-width of the section buffer
    pub buffer_width: f64,
    /// Maximum desurvey step length
    pub step: f64,
    /// Cap on the desurveyed depth of every hole
    pub max_depth: Option<f64>,
}

impl Default for DrillholeOptions {
    fn default() -> Self {
        Self {
            buffer_width: 100.0,
            step: DEFAULT_DESURVEY_STEP,
            max_depth: None,
        }
    }
}

impl DrillholeOptions {
    fn validate(&self) -> Result<()> {
        if !(self.buffer_width > 0.0) || !self.buffer_width.is_finite() {
            return Err(Error::InvalidParameter(format!(
                "buffer width must be positive, got {}",
                self.buffer_width
            )));
        }
        if !(self.step > 0.0) || !self.step.is_finite() {
            return Err(Error::InvalidParameter(format!(
                "desurvey step must be positive, got {}",
                self.step
            )));
        }
        if let Some(max) = self.max_depth {
            if !(max >= 0.0) {
                return Err(Error::InvalidParameter(format!(
                    "max depth must not be negative, got {}",
                    max
                )));
            }
        }
        Ok(())
    }
}

/// Unit direction of travel for a survey orientation
fn direction(station: &SurveyStation) -> Vector3<f64> {
    let standard = (90.0 + station.inclination).to_radians();
    let azimuth = station.azimuth.to_radians();
    let horizontal = standard.sin();
    Vector3::new(
        horizontal * azimuth.sin(),
        horizontal * azimuth.cos(),
        -standard.cos(),
    )
}

/// Reconstruct the 3D trajectory from `collar` down to `total_depth`.
///
/// `collar` x/y must be in the same linear unit as depth. Returns points
/// keyed by depth, starting with the collar at depth 0.
pub fn desurvey(
    collar: Point3<f64>,
    surveys: &[SurveyStation],
    total_depth: f64,
    step: f64,
) -> Result<Vec<DrillholeTrajectoryPoint>> {
    if !(step > 0.0) || !step.is_finite() {
        return Err(Error::InvalidParameter(format!(
            "desurvey step must be positive, got {}",
            step
        )));
    }
    if !(total_depth >= 0.0) || !total_depth.is_finite() {
        return Err(Error::InvalidParameter(format!(
            "total depth must be finite and not negative, got {}",
            total_depth
        )));
    }
    if let Some(bad) = surveys.iter().find(|s| {
        !(s.depth >= 0.0) || !s.depth.is_finite() || !s.azimuth.is_finite() || !s.inclination.is_finite()
    }) {
        return Err(Error::DataUnavailable(format!(
            "invalid survey station at depth {}",
            bad.depth
        )));
    }

    let mut stations = surveys.to_vec();
    stations.sort_by(|a, b| a.depth.total_cmp(&b.depth));
    if stations.is_empty() {
        stations.push(VERTICAL);
    }

    let mut points = Vec::with_capacity((total_depth / step).ceil() as usize + 2);
    let mut position = collar;
    let mut depth = 0.0;
    points.push(DrillholeTrajectoryPoint {
        depth,
        position,
    });

    for (i, station) in stations.iter().enumerate() {
        let until = stations
            .get(i + 1)
            .map_or(total_depth, |next| next.depth)
            .min(total_depth);
        if until <= depth {
            continue;
        }

        let heading = direction(station);
        let span = until - depth;
        let pieces = (span / step).ceil().max(1.0) as usize;
        let length = span / pieces as f64;
        for k in 1..=pieces {
            position += heading * length;
            let d = if k == pieces {
                until
            } else {
                depth + k as f64 * length
            };
            points.push(DrillholeTrajectoryPoint { depth: d, position });
        }
        depth = until;
    }

    Ok(points)
}

/// Desurvey `hole` with positions in the section's world coordinates
fn desurvey_for_section(
    section: &PreparedSection,
    hole: &Drillhole,
    total_depth: f64,
    step: f64,
) -> Result<Vec<DrillholeTrajectoryPoint>> {
    if !section.crs().is_geographic() {
        return desurvey(hole.collar, &hole.surveys, total_depth, step);
    }

    let frame = section.frame();
    let collar = frame.to_local(Point2::new(hole.collar.x, hole.collar.y));
    let mut trajectory = desurvey(
        Point3::new(collar.x, collar.y, hole.collar.z),
        &hole.surveys,
        total_depth,
        step,
    )?;
    for point in &mut trajectory {
        let world = frame.to_world(Point2::new(point.position.x, point.position.y));
        point.position.x = world.x;
        point.position.y = world.y;
    }
    Ok(trajectory)
}

/// Trajectory position at `depth`, linearly interpolated between points
pub fn position_at(trajectory: &[DrillholeTrajectoryPoint], depth: f64) -> Option<Point3<f64>> {
    let first = trajectory.first()?;
    let last = trajectory.last()?;
    if depth < first.depth || depth > last.depth {
        return None;
    }
    let idx = trajectory.partition_point(|p| p.depth <= depth);
    if idx == 0 {
        return Some(first.position);
    }
    let a = &trajectory[idx - 1];
    if a.depth == depth || idx == trajectory.len() {
        return Some(a.position);
    }
    let b = &trajectory[idx];
    let t = (depth - a.depth) / (b.depth - a.depth);
    Some(a.position + (b.position - a.position) * t)
}

/// Drillhole layers for the bundle
#[derive(Debug, Clone, Default)]
pub struct DrillholeProjection {
    pub traces: Vec<DrillholeTrace>,
    pub intervals: Vec<IntervalSegment>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Desurvey and project every hole.
///
/// A hole whose collar lies outside the buffer is dropped with a notice, even
/// if deeper parts would pass. Retained trajectory points are filtered one by
/// one with the same inclusive rule, so a trace may start or stop mid-hole.
pub fn project_drillholes(
    section: &PreparedSection,
    holes: &[Drillhole],
    options: &DrillholeOptions,
) -> Result<DrillholeProjection> {
    options.validate()?;

    let mut projection = DrillholeProjection::default();
    for hole in holes {
        project_hole(section, hole, options, &mut projection);
    }

    tracing::debug!(
        holes = holes.len(),
        traces = projection.traces.len(),
        intervals = projection.intervals.len(),
        "Projected drillholes"
    );
    Ok(projection)
}

fn project_hole(
    section: &PreparedSection,
    hole: &Drillhole,
    options: &DrillholeOptions,
    out: &mut DrillholeProjection,
) {
    let width = options.buffer_width;
    let collar = section.locate(Point2::new(hole.collar.x, hole.collar.y));
    if !within_buffer(collar.offset, width) {
        out.diagnostics.push(
            Diagnostic::notice(
                Stage::Drillhole,
                format!(
                    "collar is {:.2} from the section, outside the {} buffer",
                    collar.offset.abs(),
                    width
                ),
            )
            .with_subject(hole.hole_id.as_str()),
        );
        return;
    }

    let depth = match options.max_depth {
        Some(max) => hole.effective_depth().min(max),
        None => hole.effective_depth(),
    };
    let trajectory = match desurvey_for_section(section, hole, depth, options.step) {
        Ok(trajectory) => trajectory,
        Err(err) => {
            tracing::warn!(hole = %hole.hole_id, error = %err, "Desurvey failed, skipping hole");
            out.diagnostics.push(
                Diagnostic::error(Stage::Drillhole, err.to_string())
                    .with_subject(hole.hole_id.as_str()),
            );
            return;
        }
    };

    let points: Vec<DrillholeSectionPoint> = trajectory
        .iter()
        .filter_map(|p| project_point(section, p.depth, p.position, width))
        .collect();
    out.traces.push(DrillholeTrace {
        hole_id: hole.hole_id.clone(),
        collar_offset: collar.offset,
        points,
    });

    for record in &hole.intervals {
        let skipped = match interval_segment(section, hole, record, &trajectory, width) {
            Ok(IntervalProjection::Segment(segment)) => {
                out.intervals.push(segment);
                continue;
            }
            Ok(IntervalProjection::BeyondTrajectory { end }) => format!(
                "interval {}-{} starts below the desurveyed depth {}",
                record.from_depth, record.to_depth, end
            ),
            Ok(IntervalProjection::OutsideBuffer) => format!(
                "interval {}-{} has no points inside the buffer",
                record.from_depth, record.to_depth
            ),
            Err(err) => {
                out.diagnostics.push(
                    Diagnostic::error(Stage::Drillhole, err.to_string())
                        .with_subject(hole.hole_id.as_str()),
                );
                continue;
            }
        };
        out.diagnostics.push(
            Diagnostic::notice(Stage::Drillhole, skipped).with_subject(hole.hole_id.as_str()),
        );
    }
}

fn project_point(
    section: &PreparedSection,
    depth: f64,
    position: Point3<f64>,
    width: f64,
) -> Option<DrillholeSectionPoint> {
    let located = section.locate(Point2::new(position.x, position.y));
    within_buffer(located.offset, width).then_some(DrillholeSectionPoint {
        depth,
        distance: located.distance,
        elevation: position.z,
        offset: located.offset,
    })
}

enum IntervalProjection {
    Segment(IntervalSegment),
    /// Starts at or below the last desurveyed depth
    BeyondTrajectory { end: f64 },
    OutsideBuffer,
}

/// Projected points of one interval, with endpoints at the exact from/to depths
fn interval_segment(
    section: &PreparedSection,
    hole: &Drillhole,
    record: &IntervalRecord,
    trajectory: &[DrillholeTrajectoryPoint],
    width: f64,
) -> Result<IntervalProjection> {
    let (from, to) = (record.from_depth, record.to_depth);
    if !from.is_finite() || !to.is_finite() || from < 0.0 || from >= to {
        return Err(Error::InvalidParameter(format!(
            "interval {}-{} rejected: from must be less than to",
            from, to
        )));
    }

    let end = trajectory.last().map_or(0.0, |p| p.depth);
    if from >= end {
        return Ok(IntervalProjection::BeyondTrajectory { end });
    }
    let to_clamped = to.min(end);

    let mut samples: Vec<(f64, Point3<f64>)> = Vec::new();
    if let Some(p) = position_at(trajectory, from) {
        samples.push((from, p));
    }
    samples.extend(
        trajectory
            .iter()
            .filter(|p| p.depth > from && p.depth < to_clamped)
            .map(|p| (p.depth, p.position)),
    );
    if let Some(p) = position_at(trajectory, to_clamped) {
        samples.push((to_clamped, p));
    }

    let points: Vec<DrillholeSectionPoint> = samples
        .into_iter()
        .filter_map(|(depth, position)| project_point(section, depth, position, width))
        .collect();
    if points.is_empty() {
        return Ok(IntervalProjection::OutsideBuffer);
    }

    Ok(IntervalProjection::Segment(IntervalSegment {
        hole_id: hole.hole_id.clone(),
        from_depth: from,
        to_depth: to,
        lithology: record.lithology.clone(),
        attributes: record.attributes.clone(),
        points,
    }))
}
