// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Section and profile data model.
//!
//! All distances are measured along the section from its first vertex, in the
//! linear unit of the section's coordinate system (metres for geographic
//! input). Elevations share the raster's vertical unit.

use crate::attributes::Attributes;
use crate::diagnostics::{Diagnostic, Severity};
use crate::error::{Error, Result};
use crate::FeatureId;
use nalgebra::{Point2, Point3};

/// Coordinate system of the section line and every vector input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CoordinateSystem {
    /// Planar coordinates in a linear unit (UTM, national grids)
    Projected { epsg: Option<u32> },
    /// Longitude/latitude degrees on the WGS84 ellipsoid
    Geographic { epsg: Option<u32> },
}

impl CoordinateSystem {
    #[inline]
    pub fn is_geographic(&self) -> bool {
        matches!(self, CoordinateSystem::Geographic { .. })
    }

    pub fn epsg(&self) -> Option<u32> {
        match self {
            CoordinateSystem::Projected { epsg } | CoordinateSystem::Geographic { epsg } => *epsg,
        }
    }
}

impl Default for CoordinateSystem {
    fn default() -> Self {
        CoordinateSystem::Projected { epsg: None }
    }
}

/// Immutable section polyline
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RawSectionLine"))]
pub struct SectionLine {
    vertices: Vec<Point2<f64>>,
    crs: CoordinateSystem,
}

/// Unvalidated wire form; deserialization goes through [`SectionLine::new`]
#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct RawSectionLine {
    vertices: Vec<Point2<f64>>,
    crs: CoordinateSystem,
}

#[cfg(feature = "serde")]
impl TryFrom<RawSectionLine> for SectionLine {
    type Error = Error;

    fn try_from(raw: RawSectionLine) -> Result<Self> {
        SectionLine::new(raw.vertices, raw.crs)
    }
}

impl SectionLine {
    /// Create a validated section line.
    ///
    /// Consecutive duplicate vertices are removed. The line must keep at
    /// least two distinct, finite vertices.
    pub fn new(vertices: Vec<Point2<f64>>, crs: CoordinateSystem) -> Result<Self> {
        if vertices.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
            return Err(Error::geometry("section line has non-finite coordinates"));
        }

        let mut cleaned: Vec<Point2<f64>> = Vec::with_capacity(vertices.len());
        for p in vertices {
            if cleaned.last().map_or(true, |last| *last != p) {
                cleaned.push(p);
            }
        }

        if cleaned.len() < 2 {
            return Err(Error::geometry(
                "section line needs at least 2 distinct vertices",
            ));
        }

        if crs.is_geographic()
            && cleaned
                .iter()
                .any(|p| p.x.abs() > 180.0 || p.y.abs() > 90.0)
        {
            return Err(Error::geometry(
                "geographic section line has coordinates outside lon/lat range",
            ));
        }

        Ok(Self {
            vertices: cleaned,
            crs,
        })
    }

    #[inline]
    pub fn vertices(&self) -> &[Point2<f64>] {
        &self.vertices
    }

    #[inline]
    pub fn crs(&self) -> CoordinateSystem {
        self.crs
    }

    #[inline]
    pub fn start(&self) -> Point2<f64> {
        self.vertices[0]
    }

    #[inline]
    pub fn end(&self) -> Point2<f64> {
        self.vertices[self.vertices.len() - 1]
    }

    /// Number of segments in the polyline
    #[inline]
    pub fn segment_count(&self) -> usize {
        self.vertices.len() - 1
    }
}

/// One sample of a 2D profile: distance along the section and elevation
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProfilePoint {
    pub distance: f64,
    pub elevation: f64,
}

impl ProfilePoint {
    #[inline]
    pub const fn new(distance: f64, elevation: f64) -> Self {
        Self {
            distance,
            elevation,
        }
    }
}

/// Master elevation profile along the section
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TopographicProfile {
    /// Ordered samples, distance non-decreasing
    pub points: Vec<ProfilePoint>,
    /// Sampling interval actually used
    pub sample_interval: f64,
    /// Number of samples that hit raster no-data
    pub nodata_count: usize,
}

impl TopographicProfile {
    pub fn new(points: Vec<ProfilePoint>, sample_interval: f64, nodata_count: usize) -> Self {
        Self {
            points,
            sample_interval,
            nodata_count,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Total profile length
    pub fn length(&self) -> f64 {
        self.points.last().map(|p| p.distance).unwrap_or(0.0)
    }

    /// Linearly interpolate the elevation at `distance`.
    ///
    /// Distances outside the profile clamp to the end samples. A distance
    /// that equals a sample distance returns that sample's elevation exactly.
    pub fn interpolate(&self, distance: f64) -> Option<f64> {
        let first = self.points.first()?;
        let last = self.points.last()?;

        if distance <= first.distance {
            return Some(first.elevation);
        }
        if distance >= last.distance {
            return Some(last.elevation);
        }

        // First sample strictly beyond `distance`; always in 1..len here
        let idx = self.points.partition_point(|p| p.distance <= distance);
        let a = self.points[idx - 1];
        let b = self.points[idx];

        let span = b.distance - a.distance;
        if span <= 0.0 {
            return Some(a.elevation);
        }
        let t = (distance - a.distance) / span;
        Some(a.elevation + t * (b.elevation - a.elevation))
    }

    /// Elevation range as (min, max)
    pub fn elevation_range(&self) -> Option<(f64, f64)> {
        if self.points.is_empty() {
            return None;
        }
        let (min, max) = self
            .points
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
                (lo.min(p.elevation), hi.max(p.elevation))
            });
        Some((min, max))
    }
}

/// Geological unit trace along the topography, one per intersection part
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GeologySegment {
    pub feature_id: FeatureId,
    /// Index of this part within the feature's intersection result
    pub part_index: usize,
    pub lithology: String,
    pub points: Vec<ProfilePoint>,
    pub attributes: Attributes,
}

impl GeologySegment {
    /// Along-section extent as (start, end)
    pub fn extent(&self) -> Option<(f64, f64)> {
        Some((self.points.first()?.distance, self.points.last()?.distance))
    }
}

/// Structural measurement projected onto the section
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StructureMeasurement {
    pub feature_id: FeatureId,
    pub distance: f64,
    pub elevation: f64,
    /// Signed perpendicular distance from the section line
    pub offset: f64,
    /// Apparent dip in the section plane, degrees
    pub apparent_dip: f64,
    /// True dip, degrees
    pub dip: f64,
    /// Strike as normalized azimuth, degrees
    pub strike: f64,
    /// Dip direction when the dip text carried one (`"45NE"`)
    pub dip_direction: Option<f64>,
    pub attributes: Attributes,
}

/// Desurveyed drillhole position
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DrillholeTrajectoryPoint {
    pub depth: f64,
    pub position: Point3<f64>,
}

/// Drillhole position projected onto the section
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DrillholeSectionPoint {
    pub depth: f64,
    pub distance: f64,
    pub elevation: f64,
    pub offset: f64,
}

/// Thin reference trace of one drillhole in section space
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DrillholeTrace {
    pub hole_id: String,
    pub collar_offset: f64,
    pub points: Vec<DrillholeSectionPoint>,
}

/// Lithology interval rendered over a drillhole trace
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IntervalSegment {
    pub hole_id: String,
    pub from_depth: f64,
    pub to_depth: f64,
    pub lithology: String,
    pub attributes: Attributes,
    pub points: Vec<DrillholeSectionPoint>,
}

/// Completion state of the asynchronous geology layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GeologyStatus {
    /// Geology was not requested
    Skipped,
    /// Dispatched to workers, not merged yet
    Pending,
    /// Every chunk finished successfully
    Complete,
    /// Some chunks failed; their errors are in the diagnostics
    Partial { failed_chunks: usize },
}

/// Complete output of one profile request.
///
/// Immutable once produced; shared as `Arc<ProfileBundle>` by the cache.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProfileBundle {
    pub section_length: f64,
    /// Start-to-end bearing of the section, degrees
    pub section_azimuth: f64,
    pub topography: TopographicProfile,
    pub geology: Vec<GeologySegment>,
    pub geology_status: GeologyStatus,
    pub structures: Vec<StructureMeasurement>,
    pub drillhole_traces: Vec<DrillholeTrace>,
    pub intervals: Vec<IntervalSegment>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ProfileBundle {
    /// True when no layer produced any output
    pub fn is_empty(&self) -> bool {
        self.topography.is_empty()
            && self.geology.is_empty()
            && self.structures.is_empty()
            && self.drillhole_traces.is_empty()
            && self.intervals.is_empty()
    }

    /// True when at least one error diagnostic was recorded
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Diagnostics at or above `severity`
    pub fn diagnostics_at_least(&self, severity: Severity) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(move |d| d.severity >= severity)
    }

    /// Build the upgraded bundle once asynchronous geology has completed.
    ///
    /// Every synchronous layer is carried over unchanged.
    pub fn with_geology(
        &self,
        geology: Vec<GeologySegment>,
        diagnostics: Vec<Diagnostic>,
        status: GeologyStatus,
    ) -> Self {
        let mut upgraded = self.clone();
        upgraded.geology = geology;
        upgraded.geology_status = status;
        upgraded.diagnostics.extend(diagnostics);
        upgraded
    }
}
