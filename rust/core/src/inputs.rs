// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Input records and the raster collaborator interface.
//!
//! Vector inputs are plain values: data providers read their own formats and
//! hand these records to the engine.

use crate::attributes::Attributes;
use crate::error::{Error, Result};
use crate::orientation::OrientationInput;
use crate::FeatureId;
use nalgebra::{Point2, Point3};

/// Elevation raster collaborator.
///
/// Implementations must be thread-safe; sampling happens on the caller's
/// thread but providers are shared with worker pools.
pub trait ElevationRaster: Send + Sync {
    /// Sample `band` (1-based) at map coordinates; `None` means no-data or
    /// outside extent
    fn sample(&self, x: f64, y: f64, band: usize) -> Option<f64>;

    /// Native pixel size in map units
    fn resolution(&self) -> f64;

    /// Number of bands available
    fn band_count(&self) -> usize {
        1
    }
}

/// In-memory north-up raster grid.
///
/// Sampling returns the value of the cell containing the coordinate.
#[derive(Debug, Clone)]
pub struct GridRaster {
    /// Upper-left corner of the grid
    origin: Point2<f64>,
    cell_size: f64,
    width: usize,
    height: usize,
    /// Row-major values, first row at the top
    values: Vec<f64>,
    nodata: Option<f64>,
}

impl GridRaster {
    pub fn new(
        origin: Point2<f64>,
        cell_size: f64,
        width: usize,
        height: usize,
        values: Vec<f64>,
        nodata: Option<f64>,
    ) -> Result<Self> {
        if !(cell_size > 0.0) || !cell_size.is_finite() {
            return Err(Error::InvalidParameter(format!(
                "raster cell size must be positive, got {}",
                cell_size
            )));
        }
        if values.len() != width * height {
            return Err(Error::DataUnavailable(format!(
                "raster expects {} values, got {}",
                width * height,
                values.len()
            )));
        }
        Ok(Self {
            origin,
            cell_size,
            width,
            height,
            values,
            nodata,
        })
    }

    /// Build a grid by evaluating `f` at every cell centre
    pub fn from_fn(
        origin: Point2<f64>,
        cell_size: f64,
        width: usize,
        height: usize,
        f: impl Fn(f64, f64) -> f64,
    ) -> Result<Self> {
        let mut values = Vec::with_capacity(width * height);
        for row in 0..height {
            for col in 0..width {
                let x = origin.x + (col as f64 + 0.5) * cell_size;
                let y = origin.y - (row as f64 + 0.5) * cell_size;
                values.push(f(x, y));
            }
        }
        Self::new(origin, cell_size, width, height, values, None)
    }
}

impl ElevationRaster for GridRaster {
    fn sample(&self, x: f64, y: f64, band: usize) -> Option<f64> {
        if band != 1 {
            return None;
        }
        let col = ((x - self.origin.x) / self.cell_size).floor();
        let row = ((self.origin.y - y) / self.cell_size).floor();
        if col < 0.0 || row < 0.0 {
            return None;
        }
        let (col, row) = (col as usize, row as usize);
        if col >= self.width || row >= self.height {
            return None;
        }
        let value = self.values[row * self.width + col];
        if !value.is_finite() || self.nodata.is_some_and(|nd| value == nd) {
            return None;
        }
        Some(value)
    }

    fn resolution(&self) -> f64 {
        self.cell_size
    }
}

/// Geological outcrop polygon
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OutcropPolygon {
    pub id: FeatureId,
    pub exterior: Vec<Point2<f64>>,
    pub interiors: Vec<Vec<Point2<f64>>>,
    pub attributes: Attributes,
}

impl OutcropPolygon {
    pub fn new(id: FeatureId, exterior: Vec<Point2<f64>>, attributes: Attributes) -> Self {
        Self {
            id,
            exterior,
            interiors: Vec::new(),
            attributes,
        }
    }

    /// Add an interior ring (hole)
    pub fn with_hole(mut self, ring: Vec<Point2<f64>>) -> Self {
        self.interiors.push(ring);
        self
    }
}

/// Dip/strike point measurement
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StructurePoint {
    pub id: FeatureId,
    pub location: Point2<f64>,
    pub dip: OrientationInput,
    pub strike: OrientationInput,
    pub attributes: Attributes,
}

/// Downhole survey reading.
///
/// Inclination 0° is horizontal, -90° straight down.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SurveyStation {
    pub depth: f64,
    pub azimuth: f64,
    pub inclination: f64,
}

impl SurveyStation {
    pub const fn new(depth: f64, azimuth: f64, inclination: f64) -> Self {
        Self {
            depth,
            azimuth,
            inclination,
        }
    }
}

/// Logged lithology interval of a drillhole
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IntervalRecord {
    pub from_depth: f64,
    pub to_depth: f64,
    pub lithology: String,
    pub attributes: Attributes,
}

impl IntervalRecord {
    pub fn new(from_depth: f64, to_depth: f64, lithology: impl Into<String>) -> Self {
        Self {
            from_depth,
            to_depth,
            lithology: lithology.into(),
            attributes: Attributes::new(),
        }
    }
}

/// Drillhole collar with its survey and interval tables
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Drillhole {
    pub hole_id: String,
    pub collar: Point3<f64>,
    /// End-of-hole depth; defaults to the deepest survey or interval
    pub total_depth: Option<f64>,
    pub surveys: Vec<SurveyStation>,
    pub intervals: Vec<IntervalRecord>,
}

impl Drillhole {
    pub fn new(hole_id: impl Into<String>, collar: Point3<f64>) -> Self {
        Self {
            hole_id: hole_id.into(),
            collar,
            total_depth: None,
            surveys: Vec::new(),
            intervals: Vec::new(),
        }
    }

    /// Depth the trajectory must reach
    pub fn effective_depth(&self) -> f64 {
        let survey_max = self.surveys.iter().map(|s| s.depth).fold(0.0, f64::max);
        let interval_max = self.intervals.iter().map(|i| i.to_depth).fold(0.0, f64::max);
        self.total_depth
            .unwrap_or_else(|| survey_max.max(interval_max))
    }
}
