// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Spatial index for bounding-box candidate retrieval.
//!
//! Uses a grid-based spatial hash: each point feature is binned into a square
//! cell, and a bounding-box query only visits the cells the box overlaps. The
//! caller then runs its precise containment check on the returned candidates.

use nalgebra::Point2;
use rustc_hash::FxHashMap;

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Point2<f64>,
    pub max: Point2<f64>,
}

impl BoundingBox {
    pub fn new(min: Point2<f64>, max: Point2<f64>) -> Self {
        Self { min, max }
    }

    /// Box that contains nothing and absorbs any point on expansion
    pub fn empty() -> Self {
        Self {
            min: Point2::new(f64::INFINITY, f64::INFINITY),
            max: Point2::new(f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    /// Compute bounds of a point set
    pub fn from_points(points: &[Point2<f64>]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        let mut bbox = Self::empty();
        for p in points {
            bbox.expand_to(p);
        }
        Some(bbox)
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y
    }

    pub fn expand_to(&mut self, p: &Point2<f64>) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
    }

    /// Grow the box by `margin` on every side
    pub fn inflate(&self, margin: f64) -> Self {
        Self {
            min: Point2::new(self.min.x - margin, self.min.y - margin),
            max: Point2::new(self.max.x + margin, self.max.y + margin),
        }
    }

    #[inline]
    pub fn contains(&self, p: &Point2<f64>) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    /// Check if two bounding boxes overlap
    #[inline]
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }
}

/// A spatial hash grid over point features.
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    cell_size: f64,
    entries: Vec<(usize, Point2<f64>)>,
    grid: FxHashMap<(i64, i64), Vec<usize>>,
}

impl SpatialIndex {
    /// Creates an empty spatial index with the given cell size.
    pub fn new(cell_size: f64) -> Self {
        Self {
            cell_size: if cell_size > 0.0 && cell_size.is_finite() {
                cell_size
            } else {
                1.0
            },
            entries: Vec::new(),
            grid: FxHashMap::default(),
        }
    }

    /// Builds an index over `(id, point)` pairs.
    ///
    /// The cell size is chosen so that, for evenly spread data, each cell
    /// holds about one point.
    pub fn build(points: impl IntoIterator<Item = (usize, Point2<f64>)>) -> Self {
        let items: Vec<(usize, Point2<f64>)> = points
            .into_iter()
            .filter(|(_, p)| p.x.is_finite() && p.y.is_finite())
            .collect();

        let coords: Vec<Point2<f64>> = items.iter().map(|(_, p)| *p).collect();
        let cell_size = match BoundingBox::from_points(&coords) {
            Some(bbox) => {
                let extent = bbox.width().max(bbox.height());
                let per_axis = (items.len() as f64).sqrt().max(1.0);
                extent / per_axis
            }
            None => 1.0,
        };

        let mut index = Self::new(cell_size);
        for (id, p) in items {
            index.insert(id, p);
        }
        index
    }

    /// Inserts a point feature.
    pub fn insert(&mut self, id: usize, p: Point2<f64>) {
        let slot = self.entries.len();
        self.entries.push((id, p));
        let cell = self.cell_coords(&p);
        self.grid.entry(cell).or_default().push(slot);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Ids of all points inside `bbox` (boundary inclusive), ascending.
    pub fn query_bbox(&self, bbox: &BoundingBox) -> Vec<usize> {
        if bbox.is_empty() || self.entries.is_empty() {
            return Vec::new();
        }

        let (min_cx, min_cy) = self.cell_coords(&bbox.min);
        let (max_cx, max_cy) = self.cell_coords(&bbox.max);
        let cell_span = (max_cx - min_cx + 1).saturating_mul(max_cy - min_cy + 1);

        let mut result: Vec<usize> = if cell_span as usize > self.grid.len() {
            // Box covers more cells than are occupied: walk occupied cells
            self.grid
                .iter()
                .filter(|((cx, cy), _)| {
                    *cx >= min_cx && *cx <= max_cx && *cy >= min_cy && *cy <= max_cy
                })
                .flat_map(|(_, slots)| slots.iter().copied())
                .filter(|&slot| bbox.contains(&self.entries[slot].1))
                .map(|slot| self.entries[slot].0)
                .collect()
        } else {
            let mut found = Vec::new();
            for cx in min_cx..=max_cx {
                for cy in min_cy..=max_cy {
                    if let Some(slots) = self.grid.get(&(cx, cy)) {
                        for &slot in slots {
                            let (id, p) = self.entries[slot];
                            if bbox.contains(&p) {
                                found.push(id);
                            }
                        }
                    }
                }
            }
            found
        };

        result.sort_unstable();
        result.dedup();
        result
    }

    fn cell_coords(&self, p: &Point2<f64>) -> (i64, i64) {
        (
            (p.x / self.cell_size).floor() as i64,
            (p.y / self.cell_size).floor() as i64,
        )
    }
}
