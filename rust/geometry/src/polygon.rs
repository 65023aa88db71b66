// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Polygon type and 2D boolean union
//!
//! Ring predicates (signed area, winding, containment) are evaluated directly;
//! boolean union of overlapping rings goes through the i_overlay crate.

use crate::error::{Error, Result};
use crate::spatial::BoundingBox;
use i_overlay::core::fill_rule::FillRule;
use i_overlay::core::overlay_rule::OverlayRule;
use i_overlay::float::single::SingleFloatOverlay;
use nalgebra::Point2;

/// Epsilon for boundary containment tests
const EPSILON_2D: f64 = 1e-9;

/// Minimum area threshold - rings smaller than this are considered degenerate
const MIN_AREA_THRESHOLD: f64 = 1e-10;

/// Polygon with one exterior ring and optional holes.
///
/// Rings are stored open (the closing vertex is implied).
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    pub exterior: Vec<Point2<f64>>,
    pub interiors: Vec<Vec<Point2<f64>>>,
}

impl Polygon {
    /// Create a validated polygon.
    ///
    /// A repeated closing vertex is dropped. The exterior must have at least
    /// three vertices and a non-zero area; degenerate holes are discarded.
    pub fn new(exterior: Vec<Point2<f64>>, interiors: Vec<Vec<Point2<f64>>>) -> Result<Self> {
        let exterior = open_ring(exterior);
        if exterior.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
            return Err(Error::InvalidGeometry(
                "polygon has non-finite coordinates".to_string(),
            ));
        }
        if !is_valid_contour(&exterior) {
            return Err(Error::InvalidGeometry(format!(
                "polygon exterior is degenerate ({} vertices)",
                exterior.len()
            )));
        }

        let interiors = interiors
            .into_iter()
            .map(open_ring)
            .filter(|ring| is_valid_contour(ring))
            .collect();

        Ok(Self {
            exterior,
            interiors,
        })
    }

    /// Boundary-inclusive point containment (holes excluded)
    pub fn contains(&self, point: &Point2<f64>) -> bool {
        if on_ring_boundary(point, &self.exterior) {
            return true;
        }
        if !point_in_contour(point, &self.exterior) {
            return false;
        }
        for hole in &self.interiors {
            if on_ring_boundary(point, hole) {
                return true;
            }
            if point_in_contour(point, hole) {
                return false;
            }
        }
        true
    }

    /// Axis-aligned bounds of the exterior ring
    pub fn bounds(&self) -> BoundingBox {
        // Exterior is validated non-empty
        BoundingBox::from_points(&self.exterior).unwrap_or_else(BoundingBox::empty)
    }

    /// Area of the exterior minus holes
    pub fn area(&self) -> f64 {
        let outer = compute_signed_area(&self.exterior).abs();
        let holes: f64 = self
            .interiors
            .iter()
            .map(|h| compute_signed_area(h).abs())
            .sum();
        outer - holes
    }

    /// Iterate over every ring, exterior first
    pub fn rings(&self) -> impl Iterator<Item = &[Point2<f64>]> {
        std::iter::once(self.exterior.as_slice()).chain(self.interiors.iter().map(|r| r.as_slice()))
    }
}

/// Union a set of simple rings into polygons.
///
/// Every ring is treated as filled; overlaps merge. Returns one polygon per
/// disconnected shape, largest first.
pub fn union_rings(rings: &[Vec<Point2<f64>>]) -> Result<Vec<Polygon>> {
    let valid: Vec<&Vec<Point2<f64>>> = rings.iter().filter(|r| is_valid_contour(r)).collect();
    if valid.is_empty() {
        return Err(Error::InvalidGeometry(
            "no valid rings to union".to_string(),
        ));
    }

    // Subject is the first ring; all others are clip (same winding, NonZero)
    let subject: Vec<Vec<[f64; 2]>> = vec![contour_to_path(&ensure_ccw(valid[0]))];
    let clip: Vec<Vec<[f64; 2]>> = valid
        .iter()
        .skip(1)
        .map(|r| contour_to_path(&ensure_ccw(r)))
        .collect();

    let shapes = if clip.is_empty() {
        vec![subject]
    } else {
        subject.overlay(&clip, OverlayRule::Union, FillRule::NonZero)
    };

    let mut polygons = shapes_to_polygons(&shapes);
    if polygons.is_empty() {
        return Err(Error::AlgorithmFailed(
            "union produced empty geometry".to_string(),
        ));
    }
    polygons.sort_by(|a, b| b.area().total_cmp(&a.area()));
    Ok(polygons)
}

/// Check if a contour is valid (has area, not degenerate)
pub fn is_valid_contour(contour: &[Point2<f64>]) -> bool {
    if contour.len() < 3 {
        return false;
    }

    let area = compute_signed_area(contour).abs();
    area > MIN_AREA_THRESHOLD
}

/// Compute the signed area of a 2D contour
/// Positive = counter-clockwise, Negative = clockwise
pub fn compute_signed_area(contour: &[Point2<f64>]) -> f64 {
    if contour.len() < 3 {
        return 0.0;
    }

    let mut area = 0.0;
    let n = contour.len();

    for i in 0..n {
        let j = (i + 1) % n;
        area += contour[i].x * contour[j].y;
        area -= contour[j].x * contour[i].y;
    }

    area * 0.5
}

/// Ensure contour has counter-clockwise winding (positive area)
pub fn ensure_ccw(contour: &[Point2<f64>]) -> Vec<Point2<f64>> {
    if compute_signed_area(contour) < 0.0 {
        contour.iter().rev().cloned().collect()
    } else {
        contour.to_vec()
    }
}

/// Check if a point is strictly inside a contour using ray casting
pub fn point_in_contour(point: &Point2<f64>, contour: &[Point2<f64>]) -> bool {
    if contour.len() < 3 {
        return false;
    }

    let mut inside = false;
    let n = contour.len();

    let mut j = n - 1;
    for i in 0..n {
        let pi = &contour[i];
        let pj = &contour[j];

        if ((pi.y > point.y) != (pj.y > point.y))
            && (point.x < (pj.x - pi.x) * (point.y - pi.y) / (pj.y - pi.y) + pi.x)
        {
            inside = !inside;
        }
        j = i;
    }

    inside
}

/// Check if a point lies on any edge of a ring
pub fn on_ring_boundary(point: &Point2<f64>, ring: &[Point2<f64>]) -> bool {
    let n = ring.len();
    (0..n).any(|i| {
        let a = ring[i];
        let b = ring[(i + 1) % n];
        point_segment_distance(point, &a, &b) <= EPSILON_2D
    })
}

/// Euclidean distance from a point to a segment
pub fn point_segment_distance(p: &Point2<f64>, a: &Point2<f64>, b: &Point2<f64>) -> f64 {
    let ab = b - a;
    let len_sq = ab.norm_squared();
    if len_sq == 0.0 {
        return (p - a).norm();
    }
    let t = ((p - a).dot(&ab) / len_sq).clamp(0.0, 1.0);
    (p - (a + ab * t)).norm()
}

/// Drop a repeated closing vertex
fn open_ring(mut ring: Vec<Point2<f64>>) -> Vec<Point2<f64>> {
    if ring.len() > 1 && ring.first() == ring.last() {
        ring.pop();
    }
    ring
}

/// Convert a Point2 contour to i_overlay path format
fn contour_to_path(contour: &[Point2<f64>]) -> Vec<[f64; 2]> {
    contour.iter().map(|p| [p.x, p.y]).collect()
}

/// Convert i_overlay result shapes to polygons
///
/// i_overlay returns Vec<Vec<Vec<[f64; 2]>>> where:
/// - Outer Vec: list of shapes
/// - Middle Vec: list of contours per shape (first is outer, rest are holes)
/// - Inner Vec: list of points per contour
fn shapes_to_polygons(shapes: &[Vec<Vec<[f64; 2]>>]) -> Vec<Polygon> {
    shapes
        .iter()
        .filter_map(|shape| {
            let mut contours = shape
                .iter()
                .map(|c| c.iter().map(|p| Point2::new(p[0], p[1])).collect::<Vec<_>>());
            let outer = ensure_ccw(&contours.next()?);
            let holes: Vec<Vec<Point2<f64>>> = contours.collect();
            Polygon::new(outer, holes).ok()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x0: f64, y0: f64, size: f64) -> Vec<Point2<f64>> {
        vec![
            Point2::new(x0, y0),
            Point2::new(x0 + size, y0),
            Point2::new(x0 + size, y0 + size),
            Point2::new(x0, y0 + size),
        ]
    }

    #[test]
    fn test_compute_signed_area_winding() {
        let ccw = square(0.0, 0.0, 1.0);
        assert!((compute_signed_area(&ccw) - 1.0).abs() < EPSILON_2D);

        let cw: Vec<_> = ccw.iter().rev().cloned().collect();
        assert!((compute_signed_area(&cw) + 1.0).abs() < EPSILON_2D);
        assert!(compute_signed_area(&ensure_ccw(&cw)) > 0.0);
    }

    #[test]
    fn test_polygon_rejects_degenerate() {
        let line = vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(2.0, 0.0),
        ];
        assert!(Polygon::new(line, Vec::new()).is_err());
        assert!(Polygon::new(vec![Point2::new(0.0, 0.0)], Vec::new()).is_err());
    }

    #[test]
    fn test_polygon_drops_closing_vertex() {
        let mut ring = square(0.0, 0.0, 2.0);
        ring.push(ring[0]);
        let polygon = Polygon::new(ring, Vec::new()).unwrap();
        assert_eq!(polygon.exterior.len(), 4);
    }

    #[test]
    fn test_contains_with_hole_and_boundary() {
        let polygon = Polygon::new(square(0.0, 0.0, 10.0), vec![square(4.0, 4.0, 2.0)]).unwrap();

        assert!(polygon.contains(&Point2::new(1.0, 1.0)));
        assert!(polygon.contains(&Point2::new(0.0, 5.0)));
        assert!(polygon.contains(&Point2::new(4.0, 5.0)));
        assert!(!polygon.contains(&Point2::new(5.0, 5.0)));
        assert!(!polygon.contains(&Point2::new(11.0, 5.0)));
        assert!((polygon.area() - 96.0).abs() < 1e-9);
    }

    #[test]
    fn test_union_overlapping_squares() {
        let merged = union_rings(&[square(0.0, 0.0, 2.0), square(1.0, 0.0, 2.0)]).unwrap();
        assert_eq!(merged.len(), 1);
        assert!((merged[0].area() - 6.0).abs() < 1e-6);
    }

    #[test]
    fn test_union_disjoint_squares_sorted_by_area() {
        let merged = union_rings(&[square(0.0, 0.0, 1.0), square(5.0, 5.0, 3.0)]).unwrap();
        assert_eq!(merged.len(), 2);
        assert!(merged[0].area() > merged[1].area());
    }
}
