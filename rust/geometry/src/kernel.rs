// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Geometry kernel: buffering, intersection, along-line measurement,
//! vertex extraction and densification.
//!
//! Intersection results are normalized here into an ordered list of simple
//! line parts, so no caller ever branches on the raw geometry type.

use crate::error::{Error, Result};
use crate::geodesy::{self, LocalFrame};
use crate::polygon::{self, Polygon};
use crate::spatial::BoundingBox;
use nalgebra::{Point2, Vector2};
use smallvec::{smallvec, SmallVec};
use xsection_core::{CoordinateSystem, SectionLine};

/// Parameter tolerance when merging crossing positions on a segment
const PARAM_EPSILON: f64 = 1e-12;

/// Raw geometry as produced by providers or overlay engines
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(Point2<f64>),
    MultiPoint(Vec<Point2<f64>>),
    LineString(Vec<Point2<f64>>),
    MultiLineString(Vec<Vec<Point2<f64>>>),
    Polygon(Polygon),
    MultiPolygon(Vec<Polygon>),
    Collection(Vec<Geometry>),
}

/// One simple, ordered part of a linear intersection result
#[derive(Debug, Clone, PartialEq)]
pub struct LinePart {
    pub points: Vec<Point2<f64>>,
}

impl LinePart {
    pub fn start(&self) -> Point2<f64> {
        self.points[0]
    }

    pub fn end(&self) -> Point2<f64> {
        self.points[self.points.len() - 1]
    }
}

/// Position of a point relative to the section
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinePosition {
    /// Distance along the section to the closest point
    pub distance: f64,
    /// Signed distance from the section, positive on the left
    pub offset: f64,
    /// Index of the closest segment
    pub segment: usize,
    /// Closest point on the section, world coordinates
    pub foot: Point2<f64>,
}

/// Section line prepared for repeated measurement queries
#[derive(Debug, Clone)]
pub struct PreparedSection {
    vertices: Vec<Point2<f64>>,
    local: Vec<Point2<f64>>,
    /// Measured distance from the start to each vertex
    cumulative: Vec<f64>,
    frame: LocalFrame,
    crs: CoordinateSystem,
}

impl PreparedSection {
    pub fn new(line: &SectionLine) -> Self {
        let crs = line.crs();
        let vertices = line.vertices().to_vec();
        let frame = LocalFrame::new(line.start(), crs);
        let local = vertices.iter().map(|p| frame.to_local(*p)).collect();

        let mut cumulative = Vec::with_capacity(vertices.len());
        let mut total = 0.0;
        cumulative.push(0.0);
        for w in vertices.windows(2) {
            total += geodesy::measure(w[0], w[1], crs);
            cumulative.push(total);
        }

        Self {
            vertices,
            local,
            cumulative,
            frame,
            crs,
        }
    }

    #[inline]
    pub fn crs(&self) -> CoordinateSystem {
        self.crs
    }

    #[inline]
    pub fn vertices(&self) -> &[Point2<f64>] {
        &self.vertices
    }

    #[inline]
    pub fn frame(&self) -> &LocalFrame {
        &self.frame
    }

    /// Measured section length
    pub fn length(&self) -> f64 {
        self.cumulative.last().copied().unwrap_or(0.0)
    }

    /// Start-to-end bearing, degrees clockwise from north
    pub fn azimuth(&self) -> f64 {
        geodesy::bearing(self.vertices[0], self.vertices[self.vertices.len() - 1], self.crs)
    }

    /// Project a point onto the section
    pub fn locate(&self, p: Point2<f64>) -> LinePosition {
        let lp = self.frame.to_local(p);

        let mut best_d2 = f64::INFINITY;
        let mut best_seg = 0;
        let mut best_t = 0.0;
        let mut best_cross = 0.0;

        for i in 0..self.local.len() - 1 {
            let a = self.local[i];
            let ab = self.local[i + 1] - a;
            let ap = lp - a;
            let len_sq = ab.norm_squared();
            let t = if len_sq > 0.0 {
                (ap.dot(&ab) / len_sq).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let d2 = (ap - ab * t).norm_squared();
            if d2 < best_d2 {
                best_d2 = d2;
                best_seg = i;
                best_t = t;
                best_cross = ab.x * ap.y - ab.y * ap.x;
            }
        }

        let a = self.vertices[best_seg];
        let b = self.vertices[best_seg + 1];
        let foot = a + (b - a) * best_t;

        let distance = self.cumulative[best_seg] + geodesy::measure(a, foot, self.crs);
        let magnitude = geodesy::measure(foot, p, self.crs);
        let offset = if best_cross < 0.0 { -magnitude } else { magnitude };

        LinePosition {
            distance,
            offset,
            segment: best_seg,
            foot,
        }
    }

    /// Distance along the section to the closest point
    #[inline]
    pub fn distance_along(&self, p: Point2<f64>) -> f64 {
        self.locate(p).distance
    }

    /// World position at `distance` along the section (clamped to the ends)
    pub fn point_at(&self, distance: f64) -> Point2<f64> {
        let last = self.vertices.len() - 1;
        if distance <= 0.0 {
            return self.vertices[0];
        }
        if distance >= self.length() {
            return self.vertices[last];
        }
        let idx = self
            .cumulative
            .partition_point(|d| *d <= distance)
            .clamp(1, last);
        let span = self.cumulative[idx] - self.cumulative[idx - 1];
        let t = if span > 0.0 {
            (distance - self.cumulative[idx - 1]) / span
        } else {
            0.0
        };
        let a = self.vertices[idx - 1];
        a + (self.vertices[idx] - a) * t
    }
}

/// Measured distance from the start of `line` to the closest point to `point`.
///
/// Geographic sections are measured on the WGS84 ellipsoid.
pub fn distance_along_line(line: &SectionLine, point: Point2<f64>) -> f64 {
    PreparedSection::new(line).distance_along(point)
}

/// Signed distance from `line` to `point`, positive on the left
pub fn perpendicular_offset(line: &SectionLine, point: Point2<f64>) -> f64 {
    PreparedSection::new(line).locate(point).offset
}

/// Buffer a section line by `distance` (linear units, metres for geographic).
///
/// `segments` is the number of chords per quarter circle at the round caps.
pub fn buffer(line: &SectionLine, distance: f64, segments: usize) -> Result<Polygon> {
    if !(distance > 0.0) || !distance.is_finite() {
        return Err(Error::InvalidParameter(format!(
            "buffer distance must be positive, got {}",
            distance
        )));
    }
    let segments = segments.max(1);
    let frame = LocalFrame::new(line.start(), line.crs());
    let local: Vec<Point2<f64>> = line.vertices().iter().map(|p| frame.to_local(*p)).collect();

    let capsules: Vec<Vec<Point2<f64>>> = local
        .windows(2)
        .filter(|w| w[0] != w[1])
        .map(|w| capsule(w[0], w[1], distance, segments))
        .collect();

    let merged = polygon::union_rings(&capsules)?;
    if merged.len() > 1 {
        tracing::debug!(shapes = merged.len(), "Buffer union produced several shapes, keeping largest");
    }
    let largest = merged
        .into_iter()
        .next()
        .ok_or_else(|| Error::AlgorithmFailed("buffer produced no polygon".to_string()))?;

    let to_world = |ring: &[Point2<f64>]| -> Vec<Point2<f64>> {
        ring.iter().map(|p| frame.to_world(*p)).collect()
    };
    Polygon::new(
        to_world(&largest.exterior),
        largest.interiors.iter().map(|r| to_world(r)).collect(),
    )
}

/// Counter-clockwise stadium around segment `a`-`b`
fn capsule(a: Point2<f64>, b: Point2<f64>, d: f64, segments: usize) -> Vec<Point2<f64>> {
    let u = (b - a).normalize();
    let normal = Vector2::new(-u.y, u.x);
    let start_angle = (-normal.y).atan2(-normal.x);
    let steps = 2 * segments;
    let step = std::f64::consts::PI / steps as f64;

    let mut ring = Vec::with_capacity(2 * (steps + 1));
    for (center, base) in [(b, start_angle), (a, start_angle + std::f64::consts::PI)] {
        for k in 0..=steps {
            let angle = base + k as f64 * step;
            ring.push(center + Vector2::new(angle.cos(), angle.sin()) * d);
        }
    }
    ring
}

/// Parameter along `a`-`b` where it crosses `c`-`d`, if the segments meet
fn segment_crossing(
    a: &Point2<f64>,
    b: &Point2<f64>,
    c: &Point2<f64>,
    d: &Point2<f64>,
) -> Option<f64> {
    let r = b - a;
    let s = d - c;
    let denom = r.x * s.y - r.y * s.x;
    if denom.abs() <= f64::EPSILON * r.norm() * s.norm() {
        return None;
    }
    let qp = c - a;
    let t = (qp.x * s.y - qp.y * s.x) / denom;
    let u = (qp.x * r.y - qp.y * r.x) / denom;
    let tol = 1e-12;
    if (-tol..=1.0 + tol).contains(&t) && (-tol..=1.0 + tol).contains(&u) {
        Some(t.clamp(0.0, 1.0))
    } else {
        None
    }
}

/// Intersect a polyline with a polygon, returning the engine's raw result.
///
/// A single inside run is a `LineString`; several runs (or none) come back as
/// a `MultiLineString`.
pub fn intersect_raw(line: &[Point2<f64>], polygon: &Polygon) -> Geometry {
    let mut parts: Vec<Vec<Point2<f64>>> = Vec::new();
    let mut current: Option<Vec<Point2<f64>>> = None;

    for w in line.windows(2) {
        let (a, b) = (w[0], w[1]);
        if a == b {
            continue;
        }

        let mut params: SmallVec<[f64; 8]> = smallvec![0.0, 1.0];
        for ring in polygon.rings() {
            let n = ring.len();
            for i in 0..n {
                if let Some(t) = segment_crossing(&a, &b, &ring[i], &ring[(i + 1) % n]) {
                    params.push(t);
                }
            }
        }
        params.sort_by(|x, y| x.total_cmp(y));
        params.dedup_by(|x, y| (*x - *y).abs() <= PARAM_EPSILON);

        let at = |t: f64| -> Point2<f64> {
            if t <= 0.0 {
                a
            } else if t >= 1.0 {
                b
            } else {
                a + (b - a) * t
            }
        };

        for pair in params.windows(2) {
            let (t0, t1) = (pair[0], pair[1]);
            if t1 - t0 <= PARAM_EPSILON {
                continue;
            }
            let mid = at(0.5 * (t0 + t1));
            if polygon.contains(&mid) {
                let (p0, p1) = (at(t0), at(t1));
                match current.as_mut() {
                    Some(points) => {
                        if points.last() != Some(&p0) {
                            points.push(p0);
                        }
                        points.push(p1);
                    }
                    None => current = Some(vec![p0, p1]),
                }
            } else if let Some(points) = current.take() {
                parts.push(points);
            }
        }
    }
    if let Some(points) = current.take() {
        parts.push(points);
    }

    if parts.len() == 1 {
        Geometry::LineString(parts.remove(0))
    } else {
        Geometry::MultiLineString(parts)
    }
}

/// Intersect a polyline with a polygon as an ordered list of simple parts
pub fn intersect(line: &[Point2<f64>], polygon: &Polygon) -> Vec<LinePart> {
    // Raw intersection output is always linear
    normalize_line_parts(intersect_raw(line, polygon)).unwrap_or_default()
}

/// Intersect a polyline with a whole polygon set in one pass.
///
/// Polygons whose bounds miss the line's bounds are skipped without testing.
/// Returns `(polygon index, parts)` for every polygon with at least one part,
/// in input order.
pub fn intersect_all(line: &[Point2<f64>], polygons: &[Polygon]) -> Vec<(usize, Vec<LinePart>)> {
    let Some(line_bounds) = BoundingBox::from_points(line) else {
        return Vec::new();
    };

    polygons
        .iter()
        .enumerate()
        .filter(|(_, polygon)| polygon.bounds().intersects(&line_bounds))
        .filter_map(|(idx, polygon)| {
            let parts = intersect(line, polygon);
            (!parts.is_empty()).then_some((idx, parts))
        })
        .collect()
}

/// Flatten any linear geometry into simple parts.
///
/// Points and multipoints (touch contacts) carry no length and are dropped.
/// Areal geometry is rejected.
pub fn normalize_line_parts(geometry: Geometry) -> Result<Vec<LinePart>> {
    let mut parts = Vec::new();
    collect_line_parts(geometry, &mut parts)?;
    Ok(parts)
}

fn collect_line_parts(geometry: Geometry, parts: &mut Vec<LinePart>) -> Result<()> {
    match geometry {
        Geometry::Point(_) | Geometry::MultiPoint(_) => {}
        Geometry::LineString(points) => push_part(points, parts),
        Geometry::MultiLineString(lines) => {
            for points in lines {
                push_part(points, parts);
            }
        }
        Geometry::Collection(items) => {
            for item in items {
                collect_line_parts(item, parts)?;
            }
        }
        Geometry::Polygon(_) | Geometry::MultiPolygon(_) => {
            return Err(Error::InvalidGeometry(
                "expected linear geometry, got polygon".to_string(),
            ));
        }
    }
    Ok(())
}

fn push_part(mut points: Vec<Point2<f64>>, parts: &mut Vec<LinePart>) {
    points.dedup();
    if points.len() >= 2 {
        parts.push(LinePart { points });
    }
}

/// Flatten every vertex of every part
pub fn extract_vertices(geometry: &Geometry) -> Vec<Point2<f64>> {
    let mut out = Vec::new();
    collect_vertices(geometry, &mut out);
    out
}

fn collect_vertices(geometry: &Geometry, out: &mut Vec<Point2<f64>>) {
    match geometry {
        Geometry::Point(p) => out.push(*p),
        Geometry::MultiPoint(points) | Geometry::LineString(points) => out.extend_from_slice(points),
        Geometry::MultiLineString(lines) => {
            for line in lines {
                out.extend_from_slice(line);
            }
        }
        Geometry::Polygon(polygon) => {
            for ring in polygon.rings() {
                out.extend_from_slice(ring);
            }
        }
        Geometry::MultiPolygon(polygons) => {
            for polygon in polygons {
                for ring in polygon.rings() {
                    out.extend_from_slice(ring);
                }
            }
        }
        Geometry::Collection(items) => {
            for item in items {
                collect_vertices(item, out);
            }
        }
    }
}

/// Densify a polyline so no step exceeds `interval` (measured in `crs`).
///
/// Original vertices are kept. If the polyline is not simple, falls back to
/// fixed-step interpolation along its length and logs a warning.
pub fn densify(
    points: &[Point2<f64>],
    interval: f64,
    crs: CoordinateSystem,
) -> Result<Vec<Point2<f64>>> {
    validate_densify_input(points, interval)?;

    match densify_by_segments(points, interval, crs) {
        Ok(dense) => Ok(dense),
        Err(err) => {
            tracing::warn!(
                error = %err,
                vertices = points.len(),
                interval,
                "Segment densification failed, falling back to step interpolation"
            );
            densify_by_steps(points, interval, crs)
        }
    }
}

fn validate_densify_input(points: &[Point2<f64>], interval: f64) -> Result<()> {
    if points.len() < 2 {
        return Err(Error::InvalidGeometry(format!(
            "cannot densify {} vertices",
            points.len()
        )));
    }
    if points.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
        return Err(Error::InvalidGeometry(
            "polyline has non-finite coordinates".to_string(),
        ));
    }
    if !(interval > 0.0) || !interval.is_finite() {
        return Err(Error::InvalidParameter(format!(
            "densify interval must be positive, got {}",
            interval
        )));
    }
    Ok(())
}

/// Preferred densification: subdivide each segment evenly.
///
/// Rejects non-simple input (repeated vertices, backtracking or crossing
/// segments).
pub fn densify_by_segments(
    points: &[Point2<f64>],
    interval: f64,
    crs: CoordinateSystem,
) -> Result<Vec<Point2<f64>>> {
    validate_densify_input(points, interval)?;
    if !is_simple(points) {
        return Err(Error::AlgorithmFailed(
            "polyline is not simple".to_string(),
        ));
    }

    let mut out = Vec::with_capacity(points.len());
    for w in points.windows(2) {
        let (a, b) = (w[0], w[1]);
        let length = geodesy::measure(a, b, crs);
        let pieces = (length / interval).ceil().max(1.0) as usize;
        for k in 0..pieces {
            let t = k as f64 / pieces as f64;
            out.push(a + (b - a) * t);
        }
    }
    out.push(points[points.len() - 1]);
    Ok(out)
}

/// Fallback densification: sample every `interval` along the measured length.
pub fn densify_by_steps(
    points: &[Point2<f64>],
    interval: f64,
    crs: CoordinateSystem,
) -> Result<Vec<Point2<f64>>> {
    validate_densify_input(points, interval)?;

    let mut cumulative = Vec::with_capacity(points.len());
    let mut total = 0.0;
    cumulative.push(0.0);
    for w in points.windows(2) {
        total += geodesy::measure(w[0], w[1], crs);
        cumulative.push(total);
    }
    if total <= 0.0 {
        return Err(Error::InvalidGeometry(
            "polyline has zero length".to_string(),
        ));
    }

    let steps = (total / interval).floor() as usize;
    let mut out = Vec::with_capacity(steps + 2);
    let mut seg = 0;
    for k in 0..=steps {
        let d = k as f64 * interval;
        if d >= total {
            break;
        }
        while seg + 1 < points.len() - 1 && cumulative[seg + 1] <= d {
            seg += 1;
        }
        let span = cumulative[seg + 1] - cumulative[seg];
        let t = if span > 0.0 {
            (d - cumulative[seg]) / span
        } else {
            0.0
        };
        out.push(points[seg] + (points[seg + 1] - points[seg]) * t);
    }
    out.push(points[points.len() - 1]);
    Ok(out)
}

/// Check that no two segments of a polyline touch except consecutive ones at
/// their shared vertex.
pub fn is_simple(points: &[Point2<f64>]) -> bool {
    let n = points.len();
    if n < 2 {
        return false;
    }
    if points.windows(2).any(|w| w[0] == w[1]) {
        return false;
    }

    let closed = n > 3 && points[0] == points[n - 1];
    let segs = n - 1;

    for i in 0..segs {
        let (a, b) = (points[i], points[i + 1]);
        for j in (i + 1)..segs {
            let (c, d) = (points[j], points[j + 1]);
            let adjacent = j == i + 1 || (closed && i == 0 && j == segs - 1);
            if adjacent {
                // Adjacent segments may only share their joint; reject backtracking
                let r = b - a;
                let s = d - c;
                let cross = r.x * s.y - r.y * s.x;
                if cross.abs() <= f64::EPSILON * r.norm() * s.norm() && r.dot(&s) < 0.0 {
                    return false;
                }
                continue;
            }
            if segments_touch(&a, &b, &c, &d) {
                return false;
            }
        }
    }
    true
}

fn segments_touch(a: &Point2<f64>, b: &Point2<f64>, c: &Point2<f64>, d: &Point2<f64>) -> bool {
    if segment_crossing(a, b, c, d).is_some() {
        return true;
    }
    // Parallel segments: touching if any endpoint lies on the other segment
    let eps = 1e-12;
    polygon::point_segment_distance(a, c, d) <= eps
        || polygon::point_segment_distance(b, c, d) <= eps
        || polygon::point_segment_distance(c, a, b) <= eps
        || polygon::point_segment_distance(d, a, b) <= eps
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    const PLANAR: CoordinateSystem = CoordinateSystem::Projected { epsg: None };

    fn straight_section() -> SectionLine {
        SectionLine::new(vec![Point2::new(0.0, 0.0), Point2::new(100.0, 0.0)], PLANAR).unwrap()
    }

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Polygon {
        Polygon::new(
            vec![
                Point2::new(x0, y0),
                Point2::new(x1, y0),
                Point2::new(x1, y1),
                Point2::new(x0, y1),
            ],
            Vec::new(),
        )
        .unwrap()
    }

    #[test]
    fn test_locate_signed_offset() {
        let section = PreparedSection::new(&straight_section());
        let left = section.locate(Point2::new(30.0, 5.0));
        assert_relative_eq!(left.distance, 30.0);
        assert_relative_eq!(left.offset, 5.0);

        let right = section.locate(Point2::new(60.0, -7.0));
        assert_relative_eq!(right.distance, 60.0);
        assert_relative_eq!(right.offset, -7.0);
    }

    #[test]
    fn test_locate_beyond_end_clamps() {
        let section = PreparedSection::new(&straight_section());
        let pos = section.locate(Point2::new(103.0, 4.0));
        assert_relative_eq!(pos.distance, 100.0);
        assert_relative_eq!(pos.offset, 5.0);
    }

    #[test]
    fn test_distance_along_bent_line() {
        let line = SectionLine::new(
            vec![
                Point2::new(0.0, 0.0),
                Point2::new(10.0, 0.0),
                Point2::new(10.0, 10.0),
            ],
            PLANAR,
        )
        .unwrap();
        assert_relative_eq!(distance_along_line(&line, Point2::new(12.0, 4.0)), 14.0);
        assert_relative_eq!(perpendicular_offset(&line, Point2::new(12.0, 4.0)), -2.0);
        let prepared = PreparedSection::new(&line);
        assert_relative_eq!(prepared.length(), 20.0);
        assert_relative_eq!(prepared.azimuth(), 45.0);
        assert_eq!(prepared.point_at(15.0), Point2::new(10.0, 5.0));
    }

    #[test]
    fn test_geographic_distance_uses_ellipsoid() {
        let line = SectionLine::new(
            vec![Point2::new(0.0, 0.0), Point2::new(0.0, 1.0)],
            CoordinateSystem::Geographic { epsg: Some(4326) },
        )
        .unwrap();
        let d = distance_along_line(&line, Point2::new(0.0, 0.5));
        // Half a degree of meridian near the equator, not 0.5 "units"
        assert_abs_diff_eq!(d, 55_287.15, epsilon = 1.0);
    }

    #[test]
    fn test_buffer_contains_line_and_respects_width() {
        let line = straight_section();
        let polygon = buffer(&line, 10.0, 8).unwrap();

        assert!(polygon.contains(&Point2::new(50.0, 0.0)));
        assert!(polygon.contains(&Point2::new(50.0, 9.9)));
        assert!(!polygon.contains(&Point2::new(50.0, 10.5)));
        assert!(polygon.contains(&Point2::new(-9.0, 0.0)));

        let bounds = polygon.bounds();
        assert_abs_diff_eq!(bounds.min.x, -10.0, epsilon = 1e-4);
        assert_abs_diff_eq!(bounds.max.x, 110.0, epsilon = 1e-4);
        // Area approaches rectangle + circle as segments grow
        let exact = 100.0 * 20.0 + std::f64::consts::PI * 100.0;
        assert!(polygon.area() < exact && polygon.area() > 0.97 * exact);
    }

    #[test]
    fn test_buffer_bent_line_is_single_polygon() {
        let line = SectionLine::new(
            vec![
                Point2::new(0.0, 0.0),
                Point2::new(50.0, 0.0),
                Point2::new(50.0, 50.0),
            ],
            PLANAR,
        )
        .unwrap();
        let polygon = buffer(&line, 5.0, 4).unwrap();
        assert!(polygon.contains(&Point2::new(50.0, 25.0)));
        assert!(polygon.contains(&Point2::new(25.0, 0.0)));
        assert!(!polygon.contains(&Point2::new(25.0, 25.0)));
    }

    #[test]
    fn test_buffer_rejects_bad_distance() {
        assert!(buffer(&straight_section(), 0.0, 8).is_err());
        assert!(buffer(&straight_section(), f64::NAN, 8).is_err());
    }

    #[test]
    fn test_intersect_single_part() {
        let line = [Point2::new(0.0, 0.0), Point2::new(100.0, 0.0)];
        let parts = intersect(&line, &rect(20.0, -5.0, 40.0, 5.0));
        assert_eq!(parts.len(), 1);
        assert_abs_diff_eq!(parts[0].start().x, 20.0, epsilon = 1e-9);
        assert_abs_diff_eq!(parts[0].end().x, 40.0, epsilon = 1e-9);
    }

    #[test]
    fn test_intersect_hole_splits_into_ordered_parts() {
        let polygon = Polygon::new(
            rect(10.0, -10.0, 90.0, 10.0).exterior,
            vec![rect(40.0, -5.0, 60.0, 5.0).exterior],
        )
        .unwrap();
        let line = [Point2::new(0.0, 0.0), Point2::new(100.0, 0.0)];

        let raw = intersect_raw(&line, &polygon);
        assert!(matches!(raw, Geometry::MultiLineString(ref lines) if lines.len() == 2));

        let parts = intersect(&line, &polygon);
        assert_eq!(parts.len(), 2);
        assert_abs_diff_eq!(parts[0].start().x, 10.0, epsilon = 1e-9);
        assert_abs_diff_eq!(parts[0].end().x, 40.0, epsilon = 1e-9);
        assert_abs_diff_eq!(parts[1].start().x, 60.0, epsilon = 1e-9);
        assert_abs_diff_eq!(parts[1].end().x, 90.0, epsilon = 1e-9);
    }

    #[test]
    fn test_intersect_keeps_interior_vertices() {
        let line = [
            Point2::new(0.0, 0.0),
            Point2::new(50.0, 0.0),
            Point2::new(100.0, 0.0),
        ];
        let parts = intersect(&line, &rect(20.0, -5.0, 80.0, 5.0));
        assert_eq!(parts.len(), 1);
        let xs: Vec<f64> = parts[0].points.iter().map(|p| p.x).collect();
        assert_eq!(xs.len(), 3);
        assert_abs_diff_eq!(xs[0], 20.0, epsilon = 1e-9);
        assert_eq!(xs[1], 50.0);
        assert_abs_diff_eq!(xs[2], 80.0, epsilon = 1e-9);
    }

    #[test]
    fn test_intersect_all_reports_polygon_indices() {
        let line = [Point2::new(0.0, 0.0), Point2::new(100.0, 0.0)];
        let polygons = vec![
            rect(10.0, -5.0, 20.0, 5.0),
            rect(10.0, 50.0, 20.0, 60.0),
            rect(70.0, -5.0, 80.0, 5.0),
        ];
        let hits = intersect_all(&line, &polygons);
        let indices: Vec<usize> = hits.iter().map(|(i, _)| *i).collect();
        assert_eq!(indices, vec![0, 2]);
    }

    #[test]
    fn test_normalize_collection() {
        let raw = Geometry::Collection(vec![
            Geometry::Point(Point2::new(1.0, 1.0)),
            Geometry::LineString(vec![Point2::new(0.0, 0.0), Point2::new(1.0, 0.0)]),
            Geometry::MultiLineString(vec![
                vec![Point2::new(2.0, 0.0), Point2::new(3.0, 0.0)],
                vec![Point2::new(4.0, 0.0)],
            ]),
        ]);
        let parts = normalize_line_parts(raw).unwrap();
        assert_eq!(parts.len(), 2);

        let areal = Geometry::Polygon(rect(0.0, 0.0, 1.0, 1.0));
        assert!(normalize_line_parts(areal).is_err());
    }

    #[test]
    fn test_extract_vertices_flattens_parts() {
        let geometry = Geometry::Collection(vec![
            Geometry::MultiLineString(vec![
                vec![Point2::new(0.0, 0.0), Point2::new(1.0, 0.0)],
                vec![Point2::new(2.0, 0.0), Point2::new(3.0, 0.0)],
            ]),
            Geometry::Polygon(rect(0.0, 0.0, 1.0, 1.0)),
        ]);
        assert_eq!(extract_vertices(&geometry).len(), 8);
    }

    #[test]
    fn test_densify_keeps_vertices_and_spacing() {
        let points = [
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
            Point2::new(10.0, 5.0),
        ];
        let dense = densify(&points, 3.0, PLANAR).unwrap();
        assert_eq!(dense.first(), Some(&points[0]));
        assert_eq!(dense.last(), Some(&points[2]));
        assert!(dense.contains(&points[1]));
        for w in dense.windows(2) {
            assert!((w[1] - w[0]).norm() <= 3.0 + 1e-9);
        }
    }

    #[test]
    fn test_densify_falls_back_on_non_simple_input() {
        // Self-crossing bow tie
        let points = [
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 10.0),
            Point2::new(10.0, 0.0),
            Point2::new(0.0, 10.0),
        ];
        assert!(!is_simple(&points));
        assert!(densify_by_segments(&points, 1.0, PLANAR).is_err());

        let dense = densify(&points, 1.0, PLANAR).unwrap();
        assert_eq!(dense.first(), Some(&points[0]));
        assert_eq!(dense.last(), Some(&points[3]));
        for w in dense.windows(2) {
            assert!((w[1] - w[0]).norm() <= 1.0 + 1e-9);
        }
    }

    #[test]
    fn test_densify_rejects_invalid_input() {
        assert!(densify(&[Point2::new(0.0, 0.0)], 1.0, PLANAR).is_err());
        assert!(densify(&[Point2::new(0.0, 0.0), Point2::new(1.0, 0.0)], 0.0, PLANAR).is_err());
    }
}
