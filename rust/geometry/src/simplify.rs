// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Level-of-detail reduction for profile lines
//!
//! Ramer-Douglas-Peucker over `(distance, elevation)` pairs. Output is always
//! a subsequence of the input that keeps both endpoints.

use xsection_core::ProfilePoint;

/// Curvature weight: the sharpest bend gets a tolerance `1 / (1 + 9)` of base
const CURVATURE_WEIGHT: f64 = 9.0;

/// Tolerance strategy for [`simplify`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SimplifyMode {
    /// One tolerance for the whole line
    Fixed,
    /// Tighter tolerance where the line bends sharply
    #[default]
    Adaptive,
}

/// Reduce `points` towards `target_count` vertices.
///
/// The base tolerance is `x_range / (2 * target_count)`. Lines already at or
/// below the target are returned unchanged, and a target below 2 is treated
/// as 2. The result can still exceed the target: the tolerance is a shape
/// bound, not a vertex budget.
pub fn simplify(points: &[ProfilePoint], target_count: usize, mode: SimplifyMode) -> Vec<ProfilePoint> {
    let target = target_count.max(2);
    if points.len() <= target || points.len() <= 2 {
        return points.to_vec();
    }

    let (min_x, max_x) = points.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
        (lo.min(p.distance), hi.max(p.distance))
    });
    let base = (max_x - min_x) / (2.0 * target as f64);
    if !(base > 0.0) || !base.is_finite() {
        return points.to_vec();
    }

    let keep = match mode {
        SimplifyMode::Fixed => rdp(points, |_| base),
        SimplifyMode::Adaptive => {
            let tolerances = adaptive_tolerances(points, base);
            rdp(points, |i| tolerances[i])
        }
    };

    let reduced = collect_kept(points, &keep);
    tracing::trace!(
        input = points.len(),
        output = reduced.len(),
        tolerance = base,
        ?mode,
        "Simplified profile line"
    );
    reduced
}

/// Classic RDP with a single tolerance
pub fn simplify_with_tolerance(points: &[ProfilePoint], tolerance: f64) -> Vec<ProfilePoint> {
    if points.len() <= 2 || !(tolerance > 0.0) {
        return points.to_vec();
    }
    let keep = rdp(points, |_| tolerance);
    collect_kept(points, &keep)
}

/// Per-point tolerance scaled down by normalized turning angle
fn adaptive_tolerances(points: &[ProfilePoint], base: f64) -> Vec<f64> {
    let n = points.len();
    let mut curvature = vec![0.0; n];
    for i in 1..n - 1 {
        let (ax, ay) = (
            points[i].distance - points[i - 1].distance,
            points[i].elevation - points[i - 1].elevation,
        );
        let (bx, by) = (
            points[i + 1].distance - points[i].distance,
            points[i + 1].elevation - points[i].elevation,
        );
        let cross = ax * by - ay * bx;
        let dot = ax * bx + ay * by;
        if cross != 0.0 || dot != 0.0 {
            curvature[i] = cross.atan2(dot).abs();
        }
    }

    let max = curvature.iter().copied().fold(0.0, f64::max);
    curvature
        .into_iter()
        .map(|c| {
            let normalized = if max > 0.0 { c / max } else { 0.0 };
            base / (1.0 + CURVATURE_WEIGHT * normalized)
        })
        .collect()
}

/// Iterative RDP; `tolerance(i)` is the allowed deviation at vertex `i`.
///
/// A range is split at the vertex with the largest deviation/tolerance ratio
/// (first one wins on ties) when that ratio exceeds 1.
fn rdp(points: &[ProfilePoint], tolerance: impl Fn(usize) -> f64) -> Vec<bool> {
    let n = points.len();
    let mut keep = vec![false; n];
    keep[0] = true;
    keep[n - 1] = true;

    let mut stack = vec![(0usize, n - 1)];
    while let Some((start, end)) = stack.pop() {
        if end <= start + 1 {
            continue;
        }

        let mut worst = 0.0;
        let mut split = None;
        for i in (start + 1)..end {
            let ratio = deviation(&points[i], &points[start], &points[end]) / tolerance(i);
            if ratio > worst {
                worst = ratio;
                split = Some(i);
            }
        }

        if let Some(i) = split.filter(|_| worst > 1.0) {
            keep[i] = true;
            stack.push((i, end));
            stack.push((start, i));
        }
    }
    keep
}

/// Perpendicular distance from `p` to the chord `a`-`b`
fn deviation(p: &ProfilePoint, a: &ProfilePoint, b: &ProfilePoint) -> f64 {
    let (dx, dy) = (b.distance - a.distance, b.elevation - a.elevation);
    let (px, py) = (p.distance - a.distance, p.elevation - a.elevation);
    let len = dx.hypot(dy);
    if len == 0.0 {
        px.hypot(py)
    } else {
        (dx * py - dy * px).abs() / len
    }
}

fn collect_kept(points: &[ProfilePoint], keep: &[bool]) -> Vec<ProfilePoint> {
    points
        .iter()
        .zip(keep)
        .filter(|&(_, &k)| k)
        .map(|(p, _)| *p)
        .collect()
}
