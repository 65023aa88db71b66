// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use approx::assert_abs_diff_eq;
use xsection_core::{CoordinateSystem, ProfilePoint, SectionLine};
use xsection_geometry::{
    buffer, densify, distance_along_line, perpendicular_offset, simplify, Point2, PreparedSection,
    SimplifyMode,
};

fn dogleg() -> SectionLine {
    SectionLine::new(
        vec![
            Point2::new(0.0, 0.0),
            Point2::new(100.0, 0.0),
            Point2::new(100.0, 80.0),
        ],
        CoordinateSystem::Projected { epsg: Some(32633) },
    )
    .unwrap()
}

#[test]
fn buffer_contains_densified_line() {
    let line = dogleg();
    let polygon = buffer(&line, 15.0, 8).unwrap();
    let dense = densify(line.vertices(), 2.5, line.crs()).unwrap();
    assert!(dense.len() > 70);
    for p in &dense {
        assert!(polygon.contains(p), "{:?} outside buffer", p);
    }
    assert!(!polygon.contains(&Point2::new(50.0, 40.0)));
}

#[test]
fn measures_follow_the_polyline() {
    let line = dogleg();
    assert_abs_diff_eq!(
        distance_along_line(&line, Point2::new(103.0, 30.0)),
        130.0,
        epsilon = 1e-9
    );
    // Right of the northward leg
    assert_abs_diff_eq!(
        perpendicular_offset(&line, Point2::new(103.0, 30.0)),
        -3.0,
        epsilon = 1e-9
    );

    let section = PreparedSection::new(&line);
    assert_abs_diff_eq!(section.length(), 180.0, epsilon = 1e-9);
    let p = section.point_at(150.0);
    assert_abs_diff_eq!(p.x, 100.0, epsilon = 1e-9);
    assert_abs_diff_eq!(p.y, 50.0, epsilon = 1e-9);
}

#[test]
fn simplified_profile_keeps_endpoints() {
    let points: Vec<ProfilePoint> = (0..=500)
        .map(|i| {
            let d = i as f64;
            ProfilePoint::new(d, 300.0 + 25.0 * (d / 30.0).sin() + (d / 3.0).cos())
        })
        .collect();
    for mode in [SimplifyMode::Fixed, SimplifyMode::Adaptive] {
        let out = simplify(&points, 40, mode);
        assert!(out.len() <= points.len());
        assert!(out.len() < points.len());
        assert_eq!(out.first(), points.first());
        assert_eq!(out.last(), points.last());
        assert!(out.iter().all(|p| points.contains(p)));
    }
}
