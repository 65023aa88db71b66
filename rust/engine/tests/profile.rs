// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end profile generation through the controller and cache.

use std::sync::Arc;

use approx::assert_abs_diff_eq;
use xsection_core::{
    AttributeValue, Attributes, CoordinateSystem, Drillhole, Error as CoreError, GeologyStatus,
    GridRaster, IntervalRecord, OrientationInput, OutcropPolygon, Point2, Point3, ProfileBundle,
    SectionLine, StructurePoint,
};
use xsection_engine::{
    CacheKey, DisplayOptions, EngineConfig, Error, ProfileCache, ProfileController,
    ProfileInputs, ProfileParams, ProfileRequest,
};

fn config() -> EngineConfig {
    EngineConfig {
        max_workers: 2,
        chunk_size: 1,
        ..EngineConfig::default()
    }
}

fn controller() -> ProfileController {
    ProfileController::new(config(), Arc::new(ProfileCache::new())).unwrap()
}

fn section() -> SectionLine {
    SectionLine::new(
        vec![Point2::new(0.0, 0.0), Point2::new(200.0, 0.0)],
        CoordinateSystem::default(),
    )
    .unwrap()
}

fn outcrop(id: u64, x0: f64, x1: f64, unit: &str) -> OutcropPolygon {
    let mut attributes = Attributes::new();
    attributes.insert("lithology".to_string(), AttributeValue::from(unit));
    OutcropPolygon::new(
        id,
        vec![
            Point2::new(x0, -30.0),
            Point2::new(x1, -30.0),
            Point2::new(x1, 30.0),
            Point2::new(x0, 30.0),
        ],
        attributes,
    )
}

fn inputs() -> ProfileInputs {
    // 5 m grid over x -10..240, y -60..60, rising eastward
    let raster =
        GridRaster::from_fn(Point2::new(-10.0, 60.0), 5.0, 50, 24, |x, _| 100.0 + x / 10.0)
            .unwrap();

    let mut hole = Drillhole::new("DH-7", Point3::new(100.0, -3.0, 110.0));
    hole.total_depth = Some(30.0);
    hole.intervals = vec![IntervalRecord::new(0.0, 30.0, "Granite")];

    ProfileInputs {
        raster: Arc::new(raster),
        outcrops: vec![
            outcrop(1, 20.0, 60.0, "Sandstone"),
            outcrop(2, 60.0, 140.0, "Shale"),
            outcrop(3, 140.0, 180.0, "Limestone"),
        ],
        structures: vec![
            StructurePoint {
                id: 10,
                location: Point2::new(50.0, 5.0),
                dip: OrientationInput::Numeric(30.0),
                strike: OrientationInput::from("N90E"),
                attributes: Attributes::new(),
            },
            StructurePoint {
                id: 11,
                location: Point2::new(120.0, 50.0),
                dip: OrientationInput::Numeric(60.0),
                strike: OrientationInput::Numeric(0.0),
                attributes: Attributes::new(),
            },
        ],
        drillholes: vec![hole],
    }
}

fn request() -> ProfileRequest {
    let mut params = ProfileParams::new(section(), "fixture-1", &config());
    params.buffer.width = 20.0;
    ProfileRequest::new(params, inputs())
}

fn assert_geology_on_topography(bundle: &ProfileBundle) {
    for segment in &bundle.geology {
        for p in &segment.points {
            let z = bundle.topography.interpolate(p.distance).unwrap();
            assert_abs_diff_eq!(p.elevation, z, epsilon = 1e-9);
        }
    }
}

#[test]
fn test_end_to_end_profile() {
    let controller = controller();
    let response = controller.generate_profile_data(&request()).unwrap();
    assert!(!response.cached);

    let bundle = &response.bundle;
    assert_abs_diff_eq!(bundle.section_length, 200.0, epsilon = 1e-9);
    assert_abs_diff_eq!(bundle.section_azimuth, 90.0, epsilon = 1e-9);
    assert_eq!(bundle.topography.points.len(), 41);
    assert_eq!(bundle.geology_status, GeologyStatus::Pending);
    assert!(bundle.geology.is_empty());

    // Structure 11 is 50 m off the section
    assert_eq!(bundle.structures.len(), 1);
    assert_eq!(bundle.structures[0].feature_id, 10);
    assert_abs_diff_eq!(bundle.structures[0].apparent_dip, 30.0, epsilon = 1e-9);

    assert_eq!(bundle.drillhole_traces.len(), 1);
    let trace = &bundle.drillhole_traces[0];
    assert_eq!(trace.points.len(), 31);
    assert_abs_diff_eq!(trace.points[30].elevation, 80.0, epsilon = 1e-9);
    assert_eq!(bundle.intervals.len(), 1);

    let job = response.geology.as_ref().unwrap();
    assert_eq!(job.chunk_count(), 3);
    let upgraded = controller.wait_for_geology(job).unwrap().unwrap();
    assert_eq!(upgraded.geology_status, GeologyStatus::Complete);
    let units: Vec<&str> = upgraded.geology.iter().map(|g| g.lithology.as_str()).collect();
    assert_eq!(units, vec!["Sandstone", "Shale", "Limestone"]);
    assert_geology_on_topography(&upgraded);

    // Synchronous layers are carried over unchanged
    assert_eq!(upgraded.topography, bundle.topography);
    assert_eq!(upgraded.structures, bundle.structures);
    assert_eq!(upgraded.intervals, bundle.intervals);
}

#[test]
fn test_repeat_request_hits_cache() {
    let controller = controller();
    let first = controller.generate_profile_data(&request()).unwrap();
    let upgraded = controller
        .wait_for_geology(first.geology.as_ref().unwrap())
        .unwrap()
        .unwrap();

    // Display options are not part of the key
    let mut again = request();
    again.display = DisplayOptions {
        vertical_exaggeration: 3.0,
        lod_target: Some(10),
    };
    let second = controller.generate_profile_data(&again).unwrap();
    assert!(second.cached);
    assert!(second.geology.is_none());
    assert!(Arc::ptr_eq(&second.bundle, &upgraded));
    assert_eq!(second.ticket, first.ticket);

    let stats = controller.cache().stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.upgrades, 1);
}

#[test]
fn test_repeat_request_during_geology_gets_its_own_job() {
    let controller = controller();
    let first = controller.generate_profile_data(&request()).unwrap();
    let second = controller.generate_profile_data(&request()).unwrap();

    // A pending bundle always comes with a job to wait on
    assert!(second.geology.is_some() || second.bundle.geology_status != GeologyStatus::Pending);

    match second.geology.as_ref() {
        Some(job) => {
            assert!(!second.cached);
            assert_eq!(job.ticket(), second.ticket);
            assert!(second.ticket.generation() > first.ticket.generation());
            let old = controller
                .wait_for_geology(first.geology.as_ref().unwrap())
                .unwrap();
            assert!(old.is_none());
            let new = controller.wait_for_geology(job).unwrap().unwrap();
            assert_eq!(new.geology.len(), 3);
            assert!(Arc::ptr_eq(&controller.cache().current().unwrap(), &new));
        }
        // First geology landed before the second call
        None => {
            assert!(second.cached);
            assert_eq!(second.ticket, first.ticket);
            assert_eq!(second.bundle.geology.len(), 3);
        }
    }
}

#[test]
fn test_regenerate_supersedes_in_flight_geology() {
    let controller = controller();
    let first = controller.generate_profile_data(&request()).unwrap();
    let second = controller.regenerate(&request()).unwrap();
    assert!(!second.cached);
    assert_ne!(first.ticket, second.ticket);
    assert_eq!(first.ticket.key(), second.ticket.key());

    // The first run finishes but can no longer land in the cache
    let old = controller
        .wait_for_geology(first.geology.as_ref().unwrap())
        .unwrap();
    assert!(old.is_none());

    let new = controller
        .wait_for_geology(second.geology.as_ref().unwrap())
        .unwrap()
        .unwrap();
    assert_eq!(new.geology.len(), 3);
    assert!(Arc::ptr_eq(&controller.cache().current().unwrap(), &new));
}

#[test]
fn test_changed_parameter_replaces_entry() {
    let controller = controller();
    let first = controller.generate_profile_data(&request()).unwrap();

    let mut narrower = request();
    narrower.params.buffer.width = 2.0;
    assert_ne!(
        CacheKey::from_params(&narrower.params),
        CacheKey::from_params(&request().params)
    );
    let second = controller.generate_profile_data(&narrower).unwrap();
    assert!(!second.cached);
    // Hole DH-7 is 3 m off the section
    assert!(second.bundle.drillhole_traces.is_empty());

    assert!(controller
        .wait_for_geology(first.geology.as_ref().unwrap())
        .unwrap()
        .is_none());
}

#[test]
fn test_raster_outside_section_aborts() {
    let controller = controller();
    let mut request = request();
    request.inputs.raster = Arc::new(
        GridRaster::from_fn(Point2::new(5000.0, 5000.0), 5.0, 4, 4, |_, _| 1.0).unwrap(),
    );
    let err = controller.generate_profile_data(&request).unwrap_err();
    assert!(matches!(err, Error::Core(CoreError::DataUnavailable(_))));
    assert!(controller.cache().current().is_none());
}

#[test]
fn test_invalid_parameters_rejected() {
    let controller = controller();
    let mut request = request();
    request.params.buffer.width = -1.0;
    assert!(matches!(
        controller.generate_profile_data(&request),
        Err(Error::Core(CoreError::InvalidParameter(_)))
    ));
}

#[test]
fn test_geology_not_requested() {
    let controller = controller();
    let mut request = request();
    request.params.include_geology = false;
    let response = controller.generate_profile_data(&request).unwrap();
    assert_eq!(response.bundle.geology_status, GeologyStatus::Skipped);
    assert!(response.geology.is_none());
}

#[test]
fn test_broken_outcrop_reported_not_fatal() {
    let controller = controller();
    let mut request = request();
    request.inputs.outcrops.push(OutcropPolygon::new(
        99,
        vec![Point2::new(0.0, 0.0), Point2::new(1.0, 1.0)],
        Attributes::new(),
    ));
    let response = controller.generate_profile_data(&request).unwrap();
    let bundle = controller
        .wait_for_geology(response.geology.as_ref().unwrap())
        .unwrap()
        .unwrap();
    assert_eq!(bundle.geology.len(), 3);
    assert_eq!(bundle.geology_status, GeologyStatus::Complete);
    assert!(bundle.has_errors());
    assert!(bundle
        .diagnostics
        .iter()
        .any(|d| d.subject.as_deref() == Some("99")));
}

#[test]
fn test_simplify_for_display() {
    let controller = controller();
    let response = controller.generate_profile_data(&request()).unwrap();
    let points = &response.bundle.topography.points;
    let display = DisplayOptions {
        vertical_exaggeration: 1.0,
        lod_target: Some(5),
    };
    let reduced = controller.simplify_for_display(points, &display);
    assert!(reduced.len() <= points.len());
    assert_eq!(reduced.first(), points.first());
    assert_eq!(reduced.last(), points.last());
}

#[test]
fn test_bundle_serializes_for_exporters() {
    let controller = controller();
    let response = controller.generate_profile_data(&request()).unwrap();
    let bundle = controller
        .wait_for_geology(response.geology.as_ref().unwrap())
        .unwrap()
        .unwrap();

    let json = serde_json::to_string(&*bundle).unwrap();
    assert!(json.contains("\"geology_status\""));
    assert!(json.contains("DH-7"));
    let back: ProfileBundle = serde_json::from_str(&json).unwrap();
    assert_eq!(back.geology.len(), bundle.geology.len());
    assert_eq!(back.intervals.len(), bundle.intervals.len());
    assert_eq!(back.geology_status, GeologyStatus::Complete);
    assert_eq!(back.drillhole_traces[0].hole_id, "DH-7");
}

#[test]
fn test_params_deserialize_through_section_validation() {
    let params = request().params;
    let json = serde_json::to_string(&params).unwrap();
    let back: ProfileParams = serde_json::from_str(&json).unwrap();
    assert_eq!(back.section, params.section);

    let mut value: serde_json::Value = serde_json::from_str(&json).unwrap();
    value["section"]["vertices"] = serde_json::json!([]);
    let err = serde_json::from_value::<ProfileParams>(value.clone()).unwrap_err();
    assert!(err.to_string().contains("at least 2 distinct vertices"));

    value["section"]["vertices"] = serde_json::json!([[5.0, 5.0], [5.0, 5.0]]);
    assert!(serde_json::from_value::<ProfileParams>(value).is_err());
}

#[test]
fn test_section_buffer_footprint() {
    let controller = controller();
    let params = request().params;
    let footprint = controller.section_buffer(&params).unwrap();
    assert!(footprint.contains(&Point2::new(100.0, 19.0)));
    assert!(footprint.contains(&Point2::new(-15.0, 0.0)));
    assert!(!footprint.contains(&Point2::new(100.0, 25.0)));
}
