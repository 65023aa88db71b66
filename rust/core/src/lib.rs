// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # XSection Core
//!
//! Shared data model for cross-section profile generation.
//!
//! ## Overview
//!
//! This crate holds everything the processing stages agree on:
//!
//! - **Section model**: [`SectionLine`], [`ProfilePoint`] and the master
//!   [`TopographicProfile`]
//! - **Outputs**: geology segments, structural measurements, drillhole traces
//!   and intervals, aggregated into an immutable [`ProfileBundle`]
//! - **Inputs**: the [`ElevationRaster`] collaborator trait and plain vector
//!   records (outcrop polygons, structure points, drillholes)
//! - **Orientation parsing**: numeric or cardinal/quadrant strike and dip text
//!   resolved once into normalized azimuths
//! - **Error taxonomy**: a single [`Error`] enum shared by every stage
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use xsection_core::{parse_azimuth, OrientationInput};
//!
//! let strike = parse_azimuth(&OrientationInput::from("N15W"))?;
//! assert_eq!(strike, 345.0);
//! ```
//!
//! ## Feature Flags
//!
//! - `serde`: Enable serialization support for the model types

pub mod attributes;
pub mod diagnostics;
pub mod error;
pub mod inputs;
pub mod model;
pub mod orientation;

pub use nalgebra::{Point2, Point3};

pub use attributes::{AttributeValue, Attributes};
pub use diagnostics::{Diagnostic, Severity, Stage};
pub use error::{Error, Result};
pub use inputs::{
    Drillhole, ElevationRaster, GridRaster, IntervalRecord, OutcropPolygon, StructurePoint,
    SurveyStation,
};
pub use model::{
    CoordinateSystem, DrillholeSectionPoint, DrillholeTrace, DrillholeTrajectoryPoint,
    GeologySegment, GeologyStatus, IntervalSegment, ProfileBundle, ProfilePoint, SectionLine,
    StructureMeasurement, TopographicProfile,
};
pub use orientation::{normalize_azimuth, parse_azimuth, parse_dip, Dip, OrientationInput};

/// Identifier of a vector feature supplied by a data provider
pub type FeatureId = u64;
