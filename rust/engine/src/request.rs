// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Profile request types.
//!
//! A request separates the parameters that change numeric output (hashed
//! into the cache key) from display options that never do, and from the
//! input records themselves.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use xsection_core::{
    Drillhole, ElevationRaster, Error, OutcropPolygon, Result, SectionLine, StructurePoint,
};
use xsection_processing::{BufferOptions, DrillholeOptions, TopographyOptions};

use crate::config::EngineConfig;

/// Attribute read for the geology label when none is configured
pub const DEFAULT_LITHOLOGY_FIELD: &str = "lithology";

/// Parameters that determine the numeric content of a bundle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileParams {
    pub section: SectionLine,
    /// Identity of the input data snapshot (provider layer ids, revisions).
    /// Must change whenever the records passed in [`ProfileInputs`] change.
    pub sources: String,
    pub topography: TopographyOptions,
    /// Shared by structures and drillholes
    pub buffer: BufferOptions,
    pub desurvey_step: f64,
    pub max_depth: Option<f64>,
    pub lithology_field: String,
    pub include_geology: bool,
}

impl ProfileParams {
    /// Parameters with engine defaults
    pub fn new(section: SectionLine, sources: impl Into<String>, config: &EngineConfig) -> Self {
        Self {
            section,
            sources: sources.into(),
            topography: TopographyOptions::default(),
            buffer: BufferOptions {
                segments: config.buffer_segments,
                ..BufferOptions::default()
            },
            desurvey_step: config.desurvey_step,
            max_depth: None,
            lithology_field: DEFAULT_LITHOLOGY_FIELD.to_string(),
            include_geology: true,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.buffer.width > 0.0) || !self.buffer.width.is_finite() {
            return Err(Error::InvalidParameter(format!(
                "buffer width must be positive, got {}",
                self.buffer.width
            )));
        }
        if self.buffer.segments == 0 {
            return Err(Error::InvalidParameter(
                "buffer segments must be positive".to_string(),
            ));
        }
        if !(self.desurvey_step > 0.0) || !self.desurvey_step.is_finite() {
            return Err(Error::InvalidParameter(format!(
                "desurvey step must be positive, got {}",
                self.desurvey_step
            )));
        }
        if self.include_geology && self.lithology_field.trim().is_empty() {
            return Err(Error::InvalidParameter(
                "lithology field is required when geology is requested".to_string(),
            ));
        }
        Ok(())
    }

    pub(crate) fn drillhole_options(&self) -> DrillholeOptions {
        DrillholeOptions {
            buffer_width: self.buffer.width,
            step: self.desurvey_step,
            max_depth: self.max_depth,
        }
    }
}

/// Cosmetic options; never part of the cache key
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplayOptions {
    pub vertical_exaggeration: f64,
    /// Point budget per displayed line; the engine default when `None`
    pub lod_target: Option<usize>,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self {
            vertical_exaggeration: 1.0,
            lod_target: None,
        }
    }
}

/// Records supplied by the data providers
#[derive(Clone)]
pub struct ProfileInputs {
    pub raster: Arc<dyn ElevationRaster>,
    pub outcrops: Vec<OutcropPolygon>,
    pub structures: Vec<StructurePoint>,
    pub drillholes: Vec<Drillhole>,
}

impl ProfileInputs {
    pub fn new(raster: Arc<dyn ElevationRaster>) -> Self {
        Self {
            raster,
            outcrops: Vec::new(),
            structures: Vec::new(),
            drillholes: Vec::new(),
        }
    }
}

impl fmt::Debug for ProfileInputs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProfileInputs")
            .field("raster_resolution", &self.raster.resolution())
            .field("outcrops", &self.outcrops.len())
            .field("structures", &self.structures.len())
            .field("drillholes", &self.drillholes.len())
            .finish()
    }
}

/// One call to the controller
#[derive(Debug, Clone)]
pub struct ProfileRequest {
    pub params: ProfileParams,
    pub display: DisplayOptions,
    pub inputs: ProfileInputs,
}

impl ProfileRequest {
    pub fn new(params: ProfileParams, inputs: ProfileInputs) -> Self {
        Self {
            params,
            display: DisplayOptions::default(),
            inputs,
        }
    }
}
