// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! XSection Processing
//!
//! The per-layer stages of the cross-section pipeline and the bounded worker
//! pool that runs geology off the caller's thread:
//!
//! - [`topography`]: master elevation profile sampled from a raster
//! - [`geology`]: outcrop polygon intersection snapped to the master profile
//! - [`structure`]: dip/strike projection with apparent dip
//! - [`drillhole`]: tangential desurvey, trace and interval projection
//! - [`parallel`]: chunked fan-out/fan-in over a rayon pool

pub mod drillhole;
pub mod geology;
pub mod parallel;
pub mod structure;
pub mod topography;

pub use drillhole::{
    desurvey, position_at, project_drillholes, DrillholeOptions, DrillholeProjection,
    DEFAULT_DESURVEY_STEP,
};
pub use geology::{chunk_commands, intersect_chunk, GeologyContext};
pub use parallel::{
    BatchOutcome, ChunkCommand, ChunkOutput, CompletionCallback, ParallelCoordinator, TaskHandle,
    MAX_WORKERS,
};
pub use structure::{apparent_dip, project_structures, within_buffer, BufferOptions, StructureProjection};
pub use topography::{
    interpolate_elevation, sample_profile, SampledTopography, TopographyOptions, NODATA_ELEVATION,
};
