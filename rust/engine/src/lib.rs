// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # XSection Engine
//!
//! One request in, one [`ProfileBundle`] out. The [`ProfileController`]
//! samples topography and projects structures and drillholes synchronously,
//! hands geology to a bounded worker pool, and keeps the latest bundle in a
//! [`ProfileCache`] that asynchronous geology upgrades in place.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use xsection_engine::{EngineConfig, ProfileCache, ProfileController, ProfileParams,
//!     ProfileInputs, ProfileRequest};
//!
//! let config = EngineConfig::from_env();
//! let controller = ProfileController::new(config.clone(), Arc::new(ProfileCache::new()))?;
//! let params = ProfileParams::new(line, "dem-2024", &config);
//! let response = controller.generate_profile_data(&ProfileRequest::new(params, inputs))?;
//! if let Some(job) = &response.geology {
//!     let bundle = controller.wait_for_geology(job)?;
//! }
//! ```
//!
//! Downstream renderers can call [`simplify`] on any layer independently.

pub mod cache;
pub mod config;
pub mod controller;
pub mod error;
pub mod request;

pub use xsection_core::ProfileBundle;
pub use xsection_geometry::{simplify, simplify_with_tolerance, Polygon, SimplifyMode};

pub use cache::{
    CacheKey, CacheLookup, CacheStats, GenerationTicket, GeologyUpdate, ProfileCache,
    UpgradeOutcome,
};
pub use config::EngineConfig;
pub use controller::{GeologyJob, ProfileController, ProfileResponse};
pub use error::{Error, Result};
pub use request::{DisplayOptions, ProfileInputs, ProfileParams, ProfileRequest};
