// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Request-level facade composing the pipeline stages.
//!
//! Topography, structures and drillholes run on the caller's thread. Geology
//! is chunked onto the worker pool; its completion callback merges into the
//! cache through the ticket issued for this request, so a superseded run can
//! never overwrite a newer bundle.

use std::sync::Arc;

use xsection_core::{
    Diagnostic, GeologySegment, GeologyStatus, ProfileBundle, ProfilePoint, Stage,
};
use xsection_geometry::{buffer, simplify, Polygon, PreparedSection, SimplifyMode};
use xsection_processing::{
    chunk_commands, project_drillholes, project_structures, sample_profile, BatchOutcome,
    GeologyContext, ParallelCoordinator, TaskHandle,
};

use crate::cache::{CacheKey, GenerationTicket, GeologyUpdate, ProfileCache, UpgradeOutcome};
use crate::config::EngineConfig;
use crate::error::Result;
use crate::request::{DisplayOptions, ProfileParams, ProfileRequest};

/// Geology still running for a cached bundle
#[derive(Debug)]
pub struct GeologyJob {
    ticket: GenerationTicket,
    handle: TaskHandle<GeologySegment>,
}

impl GeologyJob {
    pub fn ticket(&self) -> GenerationTicket {
        self.ticket
    }

    /// Number of outcrop chunks dispatched
    pub fn chunk_count(&self) -> usize {
        self.handle.chunk_count()
    }
}

/// Response of [`ProfileController::generate_profile_data`]
#[derive(Debug)]
pub struct ProfileResponse {
    /// Synchronous layers complete; geology may still be pending
    pub bundle: Arc<ProfileBundle>,
    pub ticket: GenerationTicket,
    /// True when served from the cache
    pub cached: bool,
    /// Present only when this call dispatched geology. A cached bundle never
    /// has geology pending.
    pub geology: Option<GeologyJob>,
}

/// Composes the profile stages behind one call, wired through the cache and
/// the worker pool.
#[derive(Debug)]
pub struct ProfileController {
    config: EngineConfig,
    cache: Arc<ProfileCache>,
    coordinator: ParallelCoordinator,
}

impl ProfileController {
    pub fn new(config: EngineConfig, cache: Arc<ProfileCache>) -> Result<Self> {
        config.validate()?;
        let coordinator = ParallelCoordinator::new(config.max_workers)?;
        Ok(Self {
            config,
            cache,
            coordinator,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<ProfileCache> {
        &self.cache
    }

    /// Produce the bundle for `request`, from the cache when possible.
    ///
    /// Returns once every synchronous layer is done. Only a failure on the
    /// section line or the raster is returned as an error; per-feature
    /// problems end up in the bundle's diagnostics.
    pub fn generate_profile_data(&self, request: &ProfileRequest) -> Result<ProfileResponse> {
        request.params.validate()?;
        let key = CacheKey::from_params(&request.params);

        let mut geology_context = None;
        let lookup = self.cache.get_or_compute(key, || {
            let (bundle, context) = self.compute_synchronous(request)?;
            geology_context = context;
            Ok(bundle)
        })?;

        let geology = match geology_context {
            Some(context) if !lookup.hit => Some(self.dispatch_geology(request, context, lookup.ticket)),
            _ => None,
        };

        tracing::info!(
            key = key.value(),
            cached = lookup.hit,
            geology_pending = geology.is_some(),
            "Profile generated"
        );

        Ok(ProfileResponse {
            bundle: lookup.bundle,
            ticket: lookup.ticket,
            cached: lookup.hit,
            geology,
        })
    }

    /// Recompute even when the key is cached; geology still in flight for the
    /// previous entry is discarded when it completes.
    pub fn regenerate(&self, request: &ProfileRequest) -> Result<ProfileResponse> {
        self.cache.invalidate();
        self.generate_profile_data(request)
    }

    /// Block until `job` finishes, at most `geology_timeout`.
    ///
    /// Returns the upgraded bundle, or `None` when a newer request superseded
    /// the one that dispatched `job`.
    pub fn wait_for_geology(&self, job: &GeologyJob) -> Result<Option<Arc<ProfileBundle>>> {
        job.handle.wait_timeout(self.config.geology_timeout)?;
        // The completion callback has already run by the time the outcome
        // is delivered
        Ok(self.cache.bundle_for(job.ticket))
    }

    /// Reduce a displayed line to the requested point budget
    pub fn simplify_for_display(
        &self,
        points: &[ProfilePoint],
        display: &DisplayOptions,
    ) -> Vec<ProfilePoint> {
        let target = display.lod_target.unwrap_or(self.config.default_lod_points);
        simplify(points, target, SimplifyMode::Adaptive)
    }

    /// Buffer footprint around the section, for map display
    pub fn section_buffer(&self, params: &ProfileParams) -> Result<Polygon> {
        params.validate()?;
        Ok(buffer(&params.section, params.buffer.width, params.buffer.segments)?)
    }

    fn compute_synchronous(
        &self,
        request: &ProfileRequest,
    ) -> Result<(ProfileBundle, Option<GeologyContext>)> {
        let params = &request.params;
        let inputs = &request.inputs;
        let section = PreparedSection::new(&params.section);

        // Fatal: nothing can be drawn without the master profile
        let topography = sample_profile(&section, inputs.raster.as_ref(), &params.topography)?;
        let mut diagnostics = topography.diagnostics;
        let profile = topography.profile;

        let structures = match project_structures(
            &section,
            &profile,
            &inputs.structures,
            &params.buffer,
        ) {
            Ok(projection) => {
                diagnostics.extend(projection.diagnostics);
                projection.measurements
            }
            Err(err) => {
                tracing::warn!(error = %err, "Structure layer failed");
                diagnostics.push(Diagnostic::error(Stage::Structure, err.to_string()));
                Vec::new()
            }
        };

        let (drillhole_traces, intervals) =
            match project_drillholes(&section, &inputs.drillholes, &params.drillhole_options()) {
                Ok(projection) => {
                    diagnostics.extend(projection.diagnostics);
                    (projection.traces, projection.intervals)
                }
                Err(err) => {
                    tracing::warn!(error = %err, "Drillhole layer failed");
                    diagnostics.push(Diagnostic::error(Stage::Drillhole, err.to_string()));
                    (Vec::new(), Vec::new())
                }
            };

        let (geology_status, context) = if !params.include_geology {
            (GeologyStatus::Skipped, None)
        } else if inputs.outcrops.is_empty() {
            (GeologyStatus::Complete, None)
        } else {
            let context = GeologyContext {
                section: Arc::new(section.clone()),
                topography: Arc::new(profile.clone()),
                lithology_field: params.lithology_field.clone(),
            };
            (GeologyStatus::Pending, Some(context))
        };

        let bundle = ProfileBundle {
            section_length: section.length(),
            section_azimuth: section.azimuth(),
            topography: profile,
            geology: Vec::new(),
            geology_status,
            structures,
            drillhole_traces,
            intervals,
            diagnostics,
        };
        Ok((bundle, context))
    }

    fn dispatch_geology(
        &self,
        request: &ProfileRequest,
        context: GeologyContext,
        ticket: GenerationTicket,
    ) -> GeologyJob {
        let chunks =
            ParallelCoordinator::partition(request.inputs.outcrops.clone(), self.config.chunk_size);
        let commands = chunk_commands(&context, chunks);
        let cache = Arc::clone(&self.cache);

        let handle = self
            .coordinator
            .dispatch_with_callback(commands, move |outcome: &BatchOutcome<GeologySegment>| {
                match cache.upgrade(ticket, geology_update(outcome)) {
                    UpgradeOutcome::Applied(bundle) => tracing::debug!(
                        segments = bundle.geology.len(),
                        failed_chunks = outcome.failed_chunks(),
                        "Geology layer merged"
                    ),
                    UpgradeOutcome::Stale => tracing::debug!(
                        generation = ticket.generation(),
                        "Geology finished for a superseded request"
                    ),
                }
            });

        GeologyJob { ticket, handle }
    }
}

/// Convert an aggregate batch into a cache update; failed chunks become
/// error diagnostics and a partial status
fn geology_update(outcome: &BatchOutcome<GeologySegment>) -> GeologyUpdate {
    let mut diagnostics = outcome.diagnostics.clone();
    diagnostics.extend(
        outcome
            .errors
            .iter()
            .map(|err| Diagnostic::error(Stage::Worker, err.to_string())),
    );
    let status = if outcome.is_complete() {
        GeologyStatus::Complete
    } else {
        GeologyStatus::Partial {
            failed_chunks: outcome.failed_chunks(),
        }
    };
    GeologyUpdate {
        segments: outcome.items.clone(),
        diagnostics,
        status,
    }
}
