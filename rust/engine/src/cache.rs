// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Single-entry result cache with generation-guarded upgrades.
//!
//! The cache holds one authoritative bundle. A miss replaces it and bumps the
//! generation; asynchronous geology carries the [`GenerationTicket`] it was
//! dispatched with and is merged only while that ticket is still current.

use std::sync::{Arc, Mutex, MutexGuard};

use xsection_core::{
    CoordinateSystem, Diagnostic, GeologySegment, GeologyStatus, ProfileBundle, Result,
};
use xxhash_rust::xxh3::xxh3_64;

use crate::request::ProfileParams;

/// Hash of the numerically relevant request parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey(u64);

impl CacheKey {
    /// Key over the numerically relevant fields of `params`; display options
    /// never reach here
    pub fn from_params(params: &ProfileParams) -> Self {
        let mut enc = KeyEncoder::default();
        enc.bytes(b"xsection-profile/1");

        match params.section.crs() {
            CoordinateSystem::Projected { epsg } => {
                enc.u64(0);
                enc.opt_u64(epsg.map(u64::from));
            }
            CoordinateSystem::Geographic { epsg } => {
                enc.u64(1);
                enc.opt_u64(epsg.map(u64::from));
            }
        }
        let vertices = params.section.vertices();
        enc.u64(vertices.len() as u64);
        for v in vertices {
            enc.f64(v.x);
            enc.f64(v.y);
        }

        enc.str(&params.sources);
        enc.opt_f64(params.topography.interval);
        enc.u64(params.topography.band as u64);
        // Cap resolution only shapes the display footprint
        enc.f64(params.buffer.width);
        enc.f64(params.desurvey_step);
        enc.opt_f64(params.max_depth);
        enc.u64(params.include_geology as u64);
        // The label field only matters when geology is produced
        if params.include_geology {
            enc.str(&params.lithology_field);
        }

        CacheKey(xxh3_64(&enc.buf))
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Canonical, length-prefixed byte encoding
#[derive(Default)]
struct KeyEncoder {
    buf: Vec<u8>,
}

impl KeyEncoder {
    fn bytes(&mut self, b: &[u8]) {
        self.u64(b.len() as u64);
        self.buf.extend_from_slice(b);
    }

    fn str(&mut self, s: &str) {
        self.bytes(s.as_bytes());
    }

    fn u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn f64(&mut self, v: f64) {
        // -0.0 == 0.0 and all NaNs collapse to one pattern
        let v = if v == 0.0 {
            0.0
        } else if v.is_nan() {
            f64::NAN
        } else {
            v
        };
        self.u64(v.to_bits());
    }

    fn opt_u64(&mut self, v: Option<u64>) {
        match v {
            Some(v) => {
                self.buf.push(1);
                self.u64(v);
            }
            None => self.buf.push(0),
        }
    }

    fn opt_f64(&mut self, v: Option<f64>) {
        match v {
            Some(v) => {
                self.buf.push(1);
                self.f64(v);
            }
            None => self.buf.push(0),
        }
    }
}

/// Proof of which cache generation a computation belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationTicket {
    key: CacheKey,
    generation: u64,
}

impl GenerationTicket {
    pub fn key(&self) -> CacheKey {
        self.key
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Result of [`ProfileCache::get_or_compute`]
#[derive(Debug, Clone)]
pub struct CacheLookup {
    pub bundle: Arc<ProfileBundle>,
    pub ticket: GenerationTicket,
    /// False when `compute` ran
    pub hit: bool,
}

/// Asynchronous geology result to merge into the cached bundle
#[derive(Debug, Clone)]
pub struct GeologyUpdate {
    pub segments: Vec<GeologySegment>,
    pub diagnostics: Vec<Diagnostic>,
    pub status: GeologyStatus,
}

/// Result of [`ProfileCache::upgrade`]
#[derive(Debug, Clone, PartialEq)]
pub enum UpgradeOutcome {
    /// Merged; the new authoritative bundle
    Applied(Arc<ProfileBundle>),
    /// The ticket was superseded; nothing changed
    Stale,
}

/// Cache counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub upgrades: u64,
    pub stale_rejections: u64,
}

#[derive(Debug)]
struct CacheEntry {
    key: CacheKey,
    generation: u64,
    bundle: Arc<ProfileBundle>,
}

impl CacheEntry {
    fn geology_in_flight(&self) -> bool {
        self.bundle.geology_status == GeologyStatus::Pending
    }
}

#[derive(Debug, Default)]
struct CacheState {
    entry: Option<CacheEntry>,
    generation: u64,
    stats: CacheStats,
}

/// The only shared mutable structure of the engine.
#[derive(Debug, Default)]
pub struct ProfileCache {
    state: Mutex<CacheState>,
}

impl ProfileCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        // A panic elsewhere never leaves the state half-written
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Return the bundle stored under `key`, or compute and store it.
    ///
    /// `compute` runs without the lock held. On a miss the new bundle
    /// replaces the previous entry, whatever its key, under a fresh
    /// generation. A failed compute leaves the cache untouched.
    ///
    /// An entry whose geology is still pending is not served: the request
    /// supersedes it, and the running geology is later rejected as stale.
    pub fn get_or_compute<F>(&self, key: CacheKey, compute: F) -> Result<CacheLookup>
    where
        F: FnOnce() -> Result<ProfileBundle>,
    {
        {
            let mut state = self.lock();
            let found = state
                .entry
                .as_ref()
                .filter(|entry| entry.key == key && !entry.geology_in_flight())
                .map(|entry| (Arc::clone(&entry.bundle), entry.generation));
            if let Some((bundle, generation)) = found {
                state.stats.hits += 1;
                tracing::debug!(key = key.value(), generation, "Profile cache hit");
                return Ok(CacheLookup {
                    bundle,
                    ticket: GenerationTicket { key, generation },
                    hit: true,
                });
            }
            if state.entry.as_ref().is_some_and(|entry| entry.key == key) {
                tracing::debug!(key = key.value(), "Superseding in-flight geology");
            }
            state.stats.misses += 1;
        }

        let bundle = Arc::new(compute()?);

        let mut state = self.lock();
        state.generation += 1;
        let generation = state.generation;
        state.entry = Some(CacheEntry {
            key,
            generation,
            bundle: Arc::clone(&bundle),
        });
        tracing::debug!(key = key.value(), generation, "Profile cache replaced");

        Ok(CacheLookup {
            bundle,
            ticket: GenerationTicket { key, generation },
            hit: false,
        })
    }

    /// Merge asynchronous geology into the entry `ticket` was issued for.
    ///
    /// Rejected as stale when that entry has since been replaced or
    /// invalidated.
    pub fn upgrade(&self, ticket: GenerationTicket, update: GeologyUpdate) -> UpgradeOutcome {
        let mut state = self.lock();
        let upgraded = match state.entry.as_mut() {
            Some(entry) if entry.key == ticket.key && entry.generation == ticket.generation => {
                let bundle = Arc::new(entry.bundle.with_geology(
                    update.segments,
                    update.diagnostics,
                    update.status,
                ));
                entry.bundle = Arc::clone(&bundle);
                Some(bundle)
            }
            _ => None,
        };

        match upgraded {
            Some(bundle) => {
                state.stats.upgrades += 1;
                tracing::debug!(generation = ticket.generation, "Geology merged into cached profile");
                UpgradeOutcome::Applied(bundle)
            }
            None => {
                state.stats.stale_rejections += 1;
                tracing::info!(
                    generation = ticket.generation,
                    current = state.generation,
                    "Discarding superseded geology result"
                );
                UpgradeOutcome::Stale
            }
        }
    }

    /// Drop the entry; outstanding tickets become stale
    pub fn invalidate(&self) {
        let mut state = self.lock();
        state.generation += 1;
        state.entry = None;
    }

    /// Current authoritative bundle, if any
    pub fn current(&self) -> Option<Arc<ProfileBundle>> {
        self.lock().entry.as_ref().map(|entry| Arc::clone(&entry.bundle))
    }

    /// Bundle for `ticket` if it is still the authoritative one
    pub fn bundle_for(&self, ticket: GenerationTicket) -> Option<Arc<ProfileBundle>> {
        self.lock()
            .entry
            .as_ref()
            .filter(|entry| entry.key == ticket.key && entry.generation == ticket.generation)
            .map(|entry| Arc::clone(&entry.bundle))
    }

    pub fn stats(&self) -> CacheStats {
        self.lock().stats
    }
}
