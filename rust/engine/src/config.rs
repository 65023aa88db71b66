// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Engine configuration loaded from environment variables.

use std::str::FromStr;
use std::time::Duration;

use xsection_processing::{DEFAULT_DESURVEY_STEP, MAX_WORKERS};

use crate::error::{Error, Result};

/// Outcrop polygons per geology chunk
pub const DEFAULT_CHUNK_SIZE: usize = 64;

/// Chords per quarter circle on buffer caps
pub const DEFAULT_BUFFER_SEGMENTS: usize = 8;

/// Bounded wait for asynchronous geology
pub const DEFAULT_GEOLOGY_TIMEOUT: Duration = Duration::from_secs(30);

/// Display point budget when a caller gives no LOD target
pub const DEFAULT_LOD_POINTS: usize = 2000;

/// Engine configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Geology worker threads, never more than 8.
    pub max_workers: usize,
    /// Outcrop polygons handed to one worker at a time.
    pub chunk_size: usize,
    /// Default drillhole desurvey step.
    pub desurvey_step: f64,
    /// Buffer cap resolution.
    pub buffer_segments: usize,
    /// Upper bound for [`wait_for_geology`](crate::ProfileController::wait_for_geology).
    pub geology_timeout: Duration,
    /// Point budget for display simplification.
    pub default_lod_points: usize,
}

impl EngineConfig {
    /// Load configuration from environment variables.
    ///
    /// Missing or unparsable values fall back to the built-in defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            max_workers: parse_or(&lookup, "XSECTION_MAX_WORKERS", defaults.max_workers)
                .clamp(1, MAX_WORKERS),
            chunk_size: parse_or(&lookup, "XSECTION_CHUNK_SIZE", defaults.chunk_size).max(1),
            desurvey_step: Some(parse_or(&lookup, "XSECTION_DESURVEY_STEP", defaults.desurvey_step))
                .filter(|step| *step > 0.0 && step.is_finite())
                .unwrap_or(defaults.desurvey_step),
            buffer_segments: parse_or(&lookup, "XSECTION_BUFFER_SEGMENTS", defaults.buffer_segments)
                .max(1),
            geology_timeout: Duration::from_secs(
                parse_or(
                    &lookup,
                    "XSECTION_GEOLOGY_TIMEOUT_SECS",
                    defaults.geology_timeout.as_secs(),
                )
                .max(1),
            ),
            default_lod_points: parse_or(&lookup, "XSECTION_LOD_POINTS", defaults.default_lod_points)
                .max(2),
        }
    }

    /// Reject configurations the controller cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.max_workers == 0 || self.max_workers > MAX_WORKERS {
            return Err(Error::Config(format!(
                "max_workers must be in 1..={}, got {}",
                MAX_WORKERS, self.max_workers
            )));
        }
        if self.chunk_size == 0 {
            return Err(Error::Config("chunk_size must be positive".to_string()));
        }
        if !(self.desurvey_step > 0.0) || !self.desurvey_step.is_finite() {
            return Err(Error::Config(format!(
                "desurvey_step must be positive, got {}",
                self.desurvey_step
            )));
        }
        if self.buffer_segments == 0 {
            return Err(Error::Config("buffer_segments must be positive".to_string()));
        }
        if self.geology_timeout.is_zero() {
            return Err(Error::Config("geology_timeout must be positive".to_string()));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_workers: num_cpus::get().clamp(1, MAX_WORKERS),
            chunk_size: DEFAULT_CHUNK_SIZE,
            desurvey_step: DEFAULT_DESURVEY_STEP,
            buffer_segments: DEFAULT_BUFFER_SEGMENTS,
            geology_timeout: DEFAULT_GEOLOGY_TIMEOUT,
            default_lod_points: DEFAULT_LOD_POINTS,
        }
    }
}

fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    lookup(key)
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_environment() {
        let config = EngineConfig::from_lookup(|_| None);
        assert_eq!(config, EngineConfig::default());
        assert!(config.max_workers >= 1 && config.max_workers <= MAX_WORKERS);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_values_are_parsed() {
        let config = EngineConfig::from_lookup(lookup(&[
            ("XSECTION_MAX_WORKERS", "3"),
            ("XSECTION_CHUNK_SIZE", "10"),
            ("XSECTION_DESURVEY_STEP", " 2.5 "),
            ("XSECTION_BUFFER_SEGMENTS", "16"),
            ("XSECTION_GEOLOGY_TIMEOUT_SECS", "5"),
            ("XSECTION_LOD_POINTS", "500"),
        ]));
        assert_eq!(config.max_workers, 3);
        assert_eq!(config.chunk_size, 10);
        assert_eq!(config.desurvey_step, 2.5);
        assert_eq!(config.buffer_segments, 16);
        assert_eq!(config.geology_timeout, Duration::from_secs(5));
        assert_eq!(config.default_lod_points, 500);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = EngineConfig::from_lookup(lookup(&[
            ("XSECTION_MAX_WORKERS", "64"),
            ("XSECTION_CHUNK_SIZE", "lots"),
            ("XSECTION_DESURVEY_STEP", "-1"),
            ("XSECTION_GEOLOGY_TIMEOUT_SECS", "soon"),
        ]));
        assert_eq!(config.max_workers, MAX_WORKERS);
        assert_eq!(config.chunk_size, DEFAULT_CHUNK_SIZE);
        assert_eq!(config.desurvey_step, DEFAULT_DESURVEY_STEP);
        assert_eq!(config.geology_timeout, DEFAULT_GEOLOGY_TIMEOUT);
    }

    #[test]
    fn test_zero_timeout_clamped() {
        let config = EngineConfig::from_lookup(lookup(&[("XSECTION_GEOLOGY_TIMEOUT_SECS", "0")]));
        assert_eq!(config.geology_timeout, Duration::from_secs(1));
        assert!(config.validate().is_ok());

        let config = EngineConfig {
            geology_timeout: Duration::ZERO,
            ..EngineConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_hand_built_values() {
        let config = EngineConfig {
            max_workers: 12,
            ..EngineConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let config = EngineConfig {
            desurvey_step: 0.0,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
