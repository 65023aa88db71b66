// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error taxonomy shared by every profile stage.
//!
//! Expected filtering (a feature outside the section buffer) is not an error;
//! it is reported as a [`crate::Diagnostic`] with [`crate::Severity::Notice`].

use std::time::Duration;
use thiserror::Error;

/// Result type for profile operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while generating profile data
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Null, invalid or wrong-type geometry.
    ///
    /// Fatal for the section line or the raster, per-feature otherwise.
    #[error("Geometry error: {0}")]
    Geometry(String),

    /// Required survey or raster data is missing.
    #[error("Data unavailable: {0}")]
    DataUnavailable(String),

    /// An underlying densify/intersect algorithm failed.
    #[error("Processing algorithm failed: {0}")]
    ProcessingAlgorithm(String),

    /// A single parallel chunk failed; siblings are unaffected.
    #[error("Worker chunk {chunk} failed: {message}")]
    AsyncWorker { chunk: usize, message: String },

    /// A bounded wait expired before the work completed.
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    /// Strike or dip input that could not be resolved to an angle.
    #[error("Invalid orientation '{input}': {reason}")]
    InvalidOrientation { input: String, reason: String },

    /// Request parameter outside its valid range.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

impl Error {
    /// Convenience constructor for geometry errors
    pub fn geometry(msg: impl Into<String>) -> Self {
        Error::Geometry(msg.into())
    }

    /// Convenience constructor for orientation errors
    pub fn orientation(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidOrientation {
            input: input.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error must abort the whole request.
    ///
    /// Only geometry and data errors raised for the primary inputs are fatal;
    /// callers decide which inputs are primary, so this only reports whether
    /// the kind *can* be fatal.
    pub fn is_fatal_kind(&self) -> bool {
        matches!(self, Error::Geometry(_) | Error::DataUnavailable(_))
    }
}
