// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the engine facade.

use thiserror::Error;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the controller and its configuration
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A request-level failure from one of the pipeline stages
    #[error(transparent)]
    Core(#[from] xsection_core::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl From<xsection_geometry::Error> for Error {
    fn from(err: xsection_geometry::Error) -> Self {
        Error::Core(err.into())
    }
}

impl From<Error> for xsection_core::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Core(inner) => inner,
            Error::Config(msg) => xsection_core::Error::InvalidParameter(msg),
        }
    }
}

impl Error {
    /// True when the request timed out waiting on asynchronous work
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Core(xsection_core::Error::Timeout(_)))
    }
}
