// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for geometry operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during geometry processing
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Algorithm failed: {0}")]
    AlgorithmFailed(String),

    #[error("Core error: {0}")]
    CoreError(#[from] xsection_core::Error),
}

impl From<Error> for xsection_core::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::InvalidGeometry(msg) => xsection_core::Error::Geometry(msg),
            Error::InvalidParameter(msg) => xsection_core::Error::InvalidParameter(msg),
            Error::AlgorithmFailed(msg) => xsection_core::Error::ProcessingAlgorithm(msg),
            Error::CoreError(inner) => inner,
        }
    }
}
