// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Diagnostic messages attached to a profile bundle.

use std::fmt;

/// Severity of a diagnostic message
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Severity {
    /// Expected filtering, e.g. a feature outside the section buffer
    Notice,
    /// Degraded result, e.g. a fallback algorithm or a defaulted value
    Warning,
    /// A feature, interval or chunk could not be processed
    Error,
}

/// Processing stage that produced a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Stage {
    Section,
    Topography,
    Geology,
    Structure,
    Drillhole,
    Worker,
    Cache,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Section => "section",
            Stage::Topography => "topography",
            Stage::Geology => "geology",
            Stage::Structure => "structure",
            Stage::Drillhole => "drillhole",
            Stage::Worker => "worker",
            Stage::Cache => "cache",
        };
        f.write_str(name)
    }
}

/// A message explaining why output is missing or degraded
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Diagnostic {
    pub severity: Severity,
    pub stage: Stage,
    /// Feature or hole the message refers to, if any
    pub subject: Option<String>,
    pub message: String,
}

impl Diagnostic {
    pub fn notice(stage: Stage, message: impl Into<String>) -> Self {
        Self::new(Severity::Notice, stage, message)
    }

    pub fn warning(stage: Stage, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, stage, message)
    }

    pub fn error(stage: Stage, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, stage, message)
    }

    fn new(severity: Severity, stage: Stage, message: impl Into<String>) -> Self {
        Self {
            severity,
            stage,
            subject: None,
            message: message.into(),
        }
    }

    /// Attach the feature or hole identifier this message refers to
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.severity, self.stage)?;
        if let Some(subject) = &self.subject {
            write!(f, " ({})", subject)?;
        }
        write!(f, ": {}", self.message)
    }
}
