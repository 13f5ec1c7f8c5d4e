//! Error types for the organization policy pipeline.
//!
//! Every variant except [`AssemblyError::Aws`] maps to one of the fatal
//! conditions of a pipeline run. Advisory conditions (non-gated findings,
//! tag queries without matches, unreadable guardrail fragments) are logged
//! and never surface here.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::aws::AwsError;
use crate::types::Finding;

/// Errors that abort a pipeline run.
#[derive(Debug, Error)]
pub enum AssemblyError {
    /// A required input could not be read, or the output could not be written.
    #[error("Failed to {operation} '{}': {source}", .path.display())]
    Io {
        operation: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An input file is not valid JSON for the expected shape.
    #[error("'{}' is not a valid {expected} file: {source}", .path.display())]
    Json {
        path: PathBuf,
        expected: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// A value could not be serialized.
    #[error("Failed to serialize {what}: {source}")]
    Serialization {
        what: String,
        #[source]
        source: serde_json::Error,
    },

    /// Two management records share the same SID.
    #[error("SIDs are not unique: '{sid}' appears more than once")]
    DuplicateSid { sid: String },

    /// A management record is structurally invalid.
    #[error("Invalid management record '{sid}': {reason}")]
    InvalidRecord { sid: String, reason: String },

    /// A policy statement has undefined authorization effect.
    #[error("Invalid statement #{index}: {reason}")]
    InvalidStatement { index: usize, reason: String },

    /// An `Environment` target names an environment missing from the table.
    #[error("Environment ID not found for SID {sid}: {environment}")]
    EnvironmentNotFound { sid: String, environment: String },

    /// An environment resolved to zero targets.
    #[error("Environment '{environment}' referenced by SID {sid} has no targets")]
    EmptyEnvironment { sid: String, environment: String },

    /// A `label:id` or `key:value` string has no separator.
    #[error("Malformed target '{target}' for SID {sid}: expected '{expected}'")]
    MalformedTarget {
        sid: String,
        target: String,
        expected: &'static str,
    },

    /// The optimized policy is not authorization-equivalent to the original.
    #[error("Optimized policy for SID {sid} has different effects: {details}")]
    EquivalenceMismatch { sid: String, details: String },

    /// The policy analyzer reported findings of a gated type.
    #[error("Findings were found in policy '{policy}': {}", render_findings(.findings))]
    GatedFindings {
        policy: String,
        findings: Vec<Finding>,
    },

    /// An existing organization policy could not be found by name.
    #[error("Policy '{name}' not found")]
    PolicyNotFound { name: String },

    #[error(transparent)]
    Aws(#[from] AwsError),
}

impl AssemblyError {
    pub(crate) fn io(operation: impl Into<String>, path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn json(path: &Path, expected: &'static str, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.to_path_buf(),
            expected,
            source,
        }
    }

    pub(crate) fn serialization(what: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Serialization {
            what: what.into(),
            source,
        }
    }

    pub(crate) fn invalid_record(sid: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidRecord {
            sid: sid.into(),
            reason: reason.into(),
        }
    }
}

/// Result alias used across the crate.
pub type AssemblyResult<T> = Result<T, AssemblyError>;

fn render_findings(findings: &[Finding]) -> String {
    serde_json::to_string_pretty(findings).unwrap_or_else(|_| format!("{findings:?}"))
}
