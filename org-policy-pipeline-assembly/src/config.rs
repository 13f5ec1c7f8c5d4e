//! Pipeline configuration: policy kind, input/output locations and the
//! security gate.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Serialize;

use crate::types::Finding;

/// Finding types that fail a run unless configured otherwise.
pub const DEFAULT_SECURITY_GATE: &[&str] = &["ERROR", "SECURITY_WARNING"];

/// Organization policy family processed by a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyKind {
    Scp,
    Rcp,
}

impl PolicyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scp => "scp",
            Self::Rcp => "rcp",
        }
    }

    /// Policy type name used by AWS Organizations and Access Analyzer.
    pub fn aws_policy_type(self) -> &'static str {
        match self {
            Self::Scp => "SERVICE_CONTROL_POLICY",
            Self::Rcp => "RESOURCE_CONTROL_POLICY",
        }
    }

    pub fn management_file_name(self) -> String {
        format!("{}-management.json", self.as_str())
    }

    pub fn management_dir_name(self) -> String {
        format!("{}-management", self.as_str())
    }

    pub fn output_file_name(self) -> String {
        format!("{}s.json", self.as_str())
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str().to_uppercase())
    }
}

impl FromStr for PolicyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "scp" => Ok(Self::Scp),
            "rcp" => Ok(Self::Rcp),
            other => Err(format!(
                "unsupported policy type '{other}', expected 'scp' or 'rcp'"
            )),
        }
    }
}

/// Finding types that are fatal; every other finding is advisory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityGate {
    finding_types: BTreeSet<String>,
}

impl SecurityGate {
    pub fn new<I, S>(finding_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            finding_types: finding_types
                .into_iter()
                .map(|t| t.as_ref().trim().to_string())
                .filter(|t| !t.is_empty())
                .collect(),
        }
    }

    pub fn blocks(&self, finding_type: &str) -> bool {
        self.finding_types.contains(finding_type)
    }

    /// Split findings into `(blocking, advisory)`, each in input order.
    pub fn partition(&self, findings: Vec<Finding>) -> (Vec<Finding>, Vec<Finding>) {
        findings
            .into_iter()
            .partition(|finding| self.blocks(&finding.finding_type))
    }

    pub fn finding_types(&self) -> impl Iterator<Item = &str> {
        self.finding_types.iter().map(String::as_str)
    }
}

impl Default for SecurityGate {
    fn default() -> Self {
        Self::new(DEFAULT_SECURITY_GATE)
    }
}

/// Input and output locations of one assembly run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub kind: PolicyKind,
    pub management_file: PathBuf,
    pub environments_file: PathBuf,
    pub guardrails_dir: PathBuf,
    pub policies_dir: PathBuf,
    pub output_file: PathBuf,
    pub security_gate: SecurityGate,
}

impl PipelineConfig {
    /// Conventional layout of a policy repository:
    ///
    /// ```text
    /// <root>/<kind>-management/<kind>-management.json
    /// <root>/<kind>-management/guardrails/<name>.json
    /// <root>/<kind>-management/policies/<name>.json
    /// <root>/environments/environments.json
    /// <root>/terraform/<kind>s.json            (output)
    /// ```
    pub fn for_repository(root: impl AsRef<Path>, kind: PolicyKind) -> Self {
        let root = root.as_ref();
        let management_dir = root.join(kind.management_dir_name());
        Self {
            kind,
            management_file: management_dir.join(kind.management_file_name()),
            environments_file: root.join("environments").join("environments.json"),
            guardrails_dir: management_dir.join("guardrails"),
            policies_dir: management_dir.join("policies"),
            output_file: root.join("terraform").join(kind.output_file_name()),
            security_gate: SecurityGate::default(),
        }
    }

    pub fn policy_path(&self, name: &str) -> PathBuf {
        self.policies_dir.join(format!("{name}.json"))
    }
}
