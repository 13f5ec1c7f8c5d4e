//! Policy documents, management records and pipeline outputs.

use std::cmp::Ordering;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::config::PolicyKind;
use crate::error::{AssemblyError, AssemblyResult};

/// IAM policy language version emitted on every assembled document.
pub const POLICY_VERSION: &str = "2012-10-17";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Effect {
    Allow,
    Deny,
}

/// `Action`/`NotAction` members accept a single string or a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ActionType {
    Single(String),
    Multiple(Vec<String>),
}

impl ActionType {
    pub fn as_slice(&self) -> &[String] {
        match self {
            Self::Single(action) => std::slice::from_ref(action),
            Self::Multiple(actions) => actions,
        }
    }
}

/// `Resource` member: a single ARN, a list of ARNs, or anything else a
/// hand-written document may contain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Resource {
    Single(String),
    Multiple(Vec<String>),
    Other(Value),
}

/// One node of a condition block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionNode {
    Map(IndexMap<String, ConditionNode>),
    List(Vec<ConditionNode>),
    Scalar(Value),
}

impl ConditionNode {
    /// Ordering of list members: numbers first, by value, then everything
    /// else by its text.
    pub(crate) fn canonical_cmp(&self, other: &Self) -> Ordering {
        match (self.as_number(), other.as_number()) {
            (Some(a), Some(b)) => a.total_cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.sort_text().cmp(&other.sort_text()),
        }
    }

    fn as_number(&self) -> Option<f64> {
        match self {
            Self::Scalar(Value::Number(number)) => number.as_f64(),
            _ => None,
        }
    }

    fn sort_text(&self) -> String {
        match self {
            Self::Scalar(Value::String(text)) => text.clone(),
            other => serde_json::to_string(other).unwrap_or_default(),
        }
    }
}

/// Condition operator -> context key -> value(s).
pub type Condition = IndexMap<String, ConditionNode>;

/// A single policy statement.
///
/// Members other than the five modelled here (`Sid`, `Principal`,
/// `NotResource`, ...) are kept verbatim in `other`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    #[serde(rename = "Effect")]
    pub effect: Effect,
    #[serde(rename = "Action", default, skip_serializing_if = "Option::is_none")]
    pub action: Option<ActionType>,
    #[serde(rename = "NotAction", default, skip_serializing_if = "Option::is_none")]
    pub not_action: Option<ActionType>,
    #[serde(rename = "Resource", default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<Resource>,
    #[serde(rename = "Condition", default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
    #[serde(flatten)]
    pub other: IndexMap<String, Value>,
}

impl Statement {
    /// Build an `Action` statement over the given resources.
    pub fn new(effect: Effect, actions: Vec<String>, resources: Vec<String>) -> Self {
        Self {
            effect,
            action: Some(ActionType::Multiple(actions)),
            not_action: None,
            resource: Some(Resource::Multiple(resources)),
            condition: None,
            other: IndexMap::new(),
        }
    }

    /// Drop every statement identifier, whatever its capitalisation.
    pub fn strip_sid(&mut self) {
        self.other.retain(|key, _| !is_sid_key(key));
    }

    pub fn has_sid(&self) -> bool {
        self.other.keys().any(|key| is_sid_key(key))
    }

    /// Reject statements whose authorization effect is undefined.
    pub fn validate(&self, index: usize) -> AssemblyResult<()> {
        match (&self.action, &self.not_action) {
            (Some(_), Some(_)) => Err(AssemblyError::InvalidStatement {
                index,
                reason: "statement carries both Action and NotAction".to_string(),
            }),
            (None, None) => Err(AssemblyError::InvalidStatement {
                index,
                reason: "statement carries neither Action nor NotAction".to_string(),
            }),
            _ => Ok(()),
        }
    }
}

pub(crate) fn is_sid_key(key: &str) -> bool {
    key.eq_ignore_ascii_case("sid")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyDocument {
    #[serde(rename = "Version", default = "default_version")]
    pub version: String,
    #[serde(rename = "Id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "Statement", deserialize_with = "one_or_many")]
    pub statement: Vec<Statement>,
}

impl PolicyDocument {
    pub fn new(statement: Vec<Statement>) -> Self {
        Self {
            version: POLICY_VERSION.to_string(),
            id: None,
            statement,
        }
    }

    /// Length of the compact JSON rendering, the unit Organizations uses for
    /// its policy size quota.
    pub fn compact_size(&self) -> AssemblyResult<usize> {
        serde_json::to_string(self)
            .map(|json| json.len())
            .map_err(|e| AssemblyError::serialization("policy document", e))
    }

    pub fn to_json(&self) -> AssemblyResult<String> {
        serde_json::to_string(self).map_err(|e| AssemblyError::serialization("policy document", e))
    }

    pub fn strip_sids(&mut self) {
        for statement in &mut self.statement {
            statement.strip_sid();
        }
    }
}

fn default_version() -> String {
    POLICY_VERSION.to_string()
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<Statement>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(Box<Statement>),
        Many(Vec<Statement>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(statement) => vec![*statement],
        OneOrMany::Many(statements) => statements,
    })
}

/// Where a target descriptor points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "Type", content = "ID")]
pub enum TargetDescriptor {
    /// `"<label>:<account id>"`
    Account(String),
    /// `"<label>:<ou id>"`
    #[serde(rename = "OU")]
    Ou(String),
    /// Name of an entry in the environment table.
    Environment(String),
    /// `"<tag key>:<tag value>"`
    Tag(String),
}

/// One entry of a `<kind>-management.json` file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagementRecord {
    #[serde(rename = "SID")]
    pub sid: String,
    #[serde(rename = "Guardrails", default)]
    pub guardrails: Vec<String>,
    #[serde(rename = "Policy", default)]
    pub policy: String,
    #[serde(rename = "Target")]
    pub target: TargetDescriptor,
    #[serde(rename = "Comments", default)]
    pub comments: String,
}

/// How a record's policy document is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicySource<'a> {
    Guardrails(&'a [String]),
    Policy(&'a str),
}

impl ManagementRecord {
    /// Exactly one of `Guardrails`/`Policy` must be populated.
    pub fn source(&self) -> AssemblyResult<PolicySource<'_>> {
        match (self.guardrails.is_empty(), self.policy.is_empty()) {
            (false, true) => Ok(PolicySource::Guardrails(&self.guardrails)),
            (true, false) => Ok(PolicySource::Policy(&self.policy)),
            (false, false) => Err(AssemblyError::invalid_record(
                &self.sid,
                "both Guardrails and Policy are set",
            )),
            (true, true) => Err(AssemblyError::invalid_record(
                &self.sid,
                "no policy or guardrails found",
            )),
        }
    }
}

/// A named, pre-resolved group of targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "Target")]
    pub targets: Vec<String>,
}

/// Text after the first `:` of a `label:id` string.
pub fn target_id_segment(label_id: &str) -> Option<&str> {
    label_id
        .split_once(':')
        .map(|(_, id)| id)
        .filter(|id| !id.is_empty())
}

/// One policy attachment handed to the provisioning step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputRow {
    pub target_id: String,
    pub sid: String,
    pub comments: String,
    pub policy: Arc<PolicyDocument>,
}

/// A diagnostic reported by the policy analyzer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    pub finding_type: String,
    pub issue_code: String,
    pub detail: String,
}

/// Outcome of one directional "no new access" check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessCheck {
    pub no_new_access: bool,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicySourceKind {
    Guardrails,
    Policy,
}

/// Per-record figures of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordSummary {
    pub sid: String,
    pub source: PolicySourceKind,
    pub statements_before: usize,
    pub statements_after: usize,
    pub size_before: usize,
    pub size_after: usize,
    pub advisory_findings: usize,
    pub targets: usize,
}

/// Structured account of a run, written next to the output rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub policy_kind: PolicyKind,
    pub generated_at: DateTime<Utc>,
    pub records: Vec<RecordSummary>,
    pub rows: usize,
}

/// Rows and summary produced by one assembly.
#[derive(Debug, Clone, PartialEq)]
pub struct AssemblyOutput {
    pub rows: Vec<OutputRow>,
    pub summary: RunSummary,
}
