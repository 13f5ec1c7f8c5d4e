//! Collaborator seams and their AWS SDK implementations.
//!
//! The pipeline only talks to AWS through [`DirectoryService`] (AWS
//! Organizations) and [`PolicyAnalyzer`] (IAM Access Analyzer). Both hide
//! pagination and hand back fully materialized results.

pub(crate) mod access_analyzer;
pub(crate) mod organizations;

use async_trait::async_trait;
use indexmap::IndexMap;
use thiserror::Error;

use crate::config::PolicyKind;
use crate::types::{AccessCheck, Finding, PolicyDocument};

pub use access_analyzer::AccessAnalyzer;
pub use organizations::OrganizationsDirectory;

#[derive(Error, Debug)]
pub enum AwsError {
    #[error("Organizations error: {0}")]
    OrganizationsError(String),
    #[error("Access Analyzer error: {0}")]
    AccessAnalyzerError(String),
    #[error("Policy error: {0}")]
    PolicyError(String),
}

pub type AwsResult<T> = Result<T, AwsError>;

/// An existing organization policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicySummary {
    pub id: String,
    pub name: String,
}

/// Read-only view of the organization.
#[async_trait]
pub trait DirectoryService: Send + Sync {
    /// Account id -> account name.
    async fn list_accounts(&self) -> AwsResult<IndexMap<String, String>>;

    /// Organizational unit id -> name, for every OU below the roots.
    async fn list_organizational_units(&self) -> AwsResult<IndexMap<String, String>>;

    /// Ids of the accounts tagged `key=value`, in listing order.
    async fn list_accounts_by_tag(&self, key: &str, value: &str) -> AwsResult<Vec<String>>;

    /// Existing policies of the given kind.
    async fn list_policies(&self, kind: PolicyKind) -> AwsResult<Vec<PolicySummary>>;

    /// Ids of the accounts, OUs and roots a policy is attached to.
    async fn list_targets_for_policy(&self, policy_id: &str) -> AwsResult<Vec<String>>;

    /// Number of policies of the given kind attached directly to a target.
    async fn count_policies_for_target(&self, target_id: &str, kind: PolicyKind)
        -> AwsResult<usize>;
}

/// Semantic policy checks.
#[async_trait]
pub trait PolicyAnalyzer: Send + Sync {
    /// Does `new_document` grant access that `existing_document` does not?
    async fn check_no_new_access(
        &self,
        new_document: &PolicyDocument,
        existing_document: &PolicyDocument,
    ) -> AwsResult<AccessCheck>;

    /// Findings for a document validated as the given policy kind.
    async fn validate_policy(
        &self,
        document: &PolicyDocument,
        kind: PolicyKind,
    ) -> AwsResult<Vec<Finding>>;
}
