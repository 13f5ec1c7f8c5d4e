//! In-memory collaborators for unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use indexmap::IndexMap;

use crate::aws::{AwsError, AwsResult, DirectoryService, PolicyAnalyzer, PolicySummary};
use crate::config::PolicyKind;
use crate::types::{AccessCheck, Finding, PolicyDocument};

pub(crate) fn finding(kind: &str) -> Finding {
    Finding {
        finding_type: kind.to_string(),
        issue_code: format!("{kind}_CODE"),
        detail: format!("{kind} detail"),
    }
}

#[derive(Default)]
pub(crate) struct FakeDirectory {
    pub(crate) accounts: IndexMap<String, String>,
    pub(crate) units: IndexMap<String, String>,
    pub(crate) tagged: HashMap<(String, String), Vec<String>>,
    pub(crate) policies: Vec<PolicySummary>,
    pub(crate) policy_targets: HashMap<String, Vec<String>>,
    pub(crate) target_policy_counts: HashMap<String, usize>,
    pub(crate) tag_queries: Mutex<Vec<(String, String)>>,
}

impl FakeDirectory {
    pub(crate) fn with_tagged_accounts(mut self, key: &str, value: &str, ids: &[&str]) -> Self {
        self.tagged.insert(
            (key.to_string(), value.to_string()),
            ids.iter().map(ToString::to_string).collect(),
        );
        self
    }

    pub(crate) fn with_policy(mut self, id: &str, name: &str, targets: &[&str]) -> Self {
        self.policies.push(PolicySummary {
            id: id.to_string(),
            name: name.to_string(),
        });
        self.policy_targets
            .insert(id.to_string(), targets.iter().map(ToString::to_string).collect());
        self
    }
}

#[async_trait]
impl DirectoryService for FakeDirectory {
    async fn list_accounts(&self) -> AwsResult<IndexMap<String, String>> {
        Ok(self.accounts.clone())
    }

    async fn list_organizational_units(&self) -> AwsResult<IndexMap<String, String>> {
        Ok(self.units.clone())
    }

    async fn list_accounts_by_tag(&self, key: &str, value: &str) -> AwsResult<Vec<String>> {
        self.tag_queries
            .lock()
            .map_err(|e| AwsError::OrganizationsError(e.to_string()))?
            .push((key.to_string(), value.to_string()));
        Ok(self
            .tagged
            .get(&(key.to_string(), value.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn list_policies(&self, _kind: PolicyKind) -> AwsResult<Vec<PolicySummary>> {
        Ok(self.policies.clone())
    }

    async fn list_targets_for_policy(&self, policy_id: &str) -> AwsResult<Vec<String>> {
        self.policy_targets
            .get(policy_id)
            .cloned()
            .ok_or_else(|| AwsError::OrganizationsError(format!("unknown policy {policy_id}")))
    }

    async fn count_policies_for_target(
        &self,
        target_id: &str,
        _kind: PolicyKind,
    ) -> AwsResult<usize> {
        Ok(self.target_policy_counts.get(target_id).copied().unwrap_or(0))
    }
}

#[derive(Default)]
pub(crate) struct FakeAnalyzer {
    pub(crate) grants_new_access: bool,
    pub(crate) findings: Vec<Finding>,
    pub(crate) checks: Mutex<Vec<(PolicyDocument, PolicyDocument)>>,
    pub(crate) validated: Mutex<Vec<PolicyKind>>,
}

impl FakeAnalyzer {
    pub(crate) fn access_checks(&self) -> Vec<(PolicyDocument, PolicyDocument)> {
        self.checks.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub(crate) fn validated_kinds(&self) -> Vec<PolicyKind> {
        self.validated.lock().map(|v| v.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl PolicyAnalyzer for FakeAnalyzer {
    async fn check_no_new_access(
        &self,
        new_document: &PolicyDocument,
        existing_document: &PolicyDocument,
    ) -> AwsResult<AccessCheck> {
        self.checks
            .lock()
            .map_err(|e| AwsError::AccessAnalyzerError(e.to_string()))?
            .push((new_document.clone(), existing_document.clone()));
        Ok(if self.grants_new_access {
            AccessCheck {
                no_new_access: false,
                message: "The modified permissions grant new access".to_string(),
            }
        } else {
            AccessCheck {
                no_new_access: true,
                message: "The modified permissions do not grant new access".to_string(),
            }
        })
    }

    async fn validate_policy(
        &self,
        _document: &PolicyDocument,
        kind: PolicyKind,
    ) -> AwsResult<Vec<Finding>> {
        self.validated
            .lock()
            .map_err(|e| AwsError::AccessAnalyzerError(e.to_string()))?
            .push(kind);
        Ok(self.findings.clone())
    }
}
