//! IAM Access Analyzer client wrapper implementing [`PolicyAnalyzer`].

use async_trait::async_trait;
use aws_sdk_accessanalyzer::types::{AccessCheckPolicyType, CheckNoNewAccessResult, Locale, PolicyType};
use aws_sdk_accessanalyzer::Client as AccessAnalyzerClient;

use super::{AwsError, AwsResult, PolicyAnalyzer};
use crate::config::PolicyKind;
use crate::types::{AccessCheck, Finding, PolicyDocument};

/// Organization policies are compared as identity policies: Access Analyzer
/// has no control-policy mode for `CheckNoNewAccess`.
const ACCESS_CHECK_POLICY_TYPE: &str = "IDENTITY_POLICY";
const FINDINGS_LOCALE: &str = "EN";

pub struct AccessAnalyzer {
    client: AccessAnalyzerClient,
}

impl AccessAnalyzer {
    pub fn new(client: AccessAnalyzerClient) -> Self {
        Self { client }
    }
}

fn to_json(document: &PolicyDocument) -> AwsResult<String> {
    serde_json::to_string(document)
        .map_err(|e| AwsError::PolicyError(format!("Failed to serialize policy: {e}")))
}

#[async_trait]
impl PolicyAnalyzer for AccessAnalyzer {
    async fn check_no_new_access(
        &self,
        new_document: &PolicyDocument,
        existing_document: &PolicyDocument,
    ) -> AwsResult<AccessCheck> {
        let output = self
            .client
            .check_no_new_access()
            .new_policy_document(to_json(new_document)?)
            .existing_policy_document(to_json(existing_document)?)
            .policy_type(AccessCheckPolicyType::from(ACCESS_CHECK_POLICY_TYPE))
            .send()
            .await
            .map_err(|e| {
                AwsError::AccessAnalyzerError(format!("Failed to check for new access: {e}"))
            })?;

        Ok(AccessCheck {
            no_new_access: output.result() == Some(&CheckNoNewAccessResult::Pass),
            message: output.message().unwrap_or_default().to_string(),
        })
    }

    async fn validate_policy(
        &self,
        document: &PolicyDocument,
        kind: PolicyKind,
    ) -> AwsResult<Vec<Finding>> {
        let mut findings = Vec::new();
        let mut pages = self
            .client
            .validate_policy()
            .locale(Locale::from(FINDINGS_LOCALE))
            .policy_document(to_json(document)?)
            .policy_type(PolicyType::from(kind.aws_policy_type()))
            .into_paginator()
            .send();

        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| {
                AwsError::AccessAnalyzerError(format!("Failed to validate {kind} policy: {e}"))
            })?;
            findings.extend(page.findings().iter().map(|finding| Finding {
                finding_type: finding.finding_type().as_str().to_string(),
                issue_code: finding.issue_code().to_string(),
                detail: finding.finding_details().to_string(),
            }));
        }
        Ok(findings)
    }
}
