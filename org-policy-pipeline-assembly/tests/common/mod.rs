//! Shared fixtures for the end-to-end tests: an on-disk policy repository
//! and in-memory collaborators.

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use indexmap::IndexMap;
use tempfile::TempDir;

use org_policy_pipeline_assembly::aws::{
    AwsResult, DirectoryService, PolicyAnalyzer, PolicySummary,
};
use org_policy_pipeline_assembly::{
    AccessCheck, Finding, PipelineConfig, PolicyDocument, PolicyKind, PolicyPipelineService,
};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Organization with no accounts or policies; tag queries match nothing.
#[derive(Default)]
pub struct EmptyOrganization;

#[async_trait]
impl DirectoryService for EmptyOrganization {
    async fn list_accounts(&self) -> AwsResult<IndexMap<String, String>> {
        Ok(IndexMap::new())
    }

    async fn list_organizational_units(&self) -> AwsResult<IndexMap<String, String>> {
        Ok(IndexMap::new())
    }

    async fn list_accounts_by_tag(&self, _key: &str, _value: &str) -> AwsResult<Vec<String>> {
        Ok(Vec::new())
    }

    async fn list_policies(&self, _kind: PolicyKind) -> AwsResult<Vec<PolicySummary>> {
        Ok(Vec::new())
    }

    async fn list_targets_for_policy(&self, _policy_id: &str) -> AwsResult<Vec<String>> {
        Ok(Vec::new())
    }

    async fn count_policies_for_target(
        &self,
        _target_id: &str,
        _kind: PolicyKind,
    ) -> AwsResult<usize> {
        Ok(0)
    }
}

/// Analyzer that reports every pair of documents as equivalent and finds
/// nothing, counting the calls it receives.
#[derive(Default)]
pub struct PermissiveAnalyzer {
    calls: Mutex<usize>,
}

impl PermissiveAnalyzer {
    pub fn calls(&self) -> usize {
        self.calls.lock().map(|c| *c).unwrap_or_default()
    }

    fn record_call(&self) {
        if let Ok(mut calls) = self.calls.lock() {
            *calls += 1;
        }
    }
}

#[async_trait]
impl PolicyAnalyzer for PermissiveAnalyzer {
    async fn check_no_new_access(
        &self,
        _new_document: &PolicyDocument,
        _existing_document: &PolicyDocument,
    ) -> AwsResult<AccessCheck> {
        self.record_call();
        Ok(AccessCheck {
            no_new_access: true,
            message: "The modified permissions do not grant new access".to_string(),
        })
    }

    async fn validate_policy(
        &self,
        _document: &PolicyDocument,
        _kind: PolicyKind,
    ) -> AwsResult<Vec<Finding>> {
        self.record_call();
        Ok(Vec::new())
    }
}

pub fn service() -> PolicyPipelineService<EmptyOrganization, PermissiveAnalyzer> {
    PolicyPipelineService::with_collaborators(EmptyOrganization, PermissiveAnalyzer::default())
}

/// A policy repository laid out under a temporary directory.
pub struct PolicyRepository {
    _root: TempDir,
    pub config: PipelineConfig,
}

impl PolicyRepository {
    pub fn new(kind: PolicyKind) -> Self {
        let root = TempDir::new().expect("failed to create temp dir");
        let config = PipelineConfig::for_repository(root.path(), kind);
        for dir in [
            config.guardrails_dir.as_path(),
            config.policies_dir.as_path(),
            parent(&config.environments_file),
        ] {
            std::fs::create_dir_all(dir).expect("failed to create repository layout");
        }
        Self {
            _root: root,
            config,
        }
    }

    pub fn with_guardrail(self, name: &str, contents: &str) -> Self {
        write(&self.config.guardrails_dir.join(format!("{name}.json")), contents);
        self
    }

    pub fn with_environments(self, contents: &str) -> Self {
        write(&self.config.environments_file, contents);
        self
    }

    pub fn with_management_records(self, contents: &str) -> Self {
        write(&self.config.management_file, contents);
        self
    }

    pub fn read_output(&self) -> serde_json::Value {
        let text = std::fs::read_to_string(&self.config.output_file).expect("output should exist");
        serde_json::from_str(&text).expect("output should be JSON")
    }
}

fn parent(path: &Path) -> &Path {
    path.parent().expect("path should have a parent")
}

fn write(path: &Path, contents: &str) {
    std::fs::write(path, contents).expect("failed to write fixture");
}
