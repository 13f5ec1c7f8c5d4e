//! Coverage check: is an existing policy attached to every target of an
//! environment?

use log::{info, warn};
use serde::Serialize;

use crate::aws::{DirectoryService, PolicyAnalyzer};
use crate::config::PolicyKind;
use crate::error::{AssemblyError, AssemblyResult};
use crate::types::{target_id_segment, Environment};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoverageReport {
    pub environment_id: String,
    pub policy_name: String,
    pub total: usize,
    pub covered: usize,
    /// Environment targets (`label:id`) the policy is not attached to.
    pub missing: Vec<String>,
}

impl CoverageReport {
    pub fn is_fully_covered(&self) -> bool {
        self.missing.is_empty()
    }
}

impl<D: DirectoryService, A: PolicyAnalyzer> super::service::PolicyPipelineService<D, A> {
    pub async fn check_coverage(
        &self,
        kind: PolicyKind,
        policy_name: &str,
        environment_id: &str,
        environments: &[Environment],
    ) -> AssemblyResult<CoverageReport> {
        // The first entry with a matching ID is checked.
        let environment = environments
            .iter()
            .find(|candidate| candidate.id == environment_id)
            .ok_or_else(|| AssemblyError::EnvironmentNotFound {
                sid: policy_name.to_string(),
                environment: environment_id.to_string(),
            })?;

        let policy = self
            .directory
            .list_policies(kind)
            .await?
            .into_iter()
            .find(|policy| policy.name == policy_name)
            .ok_or_else(|| AssemblyError::PolicyNotFound {
                name: policy_name.to_string(),
            })?;

        let attached = self.directory.list_targets_for_policy(&policy.id).await?;
        info!("Found {} targets for {kind} {policy_name}", attached.len());

        let missing: Vec<String> = environment
            .targets
            .iter()
            .filter(|label_id| {
                !target_id_segment(label_id).is_some_and(|id| attached.iter().any(|a| a == id))
            })
            .cloned()
            .collect();

        let report = CoverageReport {
            environment_id: environment_id.to_string(),
            policy_name: policy_name.to_string(),
            total: environment.targets.len(),
            covered: environment.targets.len() - missing.len(),
            missing,
        };

        if report.is_fully_covered() {
            info!("All {} targets of {environment_id} are covered by {policy_name}", report.total);
        } else {
            warn!(
                "The following targets of {environment_id} do not have {policy_name}: {:?}",
                report.missing
            );
        }
        Ok(report)
    }
}
