//! Attachment capacity report for every environment target.

use indexmap::IndexMap;
use log::info;
use serde::Serialize;

use crate::aws::{DirectoryService, PolicyAnalyzer};
use crate::config::PolicyKind;
use crate::error::{AssemblyError, AssemblyResult};
use crate::types::{target_id_segment, Environment};

/// Organizations quota of directly attached SCPs (or RCPs) per target.
pub const MAX_POLICIES_PER_TARGET: usize = 5;

/// Slots in use per target of one environment, rendered `"<count>/5"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapacityEntry {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "Target")]
    pub targets: IndexMap<String, String>,
}

impl<D: DirectoryService, A: PolicyAnalyzer> super::service::PolicyPipelineService<D, A> {
    pub async fn capacity_report(
        &self,
        kind: PolicyKind,
        environments: &[Environment],
    ) -> AssemblyResult<Vec<CapacityEntry>> {
        let mut report = Vec::with_capacity(environments.len());
        for (index, environment) in environments.iter().enumerate() {
            info!(
                "Processing environment {}/{}: {}",
                index + 1,
                environments.len(),
                environment.id
            );

            let mut targets = IndexMap::new();
            for label_id in &environment.targets {
                let target_id =
                    target_id_segment(label_id).ok_or_else(|| AssemblyError::MalformedTarget {
                        sid: environment.id.clone(),
                        target: label_id.clone(),
                        expected: "<label>:<id>",
                    })?;
                let count = self
                    .directory
                    .count_policies_for_target(target_id, kind)
                    .await?;
                info!("{label_id}: {count} {kind} policies attached");
                targets.insert(label_id.clone(), format!("{count}/{MAX_POLICIES_PER_TARGET}"));
            }

            report.push(CapacityEntry {
                id: environment.id.clone(),
                targets,
            });
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::PolicyPipelineService;
    use crate::test_utils::{FakeAnalyzer, FakeDirectory};
    use serde_json::json;

    #[tokio::test]
    async fn test_capacity_report_renders_slots() {
        let mut directory = FakeDirectory::default();
        directory.target_policy_counts.insert("111".into(), 2);
        directory.target_policy_counts.insert("ou-aa-1".into(), 5);
        let service = PolicyPipelineService::with_collaborators(directory, FakeAnalyzer::default());
        let environments = vec![Environment {
            id: "prod".into(),
            targets: vec!["Prod:111".into(), "Workloads:ou-aa-1".into(), "New:333".into()],
        }];

        let report = service
            .capacity_report(PolicyKind::Scp, &environments)
            .await
            .unwrap();

        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            json!([{
                "ID": "prod",
                "Target": {"Prod:111": "2/5", "Workloads:ou-aa-1": "5/5", "New:333": "0/5"}
            }])
        );
    }

    #[tokio::test]
    async fn test_capacity_report_rejects_malformed_target() {
        let service = PolicyPipelineService::with_collaborators(
            FakeDirectory::default(),
            FakeAnalyzer::default(),
        );
        let environments = vec![Environment {
            id: "prod".into(),
            targets: vec!["111".into()],
        }];

        let result = service.capacity_report(PolicyKind::Rcp, &environments).await;
        assert!(matches!(result, Err(AssemblyError::MalformedTarget { .. })));
    }
}
