//! Environment table generation from the live organization.

use log::info;

use crate::aws::{DirectoryService, PolicyAnalyzer};
use crate::config::PolicyKind;
use crate::error::AssemblyResult;
use crate::types::Environment;

/// Managed policy names that never become environments.
const EXCLUDED_POLICY_NAMES: &[&str] = &["FullAWSAccess", "RCPFullAWSAccess"];
const EXCLUDED_POLICY_PREFIXES: &[&str] = &["aws-guardrails-", "AWSControlTower-Controls"];

/// AWS-managed and Control Tower policies are left out of generated tables.
pub fn is_excluded_policy(name: &str) -> bool {
    EXCLUDED_POLICY_NAMES.contains(&name)
        || EXCLUDED_POLICY_PREFIXES
            .iter()
            .any(|prefix| name.starts_with(prefix))
}

impl<D: DirectoryService, A: PolicyAnalyzer> super::service::PolicyPipelineService<D, A> {
    /// Build one environment per existing policy of `kind`, named after the
    /// policy and listing its account and OU targets as `"<name>:<id>"`.
    ///
    /// Roots and targets unknown to the directory are dropped; policies left
    /// without targets produce no environment.
    pub async fn generate_environments(&self, kind: PolicyKind) -> AssemblyResult<Vec<Environment>> {
        let accounts = self.directory.list_accounts().await?;
        info!("Found {} accounts in the organization", accounts.len());
        let units = self.directory.list_organizational_units().await?;
        info!("Found {} organizational units", units.len());

        let policies = self.directory.list_policies(kind).await?;
        let mut environments = Vec::new();
        let mut skipped = 0usize;
        for policy in &policies {
            if is_excluded_policy(&policy.name) {
                info!("Skipping excluded policy: {}", policy.name);
                skipped += 1;
                continue;
            }

            let targets: Vec<String> = self
                .directory
                .list_targets_for_policy(&policy.id)
                .await?
                .into_iter()
                .filter_map(|id| {
                    accounts
                        .get(&id)
                        .or_else(|| units.get(&id))
                        .map(|name| format!("{name}:{id}"))
                })
                .collect();

            if targets.is_empty() {
                info!("No targets found for policy {}", policy.name);
                continue;
            }
            info!("Found {} targets for policy {}", targets.len(), policy.name);
            environments.push(Environment {
                id: policy.name.clone(),
                targets,
            });
        }

        info!(
            "{} {kind} policies found, {skipped} skipped, {} environments generated",
            policies.len(),
            environments.len()
        );
        Ok(environments)
    }
}
