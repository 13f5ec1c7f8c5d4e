//! AWS Organizations client wrapper implementing [`DirectoryService`].

use std::collections::VecDeque;

use async_trait::async_trait;
use aws_sdk_organizations::types::PolicyType;
use aws_sdk_organizations::Client as OrganizationsClient;
use indexmap::IndexMap;
use log::debug;

use super::{AwsError, AwsResult, DirectoryService, PolicySummary};
use crate::config::PolicyKind;

pub struct OrganizationsDirectory {
    client: OrganizationsClient,
}

impl OrganizationsDirectory {
    pub fn new(client: OrganizationsClient) -> Self {
        Self { client }
    }

    async fn account_has_tag(&self, account_id: &str, key: &str, value: &str) -> AwsResult<bool> {
        let mut pages = self
            .client
            .list_tags_for_resource()
            .resource_id(account_id)
            .into_paginator()
            .send();

        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| {
                AwsError::OrganizationsError(format!(
                    "Failed to list tags for account '{account_id}': {e}"
                ))
            })?;
            if page
                .tags()
                .iter()
                .any(|tag| tag.key() == key && tag.value() == value)
            {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

#[async_trait]
impl DirectoryService for OrganizationsDirectory {
    async fn list_accounts(&self) -> AwsResult<IndexMap<String, String>> {
        let mut accounts = IndexMap::new();
        let mut pages = self.client.list_accounts().into_paginator().send();

        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| {
                AwsError::OrganizationsError(format!("Failed to list accounts: {e}"))
            })?;
            for account in page.accounts() {
                if let Some(id) = account.id() {
                    accounts.insert(id.to_string(), account.name().unwrap_or_default().to_string());
                }
            }
        }

        debug!("Found {} accounts in the organization", accounts.len());
        Ok(accounts)
    }

    async fn list_organizational_units(&self) -> AwsResult<IndexMap<String, String>> {
        let roots = self
            .client
            .list_roots()
            .send()
            .await
            .map_err(|e| AwsError::OrganizationsError(format!("Failed to list roots: {e}")))?;

        let mut pending: VecDeque<String> = roots
            .roots()
            .iter()
            .filter_map(|root| root.id().map(str::to_string))
            .collect();
        let mut units = IndexMap::new();

        while let Some(parent_id) = pending.pop_front() {
            let mut pages = self
                .client
                .list_organizational_units_for_parent()
                .parent_id(&parent_id)
                .into_paginator()
                .send();

            while let Some(page) = pages.next().await {
                let page = page.map_err(|e| {
                    AwsError::OrganizationsError(format!(
                        "Failed to list organizational units under '{parent_id}': {e}"
                    ))
                })?;
                for unit in page.organizational_units() {
                    if let Some(id) = unit.id() {
                        units.insert(id.to_string(), unit.name().unwrap_or_default().to_string());
                        pending.push_back(id.to_string());
                    }
                }
            }
        }

        debug!("Found {} organizational units", units.len());
        Ok(units)
    }

    async fn list_accounts_by_tag(&self, key: &str, value: &str) -> AwsResult<Vec<String>> {
        let accounts = self.list_accounts().await?;
        let mut matching = Vec::new();
        for account_id in accounts.keys() {
            if self.account_has_tag(account_id, key, value).await? {
                matching.push(account_id.clone());
            }
        }
        Ok(matching)
    }

    async fn list_policies(&self, kind: PolicyKind) -> AwsResult<Vec<PolicySummary>> {
        let mut policies = Vec::new();
        let mut pages = self
            .client
            .list_policies()
            .filter(PolicyType::from(kind.aws_policy_type()))
            .into_paginator()
            .send();

        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| {
                AwsError::OrganizationsError(format!("Failed to list {kind} policies: {e}"))
            })?;
            for policy in page.policies() {
                if let (Some(id), Some(name)) = (policy.id(), policy.name()) {
                    policies.push(PolicySummary {
                        id: id.to_string(),
                        name: name.to_string(),
                    });
                }
            }
        }
        Ok(policies)
    }

    async fn list_targets_for_policy(&self, policy_id: &str) -> AwsResult<Vec<String>> {
        let mut targets = Vec::new();
        let mut pages = self
            .client
            .list_targets_for_policy()
            .policy_id(policy_id)
            .into_paginator()
            .send();

        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| {
                AwsError::OrganizationsError(format!(
                    "Failed to list targets for policy '{policy_id}': {e}"
                ))
            })?;
            targets.extend(
                page.targets()
                    .iter()
                    .filter_map(|target| target.target_id().map(str::to_string)),
            );
        }
        Ok(targets)
    }

    async fn count_policies_for_target(
        &self,
        target_id: &str,
        kind: PolicyKind,
    ) -> AwsResult<usize> {
        let mut count = 0;
        let mut pages = self
            .client
            .list_policies_for_target()
            .target_id(target_id)
            .filter(PolicyType::from(kind.aws_policy_type()))
            .into_paginator()
            .send();

        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| {
                AwsError::OrganizationsError(format!(
                    "Failed to list policies for target '{target_id}': {e}"
                ))
            })?;
            count += page.policies().len();
        }
        Ok(count)
    }
}
