//! Target resolution: turns a record's target descriptor into the concrete
//! account and OU ids its policy is attached to.

use log::{info, warn};

use crate::aws::DirectoryService;
use crate::error::{AssemblyError, AssemblyResult};
use crate::types::{target_id_segment, Environment, TargetDescriptor};

pub struct TargetResolver<'a, D: DirectoryService + ?Sized> {
    directory: &'a D,
    environments: &'a [Environment],
}

impl<'a, D: DirectoryService + ?Sized> TargetResolver<'a, D> {
    pub fn new(directory: &'a D, environments: &'a [Environment]) -> Self {
        Self {
            directory,
            environments,
        }
    }

    /// Resolve `target` for the record `sid`.
    ///
    /// Ids are returned in discovery order and are not deduplicated.
    pub async fn resolve(&self, sid: &str, target: &TargetDescriptor) -> AssemblyResult<Vec<String>> {
        match target {
            TargetDescriptor::Account(label_id) | TargetDescriptor::Ou(label_id) => {
                Ok(vec![id_segment(sid, label_id)?.to_string()])
            }
            TargetDescriptor::Environment(environment) => {
                self.resolve_environment(sid, environment)
            }
            TargetDescriptor::Tag(tag) => self.resolve_tag(sid, tag).await,
        }
    }

    fn resolve_environment(&self, sid: &str, environment: &str) -> AssemblyResult<Vec<String>> {
        // A later entry with the same ID shadows earlier ones.
        let found = self
            .environments
            .iter()
            .rev()
            .find(|candidate| candidate.id == environment)
            .ok_or_else(|| AssemblyError::EnvironmentNotFound {
                sid: sid.to_string(),
                environment: environment.to_string(),
            })?;

        if found.targets.is_empty() {
            return Err(AssemblyError::EmptyEnvironment {
                sid: sid.to_string(),
                environment: environment.to_string(),
            });
        }

        info!(
            "The environment {environment} has the following targets: {:?}",
            found.targets
        );
        found
            .targets
            .iter()
            .map(|label_id| id_segment(sid, label_id).map(str::to_string))
            .collect()
    }

    async fn resolve_tag(&self, sid: &str, tag: &str) -> AssemblyResult<Vec<String>> {
        let (key, value) = tag
            .split_once(':')
            .ok_or_else(|| AssemblyError::MalformedTarget {
                sid: sid.to_string(),
                target: tag.to_string(),
                expected: "<tag key>:<tag value>",
            })?;

        let accounts = self.directory.list_accounts_by_tag(key, value).await?;
        if accounts.is_empty() {
            warn!("No accounts are tagged {key}={value}; SID {sid} produces no rows");
        } else {
            info!("Accounts tagged {key}={value}: {:?}", accounts);
        }
        Ok(accounts)
    }
}

fn id_segment<'t>(sid: &str, label_id: &'t str) -> AssemblyResult<&'t str> {
    target_id_segment(label_id).ok_or_else(|| AssemblyError::MalformedTarget {
        sid: sid.to_string(),
        target: label_id.to_string(),
        expected: "<label>:<id>",
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::FakeDirectory;

    fn environments() -> Vec<Environment> {
        vec![
            Environment {
                id: "dev".into(),
                targets: vec!["A:111".into(), "B:222".into(), "A:111".into()],
            },
            Environment {
                id: "empty".into(),
                targets: vec![],
            },
        ]
    }

    #[tokio::test]
    async fn test_account_and_ou_use_id_segment() {
        let directory = FakeDirectory::default();
        let environments = environments();
        let resolver = TargetResolver::new(&directory, &environments);

        let account = resolver
            .resolve("S1", &TargetDescriptor::Account("Prod:111111111111".into()))
            .await
            .unwrap();
        assert_eq!(account, vec!["111111111111"]);

        let ou = resolver
            .resolve("S1", &TargetDescriptor::Ou("Workloads:ou-ab12-cdef3456".into()))
            .await
            .unwrap();
        assert_eq!(ou, vec!["ou-ab12-cdef3456"]);
    }

    #[tokio::test]
    async fn test_environment_keeps_order_and_duplicates() {
        let directory = FakeDirectory::default();
        let environments = environments();
        let resolver = TargetResolver::new(&directory, &environments);
        let target = TargetDescriptor::Environment("dev".into());

        let first = resolver.resolve("S2", &target).await.unwrap();
        let second = resolver.resolve("S2", &target).await.unwrap();
        assert_eq!(first, vec!["111", "222", "111"]);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_missing_environment_names_sid() {
        let directory = FakeDirectory::default();
        let environments = environments();
        let resolver = TargetResolver::new(&directory, &environments);

        let err = resolver
            .resolve("S3", &TargetDescriptor::Environment("missing".into()))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Environment ID not found for SID S3: missing");
    }

    #[tokio::test]
    async fn test_empty_environment_is_fatal() {
        let directory = FakeDirectory::default();
        let environments = environments();
        let resolver = TargetResolver::new(&directory, &environments);

        let result = resolver
            .resolve("S4", &TargetDescriptor::Environment("empty".into()))
            .await;
        assert!(matches!(result, Err(AssemblyError::EmptyEnvironment { .. })));
    }

    #[tokio::test]
    async fn test_tag_queries_directory() {
        let directory = FakeDirectory::default().with_tagged_accounts("env", "prod", &["333", "444"]);
        let resolver = TargetResolver::new(&directory, &[]);

        let accounts = resolver
            .resolve("S5", &TargetDescriptor::Tag("env:prod".into()))
            .await
            .unwrap();
        assert_eq!(accounts, vec!["333", "444"]);
    }

    #[tokio::test]
    async fn test_tag_without_matches_yields_nothing() {
        let directory = FakeDirectory::default();
        let resolver = TargetResolver::new(&directory, &[]);

        let accounts = resolver
            .resolve("S6", &TargetDescriptor::Tag("env:staging".into()))
            .await
            .unwrap();
        assert!(accounts.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_descriptors() {
        let directory = FakeDirectory::default();
        let resolver = TargetResolver::new(&directory, &[]);

        for target in [
            TargetDescriptor::Account("111111111111".into()),
            TargetDescriptor::Tag("env".into()),
        ] {
            let result = resolver.resolve("S7", &target).await;
            assert!(matches!(result, Err(AssemblyError::MalformedTarget { .. })));
        }
    }
}
