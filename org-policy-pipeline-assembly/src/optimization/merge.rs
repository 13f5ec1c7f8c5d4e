//! Statement grouping and merging.
//!
//! `Action` statements sharing effect, canonical resource and canonical
//! condition collapse into one statement whose action list is the sorted
//! union of the group. `NotAction` statements are never merged: they are
//! appended after the merged statements in their original order.

use std::collections::{BTreeMap, BTreeSet};

use indexmap::IndexMap;
use log::debug;
use serde_json::Value;

use super::normalize::{normalize_condition, normalize_resource, WILDCARD};
use crate::error::{AssemblyError, AssemblyResult};
use crate::types::{
    is_sid_key, ActionType, Condition, Effect, PolicyDocument, Resource, Statement,
};

/// Grouping key of an `Action` statement.
///
/// `other` holds the canonical form of unmodelled members such as
/// `Principal`; it is empty for service control policy statements.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct MergeKey {
    resource: Vec<String>,
    condition: String,
    effect: Effect,
    other: String,
}

impl MergeKey {
    fn for_statement(statement: &Statement) -> AssemblyResult<(Self, Condition)> {
        let resource = statement
            .resource
            .as_ref()
            .map_or_else(|| vec![WILDCARD.to_string()], normalize_resource);

        let condition = statement
            .condition
            .as_ref()
            .map(normalize_condition)
            .unwrap_or_default();

        let other: BTreeMap<&str, &Value> = statement
            .other
            .iter()
            .filter(|(key, _)| !is_sid_key(key))
            .map(|(key, value)| (key.as_str(), value))
            .collect();

        let key = Self {
            resource,
            condition: serde_json::to_string(&condition)
                .map_err(|e| AssemblyError::serialization("condition", e))?,
            effect: statement.effect,
            other: serde_json::to_string(&other)
                .map_err(|e| AssemblyError::serialization("statement members", e))?,
        };
        Ok((key, condition))
    }
}

const NOT_RESOURCE: &str = "NotResource";

struct Group {
    condition: Condition,
    statements: Vec<Statement>,
}

/// Merge compatible statements, dropping every statement identifier.
///
/// Statements carrying both or neither of `Action`/`NotAction` are rejected.
pub fn optimize_statements(statements: &[Statement]) -> AssemblyResult<Vec<Statement>> {
    for (index, statement) in statements.iter().enumerate() {
        statement.validate(index)?;
    }

    let (not_action, action): (Vec<&Statement>, Vec<&Statement>) = statements
        .iter()
        .partition(|statement| statement.not_action.is_some());

    let mut groups: IndexMap<MergeKey, Group> = IndexMap::new();
    for statement in action {
        let (key, condition) = MergeKey::for_statement(statement)?;
        groups
            .entry(key)
            .or_insert_with(|| Group {
                condition,
                statements: Vec::new(),
            })
            .statements
            .push(statement.clone());
    }

    let mut optimized = Vec::with_capacity(groups.len() + not_action.len());
    for (key, group) in groups {
        if group.statements.len() == 1 {
            optimized.extend(group.statements);
        } else {
            debug!(
                "Merging {} statements sharing effect {:?} on {:?}",
                group.statements.len(),
                key.effect,
                key.resource
            );
            optimized.push(merge_group(key, group));
        }
    }
    optimized.extend(not_action.into_iter().cloned());

    for statement in &mut optimized {
        statement.strip_sid();
    }
    Ok(optimized)
}

fn merge_group(key: MergeKey, group: Group) -> Statement {
    let actions: BTreeSet<String> = group
        .statements
        .iter()
        .filter_map(|statement| statement.action.as_ref())
        .flat_map(|action| action.as_slice().iter().cloned())
        .collect();

    // Unmodelled members are identical across the group.
    let other = group
        .statements
        .first()
        .map(|statement| statement.other.clone())
        .unwrap_or_default();

    // `Resource` and `NotResource` are mutually exclusive.
    let resource = (!other.contains_key(NOT_RESOURCE)).then(|| Resource::Multiple(key.resource));

    Statement {
        effect: key.effect,
        action: Some(ActionType::Multiple(actions.into_iter().collect())),
        not_action: None,
        resource,
        condition: (!group.condition.is_empty()).then_some(group.condition),
        other,
    }
}

/// Optimize a whole document, keeping its version and id.
pub fn optimize_policy(policy: &PolicyDocument) -> AssemblyResult<PolicyDocument> {
    Ok(PolicyDocument {
        version: policy.version.clone(),
        id: policy.id.clone(),
        statement: optimize_statements(&policy.statement)?,
    })
}
