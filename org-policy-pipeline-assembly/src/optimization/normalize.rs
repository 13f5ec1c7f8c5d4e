//! Canonical forms of conditions and resources.
//!
//! Two conditions that differ only in key or list order normalize to the same
//! value, and `"*"` normalizes like `["*"]`. Both functions are idempotent.

use crate::types::{Condition, ConditionNode, Resource};

pub const WILDCARD: &str = "*";

/// Sort operator and context keys lexicographically and sort every list.
pub fn normalize_condition(condition: &Condition) -> Condition {
    let mut normalized: Condition = condition
        .iter()
        .map(|(key, node)| (key.clone(), normalize_node(node)))
        .collect();
    normalized.sort_keys();
    normalized
}

fn normalize_node(node: &ConditionNode) -> ConditionNode {
    match node {
        ConditionNode::Map(map) => ConditionNode::Map(normalize_condition(map)),
        ConditionNode::List(items) => {
            let mut items: Vec<ConditionNode> = items.iter().map(normalize_node).collect();
            items.sort_by(ConditionNode::canonical_cmp);
            ConditionNode::List(items)
        }
        ConditionNode::Scalar(value) => ConditionNode::Scalar(value.clone()),
    }
}

/// Scalar -> singleton list, list -> itself, anything else -> empty.
pub fn normalize_resource(resource: &Resource) -> Vec<String> {
    match resource {
        Resource::Single(arn) => vec![arn.clone()],
        Resource::Multiple(arns) => arns.clone(),
        Resource::Other(_) => Vec::new(),
    }
}
