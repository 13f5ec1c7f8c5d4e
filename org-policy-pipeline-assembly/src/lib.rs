//! This crate provides the core logic of the organization policy pipeline:
//! - Guardrail concatenation and statement optimization for SCPs and RCPs
//! - Authorization-equivalence and security-finding gates (IAM Access Analyzer)
//! - Target resolution (accounts, OUs, environments, account tags)
//! - Environment generation, coverage and capacity reports (AWS Organizations)
//!

pub mod aws;
pub mod commands;
mod config;
mod error;
mod gate;
mod guardrails;
pub mod optimization;
pub mod providers;
mod targets;
mod types;

#[cfg(test)]
mod test_utils;

// Re-exports for a small, focused public API
pub use commands::{
    validate_records, CapacityEntry, CoverageReport, PolicyPipelineService,
    MAX_POLICIES_PER_TARGET,
};
pub use config::{PipelineConfig, PolicyKind, SecurityGate, DEFAULT_SECURITY_GATE};
pub use error::{AssemblyError, AssemblyResult};
pub use gate::EquivalenceGate;
pub use guardrails::concatenate_guardrails;
pub use targets::TargetResolver;
pub use types::{
    target_id_segment, AccessCheck, ActionType, AssemblyOutput, Condition, ConditionNode, Effect,
    Environment, Finding, ManagementRecord, OutputRow, PolicyDocument, PolicySource,
    PolicySourceKind, RecordSummary, Resource, RunSummary, Statement, TargetDescriptor,
    POLICY_VERSION,
};
