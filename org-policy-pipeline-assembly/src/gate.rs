//! Equivalence and security-finding gate.
//!
//! An optimized document is only accepted when the policy analyzer confirms,
//! in both directions, that neither document grants access the other does
//! not. Service and resource control policies only restrict, so both copies
//! get the same allow-all statement appended before the comparison;
//! otherwise every check would trivially pass.

use log::{info, warn};

use crate::aws::PolicyAnalyzer;
use crate::config::{PolicyKind, SecurityGate};
use crate::error::{AssemblyError, AssemblyResult};
use crate::optimization::WILDCARD;
use crate::types::{Effect, Finding, PolicyDocument, Statement};

pub struct EquivalenceGate<'a, A: PolicyAnalyzer + ?Sized> {
    analyzer: &'a A,
    security_gate: &'a SecurityGate,
    kind: PolicyKind,
}

fn allow_all_statement() -> Statement {
    Statement::new(
        Effect::Allow,
        vec![WILDCARD.to_string()],
        vec![WILDCARD.to_string()],
    )
}

fn with_allow_all(document: &PolicyDocument) -> PolicyDocument {
    let mut copy = document.clone();
    copy.statement.push(allow_all_statement());
    copy
}

impl<'a, A: PolicyAnalyzer + ?Sized> EquivalenceGate<'a, A> {
    pub fn new(analyzer: &'a A, security_gate: &'a SecurityGate, kind: PolicyKind) -> Self {
        Self {
            analyzer,
            security_gate,
            kind,
        }
    }

    /// Fail unless `optimized` and `original` authorize exactly the same
    /// requests.
    pub async fn verify_equivalence(
        &self,
        sid: &str,
        original: &PolicyDocument,
        optimized: &PolicyDocument,
    ) -> AssemblyResult<()> {
        let original = with_allow_all(original);
        let optimized = with_allow_all(optimized);

        let forward = self
            .analyzer
            .check_no_new_access(&optimized, &original)
            .await?;
        let backward = self
            .analyzer
            .check_no_new_access(&original, &optimized)
            .await?;

        if forward.no_new_access && backward.no_new_access && forward.message == backward.message
        {
            info!("Optimized policy for SID {sid} has the same effect");
            Ok(())
        } else {
            Err(AssemblyError::EquivalenceMismatch {
                sid: sid.to_string(),
                details: format!(
                    "optimized vs original: {}; original vs optimized: {}",
                    forward.message, backward.message
                ),
            })
        }
    }

    /// Validate `document` and fail on gated findings.
    ///
    /// Returns the advisory findings, which have already been logged.
    pub async fn evaluate_findings(
        &self,
        label: &str,
        document: &PolicyDocument,
    ) -> AssemblyResult<Vec<Finding>> {
        info!(
            "Validating {} policy '{label}' with Access Analyzer (security gate: {:?})",
            self.kind,
            self.security_gate.finding_types().collect::<Vec<_>>()
        );
        let findings = self.analyzer.validate_policy(document, self.kind).await?;
        if findings.is_empty() {
            info!("No findings found");
            return Ok(findings);
        }

        let (blocking, advisory) = self.security_gate.partition(findings);
        if !blocking.is_empty() {
            return Err(AssemblyError::GatedFindings {
                policy: label.to_string(),
                findings: blocking,
            });
        }

        warn!(
            "Non-critical findings were found in {} policy '{label}': {}",
            self.kind,
            serde_json::to_string_pretty(&advisory).unwrap_or_default()
        );
        Ok(advisory)
    }
}
