//! Assembly driver: management records in, output rows out.

use std::collections::HashSet;
use std::sync::Arc;

use log::{debug, info};

use crate::aws::{DirectoryService, PolicyAnalyzer};
use crate::config::PipelineConfig;
use crate::error::{AssemblyError, AssemblyResult};
use crate::gate::EquivalenceGate;
use crate::guardrails::concatenate_guardrails;
use crate::optimization::optimize_policy;
use crate::providers::{
    load_environments, load_management_records, load_policy_document, write_json_atomically,
};
use crate::targets::TargetResolver;
use crate::types::{
    AssemblyOutput, Environment, ManagementRecord, OutputRow, PolicyDocument, PolicySource,
    PolicySourceKind, RecordSummary, RunSummary,
};

impl<D: DirectoryService, A: PolicyAnalyzer> super::service::PolicyPipelineService<D, A> {
    /// Build every record's policy and fan it out to its targets.
    ///
    /// Records are processed in order; rows come out in record order and,
    /// within a record, in target discovery order. The first fatal condition
    /// aborts the whole assembly.
    pub async fn assemble(
        &self,
        config: &PipelineConfig,
        records: &[ManagementRecord],
        environments: &[Environment],
    ) -> AssemblyResult<AssemblyOutput> {
        validate_records(records)?;
        info!("SIDs are unique");

        let gate = EquivalenceGate::new(&self.analyzer, &config.security_gate, config.kind);
        let resolver = TargetResolver::new(&self.directory, environments);

        let mut rows = Vec::new();
        let mut summaries = Vec::with_capacity(records.len());
        for record in records {
            info!("[*] Processing statement ID: {}", record.sid);

            let (policy, mut summary) = build_policy(config, &gate, record).await?;
            let targets = resolver.resolve(&record.sid, &record.target).await?;
            summary.targets = targets.len();

            let policy = Arc::new(policy);
            rows.extend(targets.into_iter().map(|target_id| OutputRow {
                target_id,
                sid: record.sid.clone(),
                comments: record.comments.clone(),
                policy: Arc::clone(&policy),
            }));
            summaries.push(summary);
        }

        let summary = RunSummary {
            policy_kind: config.kind,
            generated_at: chrono::Utc::now(),
            records: summaries,
            rows: rows.len(),
        };
        Ok(AssemblyOutput { rows, summary })
    }

    /// Load the configured inputs, assemble them and write the output file.
    ///
    /// The output file is only written once every record has been processed.
    pub async fn run(&self, config: &PipelineConfig) -> AssemblyResult<RunSummary> {
        info!("Starting {} policy processor", config.kind);

        let records = load_management_records(&config.management_file).await?;
        let environments = load_environments(&config.environments_file).await?;

        let output = self.assemble(config, &records, &environments).await?;
        write_json_atomically(&config.output_file, &output.rows, false)?;
        info!(
            "Wrote {} policy attachments to {}",
            output.rows.len(),
            config.output_file.display()
        );
        Ok(output.summary)
    }
}

/// Reject duplicate SIDs and records without exactly one policy source.
///
/// Runs before any record is processed so that nothing reaches AWS for a
/// management file that cannot succeed.
pub fn validate_records(records: &[ManagementRecord]) -> AssemblyResult<()> {
    let mut seen = HashSet::with_capacity(records.len());
    for record in records {
        if record.sid.trim().is_empty() {
            return Err(AssemblyError::invalid_record(
                &record.sid,
                "SID must not be empty",
            ));
        }
        if !seen.insert(record.sid.as_str()) {
            return Err(AssemblyError::DuplicateSid {
                sid: record.sid.clone(),
            });
        }
    }
    for record in records {
        record.source()?;
    }
    Ok(())
}

async fn build_policy<A: PolicyAnalyzer + ?Sized>(
    config: &PipelineConfig,
    gate: &EquivalenceGate<'_, A>,
    record: &ManagementRecord,
) -> AssemblyResult<(PolicyDocument, RecordSummary)> {
    match record.source()? {
        PolicySource::Guardrails(names) => {
            info!(
                "Guardrails are being used for SID {}: {:?}",
                record.sid, names
            );
            let statements = concatenate_guardrails(names, &config.guardrails_dir).await?;
            let original = PolicyDocument::new(statements);
            let size_before = original.compact_size()?;
            info!("Length of the concatenated policy BEFORE optimization: {size_before}");

            let optimized = optimize_policy(&original)?;
            debug!("Optimized policy for SID {}: {}", record.sid, optimized.to_json()?);

            gate.verify_equivalence(&record.sid, &original, &optimized)
                .await?;
            let advisory = gate.evaluate_findings(&record.sid, &optimized).await?;

            let size_after = optimized.compact_size()?;
            info!("Length of the concatenated policy AFTER optimization: {size_after}");

            let summary = RecordSummary {
                sid: record.sid.clone(),
                source: PolicySourceKind::Guardrails,
                statements_before: original.statement.len(),
                statements_after: optimized.statement.len(),
                size_before,
                size_after,
                advisory_findings: advisory.len(),
                targets: 0,
            };
            Ok((optimized, summary))
        }
        PolicySource::Policy(name) => {
            info!(
                "Individual policy is being used for SID {}: {name}",
                record.sid
            );
            let mut document = load_policy_document(&config.policy_path(name)).await?;
            document.strip_sids();
            let advisory = gate.evaluate_findings(name, &document).await?;

            let size = document.compact_size()?;
            let summary = RecordSummary {
                sid: record.sid.clone(),
                source: PolicySourceKind::Policy,
                statements_before: document.statement.len(),
                statements_after: document.statement.len(),
                size_before: size,
                size_after: size,
                advisory_findings: advisory.len(),
                targets: 0,
            };
            Ok((document, summary))
        }
    }
}
