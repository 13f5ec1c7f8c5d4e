//! Organization Policy Pipeline Service Layer
//!
//! The service owns the two collaborators (directory and analyzer) and
//! exposes the pipeline operations: assembly, environment table generation,
//! coverage checks and capacity reports. Production code builds it from the
//! default AWS configuration; tests inject in-memory collaborators.

use aws_sdk_accessanalyzer::Client as AccessAnalyzerClient;
use aws_sdk_organizations::Client as OrganizationsClient;

use crate::aws::{AccessAnalyzer, OrganizationsDirectory};

/// Main service struct holding the collaborators every operation uses
pub struct PolicyPipelineService<D = OrganizationsDirectory, A = AccessAnalyzer> {
    pub(crate) directory: D,
    pub(crate) analyzer: A,
}

impl PolicyPipelineService {
    /// Create a service backed by AWS Organizations and IAM Access Analyzer
    ///
    /// The configuration is loaded using the default credential provider chain.
    pub async fn new() -> Self {
        let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .load()
            .await;

        Self {
            directory: OrganizationsDirectory::new(OrganizationsClient::new(&config)),
            analyzer: AccessAnalyzer::new(AccessAnalyzerClient::new(&config)),
        }
    }
}

impl<D, A> PolicyPipelineService<D, A> {
    pub fn with_collaborators(directory: D, analyzer: A) -> Self {
        Self {
            directory,
            analyzer,
        }
    }

    pub fn directory(&self) -> &D {
        &self.directory
    }

    pub fn analyzer(&self) -> &A {
        &self.analyzer
    }

    // assemble() and run() are in assemble.rs
    // generate_environments() is in environments.rs
    // check_coverage() is in coverage.rs
    // capacity_report() is in capacity.rs
}
