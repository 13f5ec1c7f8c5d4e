//! Commands module - service layer for organization policy pipeline operations

mod assemble;
mod capacity;
mod coverage;
mod environments;
pub(crate) mod service;

pub use assemble::validate_records;
pub use capacity::{CapacityEntry, MAX_POLICIES_PER_TARGET};
pub use coverage::CoverageReport;
pub use environments::is_excluded_policy;
pub use service::PolicyPipelineService;
