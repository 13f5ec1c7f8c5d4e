//! Statement optimization: canonical forms and merging of compatible
//! statements.

pub(crate) mod merge;
pub(crate) mod normalize;

pub use merge::{optimize_policy, optimize_statements};
pub use normalize::{normalize_condition, normalize_resource, WILDCARD};
