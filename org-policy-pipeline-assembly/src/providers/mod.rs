//! File access for pipeline inputs and outputs.

// Native filesystem provider implementation
pub(crate) mod filesystem;

// Typed JSON loading and atomic JSON output
pub(crate) mod json;

pub use filesystem::FileSystemProvider;
pub use json::{
    load_environments, load_guardrail, load_management_records, load_policy_document,
    write_json_atomically,
};
