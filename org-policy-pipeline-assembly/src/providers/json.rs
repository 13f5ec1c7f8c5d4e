//! Typed loaders for the pipeline's JSON inputs.

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::filesystem::FileSystemProvider;
use crate::error::{AssemblyError, AssemblyResult};
use crate::types::{Environment, ManagementRecord, PolicyDocument, Statement};

async fn load<T>(path: &Path, expected: &'static str) -> AssemblyResult<T>
where
    T: DeserializeOwned,
{
    let contents = FileSystemProvider::read_file(path).await?;
    serde_json::from_str(&contents).map_err(|e| AssemblyError::json(path, expected, e))
}

/// Load a `<kind>-management.json` record list.
pub async fn load_management_records(path: &Path) -> AssemblyResult<Vec<ManagementRecord>> {
    load(path, "management").await
}

/// Load the environment table.
pub async fn load_environments(path: &Path) -> AssemblyResult<Vec<Environment>> {
    load(path, "environment table").await
}

/// Load a standalone policy document.
pub async fn load_policy_document(path: &Path) -> AssemblyResult<PolicyDocument> {
    load(path, "policy document").await
}

/// Load a guardrail fragment: a bare array of statements.
pub async fn load_guardrail(path: &Path) -> AssemblyResult<Vec<Statement>> {
    load(path, "guardrail").await
}

/// Serialize `value` and atomically replace `path` with it.
pub fn write_json_atomically<T>(path: &Path, value: &T, pretty: bool) -> AssemblyResult<()>
where
    T: ?Sized + Serialize,
{
    let json = if pretty {
        serde_json::to_vec_pretty(value)
    } else {
        serde_json::to_vec(value)
    }
    .map_err(|e| AssemblyError::serialization(path.display().to_string(), e))?;
    FileSystemProvider::write_atomically(path, &json)
}
