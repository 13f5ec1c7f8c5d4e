//! Guardrail concatenation.
//!
//! A guardrail is a JSON file holding a bare array of statements. The
//! guardrails named by a management record are concatenated, in order, into
//! one statement list with every statement identifier removed.

use std::path::Path;

use log::{error, info};

use crate::error::{AssemblyError, AssemblyResult};
use crate::providers::load_guardrail;
use crate::types::Statement;

/// Concatenate the named guardrails found in `folder`.
///
/// A guardrail that cannot be read aborts the merge. A guardrail that is not
/// a valid statement array is reported and skipped, so the resulting policy
/// will be missing its statements.
pub async fn concatenate_guardrails(
    names: &[String],
    folder: &Path,
) -> AssemblyResult<Vec<Statement>> {
    info!(
        "The following guardrails will be merged in a single policy: {:?}",
        names
    );

    let mut statements = Vec::new();
    for name in names {
        let path = folder.join(format!("{name}.json"));
        match load_guardrail(&path).await {
            Ok(fragment) => {
                statements.extend(fragment.into_iter().map(|mut statement| {
                    statement.strip_sid();
                    statement
                }));
            }
            Err(err @ AssemblyError::Json { .. }) => {
                error!("[!] Skipping guardrail '{name}', its statements are NOT included: {err}");
            }
            Err(err) => return Err(err),
        }
    }
    Ok(statements)
}
