//! `parcel hash` command implementation.

use parcel_core::error::{ParcelError, ParcelResult};

use super::CommandContext;
use crate::output::errors::ErrorFormatter;

/// Execute the `parcel hash` command.
///
/// Prints the SHA-1 of a cached archive and warns when the local manifest
/// records a different one.
pub async fn execute(id: &str, version: &str, ctx: &CommandContext) -> ParcelResult<()> {
    let repository = ctx.resolver.repository();
    let bundle = repository
        .find(id, version)?
        .ok_or_else(|| ParcelError::ArchiveNotFound {
            path: repository.root().join(id).join(version),
        })?;

    let sha1 = bundle.content_hash()?;
    ctx.output.result(&sha1);

    if let Some(entry) = repository.manifest()?.get(id, version) {
        if entry.sha1 != sha1 {
            let formatter = ErrorFormatter::with_colors(*ctx.output.colors());
            eprintln!(
                "{}",
                formatter.format_warning(&format!(
                    "manifest records {} for {} {}",
                    entry.sha1, id, version
                ))
            );
        }
    }

    Ok(())
}
