//! `parcel extract` command implementation.

use parcel_core::error::{ParcelError, ParcelResult};
use std::path::Path;

use super::CommandContext;

/// Execute the `parcel extract` command: unpack a cached bundle into `dest`
pub async fn execute(
    id: &str,
    version: &str,
    dest: &Path,
    ctx: &CommandContext,
) -> ParcelResult<()> {
    let repository = ctx.resolver.repository();
    let bundle = repository
        .find(id, version)?
        .ok_or_else(|| ParcelError::ArchiveNotFound {
            path: repository.root().join(id).join(version),
        })?;

    let dest = ctx.path(dest);
    let progress = ctx.progress();
    bundle.extract(&dest, &progress)?;

    ctx.output.success(&format!("Extracted {} into {}", bundle, dest.display()));
    Ok(())
}
