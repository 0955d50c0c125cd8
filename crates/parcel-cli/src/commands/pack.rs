//! `parcel pack` command implementation.

use parcel_core::error::ParcelResult;
use parcel_core::ArchiveType;
use std::path::Path;

use super::CommandContext;

/// Execute the `parcel pack` command: pack `dir` into the local repository
/// and print the archive's SHA-1
pub async fn execute(
    dir: &Path,
    id: &str,
    version: &str,
    archive_type: Option<ArchiveType>,
    ctx: &CommandContext,
) -> ParcelResult<()> {
    let archive_type = ctx.archive_type(archive_type)?;
    let source = ctx.path(dir);

    let progress = ctx.progress();
    let bundle = ctx.resolver.pack(&source, id, version, archive_type, &progress)?;

    ctx.output.result(&bundle.content_hash()?);
    ctx.output.success(&format!("Packed {} at {}", bundle, bundle.local_archive().display()));

    Ok(())
}
