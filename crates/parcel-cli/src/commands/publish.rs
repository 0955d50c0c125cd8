//! `parcel publish` command implementation.
//!
//! Packs into the local repository first, then hands the archive to the
//! named site, which stores it and updates its manifest.

use parcel_core::error::ParcelResult;
use parcel_core::ArchiveType;
use std::path::Path;

use super::CommandContext;

/// Execute the `parcel publish` command
pub async fn execute(
    dir: &Path,
    id: &str,
    version: &str,
    site: &str,
    archive_type: Option<ArchiveType>,
    ctx: &CommandContext,
) -> ParcelResult<()> {
    let archive_type = ctx.archive_type(archive_type)?;
    let source = ctx.path(dir);

    let progress = ctx.progress();
    let bundle = ctx
        .resolver
        .publish(&source, id, version, archive_type, site, &progress)
        .await?;

    ctx.output.result(&bundle.content_hash()?);
    ctx.output.success(&format!("Published {} to {}", bundle, site));

    Ok(())
}
