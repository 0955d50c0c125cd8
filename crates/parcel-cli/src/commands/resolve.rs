//! `parcel resolve` command implementation.
//!
//! Runs one resolution pass and prints the winner without transferring
//! anything.

use parcel_core::error::ParcelResult;
use parcel_resolver::ResolveOptions;

use super::CommandContext;
use crate::QueryArgs;

/// Execute the `parcel resolve` command
pub async fn execute(
    query: QueryArgs,
    local_only: bool,
    remote_only: bool,
    ctx: &CommandContext,
) -> ParcelResult<()> {
    let constraint = query.constraint()?;
    let options = ResolveOptions {
        remote: !local_only,
        local: !remote_only,
    };

    let mut resolver = ctx.resolver.resolver(&query.id, constraint.clone());
    let Some(resolution) = resolver.resolve_with(options).await else {
        return Err(ctx.resolution_failure(&query.id, &constraint).await);
    };

    let colors = ctx.output.colors();
    ctx.output.result(&format!(
        "{} {} {}",
        colors.bold(resolution.id()),
        resolution.bundle().version_label(),
        resolution.locator()
    ));

    match resolution.sha1().await {
        Ok(Some(sha1)) => ctx.output.info(&format!("sha1 {}", sha1)),
        Ok(None) => ctx.output.info("sha1 not published"),
        Err(err) => ctx.output.warn(&format!("Unable to look up sha1: {}", err)),
    }
    ctx.output.info(&format!(
        "from {} ({})",
        resolution.site().map(|site| site.name()).unwrap_or("local repository"),
        resolution.archive_type()
    ));

    Ok(())
}
