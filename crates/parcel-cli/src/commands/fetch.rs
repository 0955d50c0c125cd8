//! `parcel fetch` command implementation.
//!
//! Resolves a request and copies the winning archive into the local
//! repository. A bundle that is already local is reused as is.

use parcel_core::error::ParcelResult;
use std::time::Instant;

use super::CommandContext;
use crate::QueryArgs;

/// Execute the `parcel fetch` command
pub async fn execute(query: QueryArgs, ctx: &CommandContext) -> ParcelResult<()> {
    let start_time = Instant::now();
    let constraint = query.constraint()?;

    let progress = ctx.progress();
    let Some(bundle) = ctx
        .resolver
        .fetch_dependency(&query.id, constraint.clone(), &progress)
        .await?
    else {
        return Err(ctx.resolution_failure(&query.id, &constraint).await);
    };

    ctx.output.result(&bundle.local_archive().display().to_string());
    ctx.output.success(&format!(
        "{} ready in {:.2}s",
        bundle,
        start_time.elapsed().as_secs_f64()
    ));

    Ok(())
}
