//! `parcel list` command implementation.

use parcel_core::error::ParcelResult;

use super::CommandContext;

/// Execute the `parcel list` command.
///
/// With an identifier, prints its versions oldest first; otherwise prints
/// every cached bundle.
pub async fn execute(id: Option<&str>, ctx: &CommandContext) -> ParcelResult<()> {
    let repository = ctx.resolver.repository();

    match id {
        Some(id) => {
            let versions = repository.versions(id)?;
            if versions.is_empty() {
                ctx.output
                    .info(&format!("No versions of {} in {}", id, repository.root().display()));
            }
            for version in versions {
                ctx.output.result(&version);
            }
        }
        None => {
            let bundles = repository.bundles()?;
            if bundles.is_empty() {
                ctx.output.info(&format!("No bundles in {}", repository.root().display()));
            }
            for bundle in bundles {
                ctx.output.result(&format!(
                    "{} {} {}",
                    bundle.id(),
                    bundle.version_label(),
                    bundle.archive_type()
                ));
            }
        }
    }

    Ok(())
}
