//! Command implementations and dispatch logic.
//!
//! Each command is an async function taking the shared [`CommandContext`],
//! which carries the loaded configuration, the resolver context built
//! from it, and the output handler.

use camino::Utf8PathBuf;
use parcel_config::{build_sites, ConfigLoader, ConfigSource, ParcelToml};
use parcel_core::error::{ParcelError, ParcelResult};
use parcel_core::{ArchiveType, Constraint};
use parcel_resolver::ResolverContext;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use tracing::{debug, info, warn};

pub mod extract;
pub mod fetch;
pub mod hash;
pub mod list;
pub mod pack;
pub mod publish;
pub mod resolve;

#[cfg(test)]
mod tests;

use crate::output::progress::ProgressBar;
use crate::output::OutputHandler;
use crate::{Commands, GlobalArgs, QueryArgs};

/// Shared context for all commands
pub struct CommandContext {
    pub cwd: PathBuf,
    pub output: OutputHandler,
    pub config: ParcelToml,
    pub resolver: ResolverContext,
}

impl CommandContext {
    /// Load configuration and open the local repository and sites
    pub async fn new(global: &GlobalArgs) -> ParcelResult<Self> {
        let loader = ConfigLoader::from_environment()?
            .with_explicit(utf8_option(global.config.as_deref())?);

        let cwd = std::env::current_dir()
            .map_err(|e| ParcelError::io("Failed to get current directory", e))?;

        let mut cli_overrides = HashMap::new();
        if let Some(repository) = &global.repository {
            let absolute = cwd.join(repository);
            cli_overrides.insert("repository".to_string(), utf8(&absolute)?.to_string());
        }

        let (config, source) = loader.load(&cli_overrides).await?;
        match &source {
            ConfigSource::Defaults => debug!("Using default configuration"),
            other => info!(
                "Using configuration {}",
                other.path().map(|p| p.as_str()).unwrap_or_default()
            ),
        }

        let root = loader.repository_root(&config);
        Self::with_config(cwd, OutputHandler::new(), config, root.as_std_path())
    }

    /// Build a context from an already loaded configuration
    pub fn with_config(
        cwd: PathBuf,
        output: OutputHandler,
        config: ParcelToml,
        repository_root: &Path,
    ) -> ParcelResult<Self> {
        let mut resolver = ResolverContext::open(repository_root)?;
        for site in build_sites(&config)? {
            resolver.add_site(site);
        }
        debug!("{:?}", resolver);

        Ok(Self {
            cwd,
            output,
            config,
            resolver,
        })
    }

    /// Archive type from the command line, else from configuration
    pub fn archive_type(&self, requested: Option<ArchiveType>) -> ParcelResult<ArchiveType> {
        match requested {
            Some(archive_type) => Ok(archive_type),
            None => self.config.default_archive(),
        }
    }

    /// Resolve a user-supplied path against the working directory
    pub fn path(&self, path: &Path) -> PathBuf {
        self.cwd.join(path)
    }

    /// A progress bar wired to Ctrl-C
    pub fn progress(&self) -> ProgressBar {
        let progress = self.output.progress();
        let cancelled = progress.cancel_handle();
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupted, cancelling");
                    cancelled.store(true, Ordering::Relaxed);
                }
            });
        }
        progress
    }

    /// Every identifier known locally or to a site index
    pub async fn known_ids(&self) -> Vec<String> {
        let mut ids = BTreeSet::new();

        match self.resolver.repository().bundles() {
            Ok(bundles) => ids.extend(bundles.iter().map(|bundle| bundle.id().to_string())),
            Err(err) => debug!("Unable to scan local repository: {}", err),
        }

        for site in self.resolver.sites() {
            match site.index().await {
                Ok(index) => ids.extend(index.ids().map(str::to_string)),
                Err(err) => debug!("No index from {}: {}", site.name(), err),
            }
        }

        ids.into_iter().collect()
    }

    /// Resolution failure for `id`, printing a close match if one exists
    pub async fn resolution_failure(&self, id: &str, constraint: &Constraint) -> ParcelError {
        let known = self.known_ids().await;
        if !known.iter().any(|candidate| candidate == id) {
            if let Some(suggestion) = suggest_similar_command(id, &known) {
                self.output.info(&format!("Did you mean '{}'?", suggestion));
            }
        }

        ParcelError::ResolutionFailure {
            id: id.to_string(),
            constraint: constraint.to_string(),
        }
    }
}

impl QueryArgs {
    pub fn constraint(&self) -> ParcelResult<Constraint> {
        Constraint::new(self.op, &self.target)
    }
}

/// Dispatch a command to its handler
pub async fn dispatch_command(command: Commands, ctx: &CommandContext) -> ParcelResult<()> {
    match command {
        Commands::Resolve {
            query,
            local_only,
            remote_only,
        } => {
            debug!("Resolving {} {} {}", query.id, query.op, query.target);
            resolve::execute(query, local_only, remote_only, ctx).await
        }
        Commands::Fetch { query } => {
            debug!("Fetching {} {} {}", query.id, query.op, query.target);
            fetch::execute(query, ctx).await
        }
        Commands::Pack {
            dir,
            id,
            version,
            archive_type,
        } => {
            debug!("Packing {} as {} {}", dir.display(), id, version);
            pack::execute(&dir, &id, &version, archive_type, ctx).await
        }
        Commands::Publish {
            dir,
            id,
            version,
            site,
            archive_type,
        } => {
            debug!("Publishing {} as {} {} to {}", dir.display(), id, version, site);
            publish::execute(&dir, &id, &version, &site, archive_type, ctx).await
        }
        Commands::Extract { id, version, dest } => {
            debug!("Extracting {} {} into {}", id, version, dest.display());
            extract::execute(&id, &version, &dest, ctx).await
        }
        Commands::List { id } => list::execute(id.as_deref(), ctx).await,
        Commands::Hash { id, version } => hash::execute(&id, &version, ctx).await,
    }
}

fn utf8(path: &Path) -> ParcelResult<Utf8PathBuf> {
    Utf8PathBuf::from_path_buf(path.to_path_buf()).map_err(|path| ParcelError::ConfigValidation {
        field: "path".to_string(),
        reason: format!("{} is not valid UTF-8", path.display()),
    })
}

fn utf8_option(path: Option<&Path>) -> ParcelResult<Option<Utf8PathBuf>> {
    path.map(utf8).transpose()
}

/// Suggest the closest candidate within an edit distance of two
pub fn suggest_similar_command(input: &str, candidates: &[String]) -> Option<String> {
    let mut best_match = None;
    let mut best_distance = usize::MAX;

    for candidate in candidates {
        let distance = edit_distance(input, candidate);
        if distance < best_distance && distance <= 2 {
            best_distance = distance;
            best_match = Some(candidate);
        }
    }

    best_match.cloned()
}

/// Calculate edit distance between two strings
fn edit_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();

    if a_chars.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a_chars.len();
    }

    // Single rolling row of the Levenshtein matrix
    let mut row: Vec<usize> = (0..=b_chars.len()).collect();
    for (i, a_char) in a_chars.iter().enumerate() {
        let mut diagonal = row[0];
        row[0] = i + 1;
        for (j, b_char) in b_chars.iter().enumerate() {
            let cost = usize::from(a_char != b_char);
            let next = (row[j + 1] + 1).min(row[j] + 1).min(diagonal + cost);
            diagonal = row[j + 1];
            row[j + 1] = next;
        }
    }

    row[b_chars.len()]
}
