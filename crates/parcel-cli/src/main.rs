//! # parcel-cli
//!
//! Command-line front end for parcel: resolve, fetch, pack, publish and
//! inspect versioned bundles.
//!
//! This is the main entry point. It parses arguments, sets up logging and
//! the panic hook, loads configuration, and dispatches to the command
//! handlers.

use clap::{Args, Parser, Subcommand};
use parcel_core::error::{ParcelError, ParcelResult};
use parcel_core::{ArchiveType, Op};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::CommandContext;
use output::errors::ErrorFormatter;

/// Resolve, fetch, pack and publish versioned bundles
#[derive(Debug, Parser)]
#[command(name = "parcel", version, about = "Artifact resolver and bundle packager")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Options shared by every command
#[derive(Debug, Clone, Default, Args)]
pub struct GlobalArgs {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file to use instead of the usual lookup
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Local repository root
    #[arg(long, global = true, value_name = "PATH")]
    pub repository: Option<PathBuf>,
}

/// Identifier and version constraint of a request
#[derive(Debug, Clone, Args)]
pub struct QueryArgs {
    /// Bundle identifier
    pub id: String,

    /// Comparison operator: > >= < <= = ..
    #[arg(long, default_value = ">=")]
    pub op: Op,

    /// Target version; for `..` two bounds such as 1.0,2.0
    #[arg(long = "version", value_name = "VERSION", default_value = "0.0.0")]
    pub target: String,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show the best matching bundle across sites and the local repository
    Resolve {
        #[command(flatten)]
        query: QueryArgs,

        /// Only consider the local repository
        #[arg(long, conflicts_with = "remote_only")]
        local_only: bool,

        /// Only consider remote sites
        #[arg(long)]
        remote_only: bool,
    },
    /// Resolve and copy the winning bundle into the local repository
    Fetch {
        #[command(flatten)]
        query: QueryArgs,
    },
    /// Pack a directory into the local repository
    Pack {
        /// Directory to pack
        dir: PathBuf,
        id: String,
        #[arg(id = "bundle_version", value_name = "VERSION")]
        version: String,

        /// Archive type: zip, tar.gz or tar.bz2
        #[arg(long = "type", value_name = "TYPE")]
        archive_type: Option<ArchiveType>,
    },
    /// Pack a directory and publish it to a configured site
    Publish {
        /// Directory to pack
        dir: PathBuf,
        id: String,
        #[arg(id = "bundle_version", value_name = "VERSION")]
        version: String,

        /// Name of the destination site
        #[arg(long)]
        site: String,

        /// Archive type: zip, tar.gz or tar.bz2
        #[arg(long = "type", value_name = "TYPE")]
        archive_type: Option<ArchiveType>,
    },
    /// Extract a bundle from the local repository
    Extract {
        id: String,
        #[arg(id = "bundle_version", value_name = "VERSION")]
        version: String,
        /// Destination directory
        dest: PathBuf,
    },
    /// List bundles in the local repository
    List {
        /// Only list versions of this identifier
        id: Option<String>,
    },
    /// Print the SHA-1 of a bundle's archive
    Hash {
        id: String,
        #[arg(id = "bundle_version", value_name = "VERSION")]
        version: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    setup_logging(cli.global.verbose);
    setup_panic_handler();

    debug!("Starting parcel v{}", env!("CARGO_PKG_VERSION"));

    match run_cli(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprint!("{}", ErrorFormatter::new().format_error(&err));
            ExitCode::FAILURE
        }
    }
}

fn run_cli(cli: Cli) -> ParcelResult<()> {
    // Create Tokio runtime for async operations
    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| ParcelError::io("Failed to create async runtime", e))?;

    rt.block_on(async {
        let ctx = CommandContext::new(&cli.global).await?;
        commands::dispatch_command(cli.command, &ctx).await
    })
}

fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "parcel={level},parcel_core={level},parcel_bundle={level},parcel_site={level},\
             parcel_resolver={level},parcel_config={level}"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose)
        .with_writer(std::io::stderr)
        .init();
}

fn setup_panic_handler() {
    std::panic::set_hook(Box::new(|panic_info| {
        error!("parcel encountered an unexpected error: {}", panic_info);
        eprintln!("parcel crashed! This is a bug.");
        eprintln!("Error: {}", panic_info);
    }));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_defaults() {
        let cli = Cli::try_parse_from(["parcel", "resolve", "foo"]).unwrap();
        match cli.command {
            Commands::Resolve {
                query,
                local_only,
                remote_only,
            } => {
                assert_eq!(query.id, "foo");
                assert_eq!(query.op, Op::GreaterEq);
                assert_eq!(query.target, "0.0.0");
                assert!(!local_only && !remote_only);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_resolve_with_constraint() {
        let cli = Cli::try_parse_from([
            "parcel", "resolve", "foo", "--op", "..", "--version", "1.0,2.0", "--local-only",
        ])
        .unwrap();
        match cli.command {
            Commands::Resolve { query, local_only, .. } => {
                assert_eq!(query.op, Op::Range);
                assert_eq!(query.target, "1.0,2.0");
                assert!(local_only);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_local_and_remote_only_conflict() {
        assert!(Cli::try_parse_from([
            "parcel",
            "resolve",
            "foo",
            "--local-only",
            "--remote-only"
        ])
        .is_err());
    }

    #[test]
    fn test_bad_operator_rejected() {
        assert!(Cli::try_parse_from(["parcel", "fetch", "foo", "--op", "~"]).is_err());
    }

    #[test]
    fn test_pack_with_type_and_globals() {
        let cli = Cli::try_parse_from([
            "parcel",
            "pack",
            "./build",
            "tool",
            "1.2.0",
            "--type",
            "tar.bz2",
            "--repository",
            "/srv/parcel",
            "-v",
        ])
        .unwrap();

        assert!(cli.global.verbose);
        assert_eq!(cli.global.repository, Some(PathBuf::from("/srv/parcel")));
        match cli.command {
            Commands::Pack {
                dir,
                id,
                version,
                archive_type,
            } => {
                assert_eq!(dir, PathBuf::from("./build"));
                assert_eq!(id, "tool");
                assert_eq!(version, "1.2.0");
                assert_eq!(archive_type, Some(ArchiveType::TarBz2));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_publish_requires_site() {
        assert!(Cli::try_parse_from(["parcel", "publish", "./build", "tool", "1.0.0"]).is_err());

        let cli = Cli::try_parse_from([
            "parcel", "publish", "./build", "tool", "1.0.0", "--site", "shared",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Publish { site, .. } if site == "shared"));
    }

    #[test]
    fn test_list_optional_id() {
        let cli = Cli::try_parse_from(["parcel", "list"]).unwrap();
        assert!(matches!(cli.command, Commands::List { id: None }));

        let cli = Cli::try_parse_from(["parcel", "--config", "ci.toml", "list", "foo"]).unwrap();
        assert_eq!(cli.global.config, Some(PathBuf::from("ci.toml")));
        assert!(matches!(cli.command, Commands::List { id: Some(ref id) } if id == "foo"));
    }
}
