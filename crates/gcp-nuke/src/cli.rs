//! Command-line entry point
//!
//! Lives in the library so a binary that links its own adapters only has to
//! build a [`ResourceRegistry`] and call [`main`].

use crate::config::NukeConfig;
use crate::error::NukeError;
use crate::nuke::{Nuke, NukeParameters};
use crate::resource::{Credentials, Project, ResourceRegistry};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use gcp_nuke_common::defaults::{DEFAULT_FORCE_SLEEP_SECS, DEFAULT_MAX_WAIT_RETRIES};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "gcp-nuke")]
#[command(about = "Remove every deletable resource from a cloud project")]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub run: RunArgs,
}

/// Arguments for a nuke run
#[derive(clap::Args, Debug, Clone)]
pub struct RunArgs {
    /// Path to the nuke config file
    #[arg(short, long, env = "GCP_NUKE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Service-account key file (uses application default credentials if not set)
    #[arg(short, long, env = "GCP_NUKE_KEYFILE")]
    pub keyfile: Option<PathBuf>,

    /// ID of the project to nuke
    #[arg(short, long, env = "GCP_NUKE_PROJECT")]
    pub project: Option<String>,

    /// Only nuke this resource type (repeatable)
    #[arg(short, long = "target")]
    pub targets: Vec<String>,

    /// Never nuke this resource type (repeatable)
    #[arg(short, long = "exclude")]
    pub excludes: Vec<String>,

    /// Actually delete resources
    #[arg(long)]
    pub no_dry_run: bool,

    /// Don't ask for confirmation, sleep for --force-sleep instead
    #[arg(long)]
    pub force: bool,

    /// Seconds to wait before deleting when --force is set
    #[arg(long, default_value_t = DEFAULT_FORCE_SLEEP_SECS)]
    pub force_sleep: u64,

    /// Give up after this many passes with only waiting resources (0 = never)
    #[arg(long, default_value_t = DEFAULT_MAX_WAIT_RETRIES)]
    pub max_wait_retries: u32,

    /// Don't print filtered resources
    #[arg(short, long)]
    pub quiet: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl From<&RunArgs> for NukeParameters {
    fn from(args: &RunArgs) -> Self {
        Self {
            targets: args.targets.iter().collect(),
            excludes: args.excludes.iter().collect(),
            no_dry_run: args.no_dry_run,
            force: args.force,
            force_sleep: Duration::from_secs(args.force_sleep),
            max_wait_retries: args.max_wait_retries,
            quiet: args.quiet,
            ..Default::default()
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the registered resource types
    ResourceTypes {
        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Table)]
        format: Format,
    },

    /// Print the version
    Version,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Table,
    Json,
}

/// Parse the process arguments, run and exit with status 1 on error
pub async fn main(registry: ResourceRegistry) {
    let args = Args::parse();
    init_tracing(args.run.verbose);

    if let Err(e) = run(args, registry).await {
        print_error(&e);
        std::process::exit(1);
    }
}

pub fn init_tracing(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .init();
}

/// Report a failed run on stderr, coloured when stderr is a terminal
pub fn print_error(e: &anyhow::Error) {
    eprint!("{}", render_error(e, std::io::stderr().is_terminal()));
}

/// The error, its causes and any resources that kept the removal from converging
pub fn render_error(e: &anyhow::Error, colored: bool) -> String {
    let paint = |code: &str, text: &str| {
        if colored {
            format!("\x1b[{code}m{text}\x1b[0m")
        } else {
            text.to_string()
        }
    };

    let mut out = format!("\n{} {e}\n", paint("1;31", "Error:"));
    for cause in e.chain().skip(1) {
        out.push_str(&format!("  {} {cause}\n", paint("33", "Caused by:")));
    }

    if let Some(nuke_error) = e.downcast_ref::<NukeError>() {
        for item in nuke_error.items() {
            out.push_str(&format!("  {} {item}\n", paint("2", "-")));
        }
    }
    out
}

pub async fn run(args: Args, registry: ResourceRegistry) -> Result<()> {
    match args.command {
        Some(Command::ResourceTypes { format }) => {
            print!("{}", render_resource_types(&registry, format)?);
            Ok(())
        }
        Some(Command::Version) => {
            println!("gcp-nuke {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        None => handle_nuke(&args.run, registry).await,
    }
}

/// Registered resource types as a table or JSON document
pub fn render_resource_types(registry: &ResourceRegistry, format: Format) -> Result<String> {
    match format {
        Format::Json => {
            let types: Vec<_> = registry
                .iter()
                .map(|t| {
                    let caps = t.capabilities();
                    serde_json::json!({
                        "name": t.name(),
                        "dynamic_filter": caps.dynamic_filter,
                        "legacy_identity": caps.legacy_identity,
                        "properties": caps.properties,
                        "async_operation": caps.async_operation,
                        "feature_flags": caps.feature_flags,
                    })
                })
                .collect();
            Ok(format!("{}\n", serde_json::to_string_pretty(&types)?))
        }
        Format::Table => {
            let mut out = String::new();
            for t in registry.iter() {
                out.push_str(t.name());
                out.push('\n');
            }
            out.push_str(&format!("\nTotal: {} resource types\n", registry.len()));
            Ok(out)
        }
    }
}

async fn handle_nuke(args: &RunArgs, registry: ResourceRegistry) -> Result<()> {
    let config_path = args
        .config
        .as_ref()
        .context("no config file given; use --config")?;
    let config = NukeConfig::load(config_path)?;

    let credentials = Credentials {
        keyfile: args.keyfile.clone(),
        project: args.project.clone().unwrap_or_default(),
    };
    let locations = config
        .project(&credentials.project)
        .map(|p| p.locations.clone())
        .unwrap_or_default();
    let project = Project::new(credentials).with_locations(locations);

    info!(
        project = %project.name(),
        resource_types = registry.len(),
        dry_run = !args.no_dry_run,
        "Starting nuke"
    );

    let nuke = Nuke::new(args.into(), config, Arc::new(registry), Arc::new(project));
    nuke.run().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailedItem;
    use gcp_nuke_common::Collection;
    use crate::resource::{ClientHandle, MockClientProvider, MockLister, ResourceType};

    fn registry() -> ResourceRegistry {
        let mut builder = ResourceRegistry::builder();
        for name in ["Disk", "Bucket"] {
            let mut provider = MockClientProvider::new();
            provider
                .expect_create()
                .returning(|_| Ok(Arc::new(()) as ClientHandle));
            builder = builder.register(ResourceType::new(name, provider, MockLister::new()));
        }
        builder.build().unwrap()
    }

    #[test]
    fn test_parse_run_args() {
        let args = Args::parse_from([
            "gcp-nuke",
            "-c",
            "nuke.yaml",
            "--project",
            "dev",
            "-t",
            "Bucket",
            "--target",
            "Disk",
            "-e",
            "Network",
            "--no-dry-run",
            "--max-wait-retries",
            "5",
        ]);
        assert!(args.command.is_none());

        let parameters = NukeParameters::from(&args.run);
        assert_eq!(parameters.targets, Collection::from(vec!["Bucket", "Disk"]));
        assert_eq!(parameters.excludes, Collection::from(vec!["Network"]));
        assert!(parameters.no_dry_run);
        assert!(!parameters.force);
        assert_eq!(parameters.force_sleep, Duration::from_secs(15));
        assert_eq!(parameters.max_wait_retries, 5);
    }

    #[test]
    fn test_parse_subcommand() {
        let args = Args::parse_from(["gcp-nuke", "resource-types", "--format", "json"]);
        assert!(matches!(
            args.command,
            Some(Command::ResourceTypes {
                format: Format::Json
            })
        ));
    }

    #[test]
    fn test_render_resource_types() {
        let registry = registry();

        let table = render_resource_types(&registry, Format::Table).unwrap();
        assert!(table.starts_with("Bucket\nDisk\n"));
        assert!(table.contains("Total: 2 resource types"));

        let json = render_resource_types(&registry, Format::Json).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed[0]["name"], "Bucket");
        assert_eq!(parsed[1]["legacy_identity"], false);
    }

    #[test]
    fn test_render_error_lists_causes() {
        let err = anyhow::Error::from(NukeError::Scan {
            resource_type: "Bucket".to_string(),
            source: anyhow::anyhow!("permission denied"),
        })
        .context("run failed");

        let out = render_error(&err, false);
        assert_eq!(
            out,
            "\nError: run failed\n  Caused by: failed to scan Bucket\n  Caused by: permission denied\n"
        );
        assert!(render_error(&err, true).contains("\x1b[1;31mError:\x1b[0m run failed"));
    }

    #[test]
    fn test_render_error_lists_stuck_items() {
        let err = anyhow::Error::from(NukeError::MaxWaitRetriesExceeded {
            max_wait_retries: 2,
            passes: 3,
            waiting: vec![FailedItem {
                resource_type: "Bucket".to_string(),
                identity: "logs".to_string(),
                reason: "still listed".to_string(),
            }],
        });

        let out = render_error(&err, false);
        assert!(out.contains("(1 still waiting)"));
        assert!(out.ends_with("  - Bucket - logs: still listed\n"));
    }

    #[tokio::test]
    async fn test_run_requires_config() {
        let args = Args::parse_from(["gcp-nuke", "--project", "dev"]);
        let err = run(args, registry()).await.unwrap_err();
        assert!(err.to_string().contains("--config"));
    }
}
