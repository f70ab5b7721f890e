//! Command-line surface of rest-ingester.
//!
//! Only argument parsing, startup validation and wiring live here. What gets
//! sent to the repository, and in which order, is decided by
//! `rest-ingester-core`.
//!
//! Programmatic callers (and the integration tests) build a [`Cli`] and hand
//! it to [`run`].

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};

use rest_ingester_core::packager::PackagerRegistry;
use rest_ingester_core::plugin::PluginRegistry;
use rest_ingester_core::synchronise::{synchronise, IngestReport};

use crate::client::RestClient;
use crate::load_config::{load_config, FileConfig};
use crate::logging::DEFAULT_LOG_FILE;

/// Ingest directories of packaged content into Islandora over its REST API.
#[derive(Debug, Parser)]
#[clap(
    name = "rest-ingester",
    version,
    about = "Ingest directories of packaged content into an Islandora repository over its REST API"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Ingest every package directory found directly under INPUT_DIR
    Ingest(IngestArgs),
}

#[derive(Debug, Clone, Default, Args)]
pub struct IngestArgs {
    /// Directory holding one subdirectory per package
    pub input_dir: PathBuf,

    /// Content model of the top-level objects, e.g. islandora:sp_pdf
    #[clap(short = 'm', long = "cmodel")]
    pub content_model: Option<String>,

    /// PID of the parent collection, newspaper or other object
    #[clap(short = 'p', long)]
    pub parent: Option<String>,

    /// Namespace (or full PID) for new objects; defaults to each directory name
    #[clap(short = 'n', long)]
    pub namespace: Option<String>,

    /// Owner of new objects
    #[clap(short = 'o', long)]
    pub owner: Option<String>,

    /// Predicate linking top-level objects to the parent [default: isMemberOfCollection]
    #[clap(short = 'r', long)]
    pub relationship: Option<String>,

    /// none, MD5, SHA-1, SHA-256, SHA-384 or SHA-512 [default: SHA-1]
    #[clap(short = 'c', long)]
    pub checksum_type: Option<String>,

    /// REST endpoint [default: http://localhost/islandora/rest/v1]
    #[clap(short = 'e', long)]
    pub endpoint: Option<String>,

    /// REST user; falls back to ISLANDORA_REST_USER
    #[clap(short = 'u', long)]
    pub user: Option<String>,

    /// REST token; falls back to ISLANDORA_REST_TOKEN
    #[clap(short = 't', long)]
    pub token: Option<String>,

    /// Log file, appended to
    #[clap(short = 'l', long, default_value = DEFAULT_LOG_FILE)]
    pub log: PathBuf,

    /// Object state: A, I or D [default: A]
    #[clap(short = 's', long)]
    pub state: Option<String>,

    /// Delete each package directory after it is ingested
    #[clap(short = 'd', long)]
    pub delete_input: bool,

    /// Skip datastream files larger than this many MiB [default: 1024]
    #[clap(long = "max-size-mib")]
    pub max_size_mib: Option<u64>,

    /// Plugin to run on each package before ingest; repeatable, runs in order
    #[clap(long = "plugin")]
    pub plugins: Vec<String>,

    /// YAML file with defaults for any of the options above
    #[clap(long)]
    pub config: Option<PathBuf>,
}

impl IngestArgs {
    /// Flags as the highest-precedence configuration layer.
    pub fn overrides(&self) -> FileConfig {
        FileConfig {
            content_model: self.content_model.clone(),
            parent: self.parent.clone(),
            namespace: self.namespace.clone(),
            owner: self.owner.clone(),
            relationship: self.relationship.clone(),
            checksum_type: self.checksum_type.clone(),
            endpoint: self.endpoint.clone(),
            user: self.user.clone(),
            token: self.token.clone(),
            state: self.state.clone(),
            max_datastream_size_mib: self.max_size_mib,
            delete_input: self.delete_input.then_some(true),
            plugins: self.plugins.clone(),
        }
    }
}

impl Commands {
    pub fn log_path(&self) -> &std::path::Path {
        match self {
            Commands::Ingest(args) => &args.log,
        }
    }
}

/// Async entrypoint shared by `main` and the integration tests.
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Ingest(args) => ingest(args).await,
    }
}

async fn ingest(args: IngestArgs) -> Result<()> {
    let config = load_config(args.config.as_deref(), args.overrides())?;

    if !args.input_dir.is_dir() {
        tracing::error!(input = %args.input_dir.display(), "Input directory does not exist");
        bail!("Input directory {} does not exist", args.input_dir.display());
    }

    let packagers = PackagerRegistry::with_defaults();
    packagers.resolve(&config.content_model).with_context(|| {
        format!(
            "Supported content models: {}",
            packagers.content_models().join(", ")
        )
    })?;
    let plugin_table = PluginRegistry::with_builtins();
    let plugins = plugin_table.resolve(&config.plugins).with_context(|| {
        format!("Available plugins: {}", plugin_table.names().join(", "))
    })?;

    let client = RestClient::from_config(&config)?;

    tracing::info!(command = "ingest", input = %args.input_dir.display(), "Ingest started");
    match synchronise(&config, &client, &packagers, &plugins, &args.input_dir).await {
        Ok(report) => {
            tracing::info!(
                command = "ingest",
                ingested = report.ingested.len(),
                skipped = report.skipped.len(),
                failed = report.failed.len(),
                "Ingest finished"
            );
            check_report(&report)
        }
        Err(e) => {
            tracing::error!(command = "ingest", error = %e, "Ingest failed");
            Err(e.into())
        }
    }
}

/// Turn failed or incomplete packages into a non-zero exit.
pub fn check_report(report: &IngestReport) -> Result<()> {
    for (path, e) in &report.failed {
        tracing::error!(path = %path.display(), error = %e, "Package failed");
    }
    for package in report.incomplete() {
        tracing::error!(
            path = %package.path.display(),
            pid = %package.pid,
            missing_children = package.missing_children,
            "Package is missing children"
        );
    }
    if !report.is_clean() {
        bail!(
            "{} package(s) failed and {} are missing children; see the log",
            report.failed.len(),
            report.incomplete().count()
        );
    }
    Ok(())
}
