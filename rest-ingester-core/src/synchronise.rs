//! The driving loop: one input directory, one package per subdirectory.
//!
//! Packages are handled strictly one after another, in natural order. For
//! each one the configured plugins run first, then the packager registered
//! for the configured content model ingests it (and all its children).
//! Nothing a single package does can stop the loop; only a configuration
//! problem (unknown content model, unreadable input directory) returns an
//! error.
//!
//! # Navigation
//! - Main entrypoint: [`synchronise`]
//! - Result: [`IngestReport`]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::config::IngestConfig;
use crate::contract::RepositoryApi;
use crate::error::{IngestError, IngestOutcome, SkipReason};
use crate::packager::{child_dirs, IngestContext, PackagerRegistry};
use crate::plugin::{run_plugins, Plugin};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestedPackage {
    pub path: PathBuf,
    pub pid: String,
    /// Children left out of the repository; the input is kept when non-zero.
    pub missing_children: usize,
}

/// What happened to every top-level package in one run.
#[derive(Debug, Default)]
pub struct IngestReport {
    pub ingested: Vec<IngestedPackage>,
    pub skipped: Vec<(PathBuf, SkipReason)>,
    pub failed: Vec<(PathBuf, IngestError)>,
}

impl IngestReport {
    pub fn total(&self) -> usize {
        self.ingested.len() + self.skipped.len() + self.failed.len()
    }

    pub fn pids(&self) -> Vec<&str> {
        self.ingested.iter().map(|p| p.pid.as_str()).collect()
    }

    /// Packages whose object exists but some of whose children do not.
    pub fn incomplete(&self) -> impl Iterator<Item = &IngestedPackage> {
        self.ingested.iter().filter(|p| p.missing_children > 0)
    }

    /// True when every package and every child made it in, or was skipped.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.incomplete().next().is_none()
    }
}

/// Ingest every package directory directly under `input_dir`.
pub async fn synchronise(
    config: &IngestConfig,
    api: &dyn RepositoryApi,
    packagers: &PackagerRegistry,
    plugins: &[Arc<dyn Plugin>],
    input_dir: &Path,
) -> Result<IngestReport, IngestError> {
    let packager = packagers.resolve(&config.content_model)?;
    let packages = child_dirs(input_dir).map_err(|e| IngestError::io(input_dir, e))?;
    info!(
        input = %input_dir.display(),
        packages = packages.len(),
        packager = packager.name(),
        content_model = %config.content_model,
        "[INGEST] Starting ingest"
    );

    let ctx = IngestContext::new(api, config);
    let mut report = IngestReport::default();

    for dir in packages {
        if let Err(e) = run_plugins(plugins, &dir, config) {
            error!(path = %dir.display(), error = %e, "[PLUGIN] Plugin failed, package not ingested");
            report.failed.push((dir, e));
            continue;
        }

        match packager.package(&ctx, &dir).await {
            IngestOutcome::Ingested(pid) => {
                if config.delete_input {
                    remove_package(&dir).await;
                }
                report.ingested.push(IngestedPackage {
                    path: dir,
                    pid,
                    missing_children: 0,
                });
            }
            IngestOutcome::Incomplete {
                pid,
                missing_children,
            } => {
                warn!(
                    path = %dir.display(),
                    pid = %pid,
                    missing_children,
                    "[INGEST] Package ingested with missing children, input kept for a re-run"
                );
                report.ingested.push(IngestedPackage {
                    path: dir,
                    pid,
                    missing_children,
                });
            }
            IngestOutcome::Skipped(reason) => {
                warn!(path = %dir.display(), reason = %reason, "[INGEST] Package skipped");
                report.skipped.push((dir, reason));
            }
            IngestOutcome::Failed(e) => {
                error!(path = %dir.display(), error = %e, "[INGEST] Package failed");
                report.failed.push((dir, e));
            }
        }
    }

    info!(
        ingested = report.ingested.len(),
        incomplete = report.incomplete().count(),
        skipped = report.skipped.len(),
        failed = report.failed.len(),
        "[INGEST] Finished ingest"
    );
    Ok(report)
}

async fn remove_package(dir: &Path) {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => info!(path = %dir.display(), "[INGEST] Deleted input package"),
        Err(e) => warn!(path = %dir.display(), error = %e, "[INGEST] Could not delete input package"),
    }
}
