//! Content-model packagers.
//!
//! Every packager runs the same per-object sequence (see [`ingest_object`]):
//! create the object, attach its content model, attach the relationships
//! the packager planned for it, upload its datastreams, then append any
//! `relationships.json` extras. Hierarchical packagers repeat that for each
//! child directory and finally copy the first child's thumbnail onto the
//! parent.
//!
//! Packagers are looked up by content model in a [`PackagerRegistry`], so new
//! shapes can be added with [`PackagerRegistry::register`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::config::IngestConfig;
use crate::contract::RepositoryApi;
use crate::datastream::DatastreamSynchronizer;
use crate::error::{IngestError, IngestOutcome, SkipReason};
use crate::metadata::PackageMetadata;
use crate::object::{create_object, ObjectRequest};
use crate::relationship::{add_relationship, add_relationships, Relationship};

pub mod book;
pub mod compound;
pub mod newspaper;
pub mod single;
pub mod thumbnail;

pub use book::BookPackager;
pub use compound::CompoundPackager;
pub use newspaper::NewspaperIssuePackager;
pub use single::SinglePackager;

pub const BOOK_CMODEL: &str = "islandora:bookCModel";
pub const PAGE_CMODEL: &str = "islandora:pageCModel";
pub const NEWSPAPER_ISSUE_CMODEL: &str = "islandora:newspaperIssueCModel";
pub const NEWSPAPER_PAGE_CMODEL: &str = "islandora:newspaperPageCModel";
pub const COMPOUND_CMODEL: &str = "islandora:compoundCModel";

/// Content models ingested as a single object with no children.
pub const SINGLE_CMODELS: &[&str] = &[
    "islandora:sp_basic_image",
    "islandora:sp_large_image_cmodel",
    "islandora:sp_pdf",
    "islandora:sp-audioCModel",
    "islandora:sp_videoCModel",
    "ir:citationCModel",
    "ir:thesisCModel",
    "islandora:pageCModel",
    "islandora:collectionCModel",
    "islandora:entityCModel",
    "islandora:eventCModel",
    "islandora:placeCModel",
    "islandora:sp_disk_image",
    "islandora:personCModel",
    "islandora:organizationCModel",
    "islandora:sp_web_archive",
];

/// What a packager needs to talk to the repository.
#[derive(Clone, Copy)]
pub struct IngestContext<'a> {
    pub api: &'a dyn RepositoryApi,
    pub config: &'a IngestConfig,
}

impl<'a> IngestContext<'a> {
    pub fn new(api: &'a dyn RepositoryApi, config: &'a IngestConfig) -> Self {
        Self { api, config }
    }

    pub fn datastreams(&self) -> DatastreamSynchronizer<'a> {
        DatastreamSynchronizer::new(self.api, self.config)
    }
}

/// Ingests one package directory of a particular shape.
#[async_trait]
pub trait Packager: Send + Sync {
    fn name(&self) -> &'static str;

    async fn package(&self, ctx: &IngestContext<'_>, dir: &Path) -> IngestOutcome;
}

/// Per-object decisions a packager makes before handing off to
/// [`ingest_object`].
#[derive(Debug, Clone)]
pub struct ObjectPlan<'a> {
    pub content_model: String,
    /// Attached right after the content model, before datastreams.
    pub relationships: Vec<Relationship>,
    pub label: String,
    pub namespace_hint: Option<&'a str>,
}

/// The shared per-object state machine.
pub async fn ingest_object(
    ctx: &IngestContext<'_>,
    meta: &PackageMetadata,
    plan: ObjectPlan<'_>,
) -> IngestOutcome {
    let request = ObjectRequest {
        dir: &meta.dir,
        label: plan.label,
        owner: meta
            .properties
            .owner
            .clone()
            .unwrap_or_else(|| ctx.config.owner.clone()),
        state: meta.properties.state.unwrap_or(ctx.config.state),
        namespace_hint: plan.namespace_hint,
    };
    let pid = match create_object(ctx.api, ctx.config, request).await {
        IngestOutcome::Ingested(pid) => pid,
        other => return other,
    };

    // Derivative generation is keyed on the content model, so it goes first.
    add_relationship(ctx.api, &pid, &Relationship::has_model(&plan.content_model)).await;
    add_relationships(ctx.api, &pid, &plan.relationships).await;

    ctx.datastreams().sync(&pid, &meta.dir, None).await;

    if !meta.relationships.is_empty() {
        add_relationships(ctx.api, &pid, &meta.relationships).await;
    }

    info!(pid = %pid, path = %meta.dir.display(), "Object {pid} ingested from {}", meta.dir.display());
    IngestOutcome::Ingested(pid)
}

/// Children of a hierarchical package, tallied as they are ingested.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ChildTally {
    /// PIDs created in this run, in ingest order.
    pub created: Vec<String>,
    /// Children that are not in the repository after this run.
    pub missing: usize,
}

impl ChildTally {
    /// Log and count one child outcome. A child that already exists remotely
    /// is not missing.
    pub fn record(&mut self, parent_pid: &str, dir: &Path, outcome: IngestOutcome) {
        match outcome {
            IngestOutcome::Ingested(pid) => self.created.push(pid),
            IngestOutcome::Incomplete {
                pid,
                missing_children,
            } => {
                self.created.push(pid);
                self.missing += missing_children;
            }
            IngestOutcome::Skipped(SkipReason::AlreadyExists(pid)) => {
                warn!(parent = parent_pid, path = %dir.display(), pid = %pid, "[INGEST] Child already exists, skipped");
            }
            IngestOutcome::Skipped(reason) => {
                warn!(parent = parent_pid, path = %dir.display(), reason = %reason, "[INGEST] Child skipped");
                self.missing += 1;
            }
            IngestOutcome::Failed(e) => {
                error!(parent = parent_pid, path = %dir.display(), error = %e, "[INGEST] Child not ingested");
                self.missing += 1;
            }
        }
    }

    /// Outcome for the parent once every child has been tried.
    pub fn into_outcome(self, parent_pid: String) -> IngestOutcome {
        if self.missing == 0 {
            IngestOutcome::Ingested(parent_pid)
        } else {
            IngestOutcome::Incomplete {
                pid: parent_pid,
                missing_children: self.missing,
            }
        }
    }
}

/// Metadata for a top-level package, or the skip outcome if it has no title.
pub fn require_title(dir: &Path) -> Result<PackageMetadata, IngestOutcome> {
    let meta = PackageMetadata::extract(dir);
    if meta.title.is_none() {
        warn!(path = %dir.display(), "[INGEST] Package has no MODS title, skipping");
        return Err(IngestOutcome::Skipped(SkipReason::InvalidPackage(
            "no MODS title".to_string(),
        )));
    }
    Ok(meta)
}

/// Plan for a top-level object: its own content model (or `cmodel.txt`),
/// linked to the configured parent with the configured predicate.
pub fn top_level_plan(ctx: &IngestContext<'_>, meta: &PackageMetadata) -> ObjectPlan<'static> {
    ObjectPlan {
        content_model: meta
            .content_model_override
            .clone()
            .unwrap_or_else(|| ctx.config.content_model.clone()),
        relationships: vec![Relationship::external(
            &ctx.config.relationship,
            &ctx.config.parent,
        )],
        label: meta.label().unwrap_or_default().to_string(),
        namespace_hint: None,
    }
}

/// Child package directories in natural order: numeric names by value
/// first, then everything else by name.
pub fn child_dirs(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            dirs.push(entry.path());
        }
    }
    dirs.sort_by_cached_key(|path| natural_key(path));
    Ok(dirs)
}

fn natural_key(path: &Path) -> (u8, u64, String) {
    let name = dir_name(path);
    match name.parse::<u64>() {
        Ok(n) => (0, n, name),
        Err(_) => (1, 0, name),
    }
}

/// Raw final path component; used as the sequence number of children.
pub fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Content model → packager lookup.
#[derive(Clone, Default)]
pub struct PackagerRegistry {
    packagers: HashMap<String, Arc<dyn Packager>>,
}

impl PackagerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry covering every content model the ingester ships with.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        let single: Arc<dyn Packager> = Arc::new(SinglePackager);
        for cmodel in SINGLE_CMODELS {
            registry.register(*cmodel, single.clone());
        }
        registry.register(BOOK_CMODEL, Arc::new(BookPackager::default()));
        registry.register(
            NEWSPAPER_ISSUE_CMODEL,
            Arc::new(NewspaperIssuePackager::default()),
        );
        registry.register(COMPOUND_CMODEL, Arc::new(CompoundPackager));
        registry
    }

    pub fn register(&mut self, content_model: impl Into<String>, packager: Arc<dyn Packager>) {
        self.packagers.insert(content_model.into(), packager);
    }

    pub fn resolve(&self, content_model: &str) -> Result<Arc<dyn Packager>, IngestError> {
        self.packagers
            .get(content_model)
            .cloned()
            .ok_or_else(|| IngestError::UnknownContentModel(content_model.to_string()))
    }

    pub fn content_models(&self) -> Vec<&str> {
        let mut models: Vec<&str> = self.packagers.keys().map(String::as_str).collect();
        models.sort_unstable();
        models
    }
}
