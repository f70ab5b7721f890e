use std::path::Path;

use async_trait::async_trait;
use tracing::{error, info};

use super::thumbnail::propagate_thumbnail;
use super::{
    child_dirs, dir_name, ingest_object, require_title, top_level_plan, ChildTally, IngestContext,
    ObjectPlan, Packager, PAGE_CMODEL,
};
use crate::error::IngestOutcome;
use crate::metadata::{page_label, PackageMetadata};
use crate::object::child_namespace_hint;
use crate::relationship::Relationship;

/// A book directory with one subdirectory per page.
#[derive(Debug, Clone)]
pub struct BookPackager {
    pub page_content_model: String,
}

impl Default for BookPackager {
    fn default() -> Self {
        Self {
            page_content_model: PAGE_CMODEL.to_string(),
        }
    }
}

#[async_trait]
impl Packager for BookPackager {
    fn name(&self) -> &'static str {
        "book"
    }

    async fn package(&self, ctx: &IngestContext<'_>, dir: &Path) -> IngestOutcome {
        let meta = match require_title(dir) {
            Ok(meta) => meta,
            Err(skipped) => return skipped,
        };
        let plan = top_level_plan(ctx, &meta);
        let book_pid = match ingest_object(ctx, &meta, plan).await {
            IngestOutcome::Ingested(pid) => pid,
            other => return other,
        };

        let pages = ingest_pages(ctx, &book_pid, dir, &self.page_content_model).await;
        propagate_thumbnail(ctx, &book_pid, &pages.created).await;
        pages.into_outcome(book_pid)
    }
}

/// Ingest every page subdirectory of `dir` under `parent_pid`, in natural
/// order, tallying which pages were created and how many are missing.
///
/// A page that fails or is skipped is logged and does not stop the rest.
pub async fn ingest_pages(
    ctx: &IngestContext<'_>,
    parent_pid: &str,
    dir: &Path,
    page_content_model: &str,
) -> ChildTally {
    let mut pages = ChildTally::default();
    let page_dirs = match child_dirs(dir) {
        Ok(dirs) => dirs,
        Err(e) => {
            error!(parent = parent_pid, path = %dir.display(), error = %e, "[INGEST] Cannot list page directories");
            // Pages unknown; keep the input.
            pages.missing = 1;
            return pages;
        }
    };

    for page_dir in page_dirs {
        let page_meta = PackageMetadata::extract(&page_dir);
        let sequence = dir_name(&page_dir);
        let plan = ObjectPlan {
            content_model: page_meta
                .content_model_override
                .clone()
                .unwrap_or_else(|| page_content_model.to_string()),
            relationships: Relationship::page_set(parent_pid, &sequence),
            label: page_meta
                .label()
                .map(str::to_string)
                .unwrap_or_else(|| page_label(&page_dir)),
            namespace_hint: child_namespace_hint(parent_pid),
        };

        let outcome = ingest_object(ctx, &page_meta, plan).await;
        pages.record(parent_pid, &page_dir, outcome);
    }

    info!(
        parent = parent_pid,
        pages = pages.created.len(),
        missing = pages.missing,
        "[INGEST] Pages ingested"
    );
    pages
}
