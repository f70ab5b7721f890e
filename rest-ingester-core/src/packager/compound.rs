use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{error, info};

use super::thumbnail::propagate_thumbnail;
use super::{
    child_dirs, dir_name, ingest_object, require_title, top_level_plan, ChildTally, IngestContext,
    ObjectPlan, Packager,
};
use crate::error::{IngestOutcome, SkipReason};
use crate::metadata::PackageMetadata;
use crate::object::child_namespace_hint;
use crate::pid::{decoded_dir_name, uri_safe};
use crate::relationship::Relationship;

/// Stem of the file a compound child's content model is inferred from.
pub const PRIMARY_CONTENT_STEM: &str = "OBJ";

/// Content model implied by a primary content file extension.
pub fn content_model_for_extension(ext: &str) -> Option<&'static str> {
    let cmodel = match ext.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" | "png" | "gif" => "islandora:sp_basic_image",
        "tif" | "tiff" | "jp2" => "islandora:sp_large_image_cmodel",
        "pdf" => "islandora:sp_pdf",
        "mp3" | "wav" | "flac" => "islandora:sp-audioCModel",
        "mp4" | "mov" | "m4v" | "ogg" | "avi" | "mkv" => "islandora:sp_videoCModel",
        "warc" => "islandora:sp_web_archive",
        "e01" | "iso" => "islandora:sp_disk_image",
        _ => return None,
    };
    Some(cmodel)
}

/// The `OBJ.{ext}` file in `dir`, if there is one.
pub fn primary_content_file(dir: &Path) -> Option<PathBuf> {
    let mut found: Vec<PathBuf> = std::fs::read_dir(dir)
        .ok()?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path.file_stem().and_then(|s| s.to_str()) == Some(PRIMARY_CONTENT_STEM)
        })
        .collect();
    found.sort();
    found.into_iter().next()
}

/// `cmodel.txt` first, then the `OBJ` extension.
pub fn child_content_model(meta: &PackageMetadata) -> Option<String> {
    if let Some(cmodel) = &meta.content_model_override {
        return Some(cmodel.clone());
    }
    let obj = primary_content_file(&meta.dir)?;
    let ext = obj.extension()?.to_str()?;
    content_model_for_extension(ext).map(str::to_string)
}

/// Predicate carrying a compound child's position. It embeds the parent so
/// several compound parents can sequence the same child independently.
pub fn sequence_predicate(parent_pid: &str) -> String {
    format!("isSequenceNumberOf{}", uri_safe(parent_pid))
}

/// A parent object whose children each have their own content model.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompoundPackager;

#[async_trait]
impl Packager for CompoundPackager {
    fn name(&self) -> &'static str {
        "compound"
    }

    async fn package(&self, ctx: &IngestContext<'_>, dir: &Path) -> IngestOutcome {
        let meta = match require_title(dir) {
            Ok(meta) => meta,
            Err(skipped) => return skipped,
        };
        let plan = top_level_plan(ctx, &meta);
        let parent_pid = match ingest_object(ctx, &meta, plan).await {
            IngestOutcome::Ingested(pid) => pid,
            other => return other,
        };

        let mut children = ChildTally::default();
        let child_paths = match child_dirs(dir) {
            Ok(dirs) => dirs,
            Err(e) => {
                error!(parent = %parent_pid, path = %dir.display(), error = %e, "[INGEST] Cannot list compound children");
                children.missing = 1;
                Vec::new()
            }
        };

        for child_dir in child_paths {
            let outcome = ingest_child(ctx, &parent_pid, &child_dir).await;
            children.record(&parent_pid, &child_dir, outcome);
        }
        info!(
            parent = %parent_pid,
            children = children.created.len(),
            missing = children.missing,
            "[INGEST] Compound children ingested"
        );

        propagate_thumbnail(ctx, &parent_pid, &children.created).await;
        children.into_outcome(parent_pid)
    }
}

async fn ingest_child(ctx: &IngestContext<'_>, parent_pid: &str, child_dir: &Path) -> IngestOutcome {
    let meta = PackageMetadata::extract(child_dir);
    let Some(content_model) = child_content_model(&meta) else {
        return IngestOutcome::Skipped(SkipReason::UnresolvedContentModel);
    };

    let plan = ObjectPlan {
        content_model,
        relationships: vec![
            Relationship::external("isConstituentOf", parent_pid),
            Relationship::islandora_value(sequence_predicate(parent_pid), dir_name(child_dir)),
        ],
        label: meta
            .label()
            .map(str::to_string)
            .unwrap_or_else(|| decoded_dir_name(child_dir)),
        namespace_hint: child_namespace_hint(parent_pid),
    };
    ingest_object(ctx, &meta, plan).await
}
