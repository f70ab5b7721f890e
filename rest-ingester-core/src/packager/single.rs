use std::path::Path;

use async_trait::async_trait;

use super::{ingest_object, require_title, top_level_plan, IngestContext, Packager};
use crate::error::IngestOutcome;

/// One directory, one object. Used for every content model without
/// children (images, PDFs, audio, video, citations, ...).
#[derive(Debug, Clone, Copy, Default)]
pub struct SinglePackager;

#[async_trait]
impl Packager for SinglePackager {
    fn name(&self) -> &'static str {
        "single"
    }

    async fn package(&self, ctx: &IngestContext<'_>, dir: &Path) -> IngestOutcome {
        let meta = match require_title(dir) {
            Ok(meta) => meta,
            Err(skipped) => return skipped,
        };
        let plan = top_level_plan(ctx, &meta);
        ingest_object(ctx, &meta, plan).await
    }
}
