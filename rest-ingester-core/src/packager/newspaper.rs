use std::path::Path;

use async_trait::async_trait;
use tracing::{debug, error, warn};

use super::book::ingest_pages;
use super::thumbnail::propagate_thumbnail;
use super::{ingest_object, require_title, IngestContext, ObjectPlan, Packager, NEWSPAPER_PAGE_CMODEL};
use crate::error::{IngestOutcome, SkipReason};
use crate::relationship::Relationship;

/// A newspaper issue: MODS must carry both a title and `dateIssued`; the
/// issue is sequenced after the issues already under the newspaper.
#[derive(Debug, Clone)]
pub struct NewspaperIssuePackager {
    pub page_content_model: String,
}

impl Default for NewspaperIssuePackager {
    fn default() -> Self {
        Self {
            page_content_model: NEWSPAPER_PAGE_CMODEL.to_string(),
        }
    }
}

#[async_trait]
impl Packager for NewspaperIssuePackager {
    fn name(&self) -> &'static str {
        "newspaper_issue"
    }

    async fn package(&self, ctx: &IngestContext<'_>, dir: &Path) -> IngestOutcome {
        let meta = match require_title(dir) {
            Ok(meta) => meta,
            Err(skipped) => return skipped,
        };
        let Some(date_issued) = meta.date_issued.clone() else {
            warn!(path = %dir.display(), "[INGEST] Issue has no MODS dateIssued, skipping");
            return IngestOutcome::Skipped(SkipReason::InvalidPackage(
                "no MODS dateIssued".to_string(),
            ));
        };

        let newspaper = &ctx.config.parent;
        let mut relationships = vec![
            Relationship::external("isMemberOf", newspaper),
            Relationship::islandora_value("dateIssued", date_issued),
        ];
        match ctx.api.count_issues(newspaper).await {
            Ok(existing) => {
                let sequence = existing + 1;
                debug!(newspaper = %newspaper, sequence, "[INGEST] Issue sequence number");
                relationships.push(Relationship::islandora_value(
                    "isSequenceNumber",
                    sequence.to_string(),
                ));
            }
            Err(e) => {
                error!(
                    newspaper = %newspaper,
                    path = %dir.display(),
                    error = %e,
                    "[INGEST] Could not count existing issues, sequence number omitted"
                );
            }
        }

        let plan = ObjectPlan {
            content_model: meta
                .content_model_override
                .clone()
                .unwrap_or_else(|| ctx.config.content_model.clone()),
            relationships,
            label: meta.label().unwrap_or_default().to_string(),
            namespace_hint: None,
        };
        let issue_pid = match ingest_object(ctx, &meta, plan).await {
            IngestOutcome::Ingested(pid) => pid,
            other => return other,
        };

        let pages = ingest_pages(ctx, &issue_pid, dir, &self.page_content_model).await;
        propagate_thumbnail(ctx, &issue_pid, &pages.created).await;
        pages.into_outcome(issue_pid)
    }
}
