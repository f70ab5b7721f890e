//! Parent thumbnail from the first ingested child.

use tracing::{info, warn};

use super::IngestContext;

pub const THUMBNAIL_DSID: &str = "TN";

/// Copy the `TN` datastream of the first child onto `parent_pid`.
///
/// Any failure here is logged and leaves the parent without a thumbnail;
/// the parent and its children stay ingested. Returns whether the copy
/// happened.
pub async fn propagate_thumbnail(
    ctx: &IngestContext<'_>,
    parent_pid: &str,
    children: &[String],
) -> bool {
    let Some(first) = children.first() else {
        warn!(parent = parent_pid, "[THUMBNAIL] No child objects were ingested, parent keeps its thumbnail");
        return false;
    };

    let bytes = match ctx.api.fetch_datastream(first, THUMBNAIL_DSID).await {
        Ok(bytes) if !bytes.is_empty() => bytes,
        Ok(_) => {
            warn!(parent = parent_pid, child = %first, "[THUMBNAIL] Child thumbnail is empty");
            return false;
        }
        Err(e) => {
            warn!(parent = parent_pid, child = %first, error = %e, "[THUMBNAIL] Could not fetch child thumbnail");
            return false;
        }
    };

    let scratch = match tempfile::tempdir() {
        Ok(dir) => dir,
        Err(e) => {
            warn!(parent = parent_pid, error = %e, "[THUMBNAIL] Could not create scratch directory");
            return false;
        }
    };
    let path = scratch.path().join(format!("{THUMBNAIL_DSID}.jpg"));
    if let Err(e) = tokio::fs::write(&path, &bytes).await {
        warn!(parent = parent_pid, path = %path.display(), error = %e, "[THUMBNAIL] Could not stage thumbnail");
        return false;
    }

    let report = ctx
        .datastreams()
        .sync(parent_pid, &path, Some(THUMBNAIL_DSID))
        .await;
    let copied = report.uploaded() == 1;
    if copied {
        info!(parent = parent_pid, child = %first, "[THUMBNAIL] Parent thumbnail set from first child");
    } else {
        warn!(parent = parent_pid, child = %first, "[THUMBNAIL] Parent thumbnail upload did not complete");
    }
    copied
}
