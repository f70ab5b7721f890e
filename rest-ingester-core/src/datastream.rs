//! Datastream synchronizer: upload every content file in a package directory
//! (or one explicit file) onto an object, choosing create or replace per
//! file so that running it twice never duplicates anything.

use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use crate::config::IngestConfig;
use crate::contract::{DatastreamUpload, Presence, RepositoryApi, UploadMode};
use crate::metadata::{CMODEL_FILE, FOXML_FILE, RELATIONSHIPS_FILE};

/// Files in a package directory that are never uploaded as datastreams.
pub const IGNORED_FILES: &[&str] = &[
    CMODEL_FILE,
    FOXML_FILE,
    RELATIONSHIPS_FILE,
    ".DS_Store",
    "Thumbs.db",
    "desktop.ini",
];

/// What happened to each candidate file.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub created: Vec<String>,
    pub replaced: Vec<String>,
    /// Oversized or unprobeable files, left alone.
    pub skipped: Vec<PathBuf>,
    /// Uploads (or local reads) that failed.
    pub failed: Vec<String>,
    pub checksum_mismatches: Vec<String>,
}

impl SyncReport {
    pub fn uploaded(&self) -> usize {
        self.created.len() + self.replaced.len()
    }
}

/// Datastream ID for a file: its name without the final extension.
pub fn dsid_for(path: &Path) -> Option<String> {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .filter(|stem| !stem.is_empty())
}

/// Regular files in `dir` that should become datastreams, sorted by name.
pub fn candidate_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        // Follows symlinks, like the compound child lookup.
        if !entry.path().is_file() {
            continue;
        }
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if IGNORED_FILES.contains(&name.as_ref()) {
            debug!(file = %name, "[DATASTREAM] Ignoring non-content file");
            continue;
        }
        files.push(entry.path());
    }
    files.sort();
    Ok(files)
}

pub struct DatastreamSynchronizer<'a> {
    api: &'a dyn RepositoryApi,
    config: &'a IngestConfig,
}

impl<'a> DatastreamSynchronizer<'a> {
    pub fn new(api: &'a dyn RepositoryApi, config: &'a IngestConfig) -> Self {
        Self { api, config }
    }

    /// Synchronize `source` onto `pid`.
    ///
    /// `source` is either a package directory (every content file is
    /// uploaded, DSIDs taken from file stems) or a single file, in which
    /// case `dsid` names the target datastream explicitly.
    pub async fn sync(&self, pid: &str, source: &Path, dsid: Option<&str>) -> SyncReport {
        let mut report = SyncReport::default();

        if source.is_file() {
            let Some(dsid) = dsid.map(str::to_string).or_else(|| dsid_for(source)) else {
                warn!(path = %source.display(), "[DATASTREAM] Cannot derive DSID, skipping");
                report.skipped.push(source.to_path_buf());
                return report;
            };
            self.sync_file(pid, source, &dsid, &mut report).await;
            return report;
        }

        let files = match candidate_files(source) {
            Ok(files) => files,
            Err(e) => {
                error!(pid, path = %source.display(), error = %e, "[DATASTREAM] Cannot list package directory");
                return report;
            }
        };
        for path in files {
            let Some(dsid) = dsid_for(&path) else {
                report.skipped.push(path);
                continue;
            };
            self.sync_file(pid, &path, &dsid, &mut report).await;
        }

        info!(
            pid,
            created = report.created.len(),
            replaced = report.replaced.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "[DATASTREAM] Synchronized package datastreams"
        );
        report
    }

    async fn sync_file(&self, pid: &str, path: &Path, dsid: &str, report: &mut SyncReport) {
        let size = match tokio::fs::metadata(path).await {
            Ok(meta) => meta.len(),
            Err(e) => {
                error!(pid, dsid, path = %path.display(), error = %e, "[DATASTREAM] Cannot stat file");
                report.failed.push(dsid.to_string());
                return;
            }
        };
        let max = self.config.max_datastream_bytes();
        if size > max {
            warn!(
                pid,
                dsid,
                path = %path.display(),
                size,
                max_bytes = max,
                "[DATASTREAM] File exceeds maximum datastream size, skipping"
            );
            report.skipped.push(path.to_path_buf());
            return;
        }

        let mode = match self.api.probe_datastream(pid, dsid).await {
            Ok(Presence::Exists) => UploadMode::Replace,
            Ok(Presence::NotFound) => UploadMode::Create,
            Err(e) => {
                error!(pid, dsid, error = %e, "[DATASTREAM] Existence probe failed, skipping file");
                report.skipped.push(path.to_path_buf());
                return;
            }
        };

        let content = match tokio::fs::read(path).await {
            Ok(content) => content,
            Err(e) => {
                error!(pid, dsid, path = %path.display(), error = %e, "[DATASTREAM] Cannot read file");
                report.failed.push(dsid.to_string());
                return;
            }
        };
        let local_checksum = self.config.checksum_type.digest(&content);

        let upload = DatastreamUpload {
            pid: pid.to_string(),
            dsid: dsid.to_string(),
            file_name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| dsid.to_string()),
            content,
            checksum_type: self.config.checksum_type,
            mode,
        };

        let uploaded = match self.api.upload_datastream(upload).await {
            Ok(uploaded) => uploaded,
            Err(e) => {
                error!(pid, dsid, mode = ?mode, error = %e, "[DATASTREAM] Upload failed");
                report.failed.push(dsid.to_string());
                return;
            }
        };

        match mode {
            UploadMode::Create => report.created.push(dsid.to_string()),
            UploadMode::Replace => report.replaced.push(dsid.to_string()),
        }
        info!(pid, dsid, mode = ?mode, path = %path.display(), "[DATASTREAM] Uploaded");

        if let Some(local) = local_checksum {
            match uploaded.checksum.as_deref() {
                Some(remote) if remote.eq_ignore_ascii_case(&local) => {
                    debug!(pid, dsid, checksum = %local, "[DATASTREAM] Checksum verified");
                }
                Some(remote) => {
                    warn!(
                        pid,
                        dsid,
                        local = %local,
                        remote,
                        checksum_type = %self.config.checksum_type,
                        "[DATASTREAM] Checksum mismatch"
                    );
                    report.checksum_mismatches.push(dsid.to_string());
                }
                None => {
                    warn!(pid, dsid, "[DATASTREAM] Repository did not report a checksum");
                }
            }
        }
    }
}
