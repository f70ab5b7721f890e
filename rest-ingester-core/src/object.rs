//! Object creation and lifecycle state.

use std::path::Path;

use tracing::{debug, error, info, warn};

use crate::config::IngestConfig;
use crate::contract::{NewObject, ObjectState, Presence, RepositoryApi};
use crate::error::{IngestError, IngestOutcome, SkipReason};
use crate::pid::{decoded_dir_name, is_valid_pid, namespace_of};

/// What to create for one package directory.
#[derive(Debug, Clone)]
pub struct ObjectRequest<'a> {
    pub dir: &'a Path,
    pub label: String,
    pub owner: String,
    pub state: ObjectState,
    /// Namespace to fall back on when the directory name is not a PID;
    /// children pass their parent's namespace here.
    pub namespace_hint: Option<&'a str>,
}

/// Namespace (or full PID) to send with `POST /object`.
///
/// The configured namespace always wins. Otherwise the URL-decoded
/// directory name is used, unless it is not a PID and a hint is available.
pub fn resolve_namespace(config: &IngestConfig, dir: &Path, hint: Option<&str>) -> String {
    if let Some(ns) = config.namespace.as_deref().filter(|ns| !ns.is_empty()) {
        return ns.to_string();
    }
    let from_dir = decoded_dir_name(dir);
    match hint {
        Some(hint) if !is_valid_pid(&from_dir) => hint.to_string(),
        _ => from_dir,
    }
}

/// Create the object for `req`, honoring "already exists" skips and setting
/// a non-default state afterwards.
pub async fn create_object(
    api: &dyn RepositoryApi,
    config: &IngestConfig,
    req: ObjectRequest<'_>,
) -> IngestOutcome {
    let namespace = resolve_namespace(config, req.dir, req.namespace_hint);

    if is_valid_pid(&namespace) {
        match api.probe_object(&namespace).await {
            Ok(Presence::Exists) => {
                warn!(
                    pid = %namespace,
                    path = %req.dir.display(),
                    "[OBJECT] Object already exists, skipping"
                );
                return IngestOutcome::Skipped(SkipReason::AlreadyExists(namespace));
            }
            Ok(Presence::NotFound) => {
                debug!(pid = %namespace, "[OBJECT] PID is free");
            }
            Err(e) => {
                error!(pid = %namespace, error = %e, "[OBJECT] Existence probe failed");
                return IngestOutcome::Failed(IngestError::Api(e));
            }
        }
    }

    let new_object = NewObject {
        namespace: namespace.clone(),
        owner: req.owner,
        label: req.label,
    };
    let created = match api.create_object(new_object).await {
        Ok(created) => created,
        Err(e) => {
            error!(
                namespace = %namespace,
                path = %req.dir.display(),
                error = %e,
                "[OBJECT] Object creation failed"
            );
            return IngestOutcome::Failed(IngestError::Api(e));
        }
    };

    if req.state != ObjectState::Active {
        set_state(api, &created.pid, req.state).await;
    }

    info!(pid = %created.pid, path = %req.dir.display(), "[OBJECT] Object created");
    IngestOutcome::Ingested(created.pid)
}

/// Issue the separate state update. A failure leaves the object Active and
/// is logged, but does not undo the creation.
pub async fn set_state(api: &dyn RepositoryApi, pid: &str, state: ObjectState) -> bool {
    match api.update_object_state(pid, state).await {
        Ok(()) => {
            debug!(pid, state = %state, "[OBJECT] State updated");
            true
        }
        Err(e) => {
            error!(pid, state = %state, error = %e, "[OBJECT] Failed to set object state");
            false
        }
    }
}

/// Namespace children of `parent_pid` should be created in.
pub fn child_namespace_hint(parent_pid: &str) -> Option<&str> {
    namespace_of(parent_pid)
}
