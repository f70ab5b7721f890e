//! # contract: the seam between the ingestion engine and the REST API
//!
//! Every network call the engine makes goes through [`RepositoryApi`]. The
//! CLI crate provides the `reqwest` implementation; tests use the generated
//! `MockRepositoryApi` or a stateful fake.
//!
//! ## Conventions
//! - Probes return [`Presence`] on a clean 200/404 and `Err` for anything
//!   else, so callers can abort instead of guessing.
//! - All other calls return `Err(ApiError)` on transport failure or a
//!   non-2xx status. Nothing is retried here.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

use crate::checksum::ChecksumType;
use crate::error::ApiError;
use crate::relationship::Relationship;

/// Outcome of an existence probe that got a definite answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Exists,
    NotFound,
}

/// Fedora object lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ObjectState {
    #[default]
    Active,
    Inactive,
    Deleted,
}

impl ObjectState {
    /// Single-letter code used by the REST API.
    pub fn code(self) -> &'static str {
        match self {
            ObjectState::Active => "A",
            ObjectState::Inactive => "I",
            ObjectState::Deleted => "D",
        }
    }
}

impl FromStr for ObjectState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "A" | "a" | "Active" | "active" => Ok(ObjectState::Active),
            "I" | "i" | "Inactive" | "inactive" => Ok(ObjectState::Inactive),
            "D" | "d" | "Deleted" | "deleted" => Ok(ObjectState::Deleted),
            other => Err(format!(
                "unknown object state {other:?} (expected A, I or D)"
            )),
        }
    }
}

impl fmt::Display for ObjectState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Parameters for `POST /object`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewObject {
    /// A bare namespace, or a full PID to request that exact identifier.
    pub namespace: String,
    pub owner: String,
    pub label: String,
}

/// Parsed `POST /object` response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedObject {
    pub pid: String,
}

/// Create or replace semantics for a datastream upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadMode {
    /// `POST /object/{pid}/datastream`
    Create,
    /// `POST /object/{pid}/datastream/{dsid}` with a `method=PUT` override.
    Replace,
}

/// One multipart datastream submission.
#[derive(Debug, Clone)]
pub struct DatastreamUpload {
    pub pid: String,
    pub dsid: String,
    /// File name reported in the multipart part.
    pub file_name: String,
    pub content: Vec<u8>,
    pub checksum_type: ChecksumType,
    pub mode: UploadMode,
}

/// Parsed datastream upload response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadedDatastream {
    pub dsid: String,
    /// Checksum computed by the repository, if it reported one.
    pub checksum: Option<String>,
}

/// Everything the ingestion engine needs from an Islandora REST endpoint.
///
/// Implementors own transport, authentication and serialization; the trait
/// only speaks in domain values.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait RepositoryApi: Send + Sync {
    /// `GET /object/{pid}`
    async fn probe_object(&self, pid: &str) -> Result<Presence, ApiError>;

    /// `GET /object/{pid}/datastream/{dsid}?content=false`
    async fn probe_datastream(&self, pid: &str, dsid: &str) -> Result<Presence, ApiError>;

    /// `POST /object`
    async fn create_object(&self, req: NewObject) -> Result<CreatedObject, ApiError>;

    /// `PUT /object/{pid}` with a new state.
    async fn update_object_state(&self, pid: &str, state: ObjectState) -> Result<(), ApiError>;

    /// `POST /object/{pid}/relationship`
    async fn add_relationship(&self, pid: &str, rel: &Relationship) -> Result<(), ApiError>;

    /// Create or replace a datastream, depending on `req.mode`.
    async fn upload_datastream(&self, req: DatastreamUpload)
        -> Result<UploadedDatastream, ApiError>;

    /// `GET /object/{pid}/datastream/{dsid}` raw content.
    async fn fetch_datastream(&self, pid: &str, dsid: &str) -> Result<Vec<u8>, ApiError>;

    /// Number of newspaper issues already sequenced under `parent`, from the
    /// search index.
    async fn count_issues(&self, parent: &str) -> Result<u64, ApiError>;
}
