//! Error and outcome types shared by every ingestion step.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Failure talking to the remote REST API.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// The request never produced a response (DNS, connect, TLS, body read).
    #[error("{method} {url} failed: {message}")]
    Transport {
        method: String,
        url: String,
        message: String,
    },

    /// The server answered with a status the caller did not expect.
    #[error("{method} {url} returned HTTP {status}: {body}")]
    Status {
        method: String,
        url: String,
        status: u16,
        body: String,
    },

    /// The server answered 2xx but the body was not what the API documents.
    #[error("malformed response from {url}: {message}")]
    MalformedResponse { url: String, message: String },
}

/// Errors that abort a package (or a whole run, for the config variants).
#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("plugin {name} failed: {message}")]
    Plugin { name: String, message: String },

    #[error("content model {0} is not recognized")]
    UnknownContentModel(String),

    #[error("plugin {0} is not registered")]
    UnknownPlugin(String),
}

impl IngestError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        IngestError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Why a package was deliberately not ingested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The well-formed PID derived for the package is already in use remotely.
    AlreadyExists(String),
    /// Required metadata (title, issue date) could not be extracted.
    InvalidPackage(String),
    /// A compound child whose content model could not be determined.
    UnresolvedContentModel,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::AlreadyExists(pid) => write!(f, "object {pid} already exists"),
            SkipReason::InvalidPackage(why) => write!(f, "invalid package: {why}"),
            SkipReason::UnresolvedContentModel => write!(f, "cannot determine content model"),
        }
    }
}

/// Result of packaging one directory.
///
/// Skips and failures are separate variants so a caller can never mistake
/// one for the other, and neither can be mistaken for a created object.
#[derive(Debug)]
pub enum IngestOutcome {
    Ingested(String),
    /// The object was created but some of its children were not. The input
    /// is still needed to re-run those children.
    Incomplete {
        pid: String,
        missing_children: usize,
    },
    Skipped(SkipReason),
    Failed(IngestError),
}

impl IngestOutcome {
    /// The new object's PID, if one was created.
    pub fn pid(&self) -> Option<&str> {
        match self {
            IngestOutcome::Ingested(pid) | IngestOutcome::Incomplete { pid, .. } => Some(pid),
            _ => None,
        }
    }

    /// True only when the object and every child are in the repository.
    pub fn is_ingested(&self) -> bool {
        matches!(self, IngestOutcome::Ingested(_))
    }
}

/// A setting that makes the whole run impossible; reported before any
/// package is touched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error("invalid checksum type {0:?}; expected one of none, MD5, SHA-1, SHA-256, SHA-384, SHA-512")]
    InvalidChecksumType(String),

    #[error("invalid object state {0:?}; expected A, I or D")]
    InvalidState(String),

    #[error("parent {0:?} is not a valid PID")]
    InvalidParent(String),
}
