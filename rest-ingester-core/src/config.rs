use std::fmt;

use tracing::{debug, info};

use crate::checksum::ChecksumType;
use crate::contract::ObjectState;
use crate::error::ConfigError;
use crate::pid::is_valid_pid;

pub const DEFAULT_ENDPOINT: &str = "http://localhost/islandora/rest/v1";
pub const DEFAULT_RELATIONSHIP: &str = "isMemberOfCollection";
pub const DEFAULT_MAX_DATASTREAM_SIZE_MIB: u64 = 1024;

/// Immutable settings for one ingest run, shared by reference with every
/// component.
#[derive(Clone)]
pub struct IngestConfig {
    /// Content model of the top-level objects; also selects the packager.
    pub content_model: String,
    /// PID of the collection (or other parent) the top-level objects join.
    pub parent: String,
    /// Namespace or full PID for new objects. When unset, each package
    /// directory name is used.
    pub namespace: Option<String>,
    pub owner: String,
    /// Predicate linking top-level objects to `parent`.
    pub relationship: String,
    pub checksum_type: ChecksumType,
    pub endpoint: String,
    pub user: String,
    pub token: String,
    pub state: ObjectState,
    pub max_datastream_size_mib: u64,
    pub delete_input: bool,
    pub plugins: Vec<String>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        IngestConfig {
            content_model: String::new(),
            parent: String::new(),
            namespace: None,
            owner: String::new(),
            relationship: DEFAULT_RELATIONSHIP.to_string(),
            checksum_type: ChecksumType::default(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            user: String::new(),
            token: String::new(),
            state: ObjectState::default(),
            max_datastream_size_mib: DEFAULT_MAX_DATASTREAM_SIZE_MIB,
            delete_input: false,
            plugins: Vec::new(),
        }
    }
}

impl IngestConfig {
    /// Check the settings every run needs. Registry membership of the
    /// content model and plugins is checked by the caller that owns the
    /// registries.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("content model", &self.content_model),
            ("parent", &self.parent),
            ("owner", &self.owner),
            ("user", &self.user),
            ("token", &self.token),
            ("endpoint", &self.endpoint),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::Missing(name));
            }
        }
        if !is_valid_pid(&self.parent) {
            return Err(ConfigError::InvalidParent(self.parent.clone()));
        }
        Ok(())
    }

    pub fn max_datastream_bytes(&self) -> u64 {
        self.max_datastream_size_mib.saturating_mul(1024 * 1024)
    }

    pub fn trace_loaded(&self) {
        info!(
            content_model = %self.content_model,
            parent = %self.parent,
            namespace = self.namespace.as_deref().unwrap_or("<from directory names>"),
            endpoint = %self.endpoint,
            checksum_type = %self.checksum_type,
            state = %self.state,
            plugins = self.plugins.len(),
            "Loaded IngestConfig"
        );
        debug!(
            relationship = %self.relationship,
            max_datastream_size_mib = self.max_datastream_size_mib,
            delete_input = self.delete_input,
            "IngestConfig (details)"
        );
    }
}

impl fmt::Debug for IngestConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IngestConfig")
            .field("content_model", &self.content_model)
            .field("parent", &self.parent)
            .field("namespace", &self.namespace)
            .field("owner", &self.owner)
            .field("relationship", &self.relationship)
            .field("checksum_type", &self.checksum_type)
            .field("endpoint", &self.endpoint)
            .field("user", &self.user)
            .field("token", &"<redacted>")
            .field("state", &self.state)
            .field("max_datastream_size_mib", &self.max_datastream_size_mib)
            .field("delete_input", &self.delete_input)
            .field("plugins", &self.plugins)
            .finish()
    }
}


#[cfg(test)]
pub(crate) fn sample_config(namespace: Option<&str>) -> IngestConfig {
    IngestConfig {
        content_model: "islandora:sp_basic_image".into(),
        parent: "islandora:root".into(),
        namespace: namespace.map(str::to_string),
        owner: "admin".into(),
        relationship: DEFAULT_RELATIONSHIP.into(),
        checksum_type: ChecksumType::Sha1,
        endpoint: DEFAULT_ENDPOINT.into(),
        user: "admin".into(),
        token: "secret".into(),
        state: ObjectState::Active,
        max_datastream_size_mib: 10,
        delete_input: false,
        plugins: vec![],
    }
}
