//! Builds the immutable [`IngestConfig`] for a run.
//!
//! Sources, lowest precedence first:
//! 1. built-in defaults
//! 2. the optional YAML file given with `--config`
//! 3. `ISLANDORA_REST_USER` / `ISLANDORA_REST_TOKEN` from the environment
//!    (a `.env` file is loaded by `main`)
//! 4. command-line flags
//!
//! Credentials are better kept out of the YAML file, but it is accepted.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{error, info};

use rest_ingester_core::checksum::ChecksumType;
use rest_ingester_core::config::IngestConfig;
use rest_ingester_core::contract::ObjectState;
use rest_ingester_core::ConfigError;

pub const USER_ENV: &str = "ISLANDORA_REST_USER";
pub const TOKEN_ENV: &str = "ISLANDORA_REST_TOKEN";

/// Every key is optional; anything left out keeps its default or is
/// supplied by the environment or flags.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub content_model: Option<String>,
    pub parent: Option<String>,
    pub namespace: Option<String>,
    pub owner: Option<String>,
    pub relationship: Option<String>,
    pub checksum_type: Option<String>,
    pub endpoint: Option<String>,
    pub user: Option<String>,
    pub token: Option<String>,
    pub state: Option<String>,
    pub max_datastream_size_mib: Option<u64>,
    pub delete_input: Option<bool>,
    #[serde(default)]
    pub plugins: Vec<String>,
}

impl FileConfig {
    /// Apply `other` on top of `self`; set values in `other` win, and a
    /// non-empty plugin list replaces the current one.
    pub fn merge(mut self, other: FileConfig) -> FileConfig {
        macro_rules! take {
            ($($field:ident),*) => {
                $( if other.$field.is_some() { self.$field = other.$field; } )*
            };
        }
        take!(
            content_model,
            parent,
            namespace,
            owner,
            relationship,
            checksum_type,
            endpoint,
            user,
            token,
            state,
            max_datastream_size_mib,
            delete_input
        );
        if !other.plugins.is_empty() {
            self.plugins = other.plugins;
        }
        self
    }
}

pub fn read_config_file(path: &Path) -> Result<FileConfig> {
    info!(config_path = %path.display(), "Loading configuration from file");
    let content = fs::read_to_string(path).map_err(|e| {
        error!(error = %e, config_path = %path.display(), "Failed to read config file");
        e
    })
    .with_context(|| format!("Failed to read config file {}", path.display()))?;

    let parsed: FileConfig = serde_yaml::from_str(&content)
        .map_err(|e| {
            error!(error = %e, config_path = %path.display(), "Failed to parse config YAML");
            e
        })
        .with_context(|| format!("Failed to parse config YAML {}", path.display()))?;
    info!(config_path = %path.display(), "Parsed config YAML successfully");
    Ok(parsed)
}

/// Credentials present in the process environment.
pub fn env_config() -> FileConfig {
    let read = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());
    FileConfig {
        user: read(USER_ENV),
        token: read(TOKEN_ENV),
        ..FileConfig::default()
    }
}

/// Merge every source and validate the result.
pub fn load_config(path: Option<&Path>, flags: FileConfig) -> Result<IngestConfig> {
    let mut merged = FileConfig::default();
    if let Some(path) = path {
        merged = merged.merge(read_config_file(path)?);
    }
    let merged = merged.merge(env_config()).merge(flags);

    let config = resolve(merged)?;
    config.validate()?;
    config.trace_loaded();
    Ok(config)
}

/// Turn merged raw values into an [`IngestConfig`], filling in defaults.
pub fn resolve(raw: FileConfig) -> Result<IngestConfig, ConfigError> {
    let defaults = IngestConfig::default();

    let checksum_type = match raw.checksum_type {
        Some(name) => name
            .parse::<ChecksumType>()
            .map_err(|_| ConfigError::InvalidChecksumType(name))?,
        None => defaults.checksum_type,
    };
    let state = match raw.state {
        Some(code) => code
            .parse::<ObjectState>()
            .map_err(|_| ConfigError::InvalidState(code))?,
        None => defaults.state,
    };

    Ok(IngestConfig {
        content_model: raw.content_model.unwrap_or(defaults.content_model),
        parent: raw.parent.unwrap_or(defaults.parent),
        namespace: raw.namespace.filter(|ns| !ns.is_empty()),
        owner: raw.owner.unwrap_or(defaults.owner),
        relationship: raw.relationship.unwrap_or(defaults.relationship),
        checksum_type,
        endpoint: raw.endpoint.unwrap_or(defaults.endpoint),
        user: raw.user.unwrap_or(defaults.user),
        token: raw.token.unwrap_or(defaults.token),
        state,
        max_datastream_size_mib: raw
            .max_datastream_size_mib
            .unwrap_or(defaults.max_datastream_size_mib),
        delete_input: raw.delete_input.unwrap_or(defaults.delete_input),
        plugins: raw.plugins,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_sources_win() {
        let file = FileConfig {
            owner: Some("file-owner".into()),
            endpoint: Some("http://repo/islandora/rest/v1".into()),
            plugins: vec!["Example".into()],
            ..FileConfig::default()
        };
        let flags = FileConfig {
            owner: Some("flag-owner".into()),
            ..FileConfig::default()
        };
        let merged = file.merge(flags);
        assert_eq!(merged.owner.as_deref(), Some("flag-owner"));
        assert_eq!(merged.endpoint.as_deref(), Some("http://repo/islandora/rest/v1"));
        assert_eq!(merged.plugins, ["Example"]);
    }

    #[test]
    fn bad_checksum_and_state_are_rejected() {
        let raw = FileConfig {
            checksum_type: Some("CRC32".into()),
            ..FileConfig::default()
        };
        assert_eq!(
            resolve(raw).unwrap_err(),
            ConfigError::InvalidChecksumType("CRC32".into())
        );

        let raw = FileConfig {
            state: Some("X".into()),
            ..FileConfig::default()
        };
        assert_eq!(resolve(raw).unwrap_err(), ConfigError::InvalidState("X".into()));
    }

    #[test]
    fn names_are_parsed_case_insensitively() {
        let raw = FileConfig {
            checksum_type: Some("sha-256".into()),
            state: Some("I".into()),
            ..FileConfig::default()
        };
        let config = resolve(raw).unwrap();
        assert_eq!(config.checksum_type, ChecksumType::Sha256);
        assert_eq!(config.state, ObjectState::Inactive);
    }
}
