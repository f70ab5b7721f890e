#![doc = "rest-ingester-core: core ingestion engine for rest-ingester."]

//! This crate holds everything that decides *what* gets sent to an Islandora
//! REST endpoint and in which order: package conventions on disk, the
//! object/datastream/relationship protocol, and the content-model packagers
//! that compose them into hierarchies.
//!
//! The remote API itself is only seen through [`contract::RepositoryApi`]; the
//! concrete HTTP client lives in the CLI crate.
//!
//! # Usage
//! Build an [`config::IngestConfig`], pick a packager from
//! [`packager::PackagerRegistry`] and hand both to
//! [`synchronise::synchronise`] together with an API implementation.

pub mod checksum;
pub mod config;
pub mod contract;
pub mod datastream;
pub mod error;
pub mod metadata;
pub mod object;
pub mod packager;
pub mod pid;
pub mod plugin;
pub mod relationship;
pub mod synchronise;

pub use config::IngestConfig;
pub use contract::RepositoryApi;
pub use error::{ApiError, ConfigError, IngestError, IngestOutcome, SkipReason};
