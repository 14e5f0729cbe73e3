//! Boundary errors
//!
//! The report engine itself never fails. These errors come from the edges of
//! the system: resolving a run id to data, decoding raw run files, and
//! loading configuration.

use crate::run::RunId;
use std::path::PathBuf;
use thiserror::Error;

/// Errors decoding a raw run document
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Invalid run JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Expected a JSON object keyed by \"caller==>callee\", found {0}")]
    NotAnObject(&'static str),
}

/// Errors resolving a run id through a [`crate::provider::RunProvider`]
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Run not found: {0}")]
    NotFound(RunId),

    #[error("Invalid run id {0:?}: must be non-empty and contain no path separators")]
    InvalidRunId(String),

    #[error("Failed to read run {id} from {}: {source}", .path.display())]
    Read {
        id: RunId,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to list runs in {}: {source}", .path.display())]
    List {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode run {id}: {source}")]
    Decode {
        id: RunId,
        #[source]
        source: DecodeError,
    },
}

/// Errors loading or validating a [`crate::config::ReportConfig`]
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}
