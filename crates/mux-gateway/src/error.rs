//! Error types for the gateway

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by an [`crate::AttributeServer`] implementation
#[derive(Debug, Error)]
pub enum AttrError {
    /// The referenced node does not exist on the server
    #[error("attribute node not found: {0}")]
    NodeNotFound(u64),

    /// The server rejected the operation
    #[error("attribute operation rejected: {0}")]
    Rejected(String),

    /// The server backend is unreachable or failed internally
    #[error("attribute server backend error: {0}")]
    Backend(String),

    /// The gateway root objects have not been created yet
    #[error("gateway not initialized")]
    NotInitialized,
}

/// Errors loading the startup configuration
///
/// Any of these is startup-fatal and surfaces before a transport is opened.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file missing or unreadable
    #[error("cannot read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration file is not valid JSON or misses required fields
    #[error("cannot parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
