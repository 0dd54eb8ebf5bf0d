//! Error types for archive-kernel

use thiserror::Error;

#[derive(Error, Debug)]
pub enum KernelError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("{operation} is not supported for {kind} operations")]
    UnsupportedOperationForKind { operation: &'static str, kind: String },

    #[error("Unsupported digest algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("Checksum mismatch: computed {algorithm} digest {actual} did not match expected value {expected}")]
    InvalidChecksum {
        algorithm: String,
        expected: String,
        actual: String,
    },

    #[error("Malformed RDF: {0}")]
    MalformedRdf(String),

    #[error("Server managed property or type: {0}")]
    ServerManaged(String),

    #[error("Invalid resource identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Invalid digest URI: {0}")]
    InvalidDigestUri(String),

    #[error("Invalid external content: {0}")]
    InvalidExternalContent(String),

    #[error("Request timeout: {0}")]
    Timeout(String),

    #[error("Cancelled: {0}")]
    Cancelled(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
