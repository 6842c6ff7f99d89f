//! Error types for the federated client
//!
//! Covers codec failures, collaborator failures and the transport that
//! carries requests from the coordinator.

use thiserror::Error;

/// Primary error type for all client operations
#[derive(Debug, Error)]
pub enum Error {
    // ========== Codec Errors ==========

    /// Tensor byte length does not fit the element width
    #[error("Malformed tensor: {len} bytes cannot be read as {width}-byte elements")]
    MalformedTensor { len: usize, width: usize },

    // ========== Collaborator Errors ==========

    /// Training or evaluation failed inside the model
    #[error("Model failed: {0}")]
    Model(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The model panicked while serving a request
    #[error("Model panicked: {details}")]
    Panicked { details: String },

    // ========== Protocol Errors ==========

    /// Frame header is not a valid message
    #[error("Invalid message header: {0}")]
    Json(#[from] serde_json::Error),

    /// Frame segments do not match the header
    #[error("Invalid message: {reason}")]
    InvalidMessage { reason: String },

    /// Reading or writing a frame failed
    #[error("Transport failed: {0}")]
    Io(#[from] std::io::Error),

    // ========== Startup Errors ==========

    /// Missing or invalid configuration
    #[error("Invalid configuration: {reason}")]
    Config { reason: String },
}

impl Error {
    /// Wraps a collaborator error without interpreting it
    pub fn model(e: impl std::error::Error + Send + Sync + 'static) -> Self {
        Error::Model(Box::new(e))
    }

    /// Returns true if this error came from the tensor codec
    pub fn is_malformed_tensor(&self) -> bool {
        matches!(self, Error::MalformedTensor { .. })
    }
}

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, Error>;
