//! Error types for gavel-core

use thiserror::Error;

use crate::topic::TopicError;

/// Top-level error type for gavel-core
#[derive(Error, Debug)]
pub enum GavelError {
    #[error("Topic error: {0}")]
    Topic(#[from] TopicError),

    #[error("Payload error: {0}")]
    Payload(#[from] serde_json::Error),
}
