//! Client error types

use thiserror::Error;

/// Errors surfaced when building a live feed client.
///
/// Transport-level failures after connect are not errors to the caller; the
/// reconnect state machine retries them internally.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The configured base URL did not parse
    #[error("invalid base url {url:?}: {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// A room path could not be joined onto the base URL
    #[error("invalid room url: {0}")]
    InvalidRoomUrl(#[from] url::ParseError),
}
