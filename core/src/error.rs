//! Error types for the product API client.
//!
//! # Design
//! `NotFound` gets a dedicated variant because views render "Product not
//! found" with a way back to the list instead of the generic failure banner.
//! Every other non-2xx response lands in `HttpError` with the raw status and
//! body. Errors are `Clone` so the query cache can keep the last failure next
//! to the last good data.

use thiserror::Error;

/// Errors returned by the transport and by `ProductClient` parse methods.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The server returned 404: the requested product does not exist.
    #[error("product not found")]
    NotFound,

    /// The server returned a non-2xx status other than 404.
    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    /// The request never produced a response (DNS, refused connection, timeout).
    #[error("network error: {0}")]
    NetworkError(String),

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    DeserializationError(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    SerializationError(String),
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound)
    }

    /// HTTP status of the failure, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::NotFound => Some(404),
            ApiError::HttpError { status, .. } => Some(*status),
            _ => None,
        }
    }
}
