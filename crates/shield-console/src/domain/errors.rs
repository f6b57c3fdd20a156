//! # Domain Errors
//!
//! Error types for the Shield console core.
//!
//! A Merkle mismatch is deliberately absent here: a proof that folds to a
//! different root is a negative [`VerificationReport`](super::VerificationReport),
//! not an error.

use thiserror::Error;

/// Shield console error types.
#[derive(Debug, Error)]
pub enum ConsoleError {
    /// A hex field of a proof could not be decoded.
    #[error("Invalid proof encoding in {field}: {value:?}")]
    InvalidProofEncoding {
        /// Field that failed (`leaf`, `root`, `path[2].sibling`, ...)
        field: String,
        /// Offending value
        value: String,
    },

    /// Inbound payload was not a valid envelope or its data did not decode.
    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    /// Live channel could not be opened or failed mid-stream.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Request completed with a non-2xx status.
    #[error("Request to {endpoint} failed with status {status}")]
    RequestStatus {
        /// Endpoint path that was called
        endpoint: String,
        /// HTTP status code
        status: u16,
    },

    /// Request could not be sent or its body could not be decoded.
    #[error("Request to {endpoint} failed: {reason}")]
    Request {
        /// Endpoint path that was called
        endpoint: String,
        /// Underlying failure
        reason: String,
    },

    /// Configuration rejected by validation.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// No stored receipt carries this identifier.
    #[error("Receipt not found: {0}")]
    ReceiptNotFound(String),

    /// No retained mesh proof pointer matches.
    #[error("Mesh proof pointer not found: {peer}/{receipt_id}")]
    PointerNotFound {
        /// Peer the pointer was announced by
        peer: String,
        /// Receipt identifier
        receipt_id: String,
    },

    /// Engine or service was torn down.
    #[error("Console has been disposed")]
    Disposed,
}

impl ConsoleError {
    /// Shorthand for an encoding error on a named field.
    pub fn encoding(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidProofEncoding {
            field: field.into(),
            value: value.into(),
        }
    }

    /// True for errors that only affect the single call that produced them.
    pub fn is_request_error(&self) -> bool {
        matches!(self, Self::RequestStatus { .. } | Self::Request { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoding_error_names_field() {
        let err = ConsoleError::encoding("path[1].sibling", "zz");
        assert!(err.to_string().contains("path[1].sibling"));
        assert!(err.to_string().contains("zz"));
    }

    #[test]
    fn test_request_status_error() {
        let err = ConsoleError::RequestStatus {
            endpoint: "/action/apply".to_string(),
            status: 403,
        };
        assert!(err.to_string().contains("403"));
        assert!(err.is_request_error());
    }

    #[test]
    fn test_pointer_not_found_error() {
        let err = ConsoleError::PointerNotFound {
            peer: "p1".to_string(),
            receipt_id: "r9".to_string(),
        };
        assert!(err.to_string().contains("p1/r9"));
        assert!(!err.is_request_error());
    }
}
