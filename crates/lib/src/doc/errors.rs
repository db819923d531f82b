//! Error types for document-level operations.
//!
//! These cover tree-level failures: missing tokens or groups, invalid move
//! destinations, and malformed document JSON at import time.

use thiserror::Error;

use super::path::TokenPath;

/// Structured error types for document tree operations.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum DocError {
    /// No token exists at the given path.
    #[error("Token \"{path}\" does not exist")]
    TokenNotFound { path: TokenPath },

    /// No group exists at the given path.
    #[error("Group \"{path}\" does not exist")]
    GroupNotFound { path: TokenPath },

    /// The destination of a move does not exist as a group or collection.
    #[error("Destination \"{path}\" does not exist")]
    DestinationNotFound { path: TokenPath },

    /// The document JSON did not parse into a token tree.
    #[error("Invalid document node at \"{path}\": {reason}")]
    ImportFailed { path: TokenPath, reason: String },
}

impl DocError {
    /// Check if this error indicates a missing node.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            DocError::TokenNotFound { .. }
                | DocError::GroupNotFound { .. }
                | DocError::DestinationNotFound { .. }
        )
    }
}

impl From<DocError> for crate::Error {
    fn from(err: DocError) -> Self {
        crate::Error::Doc(err)
    }
}
