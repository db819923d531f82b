//! Structural error types for token-state operations.
//!
//! These cover violations of the token-level invariants: mode bookkeeping,
//! top-level-alias restrictions, name collisions, and collection mode fences.
//! They are always fatal to the single call and never leave a partial write
//! behind; the caller corrects its input and resubmits.

use thiserror::Error;

use crate::doc::path::TokenPath;

/// Structural errors raised by token mutation and read operations.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum TokenError {
    /// A mode name failed the naming constraint.
    #[error("Invalid mode name \"{mode}\": {reason}")]
    InvalidModeName { mode: String, reason: String },

    /// A stored value did not parse as an alias or per-mode map.
    #[error("Invalid token value: {reason}")]
    InvalidValue { reason: String },

    /// The mode already exists on this token.
    #[error("Mode \"{mode}\" already exists on token \"{token}\"")]
    ModeExists { token: TokenPath, mode: String },

    /// The mode does not exist on this token.
    #[error("Mode \"{mode}\" does not exist on token \"{token}\"")]
    ModeNotFound { token: TokenPath, mode: String },

    /// A token must always keep at least one mode.
    #[error("Cannot delete mode \"{mode}\" of token \"{token}\": a token must have at least one mode")]
    LastMode { token: TokenPath, mode: String },

    /// The operation is not available on a top-level alias token.
    #[error("Cannot {operation} on token \"{token}\": it is a top-level alias")]
    TopLevelAlias {
        token: TokenPath,
        operation: &'static str,
    },

    /// The operation needs the alias target's modes, but the top-level alias
    /// does not resolve.
    #[error("Cannot {operation} on token \"{token}\": its top-level alias does not resolve")]
    UnresolvableTopLevelAlias {
        token: TokenPath,
        operation: &'static str,
    },

    /// A node already exists at the destination path.
    #[error("A node already exists at \"{path}\"")]
    NameCollision { path: TokenPath },

    /// The token's mode set does not match the collection's fixed mode set.
    #[error(
        "Token \"{token}\" has modes [{found}] but collection \"{collection}\" requires exactly [{expected}]"
    )]
    CollectionModeMismatch {
        token: TokenPath,
        collection: TokenPath,
        expected: String,
        found: String,
    },

    /// Collections fix their mode set; per-token mode creation/deletion is
    /// not allowed inside one.
    #[error("Cannot {operation} on token \"{token}\": collection \"{collection}\" fixes its mode set")]
    CollectionFixedModes {
        token: TokenPath,
        collection: TokenPath,
        operation: &'static str,
    },

    /// The mode name is not part of the enclosing collection's fixed set.
    #[error("Mode \"{mode}\" is not allowed by collection \"{collection}\" for token \"{token}\"")]
    ModeNotInCollection {
        token: TokenPath,
        collection: TokenPath,
        mode: String,
    },
}

impl TokenError {
    /// Check if this error is about a missing mode.
    pub fn is_mode_not_found(&self) -> bool {
        matches!(self, TokenError::ModeNotFound { .. })
    }

    /// Check if this error is a top-level-alias restriction.
    pub fn is_alias_restriction(&self) -> bool {
        matches!(
            self,
            TokenError::TopLevelAlias { .. } | TokenError::UnresolvableTopLevelAlias { .. }
        )
    }

    /// Check if this error is a collection mode fence.
    pub fn is_collection_fence(&self) -> bool {
        matches!(
            self,
            TokenError::CollectionModeMismatch { .. }
                | TokenError::CollectionFixedModes { .. }
                | TokenError::ModeNotInCollection { .. }
        )
    }

    /// Check if this error is a name/path collision.
    pub fn is_collision(&self) -> bool {
        matches!(self, TokenError::NameCollision { .. })
    }
}

impl From<TokenError> for crate::Error {
    fn from(err: TokenError) -> Self {
        crate::Error::Token(err)
    }
}
