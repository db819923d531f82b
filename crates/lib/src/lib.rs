//!
//! Tokentree: an in-memory design-token document engine.
//!
//! ## Core Concepts
//!
//! * **Documents (`doc::TokenDocument`)**: One complete token tree — all token
//!   states plus the group/collection hierarchy. Multiple documents coexist
//!   independently in one process.
//! * **Paths (`doc::path::TokenPath`, `doc::path::ValuePath`)**: Dot-separated
//!   tree addresses for tokens and groups, and structural addresses (fields
//!   and array indices) into a token's value.
//! * **Tokens (`token::Token`)**: Stable-identity nodes carrying a type, an
//!   optional description, and a per-mode value map (or a whole-token alias).
//! * **Aliases**: `{"$alias": "path"}` literals inside values, pointing at
//!   other tokens. Resolution is derived state, recomputed on read; broken
//!   aliases are data, not errors.
//! * **Resolution (`resolve`)**: Tiered read results (`resolve::TopTier`,
//!   `resolve::ModeTier`, `resolve::ValueTier`) with map/unwrap combinators,
//!   plus deep resolution that chases alias chains with cycle detection.
//! * **Graph (`graph`)**: The document-wide alias reference graph, recomputed
//!   from stored values on every query.
//! * **Schema (`schema`)**: Pluggable per-type validation and merge rules
//!   applied before any value mutation commits.

pub mod doc;
pub mod graph;
pub mod resolve;
pub mod schema;
pub mod token;

/// Re-export the document type for easier access.
pub use doc::TokenDocument;

/// Result type used throughout the tokentree library.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for the tokentree library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Structured path parsing and validation errors.
    #[error(transparent)]
    Path(#[from] doc::path::PathError),

    /// Structured document tree errors from the doc module.
    #[error(transparent)]
    Doc(doc::DocError),

    /// Structured token state errors from the token module.
    #[error(transparent)]
    Token(token::errors::TokenError),

    /// Structured resolution errors from the resolve module.
    #[error(transparent)]
    Resolve(resolve::errors::ResolveError),

    /// Structured type validation errors from the schema module.
    #[error(transparent)]
    Schema(schema::errors::SchemaError),
}

impl Error {
    /// Get the originating module for this error.
    pub fn module(&self) -> &'static str {
        match self {
            Error::Path(_) => "path",
            Error::Doc(_) => "doc",
            Error::Token(_) => "token",
            Error::Resolve(_) => "resolve",
            Error::Schema(_) => "schema",
            Error::Serialize(_) => "serialize",
        }
    }

    /// Check if this error indicates a missing token, group, or mode.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::Doc(doc_err) => doc_err.is_not_found(),
            Error::Token(token_err) => token_err.is_mode_not_found(),
            _ => false,
        }
    }

    /// Check if this error indicates a name collision.
    pub fn is_conflict(&self) -> bool {
        match self {
            Error::Token(token_err) => token_err.is_collision(),
            _ => false,
        }
    }

    /// Check if this error is a value or type validation failure.
    pub fn is_validation_error(&self) -> bool {
        match self {
            Error::Path(_) => true,
            Error::Schema(schema_err) => schema_err.is_validation(),
            Error::Token(token_err) => {
                matches!(
                    token_err,
                    token::errors::TokenError::InvalidModeName { .. }
                        | token::errors::TokenError::InvalidValue { .. }
                )
            }
            _ => false,
        }
    }

    /// Check if this error stems from an operation forbidden on alias tokens.
    pub fn is_alias_restriction(&self) -> bool {
        match self {
            Error::Token(token_err) => token_err.is_alias_restriction(),
            _ => false,
        }
    }

    /// Check if this error is a collection mode-set violation.
    pub fn is_collection_fence(&self) -> bool {
        match self {
            Error::Token(token_err) => token_err.is_collection_fence(),
            _ => false,
        }
    }

    /// Check if this error reports unresolved alias references.
    pub fn is_unresolved(&self) -> bool {
        match self {
            Error::Resolve(resolve_err) => resolve_err.is_unresolved(),
            _ => false,
        }
    }
}
