//! Error types for alias resolution.
//!
//! Unresolvable aliases are first-class *data* (`Unresolvable*` tier
//! variants, edges with `resolvable: false`) and never raise an error on
//! default reads. The errors here cover the explicit escalation points:
//! strict JSON output, `unwrap_value` on a still-aliased payload, mode
//! selection on an absent mode, and deep-mode resolution starting from a
//! top-level alias.

use thiserror::Error;

use crate::doc::path::TokenPath;

/// Errors raised by the resolution algebra's strict entry points.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ResolveError {
    /// `unwrap_value` was called while the payload is still an alias variant.
    #[error("Value of token \"{token}\" is still an alias and cannot be unwrapped as a value")]
    StillAliased { token: TokenPath },

    /// The requested mode is not defined on the value being inspected.
    #[error("Mode \"{mode}\" not defined")]
    ModeNotDefined { mode: String },

    /// Strict JSON output found aliases that do not resolve.
    #[error("Cannot resolve alias reference(s): {}", references.join(", "))]
    UnresolvedReferences { references: Vec<String> },

    /// Deep-mode resolution cannot start from a top-level alias token.
    #[error(
        "Cannot deeply resolve mode \"{mode}\" of token \"{token}\": its whole value is an alias"
    )]
    TopLevelAliasResolution { token: TokenPath, mode: String },
}

impl ResolveError {
    /// Check if this error reports unresolved references under strict output.
    pub fn is_unresolved(&self) -> bool {
        matches!(self, ResolveError::UnresolvedReferences { .. })
    }
}

impl From<ResolveError> for crate::Error {
    fn from(err: ResolveError) -> Self {
        crate::Error::Resolve(err)
    }
}
