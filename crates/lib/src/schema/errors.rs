//! Error types for the schema/validation seam.

use thiserror::Error;

/// Errors raised by the type registry when validating token values.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum SchemaError {
    /// The value does not conform to the token type's expected shape.
    #[error("Validation failed for type \"{ty}\"{}: {reason}", field.as_ref().map(|f| format!(" at \"{f}\"")).unwrap_or_default())]
    Validation {
        ty: String,
        field: Option<String>,
        reason: String,
    },

    /// The token type is not known to the registry.
    #[error("Unknown token type \"{ty}\"")]
    UnknownType { ty: String },
}

impl SchemaError {
    /// Check if this error is a value-shape validation failure.
    pub fn is_validation(&self) -> bool {
        matches!(self, SchemaError::Validation { .. })
    }
}

impl From<SchemaError> for crate::Error {
    fn from(err: SchemaError) -> Self {
        crate::Error::Schema(err)
    }
}
