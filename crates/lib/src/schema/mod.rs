//! The schema/validation seam.
//!
//! The engine treats value validation as an external capability behind the
//! [`TypeRegistry`] trait: "validate this partial update against the token
//! type's shape and merge it into the existing value, or raise a structured
//! validation error". [`BasicRegistry`] is the built-in implementation
//! covering the common design-token types at the JSON-shape level, enough
//! for the engine and its tests to run standalone; embedders with a real
//! schema system plug in their own registry.
//!
//! Alias literals bypass shape validation everywhere: they are validated
//! structurally as alias objects, and their conformance is a resolution
//! question, not a schema one.

pub mod errors;

pub use errors::SchemaError;

use std::collections::HashMap;

use serde_json::Value as Json;

use crate::token::value::{deep_merge, is_alias};

/// The broad value shape a token type expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    /// A JSON string leaf.
    Text,
    /// A JSON number leaf.
    Number,
    /// A JSON boolean leaf.
    Boolean,
    /// A JSON object of named fields (partial updates deep-merge).
    Composite,
    /// A JSON array of composite elements (replaced wholesale).
    Array,
}

/// Descriptor of one token type's value shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDefinition {
    pub name: String,
    pub kind: TypeKind,
}

impl TypeDefinition {
    pub fn new(name: impl Into<String>, kind: TypeKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// Whether partial updates deep-merge (composites) or replace.
    pub fn merges(&self) -> bool {
        self.kind == TypeKind::Composite
    }
}

/// The validation capability the engine consumes.
pub trait TypeRegistry {
    /// Returns the type descriptor, or `None` for types the registry does
    /// not constrain.
    fn definition(&self, ty: &str) -> Option<&TypeDefinition>;

    /// Validates `partial` against the type's shape and merges it into
    /// `existing`, returning the committed value. Must not mutate anything;
    /// the engine commits the returned value only after the whole operation
    /// has passed its preconditions.
    fn validate_and_merge(
        &self,
        ty: &str,
        existing: Option<&Json>,
        partial: &Json,
    ) -> Result<Json, SchemaError>;
}

/// JSON-shape registry for the common design-token types.
///
/// Unconstrained types (anything not in the table) accept any JSON value and
/// deep-merge objects, so documents with custom types still import and edit.
#[derive(Debug, Clone)]
pub struct BasicRegistry {
    types: HashMap<String, TypeDefinition>,
}

impl Default for BasicRegistry {
    fn default() -> Self {
        let defaults = [
            ("string", TypeKind::Text),
            ("number", TypeKind::Number),
            ("boolean", TypeKind::Boolean),
            ("duration", TypeKind::Text),
            ("font-family", TypeKind::Text),
            ("color", TypeKind::Composite),
            ("dimension", TypeKind::Composite),
            ("font-size", TypeKind::Composite),
            ("gradient", TypeKind::Composite),
            ("border", TypeKind::Composite),
            ("shadow", TypeKind::Array),
        ];
        let types = defaults
            .into_iter()
            .map(|(name, kind)| (name.to_string(), TypeDefinition::new(name, kind)))
            .collect();
        Self { types }
    }
}

impl BasicRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers or overrides a type descriptor.
    pub fn register(&mut self, definition: TypeDefinition) {
        self.types.insert(definition.name.clone(), definition);
    }
}

fn shape_error(ty: &str, expected: &str, found: &Json) -> SchemaError {
    SchemaError::Validation {
        ty: ty.to_string(),
        field: None,
        reason: format!("expected {expected}, got {found}"),
    }
}

impl TypeRegistry for BasicRegistry {
    fn definition(&self, ty: &str) -> Option<&TypeDefinition> {
        self.types.get(ty)
    }

    fn validate_and_merge(
        &self,
        ty: &str,
        existing: Option<&Json>,
        partial: &Json,
    ) -> Result<Json, SchemaError> {
        // Alias literals are validated structurally, not by shape.
        if is_alias(partial) {
            return Ok(partial.clone());
        }

        let Some(definition) = self.types.get(ty) else {
            // Unconstrained type: merge objects, replace otherwise.
            return Ok(match existing {
                Some(base) if base.is_object() && partial.is_object() => {
                    let mut merged = base.clone();
                    deep_merge(&mut merged, partial);
                    merged
                }
                _ => partial.clone(),
            });
        };

        match definition.kind {
            TypeKind::Text => {
                if !partial.is_string() {
                    return Err(shape_error(ty, "a string", partial));
                }
                Ok(partial.clone())
            }
            TypeKind::Number => {
                if !partial.is_number() {
                    return Err(shape_error(ty, "a number", partial));
                }
                Ok(partial.clone())
            }
            TypeKind::Boolean => {
                if !partial.is_boolean() {
                    return Err(shape_error(ty, "a boolean", partial));
                }
                Ok(partial.clone())
            }
            TypeKind::Composite => {
                if !partial.is_object() {
                    return Err(shape_error(ty, "an object", partial));
                }
                match existing {
                    // Merging into an alias replaces it; the engine handles
                    // alias write-through before calling in.
                    Some(base) if base.is_object() && !is_alias(base) => {
                        let mut merged = base.clone();
                        deep_merge(&mut merged, partial);
                        Ok(merged)
                    }
                    _ => Ok(partial.clone()),
                }
            }
            TypeKind::Array => {
                if !partial.is_array() {
                    return Err(shape_error(ty, "an array", partial));
                }
                Ok(partial.clone())
            }
        }
    }
}
