//! Stored value representation for tokens.
//!
//! A token's stored value is either a whole-token alias (the entire value is
//! "same as another token") or a per-mode map of raw JSON values. Alias
//! descriptors are embedded in the JSON as objects of the form
//! `{"$alias": "<path>"}` (top level) or
//! `{"$alias": "<path>", "$mode": "<mode>"}` (mode/value level).
//!
//! This module also provides the raw-value walker that discovers every alias
//! site inside a mode value (the basis of the reference graph) and the
//! in-place rewriters used by rename/move propagation — the only place alias
//! literals are ever edited rather than replaced.

use indexmap::IndexMap;
use serde_json::Value as Json;

use super::errors::TokenError;
use crate::doc::path::{TokenPath, ValuePath};

/// JSON key naming the alias target path.
pub const ALIAS_KEY: &str = "$alias";
/// JSON key naming the alias target mode.
pub const MODE_KEY: &str = "$mode";
/// Reserved prefix: mode names must not start with this marker.
pub const RESERVED_PREFIX: char = '$';

/// A parsed alias literal: a target token path plus an optional target mode.
///
/// Top-level aliases carry no mode. At the mode/value tiers a missing mode
/// means "the same-named mode on the target token".
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct AliasDescriptor {
    pub target: TokenPath,
    pub mode: Option<String>,
}

impl AliasDescriptor {
    /// Parses a JSON value as an alias descriptor.
    ///
    /// Returns `None` unless the value is an object whose keys are exactly
    /// `$alias` (a string) plus optionally `$mode` (a string).
    pub fn from_json(value: &Json) -> Option<Self> {
        let map = value.as_object()?;
        let target = map.get(ALIAS_KEY)?.as_str()?;
        if !map.keys().all(|k| k == ALIAS_KEY || k == MODE_KEY) {
            return None;
        }
        let mode = match map.get(MODE_KEY) {
            Some(m) => Some(m.as_str()?.to_string()),
            None => None,
        };
        Some(AliasDescriptor {
            target: TokenPath::normalize(target),
            mode,
        })
    }

    /// Renders the descriptor back into its JSON literal form.
    pub fn to_json(&self) -> Json {
        let mut map = serde_json::Map::new();
        map.insert(ALIAS_KEY.into(), Json::String(self.target.as_str().into()));
        if let Some(mode) = &self.mode {
            map.insert(MODE_KEY.into(), Json::String(mode.clone()));
        }
        Json::Object(map)
    }
}

/// Returns `true` if the JSON value is an alias literal.
pub fn is_alias(value: &Json) -> bool {
    AliasDescriptor::from_json(value).is_some()
}

/// Validates a mode name: non-empty and not starting with the reserved
/// alias-marker prefix.
pub fn validate_mode_name(mode: &str) -> Result<(), TokenError> {
    if mode.is_empty() {
        return Err(TokenError::InvalidModeName {
            mode: mode.to_string(),
            reason: "mode names cannot be empty".to_string(),
        });
    }
    if mode.starts_with(RESERVED_PREFIX) {
        return Err(TokenError::InvalidModeName {
            mode: mode.to_string(),
            reason: format!("mode names cannot start with '{RESERVED_PREFIX}'"),
        });
    }
    Ok(())
}

/// The stored value of a token: a whole-token alias or a per-mode map.
///
/// The per-mode map preserves insertion order; `Token::modes` sorts on read.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenValue {
    /// The entire value is "same as another token".
    Alias(AliasDescriptor),
    /// Explicit per-mode values, each an arbitrary JSON tree that may embed
    /// mode-level (whole-mode) or value-level (nested field) alias literals.
    Modes(IndexMap<String, Json>),
}

impl TokenValue {
    /// Parses a stored value from its JSON form.
    ///
    /// A top-level alias must not carry `$mode` (whole-token aliases target a
    /// whole token); a per-mode map must have at least one mode and valid
    /// mode names.
    pub fn from_json(value: &Json) -> Result<Self, TokenError> {
        if let Some(descriptor) = AliasDescriptor::from_json(value) {
            if descriptor.mode.is_some() {
                return Err(TokenError::InvalidValue {
                    reason: format!(
                        "top-level alias to \"{}\" cannot carry \"{MODE_KEY}\"",
                        descriptor.target
                    ),
                });
            }
            return Ok(TokenValue::Alias(descriptor));
        }

        let map = value.as_object().ok_or_else(|| TokenError::InvalidValue {
            reason: format!("token value must be an alias or a per-mode map, got {value}"),
        })?;
        if map.is_empty() {
            return Err(TokenError::InvalidValue {
                reason: "token value must define at least one mode".to_string(),
            });
        }

        let mut modes = IndexMap::new();
        for (mode, mode_value) in map {
            validate_mode_name(mode)?;
            modes.insert(mode.clone(), mode_value.clone());
        }
        Ok(TokenValue::Modes(modes))
    }

    /// Renders the stored value back into its JSON form.
    pub fn to_json(&self) -> Json {
        match self {
            TokenValue::Alias(descriptor) => descriptor.to_json(),
            TokenValue::Modes(modes) => {
                let mut map = serde_json::Map::new();
                for (mode, value) in modes {
                    map.insert(mode.clone(), value.clone());
                }
                Json::Object(map)
            }
        }
    }

    /// Returns `true` if the whole stored value is one alias.
    pub fn is_alias(&self) -> bool {
        matches!(self, TokenValue::Alias(_))
    }

    /// Returns the top-level alias descriptor, if any.
    pub fn as_alias(&self) -> Option<&AliasDescriptor> {
        match self {
            TokenValue::Alias(descriptor) => Some(descriptor),
            TokenValue::Modes(_) => None,
        }
    }

    /// Returns the per-mode map, if this is not a top-level alias.
    pub fn as_modes(&self) -> Option<&IndexMap<String, Json>> {
        match self {
            TokenValue::Alias(_) => None,
            TokenValue::Modes(modes) => Some(modes),
        }
    }

    /// Mutable access to the per-mode map.
    pub(crate) fn as_modes_mut(&mut self) -> Option<&mut IndexMap<String, Json>> {
        match self {
            TokenValue::Alias(_) => None,
            TokenValue::Modes(modes) => Some(modes),
        }
    }
}

/// Deep-merges `partial` into `existing`.
///
/// Objects merge recursively; everything else (primitives, arrays, alias
/// literals) replaces wholesale. An alias literal on either side is treated
/// as a leaf: merging *into* an alias replaces it, merging an alias *over*
/// anything installs the alias.
pub fn deep_merge(existing: &mut Json, partial: &Json) {
    if is_alias(existing) || is_alias(partial) {
        *existing = partial.clone();
        return;
    }
    match (existing, partial) {
        (Json::Object(base), Json::Object(update)) => {
            for (key, value) in update {
                match base.get_mut(key) {
                    Some(slot) => deep_merge(slot, value),
                    None => {
                        base.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (existing, partial) => *existing = partial.clone(),
    }
}

/// Walks one mode's raw value and collects every alias site in depth-first
/// order, as `(value path, descriptor)` pairs.
///
/// A whole-mode alias yields a single site at the empty value path;
/// composite values yield one site per embedded alias literal, including
/// inside arrays.
pub fn alias_sites(value: &Json) -> Vec<(ValuePath, AliasDescriptor)> {
    let mut sites = Vec::new();
    collect_alias_sites(value, &ValuePath::root(), &mut sites);
    sites
}

fn collect_alias_sites(value: &Json, at: &ValuePath, out: &mut Vec<(ValuePath, AliasDescriptor)>) {
    if let Some(descriptor) = AliasDescriptor::from_json(value) {
        out.push((at.clone(), descriptor));
        return;
    }
    match value {
        Json::Object(map) => {
            for (key, nested) in map {
                collect_alias_sites(nested, &at.push_field(key.clone()), out);
            }
        }
        Json::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                collect_alias_sites(item, &at.push_index(index), out);
            }
        }
        _ => {}
    }
}

/// Rewrites, in place, the target path of every alias literal in `value`
/// that points at `old` or a descendant of `old`, substituting the `new`
/// prefix. Returns the number of literals rewritten.
///
/// Target modes are never touched by this pass.
pub fn retarget_aliases(value: &mut Json, old: &TokenPath, new: &TokenPath) -> usize {
    if let Some(descriptor) = AliasDescriptor::from_json(value) {
        if let Some(rewritten) = descriptor.target.replace_prefix(old, new) {
            if let Json::Object(map) = value {
                map.insert(ALIAS_KEY.into(), Json::String(rewritten.as_str().into()));
            }
            return 1;
        }
        return 0;
    }
    match value {
        Json::Object(map) => map
            .values_mut()
            .map(|nested| retarget_aliases(nested, old, new))
            .sum(),
        Json::Array(items) => items
            .iter_mut()
            .map(|item| retarget_aliases(item, old, new))
            .sum(),
        _ => 0,
    }
}

/// Rewrites, in place, the `$mode` of every alias literal in `value` that
/// targets exactly `(target, from_mode)`, pointing it at `to_mode` instead.
/// Returns the number of literals rewritten.
pub fn retarget_mode_aliases(
    value: &mut Json,
    target: &TokenPath,
    from_mode: &str,
    to_mode: &str,
) -> usize {
    if let Some(descriptor) = AliasDescriptor::from_json(value) {
        if descriptor.target == *target && descriptor.mode.as_deref() == Some(from_mode) {
            if let Json::Object(map) = value {
                map.insert(MODE_KEY.into(), Json::String(to_mode.to_string()));
            }
            return 1;
        }
        return 0;
    }
    match value {
        Json::Object(map) => map
            .values_mut()
            .map(|nested| retarget_mode_aliases(nested, target, from_mode, to_mode))
            .sum(),
        Json::Array(items) => items
            .iter_mut()
            .map(|item| retarget_mode_aliases(item, target, from_mode, to_mode))
            .sum(),
        _ => 0,
    }
}
