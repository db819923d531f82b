//! Per-token state: declared type, value, metadata, and resolution views.
//!
//! A [`Token`] is the live representation of one token node. It is owned
//! exclusively by the [`TokenDocument`](crate::doc::TokenDocument) that
//! created it; its identity ([`TokenId`]) is stable across renames and moves
//! while its path attribute changes. Mutations go through the owning
//! document (`rename`, `rename_mode`, `move_token`, `update_value`, …) so
//! alias bookkeeping across the whole tree stays consistent; this module
//! holds the read surface.
//!
//! Resolution results are never stored: every accessor that answers a
//! resolvability question recomputes from current tree contents, so a read
//! after any mutation always reflects the new state.

pub mod errors;
pub mod value;

pub use errors::TokenError;
pub use value::{AliasDescriptor, TokenValue};

use std::fmt;

use indexmap::IndexMap;
use serde_json::Value as Json;
use uuid::Uuid;

use crate::{
    doc::{TokenDocument, path::TokenPath},
    resolve::{
        ModeTier, ResolveError, StatefulValue, TopTier, UiModeValue,
        deep::{
            self, DeepModeResolution, classify_alias, classify_mode_value, effective_mode_owner,
            missing_token_reason, resolve_deep_value,
        },
    },
    schema::TypeDefinition,
};

/// Stable identity of a token, independent of its current path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TokenId(Uuid);

impl TokenId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Options for [`Token::json_value`].
#[derive(Debug, Clone, Default)]
pub struct JsonValueOptions {
    /// Deeply resolve aliases instead of emitting the stored literals.
    pub resolve_aliases: bool,
    /// When resolving, tolerate broken aliases by keeping their literal
    /// form. `false` escalates them to an error naming the targets.
    pub allow_unresolvable: bool,
    /// Narrow the output to one mode, failing if it does not exist.
    pub target_mode: Option<String>,
}

impl JsonValueOptions {
    /// The default read: raw stored value, broken aliases tolerated.
    pub fn raw() -> Self {
        Self {
            resolve_aliases: false,
            allow_unresolvable: true,
            target_mode: None,
        }
    }

    /// Deep resolution, broken aliases kept as literals.
    pub fn resolved() -> Self {
        Self {
            resolve_aliases: true,
            allow_unresolvable: true,
            target_mode: None,
        }
    }

    /// Deep resolution, broken aliases escalated to an error.
    pub fn strict() -> Self {
        Self {
            resolve_aliases: true,
            allow_unresolvable: false,
            target_mode: None,
        }
    }

    pub fn with_mode(mut self, mode: impl Into<String>) -> Self {
        self.target_mode = Some(mode.into());
        self
    }
}

/// The live state of one token node.
#[derive(Debug, Clone)]
pub struct Token {
    id: TokenId,
    path: TokenPath,
    ty: String,
    description: Option<String>,
    extensions: Option<Json>,
    value: TokenValue,
}

impl Token {
    pub(crate) fn new(
        path: TokenPath,
        ty: impl Into<String>,
        value: TokenValue,
        description: Option<String>,
        extensions: Option<Json>,
    ) -> Self {
        Self {
            id: TokenId::new(),
            path,
            ty: ty.into(),
            description,
            extensions,
            value,
        }
    }

    /// Stable identity, unchanged by rename/move.
    pub fn id(&self) -> TokenId {
        self.id
    }

    /// Current tree path.
    pub fn path(&self) -> &TokenPath {
        &self.path
    }

    /// The token's name: the last segment of its path.
    pub fn name(&self) -> &str {
        self.path.name().unwrap_or_default()
    }

    /// The declared token type, fixed at creation.
    pub fn ty(&self) -> &str {
        &self.ty
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn extensions(&self) -> Option<&Json> {
        self.extensions.as_ref()
    }

    /// The stored value: top-level alias or per-mode map.
    pub fn value(&self) -> &TokenValue {
        &self.value
    }

    /// The type's schema descriptor, if the document's registry knows it.
    pub fn definition<'a>(&self, doc: &'a TokenDocument) -> Option<&'a TypeDefinition> {
        doc.registry().definition(&self.ty)
    }

    /// Is the entire stored value one alias rather than a per-mode map?
    pub fn is_top_level_alias(&self) -> bool {
        self.value.is_alias()
    }

    /// The mode names present, sorted lexicographically.
    ///
    /// For a resolvable top-level alias the modes come transitively from the
    /// ultimate target; an unresolvable (or cyclic) top-level alias has no
    /// modes.
    pub fn modes(&self, doc: &TokenDocument) -> Vec<String> {
        let mut modes: Vec<String> = match &self.value {
            TokenValue::Modes(map) => map.keys().cloned().collect(),
            TokenValue::Alias(_) => match effective_mode_owner(doc, &self.path) {
                Some(owner) => owner
                    .value
                    .as_modes()
                    .map(|map| map.keys().cloned().collect())
                    .unwrap_or_default(),
                None => Vec::new(),
            },
        };
        modes.sort();
        modes
    }

    /// Per-mode deep resolvability, in mode order of [`Token::modes`].
    ///
    /// A mode is resolvable iff its value, resolved deeply through all
    /// nested aliases, never terminates in an unresolvable (or cyclic) link.
    pub fn modes_resolvability(&self, doc: &TokenDocument) -> IndexMap<String, bool> {
        match &self.value {
            TokenValue::Modes(map) => map
                .keys()
                .map(|mode| {
                    let deep = resolve_deep_value(doc, &self.path, mode, &map[mode]);
                    (mode.clone(), deep.is_fully_resolved())
                })
                .collect(),
            TokenValue::Alias(_) => {
                let Some(owner) = effective_mode_owner(doc, &self.path) else {
                    return IndexMap::new();
                };
                let owner_path = owner.path.clone();
                owner
                    .value
                    .as_modes()
                    .map(|map| {
                        map.iter()
                            .map(|(mode, value)| {
                                let deep = resolve_deep_value(doc, &owner_path, mode, value);
                                (mode.clone(), deep.is_fully_resolved())
                            })
                            .collect()
                    })
                    .unwrap_or_default()
            }
        }
    }

    /// True iff every mode and every nested alias resolves.
    ///
    /// For a top-level alias: the alias chain reaches a real token and that
    /// token itself fully resolves.
    pub fn is_fully_resolvable(&self, doc: &TokenDocument) -> bool {
        match &self.value {
            TokenValue::Modes(_) => self
                .modes_resolvability(doc)
                .values()
                .all(|resolvable| *resolvable),
            TokenValue::Alias(_) => {
                if effective_mode_owner(doc, &self.path).is_none() {
                    return false;
                }
                self.modes_resolvability(doc)
                    .values()
                    .all(|resolvable| *resolvable)
            }
        }
    }

    /// Classifies the whole stored value at the top tier.
    pub fn stateful_value(&self, doc: &TokenDocument) -> TopTier {
        match &self.value {
            TokenValue::Alias(descriptor) => {
                if doc.token(&descriptor.target).is_some() {
                    TopTier::ResolvableAlias(crate::resolve::ResolvedAlias {
                        target: descriptor.target.clone(),
                        mode: None,
                    })
                } else {
                    TopTier::UnresolvableAlias(crate::resolve::BrokenAlias {
                        target: descriptor.target.clone(),
                        mode: None,
                        reason: missing_token_reason(&descriptor.target),
                    })
                }
            }
            TokenValue::Modes(map) => {
                let stateful: StatefulValue = map
                    .iter()
                    .map(|(mode, value)| (mode.clone(), classify_mode_value(doc, mode, value)))
                    .collect();
                TopTier::Value(stateful)
            }
        }
    }

    /// Single-mode convenience view: the mode-tier result for `mode`, or the
    /// unknown-mode marker when the token does not define it.
    pub fn ui_value_on_mode(&self, doc: &TokenDocument, mode: &str) -> UiModeValue {
        match &self.value {
            TokenValue::Modes(map) => match map.get(mode) {
                Some(value) => UiModeValue::Mode(classify_mode_value(doc, mode, value)),
                None => UiModeValue::UnknownMode(mode.to_string()),
            },
            TokenValue::Alias(descriptor) => {
                if !self.modes(doc).iter().any(|m| m == mode) {
                    return UiModeValue::UnknownMode(mode.to_string());
                }
                let per_mode = AliasDescriptor {
                    target: descriptor.target.clone(),
                    mode: Some(mode.to_string()),
                };
                match classify_alias(doc, mode, &per_mode) {
                    Ok(alias) => UiModeValue::Mode(ModeTier::ResolvableAlias(alias)),
                    Err(broken) => UiModeValue::Mode(ModeTier::UnresolvableAlias(broken)),
                }
            }
        }
    }

    /// Follows `mode` through mode-level aliases across tokens to its final
    /// hop. Fails on top-level alias tokens and on undefined modes.
    pub fn resolve_deep_stateful_value_for_mode(
        &self,
        doc: &TokenDocument,
        mode: &str,
    ) -> Result<DeepModeResolution, crate::Error> {
        deep::resolve_deep_stateful_for_mode(doc, self, mode)
    }

    /// The document-serializable form of this token's value.
    ///
    /// With `resolve_aliases: false` the stored literal/alias form is
    /// returned as-is. With `resolve_aliases: true` the value is deeply
    /// resolved; broken aliases stay in literal form unless
    /// `allow_unresolvable: false`, which escalates them to an error naming
    /// the unresolved targets. `target_mode` narrows the output to a
    /// single-mode map; on a raw read of a top-level alias token the stored
    /// alias literal is returned whole, since narrowing it to one mode would
    /// require resolution.
    pub fn json_value(
        &self,
        doc: &TokenDocument,
        options: &JsonValueOptions,
    ) -> Result<Json, crate::Error> {
        if let Some(mode) = &options.target_mode
            && !self.modes(doc).iter().any(|m| m == mode)
        {
            return Err(TokenError::ModeNotFound {
                token: self.path.clone(),
                mode: mode.clone(),
            }
            .into());
        }

        if !options.resolve_aliases {
            return Ok(match (&self.value, &options.target_mode) {
                (TokenValue::Modes(map), Some(mode)) => {
                    let mut out = serde_json::Map::new();
                    out.insert(mode.clone(), map[mode].clone());
                    Json::Object(out)
                }
                _ => self.value.to_json(),
            });
        }

        let mut unresolved_targets: Vec<String> = Vec::new();
        let resolved = match &self.value {
            TokenValue::Alias(descriptor) => match effective_mode_owner(doc, &self.path) {
                Some(owner) => {
                    let owner_path = owner.path.clone();
                    let map = owner.value.as_modes().expect("mode owner has a mode map");
                    self.resolve_mode_map(doc, &owner_path, map, options, &mut unresolved_targets)
                }
                None => {
                    unresolved_targets.push(descriptor.target.as_str().to_string());
                    self.value.to_json()
                }
            },
            TokenValue::Modes(map) => {
                self.resolve_mode_map(doc, &self.path, map, options, &mut unresolved_targets)
            }
        };

        if !options.allow_unresolvable && !unresolved_targets.is_empty() {
            unresolved_targets.sort();
            unresolved_targets.dedup();
            return Err(ResolveError::UnresolvedReferences {
                references: unresolved_targets,
            }
            .into());
        }
        Ok(resolved)
    }

    fn resolve_mode_map(
        &self,
        doc: &TokenDocument,
        owner: &TokenPath,
        map: &IndexMap<String, Json>,
        options: &JsonValueOptions,
        unresolved_targets: &mut Vec<String>,
    ) -> Json {
        let mut out = serde_json::Map::new();
        for (mode, value) in map {
            if let Some(target_mode) = &options.target_mode
                && mode != target_mode
            {
                continue;
            }
            let deep = resolve_deep_value(doc, owner, mode, value);
            for site in &deep.unresolved {
                unresolved_targets.push(site.target.as_str().to_string());
            }
            out.insert(mode.clone(), deep.value);
        }
        Json::Object(out)
    }

    /// The serializable metadata of this token (everything but the value).
    pub fn json_properties(&self) -> Json {
        let mut map = serde_json::Map::new();
        map.insert("$type".into(), Json::String(self.ty.clone()));
        if let Some(description) = &self.description {
            map.insert("$description".into(), Json::String(description.clone()));
        }
        if let Some(extensions) = &self.extensions {
            map.insert("$extensions".into(), extensions.clone());
        }
        Json::Object(map)
    }

    /// The full serializable form: metadata plus the raw stored value.
    pub fn json_token(&self) -> Json {
        let mut map = match self.json_properties() {
            Json::Object(map) => map,
            _ => unreachable!(),
        };
        map.insert("$value".into(), self.value.to_json());
        Json::Object(map)
    }

    /// Alias for [`Token::json_token`].
    pub fn to_json(&self) -> Json {
        self.json_token()
    }

    /// The innermost enclosing collection's path and fixed mode set, if any.
    pub fn collection<'a>(&self, doc: &'a TokenDocument) -> Option<(&'a TokenPath, &'a [String])> {
        doc.collection_of(&self.path)
    }

    // Internal mutable access for the owning document.
    pub(crate) fn set_path(&mut self, path: TokenPath) {
        self.path = path;
    }

    pub(crate) fn set_value(&mut self, value: TokenValue) {
        self.value = value;
    }

    pub(crate) fn value_mut(&mut self) -> &mut TokenValue {
        &mut self.value
    }
}
