//! The token document: tree state and the mutation surface.
//!
//! A [`TokenDocument`] owns the full set of [`Token`]s and the
//! group/collection hierarchy of one design-token document. Tokens are held
//! in an id-keyed arena with a path-indexed lookup table, so a token's
//! identity survives renames and moves while its path changes.
//!
//! All mutation operations live here, because keeping alias bookkeeping
//! consistent requires whole-tree access: renaming or moving a node
//! synchronously rewrites every alias literal elsewhere in the document that
//! targets the old path (or a path beneath it), and value updates are
//! validated against the document's [`TypeRegistry`] before anything is
//! committed. Every operation either fully succeeds or fully fails — all
//! precondition checks run before the first write.
//!
//! Multiple independent documents can coexist in one process; there is no
//! global state.

pub mod errors;
pub mod path;

pub use errors::DocError;

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use indexmap::IndexMap;
use serde_json::Value as Json;
use tracing::debug;

use crate::{
    graph::{self, AliasReference},
    resolve::deep::{classify_alias, effective_mode_owner, resolve_deep_value},
    schema::{BasicRegistry, TypeRegistry},
    token::{
        Token, TokenId,
        errors::TokenError,
        value::{
            AliasDescriptor, TokenValue, is_alias, retarget_aliases, retarget_mode_aliases,
            validate_mode_name,
        },
    },
};
use path::{TokenPath, validate_segment};

/// A group node: a named subtree of the document. A group with a fixed mode
/// set is a *collection*: every token beneath it must use exactly those
/// modes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    path: TokenPath,
    modes: Option<Vec<String>>,
}

impl Group {
    pub fn path(&self) -> &TokenPath {
        &self.path
    }

    /// The fixed mode set, present only for collections.
    pub fn modes(&self) -> Option<&[String]> {
        self.modes.as_deref()
    }

    pub fn is_collection(&self) -> bool {
        self.modes.is_some()
    }
}

/// Options for [`TokenDocument::update_mode_value`].
#[derive(Debug, Clone)]
pub struct UpdateModeOptions {
    /// Create the mode when it does not exist (default: fail).
    pub allow_mode_creation: bool,
    /// Write through resolvable aliased fields: merge into the target's
    /// current resolved value and sever the alias (default). When `false`,
    /// aliased fields are left untouched and the rest of the merge proceeds.
    pub override_aliases: bool,
}

impl Default for UpdateModeOptions {
    fn default() -> Self {
        Self {
            allow_mode_creation: false,
            override_aliases: true,
        }
    }
}

/// One design-token document: all token states plus the group hierarchy.
pub struct TokenDocument {
    tokens: HashMap<TokenId, Token>,
    index: BTreeMap<TokenPath, TokenId>,
    groups: BTreeMap<TokenPath, Group>,
    registry: Box<dyn TypeRegistry>,
}

impl fmt::Debug for TokenDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenDocument")
            .field("tokens", &self.index.len())
            .field("groups", &self.groups.len())
            .finish()
    }
}

impl Default for TokenDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenDocument {
    /// Creates an empty document with the built-in type registry.
    pub fn new() -> Self {
        Self::with_registry(Box::new(BasicRegistry::new()))
    }

    /// Creates an empty document with a caller-supplied type registry.
    pub fn with_registry(registry: Box<dyn TypeRegistry>) -> Self {
        let mut groups = BTreeMap::new();
        groups.insert(
            TokenPath::root(),
            Group {
                path: TokenPath::root(),
                modes: None,
            },
        );
        Self {
            tokens: HashMap::new(),
            index: BTreeMap::new(),
            groups,
            registry,
        }
    }

    /// Parses a document from its JSON tree form.
    ///
    /// Groups are plain objects; a group carrying
    /// `"$collection": {"$modes": [...]}` is a collection; a token is an
    /// object with `$type` and `$value` (plus optional `$description` and
    /// `$extensions`).
    pub fn from_json(document: &Json) -> Result<Self, crate::Error> {
        Self::from_json_with_registry(document, Box::new(BasicRegistry::new()))
    }

    /// Like [`TokenDocument::from_json`] with a caller-supplied registry.
    pub fn from_json_with_registry(
        document: &Json,
        registry: Box<dyn TypeRegistry>,
    ) -> Result<Self, crate::Error> {
        let mut doc = Self::with_registry(registry);
        let root = document
            .as_object()
            .ok_or_else(|| DocError::ImportFailed {
                path: TokenPath::root(),
                reason: "document root must be an object".to_string(),
            })?;
        doc.import_group(&TokenPath::root(), root)?;
        Ok(doc)
    }

    fn import_group(
        &mut self,
        path: &TokenPath,
        node: &serde_json::Map<String, Json>,
    ) -> Result<(), crate::Error> {
        for (name, child) in node {
            if name == "$collection" {
                let modes = child
                    .get("$modes")
                    .and_then(Json::as_array)
                    .ok_or_else(|| DocError::ImportFailed {
                        path: path.clone(),
                        reason: "\"$collection\" must carry a \"$modes\" array".to_string(),
                    })?;
                let mut mode_names = Vec::with_capacity(modes.len());
                for mode in modes {
                    let mode = mode.as_str().ok_or_else(|| DocError::ImportFailed {
                        path: path.clone(),
                        reason: "\"$modes\" entries must be strings".to_string(),
                    })?;
                    validate_mode_name(mode)?;
                    mode_names.push(mode.to_string());
                }
                self.groups
                    .get_mut(path)
                    .expect("group registered before its children")
                    .modes = Some(mode_names);
                continue;
            }
            if name.starts_with('$') {
                return Err(DocError::ImportFailed {
                    path: path.clone(),
                    reason: format!("unexpected key \"{name}\""),
                }
                .into());
            }

            let child_path = path.child(name);
            let child_node = child.as_object().ok_or_else(|| DocError::ImportFailed {
                path: child_path.clone(),
                reason: "nodes must be objects".to_string(),
            })?;

            if child_node.contains_key("$type") {
                self.import_token(&child_path, child_node)?;
            } else {
                self.groups.insert(
                    child_path.clone(),
                    Group {
                        path: child_path.clone(),
                        modes: None,
                    },
                );
                self.import_group(&child_path, child_node)?;
            }
        }
        Ok(())
    }

    fn import_token(
        &mut self,
        path: &TokenPath,
        node: &serde_json::Map<String, Json>,
    ) -> Result<(), crate::Error> {
        for key in node.keys() {
            if !matches!(key.as_str(), "$type" | "$value" | "$description" | "$extensions") {
                return Err(DocError::ImportFailed {
                    path: path.clone(),
                    reason: format!("unexpected key \"{key}\" on token"),
                }
                .into());
            }
        }
        let ty = node
            .get("$type")
            .and_then(Json::as_str)
            .ok_or_else(|| DocError::ImportFailed {
                path: path.clone(),
                reason: "\"$type\" must be a string".to_string(),
            })?;
        let value = node.get("$value").ok_or_else(|| DocError::ImportFailed {
            path: path.clone(),
            reason: "token is missing \"$value\"".to_string(),
        })?;
        let description = node
            .get("$description")
            .and_then(Json::as_str)
            .map(String::from);
        let extensions = node.get("$extensions").cloned();
        self.insert_token(path.clone(), ty, value, description, extensions)?;
        Ok(())
    }

    // --- Lookup -----------------------------------------------------------

    /// The token at `path`, if any.
    pub fn token(&self, path: &TokenPath) -> Option<&Token> {
        self.index.get(path).map(|id| &self.tokens[id])
    }

    /// The token with the given stable id, if it still exists.
    pub fn token_by_id(&self, id: TokenId) -> Option<&Token> {
        self.tokens.get(&id)
    }

    /// The group at `path`, if any. The root is always a group.
    pub fn group(&self, path: &TokenPath) -> Option<&Group> {
        self.groups.get(path)
    }

    /// Whether any node (token or group) exists at `path`.
    pub fn contains(&self, path: &TokenPath) -> bool {
        self.index.contains_key(path) || self.groups.contains_key(path)
    }

    /// All tokens, in sorted-path order.
    pub fn tokens(&self) -> impl Iterator<Item = &Token> {
        self.index.values().map(|id| &self.tokens[id])
    }

    /// Number of tokens in the document.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// The innermost collection enclosing `path`, with its fixed mode set.
    pub fn collection_of(&self, path: &TokenPath) -> Option<(&TokenPath, &[String])> {
        let mut current = path.parent();
        while let Some(ancestor) = current {
            if let Some(group) = self.groups.get(&ancestor)
                && let Some(modes) = group.modes()
            {
                return Some((group.path(), modes));
            }
            current = ancestor.parent();
        }
        None
    }

    /// The document's type registry.
    pub fn registry(&self) -> &dyn TypeRegistry {
        self.registry.as_ref()
    }

    // --- Reference-graph queries -----------------------------------------

    /// Every outgoing alias edge of the token at `path`.
    pub fn alias_references_from(&self, path: &TokenPath) -> Vec<AliasReference> {
        graph::edges_from(self, path)
    }

    /// Every alias edge in the document targeting `path`.
    pub fn alias_references_to(&self, path: &TokenPath) -> Vec<AliasReference> {
        graph::edges_to(self, path)
    }

    /// Every alias edge in the document.
    pub fn all_alias_references(&self) -> Vec<AliasReference> {
        graph::all_edges(self)
    }

    // --- Node insertion/removal ------------------------------------------

    /// Creates a group (optionally a collection) under an existing parent.
    pub fn insert_group(
        &mut self,
        path: TokenPath,
        modes: Option<Vec<String>>,
    ) -> Result<&Group, crate::Error> {
        let name = path.name().ok_or_else(|| DocError::GroupNotFound {
            path: path.clone(),
        })?;
        validate_segment(name)?;
        let parent = path.parent().expect("non-root path has a parent");
        if !self.groups.contains_key(&parent) {
            return Err(DocError::GroupNotFound { path: parent }.into());
        }
        if self.contains(&path) {
            return Err(TokenError::NameCollision { path }.into());
        }
        if let Some(modes) = &modes {
            for mode in modes {
                validate_mode_name(mode)?;
            }
        }
        let group = Group {
            path: path.clone(),
            modes,
        };
        self.groups.insert(path.clone(), group);
        Ok(&self.groups[&path])
    }

    /// Creates a token node. This is the one entry point through which a
    /// top-level alias state can come into existence (besides import).
    pub fn insert_token(
        &mut self,
        path: TokenPath,
        ty: impl Into<String>,
        value: &Json,
        description: Option<String>,
        extensions: Option<Json>,
    ) -> Result<&Token, crate::Error> {
        let name = path.name().ok_or_else(|| DocError::TokenNotFound {
            path: path.clone(),
        })?;
        validate_segment(name)?;
        let parent = path.parent().expect("non-root path has a parent");
        if !self.groups.contains_key(&parent) {
            return Err(DocError::GroupNotFound { path: parent }.into());
        }
        if self.contains(&path) {
            return Err(TokenError::NameCollision { path }.into());
        }

        let ty = ty.into();
        let value = TokenValue::from_json(value)?;
        if let Some(modes) = value.as_modes() {
            for mode_value in modes.values() {
                self.registry.validate_and_merge(&ty, None, mode_value)?;
            }
            if let Some((collection, fixed)) = self.collection_of(&path) {
                let mut expected: Vec<String> = fixed.to_vec();
                expected.sort();
                let mut found: Vec<String> = modes.keys().cloned().collect();
                found.sort();
                if found != expected {
                    return Err(TokenError::CollectionModeMismatch {
                        token: path.clone(),
                        collection: collection.clone(),
                        expected: expected.join(", "),
                        found: found.join(", "),
                    }
                    .into());
                }
            }
        }

        let token = Token::new(path.clone(), ty, value, description, extensions);
        let id = token.id();
        self.tokens.insert(id, token);
        self.index.insert(path.clone(), id);
        Ok(&self.tokens[&id])
    }

    /// Removes the token at `path`, returning its final state.
    ///
    /// Edges elsewhere that target the removed token become unresolvable on
    /// their next read; resolution state is derived, so nothing else needs
    /// touching.
    pub fn remove_token(&mut self, path: &TokenPath) -> Result<Token, crate::Error> {
        let id = self
            .index
            .remove(path)
            .ok_or_else(|| DocError::TokenNotFound { path: path.clone() })?;
        Ok(self.tokens.remove(&id).expect("index and arena in sync"))
    }

    // --- Mutation operations ---------------------------------------------

    /// Renames the token at `path` to `new_name`.
    ///
    /// Returns `false` (a no-op) when `new_name` equals the current name.
    /// Every alias literal elsewhere in the document that targets the old
    /// path is rewritten before this returns.
    pub fn rename(&mut self, path: &TokenPath, new_name: &str) -> Result<bool, crate::Error> {
        let token = self
            .token(path)
            .ok_or_else(|| DocError::TokenNotFound { path: path.clone() })?;
        if token.name() == new_name {
            return Ok(false);
        }
        validate_segment(new_name)?;
        let id = token.id();
        let new_path = path.parent().expect("token paths are non-root").child(new_name);
        if self.contains(&new_path) {
            return Err(TokenError::NameCollision { path: new_path }.into());
        }

        self.index.remove(path);
        self.index.insert(new_path.clone(), id);
        self.tokens
            .get_mut(&id)
            .expect("index and arena in sync")
            .set_path(new_path.clone());
        let rewritten = self.retarget_all(path, &new_path, Some(id));
        debug!(from = %path, to = %new_path, rewritten, "Renamed token");
        Ok(true)
    }

    /// Renames the group at `path` to `new_name`, carrying every descendant
    /// group and token along and rewriting alias literals that target any
    /// path inside the group.
    pub fn rename_group(&mut self, path: &TokenPath, new_name: &str) -> Result<bool, crate::Error> {
        if path.is_root() {
            return Err(DocError::GroupNotFound { path: path.clone() }.into());
        }
        let group = self
            .groups
            .get(path)
            .ok_or_else(|| DocError::GroupNotFound { path: path.clone() })?;
        if group.path.name() == Some(new_name) {
            return Ok(false);
        }
        validate_segment(new_name)?;
        let new_path = path.parent().expect("non-root path").child(new_name);
        if self.contains(&new_path) {
            return Err(TokenError::NameCollision { path: new_path }.into());
        }

        // Re-key every group and token under the old prefix.
        let moved_groups: Vec<TokenPath> = self
            .groups
            .range(path.clone()..)
            .take_while(|(p, _)| p.starts_with(path))
            .map(|(p, _)| p.clone())
            .collect();
        for old in moved_groups {
            let mut group = self.groups.remove(&old).expect("key just listed");
            let renamed = old
                .replace_prefix(path, &new_path)
                .expect("listed keys are under the prefix");
            group.path = renamed.clone();
            self.groups.insert(renamed, group);
        }
        let moved_tokens: Vec<(TokenPath, TokenId)> = self
            .index
            .range(path.clone()..)
            .take_while(|(p, _)| p.starts_with(path))
            .map(|(p, id)| (p.clone(), *id))
            .collect();
        for (old, id) in moved_tokens {
            self.index.remove(&old);
            let renamed = old
                .replace_prefix(path, &new_path)
                .expect("listed keys are under the prefix");
            self.tokens
                .get_mut(&id)
                .expect("index and arena in sync")
                .set_path(renamed.clone());
            self.index.insert(renamed, id);
        }

        let rewritten = self.retarget_all(path, &new_path, None);
        debug!(from = %path, to = %new_path, rewritten, "Renamed group");
        Ok(true)
    }

    /// Renames mode `from` to `to` on the token at `path`, preserving the
    /// mode map's order and retargeting every alias literal elsewhere that
    /// points at `(path, from)`.
    ///
    /// On a *resolvable* top-level alias the rename forwards to the ultimate
    /// target token, which owns the modes.
    pub fn rename_mode(
        &mut self,
        path: &TokenPath,
        from: &str,
        to: &str,
    ) -> Result<(), crate::Error> {
        let token = self
            .token(path)
            .ok_or_else(|| DocError::TokenNotFound { path: path.clone() })?;

        if token.is_top_level_alias() {
            let Some(owner) = effective_mode_owner(self, path) else {
                return Err(TokenError::UnresolvableTopLevelAlias {
                    token: path.clone(),
                    operation: "rename mode",
                }
                .into());
            };
            let owner_path = owner.path().clone();
            debug!(alias = %path, target = %owner_path, "Forwarding mode rename to alias target");
            return self.rename_mode(&owner_path, from, to);
        }

        validate_mode_name(to)?;
        let modes = token.value().as_modes().expect("non-alias token");
        if !modes.contains_key(from) {
            return Err(TokenError::ModeNotFound {
                token: path.clone(),
                mode: from.to_string(),
            }
            .into());
        }
        if modes.contains_key(to) {
            return Err(TokenError::ModeExists {
                token: path.clone(),
                mode: to.to_string(),
            }
            .into());
        }
        if let Some((collection, fixed)) = self.collection_of(path)
            && !fixed.iter().any(|m| m == to)
        {
            return Err(TokenError::ModeNotInCollection {
                token: path.clone(),
                collection: collection.clone(),
                mode: to.to_string(),
            }
            .into());
        }

        let id = token.id();
        let token = self.tokens.get_mut(&id).expect("index and arena in sync");
        let modes = token.value_mut().as_modes_mut().expect("non-alias token");
        let renamed: IndexMap<String, Json> = modes
            .drain(..)
            .map(|(mode, value)| {
                if mode == from {
                    (to.to_string(), value)
                } else {
                    (mode, value)
                }
            })
            .collect();
        *modes = renamed;

        let mut rewritten = 0;
        let target = path.clone();
        for token in self.tokens.values_mut() {
            if let Some(map) = token.value_mut().as_modes_mut() {
                for value in map.values_mut() {
                    rewritten += retarget_mode_aliases(value, &target, from, to);
                }
            }
        }
        debug!(token = %path, from, to, rewritten, "Renamed mode");
        Ok(())
    }

    /// Moves the token at `path` under a different group or collection.
    ///
    /// The destination must exist, the resulting path must be free, and a
    /// destination collection's fixed mode set must match the token's
    /// current modes exactly.
    pub fn move_token(
        &mut self,
        path: &TokenPath,
        new_parent: &TokenPath,
    ) -> Result<(), crate::Error> {
        let token = self
            .token(path)
            .ok_or_else(|| DocError::TokenNotFound { path: path.clone() })?;
        if !self.groups.contains_key(new_parent) {
            return Err(DocError::DestinationNotFound {
                path: new_parent.clone(),
            }
            .into());
        }
        let new_path = new_parent.child(token.name());
        if new_path == *path {
            return Ok(());
        }
        if self.contains(&new_path) {
            return Err(TokenError::NameCollision { path: new_path }.into());
        }

        if let Some((collection, fixed)) = self.collection_of(&new_path) {
            if token.is_top_level_alias() && effective_mode_owner(self, path).is_none() {
                return Err(TokenError::UnresolvableTopLevelAlias {
                    token: path.clone(),
                    operation: "move",
                }
                .into());
            }
            let mut expected: Vec<String> = fixed.to_vec();
            expected.sort();
            let found = token.modes(self);
            if found != expected {
                return Err(TokenError::CollectionModeMismatch {
                    token: path.clone(),
                    collection: collection.clone(),
                    expected: expected.join(", "),
                    found: found.join(", "),
                }
                .into());
            }
        }

        let id = token.id();
        self.index.remove(path);
        self.index.insert(new_path.clone(), id);
        self.tokens
            .get_mut(&id)
            .expect("index and arena in sync")
            .set_path(new_path.clone());
        let rewritten = self.retarget_all(path, &new_path, Some(id));
        debug!(from = %path, to = %new_path, rewritten, "Moved token");
        Ok(())
    }

    /// Replaces the entire per-mode value map of the token at `path`.
    ///
    /// Fails on top-level alias tokens, and when the new value smuggles in a
    /// top-level alias shape: alias states enter only at construction time.
    /// Inside a collection the replacement's mode set must match the fixed
    /// mode set exactly.
    pub fn update_value(&mut self, path: &TokenPath, new_value: &Json) -> Result<(), crate::Error> {
        let token = self
            .token(path)
            .ok_or_else(|| DocError::TokenNotFound { path: path.clone() })?;
        if token.is_top_level_alias() {
            return Err(TokenError::TopLevelAlias {
                token: path.clone(),
                operation: "update value",
            }
            .into());
        }

        let parsed = TokenValue::from_json(new_value)?;
        if parsed.is_alias() {
            return Err(TokenError::InvalidValue {
                reason: format!(
                    "cannot turn token \"{path}\" into a top-level alias through update_value"
                ),
            }
            .into());
        }
        let ty = token.ty().to_string();
        let id = token.id();
        let modes = parsed.as_modes().expect("parsed as mode map");
        for mode_value in modes.values() {
            self.registry.validate_and_merge(&ty, None, mode_value)?;
        }
        if let Some((collection, fixed)) = self.collection_of(path) {
            let mut expected: Vec<String> = fixed.to_vec();
            expected.sort();
            let mut found: Vec<String> = modes.keys().cloned().collect();
            found.sort();
            if found != expected {
                return Err(TokenError::CollectionModeMismatch {
                    token: path.clone(),
                    collection: collection.clone(),
                    expected: expected.join(", "),
                    found: found.join(", "),
                }
                .into());
            }
        }

        self.tokens
            .get_mut(&id)
            .expect("index and arena in sync")
            .set_value(parsed);
        debug!(token = %path, "Replaced token value");
        Ok(())
    }

    /// Merges `partial` into one mode of the token at `path`.
    ///
    /// Composite types deep-merge, primitives replace. See
    /// [`UpdateModeOptions`] for mode creation and alias write-through.
    pub fn update_mode_value(
        &mut self,
        path: &TokenPath,
        mode: &str,
        partial: &Json,
        options: &UpdateModeOptions,
    ) -> Result<(), crate::Error> {
        let token = self
            .token(path)
            .ok_or_else(|| DocError::TokenNotFound { path: path.clone() })?;
        if token.is_top_level_alias() {
            return Err(TokenError::TopLevelAlias {
                token: path.clone(),
                operation: "update mode value",
            }
            .into());
        }
        let ty = token.ty().to_string();
        let id = token.id();
        let modes = token.value().as_modes().expect("non-alias token");

        let committed = match modes.get(mode) {
            None => {
                if !options.allow_mode_creation {
                    return Err(TokenError::ModeNotFound {
                        token: path.clone(),
                        mode: mode.to_string(),
                    }
                    .into());
                }
                validate_mode_name(mode)?;
                if let Some((collection, fixed)) = self.collection_of(path)
                    && !fixed.iter().any(|m| m == mode)
                {
                    return Err(TokenError::ModeNotInCollection {
                        token: path.clone(),
                        collection: collection.clone(),
                        mode: mode.to_string(),
                    }
                    .into());
                }
                self.registry.validate_and_merge(&ty, None, partial)?
            }
            Some(existing) => {
                let merged =
                    self.merge_respecting_aliases(path, mode, existing, partial, options);
                if is_alias(&merged) {
                    merged
                } else {
                    self.registry.validate_and_merge(&ty, None, &merged)?
                }
            }
        };

        let token = self.tokens.get_mut(&id).expect("index and arena in sync");
        let map = token.value_mut().as_modes_mut().expect("non-alias token");
        map.insert(mode.to_string(), committed);
        debug!(token = %path, mode, "Updated mode value");
        Ok(())
    }

    /// Merge honoring alias fields: writing a fresh alias literal is always
    /// allowed; merging *into* a resolvable alias writes through to the
    /// target's resolved value (severing the alias) unless
    /// `override_aliases` is off, in which case the aliased field is left
    /// untouched.
    fn merge_respecting_aliases(
        &self,
        owner: &TokenPath,
        mode: &str,
        existing: &Json,
        partial: &Json,
        options: &UpdateModeOptions,
    ) -> Json {
        if is_alias(partial) {
            return partial.clone();
        }
        if let Some(descriptor) = AliasDescriptor::from_json(existing) {
            if !options.override_aliases {
                return existing.clone();
            }
            if classify_alias(self, mode, &descriptor).is_err() {
                // Nothing to write through; the update replaces the broken
                // alias outright.
                return partial.clone();
            }
            let deep = resolve_deep_value(self, owner, mode, existing);
            if !deep.is_fully_resolved() {
                return existing.clone();
            }
            let mut base = deep.value;
            crate::token::value::deep_merge(&mut base, partial);
            return base;
        }
        match (existing, partial) {
            (Json::Object(base), Json::Object(update)) => {
                let mut out = base.clone();
                for (key, value) in update {
                    let merged = match base.get(key) {
                        Some(current) => {
                            self.merge_respecting_aliases(owner, mode, current, value, options)
                        }
                        None => value.clone(),
                    };
                    out.insert(key.clone(), merged);
                }
                Json::Object(out)
            }
            _ => partial.clone(),
        }
    }

    /// Adds a new mode entry to the token at `path`.
    pub fn create_mode_value(
        &mut self,
        path: &TokenPath,
        mode: &str,
        value: &Json,
    ) -> Result<(), crate::Error> {
        let token = self
            .token(path)
            .ok_or_else(|| DocError::TokenNotFound { path: path.clone() })?;
        if token.is_top_level_alias() {
            return Err(TokenError::TopLevelAlias {
                token: path.clone(),
                operation: "create mode",
            }
            .into());
        }
        validate_mode_name(mode)?;
        let modes = token.value().as_modes().expect("non-alias token");
        if modes.contains_key(mode) {
            return Err(TokenError::ModeExists {
                token: path.clone(),
                mode: mode.to_string(),
            }
            .into());
        }
        if let Some((collection, _)) = self.collection_of(path) {
            return Err(TokenError::CollectionFixedModes {
                token: path.clone(),
                collection: collection.clone(),
                operation: "create mode",
            }
            .into());
        }
        let ty = token.ty().to_string();
        let id = token.id();
        let validated = self.registry.validate_and_merge(&ty, None, value)?;

        let token = self.tokens.get_mut(&id).expect("index and arena in sync");
        let map = token.value_mut().as_modes_mut().expect("non-alias token");
        map.insert(mode.to_string(), validated);
        debug!(token = %path, mode, "Created mode");
        Ok(())
    }

    /// Removes a mode entry from the token at `path`. A token must always
    /// keep at least one mode.
    pub fn delete_mode_value(&mut self, path: &TokenPath, mode: &str) -> Result<(), crate::Error> {
        let token = self
            .token(path)
            .ok_or_else(|| DocError::TokenNotFound { path: path.clone() })?;
        if token.is_top_level_alias() {
            return Err(TokenError::TopLevelAlias {
                token: path.clone(),
                operation: "delete mode",
            }
            .into());
        }
        let modes = token.value().as_modes().expect("non-alias token");
        if !modes.contains_key(mode) {
            return Err(TokenError::ModeNotFound {
                token: path.clone(),
                mode: mode.to_string(),
            }
            .into());
        }
        if modes.len() == 1 {
            return Err(TokenError::LastMode {
                token: path.clone(),
                mode: mode.to_string(),
            }
            .into());
        }
        if let Some((collection, _)) = self.collection_of(path) {
            return Err(TokenError::CollectionFixedModes {
                token: path.clone(),
                collection: collection.clone(),
                operation: "delete mode",
            }
            .into());
        }
        let id = token.id();

        let token = self.tokens.get_mut(&id).expect("index and arena in sync");
        let map = token.value_mut().as_modes_mut().expect("non-alias token");
        map.shift_remove(mode);
        debug!(token = %path, mode, "Deleted mode");
        Ok(())
    }

    /// Rewrites the token's stored value to its deeply-resolved literal
    /// form, in place. Unresolvable branches keep their original alias
    /// literal: what does not exist cannot be resolved.
    pub fn resolve_value_aliases(&mut self, path: &TokenPath) -> Result<(), crate::Error> {
        let token = self
            .token(path)
            .ok_or_else(|| DocError::TokenNotFound { path: path.clone() })?;
        if token.is_top_level_alias() {
            return Err(TokenError::TopLevelAlias {
                token: path.clone(),
                operation: "resolve value aliases",
            }
            .into());
        }
        let id = token.id();
        let modes = token.value().as_modes().expect("non-alias token");

        let resolved: IndexMap<String, Json> = modes
            .iter()
            .map(|(mode, value)| {
                let deep = resolve_deep_value(self, path, mode, value);
                (mode.clone(), deep.value)
            })
            .collect();

        let token = self.tokens.get_mut(&id).expect("index and arena in sync");
        token.set_value(TokenValue::Modes(resolved));
        debug!(token = %path, "Resolved value aliases in place");
        Ok(())
    }

    // --- Propagation ------------------------------------------------------

    /// Rewrites every alias literal in the document that targets `old` (or a
    /// path beneath it) to target `new`, skipping the moved token itself.
    fn retarget_all(
        &mut self,
        old: &TokenPath,
        new: &TokenPath,
        skip: Option<TokenId>,
    ) -> usize {
        let mut rewritten = 0;
        for token in self.tokens.values_mut() {
            if skip == Some(token.id()) {
                continue;
            }
            match token.value_mut() {
                TokenValue::Alias(descriptor) => {
                    if let Some(retargeted) = descriptor.target.replace_prefix(old, new) {
                        descriptor.target = retargeted;
                        rewritten += 1;
                    }
                }
                TokenValue::Modes(map) => {
                    for value in map.values_mut() {
                        rewritten += retarget_aliases(value, old, new);
                    }
                }
            }
        }
        rewritten
    }

    // --- Export -----------------------------------------------------------

    /// Renders the document back to its JSON tree form.
    pub fn to_json(&self) -> Json {
        let mut root = serde_json::Map::new();
        for (path, group) in &self.groups {
            if path.is_root() {
                continue;
            }
            let node = ensure_node(&mut root, path);
            if let Some(modes) = &group.modes {
                node.insert(
                    "$collection".to_string(),
                    serde_json::json!({ "$modes": modes }),
                );
            }
        }
        for token in self.tokens() {
            let parent = token.path().parent().expect("token paths are non-root");
            let node = ensure_node(&mut root, &parent);
            node.insert(token.name().to_string(), token.json_token());
        }
        Json::Object(root)
    }
}

/// Walks (and creates) the nested objects leading to `path`, returning the
/// object at `path`.
fn ensure_node<'a>(
    root: &'a mut serde_json::Map<String, Json>,
    path: &TokenPath,
) -> &'a mut serde_json::Map<String, Json> {
    let mut current = root;
    for segment in path.segments() {
        current = current
            .entry(segment.to_string())
            .or_insert_with(|| Json::Object(serde_json::Map::new()))
            .as_object_mut()
            .expect("tree nodes are objects");
    }
    current
}
