//! Deep (multi-hop, cross-token, cross-tier) alias resolution.
//!
//! Deep resolution follows alias chains until a literal or a broken link is
//! reached: a mode-level alias may lead to a token whose own mode value is a
//! value-level alias chain, and so on across token boundaries. Every walk
//! carries a visited set keyed by `(token path, mode)`; revisiting a pair
//! already in the current walk is reported as a distinct cyclic-alias
//! condition rather than recursing indefinitely.
//!
//! Unresolvable branches never raise errors here: they are collected as
//! [`UnresolvedSite`] data and the original alias literal is kept in place,
//! since what does not exist cannot be resolved.

use std::collections::HashSet;

use serde_json::Value as Json;
use tracing::{debug, trace};

use super::{BrokenAlias, ModeTier, ResolveError, ResolvedAlias};
use crate::{
    doc::{
        TokenDocument,
        path::{TokenPath, ValuePath},
    },
    token::{
        Token,
        errors::TokenError,
        value::{AliasDescriptor, TokenValue},
    },
};

/// Visited set for a single resolution walk.
type Visited = HashSet<(TokenPath, String)>;

/// One alias site that failed to resolve during a deep walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedSite {
    /// Where in the owning mode's value the broken alias sits.
    pub at: ValuePath,
    /// The alias target path as written.
    pub target: TokenPath,
    /// The alias target mode as written (`None` = same-named mode).
    pub mode: Option<String>,
    /// Human-readable reason the alias does not resolve.
    pub reason: String,
}

/// Result of deeply resolving one mode's value.
///
/// `value` is the mode value resolved as far as possible, with unresolvable
/// branches left as their original alias literals; `unresolved` lists those
/// branches. An empty `unresolved` means the mode is fully resolvable.
#[derive(Debug, Clone, PartialEq)]
pub struct DeepValue {
    pub value: Json,
    pub unresolved: Vec<UnresolvedSite>,
}

impl DeepValue {
    /// Returns `true` when every alias in the walk resolved.
    pub fn is_fully_resolved(&self) -> bool {
        self.unresolved.is_empty()
    }
}

/// Result of following one mode through mode-level aliases to its final hop.
#[derive(Debug, Clone, PartialEq)]
pub struct DeepModeResolution {
    /// The token at the final hop.
    pub token: TokenPath,
    /// The mode name at the final hop.
    pub mode: String,
    /// The non-alias mode value reached, or the unresolvable marker.
    pub result: ModeTier,
}

pub(crate) fn missing_token_reason(path: &TokenPath) -> String {
    format!("Token \"{path}\" does not exist")
}

pub(crate) fn missing_mode_reason(path: &TokenPath, mode: &str) -> String {
    format!("Token at path \"{path}\" with mode \"{mode}\" does not exist")
}

pub(crate) fn cyclic_reason(path: &TokenPath) -> String {
    format!("Cyclic alias involving \"{path}\"")
}

/// Follows top-level alias chains from `path` to the token that actually
/// owns a per-mode map.
///
/// Returns `None` when any token along the chain is missing, or when the
/// chain revisits a path (a top-level alias cycle yields "no modes").
pub(crate) fn effective_mode_owner<'a>(
    doc: &'a TokenDocument,
    path: &TokenPath,
) -> Option<&'a Token> {
    let mut seen: HashSet<TokenPath> = HashSet::new();
    let mut current = path.clone();
    loop {
        if !seen.insert(current.clone()) {
            debug!(path = %current, "Top-level alias cycle");
            return None;
        }
        let token = doc.token(&current)?;
        match token.value() {
            TokenValue::Alias(descriptor) => current = descriptor.target.clone(),
            TokenValue::Modes(_) => return Some(token),
        }
    }
}

/// Classifies one alias literal found at the mode or value tier.
///
/// Resolvable means: the target token exists (following its top-level alias
/// chain) and defines the effective target mode. The effective mode of a
/// `$mode`-less alias is the same-named mode on the target.
pub(crate) fn classify_alias(
    doc: &TokenDocument,
    owner_mode: &str,
    descriptor: &AliasDescriptor,
) -> Result<ResolvedAlias, BrokenAlias> {
    let effective = descriptor
        .mode
        .clone()
        .unwrap_or_else(|| owner_mode.to_string());
    let Some(owner) = effective_mode_owner(doc, &descriptor.target) else {
        let reason = if doc.token(&descriptor.target).is_none() {
            missing_token_reason(&descriptor.target)
        } else {
            missing_mode_reason(&descriptor.target, &effective)
        };
        return Err(BrokenAlias {
            target: descriptor.target.clone(),
            mode: descriptor.mode.clone(),
            reason,
        });
    };
    let has_mode = owner
        .value()
        .as_modes()
        .is_some_and(|modes| modes.contains_key(&effective));
    if has_mode {
        Ok(ResolvedAlias {
            target: descriptor.target.clone(),
            mode: Some(effective),
        })
    } else {
        Err(BrokenAlias {
            target: descriptor.target.clone(),
            mode: descriptor.mode.clone(),
            reason: missing_mode_reason(&descriptor.target, &effective),
        })
    }
}

/// Classifies one mode's stored value at the mode tier.
pub(crate) fn classify_mode_value(doc: &TokenDocument, owner_mode: &str, value: &Json) -> ModeTier {
    match AliasDescriptor::from_json(value) {
        Some(descriptor) => match classify_alias(doc, owner_mode, &descriptor) {
            Ok(alias) => ModeTier::ResolvableAlias(alias),
            Err(broken) => ModeTier::UnresolvableAlias(broken),
        },
        None => ModeTier::Raw(value.clone()),
    }
}

/// Deeply resolves one mode's value, following alias chains across tokens
/// and tiers. The walk starts at `(owner, mode)` so self-referential chains
/// terminate as cycles.
pub fn resolve_deep_value(
    doc: &TokenDocument,
    owner: &TokenPath,
    mode: &str,
    value: &Json,
) -> DeepValue {
    let mut visited: Visited = HashSet::new();
    visited.insert((owner.clone(), mode.to_string()));
    let mut unresolved = Vec::new();
    let resolved = resolve_value(
        doc,
        mode,
        value,
        &ValuePath::root(),
        &mut visited,
        &mut unresolved,
    );
    DeepValue {
        value: resolved,
        unresolved,
    }
}

fn resolve_value(
    doc: &TokenDocument,
    owner_mode: &str,
    value: &Json,
    at: &ValuePath,
    visited: &mut Visited,
    unresolved: &mut Vec<UnresolvedSite>,
) -> Json {
    if let Some(descriptor) = AliasDescriptor::from_json(value) {
        let effective = descriptor
            .mode
            .clone()
            .unwrap_or_else(|| owner_mode.to_string());
        let key = (descriptor.target.clone(), effective.clone());
        if visited.contains(&key) {
            debug!(target_path = %descriptor.target, mode = %effective, "Cyclic alias detected");
            unresolved.push(UnresolvedSite {
                at: at.clone(),
                target: descriptor.target.clone(),
                mode: descriptor.mode.clone(),
                reason: cyclic_reason(&descriptor.target),
            });
            return value.clone();
        }

        let Some(target_owner) = effective_mode_owner(doc, &descriptor.target) else {
            let reason = if doc.token(&descriptor.target).is_none() {
                missing_token_reason(&descriptor.target)
            } else {
                missing_mode_reason(&descriptor.target, &effective)
            };
            unresolved.push(UnresolvedSite {
                at: at.clone(),
                target: descriptor.target.clone(),
                mode: descriptor.mode.clone(),
                reason,
            });
            return value.clone();
        };
        let Some(target_value) = target_owner
            .value()
            .as_modes()
            .and_then(|modes| modes.get(&effective))
        else {
            unresolved.push(UnresolvedSite {
                at: at.clone(),
                target: descriptor.target.clone(),
                mode: descriptor.mode.clone(),
                reason: missing_mode_reason(&descriptor.target, &effective),
            });
            return value.clone();
        };

        trace!(target_path = %descriptor.target, mode = %effective, "Following alias");
        visited.insert(key.clone());
        let resolved = resolve_value(doc, &effective, target_value, at, visited, unresolved);
        visited.remove(&key);
        return resolved;
    }

    match value {
        Json::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (key, nested) in map {
                let resolved = resolve_value(
                    doc,
                    owner_mode,
                    nested,
                    &at.push_field(key.clone()),
                    visited,
                    unresolved,
                );
                out.insert(key.clone(), resolved);
            }
            Json::Object(out)
        }
        Json::Array(items) => Json::Array(
            items
                .iter()
                .enumerate()
                .map(|(index, item)| {
                    resolve_value(doc, owner_mode, item, &at.push_index(index), visited, unresolved)
                })
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Deeply resolves a mode-tier result, returning `Raw` with the resolved
/// value, or the unresolvable marker when the chain breaks at its root.
pub fn resolve_deep_mode_tier(
    doc: &TokenDocument,
    owner: &TokenPath,
    mode: &str,
    tier: &ModeTier,
) -> ModeTier {
    if let ModeTier::UnresolvableAlias(_) = tier {
        return tier.clone();
    }
    let literal: Json = tier.clone().into();
    let deep = resolve_deep_value(doc, owner, mode, &literal);
    if let Some(site) = deep.unresolved.iter().find(|site| site.at.is_root()) {
        return ModeTier::UnresolvableAlias(BrokenAlias {
            target: site.target.clone(),
            mode: site.mode.clone(),
            reason: site.reason.clone(),
        });
    }
    ModeTier::Raw(deep.value)
}

/// Follows one mode through whole-mode aliases across tokens until a
/// non-alias mode value or a broken link, returning the value (or
/// unresolvable marker) together with the token and mode at the final hop.
///
/// Starting from a top-level-alias token is a structural error: whole-token
/// alias resolution starts one tier down and cannot itself be the object of
/// deep-mode resolution.
pub fn resolve_deep_stateful_for_mode(
    doc: &TokenDocument,
    token: &Token,
    mode: &str,
) -> Result<DeepModeResolution, crate::Error> {
    if token.value().is_alias() {
        return Err(ResolveError::TopLevelAliasResolution {
            token: token.path().clone(),
            mode: mode.to_string(),
        }
        .into());
    }
    let modes = token
        .value()
        .as_modes()
        .expect("non-alias token has a mode map");
    let Some(start) = modes.get(mode) else {
        return Err(TokenError::ModeNotFound {
            token: token.path().clone(),
            mode: mode.to_string(),
        }
        .into());
    };

    let mut visited: Visited = HashSet::new();
    visited.insert((token.path().clone(), mode.to_string()));
    let mut current_path = token.path().clone();
    let mut current_mode = mode.to_string();
    let mut current_value = start;

    loop {
        let Some(descriptor) = AliasDescriptor::from_json(current_value) else {
            return Ok(DeepModeResolution {
                token: current_path,
                mode: current_mode,
                result: ModeTier::Raw(current_value.clone()),
            });
        };
        let effective = descriptor
            .mode
            .clone()
            .unwrap_or_else(|| current_mode.clone());
        let key = (descriptor.target.clone(), effective.clone());
        if visited.contains(&key) {
            debug!(target_path = %descriptor.target, mode = %effective, "Cyclic alias detected");
            return Ok(DeepModeResolution {
                token: current_path,
                mode: current_mode,
                result: ModeTier::UnresolvableAlias(BrokenAlias {
                    target: descriptor.target.clone(),
                    mode: descriptor.mode.clone(),
                    reason: cyclic_reason(&descriptor.target),
                }),
            });
        }

        let Some(target_owner) = effective_mode_owner(doc, &descriptor.target) else {
            let reason = if doc.token(&descriptor.target).is_none() {
                missing_token_reason(&descriptor.target)
            } else {
                missing_mode_reason(&descriptor.target, &effective)
            };
            return Ok(DeepModeResolution {
                token: current_path,
                mode: current_mode,
                result: ModeTier::UnresolvableAlias(BrokenAlias {
                    target: descriptor.target.clone(),
                    mode: descriptor.mode.clone(),
                    reason,
                }),
            });
        };
        let Some(next_value) = target_owner
            .value()
            .as_modes()
            .and_then(|modes| modes.get(&effective))
        else {
            return Ok(DeepModeResolution {
                token: current_path,
                mode: current_mode,
                result: ModeTier::UnresolvableAlias(BrokenAlias {
                    target: descriptor.target.clone(),
                    mode: descriptor.mode.clone(),
                    reason: missing_mode_reason(&descriptor.target, &effective),
                }),
            });
        };

        trace!(target_path = %target_owner.path(), mode = %effective, "Following mode-level alias");
        visited.insert(key);
        current_path = target_owner.path().clone();
        current_mode = effective;
        current_value = next_value;
    }
}
