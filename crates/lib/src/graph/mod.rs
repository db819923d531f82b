//! The document-wide alias reference graph.
//!
//! Every alias literal in the document is an outgoing edge from
//! `(token, value path, mode)` to `(token, mode)`. The graph is derived
//! state: edges are recomputed from the tokens' current raw values on every
//! query rather than cached, so a query after any mutation is always
//! consistent with the stored values. `edges_to` and `all_edges` scan the
//! whole document in sorted-path order; listings are deterministic for a
//! given document state.
//!
//! Edges are replaced wholesale whenever a token's stored value changes.
//! The one exception is rename/move propagation, which edits alias literals
//! in place (see `TokenDocument::rename` and friends).

use serde::Serialize;

use crate::{
    doc::{
        TokenDocument,
        path::{TokenPath, ValuePath},
    },
    resolve::deep::{classify_alias, missing_token_reason},
    token::{Token, value::TokenValue},
};

/// The source endpoint of an alias edge.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AliasSource {
    /// The token whose stored value contains the alias literal.
    pub token: TokenPath,
    /// Where inside the mode value the literal sits (empty = the mode value
    /// itself; empty with `mode: None` = the whole token value).
    pub value_path: ValuePath,
    /// The mode the literal lives under; `None` for top-level aliases.
    pub mode: Option<String>,
}

/// The target endpoint of an alias edge.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AliasTarget {
    /// The target token path. Need not exist: resolvability is computed.
    pub token: TokenPath,
    /// The effective target mode; `None` for top-level aliases.
    pub mode: Option<String>,
}

/// One directed alias edge, with its computed resolvability.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AliasReference {
    pub from: AliasSource,
    pub to: AliasTarget,
    pub resolvable: bool,
    /// Human-readable reason when `resolvable` is false.
    pub reason: Option<String>,
}

/// Collects the outgoing edges of one token by walking its current raw
/// value: the top-level edge first (if any), then mode-map order, then
/// value-path discovery order.
pub(crate) fn edges_of(doc: &TokenDocument, token: &Token) -> Vec<AliasReference> {
    let mut edges = Vec::new();
    match token.value() {
        TokenValue::Alias(descriptor) => {
            let resolvable = doc.token(&descriptor.target).is_some();
            edges.push(AliasReference {
                from: AliasSource {
                    token: token.path().clone(),
                    value_path: ValuePath::root(),
                    mode: None,
                },
                to: AliasTarget {
                    token: descriptor.target.clone(),
                    mode: None,
                },
                resolvable,
                reason: (!resolvable).then(|| missing_token_reason(&descriptor.target)),
            });
        }
        TokenValue::Modes(map) => {
            for (mode, value) in map {
                for (value_path, descriptor) in crate::token::value::alias_sites(value) {
                    let (to_mode, resolvable, reason) =
                        match classify_alias(doc, mode, &descriptor) {
                            Ok(alias) => (alias.mode, true, None),
                            Err(broken) => {
                                let effective = broken
                                    .mode
                                    .clone()
                                    .unwrap_or_else(|| mode.clone());
                                (Some(effective), false, Some(broken.reason))
                            }
                        };
                    edges.push(AliasReference {
                        from: AliasSource {
                            token: token.path().clone(),
                            value_path,
                            mode: Some(mode.clone()),
                        },
                        to: AliasTarget {
                            token: descriptor.target.clone(),
                            mode: to_mode,
                        },
                        resolvable,
                        reason,
                    });
                }
            }
        }
    }
    edges
}

/// Every outgoing edge of the token at `path`. Empty when no token exists
/// there.
pub fn edges_from(doc: &TokenDocument, path: &TokenPath) -> Vec<AliasReference> {
    doc.token(path)
        .map(|token| edges_of(doc, token))
        .unwrap_or_default()
}

/// Every edge in the document whose target token is `path`.
pub fn edges_to(doc: &TokenDocument, path: &TokenPath) -> Vec<AliasReference> {
    doc.tokens()
        .flat_map(|token| edges_of(doc, token))
        .filter(|edge| edge.to.token == *path)
        .collect()
}

/// Every outgoing edge in the document, tokens in sorted-path order.
pub fn all_edges(doc: &TokenDocument) -> Vec<AliasReference> {
    doc.tokens().flat_map(|token| edges_of(doc, token)).collect()
}
