//! The three-tier alias-resolution algebra.
//!
//! Resolution classifies a token's stored value into tagged results at three
//! decision tiers:
//!
//! - **Top tier** ([`TopTier`]): is the whole stored value one alias, or a
//!   per-mode map?
//! - **Mode tier** ([`ModeTier`]): for one mode, is the value one alias, or a
//!   literal/composite?
//! - **Value tier** ([`ValueTier`]): inside a composite or array, is one leaf
//!   field an alias, or a literal?
//!
//! Exactly one variant holds at a time per (token, [mode, [field]]). Aliases
//! come in two flavors: *resolvable* (the target currently exists) and
//! *unresolvable* (it does not, with a human-readable reason). Unresolvable
//! aliases are data, not errors.
//!
//! Each tier has a combinator wrapper ([`TopResult`], [`ModeResult`],
//! [`ValueResult`]) that lets callers selectively transform each variant
//! without manual narrowing:
//!
//! ```rust
//! use tokentree::resolve::{ModeResult, ModeTier};
//! use serde_json::{Value as Json, json};
//!
//! let tier = ModeTier::Raw(json!("#336699"));
//! let out: Json = ModeResult::new(tier)
//!     .map_raw(|v| json!({ "literal": v }))
//!     .map_unresolvable(|broken| json!({ "broken": broken.target.as_str() }))
//!     .unwrap();
//! assert_eq!(out, json!({ "literal": "#336699" }));
//! ```
//!
//! At most one branch ever fires per chain; a raw/primitive map placed
//! *after* an alias map still applies to whatever the alias map produced.
//! Deep (multi-hop, cross-token, cycle-guarded) resolution lives in
//! [`deep`].

pub mod deep;
pub mod errors;

pub use deep::{DeepModeResolution, DeepValue, UnresolvedSite};
pub use errors::ResolveError;

use std::fmt;

use indexmap::IndexMap;
use serde_json::Value as Json;

use crate::{
    doc::path::TokenPath,
    token::value::{ALIAS_KEY, MODE_KEY},
};

/// Payload of a resolvable alias: the target existed when the result was
/// classified. `mode` is `None` for top-level aliases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAlias {
    pub target: TokenPath,
    pub mode: Option<String>,
}

/// Payload of an unresolvable alias, with the reason it does not resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokenAlias {
    pub target: TokenPath,
    pub mode: Option<String>,
    pub reason: String,
}

fn alias_literal(target: &TokenPath, mode: &Option<String>) -> Json {
    let mut map = serde_json::Map::new();
    map.insert(ALIAS_KEY.into(), Json::String(target.as_str().into()));
    if let Some(mode) = mode {
        map.insert(MODE_KEY.into(), Json::String(mode.clone()));
    }
    Json::Object(map)
}

impl ResolvedAlias {
    /// The alias rendered back to its JSON literal form.
    pub fn to_json(&self) -> Json {
        alias_literal(&self.target, &self.mode)
    }
}

impl BrokenAlias {
    /// The alias rendered back to its JSON literal form.
    pub fn to_json(&self) -> Json {
        alias_literal(&self.target, &self.mode)
    }
}

/// Top-tier resolution result: the shape of the whole stored value.
#[derive(Debug, Clone, PartialEq)]
pub enum TopTier {
    /// A per-mode map, each mode classified at the mode tier.
    Value(StatefulValue),
    /// The whole value aliases an existing token.
    ResolvableAlias(ResolvedAlias),
    /// The whole value aliases a path with no token behind it.
    UnresolvableAlias(BrokenAlias),
}

/// Mode-tier resolution result: the shape of one mode's value.
#[derive(Debug, Clone, PartialEq)]
pub enum ModeTier {
    /// A literal or composite value for this mode.
    Raw(Json),
    /// The whole mode aliases an existing (token, mode).
    ResolvableAlias(ResolvedAlias),
    /// The whole mode aliases a (token, mode) that does not resolve.
    UnresolvableAlias(BrokenAlias),
}

/// Value-tier resolution result: the shape of one leaf field inside a
/// composite mode value.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueTier {
    /// A literal leaf.
    Primitive(Json),
    /// A field-level alias resolving to an existing (token, mode).
    ResolvableAlias(ResolvedAlias),
    /// A field-level alias to a (token, mode) that does not resolve.
    UnresolvableAlias(BrokenAlias),
}

macro_rules! tier_accessors {
    ($tier:ident, $literal:ident, $literal_ty:ty, $is_literal:ident, $as_literal:ident) => {
        impl $tier {
            /// Returns `true` for the literal (non-alias) variant.
            pub fn $is_literal(&self) -> bool {
                matches!(self, $tier::$literal(_))
            }

            /// Returns `true` for either alias variant.
            pub fn is_alias(&self) -> bool {
                !self.$is_literal()
            }

            /// Returns `true` if this is a resolvable alias.
            pub fn is_resolvable_alias(&self) -> bool {
                matches!(self, $tier::ResolvableAlias(_))
            }

            /// Returns `true` if this is an unresolvable alias.
            pub fn is_unresolvable_alias(&self) -> bool {
                matches!(self, $tier::UnresolvableAlias(_))
            }

            /// Returns the literal payload, if this is the literal variant.
            pub fn $as_literal(&self) -> Option<&$literal_ty> {
                match self {
                    $tier::$literal(value) => Some(value),
                    _ => None,
                }
            }

            /// Returns the resolvable-alias payload, if any.
            pub fn as_resolvable_alias(&self) -> Option<&ResolvedAlias> {
                match self {
                    $tier::ResolvableAlias(alias) => Some(alias),
                    _ => None,
                }
            }

            /// Returns the unresolvable-alias payload, if any.
            pub fn as_unresolvable_alias(&self) -> Option<&BrokenAlias> {
                match self {
                    $tier::UnresolvableAlias(alias) => Some(alias),
                    _ => None,
                }
            }

            /// Returns the variant name as a string.
            pub fn type_name(&self) -> &'static str {
                match self {
                    $tier::$literal(_) => stringify!($literal),
                    $tier::ResolvableAlias(_) => "ResolvableAlias",
                    $tier::UnresolvableAlias(_) => "UnresolvableAlias",
                }
            }
        }

        impl fmt::Display for $tier {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self {
                    $tier::$literal(_) => write!(f, "{}", self.type_name()),
                    $tier::ResolvableAlias(alias) => {
                        write!(f, "ResolvableAlias -> {}", alias.target)
                    }
                    $tier::UnresolvableAlias(alias) => {
                        write!(f, "UnresolvableAlias -> {} ({})", alias.target, alias.reason)
                    }
                }
            }
        }
    };
}

tier_accessors!(TopTier, Value, StatefulValue, is_value, as_value);
tier_accessors!(ModeTier, Raw, Json, is_raw, as_raw);
tier_accessors!(ValueTier, Primitive, Json, is_primitive, as_primitive);

impl From<ModeTier> for Json {
    fn from(tier: ModeTier) -> Json {
        match tier {
            ModeTier::Raw(value) => value,
            ModeTier::ResolvableAlias(alias) => alias.to_json(),
            ModeTier::UnresolvableAlias(alias) => alias.to_json(),
        }
    }
}

impl From<ValueTier> for Json {
    fn from(tier: ValueTier) -> Json {
        match tier {
            ValueTier::Primitive(value) => value,
            ValueTier::ResolvableAlias(alias) => alias.to_json(),
            ValueTier::UnresolvableAlias(alias) => alias.to_json(),
        }
    }
}

impl From<TopTier> for Json {
    fn from(tier: TopTier) -> Json {
        match tier {
            TopTier::Value(stateful) => stateful.to_json(),
            TopTier::ResolvableAlias(alias) => alias.to_json(),
            TopTier::UnresolvableAlias(alias) => alias.to_json(),
        }
    }
}

impl From<StatefulValue> for Json {
    fn from(stateful: StatefulValue) -> Json {
        stateful.to_json()
    }
}

/// A per-mode map of mode-tier results, in mode-map insertion order.
///
/// This is the payload of [`TopTier::Value`] and the result of
/// `Token::stateful_value` for non-top-level-alias tokens. Iteration order is
/// the insertion order of the underlying per-mode map and is stable within a
/// process run; `Token::modes` gives the sorted view.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StatefulValue {
    modes: IndexMap<String, ModeTier>,
}

impl StatefulValue {
    pub fn new(modes: IndexMap<String, ModeTier>) -> Self {
        Self { modes }
    }

    /// Iterates `(mode, result)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ModeTier)> {
        self.modes.iter().map(|(mode, tier)| (mode.as_str(), tier))
    }

    /// Mode names in insertion order.
    pub fn mode_names(&self) -> Vec<&str> {
        self.modes.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.modes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modes.is_empty()
    }

    /// Returns the result for one mode, if present.
    pub fn get(&self, mode: &str) -> Option<&ModeTier> {
        self.modes.get(mode)
    }

    /// Folds over the per-mode results in insertion order.
    pub fn reduce<A>(&self, seed: A, mut f: impl FnMut(A, &str, &ModeTier) -> A) -> A {
        self.modes
            .iter()
            .fold(seed, |acc, (mode, tier)| f(acc, mode, tier))
    }

    /// Transforms each per-mode result, in insertion order.
    pub fn map_modes<T>(&self, mut f: impl FnMut(&str, &ModeTier) -> T) -> Vec<T> {
        self.modes.iter().map(|(mode, tier)| f(mode, tier)).collect()
    }

    /// Returns the result for the named mode, failing when it is absent.
    pub fn pick_mode(&self, mode: &str) -> Result<&ModeTier, ResolveError> {
        self.modes.get(mode).ok_or_else(|| ResolveError::ModeNotDefined {
            mode: mode.to_string(),
        })
    }

    /// Restricts the value to a single mode (same shape, singleton map).
    pub fn focus_on_mode(&self, mode: &str) -> Result<StatefulValue, ResolveError> {
        let tier = self.pick_mode(mode)?.clone();
        let mut modes = IndexMap::new();
        modes.insert(mode.to_string(), tier);
        Ok(StatefulValue { modes })
    }

    /// Renders the per-mode map back to JSON, aliases in literal form.
    pub fn to_json(&self) -> Json {
        let mut map = serde_json::Map::new();
        for (mode, tier) in &self.modes {
            map.insert(mode.clone(), tier.clone().into());
        }
        Json::Object(map)
    }
}

impl FromIterator<(String, ModeTier)> for StatefulValue {
    fn from_iter<I: IntoIterator<Item = (String, ModeTier)>>(iter: I) -> Self {
        Self {
            modes: iter.into_iter().collect(),
        }
    }
}

/// Internal two-state payload of a combinator chain: either the original
/// tagged tier value (no map has fired) or an already-mapped opaque value.
#[derive(Debug, Clone, PartialEq)]
enum MapState<V, T> {
    Tagged(V),
    Mapped(T),
}

macro_rules! tier_result {
    ($result:ident, $tier:ident, $literal:ident, $literal_ty:ty, $map_literal:ident) => {
        /// Combinator wrapper over a tier value.
        ///
        /// Starts out holding the tagged tier value. Each `map_*` call fires
        /// at most once: alias maps fire only on their still-tagged variant,
        /// while the literal map also applies to an already-mapped payload
        /// (so chain order matters only for re-mapping mapped output).
        /// `unwrap` returns the current payload, converting untouched
        /// variants via `From`; `unwrap_value` additionally fails while the
        /// payload is still an alias variant.
        #[derive(Debug, Clone, PartialEq)]
        pub struct $result<T = Json> {
            state: MapState<$tier, T>,
        }

        impl<T> $result<T> {
            pub fn new(tier: $tier) -> Self {
                Self {
                    state: MapState::Tagged(tier),
                }
            }

            /// Transforms the resolvable-alias variant, if it is still
            /// tagged; otherwise returns the receiver unchanged.
            pub fn map_resolvable(self, f: impl FnOnce(ResolvedAlias) -> T) -> Self {
                match self.state {
                    MapState::Tagged($tier::ResolvableAlias(alias)) => Self {
                        state: MapState::Mapped(f(alias)),
                    },
                    other => Self { state: other },
                }
            }

            /// Transforms the unresolvable-alias variant, if it is still
            /// tagged; otherwise returns the receiver unchanged.
            pub fn map_unresolvable(self, f: impl FnOnce(BrokenAlias) -> T) -> Self {
                match self.state {
                    MapState::Tagged($tier::UnresolvableAlias(alias)) => Self {
                        state: MapState::Mapped(f(alias)),
                    },
                    other => Self { state: other },
                }
            }

            /// Returns the current payload: the mapped output if a map has
            /// fired, the original variant (converted) otherwise.
            pub fn unwrap(self) -> T
            where
                T: From<$tier>,
            {
                match self.state {
                    MapState::Tagged(tier) => T::from(tier),
                    MapState::Mapped(value) => value,
                }
            }

            /// Like `unwrap`, but fails when the payload is still an alias
            /// variant, naming the owning token.
            pub fn unwrap_value(self, owner: &TokenPath) -> Result<T, ResolveError>
            where
                T: From<$literal_ty>,
            {
                match self.state {
                    MapState::Tagged($tier::$literal(value)) => Ok(T::from(value)),
                    MapState::Tagged(_) => Err(ResolveError::StillAliased {
                        token: owner.clone(),
                    }),
                    MapState::Mapped(value) => Ok(value),
                }
            }
        }

        impl<T: From<$literal_ty>> $result<T> {
            /// Transforms the literal variant, or the current payload when a
            /// previous map already fired. Tagged alias variants pass
            /// through untouched.
            pub fn $map_literal(self, f: impl FnOnce(T) -> T) -> Self {
                match self.state {
                    MapState::Tagged($tier::$literal(value)) => Self {
                        state: MapState::Mapped(f(T::from(value))),
                    },
                    MapState::Mapped(value) => Self {
                        state: MapState::Mapped(f(value)),
                    },
                    tagged => Self { state: tagged },
                }
            }
        }

        impl From<$tier> for $result<Json> {
            fn from(tier: $tier) -> Self {
                Self::new(tier)
            }
        }
    };
}

tier_result!(TopResult, TopTier, Value, StatefulValue, map_value);
tier_result!(ModeResult, ModeTier, Raw, Json, map_raw);
tier_result!(ValueResult, ValueTier, Primitive, Json, map_primitive);

impl TopTier {
    /// Wraps this result for combinator chaining.
    pub fn into_result<T>(self) -> TopResult<T> {
        TopResult::new(self)
    }
}

impl ModeTier {
    /// Wraps this result for combinator chaining.
    pub fn into_result<T>(self) -> ModeResult<T> {
        ModeResult::new(self)
    }
}

impl ValueTier {
    /// Wraps this result for combinator chaining.
    pub fn into_result<T>(self) -> ValueResult<T> {
        ValueResult::new(self)
    }
}

/// Single-mode convenience view: one mode-tier variant, or a marker for a
/// mode the token does not define.
#[derive(Debug, Clone, PartialEq)]
pub enum UiModeValue {
    /// The mode exists; its classified result.
    Mode(ModeTier),
    /// The requested mode is not defined on the token.
    UnknownMode(String),
}

impl UiModeValue {
    pub fn is_unknown(&self) -> bool {
        matches!(self, UiModeValue::UnknownMode(_))
    }

    pub fn as_mode(&self) -> Option<&ModeTier> {
        match self {
            UiModeValue::Mode(tier) => Some(tier),
            UiModeValue::UnknownMode(_) => None,
        }
    }
}
