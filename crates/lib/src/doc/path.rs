//! Path identifiers for document and in-value navigation.
//!
//! Two distinct path types locate things at two different granularities:
//!
//! - [`TokenPath`] - a dot-separated sequence of node names locating a token
//!   or group in the document tree (`colors.brand.primary`).
//! - [`ValuePath`] - a sequence of field-name/array-index segments locating a
//!   nested field *inside* one mode's value of a single token
//!   (`gradient.steps[2].color`). The empty value path denotes the mode value
//!   itself.
//!
//! Both are immutable once constructed; equality and ordering are structural.
//!
//! # Usage
//!
//! ```rust
//! use tokentree::doc::path::{TokenPath, ValuePath};
//! use std::str::FromStr;
//!
//! let path = TokenPath::from_str("colors.brand.primary")?;
//! assert_eq!(path.name(), Some("primary"));
//! assert_eq!(path.parent(), Some(TokenPath::normalize("colors.brand")));
//!
//! let field = ValuePath::root().push_field("steps").push_index(2);
//! assert_eq!(field.to_string(), "steps[2]");
//! # Ok::<(), std::convert::Infallible>(())
//! ```

use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Error type for path segment validation failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
    /// Invalid segment: segments cannot be empty or contain the separator.
    #[error("Invalid path segment '{segment}': {reason}")]
    InvalidSegment { segment: String, reason: String },
}

/// Normalizes a tree-path string by dropping empty components.
///
/// - `""` → `""` (the document root)
/// - `".colors"` / `"colors."` / `"colors..brand"` → `"colors"` / `"colors"` /
///   `"colors.brand"`
pub fn normalize_path(input: &str) -> String {
    if input.is_empty() {
        return String::new();
    }

    input
        .split('.')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join(".")
}

/// Validates a single node name: non-empty, no separator, and not starting
/// with the reserved `$` marker.
pub fn validate_segment(name: &str) -> Result<(), PathError> {
    if name.is_empty() {
        return Err(PathError::InvalidSegment {
            segment: name.to_string(),
            reason: "names cannot be empty".to_string(),
        });
    }
    if name.contains('.') {
        return Err(PathError::InvalidSegment {
            segment: name.to_string(),
            reason: "names cannot contain '.'".to_string(),
        });
    }
    if name.starts_with('$') {
        return Err(PathError::InvalidSegment {
            segment: name.to_string(),
            reason: "names cannot start with '$'".to_string(),
        });
    }
    Ok(())
}

/// An owned, immutable tree path identifying a token or group node.
///
/// Stored as a normalized dot-joined string, following the same
/// string-backed representation as `std::path::PathBuf`-style types. Two
/// paths are equal iff their segment sequences are equal; ordering is the
/// lexicographic order of the rendered string, which the reference graph
/// relies on for deterministic edge listings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TokenPath {
    inner: String,
}

impl TokenPath {
    /// The document root (empty path).
    pub fn root() -> Self {
        Self {
            inner: String::new(),
        }
    }

    /// Creates a path by normalizing the input string. Always succeeds.
    pub fn normalize(path: &str) -> Self {
        Self {
            inner: normalize_path(path),
        }
    }

    /// Builds a path from individual segments, skipping empty ones.
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let inner = segments
            .into_iter()
            .map(|s| normalize_path(s.as_ref()))
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(".");
        Self { inner }
    }

    /// Returns a new path with `segment` appended (normalized).
    pub fn child(&self, segment: impl AsRef<str>) -> Self {
        let normalized = normalize_path(segment.as_ref());
        if normalized.is_empty() {
            return self.clone();
        }
        if self.inner.is_empty() {
            Self { inner: normalized }
        } else {
            Self {
                inner: format!("{}.{normalized}", self.inner),
            }
        }
    }

    /// Returns an iterator over the path segments.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.inner.split('.').filter(|s| !s.is_empty())
    }

    /// Returns the number of segments in the path.
    pub fn len(&self) -> usize {
        if self.inner.is_empty() {
            0
        } else {
            self.inner.split('.').count()
        }
    }

    /// Returns `true` if this is the document root.
    pub fn is_root(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns `true` if the path has no segments.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns the last segment (the node's name), or `None` for the root.
    pub fn name(&self) -> Option<&str> {
        if self.inner.is_empty() {
            None
        } else {
            self.inner.split('.').next_back()
        }
    }

    /// Returns the parent path. The parent of a single-segment path is the
    /// root; the root has no parent.
    pub fn parent(&self) -> Option<TokenPath> {
        if self.inner.is_empty() {
            return None;
        }
        match self.inner.rfind('.') {
            Some(last_dot) => Some(TokenPath {
                inner: self.inner[..last_dot].to_string(),
            }),
            None => Some(TokenPath::root()),
        }
    }

    /// Returns `true` if `prefix` is this path or an ancestor of it.
    pub fn starts_with(&self, prefix: &TokenPath) -> bool {
        if prefix.inner.is_empty() {
            return true;
        }
        if self.inner == prefix.inner {
            return true;
        }
        self.inner.starts_with(&prefix.inner)
            && self.inner.as_bytes().get(prefix.inner.len()) == Some(&b'.')
    }

    /// Rewrites the leading `old` prefix to `new`, returning the rewritten
    /// path, or `None` when this path is not under `old`.
    ///
    /// Used by rename/move propagation: aliases targeting a path inside a
    /// renamed group keep their suffix under the new ancestor prefix.
    pub fn replace_prefix(&self, old: &TokenPath, new: &TokenPath) -> Option<TokenPath> {
        if !self.starts_with(old) {
            return None;
        }
        let suffix = &self.inner[old.inner.len()..];
        let suffix = suffix.strip_prefix('.').unwrap_or(suffix);
        if suffix.is_empty() {
            Some(new.clone())
        } else {
            Some(new.child(suffix))
        }
    }

    /// Returns the path as its rendered string form.
    pub fn as_str(&self) -> &str {
        &self.inner
    }
}

impl Default for TokenPath {
    fn default() -> Self {
        Self::root()
    }
}

impl fmt::Display for TokenPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.inner.is_empty() {
            write!(f, "(root)")
        } else {
            write!(f, "{}", self.inner)
        }
    }
}

impl FromStr for TokenPath {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::normalize(s))
    }
}

impl From<&str> for TokenPath {
    fn from(s: &str) -> Self {
        Self::normalize(s)
    }
}

impl From<&TokenPath> for TokenPath {
    fn from(path: &TokenPath) -> Self {
        path.clone()
    }
}

impl AsRef<str> for TokenPath {
    fn as_ref(&self) -> &str {
        &self.inner
    }
}

impl Serialize for TokenPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.inner)
    }
}

impl<'de> Deserialize<'de> for TokenPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(TokenPath::normalize(&s))
    }
}

/// One step of a [`ValuePath`]: an object field or an array index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueSegment {
    /// A field name inside a composite value.
    Field(String),
    /// An element index inside an array value.
    Index(usize),
}

impl fmt::Display for ValueSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueSegment::Field(name) => write!(f, "{name}"),
            ValueSegment::Index(i) => write!(f, "[{i}]"),
        }
    }
}

/// A path to a nested field inside the value of one mode of a single token.
///
/// The empty value path refers to the mode value itself (the location of a
/// mode-level alias). Rendered as `field.sub[2].leaf`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ValuePath {
    segments: Vec<ValueSegment>,
}

impl ValuePath {
    /// The empty path: the mode value itself.
    pub fn root() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    /// Returns a new path with a field segment appended.
    pub fn push_field(&self, name: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(ValueSegment::Field(name.into()));
        Self { segments }
    }

    /// Returns a new path with an index segment appended.
    pub fn push_index(&self, index: usize) -> Self {
        let mut segments = self.segments.clone();
        segments.push(ValueSegment::Index(index));
        Self { segments }
    }

    /// Returns the path segments.
    pub fn segments(&self) -> &[ValueSegment] {
        &self.segments
    }

    /// Returns `true` if this path refers to the mode value itself.
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns the number of segments in the path.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Returns `true` if the path has no segments.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

impl fmt::Display for ValuePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return write!(f, "(value)");
        }
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                ValueSegment::Field(name) => {
                    if i > 0 {
                        write!(f, ".")?;
                    }
                    write!(f, "{name}")?;
                }
                ValueSegment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

impl Serialize for ValuePath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.segments.is_empty() {
            serializer.serialize_str("")
        } else {
            serializer.serialize_str(&self.to_string())
        }
    }
}
