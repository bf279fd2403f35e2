//! Key/value description of a discovered resource
//!
//! Adapters describe each instance with a `Properties` value. Config filters
//! address entries by key, and the removal engine compares two listings of the
//! same instance with `==`.
//!
//! Tags (labels) live in the same map under a `tag:` key prefix, optionally
//! grouped under a caller-supplied prefix (`tag:<prefix>:<key>`).

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Key prefix used for tag entries
pub const TAG_PREFIX: &str = "tag";

/// Ordered string map describing a resource instance.
///
/// Equality ignores insertion order: two values are equal when they hold the
/// same keys mapped to equal values. An absent `Properties` (`None`) is never
/// equal to an empty one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Properties(BTreeMap<String, String>);

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a plain entry, returning the updated value for chaining
    pub fn set(mut self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        self.insert(key, value);
        self
    }

    /// Set a plain entry only when a value is present
    pub fn set_opt<V: fmt::Display>(self, key: impl Into<String>, value: Option<V>) -> Self {
        match value {
            Some(v) => self.set(key, v),
            None => self,
        }
    }

    /// Set a tag entry (`tag:<key>`). Empty keys are ignored.
    pub fn set_tag(self, key: &str, value: impl fmt::Display) -> Self {
        self.set_tag_with_prefix("", key, value)
    }

    /// Set a tag entry only when a value is present
    pub fn set_tag_opt<V: fmt::Display>(self, key: &str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.set_tag(key, v),
            None => self,
        }
    }

    /// Set a tag entry grouped under `prefix` (`tag:<prefix>:<key>`).
    ///
    /// An empty prefix behaves like [`Properties::set_tag`]; an empty key is ignored.
    pub fn set_tag_with_prefix(mut self, prefix: &str, key: &str, value: impl fmt::Display) -> Self {
        if key.is_empty() {
            return self;
        }
        let full_key = if prefix.is_empty() {
            format!("{TAG_PREFIX}:{key}")
        } else {
            format!("{TAG_PREFIX}:{prefix}:{key}")
        };
        self.insert(full_key, value);
        self
    }

    /// Set a plain entry in place
    pub fn insert(&mut self, key: impl Into<String>, value: impl fmt::Display) {
        self.0.insert(key.into(), value.to_string());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl fmt::Display for Properties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, (key, value)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{key}: {value:?}")?;
        }
        f.write_str("]")
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Properties {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Properties(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}
