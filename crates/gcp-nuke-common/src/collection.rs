//! Named set of resource-type names
//!
//! Used for include/exclude/target lists. Duplicates collapse and iteration
//! order is sorted, so two collections built from the same names in a
//! different order are equal.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A set of strings, usually resource-type names
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Collection(BTreeSet<String>);

impl Collection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    /// Add a name, returning `false` if it was already present
    pub fn insert(&mut self, name: impl Into<String>) -> bool {
        self.0.insert(name.into())
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Names present in either collection
    pub fn union(&self, other: &Collection) -> Collection {
        Collection(self.0.union(&other.0).cloned().collect())
    }

    /// Names present in both collections
    pub fn intersect(&self, other: &Collection) -> Collection {
        Collection(self.0.intersection(&other.0).cloned().collect())
    }

    /// Names of `self` that are not in `other`
    pub fn remove(&self, other: &Collection) -> Collection {
        Collection(self.0.difference(&other.0).cloned().collect())
    }

    pub fn is_subset(&self, other: &Collection) -> bool {
        self.0.is_subset(&other.0)
    }
}

impl<S: Into<String>> FromIterator<S> for Collection {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Collection(iter.into_iter().map(Into::into).collect())
    }
}

impl<S: Into<String>> From<Vec<S>> for Collection {
    fn from(names: Vec<S>) -> Self {
        names.into_iter().collect()
    }
}

impl IntoIterator for Collection {
    type Item = String;
    type IntoIter = std::collections::btree_set::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Collection {
    type Item = &'a String;
    type IntoIter = std::collections::btree_set::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
