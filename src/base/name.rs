//! Case-insensitive names.
//!
//! MSBuild compares property, item, metadata, task and target names without
//! regard to ASCII case. [`Name`] keeps the spelling it was created with (so
//! completion shows what the author wrote) but hashes and compares folded.

use std::fmt;
use std::hash::{Hash, Hasher};

use indexmap::{IndexMap, IndexSet};
use rustc_hash::FxBuildHasher;
use smol_str::SmolStr;

/// A symbol name compared ASCII case-insensitively.
#[derive(Clone, Default)]
pub struct Name(SmolStr);

impl Name {
    pub fn new(text: impl AsRef<str>) -> Self {
        Self(SmolStr::new(text.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Private names start with an underscore.
    pub fn is_private(&self) -> bool {
        self.0.starts_with('_')
    }

    /// Case-insensitive comparison against a plain string.
    pub fn matches(&self, other: &str) -> bool {
        self.0.eq_ignore_ascii_case(other)
    }
}

impl PartialEq for Name {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Eq for Name {}

impl Hash for Name {
    fn hash<H: Hasher>(&self, state: &mut H) {
        NameKey::hash_folded(&self.0, state);
    }
}

impl PartialOrd for Name {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Name {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        let a = self.0.bytes().map(|b| b.to_ascii_lowercase());
        let b = other.0.bytes().map(|b| b.to_ascii_lowercase());
        a.cmp(b)
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Name {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Name {
    fn from(value: String) -> Self {
        Self(SmolStr::from(value))
    }
}

impl From<SmolStr> for Name {
    fn from(value: SmolStr) -> Self {
        Self(value)
    }
}

impl AsRef<str> for Name {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Borrowed lookup key so maps can be queried with `&str`.
///
/// A plain `str` hashes case-sensitively, so lookups go through this wrapper,
/// which hashes the same folded bytes as [`Name`].
#[derive(Debug, Clone, Copy)]
struct NameKey<'a>(&'a str);

impl NameKey<'_> {
    fn hash_folded<H: Hasher>(text: &str, state: &mut H) {
        for byte in text.bytes() {
            state.write_u8(byte.to_ascii_lowercase());
        }
        state.write_u8(0xff);
    }
}

impl Hash for NameKey<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        Self::hash_folded(self.0, state);
    }
}

impl indexmap::Equivalent<Name> for NameKey<'_> {
    fn equivalent(&self, key: &Name) -> bool {
        self.0.eq_ignore_ascii_case(key.as_str())
    }
}

/// Insertion-ordered map keyed by case-insensitive names.
#[derive(Clone, Debug, PartialEq)]
pub struct NameMap<V>(IndexMap<Name, V, FxBuildHasher>);

impl<V> Default for NameMap<V> {
    fn default() -> Self {
        Self(IndexMap::default())
    }
}

impl<V> NameMap<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&V> {
        self.0.get(&NameKey(name))
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut V> {
        self.0.get_mut(&NameKey(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(&NameKey(name))
    }

    /// Insert or overwrite. The key keeps the spelling of the first insertion.
    pub fn insert(&mut self, name: impl Into<Name>, value: V) -> Option<V> {
        let name = name.into();
        match self.0.get_mut(&NameKey(name.as_str())) {
            Some(slot) => Some(std::mem::replace(slot, value)),
            None => {
                self.0.insert(name, value);
                None
            }
        }
    }

    /// Get the entry for `name`, inserting `default()` when missing.
    pub fn get_or_insert_with(&mut self, name: &str, default: impl FnOnce() -> V) -> &mut V {
        let index = match self.0.get_index_of(&NameKey(name)) {
            Some(index) => index,
            None => self.0.insert_full(Name::new(name), default()).0,
        };
        &mut self.0[index]
    }

    pub fn remove(&mut self, name: &str) -> Option<V> {
        self.0.shift_remove(&NameKey(name))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Name, &V)> {
        self.0.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &Name> {
        self.0.keys()
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.0.values()
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut V> {
        self.0.values_mut()
    }
}

impl<V> FromIterator<(Name, V)> for NameMap<V> {
    fn from_iter<T: IntoIterator<Item = (Name, V)>>(iter: T) -> Self {
        let mut map = NameMap::new();
        for (name, value) in iter {
            map.insert(name, value);
        }
        map
    }
}

/// Insertion-ordered set of case-insensitive names.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NameSet(IndexSet<Name, FxBuildHasher>);

impl NameSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the name was not already present.
    pub fn insert(&mut self, name: impl Into<Name>) -> bool {
        self.0.insert(name.into())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(&NameKey(name))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Name> {
        self.0.iter()
    }

    pub fn extend<I: IntoIterator<Item = Name>>(&mut self, names: I) {
        self.0.extend(names);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_equality_ignores_case() {
        assert_eq!(Name::new("OutputPath"), Name::new("outputpath"));
        assert_ne!(Name::new("OutputPath"), Name::new("OutputPaths"));
    }

    #[test]
    fn test_map_lookup_with_any_casing() {
        let mut map = NameMap::new();
        map.insert("Configuration", 1);
        assert_eq!(map.get("CONFIGURATION"), Some(&1));
        assert_eq!(map.get("configuration"), Some(&1));
        assert!(map.get("Platform").is_none());
    }

    #[test]
    fn test_insert_keeps_first_spelling_and_overwrites_value() {
        let mut map = NameMap::new();
        map.insert("Compile", 1);
        assert_eq!(map.insert("COMPILE", 2), Some(1));
        assert_eq!(map.len(), 1);
        let (key, value) = map.iter().next().unwrap();
        assert_eq!(key.as_str(), "Compile");
        assert_eq!(*value, 2);
    }

    #[test]
    fn test_set_deduplicates_by_folded_name() {
        let mut set = NameSet::new();
        assert!(set.insert("Debug"));
        assert!(!set.insert("DEBUG"));
        assert!(set.contains("debug"));
    }
}
