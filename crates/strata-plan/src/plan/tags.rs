//! Per-node metadata tags.

use std::collections::BTreeMap;

/// Key/value annotations attached to one plan node.
///
/// Tags are not part of a node's logical identity: two nodes that differ
/// only in their tags compare equal. A rewrite copies the store of the
/// node it replaces; the store itself is never shared between nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagStore {
    entries: BTreeMap<String, String>,
}

impl TagStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a tag.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Sets a tag, returning the previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.entries.insert(key.into(), value.into())
    }

    /// Removes a tag.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.remove(key)
    }

    /// Number of tags.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no tag is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over tags in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_remove() {
        let mut tags = TagStore::new();
        assert!(tags.set("hidden", "a#1").is_none());
        assert_eq!(tags.set("hidden", "a#2").as_deref(), Some("a#1"));
        assert_eq!(tags.get("hidden"), Some("a#2"));
        assert_eq!(tags.len(), 1);
        assert_eq!(tags.remove("hidden").as_deref(), Some("a#2"));
        assert!(tags.is_empty());
    }

    #[test]
    fn iterates_in_key_order() {
        let mut tags = TagStore::new();
        tags.set("b", "2");
        tags.set("a", "1");
        let keys: Vec<_> = tags.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["a", "b"]);
    }
}
