//! The updates batch: pending writes committed atomically as one block.

use std::collections::BTreeMap;

use bytes::Bytes;

/// Category holding block header and block hash entries.
pub const EXECUTION_PRIVATE_CATEGORY: &str = "execution_private";

/// A single pending write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KvWrite {
    /// Set the key to a value.
    Put(Bytes),
    /// Delete the key (tombstone).
    Delete,
}

impl KvWrite {
    pub fn is_tombstone(&self) -> bool {
        matches!(self, KvWrite::Delete)
    }

    /// The written value, if this is a put.
    pub fn value(&self) -> Option<&Bytes> {
        match self {
            KvWrite::Put(value) => Some(value),
            KvWrite::Delete => None,
        }
    }
}

/// Pending writes of one category, ordered by key.
///
/// A later write to the same key replaces the earlier one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryUpdates {
    writes: BTreeMap<Vec<u8>, KvWrite>,
}

impl CategoryUpdates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, key: impl Into<Vec<u8>>, value: impl Into<Bytes>) {
        self.writes.insert(key.into(), KvWrite::Put(value.into()));
    }

    pub fn delete(&mut self, key: impl Into<Vec<u8>>) {
        self.writes.insert(key.into(), KvWrite::Delete);
    }

    pub fn get(&self, key: &[u8]) -> Option<&KvWrite> {
        self.writes.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &KvWrite)> {
        self.writes.iter().map(|(k, v)| (k.as_slice(), v))
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }
}

/// All pending writes of one block, keyed by category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Updates {
    categories: BTreeMap<String, CategoryUpdates>,
}

impl Updates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, category: &str, key: impl Into<Vec<u8>>, value: impl Into<Bytes>) {
        self.category_mut(category).put(key, value);
    }

    pub fn delete(&mut self, category: &str, key: impl Into<Vec<u8>>) {
        self.category_mut(category).delete(key);
    }

    /// Look up a pending write.
    pub fn get(&self, category: &str, key: &[u8]) -> Option<&KvWrite> {
        self.categories.get(category).and_then(|c| c.get(key))
    }

    fn category_mut(&mut self, category: &str) -> &mut CategoryUpdates {
        self.categories.entry(category.to_owned()).or_default()
    }

    /// Categories in name order.
    pub fn categories(&self) -> impl Iterator<Item = (&str, &CategoryUpdates)> {
        self.categories.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Every write as `(category, key, write)`.
    pub fn writes(&self) -> impl Iterator<Item = (&str, &[u8], &KvWrite)> {
        self.categories()
            .flat_map(|(category, updates)| updates.iter().map(move |(k, w)| (category, k, w)))
    }

    /// Total number of writes across categories.
    pub fn len(&self) -> usize {
        self.categories.values().map(CategoryUpdates::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_and_delete() {
        let mut updates = Updates::new();
        updates.put("app", b"k1".to_vec(), b"v1".to_vec());
        updates.delete("app", b"k2".to_vec());
        updates.put(EXECUTION_PRIVATE_CATEGORY, b"k1".to_vec(), b"other".to_vec());

        assert_eq!(updates.len(), 3);
        assert_eq!(
            updates.get("app", b"k1"),
            Some(&KvWrite::Put(Bytes::from_static(b"v1")))
        );
        assert!(updates.get("app", b"k2").unwrap().is_tombstone());
        assert!(updates.get("missing", b"k1").is_none());
    }

    #[test]
    fn test_later_write_replaces_earlier() {
        let mut updates = Updates::new();
        updates.put("app", b"k".to_vec(), b"v".to_vec());
        updates.delete("app", b"k".to_vec());
        assert_eq!(updates.len(), 1);
        assert_eq!(updates.get("app", b"k"), Some(&KvWrite::Delete));
    }

    #[test]
    fn test_writes_are_ordered() {
        let mut updates = Updates::new();
        updates.put("b", b"2".to_vec(), b"x".to_vec());
        updates.put("a", b"9".to_vec(), b"x".to_vec());
        updates.put("a", b"1".to_vec(), b"x".to_vec());

        let order: Vec<(&str, &[u8])> = updates.writes().map(|(c, k, _)| (c, k)).collect();
        assert_eq!(
            order,
            vec![("a", &b"1"[..]), ("a", &b"9"[..]), ("b", &b"2"[..])]
        );
    }

    #[test]
    fn test_empty() {
        let updates = Updates::new();
        assert!(updates.is_empty());
        assert_eq!(updates.writes().count(), 0);
    }
}
