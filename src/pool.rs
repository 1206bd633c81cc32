//! Resource pool (§4.7): an ordered, add-only collection of
//! [`ResourceEntry`] with a `(module, path)` secondary index.

use indexmap::IndexMap;

use crate::error::{LinkError, Result};
use crate::model::ResourceEntry;

/// An ordered collection of resource entries with duplicate rejection.
/// Insertion order is the linearization order for every downstream
/// observer, including the writer's on-disk byte order (§5).
#[derive(Debug, Default)]
pub struct ResourcePool {
    index: IndexMap<(String, String), ResourceEntry>,
}

impl ResourcePool {
    /// An empty pool.
    pub fn new() -> Self {
        ResourcePool { index: IndexMap::new() }
    }

    /// Insert `entry`. Fails `duplicate-entry` if `(module, path)` is
    /// already present.
    pub fn add(&mut self, entry: ResourceEntry) -> Result<()> {
        let key = (entry.module.clone(), entry.path.clone());
        if self.index.contains_key(&key) {
            return Err(LinkError::DuplicateEntry { module: key.0, path: key.1 });
        }
        self.index.insert(key, entry);
        Ok(())
    }

    /// Look up an entry by its `(module, path)` key.
    pub fn get(&self, module: &str, path: &str) -> Option<&ResourceEntry> {
        self.index.get(&(module.to_string(), path.to_string()))
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &ResourceEntry> {
        self.index.values()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether the pool has no entries.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Consume the pool, yielding entries in insertion order.
    pub fn into_entries(self) -> Vec<ResourceEntry> {
        self.index.into_values().collect()
    }
}

impl FromIterator<ResourceEntry> for ResourcePool {
    /// Build a pool from an iterator, trusting the source to be
    /// duplicate-free (used by pipeline stages that already verified
    /// uniqueness of their own output). Panics on a duplicate, since a
    /// stage producing one is an internal bug, not a user-facing error.
    fn from_iter<T: IntoIterator<Item = ResourceEntry>>(iter: T) -> Self {
        let mut pool = ResourcePool::new();
        for entry in iter {
            pool.add(entry).expect("pipeline stage produced a duplicate (module, path)");
        }
        pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ResourceEntry;

    #[test]
    fn rejects_duplicate_module_path() {
        let mut pool = ResourcePool::new();
        pool.add(ResourceEntry::meta_inf("a", "META-INF/x", vec![1])).unwrap();
        let err = pool.add(ResourceEntry::meta_inf("a", "META-INF/x", vec![2])).unwrap_err();
        assert!(matches!(err, LinkError::DuplicateEntry { .. }));
    }

    #[test]
    fn preserves_insertion_order() {
        let mut pool = ResourcePool::new();
        pool.add(ResourceEntry::meta_inf("a", "z", vec![])).unwrap();
        pool.add(ResourceEntry::meta_inf("a", "a", vec![])).unwrap();
        let paths: Vec<&str> = pool.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["z", "a"]);
    }
}
