//! Ordered key-value world state.
//!
//! The lending ledger never talks to a concrete database. It consumes the
//! [`WorldState`] interface the hosting ledger exposes: point reads and
//! writes plus an ascending range scan. [`MemoryWorldState`] backs the
//! bundled server and the test suites.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::{Arc, RwLock};

use thiserror::Error;

/// Failures raised by a world-state backend.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("world state unavailable: {0}")]
    Unavailable(String),

    #[error("world state rejected key '{key}': {message}")]
    Backend { key: String, message: String },
}

/// One entry yielded by a range scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue {
    pub key: String,
    pub value: Vec<u8>,
}

/// Abstract ordered key-value store.
///
/// Reads and writes are linearizable within a single invocation. There is no
/// multi-key transaction: two `put` calls are two independent writes.
pub trait WorldState: Send + Sync {
    /// Point read. `Ok(None)` when nothing is stored at `key`.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Insert or overwrite the value at `key`.
    fn put(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError>;

    /// Remove `key`. Removing an absent key is not an error.
    fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Ascending scan over `[start, end)`. An empty bound is open, so
    /// `scan("", "")` covers the whole namespace.
    fn scan(&self, start: &str, end: &str) -> Result<Vec<KeyValue>, StoreError>;
}

/// In-memory world state backed by a `BTreeMap`.
///
/// Clone-friendly via `Arc`; clones share the same entries.
#[derive(Clone, Default)]
pub struct MemoryWorldState {
    entries: Arc<RwLock<BTreeMap<String, Vec<u8>>>>,
}

impl MemoryWorldState {
    /// Create an empty world state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn lower_bound(start: &str) -> Bound<&str> {
    if start.is_empty() {
        Bound::Unbounded
    } else {
        Bound::Included(start)
    }
}

fn upper_bound(end: &str) -> Bound<&str> {
    if end.is_empty() {
        Bound::Unbounded
    } else {
        Bound::Excluded(end)
    }
}

impl WorldState for MemoryWorldState {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let entries = self
            .entries
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".into()))?;
        Ok(entries.get(key).cloned())
    }

    fn put(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        if key.is_empty() {
            return Err(StoreError::Backend {
                key: String::new(),
                message: "empty key".into(),
            });
        }

        let mut entries = self
            .entries
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".into()))?;
        tracing::trace!(key, bytes = value.len(), "world state put");
        entries.insert(key.to_string(), value);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".into()))?;
        tracing::trace!(key, "world state delete");
        entries.remove(key);
        Ok(())
    }

    fn scan(&self, start: &str, end: &str) -> Result<Vec<KeyValue>, StoreError> {
        // BTreeMap::range panics on an inverted range.
        if !start.is_empty() && !end.is_empty() && start >= end {
            return Ok(Vec::new());
        }

        let entries = self
            .entries
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".into()))?;

        Ok(entries
            .range::<str, _>((lower_bound(start), upper_bound(end)))
            .map(|(key, value)| KeyValue {
                key: key.clone(),
                value: value.clone(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> MemoryWorldState {
        let state = MemoryWorldState::new();
        for key in ["b", "a", "record-a", "c"] {
            state.put(key, key.as_bytes().to_vec()).unwrap();
        }
        state
    }

    fn keys(entries: &[KeyValue]) -> Vec<&str> {
        entries.iter().map(|kv| kv.key.as_str()).collect()
    }

    #[test]
    fn get_returns_none_for_missing_key() {
        let state = MemoryWorldState::new();
        assert_eq!(state.get("missing").unwrap(), None);
    }

    #[test]
    fn put_overwrites_existing_value() {
        let state = MemoryWorldState::new();
        state.put("k", b"one".to_vec()).unwrap();
        state.put("k", b"two".to_vec()).unwrap();
        assert_eq!(state.get("k").unwrap(), Some(b"two".to_vec()));
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn put_rejects_empty_key() {
        let state = MemoryWorldState::new();
        assert!(matches!(
            state.put("", b"x".to_vec()),
            Err(StoreError::Backend { .. })
        ));
    }

    #[test]
    fn delete_is_idempotent() {
        let state = seeded();
        state.delete("a").unwrap();
        state.delete("a").unwrap();
        assert_eq!(state.get("a").unwrap(), None);
    }

    #[test]
    fn open_scan_is_ascending_over_everything() {
        let state = seeded();
        let all = state.scan("", "").unwrap();
        assert_eq!(keys(&all), vec!["a", "b", "c", "record-a"]);
    }

    #[test]
    fn bounded_scan_is_half_open() {
        let state = seeded();
        assert_eq!(keys(&state.scan("b", "c").unwrap()), vec!["b"]);
        assert_eq!(keys(&state.scan("b", "").unwrap()), vec!["b", "c", "record-a"]);
        assert_eq!(keys(&state.scan("", "b").unwrap()), vec!["a"]);
    }

    #[test]
    fn inverted_scan_is_empty() {
        let state = seeded();
        assert!(state.scan("c", "a").unwrap().is_empty());
    }

    #[test]
    fn clones_share_entries() {
        let state = MemoryWorldState::new();
        let other = state.clone();
        other.put("shared", vec![1]).unwrap();
        assert_eq!(state.get("shared").unwrap(), Some(vec![1]));
    }
}
