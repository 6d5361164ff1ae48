//! Test doubles for the world state.

use std::collections::HashSet;
use std::sync::Mutex;

use shelf_db::{KeyValue, MemoryWorldState, StoreError, WorldState};

/// In-memory world state that refuses writes to chosen keys.
#[derive(Default)]
pub struct FlakyWorldState {
    inner: MemoryWorldState,
    failing: Mutex<HashSet<String>>,
}

impl FlakyWorldState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_puts_to(&self, key: &str) {
        self.failing.lock().unwrap().insert(key.to_string());
    }
}

impl WorldState for FlakyWorldState {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.inner.get(key)
    }

    fn put(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        if self.failing.lock().unwrap().contains(key) {
            return Err(StoreError::Backend {
                key: key.to_string(),
                message: "injected write failure".to_string(),
            });
        }
        self.inner.put(key, value)
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.inner.delete(key)
    }

    fn scan(&self, start: &str, end: &str) -> Result<Vec<KeyValue>, StoreError> {
        self.inner.scan(start, end)
    }
}
