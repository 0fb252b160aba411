//! Persistent key-value settings and scores.
//!
//! Values are stored as JSON text under a string key. Reads happen once, when
//! a [`StorageItem`] is opened; every write goes straight through to the store.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::{de::DeserializeOwned, Serialize};
use tracing::warn;

use crate::error::TrainerError;

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, TrainerError>;
    fn set(&self, key: &str, value: &str) -> Result<(), TrainerError>;
}

/// In-process store, used by tests and by sessions that need no persistence.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, TrainerError> {
        let values = self
            .values
            .lock()
            .map_err(|_| TrainerError::Storage("memory store poisoned".into()))?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), TrainerError> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| TrainerError::Storage("memory store poisoned".into()))?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// A typed value backed by one key. Missing or unreadable data yields the default.
pub struct StorageItem<T> {
    key: String,
    value: T,
    store: Arc<dyn KeyValueStore>,
}

impl<T> std::fmt::Debug for StorageItem<T>
where
    T: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageItem")
            .field("key", &self.key)
            .field("value", &self.value)
            .finish()
    }
}

impl<T> StorageItem<T>
where
    T: Serialize + DeserializeOwned + Clone,
{
    pub fn open(store: Arc<dyn KeyValueStore>, key: &str, default: T) -> Self {
        let value = match store.get(key) {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(v) => v,
                Err(e) => {
                    warn!(key, error = %e, "Stored value is unreadable, using default");
                    default
                }
            },
            Ok(None) => default,
            Err(e) => {
                warn!(key, error = %e, "Failed to read stored value, using default");
                default
            }
        };
        Self {
            key: key.to_string(),
            value,
            store,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    /// Update the in-memory value and write it through. A failed write is
    /// logged; the in-memory value is kept either way.
    pub fn set(&mut self, value: T) {
        self.value = value;
        if let Err(e) = self.persist() {
            warn!(key = %self.key, error = %e, "Failed to persist value");
        }
    }

    pub fn update(&mut self, f: impl FnOnce(&mut T)) {
        let mut next = self.value.clone();
        f(&mut next);
        self.set(next);
    }

    fn persist(&self) -> Result<(), TrainerError> {
        let raw = serde_json::to_string(&self.value)?;
        self.store.set(&self.key, &raw)
    }
}
