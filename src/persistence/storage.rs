//! String key-value backends
//!
//! Mirrors the browser `Storage` API: every value is a string, every call
//! may fail (quota, privacy mode), and mutation goes through `&self`.

use std::cell::RefCell;
use std::collections::BTreeMap;

use crate::error::AppError;

pub trait KeyValueStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, AppError>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), AppError>;
    fn remove_item(&self, key: &str) -> Result<(), AppError>;
}

/// In-process store used natively and in tests
#[derive(Debug, Default)]
pub struct MemoryStore {
    items: RefCell<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate a key, e.g. with a document written by an older release
    pub fn with_item(self, key: &str, value: &str) -> Self {
        self.items.borrow_mut().insert(key.to_string(), value.to_string());
        self
    }

    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, AppError> {
        Ok(self.items.borrow().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), AppError> {
        self.items.borrow_mut().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), AppError> {
        self.items.borrow_mut().remove(key);
        Ok(())
    }
}

/// Browser LocalStorage
#[cfg(target_arch = "wasm32")]
pub struct LocalStore {
    storage: web_sys::Storage,
}

#[cfg(target_arch = "wasm32")]
impl LocalStore {
    /// Open `window.localStorage`, if the browser exposes one
    pub fn open() -> Option<Self> {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten()?;
        Some(Self { storage })
    }
}

#[cfg(target_arch = "wasm32")]
impl KeyValueStore for LocalStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, AppError> {
        self.storage
            .get_item(key)
            .map_err(|e| AppError::Storage(format!("read {key}: {e:?}")))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), AppError> {
        self.storage
            .set_item(key, value)
            .map_err(|e| AppError::Storage(format!("write {key}: {e:?}")))
    }

    fn remove_item(&self, key: &str) -> Result<(), AppError> {
        self.storage
            .remove_item(key)
            .map_err(|e| AppError::Storage(format!("remove {key}: {e:?}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_set_get_remove() {
        let store = MemoryStore::new();
        assert_eq!(store.get_item("foods").unwrap(), None);

        store.set_item("foods", "[]").unwrap();
        assert_eq!(store.get_item("foods").unwrap().as_deref(), Some("[]"));
        assert_eq!(store.len(), 1);

        store.remove_item("foods").unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_with_item_seeds_value() {
        let store = MemoryStore::new().with_item("fitnessFilter", "chest");
        assert_eq!(
            store.get_item("fitnessFilter").unwrap().as_deref(),
            Some("chest")
        );
    }
}
