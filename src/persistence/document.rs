//! JSON document layer over a string key-value backend
//!
//! Reads fail soft: a missing key or an undecodable value yields the
//! caller's default and a log line, never an error. Writes are synchronous
//! and independent per key; there is no cross-key transaction.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::migration::{Envelope, SchemaMigrator};
use super::storage::{KeyValueStore, MemoryStore};
use crate::error::AppError;

/// A named JSON document whose schema is owned by the module that uses it
pub trait StoredDocument: Serialize + DeserializeOwned {
    /// Storage key
    const KEY: &'static str;
    /// Version written by this build
    const VERSION: u32 = 1;

    /// Value used on first run and whenever the stored value is unusable
    fn default_document() -> Self;

    /// Upgrade table from older stored shapes
    fn migrator() -> SchemaMigrator {
        SchemaMigrator::new(Self::VERSION)
    }
}

pub struct DocumentStore {
    backend: Rc<dyn KeyValueStore>,
    /// Keys already checked by the migrator this session
    verified: RefCell<HashSet<String>>,
}

impl DocumentStore {
    pub fn new(backend: Rc<dyn KeyValueStore>) -> Self {
        Self {
            backend,
            verified: RefCell::new(HashSet::new()),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Rc::new(MemoryStore::new()))
    }

    pub fn backend(&self) -> &Rc<dyn KeyValueStore> {
        &self.backend
    }

    fn read_json(&self, key: &str) -> Result<Option<Value>, AppError> {
        let Some(text) = self.backend.get_item(key)? else {
            return Ok(None);
        };
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| AppError::parse(key, e))
    }

    pub fn contains(&self, key: &str) -> bool {
        matches!(self.backend.get_item(key), Ok(Some(_)))
    }

    /// Raw stored JSON for `key`, or `default` when absent or undecodable
    pub fn get_value(&self, key: &str, default: Value) -> Value {
        match self.read_json(key) {
            Ok(Some(value)) => value,
            Ok(None) => default,
            Err(err) => {
                log::warn!("{err}; using default");
                default
            }
        }
    }

    pub fn set_value(&self, key: &str, value: &Value) -> Result<(), AppError> {
        let text = serde_json::to_string(value)
            .map_err(|e| AppError::Storage(format!("encode {key}: {e}")))?;
        self.backend.set_item(key, &text)
    }

    /// Plain (unencoded) string preference
    pub fn get_text(&self, key: &str) -> Option<String> {
        match self.backend.get_item(key) {
            Ok(value) => value,
            Err(err) => {
                log::warn!("{err}");
                None
            }
        }
    }

    pub fn set_text(&self, key: &str, value: &str) -> Result<(), AppError> {
        self.backend.set_item(key, value)
    }

    pub fn remove(&self, key: &str) -> Result<(), AppError> {
        self.verified.borrow_mut().remove(key);
        self.backend.remove_item(key)
    }

    /// Load a typed document, migrating it on the first read this session
    pub fn load<T: StoredDocument>(&self) -> T {
        let raw = match self.read_json(T::KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return T::default_document(),
            Err(err) => {
                log::warn!("{err}; using default");
                return T::default_document();
            }
        };

        let data = if self.verified.borrow().contains(T::KEY) {
            Envelope::from_stored(raw).data
        } else {
            let migrated = T::migrator().migrate(raw);
            if migrated.did_migrate {
                let stored = migrated.envelope.clone().into_value();
                match self.set_value(T::KEY, &stored) {
                    Ok(()) => {
                        log::info!(
                            "Persisted migrated `{}` at v{}",
                            T::KEY,
                            migrated.envelope.version
                        );
                        self.mark_verified(T::KEY);
                    }
                    // Leave unverified so the next read migrates again
                    Err(err) => log::warn!("Could not persist migrated `{}`: {err}", T::KEY),
                }
            } else {
                self.mark_verified(T::KEY);
            }
            migrated.envelope.data
        };

        match serde_json::from_value(data) {
            Ok(doc) => doc,
            Err(e) => {
                log::warn!("{}; using default", AppError::parse(T::KEY, e));
                T::default_document()
            }
        }
    }

    pub fn save<T: StoredDocument>(&self, doc: &T) -> Result<(), AppError> {
        let data = serde_json::to_value(doc)
            .map_err(|e| AppError::Storage(format!("encode {}: {e}", T::KEY)))?;
        self.set_value(T::KEY, &Envelope::new(T::VERSION, data).into_value())?;
        self.mark_verified(T::KEY);
        Ok(())
    }

    fn mark_verified(&self, key: &str) {
        self.verified.borrow_mut().insert(key.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde::Deserialize;
    use serde_json::json;
    use std::cell::Cell;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Tally {
        counts: Vec<u32>,
    }

    fn nest_counts(data: Value) -> Value {
        match data {
            Value::Array(items) => json!({ "counts": items }),
            other => other,
        }
    }

    impl StoredDocument for Tally {
        const KEY: &'static str = "tally";
        const VERSION: u32 = 1;

        fn default_document() -> Self {
            Tally { counts: vec![0] }
        }

        fn migrator() -> SchemaMigrator {
            SchemaMigrator::new(Self::VERSION).with_step(0, "nest counts", nest_counts)
        }
    }

    /// Counts writes so tests can see when the store persists
    #[derive(Default)]
    struct CountingStore {
        inner: MemoryStore,
        writes: Cell<usize>,
    }

    impl KeyValueStore for CountingStore {
        fn get_item(&self, key: &str) -> Result<Option<String>, AppError> {
            self.inner.get_item(key)
        }
        fn set_item(&self, key: &str, value: &str) -> Result<(), AppError> {
            self.writes.set(self.writes.get() + 1);
            self.inner.set_item(key, value)
        }
        fn remove_item(&self, key: &str) -> Result<(), AppError> {
            self.inner.remove_item(key)
        }
    }

    #[test]
    fn test_missing_key_returns_default() {
        let store = DocumentStore::in_memory();
        assert_eq!(store.get_value("workouts", json!({})), json!({}));
        assert_eq!(store.load::<Tally>(), Tally::default_document());
    }

    #[test]
    fn test_malformed_json_returns_default() {
        let backend = Rc::new(MemoryStore::new().with_item("tally", "{not json"));
        let store = DocumentStore::new(backend);
        assert_eq!(store.get_value("tally", json!(null)), json!(null));
        assert_eq!(store.load::<Tally>(), Tally::default_document());
    }

    #[test]
    fn test_wrong_shape_returns_default() {
        let backend = Rc::new(
            MemoryStore::new().with_item("tally", r#"{"version":1,"data":{"counts":"x"}}"#),
        );
        let store = DocumentStore::new(backend);
        assert_eq!(store.load::<Tally>(), Tally::default_document());
    }

    #[test]
    fn test_legacy_document_migrated_and_written_back_once() {
        let backend = Rc::new(CountingStore::default());
        backend.inner.set_item("tally", "[3,4]").unwrap();
        let store = DocumentStore::new(backend.clone());

        let first = store.load::<Tally>();
        assert_eq!(first.counts, vec![3, 4]);
        assert_eq!(backend.writes.get(), 1);
        assert_eq!(
            store.get_value("tally", json!(null)),
            json!({ "version": 1, "data": { "counts": [3, 4] } })
        );

        let second = store.load::<Tally>();
        assert_eq!(second, first);
        assert_eq!(backend.writes.get(), 1);
    }

    #[test]
    fn test_save_then_load() {
        let store = DocumentStore::in_memory();
        let tally = Tally {
            counts: vec![1, 2, 3],
        };
        store.save(&tally).unwrap();
        assert_eq!(store.load::<Tally>(), tally);
    }

    #[test]
    fn test_text_preferences() {
        let store = DocumentStore::in_memory();
        assert_eq!(store.get_text("nutritionFilter"), None);
        store.set_text("nutritionFilter", "protein").unwrap();
        assert_eq!(store.get_text("nutritionFilter").as_deref(), Some("protein"));
        store.remove("nutritionFilter").unwrap();
        assert!(!store.contains("nutritionFilter"));
    }

    fn arb_json() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::from),
            any::<i64>().prop_map(Value::from),
            ".{0,8}".prop_map(Value::from),
        ];
        leaf.prop_recursive(3, 32, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                prop::collection::btree_map(".{0,6}", inner, 0..4)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        })
    }

    proptest! {
        #[test]
        fn prop_empty_store_yields_default(key in "[a-zA-Z-]{1,16}", default in arb_json()) {
            let store = DocumentStore::in_memory();
            prop_assert_eq!(store.get_value(&key, default.clone()), default);
        }

        #[test]
        fn prop_set_get_round_trip(key in "[a-zA-Z-]{1,16}", doc in arb_json()) {
            let store = DocumentStore::in_memory();
            store.set_value(&key, &doc).unwrap();
            prop_assert_eq!(store.get_value(&key, Value::Null), doc);
        }
    }
}
