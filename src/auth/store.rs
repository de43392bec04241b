//! Namespaced key/value state shared by the rate limiters.
//!
//! Each limiter owns one namespace holding a JSON value that is lazily seeded
//! from a factory default on first read and kept resident for the lifetime of
//! the process, so throttle history survives logical module reloads in the
//! host runtime. `reset` exists for test isolation only.
//!
//! `update` runs deserialize, mutate, and serialize under a single lock; the
//! limiters use it as an atomic increment-with-ceiling so two concurrent
//! requests for the same key cannot both observe "below max" and both be
//! admitted.

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Failures while (de)serializing namespace state.
///
/// Surfaced to the HTTP layer as an internal error; a throttle update is
/// never silently dropped.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("state for namespace {namespace:?} could not be decoded: {source}")]
    Decode {
        namespace: String,
        source: serde_json::Error,
    },
    #[error("state for namespace {namespace:?} could not be encoded: {source}")]
    Encode {
        namespace: String,
        source: serde_json::Error,
    },
}

/// In-process namespaced JSON store.
#[derive(Debug, Default)]
pub struct StateStore {
    entries: Mutex<HashMap<String, Value>>,
}

impl StateStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the value for `namespace`, seeding it from `default` on first
    /// access in this process lifetime.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the cached value cannot be decoded as `T` or
    /// the seeded default cannot be encoded.
    pub fn read<T>(&self, namespace: &str, default: impl FnOnce() -> T) -> Result<T, StoreError>
    where
        T: Serialize + DeserializeOwned,
    {
        let mut entries = self.lock();
        match entries.get(namespace) {
            Some(value) => decode(namespace, value.clone()),
            None => {
                let seeded = default();
                entries.insert(namespace.to_string(), encode(namespace, &seeded)?);
                Ok(seeded)
            }
        }
    }

    /// Persist `value` for `namespace`, replacing whatever was cached.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if `value` cannot be encoded.
    pub fn write<T>(&self, namespace: &str, value: &T) -> Result<(), StoreError>
    where
        T: Serialize,
    {
        let encoded = encode(namespace, value)?;
        self.lock().insert(namespace.to_string(), encoded);
        Ok(())
    }

    /// Atomically read-modify-write the value for `namespace`.
    ///
    /// The namespace is seeded from `default` if absent, `mutate` runs while
    /// the store lock is held, and the result is persisted before the lock is
    /// released. This is the only safe way to do check-then-act on shared
    /// limiter state.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on decode or encode failure; `mutate` is not
    /// run when the cached value cannot be decoded.
    pub fn update<T, R>(
        &self,
        namespace: &str,
        default: impl FnOnce() -> T,
        mutate: impl FnOnce(&mut T) -> R,
    ) -> Result<R, StoreError>
    where
        T: Serialize + DeserializeOwned,
    {
        let mut entries = self.lock();
        let mut current: T = match entries.get(namespace) {
            Some(value) => decode(namespace, value.clone())?,
            None => default(),
        };
        let result = mutate(&mut current);
        entries.insert(namespace.to_string(), encode(namespace, &current)?);
        Ok(result)
    }

    /// Drop the cached value so the next `read` reseeds from its factory
    /// default. Test isolation only.
    pub fn reset(&self, namespace: &str) {
        self.lock().remove(namespace);
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Value>> {
        // A panic while holding the lock leaves plain data behind, not a
        // broken invariant; recover the guard instead of propagating poison.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn decode<T: DeserializeOwned>(namespace: &str, value: Value) -> Result<T, StoreError> {
    serde_json::from_value(value).map_err(|source| StoreError::Decode {
        namespace: namespace.to_string(),
        source,
    })
}

fn encode<T: Serialize>(namespace: &str, value: &T) -> Result<Value, StoreError> {
    serde_json::to_value(value).map_err(|source| StoreError::Encode {
        namespace: namespace.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    type Table = HashMap<String, u32>;

    #[test]
    fn read_seeds_factory_default_once() -> Result<(), StoreError> {
        let store = StateStore::new();
        let table: Table = store.read("test.namespace", Table::new)?;
        assert!(table.is_empty());

        store.update("test.namespace", Table::new, |table| {
            table.insert("key".to_string(), 1);
        })?;

        // A later read sees the mutation, not a fresh default.
        let table: Table = store.read("test.namespace", Table::new)?;
        assert_eq!(table.get("key"), Some(&1));
        Ok(())
    }

    #[test]
    fn write_is_visible_to_subsequent_reads() -> Result<(), StoreError> {
        let store = StateStore::new();
        let mut table = Table::new();
        table.insert("ip".to_string(), 3);
        store.write("test.namespace", &table)?;

        let read_back: Table = store.read("test.namespace", Table::new)?;
        assert_eq!(read_back.get("ip"), Some(&3));
        Ok(())
    }

    #[test]
    fn reset_drops_cached_state() -> Result<(), StoreError> {
        let store = StateStore::new();
        store.update("test.namespace", Table::new, |table| {
            table.insert("key".to_string(), 9);
        })?;

        store.reset("test.namespace");

        let table: Table = store.read("test.namespace", Table::new)?;
        assert!(table.is_empty());
        Ok(())
    }

    #[test]
    fn namespaces_are_independent() -> Result<(), StoreError> {
        let store = StateStore::new();
        store.update("first", Table::new, |table| {
            table.insert("key".to_string(), 1);
        })?;
        store.update("second", Table::new, |table| {
            table.insert("key".to_string(), 2);
        })?;

        let first: Table = store.read("first", Table::new)?;
        let second: Table = store.read("second", Table::new)?;
        assert_eq!(first.get("key"), Some(&1));
        assert_eq!(second.get("key"), Some(&2));
        Ok(())
    }

    #[test]
    fn update_returns_mutate_result() -> Result<(), StoreError> {
        let store = StateStore::new();
        let len = store.update("test.namespace", Table::new, |table| {
            table.insert("a".to_string(), 1);
            table.insert("b".to_string(), 2);
            table.len()
        })?;
        assert_eq!(len, 2);
        Ok(())
    }
}
