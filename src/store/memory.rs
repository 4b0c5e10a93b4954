//! In-memory [`CacheStore`] backend.
//!
//! The default store for tests and for hosts that accept losing the cache on
//! restart. An optional byte quota makes the quota-exceeded path exercisable
//! without a real constrained backend.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::{CacheHandle, CacheStore, RequestKey, ResponseRecord, StorageError};

#[derive(Default)]
struct Shelves {
    generations: HashMap<String, HashMap<RequestKey, ResponseRecord>>,
    used_bytes: usize,
}

/// A heap-backed cache store guarded by a single `RwLock`.
///
/// Reads take the shared lock; `put` and `delete` take the exclusive lock,
/// which gives each write the per-key atomicity the [`CacheStore`] contract
/// requires.
///
/// # Examples
///
/// ```rust,no_run
/// use offcache::store::{CacheStore, MemoryStore, RequestKey, ResponseRecord};
/// use offcache::http::{Request, Response, StatusCode};
///
/// #[tokio::main]
/// async fn main() {
///     let store = MemoryStore::new();
///     let handle = store.open("asset-v1").await.unwrap();
///     let key = RequestKey::for_request(&Request::get("/index.html"));
///     let record = ResponseRecord::capture(&Response::new(StatusCode::OK).body("hi"));
///     store.put(&handle, key.clone(), record).await.unwrap();
///     assert!(store.lookup(&key).await.is_some());
/// }
/// ```
pub struct MemoryStore {
    shelves: RwLock<Shelves>,
    quota_bytes: Option<usize>,
}

impl MemoryStore {
    /// Creates an unbounded in-memory store.
    pub fn new() -> Self {
        Self {
            shelves: RwLock::new(Shelves::default()),
            quota_bytes: None,
        }
    }

    /// Creates a store that refuses writes once stored bodies exceed `bytes`.
    pub fn with_quota(bytes: usize) -> Self {
        Self {
            shelves: RwLock::new(Shelves::default()),
            quota_bytes: Some(bytes),
        }
    }

    /// Total bytes of stored response bodies.
    pub async fn used_bytes(&self) -> usize {
        self.shelves.read().await.used_bytes
    }

    /// Number of entries in `generation`, or `None` if it does not exist.
    pub async fn entry_count(&self, generation: &str) -> Option<usize> {
        let shelves = self.shelves.read().await;
        shelves.generations.get(generation).map(HashMap::len)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn open(&self, generation: &str) -> Result<CacheHandle, StorageError> {
        let mut shelves = self.shelves.write().await;
        shelves.generations.entry(generation.to_owned()).or_default();
        debug!(generation, "generation opened");
        Ok(CacheHandle::new(generation))
    }

    async fn put(
        &self,
        handle: &CacheHandle,
        key: RequestKey,
        record: ResponseRecord,
    ) -> Result<(), StorageError> {
        let mut shelves = self.shelves.write().await;

        let replaced_len = shelves
            .generations
            .get(handle.generation())
            .and_then(|entries| entries.get(&key))
            .map(|existing| existing.body_len())
            .unwrap_or(0);

        let projected = shelves.used_bytes - replaced_len + record.body_len();
        if let Some(quota) = self.quota_bytes {
            if projected > quota {
                return Err(StorageError::QuotaExceeded {
                    generation: handle.generation().to_owned(),
                });
            }
        }

        shelves.used_bytes = projected;
        shelves
            .generations
            .entry(handle.generation().to_owned())
            .or_default()
            .insert(key, record);
        Ok(())
    }

    async fn lookup(&self, key: &RequestKey) -> Option<ResponseRecord> {
        let shelves = self.shelves.read().await;
        shelves
            .generations
            .values()
            .find_map(|entries| entries.get(key))
            .cloned()
    }

    async fn lookup_in(&self, generation: &str, key: &RequestKey) -> Option<ResponseRecord> {
        let shelves = self.shelves.read().await;
        shelves
            .generations
            .get(generation)
            .and_then(|entries| entries.get(key))
            .cloned()
    }

    async fn delete(&self, generation: &str) -> Result<bool, StorageError> {
        let mut shelves = self.shelves.write().await;
        match shelves.generations.remove(generation) {
            Some(entries) => {
                let freed: usize = entries.values().map(ResponseRecord::body_len).sum();
                shelves.used_bytes -= freed;
                debug!(generation, freed, "generation deleted");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_generations(&self) -> BTreeSet<String> {
        let shelves = self.shelves.read().await;
        shelves.generations.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{Request, Response, StatusCode};

    fn key(target: &str) -> RequestKey {
        RequestKey::for_request(&Request::get(target))
    }

    fn record(body: &str) -> ResponseRecord {
        ResponseRecord::capture(&Response::new(StatusCode::OK).body(body.to_owned()))
    }

    #[tokio::test]
    async fn open_is_idempotent() {
        let store = MemoryStore::new();
        let first = store.open("asset-v1").await.unwrap();
        let again = store.open("asset-v1").await.unwrap();
        assert_eq!(first, again);
        assert_eq!(store.list_generations().await.len(), 1);
    }

    #[tokio::test]
    async fn put_overwrites_prior_record() {
        let store = MemoryStore::new();
        let handle = store.open("api-v1").await.unwrap();
        store.put(&handle, key("/api/cases"), record("old")).await.unwrap();
        store.put(&handle, key("/api/cases"), record("new")).await.unwrap();

        let found = store.lookup(&key("/api/cases")).await.unwrap();
        assert_eq!(found.body_bytes().as_ref(), b"new");
    }

    #[tokio::test]
    async fn scoped_lookup_stays_inside_its_generation() {
        let store = MemoryStore::new();
        let asset = store.open("asset-v1").await.unwrap();
        store.put(&asset, key("/shared"), record("asset copy")).await.unwrap();

        assert!(store.lookup_in("api-v1", &key("/shared")).await.is_none());
        assert!(store.lookup_in("asset-v1", &key("/shared")).await.is_some());
        // Cross-generation search still finds it.
        assert!(store.lookup(&key("/shared")).await.is_some());
    }

    #[tokio::test]
    async fn quota_rejects_oversized_write() {
        let store = MemoryStore::with_quota(10);
        let handle = store.open("asset-v1").await.unwrap();

        store.put(&handle, key("/a"), record("12345")).await.unwrap();
        let err = store
            .put(&handle, key("/b"), record("123456789"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::QuotaExceeded { .. }));
        // The failed write left nothing behind.
        assert!(store.lookup(&key("/b")).await.is_none());
        assert_eq!(store.used_bytes().await, 5);
    }

    #[tokio::test]
    async fn overwrite_reclaims_replaced_bytes() {
        let store = MemoryStore::with_quota(10);
        let handle = store.open("asset-v1").await.unwrap();
        store.put(&handle, key("/a"), record("1234567890")).await.unwrap();
        // Same key: the old 10 bytes are released before quota is checked.
        store.put(&handle, key("/a"), record("abcde")).await.unwrap();
        assert_eq!(store.used_bytes().await, 5);
    }

    #[tokio::test]
    async fn delete_removes_generation_and_frees_bytes() {
        let store = MemoryStore::new();
        let handle = store.open("asset-v1").await.unwrap();
        store.put(&handle, key("/index.html"), record("page")).await.unwrap();

        assert!(store.delete("asset-v1").await.unwrap());
        assert!(!store.delete("asset-v1").await.unwrap());
        assert!(store.lookup(&key("/index.html")).await.is_none());
        assert_eq!(store.used_bytes().await, 0);
    }
}
