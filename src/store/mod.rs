//! Persistent byte-blob storage, namespaced by cache generation.
//!
//! [`CacheStore`] is the capability the rest of the crate is written
//! against; the browser-style global cache singleton becomes an injected
//! `Arc<dyn CacheStore>`, so tests run against [`MemoryStore`] without a
//! real storage backend.
//!
//! Entries never expire here. Staleness is resolved only by generation
//! rotation (see [`crate::generation`]); the capture timestamp on a
//! [`ResponseRecord`] exists for eviction heuristics, not TTLs.

use std::collections::BTreeSet;
use std::fmt;
use std::time::Instant;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use crate::http::{Headers, Request, Response, StatusCode};

pub mod memory;

pub use memory::MemoryStore;

/// Errors surfaced by a cache storage backend.
///
/// Write failures are non-fatal by contract: a response is still usable even
/// when caching it fails, so callers log and move on. A failed
/// [`CacheStore::open`] is fatal because nothing can be seeded into a
/// generation that does not exist.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage quota exceeded writing to generation {generation}")]
    QuotaExceeded { generation: String },

    #[error("storage backend failure: {reason}")]
    Backend { reason: String },
}

/// Canonical identity of a cached response: method plus normalized target.
///
/// Derived with [`RequestKey::for_request`], which applies the normalization
/// rules of [`Request::normalized_target`] so equivalent spellings of one
/// URL share a single entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestKey {
    method: String,
    target: String,
}

impl RequestKey {
    /// Derives the cache key for a request.
    pub fn for_request(request: &Request) -> Self {
        Self {
            method: request.method().as_str().to_owned(),
            target: request.normalized_target(),
        }
    }

    /// The request method component of the key.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// The normalized target component of the key.
    pub fn target(&self) -> &str {
        &self.target
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.target)
    }
}

/// A stored snapshot of a response: status, headers, body, capture time.
#[derive(Debug, Clone)]
pub struct ResponseRecord {
    status: StatusCode,
    headers: Vec<(String, String)>,
    body: Bytes,
    captured_at: Instant,
}

impl ResponseRecord {
    /// Snapshots a response into a storable record.
    ///
    /// The body buffer is shared, not copied; the caller keeps its response.
    pub fn capture(response: &Response) -> Self {
        Self {
            status: response.status(),
            headers: response.headers().to_pairs(),
            body: response.body_bytes().clone(),
            captured_at: Instant::now(),
        }
    }

    /// Rebuilds a response from this record for replay to the host.
    pub fn replay(&self) -> Response {
        Response::new(self.status)
            .headers_from(Headers::from_pairs(self.headers.clone()))
            .body(self.body.clone())
    }

    /// Status code captured with the record.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Stored body bytes.
    pub fn body_bytes(&self) -> &Bytes {
        &self.body
    }

    /// Size of the stored body, used for quota accounting.
    pub fn body_len(&self) -> usize {
        self.body.len()
    }

    /// When the record was captured. Eviction metadata only; nothing in this
    /// crate expires entries by age.
    pub fn captured_at(&self) -> Instant {
        self.captured_at
    }
}

/// Proof that a generation has been opened, scoping subsequent writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheHandle {
    generation: String,
}

impl CacheHandle {
    pub(crate) fn new(generation: impl Into<String>) -> Self {
        Self {
            generation: generation.into(),
        }
    }

    /// The generation this handle writes into.
    pub fn generation(&self) -> &str {
        &self.generation
    }
}

/// A key-value store of response snapshots, namespaced by generation name.
///
/// Implementations must make `put` an atomic overwrite from the caller's
/// perspective: concurrent writers to one key race last-write-wins, but a
/// reader never observes a partial record.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Opens a generation, creating it if absent, and returns a write handle.
    ///
    /// # Errors
    ///
    /// Propagates [`StorageError`] when the generation cannot be created;
    /// this is fatal for the operation that needed it.
    async fn open(&self, generation: &str) -> Result<CacheHandle, StorageError>;

    /// Stores a record under `key` in the handle's generation, replacing any
    /// prior record for that key.
    ///
    /// # Errors
    ///
    /// [`StorageError::QuotaExceeded`] when the backend is out of space.
    /// Callers treat this as non-fatal: the response being cached is still
    /// delivered to the host.
    async fn put(
        &self,
        handle: &CacheHandle,
        key: RequestKey,
        record: ResponseRecord,
    ) -> Result<(), StorageError>;

    /// Searches every known generation for `key`.
    ///
    /// When the key exists in more than one generation the winner is
    /// unspecified at this layer; callers that need determinism use
    /// [`CacheStore::lookup_in`].
    async fn lookup(&self, key: &RequestKey) -> Option<ResponseRecord>;

    /// Looks up `key` in one generation only.
    async fn lookup_in(&self, generation: &str, key: &RequestKey) -> Option<ResponseRecord>;

    /// Deletes an entire generation and everything in it.
    ///
    /// Returns `true` when the generation existed.
    async fn delete(&self, generation: &str) -> Result<bool, StorageError>;

    /// Lists the names of every generation the store knows about.
    async fn list_generations(&self) -> BTreeSet<String>;
}
