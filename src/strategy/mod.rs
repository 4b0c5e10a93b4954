//! The two response-resolution strategies.
//!
//! [`NetworkFirst`] serves API traffic: fresh data when the network is up,
//! the last good snapshot when it is not. [`CacheFirst`] serves assets:
//! within a generation an asset never changes, so a hit skips the network
//! entirely and staleness is resolved only by generation rotation.
//!
//! Both strategies scope their lookups to the generation they are bound to,
//! so a key collision between the asset and API namespaces can never serve
//! a record from the wrong class.
//!
//! Cache writes happen *behind* the response: the caller gets its response
//! immediately and the store of a clone is handed to the [`Lifeline`]. A
//! write failure is logged and swallowed — caching is a best-effort side
//! channel, never a correctness requirement for the primary response.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::fetch::{FetchError, Fetcher};
use crate::http::{Request, Response, ResponseKind, StatusCode};
use crate::proxy::Lifeline;
use crate::store::{CacheStore, RequestKey, ResponseRecord};

/// Terminal failure of a resolution: no response could be produced.
///
/// A cache miss on its own is never an error; only the combination of a
/// rejected fetch and an empty cache is.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Network-First exhausted both the network and the cache. This is the
    /// documented degraded-offline behavior, not a bug.
    #[error("offline and nothing cached for {key}: {source}")]
    Offline {
        key: RequestKey,
        #[source]
        source: FetchError,
    },

    /// Cache-First missed and the network rejected the fetch.
    #[error("cache miss for {key} and the network failed: {source}")]
    Fetch {
        key: RequestKey,
        #[source]
        source: FetchError,
    },
}

/// Dependencies shared by both strategies: the storage and network
/// capabilities, the bound generation, and the lifeline for deferred writes.
struct StrategyCore {
    store: Arc<dyn CacheStore>,
    fetcher: Arc<dyn Fetcher>,
    generation: String,
    lifeline: Lifeline,
}

impl StrategyCore {
    async fn cached(&self, key: &RequestKey) -> Option<ResponseRecord> {
        self.store.lookup_in(&self.generation, key).await
    }

    /// Schedules a cache write behind the already-returned response.
    ///
    /// Runs under the lifeline so the host keeps the worker alive until the
    /// write settles. Failures never reach the caller.
    fn store_behind(&self, key: RequestKey, record: ResponseRecord) {
        let store = Arc::clone(&self.store);
        let generation = self.generation.clone();
        self.lifeline.extend(async move {
            let handle = match store.open(&generation).await {
                Ok(handle) => handle,
                Err(error) => {
                    warn!(%key, %generation, %error, "cache write skipped: generation unavailable");
                    return;
                }
            };
            if let Err(error) = store.put(&handle, key.clone(), record).await {
                warn!(%key, %generation, %error, "response served but not cached");
            }
        });
    }
}

/// Prefer the network, fall back to the cache.
pub struct NetworkFirst {
    core: StrategyCore,
}

impl NetworkFirst {
    /// Binds the strategy to a generation and its capabilities.
    pub fn new(
        store: Arc<dyn CacheStore>,
        fetcher: Arc<dyn Fetcher>,
        generation: impl Into<String>,
        lifeline: Lifeline,
    ) -> Self {
        Self {
            core: StrategyCore {
                store,
                fetcher,
                generation: generation.into(),
                lifeline,
            },
        }
    }

    /// Resolves a request, preferring a live response.
    ///
    /// A 200 response is cached behind the return; any other status passes
    /// through uncached. When the fetch is rejected the bound generation is
    /// consulted, and only a miss there surfaces the failure.
    ///
    /// # Errors
    ///
    /// [`ResolveError::Offline`] when both the network and the cache come up
    /// empty.
    pub async fn resolve(&self, request: &Request) -> Result<Response, ResolveError> {
        let key = RequestKey::for_request(request);

        match self.core.fetcher.fetch(request).await {
            Ok(response) => {
                if response.status() == StatusCode::OK {
                    self.core
                        .store_behind(key, ResponseRecord::capture(&response));
                } else {
                    debug!(%key, status = %response.status(), "pass-through: status not cacheable");
                }
                Ok(response)
            }
            Err(source) => match self.core.cached(&key).await {
                Some(record) => {
                    info!(%key, "network failed, replaying cached snapshot");
                    Ok(record.replay())
                }
                None => Err(ResolveError::Offline { key, source }),
            },
        }
    }
}

/// Prefer the cache, hit the network only on a miss.
pub struct CacheFirst {
    core: StrategyCore,
}

impl CacheFirst {
    /// Binds the strategy to a generation and its capabilities.
    pub fn new(
        store: Arc<dyn CacheStore>,
        fetcher: Arc<dyn Fetcher>,
        generation: impl Into<String>,
        lifeline: Lifeline,
    ) -> Self {
        Self {
            core: StrategyCore {
                store,
                fetcher,
                generation: generation.into(),
                lifeline,
            },
        }
    }

    /// Resolves a request, preferring a stored snapshot.
    ///
    /// A hit is returned with no network round-trip and no freshness check;
    /// entries never expire within a generation. On a miss the network is
    /// consulted and only readable 200 responses are cached — error-kinded,
    /// opaque, and non-200 responses pass through as-is.
    ///
    /// # Errors
    ///
    /// [`ResolveError::Fetch`] when the cache missed and the network
    /// rejected the fetch.
    pub async fn resolve(&self, request: &Request) -> Result<Response, ResolveError> {
        let key = RequestKey::for_request(request);

        if let Some(record) = self.core.cached(&key).await {
            debug!(%key, "cache hit");
            return Ok(record.replay());
        }

        let response = self
            .core
            .fetcher
            .fetch(request)
            .await
            .map_err(|source| ResolveError::Fetch {
                key: key.clone(),
                source,
            })?;

        if response.status() == StatusCode::OK && response.response_kind() == ResponseKind::Basic {
            self.core
                .store_behind(key, ResponseRecord::capture(&response));
        } else {
            debug!(%key, status = %response.status(), "pass-through: response not cacheable");
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::ScriptedFetcher;
    use crate::store::MemoryStore;

    fn key(target: &str) -> RequestKey {
        RequestKey::for_request(&Request::get(target))
    }

    struct Fixture {
        store: Arc<MemoryStore>,
        fetcher: Arc<ScriptedFetcher>,
        lifeline: Lifeline,
    }

    impl Fixture {
        fn new(fetcher: ScriptedFetcher) -> Self {
            crate::fetch::testing::init_tracing();
            Self {
                store: Arc::new(MemoryStore::new()),
                fetcher: Arc::new(fetcher),
                lifeline: Lifeline::new(),
            }
        }

        fn network_first(&self, generation: &str) -> NetworkFirst {
            NetworkFirst::new(
                Arc::clone(&self.store) as Arc<dyn CacheStore>,
                Arc::clone(&self.fetcher) as Arc<dyn Fetcher>,
                generation,
                self.lifeline.clone(),
            )
        }

        fn cache_first(&self, generation: &str) -> CacheFirst {
            CacheFirst::new(
                Arc::clone(&self.store) as Arc<dyn CacheStore>,
                Arc::clone(&self.fetcher) as Arc<dyn Fetcher>,
                generation,
                self.lifeline.clone(),
            )
        }

        async fn seed(&self, generation: &str, target: &str, body: &str) {
            let handle = self.store.open(generation).await.unwrap();
            let record =
                ResponseRecord::capture(&Response::new(StatusCode::OK).body(body.to_owned()));
            self.store.put(&handle, key(target), record).await.unwrap();
        }
    }

    #[tokio::test]
    async fn network_first_caches_a_200_round_trip() {
        let fx = Fixture::new(ScriptedFetcher::offline().ok("/api/cases", "[1,2,3]"));
        let strategy = fx.network_first("api-v1");

        let response = strategy.resolve(&Request::get("/api/cases")).await.unwrap();
        assert_eq!(response.body_bytes().as_ref(), b"[1,2,3]");

        fx.lifeline.settled().await;
        let stored = fx.store.lookup_in("api-v1", &key("/api/cases")).await.unwrap();
        assert_eq!(stored.body_bytes(), response.body_bytes());
    }

    #[tokio::test]
    async fn network_first_passes_non_200_through_uncached() {
        let fx = Fixture::new(
            ScriptedFetcher::offline()
                .respond("/api/cases", Response::new(StatusCode::from(201)).body("created")),
        );
        let strategy = fx.network_first("api-v1");

        let response = strategy.resolve(&Request::get("/api/cases")).await.unwrap();
        assert_eq!(response.status().as_u16(), 201);

        fx.lifeline.settled().await;
        assert!(fx.store.lookup_in("api-v1", &key("/api/cases")).await.is_none());
    }

    #[tokio::test]
    async fn network_first_falls_back_to_cache_on_failure() {
        let fx = Fixture::new(ScriptedFetcher::offline());
        fx.seed("api-v1", "/api/cases", "stale but welcome").await;
        let strategy = fx.network_first("api-v1");

        let response = strategy.resolve(&Request::get("/api/cases")).await.unwrap();
        assert_eq!(response.body_bytes().as_ref(), b"stale but welcome");
    }

    #[tokio::test]
    async fn network_first_with_no_cache_is_a_terminal_miss() {
        let fx = Fixture::new(ScriptedFetcher::offline());
        let strategy = fx.network_first("api-v1");

        let err = strategy.resolve(&Request::get("/api/cases")).await.unwrap_err();
        assert!(matches!(err, ResolveError::Offline { .. }));
    }

    #[tokio::test]
    async fn network_first_fallback_is_scoped_to_its_generation() {
        let fx = Fixture::new(ScriptedFetcher::offline());
        // Same key exists, but only in the asset namespace.
        fx.seed("asset-v1", "/api/cases", "wrong class").await;
        let strategy = fx.network_first("api-v1");

        let err = strategy.resolve(&Request::get("/api/cases")).await.unwrap_err();
        assert!(matches!(err, ResolveError::Offline { .. }));
    }

    #[tokio::test]
    async fn cache_first_hit_never_touches_the_network() {
        let fx = Fixture::new(ScriptedFetcher::offline().ok("/app.js", "fresh"));
        fx.seed("asset-v1", "/app.js", "cached").await;
        let strategy = fx.cache_first("asset-v1");

        let response = strategy.resolve(&Request::get("/app.js")).await.unwrap();
        assert_eq!(response.body_bytes().as_ref(), b"cached");
        assert_eq!(fx.fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn cache_first_miss_fetches_and_caches() {
        let fx = Fixture::new(ScriptedFetcher::offline().ok("/app.js", "bundle"));
        let strategy = fx.cache_first("asset-v1");

        let response = strategy.resolve(&Request::get("/app.js")).await.unwrap();
        assert_eq!(response.body_bytes().as_ref(), b"bundle");

        fx.lifeline.settled().await;
        assert!(fx.store.lookup_in("asset-v1", &key("/app.js")).await.is_some());
        assert_eq!(fx.fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn cache_first_does_not_cache_a_404() {
        let fx = Fixture::new(
            ScriptedFetcher::offline().respond("/missing.png", Response::new(StatusCode::NOT_FOUND)),
        );
        let strategy = fx.cache_first("asset-v1");

        let response = strategy.resolve(&Request::get("/missing.png")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        fx.lifeline.settled().await;
        assert!(fx.store.lookup_in("asset-v1", &key("/missing.png")).await.is_none());
    }

    #[tokio::test]
    async fn cache_first_does_not_cache_opaque_responses() {
        let opaque = Response::new(StatusCode::OK)
            .body("unreadable")
            .kind(ResponseKind::Opaque);
        let fx = Fixture::new(ScriptedFetcher::offline().respond("/cdn.css", opaque));
        let strategy = fx.cache_first("asset-v1");

        let response = strategy.resolve(&Request::get("/cdn.css")).await.unwrap();
        assert_eq!(response.response_kind(), ResponseKind::Opaque);

        fx.lifeline.settled().await;
        assert!(fx.store.lookup_in("asset-v1", &key("/cdn.css")).await.is_none());
    }

    #[tokio::test]
    async fn cache_first_miss_with_failing_network_propagates() {
        let fx = Fixture::new(ScriptedFetcher::offline());
        let strategy = fx.cache_first("asset-v1");

        let err = strategy.resolve(&Request::get("/app.js")).await.unwrap_err();
        assert!(matches!(err, ResolveError::Fetch { .. }));
    }

    #[tokio::test]
    async fn racing_writes_to_one_key_are_last_write_wins() {
        let fx = Fixture::new(ScriptedFetcher::offline().ok("/api/now", "second"));
        fx.seed("api-v1", "/api/now", "first").await;
        let strategy = fx.network_first("api-v1");

        // The fetch succeeds, so the seeded record is overwritten behind the
        // response.
        strategy.resolve(&Request::get("/api/now")).await.unwrap();
        fx.lifeline.settled().await;

        let stored = fx.store.lookup_in("api-v1", &key("/api/now")).await.unwrap();
        assert_eq!(stored.body_bytes().as_ref(), b"second");
    }
}
