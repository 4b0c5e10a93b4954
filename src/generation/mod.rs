//! Cache generation lifecycle.
//!
//! A generation is a named, immutable snapshot of cached entries, rotated
//! wholesale and never patched in place. [`GenerationManager`] populates the
//! asset generation at install time and garbage-collects obsolete
//! generations at activation time. At most one generation per class (asset
//! vs API) is current; everything else is garbage awaiting the next
//! activation.

use std::collections::BTreeSet;
use std::sync::Arc;

use futures::future::join_all;
use thiserror::Error;
use tracing::{info, warn};

use crate::fetch::{FetchError, Fetcher};
use crate::http::{Request, StatusCode};
use crate::store::{CacheStore, RequestKey, ResponseRecord, StorageError};

/// The currently pinned generation names, one per resource class.
///
/// Bump a name (e.g. `asset-v1` → `asset-v2`) to retire every entry of that
/// class on the next activation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationConfig {
    asset: String,
    api: String,
}

impl GenerationConfig {
    /// Pins the asset and API generation names.
    pub fn new(asset: impl Into<String>, api: impl Into<String>) -> Self {
        Self {
            asset: asset.into(),
            api: api.into(),
        }
    }

    /// Name of the current asset generation.
    pub fn asset(&self) -> &str {
        &self.asset
    }

    /// Name of the current API generation.
    pub fn api(&self) -> &str {
        &self.api
    }

    /// The set of generation names activation must not delete.
    pub fn keep_set(&self) -> BTreeSet<String> {
        BTreeSet::from([self.asset.clone(), self.api.clone()])
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self::new("asset-v1", "api-v1")
    }
}

/// A failed install. Installs are all-or-nothing: a partially-seeded
/// baseline is worse than none, so any failure aborts the whole operation
/// and the host should retry.
#[derive(Debug, Error)]
pub enum InstallError {
    #[error("could not open generation {generation}: {source}")]
    Open {
        generation: String,
        #[source]
        source: StorageError,
    },

    #[error("manifest resource {target} could not be fetched: {source}")]
    ManifestFetch {
        target: String,
        #[source]
        source: FetchError,
    },

    #[error("manifest resource {target} answered {status}, refusing to seed it")]
    ManifestStatus { target: String, status: StatusCode },

    #[error("could not seed {key} into generation {generation}: {source}")]
    Seed {
        key: RequestKey,
        generation: String,
        #[source]
        source: StorageError,
    },
}

/// Performs install-time population and activation-time garbage collection.
///
/// Ordering is the host's responsibility: `on_install` must have settled
/// before activation, and `on_activate` before interception begins under the
/// new generation set.
pub struct GenerationManager {
    store: Arc<dyn CacheStore>,
    fetcher: Arc<dyn Fetcher>,
    config: GenerationConfig,
}

impl GenerationManager {
    /// Creates a manager over the injected store and network capabilities.
    pub fn new(
        store: Arc<dyn CacheStore>,
        fetcher: Arc<dyn Fetcher>,
        config: GenerationConfig,
    ) -> Self {
        Self {
            store,
            fetcher,
            config,
        }
    }

    /// The pinned generation names this manager installs and protects.
    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    /// Seeds the asset generation with every resource in `manifest`.
    ///
    /// Resources are fetched in manifest order and only written once all of
    /// them have arrived with a success status. On any failure the asset
    /// generation is torn down again so the store is left with no
    /// half-seeded baseline.
    ///
    /// # Errors
    ///
    /// [`InstallError`] naming the first resource that failed; the asset
    /// generation is absent afterwards.
    pub async fn on_install(&self, manifest: &[String]) -> Result<(), InstallError> {
        let generation = self.config.asset();
        let handle = self
            .store
            .open(generation)
            .await
            .map_err(|source| InstallError::Open {
                generation: generation.to_owned(),
                source,
            })?;

        info!(generation, resources = manifest.len(), "install started");

        // Fetch everything before writing anything: a fetch failure must not
        // leave earlier resources behind.
        let mut seeded = Vec::with_capacity(manifest.len());
        for target in manifest {
            let request = Request::get(target.clone());
            let response = match self.fetcher.fetch(&request).await {
                Ok(response) => response,
                Err(source) => {
                    self.abandon(generation).await;
                    return Err(InstallError::ManifestFetch {
                        target: target.clone(),
                        source,
                    });
                }
            };

            if !response.status().is_success() {
                self.abandon(generation).await;
                return Err(InstallError::ManifestStatus {
                    target: target.clone(),
                    status: response.status(),
                });
            }

            seeded.push((
                RequestKey::for_request(&request),
                ResponseRecord::capture(&response),
            ));
        }

        for (key, record) in seeded {
            if let Err(source) = self.store.put(&handle, key.clone(), record).await {
                self.abandon(generation).await;
                return Err(InstallError::Seed {
                    key,
                    generation: generation.to_owned(),
                    source,
                });
            }
        }

        info!(generation, "install complete");
        Ok(())
    }

    /// Deletes every generation whose name is not in `keep`.
    ///
    /// Deletions run concurrently and the call settles only once all of them
    /// have. Garbage collection is best-effort: an individual deletion
    /// failure is logged and never aborts its siblings.
    ///
    /// Returns the names that were actually removed.
    pub async fn on_activate(&self, keep: &BTreeSet<String>) -> BTreeSet<String> {
        let known = self.store.list_generations().await;
        let doomed: Vec<String> = known.difference(keep).cloned().collect();

        let deletions = doomed.into_iter().map(|name| {
            let store = Arc::clone(&self.store);
            async move {
                match store.delete(&name).await {
                    Ok(true) => {
                        info!(generation = %name, "stale generation deleted");
                        Some(name)
                    }
                    Ok(false) => None,
                    Err(error) => {
                        warn!(generation = %name, %error, "failed to delete stale generation");
                        None
                    }
                }
            }
        });

        join_all(deletions).await.into_iter().flatten().collect()
    }

    /// Best-effort teardown of a generation after a failed install.
    async fn abandon(&self, generation: &str) {
        if let Err(error) = self.store.delete(generation).await {
            warn!(generation, %error, "could not tear down generation after failed install");
        }
    }
}
