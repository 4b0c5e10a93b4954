//! The proxy facade: typed lifecycle dispatch over the core components.
//!
//! Hosts deliver lifecycle signals as [`LifecycleEvent`] values — a tagged
//! enum rather than stringly-typed event names — and either call the typed
//! handler methods directly or funnel everything through
//! [`Proxy::dispatch`]. Each intercepted request produces exactly one
//! response or exactly one error.

use std::collections::BTreeSet;
use std::sync::Arc;

use bytes::Bytes;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::fetch::Fetcher;
use crate::generation::{GenerationConfig, GenerationManager, InstallError};
use crate::http::{Request, Response};
use crate::notify::{Notifier, PushPayload};
use crate::router::{StrategyKind, StrategyRouter};
use crate::store::CacheStore;
use crate::strategy::{CacheFirst, NetworkFirst, ResolveError};

pub mod lifeline;

pub use lifeline::Lifeline;

/// A lifecycle signal delivered by the host.
#[derive(Debug, Clone)]
pub enum LifecycleEvent {
    /// Seed the asset generation with the given resource manifest.
    Install { manifest: Vec<String> },
    /// Garbage-collect every generation outside the pinned set.
    Activate,
    /// Resolve one intercepted request.
    Intercept { request: Request },
    /// A push message arrived; the raw payload is forwarded to the notifier.
    Push { data: Bytes },
    /// The user activated a notification.
    NotificationClick { data: Value },
}

/// What handling a lifecycle event produced.
#[derive(Debug)]
pub enum Outcome {
    /// The baseline was installed.
    Installed,
    /// Activation finished; `removed` names the collected generations.
    Activated { removed: BTreeSet<String> },
    /// An intercepted request resolved to a response.
    Responded(Response),
    /// A push or click was forwarded to the notifier.
    Notified,
    /// A push or click arrived but no notifier is configured.
    Ignored,
}

/// Top-level failure of a lifecycle operation.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("install failed: {0}")]
    Install(#[from] InstallError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

/// Error building a [`Proxy`] from an incomplete [`ProxyBuilder`].
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("no cache store was provided")]
    MissingStore,

    #[error("no fetcher was provided")]
    MissingFetcher,
}

/// The intercepting cache proxy.
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use offcache::{MemoryStore, Proxy, Request};
/// # struct MyFetcher;
/// # #[async_trait::async_trait]
/// # impl offcache::Fetcher for MyFetcher {
/// #     async fn fetch(&self, _: &Request) -> Result<offcache::Response, offcache::FetchError> {
/// #         unimplemented!()
/// #     }
/// # }
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let proxy = Proxy::builder()
///         .store(Arc::new(MemoryStore::new()))
///         .fetcher(Arc::new(MyFetcher))
///         .build()?;
///
///     proxy.on_install(&["/index.html".into(), "/manifest.json".into()]).await?;
///     proxy.on_activate().await;
///
///     let response = proxy.intercept(&Request::get("/index.html")).await?;
///     proxy.lifeline().settled().await; // flush deferred cache writes
///     # let _ = response;
///     Ok(())
/// }
/// ```
pub struct Proxy {
    router: StrategyRouter,
    manager: GenerationManager,
    network_first: NetworkFirst,
    cache_first: CacheFirst,
    lifeline: Lifeline,
    notifier: Option<Arc<dyn Notifier>>,
}

impl Proxy {
    /// Starts building a proxy; a store and a fetcher are required.
    pub fn builder() -> ProxyBuilder {
        ProxyBuilder::default()
    }

    /// The lifeline tracking this proxy's deferred cache writes.
    ///
    /// Hosts must await [`Lifeline::settled`] before tearing the worker
    /// down, or in-flight writes may be truncated.
    pub fn lifeline(&self) -> &Lifeline {
        &self.lifeline
    }

    /// Seeds the asset generation; all-or-nothing (see
    /// [`GenerationManager::on_install`]).
    ///
    /// # Errors
    ///
    /// [`ProxyError::Install`] naming the first resource that failed.
    pub async fn on_install(&self, manifest: &[String]) -> Result<(), ProxyError> {
        Ok(self.manager.on_install(manifest).await?)
    }

    /// Garbage-collects generations outside the pinned set; best-effort.
    ///
    /// Returns the names that were removed.
    pub async fn on_activate(&self) -> BTreeSet<String> {
        self.manager
            .on_activate(&self.manager.config().keep_set())
            .await
    }

    /// Resolves one intercepted request through the routed strategy.
    ///
    /// # Errors
    ///
    /// [`ProxyError::Resolve`] when neither the network nor the cache could
    /// produce a response.
    pub async fn intercept(&self, request: &Request) -> Result<Response, ProxyError> {
        let kind = self.router.route(request);
        debug!(%request, strategy = ?kind, "intercepted");
        let response = match kind {
            StrategyKind::NetworkFirst => self.network_first.resolve(request).await?,
            StrategyKind::CacheFirst => self.cache_first.resolve(request).await?,
        };
        Ok(response)
    }

    /// Decodes a push payload and forwards it to the notifier, if any.
    ///
    /// Returns `true` when a notifier consumed the push.
    pub async fn on_push(&self, data: &[u8]) -> bool {
        match &self.notifier {
            Some(notifier) => {
                notifier.show(PushPayload::decode(data)).await;
                true
            }
            None => false,
        }
    }

    /// Forwards a notification activation to the notifier, if any.
    pub async fn on_notification_click(&self, data: Value) -> bool {
        match &self.notifier {
            Some(notifier) => {
                notifier.activated(data).await;
                true
            }
            None => false,
        }
    }

    /// Handles one lifecycle event, whichever kind it is.
    ///
    /// # Errors
    ///
    /// Propagates the typed handler's error; see [`ProxyError`].
    pub async fn dispatch(&self, event: LifecycleEvent) -> Result<Outcome, ProxyError> {
        match event {
            LifecycleEvent::Install { manifest } => {
                self.on_install(&manifest).await?;
                Ok(Outcome::Installed)
            }
            LifecycleEvent::Activate => {
                let removed = self.on_activate().await;
                Ok(Outcome::Activated { removed })
            }
            LifecycleEvent::Intercept { request } => {
                Ok(Outcome::Responded(self.intercept(&request).await?))
            }
            LifecycleEvent::Push { data } => Ok(if self.on_push(&data).await {
                Outcome::Notified
            } else {
                Outcome::Ignored
            }),
            LifecycleEvent::NotificationClick { data } => {
                Ok(if self.on_notification_click(data).await {
                    Outcome::Notified
                } else {
                    Outcome::Ignored
                })
            }
        }
    }
}

/// Assembles a [`Proxy`] from injected capabilities.
#[derive(Default)]
pub struct ProxyBuilder {
    store: Option<Arc<dyn CacheStore>>,
    fetcher: Option<Arc<dyn Fetcher>>,
    router: Option<StrategyRouter>,
    generations: Option<GenerationConfig>,
    notifier: Option<Arc<dyn Notifier>>,
}

impl ProxyBuilder {
    /// The storage backend all generations live in. Required.
    #[must_use]
    pub fn store(mut self, store: Arc<dyn CacheStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// The network capability. Required.
    #[must_use]
    pub fn fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Overrides the default router (`/api/` → Network-First).
    #[must_use]
    pub fn router(mut self, router: StrategyRouter) -> Self {
        self.router = Some(router);
        self
    }

    /// Pins the generation names (defaults: `asset-v1`, `api-v1`).
    #[must_use]
    pub fn generations(mut self, config: GenerationConfig) -> Self {
        self.generations = Some(config);
        self
    }

    /// The notification-display collaborator. Optional; without one, push
    /// events are ignored.
    #[must_use]
    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Builds the proxy.
    ///
    /// # Errors
    ///
    /// [`BuildError`] when the store or fetcher is missing.
    pub fn build(self) -> Result<Proxy, BuildError> {
        let store = self.store.ok_or(BuildError::MissingStore)?;
        let fetcher = self.fetcher.ok_or(BuildError::MissingFetcher)?;
        let router = self.router.unwrap_or_default();
        let generations = self.generations.unwrap_or_default();
        let lifeline = Lifeline::new();

        let network_first = NetworkFirst::new(
            Arc::clone(&store),
            Arc::clone(&fetcher),
            generations.api(),
            lifeline.clone(),
        );
        let cache_first = CacheFirst::new(
            Arc::clone(&store),
            Arc::clone(&fetcher),
            generations.asset(),
            lifeline.clone(),
        );
        let manager = GenerationManager::new(store, fetcher, generations);

        Ok(Proxy {
            router,
            manager,
            network_first,
            cache_first,
            lifeline,
            notifier: self.notifier,
        })
    }
}
