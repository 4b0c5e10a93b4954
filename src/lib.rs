//! # offcache
//!
//! An embeddable offline-first intercepting cache proxy.
//!
//! offcache sits between an application and the network. The host delivers
//! lifecycle signals — install, activate, intercept-request — and the proxy
//! maintains a versioned, named cache of byte responses: the install step
//! seeds a baseline of critical resources, activation rotates out stale
//! cache generations, and every intercepted request is routed to either a
//! Network-First (API traffic) or Cache-First (assets) resolution strategy.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use offcache::{MemoryStore, Proxy, Request};
//! # struct HostFetcher;
//! # #[async_trait::async_trait]
//! # impl offcache::Fetcher for HostFetcher {
//! #     async fn fetch(&self, _: &Request) -> Result<offcache::Response, offcache::FetchError> {
//! #         unimplemented!()
//! #     }
//! # }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let proxy = Proxy::builder()
//!         .store(Arc::new(MemoryStore::new()))
//!         .fetcher(Arc::new(HostFetcher))
//!         .build()?;
//!
//!     proxy.on_install(&["/index.html".into(), "/manifest.json".into()]).await?;
//!     proxy.on_activate().await;
//!
//!     let response = proxy.intercept(&Request::get("/index.html")).await?;
//!     println!("{}", response.status());
//!
//!     proxy.lifeline().settled().await; // flush deferred cache writes
//!     Ok(())
//! }
//! ```

pub mod fetch;
pub mod generation;
pub mod http;
pub mod notify;
pub mod proxy;
pub mod router;
pub mod store;
pub mod strategy;

// ── Convenience re-exports ────────────────────────────────────────────────────
pub use fetch::{FetchError, Fetcher};
pub use generation::{GenerationConfig, GenerationManager, InstallError};
pub use http::{Headers, Method, Request, Response, ResponseKind, StatusCode};
pub use notify::{Notifier, PushPayload};
pub use proxy::{LifecycleEvent, Lifeline, Outcome, Proxy, ProxyBuilder, ProxyError};
pub use router::{StrategyKind, StrategyRouter};
pub use store::{CacheHandle, CacheStore, MemoryStore, RequestKey, ResponseRecord, StorageError};
pub use strategy::{CacheFirst, NetworkFirst, ResolveError};
