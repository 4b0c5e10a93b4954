//! Network collaborator boundary.
//!
//! The proxy never opens sockets itself; the host injects a [`Fetcher`]
//! that performs the actual network round-trip. No timeout is imposed at
//! this seam — a hung fetch blocks that request's task until the transport
//! itself gives up, which is a documented limitation of the design.

use async_trait::async_trait;
use thiserror::Error;

use crate::http::{Request, Response};

/// A failed network round-trip.
///
/// Recoverable in the Network-First strategy (cache fallback); terminal in
/// Cache-First when the cache also missed.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("origin unreachable: {reason}")]
    Unreachable { reason: String },

    #[error("connection interrupted after {bytes_read} bytes")]
    Interrupted { bytes_read: usize },
}

/// The injected network capability.
///
/// `fetch` must resolve to exactly one response or exactly one error; the
/// strategies treat an `Err` as "the network rejected this request" and a
/// synthesized error response (see
/// [`ResponseKind::Error`](crate::http::ResponseKind::Error)) as a response
/// that happens to be unusable for caching.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Performs one network round-trip for `request`.
    async fn fetch(&self, request: &Request) -> Result<Response, FetchError>;
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted [`Fetcher`] fake shared by the strategy, generation, and
    //! proxy tests.

    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use crate::http::{Request, Response, StatusCode};

    use super::{FetchError, Fetcher};

    /// Installs a fmt subscriber so `RUST_LOG` surfaces proxy internals when
    /// a test fails. Idempotent: later calls lose the `try_init` race and
    /// that is fine.
    pub(crate) fn init_tracing() {
        use tracing_subscriber::EnvFilter;

        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    enum Script {
        Respond(Response),
        Fail,
    }

    /// A fetcher that replays canned outcomes keyed by normalized target and
    /// counts every invocation, so tests can assert "the network was never
    /// touched".
    pub(crate) struct ScriptedFetcher {
        scripts: HashMap<String, Script>,
        calls: AtomicUsize,
    }

    impl ScriptedFetcher {
        /// A fetcher with no scripts: every fetch fails as unreachable.
        pub(crate) fn offline() -> Self {
            Self {
                scripts: HashMap::new(),
                calls: AtomicUsize::new(0),
            }
        }

        /// Scripts a 200 response with the given body for `target`.
        pub(crate) fn ok(mut self, target: &str, body: &str) -> Self {
            self.scripts.insert(
                target.to_owned(),
                Script::Respond(Response::new(StatusCode::OK).body(body.to_owned())),
            );
            self
        }

        /// Scripts an arbitrary response for `target`.
        pub(crate) fn respond(mut self, target: &str, response: Response) -> Self {
            self.scripts
                .insert(target.to_owned(), Script::Respond(response));
            self
        }

        /// Scripts a hard network failure for `target`.
        pub(crate) fn fail(mut self, target: &str) -> Self {
            self.scripts.insert(target.to_owned(), Script::Fail);
            self
        }

        /// Number of fetches performed so far.
        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Fetcher for ScriptedFetcher {
        async fn fetch(&self, request: &Request) -> Result<Response, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.scripts.get(&request.normalized_target()) {
                Some(Script::Respond(response)) => Ok(response.clone()),
                Some(Script::Fail) | None => Err(FetchError::Unreachable {
                    reason: format!("no route to {}", request.normalized_target()),
                }),
            }
        }
    }
}
