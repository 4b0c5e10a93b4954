//! Keep-alive accounting for deferred cache writes.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;

/// An explicit "stay alive until this settles" contract.
///
/// The browser equivalent is an ambient `event.waitUntil`; here the core
/// calls [`Lifeline::extend`] with each deferred side-effect (a cache write
/// scheduled behind a response that has already been returned), and the host
/// awaits [`Lifeline::settled`] before tearing the worker down. A host that
/// skips `settled` may truncate a cache write — per-key atomicity at the
/// store layer means the worst outcome is a missing entry, never a corrupt
/// one.
///
/// # Examples
///
/// ```rust,no_run
/// use offcache::proxy::Lifeline;
///
/// #[tokio::main]
/// async fn main() {
///     let lifeline = Lifeline::new();
///     lifeline.extend(async {
///         // deferred side-effect
///     });
///     lifeline.settled().await; // safe to tear down now
/// }
/// ```
#[derive(Clone)]
pub struct Lifeline {
    in_flight: Arc<watch::Sender<usize>>,
}

impl Lifeline {
    /// Creates a lifeline with nothing in flight.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0);
        Self {
            in_flight: Arc::new(tx),
        }
    }

    /// Spawns `task` and tracks it until it finishes.
    ///
    /// Must be called within a Tokio runtime. The task is detached: its
    /// outcome is not observable here, only its completion. A task that
    /// panics still counts as finished — the lifeline must settle even when
    /// a side-effect blows up, or the host could never tear down.
    pub fn extend<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.in_flight.send_modify(|n| *n += 1);
        let guard = SettleGuard {
            in_flight: Arc::clone(&self.in_flight),
        };
        tokio::spawn(async move {
            let _guard = guard;
            task.await;
        });
    }

    /// Resolves once every extended task has finished.
    ///
    /// Tasks extended *after* this call starts waiting are awaited too; the
    /// lifeline settles only when the in-flight count reaches zero.
    pub async fn settled(&self) {
        let mut rx = self.in_flight.subscribe();
        // The sender lives in self, so the channel cannot close under us.
        let _ = rx.wait_for(|count| *count == 0).await;
    }

    /// Number of extended tasks still running.
    pub fn in_flight(&self) -> usize {
        *self.in_flight.borrow()
    }
}

impl Default for Lifeline {
    fn default() -> Self {
        Self::new()
    }
}

/// Decrements the in-flight count when the tracked task ends, however it
/// ends. Running the decrement from `Drop` keeps the accounting correct
/// across panics and unwinds inside the task body.
struct SettleGuard {
    in_flight: Arc<watch::Sender<usize>>,
}

impl Drop for SettleGuard {
    fn drop(&mut self) {
        self.in_flight.send_modify(|n| *n -= 1);
    }
}
