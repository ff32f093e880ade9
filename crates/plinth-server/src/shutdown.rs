//! Graceful shutdown coordination.
//!
//! [`ShutdownSignal`] is a cloneable one-shot trigger that remembers why the
//! server is stopping. [`ConnectionTracker`] counts live connections so the
//! shutdown sequence knows when they have all finished.
//!
//! # Example
//!
//! ```rust
//! use plinth_server::{ShutdownReason, ShutdownSignal};
//!
//! # tokio_test::block_on(async {
//! let shutdown = ShutdownSignal::new();
//! let waiter = shutdown.clone();
//!
//! shutdown.trigger(ShutdownReason::Requested);
//! assert_eq!(waiter.recv().await, ShutdownReason::Requested);
//! # });
//! ```

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{watch, Notify};

use crate::signal::Signal;

/// Why the server is shutting down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// A registered OS signal arrived.
    Signal(Signal),
    /// [`ShutdownSignal::trigger`] was called by the application.
    Requested,
    /// The accept loop failed.
    ServerError,
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Signal(signal) => write!(f, "signal {signal}"),
            Self::Requested => f.write_str("requested"),
            Self::ServerError => f.write_str("server error"),
        }
    }
}

/// A signal that can be used to trigger and await graceful shutdown.
///
/// Clones share state. The first [`trigger`](Self::trigger) wins; later
/// calls are ignored and do not change the reason.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    state: Arc<watch::Sender<Option<ShutdownReason>>>,
}

impl ShutdownSignal {
    /// Creates an untriggered signal.
    #[must_use]
    pub fn new() -> Self {
        let (state, _) = watch::channel(None);
        Self {
            state: Arc::new(state),
        }
    }

    /// Triggers shutdown. Returns `true` if this call was the one that
    /// triggered it.
    pub fn trigger(&self, reason: ShutdownReason) -> bool {
        self.state.send_if_modified(|state| {
            if state.is_some() {
                return false;
            }
            *state = Some(reason);
            true
        })
    }

    /// Returns `true` if shutdown has been triggered.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.state.borrow().is_some()
    }

    /// Returns the reason, once triggered.
    #[must_use]
    pub fn reason(&self) -> Option<ShutdownReason> {
        *self.state.borrow()
    }

    /// Returns a future that completes with the reason once shutdown is
    /// triggered, immediately if it already was.
    ///
    /// The future does not borrow `self`.
    pub fn recv(&self) -> impl Future<Output = ShutdownReason> + Send + 'static {
        let state = Arc::clone(&self.state);
        async move {
            let mut receiver = state.subscribe();
            let reason = match receiver.wait_for(Option::is_some).await {
                Ok(reason) => *reason,
                Err(_) => None,
            };
            // The sender lives in `state`, so the channel cannot close while
            // this future waits.
            reason.unwrap_or(ShutdownReason::Requested)
        }
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Counts live connections.
///
/// # Example
///
/// ```rust
/// use plinth_server::ConnectionTracker;
///
/// let tracker = ConnectionTracker::new();
///
/// let guard = tracker.acquire();
/// assert_eq!(tracker.active_connections(), 1);
///
/// drop(guard);
/// assert_eq!(tracker.active_connections(), 0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConnectionTracker {
    inner: Arc<TrackerInner>,
}

#[derive(Debug, Default)]
struct TrackerInner {
    active: AtomicUsize,
    idle: Notify,
}

impl ConnectionTracker {
    /// Creates a tracker with no connections.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a connection; it counts as live until the guard drops.
    #[must_use]
    pub fn acquire(&self) -> ConnectionGuard {
        self.inner.active.fetch_add(1, Ordering::SeqCst);
        ConnectionGuard {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Returns the number of live connections.
    #[must_use]
    pub fn active_connections(&self) -> usize {
        self.inner.active.load(Ordering::SeqCst)
    }

    /// Waits until no connection is live.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            tokio::pin!(notified);
            // Register interest before checking, so a guard dropped between
            // the check and the await still wakes us.
            notified.as_mut().enable();

            if self.active_connections() == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// Keeps a connection counted in its [`ConnectionTracker`].
#[derive(Debug)]
pub struct ConnectionGuard {
    inner: Arc<TrackerInner>,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        if self.inner.active.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.inner.idle.notify_waiters();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_shutdown_signal_new() {
        let signal = ShutdownSignal::new();
        assert!(!signal.is_shutdown());
        assert_eq!(signal.reason(), None);
    }

    #[test]
    fn test_first_reason_wins() {
        let signal = ShutdownSignal::new();
        assert!(signal.trigger(ShutdownReason::Signal(Signal::Terminate)));
        assert!(!signal.trigger(ShutdownReason::Requested));

        assert!(signal.is_shutdown());
        assert_eq!(
            signal.reason(),
            Some(ShutdownReason::Signal(Signal::Terminate))
        );
    }

    #[test]
    fn test_clones_share_state() {
        let signal1 = ShutdownSignal::new();
        let signal2 = signal1.clone();

        signal1.trigger(ShutdownReason::Requested);
        assert!(signal2.is_shutdown());
    }

    #[tokio::test]
    async fn test_recv_completes_when_triggered() {
        let signal = ShutdownSignal::new();
        let trigger = signal.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.trigger(ShutdownReason::ServerError);
        });

        let reason = tokio::time::timeout(Duration::from_secs(1), signal.recv())
            .await
            .expect("recv should complete");
        assert_eq!(reason, ShutdownReason::ServerError);
    }

    #[tokio::test]
    async fn test_recv_completes_immediately_if_triggered() {
        let signal = ShutdownSignal::new();
        signal.trigger(ShutdownReason::Requested);

        tokio::time::timeout(Duration::from_millis(10), signal.recv())
            .await
            .expect("recv should complete immediately");
    }

    #[tokio::test]
    async fn test_recv_outlives_signal() {
        let signal = ShutdownSignal::new();
        let trigger = signal.clone();
        let waiting = signal.recv();
        drop(signal);

        trigger.trigger(ShutdownReason::Requested);
        assert_eq!(waiting.await, ShutdownReason::Requested);
    }

    #[test]
    fn test_tracker_counts() {
        let tracker = ConnectionTracker::new();
        let guard1 = tracker.acquire();
        let guard2 = tracker.acquire();
        assert_eq!(tracker.active_connections(), 2);

        drop(guard1);
        assert_eq!(tracker.active_connections(), 1);

        drop(guard2);
        assert_eq!(tracker.active_connections(), 0);
    }

    #[tokio::test]
    async fn test_wait_idle_immediate() {
        let tracker = ConnectionTracker::new();
        tokio::time::timeout(Duration::from_millis(10), tracker.wait_idle())
            .await
            .expect("wait_idle should complete immediately");
    }

    #[tokio::test]
    async fn test_wait_idle_after_last_guard() {
        let tracker = ConnectionTracker::new();
        let guards: Vec<_> = (0..3).map(|_| tracker.acquire()).collect();

        let waiter = tracker.clone();
        let wait_handle = tokio::spawn(async move { waiter.wait_idle().await });

        tokio::spawn(async move {
            for guard in guards {
                tokio::time::sleep(Duration::from_millis(5)).await;
                drop(guard);
            }
        });

        tokio::time::timeout(Duration::from_secs(1), wait_handle)
            .await
            .expect("wait should complete")
            .expect("task should not panic");
        assert_eq!(tracker.active_connections(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_idle_times_out_while_busy() {
        let tracker = ConnectionTracker::new();
        let _guard = tracker.acquire();

        let waited = tokio::time::timeout(Duration::from_secs(30), tracker.wait_idle()).await;
        assert!(waited.is_err());
    }
}
