//! Tracking of work the host must wait for before tearing the agent down.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;
use tokio::task::JoinHandle;

#[derive(Debug, Default)]
struct Inner {
    pending: AtomicUsize,
    idle: Notify,
}

/// Registry of in-flight event work (`waitUntil`).
///
/// Every future registered through [`KeepAlive::wait_until`] counts as
/// pending until it finishes or panics.
#[derive(Debug, Clone, Default)]
pub struct KeepAlive {
    inner: Arc<Inner>,
}

impl KeepAlive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn a future on the current runtime and keep the agent alive until
    /// it settles.
    pub fn wait_until<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let guard = self.register();
        tokio::spawn(async move {
            let _guard = guard;
            future.await
        })
    }

    /// Number of registered futures still running.
    pub fn pending(&self) -> usize {
        self.inner.pending.load(Ordering::SeqCst)
    }

    /// Resolve once nothing is pending.
    pub async fn settled(&self) {
        loop {
            let idle = self.inner.idle.notified();
            if self.pending() == 0 {
                return;
            }
            idle.await;
        }
    }

    fn register(&self) -> PendingGuard {
        self.inner.pending.fetch_add(1, Ordering::SeqCst);
        PendingGuard(Arc::clone(&self.inner))
    }
}

struct PendingGuard(Arc<Inner>);

impl Drop for PendingGuard {
    fn drop(&mut self) {
        if self.0.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn test_settled_when_idle() {
        let keep_alive = KeepAlive::new();
        assert_eq!(keep_alive.pending(), 0);
        keep_alive.settled().await;
    }

    #[tokio::test]
    async fn test_settled_waits_for_registered_work() {
        let keep_alive = KeepAlive::new();
        let (tx, rx) = oneshot::channel::<()>();

        let handle = keep_alive.wait_until(async move {
            let _ = rx.await;
            7
        });
        assert_eq!(keep_alive.pending(), 1);

        let waiter = {
            let keep_alive = keep_alive.clone();
            tokio::spawn(async move { keep_alive.settled().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!waiter.is_finished());

        tx.send(()).unwrap();
        assert_eq!(handle.await.unwrap(), 7);
        waiter.await.unwrap();
        assert_eq!(keep_alive.pending(), 0);
    }

    #[tokio::test]
    async fn test_panicked_work_is_released() {
        let keep_alive = KeepAlive::new();
        let handle = keep_alive.wait_until(async {
            panic!("handler failed");
        });
        assert!(handle.await.is_err());
        keep_alive.settled().await;
        assert_eq!(keep_alive.pending(), 0);
    }
}
