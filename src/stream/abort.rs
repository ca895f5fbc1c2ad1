//! Cooperative cancellation for streaming reads.
//!
//! An [`AbortController`] owns the sending side of a `watch` channel; every
//! [`AbortSignal`] handed out observes the same abort. The stream session
//! races the signal against each chunk read, so an abort takes effect at the
//! next suspension point and never interrupts line dispatch.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Why a stream was aborted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbortReason {
    /// The user cancelled the generation.
    User,
    /// The request exceeded its time budget.
    Timeout,
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortReason::User => write!(f, "cancelled by user"),
            AbortReason::Timeout => write!(f, "request timed out"),
        }
    }
}

/// Triggers aborts. Cheap to clone; clones share the same signal.
#[derive(Debug, Clone)]
pub struct AbortController {
    tx: Arc<watch::Sender<Option<AbortReason>>>,
}

impl AbortController {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// A signal observing this controller.
    pub fn signal(&self) -> AbortSignal {
        AbortSignal {
            rx: self.tx.subscribe(),
        }
    }

    /// Abort with the given reason. Only the first abort is recorded.
    pub fn abort(&self, reason: AbortReason) {
        let changed = self.tx.send_if_modified(|current| {
            if current.is_none() {
                *current = Some(reason);
                true
            } else {
                false
            }
        });
        if changed {
            tracing::debug!(%reason, "abort signalled");
        }
    }

    pub fn is_aborted(&self) -> bool {
        self.tx.borrow().is_some()
    }

    pub fn reason(&self) -> Option<AbortReason> {
        *self.tx.borrow()
    }

    /// Abort with [`AbortReason::Timeout`] once `duration` elapses.
    ///
    /// The timer is cancelled when the returned guard is dropped. Must be
    /// called from within a tokio runtime.
    pub fn abort_after(&self, duration: Duration) -> TimeoutGuard {
        let controller = self.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            controller.abort(AbortReason::Timeout);
        });
        TimeoutGuard { handle }
    }
}

impl Default for AbortController {
    fn default() -> Self {
        Self::new()
    }
}

/// Cancels a pending [`AbortController::abort_after`] timer on drop.
#[derive(Debug)]
pub struct TimeoutGuard {
    handle: JoinHandle<()>,
}

impl Drop for TimeoutGuard {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Observes an [`AbortController`].
#[derive(Debug, Clone)]
pub struct AbortSignal {
    rx: watch::Receiver<Option<AbortReason>>,
}

impl AbortSignal {
    /// A signal that never fires.
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(None);
        Self { rx }
    }

    pub fn is_aborted(&self) -> bool {
        self.rx.borrow().is_some()
    }

    pub fn reason(&self) -> Option<AbortReason> {
        *self.rx.borrow()
    }

    /// Resolves when the controller aborts. Pends forever if the controller
    /// is dropped without aborting.
    pub async fn aborted(&mut self) -> AbortReason {
        loop {
            if let Some(reason) = *self.rx.borrow_and_update() {
                return reason;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

impl Default for AbortSignal {
    fn default() -> Self {
        Self::never()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_abort_wins() {
        let controller = AbortController::new();
        let signal = controller.signal();
        assert!(!signal.is_aborted());

        controller.abort(AbortReason::User);
        controller.abort(AbortReason::Timeout);

        assert!(controller.is_aborted());
        assert_eq!(signal.reason(), Some(AbortReason::User));
    }

    #[tokio::test]
    async fn test_aborted_resolves_after_abort() {
        let controller = AbortController::new();
        let mut signal = controller.signal();

        let waiter = tokio::spawn(async move { signal.aborted().await });
        tokio::task::yield_now().await;
        controller.abort(AbortReason::User);

        assert_eq!(waiter.await.unwrap(), AbortReason::User);
    }

    #[tokio::test]
    async fn test_signal_created_after_abort_sees_it() {
        let controller = AbortController::new();
        controller.abort(AbortReason::Timeout);

        let mut signal = controller.signal();
        assert_eq!(signal.aborted().await, AbortReason::Timeout);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abort_after_fires_timeout() {
        let controller = AbortController::new();
        let mut signal = controller.signal();
        let _guard = controller.abort_after(Duration::from_secs(50));

        assert_eq!(signal.aborted().await, AbortReason::Timeout);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_guard_cancels_timer() {
        let controller = AbortController::new();
        let guard = controller.abort_after(Duration::from_secs(1));
        drop(guard);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(!controller.is_aborted());
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_signal_pends() {
        let mut signal = AbortSignal::never();
        let result =
            tokio::time::timeout(Duration::from_secs(1), signal.aborted()).await;
        assert!(result.is_err());
    }
}
