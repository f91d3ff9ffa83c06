//! Fire-and-forget side effects.
//!
//! Work spawned here never affects the response that triggered it. Failures
//! are logged and counted; [`BestEffortRunner::drain`] waits for in-flight
//! work at shutdown and in tests.

use std::fmt::Display;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio_util::task::TaskTracker;

#[derive(Clone, Default)]
pub struct BestEffortRunner {
    tracker: TaskTracker,
    failures: Arc<AtomicU64>,
}

impl BestEffortRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn<F, T, E>(&self, operation: &'static str, future: F)
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Display + Send + 'static,
    {
        let failures = self.failures.clone();
        self.tracker.spawn(async move {
            if let Err(e) = future.await {
                failures.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(operation = operation, error = %e, "Best-effort task failed");
            }
        });
    }

    /// Number of spawned tasks that returned an error so far.
    pub fn failure_count(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Wait until every task spawned so far has finished.
    pub async fn drain(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetdesk_core::AppError;

    #[tokio::test]
    async fn test_failures_are_counted_not_propagated() {
        let runner = BestEffortRunner::new();

        runner.spawn("ok", async { Ok::<_, AppError>(()) });
        runner.spawn("audit", async {
            Err::<(), _>(AppError::Internal("insert failed".to_string()))
        });
        runner.spawn("sync", async {
            Err::<(), _>(AppError::NotFound("client gone".to_string()))
        });

        runner.drain().await;
        assert_eq!(runner.failure_count(), 2);
        assert_eq!(runner.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_runner_is_reusable_after_drain() {
        let runner = BestEffortRunner::new();
        runner.drain().await;

        let (tx, rx) = tokio::sync::oneshot::channel();
        runner.spawn("signal", async move {
            tx.send(()).map_err(|_| AppError::Internal("receiver dropped".to_string()))
        });
        runner.drain().await;
        assert!(rx.await.is_ok());
        assert_eq!(runner.failure_count(), 0);
    }
}
