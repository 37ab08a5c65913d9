use {
    telefwd_common::{Error, Result},
    tokio::task::JoinHandle,
    tokio_util::sync::CancellationToken,
};

use crate::engine::ForwardReport;

/// Join/cancel contract for a running forwarding session.
///
/// `stop` requests cooperative cancellation: the engine observes it between
/// messages, finishes the in-flight send, persists, and exits. `join` then
/// yields the session totals.
#[derive(Debug)]
pub struct ForwardHandle {
    cancel: CancellationToken,
    task: JoinHandle<ForwardReport>,
}

impl ForwardHandle {
    pub(crate) fn new(cancel: CancellationToken, task: JoinHandle<ForwardReport>) -> Self {
        Self { cancel, task }
    }

    /// Request a stop. Idempotent; returns immediately.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the session to finish and return its totals.
    pub async fn join(self) -> Result<ForwardReport> {
        self.task
            .await
            .map_err(|e| Error::message(format!("forwarding task failed: {e}")))
    }

    /// Convenience for the common stop-then-wait sequence.
    pub async fn stop_and_join(self) -> Result<ForwardReport> {
        self.stop();
        self.join().await
    }
}
