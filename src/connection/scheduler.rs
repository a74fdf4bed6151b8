// Cancellable one-shot retry timer. At most one expiry is pending at a time; arming a new
// one aborts the previous task, so a superseded timer can never deliver its event.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::Generation;

struct PendingRetry {
    generation: Generation,
    handle: JoinHandle<()>,
}

#[derive(Default)]
pub struct RetryTimer {
    pending: Option<PendingRetry>,
}

impl RetryTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `event` on `tx` after `delay`, replacing any pending expiry.
    pub fn schedule<T>(
        &mut self,
        generation: Generation,
        delay: Duration,
        tx: mpsc::Sender<T>,
        event: T,
    ) where
        T: Send + 'static,
    {
        self.cancel();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(event).await;
        });
        self.pending = Some(PendingRetry { generation, handle });
    }

    /// Abort the pending expiry, if any. Returns whether one was armed.
    pub fn cancel(&mut self) -> bool {
        match self.pending.take() {
            Some(p) => {
                p.handle.abort();
                true
            }
            None => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|p| !p.handle.is_finished())
    }

    pub fn pending_generation(&self) -> Option<Generation> {
        self.pending.as_ref().map(|p| p.generation)
    }
}

impl Drop for RetryTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
