//! Cooperative cancellation for in-flight transfers.
//!
//! An [`AbortController`] is owned by the caller; the [`AbortSignal`] it
//! hands out is passed into retry layers through
//! [`RetryOptions::abort_signal`](crate::RetryOptions). The retry loop
//! checks the signal before the first attempt and races it against the
//! backoff timer between attempts.

use std::sync::Arc;

use tokio::sync::watch;

/// Issues abort requests for transfers sharing its signal.
#[derive(Clone, Debug)]
pub struct AbortController {
    tx: Arc<watch::Sender<bool>>,
}

impl AbortController {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Returns a signal observing this controller. Any number of signals
    /// may be handed out; they all observe the same abort request.
    pub fn signal(&self) -> AbortSignal {
        AbortSignal {
            rx: self.tx.subscribe(),
        }
    }

    /// Requests abort. Idempotent; every outstanding signal wakes up.
    pub fn abort(&self) {
        // send_replace stores the value even when no signal is subscribed
        // yet, so late subscribers still observe the abort.
        self.tx.send_replace(true);
    }

    pub fn is_aborted(&self) -> bool {
        *self.tx.borrow()
    }
}

impl Default for AbortController {
    fn default() -> Self {
        Self::new()
    }
}

/// Observes one controller's abort request.
#[derive(Clone, Debug)]
pub struct AbortSignal {
    rx: watch::Receiver<bool>,
}

impl AbortSignal {
    /// Synchronous query: has abort been requested already?
    pub fn is_aborted(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once abort is requested. Pends forever if it never is,
    /// including when the controller is dropped without aborting.
    pub async fn aborted(&self) {
        let mut rx = self.rx.clone();
        if rx.wait_for(|aborted| *aborted).await.is_err() {
            // Controller dropped un-aborted: no abort can arrive anymore.
            std::future::pending::<()>().await;
        }
    }
}
