use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use crate::{AbortSignal, Context, Result, TransferError};

/// Verdict returned by a retry decider after each completed attempt.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RetryDecision {
    /// Whether the attempt's outcome warrants another attempt.
    pub retryable: bool,
    /// Whether the failure was caused by expired credentials. When set,
    /// the retry layer records the expiry on the shared context so outer
    /// layers (e.g. request signing) can refresh before the next attempt.
    pub is_credentials_expired_error: bool,
}

impl RetryDecision {
    /// Retry the request.
    pub fn retry() -> Self {
        Self {
            retryable: true,
            is_credentials_expired_error: false,
        }
    }

    /// Accept the outcome as final.
    pub fn give_up() -> Self {
        Self::default()
    }

    /// Retry, flagging the failure as an expired-credentials error.
    pub fn credentials_expired() -> Self {
        Self {
            retryable: true,
            is_credentials_expired_error: true,
        }
    }
}

/// Future returned by a retry decider. Deciders may be asynchronous, e.g.
/// to consult a token cache before classifying a failure.
pub type DeciderFuture<'a> = Pin<Box<dyn Future<Output = RetryDecision> + Send + 'a>>;

/// Inspects the outcome of one attempt — exactly one of `response` /
/// `error` is present — together with the shared context, and decides
/// whether to retry.
pub type RetryDecider<Response> = Arc<
    dyn for<'a> Fn(Option<&'a Response>, Option<&'a TransferError>, &'a Context) -> DeciderFuture<'a>
        + Send
        + Sync,
>;

/// Computes the backoff delay before the next attempt. Receives the
/// chain-wide attempt number (1-based) and is never invoked for an
/// attempt that will not occur.
pub type ComputeDelay = Arc<dyn Fn(u32) -> Duration + Send + Sync>;

/// Configures one retry middleware layer.
pub struct RetryOptions<Response> {
    /// Maximum number of attempts, including the first. Must be at least
    /// 1; a value of 1 disables retrying entirely.
    pub max_attempts: u32,
    /// Decides, per completed attempt, whether to retry.
    pub retry_decider: RetryDecider<Response>,
    /// Computes the delay inserted before each retry.
    pub compute_delay: ComputeDelay,
    /// Optional cancellation signal shared with the caller.
    pub abort_signal: Option<AbortSignal>,
}

impl<Response> RetryOptions<Response> {
    /// Creates options with the given decider and delay computation and
    /// the default attempt budget ([`DEFAULT_MAX_ATTEMPTS`]).
    ///
    /// [`DEFAULT_MAX_ATTEMPTS`]: crate::backoff::DEFAULT_MAX_ATTEMPTS
    pub fn new(retry_decider: RetryDecider<Response>, compute_delay: ComputeDelay) -> Self {
        Self {
            max_attempts: crate::backoff::DEFAULT_MAX_ATTEMPTS,
            retry_decider,
            compute_delay,
            abort_signal: None,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_abort_signal(mut self, signal: AbortSignal) -> Self {
        self.abort_signal = Some(signal);
        self
    }

    /// Fails fast on invalid configuration before the first attempt.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.max_attempts < 1 {
            return Err(TransferError::Configuration(
                "max_attempts must be at least 1".to_owned(),
            ));
        }
        Ok(())
    }
}

// Hand-written so `Response` itself need not be `Clone`.
impl<Response> Clone for RetryOptions<Response> {
    fn clone(&self) -> Self {
        Self {
            max_attempts: self.max_attempts,
            retry_decider: Arc::clone(&self.retry_decider),
            compute_delay: Arc::clone(&self.compute_delay),
            abort_signal: self.abort_signal.clone(),
        }
    }
}

impl<Response> std::fmt::Debug for RetryOptions<Response> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryOptions")
            .field("max_attempts", &self.max_attempts)
            .field("abort_signal", &self.abort_signal.is_some())
            .finish()
    }
}

/// Adapts a synchronous closure into a [`RetryDecider`].
///
/// # Example
///
/// ```no_run
/// use retry_stack::{decider_fn, RetryDecision, TransferError};
///
/// let decider = decider_fn(|_response: Option<&String>, error, _context| {
///     match error {
///         Some(TransferError::Transport { .. }) => RetryDecision::retry(),
///         _ => RetryDecision::give_up(),
///     }
/// });
/// # let _ = decider;
/// ```
pub fn decider_fn<Response, F>(f: F) -> RetryDecider<Response>
where
    F: Fn(Option<&Response>, Option<&TransferError>, &Context) -> RetryDecision
        + Send
        + Sync
        + 'static,
{
    Arc::new(
        move |response: Option<&Response>, error: Option<&TransferError>, context: &Context| {
            let decision = f(response, error, context);
            Box::pin(async move { decision }) as DeciderFuture<'_>
        },
    )
}

#[cfg(test)]
mod tests {
    use super::{decider_fn, RetryDecision, RetryOptions};
    use crate::Context;

    #[test]
    fn decision_constructors() {
        assert!(RetryDecision::retry().retryable);
        assert!(!RetryDecision::give_up().retryable);
        let expired = RetryDecision::credentials_expired();
        assert!(expired.retryable && expired.is_credentials_expired_error);
    }

    #[tokio::test]
    async fn decider_fn_wraps_sync_closures() {
        let decider = decider_fn(|_response: Option<&()>, error, _context| {
            if error.is_some() {
                RetryDecision::retry()
            } else {
                RetryDecision::give_up()
            }
        });
        let context = Context::new();
        let decision = decider(None, Some(&crate::TransferError::Aborted), &context).await;
        assert!(decision.retryable);
        let decision = decider(Some(&()), None, &context).await;
        assert!(!decision.retryable);
    }

    #[test]
    fn zero_attempts_fails_validation() {
        let options: RetryOptions<()> = RetryOptions::new(
            decider_fn(|_, _, _| RetryDecision::give_up()),
            std::sync::Arc::new(|_| std::time::Duration::ZERO),
        )
        .with_max_attempts(0);
        assert!(options.validate().is_err());
    }
}
