//! Retry middleware: the attempt loop at the heart of the crate.
//!
//! A retry layer re-dispatches the next handler until the decider accepts
//! the outcome, the attempt budget runs out, or the abort signal fires.
//! All retry layers of one chain share the context's attempt count, so
//! stacked layers observe one continuously incrementing sequence.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;

use crate::{
    AbortSignal, Context, Handler, Middleware, Result, RetryOptions, TransferError,
    TransferResponse,
};

/// Creates a retry middleware layer from the given options.
///
/// `Request` must be `Clone` so the same request can be re-dispatched once
/// per attempt; `Response` must expose [`TransferMetadata`] so the layer
/// can record the attempt total on success.
///
/// Per top-level call to the produced layer:
/// 1. If the abort signal is already set, fail with
///    [`TransferError::Aborted`] before any attempt.
/// 2. Await the next handler's outcome, then hand it (response or error,
///    never both) to the decider together with the shared context.
/// 3. Adopt `max(shared_count, local + 1)` as the new shared attempt
///    count — a nested retry layer may have advanced it while this attempt
///    was in flight, and those attempts must not be counted twice.
/// 4. On a non-retryable verdict or an exhausted budget, finish: a
///    response is returned with `metadata.attempts` set to the shared
///    count, an error is returned verbatim.
/// 5. Otherwise sleep for `compute_delay(shared_count)`, racing the timer
///    against the abort signal; if the signal wins, the timer is dropped
///    and the call fails with [`TransferError::Aborted`].
///
/// [`TransferMetadata`]: crate::TransferMetadata
pub fn retry_middleware<Request, Response>(
    options: RetryOptions<Response>,
) -> Middleware<Request, Response>
where
    Request: Clone + Send + 'static,
    Response: TransferResponse + Send + 'static,
{
    Arc::new(move |next: Handler<Request, Response>, context: Context| {
        let options = options.clone();
        Arc::new(move |request: Request| {
            let next = next.clone();
            let context = context.clone();
            let options = options.clone();
            Box::pin(async move { retry_loop(request, next, context, options).await })
        })
    })
}

async fn retry_loop<Request, Response>(
    request: Request,
    next: Handler<Request, Response>,
    context: Context,
    options: RetryOptions<Response>,
) -> Result<Response>
where
    Request: Clone + Send + 'static,
    Response: TransferResponse + Send + 'static,
{
    options.validate()?;
    let RetryOptions {
        max_attempts,
        retry_decider,
        compute_delay,
        abort_signal,
    } = options;

    let mut response: Option<Response> = None;
    let mut error: Option<TransferError> = None;
    let mut attempts = context.attempts_count();

    while !already_aborted(&abort_signal) && attempts < max_attempts {
        match next(request.clone()).await {
            Ok(outcome) => {
                response = Some(outcome);
                error = None;
            }
            Err(failure) => {
                error = Some(failure);
                response = None;
            }
        }

        // A nested retry layer may have advanced the shared count while
        // this attempt was in flight; adopt the larger value so inner
        // attempts are counted once.
        let shared = context.attempts_count();
        attempts = if shared > attempts { shared } else { attempts + 1 };
        context.set_attempts_count(attempts);

        let decision = retry_decider(response.as_ref(), error.as_ref(), &context).await;
        if decision.is_credentials_expired_error {
            // Persists for the remainder of the call so outer layers can
            // refresh credentials before the next attempt.
            context.set_credentials_expired(true);
        }
        if !decision.retryable {
            break;
        }
        if already_aborted(&abort_signal) || attempts >= max_attempts {
            // Budget exhausted or cancelled: the loop condition ends the
            // call without scheduling another delay.
            continue;
        }

        let delay = compute_delay(attempts);
        #[cfg(feature = "tracing")]
        tracing::debug!(
            attempts,
            delay_ms = delay.as_millis() as u64,
            "retrying after backoff delay"
        );
        sleep_with_abort(delay, abort_signal.as_ref()).await?;
    }

    if let Some(mut response) = response {
        response.metadata_mut().attempts = attempts;
        Ok(response)
    } else if let Some(error) = error {
        Err(error)
    } else {
        // The signal was set before the first attempt could run.
        #[cfg(feature = "tracing")]
        tracing::debug!("request aborted before the first attempt");
        Err(TransferError::Aborted)
    }
}

fn already_aborted(signal: &Option<AbortSignal>) -> bool {
    signal.as_ref().is_some_and(AbortSignal::is_aborted)
}

/// Races the backoff timer against the abort signal. Whichever side loses
/// is dropped, so no timer outlives the call.
async fn sleep_with_abort(delay: Duration, signal: Option<&AbortSignal>) -> Result<()> {
    match signal {
        Some(signal) => {
            tokio::select! {
                _ = sleep(delay) => Ok(()),
                _ = signal.aborted() => Err(TransferError::Aborted),
            }
        }
        None => {
            sleep(delay).await;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::sleep_with_abort;
    use crate::AbortController;

    #[tokio::test]
    async fn sleep_completes_without_signal() {
        sleep_with_abort(Duration::from_millis(5), None)
            .await
            .expect("plain sleep must complete");
    }

    #[tokio::test]
    async fn abort_interrupts_pending_sleep() {
        let controller = AbortController::new();
        let signal = controller.signal();
        let aborter = {
            let controller = controller.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                controller.abort();
            })
        };

        let start = Instant::now();
        let outcome = sleep_with_abort(Duration::from_secs(30), Some(&signal)).await;
        assert!(outcome.expect_err("abort must interrupt the sleep").is_aborted());
        assert!(start.elapsed() < Duration::from_secs(5));
        aborter.await.expect("aborter task must not panic");
    }

    #[tokio::test]
    async fn sleep_with_inactive_signal_elapses() {
        let controller = AbortController::new();
        let signal = controller.signal();
        sleep_with_abort(Duration::from_millis(5), Some(&signal))
            .await
            .expect("sleep must elapse when the signal stays quiet");
    }
}
