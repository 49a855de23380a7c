use std::sync::Arc;

use crate::{Context, Handler, Middleware};

/// Builds one handler from a core (innermost) handler and an ordered list
/// of middleware factories.
///
/// The chain is assembled right-to-left: the first factory in the list
/// becomes the outermost wrapper. On every invocation of the returned
/// handler, a fresh [`Context`] is created and a clone of the same cell is
/// passed to every factory — including repeated instances of the same
/// factory type — so stacked retry layers extend one shared attempt count
/// instead of each starting its own.
///
/// Two handlers composed from identical arguments share no mutable state,
/// and neither do two calls to the same composed handler.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use std::time::Duration;
/// use retry_stack::{compose, decider_fn, handler_fn, retry_middleware, RetryDecision, RetryOptions};
/// use retry_stack::http::HttpResponse;
///
/// let core = handler_fn(|_request: String| async move {
///     Ok(HttpResponse::new(200))
/// });
/// let options = RetryOptions::new(
///     decider_fn(|_response, error, _context| match error {
///         Some(_) => RetryDecision::retry(),
///         None => RetryDecision::give_up(),
///     }),
///     Arc::new(|_attempt| Duration::from_millis(100)),
/// );
/// let handler = compose(core, vec![retry_middleware(options)]);
/// # let _ = handler;
/// ```
pub fn compose<Request, Response>(
    core: Handler<Request, Response>,
    middleware: Vec<Middleware<Request, Response>>,
) -> Handler<Request, Response>
where
    Request: Send + 'static,
    Response: Send + 'static,
{
    Arc::new(move |request| {
        let context = Context::new();
        let mut next = core.clone();
        for factory in middleware.iter().rev() {
            next = factory(next, context.clone());
        }
        next(request)
    })
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::compose;
    use crate::{handler_fn, Context, Handler, Middleware};

    fn tracing_layer(
        label: &'static str,
        order: Arc<Mutex<Vec<&'static str>>>,
    ) -> Middleware<u32, u32> {
        Arc::new(move |next: Handler<u32, u32>, _context: Context| {
            let order = Arc::clone(&order);
            Arc::new(move |request| {
                order
                    .lock()
                    .expect("order mutex must not be poisoned")
                    .push(label);
                next(request)
            })
        })
    }

    #[tokio::test]
    async fn first_factory_is_outermost() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let core = handler_fn(|request: u32| async move { Ok(request + 1) });
        let handler = compose(
            core,
            vec![
                tracing_layer("outer", Arc::clone(&order)),
                tracing_layer("inner", Arc::clone(&order)),
            ],
        );

        let response = handler(1).await.expect("handler must succeed");
        assert_eq!(response, 2);
        assert_eq!(
            *order.lock().expect("order mutex must not be poisoned"),
            vec!["outer", "inner"]
        );
    }

    #[tokio::test]
    async fn every_factory_sees_the_same_context() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let probe = |seen: Arc<Mutex<Vec<u32>>>| -> Middleware<u32, u32> {
            Arc::new(move |next: Handler<u32, u32>, context: Context| {
                let seen = Arc::clone(&seen);
                Arc::new(move |request| {
                    context.set_attempts_count(context.attempts_count() + 1);
                    seen.lock()
                        .expect("seen mutex must not be poisoned")
                        .push(context.attempts_count());
                    next(request)
                })
            })
        };

        let core = handler_fn(|request: u32| async move { Ok(request) });
        let handler = compose(
            core,
            vec![probe(Arc::clone(&seen)), probe(Arc::clone(&seen))],
        );
        handler(0).await.expect("handler must succeed");

        // Both layers incremented the same shared counter.
        assert_eq!(
            *seen.lock().expect("seen mutex must not be poisoned"),
            vec![1, 2]
        );
    }

    #[tokio::test]
    async fn each_call_gets_a_fresh_context() {
        let counts = Arc::new(Mutex::new(Vec::new()));
        let counts_probe = Arc::clone(&counts);
        let probe: Middleware<u32, u32> =
            Arc::new(move |next: Handler<u32, u32>, context: Context| {
                let counts = Arc::clone(&counts_probe);
                Arc::new(move |request| {
                    context.set_attempts_count(context.attempts_count() + 1);
                    counts
                        .lock()
                        .expect("counts mutex must not be poisoned")
                        .push(context.attempts_count());
                    next(request)
                })
            });

        let core = handler_fn(|request: u32| async move { Ok(request) });
        let handler = compose(core, vec![probe]);
        handler(0).await.expect("first call must succeed");
        handler(0).await.expect("second call must succeed");

        // Counter restarted from zero on the second call.
        assert_eq!(
            *counts.lock().expect("counts mutex must not be poisoned"),
            vec![1, 1]
        );
    }
}
