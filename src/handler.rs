use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::{Context, Result};

/// Boxed future produced by every handler in a chain.
pub type HandlerFuture<Response> = Pin<Box<dyn Future<Output = Result<Response>> + Send>>;

/// A transfer handler: one async `request -> response` unit of work.
///
/// Handlers are shared, cloneable function objects so a retry layer can
/// dispatch the same inner handler once per attempt.
pub type Handler<Request, Response> =
    Arc<dyn Fn(Request) -> HandlerFuture<Response> + Send + Sync>;

/// A middleware factory: given the next handler in the chain and the
/// shared per-call [`Context`], produces the wrapping handler.
///
/// Factories are invoked once per top-level call by [`compose`], so every
/// layer of one chain observes the same context cell.
///
/// [`compose`]: crate::compose
pub type Middleware<Request, Response> =
    Arc<dyn Fn(Handler<Request, Response>, Context) -> Handler<Request, Response> + Send + Sync>;

/// Adapts an async closure into a [`Handler`].
///
/// # Example
///
/// ```no_run
/// use retry_stack::handler_fn;
///
/// let echo = handler_fn(|request: String| async move { Ok(request) });
/// # let _ = echo;
/// ```
pub fn handler_fn<Request, Response, F, Fut>(f: F) -> Handler<Request, Response>
where
    Request: 'static,
    Response: 'static,
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response>> + Send + 'static,
{
    Arc::new(move |request| Box::pin(f(request)))
}

/// Per-call transfer metadata attached to a successful response.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TransferMetadata {
    /// Total attempts made across every retry layer of the chain.
    pub attempts: u32,
}

/// Implemented by response types so retry layers can record the attempt
/// total on the value handed back to the caller.
pub trait TransferResponse {
    fn metadata(&self) -> &TransferMetadata;
    fn metadata_mut(&mut self) -> &mut TransferMetadata;
}
