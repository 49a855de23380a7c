//! `retry-stack` is a composable retry middleware for async transfer
//! handlers.
//!
//! The crate wraps any `request -> response` handler in a layered
//! pipeline with:
//! - [`compose`] — builds one handler from a core handler and an ordered
//!   list of middleware factories,
//! - [`retry_middleware`] — configurable attempt loop with backoff and
//!   cancellation,
//! - [`Context`] — mutable per-call state shared by every layer of one
//!   chain, so stacked retry layers extend a single attempt count.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use retry_stack::{compose, retry_middleware, RetryOptions, TransferResponse};
//! use retry_stack::backoff::jittered_backoff;
//! use retry_stack::http::{default_retry_decider, http_handler, HttpRequest};
//!
//! # async fn run() -> retry_stack::Result<()> {
//! let options = RetryOptions::new(default_retry_decider(), Arc::new(jittered_backoff));
//! let handler = compose(
//!     http_handler(reqwest::Client::new()),
//!     vec![retry_middleware(options)],
//! );
//!
//! let response = handler(HttpRequest::get("https://example.com")).await?;
//! println!("succeeded after {} attempt(s)", response.metadata().attempts);
//! # Ok(())
//! # }
//! ```

mod abort;
mod compose;
mod context;
mod error;
mod handler;
mod options;
mod retry;

pub mod backoff;
pub mod http;

pub use abort::{AbortController, AbortSignal};
pub use compose::compose;
pub use context::Context;
pub use error::{BoxError, TransferError};
pub use handler::{handler_fn, Handler, HandlerFuture, Middleware, TransferMetadata, TransferResponse};
pub use options::{decider_fn, ComputeDelay, DeciderFuture, RetryDecider, RetryDecision, RetryOptions};
pub use retry::retry_middleware;

pub type Result<T> = std::result::Result<T, TransferError>;
