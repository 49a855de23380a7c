//! HTTP glue: a reqwest-backed transfer handler plus the default retry
//! decider and a user-agent middleware for HTTP pipelines.
//!
//! The middleware core is transport-agnostic; this module is the thin
//! collaborator that makes the crate usable end to end over HTTP.

use std::sync::Arc;
use std::time::Duration;

pub use reqwest::Method;

use crate::{
    decider_fn, handler_fn, Handler, Middleware, RetryDecider, RetryDecision, TransferError,
    TransferMetadata, TransferResponse,
};

/// One HTTP request dispatched by [`http_handler`]. Cloneable so a retry
/// layer can re-dispatch it once per attempt.
#[derive(Clone, Debug)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
    /// Per-attempt timeout; `None` defers to the client's own settings.
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
            timeout: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn has_header(&self, name: &str) -> bool {
        self.headers
            .iter()
            .any(|(header, _)| header.eq_ignore_ascii_case(name))
    }
}

/// Response produced by [`http_handler`]. Non-success statuses are
/// returned as responses, not errors; the retry decider judges them.
#[derive(Clone, Debug, Default)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    metadata: TransferMetadata,
}

impl HttpResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Response body decoded lossily as UTF-8.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

impl TransferResponse for HttpResponse {
    fn metadata(&self) -> &TransferMetadata {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut TransferMetadata {
        &mut self.metadata
    }
}

/// Builds a transfer handler backed by a shared `reqwest` client.
///
/// Transport failures (connect, timeout, body read) surface as
/// [`TransferError::Transport`] with the reqwest error attached as the
/// cause.
///
/// # Example
///
/// ```no_run
/// use retry_stack::http::{http_handler, HttpRequest};
///
/// # async fn run() -> retry_stack::Result<()> {
/// let handler = http_handler(reqwest::Client::new());
/// let response = handler(HttpRequest::get("https://example.com")).await?;
/// assert!(response.is_success());
/// # Ok(())
/// # }
/// ```
pub fn http_handler(client: reqwest::Client) -> Handler<HttpRequest, HttpResponse> {
    handler_fn(move |request: HttpRequest| {
        let client = client.clone();
        async move {
            let HttpRequest {
                method,
                url,
                headers,
                body,
                timeout,
            } = request;

            let mut builder = client.request(method, url);
            for (name, value) in &headers {
                builder = builder.header(name, value);
            }
            if let Some(timeout) = timeout {
                builder = builder.timeout(timeout);
            }
            if let Some(body) = body {
                builder = builder.body(body);
            }

            let response = builder.send().await.map_err(into_transport_error)?;
            let status = response.status().as_u16();
            let headers = response
                .headers()
                .iter()
                .map(|(name, value)| {
                    (
                        name.as_str().to_owned(),
                        String::from_utf8_lossy(value.as_bytes()).into_owned(),
                    )
                })
                .collect();
            let body = response
                .bytes()
                .await
                .map_err(into_transport_error)?
                .to_vec();

            Ok(HttpResponse {
                status,
                headers,
                body,
                metadata: TransferMetadata::default(),
            })
        }
    })
}

fn into_transport_error(err: reqwest::Error) -> TransferError {
    TransferError::transport_with_source(err.to_string(), err)
}

/// Default decider for HTTP pipelines: retries transport failures and
/// throttling/server statuses (429, 500, 502, 503, 504), and flags
/// credential expiry on auth failures whose body names an expired or
/// invalid security token.
pub fn default_retry_decider() -> RetryDecider<HttpResponse> {
    decider_fn(|response: Option<&HttpResponse>, error, _context| {
        if let Some(response) = response {
            if is_credentials_expired_response(response) {
                return RetryDecision::credentials_expired();
            }
            if is_retryable_status(response.status) {
                return RetryDecision::retry();
            }
            return RetryDecision::give_up();
        }
        match error {
            Some(TransferError::Transport { .. }) => RetryDecision::retry(),
            _ => RetryDecision::give_up(),
        }
    })
}

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

fn is_credentials_expired_response(response: &HttpResponse) -> bool {
    if !matches!(response.status, 400 | 401 | 403) {
        return false;
    }
    let body = response.body_text();
    ["ExpiredToken", "RequestExpired", "InvalidSignature"]
        .iter()
        .any(|marker| body.contains(marker))
}

/// Middleware that sets a `user-agent` header on every attempt, unless
/// the request already carries one.
pub fn user_agent_middleware(value: impl Into<String>) -> Middleware<HttpRequest, HttpResponse> {
    let value: Arc<str> = Arc::from(value.into());
    Arc::new(move |next: Handler<HttpRequest, HttpResponse>, _context| {
        let value = Arc::clone(&value);
        Arc::new(move |mut request: HttpRequest| {
            if !request.has_header("user-agent") {
                request
                    .headers
                    .push(("user-agent".to_owned(), value.to_string()));
            }
            next(request)
        })
    })
}
