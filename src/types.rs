use crate::error::TransportError;

use std::time::Duration;

/// Callback invoked with every transport failure the client swallows.
pub type ErrorCallback = Box<dyn Fn(&TransportError) + Send + Sync>;

/// How [`HeventsClient::emit`](crate::HeventsClient::emit) hands the request
/// to the transport.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Dispatch {
    /// Send on the calling thread and wait for the response.
    #[default]
    Sync,
    /// Not implemented; always fails with `EmitError::Unsupported`.
    Async,
}

/// Configuration for the Hevents client.
pub struct Options {
    /// Root address of the collector. A trailing slash is optional.
    pub url: String,
    /// Bearer token sent in the `Authorization` header (required).
    pub api_key: String,
    /// Per-request timeout. Default: 10s.
    pub timeout: Duration,
    /// Connection failures retried per request. Default: 5.
    pub max_retries: u32,
    /// Delay before the first retry, doubled for each later one. Default: 0.
    pub retry_backoff: Duration,
    /// Redirects followed before giving up. Default: 30.
    pub max_redirects: u32,
    /// Log transport failures and return `Ok(None)` from `emit` instead of an
    /// error. Default: true.
    pub swallow_transport_errors: bool,
    /// Optional callback for swallowed transport failures.
    pub on_error: Option<ErrorCallback>,
}

impl Options {
    /// Create options with required fields only; all others use defaults.
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(10),
            max_retries: 5,
            retry_backoff: Duration::ZERO,
            max_redirects: 30,
            swallow_transport_errors: true,
            on_error: None,
        }
    }

    /// Transport settings of these options, without the URL, key and callback.
    pub fn settings(&self) -> Settings {
        Settings {
            timeout: self.timeout,
            max_retries: self.max_retries,
            retry_backoff: self.retry_backoff,
            max_redirects: self.max_redirects,
            swallow_transport_errors: self.swallow_transport_errors,
        }
    }
}

/// Read-only view of the transport settings a client was built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    pub timeout: Duration,
    pub max_retries: u32,
    pub retry_backoff: Duration,
    pub max_redirects: u32,
    pub swallow_transport_errors: bool,
}
