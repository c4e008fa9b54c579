use crate::error::{EmitError, TransportError};
use crate::event::{Event, EventError};
use crate::fingerprint::key_fingerprint;
use crate::request::{EventRequest, Headers};
use crate::session::{Delivery, RetryPolicy, Session, DEFAULT_USER_AGENT};
use crate::types::{Dispatch, ErrorCallback, Options, Settings};

use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tracing::{debug, error, info};

/// Path of the collector endpoint, relative to the base URL.
pub const ENDPOINT: &str = "api/events";

/// Prefix of the `User-Agent` header identifying this library.
pub const USER_AGENT_PREFIX: &str = "Hostinger Hevents Client";

/// Synchronous client for the Hevents collector.
///
/// Headers and the retry policy are fixed at construction; every
/// [`emit`](Self::emit) reuses them along with one pooled connection to the
/// base URL. Not meant to be shared between threads.
pub struct HeventsClient {
    url: String,
    key: String,
    headers: Headers,
    session: Session,
    settings: Settings,
    on_error: Option<ErrorCallback>,
}

impl HeventsClient {
    /// Client with default options for the collector at `url`.
    pub fn new(url: impl Into<String>, key: impl Into<String>) -> Self {
        Self::with_options(Options::new(url, key))
    }

    pub fn with_options(opts: Options) -> Self {
        let settings = opts.settings();
        let mut session = Session::new(settings.timeout, settings.max_redirects);
        // Requests to anything under the base URL inherit the retry policy.
        session.mount(
            opts.url.clone(),
            RetryPolicy::new(settings.max_retries, settings.retry_backoff),
        );

        let mut client = Self {
            url: opts.url,
            key: opts.api_key,
            headers: Headers::new(),
            session,
            settings,
            on_error: opts.on_error,
        };

        client.append_header("Authorization", client.authorization());
        client.append_header("Content-Type", "application/json");
        client.append_header("Accept", "application/json");
        client.append_header(
            "User-Agent",
            format!("{USER_AGENT_PREFIX} {DEFAULT_USER_AGENT}"),
        );

        debug!(
            "Hevents client configured for {} (key {}, {} retries, timeout {:?})",
            client.url,
            key_fingerprint(&client.key),
            client.settings.max_retries,
            client.settings.timeout
        );
        client
    }

    /// Validate `event`, then send it to the collector.
    ///
    /// Validation errors and [`Dispatch::Async`] fail before any network I/O.
    /// A transport failure is logged and yields `Ok(None)` unless the client
    /// was built with `swallow_transport_errors: false`. HTTP error statuses
    /// are returned as ordinary deliveries.
    pub fn emit(
        &self,
        event: impl Into<Value>,
        dispatch: Dispatch,
    ) -> Result<Option<Delivery>, EmitError> {
        let request = self.create_request(event)?;

        info!(
            "Sending event: {} {} {}",
            request.method, request.url, request.body
        );

        match dispatch {
            Dispatch::Async => Err(EmitError::Unsupported("asynchronous dispatch")),
            Dispatch::Sync => self.dispatch_sync(&request),
        }
    }

    /// Build the POST request for `event` without sending it.
    pub fn create_request(&self, event: impl Into<Value>) -> Result<EventRequest, EventError> {
        let event = Event::from_value(event.into())?;
        Ok(EventRequest::post(
            self.full_url(),
            self.headers.clone(),
            event.as_value(),
        ))
    }

    /// Send a prepared request through the shared session.
    pub fn send(&self, request: &EventRequest) -> Result<Delivery, TransportError> {
        let delivery = self.session.send(request)?;

        if delivery.was_redirected() {
            for hop in &delivery.redirects {
                info!("Request was redirected: {} {}", hop.status, hop.url);
            }
            info!("Final destination: {} {}", delivery.status, delivery.url);
        }
        info!("Got response: [{}] {}", delivery.status, delivery.body);

        Ok(delivery)
    }

    fn dispatch_sync(&self, request: &EventRequest) -> Result<Option<Delivery>, EmitError> {
        match self.send(request) {
            Ok(delivery) => Ok(Some(delivery)),
            Err(e) if self.settings.swallow_transport_errors => {
                error!("Request error: {e}");
                self.call_on_error(&e);
                Ok(None)
            }
            Err(e) => {
                error!("Request error: {e}");
                Err(e.into())
            }
        }
    }

    fn call_on_error(&self, err: &TransportError) {
        if let Some(ref cb) = self.on_error {
            cb(err);
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Replace the base URL. The retry policy stays mounted on the URL the
    /// client was built with.
    pub fn set_url(&mut self, url: impl Into<String>) {
        self.url = url.into();
    }

    /// Replace the key. The `Authorization` header keeps its original value
    /// until it is appended again.
    pub fn set_key(&mut self, key: impl Into<String>) {
        self.key = key.into();
    }

    /// `Authorization` header value for the current key.
    pub fn authorization(&self) -> String {
        format!("Bearer {}", self.key)
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn append_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.insert(name, value);
    }

    pub fn endpoint(&self) -> &'static str {
        ENDPOINT
    }

    /// Base URL and endpoint joined by exactly one slash.
    pub fn full_url(&self) -> String {
        format!(
            "{}/{}",
            self.url.trim_end_matches('/'),
            self.endpoint().trim_end_matches('/')
        )
    }

    /// Transport settings fixed at construction.
    pub fn options(&self) -> &Settings {
        &self.settings
    }

    pub fn timeout(&self) -> Duration {
        self.settings.timeout
    }

    pub fn max_retries(&self) -> u32 {
        self.settings.max_retries
    }
}

impl fmt::Debug for HeventsClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeventsClient")
            .field("url", &self.url)
            .field("key", &key_fingerprint(&self.key))
            .field("headers", &self.headers)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
