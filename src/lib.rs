//! Hevents client — Rust SDK
//!
//! Validates event records against a fixed schema and posts them as JSON to
//! the `api/events` endpoint of a collector, with bearer-token authorization
//! and bounded retries of connection failures.
//!
//! ```rust,no_run
//! use hevents::{Dispatch, HeventsClient};
//! use serde_json::json;
//!
//! hevents::init_logging("info").ok();
//!
//! let client = HeventsClient::new("https://hevents.example.com", "key");
//! client
//!     .emit(json!({"event": "USER_SIGN_UP", "properties": {"user_id": 123}}), Dispatch::Sync)
//!     .unwrap();
//! ```

mod client;
mod error;
mod event;
mod fingerprint;
mod logging;
mod request;
pub mod schema;
mod session;
mod types;

pub use client::{HeventsClient, ENDPOINT, USER_AGENT_PREFIX};
pub use error::{EmitError, LoggingError, TransportError, TransportKind};
pub use event::{Event, EventError};
pub use fingerprint::key_fingerprint;
pub use logging::init_logging;
pub use request::{EventRequest, Headers};
pub use session::{Delivery, RedirectHop, RetryPolicy, DEFAULT_USER_AGENT};
pub use types::{Dispatch, ErrorCallback, Options, Settings};
