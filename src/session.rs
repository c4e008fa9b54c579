//! Pooled HTTP session with per-prefix retry policies.
//!
//! The session owns one `ureq::Agent` (and therefore one connection pool).
//! Redirects are followed here rather than inside `ureq` so each hop can be
//! reported back to the caller.

use crate::error::{TransportError, TransportKind};
use crate::request::{EventRequest, Headers};

use std::error::Error as _;
use std::io;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Identifies the HTTP stack underneath the client: this crate's version
/// followed by the major version of the `ureq` transport it is built on.
pub const DEFAULT_USER_AGENT: &str =
    concat!("hevents-rust/", env!("CARGO_PKG_VERSION"), " ureq/2");

/// How often a connection failure is retried before giving up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    /// Delay before the first retry; doubled for every retry after it.
    pub backoff: Duration,
}

impl RetryPolicy {
    /// Applied to URLs no mount covers.
    pub const NONE: RetryPolicy = RetryPolicy {
        max_retries: 0,
        backoff: Duration::ZERO,
    };

    pub fn new(max_retries: u32, backoff: Duration) -> Self {
        Self {
            max_retries,
            backoff,
        }
    }

    fn delay(&self, retry: u32) -> Duration {
        self.backoff
            .saturating_mul(1u32.checked_shl(retry.saturating_sub(1)).unwrap_or(u32::MAX))
    }
}

/// One redirect response that was followed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectHop {
    pub status: u16,
    pub url: String,
}

/// The final HTTP response to a sent request, whatever its status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub status: u16,
    /// URL that produced the final response.
    pub url: String,
    pub redirects: Vec<RedirectHop>,
    pub body: String,
}

impl Delivery {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn was_redirected(&self) -> bool {
        !self.redirects.is_empty()
    }
}

pub struct Session {
    agent: ureq::Agent,
    mounts: Vec<(String, RetryPolicy)>,
    max_redirects: u32,
}

impl Session {
    pub fn new(timeout: Duration, max_redirects: u32) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .redirects(0)
            .user_agent(DEFAULT_USER_AGENT)
            .build();
        Self {
            agent,
            mounts: Vec::new(),
            max_redirects,
        }
    }

    /// Use `policy` for every URL starting with `prefix`.
    pub fn mount(&mut self, prefix: impl Into<String>, policy: RetryPolicy) {
        let prefix = prefix.into();
        match self.mounts.iter_mut().find(|(p, _)| *p == prefix) {
            Some(mount) => mount.1 = policy,
            None => self.mounts.push((prefix, policy)),
        }
    }

    /// Policy of the longest mounted prefix matching `url`.
    pub fn policy_for(&self, url: &str) -> RetryPolicy {
        self.mounts
            .iter()
            .filter(|(prefix, _)| url.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .map_or(RetryPolicy::NONE, |(_, policy)| *policy)
    }

    /// Send `request`, following redirects. HTTP error statuses are returned
    /// as ordinary deliveries.
    pub fn send(&self, request: &EventRequest) -> Result<Delivery, TransportError> {
        let mut method = request.method;
        let mut url = request.url.clone();
        let mut headers = request.headers.clone();
        let mut body = Some(request.body_string());
        let mut redirects = Vec::new();

        loop {
            let (response, attempts) =
                self.send_with_retries(method, &url, &headers, body.as_deref())?;
            let status = response.status();

            let location = if is_redirect(status) {
                response.header("Location").map(str::to_owned)
            } else {
                None
            };

            let Some(location) = location else {
                let text = response.into_string().map_err(|e| {
                    TransportError::new(classify_io(&e), url.as_str(), attempts, e.to_string())
                })?;
                return Ok(Delivery {
                    status,
                    url,
                    redirects,
                    body: text,
                });
            };

            if redirects.len() as u32 >= self.max_redirects {
                return Err(TransportError::new(
                    TransportKind::TooManyRedirects,
                    url.as_str(),
                    attempts,
                    format!("exceeded {} redirects", self.max_redirects),
                ));
            }

            let next = resolve_location(&url, &location)?;
            debug!("Following {} redirect {} -> {}", status, url, next);

            if matches!(status, 301..=303) && method != "GET" {
                method = "GET";
                body = None;
                headers.remove("Content-Type");
            }
            if should_strip_auth(&url, &next) {
                headers.remove("Authorization");
            }

            redirects.push(RedirectHop {
                status,
                url: std::mem::replace(&mut url, next),
            });
        }
    }

    fn send_with_retries(
        &self,
        method: &str,
        url: &str,
        headers: &Headers,
        body: Option<&str>,
    ) -> Result<(ureq::Response, u32), TransportError> {
        let policy = self.policy_for(url);
        let mut attempt = 0u32;

        loop {
            attempt += 1;

            let mut request = self.agent.request(method, url);
            for (name, value) in headers.iter() {
                request = request.set(name, value);
            }
            let result = match body {
                Some(body) => request.send_string(body),
                None => request.call(),
            };

            let transport = match result {
                Ok(response) | Err(ureq::Error::Status(_, response)) => {
                    return Ok((response, attempt));
                }
                Err(ureq::Error::Transport(transport)) => transport,
            };

            let kind = classify(&transport);
            if kind.is_retryable() && attempt <= policy.max_retries {
                let delay = policy.delay(attempt);
                warn!(
                    "Attempt {} to {} failed, retrying in {:?}: {}",
                    attempt, url, delay, transport
                );
                if !delay.is_zero() {
                    std::thread::sleep(delay);
                }
                continue;
            }

            return Err(TransportError::new(kind, url, attempt, transport.to_string()));
        }
    }
}

fn is_redirect(status: u16) -> bool {
    matches!(status, 301 | 302 | 303 | 307 | 308)
}

fn resolve_location(current: &str, location: &str) -> Result<String, TransportError> {
    Url::parse(current)
        .and_then(|base| base.join(location))
        .map(String::from)
        .map_err(|e| {
            TransportError::new(
                TransportKind::InvalidUrl,
                current,
                1,
                format!("bad redirect location {location:?}: {e}"),
            )
        })
}

/// Credentials only follow a redirect to the same host, or an http -> https
/// upgrade on default ports.
fn should_strip_auth(from: &str, to: &str) -> bool {
    let (Ok(from), Ok(to)) = (Url::parse(from), Url::parse(to)) else {
        return true;
    };
    if from.host_str() != to.host_str() {
        return true;
    }
    if from.scheme() == "http"
        && to.scheme() == "https"
        && from.port().is_none()
        && to.port().is_none()
    {
        return false;
    }
    from.scheme() != to.scheme() || from.port_or_known_default() != to.port_or_known_default()
}

fn classify(transport: &ureq::Transport) -> TransportKind {
    match transport.kind() {
        ureq::ErrorKind::Dns | ureq::ErrorKind::ConnectionFailed | ureq::ErrorKind::ProxyConnect => {
            TransportKind::Connection
        }
        ureq::ErrorKind::TooManyRedirects => TransportKind::TooManyRedirects,
        ureq::ErrorKind::InvalidUrl
        | ureq::ErrorKind::UnknownScheme
        | ureq::ErrorKind::InvalidProxyUrl => TransportKind::InvalidUrl,
        ureq::ErrorKind::Io => transport
            .source()
            .and_then(|s| s.downcast_ref::<io::Error>())
            .map_or(TransportKind::Request, classify_io),
        _ => TransportKind::Request,
    }
}

fn classify_io(err: &io::Error) -> TransportKind {
    match err.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TransportKind::Timeout,
        _ => TransportKind::Request,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session::new(Duration::from_secs(1), 30)
    }

    #[test]
    fn unmounted_urls_get_no_retries() {
        let session = session();
        assert_eq!(session.policy_for("http://h/api/events"), RetryPolicy::NONE);
    }

    #[test]
    fn longest_prefix_wins() {
        let mut session = session();
        session.mount("http://h", RetryPolicy::new(5, Duration::ZERO));
        session.mount("http://h/api", RetryPolicy::new(2, Duration::ZERO));

        assert_eq!(session.policy_for("http://h/api/events").max_retries, 2);
        assert_eq!(session.policy_for("http://h/other").max_retries, 5);
        assert_eq!(session.policy_for("http://elsewhere/api/events").max_retries, 0);
    }

    #[test]
    fn remounting_a_prefix_replaces_its_policy() {
        let mut session = session();
        session.mount("http://h", RetryPolicy::new(5, Duration::ZERO));
        session.mount("http://h", RetryPolicy::new(1, Duration::ZERO));
        assert_eq!(session.mounts.len(), 1);
        assert_eq!(session.policy_for("http://h/api/events").max_retries, 1);
    }

    #[test]
    fn backoff_doubles() {
        let policy = RetryPolicy::new(5, Duration::from_millis(100));
        assert_eq!(policy.delay(1), Duration::from_millis(100));
        assert_eq!(policy.delay(2), Duration::from_millis(200));
        assert_eq!(policy.delay(3), Duration::from_millis(400));
        assert_eq!(RetryPolicy::NONE.delay(3), Duration::ZERO);
    }

    #[test]
    fn resolves_relative_locations() {
        assert_eq!(
            resolve_location("http://h/api/events", "/v2/events").unwrap(),
            "http://h/v2/events"
        );
        assert_eq!(
            resolve_location("http://h/api/events", "https://other/x").unwrap(),
            "https://other/x"
        );
    }

    #[test]
    fn unparseable_current_url_is_invalid() {
        let err = resolve_location("not a url", "/x").unwrap_err();
        assert_eq!(err.kind, TransportKind::InvalidUrl);
    }

    #[test]
    fn auth_is_kept_on_same_host() {
        assert!(!should_strip_auth("http://h/api/events", "http://h/v2"));
        assert!(!should_strip_auth("http://h/api/events", "https://h/api/events"));
    }

    #[test]
    fn auth_is_stripped_when_leaving_host() {
        assert!(should_strip_auth("http://h/api/events", "http://other/api/events"));
        assert!(should_strip_auth("http://h:8080/a", "http://h:9090/a"));
        assert!(should_strip_auth("https://h/a", "http://h/a"));
    }

    #[test]
    fn user_agent_names_the_transport() {
        assert!(DEFAULT_USER_AGENT.starts_with("hevents-rust/"));
        assert!(DEFAULT_USER_AGENT.ends_with(" ureq/2"));
    }

    #[test]
    fn io_errors_without_timeout_are_request_errors() {
        let eof = io::Error::new(io::ErrorKind::UnexpectedEof, "closed early");
        assert_eq!(classify_io(&eof), TransportKind::Request);
        let timed_out = io::Error::new(io::ErrorKind::TimedOut, "timed out reading response");
        assert_eq!(classify_io(&timed_out), TransportKind::Timeout);
    }

    #[test]
    fn redirect_statuses() {
        for status in [301, 302, 303, 307, 308] {
            assert!(is_redirect(status));
        }
        assert!(!is_redirect(200));
        assert!(!is_redirect(304));
    }

    #[test]
    fn delivery_helpers() {
        let delivery = Delivery {
            status: 201,
            url: "http://h/api/events".to_string(),
            redirects: Vec::new(),
            body: String::new(),
        };
        assert!(delivery.is_success());
        assert!(!delivery.was_redirected());
    }
}
