//! Probe execution and outcome interpretation.
//!
//! A probe is one GET against a service endpoint. Whatever happens on the
//! wire is folded into a [`ProbeOutcome`]; nothing is raised to the caller.
//! [`interpret`] then reads that outcome through the service's
//! [`ServiceKind`].

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tracing::debug;

use svcwatch_core::{is_auth_challenge, is_success_class, ServiceKind};

use crate::error::{MonitorError, MonitorResult};

/// Raw result of a single probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// A well-formed HTTP response with this status code.
    HttpResponse(u16),
    /// Connection refused, DNS failure, reset, TLS failure.
    TransportFailure(String),
    /// No response within the probe timeout.
    Timeout { after: Duration },
    /// Anything else, including malformed endpoints.
    UnexpectedError(String),
}

impl fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeOutcome::HttpResponse(status) => write!(f, "HTTP {status}"),
            ProbeOutcome::TransportFailure(detail) => write!(f, "transport failure: {detail}"),
            ProbeOutcome::Timeout { after } => write!(f, "timed out after {after:?}"),
            ProbeOutcome::UnexpectedError(detail) => write!(f, "unexpected error: {detail}"),
        }
    }
}

/// Boxed future returned by [`Transport::get`].
pub type ProbeFuture<'a> = Pin<Box<dyn Future<Output = ProbeOutcome> + Send + 'a>>;

/// Outbound transport used for probes, injected so tests can script responses.
///
/// Implementations must be safe to share across every monitored service and
/// must bound the request by `timeout`.
pub trait Transport: Send + Sync {
    /// Issue one GET, bounded by `timeout`.
    fn get<'a>(&'a self, url: &'a str, timeout: Duration) -> ProbeFuture<'a>;
}

/// Production transport backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport that verifies certificates.
    pub fn new() -> MonitorResult<Self> {
        Self::with_options(false)
    }

    /// Build a transport, optionally accepting self-signed certificates.
    pub fn with_options(accept_invalid_certs: bool) -> MonitorResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("svcwatch/", env!("CARGO_PKG_VERSION")))
            .danger_accept_invalid_certs(accept_invalid_certs)
            .build()
            .map_err(|e| MonitorError::Transport(error_chain(&e)))?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn get<'a>(&'a self, url: &'a str, timeout: Duration) -> ProbeFuture<'a> {
        Box::pin(async move {
            match self.client.get(url).timeout(timeout).send().await {
                Ok(resp) => ProbeOutcome::HttpResponse(resp.status().as_u16()),
                Err(e) => {
                    let outcome = classify(&e, timeout);
                    debug!(%url, %outcome, "health probe did not get a response");
                    outcome
                }
            }
        })
    }
}

fn classify(err: &reqwest::Error, timeout: Duration) -> ProbeOutcome {
    if err.is_timeout() {
        ProbeOutcome::Timeout { after: timeout }
    } else if err.is_builder() {
        ProbeOutcome::UnexpectedError(error_chain(err))
    } else if err.is_connect() || err.is_request() || err.is_body() || err.is_redirect() {
        ProbeOutcome::TransportFailure(error_chain(err))
    } else {
        ProbeOutcome::UnexpectedError(error_chain(err))
    }
}

/// Flatten an error and its sources into one line. reqwest's top-level
/// message alone hides the useful part ("Connection refused").
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}

/// Normalized reading of a probe outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interpretation {
    pub available: bool,
    pub starting: bool,
    pub message: String,
}

/// Map a raw outcome to availability according to the service kind.
///
/// A timeout counts as "starting" for every kind; a slow endpoint is assumed
/// to be booting, not dead.
pub fn interpret(kind: ServiceKind, outcome: &ProbeOutcome) -> Interpretation {
    match outcome {
        ProbeOutcome::HttpResponse(status) => {
            let available = kind.accepts(*status);
            let message = if available && is_success_class(*status) {
                format!("Service is responding (HTTP {status})")
            } else if available && is_auth_challenge(*status) {
                format!("Service is reachable, authentication required (HTTP {status})")
            } else {
                format!("Service returned an unhealthy response (HTTP {status})")
            };
            Interpretation {
                available,
                starting: false,
                message,
            }
        }
        ProbeOutcome::Timeout { after } => Interpretation {
            available: false,
            starting: true,
            message: format!("No response within {after:?}; service may still be starting"),
        },
        ProbeOutcome::TransportFailure(detail) => Interpretation {
            available: false,
            starting: false,
            message: format!("Service is unreachable: {detail}"),
        },
        ProbeOutcome::UnexpectedError(detail) => Interpretation {
            available: false,
            starting: false,
            message: format!("Health check failed: {detail}"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generic_success_is_available() {
        let i = interpret(ServiceKind::Generic, &ProbeOutcome::HttpResponse(200));
        assert!(i.available);
        assert!(!i.starting);
        assert!(i.message.contains("HTTP 200"));
    }

    #[test]
    fn generic_auth_failure_is_unavailable() {
        let i = interpret(ServiceKind::Generic, &ProbeOutcome::HttpResponse(401));
        assert!(!i.available);
        assert!(!i.starting);
    }

    #[test]
    fn auth_tolerant_auth_failure_is_available() {
        for status in [401, 403] {
            let i = interpret(ServiceKind::AuthTolerant, &ProbeOutcome::HttpResponse(status));
            assert!(i.available, "HTTP {status} should count as up");
            assert!(!i.starting);
            assert!(i.message.contains("authentication required"));
        }
    }

    #[test]
    fn auth_tolerant_server_error_is_unavailable() {
        let i = interpret(ServiceKind::AuthTolerant, &ProbeOutcome::HttpResponse(500));
        assert!(!i.available);
        assert!(!i.starting);
    }

    #[test]
    fn timeout_means_starting_for_every_kind() {
        let outcome = ProbeOutcome::Timeout {
            after: Duration::from_secs(5),
        };
        for kind in [ServiceKind::Generic, ServiceKind::AuthTolerant] {
            let i = interpret(kind, &outcome);
            assert!(!i.available);
            assert!(i.starting);
        }
    }

    #[test]
    fn transport_failure_is_hard_down() {
        let i = interpret(
            ServiceKind::AuthTolerant,
            &ProbeOutcome::TransportFailure("Connection refused".to_string()),
        );
        assert!(!i.available);
        assert!(!i.starting);
        assert!(i.message.contains("Connection refused"));
    }

    #[test]
    fn unexpected_error_is_hard_down() {
        let i = interpret(
            ServiceKind::Generic,
            &ProbeOutcome::UnexpectedError("relative URL without a base".to_string()),
        );
        assert!(!i.available);
        assert!(!i.starting);
    }

    #[tokio::test]
    async fn http_probe_to_closed_port_is_transport_failure() {
        // Bind and drop to get a port nothing listens on.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let transport = HttpTransport::new().unwrap();
        let outcome = transport
            .get(&format!("http://{addr}/health"), Duration::from_secs(2))
            .await;
        assert!(
            matches!(outcome, ProbeOutcome::TransportFailure(_)),
            "unexpected outcome: {outcome}"
        );
    }

    #[tokio::test]
    async fn http_probe_with_malformed_url_is_unexpected_error() {
        let transport = HttpTransport::new().unwrap();
        let outcome = transport.get("not a url", Duration::from_secs(1)).await;
        assert!(
            matches!(outcome, ProbeOutcome::UnexpectedError(_)),
            "unexpected outcome: {outcome}"
        );
    }
}
