//! Shared types used across svcwatch crates.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Category of a monitored service.
///
/// The kind decides how a raw HTTP status is read. Adding a category means
/// adding a variant and its arm in [`ServiceKind::accepts`]; nothing in the
/// engine changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ServiceKind {
    /// Only success-class responses mean the service is up.
    Generic,
    /// A 401/403 challenge also means the service is up, just not yet
    /// authenticated (e.g. an OAuth-protected requirements server).
    AuthTolerant,
}

impl ServiceKind {
    /// Whether an HTTP response with `status` means this kind of service is up.
    pub fn accepts(self, status: u16) -> bool {
        match self {
            ServiceKind::Generic => is_success_class(status),
            ServiceKind::AuthTolerant => is_success_class(status) || is_auth_challenge(status),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ServiceKind::Generic => "generic",
            ServiceKind::AuthTolerant => "auth-tolerant",
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// 2xx and 3xx.
pub fn is_success_class(status: u16) -> bool {
    (200..400).contains(&status)
}

/// 401 Unauthorized or 403 Forbidden.
pub fn is_auth_challenge(status: u16) -> bool {
    status == 401 || status == 403
}

/// Snapshot produced by one health check.
///
/// Built fresh for every check and never mutated after it is dispatched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub service_name: String,
    pub kind: ServiceKind,
    /// Normalized liveness signal.
    pub is_available: bool,
    /// The probe suggests the service is still booting rather than dead.
    pub is_starting: bool,
    /// Human-readable explanation of the outcome.
    pub status_message: String,
    pub last_checked: DateTime<Utc>,
}

impl ServiceStatus {
    pub fn new(
        service_name: impl Into<String>,
        kind: ServiceKind,
        is_available: bool,
        is_starting: bool,
        status_message: impl Into<String>,
    ) -> Self {
        Self {
            service_name: service_name.into(),
            kind,
            is_available,
            is_starting,
            status_message: status_message.into(),
            last_checked: Utc::now(),
        }
    }

    pub fn symbol(&self) -> &'static str {
        if self.is_available {
            "✅"
        } else if self.is_starting {
            "⏳"
        } else {
            "❌"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generic_accepts_only_success_class() {
        assert!(ServiceKind::Generic.accepts(200));
        assert!(ServiceKind::Generic.accepts(204));
        assert!(ServiceKind::Generic.accepts(302));
        assert!(!ServiceKind::Generic.accepts(401));
        assert!(!ServiceKind::Generic.accepts(403));
        assert!(!ServiceKind::Generic.accepts(404));
        assert!(!ServiceKind::Generic.accepts(500));
    }

    #[test]
    fn auth_tolerant_accepts_auth_challenges() {
        assert!(ServiceKind::AuthTolerant.accepts(200));
        assert!(ServiceKind::AuthTolerant.accepts(401));
        assert!(ServiceKind::AuthTolerant.accepts(403));
        assert!(!ServiceKind::AuthTolerant.accepts(404));
        assert!(!ServiceKind::AuthTolerant.accepts(500));
        assert!(!ServiceKind::AuthTolerant.accepts(503));
    }

    #[test]
    fn kind_serializes_kebab_case() {
        let json = serde_json::to_string(&ServiceKind::AuthTolerant).unwrap();
        assert_eq!(json, "\"auth-tolerant\"");
        let kind: ServiceKind = serde_json::from_str("\"generic\"").unwrap();
        assert_eq!(kind, ServiceKind::Generic);
    }

    #[test]
    fn status_symbol_reflects_state() {
        let up = ServiceStatus::new("a", ServiceKind::Generic, true, false, "ok");
        let booting = ServiceStatus::new("a", ServiceKind::Generic, false, true, "slow");
        let down = ServiceStatus::new("a", ServiceKind::Generic, false, false, "refused");
        assert_eq!(up.symbol(), "✅");
        assert_eq!(booting.symbol(), "⏳");
        assert_eq!(down.symbol(), "❌");
    }
}
