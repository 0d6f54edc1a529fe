//! Notification dispatch on availability transitions.
//!
//! Order per transition: the channel registered for the service's kind,
//! then the service's own callback, then the audit log line. A panicking
//! channel or callback is contained and logged; the audit line is always
//! written.

use std::collections::HashMap;
use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{error, info, warn};

use svcwatch_core::{ServiceKind, ServiceStatus};

pub type BoxFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Per-service callback invoked with the new status on every transition.
pub type StatusCallback = Arc<dyn Fn(ServiceStatus) -> BoxFuture + Send + Sync>;

/// Destination for transitions of one service kind.
///
/// The engine resolves one channel per kind at construction and knows
/// nothing about how the status is rendered.
pub trait StatusChannel: Send + Sync {
    /// Deliver one transition. Must not block.
    fn publish(&self, status: &ServiceStatus);
}

/// Status-broadcast facility: every subscriber sees every published status.
#[derive(Debug, Clone)]
pub struct BroadcastChannel {
    tx: broadcast::Sender<ServiceStatus>,
}

impl BroadcastChannel {
    /// Create a channel buffering up to `capacity` unread statuses.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Receive every status published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<ServiceStatus> {
        self.tx.subscribe()
    }
}

impl Default for BroadcastChannel {
    fn default() -> Self {
        Self::new(64)
    }
}

impl StatusChannel for BroadcastChannel {
    fn publish(&self, status: &ServiceStatus) {
        // No subscribers is not an error.
        let _ = self.tx.send(status.clone());
    }
}

/// Routes transitions to kind channels, callbacks, and the audit log.
#[derive(Clone, Default)]
pub struct Dispatcher {
    channels: HashMap<ServiceKind, Arc<dyn StatusChannel>>,
}

impl Dispatcher {
    /// Create a dispatcher with one channel per kind.
    pub fn new(channels: HashMap<ServiceKind, Arc<dyn StatusChannel>>) -> Self {
        Self { channels }
    }

    /// Publish to the kind channel, then run the callback, then write the
    /// audit line.
    ///
    /// The callback and the audit line run on their own task, so dropping
    /// the returned future after the channel publish still gets the
    /// transition logged.
    pub async fn dispatch(&self, status: &ServiceStatus, callback: Option<&StatusCallback>) {
        if let Some(channel) = self.channels.get(&status.kind) {
            if catch_unwind(AssertUnwindSafe(|| channel.publish(status))).is_err() {
                error!(
                    service = %status.service_name,
                    kind = %status.kind,
                    "status channel panicked"
                );
            }
        }

        let status = status.clone();
        let callback = callback.cloned();
        let service = status.service_name.clone();
        let tail = tokio::spawn(async move {
            if let Some(cb) = callback {
                run_callback(&cb, &status).await;
            }
            audit(&status);
        });
        if let Err(e) = tail.await {
            error!(%service, error = %e, "status dispatch task failed");
        }
    }
}

async fn run_callback(cb: &StatusCallback, status: &ServiceStatus) {
    let service = status.service_name.as_str();
    match catch_unwind(AssertUnwindSafe(|| cb(status.clone()))) {
        Ok(fut) => match tokio::spawn(fut).await {
            Ok(()) => {}
            Err(e) if e.is_panic() => error!(%service, "status callback panicked"),
            Err(e) => error!(%service, error = %e, "status callback failed"),
        },
        Err(_) => error!(%service, "status callback panicked"),
    }
}

fn audit(status: &ServiceStatus) {
    if status.is_available {
        info!(
            service = %status.service_name,
            kind = %status.kind,
            message = %status.status_message,
            "service became available"
        );
    } else {
        warn!(
            service = %status.service_name,
            kind = %status.kind,
            starting = status.is_starting,
            message = %status.status_message,
            "service became unavailable"
        );
    }
}
