//! Notification sink: turns broadcast status changes into log lines.
//!
//! Stands in for the desktop toast: one subscriber task per kind channel.

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use svcwatch_health::ServiceStatus;

/// Spawn a task that reports every status published on `rx`.
pub fn spawn_notifier(
    label: &'static str,
    mut rx: broadcast::Receiver<ServiceStatus>,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                received = rx.recv() => match received {
                    Ok(status) => report(label, &status),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(channel = label, skipped, "notification sink lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                _ = shutdown.changed() => break,
            }
        }
        debug!(channel = label, "notification sink stopped");
    })
}

fn report(label: &str, status: &ServiceStatus) {
    let line = notification_line(status);
    if status.is_available {
        info!(channel = label, "{line}");
    } else {
        warn!(channel = label, "{line}");
    }
}

/// Human-readable notification text.
pub fn notification_line(status: &ServiceStatus) -> String {
    let state = if status.is_available {
        "is now available"
    } else if status.is_starting {
        "is starting"
    } else {
        "is unavailable"
    };
    format!(
        "{} {} {state}: {}",
        status.symbol(),
        status.service_name,
        status.status_message
    )
}
