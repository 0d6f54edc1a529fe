//! Last-known availability per service, used to detect transitions.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

use svcwatch_core::ServiceStatus;

#[derive(Debug, Default)]
struct TrackerState {
    /// Starts `false`: a service that is down from the first check never
    /// produces a transition until it comes up.
    available: bool,
    last: Option<ServiceStatus>,
    transitions: u64,
}

/// A genuine change of the tracked availability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: bool,
    pub to: bool,
}

/// Tracks the last status of a single service.
#[derive(Debug, Default)]
pub struct StatusTracker {
    state: Mutex<TrackerState>,
}

impl StatusTracker {
    /// Create a tracker that starts unavailable.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a fresh status and report whether availability flipped.
    ///
    /// The tracked value is updated before the caller dispatches anything.
    pub fn record(&self, status: &ServiceStatus) -> Option<Transition> {
        let mut state = self.lock();
        let from = state.available;
        let to = status.is_available;
        state.last = Some(status.clone());

        if from == to {
            return None;
        }

        state.available = to;
        state.transitions += 1;
        debug!(
            service = %status.service_name,
            from,
            to,
            transitions = state.transitions,
            "availability changed"
        );
        Some(Transition { from, to })
    }

    /// Last tracked availability.
    pub fn is_available(&self) -> bool {
        self.lock().available
    }

    /// Most recent status, if any check has completed.
    pub fn last(&self) -> Option<ServiceStatus> {
        self.lock().last.clone()
    }

    /// Number of availability flips seen so far.
    pub fn transitions(&self) -> u64 {
        self.lock().transitions
    }

    fn lock(&self) -> MutexGuard<'_, TrackerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
