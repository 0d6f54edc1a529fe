//! svcwatch-health: liveness monitoring for independently configured services.
//!
//! Each registered service gets its own periodic trigger, a single-flight
//! guard, and a last-known availability. Probe outcomes are read through the
//! service's kind and only genuine availability flips are dispatched.
//!
//! # Architecture
//!
//! ```text
//! HealthMonitor
//!   ├── Registry: name → ServiceEntry
//!   │   ├── PeriodicTrigger (one per service, independent interval)
//!   │   ├── in-flight flag (InFlightGuard, drop-not-queue)
//!   │   └── StatusTracker (last availability, starts false)
//!   ├── Transport::get() → ProbeOutcome → interpret() → ServiceStatus
//!   └── Dispatcher (on flip only)
//!       ├── StatusChannel for the service's kind
//!       ├── per-service StatusCallback
//!       └── audit log line
//! ```
//!
//! # Edge-triggered notifications
//!
//! Availability starts `false`. A service that is down from its first check
//! stays silent until it comes up; after that every flip in either
//! direction notifies exactly once.

pub mod checker;
pub mod dispatch;
pub mod error;
pub mod guard;
pub mod monitor;
pub mod tracker;
pub mod trigger;

pub use checker::{interpret, HttpTransport, Interpretation, ProbeFuture, ProbeOutcome, Transport};
pub use dispatch::{BoxFuture, BroadcastChannel, Dispatcher, StatusCallback, StatusChannel};
pub use error::{MonitorError, MonitorResult, TriggerError};
pub use monitor::{HealthMonitor, HealthMonitorBuilder, ServiceConfig, ServiceInfo};
pub use svcwatch_core::{ServiceKind, ServiceStatus, DEFAULT_PROBE_TIMEOUT};
pub use tracker::{StatusTracker, Transition};
pub use trigger::{PeriodicTrigger, TickFn, TokioTrigger, TokioTriggerFactory, TriggerFactory};
