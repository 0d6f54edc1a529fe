//! Health monitor: registry, schedules, and checks for all services.
//!
//! Each registered service owns its own trigger, in-flight flag, and status
//! tracker. A check runs the probe, interprets the outcome, and dispatches
//! only when the tracked availability flips.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{
    Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak,
};
use std::time::Duration;

use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use svcwatch_core::{ConfigError, ServiceKind, ServiceSpec, ServiceStatus, DEFAULT_PROBE_TIMEOUT};

use crate::checker::{interpret, HttpTransport, ProbeOutcome, Transport};
use crate::dispatch::{Dispatcher, StatusCallback, StatusChannel};
use crate::error::{MonitorError, MonitorResult};
use crate::guard::InFlightGuard;
use crate::tracker::StatusTracker;
use crate::trigger::{PeriodicTrigger, TickFn, TokioTriggerFactory, TriggerFactory};

/// Identity and policy for one monitored service.
#[derive(Clone)]
pub struct ServiceConfig {
    /// Unique registry key.
    pub name: String,
    /// URL probed with a single GET.
    pub endpoint: String,
    /// Time between scheduled checks.
    pub check_interval: Duration,
    /// Decides how probe outcomes are read.
    pub kind: ServiceKind,
    /// Invoked with the new status on every availability flip.
    pub on_status_changed: Option<StatusCallback>,
}

impl ServiceConfig {
    /// Create a service config with no callback.
    pub fn new(
        name: impl Into<String>,
        endpoint: impl Into<String>,
        check_interval: Duration,
        kind: ServiceKind,
    ) -> Self {
        Self {
            name: name.into(),
            endpoint: endpoint.into(),
            check_interval,
            kind,
            on_status_changed: None,
        }
    }

    /// Attach a per-service status callback.
    pub fn with_callback(mut self, callback: StatusCallback) -> Self {
        self.on_status_changed = Some(callback);
        self
    }
}

impl fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("name", &self.name)
            .field("endpoint", &self.endpoint)
            .field("check_interval", &self.check_interval)
            .field("kind", &self.kind)
            .field("on_status_changed", &self.on_status_changed.is_some())
            .finish()
    }
}

impl TryFrom<&ServiceSpec> for ServiceConfig {
    type Error = ConfigError;

    fn try_from(spec: &ServiceSpec) -> Result<Self, Self::Error> {
        Ok(Self::new(&spec.name, &spec.endpoint, spec.interval()?, spec.kind))
    }
}

/// Read-only view of a registered service.
#[derive(Debug, Clone)]
pub struct ServiceInfo {
    pub name: String,
    pub endpoint: String,
    pub kind: ServiceKind,
    pub check_interval: Duration,
    /// Whether the periodic trigger is currently armed.
    pub armed: bool,
    pub available: bool,
    pub transitions: u64,
    pub last_status: Option<ServiceStatus>,
}

/// Registry entry for one service.
struct ServiceEntry {
    config: ServiceConfig,
    in_flight: AtomicBool,
    tracker: StatusTracker,
    trigger: Mutex<Box<dyn PeriodicTrigger>>,
    /// Set on remove, replace, or dispose. Late completions for a retired
    /// entry still update its tracker but never notify.
    retired: AtomicBool,
}

impl ServiceEntry {
    fn trigger(&self) -> MutexGuard<'_, Box<dyn PeriodicTrigger>> {
        self.trigger.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn arm(&self) {
        let mut trigger = self.trigger();
        if trigger.is_armed() {
            return;
        }
        match trigger.start() {
            Ok(()) => info!(
                service = %self.config.name,
                interval = ?self.config.check_interval,
                "health monitor started"
            ),
            Err(e) => warn!(
                service = %self.config.name,
                error = %e,
                "failed to arm health trigger"
            ),
        }
    }

    fn disarm(&self) {
        let mut trigger = self.trigger();
        let was_armed = trigger.is_armed();
        match trigger.stop() {
            Ok(()) if was_armed => info!(service = %self.config.name, "health monitor stopped"),
            Ok(()) => {}
            Err(e) => warn!(
                service = %self.config.name,
                error = %e,
                "failed to disarm health trigger"
            ),
        }
    }

    fn retire(&self) {
        self.retired.store(true, Ordering::Release);
        self.disarm();
    }

    fn is_retired(&self) -> bool {
        self.retired.load(Ordering::Acquire)
    }

    fn info(&self) -> ServiceInfo {
        ServiceInfo {
            name: self.config.name.clone(),
            endpoint: self.config.endpoint.clone(),
            kind: self.config.kind,
            check_interval: self.config.check_interval,
            armed: self.trigger().is_armed(),
            available: self.tracker.is_available(),
            transitions: self.tracker.transitions(),
            last_status: self.tracker.last(),
        }
    }
}

struct MonitorInner {
    transport: Arc<dyn Transport>,
    triggers: Arc<dyn TriggerFactory>,
    dispatcher: Dispatcher,
    probe_timeout: Duration,
    services: RwLock<HashMap<String, Arc<ServiceEntry>>>,
    disposed: AtomicBool,
}

impl MonitorInner {
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<ServiceEntry>>> {
        self.services.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<ServiceEntry>>> {
        self.services.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    fn entry(&self, name: &str) -> Option<Arc<ServiceEntry>> {
        self.read().get(name).cloned()
    }

    /// One bounded GET on its own task. A panicking transport is reported as
    /// [`ProbeOutcome::UnexpectedError`] instead of unwinding into the caller.
    async fn probe(&self, endpoint: &str) -> ProbeOutcome {
        let transport = self.transport.clone();
        let url = endpoint.to_string();
        let timeout = self.probe_timeout;
        let mut task = tokio::spawn(async move { transport.get(&url, timeout).await });

        match tokio::time::timeout(timeout, &mut task).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) if e.is_panic() => ProbeOutcome::UnexpectedError(format!(
                "probe panicked: {}",
                panic_detail(e.into_panic())
            )),
            Ok(Err(e)) => ProbeOutcome::UnexpectedError(e.to_string()),
            Err(_) => {
                task.abort();
                ProbeOutcome::Timeout { after: timeout }
            }
        }
    }

    /// Run one check against a specific entry.
    async fn check_entry(&self, entry: &ServiceEntry) -> Option<ServiceStatus> {
        let config = &entry.config;
        let Some(_guard) = InFlightGuard::try_acquire(&entry.in_flight) else {
            debug!(service = %config.name, "check already in flight, dropped");
            return None;
        };

        let outcome = self.probe(&config.endpoint).await;

        let reading = interpret(config.kind, &outcome);
        let status = ServiceStatus::new(
            &config.name,
            config.kind,
            reading.available,
            reading.starting,
            reading.message,
        );
        debug!(
            service = %config.name,
            %outcome,
            available = status.is_available,
            starting = status.is_starting,
            "health check completed"
        );

        if entry.tracker.record(&status).is_some() {
            if entry.is_retired() || self.is_disposed() {
                debug!(
                    service = %config.name,
                    "service no longer registered, notification suppressed"
                );
            } else {
                self.dispatcher
                    .dispatch(&status, config.on_status_changed.as_ref())
                    .await;
            }
        }

        Some(status)
    }
}

fn panic_detail(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Fire-and-forget check on the current runtime.
fn spawn_check(inner: Arc<MonitorInner>, entry: Arc<ServiceEntry>) {
    match Handle::try_current() {
        Ok(runtime) => {
            runtime.spawn(async move {
                inner.check_entry(&entry).await;
            });
        }
        Err(_) => {
            warn!(service = %entry.config.name, "no async runtime available, check skipped");
        }
    }
}

fn tick_fn(inner: Weak<MonitorInner>, entry: Weak<ServiceEntry>) -> TickFn {
    Arc::new(move || {
        if let (Some(inner), Some(entry)) = (inner.upgrade(), entry.upgrade()) {
            spawn_check(inner, entry);
        }
    })
}

/// Builder for [`HealthMonitor`].
pub struct HealthMonitorBuilder {
    transport: Option<Arc<dyn Transport>>,
    triggers: Arc<dyn TriggerFactory>,
    channels: HashMap<ServiceKind, Arc<dyn StatusChannel>>,
    probe_timeout: Duration,
}

impl Default for HealthMonitorBuilder {
    fn default() -> Self {
        Self {
            transport: None,
            triggers: Arc::new(TokioTriggerFactory),
            channels: HashMap::new(),
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }
}

impl HealthMonitorBuilder {
    /// Use this transport for every probe.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Replace the tokio-backed periodic triggers.
    pub fn trigger_factory(mut self, triggers: Arc<dyn TriggerFactory>) -> Self {
        self.triggers = triggers;
        self
    }

    /// Register the notification channel for one service kind.
    pub fn channel(mut self, kind: ServiceKind, channel: Arc<dyn StatusChannel>) -> Self {
        self.channels.insert(kind, channel);
        self
    }

    /// Bound every probe by `timeout` (default 5s).
    pub fn probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Build the monitor. Falls back to [`HttpTransport`] when no transport
    /// was supplied.
    pub fn build(self) -> MonitorResult<HealthMonitor> {
        let transport = match self.transport {
            Some(t) => t,
            None => Arc::new(HttpTransport::new()?),
        };
        Ok(HealthMonitor {
            inner: Arc::new(MonitorInner {
                transport,
                triggers: self.triggers,
                dispatcher: Dispatcher::new(self.channels),
                probe_timeout: self.probe_timeout,
                services: RwLock::new(HashMap::new()),
                disposed: AtomicBool::new(false),
            }),
        })
    }
}

/// Tracks the liveness of independently configured services.
///
/// Every operation tolerates unknown names and calls after [`dispose`],
/// which are silent no-ops.
///
/// [`dispose`]: HealthMonitor::dispose
pub struct HealthMonitor {
    inner: Arc<MonitorInner>,
}

impl HealthMonitor {
    /// Create a builder with default transport and triggers.
    pub fn builder() -> HealthMonitorBuilder {
        HealthMonitorBuilder::default()
    }

    /// Monitor with the given transport, tokio triggers, and no channels.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            inner: Arc::new(MonitorInner {
                transport,
                triggers: Arc::new(TokioTriggerFactory),
                dispatcher: Dispatcher::default(),
                probe_timeout: DEFAULT_PROBE_TIMEOUT,
                services: RwLock::new(HashMap::new()),
                disposed: AtomicBool::new(false),
            }),
        }
    }

    /// Register a service, replacing any existing one with the same name.
    ///
    /// The new entry starts stopped with availability `false`. A replaced
    /// entry is stopped and its in-flight check will not notify.
    pub fn add_service(&self, config: ServiceConfig) -> MonitorResult<()> {
        if config.name.trim().is_empty() {
            return Err(MonitorError::EmptyName);
        }
        if config.check_interval.is_zero() {
            return Err(MonitorError::InvalidInterval {
                name: config.name,
                interval: config.check_interval,
            });
        }

        let mut services = self.inner.write();
        if self.inner.is_disposed() {
            debug!(service = %config.name, "monitor disposed, add ignored");
            return Ok(());
        }

        let name = config.name.clone();
        let interval = config.check_interval;
        let weak_inner = Arc::downgrade(&self.inner);
        let entry = Arc::new_cyclic(|weak_entry| ServiceEntry {
            trigger: Mutex::new(
                self.inner
                    .triggers
                    .create(interval, tick_fn(weak_inner, weak_entry.clone())),
            ),
            config,
            in_flight: AtomicBool::new(false),
            tracker: StatusTracker::new(),
            retired: AtomicBool::new(false),
        });

        if let Some(old) = services.insert(name.clone(), entry) {
            old.retire();
            info!(service = %name, "service replaced");
        } else {
            debug!(service = %name, "service registered");
        }
        Ok(())
    }

    /// Unregister a service. Returns whether it was registered.
    pub fn remove_service(&self, name: &str) -> bool {
        let removed = self.inner.write().remove(name);
        match removed {
            Some(entry) => {
                entry.retire();
                debug!(service = %name, "service removed");
                true
            }
            None => false,
        }
    }

    /// Check immediately in the background, then arm the periodic trigger.
    pub fn start_service(&self, name: &str) {
        if self.inner.is_disposed() {
            return;
        }
        let services = self.inner.read();
        match services.get(name) {
            Some(entry) => self.start_entry(entry),
            None => debug!(service = %name, "start requested for unknown service"),
        }
    }

    /// Disarm the trigger. An in-flight check still completes and may notify.
    pub fn stop_service(&self, name: &str) {
        let services = self.inner.read();
        match services.get(name) {
            Some(entry) => entry.disarm(),
            None => debug!(service = %name, "stop requested for unknown service"),
        }
    }

    /// Start every registered service.
    pub fn start_all(&self) {
        if self.inner.is_disposed() {
            return;
        }
        let services = self.inner.read();
        for entry in services.values() {
            self.start_entry(entry);
        }
    }

    /// Disarm every trigger. In-flight checks still complete.
    pub fn stop_all(&self) {
        let services = self.inner.read();
        for entry in services.values() {
            entry.disarm();
        }
    }

    /// Run one check now, outside the schedule.
    ///
    /// Returns `None` when the service is unknown, the monitor is disposed,
    /// or another check for the same service is still in flight.
    pub async fn check_service(&self, name: &str) -> Option<ServiceStatus> {
        if self.inner.is_disposed() {
            return None;
        }
        let Some(entry) = self.inner.entry(name) else {
            debug!(service = %name, "check requested for unknown service");
            return None;
        };
        self.inner.check_entry(&entry).await
    }

    /// Stop every trigger and clear the registry. Safe to call repeatedly.
    pub fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        let drained: Vec<_> = self.inner.write().drain().collect();
        for (_, entry) in &drained {
            entry.retire();
        }
        info!(services = drained.len(), "health monitor disposed");
    }

    /// Whether [`HealthMonitor::dispose`] has run.
    pub fn is_disposed(&self) -> bool {
        self.inner.is_disposed()
    }

    /// Whether a service with this name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.inner.read().contains_key(name)
    }

    /// Last status produced for a service, if it has been checked.
    pub fn status(&self, name: &str) -> Option<ServiceStatus> {
        self.inner.entry(name).and_then(|e| e.tracker.last())
    }

    /// Last statuses of every checked service, ordered by name.
    pub fn statuses(&self) -> Vec<ServiceStatus> {
        let mut statuses: Vec<_> = self
            .inner
            .read()
            .values()
            .filter_map(|e| e.tracker.last())
            .collect();
        statuses.sort_by(|a, b| a.service_name.cmp(&b.service_name));
        statuses
    }

    /// Read-only view of one service.
    pub fn service(&self, name: &str) -> Option<ServiceInfo> {
        self.inner.entry(name).map(|e| e.info())
    }

    /// Every registered service, ordered by name.
    pub fn services(&self) -> Vec<ServiceInfo> {
        let mut infos: Vec<_> = self.inner.read().values().map(|e| e.info()).collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        infos
    }

    fn start_entry(&self, entry: &Arc<ServiceEntry>) {
        spawn_check(self.inner.clone(), entry.clone());
        entry.arm();
    }
}

impl Drop for HealthMonitor {
    fn drop(&mut self) {
        self.dispose();
    }
}
