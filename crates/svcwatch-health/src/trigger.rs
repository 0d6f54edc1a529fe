//! Periodic triggers: one independent schedule per service.
//!
//! The engine only sees [`PeriodicTrigger`] and [`TriggerFactory`], so the
//! scheduling primitive can be swapped (a UI event loop, a test clock)
//! without touching the monitor. [`TokioTrigger`] is the production
//! implementation.

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::error::TriggerError;

/// Callback fired on every tick. Must not block; the monitor's tick spawns
/// the actual check.
pub type TickFn = Arc<dyn Fn() + Send + Sync>;

/// A start/stop-able periodic schedule.
///
/// `start` arms the trigger so the first tick fires one interval later;
/// `start` and `stop` are both idempotent.
pub trait PeriodicTrigger: Send {
    /// Arm the schedule. No-op when already armed.
    fn start(&mut self) -> Result<(), TriggerError>;
    /// Disarm the schedule. No-op when not armed.
    fn stop(&mut self) -> Result<(), TriggerError>;
    /// Whether ticks are currently being delivered.
    fn is_armed(&self) -> bool;
}

/// Creates a fresh, stopped trigger for a service.
pub trait TriggerFactory: Send + Sync {
    /// Build a stopped trigger that calls `tick` every `interval`.
    fn create(&self, interval: Duration, tick: TickFn) -> Box<dyn PeriodicTrigger>;
}

/// Builds [`TokioTrigger`]s on whichever runtime is current at `start`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioTriggerFactory;

impl TriggerFactory for TokioTriggerFactory {
    fn create(&self, interval: Duration, tick: TickFn) -> Box<dyn PeriodicTrigger> {
        Box::new(TokioTrigger::new(interval, tick))
    }
}

/// Handle to a running trigger task.
struct TriggerSlot {
    handle: JoinHandle<()>,
    shutdown_tx: watch::Sender<bool>,
}

/// Periodic trigger driven by a spawned tokio task.
pub struct TokioTrigger {
    interval: Duration,
    tick: TickFn,
    slot: Option<TriggerSlot>,
}

impl TokioTrigger {
    /// Create a stopped trigger.
    pub fn new(interval: Duration, tick: TickFn) -> Self {
        Self {
            interval,
            tick,
            slot: None,
        }
    }
}

impl PeriodicTrigger for TokioTrigger {
    fn start(&mut self) -> Result<(), TriggerError> {
        if self.is_armed() {
            return Ok(());
        }

        let runtime = Handle::try_current().map_err(|_| TriggerError::NoRuntime)?;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = runtime.spawn(run_trigger_loop(
            self.interval,
            self.tick.clone(),
            shutdown_rx,
        ));

        self.slot = Some(TriggerSlot {
            handle,
            shutdown_tx,
        });
        Ok(())
    }

    fn stop(&mut self) -> Result<(), TriggerError> {
        if let Some(slot) = self.slot.take() {
            let _ = slot.shutdown_tx.send(true);
            slot.handle.abort();
        }
        Ok(())
    }

    fn is_armed(&self) -> bool {
        self.slot
            .as_ref()
            .is_some_and(|slot| !slot.handle.is_finished())
    }
}

impl Drop for TokioTrigger {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

/// Longest period a trigger will wait between ticks (about 30 years).
const MAX_TRIGGER_PERIOD: Duration = Duration::from_secs(86_400 * 365 * 30);

async fn run_trigger_loop(period: Duration, tick: TickFn, mut shutdown: watch::Receiver<bool>) {
    // Deadlines past the clock's range would panic the task and silently disarm it.
    let period = period.clamp(Duration::from_millis(1), MAX_TRIGGER_PERIOD);
    // The caller runs the immediate check itself; skip interval's instant first tick.
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => tick(),
            _ = shutdown.changed() => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_tick() -> (TickFn, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let tick: TickFn = Arc::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        (tick, count)
    }

    #[tokio::test(start_paused = true)]
    async fn first_tick_waits_one_interval() {
        let (tick, count) = counting_tick();
        let mut trigger = TokioTriggerFactory.create(Duration::from_millis(10), tick);

        trigger.start().unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_halts_ticks() {
        let (tick, count) = counting_tick();
        let mut trigger = TokioTrigger::new(Duration::from_millis(10), tick);

        trigger.start().unwrap();
        tokio::time::sleep(Duration::from_millis(25)).await;
        trigger.stop().unwrap();
        assert!(!trigger.is_armed());

        let seen = count.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(count.load(Ordering::SeqCst), seen);
    }

    #[tokio::test(start_paused = true)]
    async fn start_is_idempotent() {
        let (tick, count) = counting_tick();
        let mut trigger = TokioTrigger::new(Duration::from_millis(10), tick);

        trigger.start().unwrap();
        trigger.start().unwrap();
        assert!(trigger.is_armed());

        tokio::time::sleep(Duration::from_millis(35)).await;
        // A second task would have doubled this.
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_without_start_is_noop() {
        let (tick, _count) = counting_tick();
        let mut trigger = TokioTrigger::new(Duration::from_millis(10), tick);
        trigger.stop().unwrap();
        trigger.stop().unwrap();
        assert!(!trigger.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn restart_after_stop() {
        let (tick, count) = counting_tick();
        let mut trigger = TokioTrigger::new(Duration::from_millis(10), tick);

        trigger.start().unwrap();
        trigger.stop().unwrap();
        trigger.start().unwrap();
        tokio::time::sleep(Duration::from_millis(15)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn unschedulable_interval_stays_armed() {
        let (tick, count) = counting_tick();
        let mut trigger = TokioTrigger::new(Duration::from_secs(u64::MAX), tick);

        trigger.start().unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(trigger.is_armed());
        assert_eq!(count.load(Ordering::SeqCst), 0);
        trigger.stop().unwrap();
    }

    #[test]
    fn start_outside_runtime_fails() {
        let (tick, _count) = counting_tick();
        let mut trigger = TokioTrigger::new(Duration::from_millis(10), tick);
        assert!(matches!(trigger.start(), Err(TriggerError::NoRuntime)));
        assert!(!trigger.is_armed());
    }
}
