//! Single-flight guard for per-service checks.

use std::sync::atomic::{AtomicBool, Ordering};

/// Scoped claim on a service's in-flight flag.
///
/// Acquiring is a test-and-set; a second caller gets `None` and is expected
/// to drop its check rather than wait. The flag is cleared when the guard is
/// dropped, which covers early returns, panics, and a cancelled future.
#[derive(Debug)]
pub struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> InFlightGuard<'a> {
    pub fn try_acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_is_refused() {
        let flag = AtomicBool::new(false);
        let first = InFlightGuard::try_acquire(&flag);
        assert!(first.is_some());
        assert!(InFlightGuard::try_acquire(&flag).is_none());
        assert!(flag.load(Ordering::SeqCst));
    }

    #[test]
    fn drop_releases_flag() {
        let flag = AtomicBool::new(false);
        {
            let _guard = InFlightGuard::try_acquire(&flag).unwrap();
        }
        assert!(!flag.load(Ordering::SeqCst));
        assert!(InFlightGuard::try_acquire(&flag).is_some());
    }

    #[test]
    fn released_on_panic() {
        let flag = AtomicBool::new(false);
        let result = std::panic::catch_unwind(|| {
            let _guard = InFlightGuard::try_acquire(&flag).unwrap();
            panic!("probe blew up");
        });
        assert!(result.is_err());
        assert!(!flag.load(Ordering::SeqCst));
    }
}
