//! In-process wake lock.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use bridge_traits::{error::Result, power::WakeLock};
use tracing::trace;

/// Desktop processes are never suspended while running, so the lock only
/// tracks its own state. The acquire counter lets callers observe churn.
#[derive(Debug, Default)]
pub struct DesktopWakeLock {
    held: AtomicBool,
    acquisitions: AtomicU64,
}

impl DesktopWakeLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of times the lock went from released to held.
    pub fn acquisitions(&self) -> u64 {
        self.acquisitions.load(Ordering::SeqCst)
    }
}

impl WakeLock for DesktopWakeLock {
    fn acquire(&self) -> Result<()> {
        if !self.held.swap(true, Ordering::SeqCst) {
            self.acquisitions.fetch_add(1, Ordering::SeqCst);
            trace!("Wake lock acquired");
        }
        Ok(())
    }

    fn release(&self) -> Result<()> {
        if self.held.swap(false, Ordering::SeqCst) {
            trace!("Wake lock released");
        }
        Ok(())
    }

    fn is_held(&self) -> bool {
        self.held.load(Ordering::SeqCst)
    }
}
