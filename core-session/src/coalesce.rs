//! Single-slot "latest pending job" cell.
//!
//! Writers replace whatever is pending; the owning task drains the slot at
//! its own pace. However many writes land before a drain, the drain sees one
//! value: the most recent.

use parking_lot::Mutex;
use tokio::sync::Notify;

#[derive(Debug)]
pub struct LatestSlot<T> {
    pending: Mutex<Option<T>>,
    notify: Notify,
}

impl<T> LatestSlot<T> {
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(None),
            notify: Notify::new(),
        }
    }

    /// Stores `value`, dropping any value still pending.
    ///
    /// Returns `true` if a pending value was replaced.
    pub fn replace(&self, value: T) -> bool {
        let replaced = self.pending.lock().replace(value).is_some();
        self.notify.notify_one();
        replaced
    }

    /// Takes the pending value without waiting.
    pub fn take(&self) -> Option<T> {
        self.pending.lock().take()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.lock().is_some()
    }

    /// Waits until a value is pending and takes it.
    pub async fn wait(&self) -> T {
        loop {
            if let Some(value) = self.take() {
                return value;
            }
            self.notify.notified().await;
        }
    }
}

impl<T> Default for LatestSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}
