//! Power Management
//!
//! Keeps the CPU awake while audio is playing.

use crate::{error::Result, platform::PlatformSendSync};

/// Partial wake lock held by the session while playing.
///
/// Implementations are plain toggles. The core tracks idempotence itself and
/// only calls `acquire` when [`is_held`](WakeLock::is_held) is false and
/// `release` when it is true.
pub trait WakeLock: PlatformSendSync {
    fn acquire(&self) -> Result<()>;

    fn release(&self) -> Result<()>;

    fn is_held(&self) -> bool;
}
