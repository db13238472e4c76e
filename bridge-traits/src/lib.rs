//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host platform.
//!
//! ## Overview
//!
//! This crate defines the contract between the media-session core and the
//! platform that actually renders lock-screen controls, notifications and
//! foreground status. Each trait represents a capability that the core
//! requires but that must be implemented differently per platform.
//!
//! ## Traits
//!
//! ### Session & Notification
//! - [`MediaSessionHost`](session::MediaSessionHost) - Platform media session facade
//! - [`NotificationHost`](notification::NotificationHost) - Status notification and foreground service
//! - [`WakeLock`](power::WakeLock) - Partial wake lock held while playing
//!
//! ### Artwork
//! - [`ArtSource`](artwork::ArtSource) - Content-handle thumbnails and raw image bytes
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Platform Requirements
//!
//! | Platform | Implementation Crate | Status |
//! |----------|---------------------|--------|
//! | Desktop  | `bridge-desktop`    | ✅ Headless hosts |
//! | Android  | TBD                 | 📋 Planned |
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type. A
//! failing [`MediaSessionHost::connect`](session::MediaSessionHost::connect)
//! must return [`BridgeError::ConnectionFailed`] so the core can record the
//! failure for the session instance.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` bounds on native targets (see
//! [`platform`]). Updates may arrive from any thread; the core serializes
//! them before calling into the host.
//!
//! ## Examples
//!
//! ### Implementing WakeLock
//!
//! ```ignore
//! use bridge_traits::power::WakeLock;
//! use bridge_traits::error::Result;
//! use std::sync::atomic::{AtomicBool, Ordering};
//!
//! pub struct MyWakeLock {
//!     held: AtomicBool,
//! }
//!
//! impl WakeLock for MyWakeLock {
//!     fn acquire(&self) -> Result<()> {
//!         self.held.store(true, Ordering::SeqCst);
//!         Ok(())
//!     }
//!
//!     fn release(&self) -> Result<()> {
//!         self.held.store(false, Ordering::SeqCst);
//!         Ok(())
//!     }
//!
//!     fn is_held(&self) -> bool {
//!         self.held.load(Ordering::SeqCst)
//!     }
//! }
//! ```

pub mod artwork;
pub mod error;
pub mod input;
pub mod notification;
pub mod platform;
pub mod power;
pub mod session;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use artwork::{ArtBitmap, ArtSource};
pub use input::{KeyAction, KeyEvent};
pub use notification::{NotificationButton, NotificationChannel, NotificationHost, NotificationPayload};
pub use power::WakeLock;
pub use session::{
    CustomActionSpec, MediaSessionHost, MetadataValue, PlatformCapabilities, PlatformPlaybackState,
    PlatformState, QueueEntry, RemoteVolume, SessionMetadata, TransportModes, VolumeControl,
};
pub use time::{Clock, FixedClock, LogEntry, LogLevel, LoggerSink, SystemClock};
