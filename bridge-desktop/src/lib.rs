//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! Desktop hosts have no system media session, so most adapters here are
//! headless: they keep what the core publishes in memory and log it.
//! - `ArtSource` using `tokio::fs` for paths and `file://` URIs
//! - `MediaSessionHost` as an in-memory recorder
//! - `NotificationHost` as an in-memory recorder
//! - `WakeLock` as an atomic flag (desktop processes are never suspended)
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{HeadlessNotificationHost, HeadlessSessionHost, TokioArtSource};
//!
//! #[tokio::main]
//! async fn main() {
//!     let session = HeadlessSessionHost::default();
//!     let notifications = HeadlessNotificationHost::new();
//!     let art = TokioArtSource::new();
//!
//!     // Use in core configuration
//! }
//! ```

mod artwork;
mod notification;
mod power;
mod session;

pub use artwork::TokioArtSource;
pub use notification::{HeadlessNotificationHost, HeadlessNotificationState};
pub use power::DesktopWakeLock;
pub use session::{HeadlessSessionHost, HeadlessSessionState, VolumeRouting};
