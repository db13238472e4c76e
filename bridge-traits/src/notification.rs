//! Status Notification and Foreground Service
//!
//! The persistent media notification plus the foreground-service status that
//! keeps the process alive while playing.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{artwork::ArtBitmap, error::Result, platform::PlatformSendSync};

/// Notification channel definition, created on first use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationChannel {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub show_badge: bool,
}

/// A native notification button.
///
/// `key_code` is the media key event the button fires. Controls without a
/// matching key carry `None` and render without an intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationButton {
    pub icon: String,
    pub label: String,
    pub key_code: Option<i32>,
}

/// Everything the host needs to render the media notification.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationPayload {
    pub channel_id: String,
    pub small_icon: String,
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub description: Option<String>,
    pub large_icon: Option<Arc<ArtBitmap>>,
    /// Activity opened on tap, when clicking starts an activity.
    pub content_activity: Option<String>,
    pub color: Option<i32>,
    pub buttons: Vec<NotificationButton>,
    pub compact_indices: Vec<usize>,
    /// Non-dismissible notification with a cancel button that sends stop.
    pub ongoing: bool,
    pub cancel_key_code: Option<i32>,
}

/// Notification host trait
///
/// - **Android**: `NotificationManager` plus `Service.startForeground`
/// - **Desktop**: tray or desktop notification daemon
///
/// Deleting the notification is reported back through the session's inbound
/// command path, not through this trait.
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
pub trait NotificationHost: PlatformSendSync {
    /// Create the channel if the host does not know it yet.
    async fn ensure_channel(&self, channel: &NotificationChannel) -> Result<()>;

    /// Enter foreground status showing `payload`.
    async fn start_foreground(&self, payload: NotificationPayload) -> Result<()>;

    /// Replace the visible notification.
    async fn notify(&self, payload: NotificationPayload) -> Result<()>;

    async fn cancel(&self) -> Result<()>;

    /// Leave foreground status, optionally removing the notification.
    async fn stop_foreground(&self, remove_notification: bool) -> Result<()>;
}
