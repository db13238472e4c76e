//! Headless notification host.

use async_trait::async_trait;
use bridge_traits::{
    error::Result,
    notification::{NotificationChannel, NotificationHost, NotificationPayload},
};
use parking_lot::Mutex;
use tracing::debug;

/// What the notification host currently shows.
#[derive(Debug, Clone, Default)]
pub struct HeadlessNotificationState {
    pub channels: Vec<NotificationChannel>,
    pub visible: Option<NotificationPayload>,
    pub foreground: bool,
    /// Every payload posted, in order, through `notify` or `start_foreground`.
    pub posted: Vec<NotificationPayload>,
    pub cancellations: u32,
}

/// Keeps notifications in memory and logs each change.
#[derive(Debug, Default)]
pub struct HeadlessNotificationHost {
    state: Mutex<HeadlessNotificationState>,
}

impl HeadlessNotificationHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> HeadlessNotificationState {
        self.state.lock().clone()
    }
}

#[async_trait]
impl NotificationHost for HeadlessNotificationHost {
    async fn ensure_channel(&self, channel: &NotificationChannel) -> Result<()> {
        let mut state = self.state.lock();
        if !state.channels.iter().any(|c| c.id == channel.id) {
            debug!(channel_id = %channel.id, "Notification channel created");
            state.channels.push(channel.clone());
        }
        Ok(())
    }

    async fn start_foreground(&self, payload: NotificationPayload) -> Result<()> {
        let mut state = self.state.lock();
        state.foreground = true;
        state.posted.push(payload.clone());
        state.visible = Some(payload);
        debug!("Entered foreground");
        Ok(())
    }

    async fn notify(&self, payload: NotificationPayload) -> Result<()> {
        let mut state = self.state.lock();
        state.posted.push(payload.clone());
        state.visible = Some(payload);
        Ok(())
    }

    async fn cancel(&self) -> Result<()> {
        let mut state = self.state.lock();
        state.visible = None;
        state.cancellations += 1;
        Ok(())
    }

    async fn stop_foreground(&self, remove_notification: bool) -> Result<()> {
        let mut state = self.state.lock();
        state.foreground = false;
        if remove_notification {
            state.visible = None;
        }
        debug!(remove_notification, "Left foreground");
        Ok(())
    }
}
