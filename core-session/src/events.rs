//! # Control Events
//!
//! Abstract events delivered to the application layer, and the channel that
//! carries them.
//!
//! ## Overview
//!
//! Every inbound platform interaction (button press, lock screen control,
//! queue edit from a car head unit) ends up as one [`ControlEvent`] on a
//! single unbounded channel. Delivery is fire-and-forget: when nobody is
//! listening, events are dropped.
//!
//! ## Usage
//!
//! ```ignore
//! let mut events = session.subscribe();
//! while let Some(event) = events.recv().await {
//!     match event {
//!         ControlEvent::Play => player.play().await,
//!         ControlEvent::Click { button } => player.toggle(button).await,
//!         _ => {}
//!     }
//! }
//! ```

use std::sync::Arc;

use core_metadata::{Extras, MediaRecord, Rating};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::trace;

/// Physical button a click came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MediaButton {
    Media,
    Next,
    Previous,
}

/// Event delivered to the application layer.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlEvent {
    /// Genuine hardware button press
    Click { button: MediaButton },
    Prepare,
    PrepareFromMediaId { media_id: String, extras: Extras },
    PrepareFromSearch { query: String, extras: Extras },
    PrepareFromUri { uri: String, extras: Extras },
    Play,
    PlayFromMediaId { media_id: String, extras: Extras },
    PlayFromSearch { query: String, extras: Extras },
    PlayFromUri { uri: String, extras: Extras },
    PlayMediaItem { record: Arc<MediaRecord> },
    Pause,
    Stop,
    SeekTo { position_ms: u64 },
    SkipToNext,
    SkipToPrevious,
    SkipToQueueItem { queue_id: i64 },
    FastForward,
    Rewind,
    SetRepeatMode { mode: i32 },
    SetShuffleMode { mode: i32 },
    SetRating { rating: Rating, extras: Option<Extras> },
    SetPlaybackSpeed { speed: f32 },
    SetCaptioningEnabled { enabled: bool },
    CustomAction { name: String, extras: Extras },
    AddQueueItem { record: Arc<MediaRecord> },
    AddQueueItemAt { record: Arc<MediaRecord>, index: usize },
    RemoveQueueItem { record: Arc<MediaRecord> },
    RemoveQueueItemAt { index: usize },
    SetVolumeTo { volume: i32 },
    AdjustVolume { direction: i32 },
    TaskRemoved,
    /// The user dismissed the notification
    Close,
    Destroy,
}

impl ControlEvent {
    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            ControlEvent::Click { .. } => "click",
            ControlEvent::Prepare => "prepare",
            ControlEvent::PrepareFromMediaId { .. } => "prepare_from_media_id",
            ControlEvent::PrepareFromSearch { .. } => "prepare_from_search",
            ControlEvent::PrepareFromUri { .. } => "prepare_from_uri",
            ControlEvent::Play => "play",
            ControlEvent::PlayFromMediaId { .. } => "play_from_media_id",
            ControlEvent::PlayFromSearch { .. } => "play_from_search",
            ControlEvent::PlayFromUri { .. } => "play_from_uri",
            ControlEvent::PlayMediaItem { .. } => "play_media_item",
            ControlEvent::Pause => "pause",
            ControlEvent::Stop => "stop",
            ControlEvent::SeekTo { .. } => "seek_to",
            ControlEvent::SkipToNext => "skip_to_next",
            ControlEvent::SkipToPrevious => "skip_to_previous",
            ControlEvent::SkipToQueueItem { .. } => "skip_to_queue_item",
            ControlEvent::FastForward => "fast_forward",
            ControlEvent::Rewind => "rewind",
            ControlEvent::SetRepeatMode { .. } => "set_repeat_mode",
            ControlEvent::SetShuffleMode { .. } => "set_shuffle_mode",
            ControlEvent::SetRating { .. } => "set_rating",
            ControlEvent::SetPlaybackSpeed { .. } => "set_playback_speed",
            ControlEvent::SetCaptioningEnabled { .. } => "set_captioning_enabled",
            ControlEvent::CustomAction { .. } => "custom_action",
            ControlEvent::AddQueueItem { .. } => "add_queue_item",
            ControlEvent::AddQueueItemAt { .. } => "add_queue_item_at",
            ControlEvent::RemoveQueueItem { .. } => "remove_queue_item",
            ControlEvent::RemoveQueueItemAt { .. } => "remove_queue_item_at",
            ControlEvent::SetVolumeTo { .. } => "set_volume_to",
            ControlEvent::AdjustVolume { .. } => "adjust_volume",
            ControlEvent::TaskRemoved => "task_removed",
            ControlEvent::Close => "close",
            ControlEvent::Destroy => "destroy",
        }
    }
}

/// Receiving end handed to the application layer.
pub type ControlEventReceiver = mpsc::UnboundedReceiver<ControlEvent>;

/// Sending side of the listener channel. At most one listener is attached;
/// subscribing again replaces it.
#[derive(Debug, Default)]
pub struct ControlEventSender {
    listener: Mutex<Option<mpsc::UnboundedSender<ControlEvent>>>,
}

impl ControlEventSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches a new listener, detaching the previous one.
    pub fn subscribe(&self) -> ControlEventReceiver {
        let (tx, rx) = mpsc::unbounded_channel();
        *self.listener.lock() = Some(tx);
        rx
    }

    pub fn detach(&self) {
        self.listener.lock().take();
    }

    pub fn has_listener(&self) -> bool {
        self.listener
            .lock()
            .as_ref()
            .is_some_and(|tx| !tx.is_closed())
    }

    /// Sends `event` to the listener, dropping it when there is none.
    pub fn dispatch(&self, event: ControlEvent) {
        let mut listener = self.listener.lock();
        let Some(tx) = listener.as_ref() else {
            trace!(event = event.name(), "No listener, dropping control event");
            return;
        };
        if let Err(err) = tx.send(event) {
            trace!(event = err.0.name(), "Listener gone, dropping control event");
            listener.take();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_without_listener_is_noop() {
        let sender = ControlEventSender::new();
        assert!(!sender.has_listener());
        sender.dispatch(ControlEvent::Play);
    }

    #[tokio::test]
    async fn test_events_arrive_in_order() {
        let sender = ControlEventSender::new();
        let mut rx = sender.subscribe();

        sender.dispatch(ControlEvent::Play);
        sender.dispatch(ControlEvent::SeekTo { position_ms: 1_000 });
        sender.dispatch(ControlEvent::Pause);

        assert_eq!(rx.recv().await, Some(ControlEvent::Play));
        assert_eq!(rx.recv().await, Some(ControlEvent::SeekTo { position_ms: 1_000 }));
        assert_eq!(rx.recv().await, Some(ControlEvent::Pause));
    }

    #[tokio::test]
    async fn test_resubscribe_replaces_listener() {
        let sender = ControlEventSender::new();
        let mut first = sender.subscribe();
        let mut second = sender.subscribe();

        sender.dispatch(ControlEvent::Stop);

        assert_eq!(second.recv().await, Some(ControlEvent::Stop));
        assert_eq!(first.recv().await, None);
    }

    #[test]
    fn test_dropped_receiver_detaches() {
        let sender = ControlEventSender::new();
        drop(sender.subscribe());

        sender.dispatch(ControlEvent::Close);
        assert!(!sender.has_listener());
    }
}
