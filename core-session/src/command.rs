//! Inbound commands from the platform session.
//!
//! Hosts translate their session callbacks into [`PlatformCommand`]s and
//! hand them to [`MediaSession::handle_command`](crate::MediaSession::handle_command).

use core_metadata::{Extras, Rating};
use serde::{Deserialize, Serialize};

use bridge_traits::input::KeyEvent;

/// One callback from the platform session or notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum PlatformCommand {
    MediaButton { event: KeyEvent },
    Prepare,
    PrepareFromMediaId { media_id: String, #[serde(default)] extras: Extras },
    PrepareFromSearch { query: String, #[serde(default)] extras: Extras },
    PrepareFromUri { uri: String, #[serde(default)] extras: Extras },
    Play,
    PlayFromMediaId { media_id: String, #[serde(default)] extras: Extras },
    PlayFromSearch { query: String, #[serde(default)] extras: Extras },
    PlayFromUri { uri: String, #[serde(default)] extras: Extras },
    PlayMediaItem { media_id: String },
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
    CustomAction { name: String, #[serde(default)] extras: Extras },
    AddQueueItem { media_id: String },
    AddQueueItemAt { media_id: String, index: usize },
    RemoveQueueItem { media_id: String },
    RemoveQueueItemAt { index: usize },
    SetVolumeTo { volume: i32 },
    AdjustVolume { direction: i32 },
    /// The user swiped the notification away
    NotificationDeleted,
    /// The user removed the app from the recents list
    TaskRemoved,
}

impl PlatformCommand {
    /// Whether the session must be active before the command is forwarded.
    pub fn requires_activation(&self) -> bool {
        matches!(
            self,
            PlatformCommand::Prepare
                | PlatformCommand::PrepareFromMediaId { .. }
                | PlatformCommand::PrepareFromSearch { .. }
                | PlatformCommand::PrepareFromUri { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_metadata::ExtraValue;
    use serde_json::json;

    #[test]
    fn test_deserialize_tagged_command() {
        let command: PlatformCommand = serde_json::from_value(json!({
            "command": "playFromMediaId",
            "media_id": "song-1",
            "extras": { "source": "search" }
        }))
        .unwrap();

        let mut extras = Extras::new();
        extras.insert("source".to_string(), ExtraValue::Text("search".to_string()));
        assert_eq!(
            command,
            PlatformCommand::PlayFromMediaId {
                media_id: "song-1".to_string(),
                extras
            }
        );
    }

    #[test]
    fn test_prepare_family_requires_activation() {
        assert!(PlatformCommand::Prepare.requires_activation());
        assert!(PlatformCommand::PrepareFromUri {
            uri: "content://media/1".to_string(),
            extras: Extras::new()
        }
        .requires_activation());
        assert!(!PlatformCommand::Play.requires_activation());
    }
}
