//! Playback state projection.
//!
//! Pure mapping from the abstract [`PlaybackStatus`] and [`ActionSet`] to the
//! values the platform session publishes.

use std::collections::BTreeMap;

use bridge_traits::session::{
    CustomActionSpec, PlatformPlaybackState, PlatformState, SessionError, TransportModes,
};
use chrono::{DateTime, Utc};

use crate::state::{ActionSet, PlaybackStatus, ProcessingState};

/// Error code published when the application reports a message without one.
pub const UNSPECIFIED_ERROR_CODE: i32 = -987654;

/// Playback state extra naming the media currently loaded.
pub const EXTRA_NOW_PLAYING_MEDIA_ID: &str = "android.media.PLAYBACK_STATE_EXTRAS_KEY_MEDIA_ID";

/// Platform values derived from one status update.
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    pub playback: PlatformPlaybackState,
    pub modes: TransportModes,
}

/// Maps a processing state and the playing flag to the platform state code.
pub fn platform_state(processing_state: ProcessingState, playing: bool) -> PlatformState {
    match processing_state {
        ProcessingState::Idle => PlatformState::None,
        ProcessingState::Loading => PlatformState::Connecting,
        ProcessingState::Buffering => PlatformState::Buffering,
        ProcessingState::Ready | ProcessingState::Completed => {
            if playing {
                PlatformState::Playing
            } else {
                PlatformState::Paused
            }
        }
        ProcessingState::Error => PlatformState::Error,
    }
}

/// Error surfaced on the platform state, if any.
///
/// A message without a code is published under
/// [`UNSPECIFIED_ERROR_CODE`]. A code without a message is not published.
pub fn platform_error(code: Option<i32>, message: Option<&str>) -> Option<SessionError> {
    let message = message?;
    Some(SessionError {
        code: code.unwrap_or(UNSPECIFIED_ERROR_CODE),
        message: message.to_string(),
    })
}

/// Projects a status update.
///
/// # Arguments
///
/// * `status` - Reported playback status
/// * `actions` - Controls and capability bits of the same update
/// * `custom_actions` - Controls degraded to custom actions
/// * `media_id` - Id of the current metadata record, if any
/// * `now` - Used as the sample time when the status carries none
pub fn project(
    status: &PlaybackStatus,
    actions: &ActionSet,
    custom_actions: Vec<CustomActionSpec>,
    media_id: Option<&str>,
    now: DateTime<Utc>,
) -> Projection {
    let mut extras = BTreeMap::new();
    if let Some(id) = media_id {
        extras.insert(EXTRA_NOW_PLAYING_MEDIA_ID.to_string(), id.to_string());
    }

    let playback = PlatformPlaybackState {
        state: platform_state(status.processing_state, status.playing),
        actions: actions.capability_mask(),
        position_ms: duration_ms(status.position),
        buffered_position_ms: duration_ms(status.buffered_position),
        speed: status.speed,
        update_time_ms: status.update_time.unwrap_or(now).timestamp_millis(),
        active_queue_item_id: status.active_queue_index,
        error: platform_error(status.error_code, status.error_message.as_deref()),
        custom_actions,
        extras,
    };

    Projection {
        playback,
        modes: TransportModes {
            repeat_mode: status.repeat_mode,
            shuffle_mode: status.shuffle_mode,
            captioning_enabled: status.captioning_enabled,
        },
    }
}

fn duration_ms(duration: std::time::Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
