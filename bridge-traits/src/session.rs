//! Platform Media Session Facade
//!
//! Describes the host's media-session object: the thing lock screens, car
//! head units and bluetooth controllers read playback state and metadata from.
//! The core never talks to the platform directly; it pushes fully projected
//! values through [`MediaSessionHost`].

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{artwork::ArtBitmap, error::Result, platform::PlatformSendSync};

/// Platform transport capability bits.
///
/// Bit positions follow the media-session wire format used by the hosts we
/// target, so a merged mask can be handed over without translation.
pub mod actions {
    pub const STOP: u64 = 1 << 0;
    pub const PAUSE: u64 = 1 << 1;
    pub const PLAY: u64 = 1 << 2;
    pub const REWIND: u64 = 1 << 3;
    pub const SKIP_TO_PREVIOUS: u64 = 1 << 4;
    pub const SKIP_TO_NEXT: u64 = 1 << 5;
    pub const FAST_FORWARD: u64 = 1 << 6;
    pub const SET_RATING: u64 = 1 << 7;
    pub const SEEK_TO: u64 = 1 << 8;
    pub const PLAY_PAUSE: u64 = 1 << 9;
    pub const PLAY_FROM_MEDIA_ID: u64 = 1 << 10;
    pub const PLAY_FROM_SEARCH: u64 = 1 << 11;
    pub const SKIP_TO_QUEUE_ITEM: u64 = 1 << 12;
    pub const PLAY_FROM_URI: u64 = 1 << 13;
    pub const PREPARE: u64 = 1 << 14;
    pub const PREPARE_FROM_MEDIA_ID: u64 = 1 << 15;
    pub const PREPARE_FROM_SEARCH: u64 = 1 << 16;
    pub const PREPARE_FROM_URI: u64 = 1 << 17;
    pub const SET_REPEAT_MODE: u64 = 1 << 18;
    pub const SET_CAPTIONING_ENABLED: u64 = 1 << 20;
    pub const SET_SHUFFLE_MODE: u64 = 1 << 21;
    pub const SET_PLAYBACK_SPEED: u64 = 1 << 22;
}

/// Session state codes understood by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlatformState {
    None,
    Connecting,
    Buffering,
    Playing,
    Paused,
    Error,
}

impl PlatformState {
    /// Numeric code as exposed by the platform session API.
    pub fn code(self) -> i32 {
        match self {
            PlatformState::None => 0,
            PlatformState::Paused => 2,
            PlatformState::Playing => 3,
            PlatformState::Buffering => 6,
            PlatformState::Error => 7,
            PlatformState::Connecting => 8,
        }
    }
}

/// Capability level reported by the host platform.
///
/// Mirrors the host's API level. Feature checks are expressed as methods so
/// callers never compare raw numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlatformCapabilities {
    pub api_level: u32,
}

impl PlatformCapabilities {
    /// Level from which the host can produce thumbnails for content handles.
    pub const DIRECT_THUMBNAIL_LEVEL: u32 = 29;
    /// Level from which fast-forward and rewind lose native button semantics.
    pub const CUSTOM_SEEK_ACTION_LEVEL: u32 = 33;

    pub fn new(api_level: u32) -> Self {
        Self { api_level }
    }

    pub fn supports_direct_thumbnails(&self) -> bool {
        self.api_level >= Self::DIRECT_THUMBNAIL_LEVEL
    }

    pub fn requires_custom_seek_actions(&self) -> bool {
        self.api_level >= Self::CUSTOM_SEEK_ACTION_LEVEL
    }
}

/// A control exposed through the session as a named custom action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomActionSpec {
    pub name: String,
    pub label: String,
    pub icon: String,
}

/// Error surfaced on the session's playback state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionError {
    pub code: i32,
    pub message: String,
}

/// Fully projected playback state handed to the platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformPlaybackState {
    pub state: PlatformState,
    pub actions: u64,
    pub position_ms: u64,
    pub buffered_position_ms: u64,
    pub speed: f32,
    /// Unix timestamp (ms) at which `position_ms` was sampled.
    pub update_time_ms: i64,
    pub active_queue_item_id: Option<i64>,
    pub error: Option<SessionError>,
    pub custom_actions: Vec<CustomActionSpec>,
    pub extras: BTreeMap<String, String>,
}

/// Modes published alongside the playback state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TransportModes {
    pub repeat_mode: i32,
    pub shuffle_mode: i32,
    pub captioning_enabled: bool,
}

/// Value stored under a metadata key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MetadataValue {
    Text(String),
    Long(i64),
    Rating { style: i32, value: Option<f32> },
}

/// Metadata bundle as the platform session stores it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionMetadata {
    pub media_id: String,
    pub entries: BTreeMap<String, MetadataValue>,
    pub art: Option<Arc<ArtBitmap>>,
}

impl SessionMetadata {
    pub fn text(&self, key: &str) -> Option<&str> {
        match self.entries.get(key) {
            Some(MetadataValue::Text(value)) => Some(value.as_str()),
            _ => None,
        }
    }
}

/// Queue row with its positional id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub queue_id: i64,
    pub media_id: String,
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub art_uri: Option<String>,
}

/// How a remote volume provider accepts changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VolumeControl {
    Fixed,
    Relative,
    Absolute,
}

impl VolumeControl {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(VolumeControl::Fixed),
            1 => Some(VolumeControl::Relative),
            2 => Some(VolumeControl::Absolute),
            _ => None,
        }
    }
}

/// Remote volume provider description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteVolume {
    pub control: VolumeControl,
    pub max_volume: i32,
    pub current_volume: i32,
}

/// Platform media-session trait
///
/// Implemented once per host. Every call is a plain push of projected data;
/// the host is not expected to keep any logic of its own.
///
/// # Errors
///
/// [`connect`](MediaSessionHost::connect) is the only call whose failure the
/// core treats as fatal for the session instance. Failures from other calls
/// are logged and the session keeps running.
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
pub trait MediaSessionHost: PlatformSendSync {
    /// Bind to the platform session service.
    async fn connect(&self) -> Result<()>;

    /// Platform capability level of the connected host.
    fn capabilities(&self) -> PlatformCapabilities;

    async fn set_active(&self, active: bool) -> Result<()>;

    async fn set_playback_state(&self, state: PlatformPlaybackState) -> Result<()>;

    async fn set_transport_modes(&self, modes: TransportModes) -> Result<()>;

    async fn set_metadata(&self, metadata: Option<SessionMetadata>) -> Result<()>;

    async fn set_queue(&self, queue: Vec<QueueEntry>) -> Result<()>;

    /// Route volume keys to the local music stream.
    async fn set_playback_to_local(&self) -> Result<()>;

    /// Install a new remote volume provider.
    async fn set_playback_to_remote(&self, volume: RemoteVolume) -> Result<()>;

    /// Update the current volume of the installed remote provider.
    async fn set_remote_volume(&self, current_volume: i32) -> Result<()>;

    /// Activity opened when the user taps the session UI.
    async fn set_session_activity(&self, activity: Option<String>) -> Result<()> {
        let _ = activity;
        Ok(())
    }

    /// Release platform resources. The host object is unusable afterwards.
    async fn release(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_thresholds() {
        let legacy = PlatformCapabilities::new(28);
        assert!(!legacy.supports_direct_thumbnails());
        assert!(!legacy.requires_custom_seek_actions());

        let q = PlatformCapabilities::new(29);
        assert!(q.supports_direct_thumbnails());
        assert!(!q.requires_custom_seek_actions());

        let t = PlatformCapabilities::new(33);
        assert!(t.supports_direct_thumbnails());
        assert!(t.requires_custom_seek_actions());
    }

    #[test]
    fn test_state_codes() {
        assert_eq!(PlatformState::None.code(), 0);
        assert_eq!(PlatformState::Playing.code(), 3);
        assert_eq!(PlatformState::Connecting.code(), 8);
    }

    #[test]
    fn test_volume_control_codes() {
        assert_eq!(VolumeControl::from_code(2), Some(VolumeControl::Absolute));
        assert_eq!(VolumeControl::from_code(9), None);
    }
}
