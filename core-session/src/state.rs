//! # Playback State Model
//!
//! The abstract playback state the application layer reports, and the
//! controls it wants exposed.

use std::time::Duration;

use bridge_traits::session::{actions, VolumeControl};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Capability bits present on every published state regardless of the
/// caller's control list.
///
/// Skipping and seeking are absent: advertising them without a handler makes
/// controllers render buttons that do nothing.
pub const AUTO_ENABLED_ACTIONS: u64 = actions::STOP
    | actions::PAUSE
    | actions::PLAY
    | actions::REWIND
    | actions::FAST_FORWARD
    | actions::SET_RATING
    | actions::PLAY_PAUSE
    | actions::PLAY_FROM_MEDIA_ID
    | actions::PLAY_FROM_SEARCH
    | actions::SKIP_TO_QUEUE_ITEM
    | actions::PLAY_FROM_URI
    | actions::PREPARE
    | actions::PREPARE_FROM_MEDIA_ID
    | actions::PREPARE_FROM_SEARCH
    | actions::PREPARE_FROM_URI
    | actions::SET_REPEAT_MODE
    | actions::SET_SHUFFLE_MODE
    | actions::SET_CAPTIONING_ENABLED;

/// Coarse playback lifecycle stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProcessingState {
    #[default]
    Idle,
    Loading,
    Buffering,
    Ready,
    Completed,
    Error,
}

impl ProcessingState {
    /// Parses the ordinal used on the application channel.
    pub fn from_index(index: i32) -> Option<Self> {
        Some(match index {
            0 => ProcessingState::Idle,
            1 => ProcessingState::Loading,
            2 => ProcessingState::Buffering,
            3 => ProcessingState::Ready,
            4 => ProcessingState::Completed,
            5 => ProcessingState::Error,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingState::Idle => "idle",
            ProcessingState::Loading => "loading",
            ProcessingState::Buffering => "buffering",
            ProcessingState::Ready => "ready",
            ProcessingState::Completed => "completed",
            ProcessingState::Error => "error",
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, ProcessingState::Idle)
    }
}

/// A control the application wants exposed.
///
/// Equality covers all three fields, so an icon or label change counts as a
/// different control.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlAction {
    /// Icon resource reference in `<type>/<name>` form
    pub icon: String,
    pub label: String,
    /// Single capability bit from [`actions`]
    pub action: u64,
}

impl ControlAction {
    pub fn new(icon: impl Into<String>, label: impl Into<String>, action: u64) -> Self {
        Self {
            icon: icon.into(),
            label: label.into(),
            action,
        }
    }

    pub fn play() -> Self {
        Self::new("drawable/ic_play", "Play", actions::PLAY)
    }

    pub fn pause() -> Self {
        Self::new("drawable/ic_pause", "Pause", actions::PAUSE)
    }

    pub fn stop() -> Self {
        Self::new("drawable/ic_stop", "Stop", actions::STOP)
    }

    pub fn skip_to_next() -> Self {
        Self::new("drawable/ic_skip_next", "Next", actions::SKIP_TO_NEXT)
    }

    pub fn skip_to_previous() -> Self {
        Self::new("drawable/ic_skip_previous", "Previous", actions::SKIP_TO_PREVIOUS)
    }

    pub fn fast_forward() -> Self {
        Self::new("drawable/ic_fast_forward", "Fast Forward", actions::FAST_FORWARD)
    }

    pub fn rewind() -> Self {
        Self::new("drawable/ic_rewind", "Rewind", actions::REWIND)
    }
}

/// Ordered controls plus the capability bits they and the caller enable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionSet {
    controls: Vec<ControlAction>,
    action_bits: u64,
}

impl ActionSet {
    /// Builds a set from visible controls and extra capability bits that have
    /// no button of their own (seek, skip to queue item, ...).
    pub fn new(controls: Vec<ControlAction>, system_actions: u64) -> Self {
        let action_bits = controls
            .iter()
            .fold(system_actions, |bits, control| bits | control.action);
        Self {
            controls,
            action_bits,
        }
    }

    pub fn controls(&self) -> &[ControlAction] {
        &self.controls
    }

    pub fn action_bits(&self) -> u64 {
        self.action_bits
    }

    /// Mask published to the platform.
    pub fn capability_mask(&self) -> u64 {
        AUTO_ENABLED_ACTIONS | self.action_bits
    }

    pub fn len(&self) -> usize {
        self.controls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controls.is_empty()
    }
}

/// Abstract playback state reported by the application layer.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackStatus {
    pub processing_state: ProcessingState,
    pub playing: bool,
    pub position: Duration,
    pub buffered_position: Duration,
    pub speed: f32,
    /// When `position` was sampled. `None` means now.
    pub update_time: Option<DateTime<Utc>>,
    pub error_code: Option<i32>,
    pub error_message: Option<String>,
    pub repeat_mode: i32,
    pub shuffle_mode: i32,
    pub captioning_enabled: bool,
    pub active_queue_index: Option<i64>,
}

impl Default for PlaybackStatus {
    fn default() -> Self {
        Self {
            processing_state: ProcessingState::Idle,
            playing: false,
            position: Duration::ZERO,
            buffered_position: Duration::ZERO,
            speed: 1.0,
            update_time: None,
            error_code: None,
            error_message: None,
            repeat_mode: 0,
            shuffle_mode: 0,
            captioning_enabled: false,
            active_queue_index: None,
        }
    }
}

impl PlaybackStatus {
    pub fn new(processing_state: ProcessingState, playing: bool) -> Self {
        Self {
            processing_state,
            playing,
            ..Self::default()
        }
    }

    pub fn with_position(mut self, position: Duration) -> Self {
        self.position = position;
        self
    }

    pub fn with_error(mut self, code: Option<i32>, message: impl Into<String>) -> Self {
        self.error_code = code;
        self.error_message = Some(message.into());
        self
    }

    pub fn with_queue_index(mut self, index: i64) -> Self {
        self.active_queue_index = Some(index);
        self
    }
}

/// One `set_state` call: controls, compact selection and status.
#[derive(Debug, Clone, PartialEq)]
pub struct StateUpdate {
    pub actions: ActionSet,
    /// Indices into the control list shown in the compact view. `None` picks
    /// the first controls.
    pub compact_indices: Option<Vec<usize>>,
    pub status: PlaybackStatus,
}

impl StateUpdate {
    pub fn new(actions: ActionSet, status: PlaybackStatus) -> Self {
        Self {
            actions,
            compact_indices: None,
            status,
        }
    }

    pub fn with_compact_indices(mut self, indices: Vec<usize>) -> Self {
        self.compact_indices = Some(indices);
        self
    }
}

/// Where volume is handled for the current route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PlaybackInfo {
    Local,
    Remote {
        control: VolumeControl,
        max_volume: i32,
        volume: i32,
    },
}

impl PlaybackInfo {
    /// Platform playback type for local output.
    pub const TYPE_LOCAL: i32 = 1;
    /// Platform playback type for a remote route.
    pub const TYPE_REMOTE: i32 = 2;

    /// Builds playback info from raw platform codes.
    ///
    /// # Returns
    ///
    /// `None` for an unknown playback type or, on remote routes, an unknown
    /// volume control code.
    pub fn from_codes(playback_type: i32, control: i32, max_volume: i32, volume: i32) -> Option<Self> {
        match playback_type {
            Self::TYPE_LOCAL => Some(PlaybackInfo::Local),
            Self::TYPE_REMOTE => VolumeControl::from_code(control).map(|control| PlaybackInfo::Remote {
                control,
                max_volume,
                volume,
            }),
            _ => None,
        }
    }
}
