//! Media Button Input
//!
//! Raw key events delivered by the host's media-button receiver.

use serde::{Deserialize, Serialize};

/// Key codes carried by media button events.
pub mod keycodes {
    pub const HEADSETHOOK: i32 = 79;
    pub const MEDIA_PLAY_PAUSE: i32 = 85;
    pub const MEDIA_STOP: i32 = 86;
    pub const MEDIA_NEXT: i32 = 87;
    pub const MEDIA_PREVIOUS: i32 = 88;
    pub const MEDIA_REWIND: i32 = 89;
    pub const MEDIA_FAST_FORWARD: i32 = 90;
    pub const MUTE: i32 = 91;
    pub const MEDIA_PLAY: i32 = 126;
    pub const MEDIA_PAUSE: i32 = 127;
    pub const MEDIA_RECORD: i32 = 130;

    /// Reserved for play commands issued by our own notification buttons.
    ///
    /// The host rewrites generic play/pause presses into `MEDIA_PLAY` /
    /// `MEDIA_PAUSE`, so internal buttons use codes no media device sends.
    pub const BYPASS_PLAY: i32 = MUTE;
    /// Reserved for pause commands issued by our own notification buttons.
    pub const BYPASS_PAUSE: i32 = MEDIA_RECORD;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyAction {
    Down,
    Up,
}

/// A single media key transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyEvent {
    pub code: i32,
    pub action: KeyAction,
}

impl KeyEvent {
    pub fn down(code: i32) -> Self {
        Self {
            code,
            action: KeyAction::Down,
        }
    }

    pub fn up(code: i32) -> Self {
        Self {
            code,
            action: KeyAction::Up,
        }
    }
}
