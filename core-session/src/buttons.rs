//! # Button Routing
//!
//! Turns raw media key events into [`ControlEvent`]s.
//!
//! The host rewrites software play/pause commands into the same key events a
//! headset sends, so the key code alone cannot tell them apart. Our own
//! notification buttons therefore send reserved codes
//! ([`keycodes::BYPASS_PLAY`], [`keycodes::BYPASS_PAUSE`]) that no device
//! emits. Those route straight to play and pause; the standard play/pause
//! family is then always a physical press and becomes a
//! [`ControlEvent::Click`] the application interprets.

use bridge_traits::input::{keycodes, KeyAction, KeyEvent};
use tracing::trace;

use crate::events::{ControlEvent, MediaButton};

/// Button a standard key code belongs to.
pub fn media_button(code: i32) -> MediaButton {
    match code {
        keycodes::MEDIA_NEXT => MediaButton::Next,
        keycodes::MEDIA_PREVIOUS => MediaButton::Previous,
        _ => MediaButton::Media,
    }
}

/// Routes one key event. Only key-down transitions produce events; unknown
/// codes are ignored.
pub fn route(event: KeyEvent) -> Option<ControlEvent> {
    if event.action != KeyAction::Down {
        return None;
    }

    let routed = match event.code {
        keycodes::BYPASS_PLAY => ControlEvent::Play,
        keycodes::BYPASS_PAUSE => ControlEvent::Pause,
        keycodes::MEDIA_STOP => ControlEvent::Stop,
        keycodes::MEDIA_FAST_FORWARD => ControlEvent::FastForward,
        keycodes::MEDIA_REWIND => ControlEvent::Rewind,
        keycodes::MEDIA_NEXT
        | keycodes::MEDIA_PREVIOUS
        | keycodes::MEDIA_PLAY
        | keycodes::MEDIA_PAUSE
        | keycodes::MEDIA_PLAY_PAUSE
        | keycodes::HEADSETHOOK => ControlEvent::Click {
            button: media_button(event.code),
        },
        code => {
            trace!(code, "Ignoring unrecognised media key");
            return None;
        }
    };
    Some(routed)
}
