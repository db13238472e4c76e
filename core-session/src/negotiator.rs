//! # Action Negotiation
//!
//! Decides how each requested control reaches the platform.
//!
//! ## Overview
//!
//! Most controls become native notification buttons that fire a media key.
//! Fast-forward and rewind lost their native button semantics at a platform
//! capability level, so from that level on they are published as custom
//! actions on the session instead. The rule is chosen once per session as a
//! [`CapabilityStrategy`].
//!
//! The negotiator also picks the compact-view controls and remembers the last
//! request so callers know when the notification content changed.

use bridge_traits::input::keycodes;
use bridge_traits::notification::NotificationButton;
use bridge_traits::session::{actions, CustomActionSpec, PlatformCapabilities};
use tracing::debug;

use crate::state::ControlAction;

/// Custom action name carrying fast-forward requests.
pub const CUSTOM_ACTION_FAST_FORWARD: &str = "media_session.MEDIA_BUTTON_FAST_FORWARD";
/// Custom action name carrying rewind requests.
pub const CUSTOM_ACTION_REWIND: &str = "media_session.MEDIA_BUTTON_REWIND";

/// Upper bound on controls shown in the compact view.
pub const MAX_COMPACT_ACTIONS: usize = 3;

/// How capability-gated controls are represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CapabilityStrategy {
    /// Every control is a native button.
    NativeButtons,
    /// Fast-forward and rewind are custom actions, the rest native buttons.
    CustomSeekActions,
}

impl CapabilityStrategy {
    pub fn select(capabilities: PlatformCapabilities) -> Self {
        if capabilities.requires_custom_seek_actions() {
            CapabilityStrategy::CustomSeekActions
        } else {
            CapabilityStrategy::NativeButtons
        }
    }

    /// Custom action name for `action`, or `None` if it stays native.
    pub fn custom_action_name(&self, action: u64) -> Option<&'static str> {
        match self {
            CapabilityStrategy::NativeButtons => None,
            CapabilityStrategy::CustomSeekActions => match action {
                actions::FAST_FORWARD => Some(CUSTOM_ACTION_FAST_FORWARD),
                actions::REWIND => Some(CUSTOM_ACTION_REWIND),
                _ => None,
            },
        }
    }
}

/// Media key a native button for `action` sends.
///
/// Play and pause use the reserved bypass codes so their presses can be told
/// apart from hardware play/pause buttons.
pub fn key_code_for_action(action: u64) -> Option<i32> {
    match action {
        actions::PLAY => Some(keycodes::BYPASS_PLAY),
        actions::PAUSE => Some(keycodes::BYPASS_PAUSE),
        actions::SKIP_TO_NEXT => Some(keycodes::MEDIA_NEXT),
        actions::SKIP_TO_PREVIOUS => Some(keycodes::MEDIA_PREVIOUS),
        actions::STOP => Some(keycodes::MEDIA_STOP),
        actions::FAST_FORWARD => Some(keycodes::MEDIA_FAST_FORWARD),
        actions::REWIND => Some(keycodes::MEDIA_REWIND),
        actions::PLAY_PAUSE => Some(keycodes::MEDIA_PLAY_PAUSE),
        _ => None,
    }
}

/// Compact-view indices for a control list of `count` entries.
///
/// Explicit indices are truncated to [`MAX_COMPACT_ACTIONS`]. Without them the
/// first controls of the current list are used.
pub fn compact_indices(explicit: Option<&[usize]>, count: usize) -> Vec<usize> {
    match explicit {
        Some(indices) => indices.iter().copied().take(MAX_COMPACT_ACTIONS).collect(),
        None => (0..count.min(MAX_COMPACT_ACTIONS)).collect(),
    }
}

/// Result of negotiating one control list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NegotiatedControls {
    pub native: Vec<NotificationButton>,
    pub custom: Vec<CustomActionSpec>,
    /// Compact-view indices, translated to positions in `native`
    pub compact_indices: Vec<usize>,
}

/// Tracks the current control list and its platform representation.
#[derive(Debug, Clone)]
pub struct ActionNegotiator {
    strategy: CapabilityStrategy,
    controls: Vec<ControlAction>,
    requested_compact: Option<Vec<usize>>,
    current: NegotiatedControls,
}

impl ActionNegotiator {
    pub fn new(strategy: CapabilityStrategy) -> Self {
        Self {
            strategy,
            controls: Vec::new(),
            requested_compact: None,
            current: NegotiatedControls::default(),
        }
    }

    pub fn strategy(&self) -> CapabilityStrategy {
        self.strategy
    }

    /// Negotiates a new control list.
    ///
    /// # Returns
    ///
    /// `true` if the controls or the requested compact indices differ from
    /// the previous call.
    pub fn negotiate(&mut self, controls: &[ControlAction], compact: Option<&[usize]>) -> bool {
        let changed = self.controls.as_slice() != controls
            || self.requested_compact.as_deref() != compact;

        let mut negotiated = NegotiatedControls::default();
        let mut native_position = Vec::with_capacity(controls.len());
        for control in controls {
            match self.strategy.custom_action_name(control.action) {
                Some(name) => {
                    native_position.push(None);
                    negotiated.custom.push(CustomActionSpec {
                        name: name.to_string(),
                        label: control.label.clone(),
                        icon: control.icon.clone(),
                    });
                }
                None => {
                    native_position.push(Some(negotiated.native.len()));
                    negotiated.native.push(NotificationButton {
                        icon: control.icon.clone(),
                        label: control.label.clone(),
                        key_code: key_code_for_action(control.action),
                    });
                }
            }
        }

        // Requested indices address the full list; degraded controls have no button
        negotiated.compact_indices = compact_indices(compact, controls.len())
            .into_iter()
            .filter_map(|index| native_position.get(index).copied().flatten())
            .collect();

        if changed {
            debug!(
                native = negotiated.native.len(),
                custom = negotiated.custom.len(),
                compact = ?negotiated.compact_indices,
                "Controls renegotiated"
            );
        }

        self.controls = controls.to_vec();
        self.requested_compact = compact.map(<[usize]>::to_vec);
        self.current = negotiated;
        changed
    }

    pub fn current(&self) -> &NegotiatedControls {
        &self.current
    }

    pub fn controls(&self) -> &[ControlAction] {
        &self.controls
    }

    /// Forgets the current control list.
    pub fn reset(&mut self) {
        self.controls.clear();
        self.requested_compact = None;
        self.current = NegotiatedControls::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport() -> Vec<ControlAction> {
        vec![
            ControlAction::rewind(),
            ControlAction::skip_to_previous(),
            ControlAction::pause(),
            ControlAction::skip_to_next(),
            ControlAction::fast_forward(),
        ]
    }

    #[test]
    fn test_strategy_selection() {
        assert_eq!(
            CapabilityStrategy::select(PlatformCapabilities::new(32)),
            CapabilityStrategy::NativeButtons
        );
        assert_eq!(
            CapabilityStrategy::select(PlatformCapabilities::new(33)),
            CapabilityStrategy::CustomSeekActions
        );
    }

    #[test]
    fn test_native_below_threshold() {
        let mut negotiator = ActionNegotiator::new(CapabilityStrategy::NativeButtons);
        negotiator.negotiate(&transport(), None);
        let current = negotiator.current();

        assert_eq!(current.native.len(), 5);
        assert!(current.custom.is_empty());
        assert_eq!(current.native[0].key_code, Some(keycodes::MEDIA_REWIND));
        assert_eq!(current.native[2].key_code, Some(keycodes::BYPASS_PAUSE));
    }

    #[test]
    fn test_seek_controls_degrade_at_threshold() {
        let mut negotiator = ActionNegotiator::new(CapabilityStrategy::CustomSeekActions);
        negotiator.negotiate(&transport(), None);
        let current = negotiator.current();

        let names: Vec<_> = current.custom.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec![CUSTOM_ACTION_REWIND, CUSTOM_ACTION_FAST_FORWARD]);
        let labels: Vec<_> = current.native.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["Previous", "Pause", "Next"]);
    }

    #[test]
    fn test_key_codes() {
        assert_eq!(key_code_for_action(actions::PLAY), Some(keycodes::BYPASS_PLAY));
        assert_eq!(key_code_for_action(actions::PLAY_PAUSE), Some(keycodes::MEDIA_PLAY_PAUSE));
        assert_eq!(key_code_for_action(actions::SEEK_TO), None);
        assert_eq!(key_code_for_action(actions::SET_RATING), None);
    }

    #[test]
    fn test_compact_defaults_follow_current_list() {
        assert_eq!(compact_indices(None, 5), vec![0, 1, 2]);
        assert_eq!(compact_indices(None, 2), vec![0, 1]);
        assert_eq!(compact_indices(None, 0), Vec::<usize>::new());
        assert_eq!(compact_indices(Some(&[4, 2, 0, 1]), 5), vec![4, 2, 0]);

        let mut negotiator = ActionNegotiator::new(CapabilityStrategy::NativeButtons);
        negotiator.negotiate(&transport(), Some(&[1, 2, 3]));
        negotiator.negotiate(&[ControlAction::play()], None);
        assert_eq!(negotiator.current().compact_indices, vec![0]);
    }

    #[test]
    fn test_compact_indices_map_to_native_buttons() {
        let mut negotiator = ActionNegotiator::new(CapabilityStrategy::CustomSeekActions);
        // Previous, pause and fast-forward; fast-forward has no button here
        negotiator.negotiate(&transport(), Some(&[1, 2, 4]));
        assert_eq!(negotiator.current().compact_indices, vec![0, 1]);

        negotiator.negotiate(&transport(), Some(&[3, 9]));
        assert_eq!(negotiator.current().compact_indices, vec![2]);

        let mut native = ActionNegotiator::new(CapabilityStrategy::NativeButtons);
        native.negotiate(&transport(), Some(&[1, 2, 4]));
        assert_eq!(native.current().compact_indices, vec![1, 2, 4]);
    }

    #[test]
    fn test_change_detection() {
        let mut negotiator = ActionNegotiator::new(CapabilityStrategy::NativeButtons);
        assert!(!negotiator.negotiate(&[], None));

        let controls = vec![ControlAction::play(), ControlAction::stop()];
        assert!(negotiator.negotiate(&controls, None));
        assert!(!negotiator.negotiate(&controls.clone(), None));

        assert!(negotiator.negotiate(&controls, Some(&[0])));
        assert!(!negotiator.negotiate(&controls, Some(&[0])));
        assert!(negotiator.negotiate(&controls, None));

        let relabelled = vec![
            ControlAction::new("drawable/ic_play", "Resume", actions::PLAY),
            ControlAction::stop(),
        ];
        assert!(negotiator.negotiate(&relabelled, None));
    }

    #[test]
    fn test_reset() {
        let mut negotiator = ActionNegotiator::new(CapabilityStrategy::NativeButtons);
        negotiator.negotiate(&transport(), Some(&[0]));
        negotiator.reset();

        assert!(negotiator.controls().is_empty());
        assert_eq!(negotiator.current(), &NegotiatedControls::default());
    }
}
