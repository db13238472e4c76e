//! # Session Lifecycle
//!
//! State machine binding session activation, the wake lock and foreground
//! status to play/pause transitions.
//!
//! ## Overview
//!
//! The machine is pure: each transition returns the [`LifecycleEffect`]s the
//! caller must apply to the hosts, in order. It tracks which resources it has
//! asked for, so it never emits a second acquire for a held wake lock or a
//! deactivation for an inactive session.
//!
//! ## States
//!
//! ```text
//! Inactive ──playing──▶ Active(Playing) ◀──▶ Active(Paused)
//!    │                        │
//!    └──prepare──▶ Active(Stopped)
//!
//! any non-idle ──idle / stop / teardown──▶ Terminated
//! ```
//!
//! `Terminated` is final for the instance. Only reconfiguring the session
//! starts a new machine.

use tracing::debug;

use crate::state::ProcessingState;

/// Sub-state of an active session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivePhase {
    /// Activated for preparation, never played
    Stopped,
    Playing,
    Paused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecyclePhase {
    Inactive,
    Active(ActivePhase),
    Terminated,
}

/// Host-side action requested by a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleEffect {
    Activate,
    Deactivate,
    AcquireWakeLock,
    ReleaseWakeLock,
    /// Publish the configured activity on the session
    PublishSessionActivity,
    /// Build a notification and enter the foreground with it
    StartForeground,
    StopForeground { remove_notification: bool },
    /// Schedule a coalesced notification rebuild
    UpdateNotification,
    CancelNotification,
    ReleaseSession,
}

/// Configured behaviour of the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecyclePolicy {
    pub stop_foreground_on_pause: bool,
    pub resume_on_click: bool,
}

#[derive(Debug)]
pub struct SessionLifecycle {
    policy: LifecyclePolicy,
    processing_state: ProcessingState,
    playing: bool,
    session_active: bool,
    wake_lock_held: bool,
    foreground: bool,
    notification_created: bool,
    notification_pending: bool,
    terminated: bool,
    released: bool,
}

impl SessionLifecycle {
    pub fn new(policy: LifecyclePolicy) -> Self {
        Self {
            policy,
            processing_state: ProcessingState::Idle,
            playing: false,
            session_active: false,
            wake_lock_held: false,
            foreground: false,
            notification_created: false,
            notification_pending: false,
            terminated: false,
            released: false,
        }
    }

    /// Replaces the policy of a running machine. Resources already held are
    /// kept; the new policy applies from the next transition.
    pub fn set_policy(&mut self, policy: LifecyclePolicy) {
        self.policy = policy;
    }

    pub fn phase(&self) -> LifecyclePhase {
        if self.terminated {
            LifecyclePhase::Terminated
        } else if !self.session_active {
            LifecyclePhase::Inactive
        } else if self.playing {
            LifecyclePhase::Active(ActivePhase::Playing)
        } else if self.notification_created {
            LifecyclePhase::Active(ActivePhase::Paused)
        } else {
            LifecyclePhase::Active(ActivePhase::Stopped)
        }
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn processing_state(&self) -> ProcessingState {
        self.processing_state
    }

    pub fn is_session_active(&self) -> bool {
        self.session_active
    }

    /// Whether a notification has been posted through the foreground path.
    /// Rebuilds before that point have nothing to replace.
    pub fn notification_created(&self) -> bool {
        self.notification_created
    }

    /// Applies a state update.
    ///
    /// # Arguments
    ///
    /// * `processing_state` - New processing state
    /// * `playing` - New playing flag
    /// * `notification_dirty` - Whether the update changed notification content
    pub fn on_state(
        &mut self,
        processing_state: ProcessingState,
        playing: bool,
        notification_dirty: bool,
    ) -> Vec<LifecycleEffect> {
        if self.terminated {
            return Vec::new();
        }

        let was_playing = self.playing;
        let old_state = self.processing_state;
        let entering_idle = !old_state.is_idle() && processing_state.is_idle();
        let playing = playing && !entering_idle;

        self.processing_state = processing_state;
        self.playing = playing;
        self.notification_pending |= notification_dirty;

        if entering_idle {
            debug!(from = old_state.as_str(), "Entered idle, stopping session");
            return self.terminate();
        }

        let mut effects = Vec::new();
        if !was_playing && playing {
            self.enter_playing(&mut effects);
        } else if was_playing && !playing {
            self.exit_playing(&mut effects);
        }

        if !processing_state.is_idle() && self.notification_pending && self.notification_created {
            self.notification_pending = false;
            effects.push(LifecycleEffect::UpdateNotification);
        }
        effects
    }

    /// Marks notification content as changed outside a state update, such as
    /// new metadata or art.
    pub fn on_content_changed(&mut self) -> Vec<LifecycleEffect> {
        if self.terminated {
            return Vec::new();
        }
        if self.notification_created {
            self.notification_pending = false;
            vec![LifecycleEffect::UpdateNotification]
        } else {
            self.notification_pending = true;
            Vec::new()
        }
    }

    /// Activates the session ahead of playback.
    pub fn on_prepare(&mut self) -> Vec<LifecycleEffect> {
        if self.terminated || self.session_active {
            return Vec::new();
        }
        self.session_active = true;
        vec![LifecycleEffect::Activate]
    }

    /// Explicit stop. Same terminal path as entering idle.
    pub fn on_stop(&mut self) -> Vec<LifecycleEffect> {
        if self.terminated {
            return Vec::new();
        }
        self.playing = false;
        self.processing_state = ProcessingState::Idle;
        self.terminate()
    }

    /// Destroys the instance, releasing everything still held.
    ///
    /// The notification survives when resume-on-click is enabled so that a
    /// tap can start playback again.
    pub fn on_teardown(&mut self) -> Vec<LifecycleEffect> {
        let mut effects = Vec::new();
        if self.released {
            return effects;
        }
        if self.session_active {
            self.session_active = false;
            effects.push(LifecycleEffect::Deactivate);
        }
        if self.foreground {
            self.foreground = false;
            effects.push(LifecycleEffect::StopForeground {
                remove_notification: !self.policy.resume_on_click,
            });
        }
        if self.wake_lock_held {
            self.wake_lock_held = false;
            effects.push(LifecycleEffect::ReleaseWakeLock);
        }
        effects.push(LifecycleEffect::ReleaseSession);

        self.released = true;
        self.playing = false;
        self.processing_state = ProcessingState::Idle;
        self.notification_created = false;
        self.notification_pending = false;
        self.terminated = true;
        effects
    }

    fn enter_playing(&mut self, effects: &mut Vec<LifecycleEffect>) {
        if !self.session_active {
            self.session_active = true;
            effects.push(LifecycleEffect::Activate);
        }
        if !self.wake_lock_held {
            self.wake_lock_held = true;
            effects.push(LifecycleEffect::AcquireWakeLock);
        }
        effects.push(LifecycleEffect::PublishSessionActivity);
        effects.push(LifecycleEffect::StartForeground);
        self.foreground = true;
        self.notification_created = true;
        // The foreground payload is built from current content
        self.notification_pending = false;
    }

    fn exit_playing(&mut self, effects: &mut Vec<LifecycleEffect>) {
        if !self.policy.stop_foreground_on_pause {
            return;
        }
        if self.foreground {
            self.foreground = false;
            effects.push(LifecycleEffect::StopForeground {
                remove_notification: false,
            });
        }
        if self.wake_lock_held {
            self.wake_lock_held = false;
            effects.push(LifecycleEffect::ReleaseWakeLock);
        }
    }

    fn terminate(&mut self) -> Vec<LifecycleEffect> {
        let mut effects = Vec::new();
        if self.session_active {
            self.session_active = false;
            effects.push(LifecycleEffect::Deactivate);
        }
        if self.wake_lock_held {
            self.wake_lock_held = false;
            effects.push(LifecycleEffect::ReleaseWakeLock);
        }
        self.foreground = false;
        effects.push(LifecycleEffect::StopForeground {
            remove_notification: true,
        });
        effects.push(LifecycleEffect::CancelNotification);

        self.notification_created = false;
        self.notification_pending = false;
        self.terminated = true;
        effects
    }
}
