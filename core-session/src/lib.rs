//! # Media Session Module
//!
//! Keeps the platform media session, its notification and the device power
//! state in step with what the application is playing.
//!
//! ## Overview
//!
//! This module handles:
//! - The playback state model the application reports ([`state`])
//! - Projection of that state onto the platform session ([`projector`])
//! - Negotiation of transport controls against host capabilities
//!   ([`negotiator`])
//! - Notification building with change suppression ([`notification`])
//! - Activation, wake lock and foreground transitions ([`lifecycle`])
//! - Routing of media keys and platform callbacks to the application
//!   ([`buttons`], [`command`], [`events`])
//!
//! [`MediaSession`] ties these together and is the entry point for hosts.

pub mod buttons;
pub mod coalesce;
pub mod command;
pub mod error;
pub mod events;
pub mod lifecycle;
pub mod negotiator;
pub mod notification;
pub mod projector;
pub mod session;
pub mod state;

pub use command::PlatformCommand;
pub use error::{Result, SessionError};
pub use events::{ControlEvent, ControlEventReceiver, MediaButton};
pub use lifecycle::{ActivePhase, LifecyclePhase};
pub use negotiator::CapabilityStrategy;
pub use session::{BrowsableRoot, MediaSession, SessionHosts, BROWSABLE_ROOT_ID, RECENT_ROOT_ID};
pub use state::{
    ActionSet, ControlAction, PlaybackInfo, PlaybackStatus, ProcessingState, StateUpdate,
    AUTO_ENABLED_ACTIONS,
};
