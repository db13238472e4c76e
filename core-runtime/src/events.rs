//! # Session Diagnostics Bus
//!
//! Observational events broadcast by the session engine and the art cache.
//!
//! ## Overview
//!
//! Debug overlays, analytics and tests follow what a session does by
//! subscribing to an [`EventBus`]. Nothing in the engine depends on an event
//! being received: [`EventBus::publish`] succeeds with or without
//! subscribers. Control events for the application layer travel on the
//! session's own listener channel, never here.
//!
//! ```text
//! MediaSession ──┐
//!                ├── publish ──▶ EventBus ── subscribe ──▶ EventStream (filtered)
//! ArtCache ──────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, EventSeverity, EventStream, SessionEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let bus = EventBus::default();
//! let mut important = EventStream::new(bus.subscribe()).min_severity(EventSeverity::Info);
//!
//! bus.publish(CoreEvent::Session(SessionEvent::Terminated {
//!     session_id: "5d1f".to_string(),
//!     reason: "idle".to_string(),
//! }));
//!
//! let event = important.recv().await.unwrap();
//! assert_eq!(event.description(), "Media session terminated");
//! # }
//! ```
//!
//! A subscriber that falls more than the bus capacity behind receives
//! [`RecvError::Lagged`] once and then continues with newer events.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;
use tracing::trace;

pub use tokio::sync::broadcast::error::RecvError;
pub use tokio::sync::broadcast::Receiver;

/// Events buffered per subscriber before it starts lagging.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 128;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum encompassing all event categories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    Session(SessionEvent),
    Notification(NotificationEvent),
    Artwork(ArtworkEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Session(e) => e.description(),
            CoreEvent::Notification(e) => e.description(),
            CoreEvent::Artwork(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Session(SessionEvent::ConnectionFailed { .. }) => EventSeverity::Error,
            CoreEvent::Artwork(ArtworkEvent::DecodeFailed { .. }) => EventSeverity::Warning,
            CoreEvent::Session(SessionEvent::Configured { .. })
            | CoreEvent::Session(SessionEvent::Terminated { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }

    /// Session the event belongs to. Artwork events are shared by every
    /// session using the same cache and carry none.
    pub fn session_id(&self) -> Option<&str> {
        match self {
            CoreEvent::Session(e) => Some(e.session_id()),
            CoreEvent::Notification(NotificationEvent::Published { session_id, .. })
            | CoreEvent::Notification(NotificationEvent::Cancelled { session_id }) => {
                Some(session_id)
            }
            CoreEvent::Artwork(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Session Events
// ============================================================================

/// Events describing the session lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum SessionEvent {
    /// Session connected to the platform and ready for updates.
    Configured { session_id: String },
    /// Binding to the platform session failed.
    ConnectionFailed { session_id: String, message: String },
    Activated { session_id: String },
    Deactivated { session_id: String },
    /// A new playback state was projected and pushed.
    StateChanged {
        session_id: String,
        /// Platform state name (e.g. "Playing").
        state: String,
        playing: bool,
    },
    ForegroundEntered { session_id: String },
    ForegroundExited { session_id: String },
    /// Terminal transition; the instance needs reconfiguration.
    Terminated {
        session_id: String,
        /// "idle", "stop", or "disconnected" when a reconnect failed.
        reason: String,
    },
}

impl SessionEvent {
    fn description(&self) -> &str {
        match self {
            SessionEvent::Configured { .. } => "Media session configured",
            SessionEvent::ConnectionFailed { .. } => "Media session connection failed",
            SessionEvent::Activated { .. } => "Media session activated",
            SessionEvent::Deactivated { .. } => "Media session deactivated",
            SessionEvent::StateChanged { .. } => "Playback state projected",
            SessionEvent::ForegroundEntered { .. } => "Entered foreground",
            SessionEvent::ForegroundExited { .. } => "Left foreground",
            SessionEvent::Terminated { .. } => "Media session terminated",
        }
    }

    fn session_id(&self) -> &str {
        match self {
            SessionEvent::Configured { session_id }
            | SessionEvent::ConnectionFailed { session_id, .. }
            | SessionEvent::Activated { session_id }
            | SessionEvent::Deactivated { session_id }
            | SessionEvent::StateChanged { session_id, .. }
            | SessionEvent::ForegroundEntered { session_id }
            | SessionEvent::ForegroundExited { session_id }
            | SessionEvent::Terminated { session_id, .. } => session_id,
        }
    }
}

// ============================================================================
// Notification Events
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum NotificationEvent {
    /// A rebuilt notification was handed to the host.
    Published {
        session_id: String,
        title: Option<String>,
        has_art: bool,
    },
    Cancelled { session_id: String },
}

impl NotificationEvent {
    fn description(&self) -> &str {
        match self {
            NotificationEvent::Published { .. } => "Notification published",
            NotificationEvent::Cancelled { .. } => "Notification cancelled",
        }
    }
}

// ============================================================================
// Artwork Events
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum ArtworkEvent {
    CacheHit { art_ref: String },
    Decoded {
        art_ref: String,
        width: u32,
        height: u32,
        bytes: usize,
    },
    DecodeFailed { art_ref: String, message: String },
    Evicted { art_ref: String, bytes: usize },
}

impl ArtworkEvent {
    fn description(&self) -> &str {
        match self {
            ArtworkEvent::CacheHit { .. } => "Artwork served from cache",
            ArtworkEvent::Decoded { .. } => "Artwork decoded",
            ArtworkEvent::DecodeFailed { .. } => "Artwork decode failed",
            ArtworkEvent::Evicted { .. } => "Artwork evicted",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Broadcast channel shared by a session and its art cache.
///
/// Cloning is cheap; all clones publish to the same subscribers.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a bus buffering up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes `event` to current subscribers.
    ///
    /// # Returns
    ///
    /// Number of subscribers that will see the event. Zero is not an error.
    pub fn publish(&self, event: CoreEvent) -> usize {
        match self.sender.send(event) {
            Ok(receivers) => receivers,
            Err(unsent) => {
                trace!(event = unsent.0.description(), "No event subscribers");
                0
            }
        }
    }

    /// New receiver for events published from now on.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream
// ============================================================================

/// Receiver narrowed to one session and/or a minimum severity.
#[derive(Debug)]
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    session_id: Option<String>,
    min_severity: EventSeverity,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            session_id: None,
            min_severity: EventSeverity::Debug,
        }
    }

    /// Keeps only events of `session_id`. Artwork events always pass.
    pub fn for_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn min_severity(mut self, severity: EventSeverity) -> Self {
        self.min_severity = severity;
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        if event.severity() < self.min_severity {
            return false;
        }
        match (&self.session_id, event.session_id()) {
            (Some(wanted), Some(actual)) => wanted == actual,
            _ => true,
        }
    }

    /// Waits for the next matching event.
    ///
    /// # Errors
    ///
    /// `RecvError::Lagged(n)` when `n` events were missed, `RecvError::Closed`
    /// once every bus clone is gone.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Next matching event already buffered, if any.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.accepts(&event) => return Some(Ok(event)),
                Ok(_) => continue,
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn activated(id: &str) -> CoreEvent {
        CoreEvent::Session(SessionEvent::Activated {
            session_id: id.to_string(),
        })
    }

    fn evicted() -> CoreEvent {
        CoreEvent::Artwork(ArtworkEvent::Evicted {
            art_ref: "cover.jpg".to_string(),
            bytes: 4096,
        })
    }

    #[test]
    fn test_publish_without_subscribers_is_fine() {
        let bus = EventBus::new(4);
        assert_eq!(bus.publish(activated("s-1")), 0);
    }

    #[tokio::test]
    async fn test_every_subscriber_sees_event() {
        let bus = EventBus::new(4);
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();

        let event = CoreEvent::Notification(NotificationEvent::Published {
            session_id: "s-1".to_string(),
            title: Some("Song".to_string()),
            has_art: false,
        });
        assert_eq!(bus.publish(event.clone()), 2);

        assert_eq!(first.recv().await.unwrap(), event);
        assert_eq!(second.recv().await.unwrap(), event);
    }

    #[tokio::test]
    async fn test_stream_filters_by_session() {
        let bus = EventBus::new(8);
        let mut stream = EventStream::new(bus.subscribe()).for_session("s-2");

        bus.publish(activated("s-1"));
        bus.publish(evicted());
        bus.publish(activated("s-2"));

        assert_eq!(stream.recv().await.unwrap(), evicted());
        assert_eq!(stream.recv().await.unwrap(), activated("s-2"));
        assert!(stream.try_recv().is_none());
    }

    #[test]
    fn test_stream_filters_by_severity() {
        let bus = EventBus::new(8);
        let mut stream = EventStream::new(bus.subscribe()).min_severity(EventSeverity::Warning);

        bus.publish(activated("s-1"));
        let failed = CoreEvent::Session(SessionEvent::ConnectionFailed {
            session_id: "s-1".to_string(),
            message: "bind refused".to_string(),
        });
        bus.publish(failed.clone());

        assert_eq!(stream.try_recv().unwrap().unwrap(), failed);
    }

    #[tokio::test]
    async fn test_lagged_subscriber() {
        let bus = EventBus::new(2);
        let mut sub = bus.subscribe();

        for i in 0..5 {
            bus.publish(activated(&format!("s-{}", i)));
        }

        assert!(matches!(sub.recv().await, Err(RecvError::Lagged(_))));
    }

    #[test]
    fn test_event_severity() {
        let decode = CoreEvent::Artwork(ArtworkEvent::DecodeFailed {
            art_ref: "cover.jpg".to_string(),
            message: "truncated".to_string(),
        });
        assert_eq!(decode.severity(), EventSeverity::Warning);

        let terminated = CoreEvent::Session(SessionEvent::Terminated {
            session_id: "s-1".to_string(),
            reason: "idle".to_string(),
        });
        assert_eq!(terminated.severity(), EventSeverity::Info);
        assert_eq!(activated("s-1").severity(), EventSeverity::Debug);
        assert_eq!(evicted().session_id(), None);
    }

    #[test]
    fn test_event_serialization() {
        let event = CoreEvent::Artwork(ArtworkEvent::Decoded {
            art_ref: "content://media/1".to_string(),
            width: 300,
            height: 300,
            bytes: 360_000,
        });

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"Artwork\""));
        assert!(json.contains("\"event\":\"Decoded\""));

        let deserialized: CoreEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, event);
    }
}
