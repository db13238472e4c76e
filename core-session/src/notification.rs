//! # Notification Composition
//!
//! Builds the media notification from the current record, negotiated controls
//! and art, and suppresses rebuilds whose content would not change.
//!
//! ## Overview
//!
//! Each build first reduces its inputs to a [`NotificationSnapshot`]. A new
//! payload is produced only when the snapshot differs from the last one
//! built, or when the caller forces it (entering the foreground always needs
//! a payload).

use std::sync::Arc;

use bridge_traits::artwork::ArtBitmap;
use bridge_traits::input::keycodes;
use bridge_traits::notification::{NotificationButton, NotificationChannel, NotificationPayload};
use bridge_traits::session::CustomActionSpec;
use core_metadata::MediaRecord;
use core_runtime::config::SessionConfig;

use crate::negotiator::NegotiatedControls;

/// Fallback channel name when none is configured.
const DEFAULT_CHANNEL_NAME: &str = "Media playback";

/// Static notification settings taken from the session configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposerSettings {
    pub channel: NotificationChannel,
    pub small_icon: String,
    pub color: Option<i32>,
    pub content_activity: Option<String>,
    pub ongoing: bool,
}

impl ComposerSettings {
    pub fn from_config(config: &SessionConfig) -> Self {
        let content_activity = if config.notification_click_starts_activity {
            config.activity.clone()
        } else {
            None
        };
        Self {
            channel: NotificationChannel {
                id: config.channel_id(),
                name: config
                    .notification_channel_name
                    .clone()
                    .unwrap_or_else(|| DEFAULT_CHANNEL_NAME.to_string()),
                description: config.notification_channel_description.clone(),
                show_badge: config.show_notification_badge,
            },
            small_icon: config.notification_icon.clone(),
            color: config.notification_color(),
            content_activity,
            ongoing: config.notification_ongoing,
        }
    }
}

/// Inputs of one build.
#[derive(Debug, Clone, Copy)]
pub struct NotificationContent<'a> {
    pub record: Option<&'a MediaRecord>,
    pub art_ref: Option<&'a str>,
    pub art: Option<&'a Arc<ArtBitmap>>,
    pub controls: &'a NegotiatedControls,
}

/// Everything about a notification that can change between builds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationSnapshot {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub description: Option<String>,
    pub art_ref: Option<String>,
    pub art_loaded: bool,
    pub native_actions: Vec<NotificationButton>,
    pub custom_actions: Vec<CustomActionSpec>,
    pub compact_indices: Vec<usize>,
}

impl NotificationSnapshot {
    pub fn capture(content: &NotificationContent<'_>) -> Self {
        let record = content.record;
        Self {
            title: record.and_then(MediaRecord::description_title).map(str::to_string),
            subtitle: record
                .and_then(MediaRecord::description_subtitle)
                .map(str::to_string),
            description: record.and_then(MediaRecord::description_text).map(str::to_string),
            art_ref: content.art_ref.map(str::to_string),
            art_loaded: content.art.is_some(),
            native_actions: content.controls.native.clone(),
            custom_actions: content.controls.custom.clone(),
            compact_indices: content.controls.compact_indices.clone(),
        }
    }
}

/// Produces notification payloads and remembers the last one built.
#[derive(Debug)]
pub struct NotificationComposer {
    settings: ComposerSettings,
    last: Option<NotificationSnapshot>,
}

impl NotificationComposer {
    pub fn new(settings: ComposerSettings) -> Self {
        Self {
            settings,
            last: None,
        }
    }

    pub fn channel(&self) -> &NotificationChannel {
        &self.settings.channel
    }

    pub fn last_snapshot(&self) -> Option<&NotificationSnapshot> {
        self.last.as_ref()
    }

    /// Builds a payload if the content changed since the last build.
    ///
    /// # Arguments
    ///
    /// * `content` - Current record, art and controls
    /// * `force` - Build even when nothing changed
    ///
    /// # Returns
    ///
    /// `None` when the rebuild is suppressed.
    pub fn compose(
        &mut self,
        content: &NotificationContent<'_>,
        force: bool,
    ) -> Option<NotificationPayload> {
        let snapshot = NotificationSnapshot::capture(content);
        if !force && self.last.as_ref() == Some(&snapshot) {
            return None;
        }
        let payload = self.build(&snapshot, content.art);
        self.last = Some(snapshot);
        Some(payload)
    }

    /// Forgets the last build so the next one is never suppressed.
    pub fn reset(&mut self) {
        self.last = None;
    }

    fn build(
        &self,
        snapshot: &NotificationSnapshot,
        art: Option<&Arc<ArtBitmap>>,
    ) -> NotificationPayload {
        NotificationPayload {
            channel_id: self.settings.channel.id.clone(),
            small_icon: self.settings.small_icon.clone(),
            title: snapshot.title.clone(),
            subtitle: snapshot.subtitle.clone(),
            description: snapshot.description.clone(),
            large_icon: art.cloned(),
            content_activity: self.settings.content_activity.clone(),
            color: self.settings.color,
            buttons: snapshot.native_actions.clone(),
            compact_indices: snapshot.compact_indices.clone(),
            ongoing: self.settings.ongoing,
            cancel_key_code: self.settings.ongoing.then_some(keycodes::MEDIA_STOP),
        }
    }
}
