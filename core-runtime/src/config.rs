//! # Session Configuration Module
//!
//! Provides configuration management for a media session instance.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a
//! [`SessionConfig`] holding every option the session recognizes: notification
//! appearance, foreground behaviour, artwork downscaling and the extras
//! returned with the browsable root. It enforces fail-fast validation so a
//! misconfigured session is rejected at `configure` time rather than when the
//! first notification is rendered.
//!
//! Sentinel values follow the host convention: `-1` means "unset" for the
//! notification color and the art downscale dimensions.
//!
//! ## Usage
//!
//! ### Defaults
//!
//! ```
//! use core_runtime::config::SessionConfig;
//!
//! let config = SessionConfig::builder().build().unwrap();
//! assert!(config.resume_on_click);
//! assert_eq!(config.notification_color(), None);
//! ```
//!
//! ### Customized Notification
//!
//! ```ignore
//! use core_runtime::config::SessionConfig;
//!
//! let config = SessionConfig::builder()
//!     .application_id("com.example.player")
//!     .notification_channel_name("Playback")
//!     .notification_color(0xFF2196F3u32 as i32)
//!     .notification_ongoing(true)
//!     .art_downscale(300, 300)
//!     .build()?;
//! ```
//!
//! ## Error Handling
//!
//! ```should_panic
//! use core_runtime::config::SessionConfig;
//!
//! // An ongoing notification could never be dismissed if foreground status
//! // survived a pause, so this is rejected.
//! let config = SessionConfig::builder()
//!     .notification_ongoing(true)
//!     .stop_foreground_on_pause(false)
//!     .build()
//!     .expect("Should fail - ongoing requires stop_foreground_on_pause");
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Sentinel meaning "not configured" for integer options.
pub const UNSET: i32 = -1;

/// Default notification icon resource.
pub const DEFAULT_NOTIFICATION_ICON: &str = "mipmap/ic_launcher";

/// Default edge length for host-generated thumbnails.
pub const DEFAULT_THUMBNAIL_SIZE: u32 = 192;

/// Default memory budget the art cache is carved out of (256 MiB).
pub const DEFAULT_MEMORY_BUDGET_BYTES: usize = 256 * 1024 * 1024;

/// Scalar value stored in the browsable-root extras.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RootExtraValue {
    Bool(bool),
    Int(i64),
    Double(f64),
    Text(String),
}

/// Art cache sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtCacheConfig {
    /// Memory available to the process. The cache takes one eighth of it.
    pub memory_budget_bytes: usize,
}

impl ArtCacheConfig {
    /// Byte capacity of the decoded-art cache.
    pub fn capacity_bytes(&self) -> usize {
        self.memory_budget_bytes / 8
    }
}

impl Default for ArtCacheConfig {
    fn default() -> Self {
        Self {
            memory_budget_bytes: DEFAULT_MEMORY_BUDGET_BYTES,
        }
    }
}

/// Configuration for a media session instance.
///
/// Use [`SessionConfigBuilder`] to construct instances. The struct is
/// serializable with camelCase keys so hosts can persist it between launches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionConfig {
    /// Application identifier used to derive the default channel id
    pub application_id: String,

    /// Keep the notification after teardown so a click can resume playback
    pub resume_on_click: bool,

    pub notification_channel_id: Option<String>,
    pub notification_channel_name: Option<String>,
    pub notification_channel_description: Option<String>,

    /// ARGB color, `-1` when unset
    pub notification_color: i32,

    /// Icon resource reference in `<type>/<name>` form
    pub notification_icon: String,

    pub show_notification_badge: bool,

    /// Tapping the notification opens `activity`
    pub notification_click_starts_activity: bool,

    /// Non-dismissible notification with a cancel button
    pub notification_ongoing: bool,

    /// Release foreground status and the wake lock when playback pauses
    pub stop_foreground_on_pause: bool,

    /// Maximum decoded art width, `-1` when unset
    pub art_downscale_width: i32,

    /// Maximum decoded art height, `-1` when unset
    pub art_downscale_height: i32,

    /// Activity opened from the notification and session UI
    pub activity: Option<String>,

    /// Extras returned alongside the browsable root
    pub browsable_root_extras: BTreeMap<String, RootExtraValue>,

    pub art_cache: ArtCacheConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            application_id: "media.session".to_string(),
            resume_on_click: true,
            notification_channel_id: None,
            notification_channel_name: None,
            notification_channel_description: None,
            notification_color: UNSET,
            notification_icon: DEFAULT_NOTIFICATION_ICON.to_string(),
            show_notification_badge: false,
            notification_click_starts_activity: true,
            notification_ongoing: false,
            stop_foreground_on_pause: true,
            art_downscale_width: UNSET,
            art_downscale_height: UNSET,
            activity: None,
            browsable_root_extras: BTreeMap::new(),
            art_cache: ArtCacheConfig::default(),
        }
    }
}

impl SessionConfig {
    /// Creates a new builder for constructing a `SessionConfig`.
    pub fn builder() -> SessionConfigBuilder {
        SessionConfigBuilder::default()
    }

    /// Parses a persisted configuration and validates it.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: SessionConfig = serde_json::from_str(json)
            .map_err(|e| Error::Config(format!("Invalid session configuration JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Channel id, falling back to `<application id>.channel`.
    pub fn channel_id(&self) -> String {
        self.notification_channel_id
            .clone()
            .unwrap_or_else(|| format!("{}.channel", self.application_id))
    }

    pub fn notification_color(&self) -> Option<i32> {
        (self.notification_color != UNSET).then_some(self.notification_color)
    }

    /// Downscale target as `(width, height)`.
    ///
    /// Downscaling is enabled by the width alone. An unset height places no
    /// constraint on the vertical axis and is reported as `0`.
    pub fn art_downscale(&self) -> Option<(u32, u32)> {
        if self.art_downscale_width == UNSET {
            return None;
        }
        let width = u32::try_from(self.art_downscale_width).ok()?;
        let height = u32::try_from(self.art_downscale_height).unwrap_or(0);
        Some((width, height))
    }

    /// Size requested for host thumbnails. Each configured dimension overrides
    /// the 192 pixel default independently.
    pub fn thumbnail_size(&self) -> (u32, u32) {
        let pick = |value: i32| u32::try_from(value).unwrap_or(DEFAULT_THUMBNAIL_SIZE);
        (
            pick(self.art_downscale_width),
            pick(self.art_downscale_height),
        )
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - Application id and channel id are not empty
    /// - The icon reference has `<type>/<name>` form
    /// - Downscale dimensions are positive or `-1`
    /// - The art cache budget is non-zero
    /// - Ongoing notifications drop foreground status on pause
    pub fn validate(&self) -> Result<()> {
        if self.application_id.trim().is_empty() {
            return Err(Error::Config("Application id cannot be empty".to_string()));
        }

        if matches!(&self.notification_channel_id, Some(id) if id.trim().is_empty()) {
            return Err(Error::Config(
                "Notification channel id cannot be empty. \
                 Leave it unset to use '<application id>.channel'."
                    .to_string(),
            ));
        }

        match self.notification_icon.split_once('/') {
            Some((kind, name)) if !kind.is_empty() && !name.is_empty() => {}
            _ => {
                return Err(Error::Config(format!(
                    "Notification icon '{}' must be a resource reference like '{}'",
                    self.notification_icon, DEFAULT_NOTIFICATION_ICON
                )));
            }
        }

        for (name, value) in [
            ("width", self.art_downscale_width),
            ("height", self.art_downscale_height),
        ] {
            if value != UNSET && value <= 0 {
                return Err(Error::Config(format!(
                    "Art downscale {} must be positive or -1 (unset), got {}",
                    name, value
                )));
            }
        }

        if self.art_cache.capacity_bytes() == 0 {
            return Err(Error::Config(
                "Art cache memory budget is too small; one eighth of it must be at least 1 byte"
                    .to_string(),
            ));
        }

        if self.notification_ongoing && !self.stop_foreground_on_pause {
            return Err(Error::Config(
                "An ongoing notification requires stop_foreground_on_pause. \
                 Disable notification_ongoing or enable stop_foreground_on_pause."
                    .to_string(),
            ));
        }

        Ok(())
    }
}

/// Builder for constructing [`SessionConfig`] instances.
///
/// Unset options keep the defaults of [`SessionConfig::default`].
/// [`build()`](SessionConfigBuilder::build) validates the result.
#[derive(Debug, Default)]
pub struct SessionConfigBuilder {
    config: SessionConfig,
}

impl SessionConfigBuilder {
    /// Sets the application identifier.
    ///
    /// # Arguments
    ///
    /// * `id` - Host application id, used for the default channel id
    pub fn application_id(mut self, id: impl Into<String>) -> Self {
        self.config.application_id = id.into();
        self
    }

    /// Default: true
    pub fn resume_on_click(mut self, enabled: bool) -> Self {
        self.config.resume_on_click = enabled;
        self
    }

    pub fn notification_channel_id(mut self, id: impl Into<String>) -> Self {
        self.config.notification_channel_id = Some(id.into());
        self
    }

    pub fn notification_channel_name(mut self, name: impl Into<String>) -> Self {
        self.config.notification_channel_name = Some(name.into());
        self
    }

    pub fn notification_channel_description(mut self, description: impl Into<String>) -> Self {
        self.config.notification_channel_description = Some(description.into());
        self
    }

    /// Sets the notification accent color.
    ///
    /// # Arguments
    ///
    /// * `color` - ARGB color, or `-1` to leave it unset
    pub fn notification_color(mut self, color: i32) -> Self {
        self.config.notification_color = color;
        self
    }

    /// Sets the small notification icon.
    ///
    /// # Arguments
    ///
    /// * `icon` - Resource reference such as `"drawable/ic_stat_music"`
    pub fn notification_icon(mut self, icon: impl Into<String>) -> Self {
        self.config.notification_icon = icon.into();
        self
    }

    pub fn show_notification_badge(mut self, show: bool) -> Self {
        self.config.show_notification_badge = show;
        self
    }

    pub fn notification_click_starts_activity(mut self, enabled: bool) -> Self {
        self.config.notification_click_starts_activity = enabled;
        self
    }

    /// Default: false
    pub fn notification_ongoing(mut self, ongoing: bool) -> Self {
        self.config.notification_ongoing = ongoing;
        self
    }

    /// Default: true
    pub fn stop_foreground_on_pause(mut self, enabled: bool) -> Self {
        self.config.stop_foreground_on_pause = enabled;
        self
    }

    /// Sets the maximum decoded art size.
    ///
    /// # Arguments
    ///
    /// * `width` - Target width in pixels
    /// * `height` - Target height in pixels
    ///
    /// # Examples
    ///
    /// ```
    /// use core_runtime::config::SessionConfig;
    ///
    /// let config = SessionConfig::builder().art_downscale(300, 200).build().unwrap();
    /// assert_eq!(config.art_downscale(), Some((300, 200)));
    /// ```
    pub fn art_downscale(mut self, width: i32, height: i32) -> Self {
        self.config.art_downscale_width = width;
        self.config.art_downscale_height = height;
        self
    }

    pub fn activity(mut self, activity: impl Into<String>) -> Self {
        self.config.activity = Some(activity.into());
        self
    }

    pub fn browsable_root_extra(mut self, key: impl Into<String>, value: RootExtraValue) -> Self {
        self.config.browsable_root_extras.insert(key.into(), value);
        self
    }

    /// Sets the memory budget the art cache takes one eighth of.
    pub fn art_memory_budget(mut self, bytes: usize) -> Self {
        self.config.art_cache.memory_budget_bytes = bytes;
        self
    }

    /// Builds and validates the final `SessionConfig`.
    ///
    /// # Returns
    ///
    /// Returns `Ok(SessionConfig)` on success, or [`Error::Config`] describing
    /// the first invalid option.
    pub fn build(self) -> Result<SessionConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_host_conventions() {
        let config = SessionConfig::builder().build().unwrap();

        assert!(config.resume_on_click);
        assert!(config.notification_click_starts_activity);
        assert!(config.stop_foreground_on_pause);
        assert!(!config.notification_ongoing);
        assert!(!config.show_notification_badge);
        assert_eq!(config.notification_icon, "mipmap/ic_launcher");
        assert_eq!(config.notification_color(), None);
        assert_eq!(config.art_downscale(), None);
        assert_eq!(config.channel_id(), "media.session.channel");
    }

    #[test]
    fn test_channel_id_override() {
        let config = SessionConfig::builder()
            .application_id("com.example.player")
            .build()
            .unwrap();
        assert_eq!(config.channel_id(), "com.example.player.channel");

        let config = SessionConfig::builder()
            .notification_channel_id("playback")
            .build()
            .unwrap();
        assert_eq!(config.channel_id(), "playback");
    }

    #[test]
    fn test_thumbnail_size_overrides_per_dimension() {
        let config = SessionConfig::builder().build().unwrap();
        assert_eq!(config.thumbnail_size(), (192, 192));

        let config = SessionConfig::builder().art_downscale(300, -1).build().unwrap();
        assert_eq!(config.thumbnail_size(), (300, 192));
        assert_eq!(config.art_downscale(), Some((300, 0)));
    }

    #[test]
    fn test_rejects_invalid_downscale() {
        let result = SessionConfig::builder().art_downscale(0, 100).build();
        assert!(matches!(result, Err(Error::Config(msg)) if msg.contains("width")));

        let result = SessionConfig::builder().art_downscale(100, -7).build();
        assert!(matches!(result, Err(Error::Config(msg)) if msg.contains("height")));
    }

    #[test]
    fn test_rejects_malformed_icon_and_empty_channel() {
        assert!(SessionConfig::builder()
            .notification_icon("ic_launcher")
            .build()
            .is_err());
        assert!(SessionConfig::builder()
            .notification_channel_id("  ")
            .build()
            .is_err());
    }

    #[test]
    fn test_ongoing_requires_stop_foreground_on_pause() {
        let result = SessionConfig::builder()
            .notification_ongoing(true)
            .stop_foreground_on_pause(false)
            .build();
        assert!(result.is_err());

        let config = SessionConfig::builder()
            .notification_ongoing(true)
            .build()
            .unwrap();
        assert!(config.notification_ongoing);
    }

    #[test]
    fn test_json_round_trip_uses_camel_case() {
        let config = SessionConfig::builder()
            .notification_channel_name("Playback")
            .browsable_root_extra("android.media.browse.SEARCH_SUPPORTED", RootExtraValue::Bool(true))
            .browsable_root_extra("style", RootExtraValue::Int(2))
            .build()
            .unwrap();

        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"notificationChannelName\":\"Playback\""));
        assert!(json.contains("\"stopForegroundOnPause\":true"));

        let parsed = SessionConfig::from_json(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_from_json_fills_missing_keys_with_defaults() {
        let parsed = SessionConfig::from_json(r#"{"notificationColor": 255}"#).unwrap();
        assert_eq!(parsed.notification_color(), Some(255));
        assert!(parsed.resume_on_click);
        assert_eq!(parsed.art_cache.capacity_bytes(), DEFAULT_MEMORY_BUDGET_BYTES / 8);
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        let err = SessionConfig::from_json("not json").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
