//! Media records as the session sees them.
//!
//! A [`MediaRecord`] is the canonical description of one playable item. The
//! application layer sends items as loosely typed maps ([`RawMediaItem`]);
//! turning one into a record coerces its extras into the scalar types a
//! platform metadata bundle can hold.

use std::collections::BTreeMap;

use bridge_traits::session::{MetadataValue, QueueEntry, SessionMetadata};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// Extra naming a local file the application already cached the art into.
pub const EXTRA_ART_CACHE_FILE: &str = "artCacheFile";
/// Extra asking for a host-generated thumbnail of a content handle.
pub const EXTRA_LOAD_THUMBNAIL_URI: &str = "loadThumbnailUri";

/// Platform metadata keys.
pub mod keys {
    pub const MEDIA_ID: &str = "android.media.metadata.MEDIA_ID";
    pub const TITLE: &str = "android.media.metadata.TITLE";
    pub const ALBUM: &str = "android.media.metadata.ALBUM";
    pub const ARTIST: &str = "android.media.metadata.ARTIST";
    pub const GENRE: &str = "android.media.metadata.GENRE";
    pub const DURATION: &str = "android.media.metadata.DURATION";
    pub const DISPLAY_ICON_URI: &str = "android.media.metadata.DISPLAY_ICON_URI";
    pub const DISPLAY_TITLE: &str = "android.media.metadata.DISPLAY_TITLE";
    pub const DISPLAY_SUBTITLE: &str = "android.media.metadata.DISPLAY_SUBTITLE";
    pub const DISPLAY_DESCRIPTION: &str = "android.media.metadata.DISPLAY_DESCRIPTION";
    pub const RATING: &str = "android.media.metadata.RATING";
    pub const PLAYABLE: &str = "playable_long";
}

/// Scalar stored in a record's extras.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExtraValue {
    Bool(bool),
    Long(i64),
    Text(String),
}

impl ExtraValue {
    /// Coerces a JSON value into an extra.
    ///
    /// Floating-point numbers become their string form since the platform
    /// bundle has no float slot. Nulls, arrays and objects have no scalar form
    /// and yield `None`.
    pub fn coerce(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(ExtraValue::Bool(*b)),
            Value::String(s) => Some(ExtraValue::Text(s.clone())),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(ExtraValue::Long(i))
                } else if let Some(f) = n.as_f64() {
                    Some(ExtraValue::Text(format!("{:?}", f)))
                } else {
                    // u64 beyond i64::MAX
                    Some(ExtraValue::Text(n.to_string()))
                }
            }
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ExtraValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

pub type Extras = BTreeMap<String, ExtraValue>;

/// Coerces every entry of a JSON object, dropping unsupported values.
pub fn coerce_extras(media_id: &str, raw: &serde_json::Map<String, Value>) -> Extras {
    let mut extras = Extras::new();
    for (key, value) in raw {
        match ExtraValue::coerce(value) {
            Some(extra) => {
                extras.insert(key.clone(), extra);
            }
            None => warn!(
                media_id,
                key = %key,
                kind = json_kind(value),
                "Dropping extra with unsupported type"
            ),
        }
    }
    extras
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// User rating attached to a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Rating {
    /// Rating style is known but the user has not rated yet.
    Unrated { style: RatingStyle },
    Heart { liked: bool },
    Thumb { up: bool },
    Stars { max: u8, value: f32 },
    Percentage { value: f32 },
}

/// Rating scale codes shared with the application layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RatingStyle {
    None,
    Heart,
    ThumbUpDown,
    Stars3,
    Stars4,
    Stars5,
    Percentage,
}

impl RatingStyle {
    pub fn from_code(code: i64) -> Option<Self> {
        Some(match code {
            0 => RatingStyle::None,
            1 => RatingStyle::Heart,
            2 => RatingStyle::ThumbUpDown,
            3 => RatingStyle::Stars3,
            4 => RatingStyle::Stars4,
            5 => RatingStyle::Stars5,
            6 => RatingStyle::Percentage,
            _ => return None,
        })
    }

    pub fn code(self) -> i32 {
        match self {
            RatingStyle::None => 0,
            RatingStyle::Heart => 1,
            RatingStyle::ThumbUpDown => 2,
            RatingStyle::Stars3 => 3,
            RatingStyle::Stars4 => 4,
            RatingStyle::Stars5 => 5,
            RatingStyle::Percentage => 6,
        }
    }
}

/// Rating in the `{type, value}` form used by the application layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRating {
    #[serde(rename = "type")]
    pub style: i64,
    #[serde(default)]
    pub value: Value,
}

impl Rating {
    /// Parses a raw rating. `None` if the style code is unknown or the value
    /// does not fit the style.
    pub fn from_raw(raw: &RawRating) -> Option<Self> {
        let style = RatingStyle::from_code(raw.style)?;
        if raw.value.is_null() {
            return Some(Rating::Unrated { style });
        }
        match style {
            RatingStyle::None => Some(Rating::Unrated { style }),
            RatingStyle::Heart => raw.value.as_bool().map(|liked| Rating::Heart { liked }),
            RatingStyle::ThumbUpDown => raw.value.as_bool().map(|up| Rating::Thumb { up }),
            RatingStyle::Stars3 | RatingStyle::Stars4 | RatingStyle::Stars5 => {
                let max = style.code() as u8;
                let value = raw.value.as_f64()? as f32;
                (0.0..=f32::from(max))
                    .contains(&value)
                    .then_some(Rating::Stars { max, value })
            }
            RatingStyle::Percentage => {
                let value = raw.value.as_f64()? as f32;
                (0.0..=100.0)
                    .contains(&value)
                    .then_some(Rating::Percentage { value })
            }
        }
    }

    pub fn to_raw(&self) -> RawRating {
        let (style, value) = match self {
            Rating::Unrated { style } => (*style, Value::Null),
            Rating::Heart { liked } => (RatingStyle::Heart, Value::Bool(*liked)),
            Rating::Thumb { up } => (RatingStyle::ThumbUpDown, Value::Bool(*up)),
            Rating::Stars { max, value } => {
                let style = RatingStyle::from_code(i64::from(*max)).unwrap_or(RatingStyle::Stars5);
                (style, Value::from(f64::from(*value)))
            }
            Rating::Percentage { value } => (RatingStyle::Percentage, Value::from(f64::from(*value))),
        };
        RawRating {
            style: i64::from(style.code()),
            value,
        }
    }

    pub fn style(&self) -> RatingStyle {
        match self {
            Rating::Unrated { style } => *style,
            Rating::Heart { .. } => RatingStyle::Heart,
            Rating::Thumb { .. } => RatingStyle::ThumbUpDown,
            Rating::Stars { max: 3, .. } => RatingStyle::Stars3,
            Rating::Stars { max: 4, .. } => RatingStyle::Stars4,
            Rating::Stars { .. } => RatingStyle::Stars5,
            Rating::Percentage { .. } => RatingStyle::Percentage,
        }
    }

    fn platform_value(&self) -> Option<f32> {
        match self {
            Rating::Unrated { .. } => None,
            Rating::Heart { liked } => Some(if *liked { 1.0 } else { 0.0 }),
            Rating::Thumb { up } => Some(if *up { 1.0 } else { 0.0 }),
            Rating::Stars { value, .. } | Rating::Percentage { value } => Some(*value),
        }
    }
}

/// Where a record's artwork comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtRequest {
    /// Cache key and source reference (content handle or local path).
    pub reference: String,
    /// Present when the host should be asked for a thumbnail.
    pub thumbnail_hint: Option<String>,
}

/// Canonical metadata for one media item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaRecord {
    pub id: String,
    pub title: String,
    pub album: Option<String>,
    pub artist: Option<String>,
    pub genre: Option<String>,
    pub duration_ms: Option<u64>,
    pub art_uri: Option<String>,
    pub playable: Option<bool>,
    pub display_title: Option<String>,
    pub display_subtitle: Option<String>,
    pub display_description: Option<String>,
    pub rating: Option<Rating>,
    #[serde(default)]
    pub extras: Extras,
}

impl MediaRecord {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            album: None,
            artist: None,
            genre: None,
            duration_ms: None,
            art_uri: None,
            playable: None,
            display_title: None,
            display_subtitle: None,
            display_description: None,
            rating: None,
            extras: Extras::new(),
        }
    }

    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album = Some(album.into());
        self
    }

    pub fn with_artist(mut self, artist: impl Into<String>) -> Self {
        self.artist = Some(artist.into());
        self
    }

    pub fn with_art_uri(mut self, uri: impl Into<String>) -> Self {
        self.art_uri = Some(uri.into());
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn with_display_description(mut self, description: impl Into<String>) -> Self {
        self.display_description = Some(description.into());
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: ExtraValue) -> Self {
        self.extras.insert(key.into(), value);
        self
    }

    /// Title shown in compact surfaces: the display title, else the title.
    pub fn description_title(&self) -> Option<&str> {
        non_empty(self.display_title.as_deref()).or_else(|| non_empty(Some(&self.title)))
    }

    /// Subtitle shown in compact surfaces: the display subtitle, else the artist.
    pub fn description_subtitle(&self) -> Option<&str> {
        non_empty(self.display_subtitle.as_deref()).or_else(|| non_empty(self.artist.as_deref()))
    }

    pub fn description_text(&self) -> Option<&str> {
        non_empty(self.display_description.as_deref())
    }

    /// Resolves where artwork should be loaded from.
    ///
    /// An `artCacheFile` extra wins and is read as a local file. Otherwise only
    /// content handles are loaded, with `loadThumbnailUri` as the thumbnail
    /// hint. Remote URLs are the application's job to cache into a file.
    pub fn art_request(&self) -> Option<ArtRequest> {
        if let Some(path) = self.extras.get(EXTRA_ART_CACHE_FILE).and_then(ExtraValue::as_str) {
            return Some(ArtRequest {
                reference: path.to_string(),
                thumbnail_hint: None,
            });
        }

        let uri = self.art_uri.as_deref()?;
        if !uri.starts_with("content:") {
            return None;
        }
        Some(ArtRequest {
            reference: uri.to_string(),
            thumbnail_hint: self
                .extras
                .get(EXTRA_LOAD_THUMBNAIL_URI)
                .and_then(ExtraValue::as_str)
                .map(str::to_string),
        })
    }

    /// Flattens the record into the platform metadata bundle (without art).
    pub fn to_session_metadata(&self) -> SessionMetadata {
        let mut entries = BTreeMap::new();
        let mut text = |key: &str, value: Option<&String>| {
            if let Some(v) = value {
                entries.insert(key.to_string(), MetadataValue::Text(v.clone()));
            }
        };
        text(keys::MEDIA_ID, Some(&self.id));
        text(keys::TITLE, Some(&self.title));
        text(keys::ALBUM, self.album.as_ref());
        text(keys::ARTIST, self.artist.as_ref());
        text(keys::GENRE, self.genre.as_ref());
        text(keys::DISPLAY_ICON_URI, self.art_uri.as_ref());
        text(keys::DISPLAY_TITLE, self.display_title.as_ref());
        text(keys::DISPLAY_SUBTITLE, self.display_subtitle.as_ref());
        text(keys::DISPLAY_DESCRIPTION, self.display_description.as_ref());

        if let Some(duration) = self.duration_ms {
            entries.insert(
                keys::DURATION.to_string(),
                MetadataValue::Long(i64::try_from(duration).unwrap_or(i64::MAX)),
            );
        }
        if let Some(playable) = self.playable {
            entries.insert(keys::PLAYABLE.to_string(), MetadataValue::Long(i64::from(playable)));
        }
        if let Some(rating) = &self.rating {
            entries.insert(
                keys::RATING.to_string(),
                MetadataValue::Rating {
                    style: rating.style().code(),
                    value: rating.platform_value(),
                },
            );
        }
        for (key, value) in &self.extras {
            let value = match value {
                ExtraValue::Bool(b) => MetadataValue::Long(i64::from(*b)),
                ExtraValue::Long(l) => MetadataValue::Long(*l),
                ExtraValue::Text(s) => MetadataValue::Text(s.clone()),
            };
            entries.insert(key.clone(), value);
        }

        SessionMetadata {
            media_id: self.id.clone(),
            entries,
            art: None,
        }
    }

    /// Queue row for this record at position `queue_id`.
    pub fn to_queue_entry(&self, queue_id: i64) -> QueueEntry {
        QueueEntry {
            queue_id,
            media_id: self.id.clone(),
            title: self.description_title().map(str::to_string),
            subtitle: self.description_subtitle().map(str::to_string),
            art_uri: self.art_uri.clone(),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Media item as sent by the application layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMediaItem {
    pub id: String,
    pub title: String,
    pub album: Option<String>,
    pub artist: Option<String>,
    pub genre: Option<String>,
    /// Duration in milliseconds
    pub duration: Option<u64>,
    pub art_uri: Option<String>,
    pub playable: Option<bool>,
    pub display_title: Option<String>,
    pub display_subtitle: Option<String>,
    pub display_description: Option<String>,
    pub rating: Option<RawRating>,
    #[serde(default)]
    pub extras: serde_json::Map<String, Value>,
}

impl RawMediaItem {
    /// Parses an item from its JSON form.
    pub fn from_json(json: &str) -> crate::Result<Self> {
        serde_json::from_str(json).map_err(|e| {
            crate::MetadataError::InvalidMetadata(format!("Malformed media item: {}", e))
        })
    }

    /// Converts to a record, coercing extras and dropping an unusable rating.
    pub fn into_record(self) -> MediaRecord {
        let extras = coerce_extras(&self.id, &self.extras);
        let rating = self.rating.as_ref().and_then(|raw| {
            let parsed = Rating::from_raw(raw);
            if parsed.is_none() {
                warn!(media_id = %self.id, style = raw.style, "Dropping unusable rating");
            }
            parsed
        });
        MediaRecord {
            id: self.id,
            title: self.title,
            album: self.album,
            artist: self.artist,
            genre: self.genre,
            duration_ms: self.duration,
            art_uri: self.art_uri,
            playable: self.playable,
            display_title: self.display_title,
            display_subtitle: self.display_subtitle,
            display_description: self.display_description,
            rating,
            extras,
        }
    }
}
