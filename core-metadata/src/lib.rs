//! # Metadata & Artwork Module
//!
//! Canonical media records and decoded album art for a media session.
//!
//! ## Overview
//!
//! This module handles:
//! - Media records with typed extras and ratings ([`record`])
//! - The last-write-wins record lookup backing queue and browse responses
//!   ([`store`])
//! - A byte-bounded LRU cache of decoded artwork and the pipeline that fills
//!   it ([`artwork`])

pub mod artwork;
pub mod error;
pub mod record;
pub mod store;

pub use artwork::{ArtCache, CacheStats, DecodeOptions};
pub use error::{MetadataError, Result};
pub use record::{ArtRequest, ExtraValue, Extras, MediaRecord, Rating, RatingStyle, RawMediaItem};
pub use store::MetadataStore;
