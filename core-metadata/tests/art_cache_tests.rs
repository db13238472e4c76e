//! ArtCache against real files on disk.

use std::sync::Arc;

use bridge_desktop::TokioArtSource;
use core_metadata::artwork::{ArtCache, DecodeOptions};
use core_metadata::record::{ExtraValue, MediaRecord, EXTRA_ART_CACHE_FILE};
use core_runtime::config::SessionConfig;
use bridge_traits::session::PlatformCapabilities;
use image::{ImageBuffer, Rgba};
use tempfile::TempDir;

fn write_png(dir: &TempDir, name: &str, width: u32, height: u32) -> String {
    let img: ImageBuffer<Rgba<u8>, Vec<u8>> =
        ImageBuffer::from_fn(width, height, |x, y| Rgba([(x % 256) as u8, (y % 256) as u8, 0, 255]));
    let path = dir.path().join(name);
    img.save_with_format(&path, image::ImageFormat::Png).unwrap();
    path.to_string_lossy().into_owned()
}

#[tokio::test]
async fn test_record_art_decodes_from_cache_file() {
    let dir = TempDir::new().unwrap();
    let path = write_png(&dir, "cover.png", 40, 20);
    let record = MediaRecord::new("song-1", "Song")
        .with_art_uri("https://example.com/cover.png")
        .with_extra(EXTRA_ART_CACHE_FILE, ExtraValue::Text(path.clone()));

    let cache = ArtCache::new(Arc::new(TokioArtSource::new()), 1 << 20, DecodeOptions::default());
    let request = record.art_request().unwrap();
    let art = cache
        .get_or_decode(&request.reference, request.thumbnail_hint.as_deref())
        .await
        .unwrap();

    assert_eq!((art.width, art.height), (40, 20));
    assert_eq!(art.byte_size(), 40 * 20 * 4);
    assert!(cache.peek(&path).is_some());
}

#[tokio::test]
async fn test_configured_downscale_applies_to_files() {
    let dir = TempDir::new().unwrap();
    let path = write_png(&dir, "large.png", 400, 300);
    let config = SessionConfig::builder().art_downscale(100, 75).build().unwrap();
    let options = DecodeOptions::from_config(&config, PlatformCapabilities::new(34));

    let cache = ArtCache::new(Arc::new(TokioArtSource::new()), 1 << 20, options);
    let art = cache.get_or_decode(&path, None).await.unwrap();

    assert_eq!((art.width, art.height), (100, 75));
}

#[tokio::test]
async fn test_budget_holds_across_decodes() {
    let dir = TempDir::new().unwrap();
    let capacity = 3 * 32 * 32 * 4;
    let cache = ArtCache::new(Arc::new(TokioArtSource::new()), capacity, DecodeOptions::default());

    let mut paths = Vec::new();
    for i in 0..5 {
        let path = write_png(&dir, &format!("cover-{}.png", i), 32, 32);
        assert!(cache.get_or_decode(&path, None).await.is_some());
        assert!(cache.stats().bytes <= capacity);
        paths.push(path);
    }

    let stats = cache.stats();
    assert_eq!(stats.entries, 3);
    assert!(cache.peek(&paths[0]).is_none());
    assert!(cache.peek(&paths[1]).is_none());
    assert!(cache.peek(&paths[4]).is_some());
}

#[tokio::test]
async fn test_missing_file_is_absent() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nope.png");
    let cache = ArtCache::new(Arc::new(TokioArtSource::new()), 1 << 20, DecodeOptions::default());

    assert!(cache
        .get_or_decode(&path.to_string_lossy(), None)
        .await
        .is_none());
    assert_eq!(cache.stats().entries, 0);
}
