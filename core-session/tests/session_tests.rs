//! End-to-end session behaviour against the headless desktop hosts.

use std::sync::Arc;
use std::time::Duration;

use bridge_desktop::{
    DesktopWakeLock, HeadlessNotificationHost, HeadlessSessionHost, TokioArtSource, VolumeRouting,
};
use bridge_traits::input::{keycodes, KeyEvent};
use bridge_traits::power::WakeLock;
use bridge_traits::session::{PlatformCapabilities, PlatformState, RemoteVolume, VolumeControl};
use bridge_traits::time::FixedClock;
use chrono::{TimeZone, Utc};
use core_metadata::record::{ExtraValue, MediaRecord, EXTRA_ART_CACHE_FILE};
use core_runtime::config::SessionConfig;
use core_runtime::events::{CoreEvent, EventBus, SessionEvent};
use core_session::negotiator::CUSTOM_ACTION_FAST_FORWARD;
use core_session::projector::EXTRA_NOW_PLAYING_MEDIA_ID;
use core_session::{
    ActionSet, ActivePhase, ControlAction, ControlEvent, LifecyclePhase, MediaButton,
    MediaSession, PlatformCommand, PlaybackInfo, PlaybackStatus, ProcessingState, SessionError,
    SessionHosts, StateUpdate,
};
use core_metadata::Extras;
use image::{ImageBuffer, Rgba};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

struct Harness {
    session: MediaSession,
    host: Arc<HeadlessSessionHost>,
    notifications: Arc<HeadlessNotificationHost>,
    wake_lock: Arc<DesktopWakeLock>,
    events: EventBus,
}

fn harness_with(host: HeadlessSessionHost) -> Harness {
    let host = Arc::new(host);
    let notifications = Arc::new(HeadlessNotificationHost::new());
    let wake_lock = Arc::new(DesktopWakeLock::new());
    let events = EventBus::default();
    let hosts = SessionHosts {
        session: host.clone(),
        notifications: notifications.clone(),
        wake_lock: wake_lock.clone(),
        art_source: Arc::new(TokioArtSource::new()),
        clock: Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        )),
    };
    Harness {
        session: MediaSession::new(hosts, events.clone()),
        host,
        notifications,
        wake_lock,
        events,
    }
}

fn harness() -> Harness {
    harness_with(HeadlessSessionHost::default())
}

async fn configured() -> Harness {
    let h = harness();
    h.session.configure(SessionConfig::default()).await.unwrap();
    h
}

fn transport() -> ActionSet {
    ActionSet::new(
        vec![
            ControlAction::skip_to_previous(),
            ControlAction::pause(),
            ControlAction::skip_to_next(),
        ],
        0,
    )
}

fn status(state: ProcessingState, playing: bool) -> StateUpdate {
    StateUpdate::new(transport(), PlaybackStatus::new(state, playing))
}

fn song(id: &str, title: &str) -> MediaRecord {
    MediaRecord::new(id, title).with_artist("The Band")
}

fn write_png(dir: &TempDir, name: &str, width: u32, height: u32) -> String {
    let img: ImageBuffer<Rgba<u8>, Vec<u8>> =
        ImageBuffer::from_fn(width, height, |x, y| Rgba([(x % 256) as u8, (y % 256) as u8, 90, 255]));
    let path = dir.path().join(name);
    img.save_with_format(&path, image::ImageFormat::Png).unwrap();
    path.to_string_lossy().into_owned()
}

// ============================================================================
// Lifecycle
// ============================================================================

#[tokio::test]
async fn test_play_enters_foreground() {
    let h = configured().await;
    h.session.set_metadata(song("song-1", "First Light")).await.unwrap();
    h.session
        .set_state(status(ProcessingState::Ready, true))
        .await
        .unwrap();

    let host = h.host.snapshot();
    assert!(host.active);
    let playback = host.playback_state.unwrap();
    assert_eq!(playback.state, PlatformState::Playing);
    assert_eq!(
        playback.extras.get(EXTRA_NOW_PLAYING_MEDIA_ID).map(String::as_str),
        Some("song-1")
    );

    assert!(h.wake_lock.is_held());
    let notifications = h.notifications.snapshot();
    assert!(notifications.foreground);
    let visible = notifications.visible.unwrap();
    assert_eq!(visible.title.as_deref(), Some("First Light"));
    assert_eq!(visible.buttons.len(), 3);
    assert_eq!(
        h.session.phase().await,
        LifecyclePhase::Active(ActivePhase::Playing)
    );
}

#[tokio::test]
async fn test_pause_keeps_notification_and_releases_wake_lock() {
    let h = configured().await;
    h.session.set_metadata(song("song-1", "First Light")).await.unwrap();
    h.session
        .set_state(status(ProcessingState::Ready, true))
        .await
        .unwrap();
    h.session
        .set_state(status(ProcessingState::Ready, false))
        .await
        .unwrap();

    let notifications = h.notifications.snapshot();
    assert!(!notifications.foreground);
    assert!(notifications.visible.is_some());
    assert!(!h.wake_lock.is_held());
    assert!(h.host.snapshot().active);
    assert_eq!(
        h.host.snapshot().playback_state.unwrap().state,
        PlatformState::Paused
    );
    assert_eq!(
        h.session.phase().await,
        LifecyclePhase::Active(ActivePhase::Paused)
    );
}

#[tokio::test]
async fn test_idle_is_terminal_until_reconfigured() {
    let h = configured().await;
    let mut events = h.events.subscribe();
    h.session
        .set_state(status(ProcessingState::Ready, true))
        .await
        .unwrap();
    h.session
        .set_state(status(ProcessingState::Idle, false))
        .await
        .unwrap();

    assert_eq!(h.session.phase().await, LifecyclePhase::Terminated);
    assert!(!h.host.snapshot().active);
    assert!(!h.wake_lock.is_held());
    let notifications = h.notifications.snapshot();
    assert!(notifications.visible.is_none());
    assert_eq!(notifications.cancellations, 1);

    let mut terminated = false;
    while let Ok(event) = events.try_recv() {
        if let CoreEvent::Session(SessionEvent::Terminated { reason, .. }) = event {
            assert_eq!(reason, "idle");
            terminated = true;
        }
    }
    assert!(terminated);

    // Later updates do not resurrect the instance
    h.session
        .set_state(status(ProcessingState::Ready, true))
        .await
        .unwrap();
    assert_eq!(h.session.phase().await, LifecyclePhase::Terminated);
    assert!(!h.wake_lock.is_held());
    assert!(!h.host.snapshot().active);

    h.session.configure(SessionConfig::default()).await.unwrap();
    assert_eq!(h.session.phase().await, LifecyclePhase::Inactive);
    h.session
        .set_state(status(ProcessingState::Ready, true))
        .await
        .unwrap();
    assert!(h.wake_lock.is_held());
    assert_eq!(h.host.snapshot().redundant_deactivations, 0);
}

#[tokio::test]
async fn test_idle_terminates_from_buffering_error_and_loading() {
    let paths = [
        vec![
            status(ProcessingState::Ready, true),
            status(ProcessingState::Buffering, true),
        ],
        vec![
            status(ProcessingState::Ready, true),
            status(ProcessingState::Error, false),
        ],
        vec![status(ProcessingState::Loading, false)],
    ];

    for path in paths {
        let h = configured().await;
        let mut events = h.events.subscribe();
        for update in path {
            h.session.set_state(update).await.unwrap();
        }
        h.session
            .set_state(status(ProcessingState::Idle, false))
            .await
            .unwrap();

        assert_eq!(h.session.phase().await, LifecyclePhase::Terminated);
        assert!(!h.host.snapshot().active);
        assert!(!h.wake_lock.is_held());
        let notifications = h.notifications.snapshot();
        assert!(!notifications.foreground);
        assert!(notifications.visible.is_none());

        let mut reasons = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let CoreEvent::Session(SessionEvent::Terminated { reason, .. }) = event {
                reasons.push(reason);
            }
        }
        assert_eq!(reasons, vec!["idle".to_string()]);
    }
}

#[tokio::test]
async fn test_buffering_before_first_play_does_not_activate() {
    let h = configured().await;
    h.session
        .set_state(status(ProcessingState::Buffering, false))
        .await
        .unwrap();

    assert_eq!(h.session.phase().await, LifecyclePhase::Inactive);
    assert!(!h.host.snapshot().active);
    assert!(h.notifications.snapshot().posted.is_empty());
    assert_eq!(
        h.host.snapshot().playback_state.unwrap().state,
        PlatformState::Buffering
    );
}

#[tokio::test]
async fn test_stop_clears_records_and_cache() {
    let h = configured().await;
    h.session.set_metadata(song("song-1", "First Light")).await.unwrap();
    h.session
        .set_state(status(ProcessingState::Ready, true))
        .await
        .unwrap();

    h.session.stop().await.unwrap();

    assert_eq!(h.session.phase().await, LifecyclePhase::Terminated);
    assert!(h.session.store().is_empty());
    assert!(h.session.current_record().await.is_none());
    assert_eq!(h.session.art_cache_stats().await.unwrap().entries, 0);
    assert!(h.notifications.snapshot().visible.is_none());
}

#[tokio::test]
async fn test_stop_without_connection_only_clears_records() {
    let h = harness();
    h.session.stop().await.unwrap();
    assert_eq!(h.notifications.snapshot().cancellations, 0);

    let h = harness_with(HeadlessSessionHost::unreachable(PlatformCapabilities::new(34)));
    let mut events = h.events.subscribe();
    h.session.configure(SessionConfig::default()).await.unwrap_err();
    let _ = h.session.set_metadata(song("song-1", "First Light")).await;
    assert!(h.session.store().contains("song-1"));

    h.session.stop().await.unwrap();
    assert!(h.session.store().is_empty());
    assert!(!h.host.snapshot().released);
    while let Ok(event) = events.try_recv() {
        assert!(!matches!(
            event,
            CoreEvent::Session(SessionEvent::Terminated { .. })
        ));
    }

    // The remembered failure still applies to updates
    let err = h
        .session
        .set_state(status(ProcessingState::Ready, true))
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::ConnectionFailed(_)));
}

#[tokio::test]
async fn test_teardown_notifies_listener_and_releases() {
    let h = configured().await;
    let mut listener = h.session.subscribe();
    h.session
        .set_state(status(ProcessingState::Ready, true))
        .await
        .unwrap();

    h.session.teardown().await;
    h.session.teardown().await;

    assert_eq!(listener.recv().await, Some(ControlEvent::Destroy));
    let host = h.host.snapshot();
    assert!(host.released);
    assert!(!host.active);
    assert!(!h.wake_lock.is_held());
    // Resume-on-click keeps the notification around for a tap to restart
    assert!(h.notifications.snapshot().visible.is_some());
    assert_eq!(h.session.phase().await, LifecyclePhase::Terminated);
}

// ============================================================================
// Configuration
// ============================================================================

#[tokio::test]
async fn test_connection_failure_is_fail_fast() {
    let h = harness_with(HeadlessSessionHost::unreachable(PlatformCapabilities::new(34)));
    let mut events = h.events.subscribe();

    let err = h.session.configure(SessionConfig::default()).await.unwrap_err();
    assert!(matches!(err, SessionError::ConnectionFailed(_)));
    assert!(matches!(
        events.try_recv().unwrap(),
        CoreEvent::Session(SessionEvent::ConnectionFailed { .. })
    ));

    let err = h
        .session
        .set_state(status(ProcessingState::Ready, true))
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::ConnectionFailed(_)));

    let err = h
        .session
        .set_metadata(song("song-1", "First Light"))
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::ConnectionFailed(_)));
    assert!(h.session.store().contains("song-1"));
    assert!(!h.wake_lock.is_held());
}

#[tokio::test]
async fn test_updates_before_configure_are_rejected() {
    let h = harness();
    let err = h
        .session
        .set_state(status(ProcessingState::Ready, true))
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::NotConfigured));
}

#[tokio::test]
async fn test_invalid_config_is_rejected_before_connecting() {
    let h = harness();
    let config = SessionConfig {
        notification_icon: "ic_launcher".to_string(),
        ..SessionConfig::default()
    };

    let err = h.session.configure(config).await.unwrap_err();
    assert!(matches!(err, SessionError::Config(_)));
    assert!(!h.host.snapshot().connected);
}

#[tokio::test]
async fn test_browsable_root_ids() {
    let h = configured().await;
    assert_eq!(h.session.browsable_root(true).await.unwrap().id, "recent");
    assert_eq!(h.session.browsable_root(false).await.unwrap().id, "root");
}

// ============================================================================
// Notification rebuilds
// ============================================================================

#[tokio::test]
async fn test_rebuilds_coalesce_to_latest() {
    let h = configured().await;
    h.session.set_metadata(song("a", "Track A")).await.unwrap();
    h.session
        .set_state(status(ProcessingState::Ready, true))
        .await
        .unwrap();

    h.session.set_metadata(song("b", "Track B")).await.unwrap();
    h.session.set_metadata(song("c", "Track C")).await.unwrap();

    assert!(h.session.publish_pending().await.unwrap());
    assert!(!h.session.publish_pending().await.unwrap());

    let notifications = h.notifications.snapshot();
    assert_eq!(notifications.posted.len(), 2);
    assert_eq!(
        notifications.visible.unwrap().title.as_deref(),
        Some("Track C")
    );
}

#[tokio::test]
async fn test_unchanged_content_is_not_reposted() {
    let h = configured().await;
    h.session.set_metadata(song("a", "Track A")).await.unwrap();
    h.session
        .set_state(status(ProcessingState::Ready, true))
        .await
        .unwrap();

    h.session
        .set_state(status(ProcessingState::Ready, true))
        .await
        .unwrap();
    h.session.set_metadata(song("a", "Track A")).await.unwrap();

    assert!(!h.session.publish_pending().await.unwrap());
    assert_eq!(h.notifications.snapshot().posted.len(), 1);
}

#[tokio::test]
async fn test_publisher_task_posts_rebuilds() {
    let h = configured().await;
    let shutdown = CancellationToken::new();
    let publisher = h.session.spawn_publisher(shutdown.clone());

    h.session.set_metadata(song("a", "Track A")).await.unwrap();
    h.session
        .set_state(status(ProcessingState::Ready, true))
        .await
        .unwrap();
    h.session.set_metadata(song("b", "Track B")).await.unwrap();

    let posted = tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            let snapshot = h.notifications.snapshot();
            if snapshot.posted.len() == 2 {
                return snapshot;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("publisher did not post the rebuild");
    assert_eq!(
        posted.visible.unwrap().title.as_deref(),
        Some("Track B")
    );

    shutdown.cancel();
    publisher.await.unwrap();
}

#[tokio::test]
async fn test_decoded_art_reaches_session_and_notification() {
    let dir = TempDir::new().unwrap();
    let path = write_png(&dir, "cover.png", 40, 20);
    let h = configured().await;

    let record = song("a", "Track A").with_extra(EXTRA_ART_CACHE_FILE, ExtraValue::Text(path));
    h.session.set_metadata(record).await.unwrap();
    h.session
        .set_state(status(ProcessingState::Ready, true))
        .await
        .unwrap();
    h.session.settle().await.unwrap();

    let art = h.session.current_art().await.unwrap();
    assert_eq!((art.width, art.height), (40, 20));

    let metadata = h.host.snapshot().metadata.unwrap();
    assert!(metadata.art.is_some());
    let visible = h.notifications.snapshot().visible.unwrap();
    assert!(visible.large_icon.is_some());
    assert_eq!(h.session.art_cache_stats().await.unwrap().entries, 1);
}

#[tokio::test]
async fn test_missing_art_leaves_record_without_icon() {
    let h = configured().await;
    let record = song("a", "Track A").with_extra(
        EXTRA_ART_CACHE_FILE,
        ExtraValue::Text("/nonexistent/cover.png".to_string()),
    );
    h.session.set_metadata(record).await.unwrap();
    h.session
        .set_state(status(ProcessingState::Ready, true))
        .await
        .unwrap();
    h.session.settle().await.unwrap();

    assert!(h.session.current_art().await.is_none());
    assert!(h.notifications.snapshot().visible.unwrap().large_icon.is_none());
}

// ============================================================================
// Commands
// ============================================================================

#[tokio::test]
async fn test_media_buttons_reach_listener() {
    let h = configured().await;
    let mut listener = h.session.subscribe();

    h.session
        .handle_command(PlatformCommand::MediaButton {
            event: KeyEvent::down(keycodes::MEDIA_PLAY_PAUSE),
        })
        .await;
    h.session
        .handle_command(PlatformCommand::MediaButton {
            event: KeyEvent::up(keycodes::MEDIA_PLAY_PAUSE),
        })
        .await;
    h.session
        .handle_command(PlatformCommand::MediaButton {
            event: KeyEvent::down(keycodes::BYPASS_PAUSE),
        })
        .await;

    assert_eq!(
        listener.recv().await,
        Some(ControlEvent::Click {
            button: MediaButton::Media
        })
    );
    assert_eq!(listener.recv().await, Some(ControlEvent::Pause));
    assert!(listener.try_recv().is_err());
}

#[tokio::test]
async fn test_commands_without_listener_are_dropped() {
    let h = configured().await;
    h.session.handle_command(PlatformCommand::Play).await;
    h.session.handle_command(PlatformCommand::NotificationDeleted).await;
}

#[tokio::test]
async fn test_prepare_activates_session() {
    let h = configured().await;
    let mut listener = h.session.subscribe();

    h.session.handle_command(PlatformCommand::Prepare).await;

    assert!(h.host.snapshot().active);
    assert_eq!(
        h.session.phase().await,
        LifecyclePhase::Active(ActivePhase::Stopped)
    );
    assert_eq!(listener.recv().await, Some(ControlEvent::Prepare));
}

#[tokio::test]
async fn test_queue_commands_resolve_records() {
    let h = configured().await;
    let mut listener = h.session.subscribe();
    h.session
        .set_queue(vec![song("a", "Track A"), song("b", "Track B")])
        .await
        .unwrap();

    let queue = h.host.snapshot().queue;
    assert_eq!(
        queue.iter().map(|e| (e.queue_id, e.media_id.as_str())).collect::<Vec<_>>(),
        vec![(0, "a"), (1, "b")]
    );

    h.session
        .handle_command(PlatformCommand::AddQueueItemAt {
            media_id: "b".to_string(),
            index: 0,
        })
        .await;
    h.session
        .handle_command(PlatformCommand::RemoveQueueItem {
            media_id: "missing".to_string(),
        })
        .await;
    h.session
        .handle_command(PlatformCommand::PlayMediaItem {
            media_id: "a".to_string(),
        })
        .await;

    match listener.recv().await {
        Some(ControlEvent::AddQueueItemAt { record, index }) => {
            assert_eq!(record.id, "b");
            assert_eq!(index, 0);
        }
        other => panic!("unexpected event: {other:?}"),
    }
    match listener.recv().await {
        Some(ControlEvent::PlayMediaItem { record }) => assert_eq!(record.title, "Track A"),
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn test_degraded_seek_actions_round_trip() {
    let h = harness_with(HeadlessSessionHost::new(PlatformCapabilities::new(33)));
    h.session.configure(SessionConfig::default()).await.unwrap();
    let mut listener = h.session.subscribe();

    let actions = ActionSet::new(
        vec![
            ControlAction::rewind(),
            ControlAction::pause(),
            ControlAction::fast_forward(),
        ],
        0,
    );
    h.session
        .set_state(StateUpdate::new(
            actions,
            PlaybackStatus::new(ProcessingState::Ready, true),
        ))
        .await
        .unwrap();

    let playback = h.host.snapshot().playback_state.unwrap();
    assert_eq!(playback.custom_actions.len(), 2);
    assert_eq!(h.notifications.snapshot().visible.unwrap().buttons.len(), 1);

    h.session
        .handle_command(PlatformCommand::CustomAction {
            name: CUSTOM_ACTION_FAST_FORWARD.to_string(),
            extras: Extras::new(),
        })
        .await;
    h.session
        .handle_command(PlatformCommand::CustomAction {
            name: "like".to_string(),
            extras: Extras::new(),
        })
        .await;

    assert_eq!(listener.recv().await, Some(ControlEvent::FastForward));
    assert_eq!(
        listener.recv().await,
        Some(ControlEvent::CustomAction {
            name: "like".to_string(),
            extras: Extras::new()
        })
    );
}

// ============================================================================
// Volume routing
// ============================================================================

#[tokio::test]
async fn test_remote_provider_reused_for_volume_changes() {
    let h = configured().await;
    let remote = |volume| PlaybackInfo::Remote {
        control: VolumeControl::Absolute,
        max_volume: 10,
        volume,
    };

    h.session.set_playback_info(remote(5)).await.unwrap();
    h.session.set_playback_info(remote(7)).await.unwrap();
    assert_eq!(
        h.host.snapshot().volume,
        Some(VolumeRouting::Remote(RemoteVolume {
            control: VolumeControl::Absolute,
            max_volume: 10,
            current_volume: 7,
        }))
    );

    h.session.set_playback_info(PlaybackInfo::Local).await.unwrap();
    assert_eq!(h.host.snapshot().volume, Some(VolumeRouting::Local));

    // A fresh provider is installed after returning to local output
    h.session.set_playback_info(remote(2)).await.unwrap();
    assert!(matches!(
        h.host.snapshot().volume,
        Some(VolumeRouting::Remote(RemoteVolume {
            current_volume: 2,
            ..
        }))
    ));
}
