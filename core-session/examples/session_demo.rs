//! # Media Session Walkthrough
//!
//! Drives a session through play, pause, track change and stop against the
//! headless desktop hosts, printing what each host was told.
//!
//! Run with: `cargo run --example session_demo --package core-session`

use std::sync::Arc;

use anyhow::Result;
use bridge_desktop::{DesktopWakeLock, HeadlessNotificationHost, HeadlessSessionHost, TokioArtSource};
use bridge_traits::input::{keycodes, KeyEvent};
use bridge_traits::power::WakeLock;
use bridge_traits::time::SystemClock;
use core_metadata::MediaRecord;
use core_runtime::config::SessionConfig;
use core_runtime::events::EventBus;
use core_runtime::logging::{init_logging, LoggingConfig};
use core_session::{
    ActionSet, ControlAction, ControlEvent, MediaSession, PlatformCommand, PlaybackStatus,
    ProcessingState, SessionHosts, StateUpdate,
};
use tokio_util::sync::CancellationToken;

fn controls(playing: bool) -> ActionSet {
    let toggle = if playing {
        ControlAction::pause()
    } else {
        ControlAction::play()
    };
    ActionSet::new(
        vec![
            ControlAction::skip_to_previous(),
            toggle,
            ControlAction::skip_to_next(),
        ],
        0,
    )
}

fn update(state: ProcessingState, playing: bool) -> StateUpdate {
    StateUpdate::new(controls(playing), PlaybackStatus::new(state, playing))
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging(LoggingConfig::default())?;

    let host = Arc::new(HeadlessSessionHost::default());
    let notifications = Arc::new(HeadlessNotificationHost::new());
    let wake_lock = Arc::new(DesktopWakeLock::new());
    let session = MediaSession::new(
        SessionHosts {
            session: host.clone(),
            notifications: notifications.clone(),
            wake_lock: wake_lock.clone(),
            art_source: Arc::new(TokioArtSource::new()),
            clock: Arc::new(SystemClock),
        },
        EventBus::default(),
    );

    let config = SessionConfig::builder()
        .application_id("com.example.player")
        .notification_channel_name("Now playing")
        .build()?;
    session.configure(config).await?;

    let shutdown = CancellationToken::new();
    let publisher = session.spawn_publisher(shutdown.clone());

    // Application side: react to buttons
    let mut listener = session.subscribe();
    let app = tokio::spawn(async move {
        while let Some(event) = listener.recv().await {
            println!("  listener <- {}", event.name());
            if event == ControlEvent::Destroy {
                break;
            }
        }
    });

    println!("== play");
    session
        .set_metadata(
            MediaRecord::new("track-1", "Harbour Lights")
                .with_artist("The Tidelines")
                .with_album("Low Water")
                .with_duration_ms(214_000),
        )
        .await?;
    session.set_state(update(ProcessingState::Ready, true)).await?;
    println!("  phase: {:?}", session.phase().await);
    println!("  wake lock held: {}", wake_lock.is_held());

    println!("== headset button");
    session
        .handle_command(PlatformCommand::MediaButton {
            event: KeyEvent::down(keycodes::HEADSETHOOK),
        })
        .await;

    println!("== pause");
    session.set_state(update(ProcessingState::Ready, false)).await?;
    println!("  phase: {:?}", session.phase().await);
    println!("  foreground: {}", notifications.snapshot().foreground);

    println!("== next track");
    session
        .set_metadata(MediaRecord::new("track-2", "Undertow").with_artist("The Tidelines"))
        .await?;
    session.settle().await?;
    if let Some(visible) = notifications.snapshot().visible {
        println!("  notification: {:?} / {:?}", visible.title, visible.subtitle);
    }

    println!("== stop");
    session.set_state(update(ProcessingState::Idle, false)).await?;
    println!("  phase: {:?}", session.phase().await);
    println!("  session active: {}", host.snapshot().active);

    session.teardown().await;
    shutdown.cancel();
    publisher.await?;
    app.await?;
    Ok(())
}
