//! Core service façade and bootstrap helpers.
//!
//! This crate wires host-provided bridge implementations (media session,
//! notifications, wake lock, artwork source, clock) into the shared Rust
//! core and owns the background task that publishes notification rebuilds.
//! Desktop apps typically enable the `desktop-shims` feature (which depends
//! on `bridge-desktop`) and call [`bootstrap_desktop`]; other hosts build a
//! [`CoreDependencies`] from their own adapters.

pub mod error;

pub use error::{CoreError, Result};

use std::sync::Arc;

use bridge_traits::{
    artwork::ArtSource, notification::NotificationHost, power::WakeLock,
    session::MediaSessionHost, time::Clock,
};
use core_runtime::config::SessionConfig;
use core_runtime::events::{EventBus, EventSeverity, EventStream};
use core_session::{MediaSession, SessionHosts};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[cfg(feature = "desktop-shims")]
use bridge_desktop::{DesktopWakeLock, HeadlessNotificationHost, HeadlessSessionHost, TokioArtSource};

/// Aggregated handle to all bridge dependencies the core requires.
pub struct CoreDependencies {
    pub session_host: Arc<dyn MediaSessionHost>,
    pub notifications: Arc<dyn NotificationHost>,
    pub wake_lock: Arc<dyn WakeLock>,
    pub art_source: Arc<dyn ArtSource>,
    pub clock: Arc<dyn Clock>,
}

impl CoreDependencies {
    /// Construct a dependency bundle from explicit bridge handles.
    pub fn new(
        session_host: Arc<dyn MediaSessionHost>,
        notifications: Arc<dyn NotificationHost>,
        wake_lock: Arc<dyn WakeLock>,
        art_source: Arc<dyn ArtSource>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            session_host,
            notifications,
            wake_lock,
            art_source,
            clock,
        }
    }
}

impl From<CoreDependencies> for SessionHosts {
    fn from(deps: CoreDependencies) -> Self {
        Self {
            session: deps.session_host,
            notifications: deps.notifications,
            wake_lock: deps.wake_lock,
            art_source: deps.art_source,
            clock: deps.clock,
        }
    }
}

/// Primary façade exposed to host applications.
#[derive(Clone)]
pub struct CoreService {
    session: MediaSession,
    events: EventBus,
    shutdown: CancellationToken,
    publisher: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl std::fmt::Debug for CoreService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreService").finish_non_exhaustive()
    }
}

impl CoreService {
    /// Create a new service from the provided dependencies.
    pub fn new(deps: CoreDependencies) -> Self {
        let events = EventBus::default();
        Self {
            session: MediaSession::new(deps.into(), events.clone()),
            events,
            shutdown: CancellationToken::new(),
            publisher: Arc::new(Mutex::new(None)),
        }
    }

    /// The media session driven by this service.
    pub fn session(&self) -> &MediaSession {
        &self.session
    }

    /// Bus carrying session, notification and artwork events.
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Events for this service's session at `min_severity` or above.
    /// Artwork events are shared by every session and always pass.
    pub fn session_events(&self, min_severity: EventSeverity) -> EventStream {
        EventStream::new(self.events.subscribe())
            .for_session(self.session.session_id())
            .min_severity(min_severity)
    }

    /// Configures the session and starts the notification publisher.
    ///
    /// Calling it again reconfigures the session; the publisher keeps
    /// running.
    ///
    /// # Errors
    ///
    /// Fails outside a Tokio runtime, or when the session rejects the
    /// configuration or cannot reach its host.
    pub async fn start(&self, config: SessionConfig) -> Result<()> {
        if tokio::runtime::Handle::try_current().is_err() {
            return Err(CoreError::InitializationFailed(
                "CoreService must be started inside a Tokio runtime".to_string(),
            ));
        }
        if self.shutdown.is_cancelled() {
            return Err(CoreError::InitializationFailed(
                "CoreService has been shut down".to_string(),
            ));
        }

        self.session.configure(config).await?;

        let mut publisher = self.publisher.lock();
        if publisher.is_none() {
            *publisher = Some(self.session.spawn_publisher(self.shutdown.child_token()));
            debug!("Notification publisher started");
        }
        info!(session_id = %self.session.session_id(), "Core service started");
        Ok(())
    }

    /// Tears the session down and stops the publisher. Later calls are no-ops.
    pub async fn shutdown(&self) {
        if self.shutdown.is_cancelled() {
            return;
        }
        self.session.teardown().await;
        self.shutdown.cancel();

        let publisher = self.publisher.lock().take();
        if let Some(handle) = publisher {
            if let Err(err) = handle.await {
                warn!(error = %err, "Notification publisher ended abnormally");
            }
        }
        info!("Core service shut down");
    }
}

/// Dependencies backed by the headless desktop adapters.
#[cfg(feature = "desktop-shims")]
pub fn desktop_dependencies() -> CoreDependencies {
    CoreDependencies::new(
        Arc::new(HeadlessSessionHost::default()),
        Arc::new(HeadlessNotificationHost::new()),
        Arc::new(DesktopWakeLock::new()),
        Arc::new(TokioArtSource::new()),
        Arc::new(bridge_traits::time::SystemClock),
    )
}

/// Convenience bootstrapper for desktop hosts.
///
/// ```no_run
/// # #[cfg(feature = "desktop-shims")]
/// # async fn example() -> core_service::Result<()> {
/// use core_runtime::config::SessionConfig;
/// use core_service::bootstrap_desktop;
///
/// let config = SessionConfig::builder().application_id("com.example.player").build()?;
/// let core = bootstrap_desktop(config).await?;
/// let mut events = core.session().subscribe();
/// # Ok(())
/// # }
/// ```
#[cfg(feature = "desktop-shims")]
pub async fn bootstrap_desktop(config: SessionConfig) -> Result<CoreService> {
    let service = CoreService::new(desktop_dependencies());
    service.start(config).await?;
    Ok(service)
}
