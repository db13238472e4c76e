//! # Media Session
//!
//! Façade tying metadata, artwork, playback state, controls, the notification
//! and the lifecycle machine to the platform hosts.
//!
//! ## Overview
//!
//! [`MediaSession`] is a cheap, clonable handle. All mutable state sits behind
//! one async mutex, so application updates and host callbacks are applied one
//! at a time in arrival order. Two things run outside that lock:
//!
//! - art decodes, spawned per record and folded back in through the lock
//! - notification rebuilds, coalesced in a [`LatestSlot`] and drained by the
//!   publisher task or by [`MediaSession::publish_pending`]
//!
//! Configuration is fail-fast: when the host cannot be reached, every later
//! update returns [`SessionError::ConnectionFailed`] until a configure call
//! succeeds.
//!
//! ## Usage
//!
//! ```ignore
//! let session = MediaSession::new(hosts, EventBus::default());
//! session.configure(config).await?;
//! let publisher = session.spawn_publisher(shutdown.clone());
//!
//! session.set_metadata(record).await?;
//! session.set_state(StateUpdate::new(actions, status)).await?;
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use bridge_traits::artwork::{ArtBitmap, ArtSource};
use bridge_traits::notification::{NotificationHost, NotificationPayload};
use bridge_traits::power::WakeLock;
use bridge_traits::session::{MediaSessionHost, PlatformCapabilities, RemoteVolume, SessionMetadata};
use bridge_traits::time::Clock;
use core_metadata::{ArtCache, ArtRequest, CacheStats, DecodeOptions, MediaRecord, MetadataStore};
use core_runtime::config::{RootExtraValue, SessionConfig};
use core_runtime::events::{CoreEvent, EventBus, NotificationEvent, SessionEvent};
use core_runtime::logging::strip_path;
use parking_lot::Mutex as SyncMutex;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, trace, warn};
use uuid::Uuid;

use crate::buttons;
use crate::coalesce::LatestSlot;
use crate::command::PlatformCommand;
use crate::error::{Result, SessionError};
use crate::events::{ControlEvent, ControlEventReceiver, ControlEventSender};
use crate::lifecycle::{LifecycleEffect, LifecyclePhase, LifecyclePolicy, SessionLifecycle};
use crate::negotiator::{
    ActionNegotiator, CapabilityStrategy, CUSTOM_ACTION_FAST_FORWARD, CUSTOM_ACTION_REWIND,
};
use crate::notification::{ComposerSettings, NotificationComposer, NotificationContent};
use crate::projector;
use crate::state::{ActionSet, PlaybackInfo, PlaybackStatus, StateUpdate};

/// Root id returned to browsers asking for recently played media.
pub const RECENT_ROOT_ID: &str = "recent";
/// Root id returned to every other browser.
pub const BROWSABLE_ROOT_ID: &str = "root";

/// Platform services a session talks to.
#[derive(Clone)]
pub struct SessionHosts {
    pub session: Arc<dyn MediaSessionHost>,
    pub notifications: Arc<dyn NotificationHost>,
    pub wake_lock: Arc<dyn WakeLock>,
    pub art_source: Arc<dyn ArtSource>,
    pub clock: Arc<dyn Clock>,
}

/// Root handed to a media browser.
#[derive(Debug, Clone, PartialEq)]
pub struct BrowsableRoot {
    pub id: &'static str,
    pub extras: BTreeMap<String, RootExtraValue>,
}

/// Why a notification rebuild was requested. Only the latest one survives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RebuildReason {
    State,
    Content,
}

// ============================================================================
// Session state
// ============================================================================

/// Everything that exists only while the host connection is up.
struct Engine {
    config: SessionConfig,
    capabilities: PlatformCapabilities,
    art_cache: Arc<ArtCache>,
    negotiator: ActionNegotiator,
    composer: NotificationComposer,
    lifecycle: SessionLifecycle,
    current: Option<Arc<MediaRecord>>,
    art_ref: Option<String>,
    art: Option<Arc<ArtBitmap>>,
    queue: Vec<Arc<MediaRecord>>,
    actions: ActionSet,
    status: PlaybackStatus,
    remote_volume: Option<RemoteVolume>,
}

impl Engine {
    fn new(config: SessionConfig, capabilities: PlatformCapabilities, art_cache: Arc<ArtCache>) -> Self {
        Self {
            capabilities,
            art_cache,
            negotiator: ActionNegotiator::new(CapabilityStrategy::select(capabilities)),
            composer: NotificationComposer::new(ComposerSettings::from_config(&config)),
            lifecycle: SessionLifecycle::new(policy_of(&config)),
            current: None,
            art_ref: None,
            art: None,
            queue: Vec::new(),
            actions: ActionSet::default(),
            status: PlaybackStatus::default(),
            remote_volume: None,
            config,
        }
    }

    fn compose(&mut self, force: bool) -> Option<NotificationPayload> {
        let content = NotificationContent {
            record: self.current.as_deref(),
            art_ref: self.art_ref.as_deref(),
            art: self.art.as_ref(),
            controls: self.negotiator.current(),
        };
        self.composer.compose(&content, force)
    }

    fn metadata(&self) -> Option<SessionMetadata> {
        self.current.as_ref().map(|record| {
            let mut metadata = record.to_session_metadata();
            metadata.art = self.art.clone();
            metadata
        })
    }

    fn title(&self) -> Option<String> {
        self.current
            .as_ref()
            .and_then(|record| record.description_title())
            .map(str::to_string)
    }

    fn clear(&mut self) {
        self.art_cache.clear();
        self.negotiator.reset();
        self.composer.reset();
        self.current = None;
        self.art_ref = None;
        self.art = None;
        self.queue.clear();
        self.actions = ActionSet::default();
        self.status = PlaybackStatus::default();
    }
}

enum Connection {
    Unconfigured,
    Failed(String),
    Ready(Box<Engine>),
}

struct Inner {
    connection: Connection,
}

impl Inner {
    fn engine(&self) -> Result<&Engine> {
        match &self.connection {
            Connection::Ready(engine) => Ok(&**engine),
            Connection::Failed(message) => Err(SessionError::ConnectionFailed(message.clone())),
            Connection::Unconfigured => Err(SessionError::NotConfigured),
        }
    }

    fn engine_mut(&mut self) -> Result<&mut Engine> {
        match &mut self.connection {
            Connection::Ready(engine) => Ok(&mut **engine),
            Connection::Failed(message) => Err(SessionError::ConnectionFailed(message.clone())),
            Connection::Unconfigured => Err(SessionError::NotConfigured),
        }
    }

    /// Whether a connected instance is still running.
    fn is_live(&self) -> bool {
        matches!(&self.connection, Connection::Ready(engine) if !engine.lifecycle.is_terminated())
    }
}

struct Shared {
    session_id: String,
    hosts: SessionHosts,
    events: EventBus,
    store: MetadataStore,
    listener: ControlEventSender,
    rebuilds: LatestSlot<RebuildReason>,
    decodes: SyncMutex<Vec<JoinHandle<()>>>,
    inner: Mutex<Inner>,
}

fn policy_of(config: &SessionConfig) -> LifecyclePolicy {
    LifecyclePolicy {
        stop_foreground_on_pause: config.stop_foreground_on_pause,
        resume_on_click: config.resume_on_click,
    }
}

// ============================================================================
// MediaSession
// ============================================================================

/// Handle to one media session instance.
#[derive(Clone)]
pub struct MediaSession {
    shared: Arc<Shared>,
}

impl MediaSession {
    /// Create a new, unconfigured session.
    ///
    /// # Arguments
    ///
    /// * `hosts` - Platform services to push state to
    /// * `events` - Bus receiving session, notification and artwork events
    pub fn new(hosts: SessionHosts, events: EventBus) -> Self {
        Self {
            shared: Arc::new(Shared {
                session_id: Uuid::new_v4().to_string(),
                hosts,
                events,
                store: MetadataStore::new(),
                listener: ControlEventSender::new(),
                rebuilds: LatestSlot::new(),
                decodes: SyncMutex::new(Vec::new()),
                inner: Mutex::new(Inner {
                    connection: Connection::Unconfigured,
                }),
            }),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.shared.session_id
    }

    /// Records registered through [`set_metadata`](Self::set_metadata) and
    /// [`set_queue`](Self::set_queue), keyed by media id.
    pub fn store(&self) -> &MetadataStore {
        &self.shared.store
    }

    /// Attaches the application listener, replacing any previous one.
    pub fn subscribe(&self) -> ControlEventReceiver {
        self.shared.listener.subscribe()
    }

    // ------------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------------

    /// Connects to the host and applies `config`.
    ///
    /// On a live session the new settings are applied in place and the
    /// current content is kept. After a terminal transition, or on first use,
    /// a fresh instance is started.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Config`] for invalid settings and
    /// [`SessionError::ConnectionFailed`] when the host cannot be bound. The
    /// failure is remembered and returned by every later update until a
    /// configure call succeeds.
    #[instrument(skip(self, config), fields(session_id = %self.shared.session_id))]
    pub async fn configure(&self, config: SessionConfig) -> Result<()> {
        config.validate()?;
        let hosts = &self.shared.hosts;
        let mut inner = self.shared.inner.lock().await;

        if let Err(err) = hosts.session.connect().await {
            let message = err.to_string();
            warn!(error = %message, "Failed to connect media session");
            let previous =
                std::mem::replace(&mut inner.connection, Connection::Failed(message.clone()));
            if let Connection::Ready(mut engine) = previous {
                self.release_engine(&mut engine, "disconnected").await;
            }
            self.emit(CoreEvent::Session(SessionEvent::ConnectionFailed {
                session_id: self.shared.session_id.clone(),
                message: message.clone(),
            }));
            return Err(SessionError::ConnectionFailed(message));
        }

        let capabilities = hosts.session.capabilities();
        let options = DecodeOptions::from_config(&config, capabilities);
        let capacity = config.art_cache.capacity_bytes();

        if inner.is_live() {
            let engine = inner.engine_mut()?;
            if engine.art_cache.options() != &options
                || engine.art_cache.stats().capacity_bytes != capacity
            {
                engine.art_cache = Arc::new(self.art_cache(capacity, options));
            }
            engine.composer = NotificationComposer::new(ComposerSettings::from_config(&config));
            engine.lifecycle.set_policy(policy_of(&config));
            engine.capabilities = capabilities;
            engine.config = config;
            info!("Media session reconfigured");
        } else {
            let art_cache = Arc::new(self.art_cache(capacity, options));
            inner.connection =
                Connection::Ready(Box::new(Engine::new(config, capabilities, art_cache)));
            info!(api_level = capabilities.api_level, "Media session configured");
        }

        let engine = inner.engine()?;
        if let Err(err) = hosts.notifications.ensure_channel(engine.composer.channel()).await {
            warn!(error = %err, "Failed to create notification channel");
        }

        self.emit(CoreEvent::Session(SessionEvent::Configured {
            session_id: self.shared.session_id.clone(),
        }));
        Ok(())
    }

    fn art_cache(&self, capacity: usize, options: DecodeOptions) -> ArtCache {
        ArtCache::new(Arc::clone(&self.shared.hosts.art_source), capacity, options)
            .with_event_bus(self.shared.events.clone())
    }

    // ------------------------------------------------------------------------
    // Updates from the application
    // ------------------------------------------------------------------------

    /// Publishes `record` as the current item.
    ///
    /// The record is registered in the store even when the session is not
    /// usable. Artwork already in the cache is attached immediately;
    /// otherwise a decode is started and the metadata is pushed again once
    /// it lands, provided the record is still current.
    pub async fn set_metadata(&self, record: MediaRecord) -> Result<()> {
        let record = self.shared.store.put(record);
        let mut inner = self.shared.inner.lock().await;
        let engine = inner.engine_mut()?;
        if engine.lifecycle.is_terminated() {
            debug!(media_id = %record.id, "Session terminated, ignoring metadata");
            return Ok(());
        }

        let request = record.art_request();
        engine.art_ref = request.as_ref().map(|r| r.reference.clone());
        engine.art = None;
        engine.current = Some(Arc::clone(&record));

        if let Some(request) = request {
            match engine.art_cache.get(&request.reference) {
                Some(art) => engine.art = Some(art),
                None => self.spawn_decode(Arc::clone(&engine.art_cache), request),
            }
        }

        self.shared.hosts.session.set_metadata(engine.metadata()).await?;

        let effects = engine.lifecycle.on_content_changed();
        self.apply_effects(engine, effects).await;
        Ok(())
    }

    /// Publishes the queue. Entries get their position as queue id.
    pub async fn set_queue(&self, records: Vec<MediaRecord>) -> Result<()> {
        let records: Vec<Arc<MediaRecord>> = records
            .into_iter()
            .map(|record| self.shared.store.put(record))
            .collect();

        let mut inner = self.shared.inner.lock().await;
        let engine = inner.engine_mut()?;
        let entries = records
            .iter()
            .enumerate()
            .map(|(position, record)| record.to_queue_entry(position as i64))
            .collect();
        engine.queue = records;
        self.shared.hosts.session.set_queue(entries).await?;
        Ok(())
    }

    /// Projects and publishes a playback state, then runs the lifecycle
    /// transitions it implies.
    ///
    /// Updates arriving after a terminal transition are ignored until the
    /// session is configured again.
    #[instrument(skip_all, fields(state = update.status.processing_state.as_str(), playing = update.status.playing))]
    pub async fn set_state(&self, update: StateUpdate) -> Result<()> {
        let mut inner = self.shared.inner.lock().await;
        let engine = inner.engine_mut()?;
        if engine.lifecycle.is_terminated() {
            debug!("Session terminated, ignoring state update");
            return Ok(());
        }

        let StateUpdate {
            actions,
            compact_indices,
            status,
        } = update;

        let negotiated_before = engine.negotiator.clone();
        let dirty = engine
            .negotiator
            .negotiate(actions.controls(), compact_indices.as_deref());
        let projection = projector::project(
            &status,
            &actions,
            engine.negotiator.current().custom.clone(),
            engine.current.as_ref().map(|record| record.id.as_str()),
            self.shared.hosts.clock.now(),
        );
        let platform_state = projection.playback.state;

        let host = &self.shared.hosts.session;
        let pushed = match host.set_playback_state(projection.playback).await {
            Ok(()) => host.set_transport_modes(projection.modes).await,
            Err(err) => Err(err),
        };
        if let Err(err) = pushed {
            // Keep the last published controls so a retry still counts as a change
            engine.negotiator = negotiated_before;
            return Err(err.into());
        }

        let effects = engine
            .lifecycle
            .on_state(status.processing_state, status.playing, dirty);
        engine.actions = actions;
        engine.status = status;

        self.emit(CoreEvent::Session(SessionEvent::StateChanged {
            session_id: self.shared.session_id.clone(),
            state: format!("{:?}", platform_state),
            playing: engine.lifecycle.is_playing(),
        }));

        self.apply_effects(engine, effects).await;
        if engine.lifecycle.is_terminated() {
            self.terminated("idle");
        }
        Ok(())
    }

    /// Routes volume handling locally or to a remote provider.
    ///
    /// A remote provider is only replaced when its control type or maximum
    /// changes; a volume-only change updates the existing one.
    pub async fn set_playback_info(&self, info: PlaybackInfo) -> Result<()> {
        let mut inner = self.shared.inner.lock().await;
        let engine = inner.engine_mut()?;
        let host = &self.shared.hosts.session;

        match info {
            PlaybackInfo::Local => {
                host.set_playback_to_local().await?;
                engine.remote_volume = None;
            }
            PlaybackInfo::Remote {
                control,
                max_volume,
                volume,
            } => {
                let provider = RemoteVolume {
                    control,
                    max_volume,
                    current_volume: volume,
                };
                let reusable = engine
                    .remote_volume
                    .is_some_and(|v| v.control == control && v.max_volume == max_volume);
                if reusable {
                    host.set_remote_volume(volume).await?;
                } else {
                    debug!(?control, max_volume, "Installing remote volume provider");
                    host.set_playback_to_remote(provider).await?;
                }
                engine.remote_volume = Some(provider);
            }
        }
        Ok(())
    }

    /// Stops the session: same terminal path as entering idle, and the
    /// stored records, cached art and controls are dropped.
    ///
    /// Stopping a session that never connected, or whose connection failed,
    /// only clears the stored records.
    pub async fn stop(&self) -> Result<()> {
        let mut inner = self.shared.inner.lock().await;
        let engine = match inner.engine_mut() {
            Ok(engine) => engine,
            Err(err) => {
                debug!(reason = %err, "Nothing to stop");
                self.shared.store.clear();
                self.shared.rebuilds.take();
                return Ok(());
            }
        };
        let was_terminated = engine.lifecycle.is_terminated();

        let effects = engine.lifecycle.on_stop();
        self.apply_effects(engine, effects).await;
        engine.clear();
        self.shared.store.clear();
        self.shared.rebuilds.take();

        if !was_terminated {
            self.terminated("stop");
        }
        Ok(())
    }

    /// Destroys the instance.
    ///
    /// The listener receives [`ControlEvent::Destroy`] first. Everything
    /// still held is then released and all state is cleared. Safe to call
    /// more than once and on a session that never connected.
    #[instrument(skip(self), fields(session_id = %self.shared.session_id))]
    pub async fn teardown(&self) {
        self.shared.listener.dispatch(ControlEvent::Destroy);
        self.join_decodes().await;

        let mut inner = self.shared.inner.lock().await;
        self.shared.store.clear();
        self.shared.rebuilds.take();

        let Ok(engine) = inner.engine_mut() else {
            return;
        };
        let was_terminated = engine.lifecycle.is_terminated();
        let effects = engine.lifecycle.on_teardown();
        self.apply_effects(engine, effects).await;
        engine.clear();

        if !was_terminated {
            self.terminated("stop");
        }
        info!("Media session torn down");
    }

    // ------------------------------------------------------------------------
    // Commands from the platform
    // ------------------------------------------------------------------------

    /// Translates one platform callback and forwards it to the listener.
    ///
    /// Prepare commands activate the session first. Queue commands and
    /// [`PlatformCommand::PlayMediaItem`] are resolved against the store;
    /// unknown media ids are dropped.
    pub async fn handle_command(&self, command: PlatformCommand) {
        if command.requires_activation() {
            let mut inner = self.shared.inner.lock().await;
            if let Ok(engine) = inner.engine_mut() {
                let effects = engine.lifecycle.on_prepare();
                self.apply_effects(engine, effects).await;
            }
        }

        if let Some(event) = self.translate(command) {
            self.shared.listener.dispatch(event);
        }
    }

    fn translate(&self, command: PlatformCommand) -> Option<ControlEvent> {
        let resolve = |media_id: &str| {
            let record = self.shared.store.get(media_id);
            if record.is_none() {
                warn!(media_id, "Command references an unknown media item");
            }
            record
        };

        let event = match command {
            PlatformCommand::MediaButton { event } => return buttons::route(event),
            PlatformCommand::Prepare => ControlEvent::Prepare,
            PlatformCommand::PrepareFromMediaId { media_id, extras } => {
                ControlEvent::PrepareFromMediaId { media_id, extras }
            }
            PlatformCommand::PrepareFromSearch { query, extras } => {
                ControlEvent::PrepareFromSearch { query, extras }
            }
            PlatformCommand::PrepareFromUri { uri, extras } => {
                ControlEvent::PrepareFromUri { uri, extras }
            }
            PlatformCommand::Play => ControlEvent::Play,
            PlatformCommand::PlayFromMediaId { media_id, extras } => {
                ControlEvent::PlayFromMediaId { media_id, extras }
            }
            PlatformCommand::PlayFromSearch { query, extras } => {
                ControlEvent::PlayFromSearch { query, extras }
            }
            PlatformCommand::PlayFromUri { uri, extras } => ControlEvent::PlayFromUri { uri, extras },
            PlatformCommand::PlayMediaItem { media_id } => ControlEvent::PlayMediaItem {
                record: resolve(&media_id)?,
            },
            PlatformCommand::Pause => ControlEvent::Pause,
            PlatformCommand::Stop => ControlEvent::Stop,
            PlatformCommand::SeekTo { position_ms } => ControlEvent::SeekTo { position_ms },
            PlatformCommand::SkipToNext => ControlEvent::SkipToNext,
            PlatformCommand::SkipToPrevious => ControlEvent::SkipToPrevious,
            PlatformCommand::SkipToQueueItem { queue_id } => ControlEvent::SkipToQueueItem { queue_id },
            PlatformCommand::FastForward => ControlEvent::FastForward,
            PlatformCommand::Rewind => ControlEvent::Rewind,
            PlatformCommand::SetRepeatMode { mode } => ControlEvent::SetRepeatMode { mode },
            PlatformCommand::SetShuffleMode { mode } => ControlEvent::SetShuffleMode { mode },
            PlatformCommand::SetRating { rating, extras } => ControlEvent::SetRating { rating, extras },
            PlatformCommand::SetPlaybackSpeed { speed } => ControlEvent::SetPlaybackSpeed { speed },
            PlatformCommand::SetCaptioningEnabled { enabled } => {
                ControlEvent::SetCaptioningEnabled { enabled }
            }
            // Seek buttons degraded to custom actions come back under these names
            PlatformCommand::CustomAction { name, .. } if name == CUSTOM_ACTION_FAST_FORWARD => {
                ControlEvent::FastForward
            }
            PlatformCommand::CustomAction { name, .. } if name == CUSTOM_ACTION_REWIND => {
                ControlEvent::Rewind
            }
            PlatformCommand::CustomAction { name, extras } => ControlEvent::CustomAction { name, extras },
            PlatformCommand::AddQueueItem { media_id } => ControlEvent::AddQueueItem {
                record: resolve(&media_id)?,
            },
            PlatformCommand::AddQueueItemAt { media_id, index } => ControlEvent::AddQueueItemAt {
                record: resolve(&media_id)?,
                index,
            },
            PlatformCommand::RemoveQueueItem { media_id } => ControlEvent::RemoveQueueItem {
                record: resolve(&media_id)?,
            },
            PlatformCommand::RemoveQueueItemAt { index } => ControlEvent::RemoveQueueItemAt { index },
            PlatformCommand::SetVolumeTo { volume } => ControlEvent::SetVolumeTo { volume },
            PlatformCommand::AdjustVolume { direction } => ControlEvent::AdjustVolume { direction },
            PlatformCommand::NotificationDeleted => ControlEvent::Close,
            PlatformCommand::TaskRemoved => ControlEvent::TaskRemoved,
        };
        Some(event)
    }

    /// Root returned to a media browser.
    ///
    /// # Arguments
    ///
    /// * `recent` - Whether the browser asked for recently played media
    pub async fn browsable_root(&self, recent: bool) -> Result<BrowsableRoot> {
        let inner = self.shared.inner.lock().await;
        let engine = inner.engine()?;
        Ok(BrowsableRoot {
            id: if recent { RECENT_ROOT_ID } else { BROWSABLE_ROOT_ID },
            extras: engine.config.browsable_root_extras.clone(),
        })
    }

    // ------------------------------------------------------------------------
    // Notification publishing
    // ------------------------------------------------------------------------

    /// Builds and posts the pending notification rebuild, if any.
    ///
    /// # Returns
    ///
    /// `true` if a notification was posted. Rebuilds whose content did not
    /// change since the last post are suppressed.
    pub async fn publish_pending(&self) -> Result<bool> {
        match self.shared.rebuilds.take() {
            Some(reason) => self.rebuild(reason).await,
            None => Ok(false),
        }
    }

    /// Spawns the task draining notification rebuilds until `shutdown` fires.
    pub fn spawn_publisher(&self, shutdown: CancellationToken) -> JoinHandle<()> {
        let session = self.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    reason = session.shared.rebuilds.wait() => {
                        if let Err(err) = session.rebuild(reason).await {
                            warn!(error = %err, "Notification rebuild failed");
                        }
                    }
                }
            }
            debug!("Notification publisher stopped");
        })
    }

    /// Waits for in-flight art decodes, then publishes whatever rebuild is
    /// pending.
    pub async fn settle(&self) -> Result<bool> {
        self.join_decodes().await;
        self.publish_pending().await
    }

    async fn rebuild(&self, reason: RebuildReason) -> Result<bool> {
        let mut inner = self.shared.inner.lock().await;
        let Ok(engine) = inner.engine_mut() else {
            return Ok(false);
        };
        if engine.lifecycle.is_terminated() || !engine.lifecycle.notification_created() {
            trace!(?reason, "No notification to rebuild");
            return Ok(false);
        }
        let Some(payload) = engine.compose(false) else {
            trace!(?reason, "Notification content unchanged");
            return Ok(false);
        };

        let has_art = payload.large_icon.is_some();
        self.shared.hosts.notifications.notify(payload).await?;
        self.emit(CoreEvent::Notification(NotificationEvent::Published {
            session_id: self.shared.session_id.clone(),
            title: engine.title(),
            has_art,
        }));
        Ok(true)
    }

    // ------------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------------

    pub async fn phase(&self) -> LifecyclePhase {
        let inner = self.shared.inner.lock().await;
        match inner.engine() {
            Ok(engine) => engine.lifecycle.phase(),
            Err(_) => LifecyclePhase::Inactive,
        }
    }

    /// Capabilities reported by the host at the last successful configure.
    pub async fn capabilities(&self) -> Option<PlatformCapabilities> {
        let inner = self.shared.inner.lock().await;
        inner.engine().ok().map(|engine| engine.capabilities)
    }

    pub async fn current_record(&self) -> Option<Arc<MediaRecord>> {
        let inner = self.shared.inner.lock().await;
        inner.engine().ok().and_then(|engine| engine.current.clone())
    }

    /// Artwork attached to the current record, once decoded.
    pub async fn current_art(&self) -> Option<Arc<ArtBitmap>> {
        let inner = self.shared.inner.lock().await;
        inner.engine().ok().and_then(|engine| engine.art.clone())
    }

    pub async fn queue(&self) -> Vec<Arc<MediaRecord>> {
        let inner = self.shared.inner.lock().await;
        inner
            .engine()
            .map(|engine| engine.queue.clone())
            .unwrap_or_default()
    }

    pub async fn art_cache_stats(&self) -> Option<CacheStats> {
        let inner = self.shared.inner.lock().await;
        inner.engine().ok().map(|engine| engine.art_cache.stats())
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    fn spawn_decode(&self, cache: Arc<ArtCache>, request: ArtRequest) {
        let session = self.clone();
        let handle = tokio::spawn(async move {
            let art = cache
                .get_or_decode(&request.reference, request.thumbnail_hint.as_deref())
                .await;
            if let Some(art) = art {
                session.art_ready(&request.reference, art).await;
            }
        });

        let mut decodes = self.shared.decodes.lock();
        decodes.retain(|handle| !handle.is_finished());
        decodes.push(handle);
    }

    async fn art_ready(&self, reference: &str, art: Arc<ArtBitmap>) {
        let mut inner = self.shared.inner.lock().await;
        let Ok(engine) = inner.engine_mut() else {
            return;
        };
        if engine.lifecycle.is_terminated() || engine.art_ref.as_deref() != Some(reference) {
            trace!(art_ref = strip_path(reference), "Art arrived for a record no longer current");
            return;
        }

        engine.art = Some(art);
        if let Err(err) = self.shared.hosts.session.set_metadata(engine.metadata()).await {
            warn!(error = %err, "Failed to publish metadata with art");
        }
        let effects = engine.lifecycle.on_content_changed();
        self.apply_effects(engine, effects).await;
    }

    /// Releases everything a dropped engine still holds on the hosts.
    async fn release_engine(&self, engine: &mut Engine, reason: &str) {
        let was_terminated = engine.lifecycle.is_terminated();
        let effects = engine.lifecycle.on_teardown();
        self.apply_effects(engine, effects).await;
        engine.clear();
        self.shared.rebuilds.take();
        if !was_terminated {
            self.terminated(reason);
        }
    }

    async fn join_decodes(&self) {
        loop {
            let pending = std::mem::take(&mut *self.shared.decodes.lock());
            if pending.is_empty() {
                break;
            }
            for handle in pending {
                if let Err(err) = handle.await {
                    warn!(error = %err, "Art decode task failed");
                }
            }
        }
    }

    /// Applies lifecycle effects to the hosts, in order. Host failures are
    /// logged and do not stop the remaining effects.
    async fn apply_effects(&self, engine: &mut Engine, effects: Vec<LifecycleEffect>) {
        let hosts = &self.shared.hosts;
        let session_id = &self.shared.session_id;

        for effect in effects {
            trace!(?effect, "Applying lifecycle effect");
            let outcome = match effect {
                LifecycleEffect::Activate => {
                    let result = hosts.session.set_active(true).await;
                    self.emit(CoreEvent::Session(SessionEvent::Activated {
                        session_id: session_id.clone(),
                    }));
                    result
                }
                LifecycleEffect::Deactivate => {
                    let result = hosts.session.set_active(false).await;
                    self.emit(CoreEvent::Session(SessionEvent::Deactivated {
                        session_id: session_id.clone(),
                    }));
                    result
                }
                LifecycleEffect::AcquireWakeLock => {
                    if hosts.wake_lock.is_held() {
                        Ok(())
                    } else {
                        hosts.wake_lock.acquire()
                    }
                }
                LifecycleEffect::ReleaseWakeLock => {
                    if hosts.wake_lock.is_held() {
                        hosts.wake_lock.release()
                    } else {
                        Ok(())
                    }
                }
                LifecycleEffect::PublishSessionActivity => {
                    hosts
                        .session
                        .set_session_activity(engine.config.activity.clone())
                        .await
                }
                LifecycleEffect::StartForeground => match engine.compose(true) {
                    Some(payload) => {
                        let has_art = payload.large_icon.is_some();
                        let result = hosts.notifications.start_foreground(payload).await;
                        self.emit(CoreEvent::Session(SessionEvent::ForegroundEntered {
                            session_id: session_id.clone(),
                        }));
                        self.emit(CoreEvent::Notification(NotificationEvent::Published {
                            session_id: session_id.clone(),
                            title: engine.title(),
                            has_art,
                        }));
                        result
                    }
                    None => Ok(()),
                },
                LifecycleEffect::StopForeground {
                    remove_notification,
                } => {
                    let result = hosts.notifications.stop_foreground(remove_notification).await;
                    self.emit(CoreEvent::Session(SessionEvent::ForegroundExited {
                        session_id: session_id.clone(),
                    }));
                    result
                }
                LifecycleEffect::UpdateNotification => {
                    let reason = if engine.lifecycle.is_playing() {
                        RebuildReason::State
                    } else {
                        RebuildReason::Content
                    };
                    if self.shared.rebuilds.replace(reason) {
                        trace!("Coalesced pending notification rebuild");
                    }
                    Ok(())
                }
                LifecycleEffect::CancelNotification => {
                    engine.composer.reset();
                    let result = hosts.notifications.cancel().await;
                    self.emit(CoreEvent::Notification(NotificationEvent::Cancelled {
                        session_id: session_id.clone(),
                    }));
                    result
                }
                LifecycleEffect::ReleaseSession => hosts.session.release().await,
            };

            if let Err(err) = outcome {
                warn!(?effect, error = %err, "Host rejected lifecycle effect");
            }
        }
    }

    fn terminated(&self, reason: &str) {
        info!(reason, "Media session reached a terminal state");
        self.emit(CoreEvent::Session(SessionEvent::Terminated {
            session_id: self.shared.session_id.clone(),
            reason: reason.to_string(),
        }));
    }

    fn emit(&self, event: CoreEvent) {
        self.shared.events.publish(event);
    }
}

impl std::fmt::Debug for MediaSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaSession")
            .field("session_id", &self.shared.session_id)
            .finish_non_exhaustive()
    }
}
