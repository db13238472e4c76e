//! Headless media session host.
//!
//! Desktop builds have no lock screen to drive, so the session simply keeps
//! the last value of everything it was given. Useful as the default host and
//! for inspecting what the core published.

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    session::{
        MediaSessionHost, PlatformCapabilities, PlatformPlaybackState, QueueEntry, RemoteVolume,
        SessionMetadata, TransportModes,
    },
};
use parking_lot::Mutex;
use tracing::{debug, info};

/// Volume routing currently installed on the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeRouting {
    Local,
    Remote(RemoteVolume),
}

/// Everything the host has been told so far.
#[derive(Debug, Clone, Default)]
pub struct HeadlessSessionState {
    pub connected: bool,
    pub active: bool,
    pub released: bool,
    pub playback_state: Option<PlatformPlaybackState>,
    pub transport_modes: TransportModes,
    pub metadata: Option<SessionMetadata>,
    pub queue: Vec<QueueEntry>,
    pub volume: Option<VolumeRouting>,
    pub session_activity: Option<String>,
    /// Number of `set_active(false)` calls received while already inactive.
    pub redundant_deactivations: u32,
}

/// In-memory [`MediaSessionHost`].
#[derive(Debug)]
pub struct HeadlessSessionHost {
    capabilities: PlatformCapabilities,
    refuse_connection: bool,
    state: Mutex<HeadlessSessionState>,
}

impl HeadlessSessionHost {
    pub fn new(capabilities: PlatformCapabilities) -> Self {
        Self {
            capabilities,
            refuse_connection: false,
            state: Mutex::new(HeadlessSessionState::default()),
        }
    }

    /// A host whose `connect` always fails.
    pub fn unreachable(capabilities: PlatformCapabilities) -> Self {
        Self {
            refuse_connection: true,
            ..Self::new(capabilities)
        }
    }

    pub fn snapshot(&self) -> HeadlessSessionState {
        self.state.lock().clone()
    }
}

impl Default for HeadlessSessionHost {
    fn default() -> Self {
        Self::new(PlatformCapabilities::new(34))
    }
}

#[async_trait]
impl MediaSessionHost for HeadlessSessionHost {
    async fn connect(&self) -> Result<()> {
        if self.refuse_connection {
            return Err(BridgeError::ConnectionFailed(
                "Unable to bind to the headless session service".to_string(),
            ));
        }
        let mut state = self.state.lock();
        state.connected = true;
        state.released = false;
        info!(api_level = self.capabilities.api_level, "Headless session connected");
        Ok(())
    }

    fn capabilities(&self) -> PlatformCapabilities {
        self.capabilities
    }

    async fn set_active(&self, active: bool) -> Result<()> {
        let mut state = self.state.lock();
        if !active && !state.active {
            state.redundant_deactivations += 1;
        }
        state.active = active;
        debug!(active, "Session activation changed");
        Ok(())
    }

    async fn set_playback_state(&self, playback: PlatformPlaybackState) -> Result<()> {
        debug!(state = ?playback.state, actions = playback.actions, "Playback state published");
        self.state.lock().playback_state = Some(playback);
        Ok(())
    }

    async fn set_transport_modes(&self, modes: TransportModes) -> Result<()> {
        self.state.lock().transport_modes = modes;
        Ok(())
    }

    async fn set_metadata(&self, metadata: Option<SessionMetadata>) -> Result<()> {
        self.state.lock().metadata = metadata;
        Ok(())
    }

    async fn set_queue(&self, queue: Vec<QueueEntry>) -> Result<()> {
        debug!(len = queue.len(), "Queue replaced");
        self.state.lock().queue = queue;
        Ok(())
    }

    async fn set_playback_to_local(&self) -> Result<()> {
        self.state.lock().volume = Some(VolumeRouting::Local);
        Ok(())
    }

    async fn set_playback_to_remote(&self, volume: RemoteVolume) -> Result<()> {
        self.state.lock().volume = Some(VolumeRouting::Remote(volume));
        Ok(())
    }

    async fn set_remote_volume(&self, current_volume: i32) -> Result<()> {
        let mut state = self.state.lock();
        match state.volume.as_mut() {
            Some(VolumeRouting::Remote(remote)) => {
                remote.current_volume = current_volume;
                Ok(())
            }
            _ => Err(BridgeError::OperationFailed(
                "No remote volume provider installed".to_string(),
            )),
        }
    }

    async fn set_session_activity(&self, activity: Option<String>) -> Result<()> {
        self.state.lock().session_activity = activity;
        Ok(())
    }

    async fn release(&self) -> Result<()> {
        let mut state = self.state.lock();
        state.active = false;
        state.connected = false;
        state.released = true;
        info!("Headless session released");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unreachable_host_fails_to_connect() {
        let host = HeadlessSessionHost::unreachable(PlatformCapabilities::new(30));
        let err = host.connect().await.unwrap_err();
        assert!(matches!(err, BridgeError::ConnectionFailed(_)));
        assert!(!host.snapshot().connected);
    }

    #[tokio::test]
    async fn test_remote_volume_requires_provider() {
        let host = HeadlessSessionHost::default();
        host.connect().await.unwrap();
        assert!(host.set_remote_volume(3).await.is_err());

        host.set_playback_to_remote(RemoteVolume {
            control: bridge_traits::session::VolumeControl::Absolute,
            max_volume: 10,
            current_volume: 5,
        })
        .await
        .unwrap();
        host.set_remote_volume(3).await.unwrap();

        match host.snapshot().volume {
            Some(VolumeRouting::Remote(remote)) => assert_eq!(remote.current_volume, 3),
            other => panic!("unexpected routing: {other:?}"),
        }
    }
}
