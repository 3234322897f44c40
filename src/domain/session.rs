//! Output session manager - owns activation of the shared output device
//!
//! Only this manager activates or deactivates the session. Error recovery
//! deactivates with "notify others" so peer apps may resume their own audio,
//! then immediately reactivates to reclaim the device.

use crate::domain::shared::{AnnouncerError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};

/// Session category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionCategory {
    /// Primary playback, audible regardless of other apps
    Playback,
    /// Background presence
    Ambient,
}

/// Session mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    #[default]
    Default,
    SpokenAudio,
}

/// Session options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionOptions {
    /// Lower other apps' volume while active
    pub duck_others: bool,
    /// Play alongside other apps without interrupting them
    pub mix_with_others: bool,
}

/// Category, mode and options applied to the shared device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfiguration {
    pub category: SessionCategory,
    pub mode: SessionMode,
    pub options: SessionOptions,
}

impl SessionConfiguration {
    /// Exclusive playback that ducks other audio
    pub fn playback() -> Self {
        Self {
            category: SessionCategory::Playback,
            mode: SessionMode::Default,
            options: SessionOptions {
                duck_others: true,
                mix_with_others: false,
            },
        }
    }

    /// Background category that still ducks other audio
    pub fn ambient_ducking() -> Self {
        Self {
            category: SessionCategory::Ambient,
            mode: SessionMode::Default,
            options: SessionOptions {
                duck_others: true,
                mix_with_others: false,
            },
        }
    }
}

impl Default for SessionConfiguration {
    fn default() -> Self {
        Self::playback()
    }
}

/// OS audio session black box
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AudioSessionBackend: Send + Sync {
    /// Apply category, mode and options
    async fn configure(&self, configuration: &SessionConfiguration) -> std::result::Result<(), String>;

    /// Activate or deactivate; `notify_others` tells peers they may resume
    async fn set_active(&self, active: bool, notify_others: bool) -> std::result::Result<(), String>;
}

/// Playback graph host, probed while recovering
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PlaybackEngine: Send + Sync {
    /// Ask every attached playback graph to stop
    async fn stop_all(&self);

    /// Whether the engine still reports running
    async fn is_running(&self) -> bool;

    /// Tear down regardless of engine state
    async fn force_stop(&self);
}

/// Timing of the recovery cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoveryPolicy {
    /// Upper bound on waiting for the engine to report stopped
    pub stop_timeout: Duration,
    /// Interval between engine probes
    pub poll_interval: Duration,
    /// Pause between engine halt and deactivation
    pub settle_delay: Duration,
}

impl Default for RecoveryPolicy {
    fn default() -> Self {
        Self {
            stop_timeout: Duration::from_millis(2000),
            poll_interval: Duration::from_millis(100),
            settle_delay: Duration::from_millis(500),
        }
    }
}

/// How the engine halted during recovery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryOutcome {
    /// Engine reported stopped within the timeout
    Clean,
    /// Timeout hit, engine was torn down forcibly
    ForcedStop,
}

/// Output session manager
pub struct OutputSessionManager {
    backend: Arc<dyn AudioSessionBackend>,
    engine: Arc<dyn PlaybackEngine>,
    /// Configuration used for normal announcement playback
    primary: SessionConfiguration,
    policy: RecoveryPolicy,
    active: bool,
    configuration: Option<SessionConfiguration>,
}

impl OutputSessionManager {
    pub fn new(
        backend: Arc<dyn AudioSessionBackend>,
        engine: Arc<dyn PlaybackEngine>,
        primary: SessionConfiguration,
        policy: RecoveryPolicy,
    ) -> Self {
        Self {
            backend,
            engine,
            primary,
            policy,
            active: false,
            configuration: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Configuration last applied to the backend
    pub fn configuration(&self) -> Option<SessionConfiguration> {
        self.configuration
    }

    pub fn primary(&self) -> SessionConfiguration {
        self.primary
    }

    /// Configure and activate the shared device.
    ///
    /// Rejections are logged and returned; nothing is retried here.
    pub async fn activate(&mut self, configuration: SessionConfiguration) -> Result<()> {
        debug!("Configuring audio session: {:?}", configuration);
        self.backend.configure(&configuration).await.map_err(|e| {
            error!("Audio session configuration rejected: {}", e);
            AnnouncerError::SessionConfig(e)
        })?;
        self.configuration = Some(configuration);

        self.backend.set_active(true, false).await.map_err(|e| {
            error!("Audio session activation rejected: {}", e);
            AnnouncerError::SessionConfig(e)
        })?;
        self.active = true;

        info!(
            "Audio session active ({:?}, duck others: {})",
            configuration.category, configuration.options.duck_others
        );
        Ok(())
    }

    /// Activate with the primary playback configuration
    pub async fn activate_primary(&mut self) -> Result<()> {
        self.activate(self.primary).await
    }

    /// Switch to the ambient category, still ducking other audio
    pub async fn duck(&mut self) -> Result<()> {
        info!("Ducking: switching audio session to ambient");
        self.activate(SessionConfiguration::ambient_ducking()).await
    }

    /// Stop playback graphs, wait (bounded) for the engine to halt, then
    /// deactivate with peer notification and reactivate.
    pub async fn recover_from_error(&mut self) -> Result<RecoveryOutcome> {
        info!("Recovering audio session after playback error");
        self.engine.stop_all().await;

        let outcome = match timeout(self.policy.stop_timeout, self.wait_for_engine_stop()).await {
            Ok(()) => RecoveryOutcome::Clean,
            Err(_) => {
                warn!(
                    "Playback engine still running after {:?}, forcing stop",
                    self.policy.stop_timeout
                );
                self.engine.force_stop().await;
                RecoveryOutcome::ForcedStop
            }
        };

        sleep(self.policy.settle_delay).await;

        match self.backend.set_active(false, true).await {
            Ok(()) => {
                self.active = false;
                debug!("Audio session deactivated, peers notified");
            }
            Err(e) => warn!("Audio session deactivation rejected: {}", e),
        }

        self.backend.set_active(true, false).await.map_err(|e| {
            error!("Audio session reactivation rejected: {}", e);
            AnnouncerError::SessionConfig(e)
        })?;
        self.active = true;

        info!("Audio session recovered ({:?})", outcome);
        Ok(outcome)
    }

    async fn wait_for_engine_stop(&self) {
        while self.engine.is_running().await {
            sleep(self.policy.poll_interval).await;
        }
    }
}
