//! Configuration management

use crate::domain::session::{
    RecoveryPolicy, SessionCategory, SessionConfiguration, SessionMode, SessionOptions,
};
use crate::domain::shared::VoiceId;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable prefix, e.g. `ANNOUNCER_COORDINATOR__SETTLE_DELAY_MS`
pub const ENV_PREFIX: &str = "ANNOUNCER";

/// Default configuration file, read when present
pub const DEFAULT_CONFIG_FILE: &str = "announcer.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub coordinator: CoordinatorConfig,
    pub speech: SpeechConfig,
    pub audio: AudioConfig,
    pub session: SessionConfig,
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Pause between end of speech and start of the clip
    pub settle_delay_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// External text-to-speech program
    pub program: String,
    /// Fixed voice passed to every utterance
    pub voice: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Directory clips are resolved in
    pub clip_dir: PathBuf,
    /// Clip file extension, without the dot
    pub extension: String,
    /// Decode every clip at startup
    pub preload: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub category: SessionCategory,
    pub mode: SessionMode,
    pub duck_others: bool,
    pub mix_with_others: bool,
    /// Upper bound on waiting for the engine to stop during recovery
    pub engine_stop_timeout_ms: u64,
    pub engine_poll_interval_ms: u64,
    /// Pause before deactivating during recovery
    pub recovery_settle_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Default tracing filter directive, overridden by RUST_LOG
    pub log_filter: String,
    /// Prometheus exporter listen address; disabled when unset
    pub metrics_listen: Option<SocketAddr>,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: 2000,
        }
    }
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            program: "espeak".to_string(),
            voice: VoiceId::default().as_str().to_string(),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            clip_dir: PathBuf::from("sounds"),
            extension: "wav".to_string(),
            preload: false,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        let policy = RecoveryPolicy::default();
        Self {
            category: SessionCategory::Playback,
            mode: SessionMode::Default,
            duck_others: true,
            mix_with_others: false,
            engine_stop_timeout_ms: policy.stop_timeout.as_millis() as u64,
            engine_poll_interval_ms: policy.poll_interval.as_millis() as u64,
            recovery_settle_ms: policy.settle_delay.as_millis() as u64,
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_filter: "info".to_string(),
            metrics_listen: None,
        }
    }
}

impl Config {
    /// Load configuration from an optional TOML file layered under
    /// `ANNOUNCER_*` environment variables.
    ///
    /// An explicit path must exist; the default file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let file = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        config::Config::builder()
            .add_source(file)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.coordinator.settle_delay_ms)
    }

    pub fn voice(&self) -> VoiceId {
        VoiceId::new(self.speech.voice.clone())
    }

    /// Primary session configuration
    pub fn session_configuration(&self) -> SessionConfiguration {
        SessionConfiguration {
            category: self.session.category,
            mode: self.session.mode,
            options: SessionOptions {
                duck_others: self.session.duck_others,
                mix_with_others: self.session.mix_with_others,
            },
        }
    }

    pub fn recovery_policy(&self) -> RecoveryPolicy {
        RecoveryPolicy {
            stop_timeout: Duration::from_millis(self.session.engine_stop_timeout_ms),
            poll_interval: Duration::from_millis(self.session.engine_poll_interval_ms.max(1)),
            settle_delay: Duration::from_millis(self.session.recovery_settle_ms),
        }
    }
}
