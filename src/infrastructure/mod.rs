//! Infrastructure layer - Technical implementations
//!
//! This layer contains:
//! - Black-box adapters (speech program, timed output engine, local session)
//! - Prometheus metrics

pub mod playback;
pub mod session;
pub mod speech;
pub mod telemetry;

pub use playback::{TimedOutputEngine, WavClipPlayer};
pub use session::LocalAudioSession;
pub use speech::CommandSynthesizer;
