//! Domain layer - announcement sequencing rules
//!
//! This layer contains:
//! - Announcement requests and their FIFO queue
//! - The playback sequencer state machine
//! - The focus arbiter and output session manager
//! - Ports to the speech, playback and audio-session black boxes
//! - Clip resolution and WAV decoding

pub mod announcement;
pub mod audio;
pub mod focus;
pub mod ports;
pub mod sequencer;
pub mod session;
pub mod shared;

// Re-export commonly used types
pub use shared::{AnnouncerError, Result};
