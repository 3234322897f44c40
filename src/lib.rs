//! Announcer - sequential media announcement coordinator
//!
//! Requests pair a spoken phrase with an audio clip. They are played strictly
//! one at a time, in arrival order, while sharing the output device with
//! other processes: audio focus loss pauses the sequence, and playback
//! failures trigger an output session recovery without blocking the queue.

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod interface;

// Re-export commonly used types
pub use application::{AnnouncementCoordinator, CoordinatorHandle, CoordinatorSettings};
pub use domain::shared::error::AnnouncerError;
pub use domain::shared::result::Result;
