//! Shared kernel - Common types used across the announcer

pub mod error;
pub mod events;
pub mod result;
pub mod value_objects;

pub use error::AnnouncerError;
pub use events::AnnouncementEvent;
pub use result::Result;
pub use value_objects::*;
