//! Announcer result type

use super::error::AnnouncerError;

/// Standard result type for announcer operations
pub type Result<T> = std::result::Result<T, AnnouncerError>;
