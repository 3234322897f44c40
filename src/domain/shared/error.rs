//! Announcer errors

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnnouncerError {
    #[error("Audio session configuration rejected: {0}")]
    SessionConfig(String),

    #[error("Playback failed: {0}")]
    Playback(String),

    #[error("Audio resource not found: {0}")]
    ResourceNotFound(String),

    #[error("Speech synthesis unavailable: {0}")]
    Synthesis(String),

    #[error("Announcement queue is empty")]
    EmptyQueue,

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Announcement coordinator is not running")]
    CoordinatorStopped,
}

impl AnnouncerError {
    /// Short label used for metrics and event reasons
    pub fn kind(&self) -> &'static str {
        match self {
            AnnouncerError::SessionConfig(_) => "session_config",
            AnnouncerError::Playback(_) => "playback",
            AnnouncerError::ResourceNotFound(_) => "resource_not_found",
            AnnouncerError::Synthesis(_) => "synthesis",
            AnnouncerError::EmptyQueue => "empty_queue",
            AnnouncerError::InvalidOperation(_) => "invalid_operation",
            AnnouncerError::CoordinatorStopped => "coordinator_stopped",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AnnouncerError::ResourceNotFound("chime.wav".to_string());
        assert_eq!(err.to_string(), "Audio resource not found: chime.wav");
        assert_eq!(AnnouncerError::EmptyQueue.to_string(), "Announcement queue is empty");
    }

    #[test]
    fn test_error_kind() {
        assert_eq!(AnnouncerError::Playback("x".into()).kind(), "playback");
        assert_eq!(AnnouncerError::SessionConfig("x".into()).kind(), "session_config");
    }
}
