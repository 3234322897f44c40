//! Announcement lifecycle events published to observers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::value_objects::ClipRef;

/// Announcement lifecycle event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnnouncementEvent {
    /// Request accepted into the queue
    Queued {
        id: Uuid,
        queue_depth: usize,
        timestamp: DateTime<Utc>,
    },
    /// Phrase submitted to the synthesizer
    Speaking {
        id: Uuid,
        phrase: String,
        timestamp: DateTime<Utc>,
    },
    /// Clip submitted to the output engine
    Playing {
        id: Uuid,
        clip: ClipRef,
        timestamp: DateTime<Utc>,
    },
    /// Both phases done
    Completed { id: Uuid, timestamp: DateTime<Utc> },
    /// Request discarded without finishing
    Dropped {
        id: Uuid,
        reason: String,
        timestamp: DateTime<Utc>,
    },
    /// Output device ceded to another process
    Paused { timestamp: DateTime<Utc> },
    /// Output device reacquired, sequencing resumed
    Resumed { timestamp: DateTime<Utc> },
}

impl AnnouncementEvent {
    /// Returns the event type name
    pub fn event_type(&self) -> &'static str {
        match self {
            AnnouncementEvent::Queued { .. } => "queued",
            AnnouncementEvent::Speaking { .. } => "speaking",
            AnnouncementEvent::Playing { .. } => "playing",
            AnnouncementEvent::Completed { .. } => "completed",
            AnnouncementEvent::Dropped { .. } => "dropped",
            AnnouncementEvent::Paused { .. } => "paused",
            AnnouncementEvent::Resumed { .. } => "resumed",
        }
    }

    /// Request the event refers to, if any
    pub fn request_id(&self) -> Option<Uuid> {
        match self {
            AnnouncementEvent::Queued { id, .. }
            | AnnouncementEvent::Speaking { id, .. }
            | AnnouncementEvent::Playing { id, .. }
            | AnnouncementEvent::Completed { id, .. }
            | AnnouncementEvent::Dropped { id, .. } => Some(*id),
            AnnouncementEvent::Paused { .. } | AnnouncementEvent::Resumed { .. } => None,
        }
    }

    /// Returns when the event occurred
    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            AnnouncementEvent::Queued { timestamp, .. }
            | AnnouncementEvent::Speaking { timestamp, .. }
            | AnnouncementEvent::Playing { timestamp, .. }
            | AnnouncementEvent::Completed { timestamp, .. }
            | AnnouncementEvent::Dropped { timestamp, .. }
            | AnnouncementEvent::Paused { timestamp }
            | AnnouncementEvent::Resumed { timestamp } => *timestamp,
        }
    }
}
