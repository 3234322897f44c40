/// Announcement requests: one audio clip paired with one spoken phrase
use crate::domain::shared::ClipRef;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Order in which the two phases of an announcement run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnouncementOrder {
    /// Speak the phrase, wait for the settle delay, then play the clip
    #[default]
    SpeakThenPlay,
    /// Play the clip, then speak the phrase once the clip completes
    PlayThenSpeak,
}

/// Announcement request
///
/// Immutable once enqueued; the clip and phrase always travel together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnouncementRequest {
    id: Uuid,
    clip: ClipRef,
    phrase: String,
    order: AnnouncementOrder,
    created_at: DateTime<Utc>,
}

impl AnnouncementRequest {
    /// Create new announcement request (speak, then play)
    pub fn new(clip: impl Into<ClipRef>, phrase: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            clip: clip.into(),
            phrase: phrase.into(),
            order: AnnouncementOrder::default(),
            created_at: Utc::now(),
        }
    }

    /// Set phase order
    pub fn with_order(mut self, order: AnnouncementOrder) -> Self {
        self.order = order;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn clip(&self) -> &ClipRef {
        &self.clip
    }

    pub fn phrase(&self) -> &str {
        &self.phrase
    }

    pub fn order(&self) -> AnnouncementOrder {
        self.order
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Whether the speech phase has anything to say
    pub fn has_phrase(&self) -> bool {
        !self.phrase.trim().is_empty()
    }
}
