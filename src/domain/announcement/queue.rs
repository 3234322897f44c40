/// FIFO queue of pending announcement requests
use crate::domain::announcement::request::AnnouncementRequest;
use crate::domain::shared::{AnnouncerError, Result};
use std::collections::VecDeque;

/// Pending announcements in arrival order.
///
/// The request being processed has already been taken out; it is never
/// both queued and in flight.
#[derive(Debug, Default)]
pub struct AnnouncementQueue {
    pending: VecDeque<AnnouncementRequest>,
}

impl AnnouncementQueue {
    /// Create empty queue
    pub fn new() -> Self {
        Self {
            pending: VecDeque::new(),
        }
    }

    /// Append request to the tail
    pub fn enqueue(&mut self, request: AnnouncementRequest) {
        self.pending.push_back(request);
    }

    /// Remove and return the head request
    pub fn dequeue_head(&mut self) -> Result<AnnouncementRequest> {
        self.pending.pop_front().ok_or(AnnouncerError::EmptyQueue)
    }

    /// Peek at the head request
    pub fn head(&self) -> Option<&AnnouncementRequest> {
        self.pending.front()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Iterate pending requests head first
    pub fn iter(&self) -> impl Iterator<Item = &AnnouncementRequest> {
        self.pending.iter()
    }
}
