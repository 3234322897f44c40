//! Announcements - paired (clip, phrase) requests and their FIFO queue

pub mod queue;
pub mod request;

pub use queue::AnnouncementQueue;
pub use request::{AnnouncementOrder, AnnouncementRequest};
