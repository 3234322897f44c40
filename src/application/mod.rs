//! Application layer - the announcement coordinator
//!
//! The coordinator owns the sequencer, the focus arbiter and the output
//! session manager, and runs them on a single event loop. Callers and
//! black boxes talk to it only through messages.

pub mod coordinator;
pub mod events;

pub use coordinator::{
    AnnouncementCoordinator, CoordinatorEvent, CoordinatorHandle, CoordinatorSettings,
    CoordinatorStatus,
};
pub use events::EventBroadcaster;
