//! In-process audio session backend

use crate::domain::session::{AudioSessionBackend, SessionConfiguration};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

/// Observable state of the local session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub configuration: Option<SessionConfiguration>,
    pub active: bool,
    /// Deactivations that told peers they may resume
    pub peer_notifications: u32,
}

/// Audio session kept in process memory; accepts every request.
#[derive(Debug, Default)]
pub struct LocalAudioSession {
    state: Mutex<SessionSnapshot>,
}

impl LocalAudioSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state().clone()
    }

    fn state(&self) -> MutexGuard<'_, SessionSnapshot> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl AudioSessionBackend for LocalAudioSession {
    async fn configure(&self, configuration: &SessionConfiguration) -> Result<(), String> {
        debug!("Session category {:?}, mode {:?}", configuration.category, configuration.mode);
        self.state().configuration = Some(*configuration);
        Ok(())
    }

    async fn set_active(&self, active: bool, notify_others: bool) -> Result<(), String> {
        let mut state = self.state();
        state.active = active;
        if !active && notify_others {
            state.peer_notifications += 1;
            info!("Session released, other audio may resume");
        }
        Ok(())
    }
}
