//! Focus arbiter - tracks whether the shared output device is ceded

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Audio focus notification from the OS arbitration service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FocusSignal {
    /// Another process took the output device
    Lost,
    /// The other process released the output device
    Regained,
}

/// What the coordinator must do in response to a focus signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusDecision {
    /// Pause the sequencer
    Pause,
    /// Reactivate the output session, then resume the sequencer
    Reacquire,
    /// Nothing changed
    Ignore,
}

/// Focus arbiter
#[derive(Debug, Default)]
pub struct FocusArbiter {
    /// Device ceded to another process
    ceded: bool,
    /// Focus came back but the session has not been reactivated yet
    reacquire_pending: bool,
}

impl FocusArbiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Device currently ceded to another process
    pub fn is_ceded(&self) -> bool {
        self.ceded
    }

    /// Whether phases may be started (not ceded and not awaiting reactivation)
    pub fn allows_playback(&self) -> bool {
        !self.ceded && !self.reacquire_pending
    }

    /// Apply a focus signal. Repeated identical signals are no-ops, except
    /// that `Regained` keeps asking for reactivation until one succeeds.
    pub fn on_signal(&mut self, signal: FocusSignal) -> FocusDecision {
        match signal {
            FocusSignal::Lost => {
                if self.ceded {
                    debug!("Focus already ceded");
                    return FocusDecision::Ignore;
                }
                info!("Audio focus lost to another process");
                self.ceded = true;
                self.reacquire_pending = false;
                FocusDecision::Pause
            }
            FocusSignal::Regained => {
                if !self.ceded && !self.reacquire_pending {
                    debug!("Focus already held");
                    return FocusDecision::Ignore;
                }
                info!("Audio focus regained");
                self.ceded = false;
                self.reacquire_pending = true;
                FocusDecision::Reacquire
            }
        }
    }

    /// Session reactivation after `Reacquire` succeeded
    pub fn reactivated(&mut self) {
        self.reacquire_pending = false;
    }
}
