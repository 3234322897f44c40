//! Playback sequencer - drives the head-of-queue announcement through its phases
//!
//! The sequencer is a pure state machine. Every input (enqueue, completion,
//! focus change, stop request) returns the list of [`SequencerAction`]s the
//! coordinator must carry out; it never touches a black box itself.

use crate::domain::announcement::{AnnouncementOrder, AnnouncementQueue, AnnouncementRequest};
use crate::domain::ports::{Completion, PhaseOutcome};
use crate::domain::shared::{ClipRef, PhaseToken};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Sequencer state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SequencerState {
    /// Nothing in flight
    Idle,
    /// Waiting for the synthesizer to finish the phrase
    Speaking,
    /// Fixed settle delay between speech and clip
    WaitingToPlay,
    /// Waiting for the clip to finish
    Playing,
    /// Output device ceded to another process
    Paused,
}

/// Work the coordinator must perform on behalf of the sequencer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SequencerAction {
    /// Submit the phrase to the synthesizer
    Speak {
        token: PhaseToken,
        id: Uuid,
        text: String,
    },
    /// Start the settle delay timer
    StartSettleTimer { token: PhaseToken },
    /// Submit the clip to the player
    PlayClip {
        token: PhaseToken,
        id: Uuid,
        clip: ClipRef,
    },
    /// Halt the clip attached to the output
    StopClip,
    /// Run the output session stop/deactivate/reactivate cycle
    RecoverSession,
    /// Announcement finished both phases
    Completed { id: Uuid },
    /// Announcement discarded
    Dropped { id: Uuid, reason: String },
}

/// Playback sequencer
#[derive(Debug)]
pub struct PlaybackSequencer {
    /// Pending requests
    queue: AnnouncementQueue,
    /// Current state
    state: SequencerState,
    /// Request taken off the queue and being processed
    current: Option<AnnouncementRequest>,
    /// State to return to after a pause
    paused_from: Option<SequencerState>,
    /// Token of the phase whose completion is awaited
    active_token: Option<PhaseToken>,
    /// Last token handed out
    last_token: PhaseToken,
}

impl PlaybackSequencer {
    /// Create idle sequencer with an empty queue
    pub fn new() -> Self {
        Self {
            queue: AnnouncementQueue::new(),
            state: SequencerState::Idle,
            current: None,
            paused_from: None,
            active_token: None,
            last_token: PhaseToken::new(0),
        }
    }

    pub fn state(&self) -> SequencerState {
        self.state
    }

    /// Number of requests still waiting (excludes the one in flight)
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Request currently being processed
    pub fn current(&self) -> Option<&AnnouncementRequest> {
        self.current.as_ref()
    }

    /// Token of the phase currently awaited
    pub fn active_token(&self) -> Option<PhaseToken> {
        self.active_token
    }

    /// State the sequencer will resume into, while paused
    pub fn paused_from(&self) -> Option<SequencerState> {
        self.paused_from
    }

    /// Append a request; starts processing when idle
    pub fn enqueue(&mut self, request: AnnouncementRequest) -> Vec<SequencerAction> {
        debug!(
            "Queued announcement {} (clip: {}, phrase: {:?})",
            request.id(),
            request.clip(),
            request.phrase()
        );
        self.queue.enqueue(request);

        if self.state == SequencerState::Idle {
            self.advance()
        } else {
            Vec::new()
        }
    }

    /// Consume a completion signal from a black box or the settle timer
    pub fn on_completion(&mut self, completion: Completion) -> Vec<SequencerAction> {
        if self.active_token != Some(completion.token) {
            debug!(
                "Ignoring stale completion {} ({:?}) in state {:?}",
                completion.token, completion.outcome, self.state
            );
            return Vec::new();
        }

        match (self.state, completion.outcome) {
            (SequencerState::Speaking, outcome @ PhaseOutcome::SpeechFinished)
            | (SequencerState::Speaking, outcome @ PhaseOutcome::SpeechCancelled) => {
                if outcome == PhaseOutcome::SpeechCancelled {
                    info!("Speech synthesis cancelled, continuing announcement");
                } else {
                    debug!("Speech synthesis finished");
                }
                self.after_speech()
            }
            (SequencerState::WaitingToPlay, PhaseOutcome::SettleElapsed) => self.enter_playing(),
            (SequencerState::Playing, PhaseOutcome::ClipFinished) => {
                debug!("Clip playback finished");
                self.after_clip()
            }
            (SequencerState::Playing, PhaseOutcome::ClipFailed(reason)) => {
                self.fail_current(reason)
            }
            (state, outcome) => {
                warn!("Unexpected completion {:?} in state {:?}", outcome, state);
                Vec::new()
            }
        }
    }

    /// Enter `Paused`, abandoning the in-flight phase.
    ///
    /// Returns false if already paused. The abandoned black-box call keeps
    /// running; its completion no longer matches and is ignored.
    pub fn pause(&mut self) -> bool {
        if self.state == SequencerState::Paused {
            return false;
        }

        info!("Pausing sequencer (was {:?})", self.state);
        self.paused_from = Some(self.state);
        self.state = SequencerState::Paused;
        self.active_token = None;
        true
    }

    /// Leave `Paused`, restarting the interrupted phase from scratch
    pub fn resume(&mut self) -> Vec<SequencerAction> {
        if self.state != SequencerState::Paused {
            return Vec::new();
        }

        let previous = self.paused_from.take().unwrap_or(SequencerState::Idle);
        info!("Resuming sequencer into {:?}", previous);

        match previous {
            SequencerState::Speaking => self.enter_speaking(),
            SequencerState::WaitingToPlay => self.enter_waiting(),
            SequencerState::Playing => self.enter_playing(),
            SequencerState::Idle | SequencerState::Paused => {
                self.state = SequencerState::Idle;
                self.advance()
            }
        }
    }

    /// Halt the in-flight clip; the announcement counts as played.
    ///
    /// Only the playback phase can be stopped, the queue is left untouched.
    pub fn stop_current(&mut self) -> Vec<SequencerAction> {
        if self.state != SequencerState::Playing {
            debug!("Stop requested in state {:?}, nothing to halt", self.state);
            return Vec::new();
        }

        info!("Stopping current clip");
        let mut actions = vec![SequencerAction::StopClip];
        actions.extend(self.after_clip());
        actions
    }

    /// Take the next request off the queue, or go idle
    fn advance(&mut self) -> Vec<SequencerAction> {
        self.current = None;
        self.active_token = None;

        if self.queue.is_empty() {
            debug!("Announcement queue drained");
            self.state = SequencerState::Idle;
            return Vec::new();
        }

        let request = match self.queue.dequeue_head() {
            Ok(request) => request,
            Err(e) => {
                debug_assert!(false, "dequeue on non-empty queue failed: {}", e);
                error!("Announcement queue invariant violated: {}", e);
                self.state = SequencerState::Idle;
                return Vec::new();
            }
        };

        info!(
            "Starting announcement {} ({} queued behind it)",
            request.id(),
            self.queue.len()
        );
        let order = request.order();
        let has_phrase = request.has_phrase();
        self.current = Some(request);

        match order {
            AnnouncementOrder::SpeakThenPlay if has_phrase => self.enter_speaking(),
            AnnouncementOrder::SpeakThenPlay => {
                info!("Empty phrase, skipping speech");
                self.enter_waiting()
            }
            AnnouncementOrder::PlayThenSpeak => self.enter_playing(),
        }
    }

    fn issue_token(&mut self) -> PhaseToken {
        self.last_token = self.last_token.next();
        self.active_token = Some(self.last_token);
        self.last_token
    }

    fn enter_speaking(&mut self) -> Vec<SequencerAction> {
        let Some((id, text)) = self
            .current
            .as_ref()
            .map(|r| (r.id(), r.phrase().to_string()))
        else {
            return self.advance();
        };

        let token = self.issue_token();
        self.state = SequencerState::Speaking;
        vec![SequencerAction::Speak { token, id, text }]
    }

    fn enter_waiting(&mut self) -> Vec<SequencerAction> {
        if self.current.is_none() {
            return self.advance();
        }

        let token = self.issue_token();
        self.state = SequencerState::WaitingToPlay;
        vec![SequencerAction::StartSettleTimer { token }]
    }

    fn enter_playing(&mut self) -> Vec<SequencerAction> {
        let Some((id, clip)) = self.current.as_ref().map(|r| (r.id(), r.clip().clone())) else {
            return self.advance();
        };

        let token = self.issue_token();
        self.state = SequencerState::Playing;
        vec![SequencerAction::PlayClip { token, id, clip }]
    }

    fn after_speech(&mut self) -> Vec<SequencerAction> {
        match self.current.as_ref().map(|r| r.order()) {
            Some(AnnouncementOrder::SpeakThenPlay) => self.enter_waiting(),
            Some(AnnouncementOrder::PlayThenSpeak) => self.finish_current(),
            None => self.advance(),
        }
    }

    fn after_clip(&mut self) -> Vec<SequencerAction> {
        let speak_next = self
            .current
            .as_ref()
            .map(|r| r.order() == AnnouncementOrder::PlayThenSpeak && r.has_phrase())
            .unwrap_or(false);

        if speak_next {
            self.enter_speaking()
        } else {
            self.finish_current()
        }
    }

    fn finish_current(&mut self) -> Vec<SequencerAction> {
        let mut actions = Vec::new();
        if let Some(request) = self.current.take() {
            info!("Announcement {} completed", request.id());
            actions.push(SequencerAction::Completed { id: request.id() });
        }
        actions.extend(self.advance());
        actions
    }

    /// A failed clip drops its announcement and triggers session recovery
    fn fail_current(&mut self, reason: String) -> Vec<SequencerAction> {
        let mut actions = Vec::new();
        if let Some(request) = self.current.take() {
            warn!(
                "Dropping announcement {} (clip {}): {}",
                request.id(),
                request.clip(),
                reason
            );
            actions.push(SequencerAction::Dropped {
                id: request.id(),
                reason,
            });
        }
        actions.push(SequencerAction::RecoverSession);
        actions.extend(self.advance());
        actions
    }
}

impl Default for PlaybackSequencer {
    fn default() -> Self {
        Self::new()
    }
}
