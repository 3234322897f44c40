//! Announcement coordinator event loop
//!
//! All sequencing runs on one task that drains a single event channel:
//! caller commands, focus signals and black-box completions are all
//! [`CoordinatorEvent`]s, so state transitions never race each other.

use crate::application::events::{EventBroadcaster, DEFAULT_EVENT_CAPACITY};
use crate::domain::announcement::{AnnouncementOrder, AnnouncementRequest};
use crate::domain::focus::{FocusArbiter, FocusDecision, FocusSignal};
use crate::domain::ports::{ClipPlayer, Completion, CompletionSink, PhaseOutcome, SpeechSynthesizer};
use crate::domain::sequencer::{PlaybackSequencer, SequencerAction, SequencerState};
use crate::domain::session::{OutputSessionManager, RecoveryOutcome};
use crate::domain::shared::{AnnouncementEvent, AnnouncerError, ClipRef, Result, VoiceId};
use crate::infrastructure::telemetry;
use chrono::Utc;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Message consumed by the coordinator loop
#[derive(Debug)]
pub enum CoordinatorEvent {
    Enqueue(AnnouncementRequest),
    StopCurrent,
    Duck,
    Focus(FocusSignal),
    /// Completion reported by a black box or the settle timer
    Completed(Completion),
    Status(oneshot::Sender<CoordinatorStatus>),
    Shutdown,
}

/// Coordinator tuning
#[derive(Debug, Clone)]
pub struct CoordinatorSettings {
    /// Voice used for every phrase
    pub voice: VoiceId,
    /// Pause between end of speech and start of the clip
    pub settle_delay: Duration,
    /// Per-subscriber event buffer
    pub event_capacity: usize,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            voice: VoiceId::default(),
            settle_delay: Duration::from_secs(2),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

/// Point-in-time view of the coordinator
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoordinatorStatus {
    pub state: SequencerState,
    /// Requests waiting behind the one in flight
    pub queued: usize,
    /// Request in flight, if any
    pub current: Option<Uuid>,
    pub focus_ceded: bool,
    pub session_active: bool,
}

/// Announcement coordinator
pub struct AnnouncementCoordinator {
    sequencer: PlaybackSequencer,
    arbiter: FocusArbiter,
    session: OutputSessionManager,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    player: Arc<dyn ClipPlayer>,
    settings: CoordinatorSettings,
    events: mpsc::UnboundedReceiver<CoordinatorEvent>,
    /// Weak so that the loop ends once every handle is dropped
    loopback: mpsc::WeakUnboundedSender<CoordinatorEvent>,
    broadcaster: EventBroadcaster,
}

impl AnnouncementCoordinator {
    /// Create a coordinator and the handle used to drive it
    pub fn new(
        session: OutputSessionManager,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        player: Arc<dyn ClipPlayer>,
        settings: CoordinatorSettings,
    ) -> (Self, CoordinatorHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let broadcaster = EventBroadcaster::new(settings.event_capacity);

        let coordinator = Self {
            sequencer: PlaybackSequencer::new(),
            arbiter: FocusArbiter::new(),
            session,
            synthesizer,
            player,
            settings,
            events: rx,
            loopback: tx.downgrade(),
            broadcaster: broadcaster.clone(),
        };
        let handle = CoordinatorHandle { tx, broadcaster };

        (coordinator, handle)
    }

    /// Run the event loop on its own task
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Activate the primary session, then process events until shutdown or
    /// until every handle is dropped.
    pub async fn run(mut self) {
        info!("Announcement coordinator starting");

        if let Err(e) = self.session.activate_primary().await {
            warn!("Continuing without an active audio session: {}", e);
        }

        while let Some(event) = self.events.recv().await {
            if !self.handle_event(event).await {
                break;
            }
            telemetry::set_queue_depth(self.sequencer.queue_len());
        }

        self.player.stop();
        info!("Announcement coordinator stopped");
    }

    /// Returns false when the loop should end
    async fn handle_event(&mut self, event: CoordinatorEvent) -> bool {
        match event {
            CoordinatorEvent::Enqueue(request) => {
                let id = request.id();
                telemetry::record_enqueued();
                let actions = self.sequencer.enqueue(request);
                self.publish(AnnouncementEvent::Queued {
                    id,
                    queue_depth: self.sequencer.queue_len(),
                    timestamp: Utc::now(),
                });
                self.execute(actions).await;
            }
            CoordinatorEvent::Completed(completion) => {
                let actions = self.sequencer.on_completion(completion);
                self.execute(actions).await;
            }
            CoordinatorEvent::StopCurrent => {
                let actions = self.sequencer.stop_current();
                self.execute(actions).await;
            }
            CoordinatorEvent::Duck => {
                if let Err(e) = self.session.duck().await {
                    warn!("Ducking failed: {}", e);
                }
            }
            CoordinatorEvent::Focus(signal) => self.on_focus(signal).await,
            CoordinatorEvent::Status(reply) => {
                let _ = reply.send(self.status());
            }
            CoordinatorEvent::Shutdown => {
                info!("Shutdown requested");
                return false;
            }
        }
        true
    }

    async fn on_focus(&mut self, signal: FocusSignal) {
        match self.arbiter.on_signal(signal) {
            FocusDecision::Pause => {
                telemetry::record_focus_interruption();
                if self.sequencer.pause() {
                    self.publish(AnnouncementEvent::Paused {
                        timestamp: Utc::now(),
                    });
                }
            }
            FocusDecision::Reacquire => match self.session.activate_primary().await {
                Ok(()) => {
                    self.arbiter.reactivated();
                    let actions = self.sequencer.resume();
                    self.publish(AnnouncementEvent::Resumed {
                        timestamp: Utc::now(),
                    });
                    self.execute(actions).await;
                }
                Err(e) => {
                    warn!("Reactivation failed, staying paused until focus returns again: {}", e);
                }
            },
            FocusDecision::Ignore => {}
        }
    }

    /// Carry out sequencer actions in order. Synchronous rejections from a
    /// black box are fed straight back as the matching completion.
    async fn execute(&mut self, actions: Vec<SequencerAction>) {
        let mut pending = VecDeque::from(actions);

        while let Some(action) = pending.pop_front() {
            match action {
                SequencerAction::Speak { token, id, text } => {
                    debug!("Announcement {} speaking {:?} ({})", id, text, token);
                    self.publish(AnnouncementEvent::Speaking {
                        id,
                        phrase: text.clone(),
                        timestamp: Utc::now(),
                    });
                    if let Err(e) = self.synthesizer.speak(
                        &text,
                        &self.settings.voice,
                        token,
                        self.completion_sink(),
                    ) {
                        warn!(kind = e.kind(), "Speech rejected, treating as cancelled: {}", e);
                        pending.extend(self.sequencer.on_completion(Completion::new(
                            token,
                            PhaseOutcome::SpeechCancelled,
                        )));
                    }
                }
                SequencerAction::StartSettleTimer { token } => {
                    let sink = self.completion_sink();
                    let delay = self.settings.settle_delay;
                    tokio::spawn(async move {
                        sleep(delay).await;
                        sink.notify(token, PhaseOutcome::SettleElapsed);
                    });
                }
                SequencerAction::PlayClip { token, id, clip } => {
                    debug!("Announcement {} playing {} ({})", id, clip, token);
                    self.publish(AnnouncementEvent::Playing {
                        id,
                        clip: clip.clone(),
                        timestamp: Utc::now(),
                    });
                    if let Err(e) = self.player.play_clip(&clip, token, self.completion_sink()) {
                        warn!(kind = e.kind(), "Clip {} rejected: {}", clip, e);
                        pending.extend(self.sequencer.on_completion(Completion::new(
                            token,
                            PhaseOutcome::ClipFailed(e.to_string()),
                        )));
                    }
                }
                SequencerAction::StopClip => self.player.stop(),
                SequencerAction::RecoverSession => self.recover_session().await,
                SequencerAction::Completed { id } => {
                    telemetry::record_completed();
                    self.publish(AnnouncementEvent::Completed {
                        id,
                        timestamp: Utc::now(),
                    });
                }
                SequencerAction::Dropped { id, reason } => {
                    telemetry::record_dropped("clip_failed");
                    self.publish(AnnouncementEvent::Dropped {
                        id,
                        reason,
                        timestamp: Utc::now(),
                    });
                }
            }
        }
    }

    async fn recover_session(&mut self) {
        let started = Instant::now();
        let outcome = match self.session.recover_from_error().await {
            Ok(RecoveryOutcome::Clean) => "clean",
            Ok(RecoveryOutcome::ForcedStop) => "forced_stop",
            Err(e) => {
                error!("Audio session recovery failed: {}", e);
                "failed"
            }
        };
        telemetry::record_session_recovery(outcome, started.elapsed());
    }

    fn completion_sink(&self) -> CompletionSink {
        let loopback = self.loopback.clone();
        CompletionSink::new(move |completion| match loopback.upgrade() {
            Some(tx) => {
                let _ = tx.send(CoordinatorEvent::Completed(completion));
            }
            None => debug!("Coordinator gone, dropping completion {}", completion.token),
        })
    }

    fn status(&self) -> CoordinatorStatus {
        CoordinatorStatus {
            state: self.sequencer.state(),
            queued: self.sequencer.queue_len(),
            current: self.sequencer.current().map(|r| r.id()),
            focus_ceded: self.arbiter.is_ceded(),
            session_active: self.session.is_active(),
        }
    }

    fn publish(&self, event: AnnouncementEvent) {
        self.broadcaster.broadcast(event);
    }
}

/// Cloneable handle to a running coordinator
#[derive(Debug, Clone)]
pub struct CoordinatorHandle {
    tx: mpsc::UnboundedSender<CoordinatorEvent>,
    broadcaster: EventBroadcaster,
}

impl CoordinatorHandle {
    /// Queue a phrase followed by a clip. Never fails from the caller's
    /// point of view; the request id is returned for correlation.
    pub fn enqueue(&self, clip: impl Into<ClipRef>, phrase: impl Into<String>) -> Uuid {
        self.enqueue_request(AnnouncementRequest::new(clip, phrase))
    }

    /// Queue a clip followed by a phrase
    pub fn alert(&self, clip: impl Into<ClipRef>, phrase: impl Into<String>) -> Uuid {
        self.enqueue_request(
            AnnouncementRequest::new(clip, phrase).with_order(AnnouncementOrder::PlayThenSpeak),
        )
    }

    pub fn enqueue_request(&self, request: AnnouncementRequest) -> Uuid {
        let id = request.id();
        if self.send(CoordinatorEvent::Enqueue(request)).is_err() {
            warn!("Coordinator stopped, announcement {} discarded", id);
        }
        id
    }

    /// Halt the clip in flight; the queue is left as is
    pub fn stop_current(&self) -> Result<()> {
        self.send(CoordinatorEvent::StopCurrent)
    }

    pub fn duck(&self) -> Result<()> {
        self.send(CoordinatorEvent::Duck)
    }

    /// Deliver an audio focus notification
    pub fn focus(&self, signal: FocusSignal) -> Result<()> {
        self.send(CoordinatorEvent::Focus(signal))
    }

    pub fn focus_lost(&self) -> Result<()> {
        self.focus(FocusSignal::Lost)
    }

    pub fn focus_regained(&self) -> Result<()> {
        self.focus(FocusSignal::Regained)
    }

    pub async fn status(&self) -> Result<CoordinatorStatus> {
        let (reply, rx) = oneshot::channel();
        self.send(CoordinatorEvent::Status(reply))?;
        rx.await.map_err(|_| AnnouncerError::CoordinatorStopped)
    }

    /// Subscribe to announcement events
    pub fn subscribe(&self) -> broadcast::Receiver<AnnouncementEvent> {
        self.broadcaster.subscribe()
    }

    pub fn shutdown(&self) -> Result<()> {
        self.send(CoordinatorEvent::Shutdown)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    fn send(&self, event: CoordinatorEvent) -> Result<()> {
        self.tx
            .send(event)
            .map_err(|_| AnnouncerError::CoordinatorStopped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::session::{
        MockAudioSessionBackend, MockPlaybackEngine, RecoveryPolicy, SessionConfiguration,
    };
    use crate::domain::shared::PhaseToken;
    use std::sync::Mutex;
    use tokio_test::{assert_err, assert_ok};

    /// Finishes every utterance immediately
    #[derive(Default)]
    struct InstantSpeech {
        spoken: Mutex<Vec<String>>,
    }

    impl SpeechSynthesizer for InstantSpeech {
        fn speak(
            &self,
            text: &str,
            _voice: &VoiceId,
            token: PhaseToken,
            sink: CompletionSink,
        ) -> Result<()> {
            self.spoken.lock().unwrap().push(text.to_string());
            sink.notify(token, PhaseOutcome::SpeechFinished);
            Ok(())
        }
    }

    /// Rejects every clip
    struct MissingClips;

    impl ClipPlayer for MissingClips {
        fn play_clip(&self, clip: &ClipRef, _token: PhaseToken, _sink: CompletionSink) -> Result<()> {
            Err(AnnouncerError::ResourceNotFound(clip.to_string()))
        }

        fn stop(&self) {}
    }

    fn session(backend: MockAudioSessionBackend) -> OutputSessionManager {
        let mut engine = MockPlaybackEngine::new();
        engine.expect_stop_all().returning(|| ());
        engine.expect_is_running().returning(|| false);
        engine.expect_force_stop().never();
        OutputSessionManager::new(
            Arc::new(backend),
            Arc::new(engine),
            SessionConfiguration::playback(),
            RecoveryPolicy::default(),
        )
    }

    fn accepting_backend() -> MockAudioSessionBackend {
        let mut backend = MockAudioSessionBackend::new();
        backend.expect_configure().returning(|_| Ok(()));
        backend.expect_set_active().returning(|_, _| Ok(()));
        backend
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_after_start() {
        let (coordinator, handle) = AnnouncementCoordinator::new(
            session(accepting_backend()),
            Arc::new(InstantSpeech::default()),
            Arc::new(MissingClips),
            CoordinatorSettings::default(),
        );
        let task = coordinator.spawn();

        let status = assert_ok!(handle.status().await);
        assert_eq!(status.state, SequencerState::Idle);
        assert_eq!(status.queued, 0);
        assert!(status.current.is_none());
        assert!(!status.focus_ceded);
        assert!(status.session_active);

        assert_ok!(handle.shutdown());
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_handle_fails_after_shutdown() {
        let (coordinator, handle) = AnnouncementCoordinator::new(
            session(accepting_backend()),
            Arc::new(InstantSpeech::default()),
            Arc::new(MissingClips),
            CoordinatorSettings::default(),
        );
        let task = coordinator.spawn();

        assert_ok!(handle.shutdown());
        task.await.unwrap();

        assert!(handle.is_closed());
        let err = assert_err!(handle.status().await);
        assert_eq!(err, AnnouncerError::CoordinatorStopped);
        assert_err!(handle.stop_current());
        // Enqueue still hands back an id
        let _ = handle.enqueue("chime", "late");
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_ends_when_handles_dropped() {
        let (coordinator, handle) = AnnouncementCoordinator::new(
            session(accepting_backend()),
            Arc::new(InstantSpeech::default()),
            Arc::new(MissingClips),
            CoordinatorSettings::default(),
        );
        let task = coordinator.spawn();

        drop(handle);
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_starts_degraded_when_activation_rejected() {
        let mut backend = MockAudioSessionBackend::new();
        backend
            .expect_configure()
            .returning(|_| Err("device busy".to_string()));
        backend.expect_set_active().returning(|_, _| Ok(()));

        let (coordinator, handle) = AnnouncementCoordinator::new(
            session(backend),
            Arc::new(InstantSpeech::default()),
            Arc::new(MissingClips),
            CoordinatorSettings::default(),
        );
        let task = coordinator.spawn();

        let status = assert_ok!(handle.status().await);
        assert!(!status.session_active);
        assert_eq!(status.state, SequencerState::Idle);

        assert_ok!(handle.shutdown());
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_clip_is_dropped_and_session_recovered() {
        let mut backend = MockAudioSessionBackend::new();
        backend.expect_configure().times(1).returning(|_| Ok(()));
        backend
            .expect_set_active()
            .withf(|active, notify| !*active && *notify)
            .times(1)
            .returning(|_, _| Ok(()));
        backend
            .expect_set_active()
            .withf(|active, _| *active)
            .times(2)
            .returning(|_, _| Ok(()));

        let speech = Arc::new(InstantSpeech::default());
        let (coordinator, handle) = AnnouncementCoordinator::new(
            session(backend),
            speech.clone(),
            Arc::new(MissingClips),
            CoordinatorSettings::default(),
        );
        let mut events = handle.subscribe();
        let task = coordinator.spawn();

        let id = handle.enqueue("missing", "hello");

        let dropped = loop {
            match events.recv().await.unwrap() {
                AnnouncementEvent::Dropped { id, reason, .. } => break (id, reason),
                _ => continue,
            }
        };
        assert_eq!(dropped.0, id);
        assert!(dropped.1.contains("missing"));

        let status = assert_ok!(handle.status().await);
        assert_eq!(status.state, SequencerState::Idle);
        assert!(status.session_active);
        assert_eq!(speech.spoken.lock().unwrap().as_slice(), &["hello".to_string()]);

        assert_ok!(handle.shutdown());
        task.await.unwrap();
    }
}
