//! Recording fakes for the coordinator's black boxes

#![allow(dead_code)]

use announcer::application::{AnnouncementCoordinator, CoordinatorHandle, CoordinatorSettings};
use announcer::domain::ports::{ClipPlayer, CompletionSink, PhaseOutcome, SpeechSynthesizer};
use announcer::domain::session::{
    AudioSessionBackend, OutputSessionManager, PlaybackEngine, RecoveryPolicy, SessionCategory,
    SessionConfiguration,
};
use announcer::domain::shared::{AnnouncementEvent, AnnouncerError, ClipRef, PhaseToken, Result, VoiceId};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Instant};
use uuid::Uuid;

pub const SPEECH_TIME: Duration = Duration::from_secs(1);
pub const CLIP_TIME: Duration = Duration::from_secs(3);
pub const SETTLE_TIME: Duration = Duration::from_secs(2);

/// Black-box call as seen from outside the coordinator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Speak(String),
    Play(String),
    StopClip,
    Configure(SessionCategory),
    Activate,
    Deactivate { notify_others: bool },
}

/// Interval a black box was busy
#[derive(Debug, Clone)]
pub struct Span {
    pub label: String,
    pub start: Instant,
    pub end: Option<Instant>,
}

#[derive(Default)]
pub struct Recorder {
    calls: Mutex<Vec<Call>>,
    spans: Mutex<Vec<Span>>,
}

impl Recorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Speech and clip submissions only
    pub fn phases(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Speak(_) | Call::Play(_)))
            .collect()
    }

    pub fn session_calls(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| {
                matches!(
                    c,
                    Call::Configure(_) | Call::Activate | Call::Deactivate { .. }
                )
            })
            .collect()
    }

    pub fn spans(&self) -> Vec<Span> {
        self.spans.lock().unwrap().clone()
    }

    fn open_span(&self, label: String) -> usize {
        let mut spans = self.spans.lock().unwrap();
        spans.push(Span {
            label,
            start: Instant::now(),
            end: None,
        });
        spans.len() - 1
    }

    fn close_span(&self, index: usize) {
        let mut spans = self.spans.lock().unwrap();
        if spans[index].end.is_none() {
            spans[index].end = Some(Instant::now());
        }
    }

    /// Every busy interval ends before the next one starts
    pub fn assert_no_overlap(&self) {
        let spans = self.spans();
        for pair in spans.windows(2) {
            let end = pair[0]
                .end
                .unwrap_or_else(|| panic!("{} never finished", pair[0].label));
            assert!(
                end <= pair[1].start,
                "{} overlaps {}",
                pair[0].label,
                pair[1].label
            );
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechBehavior {
    Finish,
    Cancel,
    Reject,
}

pub struct FakeSynthesizer {
    recorder: Arc<Recorder>,
    behavior: SpeechBehavior,
}

impl FakeSynthesizer {
    pub fn new(recorder: Arc<Recorder>, behavior: SpeechBehavior) -> Self {
        Self { recorder, behavior }
    }
}

impl SpeechSynthesizer for FakeSynthesizer {
    fn speak(
        &self,
        text: &str,
        _voice: &VoiceId,
        token: PhaseToken,
        sink: CompletionSink,
    ) -> Result<()> {
        self.recorder.push(Call::Speak(text.to_string()));
        let outcome = match self.behavior {
            SpeechBehavior::Reject => {
                return Err(AnnouncerError::Synthesis("no voices installed".to_string()))
            }
            SpeechBehavior::Finish => PhaseOutcome::SpeechFinished,
            SpeechBehavior::Cancel => PhaseOutcome::SpeechCancelled,
        };

        let span = self.recorder.open_span(format!("speak {:?}", text));
        let recorder = self.recorder.clone();
        tokio::spawn(async move {
            sleep(SPEECH_TIME).await;
            recorder.close_span(span);
            sink.notify(token, outcome);
        });
        Ok(())
    }
}

pub struct FakePlayer {
    recorder: Arc<Recorder>,
    durations: HashMap<String, Duration>,
    failing: HashSet<String>,
    missing: HashSet<String>,
    running: Mutex<Vec<(usize, JoinHandle<()>)>>,
}

impl FakePlayer {
    pub fn new(recorder: Arc<Recorder>) -> Self {
        Self {
            recorder,
            durations: HashMap::new(),
            failing: HashSet::new(),
            missing: HashSet::new(),
            running: Mutex::new(Vec::new()),
        }
    }

    pub fn with_duration(mut self, clip: &str, duration: Duration) -> Self {
        self.durations.insert(clip.to_string(), duration);
        self
    }

    /// Clip starts, then reports a decode failure
    pub fn failing(mut self, clip: &str) -> Self {
        self.failing.insert(clip.to_string());
        self
    }

    /// Clip cannot be resolved at all
    pub fn missing(mut self, clip: &str) -> Self {
        self.missing.insert(clip.to_string());
        self
    }
}

impl ClipPlayer for FakePlayer {
    fn play_clip(&self, clip: &ClipRef, token: PhaseToken, sink: CompletionSink) -> Result<()> {
        let name = clip.name().to_string();
        self.recorder.push(Call::Play(name.clone()));
        if self.missing.contains(&name) {
            return Err(AnnouncerError::ResourceNotFound(name));
        }

        let (duration, outcome) = if self.failing.contains(&name) {
            (
                Duration::from_millis(100),
                PhaseOutcome::ClipFailed("corrupt sample data".to_string()),
            )
        } else {
            (
                self.durations.get(&name).copied().unwrap_or(CLIP_TIME),
                PhaseOutcome::ClipFinished,
            )
        };

        let span = self.recorder.open_span(format!("play {}", name));
        let recorder = self.recorder.clone();
        let task = tokio::spawn(async move {
            sleep(duration).await;
            recorder.close_span(span);
            sink.notify(token, outcome);
        });
        self.running.lock().unwrap().push((span, task));
        Ok(())
    }

    fn stop(&self) {
        self.recorder.push(Call::StopClip);
        for (span, task) in self.running.lock().unwrap().drain(..) {
            task.abort();
            self.recorder.close_span(span);
        }
    }
}

pub struct FakeSession {
    recorder: Arc<Recorder>,
    reject_activation: AtomicBool,
}

impl FakeSession {
    pub fn new(recorder: Arc<Recorder>) -> Self {
        Self {
            recorder,
            reject_activation: AtomicBool::new(false),
        }
    }

    pub fn reject_activation(&self, reject: bool) {
        self.reject_activation.store(reject, Ordering::SeqCst);
    }
}

#[async_trait]
impl AudioSessionBackend for FakeSession {
    async fn configure(&self, configuration: &SessionConfiguration) -> std::result::Result<(), String> {
        self.recorder.push(Call::Configure(configuration.category));
        Ok(())
    }

    async fn set_active(&self, active: bool, notify_others: bool) -> std::result::Result<(), String> {
        if active && self.reject_activation.load(Ordering::SeqCst) {
            return Err("another app holds the device".to_string());
        }
        self.recorder.push(if active {
            Call::Activate
        } else {
            Call::Deactivate { notify_others }
        });
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeEngine {
    stuck: AtomicBool,
    stops: AtomicUsize,
    forced_stops: AtomicUsize,
}

impl FakeEngine {
    /// Engine that never reports stopped until forced
    pub fn stuck() -> Self {
        let engine = Self::default();
        engine.stuck.store(true, Ordering::SeqCst);
        engine
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    pub fn forced_stops(&self) -> usize {
        self.forced_stops.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PlaybackEngine for FakeEngine {
    async fn stop_all(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }

    async fn is_running(&self) -> bool {
        self.stuck.load(Ordering::SeqCst)
    }

    async fn force_stop(&self) {
        self.forced_stops.fetch_add(1, Ordering::SeqCst);
        self.stuck.store(false, Ordering::SeqCst);
    }
}

/// Running coordinator wired to fakes
pub struct Harness {
    pub handle: CoordinatorHandle,
    pub recorder: Arc<Recorder>,
    pub session: Arc<FakeSession>,
    pub engine: Arc<FakeEngine>,
    pub events: broadcast::Receiver<AnnouncementEvent>,
    pub task: JoinHandle<()>,
}

impl Harness {
    pub fn start(speech: SpeechBehavior) -> Self {
        let recorder = Recorder::new();
        let player = FakePlayer::new(recorder.clone());
        Self::start_with(recorder, speech, player, FakeEngine::default())
    }

    pub fn start_with(
        recorder: Arc<Recorder>,
        speech: SpeechBehavior,
        player: FakePlayer,
        engine: FakeEngine,
    ) -> Self {
        let session = Arc::new(FakeSession::new(recorder.clone()));
        let engine = Arc::new(engine);
        let manager = OutputSessionManager::new(
            session.clone(),
            engine.clone(),
            SessionConfiguration::playback(),
            RecoveryPolicy::default(),
        );

        let settings = CoordinatorSettings {
            settle_delay: SETTLE_TIME,
            ..CoordinatorSettings::default()
        };
        let (coordinator, handle) = AnnouncementCoordinator::new(
            manager,
            Arc::new(FakeSynthesizer::new(recorder.clone(), speech)),
            Arc::new(player),
            settings,
        );
        let events = handle.subscribe();
        let task = coordinator.spawn();

        Self {
            handle,
            recorder,
            session,
            engine,
            events,
            task,
        }
    }

    /// Next event matching `pred`, skipping others
    pub async fn wait_for<F>(&mut self, pred: F) -> AnnouncementEvent
    where
        F: Fn(&AnnouncementEvent) -> bool,
    {
        timeout(Duration::from_secs(600), async {
            loop {
                let event = self.events.recv().await.expect("event stream closed");
                if pred(&event) {
                    return event;
                }
            }
        })
        .await
        .expect("timed out waiting for event")
    }

    pub async fn wait_completed(&mut self, id: Uuid) {
        self.wait_for(|e| matches!(e, AnnouncementEvent::Completed { id: done, .. } if *done == id))
            .await;
    }

    pub async fn wait_playing(&mut self, id: Uuid) {
        self.wait_for(|e| matches!(e, AnnouncementEvent::Playing { id: playing, .. } if *playing == id))
            .await;
    }

    pub async fn shutdown(self) {
        self.handle.shutdown().unwrap();
        self.task.await.unwrap();
    }
}

pub fn speak(text: &str) -> Call {
    Call::Speak(text.to_string())
}

pub fn play(clip: &str) -> Call {
    Call::Play(clip.to_string())
}
