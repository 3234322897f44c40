//! Clip output: a timed output engine and the WAV clip player on top of it

use crate::domain::audio::ClipLibrary;
use crate::domain::ports::{ClipPlayer, CompletionSink, PhaseOutcome};
use crate::domain::session::PlaybackEngine;
use crate::domain::shared::{ClipRef, PhaseToken, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info};

/// Graph currently attached to the output
struct AttachedGraph {
    token: PhaseToken,
    task: JoinHandle<()>,
}

/// Output engine that holds the device for the length of each clip.
///
/// At most one graph is attached; attaching another detaches the first
/// without reporting it.
#[derive(Default)]
pub struct TimedOutputEngine {
    graph: Mutex<Option<AttachedGraph>>,
}

impl TimedOutputEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a graph that runs for `duration`, then reports `ClipFinished`
    pub fn attach(self: &Arc<Self>, token: PhaseToken, duration: Duration, sink: CompletionSink) {
        let mut graph = self.graph();
        if let Some(previous) = graph.take() {
            debug!("Detaching graph {} for {}", previous.token, token);
            previous.task.abort();
        }

        let engine = Arc::downgrade(self);
        let task = tokio::spawn(async move {
            sleep(duration).await;
            if let Some(engine) = engine.upgrade() {
                engine.release(token);
            }
            sink.notify(token, PhaseOutcome::ClipFinished);
        });

        *graph = Some(AttachedGraph { token, task });
    }

    /// Detach the current graph without reporting it. Returns whether one
    /// was attached.
    pub fn detach(&self) -> bool {
        match self.graph().take() {
            Some(graph) => {
                graph.task.abort();
                true
            }
            None => false,
        }
    }

    pub fn is_attached(&self) -> bool {
        self.graph()
            .as_ref()
            .map(|graph| !graph.task.is_finished())
            .unwrap_or(false)
    }

    fn release(&self, token: PhaseToken) {
        let mut graph = self.graph();
        if graph.as_ref().map(|g| g.token) == Some(token) {
            *graph = None;
        }
    }

    fn graph(&self) -> MutexGuard<'_, Option<AttachedGraph>> {
        self.graph.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl PlaybackEngine for TimedOutputEngine {
    async fn stop_all(&self) {
        if self.detach() {
            debug!("Playback graph stopped");
        }
    }

    async fn is_running(&self) -> bool {
        self.is_attached()
    }

    async fn force_stop(&self) {
        self.detach();
    }
}

/// Plays WAV clips from a [`ClipLibrary`] through a [`TimedOutputEngine`]
pub struct WavClipPlayer {
    library: Arc<ClipLibrary>,
    engine: Arc<TimedOutputEngine>,
}

impl WavClipPlayer {
    pub fn new(library: Arc<ClipLibrary>, engine: Arc<TimedOutputEngine>) -> Self {
        Self { library, engine }
    }

    pub fn library(&self) -> &Arc<ClipLibrary> {
        &self.library
    }
}

impl ClipPlayer for WavClipPlayer {
    fn play_clip(&self, clip: &ClipRef, token: PhaseToken, sink: CompletionSink) -> Result<()> {
        let wav = self.library.load(clip)?;
        let duration = wav.duration();

        info!("Playing clip {} ({:?})", clip, duration);
        self.engine.attach(token, duration, sink);
        Ok(())
    }

    fn stop(&self) {
        if self.engine.detach() {
            info!("Clip playback stopped");
        }
    }
}
