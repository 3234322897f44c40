//! Ports to the black boxes the coordinator drives
//!
//! Speech synthesis and clip playback are fire-and-forget submissions: the
//! implementation starts work on its own task and later reports exactly one
//! [`Completion`] through the [`CompletionSink`] it was handed. The sink
//! posts onto the coordinator's event queue, so completions are consumed
//! serially alongside every other event.

use crate::domain::shared::{ClipRef, PhaseToken, Result, VoiceId};
use std::fmt;
use std::sync::Arc;

/// How a submitted phase ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhaseOutcome {
    /// Synthesizer finished speaking
    SpeechFinished,
    /// Synthesizer gave up on the utterance; treated like a finish
    SpeechCancelled,
    /// Settle delay between speech and clip elapsed
    SettleElapsed,
    /// Clip played to the end
    ClipFinished,
    /// Clip could not be played
    ClipFailed(String),
}

/// Completion signal for one issued phase
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub token: PhaseToken,
    pub outcome: PhaseOutcome,
}

impl Completion {
    pub fn new(token: PhaseToken, outcome: PhaseOutcome) -> Self {
        Self { token, outcome }
    }
}

/// Delivers completions back to the coordinator
#[derive(Clone)]
pub struct CompletionSink {
    deliver: Arc<dyn Fn(Completion) + Send + Sync>,
}

impl CompletionSink {
    pub fn new<F>(deliver: F) -> Self
    where
        F: Fn(Completion) + Send + Sync + 'static,
    {
        Self {
            deliver: Arc::new(deliver),
        }
    }

    /// Report a completion
    pub fn notify(&self, token: PhaseToken, outcome: PhaseOutcome) {
        (self.deliver)(Completion::new(token, outcome));
    }
}

impl fmt::Debug for CompletionSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionSink").finish_non_exhaustive()
    }
}

/// Text-to-speech black box
pub trait SpeechSynthesizer: Send + Sync {
    /// Start speaking `text`; report `SpeechFinished` or `SpeechCancelled`.
    ///
    /// An `Err` means nothing was started and no completion will follow.
    fn speak(&self, text: &str, voice: &VoiceId, token: PhaseToken, sink: CompletionSink)
        -> Result<()>;
}

/// Clip decode/output black box
pub trait ClipPlayer: Send + Sync {
    /// Start playing `clip`; report `ClipFinished` or `ClipFailed`.
    ///
    /// An `Err` (e.g. resource not found) means nothing was started and no
    /// completion will follow.
    fn play_clip(&self, clip: &ClipRef, token: PhaseToken, sink: CompletionSink) -> Result<()>;

    /// Halt the clip currently attached to the output, if any
    fn stop(&self);
}
