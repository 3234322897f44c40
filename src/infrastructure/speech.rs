//! Speech synthesis through an external text-to-speech program

use crate::domain::ports::{CompletionSink, PhaseOutcome, SpeechSynthesizer};
use crate::domain::shared::{AnnouncerError, PhaseToken, Result, VoiceId};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

/// Speaks by running `<program> -v <voice> <text>` on a background task.
///
/// A zero exit status reports `SpeechFinished`; anything else (non-zero
/// exit, killed, wait failure) reports `SpeechCancelled`.
pub struct CommandSynthesizer {
    program: String,
}

impl CommandSynthesizer {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl SpeechSynthesizer for CommandSynthesizer {
    fn speak(
        &self,
        text: &str,
        voice: &VoiceId,
        token: PhaseToken,
        sink: CompletionSink,
    ) -> Result<()> {
        if text.trim().is_empty() {
            return Err(AnnouncerError::InvalidOperation(
                "refusing to speak an empty phrase".to_string(),
            ));
        }

        let mut child = Command::new(&self.program)
            .arg("-v")
            .arg(voice.as_str())
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| AnnouncerError::Synthesis(format!("{}: {}", self.program, e)))?;

        debug!("Speaking {:?} with voice {} ({})", text, voice, token);
        let program = self.program.clone();
        tokio::spawn(async move {
            let outcome = match child.wait().await {
                Ok(status) if status.success() => PhaseOutcome::SpeechFinished,
                Ok(status) => {
                    warn!("{} exited with {}", program, status);
                    PhaseOutcome::SpeechCancelled
                }
                Err(e) => {
                    warn!("Failed to wait for {}: {}", program, e);
                    PhaseOutcome::SpeechCancelled
                }
            };
            sink.notify(token, outcome);
        });

        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::domain::ports::Completion;
    use tokio::sync::mpsc;

    fn channel_sink() -> (CompletionSink, mpsc::UnboundedReceiver<Completion>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sink = CompletionSink::new(move |completion| {
            let _ = tx.send(completion);
        });
        (sink, rx)
    }

    #[tokio::test]
    async fn test_successful_program_finishes() {
        let synth = CommandSynthesizer::new("true");
        let (sink, mut rx) = channel_sink();

        synth
            .speak("hello", &VoiceId::default(), PhaseToken::new(1), sink)
            .unwrap();

        let completion = rx.recv().await.unwrap();
        assert_eq!(
            completion,
            Completion::new(PhaseToken::new(1), PhaseOutcome::SpeechFinished)
        );
    }

    #[tokio::test]
    async fn test_failing_program_cancels() {
        let synth = CommandSynthesizer::new("false");
        let (sink, mut rx) = channel_sink();

        synth
            .speak("hello", &VoiceId::default(), PhaseToken::new(2), sink)
            .unwrap();

        let completion = rx.recv().await.unwrap();
        assert_eq!(completion.outcome, PhaseOutcome::SpeechCancelled);
    }

    #[tokio::test]
    async fn test_missing_program_is_rejected() {
        let synth = CommandSynthesizer::new("announcer-no-such-tts-program");
        let (sink, _rx) = channel_sink();

        let result = synth.speak("hello", &VoiceId::default(), PhaseToken::new(3), sink);
        assert!(matches!(result, Err(AnnouncerError::Synthesis(_))));
    }

    #[tokio::test]
    async fn test_empty_phrase_is_rejected() {
        let synth = CommandSynthesizer::new("true");
        let (sink, _rx) = channel_sink();

        let result = synth.speak("  ", &VoiceId::default(), PhaseToken::new(4), sink);
        assert!(matches!(result, Err(AnnouncerError::InvalidOperation(_))));
    }
}
