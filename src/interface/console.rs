//! Line-oriented console for driving the coordinator

use crate::application::CoordinatorHandle;
use crate::domain::focus::FocusSignal;
use crate::domain::shared::{AnnouncerError, Result};
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, warn};

/// Usage text printed by `help` and after unknown commands
pub const USAGE: &str = "\
commands:
  say <clip> [phrase...]     speak the phrase, then play the clip
  alert <clip> [phrase...]   play the clip, then speak the phrase
  stop                       halt the clip currently playing
  duck                       switch to the ambient session
  focus lost|regained        simulate an audio focus change
  status                     print the coordinator state
  config                     print the effective configuration
  quit                       exit";

/// Parsed console command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Say { clip: String, phrase: String },
    Alert { clip: String, phrase: String },
    Stop,
    Duck,
    Focus(FocusSignal),
    Status,
    Config,
    Help,
    Quit,
}

impl ConsoleCommand {
    /// Parse one input line; blank lines yield `None`
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Ok(None);
        };

        let command = match verb.to_ascii_lowercase().as_str() {
            "say" | "alert" => {
                let clip = words
                    .next()
                    .ok_or_else(|| invalid(format!("{} needs a clip name", verb)))?
                    .to_string();
                let phrase = words.collect::<Vec<_>>().join(" ");
                if verb.eq_ignore_ascii_case("say") {
                    ConsoleCommand::Say { clip, phrase }
                } else {
                    ConsoleCommand::Alert { clip, phrase }
                }
            }
            "stop" => ConsoleCommand::Stop,
            "duck" => ConsoleCommand::Duck,
            "focus" => match words.next().map(|w| w.to_ascii_lowercase()).as_deref() {
                Some("lost") => ConsoleCommand::Focus(FocusSignal::Lost),
                Some("regained") => ConsoleCommand::Focus(FocusSignal::Regained),
                _ => return Err(invalid("focus needs `lost` or `regained`".to_string())),
            },
            "status" => ConsoleCommand::Status,
            "config" => ConsoleCommand::Config,
            "help" | "?" => ConsoleCommand::Help,
            "quit" | "exit" => ConsoleCommand::Quit,
            other => return Err(invalid(format!("unknown command `{}`", other))),
        };

        Ok(Some(command))
    }
}

fn invalid(message: String) -> AnnouncerError {
    AnnouncerError::InvalidOperation(message)
}

/// Console bound to a coordinator
pub struct Console<W> {
    handle: CoordinatorHandle,
    /// Effective configuration, pre-rendered
    config_text: String,
    out: W,
}

impl<W: Write> Console<W> {
    pub fn new(handle: CoordinatorHandle, config_text: String, out: W) -> Self {
        Self {
            handle,
            config_text,
            out,
        }
    }

    /// Read commands until `quit` or end of input
    pub async fn run<R>(&mut self, input: R) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = input.lines();
        while let Some(line) = lines.next_line().await? {
            match ConsoleCommand::parse(&line) {
                Ok(Some(ConsoleCommand::Quit)) => break,
                Ok(Some(command)) => {
                    if let Err(e) = self.execute(command).await {
                        warn!("Command failed: {}", e);
                        writeln!(self.out, "error: {}", e)?;
                        if e == AnnouncerError::CoordinatorStopped {
                            break;
                        }
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    debug!("Rejected input {:?}", line);
                    writeln!(self.out, "{}\n{}", e, USAGE)?;
                }
            }
            self.out.flush()?;
        }
        Ok(())
    }

    /// Run one command against the coordinator
    pub async fn execute(&mut self, command: ConsoleCommand) -> Result<()> {
        match command {
            ConsoleCommand::Say { clip, phrase } => {
                let id = self.handle.enqueue(clip, phrase);
                self.print(&format!("queued {}", id));
            }
            ConsoleCommand::Alert { clip, phrase } => {
                let id = self.handle.alert(clip, phrase);
                self.print(&format!("queued {}", id));
            }
            ConsoleCommand::Stop => self.handle.stop_current()?,
            ConsoleCommand::Duck => self.handle.duck()?,
            ConsoleCommand::Focus(signal) => self.handle.focus(signal)?,
            ConsoleCommand::Status => {
                let status = self.handle.status().await?;
                let rendered = serde_json::to_string(&status)
                    .map_err(|e| AnnouncerError::InvalidOperation(e.to_string()))?;
                self.print(&rendered);
            }
            ConsoleCommand::Config => {
                let text = self.config_text.clone();
                self.print(text.trim_end());
            }
            ConsoleCommand::Help => self.print(USAGE),
            ConsoleCommand::Quit => self.handle.shutdown()?,
        }
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn print(&mut self, text: &str) {
        if let Err(e) = writeln!(self.out, "{}", text) {
            warn!("Console output failed: {}", e);
        }
    }
}
