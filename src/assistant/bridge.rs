//! Subprocess bridge to an assistant engine
//!
//! The engine runs as a child process. It writes one JSON event per line on
//! stdout (`{"type": "ON_START_FINISHED"}`) and reads one JSON command per
//! line on stdin (`{"command": "stop_conversation"}`). Engine stderr is
//! passed through so its own logs stay visible.
//!
//! A `say` command is answered with a `say_finished` event once the engine
//! has played the text. [`BridgeSpeaker`] waits for it, so a farewell is
//! heard before the handler moves on to shutting the host down.

use std::collections::VecDeque;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;

use super::AssistantSession;
use crate::events::AssistantEvent;
use crate::speech::Speaker;
use crate::{Error, Result};

/// Environment variable carrying the credentials path to the engine
pub const CREDENTIALS_ENV: &str = "ASSISTANT_CREDENTIALS";

/// Longest wait for the engine to finish speaking one phrase
const SAY_TIMEOUT: Duration = Duration::from_secs(30);

/// Command sent to the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum BridgeCommand {
    /// End the current conversational turn
    StopConversation,
    /// Speak text through the engine's audio output
    Say {
        /// Text to speak
        text: String,
    },
}

/// Shared handle to the engine's stdin
type CommandPipe = Arc<Mutex<ChildStdin>>;

async fn send_command(pipe: &CommandPipe, command: &BridgeCommand) -> Result<()> {
    let mut line = serde_json::to_vec(command)?;
    line.push(b'\n');

    let mut stdin = pipe.lock().await;
    stdin
        .write_all(&line)
        .await
        .map_err(|e| Error::Assistant(format!("failed to send {command:?}: {e}")))?;
    stdin.flush().await?;
    Ok(())
}

/// Engine stdout, with events set aside while a speaker waited
struct EventReader {
    lines: Lines<BufReader<ChildStdout>>,
    held: VecDeque<AssistantEvent>,
}

impl EventReader {
    /// Next held or freshly read event
    async fn next(&mut self) -> Result<Option<AssistantEvent>> {
        if let Some(event) = self.held.pop_front() {
            return Ok(Some(event));
        }
        self.read().await
    }

    /// Read until `say_finished`, holding back everything else
    async fn await_say_finished(&mut self) -> Result<()> {
        loop {
            match self.read().await? {
                Some(AssistantEvent::SayFinished) => return Ok(()),
                Some(event) => self.held.push_back(event),
                None => {
                    return Err(Error::Assistant(
                        "engine closed before finishing speech".to_string(),
                    ));
                }
            }
        }
    }

    async fn read(&mut self) -> Result<Option<AssistantEvent>> {
        while let Some(line) = self.lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }

            match AssistantEvent::parse_line(&line) {
                Ok(event) => {
                    tracing::trace!(event = event.name(), "engine event");
                    return Ok(Some(event));
                }
                Err(e) => {
                    tracing::warn!(error = %e, line = %line, "skipping malformed engine event");
                }
            }
        }
        Ok(None)
    }
}

/// Shared handle to the engine's event stream
type EventPipe = Arc<Mutex<EventReader>>;

/// Session with an engine child process
pub struct BridgeSession {
    child: Child,
    events: EventPipe,
    commands: CommandPipe,
}

impl BridgeSession {
    /// Spawn the engine
    ///
    /// # Errors
    ///
    /// Returns error if the command line is empty or the engine cannot start
    pub fn spawn(argv: &[String], credentials: Option<&Path>) -> Result<Self> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| Error::Config("assistant.command is empty".to_string()))?;

        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        if let Some(path) = credentials {
            command.env(CREDENTIALS_ENV, path);
        }

        let mut child = command
            .spawn()
            .map_err(|e| Error::Assistant(format!("failed to start {program}: {e}")))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::Assistant("engine stdout unavailable".to_string()))?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::Assistant("engine stdin unavailable".to_string()))?;

        tracing::info!(program = %program, pid = ?child.id(), "assistant engine started");

        Ok(Self {
            child,
            events: Arc::new(Mutex::new(EventReader {
                lines: BufReader::new(stdout).lines(),
                held: VecDeque::new(),
            })),
            commands: Arc::new(Mutex::new(stdin)),
        })
    }

    /// A speaker that talks through this engine
    #[must_use]
    pub fn speaker(&self) -> BridgeSpeaker {
        BridgeSpeaker {
            commands: Arc::clone(&self.commands),
            events: Arc::clone(&self.events),
            timeout: SAY_TIMEOUT,
        }
    }
}

#[async_trait]
impl AssistantSession for BridgeSession {
    async fn next_event(&mut self) -> Result<Option<AssistantEvent>> {
        let next = self.events.lock().await.next().await?;
        if next.is_some() {
            return Ok(next);
        }

        let status = self.child.wait().await?;
        tracing::info!(%status, "assistant engine exited");
        Ok(None)
    }

    async fn stop_conversation(&mut self) -> Result<()> {
        send_command(&self.commands, &BridgeCommand::StopConversation).await
    }
}

/// Speaks through the engine's own audio output
///
/// `say` returns once the engine reports the text was played.
#[derive(Clone)]
pub struct BridgeSpeaker {
    commands: CommandPipe,
    events: EventPipe,
    timeout: Duration,
}

impl BridgeSpeaker {
    /// Wait at most `timeout` for each phrase to finish
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl Speaker for BridgeSpeaker {
    async fn say(&self, text: &str) -> Result<()> {
        tracing::debug!(text, "speaking via engine");

        // Hold the event stream from before the command goes out
        let mut events = self.events.lock().await;
        send_command(
            &self.commands,
            &BridgeCommand::Say {
                text: text.to_string(),
            },
        )
        .await?;

        tokio::time::timeout(self.timeout, events.await_say_finished())
            .await
            .map_err(|_| Error::Timeout(format!("engine speech after {:?}", self.timeout)))?
    }
}
