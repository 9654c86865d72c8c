//! Event dispatcher
//!
//! State machine over assistant lifecycle events. Status events update the
//! indicator immediately; a finished recognition is looked up in the command
//! table and, on a match, the turn is stopped and the command runs to
//! completion before the next event is read.

use std::sync::Arc;

use crate::assistant::AssistantSession;
use crate::commands::{CommandRunner, CommandTable};
use crate::events::{AssistantEvent, Status};
use crate::status::StatusIndicator;

/// What the main loop should do after an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Keep reading events
    Continue,
    /// The engine failed fatally; end the process with a failure code
    Fatal,
}

/// Routes assistant events to the indicator and command handlers
pub struct Dispatcher {
    table: CommandTable,
    runner: CommandRunner,
    indicator: Arc<dyn StatusIndicator>,
    prompt: Option<String>,
}

impl Dispatcher {
    /// Create a dispatcher
    #[must_use]
    pub fn new(
        table: CommandTable,
        runner: CommandRunner,
        indicator: Arc<dyn StatusIndicator>,
    ) -> Self {
        Self {
            table,
            runner,
            indicator,
            prompt: None,
        }
    }

    /// Print operator prompts on stdout, naming `hotword`
    ///
    /// Only set this when stdout is a terminal.
    #[must_use]
    pub fn interactive(mut self, hotword: &str) -> Self {
        self.prompt = Some(format!(
            "Say \"{hotword}\" then speak, or press Ctrl+C to quit..."
        ));
        self
    }

    /// The command table in use
    #[must_use]
    pub const fn table(&self) -> &CommandTable {
        &self.table
    }

    /// Handle one event
    ///
    /// Never fails. Handler errors are logged and the loop continues.
    pub async fn handle(
        &self,
        session: &mut dyn AssistantSession,
        event: AssistantEvent,
    ) -> Flow {
        tracing::debug!(event = event.name(), "assistant event");

        match event {
            AssistantEvent::SessionStarted => {
                self.indicator.set_status(Status::Ready);
                if let Some(prompt) = &self.prompt {
                    println!("{prompt}");
                }
            }
            AssistantEvent::TurnStarted => self.indicator.set_status(Status::Listening),
            AssistantEvent::UtteranceRecognized { text } => {
                self.on_utterance(session, &text).await;
            }
            AssistantEvent::UtteranceEnded => self.indicator.set_status(Status::Thinking),
            AssistantEvent::TurnFinished => self.indicator.set_status(Status::Ready),
            AssistantEvent::AssistantError { fatal: true } => {
                tracing::error!("fatal assistant error");
                return Flow::Fatal;
            }
            AssistantEvent::AssistantError { fatal: false } => {
                tracing::warn!("assistant reported a recoverable error");
            }
            AssistantEvent::SayFinished => {
                tracing::trace!("late speech acknowledgement");
            }
            AssistantEvent::Other(kind) => {
                tracing::trace!(kind = %kind, "ignoring event");
            }
        }

        Flow::Continue
    }

    async fn on_utterance(&self, session: &mut dyn AssistantSession, text: &str) {
        if text.trim().is_empty() {
            return;
        }

        tracing::info!(text, "recognized utterance");
        if self.prompt.is_some() {
            println!("You said: {text}");
        }

        let Some(invocation) = self.table.lookup(text) else {
            tracing::debug!(text, "no command matched");
            return;
        };

        if let Err(e) = session.stop_conversation().await {
            tracing::warn!(error = %e, "failed to stop conversation");
        }

        if let Err(e) = self.runner.run(&invocation).await {
            tracing::error!(command = %invocation.command, error = %e, "command failed");
        }
    }
}
