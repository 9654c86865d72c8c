//! Daemon - the main loop
//!
//! Opens a session with the assistant engine, wires speech, hub and OS
//! collaborators into a [`Dispatcher`], and feeds it every event until the
//! session ends, a fatal engine error arrives, or the user presses Ctrl+C.

use std::future::Future;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::io::BufReader;

use crate::assistant::{AssistantSession, BridgeSession, BridgeSpeaker, ConsoleSession};
use crate::commands::{CommandRunner, CommandTable, RemoteControl};
use crate::config::{SpeechBackend, SpeechConfig};
use crate::dispatcher::{Dispatcher, Flow};
use crate::speech::{CommandSpeaker, ConsoleSpeaker, OpenAiSpeaker, Speaker};
use crate::status::{CompositeIndicator, FileIndicator, TracingIndicator};
use crate::system::ShellSystem;
use crate::{Config, Error, Result};

/// Where assistant events come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    /// External engine process
    Bridge,
    /// Lines typed on stdin
    Console,
}

/// How the main loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The engine closed its event stream
    Ended,
    /// Ctrl+C
    Interrupted,
    /// The engine reported a fatal error
    Fatal,
}

impl Outcome {
    /// Process exit code for this outcome
    #[must_use]
    pub const fn exit_code(self) -> u8 {
        match self {
            Self::Ended | Self::Interrupted => 0,
            Self::Fatal => 1,
        }
    }
}

/// The hearth daemon
pub struct Daemon {
    config: Config,
    mode: SessionMode,
}

impl Daemon {
    /// Create a daemon
    #[must_use]
    pub const fn new(config: Config, mode: SessionMode) -> Self {
        Self { config, mode }
    }

    /// Run until the session ends
    ///
    /// # Errors
    ///
    /// Returns error if the session cannot be opened or its event stream
    /// fails
    pub async fn run(self) -> Result<Outcome> {
        let interactive = std::io::stdout().is_terminal();
        tracing::info!(mode = ?self.mode, interactive, "daemon running");

        match self.mode {
            SessionMode::Bridge => {
                let credentials = acquire_credentials(self.config.assistant.credentials.as_deref())?;
                let mut session =
                    BridgeSession::spawn(&self.config.assistant.command, credentials.as_deref())?;
                let speaker = build_speaker(&self.config.speech, Some(session.speaker()), false)?;
                let dispatcher = build_dispatcher(self.config, speaker, interactive);
                pump(&mut session, &dispatcher, shutdown_signal()).await
            }
            SessionMode::Console => {
                let mut session = ConsoleSession::new(BufReader::new(tokio::io::stdin()));
                let speaker = build_speaker(&self.config.speech, None, true)?;
                let dispatcher = build_dispatcher(self.config, speaker, interactive);
                pump(&mut session, &dispatcher, shutdown_signal()).await
            }
        }
    }
}

/// Check the engine credentials file
///
/// # Errors
///
/// Returns error if a credentials path is configured but not a readable file
pub fn acquire_credentials(path: Option<&Path>) -> Result<Option<PathBuf>> {
    let Some(path) = path else {
        tracing::debug!("no assistant credentials configured");
        return Ok(None);
    };

    let meta = std::fs::metadata(path).map_err(|e| {
        Error::Config(format!("assistant credentials {}: {e}", path.display()))
    })?;
    if !meta.is_file() {
        return Err(Error::Config(format!(
            "assistant credentials {} is not a file",
            path.display()
        )));
    }

    tracing::info!(path = %path.display(), "assistant credentials found");
    Ok(Some(path.to_path_buf()))
}

/// Pick the speech output for the configured backend
///
/// With [`SpeechBackend::Auto`] the engine speaks when there is one, the
/// console when `console` is set, and the TTS command otherwise.
///
/// # Errors
///
/// Returns error if the selected backend is misconfigured
pub fn build_speaker(
    config: &SpeechConfig,
    engine: Option<BridgeSpeaker>,
    console: bool,
) -> Result<Arc<dyn Speaker>> {
    let speaker: Arc<dyn Speaker> = match (config.backend, engine) {
        (SpeechBackend::Auto, Some(engine)) => Arc::new(engine),
        (SpeechBackend::Auto, None) if console => Arc::new(ConsoleSpeaker),
        (SpeechBackend::Auto | SpeechBackend::Command, _) => {
            Arc::new(CommandSpeaker::new(config.command.clone())?)
        }
        (SpeechBackend::OpenAi, _) => Arc::new(OpenAiSpeaker::new(config)?),
        (SpeechBackend::Console, _) => Arc::new(ConsoleSpeaker),
    };
    Ok(speaker)
}

/// Assemble the dispatcher from configuration
#[must_use]
pub fn build_dispatcher(config: Config, speaker: Arc<dyn Speaker>, interactive: bool) -> Dispatcher {
    let Config {
        hub,
        assistant,
        system,
        commands,
        ..
    } = config;

    let table = CommandTable::with_aliases(&commands.notify_keyword, &commands.aliases);
    let notify_service = hub.notify_service.clone();
    let remote = RemoteControl::new(Arc::new(hub), Arc::clone(&speaker), notify_service);
    let runner = CommandRunner::new(speaker, Arc::new(ShellSystem::new(system)), remote, commands);

    let mut indicator = CompositeIndicator::new().with(TracingIndicator);
    if let Some(path) = assistant.status_file {
        indicator = indicator.with(FileIndicator::new(path));
    }

    let dispatcher = Dispatcher::new(table, runner, Arc::new(indicator));
    if interactive {
        dispatcher.interactive(&assistant.hotword)
    } else {
        dispatcher
    }
}

/// Feed session events to the dispatcher until the session ends
///
/// Events are handled strictly one at a time. `shutdown` resolving ends the
/// loop between events.
///
/// # Errors
///
/// Returns error if reading from the session fails
pub async fn pump(
    session: &mut dyn AssistantSession,
    dispatcher: &Dispatcher,
    shutdown: impl Future<Output = ()>,
) -> Result<Outcome> {
    tokio::pin!(shutdown);

    loop {
        let next = tokio::select! {
            () = &mut shutdown => {
                tracing::info!("shutdown requested");
                return Ok(Outcome::Interrupted);
            }
            next = session.next_event() => next?,
        };

        let Some(event) = next else {
            tracing::info!("assistant session ended");
            return Ok(Outcome::Ended);
        };

        if dispatcher.handle(session, event).await == Flow::Fatal {
            return Ok(Outcome::Fatal);
        }
    }
}

/// Resolves on Ctrl+C
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}
