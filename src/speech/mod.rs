//! Speech output
//!
//! Handlers talk through the [`Speaker`] trait. Synthesis and playback belong
//! to external programs or the assistant engine itself; this module only
//! decides where the text goes.

mod tts;

use std::time::Duration;

use async_trait::async_trait;

pub use tts::OpenAiSpeaker;

use crate::system::run_command;
use crate::{Error, Result};

/// Default time budget for one spoken phrase
const SPEAK_TIMEOUT: Duration = Duration::from_secs(30);

/// Speaks text to the user
#[async_trait]
pub trait Speaker: Send + Sync {
    /// Say `text`, returning once it has been handed off or played
    async fn say(&self, text: &str) -> Result<()>;
}

/// Speaks by running a TTS program with the text as last argument
///
/// e.g. `["espeak", "-v", "en-gb"]` runs `espeak -v en-gb "<text>"`.
#[derive(Debug, Clone)]
pub struct CommandSpeaker {
    argv: Vec<String>,
    timeout: Duration,
}

impl CommandSpeaker {
    /// Create a speaker
    ///
    /// # Errors
    ///
    /// Returns error if the command line is empty
    pub fn new(argv: Vec<String>) -> Result<Self> {
        if argv.is_empty() {
            return Err(Error::Config("speech.command is empty".to_string()));
        }
        Ok(Self {
            argv,
            timeout: SPEAK_TIMEOUT,
        })
    }
}

#[async_trait]
impl Speaker for CommandSpeaker {
    async fn say(&self, text: &str) -> Result<()> {
        tracing::debug!(text, "speaking");

        let mut argv = self.argv.clone();
        argv.push(text.to_string());

        let output = run_command(&argv, None, self.timeout).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Speech(format!(
                "{} exited with {}: {}",
                self.argv[0],
                output.status,
                stderr.trim()
            )));
        }
        Ok(())
    }
}

/// Prints speech to stdout, for typed sessions without audio
#[derive(Debug, Default)]
pub struct ConsoleSpeaker;

#[async_trait]
impl Speaker for ConsoleSpeaker {
    async fn say(&self, text: &str) -> Result<()> {
        tracing::info!(text, "speaking");
        println!("> {text}");
        Ok(())
    }
}
