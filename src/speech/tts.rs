//! `OpenAI` text-to-speech piped into a local audio player

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use super::Speaker;
use crate::config::SpeechConfig;
use crate::system::run_command;
use crate::{Error, Result};

/// `OpenAI` speech endpoint
const OPENAI_SPEECH_URL: &str = "https://api.openai.com/v1/audio/speech";

/// Upper bound on one synthesis request
const SYNTH_TIMEOUT: Duration = Duration::from_secs(30);

/// Upper bound on playing one phrase
const PLAY_TIMEOUT: Duration = Duration::from_secs(60);

/// Synthesizes speech over HTTP and plays the MP3 with an external player
pub struct OpenAiSpeaker {
    client: reqwest::Client,
    endpoint: String,
    api_key: SecretString,
    model: String,
    voice: String,
    speed: f32,
    player: Vec<String>,
}

impl OpenAiSpeaker {
    /// Create a speaker from speech configuration
    ///
    /// # Errors
    ///
    /// Returns error if the API key or player command is missing
    pub fn new(config: &SpeechConfig) -> Result<Self> {
        let api_key = config
            .openai_api_key
            .clone()
            .ok_or_else(|| Error::Config("OpenAI API key required for TTS".to_string()))?;

        if config.player.is_empty() {
            return Err(Error::Config("speech.player is empty".to_string()));
        }

        Ok(Self {
            client: reqwest::Client::builder().timeout(SYNTH_TIMEOUT).build()?,
            endpoint: OPENAI_SPEECH_URL.to_string(),
            api_key,
            model: config.tts_model.clone(),
            voice: config.tts_voice.clone(),
            speed: config.tts_speed,
            player: config.player.clone(),
        })
    }

    /// Point the speaker at a different OpenAI-compatible endpoint
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Synthesize text to MP3 bytes
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the API reports an error
    pub async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        #[derive(serde::Serialize)]
        struct TtsRequest<'a> {
            model: &'a str,
            input: &'a str,
            voice: &'a str,
            speed: f32,
        }

        let request = TtsRequest {
            model: &self.model,
            input: text,
            voice: &self.voice,
            speed: self.speed,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose_secret())
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Speech(format!("OpenAI TTS error {status}: {body}")));
        }

        let audio = response.bytes().await?;
        Ok(audio.to_vec())
    }
}

#[async_trait]
impl Speaker for OpenAiSpeaker {
    async fn say(&self, text: &str) -> Result<()> {
        tracing::debug!(text, "speaking");
        let audio = self.synthesize(text).await?;

        let output = run_command(&self.player, Some(audio.as_slice()), PLAY_TIMEOUT).await?;
        if !output.status.success() {
            return Err(Error::Speech(format!(
                "{} exited with {}",
                self.player[0], output.status
            )));
        }
        Ok(())
    }
}
