//! TOML configuration file loading
//!
//! Supports `~/.config/hearth/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::commands::Command;
use crate::{Error, Result};

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HearthConfigFile {
    /// Home-automation hub connection
    #[serde(default)]
    pub hub: HubFileConfig,

    /// Assistant engine session
    #[serde(default)]
    pub assistant: AssistantFileConfig,

    /// Speech output
    #[serde(default)]
    pub speech: SpeechFileConfig,

    /// Operating system commands
    #[serde(default)]
    pub system: SystemFileConfig,

    /// Voice command targets and extra phrases
    #[serde(default)]
    pub commands: CommandsFileConfig,
}

/// Hub connection configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HubFileConfig {
    /// Base URL (e.g. `http://hassio.local:8123`)
    pub url: Option<String>,

    /// Long-lived access token
    pub token: Option<String>,

    /// Notification platform used for `notify.<service>`
    pub notify_service: Option<String>,

    /// Request timeout in seconds (0 disables)
    pub timeout_secs: Option<u64>,
}

/// Assistant engine configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AssistantFileConfig {
    /// Engine bridge command line
    pub command: Option<Vec<String>>,

    /// Credentials file handed to the engine
    pub credentials: Option<PathBuf>,

    /// Hot word shown in the interactive prompt
    pub hotword: Option<String>,

    /// File receiving status changes
    pub status_file: Option<PathBuf>,
}

/// Speech output configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpeechFileConfig {
    /// Backend name (`auto`, `command`, `openai`, `console`)
    pub backend: Option<String>,

    /// TTS command line; the text is appended as the last argument
    pub command: Option<Vec<String>>,

    /// Audio player command line reading MP3 on stdin
    pub player: Option<Vec<String>>,

    /// TTS model (e.g. "tts-1")
    pub tts_model: Option<String>,

    /// TTS voice identifier (e.g. "alloy")
    pub tts_voice: Option<String>,

    /// TTS speed multiplier
    pub tts_speed: Option<f32>,

    /// `OpenAI` API key
    pub openai_api_key: Option<String>,
}

/// Operating system command configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SystemFileConfig {
    pub shutdown: Option<Vec<String>>,
    pub reboot: Option<Vec<String>>,
    pub ip_query: Option<Vec<String>>,
    pub timeout_secs: Option<u64>,
}

/// Voice command configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommandsFileConfig {
    pub outside_temperature_entity: Option<String>,
    pub bedtime_entity: Option<String>,
    pub bedtime_state: Option<String>,
    pub notify_keyword: Option<String>,

    /// Extra exact phrases mapped to commands
    #[serde(default)]
    pub aliases: BTreeMap<String, Command>,
}

/// Load a config file
///
/// With an explicit `path` the file must exist. Without one, the standard
/// location is used and a missing file yields defaults.
///
/// # Errors
///
/// Returns error if the file cannot be read or parsed
pub fn load_config_file(path: Option<&Path>) -> Result<HearthConfigFile> {
    let (path, required) = match path {
        Some(p) => (p.to_path_buf(), true),
        None => match config_file_path() {
            Some(p) => (p, false),
            None => return Ok(HearthConfigFile::default()),
        },
    };

    if !required && !path.exists() {
        tracing::debug!(path = %path.display(), "no config file, using defaults");
        return Ok(HearthConfigFile::default());
    }

    let content = std::fs::read_to_string(&path).map_err(|e| {
        Error::Config(format!("failed to read {}: {e}", path.display()))
    })?;
    let config = parse_config_file(&content)?;

    tracing::info!(path = %path.display(), "loaded config file");
    Ok(config)
}

/// Parse config file contents
///
/// # Errors
///
/// Returns error if the TOML is invalid or contains unknown keys
pub fn parse_config_file(content: &str) -> Result<HearthConfigFile> {
    Ok(toml::from_str(content)?)
}

/// Return the config file path: `~/.config/hearth/config.toml`
#[must_use]
pub fn config_file_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "hearth").map(|d| d.config_dir().join("config.toml"))
}
