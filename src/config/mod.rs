//! Configuration management for hearth
//!
//! Values come from three layers: built-in defaults, the TOML config file
//! (see [`file`]), then environment variables, each overriding the last.

pub mod file;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;

use crate::commands::Command;
use crate::{Error, Result};

use file::HearthConfigFile;

/// Default hub request timeout
const DEFAULT_HUB_TIMEOUT_SECS: u64 = 10;

/// Default OS command timeout
const DEFAULT_SYSTEM_TIMEOUT_SECS: u64 = 30;

/// hearth configuration
#[derive(Debug, Default)]
pub struct Config {
    /// Home-automation hub connection
    pub hub: HubConfig,

    /// Assistant engine session
    pub assistant: AssistantConfig,

    /// Speech output
    pub speech: SpeechConfig,

    /// Operating system commands
    pub system: SystemConfig,

    /// Voice command targets
    pub commands: CommandsConfig,
}

/// Home-automation hub connection parameters
#[derive(Debug)]
pub struct HubConfig {
    /// Base URL of the hub; remote commands fail (and apologize) without it
    pub url: Option<String>,

    /// Long-lived access token
    pub token: Option<SecretString>,

    /// Notification platform, called as `notify.<notify_service>`
    pub notify_service: String,

    /// Per-request timeout; `None` waits indefinitely
    pub timeout: Option<Duration>,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            url: None,
            token: None,
            notify_service: "notify".to_string(),
            timeout: Some(Duration::from_secs(DEFAULT_HUB_TIMEOUT_SECS)),
        }
    }
}

/// Assistant engine configuration
#[derive(Debug)]
pub struct AssistantConfig {
    /// Engine bridge command line
    pub command: Vec<String>,

    /// Credentials file handed to the engine
    pub credentials: Option<PathBuf>,

    /// Hot word shown in the interactive prompt
    pub hotword: String,

    /// File receiving status changes
    pub status_file: Option<PathBuf>,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            command: vec!["assistant-bridge".to_string()],
            credentials: None,
            hotword: "OK, Google".to_string(),
            status_file: None,
        }
    }
}

/// Which speech output to use
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SpeechBackend {
    /// Speak through the assistant engine, or the console in console mode
    #[default]
    Auto,
    /// Run an external TTS command
    Command,
    /// `OpenAI` TTS piped to an audio player
    OpenAi,
    /// Print to stdout
    Console,
}

impl FromStr for SpeechBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "command" => Ok(Self::Command),
            "openai" => Ok(Self::OpenAi),
            "console" => Ok(Self::Console),
            other => Err(Error::Config(format!("unknown speech backend: {other}"))),
        }
    }
}

/// Speech output configuration
#[derive(Debug)]
pub struct SpeechConfig {
    /// Selected backend
    pub backend: SpeechBackend,

    /// TTS command line; text is appended as the last argument
    pub command: Vec<String>,

    /// Audio player reading MP3 on stdin
    pub player: Vec<String>,

    /// TTS model for the `OpenAI` backend
    pub tts_model: String,

    /// TTS voice identifier
    pub tts_voice: String,

    /// TTS speed multiplier (0.25 to 4.0)
    pub tts_speed: f32,

    /// `OpenAI` API key
    pub openai_api_key: Option<SecretString>,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            backend: SpeechBackend::Auto,
            command: vec!["espeak".to_string()],
            player: vec!["mpg123".to_string(), "-q".to_string(), "-".to_string()],
            tts_model: "tts-1".to_string(),
            tts_voice: "alloy".to_string(),
            tts_speed: 1.0,
            openai_api_key: None,
        }
    }
}

/// Operating system command configuration
#[derive(Debug, Clone)]
pub struct SystemConfig {
    /// Shutdown command line
    pub shutdown: Vec<String>,

    /// Reboot command line
    pub reboot: Vec<String>,

    /// Command printing the host's addresses
    pub ip_query: Vec<String>,

    /// Time budget for each command
    pub timeout: Duration,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            shutdown: argv(&["sudo", "shutdown", "now"]),
            reboot: argv(&["sudo", "reboot"]),
            ip_query: argv(&["hostname", "-I"]),
            timeout: Duration::from_secs(DEFAULT_SYSTEM_TIMEOUT_SECS),
        }
    }
}

/// Voice command targets
#[derive(Debug, Clone)]
pub struct CommandsConfig {
    /// Sensor read by "outside temperature"
    pub outside_temperature_entity: String,

    /// Automation switched by "bedtime"
    pub bedtime_entity: String,

    /// State written by "bedtime"
    pub bedtime_state: String,

    /// Keyword that triggers a notification
    pub notify_keyword: String,

    /// Extra exact phrases mapped to commands
    pub aliases: BTreeMap<String, Command>,
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            outside_temperature_entity: "sensor.outside_temperature".to_string(),
            bedtime_entity: "automation.bedtime".to_string(),
            bedtime_state: "on".to_string(),
            notify_keyword: "notify".to_string(),
            aliases: BTreeMap::new(),
        }
    }
}

fn argv(parts: &[&str]) -> Vec<String> {
    parts.iter().map(ToString::to_string).collect()
}

/// Split a command line from an environment variable on whitespace
fn split_command(value: &str) -> Option<Vec<String>> {
    let parts: Vec<String> = value.split_whitespace().map(ToString::to_string).collect();
    (!parts.is_empty()).then_some(parts)
}

/// Timeout in seconds where 0 means "no timeout"
fn optional_timeout(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

impl Config {
    /// Load configuration from the config file and environment
    ///
    /// # Errors
    ///
    /// Returns error if the config file cannot be read or a value is invalid
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = file::load_config_file(path)?;
        Self::from_sources(file, |key| std::env::var(key).ok())
    }

    /// Build configuration from a parsed file and an environment lookup
    ///
    /// # Errors
    ///
    /// Returns error if a value is invalid
    pub fn from_sources(
        fc: HearthConfigFile,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let hub_defaults = HubConfig::default();
        let hub_timeout = env("HEARTH_HUB_TIMEOUT_SECS")
            .map(|s| {
                s.trim().parse::<u64>().map_err(|e| {
                    Error::Config(format!("HEARTH_HUB_TIMEOUT_SECS={s:?}: {e}"))
                })
            })
            .transpose()?
            .or(fc.hub.timeout_secs);
        let hub = HubConfig {
            url: env("HEARTH_HUB_URL").or(fc.hub.url),
            token: env("HEARTH_HUB_TOKEN")
                .or(fc.hub.token)
                .map(SecretString::from),
            notify_service: env("HEARTH_NOTIFY_SERVICE")
                .or(fc.hub.notify_service)
                .unwrap_or(hub_defaults.notify_service),
            timeout: hub_timeout.map_or(hub_defaults.timeout, optional_timeout),
        };

        let assistant_defaults = AssistantConfig::default();
        let assistant = AssistantConfig {
            command: env("HEARTH_ASSISTANT_COMMAND")
                .and_then(|s| split_command(&s))
                .or(fc.assistant.command)
                .unwrap_or(assistant_defaults.command),
            credentials: env("HEARTH_CREDENTIALS")
                .map(PathBuf::from)
                .or(fc.assistant.credentials),
            hotword: fc.assistant.hotword.unwrap_or(assistant_defaults.hotword),
            status_file: env("HEARTH_STATUS_FILE")
                .map(PathBuf::from)
                .or(fc.assistant.status_file),
        };

        if assistant.command.is_empty() {
            return Err(Error::Config("assistant.command is empty".to_string()));
        }

        let speech_defaults = SpeechConfig::default();
        let backend = env("HEARTH_SPEECH_BACKEND")
            .or(fc.speech.backend)
            .map(|s| s.parse::<SpeechBackend>())
            .transpose()?
            .unwrap_or_default();
        let speech = SpeechConfig {
            backend,
            command: fc.speech.command.unwrap_or(speech_defaults.command),
            player: fc.speech.player.unwrap_or(speech_defaults.player),
            tts_model: fc.speech.tts_model.unwrap_or(speech_defaults.tts_model),
            tts_voice: fc.speech.tts_voice.unwrap_or(speech_defaults.tts_voice),
            tts_speed: fc
                .speech
                .tts_speed
                .unwrap_or(speech_defaults.tts_speed)
                .clamp(0.25, 4.0),
            openai_api_key: env("OPENAI_API_KEY")
                .or(fc.speech.openai_api_key)
                .map(SecretString::from),
        };

        let system_defaults = SystemConfig::default();
        let system = SystemConfig {
            shutdown: fc.system.shutdown.unwrap_or(system_defaults.shutdown),
            reboot: fc.system.reboot.unwrap_or(system_defaults.reboot),
            ip_query: fc.system.ip_query.unwrap_or(system_defaults.ip_query),
            timeout: fc
                .system
                .timeout_secs
                .map_or(system_defaults.timeout, Duration::from_secs),
        };

        let commands_defaults = CommandsConfig::default();
        let commands = CommandsConfig {
            outside_temperature_entity: fc
                .commands
                .outside_temperature_entity
                .unwrap_or(commands_defaults.outside_temperature_entity),
            bedtime_entity: fc
                .commands
                .bedtime_entity
                .unwrap_or(commands_defaults.bedtime_entity),
            bedtime_state: fc
                .commands
                .bedtime_state
                .unwrap_or(commands_defaults.bedtime_state),
            notify_keyword: fc
                .commands
                .notify_keyword
                .map(|k| k.trim().to_lowercase())
                .unwrap_or(commands_defaults.notify_keyword),
            aliases: fc.commands.aliases,
        };

        if commands.notify_keyword.is_empty() {
            return Err(Error::Config("commands.notify_keyword is empty".to_string()));
        }

        // An exact phrase leaves nothing to send
        if let Some((phrase, _)) = commands
            .aliases
            .iter()
            .find(|(_, command)| **command == Command::Notify)
        {
            return Err(Error::Config(format!(
                "alias {phrase:?} cannot map to notify; use commands.notify_keyword"
            )));
        }

        Ok(Self {
            hub,
            assistant,
            speech,
            system,
            commands,
        })
    }
}
