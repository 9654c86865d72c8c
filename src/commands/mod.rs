//! Voice command table
//!
//! Maps normalized utterances to commands. Matching is first-match-wins over
//! an ordered list of entries, and every exact-phrase entry is ordered ahead
//! of every substring entry. [`CommandTableBuilder::build`] enforces that
//! ordering no matter how entries were added, so a new substring keyword can
//! never shadow an exact phrase.

pub mod handlers;
pub mod remote;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

pub use handlers::CommandRunner;
pub use remote::{APOLOGY, NOTIFY_TITLE, RemoteAction, RemoteControl, compose_state_reply};

/// A supported voice command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    /// Shut the device down
    PowerOff,
    /// Reboot the device
    Reboot,
    /// Speak the device's IPv4 address
    IpAddress,
    /// Read the outside temperature sensor
    OutsideTemperature,
    /// Switch on the bedtime automation
    Bedtime,
    /// Send the rest of the utterance as a notification
    Notify,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::PowerOff => "power_off",
            Self::Reboot => "reboot",
            Self::IpAddress => "ip_address",
            Self::OutsideTemperature => "outside_temperature",
            Self::Bedtime => "bedtime",
            Self::Notify => "notify",
        };
        f.write_str(name)
    }
}

/// How an entry matches normalized text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Matcher {
    /// Text equals the phrase
    Exact(String),
    /// Text contains the keyword
    Contains(String),
}

impl Matcher {
    /// Check normalized text against this matcher
    #[must_use]
    pub fn matches(&self, text: &str) -> bool {
        match self {
            Self::Exact(phrase) => text == phrase.as_str(),
            Self::Contains(keyword) => text.contains(keyword.as_str()),
        }
    }

    /// The phrase or keyword this matcher looks for
    #[must_use]
    pub fn pattern(&self) -> &str {
        match self {
            Self::Exact(p) | Self::Contains(p) => p,
        }
    }
}

/// One row of the command table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandEntry {
    /// Match predicate
    pub matcher: Matcher,
    /// Command run on match
    pub command: Command,
}

/// A matched utterance, ready to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Command to run
    pub command: Command,
    /// Normalized utterance text
    pub text: String,
    /// Phrase or keyword that matched
    pub trigger: String,
}

impl Invocation {
    /// Utterance with the first occurrence of the trigger removed, trimmed
    ///
    /// "notify dinner is ready" becomes "dinner is ready".
    #[must_use]
    pub fn remainder(&self) -> String {
        self.text.replacen(&self.trigger, "", 1).trim().to_string()
    }
}

/// Normalize recognized text for matching: trimmed and lowercased
#[must_use]
pub fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Ordered command table
#[derive(Debug, Clone)]
pub struct CommandTable {
    entries: Vec<CommandEntry>,
}

impl CommandTable {
    /// Start building a table
    #[must_use]
    pub fn builder() -> CommandTableBuilder {
        CommandTableBuilder::default()
    }

    /// The built-in phrases with `notify_keyword` as the notify trigger
    #[must_use]
    pub fn standard(notify_keyword: &str) -> Self {
        Self::standard_builder(notify_keyword).build()
    }

    /// The built-in phrases plus extra exact-phrase aliases
    #[must_use]
    pub fn with_aliases(notify_keyword: &str, aliases: &BTreeMap<String, Command>) -> Self {
        let mut builder = Self::standard_builder(notify_keyword);
        for (phrase, command) in aliases {
            builder = builder.exact(phrase, *command);
        }
        builder.build()
    }

    fn standard_builder(notify_keyword: &str) -> CommandTableBuilder {
        Self::builder()
            .exact("power off", Command::PowerOff)
            .exact("reboot", Command::Reboot)
            .exact("ip address", Command::IpAddress)
            .exact("outside temperature", Command::OutsideTemperature)
            .exact("bedtime", Command::Bedtime)
            .contains(notify_keyword, Command::Notify)
    }

    /// Entries in evaluation order
    #[must_use]
    pub fn entries(&self) -> &[CommandEntry] {
        &self.entries
    }

    /// Find the first entry matching `text`
    ///
    /// `text` is normalized before matching. Returns `None` for unmatched
    /// text, which callers drop silently.
    #[must_use]
    pub fn lookup(&self, text: &str) -> Option<Invocation> {
        let text = normalize(text);
        if text.is_empty() {
            return None;
        }

        self.entries
            .iter()
            .find(|entry| entry.matcher.matches(&text))
            .map(|entry| Invocation {
                command: entry.command,
                trigger: entry.matcher.pattern().to_string(),
                text,
            })
    }
}

/// Builds a [`CommandTable`]
///
/// Exact phrases keep their insertion order, as do substring keywords, but
/// all exact phrases are evaluated before any substring keyword.
#[derive(Debug, Default)]
pub struct CommandTableBuilder {
    exact: Vec<CommandEntry>,
    contains: Vec<CommandEntry>,
}

impl CommandTableBuilder {
    /// Add an exact-phrase entry
    #[must_use]
    pub fn exact(mut self, phrase: &str, command: Command) -> Self {
        let phrase = normalize(phrase);
        if phrase.is_empty() || self.exact.iter().any(|e| e.matcher.pattern() == phrase) {
            tracing::warn!(phrase = %phrase, %command, "ignoring empty or duplicate command phrase");
            return self;
        }
        self.exact.push(CommandEntry {
            matcher: Matcher::Exact(phrase),
            command,
        });
        self
    }

    /// Add a substring entry
    #[must_use]
    pub fn contains(mut self, keyword: &str, command: Command) -> Self {
        let keyword = normalize(keyword);
        if keyword.is_empty() {
            tracing::warn!(%command, "ignoring empty command keyword");
            return self;
        }
        self.contains.push(CommandEntry {
            matcher: Matcher::Contains(keyword),
            command,
        });
        self
    }

    /// Finish the table
    #[must_use]
    pub fn build(self) -> CommandTable {
        let mut entries = self.exact;
        entries.extend(self.contains);
        CommandTable { entries }
    }
}
