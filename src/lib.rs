//! Hearth - Voice command daemon for a home-automation hub
//!
//! Listens to a conversational assistant engine, matches recognized
//! utterances against a small table of voice commands, and runs them:
//! - Power off, reboot and IP address queries on the host
//! - Sensor reads, state writes and notifications through the hub
//! - Status reporting (ready, listening, thinking) for an indicator
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                Assistant engine                      │
//! │        bridge subprocess  │  console stdin           │
//! └────────────────────┬────────────────────────────────┘
//!                      │ events
//! ┌────────────────────▼────────────────────────────────┐
//! │                  Dispatcher                          │
//! │   Status  │  Command table  │  Command runner        │
//! └──────┬─────────────────────────────────┬────────────┘
//!        │                                 │
//! ┌──────▼───────────┐          ┌──────────▼────────────┐
//! │  Speech  │  OS    │          │  Home Assistant REST  │
//! └──────────────────┘          └───────────────────────┘
//! ```

pub mod assistant;
pub mod commands;
pub mod config;
pub mod daemon;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod hub;
pub mod speech;
pub mod status;
pub mod system;

pub use assistant::{AssistantSession, BridgeSession, ConsoleSession};
pub use commands::{Command, CommandRunner, CommandTable, Invocation, RemoteAction, RemoteControl};
pub use config::Config;
pub use daemon::{Daemon, Outcome, SessionMode};
pub use dispatcher::{Dispatcher, Flow};
pub use error::{Error, Result};
pub use events::{AssistantEvent, Status};
pub use hub::{EntityState, HomeAssistantClient, HubApi, HubConnector};
pub use speech::Speaker;
pub use status::StatusIndicator;
pub use system::{ShellSystem, SystemControl};
