//! Assistant engine sessions
//!
//! Hot-word detection and speech recognition happen inside an external
//! engine. A session yields the engine's lifecycle events one at a time and
//! can ask the engine to end the current conversational turn.

mod bridge;
mod console;

use async_trait::async_trait;

pub use bridge::{BridgeCommand, BridgeSession, BridgeSpeaker};
pub use console::ConsoleSession;

use crate::Result;
use crate::events::AssistantEvent;

/// A live session with the assistant engine
#[async_trait]
pub trait AssistantSession: Send {
    /// Wait for the next event; `None` once the session has ended
    async fn next_event(&mut self) -> Result<Option<AssistantEvent>>;

    /// Stop the engine from processing the current turn any further
    async fn stop_conversation(&mut self) -> Result<()>;
}
