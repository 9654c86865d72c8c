//! Typed-text session
//!
//! Every non-blank input line is treated as one complete conversational
//! turn, so the dispatcher sees the same event sequence a voice turn produces.

use std::collections::VecDeque;

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};

use super::AssistantSession;
use crate::Result;
use crate::events::AssistantEvent;

/// Session reading utterances from a text stream
pub struct ConsoleSession<R> {
    lines: Lines<R>,
    pending: VecDeque<AssistantEvent>,
    stop_requests: usize,
}

impl<R: AsyncBufRead + Unpin + Send> ConsoleSession<R> {
    /// Create a session over `reader`
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            pending: VecDeque::from([AssistantEvent::SessionStarted]),
            stop_requests: 0,
        }
    }

    /// Number of times the dispatcher asked to stop a turn
    #[must_use]
    pub const fn stop_requests(&self) -> usize {
        self.stop_requests
    }
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send> AssistantSession for ConsoleSession<R> {
    async fn next_event(&mut self) -> Result<Option<AssistantEvent>> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Ok(Some(event));
            }

            let Some(line) = self.lines.next_line().await? else {
                tracing::debug!("console input closed");
                return Ok(None);
            };

            let text = line.trim();
            if text.is_empty() {
                continue;
            }

            self.pending.extend([
                AssistantEvent::TurnStarted,
                AssistantEvent::UtteranceEnded,
                AssistantEvent::UtteranceRecognized {
                    text: text.to_string(),
                },
                AssistantEvent::TurnFinished,
            ]);
        }
    }

    async fn stop_conversation(&mut self) -> Result<()> {
        self.stop_requests += 1;
        tracing::debug!("stop conversation requested");
        Ok(())
    }
}
