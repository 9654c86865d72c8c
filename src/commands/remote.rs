//! Remote control of the home-automation hub
//!
//! This is the one boundary with explicit failure recovery: whatever goes
//! wrong while talking to the hub is logged in full, the user hears a single
//! generic apology, and the listening loop carries on.

use std::sync::Arc;

use crate::hub::{EntityState, HubConnector};
use crate::speech::Speaker;
use crate::Result;

/// Spoken when any remote action fails
pub const APOLOGY: &str = "Error sending Home Assistant command";

/// Title of notifications sent through the hub
pub const NOTIFY_TITLE: &str = "Message from home assistant";

/// Hub service domain for notifications
const NOTIFY_DOMAIN: &str = "notify";

/// An action against the hub
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteAction {
    /// Read an entity and speak its state
    Read {
        /// Entity to read
        entity_id: String,
    },
    /// Set an entity's state, silently
    Write {
        /// Entity to write
        entity_id: String,
        /// New state
        value: String,
    },
    /// Send a notification
    Notify {
        /// Notification body
        message: String,
    },
}

impl RemoteAction {
    /// Short name used in logs
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Read { .. } => "read",
            Self::Write { .. } => "write",
            Self::Notify { .. } => "notify",
        }
    }
}

/// Compose the spoken reply for an entity read
///
/// `"<friendly name> is <state>"`, followed by the unit of measurement when
/// the entity declares one.
#[must_use]
pub fn compose_state_reply(state: &EntityState) -> String {
    let mut reply = format!("{} is {}", state.friendly_name(), state.state);
    if let Some(unit) = state.attribute("unit_of_measurement") {
        reply.push(' ');
        reply.push_str(&unit);
    }
    reply
}

/// Runs [`RemoteAction`]s with error containment
#[derive(Clone)]
pub struct RemoteControl {
    connector: Arc<dyn HubConnector>,
    speaker: Arc<dyn Speaker>,
    notify_service: String,
}

impl RemoteControl {
    /// Create a remote control
    ///
    /// `notify_service` is the notification platform, called as
    /// `notify.<notify_service>`.
    #[must_use]
    pub fn new(
        connector: Arc<dyn HubConnector>,
        speaker: Arc<dyn Speaker>,
        notify_service: impl Into<String>,
    ) -> Self {
        Self {
            connector,
            speaker,
            notify_service: notify_service.into(),
        }
    }

    /// Run an action
    ///
    /// Never fails: errors are logged and answered with [`APOLOGY`].
    pub async fn invoke(&self, action: &RemoteAction) {
        tracing::info!(kind = action.kind(), ?action, "hub command received");

        if let Err(e) = self.try_invoke(action).await {
            tracing::error!(kind = action.kind(), error = ?e, "hub command failed: {e}");
            if let Err(e) = self.speaker.say(APOLOGY).await {
                tracing::warn!(error = %e, "failed to speak apology");
            }
        }
    }

    async fn try_invoke(&self, action: &RemoteAction) -> Result<()> {
        let hub = self.connector.connect()?;

        match action {
            RemoteAction::Read { entity_id } => {
                let state = hub.get_state(entity_id).await?;
                tracing::info!(
                    entity_id = %state.entity_id,
                    state = %state.state,
                    attributes = ?state.attributes,
                    "hub state"
                );
                self.speaker.say(&compose_state_reply(&state)).await?;
            }
            RemoteAction::Write { entity_id, value } => {
                hub.set_state(entity_id, value).await?;
            }
            RemoteAction::Notify { message } => {
                let data = serde_json::json!({
                    "title": NOTIFY_TITLE,
                    "message": message,
                });
                hub.call_service(NOTIFY_DOMAIN, &self.notify_service, data)
                    .await?;
            }
        }

        Ok(())
    }
}
