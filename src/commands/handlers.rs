//! Command handlers
//!
//! Local commands speak and call into the OS; hub commands are translated
//! into [`RemoteAction`]s and handed to [`RemoteControl`].

use std::sync::Arc;

use super::{Command, Invocation, RemoteAction, RemoteControl};
use crate::Result;
use crate::config::CommandsConfig;
use crate::speech::Speaker;
use crate::system::SystemControl;

/// Spoken before shutting down
pub const POWER_OFF_FAREWELL: &str = "Good bye!";

/// Spoken before rebooting
pub const REBOOT_FAREWELL: &str = "See you in a bit!";

/// Spoken when the host has no IPv4 address
pub const NO_IP_ADDRESS: &str = "I don't have an IP address";

/// Runs matched commands
#[derive(Clone)]
pub struct CommandRunner {
    speaker: Arc<dyn Speaker>,
    system: Arc<dyn SystemControl>,
    remote: RemoteControl,
    targets: CommandsConfig,
}

impl CommandRunner {
    /// Create a runner
    #[must_use]
    pub fn new(
        speaker: Arc<dyn Speaker>,
        system: Arc<dyn SystemControl>,
        remote: RemoteControl,
        targets: CommandsConfig,
    ) -> Self {
        Self {
            speaker,
            system,
            remote,
            targets,
        }
    }

    /// Run one matched command to completion
    ///
    /// # Errors
    ///
    /// Returns error if speaking or an OS command fails. Hub failures never
    /// surface here; [`RemoteControl`] answers them itself.
    pub async fn run(&self, invocation: &Invocation) -> Result<()> {
        tracing::info!(command = %invocation.command, text = %invocation.text, "running command");

        match invocation.command {
            Command::PowerOff => {
                self.farewell(POWER_OFF_FAREWELL).await;
                self.system.shutdown().await
            }
            Command::Reboot => {
                self.farewell(REBOOT_FAREWELL).await;
                self.system.reboot().await
            }
            Command::IpAddress => self.say_ip().await,
            Command::OutsideTemperature => {
                self.remote
                    .invoke(&RemoteAction::Read {
                        entity_id: self.targets.outside_temperature_entity.clone(),
                    })
                    .await;
                Ok(())
            }
            Command::Bedtime => {
                self.remote
                    .invoke(&RemoteAction::Write {
                        entity_id: self.targets.bedtime_entity.clone(),
                        value: self.targets.bedtime_state.clone(),
                    })
                    .await;
                Ok(())
            }
            Command::Notify => {
                self.remote
                    .invoke(&RemoteAction::Notify {
                        message: invocation.remainder(),
                    })
                    .await;
                Ok(())
            }
        }
    }

    /// Say goodbye; a failed farewell must not block the OS command
    async fn farewell(&self, text: &str) {
        if let Err(e) = self.speaker.say(text).await {
            tracing::warn!(error = %e, "failed to speak farewell");
        }
    }

    async fn say_ip(&self) -> Result<()> {
        if let Some(ip) = self.system.primary_ipv4().await? {
            self.speaker.say(&format!("My IP address is {ip}")).await
        } else {
            tracing::warn!("no IPv4 address reported");
            self.speaker.say(NO_IP_ADDRESS).await
        }
    }
}
