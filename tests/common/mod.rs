//! Shared test utilities

#![allow(dead_code)]

use std::collections::VecDeque;
use std::net::Ipv4Addr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use hearth::commands::{CommandRunner, CommandTable, RemoteControl};
use hearth::config::CommandsConfig;
use hearth::events::{AssistantEvent, Status};
use hearth::hub::{EntityState, HubApi, HubConnector};
use hearth::status::StatusIndicator;
use hearth::system::SystemControl;
use hearth::{AssistantSession, Dispatcher, Error, Result, Speaker};

/// Notification platform used by the test harness
pub const NOTIFY_SERVICE: &str = "mobile_app_phone";

/// Speaker that records everything it is asked to say
#[derive(Default)]
pub struct RecordingSpeaker {
    said: Mutex<Vec<String>>,
    fail: bool,
}

impl RecordingSpeaker {
    /// A speaker whose every `say` fails (after recording the text)
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn said(&self) -> Vec<String> {
        self.said.lock().unwrap().clone()
    }
}

#[async_trait]
impl Speaker for RecordingSpeaker {
    async fn say(&self, text: &str) -> Result<()> {
        self.said.lock().unwrap().push(text.to_string());
        if self.fail {
            return Err(Error::Speech("speaker unplugged".to_string()));
        }
        Ok(())
    }
}

/// OS control that records calls instead of running them
#[derive(Default)]
pub struct FakeSystem {
    calls: Mutex<Vec<&'static str>>,
    ip: Option<Ipv4Addr>,
}

impl FakeSystem {
    pub fn with_ip(ip: Ipv4Addr) -> Self {
        Self {
            ip: Some(ip),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SystemControl for FakeSystem {
    async fn shutdown(&self) -> Result<()> {
        self.calls.lock().unwrap().push("shutdown");
        Ok(())
    }

    async fn reboot(&self) -> Result<()> {
        self.calls.lock().unwrap().push("reboot");
        Ok(())
    }

    async fn primary_ipv4(&self) -> Result<Option<Ipv4Addr>> {
        self.calls.lock().unwrap().push("primary_ipv4");
        Ok(self.ip)
    }
}

/// A request the fake hub received
#[derive(Debug, Clone, PartialEq)]
pub enum HubCall {
    Get(String),
    Set(String, String),
    Service {
        domain: String,
        service: String,
        data: serde_json::Value,
    },
}

/// How the fake hub answers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HubMode {
    /// Every request succeeds
    Healthy,
    /// Every request fails
    Failing,
    /// Connecting fails before any request
    Unreachable,
}

/// In-memory hub that records requests
#[derive(Clone)]
pub struct FakeHub {
    calls: Arc<Mutex<Vec<HubCall>>>,
    state: EntityState,
    mode: HubMode,
}

impl FakeHub {
    pub fn new(mode: HubMode) -> Self {
        Self {
            calls: Arc::default(),
            state: outside_temperature(Some("°C")),
            mode,
        }
    }

    /// Answer reads with `state`
    pub fn with_state(mut self, state: EntityState) -> Self {
        self.state = state;
        self
    }

    pub fn calls(&self) -> Vec<HubCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: HubCall) -> Result<()> {
        self.calls.lock().unwrap().push(call);
        match self.mode {
            HubMode::Healthy => Ok(()),
            _ => Err(Error::Hub("500 Internal Server Error".to_string())),
        }
    }
}

#[async_trait]
impl HubApi for FakeHub {
    async fn get_state(&self, entity_id: &str) -> Result<EntityState> {
        self.record(HubCall::Get(entity_id.to_string()))?;
        Ok(self.state.clone())
    }

    async fn set_state(&self, entity_id: &str, new_state: &str) -> Result<()> {
        self.record(HubCall::Set(entity_id.to_string(), new_state.to_string()))
    }

    async fn call_service(
        &self,
        domain: &str,
        service: &str,
        data: serde_json::Value,
    ) -> Result<()> {
        self.record(HubCall::Service {
            domain: domain.to_string(),
            service: service.to_string(),
            data,
        })
    }
}

impl HubConnector for FakeHub {
    fn connect(&self) -> Result<Box<dyn HubApi>> {
        if self.mode == HubMode::Unreachable {
            return Err(Error::Config("hub url not configured".to_string()));
        }
        Ok(Box::new(self.clone()))
    }
}

/// Outside temperature sensor state, optionally with a unit
pub fn outside_temperature(unit: Option<&str>) -> EntityState {
    let mut attributes = serde_json::Map::new();
    attributes.insert(
        "friendly_name".to_string(),
        serde_json::json!("Outside Temperature"),
    );
    if let Some(unit) = unit {
        attributes.insert("unit_of_measurement".to_string(), serde_json::json!(unit));
    }
    EntityState {
        entity_id: "sensor.outside_temperature".to_string(),
        state: "21".to_string(),
        attributes,
    }
}

/// Indicator that keeps every status it was given, in order
#[derive(Default)]
pub struct RecordingIndicator {
    seen: Mutex<Vec<Status>>,
}

impl RecordingIndicator {
    pub fn seen(&self) -> Vec<Status> {
        self.seen.lock().unwrap().clone()
    }
}

impl StatusIndicator for RecordingIndicator {
    fn set_status(&self, status: Status) {
        self.seen.lock().unwrap().push(status);
    }
}

/// Session replaying a fixed list of events
#[derive(Default)]
pub struct ScriptedSession {
    events: VecDeque<AssistantEvent>,
    pub stops: usize,
}

impl ScriptedSession {
    pub fn new(events: impl IntoIterator<Item = AssistantEvent>) -> Self {
        Self {
            events: events.into_iter().collect(),
            stops: 0,
        }
    }

    /// One full voice turn that recognizes `text`
    pub fn turns<'a>(texts: impl IntoIterator<Item = &'a str>) -> Self {
        let mut events = vec![AssistantEvent::SessionStarted];
        for text in texts {
            events.extend(turn(text));
        }
        Self::new(events)
    }

    pub fn remaining(&self) -> usize {
        self.events.len()
    }
}

#[async_trait]
impl AssistantSession for ScriptedSession {
    async fn next_event(&mut self) -> Result<Option<AssistantEvent>> {
        Ok(self.events.pop_front())
    }

    async fn stop_conversation(&mut self) -> Result<()> {
        self.stops += 1;
        Ok(())
    }
}

/// Events of one conversational turn recognizing `text`
pub fn turn(text: &str) -> Vec<AssistantEvent> {
    vec![
        AssistantEvent::TurnStarted,
        AssistantEvent::UtteranceEnded,
        AssistantEvent::UtteranceRecognized {
            text: text.to_string(),
        },
        AssistantEvent::TurnFinished,
    ]
}

/// A dispatcher wired to fakes
pub struct Harness {
    pub dispatcher: Dispatcher,
    pub speaker: Arc<RecordingSpeaker>,
    pub system: Arc<FakeSystem>,
    pub hub: FakeHub,
    pub indicator: Arc<RecordingIndicator>,
}

impl Harness {
    pub fn new(hub: FakeHub) -> Self {
        Self::build(hub, RecordingSpeaker::default(), FakeSystem::default())
    }

    pub fn build(hub: FakeHub, speaker: RecordingSpeaker, system: FakeSystem) -> Self {
        let speaker = Arc::new(speaker);
        let system = Arc::new(system);
        let indicator = Arc::new(RecordingIndicator::default());
        let targets = CommandsConfig::default();

        let remote = RemoteControl::new(
            Arc::new(hub.clone()),
            Arc::clone(&speaker) as Arc<dyn Speaker>,
            NOTIFY_SERVICE,
        );
        let runner = CommandRunner::new(
            Arc::clone(&speaker) as Arc<dyn Speaker>,
            Arc::clone(&system) as Arc<dyn SystemControl>,
            remote,
            targets.clone(),
        );
        let table = CommandTable::with_aliases(&targets.notify_keyword, &targets.aliases);
        let dispatcher = Dispatcher::new(
            table,
            runner,
            Arc::clone(&indicator) as Arc<dyn StatusIndicator>,
        );

        Self {
            dispatcher,
            speaker,
            system,
            hub,
            indicator,
        }
    }
}
