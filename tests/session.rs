//! Assistant session integration tests
//!
//! The bridge tests drive a small `sh` script standing in for the engine.

use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use hearth::assistant::{BridgeSession, ConsoleSession};
use hearth::commands::{Command, CommandRunner, Invocation, RemoteControl};
use hearth::config::{CommandsConfig, HubConfig};
use hearth::events::AssistantEvent;
use hearth::system::SystemControl;
use hearth::{AssistantSession, Error, Result, Speaker};
use tokio::io::BufReader;

mod common;
use common::{FakeHub, Harness, HubMode};

/// Collect every event until the session ends
async fn drain(session: &mut dyn AssistantSession) -> Vec<AssistantEvent> {
    let mut events = Vec::new();
    while let Some(event) = session.next_event().await.unwrap() {
        events.push(event);
    }
    events
}

fn recognized(text: &str) -> AssistantEvent {
    AssistantEvent::UtteranceRecognized {
        text: text.to_string(),
    }
}

#[tokio::test]
async fn test_console_session_turns() {
    let input = tokio_test::io::Builder::new()
        .read(b"power off\n\n")
        .read(b"  notify dinner is ready  \n")
        .build();
    let mut session = ConsoleSession::new(BufReader::new(input));

    let events = drain(&mut session).await;
    assert_eq!(
        events,
        vec![
            AssistantEvent::SessionStarted,
            AssistantEvent::TurnStarted,
            AssistantEvent::UtteranceEnded,
            recognized("power off"),
            AssistantEvent::TurnFinished,
            AssistantEvent::TurnStarted,
            AssistantEvent::UtteranceEnded,
            recognized("notify dinner is ready"),
            AssistantEvent::TurnFinished,
        ]
    );
}

#[tokio::test]
async fn test_console_session_counts_stops() {
    let mut session = ConsoleSession::new(&b"reboot\nhello there\n"[..]);
    let harness = Harness::new(FakeHub::new(HubMode::Healthy));

    let outcome = hearth::daemon::pump(&mut session, &harness.dispatcher, std::future::pending())
        .await
        .unwrap();

    assert_eq!(outcome, hearth::Outcome::Ended);
    assert_eq!(session.stop_requests(), 1);
    assert_eq!(harness.system.calls(), vec!["reboot"]);
}

/// Engine stand-in: emits events, then records two commands and the
/// credentials variable to the file named by `$1` and acknowledges the speech
const ENGINE_SCRIPT: &str = r#"
echo '{"type": "ON_START_FINISHED"}'
echo ''
echo 'not json'
echo '{"type": "ON_CONVERSATION_TURN_STARTED"}'
echo '{"type": "ON_RECOGNIZING_SPEECH_FINISHED", "args": {"text": "power off"}}'
read first
read second
printf '%s\n%s\n%s\n' "$first" "$second" "$ASSISTANT_CREDENTIALS" > "$1"
echo '{"type": "say_finished"}'
"#;

/// Spawn `sh -c script` with `arg` as `$1`
fn spawn_engine(script: &str, arg: &str) -> BridgeSession {
    let argv = vec![
        "sh".to_string(),
        "-c".to_string(),
        script.to_string(),
        "engine".to_string(),
        arg.to_string(),
    ];
    BridgeSession::spawn(&argv, None).unwrap()
}

#[tokio::test]
async fn test_bridge_session_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("commands.txt");
    let credentials = dir.path().join("credentials.json");
    std::fs::write(&credentials, "{}").unwrap();

    let argv = vec![
        "sh".to_string(),
        "-c".to_string(),
        ENGINE_SCRIPT.to_string(),
        "engine".to_string(),
        out.display().to_string(),
    ];
    let mut session = BridgeSession::spawn(&argv, Some(credentials.as_path())).unwrap();
    let speaker = session.speaker();

    let run = async {
        assert_eq!(
            session.next_event().await.unwrap(),
            Some(AssistantEvent::SessionStarted)
        );
        assert_eq!(
            session.next_event().await.unwrap(),
            Some(AssistantEvent::TurnStarted)
        );
        assert_eq!(
            session.next_event().await.unwrap(),
            Some(recognized("power off"))
        );

        session.stop_conversation().await.unwrap();
        speaker.say("Good bye!").await.unwrap();

        assert_eq!(session.next_event().await.unwrap(), None);
    };
    tokio::time::timeout(Duration::from_secs(10), run)
        .await
        .expect("engine script hung");

    let written = std::fs::read_to_string(&out).unwrap();
    let lines: Vec<&str> = written.lines().collect();
    assert_eq!(lines[0], r#"{"command":"stop_conversation"}"#);
    assert_eq!(lines[1], r#"{"command":"say","text":"Good bye!"}"#);
    assert_eq!(lines[2], credentials.display().to_string());
}

#[tokio::test]
async fn test_bridge_session_missing_program() {
    let argv = vec!["hearth-no-such-engine".to_string()];
    assert!(BridgeSession::spawn(&argv, None).is_err());
}

#[tokio::test]
async fn test_bridge_session_ends_when_engine_exits() {
    let argv = vec!["true".to_string()];
    let mut session = BridgeSession::spawn(&argv, None).unwrap();

    let events = tokio::time::timeout(Duration::from_secs(10), drain(&mut session))
        .await
        .unwrap();
    assert!(events.is_empty());
}

#[tokio::test]
async fn test_bridge_say_holds_back_other_events() {
    let script = r#"
read say
echo '{"type": "ON_CONVERSATION_TURN_FINISHED"}'
echo '{"type": "say_finished"}'
"#;
    let mut session = spawn_engine(script, "");
    let speaker = session.speaker();

    let run = async {
        speaker.say("My IP address is 10.0.0.4").await.unwrap();
        assert_eq!(
            session.next_event().await.unwrap(),
            Some(AssistantEvent::TurnFinished)
        );
        assert_eq!(session.next_event().await.unwrap(), None);
    };
    tokio::time::timeout(Duration::from_secs(10), run)
        .await
        .expect("engine script hung");
}

#[tokio::test]
async fn test_bridge_say_fails_when_engine_exits() {
    let session = spawn_engine("read say", "");
    let speaker = session.speaker();

    let result = tokio::time::timeout(Duration::from_secs(10), speaker.say("hello"))
        .await
        .unwrap();
    assert!(matches!(result, Err(Error::Assistant(_))), "{result:?}");
}

#[tokio::test]
async fn test_bridge_say_times_out_without_ack() {
    let session = spawn_engine("read say; sleep 5", "");
    let speaker = session.speaker().with_timeout(Duration::from_millis(200));

    let result = speaker.say("hello").await;
    assert!(matches!(result, Err(Error::Timeout(_))), "{result:?}");
}

/// Records whether the engine had finished the farewell when shutdown ran
struct MarkerSystem {
    marker: PathBuf,
    farewell_done: Mutex<Option<bool>>,
}

#[async_trait]
impl SystemControl for MarkerSystem {
    async fn shutdown(&self) -> Result<()> {
        *self.farewell_done.lock().unwrap() = Some(self.marker.exists());
        Ok(())
    }

    async fn reboot(&self) -> Result<()> {
        Ok(())
    }

    async fn primary_ipv4(&self) -> Result<Option<Ipv4Addr>> {
        Ok(None)
    }
}

#[tokio::test]
async fn test_power_off_waits_for_engine_farewell() {
    // The engine takes a while to play the text, then marks it done
    let script = r#"
read say
sleep 0.3
: > "$1"
echo '{"type": "say_finished"}'
"#;
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("farewell-played");
    let session = spawn_engine(script, &marker.display().to_string());

    let speaker: Arc<dyn Speaker> = Arc::new(session.speaker());
    let system = Arc::new(MarkerSystem {
        marker,
        farewell_done: Mutex::new(None),
    });
    let remote = RemoteControl::new(
        Arc::new(HubConfig::default()),
        Arc::clone(&speaker),
        "notify",
    );
    let runner = CommandRunner::new(
        speaker,
        Arc::clone(&system) as Arc<dyn SystemControl>,
        remote,
        CommandsConfig::default(),
    );

    let invocation = Invocation {
        command: Command::PowerOff,
        text: "power off".to_string(),
        trigger: "power off".to_string(),
    };
    tokio::time::timeout(Duration::from_secs(10), runner.run(&invocation))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(*system.farewell_done.lock().unwrap(), Some(true));
}
