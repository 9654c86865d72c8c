use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use hearth::commands::compose_state_reply;
use hearth::daemon::{self, Outcome, SessionMode};
use hearth::{CommandTable, Config, Daemon, HomeAssistantClient, HubApi};

/// Hearth - Voice commands for a home-automation hub
#[derive(Parser)]
#[command(name = "hearth", version, about)]
struct Cli {
    /// Config file (default: ~/.config/hearth/config.toml)
    #[arg(short, long, env = "HEARTH_CONFIG")]
    config: Option<PathBuf>,

    /// Read utterances from stdin instead of the assistant engine
    #[arg(long)]
    console: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Speak text through the configured speech output
    Say {
        /// Text to speak
        text: String,
    },
    /// Read an entity from the hub and print the spoken reply
    State {
        /// Entity id (e.g., sensor.outside_temperature)
        entity_id: String,
    },
    /// Show which command an utterance would run
    Match {
        /// Utterance text
        text: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // RUST_LOG wins over -v
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(match cli.verbose {
            0 => "info,hearth=info",
            1 => "info,hearth=debug",
            2 => "debug",
            _ => "trace",
        })
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(outcome) => ExitCode::from(outcome.exit_code()),
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<Outcome> {
    let config = Config::load(cli.config.as_deref())?;
    tracing::debug!(?config, "loaded configuration");

    if let Some(cmd) = cli.command {
        match cmd {
            Command::Say { text } => cmd_say(&config, &text).await?,
            Command::State { entity_id } => cmd_state(&config, &entity_id).await?,
            Command::Match { text } => cmd_match(&config, &text),
        }
        return Ok(Outcome::Ended);
    }

    let mode = if cli.console {
        SessionMode::Console
    } else {
        SessionMode::Bridge
    };

    tracing::info!(?mode, hotword = %config.assistant.hotword, "starting hearth");

    let outcome = Daemon::new(config, mode).run().await?;
    tracing::info!(?outcome, "hearth stopped");
    Ok(outcome)
}

/// Speak text through the configured output
async fn cmd_say(config: &Config, text: &str) -> anyhow::Result<()> {
    let speaker = daemon::build_speaker(&config.speech, None, false)?;
    speaker.say(text).await?;
    Ok(())
}

/// Read an entity and print what would be spoken
async fn cmd_state(config: &Config, entity_id: &str) -> anyhow::Result<()> {
    let client = HomeAssistantClient::new(&config.hub)?;
    let state = client.get_state(entity_id).await?;
    println!("{}", compose_state_reply(&state));
    Ok(())
}

/// Print the command an utterance maps to
fn cmd_match(config: &Config, text: &str) {
    let table = CommandTable::with_aliases(&config.commands.notify_keyword, &config.commands.aliases);
    match table.lookup(text) {
        Some(invocation) => {
            println!("{} (trigger: \"{}\")", invocation.command, invocation.trigger);
            if !invocation.remainder().is_empty() {
                println!("  remainder: {}", invocation.remainder());
            }
        }
        None => println!("no command matches \"{text}\""),
    }
}
