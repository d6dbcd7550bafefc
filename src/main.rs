//! # Tello Console
//!
//! Fly a Tello from the terminal.
//!
//! Typed lines are sent to the drone as SDK commands; `key` and `joystick`
//! switch to single-key control. Scripts queue commands that are sent one
//! per acknowledgement, and `watch` records selected telemetry fields.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use tello_console::config::Config;
use tello_console::control::console::{StdinLines, TerminalKeys};
use tello_console::engine::queue::Placement;
use tello_console::engine::{Engine, EngineLinks};
use tello_console::logging;
use tello_console::protocol::command::STARTUP_COMMANDS;
use tello_console::script::read_script;

/// Command line options; each overrides the matching config value.
#[derive(Parser, Debug)]
#[command(name = "tello-console", version, about = "Console client for the Tello SDK")]
struct Cli {
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Drone IP address
    #[arg(long)]
    ip: Option<String>,

    /// Script to run after the startup commands
    #[arg(short, long)]
    script: Option<PathBuf>,

    /// Telemetry keys to watch, e.g. "bat baro h"
    #[arg(short, long)]
    watch: Option<String>,

    /// Run against a simulated drone
    #[arg(short, long)]
    offline: bool,

    /// Log level: 0 error, 1 info, 2 debug, 3 trace
    #[arg(short, long)]
    debug: Option<u8>,
}

/// Load the config file (or defaults), apply command line overrides and
/// validate the result.
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::default(),
    };

    if let Some(ip) = &cli.ip {
        config.network.drone_ip = ip.clone();
    }
    if let Some(keys) = &cli.watch {
        config.watch.keys = keys.split_whitespace().map(str::to_string).collect();
    }
    if let Some(level) = cli.debug {
        config.logging.level = level;
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let logging = logging::init(&config.logging)?;

    info!("Tello Console v{} starting...", env!("CARGO_PKG_VERSION"));

    let startup_script = match &cli.script {
        Some(path) => Some(
            read_script(path).with_context(|| format!("Failed to read script {}", path.display()))?,
        ),
        None => None,
    };

    let links = if cli.offline {
        info!("Offline mode, using a simulated drone");
        EngineLinks::offline()
    } else {
        EngineLinks::online(&config).await?
    };

    let engine = Engine::new(config, links, Box::new(std::io::stdout())).with_log_level(logging.level.clone());
    engine.enqueue(STARTUP_COMMANDS, Placement::Back);
    if let Some(lines) = startup_script {
        info!("Queued {} script commands", lines.len());
        engine.enqueue(lines, Placement::Back);
    }

    let shared = engine.shared();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, shutting down...");
            shared.stop();
        }
    });

    engine.run(StdinLines::new(), TerminalKeys::new()).await;
    Ok(())
}
