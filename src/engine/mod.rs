//! # Engine Module
//!
//! The concurrent protocol engine.
//!
//! This module handles:
//! - Shared, synchronized state for all activities
//! - The command queue and the single command dispatcher
//! - The scheduler (keepalive, periodic sampling, sleep expiry)
//! - Telemetry and response receivers
//! - The main dispatch loop and cooperative shutdown
//!
//! ## Activities
//!
//! ```text
//!  lines/keys ──► DispatchLoop ──┐
//!                                ├──► CommandDispatcher ──► CommandLink
//!                  Scheduler ────┘
//!
//!  telemetry source ──► telemetry receiver ──► DeviceState / WatchLog
//!  response source  ──► response receiver  ──► DeviceInfo / readiness
//! ```

pub mod dispatch_loop;
pub mod dispatcher;
pub mod queue;
pub mod receiver;
pub mod scheduler;
pub mod shared;

use std::io::Write;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::control::console::{KeySource, LineSource};
use crate::control::input_mode::InputState;
use crate::error::Result;
use crate::link::offline::{offline_link, SimulatedTelemetry};
use crate::link::transport::{CommandLink, DatagramSource};
use crate::link::DroneSockets;
use crate::logging::LogLevelHandle;
use crate::script::{FileScripts, ScriptSource};
use crate::telemetry::watch::WatchFormat;
use dispatch_loop::DispatchLoop;
use dispatcher::CommandDispatcher;
use queue::Placement;
use scheduler::Scheduler;
use shared::{SharedState, Timers};

/// Outbound link plus the two inbound datagram streams.
pub struct EngineLinks {
    pub commands: Arc<dyn CommandLink>,
    pub responses: Box<dyn DatagramSource>,
    pub telemetry: Box<dyn DatagramSource>,
}

impl EngineLinks {
    /// Bind the drone sockets.
    ///
    /// # Errors
    ///
    /// Returns an error if either socket cannot be bound.
    pub async fn online(config: &Config) -> Result<Self> {
        let sockets = DroneSockets::bind(&config.network).await?;
        Ok(Self {
            commands: Arc::new(sockets.command_link()),
            responses: Box::new(sockets.response_source()),
            telemetry: Box::new(sockets.telemetry_source()),
        })
    }

    /// Simulated drone; must be called inside a tokio runtime.
    #[must_use]
    pub fn offline() -> Self {
        let (link, replies) = offline_link();
        Self {
            commands: Arc::new(link),
            responses: Box::new(replies),
            telemetry: Box::new(SimulatedTelemetry::default()),
        }
    }
}

/// The protocol engine, built once at startup and consumed by [`Engine::run`].
pub struct Engine {
    config: Config,
    shared: Arc<SharedState>,
    dispatcher: Arc<CommandDispatcher>,
    links: EngineLinks,
    scripts: Box<dyn ScriptSource>,
    log_level: Option<LogLevelHandle>,
}

impl Engine {
    pub fn new(config: Config, links: EngineLinks, console: Box<dyn Write + Send>) -> Self {
        let keepalive = config.timing.keepalive_interval();
        let timers = Timers::new(Instant::now(), keepalive, config.watch.period_s);
        let format = WatchFormat {
            decimal_comma: config.watch.decimal_comma,
            column_width: config.watch.column_width,
        };

        let shared = Arc::new(SharedState::new(format, timers, console));
        shared.watch().set_selection(config.watch.keys.clone());
        let dispatcher = Arc::new(CommandDispatcher::new(links.commands.clone(), shared.clone(), keepalive));

        Self {
            config,
            shared,
            dispatcher,
            links,
            scripts: Box::new(FileScripts),
            log_level: None,
        }
    }

    #[must_use]
    pub fn with_scripts(mut self, scripts: Box<dyn ScriptSource>) -> Self {
        self.scripts = scripts;
        self
    }

    #[must_use]
    pub fn with_log_level(mut self, handle: LogLevelHandle) -> Self {
        self.log_level = Some(handle);
        self
    }

    pub fn shared(&self) -> Arc<SharedState> {
        self.shared.clone()
    }

    /// Add commands to the queue before the engine starts.
    pub fn enqueue<I, S>(&self, lines: I, placement: Placement)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.shared.queue().load(lines, placement);
    }

    /// Run every activity until `end`, end of input or [`SharedState::stop`],
    /// then flush the watch log and wait up to the grace delay for the
    /// background tasks.
    pub async fn run<L, K>(self, lines: L, keys: K)
    where
        L: LineSource,
        K: KeySource,
    {
        let Engine {
            config,
            shared,
            dispatcher,
            links,
            scripts,
            log_level,
        } = self;
        let network = &config.network;

        let tasks: Vec<(&'static str, JoinHandle<()>)> = vec![
            (
                "telemetry",
                tokio::spawn(receiver::telemetry_loop(
                    links.telemetry,
                    shared.clone(),
                    network.recv_buffer_size,
                    network.recv_timeout(),
                )),
            ),
            (
                "response",
                tokio::spawn(receiver::response_loop(
                    links.responses,
                    shared.clone(),
                    network.recv_buffer_size,
                    network.recv_timeout(),
                )),
            ),
            (
                "scheduler",
                tokio::spawn(
                    Scheduler::new(shared.clone(), dispatcher.clone(), config.timing.scheduler_tick()).run(),
                ),
            ),
        ];
        info!("Engine started");

        DispatchLoop::new(
            shared.clone(),
            dispatcher,
            InputState::new(&config.control),
            lines,
            keys,
            scripts,
            config.timing.loop_tick(),
        )
        .with_log_level(log_level)
        .run()
        .await;

        shared.stop();
        match shared.flush_watch_log() {
            Ok(0) => {}
            Ok(count) => info!("Flushed {} watch records", count),
            Err(e) => warn!("Failed to flush watch log: {}", e),
        }

        let deadline = tokio::time::Instant::now() + config.timing.shutdown_grace();
        for (name, mut handle) in tasks {
            match tokio::time::timeout_at(deadline, &mut handle).await {
                Ok(Ok(())) => debug!("{} task finished", name),
                Ok(Err(e)) => warn!("{} task failed: {}", name, e),
                Err(_) => {
                    warn!("{} task still running after grace delay, aborting", name);
                    handle.abort();
                }
            }
        }
        info!("Engine stopped");
    }
}
