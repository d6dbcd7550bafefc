//! # Command Dispatcher
//!
//! The only writer of the command channel. Each send records the command,
//! clears readiness (except for continuous `rc` updates) and pushes the
//! keepalive deadline out by one interval. Failed sends are reported, never
//! retried.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

use super::shared::SharedState;
use crate::error::{Result, TelloError};
use crate::link::transport::CommandLink;
use crate::protocol::command::is_continuous;

/// Sends command strings to the drone.
pub struct CommandDispatcher {
    link: Arc<dyn CommandLink>,
    shared: Arc<SharedState>,
    keepalive_interval: Duration,
}

impl std::fmt::Debug for CommandDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandDispatcher")
            .field("keepalive_interval", &self.keepalive_interval)
            .finish_non_exhaustive()
    }
}

impl CommandDispatcher {
    pub fn new(link: Arc<dyn CommandLink>, shared: Arc<SharedState>, keepalive_interval: Duration) -> Self {
        Self {
            link,
            shared,
            keepalive_interval,
        }
    }

    /// Send one command.
    ///
    /// # Errors
    ///
    /// Returns [`TelloError::Network`] if the datagram could not be sent.
    /// Readiness and the last command are updated either way.
    pub async fn send(&self, command: &str) -> Result<usize> {
        self.shared.set_last_command(command);
        if !is_continuous(command) {
            self.shared.set_ready(false);
        }
        debug!("{}", command);

        let result = self.link.send(command.as_bytes()).await;
        self.shared.timers().keepalive = Instant::now() + self.keepalive_interval;

        match result {
            Ok(sent) => {
                trace!("{}: {} bytes sent", command, sent);
                Ok(sent)
            }
            Err(e) => {
                warn!("Failed to send '{}': {}", command, e);
                Err(TelloError::Network(format!("Failed to send '{}': {}", command, e)))
            }
        }
    }
}
