//! Timer loop: periodic telemetry sampling, deferred-wake expiry and
//! keepalive.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, trace};

use super::dispatcher::CommandDispatcher;
use super::shared::SharedState;
use crate::protocol::command::KEEPALIVE_COMMAND;

/// What a single tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub sampled: bool,
    pub woke: bool,
    pub keepalive: bool,
}

/// Runs the three independent timer checks on a fixed tick.
pub struct Scheduler {
    shared: Arc<SharedState>,
    dispatcher: Arc<CommandDispatcher>,
    period: Duration,
}

impl Scheduler {
    pub fn new(shared: Arc<SharedState>, dispatcher: Arc<CommandDispatcher>, period: Duration) -> Self {
        Self {
            shared,
            dispatcher,
            period,
        }
    }

    /// Run every check once against `now`.
    pub async fn tick(&self, now: Instant) -> TickReport {
        let mut report = TickReport::default();

        let keepalive_due = {
            let mut timers = self.shared.timers();

            if let Some(period) = timers.sample_period {
                if now >= timers.next_sample {
                    self.shared.request_frames(1);
                    timers.next_sample += period;
                    // Do not try to catch up after a stall.
                    if timers.next_sample < now {
                        timers.next_sample = now + period;
                    }
                    report.sampled = true;
                }
            }

            if matches!(timers.wake, Some(wake) if now >= wake) {
                timers.wake = None;
                report.woke = true;
            }

            now >= timers.keepalive
        };

        if report.woke {
            debug!("Sleep finished");
        }

        if keepalive_due {
            trace!("Link idle, sending keepalive");
            // The deadline is advanced even when the send fails.
            if let Err(e) = self.dispatcher.send(KEEPALIVE_COMMAND).await {
                debug!("Keepalive not delivered: {}", e);
            }
            report.keepalive = true;
        }

        report
    }

    /// Tick until shutdown is signalled.
    pub async fn run(self) {
        let mut shutdown = self.shared.shutdown_signal();
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        debug!("Scheduler started ({:?} tick)", self.period);
        while self.shared.is_running() {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick(Instant::now()).await;
                }
                _ = shutdown.changed() => break,
            }
        }
        debug!("Scheduler stopped");
    }
}
