//! # Offline Simulator
//!
//! Stands in for the drone when no network is available. Every command is
//! answered on an in-process channel and a fixed telemetry frame is pushed
//! once per second, so the whole engine can be exercised at a desk.

use async_trait::async_trait;
use std::io;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval, Interval, MissedTickBehavior};
use tracing::debug;

use super::transport::{CommandLink, DatagramSource};
use crate::protocol::response::{ACK, QUERY_BATTERY, QUERY_SDK, QUERY_WIFI};

/// Frame pushed by [`SimulatedTelemetry`].
pub const SIMULATED_FRAME: &str = "mid:-1;x:0;y:0;z:0;mpry:0,0,0;pitch:-1;roll:0;yaw:0;vgx:0;vgy:0;vgz:0;templ:51;temph:54;tof:10;h:0;bat:88;baro:38.28;time:0;agx:-13.00;agy:-5.00;agz:-998.00;";

/// Period of [`SimulatedTelemetry`].
pub const SIMULATED_FRAME_PERIOD: Duration = Duration::from_secs(1);

/// Reply the simulator gives to `command`.
///
/// # Examples
///
/// ```
/// use tello_console::link::offline::simulated_reply;
///
/// assert_eq!(simulated_reply("takeoff"), Some("ok"));
/// assert_eq!(simulated_reply("battery?"), Some("88"));
/// assert_eq!(simulated_reply("rc 0 0 0 0"), None);
/// ```
#[must_use]
pub fn simulated_reply(command: &str) -> Option<&'static str> {
    match command.trim() {
        QUERY_BATTERY => Some("88"),
        QUERY_WIFI => Some("90"),
        QUERY_SDK => Some("30"),
        c if c.starts_with("rc ") => None,
        _ => Some(ACK),
    }
}

/// Create the offline link and the source its replies arrive on.
#[must_use]
pub fn offline_link() -> (OfflineLink, OfflineReplies) {
    let (tx, rx) = mpsc::unbounded_channel();
    (OfflineLink { replies: tx }, OfflineReplies { replies: rx })
}

/// Command link that answers locally
#[derive(Debug, Clone)]
pub struct OfflineLink {
    replies: mpsc::UnboundedSender<Vec<u8>>,
}

#[async_trait]
impl CommandLink for OfflineLink {
    async fn send(&self, data: &[u8]) -> io::Result<usize> {
        let command = String::from_utf8_lossy(data);
        debug!("offline: {}", command);
        if let Some(reply) = simulated_reply(&command) {
            self.replies
                .send(reply.as_bytes().to_vec())
                .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "offline reply channel closed"))?;
        }
        Ok(data.len())
    }
}

/// Replies produced by [`OfflineLink`]
#[derive(Debug)]
pub struct OfflineReplies {
    replies: mpsc::UnboundedReceiver<Vec<u8>>,
}

#[async_trait]
impl DatagramSource for OfflineReplies {
    async fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let data = self
            .replies
            .recv()
            .await
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "offline link dropped"))?;
        let len = data.len().min(buf.len());
        buf[..len].copy_from_slice(&data[..len]);
        Ok(len)
    }
}

/// Telemetry source pushing [`SIMULATED_FRAME`] periodically
#[derive(Debug)]
pub struct SimulatedTelemetry {
    ticker: Interval,
}

impl SimulatedTelemetry {
    pub fn new(period: Duration) -> Self {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { ticker }
    }
}

impl Default for SimulatedTelemetry {
    fn default() -> Self {
        Self::new(SIMULATED_FRAME_PERIOD)
    }
}

#[async_trait]
impl DatagramSource for SimulatedTelemetry {
    async fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.ticker.tick().await;
        let data = SIMULATED_FRAME.as_bytes();
        let len = data.len().min(buf.len());
        buf[..len].copy_from_slice(&data[..len]);
        Ok(len)
    }
}
