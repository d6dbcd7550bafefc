//! # Link Module
//!
//! UDP plumbing between the console and the drone.
//!
//! This module handles:
//! - Binding the command socket (replies arrive on the same socket)
//! - Binding the telemetry socket the drone pushes state frames to
//! - The [`transport::CommandLink`] / [`transport::DatagramSource`] seams
//! - An offline simulator used when no drone is reachable

pub mod offline;
pub mod transport;

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tokio::net::UdpSocket;
use tracing::{debug, info};

use crate::config::NetworkConfig;
use crate::error::{Result, TelloError};
use transport::{UdpCommandLink, UdpSource};

/// Sockets of an online session
///
/// Dropping this closes both sockets.
#[derive(Debug)]
pub struct DroneSockets {
    command: Arc<UdpSocket>,
    state: Arc<UdpSocket>,
    target: SocketAddr,
}

impl DroneSockets {
    /// Bind the command and telemetry sockets
    ///
    /// # Errors
    ///
    /// Returns error if the drone address is invalid or a port is in use
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use tello_console::config::NetworkConfig;
    /// use tello_console::link::DroneSockets;
    ///
    /// #[tokio::main]
    /// async fn main() -> anyhow::Result<()> {
    ///     let sockets = DroneSockets::bind(&NetworkConfig::default()).await?;
    ///     println!("Talking to {}", sockets.target());
    ///     Ok(())
    /// }
    /// ```
    pub async fn bind(config: &NetworkConfig) -> Result<Self> {
        let target = config.command_addr()?;

        let command = Self::bind_port(config.local_command_port).await?;
        let state = Self::bind_port(config.state_port).await?;

        info!(
            "Command channel {} -> {}, telemetry on port {}",
            config.local_command_port, target, config.state_port
        );

        Ok(Self {
            command: Arc::new(command),
            state: Arc::new(state),
            target,
        })
    }

    async fn bind_port(port: u16) -> Result<UdpSocket> {
        let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
        debug!("Binding UDP socket {}", addr);
        UdpSocket::bind(addr)
            .await
            .map_err(|e| TelloError::Network(format!("Failed to bind {}: {}", addr, e)))
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }

    /// Link used by the dispatcher to send commands
    pub fn command_link(&self) -> UdpCommandLink {
        UdpCommandLink::new(self.command.clone(), self.target)
    }

    /// Replies to commands
    pub fn response_source(&self) -> UdpSource {
        UdpSource::new(self.command.clone())
    }

    /// Telemetry frames
    pub fn telemetry_source(&self) -> UdpSource {
        UdpSource::new(self.state.clone())
    }
}
