//! Trait abstraction for UDP datagram I/O to enable testing

use async_trait::async_trait;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;

/// Outbound side of the command channel
#[async_trait]
pub trait CommandLink: Send + Sync {
    /// Send one datagram to the drone, returning the number of bytes sent
    async fn send(&self, data: &[u8]) -> io::Result<usize>;
}

/// Inbound datagrams (command replies or telemetry frames)
#[async_trait]
pub trait DatagramSource: Send {
    /// Receive one datagram into `buf`, returning its length
    async fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

/// Command link over a shared UDP socket
#[derive(Debug, Clone)]
pub struct UdpCommandLink {
    socket: Arc<UdpSocket>,
    target: SocketAddr,
}

impl UdpCommandLink {
    pub fn new(socket: Arc<UdpSocket>, target: SocketAddr) -> Self {
        Self { socket, target }
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }
}

#[async_trait]
impl CommandLink for UdpCommandLink {
    async fn send(&self, data: &[u8]) -> io::Result<usize> {
        self.socket.send_to(data, self.target).await
    }
}

/// Datagram source reading from a UDP socket, whatever the sender
#[derive(Debug, Clone)]
pub struct UdpSource {
    socket: Arc<UdpSocket>,
}

impl UdpSource {
    pub fn new(socket: Arc<UdpSocket>) -> Self {
        Self { socket }
    }
}

#[async_trait]
impl DatagramSource for UdpSource {
    async fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let (len, _from) = self.socket.recv_from(buf).await?;
        Ok(len)
    }
}

#[cfg(test)]
pub mod mocks {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Mock command link for testing
    #[derive(Clone, Default)]
    pub struct MockLink {
        pub sent: Arc<Mutex<Vec<String>>>,
        pub send_error: Arc<Mutex<Option<io::ErrorKind>>>,
    }

    impl MockLink {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn sent(&self) -> Vec<String> {
            self.sent.lock().unwrap().clone()
        }

        pub fn set_send_error(&self, error: io::ErrorKind) {
            *self.send_error.lock().unwrap() = Some(error);
        }
    }

    #[async_trait]
    impl CommandLink for MockLink {
        async fn send(&self, data: &[u8]) -> io::Result<usize> {
            if let Some(error) = *self.send_error.lock().unwrap() {
                return Err(io::Error::new(error, "Mock send error"));
            }
            self.sent
                .lock()
                .unwrap()
                .push(String::from_utf8_lossy(data).into_owned());
            Ok(data.len())
        }
    }

    /// Datagram source replaying canned results, then pending forever
    #[derive(Default)]
    pub struct MockSource {
        pub datagrams: VecDeque<io::Result<Vec<u8>>>,
    }

    impl MockSource {
        pub fn new(datagrams: Vec<io::Result<Vec<u8>>>) -> Self {
            Self {
                datagrams: datagrams.into(),
            }
        }
    }

    #[async_trait]
    impl DatagramSource for MockSource {
        async fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.datagrams.pop_front() {
                Some(Ok(data)) => {
                    let len = data.len().min(buf.len());
                    buf[..len].copy_from_slice(&data[..len]);
                    Ok(len)
                }
                Some(Err(e)) => Err(e),
                None => std::future::pending().await,
            }
        }
    }
}
