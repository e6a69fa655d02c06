//! UDP transport implementation

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use socket2::{Domain, Protocol, Socket, Type};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::error::{Result, TransportError};
use crate::traits::{TransportEvent, TransportSender};

/// UDP configuration
#[derive(Debug, Clone)]
pub struct UdpConfig {
    /// Largest datagram the receive loop accepts
    pub max_packet_size: usize,
    /// Capacity of the channel between the receive loop and its consumer
    pub channel_capacity: usize,
    /// Enable `SO_BROADCAST`
    pub broadcast: bool,
    /// Enable `SO_REUSEADDR`
    pub reuse_address: bool,
}

impl Default for UdpConfig {
    fn default() -> Self {
        Self {
            max_packet_size: 65507,
            channel_capacity: 256,
            broadcast: false,
            reuse_address: false,
        }
    }
}

impl UdpConfig {
    /// Settings for discovery sockets
    pub fn broadcast() -> Self {
        Self {
            broadcast: true,
            reuse_address: true,
            ..Self::default()
        }
    }
}

/// UDP socket shared by a receive loop and any number of senders
pub struct UdpTransport {
    socket: Arc<UdpSocket>,
    config: UdpConfig,
    open: Arc<Mutex<bool>>,
    receiver_task: Mutex<Option<JoinHandle<()>>>,
}

impl UdpTransport {
    /// Bind to a local address
    pub async fn bind(addr: &str) -> Result<Self> {
        Self::bind_with_config(addr, UdpConfig::default()).await
    }

    /// Bind a broadcast-capable socket
    pub async fn bind_broadcast(addr: &str) -> Result<Self> {
        Self::bind_with_config(addr, UdpConfig::broadcast()).await
    }

    /// Bind with config
    pub async fn bind_with_config(addr: &str, config: UdpConfig) -> Result<Self> {
        let local: SocketAddr = addr
            .parse()
            .map_err(|_| TransportError::InvalidAddress(addr.to_string()))?;

        let socket = create_socket(local, &config)
            .map_err(|e| TransportError::BindFailed(format!("{}: {}", addr, e)))?;
        let socket = UdpSocket::from_std(socket)?;

        info!("UDP bound to {}", socket.local_addr()?);

        Ok(Self {
            socket: Arc::new(socket),
            config,
            open: Arc::new(Mutex::new(true)),
            receiver_task: Mutex::new(None),
        })
    }

    /// Get local address
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.socket.local_addr().map_err(TransportError::Io)
    }

    /// Create a sender for a specific remote address
    pub fn sender_to(&self, remote: SocketAddr) -> UdpSender {
        UdpSender {
            socket: self.socket.clone(),
            remote: Arc::new(Mutex::new(remote)),
            open: self.open.clone(),
        }
    }

    /// Start receiving packets.
    ///
    /// Replaces any previous receive loop on this socket.
    pub fn start_receiver(&self) -> UdpReceiver {
        let (tx, rx) = mpsc::channel(self.config.channel_capacity);
        let socket = self.socket.clone();
        let max_size = self.config.max_packet_size;

        let task = tokio::spawn(async move {
            let mut buf = vec![0u8; max_size];

            loop {
                match socket.recv_from(&mut buf).await {
                    Ok((len, from)) => {
                        trace!("UDP received {} bytes from {}", len, from);
                        let data = Bytes::copy_from_slice(&buf[..len]);
                        if tx.send((TransportEvent::Data(data), from)).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        // ICMP port-unreachable from a previous send surfaces here
                        // on some platforms; the socket is still usable.
                        warn!("UDP receive error: {}", e);
                        let unspecified = SocketAddr::from(([0, 0, 0, 0], 0));
                        if tx
                            .send((TransportEvent::Error(e.to_string()), unspecified))
                            .await
                            .is_err()
                        {
                            break;
                        }
                    }
                }
            }
            debug!("UDP receive loop finished");
        });

        if let Some(previous) = self.receiver_task.lock().replace(task) {
            previous.abort();
        }

        UdpReceiver { rx }
    }

    /// Send to a specific address
    pub async fn send_to(&self, data: &[u8], target: SocketAddr) -> Result<()> {
        if !self.is_open() {
            return Err(TransportError::Closed);
        }
        self.socket
            .send_to(data, target)
            .await
            .map_err(|e| TransportError::SendFailed(format!("{}: {}", target, e)))?;
        Ok(())
    }

    /// Enable broadcast
    pub fn set_broadcast(&self, enable: bool) -> Result<()> {
        self.socket.set_broadcast(enable).map_err(TransportError::Io)
    }

    pub fn is_open(&self) -> bool {
        *self.open.lock()
    }

    /// Stop the receive loop and refuse further sends. Idempotent.
    pub fn close(&self) {
        let was_open = std::mem::replace(&mut *self.open.lock(), false);
        if let Some(task) = self.receiver_task.lock().take() {
            task.abort();
        }
        if was_open {
            debug!("UDP transport closed");
        }
    }
}

impl Drop for UdpTransport {
    fn drop(&mut self) {
        if let Some(task) = self.receiver_task.get_mut().take() {
            task.abort();
        }
    }
}

fn create_socket(addr: SocketAddr, config: &UdpConfig) -> std::io::Result<std::net::UdpSocket> {
    let socket = Socket::new(Domain::for_address(addr), Type::DGRAM, Some(Protocol::UDP))?;
    if config.reuse_address {
        socket.set_reuse_address(true)?;
    }
    if config.broadcast {
        socket.set_broadcast(true)?;
    }
    socket.bind(&addr.into())?;
    socket.set_nonblocking(true)?;
    Ok(socket.into())
}

/// UDP sender for one device.
///
/// Clones share the remote address, so [`UdpSender::set_remote`] is seen by
/// every clone.
#[derive(Clone)]
pub struct UdpSender {
    socket: Arc<UdpSocket>,
    remote: Arc<Mutex<SocketAddr>>,
    open: Arc<Mutex<bool>>,
}

impl UdpSender {
    /// Point the sender at a new address
    pub fn set_remote(&self, remote: SocketAddr) {
        let mut current = self.remote.lock();
        if *current != remote {
            debug!("UDP remote changed {} -> {}", *current, remote);
            *current = remote;
        }
    }
}

#[async_trait]
impl TransportSender for UdpSender {
    async fn send(&self, data: Bytes) -> Result<()> {
        if !self.is_open() {
            return Err(TransportError::Closed);
        }
        let remote = self.remote();
        self.socket
            .send_to(&data, remote)
            .await
            .map_err(|e| TransportError::SendFailed(format!("{}: {}", remote, e)))?;
        Ok(())
    }

    fn remote(&self) -> SocketAddr {
        *self.remote.lock()
    }

    fn is_open(&self) -> bool {
        *self.open.lock()
    }

    async fn close(&self) -> Result<()> {
        *self.open.lock() = false;
        Ok(())
    }
}

/// UDP receiver
pub struct UdpReceiver {
    rx: mpsc::Receiver<(TransportEvent, SocketAddr)>,
}

impl UdpReceiver {
    /// Receive the next event with source address.
    ///
    /// Returns `None` once the receive loop has stopped.
    pub async fn recv_from(&mut self) -> Option<(TransportEvent, SocketAddr)> {
        self.rx.recv().await
    }
}
