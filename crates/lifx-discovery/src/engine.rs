//! UDP broadcast discovery

use bytes::Bytes;
use lifx_client::{Device, SessionConfig};
use lifx_core::{codec, Header, MacAddress, Message, DEFAULT_PORT, SERVICE_UDP};
use lifx_transport::{TransportEvent, UdpReceiver, UdpTransport};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use crate::error::Result;
use crate::ipv6::Ipv6Prefix;
use crate::liveness::LivenessTracker;
use crate::registry::DeviceRegistry;
use crate::DiscoveryConfig;

/// Devices known to a running engine, by hardware address
pub(crate) type KnownDevices = Arc<RwLock<HashMap<MacAddress, Device>>>;

/// A device advertising its unicast address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Sighting {
    pub mac: MacAddress,
    pub addr: SocketAddr,
}

pub(crate) enum Command {
    DiscoverNow,
    Shutdown(oneshot::Sender<()>),
}

/// Tagged GetService asking every device for its service list
pub(crate) fn get_service_frame(source: u32) -> Result<Bytes> {
    let header = Header::broadcast(source).with_res_required(true);
    Ok(codec::encode(&header, &Message::GetService)?)
}

/// Extract a sighting from a discovery reply or a power-up announcement
pub(crate) fn sighting(
    data: &[u8],
    from: SocketAddr,
    prefix: Option<&Ipv6Prefix>,
) -> Option<Sighting> {
    let (header, message) = match codec::decode(data) {
        Ok(decoded) => decoded,
        Err(e) => {
            trace!("Ignoring {} bytes from {}: {}", data.len(), from, e);
            return None;
        }
    };

    let mac = header.target;
    if mac.is_broadcast() {
        return None;
    }

    let port = match message {
        Message::StateService { service, port } if service == SERVICE_UDP => {
            match u16::try_from(port) {
                Ok(port) if port != 0 => port,
                _ => {
                    debug!("{} advertised unusable port {}", mac, port);
                    return None;
                }
            }
        }
        Message::LightState(_) => DEFAULT_PORT,
        _ => return None,
    };

    let addr = match prefix {
        Some(prefix) => prefix.socket_addr(mac, port),
        None => SocketAddr::new(from.ip(), port),
    };

    Some(Sighting { mac, addr })
}

pub(crate) struct Engine<R> {
    pub(crate) session: SessionConfig,
    pub(crate) interval: Duration,
    pub(crate) broadcast_addr: SocketAddr,
    pub(crate) prefix: Option<Ipv6Prefix>,
    pub(crate) get_service: Bytes,
    pub(crate) transport: UdpTransport,
    pub(crate) registry: R,
    pub(crate) tracker: LivenessTracker,
    pub(crate) known: KnownDevices,
    pub(crate) last_sweep: Instant,
}

impl<R: DeviceRegistry> Engine<R> {
    pub(crate) async fn run(
        mut self,
        mut receiver: UdpReceiver,
        mut commands: mpsc::UnboundedReceiver<Command>,
    ) {
        let mut ticker = time::interval(self.interval.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            "Discovery probing {} every {:?}",
            self.broadcast_addr, self.interval
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.sweep();
                    self.send_get_service().await;
                }
                event = receiver.recv_from() => match event {
                    Some((TransportEvent::Data(data), from)) => {
                        self.handle_datagram(&data, from).await;
                    }
                    Some((TransportEvent::Error(e), _)) => {
                        debug!("Discovery receive error: {}", e);
                    }
                    None => {
                        warn!("Discovery socket closed");
                        break;
                    }
                },
                command = commands.recv() => match command {
                    Some(Command::DiscoverNow) => self.send_get_service().await,
                    Some(Command::Shutdown(done)) => {
                        self.shutdown();
                        let _ = done.send(());
                        return;
                    }
                    None => break,
                },
            }
        }

        self.transport.close();
        debug!("Discovery stopped");
    }

    async fn send_get_service(&mut self) {
        match self.transport.send_to(&self.get_service, self.broadcast_addr).await {
            Ok(()) => debug!("Discovery broadcast sent to {}", self.broadcast_addr),
            Err(e) => warn!("Discovery broadcast to {} failed: {}", self.broadcast_addr, e),
        }
    }

    async fn handle_datagram(&mut self, data: &[u8], from: SocketAddr) {
        let Some(Sighting { mac, addr }) = sighting(data, from, self.prefix.as_ref()) else {
            return;
        };

        let existing = self.known.read().get(&mac).cloned();
        if let Some(device) = existing {
            if !device.is_closed() {
                if device.addr() != addr {
                    info!("{} moved {} -> {}", mac, device.addr(), addr);
                    device.set_addr(addr);
                }
                device.touch();
                self.tracker.observe(mac);
                return;
            }
            // Closed by the host; start over with a fresh session.
            self.evict(mac);
        }

        match Device::open(mac, addr, self.session.clone()).await {
            Ok(device) => {
                info!("Discovered {} at {}", mac, addr);
                self.tracker.observe(mac);
                self.known.write().insert(mac, device.clone());
                self.registry.register(device);
            }
            Err(e) => warn!("Failed to open session with {} at {}: {}", mac, addr, e),
        }
    }

    /// End of cycle: count session traffic, then evict stale devices
    fn sweep(&mut self) {
        let since = std::mem::replace(&mut self.last_sweep, Instant::now());

        for (mac, device) in self.known.read().iter() {
            if device.last_seen() > since {
                self.tracker.observe(*mac);
            }
        }

        for mac in self.tracker.sweep() {
            info!(
                "{} silent for {} cycles, unregistering",
                mac,
                self.tracker.threshold()
            );
            self.evict(mac);
        }
    }

    fn evict(&mut self, mac: MacAddress) {
        self.tracker.forget(&mac);
        let removed = self.known.write().remove(&mac);
        if let Some(device) = removed {
            device.close();
            self.registry.unregister(device);
        }
    }

    fn shutdown(&mut self) {
        let macs: Vec<MacAddress> = self.known.read().keys().copied().collect();
        for mac in macs {
            self.evict(mac);
        }
        self.transport.close();
        info!("Discovery shut down");
    }
}

/// Broadcast once and collect every device that answers within `wait`.
///
/// No sessions are opened.
pub async fn scan(config: &DiscoveryConfig, wait: Duration) -> Result<Vec<Sighting>> {
    let prefix = config.prefix()?;
    let frame = get_service_frame(config.session.source)?;

    let transport = UdpTransport::bind_broadcast(&config.bind_addr.to_string()).await?;
    let mut receiver = transport.start_receiver();
    transport.send_to(&frame, config.broadcast_addr).await?;
    debug!("Scan broadcast sent to {}", config.broadcast_addr);

    let deadline = time::Instant::now() + wait;
    let mut found: Vec<Sighting> = Vec::new();

    loop {
        match time::timeout_at(deadline, receiver.recv_from()).await {
            Ok(Some((TransportEvent::Data(data), from))) => {
                if let Some(seen) = sighting(&data, from, prefix.as_ref()) {
                    if !found.iter().any(|s| s.mac == seen.mac) {
                        debug!("Scan found {} at {}", seen.mac, seen.addr);
                        found.push(seen);
                    }
                }
            }
            Ok(Some((TransportEvent::Error(e), _))) => debug!("Scan receive error: {}", e),
            Ok(None) | Err(_) => break,
        }
    }

    transport.close();
    info!("Scan finished with {} device(s)", found.len());
    Ok(found)
}
