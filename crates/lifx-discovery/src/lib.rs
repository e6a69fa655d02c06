//! LIFX Discovery
//!
//! Finds LIFX devices on the local network and keeps track of which ones
//! are still there:
//! - periodic tagged `GetService` broadcasts
//! - unsolicited `LightState` announcements from devices that just booted
//! - eviction after a number of silent discovery cycles
//! - optional IPv6 unicast addresses synthesized from a /64 prefix
//!
//! Each device found gets a [`Device`] session that is handed to the host's
//! [`DeviceRegistry`].

pub mod engine;
pub mod error;
pub mod ipv6;
pub mod liveness;
pub mod registry;

pub use engine::{scan, Sighting};
pub use error::{DiscoveryError, Result};
pub use ipv6::Ipv6Prefix;
pub use liveness::LivenessTracker;
pub use registry::{DeviceRegistry, DiscoveryEvent, NoRegistry};

use engine::{Command, Engine, KnownDevices};
use lifx_client::{Device, SessionConfig};
use lifx_core::{MacAddress, DEFAULT_PORT};
use lifx_transport::UdpTransport;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::info;

/// Time between discovery broadcasts
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(180);

/// Silent cycles before a device is dropped
pub const DEFAULT_STALENESS_CYCLES: u32 = 3;

/// Discovery configuration
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Time between broadcasts; also the length of a liveness cycle
    pub interval: Duration,
    /// Consecutive cycles without traffic before a device is evicted
    pub staleness_cycles: u32,
    /// Network prefix for IPv6 unicast, e.g. `fe80::`. Link-local prefixes
    /// need an interface zone (`fe80::%2`) to be reachable.
    pub ipv6_prefix: Option<String>,
    /// Local address of the discovery socket
    pub bind_addr: SocketAddr,
    /// Where discovery broadcasts are sent
    pub broadcast_addr: SocketAddr,
    /// Settings for the sessions opened with discovered devices
    pub session: SessionConfig,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            staleness_cycles: DEFAULT_STALENESS_CYCLES,
            ipv6_prefix: None,
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 0)),
            broadcast_addr: SocketAddr::from(([255, 255, 255, 255], DEFAULT_PORT)),
            session: SessionConfig::default(),
        }
    }
}

impl DiscoveryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Values below one are raised to one
    pub fn with_staleness_cycles(mut self, cycles: u32) -> Self {
        self.staleness_cycles = cycles.max(1);
        self
    }

    /// Reach devices at prefix + EUI-64 instead of their IPv4 address.
    ///
    /// A link-local prefix must name the outgoing interface index as a zone,
    /// e.g. `fe80::%2`; without it sends to `fe80::` addresses fail.
    pub fn with_ipv6_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.ipv6_prefix = Some(prefix.into());
        self
    }

    pub fn with_bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    pub fn with_broadcast_addr(mut self, addr: SocketAddr) -> Self {
        self.broadcast_addr = addr;
        self
    }

    pub fn with_session(mut self, session: SessionConfig) -> Self {
        self.session = session;
        self
    }

    /// Parsed IPv6 prefix, if one is configured
    pub fn prefix(&self) -> Result<Option<Ipv6Prefix>> {
        self.ipv6_prefix.as_deref().map(Ipv6Prefix::parse).transpose()
    }
}

/// Discover LIFX devices
pub struct Discovery {
    config: DiscoveryConfig,
}

impl Discovery {
    pub fn new() -> Self {
        Self::with_config(DiscoveryConfig::default())
    }

    pub fn with_config(config: DiscoveryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    /// Bind the discovery socket and start probing.
    ///
    /// The IPv6 prefix is validated here. The first broadcast goes out
    /// immediately.
    pub async fn start<R: DeviceRegistry>(self, registry: R) -> Result<DiscoveryHandle> {
        let config = self.config;
        let prefix = config.prefix()?;
        let get_service = engine::get_service_frame(config.session.source)?;

        let transport = UdpTransport::bind_broadcast(&config.bind_addr.to_string()).await?;
        let local_addr = transport.local_addr()?;
        let receiver = transport.start_receiver();

        let known: KnownDevices = Arc::new(RwLock::new(HashMap::new()));
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();

        let engine = Engine {
            interval: config.interval,
            broadcast_addr: config.broadcast_addr,
            prefix,
            get_service,
            transport,
            registry,
            tracker: LivenessTracker::new(config.staleness_cycles),
            known: known.clone(),
            last_sweep: Instant::now(),
            session: config.session,
        };

        if let Some(prefix) = &engine.prefix {
            info!("Discovery using IPv6 prefix {}", prefix);
        }
        let task = tokio::spawn(engine.run(receiver, commands_rx));

        Ok(DiscoveryHandle {
            commands: commands_tx,
            known,
            local_addr,
            task: Mutex::new(Some(task)),
        })
    }
}

impl Default for Discovery {
    fn default() -> Self {
        Self::new()
    }
}

/// Control over a running discovery task.
///
/// Dropping the handle stops probing; sessions already handed out stay open.
pub struct DiscoveryHandle {
    commands: mpsc::UnboundedSender<Command>,
    known: KnownDevices,
    local_addr: SocketAddr,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl DiscoveryHandle {
    /// Local address of the discovery socket
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Currently registered devices
    pub fn devices(&self) -> Vec<Device> {
        self.known.read().values().cloned().collect()
    }

    pub fn get(&self, mac: &MacAddress) -> Option<Device> {
        self.known.read().get(mac).cloned()
    }

    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .map_or(false, |task| !task.is_finished())
    }

    /// Broadcast GetService now instead of waiting for the next cycle
    pub fn discover_now(&self) -> Result<()> {
        self.commands
            .send(Command::DiscoverNow)
            .map_err(|_| DiscoveryError::Stopped)
    }

    /// Stop probing. Registered sessions stay open and registered.
    pub fn cancel(&self) {
        if let Some(task) = self.task.lock().take() {
            task.abort();
            info!("Discovery cancelled");
        }
    }

    /// Stop probing, then close and unregister every known device
    pub async fn shutdown(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.commands.send(Command::Shutdown(done_tx)).is_ok() {
            let _ = done_rx.await;
        }
        self.cancel();

        // Only non-empty when the task was already gone; the registry went
        // with it.
        let leftover: Vec<Device> = self.known.write().drain().map(|(_, d)| d).collect();
        for device in leftover {
            device.close();
        }
    }
}

impl Drop for DiscoveryHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.get_mut().take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DiscoveryConfig::default();
        assert_eq!(config.interval, Duration::from_secs(180));
        assert_eq!(config.staleness_cycles, 3);
        assert_eq!(
            config.broadcast_addr,
            "255.255.255.255:56700".parse().unwrap()
        );
        assert!(config.prefix().unwrap().is_none());
    }

    #[test]
    fn test_config_builders() {
        let config = DiscoveryConfig::new()
            .with_interval(Duration::from_secs(5))
            .with_staleness_cycles(0)
            .with_ipv6_prefix("fe80::");
        assert_eq!(config.interval, Duration::from_secs(5));
        assert_eq!(config.staleness_cycles, 1);
        assert_eq!(config.prefix().unwrap(), Some(Ipv6Prefix::LINK_LOCAL));
    }

    #[tokio::test]
    async fn test_start_rejects_invalid_prefix() {
        let config = DiscoveryConfig::new()
            .with_bind_addr("127.0.0.1:0".parse().unwrap())
            .with_ipv6_prefix("2001:db8::1");
        let result = Discovery::with_config(config).start(NoRegistry).await;
        assert!(matches!(result, Err(DiscoveryError::InvalidPrefix(_))));
    }
}
