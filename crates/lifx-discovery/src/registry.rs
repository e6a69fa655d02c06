//! Host-side device registry

use lifx_client::Device;
use tokio::sync::mpsc;

/// Registry change reported by the discovery engine
#[derive(Debug, Clone)]
pub enum DiscoveryEvent {
    /// A device answered for the first time (or again after eviction)
    Registered(Device),
    /// A device stopped answering and its session was closed
    Unregistered(Device),
}

impl DiscoveryEvent {
    pub fn device(&self) -> &Device {
        match self {
            DiscoveryEvent::Registered(device) | DiscoveryEvent::Unregistered(device) => device,
        }
    }
}

/// Receives devices as discovery finds and loses them.
///
/// Calls come from the discovery task only, one at a time. Every
/// `unregister` follows exactly one `register` for the same session.
pub trait DeviceRegistry: Send + 'static {
    fn register(&mut self, device: Device);
    fn unregister(&mut self, device: Device);
}

impl DeviceRegistry for mpsc::UnboundedSender<DiscoveryEvent> {
    fn register(&mut self, device: Device) {
        let _ = self.send(DiscoveryEvent::Registered(device));
    }

    fn unregister(&mut self, device: Device) {
        let _ = self.send(DiscoveryEvent::Unregistered(device));
    }
}

/// Registry that ignores everything, for hosts that only poll
/// [`DiscoveryHandle::devices`](crate::DiscoveryHandle::devices)
#[derive(Debug, Default, Clone, Copy)]
pub struct NoRegistry;

impl DeviceRegistry for NoRegistry {
    fn register(&mut self, _device: Device) {}
    fn unregister(&mut self, _device: Device) {}
}
