//! LIFX Transport Layer
//!
//! Datagram plumbing for the LIFX LAN protocol. Devices speak plain UDP on
//! port 56700; this crate wraps tokio sockets with:
//! - a background receive loop feeding a channel ([`UdpTransport::start_receiver`])
//! - per-device senders whose remote address can move ([`UdpSender`])
//! - broadcast-capable sockets for discovery ([`UdpTransport::bind_broadcast`])

pub mod error;
pub mod traits;
pub mod udp;

pub use error::{Result, TransportError};
pub use traits::{TransportEvent, TransportSender};
pub use udp::{UdpConfig, UdpReceiver, UdpSender, UdpTransport};
