//! IPv6 unicast address synthesis
//!
//! Devices do not report an IPv6 address. With a known /64 network prefix
//! the address can be derived from the hardware address (modified EUI-64,
//! RFC 4291 appendix A).
//!
//! Link-local addresses are only reachable through a specific interface, so
//! a prefix may carry a numeric zone (`fe80::%3`) that becomes the scope id
//! of every synthesized socket address.

use crate::error::{DiscoveryError, Result};
use lifx_core::MacAddress;
use std::fmt;
use std::net::{Ipv6Addr, SocketAddr, SocketAddrV6};
use std::str::FromStr;

const MAX_PREFIX_LEN: u8 = 64;

/// Network prefix of at most 64 bits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv6Prefix {
    network: u128,
    len: u8,
    scope_id: u32,
}

impl Ipv6Prefix {
    /// Link-local `fe80::/64`
    pub const LINK_LOCAL: Ipv6Prefix = Ipv6Prefix {
        network: 0xfe80 << 112,
        len: 64,
        scope_id: 0,
    };

    /// Parse `fe80::`, `2001:db8:1:2::` or `2001:db8:1:2`, optionally
    /// followed by a numeric zone (`%3`) and then `/len`.
    pub fn parse(s: &str) -> Result<Self> {
        let invalid = || DiscoveryError::InvalidPrefix(s.to_string());
        let trimmed = s.trim();

        let (addr, len) = match trimmed.split_once('/') {
            Some((addr, len)) => (addr, len.parse::<u8>().map_err(|_| invalid())?),
            None => (trimmed, MAX_PREFIX_LEN),
        };
        let (addr, scope_id) = match addr.split_once('%') {
            Some((addr, zone)) => (addr, zone.parse::<u32>().map_err(|_| invalid())?),
            None => (addr, 0),
        };
        if addr.is_empty() || len > MAX_PREFIX_LEN {
            return Err(invalid());
        }

        let parsed = Ipv6Addr::from_str(addr)
            .or_else(|_| Ipv6Addr::from_str(&format!("{}::", addr)))
            .map_err(|_| invalid())?;

        let network = u128::from(parsed);
        let host_mask = u128::MAX >> len;
        if network & host_mask != 0 {
            return Err(invalid());
        }

        Ok(Self {
            network,
            len,
            scope_id,
        })
    }

    /// Use `scope_id` (an interface index) for synthesized addresses
    pub fn with_scope_id(mut self, scope_id: u32) -> Self {
        self.scope_id = scope_id;
        self
    }

    pub fn len(&self) -> u8 {
        self.len
    }

    /// Interface index, 0 when unscoped
    pub fn scope_id(&self) -> u32 {
        self.scope_id
    }

    pub fn network(&self) -> Ipv6Addr {
        Ipv6Addr::from(self.network)
    }

    /// Address of the device with hardware address `mac` in this network
    pub fn synthesize(&self, mac: MacAddress) -> Ipv6Addr {
        Ipv6Addr::from(self.network | u128::from(eui64(mac)))
    }

    /// Socket address of the device, scoped to the prefix's interface
    pub fn socket_addr(&self, mac: MacAddress, port: u16) -> SocketAddr {
        SocketAddr::V6(SocketAddrV6::new(
            self.synthesize(mac),
            port,
            0,
            self.scope_id,
        ))
    }
}

impl FromStr for Ipv6Prefix {
    type Err = DiscoveryError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Ipv6Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.scope_id {
            0 => write!(f, "{}/{}", self.network(), self.len),
            zone => write!(f, "{}%{}/{}", self.network(), zone, self.len),
        }
    }
}

/// Interface identifier: U/L bit flipped, `ff:fe` in the middle
fn eui64(mac: MacAddress) -> u64 {
    let m = mac.as_bytes();
    u64::from_be_bytes([m[0] ^ 0x02, m[1], m[2], 0xff, 0xfe, m[3], m[4], m[5]])
}
