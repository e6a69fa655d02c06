//! Session configuration

use rand::Rng;
use std::net::SocketAddr;
use std::time::Duration;

/// Default time to wait for each attempt of a request
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(500);

/// Default number of transmissions before giving up
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Settings shared by every session a controller opens
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Wait per attempt before retransmitting
    pub timeout: Duration,
    /// Total transmissions of a tracked request, including the first
    pub max_attempts: u32,
    /// Source identifier stamped on every request; devices echo it back
    pub source: u32,
    /// Local address for session sockets, `None` for an ephemeral port on
    /// the unspecified address of the device's family
    pub bind_addr: Option<SocketAddr>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            source: random_source(),
            bind_addr: None,
        }
    }
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the attempt count; values below one are raised to one
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn with_source(mut self, source: u32) -> Self {
        self.source = source;
        self
    }

    pub fn with_bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = Some(addr);
        self
    }

    /// Local address for a session talking to `remote`
    pub(crate) fn local_addr_for(&self, remote: SocketAddr) -> SocketAddr {
        match self.bind_addr {
            Some(addr) => addr,
            None if remote.is_ipv6() => SocketAddr::from(([0u16; 8], 0)),
            None => SocketAddr::from(([0u8; 4], 0)),
        }
    }
}

/// Random non-zero source identifier.
///
/// Devices broadcast their replies when the source is zero.
pub fn random_source() -> u32 {
    rand::thread_rng().gen_range(1..=u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.timeout, Duration::from_millis(500));
        assert_eq!(config.max_attempts, 3);
        assert_ne!(config.source, 0);
        assert!(config.bind_addr.is_none());
    }

    #[test]
    fn test_builder() {
        let config = SessionConfig::new()
            .with_timeout(Duration::from_millis(50))
            .with_max_attempts(0)
            .with_source(7);
        assert_eq!(config.timeout, Duration::from_millis(50));
        assert_eq!(config.max_attempts, 1);
        assert_eq!(config.source, 7);
    }

    #[test]
    fn test_local_addr_family() {
        let config = SessionConfig::default();
        let v4: SocketAddr = "192.168.1.20:56700".parse().unwrap();
        let v6: SocketAddr = "[fe80::1]:56700".parse().unwrap();
        assert!(config.local_addr_for(v4).is_ipv4());
        assert!(config.local_addr_for(v6).is_ipv6());
    }
}
