//! CLI configuration file

use anyhow::{Context, Result};
use lifx_client::SessionConfig;
use lifx_discovery::DiscoveryConfig;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

/// Settings read from `--config`; every field is optional.
///
/// ```toml
/// broadcast_addr = "192.168.1.255:56700"
/// timeout_ms = 300
/// interval_secs = 10
/// ipv6_prefix = "fe80::"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub broadcast_addr: Option<SocketAddr>,
    pub bind_addr: Option<SocketAddr>,
    pub timeout_ms: Option<u64>,
    pub max_attempts: Option<u32>,
    pub interval_secs: Option<u64>,
    pub staleness_cycles: Option<u32>,
    pub ipv6_prefix: Option<String>,
    pub source: Option<u32>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Values given on the command line win over the file
    pub fn merge(self, overrides: FileConfig) -> FileConfig {
        FileConfig {
            broadcast_addr: overrides.broadcast_addr.or(self.broadcast_addr),
            bind_addr: overrides.bind_addr.or(self.bind_addr),
            timeout_ms: overrides.timeout_ms.or(self.timeout_ms),
            max_attempts: overrides.max_attempts.or(self.max_attempts),
            interval_secs: overrides.interval_secs.or(self.interval_secs),
            staleness_cycles: overrides.staleness_cycles.or(self.staleness_cycles),
            ipv6_prefix: overrides.ipv6_prefix.or(self.ipv6_prefix),
            source: overrides.source.or(self.source),
        }
    }

    pub fn session_config(&self) -> SessionConfig {
        let mut session = SessionConfig::new();
        if let Some(ms) = self.timeout_ms {
            session = session.with_timeout(Duration::from_millis(ms));
        }
        if let Some(attempts) = self.max_attempts {
            session = session.with_max_attempts(attempts);
        }
        if let Some(source) = self.source.filter(|s| *s != 0) {
            session = session.with_source(source);
        }
        session
    }

    pub fn discovery_config(&self) -> DiscoveryConfig {
        let mut config = DiscoveryConfig::new().with_session(self.session_config());
        if let Some(addr) = self.broadcast_addr {
            config = config.with_broadcast_addr(addr);
        }
        if let Some(addr) = self.bind_addr {
            config = config.with_bind_addr(addr);
        }
        if let Some(secs) = self.interval_secs {
            config = config.with_interval(Duration::from_secs(secs.max(1)));
        }
        if let Some(cycles) = self.staleness_cycles {
            config = config.with_staleness_cycles(cycles);
        }
        if let Some(prefix) = &self.ipv6_prefix {
            config = config.with_ipv6_prefix(prefix.clone());
        }
        config
    }
}
