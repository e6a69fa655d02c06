//! LIFX Client Library
//!
//! Unicast sessions with LIFX devices. A [`Device`] owns a UDP socket,
//! numbers and tracks requests, retransmits them on timeout and hands each
//! reply to the callback that asked for it.
//!
//! # Example
//!
//! ```ignore
//! use lifx_client::{Device, SessionConfig};
//! use lifx_core::{Hsbk, MacAddress};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mac: MacAddress = "d0:73:d5:01:02:03".parse()?;
//!     let device = Device::open(mac, "192.168.1.40:56700".parse()?, SessionConfig::default()).await?;
//!
//!     if let Some(label) = device.get_label().await? {
//!         println!("{} is called {}", mac, label);
//!     }
//!     device.set_color(Hsbk::new(0, 65535, 65535, 3500), 1000).await?;
//!
//!     device.close();
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod dispatch;
pub mod error;
pub mod session;
pub mod state;

pub use config::SessionConfig;
pub use error::{ClientError, Result};
pub use session::{
    Device, Liveness, RequestOptions, Response, ResponseCallback, SubscriptionCallback,
};
pub use state::{DeviceState, ProductVersion, UptimeInfo};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::config::SessionConfig;
    pub use crate::error::{ClientError, Result};
    pub use crate::session::{Device, RequestOptions, Response};
    pub use lifx_core::{Hsbk, MacAddress, Message, WaveformOptions};
}
