//! LIFX Core
//!
//! Message types and the binary codec for the LIFX LAN protocol.
//!
//! This crate provides:
//! - The 36-byte frame header ([`Header`])
//! - Device hardware addresses ([`MacAddress`])
//! - Typed payloads for every supported message ([`Message`])
//! - Frame encoding/decoding ([`codec`])
//! - Product names and capabilities ([`products`])
//!
//! Nothing here performs I/O; every function works on byte buffers.

pub mod address;
pub mod codec;
pub mod error;
pub mod header;
pub mod message;
pub mod products;
pub mod types;

pub use address::MacAddress;
pub use codec::{decode, encode};
pub use error::{DecodingError, EncodingError, Error, Result};
pub use header::Header;
pub use message::{Message, MessageType};
pub use products::{Features, Product};
pub use types::*;

/// Protocol number carried in every frame header
pub const PROTOCOL_NUMBER: u16 = 1024;

/// Size of the fixed frame header in bytes
pub const HEADER_SIZE: usize = 36;

/// Default UDP port devices listen on
pub const DEFAULT_PORT: u16 = 56700;

/// Service code advertised in StateService for the UDP transport
pub const SERVICE_UDP: u8 = 1;
