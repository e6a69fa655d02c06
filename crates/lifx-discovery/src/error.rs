//! Discovery error types

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DiscoveryError>;

#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("invalid IPv6 prefix: {0}")]
    InvalidPrefix(String),

    #[error("transport error: {0}")]
    Transport(#[from] lifx_transport::TransportError),

    #[error("client error: {0}")]
    Client(#[from] lifx_client::ClientError),

    #[error("encoding error: {0}")]
    Encoding(#[from] lifx_core::EncodingError),

    #[error("discovery stopped")]
    Stopped,
}
