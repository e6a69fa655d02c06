//! Client error types

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Error, Debug)]
pub enum ClientError {
    /// Request could not be encoded; nothing was sent
    #[error("encoding error: {0}")]
    Encoding(#[from] lifx_core::EncodingError),

    #[error("transport error: {0}")]
    Transport(#[from] lifx_transport::TransportError),

    /// Session was closed before or while the request was issued
    #[error("session closed")]
    SessionClosed,
}
