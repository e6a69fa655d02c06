//! Transport trait definitions

use async_trait::async_trait;
use bytes::Bytes;
use std::net::SocketAddr;

use crate::error::Result;

/// Events produced by a receive loop
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// Datagram received
    Data(Bytes),
    /// Socket error; the loop keeps running
    Error(String),
}

/// Sends datagrams to one peer
#[async_trait]
pub trait TransportSender: Send + Sync {
    /// Send one datagram
    async fn send(&self, data: Bytes) -> Result<()>;

    /// Address datagrams are sent to
    fn remote(&self) -> SocketAddr;

    /// Check whether the sender still accepts data
    fn is_open(&self) -> bool;

    /// Close the sender. Later sends fail with `TransportError::Closed`.
    async fn close(&self) -> Result<()>;
}
