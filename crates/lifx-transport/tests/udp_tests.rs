//! UDP Transport Tests (lifx-transport)
//!
//! Tests for the UDP transport including:
//! - Binding and local address
//! - Send/receive through the background loop
//! - Per-device senders and address moves
//! - Close semantics

use bytes::Bytes;
use lifx_transport::udp::{UdpConfig, UdpTransport};
use lifx_transport::{TransportError, TransportEvent, TransportSender};
use std::collections::HashSet;
use std::time::Duration;
use tokio::time::timeout;

async fn recv_data(receiver: &mut lifx_transport::UdpReceiver) -> (Bytes, std::net::SocketAddr) {
    let (event, from) = timeout(Duration::from_secs(2), receiver.recv_from())
        .await
        .expect("Receive timed out")
        .expect("Receiver closed");
    match event {
        TransportEvent::Data(data) => (data, from),
        other => panic!("Expected Data event, got {:?}", other),
    }
}

// ============================================================================
// Basic Binding Tests
// ============================================================================

#[tokio::test]
async fn test_udp_bind_default() {
    let transport = UdpTransport::bind("127.0.0.1:0")
        .await
        .expect("Bind should succeed");

    let addr = transport.local_addr().expect("Should get local address");
    assert!(addr.port() > 0, "Port should be > 0");
}

#[tokio::test]
async fn test_udp_bind_broadcast() {
    let transport = UdpTransport::bind_broadcast("0.0.0.0:0")
        .await
        .expect("Broadcast bind should succeed");

    assert!(transport.set_broadcast(true).is_ok());
}

#[tokio::test]
async fn test_udp_bind_with_small_packets() {
    let config = UdpConfig {
        max_packet_size: 64,
        ..UdpConfig::default()
    };
    let server = UdpTransport::bind_with_config("127.0.0.1:0", config)
        .await
        .expect("Bind with config should succeed");
    let client = UdpTransport::bind("127.0.0.1:0").await.unwrap();
    let mut receiver = server.start_receiver();

    client
        .send_to(&[1u8; 36], server.local_addr().unwrap())
        .await
        .expect("Send should succeed");

    let (data, _) = recv_data(&mut receiver).await;
    assert_eq!(data.len(), 36);
}

// ============================================================================
// Send/Receive Tests
// ============================================================================

#[tokio::test]
async fn test_udp_send_receive() {
    let server = UdpTransport::bind("127.0.0.1:0").await.unwrap();
    let client = UdpTransport::bind("127.0.0.1:0").await.unwrap();
    let mut receiver = server.start_receiver();

    client
        .send_to(b"hello bulb", server.local_addr().unwrap())
        .await
        .expect("Send should succeed");

    let (data, from) = recv_data(&mut receiver).await;
    assert_eq!(data.as_ref(), b"hello bulb");
    assert_eq!(from, client.local_addr().unwrap());
}

#[tokio::test]
async fn test_udp_sender_to() {
    let server = UdpTransport::bind("127.0.0.1:0").await.unwrap();
    let client = UdpTransport::bind("127.0.0.1:0").await.unwrap();
    let mut receiver = server.start_receiver();

    let sender = client.sender_to(server.local_addr().unwrap());
    assert!(sender.is_open());
    sender
        .send(Bytes::from_static(b"via sender"))
        .await
        .expect("Send should succeed");

    let (data, _) = recv_data(&mut receiver).await;
    assert_eq!(data.as_ref(), b"via sender");
}

#[tokio::test]
async fn test_udp_sender_moves_with_device() {
    let old_home = UdpTransport::bind("127.0.0.1:0").await.unwrap();
    let new_home = UdpTransport::bind("127.0.0.1:0").await.unwrap();
    let client = UdpTransport::bind("127.0.0.1:0").await.unwrap();
    let mut old_rx = old_home.start_receiver();
    let mut new_rx = new_home.start_receiver();

    let sender = client.sender_to(old_home.local_addr().unwrap());
    sender.send(Bytes::from_static(b"one")).await.unwrap();
    let (data, _) = recv_data(&mut old_rx).await;
    assert_eq!(data.as_ref(), b"one");

    sender.set_remote(new_home.local_addr().unwrap());
    sender.send(Bytes::from_static(b"two")).await.unwrap();
    let (data, _) = recv_data(&mut new_rx).await;
    assert_eq!(data.as_ref(), b"two");

    let nothing = timeout(Duration::from_millis(100), old_rx.recv_from()).await;
    assert!(nothing.is_err(), "Old address should not receive after move");
}

#[tokio::test]
async fn test_udp_multiple_messages() {
    let server = UdpTransport::bind("127.0.0.1:0").await.unwrap();
    let client = UdpTransport::bind("127.0.0.1:0").await.unwrap();
    let mut receiver = server.start_receiver();
    let server_addr = server.local_addr().unwrap();

    for i in 0u8..20 {
        client.send_to(&[i], server_addr).await.unwrap();
    }

    let mut seen = HashSet::new();
    for _ in 0..20 {
        let (data, _) = recv_data(&mut receiver).await;
        seen.insert(data[0]);
    }
    assert_eq!(seen.len(), 20);
}

// ============================================================================
// Close Tests
// ============================================================================

#[tokio::test]
async fn test_udp_close_stops_receiver() {
    let server = UdpTransport::bind("127.0.0.1:0").await.unwrap();
    let mut receiver = server.start_receiver();

    server.close();

    let next = timeout(Duration::from_secs(2), receiver.recv_from())
        .await
        .expect("Receiver should finish after close");
    assert!(next.is_none());
}

#[tokio::test]
async fn test_udp_send_after_close() {
    let transport = UdpTransport::bind("127.0.0.1:0").await.unwrap();
    let target = transport.local_addr().unwrap();
    transport.close();

    let result = transport.send_to(b"late", target).await;
    assert!(matches!(result, Err(TransportError::Closed)));
}
