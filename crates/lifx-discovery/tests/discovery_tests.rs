//! Discovery Tests (lifx-discovery)
//!
//! Tests for the broadcast discovery engine against simulated bulbs:
//! - Registration and in-place refresh of a known device
//! - Eviction after consecutive silent cycles, exactly once
//! - Isolated misses and session traffic keeping a device alive
//! - Power-up announcements, IPv6 synthesis, one-shot scans
//! - Cancel and shutdown semantics

use lifx_client::SessionConfig;
use lifx_core::{Header, MacAddress, Message, DEFAULT_PORT, SERVICE_UDP};
use lifx_discovery::{
    scan, Discovery, DiscoveryConfig, DiscoveryError, DiscoveryEvent, DiscoveryHandle,
};
use lifx_test_utils::{wait_for, FakeBulb, DEFAULT_CHECK_INTERVAL};
use lifx_transport::UdpTransport;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver};

const INTERVAL: Duration = Duration::from_millis(100);

fn mac() -> MacAddress {
    MacAddress::parse("AA:BB:CC:DD:EE:FF").expect("valid mac")
}

fn config(broadcast_addr: SocketAddr) -> DiscoveryConfig {
    DiscoveryConfig::new()
        .with_interval(INTERVAL)
        .with_staleness_cycles(3)
        .with_bind_addr("127.0.0.1:0".parse().expect("valid addr"))
        .with_broadcast_addr(broadcast_addr)
        .with_session(
            SessionConfig::new()
                .with_source(0xd15c)
                .with_timeout(Duration::from_millis(100))
                .with_bind_addr("127.0.0.1:0".parse().expect("valid addr")),
        )
}

async fn start(config: DiscoveryConfig) -> (DiscoveryHandle, UnboundedReceiver<DiscoveryEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let handle = Discovery::with_config(config)
        .start(tx)
        .await
        .expect("discovery start");
    (handle, rx)
}

async fn next_event(rx: &mut UnboundedReceiver<DiscoveryEvent>) -> DiscoveryEvent {
    tokio::time::timeout(Duration::from_secs(3), rx.recv())
        .await
        .expect("timed out waiting for discovery event")
        .expect("registry channel closed")
}

/// Socket that swallows discovery broadcasts without answering
async fn black_hole() -> UdpTransport {
    UdpTransport::bind("127.0.0.1:0").await.expect("bind sink")
}

// ============================================================================
// Registration
// ============================================================================

#[tokio::test]
async fn test_discovers_device() {
    let bulb = FakeBulb::start_labeled(mac(), "Porch").await;
    let (handle, mut rx) = start(config(bulb.addr())).await;

    let DiscoveryEvent::Registered(device) = next_event(&mut rx).await else {
        panic!("expected registration");
    };
    assert_eq!(device.mac(), mac());
    assert_eq!(device.addr(), bulb.addr());
    assert_eq!(handle.devices().len(), 1);
    assert_eq!(handle.get(&mac()), Some(device.clone()));

    let label = device.get_label().await.expect("get_label");
    assert_eq!(label.as_deref(), Some("Porch"));

    let (request, message) = bulb.received()[0].clone();
    assert_eq!(message, Message::GetService);
    assert!(request.tagged);
    assert!(request.res_required);

    handle.shutdown().await;
}

#[tokio::test]
async fn test_rediscovery_updates_in_place() {
    let bulb = FakeBulb::start(mac()).await;
    let (handle, mut rx) = start(config(bulb.addr())).await;

    let DiscoveryEvent::Registered(device) = next_event(&mut rx).await else {
        panic!("expected registration");
    };

    bulb.with_state(|s| s.service_port = 56999);
    handle.discover_now().expect("discover_now");

    let moved = wait_for(
        || async { device.addr().port() == 56999 },
        DEFAULT_CHECK_INTERVAL,
        Duration::from_secs(2),
    )
    .await;
    assert!(moved, "address should follow the advertised port");
    assert_eq!(device.addr().ip(), bulb.addr().ip());

    tokio::time::sleep(INTERVAL * 3).await;
    assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    assert_eq!(handle.devices().len(), 1);
    assert!(!device.is_closed());

    handle.shutdown().await;
}

#[tokio::test]
async fn test_light_state_announcement_registers() {
    let sink = black_hole().await;
    let bulb = FakeBulb::start(mac()).await;
    let (handle, mut rx) = start(config(sink.local_addr().expect("sink addr"))).await;

    bulb.announce(handle.local_addr()).await;

    let DiscoveryEvent::Registered(device) = next_event(&mut rx).await else {
        panic!("expected registration");
    };
    assert_eq!(device.mac(), mac());
    assert_eq!(device.addr(), SocketAddr::new(bulb.addr().ip(), DEFAULT_PORT));

    handle.shutdown().await;
}

#[tokio::test]
async fn test_ignores_untargeted_and_other_services() {
    let sink = black_hole().await;
    let bulb = FakeBulb::start(mac()).await;
    let (handle, mut rx) = start(config(sink.local_addr().expect("sink addr"))).await;
    let to = handle.local_addr();

    let untargeted = Header::to_device(MacAddress::BROADCAST, 0, 0);
    let udp = Message::StateService {
        service: SERVICE_UDP,
        port: 56700,
    };
    bulb.send(to, &untargeted, &udp).await;

    let other = Message::StateService {
        service: 2,
        port: 56700,
    };
    bulb.send(to, &Header::to_device(mac(), 0, 0), &other).await;
    bulb.send_raw(to, b"not a lifx frame").await;

    tokio::time::sleep(INTERVAL * 2).await;
    assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    assert!(handle.devices().is_empty());

    handle.shutdown().await;
}

#[tokio::test]
async fn test_ipv6_prefix_synthesizes_address() {
    let bulb = FakeBulb::start(mac()).await;
    let (handle, mut rx) = start(config(bulb.addr()).with_ipv6_prefix("fe80::")).await;

    let DiscoveryEvent::Registered(device) = next_event(&mut rx).await else {
        panic!("expected registration");
    };
    let expected: SocketAddr = format!("[fe80::a8bb:ccff:fedd:eeff]:{}", bulb.addr().port())
        .parse()
        .expect("valid addr");
    assert_eq!(device.addr(), expected);

    handle.shutdown().await;
}

#[tokio::test]
async fn test_invalid_prefix_rejected_at_start() {
    let (tx, _rx) = mpsc::unbounded_channel();
    let config = config("127.0.0.1:9".parse().expect("valid addr"))
        .with_ipv6_prefix("fe80::1:2:3:4/64");
    let result = Discovery::with_config(config).start(tx).await;
    assert!(matches!(result, Err(DiscoveryError::InvalidPrefix(_))));
}

// ============================================================================
// Liveness
// ============================================================================

#[tokio::test]
async fn test_evicted_exactly_once_after_silent_cycles() {
    let bulb = FakeBulb::start(mac()).await;
    let (handle, mut rx) = start(config(bulb.addr())).await;

    let DiscoveryEvent::Registered(device) = next_event(&mut rx).await else {
        panic!("expected registration");
    };

    bulb.set_muted(true);
    let muted_at = Instant::now();

    let DiscoveryEvent::Unregistered(gone) = next_event(&mut rx).await else {
        panic!("expected unregistration");
    };
    assert_eq!(gone, device);
    assert!(
        muted_at.elapsed() >= INTERVAL * 2,
        "evicted too early: {:?}",
        muted_at.elapsed()
    );
    assert!(device.is_closed());
    assert!(handle.devices().is_empty());

    tokio::time::sleep(INTERVAL * 5).await;
    assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));

    handle.shutdown().await;
}

#[tokio::test]
async fn test_isolated_misses_do_not_evict() {
    let bulb = FakeBulb::start(mac()).await;
    let (handle, mut rx) = start(config(bulb.addr())).await;

    let DiscoveryEvent::Registered(device) = next_event(&mut rx).await else {
        panic!("expected registration");
    };

    for _ in 0..3 {
        bulb.drop_next(1);
        tokio::time::sleep(INTERVAL * 3).await;
    }

    assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    assert!(!device.is_closed());
    assert_eq!(handle.devices().len(), 1);

    handle.shutdown().await;
}

#[tokio::test]
async fn test_session_traffic_counts_as_alive() {
    let sink = black_hole().await;
    let bulb = FakeBulb::start(mac()).await;
    let (handle, mut rx) = start(
        config(sink.local_addr().expect("sink addr")).with_staleness_cycles(2),
    )
    .await;

    // Broadcasts go nowhere; register through a single unsolicited reply.
    let advert = Message::StateService {
        service: SERVICE_UDP,
        port: bulb.addr().port() as u32,
    };
    let header = Header::to_device(mac(), 0, 0);
    bulb.send(handle.local_addr(), &header, &advert).await;

    let DiscoveryEvent::Registered(device) = next_event(&mut rx).await else {
        panic!("expected registration");
    };

    let busy_until = Instant::now() + INTERVAL * 8;
    while Instant::now() < busy_until {
        assert!(device.get_power().await.expect("get_power").is_some());
        tokio::time::sleep(INTERVAL / 2).await;
    }
    assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));

    let DiscoveryEvent::Unregistered(gone) = next_event(&mut rx).await else {
        panic!("expected unregistration once traffic stops");
    };
    assert_eq!(gone, device);

    handle.shutdown().await;
}

#[tokio::test]
async fn test_device_returns_after_eviction() {
    let bulb = FakeBulb::start(mac()).await;
    let (handle, mut rx) = start(config(bulb.addr()).with_staleness_cycles(1)).await;

    let DiscoveryEvent::Registered(first) = next_event(&mut rx).await else {
        panic!("expected registration");
    };

    bulb.set_muted(true);
    assert!(matches!(
        next_event(&mut rx).await,
        DiscoveryEvent::Unregistered(_)
    ));

    bulb.set_muted(false);
    let DiscoveryEvent::Registered(second) = next_event(&mut rx).await else {
        panic!("expected re-registration");
    };
    assert_eq!(second.mac(), mac());
    assert_ne!(second, first, "a fresh session is opened");
    assert!(first.is_closed());
    assert!(!second.is_closed());

    handle.shutdown().await;
}

// ============================================================================
// Lifecycle
// ============================================================================

#[tokio::test]
async fn test_shutdown_closes_and_unregisters() {
    let bulb = FakeBulb::start(mac()).await;
    let (handle, mut rx) = start(config(bulb.addr())).await;

    let DiscoveryEvent::Registered(device) = next_event(&mut rx).await else {
        panic!("expected registration");
    };

    handle.shutdown().await;

    assert!(matches!(
        next_event(&mut rx).await,
        DiscoveryEvent::Unregistered(_)
    ));
    assert!(device.is_closed());
    assert!(!handle.is_running());
    assert!(handle.devices().is_empty());
    assert!(matches!(handle.discover_now(), Err(DiscoveryError::Stopped)));
}

#[tokio::test]
async fn test_cancel_keeps_sessions_open() {
    let bulb = FakeBulb::start_labeled(mac(), "Desk").await;
    let (handle, mut rx) = start(config(bulb.addr()).with_staleness_cycles(1)).await;

    let DiscoveryEvent::Registered(device) = next_event(&mut rx).await else {
        panic!("expected registration");
    };

    handle.cancel();
    assert!(!handle.is_running());

    let sent = bulb.count_of(lifx_core::MessageType::GetService);
    tokio::time::sleep(INTERVAL * 3).await;
    assert_eq!(bulb.count_of(lifx_core::MessageType::GetService), sent);

    assert!(!device.is_closed());
    assert_eq!(
        device.get_label().await.expect("get_label").as_deref(),
        Some("Desk")
    );
    assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));

    device.close();
}

// ============================================================================
// Scan
// ============================================================================

#[tokio::test]
async fn test_scan_returns_responders() {
    let bulb = FakeBulb::start(mac()).await;

    let found = scan(&config(bulb.addr()), Duration::from_millis(300))
        .await
        .expect("scan");

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].mac, mac());
    assert_eq!(found[0].addr, bulb.addr());
    assert_eq!(bulb.count_of(lifx_core::MessageType::GetService), 1);
}

#[tokio::test]
async fn test_scan_with_no_devices_is_empty() {
    let sink = black_hole().await;
    let found = scan(
        &config(sink.local_addr().expect("sink addr")),
        Duration::from_millis(150),
    )
    .await
    .expect("scan");
    assert!(found.is_empty());
}
