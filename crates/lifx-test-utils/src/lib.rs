//! Common test helpers and utilities for LIFX tests
//!
//! This crate provides:
//! - Condition-based waiting (no hardcoded sleeps)
//! - A simulated bulb answering on a loopback UDP socket ([`FakeBulb`])
//! - Collectors for callback and subscription results

use lifx_core::{
    codec, FirmwareInfo, Header, Hsbk, LightStatus, MacAddress, Membership, Message, MessageType,
    MultiZoneColors, SignalInfo, ZoneColor, SERVICE_UDP, ZONES_PER_MESSAGE,
};
use lifx_transport::{TransportEvent, UdpTransport};
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default test timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default condition check interval
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_millis(10);

// ============================================================================
// Condition-Based Waiting
// ============================================================================

/// Wait for a condition with timeout - condition-based, not time-based
pub async fn wait_for<F, Fut>(check: F, interval: Duration, max_wait: Duration) -> bool
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let start = Instant::now();
    while start.elapsed() < max_wait {
        if check().await {
            return true;
        }
        tokio::time::sleep(interval).await;
    }
    false
}

/// Wait for an atomic counter to reach a target value
pub async fn wait_for_count(counter: &AtomicU32, target: u32, max_wait: Duration) -> bool {
    wait_for(
        || async { counter.load(Ordering::SeqCst) >= target },
        DEFAULT_CHECK_INTERVAL,
        max_wait,
    )
    .await
}

// ============================================================================
// Fake Bulb - simulated device on loopback
// ============================================================================

/// Mutable state of a [`FakeBulb`]
#[derive(Debug, Clone)]
pub struct BulbState {
    pub label: String,
    pub power: u16,
    pub color: Hsbk,
    pub infrared: u16,
    /// Per-zone colours; empty for a single-zone bulb
    pub zones: Vec<Hsbk>,
    pub location: Membership,
    pub group: Membership,
    pub vendor: u32,
    pub product: u32,
    pub firmware: FirmwareInfo,
    pub signal: SignalInfo,
    /// Port advertised in StateService; defaults to the bulb's own port
    pub service_port: u32,
    /// Receive but never answer
    pub muted: bool,
    /// Ignore this many upcoming requests
    pub drop_next: u32,
    /// Answer queries with a wrong message type
    pub reply_wrong_type: bool,
}

/// Simulated LIFX bulb.
///
/// Answers discovery broadcasts and queries like a real device: it sends an
/// Acknowledgement when `ack_required` is set, applies `Set*` requests, and
/// sends the matching `State*` message when `res_required` is set.
/// Everything it receives is recorded.
pub struct FakeBulb {
    mac: MacAddress,
    transport: Arc<UdpTransport>,
    state: Arc<Mutex<BulbState>>,
    received: Arc<Mutex<Vec<(Header, Message)>>>,
    count: Arc<AtomicU32>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl FakeBulb {
    /// Start a bulb on an ephemeral loopback port
    pub async fn start(mac: MacAddress) -> Self {
        Self::start_labeled(mac, "Fake Bulb").await
    }

    pub async fn start_labeled(mac: MacAddress, label: &str) -> Self {
        let transport = Arc::new(
            UdpTransport::bind("127.0.0.1:0")
                .await
                .expect("fake bulb bind failed"),
        );
        let port = transport.local_addr().expect("fake bulb addr").port();

        let state = Arc::new(Mutex::new(BulbState {
            label: label.to_string(),
            power: 0,
            color: Hsbk::default(),
            infrared: 0,
            zones: Vec::new(),
            location: Membership {
                id: [1; 16],
                label: "Home".to_string(),
                updated_at: 1,
            },
            group: Membership {
                id: [2; 16],
                label: "Living Room".to_string(),
                updated_at: 1,
            },
            vendor: 1,
            product: 27,
            firmware: FirmwareInfo {
                build: 1_500_000_000_000_000_000,
                version: (2 << 16) | 80,
            },
            signal: SignalInfo {
                signal: 1.0e-5,
                tx: 0,
                rx: 0,
            },
            service_port: port as u32,
            muted: false,
            drop_next: 0,
            reply_wrong_type: false,
        }));
        let received = Arc::new(Mutex::new(Vec::new()));
        let count = Arc::new(AtomicU32::new(0));

        let mut receiver = transport.start_receiver();
        let task_transport = transport.clone();
        let task_state = state.clone();
        let task_received = received.clone();
        let task_count = count.clone();

        let handle = tokio::spawn(async move {
            while let Some((event, from)) = receiver.recv_from().await {
                let TransportEvent::Data(data) = event else {
                    continue;
                };
                let Ok((header, message)) = codec::decode(&data) else {
                    continue;
                };
                if !header.tagged && !header.target.is_broadcast() && header.target != mac {
                    continue;
                }

                let replies = {
                    let mut state = task_state.lock();
                    respond(mac, &mut state, &header, &message)
                };

                task_received.lock().push((header, message));
                task_count.fetch_add(1, Ordering::SeqCst);

                for reply in replies {
                    let _ = task_transport.send_to(&reply, from).await;
                }
            }
        });

        Self {
            mac,
            transport,
            state,
            received,
            count,
            handle: Some(handle),
        }
    }

    pub fn mac(&self) -> MacAddress {
        self.mac
    }

    pub fn addr(&self) -> SocketAddr {
        self.transport.local_addr().expect("fake bulb addr")
    }

    /// Run `f` against the bulb state
    pub fn with_state<R>(&self, f: impl FnOnce(&mut BulbState) -> R) -> R {
        f(&mut self.state.lock())
    }

    pub fn state(&self) -> BulbState {
        self.state.lock().clone()
    }

    pub fn set_muted(&self, muted: bool) {
        self.state.lock().muted = muted;
    }

    pub fn drop_next(&self, count: u32) {
        self.state.lock().drop_next = count;
    }

    /// Everything received so far
    pub fn received(&self) -> Vec<(Header, Message)> {
        self.received.lock().clone()
    }

    /// Number of datagrams received of a given type
    pub fn count_of(&self, kind: MessageType) -> usize {
        self.received
            .lock()
            .iter()
            .filter(|(_, m)| m.kind() == Some(kind))
            .count()
    }

    /// Total datagrams received
    pub fn received_count(&self) -> u32 {
        self.count.load(Ordering::SeqCst)
    }

    /// Wait until at least `n` datagrams have arrived
    pub async fn wait_for_received(&self, n: u32, max_wait: Duration) -> bool {
        wait_for_count(&self.count, n, max_wait).await
    }

    /// Send an arbitrary message from the bulb's socket
    pub async fn send(&self, to: SocketAddr, header: &Header, message: &Message) {
        let frame = codec::encode(header, message).expect("fake bulb encode");
        self.send_raw(to, &frame).await;
    }

    pub async fn send_raw(&self, to: SocketAddr, bytes: &[u8]) {
        let _ = self.transport.send_to(bytes, to).await;
    }

    /// Push an unsolicited LightState, as bulbs do after powering up
    pub async fn announce(&self, to: SocketAddr) {
        let header = Header::to_device(self.mac, 0, 0);
        let status = self.light_status();
        self.send(to, &header, &Message::LightState(status)).await;
    }

    fn light_status(&self) -> LightStatus {
        let state = self.state.lock();
        LightStatus {
            color: state.color,
            power: state.power,
            label: state.label.clone(),
        }
    }

    /// Stop answering and release the socket
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
        self.transport.close();
    }
}

impl Drop for FakeBulb {
    fn drop(&mut self) {
        self.stop();
    }
}

fn respond(
    mac: MacAddress,
    state: &mut BulbState,
    header: &Header,
    message: &Message,
) -> Vec<Vec<u8>> {
    if state.muted {
        return Vec::new();
    }
    if state.drop_next > 0 {
        state.drop_next -= 1;
        return Vec::new();
    }

    apply(state, message);

    let reply_header = Header::to_device(mac, header.source, header.sequence);
    let mut replies = Vec::new();

    if header.ack_required {
        if let Ok(frame) = codec::encode(&reply_header, &Message::Acknowledgement) {
            replies.push(frame.to_vec());
        }
    }

    if header.res_required {
        let states = if state.reply_wrong_type {
            vec![Message::StateLabel {
                label: "wrong".to_string(),
            }]
        } else {
            match message {
                Message::MultiZoneGetColorZones {
                    start_index,
                    end_index,
                } => zone_replies(state, *start_index, *end_index),
                Message::MultiZoneSetColorZones(z) => {
                    zone_replies(state, z.start_index, z.end_index)
                }
                other => state_reply(state, other).into_iter().collect(),
            }
        };
        for reply in states {
            if let Ok(frame) = codec::encode(&reply_header, &reply) {
                replies.push(frame.to_vec());
            }
        }
    }

    replies
}

fn apply(state: &mut BulbState, message: &Message) {
    match message {
        Message::SetPower { level } => state.power = *level,
        Message::LightSetPower { level, .. } => state.power = *level,
        Message::SetLabel { label } => state.label = label.clone(),
        Message::LightSetColor { color, .. } => state.color = *color,
        Message::LightSetWaveform(opts) if !opts.transient => state.color = opts.color,
        Message::LightSetInfrared { brightness } => state.infrared = *brightness,
        Message::MultiZoneSetColorZones(z) => {
            let end = usize::from(z.end_index).min(state.zones.len().saturating_sub(1));
            for zone in state.zones.iter_mut().take(end + 1).skip(z.start_index.into()) {
                *zone = z.color;
            }
        }
        _ => {}
    }
}

/// A one-zone range gets StateZone, anything wider gets one StateMultiZone
/// per eight zones
fn zone_replies(state: &BulbState, start: u8, end: u8) -> Vec<Message> {
    let count = state.zones.len();
    let start = usize::from(start);
    if count == 0 || start >= count {
        return Vec::new();
    }
    let end = usize::from(end).min(count - 1);
    let total = count as u8;

    if start >= end {
        return vec![Message::MultiZoneStateZone(ZoneColor {
            count: total,
            index: start as u8,
            color: state.zones[start],
        })];
    }

    (start..=end)
        .step_by(ZONES_PER_MESSAGE)
        .map(|index| {
            let mut colors = [Hsbk::default(); ZONES_PER_MESSAGE];
            for (slot, color) in colors.iter_mut().zip(&state.zones[index..]) {
                *slot = *color;
            }
            Message::MultiZoneStateMultiZone(MultiZoneColors {
                count: total,
                index: index as u8,
                colors,
            })
        })
        .collect()
}

fn state_reply(state: &BulbState, message: &Message) -> Option<Message> {
    let reply = match message.response_type()? {
        MessageType::StateService => Message::StateService {
            service: SERVICE_UDP,
            port: state.service_port,
        },
        MessageType::StateHostInfo => Message::StateHostInfo(state.signal),
        MessageType::StateWifiInfo => Message::StateWifiInfo(state.signal),
        MessageType::StateHostFirmware => Message::StateHostFirmware(state.firmware),
        MessageType::StateWifiFirmware => Message::StateWifiFirmware(state.firmware),
        MessageType::StatePower => Message::StatePower { level: state.power },
        MessageType::StateLabel => Message::StateLabel {
            label: state.label.clone(),
        },
        MessageType::StateVersion => Message::StateVersion {
            vendor: state.vendor,
            product: state.product,
            version: 0,
        },
        MessageType::StateInfo => Message::StateInfo {
            time: 1_600_000_000_000_000_000,
            uptime: 3_600_000_000_000,
            downtime: 0,
        },
        MessageType::StateLocation => Message::StateLocation(state.location.clone()),
        MessageType::StateGroup => Message::StateGroup(state.group.clone()),
        MessageType::EchoResponse => match message {
            Message::EchoRequest { payload } => Message::EchoResponse { payload: *payload },
            _ => return None,
        },
        MessageType::LightState => Message::LightState(LightStatus {
            color: state.color,
            power: state.power,
            label: state.label.clone(),
        }),
        MessageType::LightStatePower => Message::LightStatePower { level: state.power },
        MessageType::LightStateInfrared => Message::LightStateInfrared {
            brightness: state.infrared,
        },
        _ => return None,
    };
    Some(reply)
}

// ============================================================================
// Test Collectors - for verifying callback results
// ============================================================================

/// Thread-safe collector for values delivered to callbacks
pub struct Collector<T> {
    values: Arc<Mutex<Vec<T>>>,
    count: Arc<AtomicU32>,
}

impl<T> Clone for Collector<T> {
    fn clone(&self) -> Self {
        Self {
            values: self.values.clone(),
            count: self.count.clone(),
        }
    }
}

impl<T: Clone + Send + 'static> Collector<T> {
    pub fn new() -> Self {
        Self {
            values: Arc::new(Mutex::new(Vec::new())),
            count: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Record a value
    pub fn push(&self, value: T) {
        self.values.lock().push(value);
        self.count.fetch_add(1, Ordering::SeqCst);
    }

    /// Get the count of received values
    pub fn count(&self) -> u32 {
        self.count.load(Ordering::SeqCst)
    }

    /// Wait for at least n values to be received
    pub async fn wait_for_count(&self, n: u32, max_wait: Duration) -> bool {
        wait_for_count(&self.count, n, max_wait).await
    }

    /// Get all collected values
    pub fn values(&self) -> Vec<T> {
        self.values.lock().clone()
    }

    /// Get the last value received
    pub fn last(&self) -> Option<T> {
        self.values.lock().last().cloned()
    }

    /// Clear all collected values
    pub fn clear(&self) {
        self.values.lock().clear();
        self.count.store(0, Ordering::SeqCst);
    }
}

impl<T: Clone + Send + 'static> Default for Collector<T> {
    fn default() -> Self {
        Self::new()
    }
}
