//! Device session implementation
//!
//! A [`Device`] is the unicast half of the protocol: it owns a socket,
//! allocates sequence numbers, tracks outstanding requests, retransmits them
//! on timeout and routes every reply to whoever is waiting for it.

use bytes::Bytes;
use dashmap::DashMap;
use lifx_core::{
    codec, ColorZones, FirmwareInfo, Header, Hsbk, LightStatus, MacAddress, Membership, Message,
    SignalInfo, WaveformOptionalOptions, WaveformOptions, ECHO_SIZE, POWER_OFF, POWER_ON,
};
use lifx_transport::{TransportEvent, TransportSender, UdpReceiver, UdpSender, UdpTransport};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot};
use tokio::task::AbortHandle;
use tracing::{debug, info, trace, warn};

use crate::config::SessionConfig;
use crate::dispatch::{correlate, request_flags, Correlation, Expectation};
use crate::error::{ClientError, Result};
use crate::state::{DeviceState, ProductVersion, UptimeInfo};

/// Outcome delivered to a request callback
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// The device answered
    Received { header: Header, message: Message },
    /// Every attempt timed out, or the session closed first
    NoResponse,
}

impl Response {
    pub fn message(&self) -> Option<&Message> {
        match self {
            Response::Received { message, .. } => Some(message),
            Response::NoResponse => None,
        }
    }

    pub fn into_message(self) -> Option<Message> {
        match self {
            Response::Received { message, .. } => Some(message),
            Response::NoResponse => None,
        }
    }

    pub fn is_no_response(&self) -> bool {
        matches!(self, Response::NoResponse)
    }
}

/// Called at most once with the outcome of a request
pub type ResponseCallback = Box<dyn FnOnce(&Device, Response) + Send + 'static>;

/// Called for every datagram that is not a reply to a pending request
pub type SubscriptionCallback = Arc<dyn Fn(&Device, &Header, &Message) + Send + Sync + 'static>;

/// Deferred callback, run on the session's dispatch task
type Job = Box<dyn FnOnce() + Send + 'static>;

/// Reachability of a device as seen by its session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    /// Last request was answered, or traffic arrived since
    Alive,
    /// A tracked request ran out of attempts
    Unreachable,
    /// Session closed; no further traffic is sent or handled
    Closed,
}

/// Per-request settings for [`Device::send_request`]
#[derive(Default)]
pub struct RequestOptions {
    pub callback: Option<ResponseCallback>,
    /// Force the `ack_required` flag
    pub ack_required: Option<bool>,
    /// Force the `res_required` flag
    pub res_required: Option<bool>,
    /// Override the session's per-attempt timeout
    pub timeout: Option<Duration>,
    /// Override the session's attempt count
    pub max_attempts: Option<u32>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_callback<F>(mut self, callback: F) -> Self
    where
        F: FnOnce(&Device, Response) + Send + 'static,
    {
        self.callback = Some(Box::new(callback));
        self
    }

    pub fn ack_required(mut self, ack: bool) -> Self {
        self.ack_required = Some(ack);
        self
    }

    pub fn res_required(mut self, res: bool) -> Self {
        self.res_required = Some(res);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts.max(1));
        self
    }
}

struct PendingRequest {
    expect: Expectation,
    callback: Option<ResponseCallback>,
    /// Monotonic issue number; tells a reused sequence apart
    issued: u64,
    attempts: u32,
    timer: Option<AbortHandle>,
}

struct SessionState {
    next_sequence: u8,
    next_issue: u64,
    pending: HashMap<u8, PendingRequest>,
    last_seen: Instant,
    liveness: Liveness,
}

impl SessionState {
    /// Next sequence number not held by a pending request, or the oldest
    /// pending sequence when all 256 are taken
    fn allocate_sequence(&mut self) -> u8 {
        for _ in 0..=u8::MAX as usize {
            let candidate = self.next_sequence;
            self.next_sequence = self.next_sequence.wrapping_add(1);
            if !self.pending.contains_key(&candidate) {
                return candidate;
            }
        }

        let oldest = self
            .pending
            .iter()
            .min_by_key(|(_, entry)| entry.issued)
            .map(|(seq, _)| *seq)
            .unwrap_or(self.next_sequence);
        self.next_sequence = oldest.wrapping_add(1);
        oldest
    }
}

struct Inner {
    mac: MacAddress,
    config: SessionConfig,
    transport: UdpTransport,
    sender: UdpSender,
    state: Mutex<SessionState>,
    cache: RwLock<DeviceState>,
    subscriptions: DashMap<u32, SubscriptionCallback>,
    next_sub_id: AtomicU32,
    /// Callbacks queued in receipt order
    dispatch: mpsc::UnboundedSender<Job>,
}

/// Session with one device.
///
/// Cloning is cheap; all clones share the same session.
#[derive(Clone)]
pub struct Device {
    inner: Arc<Inner>,
}

impl Device {
    /// Open a session with a device at a known address
    pub async fn open(mac: MacAddress, addr: SocketAddr, config: SessionConfig) -> Result<Self> {
        let local = config.local_addr_for(addr);
        let transport = UdpTransport::bind(&local.to_string()).await?;
        let sender = transport.sender_to(addr);
        let receiver = transport.start_receiver();
        let (dispatch, jobs) = mpsc::unbounded_channel();

        let inner = Arc::new(Inner {
            mac,
            config,
            transport,
            sender,
            state: Mutex::new(SessionState {
                next_sequence: 0,
                next_issue: 0,
                pending: HashMap::new(),
                last_seen: Instant::now(),
                liveness: Liveness::Alive,
            }),
            cache: RwLock::new(DeviceState::default()),
            subscriptions: DashMap::new(),
            next_sub_id: AtomicU32::new(1),
            dispatch,
        });

        tokio::spawn(dispatch_loop(jobs));
        tokio::spawn(receive_loop(Arc::downgrade(&inner), receiver));

        info!("Opened session with {} at {}", mac, addr);
        Ok(Self { inner })
    }

    /// Hardware address; never changes
    pub fn mac(&self) -> MacAddress {
        self.inner.mac
    }

    /// Current unicast address
    pub fn addr(&self) -> SocketAddr {
        self.inner.sender.remote()
    }

    /// Move the session to a new address
    pub fn set_addr(&self, addr: SocketAddr) {
        self.inner.sender.set_remote(addr);
    }

    pub fn source(&self) -> u32 {
        self.inner.config.source
    }

    /// Local address of the session socket
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.inner.transport.local_addr()?)
    }

    /// When the device was last heard from
    pub fn last_seen(&self) -> Instant {
        self.inner.state.lock().last_seen
    }

    /// Record that the device is alive without a datagram on this session
    pub fn touch(&self) {
        let mut state = self.inner.state.lock();
        if state.liveness != Liveness::Closed {
            state.last_seen = Instant::now();
            state.liveness = Liveness::Alive;
        }
    }

    pub fn liveness(&self) -> Liveness {
        self.inner.state.lock().liveness
    }

    pub fn is_closed(&self) -> bool {
        self.liveness() == Liveness::Closed
    }

    /// Number of requests waiting for a reply
    pub fn pending_count(&self) -> usize {
        self.inner.state.lock().pending.len()
    }

    /// Snapshot of the last reported device state
    pub fn state(&self) -> DeviceState {
        self.inner.cache.read().clone()
    }

    /// Call `callback` for every unsolicited datagram. Returns an id for
    /// [`Device::unsubscribe`].
    pub fn subscribe<F>(&self, callback: F) -> u32
    where
        F: Fn(&Device, &Header, &Message) + Send + Sync + 'static,
    {
        let id = self.inner.next_sub_id.fetch_add(1, Ordering::SeqCst);
        self.inner.subscriptions.insert(id, Arc::new(callback));
        debug!("{}: subscription {} added", self.inner.mac, id);
        id
    }

    pub fn unsubscribe(&self, id: u32) -> bool {
        self.inner.subscriptions.remove(&id).is_some()
    }

    /// Send a request.
    ///
    /// Queries ask for a response and are always tracked. Mutations ask for
    /// an acknowledgement when a callback is given and are otherwise sent
    /// without any flag and forgotten. `options` can force either flag.
    /// The callback, if any, runs exactly once on the session's dispatch
    /// task, never from within this call.
    ///
    /// Returns the sequence number used.
    pub async fn send_request(&self, message: Message, options: RequestOptions) -> Result<u8> {
        let RequestOptions {
            mut callback,
            ack_required,
            res_required,
            timeout,
            max_attempts,
        } = options;

        let (ack, res) = request_flags(&message, callback.is_some(), ack_required, res_required);
        let tracked = ack || res;

        let (sequence, issued, frame, evicted) = {
            let mut state = self.inner.state.lock();
            if state.liveness == Liveness::Closed {
                return Err(ClientError::SessionClosed);
            }

            let sequence = state.allocate_sequence();
            let header = Header::to_device(self.inner.mac, self.inner.config.source, sequence)
                .with_ack_required(ack)
                .with_res_required(res);
            let frame = codec::encode(&header, &message)?;

            let issued = state.next_issue;
            state.next_issue += 1;

            let evicted = if tracked {
                let evicted = state.pending.remove(&sequence);
                state.pending.insert(
                    sequence,
                    PendingRequest {
                        expect: Expectation::for_request(&message, ack, res),
                        callback: callback.take(),
                        issued,
                        attempts: 1,
                        timer: None,
                    },
                );
                evicted
            } else {
                None
            };

            (sequence, issued, frame, evicted)
        };

        if let Some(entry) = evicted {
            debug!(
                "{}: all sequence numbers pending, expiring seq={}",
                self.inner.mac, sequence
            );
            self.finish(entry, Response::NoResponse);
        }

        trace!(
            "{}: sending {} seq={} ack={} res={}",
            self.inner.mac,
            message.name(),
            sequence,
            ack,
            res
        );

        if let Err(e) = self.inner.sender.send(frame.clone()).await {
            if tracked {
                self.remove_pending(sequence, issued);
            }
            return Err(e.into());
        }

        if !tracked {
            // Nothing will answer; settle the callback right away.
            if let Some(callback) = callback {
                self.deliver(callback, Response::NoResponse);
            }
            return Ok(sequence);
        }

        let timeout = timeout.unwrap_or(self.inner.config.timeout);
        let max_attempts = max_attempts.unwrap_or(self.inner.config.max_attempts).max(1);
        let timer = tokio::spawn(retry_loop(
            Arc::downgrade(&self.inner),
            sequence,
            issued,
            frame,
            timeout,
            max_attempts,
        ))
        .abort_handle();

        let mut state = self.inner.state.lock();
        match state.pending.get_mut(&sequence) {
            Some(entry) if entry.issued == issued => entry.timer = Some(timer),
            // Already resolved or the session closed
            _ => timer.abort(),
        }

        Ok(sequence)
    }

    /// Send a request and wait for its outcome
    pub async fn request(&self, message: Message) -> Result<Response> {
        self.request_with(message, RequestOptions::new()).await
    }

    /// Send a request with explicit options and wait for its outcome.
    ///
    /// Any callback in `options` is replaced.
    pub async fn request_with(
        &self,
        message: Message,
        options: RequestOptions,
    ) -> Result<Response> {
        let (tx, rx) = oneshot::channel();
        let options = options.with_callback(move |_, response| {
            let _ = tx.send(response);
        });
        self.send_request(message, options).await?;
        Ok(rx.await.unwrap_or(Response::NoResponse))
    }

    /// Fire-and-forget send
    pub async fn send(&self, message: Message) -> Result<()> {
        self.send_request(message, RequestOptions::new()).await?;
        Ok(())
    }

    /// Close the session. Pending callbacks receive [`Response::NoResponse`].
    /// Idempotent.
    pub fn close(&self) {
        let drained: Vec<PendingRequest> = {
            let mut state = self.inner.state.lock();
            if state.liveness == Liveness::Closed {
                return;
            }
            state.liveness = Liveness::Closed;
            state.pending.drain().map(|(_, entry)| entry).collect()
        };

        for entry in drained {
            self.finish(entry, Response::NoResponse);
        }

        self.inner.transport.close();
        info!("Closed session with {}", self.inner.mac);
    }

    // ------------------------------------------------------------------
    // Convenience operations
    // ------------------------------------------------------------------

    async fn query<T>(
        &self,
        message: Message,
        extract: impl FnOnce(Message) -> Option<T>,
    ) -> Result<Option<T>> {
        let response = self.request(message).await?;
        Ok(response.into_message().and_then(extract))
    }

    pub async fn get_label(&self) -> Result<Option<String>> {
        self.query(Message::GetLabel, |m| match m {
            Message::StateLabel { label } => Some(label),
            _ => None,
        })
        .await
    }

    /// Set the label, cutting it to 32 bytes
    pub async fn set_label(&self, label: &str) -> Result<()> {
        let label = lifx_core::truncate_label(label).to_string();
        self.send(Message::SetLabel { label }).await
    }

    /// Device power level, 0 or 65535
    pub async fn get_power(&self) -> Result<Option<u16>> {
        self.query(Message::GetPower, |m| match m {
            Message::StatePower { level } => Some(level),
            _ => None,
        })
        .await
    }

    pub async fn set_power(&self, on: bool) -> Result<()> {
        let level = if on { POWER_ON } else { POWER_OFF };
        self.send(Message::SetPower { level }).await
    }

    /// Current colour, power and label
    pub async fn get_color(&self) -> Result<Option<LightStatus>> {
        self.query(Message::LightGet, |m| match m {
            Message::LightState(status) => Some(status),
            _ => None,
        })
        .await
    }

    /// Fade to `color` over `duration` milliseconds
    pub async fn set_color(&self, color: Hsbk, duration: u32) -> Result<()> {
        self.send(Message::LightSetColor { color, duration }).await
    }

    /// Power the light on or off over `duration` milliseconds
    pub async fn set_light_power(&self, on: bool, duration: u32) -> Result<()> {
        let level = if on { POWER_ON } else { POWER_OFF };
        self.send(Message::LightSetPower { level, duration }).await
    }

    pub async fn set_waveform(&self, options: WaveformOptions) -> Result<()> {
        self.send(Message::LightSetWaveform(options)).await
    }

    pub async fn set_waveform_optional(&self, options: WaveformOptionalOptions) -> Result<()> {
        self.send(Message::LightSetWaveformOptional(options)).await
    }

    pub async fn get_wifi_info(&self) -> Result<Option<SignalInfo>> {
        self.query(Message::GetWifiInfo, |m| match m {
            Message::StateWifiInfo(info) => Some(info),
            _ => None,
        })
        .await
    }

    pub async fn get_host_info(&self) -> Result<Option<SignalInfo>> {
        self.query(Message::GetHostInfo, |m| match m {
            Message::StateHostInfo(info) => Some(info),
            _ => None,
        })
        .await
    }

    pub async fn get_host_firmware(&self) -> Result<Option<FirmwareInfo>> {
        self.query(Message::GetHostFirmware, |m| match m {
            Message::StateHostFirmware(fw) => Some(fw),
            _ => None,
        })
        .await
    }

    pub async fn get_wifi_firmware(&self) -> Result<Option<FirmwareInfo>> {
        self.query(Message::GetWifiFirmware, |m| match m {
            Message::StateWifiFirmware(fw) => Some(fw),
            _ => None,
        })
        .await
    }

    pub async fn get_version(&self) -> Result<Option<ProductVersion>> {
        self.query(Message::GetVersion, |m| match m {
            Message::StateVersion {
                vendor,
                product,
                version,
            } => Some(ProductVersion {
                vendor,
                product,
                version,
            }),
            _ => None,
        })
        .await
    }

    /// Device clock and uptime
    pub async fn get_info(&self) -> Result<Option<UptimeInfo>> {
        self.query(Message::GetInfo, |m| match m {
            Message::StateInfo {
                time,
                uptime,
                downtime,
            } => Some(UptimeInfo {
                time,
                uptime,
                downtime,
            }),
            _ => None,
        })
        .await
    }

    pub async fn get_location(&self) -> Result<Option<Membership>> {
        self.query(Message::GetLocation, |m| match m {
            Message::StateLocation(location) => Some(location),
            _ => None,
        })
        .await
    }

    pub async fn get_group(&self) -> Result<Option<Membership>> {
        self.query(Message::GetGroup, |m| match m {
            Message::StateGroup(group) => Some(group),
            _ => None,
        })
        .await
    }

    pub async fn get_infrared(&self) -> Result<Option<u16>> {
        self.query(Message::LightGetInfrared, |m| match m {
            Message::LightStateInfrared { brightness } => Some(brightness),
            _ => None,
        })
        .await
    }

    pub async fn set_infrared(&self, brightness: u16) -> Result<()> {
        self.send(Message::LightSetInfrared { brightness }).await
    }

    /// Read zone colours of a multizone device as `(index, colour)` pairs.
    ///
    /// `end_index` defaults to `start_index + 7`. A device answers a range
    /// wider than eight zones with several reports; this returns the first
    /// and the rest land in [`Device::state`] as they arrive.
    pub async fn get_color_zones(
        &self,
        start_index: u8,
        end_index: Option<u8>,
    ) -> Result<Option<Vec<(u8, Hsbk)>>> {
        self.query(Message::get_color_zones(start_index, end_index), |m| match m {
            Message::MultiZoneStateMultiZone(block) => Some(block.zones().collect()),
            Message::MultiZoneStateZone(zone) => Some(vec![(zone.index, zone.color)]),
            _ => None,
        })
        .await
    }

    /// Paint one colour across a range of zones
    pub async fn set_color_zones(&self, zones: ColorZones) -> Result<()> {
        self.send(Message::MultiZoneSetColorZones(zones)).await
    }

    /// Restart the device. Resolves once the device acknowledges.
    pub async fn reboot(&self) -> Result<Response> {
        self.request(Message::SetReboot).await
    }

    /// Round-trip `data` (cut or padded to 64 bytes) through the device
    pub async fn echo(&self, data: &[u8]) -> Result<Option<[u8; ECHO_SIZE]>> {
        self.query(Message::echo_request(data), |m| match m {
            Message::EchoResponse { payload } => Some(payload),
            _ => None,
        })
        .await
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn handle_datagram(&self, data: &Bytes, from: SocketAddr) {
        let (header, message) = match codec::decode(data) {
            Ok(decoded) => decoded,
            Err(e) => {
                debug!("{}: dropping datagram from {}: {}", self.inner.mac, from, e);
                return;
            }
        };

        let (outcome, resolved) = {
            let mut state = self.inner.state.lock();
            if state.liveness == Liveness::Closed {
                return;
            }
            self.inner.sender.set_remote(from);
            state.last_seen = Instant::now();
            state.liveness = Liveness::Alive;

            let expectation = state.pending.get(&header.sequence).map(|entry| &entry.expect);
            let outcome = correlate(self.inner.config.source, &header, &message, expectation);
            let resolved = match outcome {
                Correlation::Resolve => state.pending.remove(&header.sequence),
                _ => None,
            };
            (outcome, resolved)
        };

        if message.is_state() {
            self.inner.cache.write().apply(&message);
        }

        match outcome {
            Correlation::Resolve => {
                trace!(
                    "{}: seq={} resolved by {}",
                    self.inner.mac,
                    header.sequence,
                    message.name()
                );
                if let Some(entry) = resolved {
                    self.finish(entry, Response::Received { header, message });
                }
            }
            Correlation::Acknowledged => {
                trace!("{}: seq={} acknowledged", self.inner.mac, header.sequence);
            }
            Correlation::Unsolicited => {
                trace!("{}: unsolicited {}", self.inner.mac, message.name());
                self.notify_subscribers(header, message);
            }
        }
    }

    fn notify_subscribers(&self, header: Header, message: Message) {
        let callbacks: Vec<SubscriptionCallback> = self
            .inner
            .subscriptions
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        if callbacks.is_empty() {
            return;
        }

        self.dispatch(move |device| {
            for callback in callbacks {
                callback(device, &header, &message);
            }
        });
    }

    /// Complete a request that left the pending map
    fn finish(&self, mut entry: PendingRequest, response: Response) {
        if let Some(timer) = entry.timer.take() {
            timer.abort();
        }
        if let Some(callback) = entry.callback.take() {
            self.deliver(callback, response);
        }
    }

    fn deliver(&self, callback: ResponseCallback, response: Response) {
        self.dispatch(move |device| callback(device, response));
    }

    /// Queue `job` behind everything already dispatched for this session
    fn dispatch<F>(&self, job: F)
    where
        F: FnOnce(&Device) + Send + 'static,
    {
        let device = self.clone();
        let job: Job = Box::new(move || job(&device));
        if self.inner.dispatch.send(job).is_err() {
            debug!("{}: dispatch task gone, dropping callback", self.inner.mac);
        }
    }

    fn remove_pending(&self, sequence: u8, issued: u64) -> Option<PendingRequest> {
        let mut state = self.inner.state.lock();
        match state.pending.get(&sequence) {
            Some(entry) if entry.issued == issued => state.pending.remove(&sequence),
            _ => None,
        }
    }

    /// Last attempt timed out
    fn expire(&self, sequence: u8, issued: u64) {
        let entry = {
            let mut state = self.inner.state.lock();
            match state.pending.get(&sequence) {
                Some(entry) if entry.issued == issued => {
                    state.liveness = Liveness::Unreachable;
                    state.pending.remove(&sequence)
                }
                _ => None,
            }
        };

        if let Some(entry) = entry {
            warn!(
                "{}: no response to seq={} after {} attempts",
                self.inner.mac, sequence, entry.attempts
            );
            self.finish(entry, Response::NoResponse);
        }
    }
}

impl fmt::Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device")
            .field("mac", &self.inner.mac)
            .field("addr", &self.addr())
            .field("liveness", &self.liveness())
            .finish()
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {}", self.inner.mac, self.addr())
    }
}

impl PartialEq for Device {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Device {}

/// Runs one session's callbacks one at a time, in queue order
async fn dispatch_loop(mut jobs: mpsc::UnboundedReceiver<Job>) {
    while let Some(job) = jobs.recv().await {
        if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
            warn!("session callback panicked");
        }
    }
    trace!("session dispatch loop finished");
}

async fn receive_loop(session: Weak<Inner>, mut receiver: UdpReceiver) {
    while let Some((event, from)) = receiver.recv_from().await {
        let Some(inner) = session.upgrade() else {
            break;
        };
        let device = Device { inner };
        match event {
            TransportEvent::Data(data) => device.handle_datagram(&data, from),
            TransportEvent::Error(e) => debug!("{}: receive error: {}", device.inner.mac, e),
        }
    }
    trace!("session receive loop finished");
}

async fn retry_loop(
    session: Weak<Inner>,
    sequence: u8,
    issued: u64,
    frame: Bytes,
    timeout: Duration,
    max_attempts: u32,
) {
    loop {
        tokio::time::sleep(timeout).await;

        let Some(inner) = session.upgrade() else {
            return;
        };
        let device = Device { inner };

        let attempt = {
            let mut state = device.inner.state.lock();
            match state.pending.get_mut(&sequence) {
                Some(entry) if entry.issued == issued => {
                    if entry.attempts >= max_attempts {
                        None
                    } else {
                        entry.attempts += 1;
                        Some(entry.attempts)
                    }
                }
                _ => return,
            }
        };

        let Some(attempt) = attempt else {
            device.expire(sequence, issued);
            return;
        };

        debug!(
            "{}: retransmitting seq={} (attempt {}/{})",
            device.inner.mac, sequence, attempt, max_attempts
        );
        if let Err(e) = device.inner.sender.send(frame.clone()).await {
            debug!("{}: retransmit failed: {}", device.inner.mac, e);
        }
    }
}
