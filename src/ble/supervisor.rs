//! Connection supervisor - owns the single radio link.
//!
//! State machine:
//!
//! ```text
//! Idle -> Scanning <-> Connecting -> Connected -> Subscribed
//!                        |              |            |
//!                        +--------------+------------+--> closed (back to Idle / Scanning)
//! ```
//!
//! Timers are owned by the state they guard: the scan tick by the
//! scanning flag, the connect timeout by the [`LinkSession`]. Clearing the
//! state drops the [`TimerGuard`] and with it the timer. Transport calls
//! are made after the state lock is released.

use std::ops::ControlFlow;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use heapless::String;
use prost::Message;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::ble::adv_parser;
use crate::ble::registry::{Candidate, Registry};
use crate::ble::{
    truncated_name, Advertisement, Characteristic, CloseReason, DisconnectReason, LinkEvent,
    LinkState, PeripheralId, SessionId, Transport, TransportEvent, ValueError,
};
use crate::config::{
    CONNECT_TIMEOUT_ATTEMPTS, CONNECT_TIMEOUT_TICK, LINK_EVENT_CAPACITY, SCAN_TICK,
};
use crate::error::{Error, Result};
use crate::mesh::proto::{to_radio, LogRecord, ToRadio};
use crate::notify::{Notification, Notifier};
use crate::storage::{self, Preferences};
use crate::timer::TimerGuard;

pub const UNKNOWN_DEVICE_ERROR: &str = "Bluetooth connection error, please try again.";
pub const INSUFFICIENT_SECURITY_ERROR: &str = "Bluetooth authentication or encryption is insufficient. Please check connecting again and pay attention to the PIN code.";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SessionState {
    Connecting,
    Connected,
    Subscribed,
}

/// The one active (or in-progress) link.
struct LinkSession {
    id: SessionId,
    peripheral: PeripheralId,
    name: String<32>,
    state: SessionState,
    timeout_attempts: u32,
    timeout_timer: Option<TimerGuard>,
    handshake_nonce: Option<u32>,
    node_num: Option<u32>,
    firmware_version: Option<std::string::String>,
    invalid_firmware: bool,
    rssi: Option<i16>,
}

struct LinkInner {
    registry: Registry,
    scanning: bool,
    scan_timer: Option<TimerGuard>,
    auto_reconnect: bool,
    session: Option<LinkSession>,
    last_error: Option<std::string::String>,
    next_session: u64,
}

struct Shared {
    transport: Arc<dyn Transport>,
    preferences: Arc<dyn Preferences>,
    notifier: Arc<dyn Notifier>,
    inner: Mutex<LinkInner>,
    events: broadcast::Sender<LinkEvent>,
}

/// Read-only view of the link, safe to hand to UI code.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkSnapshot {
    pub state: LinkState,
    pub session: Option<SessionId>,
    pub peripheral: Option<PeripheralId>,
    pub name: Option<String<32>>,
    pub timeout_attempts: u32,
    pub last_error: Option<std::string::String>,
    pub handshake_nonce: Option<u32>,
    pub node_num: Option<u32>,
    pub firmware_version: Option<std::string::String>,
    pub invalid_firmware: bool,
    pub rssi: Option<i16>,
    pub scanning: bool,
    pub auto_reconnect: bool,
}

impl LinkSnapshot {
    pub fn is_connected(&self) -> bool {
        matches!(self.state, LinkState::Connected | LinkState::Subscribed)
    }

    pub fn is_subscribed(&self) -> bool {
        self.state == LinkState::Subscribed
    }
}

/// A `FromRadio` frame read from the current session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InboundFrame {
    pub session: SessionId,
    pub data: Vec<u8>,
}

/// Cheap-to-clone handle; all clones share one link.
#[derive(Clone)]
pub struct Supervisor {
    shared: Arc<Shared>,
}

impl Supervisor {
    pub fn new(
        transport: Arc<dyn Transport>,
        preferences: Arc<dyn Preferences>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let (events, _) = broadcast::channel(LINK_EVENT_CAPACITY);
        Self {
            shared: Arc::new(Shared {
                transport,
                preferences,
                notifier,
                inner: Mutex::new(LinkInner {
                    registry: Registry::new(),
                    scanning: false,
                    scan_timer: None,
                    auto_reconnect: true,
                    session: None,
                    last_error: None,
                    next_session: 1,
                }),
                events,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LinkInner> {
        self.shared.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn weak(&self) -> Weak<Shared> {
        Arc::downgrade(&self.shared)
    }

    fn emit(&self, event: LinkEvent) {
        // No receivers is fine.
        let _ = self.shared.events.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LinkEvent> {
        self.shared.events.subscribe()
    }

    pub fn preferences(&self) -> &Arc<dyn Preferences> {
        &self.shared.preferences
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Queries
    // ═══════════════════════════════════════════════════════════════════════

    pub fn snapshot(&self) -> LinkSnapshot {
        let inner = self.lock();
        let session = inner.session.as_ref();
        LinkSnapshot {
            state: state_of(&inner),
            session: session.map(|s| s.id),
            peripheral: session.map(|s| s.peripheral),
            name: session.map(|s| s.name.clone()),
            timeout_attempts: session.map_or(0, |s| s.timeout_attempts),
            last_error: inner.last_error.clone(),
            handshake_nonce: session.and_then(|s| s.handshake_nonce),
            node_num: session.and_then(|s| s.node_num),
            firmware_version: session.and_then(|s| s.firmware_version.clone()),
            invalid_firmware: session.map_or(false, |s| s.invalid_firmware),
            rssi: session.and_then(|s| s.rssi),
            scanning: inner.scanning,
            auto_reconnect: inner.auto_reconnect,
        }
    }

    pub fn state(&self) -> LinkState {
        state_of(&self.lock())
    }

    pub fn last_error(&self) -> Option<std::string::String> {
        self.lock().last_error.clone()
    }

    /// Visible radios, preferred first, then most recently seen.
    pub fn candidates(&self) -> Vec<Candidate> {
        let preferred = self.shared.preferences.load().preferred_devices;
        self.lock()
            .registry
            .sorted_by_preference(&preferred, Instant::now())
    }

    pub fn candidate(&self, id: PeripheralId) -> Option<Candidate> {
        self.lock().registry.get(id).cloned()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Scanning
    // ═══════════════════════════════════════════════════════════════════════

    /// Begin discovery and the 1 Hz reconnect tick.
    ///
    /// No-op while already scanning or when the radio stack is off.
    pub fn start_scanning(&self) {
        if self.lock().scanning {
            return;
        }

        // The transport may call back into the supervisor; no lock held here.
        if !self.shared.transport.is_powered_on() {
            info!("peripheral scanning denied: bluetooth unavailable");
            return;
        }

        if let Err(e) = self.shared.transport.start_scan() {
            warn!(error = %e, "failed to start scanning");
            return;
        }

        let mut inner = self.lock();
        if inner.scanning {
            return;
        }
        let weak = self.weak();
        inner.scanning = true;
        inner.scan_timer = TimerGuard::repeating(SCAN_TICK, move || match weak.upgrade() {
            Some(shared) => {
                Supervisor { shared }.on_scan_tick();
                ControlFlow::Continue(())
            }
            None => ControlFlow::Break(()),
        });
        let seen_before = !inner.registry.is_empty();
        drop(inner);

        debug!("device scanning started");
        self.emit(LinkEvent::ScanningChanged(true));

        // Check radios seen before scanning started.
        if seen_before {
            self.on_devices_change();
        }
    }

    pub fn stop_scanning(&self) {
        let mut inner = self.lock();
        if !inner.scanning {
            return;
        }
        inner.scanning = false;
        inner.scan_timer = None;
        drop(inner);

        self.shared.transport.stop_scan();
        debug!("device scanning stopped");
        self.emit(LinkEvent::ScanningChanged(false));
    }

    pub fn set_auto_reconnect(&self, enabled: bool) {
        let mut inner = self.lock();
        if inner.auto_reconnect != enabled {
            debug!(enabled, "auto-reconnect changed");
            inner.auto_reconnect = enabled;
        }
    }

    fn on_scan_tick(&self) {
        let removed = self.lock().registry.prune(Instant::now());
        if removed > 0 {
            debug!(removed, "candidates aged out");
        }
        self.on_devices_change();
    }

    /// Notify listeners, then run the auto-reconnect policy.
    fn on_devices_change(&self) {
        self.emit(LinkEvent::CandidatesChanged);

        let preferred = self.shared.preferences.load().preferred_devices;
        let target = {
            let inner = self.lock();
            if !inner.auto_reconnect || inner.session.is_some() {
                return;
            }
            inner
                .registry
                .select_preferred(&preferred, Instant::now())
                .map(|c| c.id)
        };

        if let Some(id) = target {
            // connect to first preferred device visible
            self.connect_to(id);
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Connect / disconnect
    // ═══════════════════════════════════════════════════════════════════════

    /// Open a session to `id`. Returns `true` when a new attempt started.
    ///
    /// Asking for the radio already being connected to is a no-op; asking
    /// for the radio already linked re-announces `DeviceConnected`. A
    /// session to any other radio is torn down first.
    pub fn connect_to(&self, id: PeripheralId) -> bool {
        let mut inner = self.lock();

        let mut replaced = None;
        if let Some(current) = &inner.session {
            if current.peripheral == id {
                if current.state == SessionState::Connecting {
                    debug!(peripheral = %id, "already connecting");
                    return false;
                }
                let event = LinkEvent::DeviceConnected {
                    session: current.id,
                    peripheral: id,
                    name: current.name.clone(),
                };
                drop(inner);
                debug!(peripheral = %id, "device is already connected");
                self.emit(event);
                return false;
            }
            debug!("connecting to a different device - disconnecting current one");
            replaced = inner.session.take();
        }

        let session = SessionId(inner.next_session);
        inner.next_session += 1;
        let name = inner
            .registry
            .get(id)
            .map(|c| c.name.clone())
            .unwrap_or_else(|| truncated_name("Unknown node"));

        let weak = self.weak();
        let timeout_timer =
            TimerGuard::repeating(CONNECT_TIMEOUT_TICK, move || match weak.upgrade() {
                Some(shared) => Supervisor { shared }.on_timeout_tick(session),
                None => ControlFlow::Break(()),
            });

        inner.last_error = None;
        inner.auto_reconnect = true;
        inner.session = Some(LinkSession {
            id: session,
            peripheral: id,
            name,
            state: SessionState::Connecting,
            timeout_attempts: 0,
            timeout_timer,
            handshake_nonce: None,
            node_num: None,
            firmware_version: None,
            invalid_firmware: false,
            rssi: None,
        });
        drop(inner);

        if let Some(old) = replaced {
            self.shared.transport.cancel_connect(old.peripheral);
            self.emit(LinkEvent::SessionClosed {
                session: old.id,
                peripheral: old.peripheral,
                reason: CloseReason::Disconnected { reconnect: true },
            });
        }

        info!(peripheral = %id, "attempting to connect");
        if let Err(e) = self.shared.transport.connect(id) {
            error!(peripheral = %id, error = %e, "connect request rejected");
            let mut inner = self.lock();
            let failed = take_session(&mut inner, session);
            inner.last_error = Some(Error::from(e).to_string());
            drop(inner);
            if failed.is_some() {
                self.emit(LinkEvent::SessionClosed {
                    session,
                    peripheral: id,
                    reason: CloseReason::Lost(None),
                });
            }
            return false;
        }

        self.emit(LinkEvent::Connecting {
            session,
            peripheral: id,
        });
        info!(target: "meshlink::analytics", event = "ble_connect");
        true
    }

    fn on_timeout_tick(&self, session: SessionId) -> ControlFlow<()> {
        let mut inner = self.lock();
        let Some(current) = inner
            .session
            .as_mut()
            .filter(|s| s.id == session && s.state == SessionState::Connecting)
        else {
            return ControlFlow::Break(());
        };

        current.timeout_attempts += 1;
        let attempts = current.timeout_attempts;
        inner.last_error = None;
        warn!(attempt = attempts, "bluetooth connection timed out");

        if attempts < CONNECT_TIMEOUT_ATTEMPTS {
            return ControlFlow::Continue(());
        }

        let expired = inner.session.take();
        inner.last_error = Some(Error::ConnectionTimeout.to_string());
        drop(inner);

        if let Some(expired) = expired {
            self.shared.transport.cancel_connect(expired.peripheral);
            self.emit(LinkEvent::SessionClosed {
                session,
                peripheral: expired.peripheral,
                reason: CloseReason::TimedOut,
            });
        }
        info!(target: "meshlink::analytics", event = "ble_timeout");
        ControlFlow::Break(())
    }

    /// Explicit user abort. Disables auto-reconnect until the next
    /// `connect_to`. Calling it again is a no-op.
    pub fn cancel_peripheral_connection(&self) {
        let mut inner = self.lock();
        if inner.session.is_none() && !inner.auto_reconnect {
            return;
        }
        let cancelled = inner.session.take();
        inner.auto_reconnect = false;
        drop(inner);

        if let Some(cancelled) = cancelled {
            self.shared.transport.cancel_connect(cancelled.peripheral);
            self.emit(LinkEvent::SessionClosed {
                session: cancelled.id,
                peripheral: cancelled.peripheral,
                reason: CloseReason::Cancelled,
            });
        }
        info!(target: "meshlink::analytics", event = "ble_cancel_connecting");
    }

    /// Tear down the session; `reconnect` decides whether scan ticks may
    /// re-acquire a radio.
    pub fn disconnect_device(&self, reconnect: bool) {
        let mut inner = self.lock();
        let Some(closed) = inner.session.take() else {
            return;
        };
        inner.auto_reconnect = reconnect;
        drop(inner);

        self.shared.transport.cancel_connect(closed.peripheral);
        info!(peripheral = %closed.peripheral, reconnect, "device disconnected");
        self.emit(LinkEvent::SessionClosed {
            session: closed.id,
            peripheral: closed.peripheral,
            reason: CloseReason::Disconnected { reconnect },
        });
        info!(target: "meshlink::analytics", event = "ble_disconnect");
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Transport callbacks
    // ═══════════════════════════════════════════════════════════════════════

    /// Route one transport callback. Returns a radio frame for the
    /// protocol bridge when one was read.
    pub fn handle(&self, event: TransportEvent) -> Option<InboundFrame> {
        match event {
            TransportEvent::PowerChanged(on) => self.on_power_changed(on),
            TransportEvent::Discovered(adv) => self.on_discovered(adv),
            TransportEvent::Connected(id) => self.on_connected(id),
            TransportEvent::ConnectFailed(id, reason) => self.on_connect_failed(id, reason),
            TransportEvent::Disconnected(id, reason) => self.on_disconnected(id, reason),
            TransportEvent::ValueUpdated(id, characteristic, data) => {
                return self.on_value_updated(id, characteristic, data);
            }
            TransportEvent::ValueFailed(id, characteristic, error) => {
                self.on_value_failed(id, characteristic, error)
            }
            TransportEvent::RssiUpdated(id, rssi) => self.on_rssi(id, rssi),
        }
        None
    }

    pub fn on_power_changed(&self, powered_on: bool) {
        info!(powered_on, "central state changed");
        if powered_on {
            self.start_scanning();
        } else {
            let mut inner = self.lock();
            let was_scanning = inner.scanning;
            inner.scanning = false;
            inner.scan_timer = None;
            drop(inner);
            if was_scanning {
                self.emit(LinkEvent::ScanningChanged(false));
            }
        }
    }

    pub fn on_discovered(&self, adv: Advertisement) {
        self.lock().registry.observe(adv, Instant::now());
        self.on_devices_change();
    }

    /// For stacks that report raw advertising data. Non-mesh devices are
    /// ignored; returns whether the sighting was recorded.
    pub fn on_advertisement_data(&self, id: PeripheralId, rssi: i16, data: &[u8]) -> bool {
        match adv_parser::parse_advertisement(id, rssi, data) {
            Some(adv) => {
                self.on_discovered(adv);
                true
            }
            None => false,
        }
    }

    pub fn on_connected(&self, id: PeripheralId) {
        storage::update(self.shared.preferences.as_ref(), |s| {
            s.remember_preferred(id)
        });

        let mut inner = self.lock();
        let tracked = inner.session.as_ref().map(|s| s.peripheral);
        let known = inner.registry.get(id).is_some() || tracked == Some(id);

        if !known {
            error!(peripheral = %id, "can't find device it just connected to");
            inner.last_error = Some(UNKNOWN_DEVICE_ERROR.into());
            drop(inner);
            self.shared.transport.cancel_connect(id);
            self.disconnect_device(true);
            return;
        }

        if tracked.is_some_and(|p| p != id) || (tracked.is_none() && !inner.auto_reconnect) {
            drop(inner);
            warn!(peripheral = %id, "unrequested connection - dropping it");
            self.shared.transport.cancel_connect(id);
            return;
        }

        if tracked.is_none() {
            // The stack finished an attempt we no longer track; adopt it.
            let session = SessionId(inner.next_session);
            inner.next_session += 1;
            let name = inner
                .registry
                .get(id)
                .map(|c| c.name.clone())
                .unwrap_or_else(|| truncated_name("Unknown node"));
            inner.session = Some(LinkSession {
                id: session,
                peripheral: id,
                name,
                state: SessionState::Connecting,
                timeout_attempts: 0,
                timeout_timer: None,
                handshake_nonce: None,
                node_num: None,
                firmware_version: None,
                invalid_firmware: false,
                rssi: None,
            });
        }

        let nonce = storage::update(self.shared.preferences.as_ref(), |s| s.next_config_nonce());
        inner.last_error = None;
        let Some(current) = inner.session.as_mut() else {
            return;
        };
        if current.state != SessionState::Connecting {
            debug!(peripheral = %id, "duplicate connect callback");
            return;
        }
        current.state = SessionState::Connected;
        current.timeout_timer = None;
        current.timeout_attempts = 0;
        current.handshake_nonce = Some(nonce);
        let event = LinkEvent::DeviceConnected {
            session: current.id,
            peripheral: id,
            name: current.name.clone(),
        };
        drop(inner);

        info!(peripheral = %id, "connected");
        self.emit(event);

        // Ask the radio to stream its configuration.
        let want_config = ToRadio {
            payload_variant: Some(to_radio::PayloadVariant::WantConfigId(nonce)),
        };
        if let Err(e) = self
            .shared
            .transport
            .write(id, Characteristic::ToRadio, want_config.encode_to_vec())
        {
            warn!(error = %e, "failed to request radio configuration");
            return;
        }
        debug!(nonce, "want_config sent");
        if let Err(e) = self.shared.transport.read(id, Characteristic::FromRadio) {
            warn!(error = %e, "failed to start reading from radio");
        }
    }

    pub fn on_connect_failed(&self, id: PeripheralId, reason: Option<DisconnectReason>) {
        error!(peripheral = %id, ?reason, "connect failed");
        self.cancel_peripheral_connection();
        if let Some(reason) = reason {
            self.lock().last_error = Some(reason.user_message());
        }
    }

    /// Transport-level drop. Clears the session; never retried here.
    pub fn on_disconnected(&self, id: PeripheralId, reason: Option<DisconnectReason>) {
        let mut inner = self.lock();
        if inner.session.as_ref().map(|s| s.peripheral) != Some(id) {
            debug!(peripheral = %id, "disconnect of an untracked peripheral");
            return;
        }
        let Some(lost) = inner.session.take() else {
            return;
        };
        if let Some(reason) = &reason {
            inner.last_error = Some(reason.user_message());
        }
        drop(inner);

        info!(peripheral = %id, ?reason, "disconnected");

        let preferred = self.shared.preferences.load().preferred_device();
        if let Some(reason) = reason.as_ref().filter(|r| r.notifies()) {
            if preferred == Some(id) {
                self.shared.notifier.queue(
                    Notification {
                        id: id.to_string(),
                        title: "Radio Disconnected".into(),
                        subtitle: Some(lost.name.to_string()),
                        body: reason.description().into(),
                        path: Some("/connection".into()),
                    },
                    Duration::ZERO,
                    false,
                    false,
                );
            }
        }

        self.emit(LinkEvent::SessionClosed {
            session: lost.id,
            peripheral: id,
            reason: CloseReason::Lost(reason),
        });
    }

    fn on_value_updated(
        &self,
        id: PeripheralId,
        characteristic: Characteristic,
        data: Vec<u8>,
    ) -> Option<InboundFrame> {
        let session = {
            let inner = self.lock();
            inner
                .session
                .as_ref()
                .filter(|s| s.peripheral == id && s.state != SessionState::Connecting)?
                .id
        };

        match characteristic {
            Characteristic::FromNum => {
                self.read_from_radio(id);
                None
            }
            Characteristic::FromRadio => {
                // An empty read means the queue is drained.
                if data.is_empty() {
                    return None;
                }
                self.read_from_radio(id);
                Some(InboundFrame { session, data })
            }
            Characteristic::LogRadio => {
                match LogRecord::decode(data.as_slice()) {
                    Ok(record) => info!(
                        target: "meshlink::radio",
                        level = record.level,
                        source = %record.source,
                        "{}",
                        record.message
                    ),
                    Err(e) => debug!(error = %e, "undecodable radio log record"),
                }
                None
            }
            Characteristic::LogRadioLegacy => {
                info!(target: "meshlink::radio", "{}", std::string::String::from_utf8_lossy(&data));
                None
            }
            Characteristic::ToRadio => None,
        }
    }

    fn read_from_radio(&self, id: PeripheralId) {
        if let Err(e) = self.shared.transport.read(id, Characteristic::FromRadio) {
            warn!(error = %e, "failed to read from radio");
        }
    }

    fn on_value_failed(&self, id: PeripheralId, characteristic: Characteristic, error: ValueError) {
        error!(peripheral = %id, ?characteristic, ?error, "characteristic update failed");
        if error == ValueError::InsufficientSecurity {
            self.lock().last_error = Some(INSUFFICIENT_SECURITY_ERROR.into());
            self.disconnect_device(false);
        }
    }

    fn on_rssi(&self, id: PeripheralId, rssi: i16) {
        let mut inner = self.lock();
        inner.registry.update_rssi(id, rssi);
        if let Some(s) = inner.session.as_mut().filter(|s| s.peripheral == id) {
            s.rssi = Some(rssi);
        }
    }

    /// Ask the transport for a fresh RSSI sample of the linked radio.
    pub fn read_rssi(&self) -> Result<()> {
        let peripheral = self
            .lock()
            .session
            .as_ref()
            .map(|s| s.peripheral)
            .ok_or(Error::NotConnected)?;
        self.shared.transport.read_rssi(peripheral)?;
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Session accessors used by the protocol bridge
    // ═══════════════════════════════════════════════════════════════════════

    /// Write a `ToRadio` frame on a linked session.
    pub fn write_frame(&self, session: SessionId, frame: Vec<u8>) -> Result<()> {
        let peripheral = {
            let inner = self.lock();
            match inner.session.as_ref().filter(|s| s.id == session) {
                Some(s) if s.state != SessionState::Connecting => s.peripheral,
                _ => return Err(Error::NotConnected),
            }
        };
        self.shared
            .transport
            .write(peripheral, Characteristic::ToRadio, frame)?;
        Ok(())
    }

    /// Mark the session subscribed if `nonce` ends its handshake.
    pub fn complete_handshake(&self, session: SessionId, nonce: u32) -> bool {
        let mut inner = self.lock();
        let Some(current) = inner.session.as_mut().filter(|s| s.id == session) else {
            return false;
        };
        if current.state != SessionState::Connected || current.handshake_nonce != Some(nonce) {
            return false;
        }
        current.state = SessionState::Subscribed;
        current.invalid_firmware = false;
        let peripheral = current.peripheral;
        inner.last_error = None;
        drop(inner);

        info!(peripheral = %peripheral, nonce, "radio configuration complete");
        self.emit(LinkEvent::HandshakeComplete {
            session,
            peripheral,
        });
        info!(target: "meshlink::analytics", event = "want_config_complete");
        true
    }

    pub fn set_node_num(&self, session: SessionId, num: u32) {
        if let Some(s) = self.lock().session.as_mut().filter(|s| s.id == session) {
            s.node_num = Some(num);
        }
    }

    /// Record the radio's firmware; an unsupported one also sets `last_error`.
    pub fn set_firmware(&self, session: SessionId, version: std::string::String, supported: bool) {
        let mut inner = self.lock();
        let Some(s) = inner.session.as_mut().filter(|s| s.id == session) else {
            return;
        };
        s.firmware_version = Some(version);
        s.invalid_firmware = !supported;
        if !supported {
            inner.last_error = Some(Error::UnsupportedFirmware.to_string());
        }
    }

    pub fn set_last_error(&self, message: Option<std::string::String>) {
        self.lock().last_error = message;
    }
}

fn state_of(inner: &LinkInner) -> LinkState {
    match inner.session.as_ref().map(|s| s.state) {
        Some(SessionState::Connecting) => LinkState::Connecting,
        Some(SessionState::Connected) => LinkState::Connected,
        Some(SessionState::Subscribed) => LinkState::Subscribed,
        None if inner.scanning => LinkState::Scanning,
        None => LinkState::Idle,
    }
}

fn take_session(inner: &mut LinkInner, session: SessionId) -> Option<LinkSession> {
    if inner.session.as_ref().map(|s| s.id) == Some(session) {
        inner.session.take()
    } else {
        None
    }
}
