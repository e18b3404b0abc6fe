//! Bluetooth Low Energy subsystem.
//!
//! This module drives a single radio link in the **Central** role:
//!
//! 1. **Registry** - tracks advertising radios, their signal tier and
//!    when they were last seen.
//! 2. **Supervisor** - owns the link state machine (scan, connect,
//!    timeout, handshake, disconnect) and publishes [`LinkEvent`]s.
//! 3. **Transport** - the platform BLE stack, consumed through the
//!    [`Transport`] trait. Results come back as [`TransportEvent`]s.

pub mod adv_parser;
#[cfg(feature = "btleplug")]
pub mod central;
pub mod registry;
pub mod supervisor;
#[cfg(test)]
mod tests;

use std::fmt;

use heapless::String;
use uuid::Uuid;

use crate::config;
use crate::error::TransportError;

pub use registry::{Candidate, Registry, SignalStrength};
pub use supervisor::{LinkSnapshot, Supervisor};

/// Stable identity of a peripheral as reported by the platform stack.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeripheralId(pub Uuid);

impl fmt::Display for PeripheralId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Opaque handle of one link session. Never reused within a process.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

/// GATT characteristics of the mesh radio service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Characteristic {
    ToRadio,
    FromRadio,
    FromNum,
    LogRadio,
    LogRadioLegacy,
}

impl Characteristic {
    pub const ALL: [Characteristic; 5] = [
        Characteristic::ToRadio,
        Characteristic::FromRadio,
        Characteristic::FromNum,
        Characteristic::LogRadio,
        Characteristic::LogRadioLegacy,
    ];

    pub fn uuid(self) -> Uuid {
        match self {
            Characteristic::ToRadio => config::TO_RADIO_UUID,
            Characteristic::FromRadio => config::FROM_RADIO_UUID,
            Characteristic::FromNum => config::FROM_NUM_UUID,
            Characteristic::LogRadio => config::LOG_RADIO_UUID,
            Characteristic::LogRadioLegacy => config::LOG_RADIO_LEGACY_UUID,
        }
    }

    pub fn from_uuid(uuid: Uuid) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.uuid() == uuid)
    }
}

/// A single sighting of an advertising radio.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Advertisement {
    pub id: PeripheralId,
    /// Local name (truncated to 32 bytes for `heapless::String`).
    pub name: String<32>,
    /// Received Signal Strength Indicator (dBm).
    pub rssi: i16,
}

impl Advertisement {
    pub fn new(id: PeripheralId, name: &str, rssi: i16) -> Self {
        Self {
            id,
            name: truncated_name(name),
            rssi,
        }
    }
}

/// Why the platform stack dropped a link.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DisconnectReason {
    /// Supervision timeout; the radio is probably out of range.
    Timeout,
    /// The radio closed the link (powered off, rebooted).
    PeerDisconnected,
    /// The user dismissed the pairing prompt.
    PairingCancelled,
    /// Anything else, with the platform's description.
    Other(std::string::String),
}

impl DisconnectReason {
    /// Text shown to the user as the link's last error.
    pub fn user_message(&self) -> std::string::String {
        match self {
            DisconnectReason::Timeout => "Connection timed out. Will connect back soon.".into(),
            DisconnectReason::PeerDisconnected => {
                "Node was disconnected. Check if it's turned on.".into()
            }
            DisconnectReason::PairingCancelled => {
                "Pairing was cancelled. Please try to pair the node again.".into()
            }
            DisconnectReason::Other(description) => description.clone(),
        }
    }

    /// Platform-style description, used as notification body.
    pub fn description(&self) -> &str {
        match self {
            DisconnectReason::Timeout => "The connection has timed out unexpectedly.",
            DisconnectReason::PeerDisconnected => "The specified device has disconnected from us.",
            DisconnectReason::PairingCancelled => "Peer removed pairing information.",
            DisconnectReason::Other(description) => description,
        }
    }

    /// Whether losing the preferred radio this way is worth a notification.
    pub fn notifies(&self) -> bool {
        matches!(
            self,
            DisconnectReason::PeerDisconnected | DisconnectReason::Other(_)
        )
    }
}

/// Failure reported for a characteristic read or notification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValueError {
    /// ATT "insufficient authentication / encryption" (wrong or missing PIN).
    InsufficientSecurity,
    Other(std::string::String),
}

/// Callbacks from the platform BLE stack.
#[derive(Clone, Debug, PartialEq)]
pub enum TransportEvent {
    PowerChanged(bool),
    Discovered(Advertisement),
    Connected(PeripheralId),
    ConnectFailed(PeripheralId, Option<DisconnectReason>),
    Disconnected(PeripheralId, Option<DisconnectReason>),
    ValueUpdated(PeripheralId, Characteristic, Vec<u8>),
    ValueFailed(PeripheralId, Characteristic, ValueError),
    RssiUpdated(PeripheralId, i16),
}

/// Platform BLE capability.
///
/// Every method is fire-and-forget: it must return promptly and report
/// outcomes later as [`TransportEvent`]s, never from inside the call. A
/// `Connected` event is only expected once the mesh service has been
/// discovered and `FromNum` / log notifications enabled.
pub trait Transport: Send + Sync {
    fn is_powered_on(&self) -> bool;
    fn start_scan(&self) -> Result<(), TransportError>;
    fn stop_scan(&self);
    fn connect(&self, id: PeripheralId) -> Result<(), TransportError>;
    /// Cancel a pending attempt or drop an established link. Idempotent.
    fn cancel_connect(&self, id: PeripheralId);
    fn write(&self, id: PeripheralId, characteristic: Characteristic, data: Vec<u8>)
        -> Result<(), TransportError>;
    /// Request a read; the value arrives as `ValueUpdated`.
    fn read(&self, id: PeripheralId, characteristic: Characteristic) -> Result<(), TransportError>;
    /// Request an RSSI sample; arrives as `RssiUpdated`.
    fn read_rssi(&self, id: PeripheralId) -> Result<(), TransportError>;
}

/// Public state of the link, as seen by callers.
///
/// A dropped session is reported through [`LinkEvent::SessionClosed`];
/// afterwards the supervisor is back in `Idle` or `Scanning`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkState {
    Idle,
    Scanning,
    Connecting,
    Connected,
    Subscribed,
}

/// Why a session ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CloseReason {
    /// `cancel_peripheral_connection`.
    Cancelled,
    /// `disconnect_device`, or a connect to a different radio.
    Disconnected { reconnect: bool },
    /// Connect attempt budget exhausted.
    TimedOut,
    /// The transport reported a failure or drop.
    Lost(Option<DisconnectReason>),
}

/// Events published by the supervisor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LinkEvent {
    ScanningChanged(bool),
    /// Registry contents changed, or a scan tick elapsed.
    CandidatesChanged,
    Connecting {
        session: SessionId,
        peripheral: PeripheralId,
    },
    /// Link up (also re-sent when asked to connect to the current radio).
    DeviceConnected {
        session: SessionId,
        peripheral: PeripheralId,
        name: String<32>,
    },
    HandshakeComplete {
        session: SessionId,
        peripheral: PeripheralId,
    },
    SessionClosed {
        session: SessionId,
        peripheral: PeripheralId,
        reason: CloseReason,
    },
}

pub(crate) fn truncated_name(name: &str) -> String<32> {
    let mut n: String<32> = String::new();
    for c in name.chars() {
        if n.push(c).is_err() {
            break;
        }
    }
    n
}
