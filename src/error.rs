//! Unified error type for meshlink.
//!
//! Errors never cross the crate boundary as panics: every public
//! operation returns a `Result`, a `bool` or an `Option`, and budget
//! exhaustion is surfaced as state (`last_error`, `connected = false`).

use thiserror::Error;

/// Top-level error type used across the crate.
#[derive(Debug, Error)]
pub enum Error {
    // BLE
    /// Radio stack is off or unauthorized.
    #[error("bluetooth is unavailable")]
    TransportUnavailable,

    /// A transport command failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Connect attempt budget exhausted.
    #[error("Bluetooth connection timed out")]
    ConnectionTimeout,

    /// No radio is connected.
    #[error("no radio connected")]
    NotConnected,

    /// The radio has not finished streaming its configuration.
    #[error("radio handshake has not completed")]
    HandshakeIncomplete,

    /// Radio firmware is older than the oldest supported release.
    #[error("Firmware version is too old. Please update the firmware of your node to at least 2.0.0.")]
    UnsupportedFirmware,

    // Commands
    /// Text message with no content.
    #[error("message is empty")]
    EmptyMessage,

    /// No location fix available for a position report.
    #[error("no position available")]
    NoPosition,

    /// A command or frame could not be serialized or parsed.
    #[error("failed to encode {stage}")]
    EncodingFailure { stage: &'static str },

    // Broker
    /// The broker refused the session.
    #[error("broker rejected connection: {0}")]
    BrokerRejected(String),

    /// Broker client I/O failed.
    #[error("broker error: {0}")]
    Broker(String),

    // Storage
    /// Local save or query failed.
    #[error("persistence failed: {0}")]
    PersistenceFailure(String),
}

/// Subset of transport errors we propagate (kept `Copy`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Adapter powered off or missing.
    #[error("adapter powered off")]
    PoweredOff,
    /// Scan could not start.
    #[error("scan failed")]
    ScanFailed,
    /// Connection attempt failed.
    #[error("connect failed")]
    ConnectFailed,
    /// Peripheral is not (or no longer) known to the adapter.
    #[error("unknown peripheral")]
    UnknownPeripheral,
    /// GATT service or characteristic missing.
    #[error("service discovery failed")]
    DiscoveryFailed,
    /// Characteristic write failed.
    #[error("write failed")]
    WriteFailed,
    /// Characteristic read failed.
    #[error("read failed")]
    ReadFailed,
}

impl From<prost::DecodeError> for Error {
    fn from(_: prost::DecodeError) -> Self {
        Error::EncodingFailure { stage: "radio frame" }
    }
}

impl From<rumqttc::ClientError> for Error {
    fn from(e: rumqttc::ClientError) -> Self {
        Error::Broker(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
