//! Radio protocol layer.
//!
//! [`bridge::Bridge`] turns application commands into `ToRadio` frames and
//! interprets the `FromRadio` stream: the configuration handshake, mesh
//! packets and broker proxy messages.

pub mod bridge;
pub mod proto;
pub mod records;

use std::cmp::Ordering;

pub use bridge::{handshake_progress, Bridge, HandshakeProgress};
pub use records::{Query, Record, Store};

/// Application-issued command for the radio.
#[derive(Clone, Debug, PartialEq)]
pub enum OutboundCommand {
    TextMessage {
        /// Destination node; `None` broadcasts.
        to: Option<u32>,
        channel: u32,
        text: String,
        reply_id: Option<u32>,
        emoji: bool,
    },
    PositionReport {
        to: Option<u32>,
        channel: u32,
        want_response: bool,
    },
    TraceRouteRequest {
        to: u32,
        channel: u32,
    },
}

/// A location fix from the host.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Fix {
    pub latitude: f64,
    pub longitude: f64,
    /// Metres above sea level.
    pub altitude: Option<i32>,
    /// Unix seconds.
    pub time: u32,
    /// Metres per second.
    pub speed: Option<f64>,
    /// Degrees from north.
    pub course: Option<f64>,
}

/// Host location services.
pub trait PositionSource: Send + Sync {
    fn current_fix(&self) -> Option<Fix>;
}

/// Configuration section named in handshake progress text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConfigKind {
    Bluetooth,
    Device,
    Display,
    LoRa,
    Network,
    Position,
    Power,
    Security,
    Mqtt,
    Serial,
    ExternalNotification,
    StoreForward,
    RangeTest,
    Telemetry,
    CannedMessage,
    Audio,
    RemoteHardware,
    NeighborInfo,
    AmbientLighting,
    DetectionSensor,
    Paxcounter,
}

impl ConfigKind {
    pub fn label(self) -> &'static str {
        match self {
            ConfigKind::Bluetooth => "Bluetooth",
            ConfigKind::Device => "Device",
            ConfigKind::Display => "Display",
            ConfigKind::LoRa => "LoRa",
            ConfigKind::Network => "Network",
            ConfigKind::Position => "Position",
            ConfigKind::Power => "Power",
            ConfigKind::Security => "Security",
            ConfigKind::Mqtt => "MQTT",
            ConfigKind::Serial => "Serial",
            ConfigKind::ExternalNotification => "Ext. notification",
            ConfigKind::StoreForward => "Store & forward",
            ConfigKind::RangeTest => "Range test",
            ConfigKind::Telemetry => "Telemetry",
            ConfigKind::CannedMessage => "Canned message",
            ConfigKind::Audio => "Audio",
            ConfigKind::RemoteHardware => "Remote hardware",
            ConfigKind::NeighborInfo => "Neighbor info",
            ConfigKind::AmbientLighting => "Ambient lighting",
            ConfigKind::DetectionSensor => "Detection sensor",
            ConfigKind::Paxcounter => "PAX counter",
        }
    }
}

/// One step of the configuration handshake. `num` is the node the
/// information belongs to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandshakeEvent {
    NodeConfig(ConfigKind, u32),
    ModuleConfig(ConfigKind, u32),
    ChannelInfo { index: i32, name: String, num: u32 },
    MyInfo(u32),
    NodeInfo(u32),
    Metadata(u32),
}

/// Numeric dotted-version comparison; missing components count as 0.
///
/// Returns `false` if either side has a non-numeric component.
pub fn version_at_least(version: &str, min: &str) -> bool {
    let parse = |v: &str| -> Option<Vec<u32>> {
        v.split('.').map(|p| p.trim().parse().ok()).collect()
    };
    let (Some(a), Some(b)) = (parse(version), parse(min)) else {
        return false;
    };

    let len = a.len().max(b.len());
    for i in 0..len {
        let x = a.get(i).copied().unwrap_or(0);
        let y = b.get(i).copied().unwrap_or(0);
        match x.cmp(&y) {
            Ordering::Greater => return true,
            Ordering::Less => return false,
            Ordering::Equal => {}
        }
    }
    true
}

/// Strip the build suffix from a firmware string (`2.3.2.63df972` ->
/// `2.3.2`). `None` when there is nothing to strip.
pub fn firmware_release(raw: &str) -> Option<&str> {
    raw.rfind('.').map(|i| &raw[..i])
}
