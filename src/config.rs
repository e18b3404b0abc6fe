//! Crate-wide constants and compile-time configuration.
//!
//! Timing parameters, BLE identifiers, broker defaults and firmware
//! thresholds live here so they can be tuned in one place.

use std::time::Duration;

use uuid::Uuid;

// BLE

/// Mesh radio GATT service.
pub const MESH_SERVICE_UUID: Uuid = Uuid::from_u128(0x6ba1b218_15a8_461f_9fa8_5dcae273eafd);

/// Characteristic the app writes `ToRadio` frames to.
pub const TO_RADIO_UUID: Uuid = Uuid::from_u128(0xf75c76d2_129e_4dad_a1dd_7866124401e7);

/// Characteristic the app reads `FromRadio` frames from.
pub const FROM_RADIO_UUID: Uuid = Uuid::from_u128(0x2c55e69e_4993_11ed_b878_0242ac120002);

/// "New data available" notify characteristic.
pub const FROM_NUM_UUID: Uuid = Uuid::from_u128(0xed9da18c_a800_4f66_a670_aa7547e34453);

/// Radio debug log (protobuf `LogRecord`).
pub const LOG_RADIO_UUID: Uuid = Uuid::from_u128(0x5a3d6e49_06e6_4423_9944_e9de8cdf9547);

/// Radio debug log, plain UTF-8 (pre-2.5 firmware).
pub const LOG_RADIO_LEGACY_UUID: Uuid = Uuid::from_u128(0x6c6fd238_78fa_436b_aacf_15c5be1ef2e2);

/// Discovery re-evaluation period while scanning.
pub const SCAN_TICK: Duration = Duration::from_secs(1);

/// A candidate not seen for this long is no longer visible.
pub const VISIBILITY_WINDOW: Duration = Duration::from_secs(5);

/// Period of the connection-timeout timer.
pub const CONNECT_TIMEOUT_TICK: Duration = Duration::from_millis(1500);

/// Timeout ticks before a connect attempt is abandoned.
pub const CONNECT_TIMEOUT_ATTEMPTS: u32 = 10;

/// RSSI (dBm) above which a candidate is `Strong`.
pub const RSSI_STRONG_DBM: i16 = -65;

/// RSSI (dBm) above which a candidate is `Normal`.
pub const RSSI_NORMAL_DBM: i16 = -85;

/// Number of previously connected radios remembered, most recent first.
pub const MAX_PREFERRED_DEVICES: usize = 4;

/// Capacity of the link event broadcast channel.
pub const LINK_EVENT_CAPACITY: usize = 64;

// Radio protocol

/// Node number meaning "every node".
pub const BROADCAST_NUM: u32 = 0xFFFF_FFFF;

/// Lowest firmware the link supports.
pub const MIN_FIRMWARE_VERSION: &str = "2.0.0";

/// First firmware publishing to the encrypted `/2/e/` broker topics.
pub const ENCRYPTED_TOPIC_FIRMWARE: &str = "2.3.2";

/// Packet ids are drawn from `[PACKET_ID_MIN, u32::MAX)`.
pub const PACKET_ID_MIN: u32 = 255;

/// Handshake events that are not node infos (configs, channels, metadata).
pub const HANDSHAKE_NON_NODE_EVENTS: u32 = 20;

/// Node infos the progress gauge expects at most.
pub const HANDSHAKE_NODE_CAP: u32 = 100;

/// No handshake progress for this long means the stream is stale.
pub const HANDSHAKE_STALE_AFTER: Duration = Duration::from_secs(30);

/// Quiescence window for coalesced record saves.
pub const SAVE_DEBOUNCE: Duration = Duration::from_millis(500);

// Broker

pub const MQTT_DEFAULT_HOST: &str = "mqtt.meshtastic.org";
pub const MQTT_PORT: u16 = 1883;
pub const MQTT_TLS_PORT: u16 = 8883;
pub const MQTT_DEFAULT_ROOT: &str = "msh";

/// Public demo broker credentials.
pub const MQTT_DEMO_USERNAME: &str = "meshdev";
pub const MQTT_DEMO_PASSWORD: &str = "large4cats";

/// Region used for the demo topic when the locale has none.
pub const MQTT_DEFAULT_REGION: &str = "DE";

/// Topic segment marking broker status traffic.
pub const MQTT_STATUS_SEGMENT: &str = "/stat/";

pub const MQTT_WILL_TOPIC: &str = "/will";
pub const MQTT_WILL_PAYLOAD: &str = "dieout";
pub const MQTT_KEEP_ALIVE: Duration = Duration::from_secs(60);

// Background execution

/// Typical wall-clock budget handed to the background watcher.
pub const BACKGROUND_BUDGET: Duration = Duration::from_secs(90);

/// Nodes heard within this window count toward the background summary.
pub const SUMMARY_WINDOW: Duration = Duration::from_secs(15 * 60);

pub const BACKGROUND_NOTIFICATION_ID: &str = "notification.id.bcg_update";
pub const BACKGROUND_NOTIFICATION_TITLE: &str = "Node Update";
