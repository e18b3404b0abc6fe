//! meshlink - connectivity core of a mesh-radio companion app.
//!
//! Finds a nearby LoRa mesh radio over Bluetooth Low Energy, keeps a single
//! supervised link to it, runs the radio's configuration handshake, turns
//! app commands into radio packets and mirrors radio traffic through an
//! MQTT broker.
//!
//! ```text
//!   host BLE stack ──TransportEvent──▶ ble::Supervisor ──LinkEvent──▶ watcher
//!        ▲                                  │    ▲
//!        └──────── Transport calls ─────────┘    │ write_frame
//!                                   FromRadio    │
//!                                        ▼       │
//!                                   mesh::Bridge ─┴──▶ Store (debounced)
//!                                        │  ▲
//!                         proxy messages ▼  │ demo loopback
//!                                   mqtt::BrokerBridge ◀──▶ broker
//! ```
//!
//! Everything host-specific (BLE stack, database, settings, notification
//! center, location) comes in through traits and is wired once in
//! [`companion::Companion`]. Timers and background waiters run on tokio.
//!
//! Enable the `btleplug` feature for a ready-made desktop [`ble::Transport`],
//! and `testing` for the in-memory collaborators used by this crate's tests.

// ═══════════════════════════════════════════════════════════════════════════
// Link
// ═══════════════════════════════════════════════════════════════════════════

pub mod ble;
pub mod timer;

// ═══════════════════════════════════════════════════════════════════════════
// Protocol and broker
// ═══════════════════════════════════════════════════════════════════════════

pub mod debounce;
pub mod mesh;
pub mod mqtt;

// ═══════════════════════════════════════════════════════════════════════════
// Host integration
// ═══════════════════════════════════════════════════════════════════════════

pub mod companion;
pub mod config;
pub mod error;
pub mod notify;
pub mod power;
pub mod power_logic;
pub mod storage;
pub mod watcher;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use companion::{Collaborators, Companion};
pub use error::{Error, Result};
