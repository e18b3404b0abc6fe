//! Typed runtime settings and the preferences seam.
//!
//! The host application owns the actual key-value store; this crate only
//! sees it through [`Preferences`]. [`Settings`] carries every value the
//! core reads or writes, with its default documented on the field.

use std::sync::Mutex;
use std::time::Duration;

use tracing::{debug, info};

use crate::ble::PeripheralId;
use crate::config::MAX_PREFERRED_DEVICES;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    /// Radios connected before, most recent first. Default: empty.
    pub preferred_devices: Vec<PeripheralId>,
    /// Node number of the most recently connected radio. Default: `None`.
    pub preferred_node_num: Option<u32>,
    /// Release the link when background time ends. Default: `false`.
    pub power_saving: bool,
    /// Post a summary after a background refresh. Default: `true`.
    pub background_notifications: bool,
    /// Last handshake nonce handed out. Default: `0`.
    pub config_nonce: u32,
    /// Handshake event count of the previous connect, for the progress
    /// gauge. Default: `None`.
    pub handshake_baseline: Option<u32>,
    /// Firmware reported by the preferred radio. Default: `None`.
    pub firmware_version: Option<String>,
    /// Periodically share the phone's position. Default: `false`.
    pub provide_location: bool,
    /// Period of the position broadcast. Default: 10 minutes.
    pub provide_location_interval: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            preferred_devices: Vec::new(),
            preferred_node_num: None,
            power_saving: false,
            background_notifications: true,
            config_nonce: 0,
            handshake_baseline: None,
            firmware_version: None,
            provide_location: false,
            provide_location_interval: Duration::from_secs(600),
        }
    }
}

impl Settings {
    pub fn preferred_device(&self) -> Option<PeripheralId> {
        self.preferred_devices.first().copied()
    }

    /// Move `id` to the head of the preferred list.
    pub fn remember_preferred(&mut self, id: PeripheralId) {
        if let Some(pos) = self.preferred_devices.iter().position(|d| *d == id) {
            self.preferred_devices.remove(pos);
            debug!(peripheral = %id, "preferred device moved to front");
        } else {
            info!(peripheral = %id, "new preferred device");
        }
        self.preferred_devices.insert(0, id);
        // Oldest entries fall off the end.
        self.preferred_devices.truncate(MAX_PREFERRED_DEVICES);
    }

    /// Advance and return the handshake nonce. Wraps to 0 after `u32::MAX`.
    pub fn next_config_nonce(&mut self) -> u32 {
        self.config_nonce = if self.config_nonce == u32::MAX {
            0
        } else {
            self.config_nonce + 1
        };
        self.config_nonce
    }
}

/// Typed get/set over the host's settings store.
pub trait Preferences: Send + Sync {
    fn load(&self) -> Settings;
    fn store(&self, settings: &Settings);
}

/// Read-modify-write helper over a [`Preferences`].
pub fn update<R>(prefs: &dyn Preferences, f: impl FnOnce(&mut Settings) -> R) -> R {
    let mut settings = prefs.load();
    let out = f(&mut settings);
    prefs.store(&settings);
    out
}

/// In-process preferences.
#[derive(Debug, Default)]
pub struct MemoryPreferences {
    settings: Mutex<Settings>,
}

impl MemoryPreferences {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings: Mutex::new(settings),
        }
    }
}

impl Preferences for MemoryPreferences {
    fn load(&self) -> Settings {
        self.settings
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn store(&self, settings: &Settings) {
        *self.settings.lock().unwrap_or_else(|e| e.into_inner()) = settings.clone();
    }
}
