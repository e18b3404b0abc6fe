//! Power policy - how hard the core works while the host is backgrounded.
//!
//! The host reports foreground/background transitions and the platform's
//! low-power mode; the background watcher asks whether to keep the link
//! when its budget runs out.

use std::sync::{Mutex, MutexGuard};

use tracing::info;

use crate::power_logic;
use crate::storage::Settings;

/// Host application state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PowerState {
    /// App on screen; link kept up.
    Foreground,
    /// Backgrounded within a refresh budget.
    Background,
    /// Backgrounded with the platform's low-power mode on.
    LowPower,
}

#[derive(Debug)]
struct Inner {
    foreground: bool,
    low_power_mode: bool,
    state: PowerState,
}

#[derive(Debug)]
pub struct PowerPolicy {
    inner: Mutex<Inner>,
}

impl Default for PowerPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl PowerPolicy {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                foreground: true,
                low_power_mode: false,
                state: PowerState::Foreground,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_foreground(&self, foreground: bool) {
        let mut inner = self.lock();
        inner.foreground = foreground;
        update_state(&mut inner);
    }

    /// Update from the platform's battery saver notification.
    pub fn set_low_power_mode(&self, enabled: bool) {
        let mut inner = self.lock();
        if inner.low_power_mode == enabled {
            return;
        }
        inner.low_power_mode = enabled;
        info!(enabled, "power: low-power mode changed");
        update_state(&mut inner);
    }

    pub fn low_power_mode(&self) -> bool {
        self.lock().low_power_mode
    }

    pub fn state(&self) -> PowerState {
        self.lock().state
    }

    /// Whether a finished background refresh should drop the link.
    pub fn release_link_after_background(&self, settings: &Settings) -> bool {
        power_logic::release_link_after_background(settings.power_saving, self.low_power_mode())
    }

    /// Whether the host should schedule a background refresh.
    pub fn background_refresh_allowed(&self, settings: &Settings) -> bool {
        power_logic::background_refresh_allowed(
            settings.preferred_device().is_some(),
            self.low_power_mode(),
        )
    }
}

fn update_state(inner: &mut Inner) {
    let new_state = if inner.foreground {
        PowerState::Foreground
    } else if inner.low_power_mode {
        PowerState::LowPower
    } else {
        PowerState::Background
    };

    if new_state != inner.state {
        info!("power: {:?} -> {:?}", inner.state, new_state);
        inner.state = new_state;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ble::PeripheralId;
    use uuid::Uuid;

    #[test]
    fn state_follows_host() {
        let policy = PowerPolicy::new();
        assert_eq!(policy.state(), PowerState::Foreground);

        policy.set_foreground(false);
        assert_eq!(policy.state(), PowerState::Background);

        policy.set_low_power_mode(true);
        assert_eq!(policy.state(), PowerState::LowPower);

        policy.set_foreground(true);
        assert_eq!(policy.state(), PowerState::Foreground);
        assert!(policy.low_power_mode());
    }

    #[test]
    fn link_release_rules() {
        let policy = PowerPolicy::new();
        let mut settings = Settings::default();
        assert!(!policy.release_link_after_background(&settings));

        settings.power_saving = true;
        assert!(policy.release_link_after_background(&settings));

        settings.power_saving = false;
        policy.set_low_power_mode(true);
        assert!(policy.release_link_after_background(&settings));
    }

    #[test]
    fn refresh_needs_a_paired_radio() {
        let policy = PowerPolicy::new();
        let mut settings = Settings::default();
        assert!(!policy.background_refresh_allowed(&settings));

        settings.remember_preferred(PeripheralId(Uuid::from_u128(3)));
        assert!(policy.background_refresh_allowed(&settings));

        policy.set_low_power_mode(true);
        assert!(!policy.background_refresh_allowed(&settings));
    }
}
