//! Candidate registry - advertising radios currently in range.
//!
//! Pure data and scoring, no I/O. The supervisor feeds sightings in and
//! asks for the best reconnect target; "visible" is derived from
//! `last_seen` alone.

use heapless::{String, Vec};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::ble::{Advertisement, PeripheralId};
use crate::config::{RSSI_NORMAL_DBM, RSSI_STRONG_DBM, VISIBILITY_WINDOW};

/// Maximum number of radios tracked at once.
pub const MAX_CANDIDATES: usize = 16;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum SignalStrength {
    Weak,
    Normal,
    Strong,
}

impl SignalStrength {
    pub fn from_rssi(rssi: i16) -> Self {
        if rssi > RSSI_STRONG_DBM {
            SignalStrength::Strong
        } else if rssi > RSSI_NORMAL_DBM {
            SignalStrength::Normal
        } else {
            SignalStrength::Weak
        }
    }
}

/// A discovered, not necessarily connected, radio.
#[derive(Clone, Debug, PartialEq)]
pub struct Candidate {
    pub id: PeripheralId,
    pub name: String<32>,
    pub rssi: i16,
    pub last_seen: Instant,
}

impl Candidate {
    pub fn signal_strength(&self) -> SignalStrength {
        SignalStrength::from_rssi(self.rssi)
    }

    pub fn is_visible(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.last_seen) <= VISIBILITY_WINDOW
    }
}

#[derive(Debug, Default)]
pub struct Registry {
    candidates: Vec<Candidate, MAX_CANDIDATES>,
}

impl Registry {
    pub const fn new() -> Self {
        Self {
            candidates: Vec::new(),
        }
    }

    /// Record a sighting. Returns `true` for a radio not tracked before.
    pub fn observe(&mut self, adv: Advertisement, now: Instant) -> bool {
        if let Some(existing) = self.candidates.iter_mut().find(|c| c.id == adv.id) {
            existing.name = adv.name;
            existing.rssi = adv.rssi;
            existing.last_seen = now;
            debug!(peripheral = %adv.id, rssi = adv.rssi, "candidate updated");
            return false;
        }

        // If at capacity, evict the stalest entry.
        if self.candidates.is_full() {
            if let Some(stalest) = self
                .candidates
                .iter()
                .enumerate()
                .min_by_key(|(_, c)| c.last_seen)
                .map(|(i, _)| i)
            {
                warn!("candidate registry full - evicting stalest entry");
                self.candidates.swap_remove(stalest);
            }
        }

        info!(peripheral = %adv.id, name = %adv.name, rssi = adv.rssi, "new candidate discovered");
        let _ = self.candidates.push(Candidate {
            id: adv.id,
            name: adv.name,
            rssi: adv.rssi,
            last_seen: now,
        });
        true
    }

    /// Update the RSSI of a tracked radio without touching `last_seen`.
    pub fn update_rssi(&mut self, id: PeripheralId, rssi: i16) {
        if let Some(c) = self.candidates.iter_mut().find(|c| c.id == id) {
            c.rssi = rssi;
        }
    }

    /// Drop radios not seen within the visibility window. Returns how many.
    pub fn prune(&mut self, now: Instant) -> usize {
        let before = self.candidates.len();
        self.candidates.retain(|c| c.is_visible(now));
        let removed = before - self.candidates.len();
        if removed > 0 {
            debug!(removed, "pruned stale candidates");
        }
        removed
    }

    pub fn get(&self, id: PeripheralId) -> Option<&Candidate> {
        self.candidates.iter().find(|c| c.id == id)
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn visible(&self, now: Instant) -> impl Iterator<Item = &Candidate> {
        self.candidates.iter().filter(move |c| c.is_visible(now))
    }

    /// Best reconnect target among visible radios.
    ///
    /// `preferred` is ordered most recent first; the first of them that is
    /// visible wins. Otherwise the most recently seen visible radio.
    pub fn select_preferred(&self, preferred: &[PeripheralId], now: Instant) -> Option<&Candidate> {
        preferred
            .iter()
            .find_map(|id| self.get(*id).filter(|c| c.is_visible(now)))
            .or_else(|| self.visible(now).max_by_key(|c| c.last_seen))
    }

    /// Snapshot of the visible radios, preferred first, then by recency.
    pub fn sorted_by_preference(&self, preferred: &[PeripheralId], now: Instant) -> std::vec::Vec<Candidate> {
        let rank = |c: &Candidate| {
            preferred
                .iter()
                .position(|p| *p == c.id)
                .unwrap_or(usize::MAX)
        };
        let mut out: std::vec::Vec<Candidate> = self.visible(now).cloned().collect();
        out.sort_by(|a, b| rank(a).cmp(&rank(b)).then(b.last_seen.cmp(&a.last_seen)));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use uuid::Uuid;

    fn id(n: u128) -> PeripheralId {
        PeripheralId(Uuid::from_u128(n))
    }

    fn adv(n: u128, rssi: i16) -> Advertisement {
        Advertisement::new(id(n), "radio", rssi)
    }

    #[test]
    fn rssi_tiers() {
        assert_eq!(SignalStrength::from_rssi(-60), SignalStrength::Strong);
        assert_eq!(SignalStrength::from_rssi(-65), SignalStrength::Normal);
        assert_eq!(SignalStrength::from_rssi(-80), SignalStrength::Normal);
        assert_eq!(SignalStrength::from_rssi(-85), SignalStrength::Weak);
        assert_eq!(SignalStrength::from_rssi(-100), SignalStrength::Weak);
    }

    #[test]
    fn observe_inserts_then_updates() {
        let mut reg = Registry::new();
        let t0 = Instant::now();
        assert!(reg.observe(adv(1, -90), t0));
        assert!(!reg.observe(adv(1, -50), t0 + Duration::from_secs(1)));
        assert_eq!(reg.len(), 1);
        let c = reg.get(id(1)).unwrap();
        assert_eq!(c.signal_strength(), SignalStrength::Strong);
        assert_eq!(c.last_seen, t0 + Duration::from_secs(1));
    }

    #[test]
    fn visibility_window_is_inclusive() {
        let mut reg = Registry::new();
        let t0 = Instant::now();
        reg.observe(adv(1, -70), t0);
        assert_eq!(reg.visible(t0 + VISIBILITY_WINDOW).count(), 1);
        assert_eq!(reg.visible(t0 + VISIBILITY_WINDOW + Duration::from_millis(1)).count(), 0);
    }

    #[test]
    fn prune_ages_out() {
        let mut reg = Registry::new();
        let t0 = Instant::now();
        reg.observe(adv(1, -70), t0);
        reg.observe(adv(2, -70), t0 + Duration::from_secs(4));
        assert_eq!(reg.prune(t0 + Duration::from_secs(6)), 1);
        assert!(reg.get(id(1)).is_none());
        assert!(reg.get(id(2)).is_some());
    }

    #[test]
    fn full_registry_evicts_stalest() {
        let mut reg = Registry::new();
        let t0 = Instant::now();
        for n in 0..MAX_CANDIDATES as u128 {
            reg.observe(adv(n, -70), t0 + Duration::from_millis(n as u64));
        }
        reg.observe(adv(999, -70), t0 + Duration::from_secs(1));
        assert_eq!(reg.len(), MAX_CANDIDATES);
        assert!(reg.get(id(0)).is_none());
        assert!(reg.get(id(999)).is_some());
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Selection
    // ═══════════════════════════════════════════════════════════════════════

    #[test]
    fn selects_preferred_when_visible() {
        let mut reg = Registry::new();
        let t0 = Instant::now();
        reg.observe(adv(1, -60), t0);
        reg.observe(adv(2, -90), t0 + Duration::from_secs(1));
        let now = t0 + Duration::from_secs(2);
        assert_eq!(reg.select_preferred(&[id(1)], now).unwrap().id, id(1));
    }

    #[test]
    fn preference_order_is_respected() {
        let mut reg = Registry::new();
        let t0 = Instant::now();
        reg.observe(adv(1, -60), t0);
        reg.observe(adv(2, -60), t0);
        assert_eq!(reg.select_preferred(&[id(2), id(1)], t0).unwrap().id, id(2));
        assert_eq!(reg.select_preferred(&[id(3), id(1)], t0).unwrap().id, id(1));
    }

    #[test]
    fn falls_back_to_most_recent() {
        let mut reg = Registry::new();
        let t0 = Instant::now();
        reg.observe(adv(1, -50), t0);
        reg.observe(adv(2, -95), t0 + Duration::from_secs(2));
        let now = t0 + Duration::from_secs(3);
        assert_eq!(reg.select_preferred(&[id(7)], now).unwrap().id, id(2));
        assert_eq!(reg.select_preferred(&[], now).unwrap().id, id(2));
    }

    #[test]
    fn never_selects_invisible() {
        let mut reg = Registry::new();
        let t0 = Instant::now();
        reg.observe(adv(1, -50), t0);
        let later = t0 + Duration::from_secs(10);
        assert!(reg.select_preferred(&[id(1)], later).is_none());

        reg.observe(adv(2, -90), later);
        assert_eq!(reg.select_preferred(&[id(1)], later).unwrap().id, id(2));
    }

    #[test]
    fn sorted_by_preference_ranks_preferred_first() {
        let mut reg = Registry::new();
        let t0 = Instant::now();
        reg.observe(adv(1, -50), t0);
        reg.observe(adv(2, -50), t0 + Duration::from_secs(1));
        reg.observe(adv(3, -50), t0 + Duration::from_secs(2));
        let ids: std::vec::Vec<_> = reg
            .sorted_by_preference(&[id(1)], t0 + Duration::from_secs(2))
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec![id(1), id(3), id(2)]);
    }
}
