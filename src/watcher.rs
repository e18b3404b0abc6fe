//! Background watcher - brings the link up during a short background
//! refresh and reports what it reached.
//!
//! Goals are `DeviceConnected` and `HandshakeComplete`, each recorded at
//! most once. When the budget runs out (or both goals are met) the watcher
//! applies the power policy and posts one coalesced summary notification.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};

use crate::ble::{CloseReason, LinkEvent, Supervisor};
use crate::config::{BACKGROUND_NOTIFICATION_ID, BACKGROUND_NOTIFICATION_TITLE, SUMMARY_WINDOW};
use crate::mesh::records::{unix_now, Query, Record, Store};
use crate::notify::{Notification, Notifier};
use crate::power::PowerPolicy;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Goal {
    DeviceConnected,
    HandshakeComplete,
}

/// Goals reached so far. Only ever grows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GoalSet {
    device_connected: bool,
    handshake_complete: bool,
}

impl GoalSet {
    /// Returns `true` if `goal` was not recorded before.
    pub fn record(&mut self, goal: Goal) -> bool {
        let slot = match goal {
            Goal::DeviceConnected => &mut self.device_connected,
            Goal::HandshakeComplete => &mut self.handshake_complete,
        };
        let fresh = !*slot;
        *slot = true;
        fresh
    }

    pub fn contains(&self, goal: Goal) -> bool {
        match goal {
            Goal::DeviceConnected => self.device_connected,
            Goal::HandshakeComplete => self.handshake_complete,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.device_connected && self.handshake_complete
    }
}

/// A started watch: the goals already met and the event stream to follow.
pub struct Watch {
    pub goals: GoalSet,
    events: Option<broadcast::Receiver<LinkEvent>>,
    started: Instant,
}

#[derive(Clone, Debug, PartialEq)]
pub struct WatcherReport {
    pub goals: GoalSet,
    pub runtime: Duration,
    /// The link was dropped by the power policy.
    pub released_link: bool,
    /// The summary queued, if any.
    pub summary: Option<Notification>,
}

pub struct Watcher {
    supervisor: Supervisor,
    store: Arc<dyn Store>,
    notifier: Arc<dyn Notifier>,
    power: Arc<PowerPolicy>,
}

impl Watcher {
    pub fn new(
        supervisor: Supervisor,
        store: Arc<dyn Store>,
        notifier: Arc<dyn Notifier>,
        power: Arc<PowerPolicy>,
    ) -> Self {
        Self {
            supervisor,
            store,
            notifier,
            power,
        }
    }

    /// Start driving the link. A link that is already subscribed satisfies
    /// both goals without further work.
    pub fn start(&self) -> Watch {
        let started = Instant::now();
        let link = self.supervisor.snapshot();
        if link.is_connected() && link.is_subscribed() {
            let mut goals = GoalSet::default();
            goals.record(Goal::DeviceConnected);
            goals.record(Goal::HandshakeComplete);
            debug!("background: link already up");
            return Watch {
                goals,
                events: None,
                started,
            };
        }

        // Subscribe first so no event slips between the calls below.
        let events = self.supervisor.subscribe();
        self.supervisor.start_scanning();

        if let Some(preferred) = self.supervisor.preferences().load().preferred_device() {
            // Connect without waiting for an advertisement.
            info!(peripheral = %preferred, "background: connecting to preferred radio");
            self.supervisor.connect_to(preferred);
        }

        Watch {
            goals: GoalSet::default(),
            events: Some(events),
            started,
        }
    }

    /// Start, wait for both goals or the budget, then stop.
    pub async fn run(&self, budget: Duration) -> WatcherReport {
        let mut watch = self.start();
        let deadline = watch.started + budget;

        if let Some(mut events) = watch.events.take() {
            while !watch.goals.is_complete() {
                match timeout_at(deadline, events.recv()).await {
                    Err(_) => {
                        debug!("background: budget exhausted");
                        break;
                    }
                    Ok(Ok(event)) => self.on_event(&mut watch.goals, event),
                    Ok(Err(RecvError::Lagged(skipped))) => {
                        debug!(skipped, "background: link events lagged");
                    }
                    Ok(Err(RecvError::Closed)) => break,
                }
            }
        }

        self.stop(watch.goals, watch.started.elapsed())
    }

    fn on_event(&self, goals: &mut GoalSet, event: LinkEvent) {
        match event {
            LinkEvent::DeviceConnected { .. } => {
                if goals.record(Goal::DeviceConnected) {
                    info!("background: device connected");
                }
            }
            LinkEvent::HandshakeComplete { .. } => {
                if goals.record(Goal::HandshakeComplete) {
                    info!("background: handshake complete");
                }
            }
            LinkEvent::CandidatesChanged => self.on_candidates_changed(goals),
            LinkEvent::SessionClosed { reason, .. } => {
                if reason != CloseReason::Cancelled {
                    debug!(?reason, "background: link closed, scanning again");
                    self.supervisor.start_scanning();
                }
            }
            LinkEvent::ScanningChanged(_) | LinkEvent::Connecting { .. } => {}
        }
    }

    fn on_candidates_changed(&self, goals: &mut GoalSet) {
        let Some(preferred) = self.supervisor.preferences().load().preferred_device() else {
            return;
        };
        let visible = self
            .supervisor
            .candidate(preferred)
            .is_some_and(|c| c.is_visible(Instant::now()));
        if !visible {
            return;
        }

        if self.supervisor.snapshot().is_connected() {
            goals.record(Goal::DeviceConnected);
            return;
        }
        self.supervisor.stop_scanning();
        self.supervisor.connect_to(preferred);
    }

    /// Apply the power policy and queue the summary.
    pub fn stop(&self, goals: GoalSet, runtime: Duration) -> WatcherReport {
        let settings = self.supervisor.preferences().load();

        let released_link = self.power.release_link_after_background(&settings);
        if released_link {
            info!("background: releasing link (power saving)");
            self.supervisor.disconnect_device(false);
            self.supervisor.set_auto_reconnect(false);
        }

        info!(
            target: "meshlink::analytics",
            event = "background_refresh",
            connected = goals.contains(Goal::DeviceConnected),
            handshake = goals.contains(Goal::HandshakeComplete),
            runtime_secs = runtime.as_secs()
        );

        let summary = if settings.background_notifications {
            self.summary(settings.preferred_node_num)
        } else {
            None
        };
        if let Some(notification) = &summary {
            self.notifier
                .queue(notification.clone(), Duration::ZERO, true, true);
        }

        WatcherReport {
            goals,
            runtime,
            released_link,
            summary,
        }
    }

    fn summary(&self, own_node: Option<u32>) -> Option<Notification> {
        let query = Query::NodesHeardSince {
            since: unix_now().saturating_sub(SUMMARY_WINDOW.as_secs() as u32),
            excluding: own_node,
        };
        let heard = match self.store.query(&query) {
            Ok(records) => records
                .iter()
                .filter(|r| matches!(r, Record::Node(_)))
                .count(),
            Err(e) => {
                warn!(error = %e, "background: node summary unavailable");
                return None;
            }
        };

        let body = match heard {
            0 => "Your node currently doesn't see any node.".to_string(),
            1 => "Your node currently sees one other node.".to_string(),
            n => format!("Your node currently sees {n} other nodes."),
        };

        Some(Notification {
            id: BACKGROUND_NOTIFICATION_ID.into(),
            title: BACKGROUND_NOTIFICATION_TITLE.into(),
            subtitle: self.supervisor.snapshot().name.map(|n| n.to_string()),
            body,
            path: Some("/nodes".into()),
        })
    }
}
