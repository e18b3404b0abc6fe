//! Context object wiring the connectivity core together.
//!
//! Built once at process start from the host's collaborators and passed to
//! whoever needs it. Holds no global state; dropping it stops the pumps
//! that connect the link, the protocol bridge and the broker bridge.

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::ble::{LinkEvent, PeripheralId, Supervisor, Transport, TransportEvent};
use crate::error::Result;
use crate::mesh::proto::{MeshPacket, MqttClientProxyMessage};
use crate::mesh::{Bridge, OutboundCommand, PositionSource, Store};
use crate::mqtt::BrokerBridge;
use crate::notify::Notifier;
use crate::power::PowerPolicy;
use crate::storage::Preferences;
use crate::watcher::{Watcher, WatcherReport};

/// Host-provided capabilities.
pub struct Collaborators {
    pub transport: Arc<dyn Transport>,
    pub store: Arc<dyn Store>,
    pub preferences: Arc<dyn Preferences>,
    pub notifier: Arc<dyn Notifier>,
    pub position: Arc<dyn PositionSource>,
}

pub struct Companion {
    supervisor: Supervisor,
    bridge: Bridge,
    broker: BrokerBridge,
    watcher: Watcher,
    power: Arc<PowerPolicy>,
    pumps: Vec<JoinHandle<()>>,
}

impl Companion {
    /// Wire the core. Call from inside a tokio runtime, otherwise the
    /// link and broker are never bridged.
    pub fn new(collaborators: Collaborators) -> Self {
        let Collaborators {
            transport,
            store,
            preferences,
            notifier,
            position,
        } = collaborators;

        let supervisor = Supervisor::new(transport, preferences, notifier.clone());
        let (bridge, outbox) =
            Bridge::new(supervisor.clone(), store.clone(), notifier.clone(), position);
        let (broker, loopback) = BrokerBridge::new(supervisor.clone());
        let power = Arc::new(PowerPolicy::new());
        let watcher = Watcher::new(supervisor.clone(), store, notifier, power.clone());

        let pumps = match Handle::try_current() {
            Ok(handle) => vec![
                handle.spawn(link_pump(supervisor.subscribe(), bridge.clone(), broker.clone())),
                handle.spawn(outbox_pump(outbox, broker.clone())),
                handle.spawn(loopback_pump(loopback, bridge.clone())),
            ],
            Err(_) => {
                warn!("companion: no tokio runtime, pumps not started");
                Vec::new()
            }
        };

        Self {
            supervisor,
            bridge,
            broker,
            watcher,
            power,
            pumps,
        }
    }

    pub fn supervisor(&self) -> &Supervisor {
        &self.supervisor
    }

    pub fn bridge(&self) -> &Bridge {
        &self.bridge
    }

    pub fn broker(&self) -> &BrokerBridge {
        &self.broker
    }

    pub fn power(&self) -> &PowerPolicy {
        &self.power
    }

    /// Route one transport callback; radio frames go to the bridge.
    pub fn handle_transport_event(&self, event: TransportEvent) {
        let connected = matches!(event, TransportEvent::Connected(_));
        let frame = self.supervisor.handle(event);
        if connected {
            let link = self.supervisor.snapshot();
            if let Some(session) = link.session.filter(|_| link.is_connected()) {
                self.bridge.begin_session(session);
            }
        }
        let Some(frame) = frame else {
            return;
        };
        if let Err(e) = self.bridge.handle_from_radio(frame.session, &frame.data) {
            warn!(error = %e, "radio frame dropped");
        }
    }

    pub fn start(&self) {
        self.supervisor.start_scanning();
    }

    pub fn connect_to(&self, id: PeripheralId) -> bool {
        self.supervisor.connect_to(id)
    }

    pub fn send(&self, command: OutboundCommand) -> Result<u32> {
        self.bridge.send(command)
    }

    /// User abort: drops the link attempt and the broker session with it.
    pub fn cancel_peripheral_connection(&self) {
        self.supervisor.cancel_peripheral_connection();
        self.broker.disconnect();
    }

    pub fn disconnect_device(&self, reconnect: bool) {
        self.supervisor.disconnect_device(reconnect);
        self.broker.disconnect();
    }

    /// Connect the broker from the radio's config, or the demo broker
    /// for `region` when no radio was ever paired.
    pub fn connect_broker(&self, region: Option<&str>) -> bool {
        self.broker.connect(self.bridge.broker_config().as_ref(), region)
    }

    pub async fn run_background(&self, budget: Duration) -> WatcherReport {
        self.watcher.run(budget).await
    }
}

impl Drop for Companion {
    fn drop(&mut self) {
        for pump in self.pumps.drain(..) {
            pump.abort();
        }
        self.broker.disconnect();
    }
}

async fn link_pump(
    mut events: broadcast::Receiver<LinkEvent>,
    bridge: Bridge,
    broker: BrokerBridge,
) {
    loop {
        match events.recv().await {
            Ok(LinkEvent::SessionClosed { session, .. }) => {
                debug!(?session, "link closed, dropping broker session");
                broker.disconnect();
                bridge.on_session_closed(session);
            }
            Ok(LinkEvent::HandshakeComplete { .. }) => match bridge.broker_config() {
                Some(config) if config.enabled && config.proxy_to_client => {
                    broker.connect(Some(&config), None);
                }
                _ => broker.disconnect(),
            },
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "link events lagged");
            }
            Err(broadcast::error::RecvError::Closed) => return,
        }
    }
}

async fn outbox_pump(mut outbox: mpsc::UnboundedReceiver<MqttClientProxyMessage>, broker: BrokerBridge) {
    while let Some(message) = outbox.recv().await {
        if let Err(e) = broker.publish_proxy(&message) {
            debug!(topic = %message.topic, error = %e, "proxy message not published");
        }
    }
}

async fn loopback_pump(mut loopback: mpsc::UnboundedReceiver<MeshPacket>, bridge: Bridge) {
    while let Some(packet) = loopback.recv().await {
        bridge.handle_packet(packet);
    }
}
