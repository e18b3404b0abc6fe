//! rumqttc-backed broker session.
//!
//! One [`BrokerBridge`] holds at most one client. Its event loop runs on a
//! tokio task tagged with a generation number; events from a superseded
//! generation are dropped, so a reconnect can never be torn down by the
//! previous session's late errors.

use std::sync::{Arc, Mutex, MutexGuard, Weak};

use rumqttc::{AsyncClient, ConnectionError, Event, EventLoop, LastWill, MqttOptions, Packet, QoS};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::{MQTT_KEEP_ALIVE, MQTT_WILL_PAYLOAD, MQTT_WILL_TOPIC};
use crate::ble::Supervisor;
use crate::error::{Error, Result};
use crate::mesh::proto::{MeshPacket, MqttClientProxyMessage};
use crate::mqtt::{connack_refusal, resolve, route_inbound, BrokerConfig, BrokerSettings, Inbound};

/// Called with a user-facing reason when the broker session fails.
pub type ErrorCallback = Arc<dyn Fn(&str) + Send + Sync>;

const CLIENT_CAPACITY: usize = 32;

struct Session {
    generation: u64,
    client: AsyncClient,
    task: JoinHandle<()>,
    settings: BrokerSettings,
}

impl Drop for Session {
    fn drop(&mut self) {
        // Best effort; the task is gone either way.
        let _ = self.client.try_disconnect();
        self.task.abort();
    }
}

#[derive(Default)]
struct Inner {
    session: Option<Session>,
    connected: bool,
    generation: u64,
    last_error: Option<String>,
}

struct Shared {
    supervisor: Supervisor,
    loopback: mpsc::UnboundedSender<MeshPacket>,
    on_error: Mutex<Option<ErrorCallback>>,
    inner: Mutex<Inner>,
}

#[derive(Clone)]
pub struct BrokerBridge {
    shared: Arc<Shared>,
}

impl BrokerBridge {
    /// Returns the bridge and the stream of demo-mode packets to feed back
    /// into the protocol bridge.
    pub fn new(supervisor: Supervisor) -> (Self, mpsc::UnboundedReceiver<MeshPacket>) {
        let (loopback, loopback_rx) = mpsc::unbounded_channel();
        let bridge = Self {
            shared: Arc::new(Shared {
                supervisor,
                loopback,
                on_error: Mutex::new(None),
                inner: Mutex::new(Inner::default()),
            }),
        };
        (bridge, loopback_rx)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.shared.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn weak(&self) -> Weak<Shared> {
        Arc::downgrade(&self.shared)
    }

    pub fn set_on_error(&self, callback: ErrorCallback) {
        *self.shared.on_error.lock().unwrap_or_else(|e| e.into_inner()) = Some(callback);
    }

    /// True only after the broker accepted the session.
    pub fn is_connected(&self) -> bool {
        self.lock().connected
    }

    pub fn settings(&self) -> Option<BrokerSettings> {
        self.lock().session.as_ref().map(|s| s.settings.clone())
    }

    pub fn last_error(&self) -> Option<String> {
        self.lock().last_error.clone()
    }

    /// Replace any current session with one for `config`.
    ///
    /// Returns `false` when there is no broker to connect to.
    pub fn connect(&self, config: Option<&BrokerConfig>, region: Option<&str>) -> bool {
        self.disconnect();

        let settings = self.shared.supervisor.preferences().load();
        let Some(broker) = resolve(config, &settings, region) else {
            debug!("no broker configured");
            return false;
        };
        let Ok(handle) = Handle::try_current() else {
            warn!("broker: no tokio runtime, not connecting");
            return false;
        };

        info!(host = %broker.host, port = broker.port, topic = %broker.topic, demo = broker.demo, "connecting to broker");
        let (client, eventloop) = AsyncClient::new(mqtt_options(&broker), CLIENT_CAPACITY);

        let mut inner = self.lock();
        inner.generation += 1;
        inner.last_error = None;
        let generation = inner.generation;
        let task = handle.spawn(run(
            self.weak(),
            generation,
            client.clone(),
            eventloop,
            broker.topic.clone(),
            broker.demo,
        ));
        inner.session = Some(Session {
            generation,
            client,
            task,
            settings: broker,
        });
        true
    }

    pub fn disconnect(&self) {
        let mut inner = self.lock();
        let session = inner.session.take();
        inner.connected = false;
        drop(inner);

        if let Some(session) = session {
            info!(host = %session.settings.host, "broker disconnected");
        }
    }

    /// Republish a radio-originated message. QoS 1, retained flag as sent.
    pub fn publish_proxy(&self, message: &MqttClientProxyMessage) -> Result<()> {
        let inner = self.lock();
        let session = inner
            .session
            .as_ref()
            .filter(|_| inner.connected)
            .ok_or_else(|| Error::Broker("not connected".into()))?;
        session.client.try_publish(
            message.topic.as_str(),
            QoS::AtLeastOnce,
            message.retained,
            message.payload().to_vec(),
        )?;
        debug!(topic = %message.topic, "proxy message published");
        Ok(())
    }

    /// Apply one inbound publish.
    pub fn handle_inbound(&self, topic: &str, payload: &[u8], retained: bool, demo: bool) -> Result<()> {
        match route_inbound(topic, payload, retained, demo)? {
            Inbound::Ignore => debug!(topic, "status topic ignored"),
            Inbound::Loopback(packet) => {
                if self.shared.loopback.send(packet).is_err() {
                    debug!("loopback closed, packet dropped");
                }
            }
            Inbound::Forward(frame) => {
                let Some(session) = self.shared.supervisor.snapshot().session else {
                    debug!(topic, "no radio link, broker message dropped");
                    return Ok(());
                };
                self.shared.supervisor.write_frame(session, frame)?;
            }
        }
        Ok(())
    }

    fn on_accepted(&self, generation: u64) -> bool {
        let mut inner = self.lock();
        if inner.generation != generation {
            return false;
        }
        inner.connected = true;
        info!("broker session accepted");
        true
    }

    /// Tear the session down and surface the failure reason.
    fn fail(&self, generation: u64, error: Error) {
        let reason = match &error {
            Error::BrokerRejected(reason) | Error::Broker(reason) => reason.clone(),
            other => other.to_string(),
        };
        let reason = reason.as_str();
        let mut inner = self.lock();
        if inner.generation != generation {
            return;
        }
        let session = inner.session.take().filter(|s| s.generation == generation);
        inner.connected = false;
        inner.last_error = Some(reason.to_string());
        drop(inner);
        drop(session);

        error!(error = %error, "broker session failed");
        info!(target: "meshlink::analytics", event = "mqtt_error", reason);
        let callback = self
            .shared
            .on_error
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        if let Some(callback) = callback {
            callback(reason);
        }
    }
}

fn mqtt_options(broker: &BrokerSettings) -> MqttOptions {
    let client_id = format!("meshlink_{}", std::process::id());
    let mut options = MqttOptions::new(client_id, broker.host.as_str(), broker.port);
    options
        .set_keep_alive(MQTT_KEEP_ALIVE)
        .set_clean_session(false)
        .set_last_will(LastWill::new(
            MQTT_WILL_TOPIC,
            MQTT_WILL_PAYLOAD,
            QoS::AtMostOnce,
            false,
        ));
    if !broker.username.is_empty() {
        options.set_credentials(broker.username.as_str(), broker.password.as_str());
    }
    if broker.tls {
        options.set_transport(rumqttc::Transport::tls_with_default_config());
    }
    options
}

async fn run(
    weak: Weak<Shared>,
    generation: u64,
    client: AsyncClient,
    mut eventloop: EventLoop,
    topic: String,
    demo: bool,
) {
    loop {
        let event = eventloop.poll().await;
        let Some(shared) = weak.upgrade() else {
            return;
        };
        let bridge = BrokerBridge { shared };

        match event {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => match connack_refusal(ack.code) {
                None => {
                    if !bridge.on_accepted(generation) {
                        return;
                    }
                    if let Err(e) = client.subscribe(topic.as_str(), QoS::AtLeastOnce).await {
                        warn!(error = %e, "broker subscribe failed");
                    }
                }
                Some(reason) => {
                    bridge.fail(generation, Error::BrokerRejected(reason.into()));
                    return;
                }
            },
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                if let Err(e) =
                    bridge.handle_inbound(&publish.topic, &publish.payload, publish.retain, demo)
                {
                    debug!(topic = %publish.topic, error = %e, "inbound broker message dropped");
                }
            }
            Ok(_) => {}
            Err(ConnectionError::ConnectionRefused(code)) => {
                let reason = connack_refusal(code).unwrap_or("Unknown Error");
                bridge.fail(generation, Error::BrokerRejected(reason.into()));
                return;
            }
            Err(e) => {
                bridge.fail(generation, Error::Broker(e.to_string()));
                return;
            }
        }
    }
}
