//! Protocol bridge - commands out, `FromRadio` stream in.
//!
//! The bridge never owns the link. It asks the [`Supervisor`] for a
//! snapshot before each send and hands finished frames back through
//! [`Supervisor::write_frame`], keyed by [`SessionId`].
//!
//! Records produced on either path are staged in memory and flushed to
//! the [`Store`] by a [`Debounce`], so a handshake that streams hundreds
//! of nodes costs a handful of saves.

use std::collections::HashMap;
use std::ops::ControlFlow;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use prost::Message;
use rand::Rng;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::ble::{SessionId, Supervisor};
use crate::config::{
    BROADCAST_NUM, HANDSHAKE_NODE_CAP, HANDSHAKE_NON_NODE_EVENTS, HANDSHAKE_STALE_AFTER,
    MIN_FIRMWARE_VERSION, PACKET_ID_MIN, SAVE_DEBOUNCE,
};
use crate::debounce::Debounce;
use crate::error::{Error, Result};
use crate::mesh::proto::{
    self, config, from_radio, mesh_packet, module_config, to_radio, FromRadio, MeshPacket,
    MqttClientProxyMessage, PortNum, RouteDiscovery, ToRadio,
};
use crate::mesh::records::{
    unix_now, ChannelRecord, MessageRecord, MetadataRecord, NodeRecord, PositionRecord, Query,
    Record, Store, TraceRouteRecord,
};
use crate::mesh::{
    firmware_release, version_at_least, ConfigKind, HandshakeEvent, OutboundCommand,
    PositionSource,
};
use crate::mqtt::BrokerConfig;
use crate::notify::{Notification, Notifier};
use crate::storage;
use crate::timer::TimerGuard;

/// Human-readable handshake status for the UI.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HandshakeProgress {
    /// Last step, e.g. `"LoRa config for Base station"`.
    pub info: String,
    /// Strictly increasing, one per handshake event.
    pub change_count: u32,
    pub last_changed: Option<Instant>,
}

impl HandshakeProgress {
    /// No progress for longer than the staleness window.
    pub fn is_stale(&self, now: Instant) -> bool {
        self.last_changed
            .is_some_and(|t| now.saturating_duration_since(t) > HANDSHAKE_STALE_AFTER)
    }
}

/// 0..=1 gauge for a handshake that has seen `count` events.
///
/// The radio streams roughly one event per known node plus a fixed set of
/// config sections. A `baseline` from the previous connect replaces the
/// estimate when the two roughly agree.
pub fn handshake_progress(count: u32, node_count: u32, baseline: Option<u32>) -> f64 {
    let expected = f64::from(HANDSHAKE_NON_NODE_EVENTS + node_count.min(HANDSHAKE_NODE_CAP));
    let max = match baseline {
        Some(b) if (f64::from(b) - expected).abs() < expected * 0.8 => f64::from(b),
        _ => expected,
    };
    (f64::from(count) / max).min(1.0)
}

#[derive(Default)]
struct BridgeState {
    /// Session the per-session fields below belong to.
    session: Option<SessionId>,
    progress: HandshakeProgress,
    names: HashMap<u32, String>,
    broker_config: Option<BrokerConfig>,
    position_timer: Option<TimerGuard>,
}

struct Shared {
    supervisor: Supervisor,
    store: Arc<dyn Store>,
    notifier: Arc<dyn Notifier>,
    position: Arc<dyn PositionSource>,
    staged: Arc<Mutex<Vec<Record>>>,
    saver: Debounce<()>,
    broker_outbox: mpsc::UnboundedSender<MqttClientProxyMessage>,
    state: Mutex<BridgeState>,
}

#[derive(Clone)]
pub struct Bridge {
    shared: Arc<Shared>,
}

impl Bridge {
    /// Returns the bridge and the stream of radio-originated broker
    /// messages to republish.
    pub fn new(
        supervisor: Supervisor,
        store: Arc<dyn Store>,
        notifier: Arc<dyn Notifier>,
        position: Arc<dyn PositionSource>,
    ) -> (Self, mpsc::UnboundedReceiver<MqttClientProxyMessage>) {
        let (broker_outbox, outbox_rx) = mpsc::unbounded_channel();
        let staged: Arc<Mutex<Vec<Record>>> = Arc::default();

        let saver = {
            let staged = staged.clone();
            let store = store.clone();
            Debounce::new(SAVE_DEBOUNCE, move |()| {
                let staged = staged.clone();
                let store = store.clone();
                async move { flush_staged(&staged, store.as_ref()) }
            })
        };

        let bridge = Self {
            shared: Arc::new(Shared {
                supervisor,
                store,
                notifier,
                position,
                staged,
                saver,
                broker_outbox,
                state: Mutex::new(BridgeState::default()),
            }),
        };
        (bridge, outbox_rx)
    }

    fn state(&self) -> MutexGuard<'_, BridgeState> {
        self.shared.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn weak(&self) -> Weak<Shared> {
        Arc::downgrade(&self.shared)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Outbound
    // ═══════════════════════════════════════════════════════════════════════

    /// Encode and write `command`. Returns the packet id.
    pub fn send(&self, command: OutboundCommand) -> Result<u32> {
        let kind = command_kind(&command);

        if let OutboundCommand::TextMessage { text, .. } = &command {
            if text.is_empty() {
                info!(target: "meshlink::analytics", event = kind, outcome = "failure_process");
                return Err(Error::EmptyMessage);
            }
        }

        let link = self.shared.supervisor.snapshot();
        let session = link.session.ok_or(Error::NotConnected)?;
        if !link.is_subscribed() {
            return Err(Error::HandshakeIncomplete);
        }
        let from = link.node_num.unwrap_or(0);
        let id = rand::thread_rng().gen_range(PACKET_ID_MIN..u32::MAX);

        let (packet, record) = match self.build_packet(command, from, id) {
            Ok(built) => built,
            Err(e) => {
                info!(target: "meshlink::analytics", event = kind, outcome = "failure_process");
                return Err(e);
            }
        };

        let frame = ToRadio {
            payload_variant: Some(to_radio::PayloadVariant::Packet(packet)),
        }
        .encode_to_vec();

        if let Some(record) = record {
            self.stage(record);
        }

        match self.shared.supervisor.write_frame(session, frame) {
            Ok(()) => {
                debug!(packet_id = id, kind, "packet sent");
                info!(target: "meshlink::analytics", event = kind, outcome = "success");
                Ok(id)
            }
            Err(e) => {
                error!(packet_id = id, kind, error = %e, "failed to send packet");
                info!(target: "meshlink::analytics", event = kind, outcome = "failure_send");
                Err(e)
            }
        }
    }

    fn build_packet(
        &self,
        command: OutboundCommand,
        from: u32,
        id: u32,
    ) -> Result<(MeshPacket, Option<Record>)> {
        match command {
            OutboundCommand::TextMessage {
                to,
                channel,
                text,
                reply_id,
                emoji,
            } => {
                let to = to.unwrap_or(BROADCAST_NUM);
                // Radios render ASCII quotes only.
                let text = text.replace('\u{2019}', "'").replace('\u{201D}', "\"");
                let data = proto::Data {
                    portnum: PortNum::TextMessageApp as i32,
                    payload: text.as_bytes().to_vec(),
                    reply_id: reply_id.unwrap_or(0),
                    emoji: u32::from(emoji),
                    ..Default::default()
                };
                let record = Record::Message(MessageRecord {
                    id,
                    from,
                    to,
                    channel,
                    text,
                    reply_id,
                    emoji,
                    outgoing: true,
                    time: unix_now(),
                });
                Ok((packet(from, to, channel, id, true, data), Some(record)))
            }
            OutboundCommand::PositionReport {
                to,
                channel,
                want_response,
            } => {
                let fix = self.shared.position.current_fix().ok_or(Error::NoPosition)?;
                let position = proto::Position {
                    latitude_i: Some((fix.latitude * 1e7) as i32),
                    longitude_i: Some((fix.longitude * 1e7) as i32),
                    altitude: fix.altitude,
                    time: fix.time,
                    timestamp: fix.time,
                    ground_speed: fix.speed.filter(|s| *s > 0.0).map(|s| s as u32),
                    ground_track: fix.course.filter(|c| *c > 0.0).map(|c| c as u32),
                    ..Default::default()
                };
                let data = proto::Data {
                    portnum: PortNum::PositionApp as i32,
                    payload: position.encode_to_vec(),
                    want_response,
                    ..Default::default()
                };
                let to = to.unwrap_or(BROADCAST_NUM);
                Ok((packet(from, to, channel, id, false, data), None))
            }
            OutboundCommand::TraceRouteRequest { to, channel } => {
                let data = proto::Data {
                    portnum: PortNum::TracerouteApp as i32,
                    payload: RouteDiscovery::default().encode_to_vec(),
                    want_response: true,
                    ..Default::default()
                };
                let record = Record::TraceRoute(TraceRouteRecord {
                    id,
                    to,
                    channel,
                    route: Vec::new(),
                    received: false,
                    sent_at: unix_now(),
                });
                Ok((packet(from, to, channel, id, true, data), Some(record)))
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Inbound
    // ═══════════════════════════════════════════════════════════════════════

    /// Interpret one `FromRadio` frame read on `session`.
    pub fn handle_from_radio(&self, session: SessionId, data: &[u8]) -> Result<()> {
        let frame = FromRadio::decode(data).map_err(|e| {
            warn!(error = %e, "undecodable FromRadio frame");
            Error::EncodingFailure { stage: "FromRadio" }
        })?;
        self.begin_session(session);
        let Some(variant) = frame.payload_variant else {
            debug!(id = frame.id, "empty FromRadio frame");
            return Ok(());
        };

        let node = self.shared.supervisor.snapshot().node_num.unwrap_or(0);

        match variant {
            from_radio::PayloadVariant::MyInfo(my_info) => {
                let num = my_info.my_node_num;
                info!(num, "my node info received");
                self.shared.supervisor.set_node_num(session, num);
                storage::update(self.shared.supervisor.preferences().as_ref(), |s| {
                    s.preferred_node_num = Some(num)
                });
                self.stage(Record::MyInfo { num });
                self.on_handshake_event(HandshakeEvent::MyInfo(num));
            }
            from_radio::PayloadVariant::NodeInfo(node_info) => {
                let num = node_info.num;
                if let Some(user) = &node_info.user {
                    self.remember_name(num, user);
                    self.stage(Record::Node(NodeRecord {
                        num,
                        long_name: user.long_name.clone(),
                        short_name: user.short_name.clone(),
                        last_heard: node_info.last_heard,
                    }));
                }
                self.on_handshake_event(HandshakeEvent::NodeInfo(num));
            }
            from_radio::PayloadVariant::Channel(channel) => {
                let name = channel
                    .settings
                    .as_ref()
                    .map(|s| s.name.clone())
                    .unwrap_or_default();
                self.stage(Record::Channel(ChannelRecord {
                    index: channel.index,
                    name: name.clone(),
                    role: channel.role,
                }));
                self.on_handshake_event(HandshakeEvent::ChannelInfo {
                    index: channel.index,
                    name,
                    num: node,
                });
            }
            from_radio::PayloadVariant::Config(section) => {
                if let Some(kind) = section.payload_variant.as_ref().map(config_kind) {
                    self.on_handshake_event(HandshakeEvent::NodeConfig(kind, node));
                }
            }
            from_radio::PayloadVariant::ModuleConfig(section) => {
                let Some(variant) = section.payload_variant else {
                    return Ok(());
                };
                if let module_config::PayloadVariant::Mqtt(mqtt) = &variant {
                    debug!(enabled = mqtt.enabled, proxy = mqtt.proxy_to_client_enabled, "broker config received");
                    self.state().broker_config = Some(BrokerConfig::from(mqtt));
                }
                self.on_handshake_event(HandshakeEvent::ModuleConfig(module_kind(&variant), node));
            }
            from_radio::PayloadVariant::Metadata(metadata) => {
                self.on_metadata(session, node, metadata.firmware_version);
            }
            from_radio::PayloadVariant::ConfigCompleteId(nonce) => {
                self.on_config_complete(session, nonce);
            }
            from_radio::PayloadVariant::Packet(packet) => self.handle_packet(packet),
            from_radio::PayloadVariant::MqttClientProxyMessage(message) => {
                debug!(topic = %message.topic, "proxy message from radio");
                if self.shared.broker_outbox.send(message).is_err() {
                    debug!("broker outbox closed, proxy message dropped");
                }
            }
            from_radio::PayloadVariant::LogRecord(record) => {
                debug!(target: "meshlink::radio", source = %record.source, "{}", record.message);
            }
            from_radio::PayloadVariant::Rebooted(_) => info!("radio rebooted"),
            from_radio::PayloadVariant::QueueStatus(status) => {
                debug!(free = status.free, maxlen = status.maxlen, "radio queue status");
            }
        }
        Ok(())
    }

    fn on_metadata(&self, session: SessionId, node: u32, raw: String) {
        let (version, supported) = match firmware_release(&raw) {
            Some(release) => (release.to_string(), version_at_least(release, MIN_FIRMWARE_VERSION)),
            None => (raw.clone(), false),
        };
        if !supported {
            warn!(firmware = %raw, "radio firmware is not supported");
        }

        self.shared
            .supervisor
            .set_firmware(session, version.clone(), supported);
        storage::update(self.shared.supervisor.preferences().as_ref(), |s| {
            s.firmware_version = Some(version.clone())
        });
        self.stage(Record::Metadata(MetadataRecord {
            num: node,
            firmware_version: version,
        }));
        self.on_handshake_event(HandshakeEvent::Metadata(node));
    }

    fn on_config_complete(&self, session: SessionId, nonce: u32) {
        if !self.shared.supervisor.complete_handshake(session, nonce) {
            debug!(nonce, "config complete for another handshake, ignored");
            return;
        }
        self.remember_progress_baseline();

        let settings = self.shared.supervisor.preferences().load();
        if settings.provide_location {
            self.start_position_broadcast(session, settings.provide_location_interval);
        }
    }

    /// Interpret a decoded mesh packet, from the radio or looped back from
    /// the broker.
    pub fn handle_packet(&self, packet: MeshPacket) {
        let Some(data) = packet.decoded() else {
            debug!(from = packet.from, "encrypted packet ignored");
            return;
        };

        match PortNum::try_from(data.portnum) {
            Ok(PortNum::TextMessageApp) => {
                let text = String::from_utf8_lossy(&data.payload).into_owned();
                info!(from = packet.from, to = packet.to, "text message received");
                self.stage(Record::Message(MessageRecord {
                    id: packet.id,
                    from: packet.from,
                    to: packet.to,
                    channel: packet.channel,
                    text,
                    reply_id: (data.reply_id != 0).then_some(data.reply_id),
                    emoji: data.emoji != 0,
                    outgoing: false,
                    time: if packet.rx_time != 0 { packet.rx_time } else { unix_now() },
                }));
            }
            Ok(PortNum::PositionApp) => match proto::Position::decode(data.payload.as_slice()) {
                Ok(position) => {
                    let (Some(latitude_i), Some(longitude_i)) =
                        (position.latitude_i, position.longitude_i)
                    else {
                        debug!(from = packet.from, "position without coordinates");
                        return;
                    };
                    self.stage(Record::Position(PositionRecord {
                        num: packet.from,
                        latitude_i,
                        longitude_i,
                        altitude: position.altitude,
                        time: position.time,
                    }));
                }
                Err(e) => warn!(error = %e, "undecodable position payload"),
            },
            Ok(PortNum::NodeinfoApp) => match proto::User::decode(data.payload.as_slice()) {
                Ok(user) => {
                    self.remember_name(packet.from, &user);
                    self.stage(Record::Node(NodeRecord {
                        num: packet.from,
                        long_name: user.long_name,
                        short_name: user.short_name,
                        last_heard: if packet.rx_time != 0 { packet.rx_time } else { unix_now() },
                    }));
                    self.on_handshake_event(HandshakeEvent::NodeInfo(packet.from));
                }
                Err(e) => warn!(error = %e, "undecodable node info payload"),
            },
            Ok(PortNum::TracerouteApp) => {
                match RouteDiscovery::decode(data.payload.as_slice()) {
                    Ok(discovery) => self.on_trace_route(data.request_id, discovery),
                    Err(e) => warn!(error = %e, "undecodable trace route payload"),
                }
            }
            Ok(port) => debug!(?port, from = packet.from, "packet ignored"),
            Err(_) => debug!(port = data.portnum, "packet on unknown port ignored"),
        }
    }

    fn on_trace_route(&self, request_id: u32, discovery: RouteDiscovery) {
        let Some(mut pending) = self.pending_trace_route(request_id) else {
            debug!(request_id, "trace route response without request");
            return;
        };

        info!(request_id, hops = discovery.route.len(), "trace route received");
        pending.route = discovery.route;
        pending.received = true;
        self.stage(Record::TraceRoute(pending));

        self.shared.notifier.queue(
            Notification {
                id: format!("traceroute.{request_id}"),
                title: "Trace Route".into(),
                subtitle: None,
                body: "Trace route was received".into(),
                path: None,
            },
            Duration::ZERO,
            false,
            false,
        );
    }

    fn pending_trace_route(&self, id: u32) -> Option<TraceRouteRecord> {
        let staged = self
            .shared
            .staged
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .rev()
            .find_map(|r| match r {
                Record::TraceRoute(t) if t.id == id => Some(t.clone()),
                _ => None,
            });
        if staged.is_some() {
            return staged;
        }

        match self.shared.store.query(&Query::TraceRoute(id)) {
            Ok(records) => records.into_iter().find_map(|r| match r {
                Record::TraceRoute(t) => Some(t),
                _ => None,
            }),
            Err(e) => {
                warn!(error = %e, "trace route lookup failed");
                None
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Handshake progress
    // ═══════════════════════════════════════════════════════════════════════

    pub fn on_handshake_event(&self, event: HandshakeEvent) {
        let info = match &event {
            HandshakeEvent::NodeConfig(kind, num) | HandshakeEvent::ModuleConfig(kind, num) => {
                format!("{} config for {}", kind.label(), self.node_name(*num))
            }
            HandshakeEvent::ChannelInfo { index, name, .. } => {
                if name.is_empty() {
                    format!("Channel info for #{index}")
                } else {
                    format!("Channel info for {name}")
                }
            }
            HandshakeEvent::MyInfo(num) => format!("My info for {}", self.node_name(*num)),
            HandshakeEvent::NodeInfo(num) => format!("Node info for {}", self.node_name(*num)),
            HandshakeEvent::Metadata(num) => format!("Metadata for {}", self.node_name(*num)),
        };

        let mut state = self.state();
        state.progress.change_count = state.progress.change_count.saturating_add(1);
        state.progress.last_changed = Some(Instant::now());
        debug!(count = state.progress.change_count, "{info}");
        state.progress.info = info;
    }

    pub fn handshake(&self) -> HandshakeProgress {
        self.state().progress.clone()
    }

    /// Gauge against the baseline stored by the previous handshake.
    pub fn progress(&self, node_count: u32) -> f64 {
        let baseline = self.shared.supervisor.preferences().load().handshake_baseline;
        handshake_progress(self.state().progress.change_count, node_count, baseline)
    }

    pub fn is_stale(&self, now: Instant) -> bool {
        self.state().progress.is_stale(now)
    }

    pub fn remember_progress_baseline(&self) {
        let count = self.state().progress.change_count;
        storage::update(self.shared.supervisor.preferences().as_ref(), |s| {
            s.handshake_baseline = Some(count)
        });
    }

    /// Display name of `num`, `"#<num>"` when unknown.
    pub fn node_name(&self, num: u32) -> String {
        if let Some(name) = self.state().names.get(&num) {
            return name.clone();
        }

        let found = match self.shared.store.query(&Query::NodeByNum(num)) {
            Ok(records) => records.into_iter().find_map(|r| match r {
                Record::Node(n) if !n.long_name.is_empty() => Some(n.long_name),
                _ => None,
            }),
            Err(e) => {
                warn!(num, error = %e, "node lookup failed");
                None
            }
        };

        match found {
            Some(name) => {
                self.state().names.insert(num, name.clone());
                name
            }
            None => format!("#{num}"),
        }
    }

    fn remember_name(&self, num: u32, user: &proto::User) {
        let name = if user.long_name.is_empty() {
            &user.short_name
        } else {
            &user.long_name
        };
        if !name.is_empty() {
            self.state().names.insert(num, name.clone());
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Session lifecycle
    // ═══════════════════════════════════════════════════════════════════════

    /// Broker settings announced by the radio during the handshake.
    pub fn broker_config(&self) -> Option<BrokerConfig> {
        self.state().broker_config.clone()
    }

    /// Start tracking `session`. Progress, broker config and the position
    /// timer of any earlier session are dropped.
    pub fn begin_session(&self, session: SessionId) {
        let mut state = self.state();
        if state.session == Some(session) {
            return;
        }
        debug!(?session, previous = ?state.session, "bridge follows new session");
        reset_session(&mut state);
        state.session = Some(session);
    }

    /// Forget per-session state after `session` closed. Ignored once the
    /// bridge follows a newer session.
    pub fn on_session_closed(&self, session: SessionId) {
        let mut state = self.state();
        if state.session.is_some_and(|current| current != session) {
            debug!(?session, "close of a superseded session ignored");
            return;
        }
        reset_session(&mut state);
        state.session = None;
    }

    fn start_position_broadcast(&self, session: SessionId, interval: Duration) {
        info!(interval_secs = interval.as_secs(), "position broadcast started");
        let weak = self.weak();
        let timer = TimerGuard::repeating(interval, move || {
            let Some(shared) = weak.upgrade() else {
                return ControlFlow::Break(());
            };
            let bridge = Bridge { shared };
            let link = bridge.shared.supervisor.snapshot();
            if link.session != Some(session) {
                return ControlFlow::Break(());
            }
            let command = OutboundCommand::PositionReport {
                to: link.node_num,
                channel: 0,
                want_response: false,
            };
            if let Err(e) = bridge.send(command) {
                debug!(error = %e, "periodic position not sent");
            }
            ControlFlow::Continue(())
        });
        self.state().position_timer = timer;
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Persistence
    // ═══════════════════════════════════════════════════════════════════════

    fn stage(&self, record: Record) {
        self.shared
            .staged
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(record);
        self.shared.saver.emit(());
    }

    /// Records waiting for the next save.
    pub fn staged_len(&self) -> usize {
        self.shared
            .staged
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    /// Save staged records now instead of after the quiet period.
    pub fn flush(&self) {
        flush_staged(&self.shared.staged, self.shared.store.as_ref());
    }
}

fn reset_session(state: &mut BridgeState) {
    state.progress = HandshakeProgress::default();
    state.broker_config = None;
    state.position_timer = None;
}

fn flush_staged(staged: &Mutex<Vec<Record>>, store: &dyn Store) {
    let batch = std::mem::take(&mut *staged.lock().unwrap_or_else(|e| e.into_inner()));
    if batch.is_empty() {
        return;
    }
    match store.save(&batch) {
        Ok(()) => debug!(records = batch.len(), "records saved"),
        Err(e) => error!(records = batch.len(), error = %e, "save failed, batch dropped"),
    }
}

fn packet(from: u32, to: u32, channel: u32, id: u32, want_ack: bool, data: proto::Data) -> MeshPacket {
    MeshPacket {
        from,
        to,
        channel,
        id,
        want_ack,
        payload_variant: Some(mesh_packet::PayloadVariant::Decoded(data)),
        ..Default::default()
    }
}

fn command_kind(command: &OutboundCommand) -> &'static str {
    match command {
        OutboundCommand::TextMessage { .. } => "send_message",
        OutboundCommand::PositionReport { .. } => "send_position",
        OutboundCommand::TraceRouteRequest { .. } => "send_trace_route",
    }
}

fn config_kind(variant: &config::PayloadVariant) -> ConfigKind {
    match variant {
        config::PayloadVariant::Device(_) => ConfigKind::Device,
        config::PayloadVariant::Position(_) => ConfigKind::Position,
        config::PayloadVariant::Power(_) => ConfigKind::Power,
        config::PayloadVariant::Network(_) => ConfigKind::Network,
        config::PayloadVariant::Display(_) => ConfigKind::Display,
        config::PayloadVariant::Lora(_) => ConfigKind::LoRa,
        config::PayloadVariant::Bluetooth(_) => ConfigKind::Bluetooth,
        config::PayloadVariant::Security(_) => ConfigKind::Security,
    }
}

fn module_kind(variant: &module_config::PayloadVariant) -> ConfigKind {
    match variant {
        module_config::PayloadVariant::Mqtt(_) => ConfigKind::Mqtt,
        module_config::PayloadVariant::Serial(_) => ConfigKind::Serial,
        module_config::PayloadVariant::ExternalNotification(_) => ConfigKind::ExternalNotification,
        module_config::PayloadVariant::StoreForward(_) => ConfigKind::StoreForward,
        module_config::PayloadVariant::RangeTest(_) => ConfigKind::RangeTest,
        module_config::PayloadVariant::Telemetry(_) => ConfigKind::Telemetry,
        module_config::PayloadVariant::CannedMessage(_) => ConfigKind::CannedMessage,
        module_config::PayloadVariant::Audio(_) => ConfigKind::Audio,
        module_config::PayloadVariant::RemoteHardware(_) => ConfigKind::RemoteHardware,
        module_config::PayloadVariant::NeighborInfo(_) => ConfigKind::NeighborInfo,
        module_config::PayloadVariant::AmbientLighting(_) => ConfigKind::AmbientLighting,
        module_config::PayloadVariant::DetectionSensor(_) => ConfigKind::DetectionSensor,
        module_config::PayloadVariant::Paxcounter(_) => ConfigKind::Paxcounter,
    }
}
