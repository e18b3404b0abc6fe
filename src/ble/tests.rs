//! Connection supervisor scenarios.
//!
//! Time is paused, so the 1.5 s connect-timeout ticks and 1 s scan ticks
//! run in virtual time against a [`MockTransport`] that never calls back.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use prost::Message;
use tokio::sync::broadcast;
use tokio::time::sleep;
use uuid::Uuid;

use super::supervisor::{INSUFFICIENT_SECURITY_ERROR, UNKNOWN_DEVICE_ERROR};
use super::*;
use crate::error::Error;
use crate::mesh::proto::{to_radio, ToRadio};
use crate::error::TransportError;
use crate::storage::{self, MemoryPreferences, Preferences};
use crate::testing::{
    linked_supervisor, radio_id, MockTransport, RecordingNotifier, TestRig, TransportCall,
};

fn id(n: u128) -> PeripheralId {
    PeripheralId(Uuid::from_u128(n))
}

fn drain(rx: &mut broadcast::Receiver<LinkEvent>) -> Vec<LinkEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn closed(events: &[LinkEvent]) -> Vec<CloseReason> {
    events
        .iter()
        .filter_map(|e| match e {
            LinkEvent::SessionClosed { reason, .. } => Some(reason.clone()),
            _ => None,
        })
        .collect()
}

// ═══════════════════════════════════════════════════════════════════════════
// Connect timeout
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test(start_paused = true)]
async fn ten_timeouts_clear_the_session() {
    let rig = TestRig::new();
    let x = id(1);
    storage::update(rig.preferences.as_ref(), |s| s.remember_preferred(x));
    let mut rx = rig.supervisor.subscribe();

    rig.supervisor
        .handle(TransportEvent::Discovered(Advertisement::new(x, "X", -60)));

    let candidate = rig.supervisor.candidate(x).unwrap();
    assert_eq!(candidate.signal_strength(), SignalStrength::Strong);
    assert_eq!(rig.transport.count(&TransportCall::Connect(x)), 1);
    assert_eq!(rig.supervisor.state(), LinkState::Connecting);

    sleep(Duration::from_millis(14_900)).await;
    let link = rig.supervisor.snapshot();
    assert_eq!(link.state, LinkState::Connecting);
    assert_eq!(link.timeout_attempts, 9);
    assert!(link.last_error.is_none());

    sleep(Duration::from_millis(200)).await;
    let link = rig.supervisor.snapshot();
    assert_eq!(link.state, LinkState::Idle);
    assert!(link.session.is_none());
    assert_eq!(link.timeout_attempts, 0);
    assert_eq!(link.last_error, Some(Error::ConnectionTimeout.to_string()));
    assert_eq!(rig.transport.count(&TransportCall::CancelConnect(x)), 1);
    assert_eq!(closed(&drain(&mut rx)), vec![CloseReason::TimedOut]);

    // The timer died with the session.
    sleep(Duration::from_secs(10)).await;
    assert_eq!(rig.transport.count(&TransportCall::CancelConnect(x)), 1);
}

#[tokio::test(start_paused = true)]
async fn connect_to_same_radio_while_connecting_is_noop() {
    let rig = TestRig::new();
    let x = id(1);

    assert!(rig.supervisor.connect_to(x));
    sleep(Duration::from_millis(3_100)).await;
    assert!(!rig.supervisor.connect_to(x));

    // The first attempt's timer keeps counting.
    assert_eq!(rig.supervisor.snapshot().timeout_attempts, 2);
    assert_eq!(rig.transport.count(&TransportCall::Connect(x)), 1);

    sleep(Duration::from_secs(13)).await;
    assert_eq!(rig.supervisor.state(), LinkState::Idle);
    assert_eq!(rig.transport.count(&TransportCall::CancelConnect(x)), 1);
}

#[tokio::test(start_paused = true)]
async fn connect_to_other_radio_tears_down_first() {
    let rig = TestRig::new();
    let (a, b) = (id(1), id(2));
    let mut rx = rig.supervisor.subscribe();

    rig.supervisor.connect_to(a);
    let first = rig.supervisor.snapshot().session.unwrap();
    assert!(rig.supervisor.connect_to(b));

    let calls = rig.transport.calls();
    let cancel_a = calls.iter().position(|c| *c == TransportCall::CancelConnect(a));
    let connect_b = calls.iter().position(|c| *c == TransportCall::Connect(b));
    assert!(cancel_a.unwrap() < connect_b.unwrap());

    let link = rig.supervisor.snapshot();
    assert_eq!(link.peripheral, Some(b));
    assert_ne!(link.session, Some(first));

    let events = drain(&mut rx);
    assert!(events.contains(&LinkEvent::SessionClosed {
        session: first,
        peripheral: a,
        reason: CloseReason::Disconnected { reconnect: true },
    }));
}

#[tokio::test(start_paused = true)]
async fn rejected_connect_clears_session() {
    let rig = TestRig::new();
    rig.transport.fail_connects(true);

    assert!(!rig.supervisor.connect_to(id(1)));
    let link = rig.supervisor.snapshot();
    assert!(link.session.is_none());
    assert!(link.last_error.is_some());
}

// ═══════════════════════════════════════════════════════════════════════════
// Connected
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test(start_paused = true)]
async fn connected_requests_config_and_reads() {
    let rig = TestRig::new();
    let x = id(1);
    let mut rx = rig.supervisor.subscribe();

    rig.supervisor.connect_to(x);
    sleep(Duration::from_secs(4)).await;
    rig.supervisor.handle(TransportEvent::Connected(x));

    let link = rig.supervisor.snapshot();
    assert_eq!(link.state, LinkState::Connected);
    assert_eq!(link.timeout_attempts, 0);
    assert_eq!(link.handshake_nonce, Some(1));
    assert_eq!(rig.preferences.load().preferred_device(), Some(x));

    let writes = rig.transport.writes();
    assert_eq!(writes.len(), 1);
    let frame = ToRadio::decode(writes[0].as_slice()).unwrap();
    assert_eq!(frame.payload_variant, Some(to_radio::PayloadVariant::WantConfigId(1)));
    assert_eq!(
        rig.transport.count(&TransportCall::Read(x, Characteristic::FromRadio)),
        1
    );

    let events = drain(&mut rx);
    assert!(events
        .iter()
        .any(|e| matches!(e, LinkEvent::DeviceConnected { peripheral, .. } if *peripheral == x)));

    // No timeout fires once connected.
    sleep(Duration::from_secs(30)).await;
    assert_eq!(rig.supervisor.state(), LinkState::Connected);
}

#[tokio::test(start_paused = true)]
async fn connect_to_linked_radio_reannounces() {
    let rig = TestRig::new();
    let session = linked_supervisor(&rig);
    let mut rx = rig.supervisor.subscribe();

    assert!(!rig.supervisor.connect_to(radio_id()));
    let events = drain(&mut rx);
    assert!(matches!(
        events.as_slice(),
        [LinkEvent::DeviceConnected { session: s, .. }] if *s == session
    ));
    assert_eq!(rig.supervisor.state(), LinkState::Subscribed);
}

#[tokio::test(start_paused = true)]
async fn unknown_peripheral_is_rejected() {
    let rig = TestRig::new();
    let stranger = id(99);

    rig.supervisor.handle(TransportEvent::Connected(stranger));

    assert_eq!(
        rig.supervisor.last_error().as_deref(),
        Some(UNKNOWN_DEVICE_ERROR)
    );
    assert_eq!(
        rig.transport.count(&TransportCall::CancelConnect(stranger)),
        1
    );
    assert!(rig.supervisor.snapshot().session.is_none());
}

#[tokio::test(start_paused = true)]
async fn handshake_needs_matching_nonce() {
    let rig = TestRig::new();
    let x = id(1);
    let mut rx = rig.supervisor.subscribe();
    rig.supervisor.connect_to(x);
    rig.supervisor.handle(TransportEvent::Connected(x));
    let link = rig.supervisor.snapshot();
    let session = link.session.unwrap();
    let nonce = link.handshake_nonce.unwrap();

    assert!(!rig.supervisor.complete_handshake(session, nonce + 1));
    assert!(!rig.supervisor.complete_handshake(SessionId(session.0 + 1), nonce));
    assert_eq!(rig.supervisor.state(), LinkState::Connected);

    assert!(rig.supervisor.complete_handshake(session, nonce));
    assert_eq!(rig.supervisor.state(), LinkState::Subscribed);
    assert!(drain(&mut rx).contains(&LinkEvent::HandshakeComplete {
        session,
        peripheral: x,
    }));

    // Only once.
    assert!(!rig.supervisor.complete_handshake(session, nonce));
}

#[tokio::test(start_paused = true)]
async fn nonce_advances_per_connect() {
    let rig = TestRig::new();
    let x = id(1);
    rig.supervisor.connect_to(x);
    rig.supervisor.handle(TransportEvent::Connected(x));
    rig.supervisor.disconnect_device(true);
    rig.supervisor.connect_to(x);
    rig.supervisor.handle(TransportEvent::Connected(x));
    assert_eq!(rig.supervisor.snapshot().handshake_nonce, Some(2));
}

#[tokio::test(start_paused = true)]
async fn write_frame_needs_live_session() {
    let rig = TestRig::new();
    let x = id(1);
    assert!(matches!(
        rig.supervisor.write_frame(SessionId(1), vec![1]),
        Err(Error::NotConnected)
    ));

    rig.supervisor.connect_to(x);
    let session = rig.supervisor.snapshot().session.unwrap();
    assert!(matches!(
        rig.supervisor.write_frame(session, vec![1]),
        Err(Error::NotConnected)
    ));

    rig.supervisor.handle(TransportEvent::Connected(x));
    rig.supervisor.write_frame(session, vec![1]).unwrap();

    rig.transport.fail_writes(true);
    assert!(matches!(
        rig.supervisor.write_frame(session, vec![1]),
        Err(Error::Transport(_))
    ));
}

// ═══════════════════════════════════════════════════════════════════════════
// Cancel / disconnect
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test(start_paused = true)]
async fn cancel_is_idempotent() {
    let rig = TestRig::new();
    let x = id(1);
    let mut rx = rig.supervisor.subscribe();
    rig.supervisor.connect_to(x);
    drain(&mut rx);

    rig.supervisor.cancel_peripheral_connection();
    let once = rig.supervisor.snapshot();
    let once_calls = rig.transport.calls();
    let once_events = drain(&mut rx);

    rig.supervisor.cancel_peripheral_connection();
    assert_eq!(rig.supervisor.snapshot(), once);
    assert_eq!(rig.transport.calls(), once_calls);
    assert!(drain(&mut rx).is_empty());

    assert_eq!(closed(&once_events), vec![CloseReason::Cancelled]);
    assert!(!once.auto_reconnect);
    assert_eq!(rig.transport.count(&TransportCall::CancelConnect(x)), 1);
}

#[tokio::test(start_paused = true)]
async fn cancel_disables_auto_reconnect() {
    let rig = TestRig::new();
    let x = id(1);
    rig.supervisor.connect_to(x);
    rig.supervisor.cancel_peripheral_connection();

    rig.supervisor
        .handle(TransportEvent::Discovered(Advertisement::new(x, "X", -70)));
    assert_eq!(rig.transport.count(&TransportCall::Connect(x)), 1);
    assert!(rig.supervisor.snapshot().session.is_none());

    // A late connect callback for the cancelled attempt is dropped.
    rig.supervisor.handle(TransportEvent::Connected(x));
    assert!(rig.supervisor.snapshot().session.is_none());
    assert_eq!(rig.transport.count(&TransportCall::CancelConnect(x)), 2);
}

#[tokio::test(start_paused = true)]
async fn disconnect_device_sets_reconnect_policy() {
    let rig = TestRig::new();
    let mut rx = rig.supervisor.subscribe();
    linked_supervisor(&rig);
    drain(&mut rx);

    rig.supervisor.disconnect_device(false);
    let link = rig.supervisor.snapshot();
    assert!(link.session.is_none());
    assert!(!link.auto_reconnect);
    assert_eq!(
        closed(&drain(&mut rx)),
        vec![CloseReason::Disconnected { reconnect: false }]
    );

    // Without a session it does nothing.
    rig.supervisor.disconnect_device(true);
    assert!(drain(&mut rx).is_empty());
    assert!(!rig.supervisor.snapshot().auto_reconnect);
}

#[tokio::test(start_paused = true)]
async fn connect_failure_behaves_like_cancel() {
    let rig = TestRig::new();
    let x = id(1);
    rig.supervisor.connect_to(x);
    rig.supervisor.handle(TransportEvent::ConnectFailed(
        x,
        Some(DisconnectReason::PairingCancelled),
    ));

    let link = rig.supervisor.snapshot();
    assert!(link.session.is_none());
    assert!(!link.auto_reconnect);
    assert_eq!(
        link.last_error.as_deref(),
        Some("Pairing was cancelled. Please try to pair the node again.")
    );
}

// ═══════════════════════════════════════════════════════════════════════════
// Transport-level disconnects
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test(start_paused = true)]
async fn peer_disconnect_of_preferred_radio_notifies() {
    let rig = TestRig::new();
    let mut rx = rig.supervisor.subscribe();
    linked_supervisor(&rig);
    drain(&mut rx);

    rig.supervisor.handle(TransportEvent::Disconnected(
        radio_id(),
        Some(DisconnectReason::PeerDisconnected),
    ));

    let link = rig.supervisor.snapshot();
    assert!(link.session.is_none());
    assert_eq!(
        link.last_error.as_deref(),
        Some("Node was disconnected. Check if it's turned on.")
    );
    assert_eq!(
        closed(&drain(&mut rx)),
        vec![CloseReason::Lost(Some(DisconnectReason::PeerDisconnected))]
    );

    let queued = rig.notifier.queued();
    assert_eq!(queued.len(), 1);
    let n = &queued[0].notification;
    assert_eq!(n.id, radio_id().to_string());
    assert_eq!(n.title, "Radio Disconnected");
    assert_eq!(n.subtitle.as_deref(), Some("Base station"));
    assert_eq!(n.path.as_deref(), Some("/connection"));
}

#[tokio::test(start_paused = true)]
async fn timeout_disconnect_is_silent() {
    let rig = TestRig::new();
    linked_supervisor(&rig);

    rig.supervisor.handle(TransportEvent::Disconnected(
        radio_id(),
        Some(DisconnectReason::Timeout),
    ));

    assert_eq!(
        rig.supervisor.last_error().as_deref(),
        Some("Connection timed out. Will connect back soon.")
    );
    assert!(rig.notifier.queued().is_empty());
}

#[tokio::test(start_paused = true)]
async fn disconnect_of_untracked_radio_is_ignored() {
    let rig = TestRig::new();
    let session = linked_supervisor(&rig);

    rig.supervisor.handle(TransportEvent::Disconnected(
        id(42),
        Some(DisconnectReason::PeerDisconnected),
    ));
    assert_eq!(rig.supervisor.snapshot().session, Some(session));
    assert!(rig.notifier.queued().is_empty());
}

#[tokio::test(start_paused = true)]
async fn insufficient_security_drops_link() {
    let rig = TestRig::new();
    linked_supervisor(&rig);

    rig.supervisor.handle(TransportEvent::ValueFailed(
        radio_id(),
        Characteristic::FromRadio,
        ValueError::InsufficientSecurity,
    ));

    let link = rig.supervisor.snapshot();
    assert!(link.session.is_none());
    assert!(!link.auto_reconnect);
    assert_eq!(link.last_error.as_deref(), Some(INSUFFICIENT_SECURITY_ERROR));
}

// ═══════════════════════════════════════════════════════════════════════════
// Reads
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test(start_paused = true)]
async fn from_radio_reads_until_empty() {
    let rig = TestRig::new();
    let session = linked_supervisor(&rig);
    let x = radio_id();
    rig.transport.take_calls();

    let frame = rig
        .supervisor
        .handle(TransportEvent::ValueUpdated(x, Characteristic::FromRadio, vec![8, 1]));
    assert_eq!(
        frame,
        Some(supervisor::InboundFrame {
            session,
            data: vec![8, 1],
        })
    );
    assert_eq!(rig.transport.take_calls(), vec![TransportCall::Read(x, Characteristic::FromRadio)]);

    let frame = rig
        .supervisor
        .handle(TransportEvent::ValueUpdated(x, Characteristic::FromRadio, vec![]));
    assert!(frame.is_none());
    assert!(rig.transport.take_calls().is_empty());

    // New data notification restarts the loop.
    let frame = rig
        .supervisor
        .handle(TransportEvent::ValueUpdated(x, Characteristic::FromNum, vec![1, 0, 0, 0]));
    assert!(frame.is_none());
    assert_eq!(rig.transport.take_calls(), vec![TransportCall::Read(x, Characteristic::FromRadio)]);
}

#[tokio::test(start_paused = true)]
async fn values_from_other_radios_are_ignored() {
    let rig = TestRig::new();
    linked_supervisor(&rig);
    rig.transport.take_calls();

    let frame = rig
        .supervisor
        .handle(TransportEvent::ValueUpdated(id(7), Characteristic::FromRadio, vec![1]));
    assert!(frame.is_none());
    assert!(rig.transport.take_calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn rssi_is_tracked_for_the_link() {
    let rig = TestRig::new();
    linked_supervisor(&rig);

    rig.supervisor.read_rssi().unwrap();
    assert_eq!(rig.transport.count(&TransportCall::ReadRssi(radio_id())), 1);

    rig.supervisor
        .handle(TransportEvent::RssiUpdated(radio_id(), -90));
    assert_eq!(rig.supervisor.snapshot().rssi, Some(-90));
    assert_eq!(
        rig.supervisor.candidate(radio_id()).unwrap().signal_strength(),
        SignalStrength::Weak
    );
}

// ═══════════════════════════════════════════════════════════════════════════
// Scanning and auto-reconnect
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test(start_paused = true)]
async fn scanning_needs_power() {
    let rig = TestRig::new();
    rig.transport.set_powered_on(false);

    rig.supervisor.start_scanning();
    assert_eq!(rig.supervisor.state(), LinkState::Idle);
    assert!(rig.transport.calls().is_empty());

    rig.transport.set_powered_on(true);
    rig.supervisor.handle(TransportEvent::PowerChanged(true));
    assert_eq!(rig.supervisor.state(), LinkState::Scanning);

    // Already scanning: no second start.
    rig.supervisor.start_scanning();
    assert_eq!(rig.transport.count(&TransportCall::StartScan), 1);

    rig.supervisor.handle(TransportEvent::PowerChanged(false));
    assert_eq!(rig.supervisor.state(), LinkState::Idle);
}

/// Reports a cached radio from inside `start_scan`, the way some stacks do.
#[derive(Default)]
struct InlineDiscovery {
    inner: MockTransport,
    supervisor: OnceLock<Supervisor>,
}

impl Transport for InlineDiscovery {
    fn is_powered_on(&self) -> bool {
        self.inner.is_powered_on()
    }

    fn start_scan(&self) -> std::result::Result<(), TransportError> {
        self.inner.start_scan()?;
        if let Some(supervisor) = self.supervisor.get() {
            supervisor.handle(TransportEvent::Discovered(Advertisement::new(id(7), "Cached", -60)));
        }
        Ok(())
    }

    fn stop_scan(&self) {
        self.inner.stop_scan()
    }

    fn connect(&self, id: PeripheralId) -> std::result::Result<(), TransportError> {
        self.inner.connect(id)
    }

    fn cancel_connect(&self, id: PeripheralId) {
        self.inner.cancel_connect(id)
    }

    fn write(
        &self,
        id: PeripheralId,
        characteristic: Characteristic,
        data: Vec<u8>,
    ) -> std::result::Result<(), TransportError> {
        self.inner.write(id, characteristic, data)
    }

    fn read(&self, id: PeripheralId, characteristic: Characteristic) -> std::result::Result<(), TransportError> {
        self.inner.read(id, characteristic)
    }

    fn read_rssi(&self, id: PeripheralId) -> std::result::Result<(), TransportError> {
        self.inner.read_rssi(id)
    }
}

#[tokio::test(start_paused = true)]
async fn transport_may_report_from_inside_start_scan() {
    let transport = Arc::new(InlineDiscovery::default());
    let supervisor = Supervisor::new(
        transport.clone(),
        Arc::new(MemoryPreferences::default()),
        Arc::new(RecordingNotifier::default()),
    );
    assert!(transport.supervisor.set(supervisor.clone()).is_ok());
    let mut rx = supervisor.subscribe();

    supervisor.start_scanning();

    assert_eq!(supervisor.state(), LinkState::Scanning);
    assert_eq!(transport.inner.count(&TransportCall::StartScan), 1);
    let candidates = supervisor.candidates();
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].id, id(7));
    assert!(drain(&mut rx).contains(&LinkEvent::ScanningChanged(true)));
}

#[tokio::test(start_paused = true)]
async fn preferred_radio_wins_over_fresher_one() {
    let rig = TestRig::new();
    let (a, b) = (id(1), id(2));
    storage::update(rig.preferences.as_ref(), |s| s.remember_preferred(b));

    rig.supervisor.set_auto_reconnect(false);
    rig.supervisor
        .handle(TransportEvent::Discovered(Advertisement::new(b, "B", -80)));
    sleep(Duration::from_millis(500)).await;
    rig.supervisor
        .handle(TransportEvent::Discovered(Advertisement::new(a, "A", -50)));
    assert!(rig.transport.calls().is_empty());

    rig.supervisor.set_auto_reconnect(true);
    rig.supervisor.start_scanning();

    assert_eq!(rig.supervisor.snapshot().peripheral, Some(b));
    assert_eq!(rig.transport.count(&TransportCall::Connect(a)), 0);

    let names: Vec<_> = rig.supervisor.candidates().iter().map(|c| c.id).collect();
    assert_eq!(names, vec![b, a]);
}

#[tokio::test(start_paused = true)]
async fn stale_candidates_are_never_selected() {
    let rig = TestRig::new();
    let x = id(1);
    rig.supervisor.set_auto_reconnect(false);
    rig.supervisor
        .handle(TransportEvent::Discovered(Advertisement::new(x, "X", -60)));
    rig.supervisor.start_scanning();

    sleep(Duration::from_secs(8)).await;
    rig.supervisor.set_auto_reconnect(true);
    sleep(Duration::from_secs(2)).await;

    assert!(rig.supervisor.snapshot().session.is_none());
    assert_eq!(rig.transport.count(&TransportCall::Connect(x)), 0);
    assert!(rig.supervisor.candidates().is_empty());
}

#[tokio::test(start_paused = true)]
async fn scan_tick_reports_candidates() {
    let rig = TestRig::new();
    let mut rx = rig.supervisor.subscribe();
    rig.supervisor.set_auto_reconnect(false);
    rig.supervisor.start_scanning();
    assert_eq!(drain(&mut rx), vec![LinkEvent::ScanningChanged(true)]);

    sleep(Duration::from_millis(3_500)).await;
    let ticks = drain(&mut rx)
        .into_iter()
        .filter(|e| *e == LinkEvent::CandidatesChanged)
        .count();
    assert_eq!(ticks, 3);

    rig.supervisor.stop_scanning();
    assert_eq!(drain(&mut rx), vec![LinkEvent::ScanningChanged(false)]);
    sleep(Duration::from_secs(3)).await;
    assert!(drain(&mut rx).is_empty());
    assert_eq!(rig.transport.count(&TransportCall::StopScan), 1);
}

#[tokio::test(start_paused = true)]
async fn raw_advertisements_only_admit_mesh_radios() {
    let rig = TestRig::new();
    rig.supervisor.set_auto_reconnect(false);

    let mut uuid = *crate::config::MESH_SERVICE_UUID.as_bytes();
    uuid.reverse();
    let mut mesh = vec![0x02, 0x01, 0x06, 17, 0x07];
    mesh.extend_from_slice(&uuid);
    mesh.extend_from_slice(&[5, 0x09, b'R', b'o', b'o', b'f']);

    assert!(rig.supervisor.on_advertisement_data(id(1), -70, &mesh));
    assert!(!rig.supervisor.on_advertisement_data(id(2), -40, &[0x02, 0x01, 0x06, 5, 0x09, b'T', b'V', b'!', b'!']));

    let candidates = rig.supervisor.candidates();
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].id, id(1));
    assert_eq!(candidates[0].name.as_str(), "Roof");
}
