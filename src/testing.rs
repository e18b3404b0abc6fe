//! In-memory collaborators for tests.
//!
//! Compiled for this crate's tests and, behind the `testing` feature, for
//! downstream crates that want to drive a [`Supervisor`] without a radio.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::ble::{
    Advertisement, Characteristic, PeripheralId, SessionId, Supervisor, Transport, TransportEvent,
};
use crate::error::{Error, Result, TransportError};
use crate::mesh::records::{Query, Record, Store};
use crate::mesh::{Fix, PositionSource};
use crate::notify::{Notification, Notifier};
use crate::storage::MemoryPreferences;
use tracing_subscriber::EnvFilter;

/// Route `tracing` output through the test harness, filtered by `RUST_LOG`.
/// Safe to call from every test; only the first call installs.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn locked<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

// ═══════════════════════════════════════════════════════════════════════════
// Transport
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportCall {
    StartScan,
    StopScan,
    Connect(PeripheralId),
    CancelConnect(PeripheralId),
    Write(PeripheralId, Characteristic, Vec<u8>),
    Read(PeripheralId, Characteristic),
    ReadRssi(PeripheralId),
}

/// Records every call; never calls back.
#[derive(Debug)]
pub struct MockTransport {
    powered_on: AtomicBool,
    fail_connect: AtomicBool,
    fail_write: AtomicBool,
    calls: Mutex<Vec<TransportCall>>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self {
            powered_on: AtomicBool::new(true),
            fail_connect: AtomicBool::new(false),
            fail_write: AtomicBool::new(false),
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl MockTransport {
    pub fn set_powered_on(&self, on: bool) {
        self.powered_on.store(on, Ordering::SeqCst);
    }

    pub fn fail_connects(&self, fail: bool) {
        self.fail_connect.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_write.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<TransportCall> {
        locked(&self.calls).clone()
    }

    pub fn take_calls(&self) -> Vec<TransportCall> {
        std::mem::take(&mut *locked(&self.calls))
    }

    /// Frames written to `ToRadio`, oldest first.
    pub fn writes(&self) -> Vec<Vec<u8>> {
        locked(&self.calls)
            .iter()
            .filter_map(|c| match c {
                TransportCall::Write(_, Characteristic::ToRadio, data) => Some(data.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, call: &TransportCall) -> usize {
        locked(&self.calls).iter().filter(|c| *c == call).count()
    }

    fn record(&self, call: TransportCall) {
        locked(&self.calls).push(call);
    }
}

impl Transport for MockTransport {
    fn is_powered_on(&self) -> bool {
        self.powered_on.load(Ordering::SeqCst)
    }

    fn start_scan(&self) -> std::result::Result<(), TransportError> {
        self.record(TransportCall::StartScan);
        Ok(())
    }

    fn stop_scan(&self) {
        self.record(TransportCall::StopScan);
    }

    fn connect(&self, id: PeripheralId) -> std::result::Result<(), TransportError> {
        self.record(TransportCall::Connect(id));
        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(TransportError::ConnectFailed);
        }
        Ok(())
    }

    fn cancel_connect(&self, id: PeripheralId) {
        self.record(TransportCall::CancelConnect(id));
    }

    fn write(
        &self,
        id: PeripheralId,
        characteristic: Characteristic,
        data: Vec<u8>,
    ) -> std::result::Result<(), TransportError> {
        if self.fail_write.load(Ordering::SeqCst) {
            return Err(TransportError::WriteFailed);
        }
        self.record(TransportCall::Write(id, characteristic, data));
        Ok(())
    }

    fn read(&self, id: PeripheralId, characteristic: Characteristic) -> std::result::Result<(), TransportError> {
        self.record(TransportCall::Read(id, characteristic));
        Ok(())
    }

    fn read_rssi(&self, id: PeripheralId) -> std::result::Result<(), TransportError> {
        self.record(TransportCall::ReadRssi(id));
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Store
// ═══════════════════════════════════════════════════════════════════════════

/// Upserts by record identity, like a keyed table.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<Vec<Record>>,
    saves: Mutex<usize>,
    fail_saves: AtomicBool,
}

impl MemoryStore {
    pub fn with_records(records: Vec<Record>) -> Self {
        Self {
            records: Mutex::new(records),
            ..Default::default()
        }
    }

    pub fn records(&self) -> Vec<Record> {
        locked(&self.records).clone()
    }

    /// Number of `save` calls, failed ones included.
    pub fn save_calls(&self) -> usize {
        *locked(&self.saves)
    }

    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }
}

fn same_entity(a: &Record, b: &Record) -> bool {
    match (a, b) {
        (Record::Message(x), Record::Message(y)) => x.id == y.id,
        (Record::TraceRoute(x), Record::TraceRoute(y)) => x.id == y.id,
        (Record::Node(x), Record::Node(y)) => x.num == y.num,
        (Record::Channel(x), Record::Channel(y)) => x.index == y.index,
        (Record::MyInfo { num: x }, Record::MyInfo { num: y }) => x == y,
        (Record::Metadata(x), Record::Metadata(y)) => x.num == y.num,
        _ => false,
    }
}

impl Store for MemoryStore {
    fn save(&self, batch: &[Record]) -> Result<()> {
        *locked(&self.saves) += 1;
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(Error::PersistenceFailure("store is read-only".into()));
        }
        let mut records = locked(&self.records);
        for record in batch {
            match records.iter_mut().find(|r| same_entity(r, record)) {
                Some(existing) => *existing = record.clone(),
                None => records.push(record.clone()),
            }
        }
        Ok(())
    }

    fn query(&self, query: &Query) -> Result<Vec<Record>> {
        let records = locked(&self.records);
        let found = records
            .iter()
            .filter(|r| match (query, r) {
                (Query::NodeByNum(num), Record::Node(n)) => n.num == *num,
                (Query::NodesHeardSince { since, excluding }, Record::Node(n)) => {
                    n.last_heard >= *since && Some(n.num) != *excluding
                }
                (Query::TraceRoute(id), Record::TraceRoute(t)) => t.id == *id,
                _ => false,
            })
            .cloned()
            .collect();
        Ok(found)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Notifier / position
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Queued {
    pub notification: Notification,
    pub delay: Duration,
    pub silent: bool,
    pub remove_existing: bool,
}

#[derive(Debug, Default)]
pub struct RecordingNotifier {
    queued: Mutex<Vec<Queued>>,
}

impl RecordingNotifier {
    pub fn queued(&self) -> Vec<Queued> {
        locked(&self.queued).clone()
    }

    pub fn with_id(&self, id: &str) -> Vec<Queued> {
        locked(&self.queued)
            .iter()
            .filter(|q| q.notification.id == id)
            .cloned()
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn queue(&self, notification: Notification, delay: Duration, silent: bool, remove_existing: bool) {
        locked(&self.queued).push(Queued {
            notification,
            delay,
            silent,
            remove_existing,
        });
    }
}

#[derive(Debug, Default)]
pub struct FixedPosition {
    fix: Mutex<Option<Fix>>,
}

impl FixedPosition {
    pub fn new(fix: Option<Fix>) -> Self {
        Self { fix: Mutex::new(fix) }
    }

    pub fn set(&self, fix: Option<Fix>) {
        *locked(&self.fix) = fix;
    }
}

impl PositionSource for FixedPosition {
    fn current_fix(&self) -> Option<Fix> {
        *locked(&self.fix)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Rig
// ═══════════════════════════════════════════════════════════════════════════

/// A supervisor wired to mocks, with handles to each mock.
pub struct TestRig {
    pub transport: Arc<MockTransport>,
    pub preferences: Arc<MemoryPreferences>,
    pub notifier: Arc<RecordingNotifier>,
    pub store: Arc<MemoryStore>,
    pub position: Arc<FixedPosition>,
    pub supervisor: Supervisor,
}

impl TestRig {
    pub fn new() -> Self {
        init_tracing();
        let transport = Arc::new(MockTransport::default());
        let preferences = Arc::new(MemoryPreferences::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let supervisor = Supervisor::new(transport.clone(), preferences.clone(), notifier.clone());
        Self {
            transport,
            preferences,
            notifier,
            store: Arc::new(MemoryStore::default()),
            position: Arc::new(FixedPosition::default()),
            supervisor,
        }
    }
}

impl Default for TestRig {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixed peripheral id used by [`linked_supervisor`].
pub fn radio_id() -> PeripheralId {
    PeripheralId(uuid::Uuid::from_u128(0x5eed))
}

/// Drive the rig's supervisor to a subscribed session on [`radio_id`].
///
/// Must run inside a tokio runtime.
pub fn linked_supervisor(rig: &TestRig) -> SessionId {
    let id = radio_id();
    rig.supervisor
        .handle(TransportEvent::Discovered(Advertisement::new(id, "Base station", -60)));
    rig.supervisor.connect_to(id);
    rig.supervisor.handle(TransportEvent::Connected(id));

    let link = rig.supervisor.snapshot();
    let session = link.session.unwrap_or(SessionId(0));
    let nonce = link.handshake_nonce.unwrap_or(0);
    rig.supervisor.complete_handshake(session, nonce);
    session
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::subscriber::NoSubscriber;

    #[test]
    fn rig_installs_test_logging_once() {
        let _rig = TestRig::new();
        init_tracing();
        assert!(tracing::dispatcher::get_default(|d| !d.is::<NoSubscriber>()));
    }
}
