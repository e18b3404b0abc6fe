//! [`Transport`] over the host's BLE adapter via `btleplug`.
//!
//! Every trait call returns immediately; the adapter work runs on tokio
//! tasks and its outcome comes back on the [`TransportEvent`] channel
//! handed out by [`BtleplugTransport::new`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use btleplug::api::{
    Central, CentralEvent, Characteristic as GattCharacteristic, Manager as _, Peripheral as _,
    ScanFilter, WriteType,
};
use btleplug::platform::{Adapter, Manager, Peripheral, PeripheralId as PlatformId};
use futures::stream::StreamExt;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::ble::{
    Advertisement, Characteristic, DisconnectReason, PeripheralId, Transport, TransportEvent,
    ValueError,
};
use crate::config::MESH_SERVICE_UUID;
use crate::error::{Error, Result, TransportError};

struct Shared {
    adapter: Adapter,
    handle: Handle,
    events: mpsc::UnboundedSender<TransportEvent>,
    peripherals: Mutex<HashMap<PeripheralId, Peripheral>>,
    /// Connect + notification task per peripheral.
    links: Mutex<HashMap<PeripheralId, JoinHandle<()>>>,
    scan: Mutex<Option<JoinHandle<()>>>,
}

impl Shared {
    fn send(&self, event: TransportEvent) {
        if self.events.send(event).is_err() {
            debug!("transport event receiver dropped");
        }
    }

    fn peripheral(&self, id: PeripheralId) -> std::result::Result<Peripheral, TransportError> {
        locked(&self.peripherals)
            .get(&id)
            .cloned()
            .ok_or(TransportError::UnknownPeripheral)
    }
}

fn locked<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

/// Stable id for a platform peripheral handle.
fn peripheral_id(id: &PlatformId) -> PeripheralId {
    PeripheralId(Uuid::new_v5(&Uuid::NAMESPACE_OID, format!("{id:?}").as_bytes()))
}

fn gatt_characteristic(peripheral: &Peripheral, characteristic: Characteristic) -> Option<GattCharacteristic> {
    let uuid = characteristic.uuid();
    peripheral.characteristics().into_iter().find(|c| c.uuid == uuid)
}

/// Platform BLE stack behind [`Transport`].
#[derive(Clone)]
pub struct BtleplugTransport {
    shared: Arc<Shared>,
}

impl BtleplugTransport {
    /// Open the first adapter and start forwarding its events.
    pub async fn new() -> Result<(Self, mpsc::UnboundedReceiver<TransportEvent>)> {
        let manager = Manager::new().await.map_err(|e| {
            error!(error = %e, "bluetooth manager unavailable");
            Error::TransportUnavailable
        })?;
        let adapters = manager.adapters().await.map_err(|e| {
            error!(error = %e, "failed to list bluetooth adapters");
            Error::TransportUnavailable
        })?;
        let Some(adapter) = adapters.into_iter().next() else {
            error!("no bluetooth adapter found");
            return Err(Error::TransportUnavailable);
        };

        let central_events = adapter.events().await.map_err(|e| {
            error!(error = %e, "failed to subscribe to adapter events");
            Error::TransportUnavailable
        })?;

        let (tx, rx) = mpsc::unbounded_channel();
        let handle = Handle::current();
        let shared = Arc::new(Shared {
            adapter,
            handle: handle.clone(),
            events: tx,
            peripherals: Mutex::default(),
            links: Mutex::default(),
            scan: Mutex::default(),
        });

        let pump = Arc::downgrade(&shared);
        handle.spawn(async move {
            let mut central_events = central_events;
            while let Some(event) = central_events.next().await {
                let Some(shared) = pump.upgrade() else {
                    return;
                };
                on_central_event(&shared, event).await;
            }
            debug!("adapter event stream ended");
        });

        info!("bluetooth adapter ready");
        Ok((Self { shared }, rx))
    }
}

async fn on_central_event(shared: &Shared, event: CentralEvent) {
    match event {
        CentralEvent::DeviceDiscovered(platform) | CentralEvent::DeviceUpdated(platform) => {
            let Ok(peripheral) = shared.adapter.peripheral(&platform).await else {
                return;
            };
            let Ok(Some(props)) = peripheral.properties().await else {
                return;
            };
            if !props.services.contains(&MESH_SERVICE_UUID) {
                return;
            }
            let id = peripheral_id(&platform);
            let name = props.local_name.unwrap_or_else(|| "Unknown node".into());
            let Some(rssi) = props.rssi else {
                return;
            };
            locked(&shared.peripherals).insert(id, peripheral);
            shared.send(TransportEvent::Discovered(Advertisement::new(id, &name, rssi)));
        }
        CentralEvent::DeviceDisconnected(platform) => {
            let id = peripheral_id(&platform);
            // Only links we opened are reported.
            if let Some(task) = locked(&shared.links).remove(&id) {
                task.abort();
                shared.send(TransportEvent::Disconnected(id, None));
            }
        }
        _ => {}
    }
}

/// Connect, discover the mesh service, enable notifications and pump them.
async fn run_link(shared: Arc<Shared>, id: PeripheralId, peripheral: Peripheral) {
    if let Err(reason) = open_link(&peripheral).await {
        warn!(peripheral = %id, %reason, "link setup failed");
        locked(&shared.links).remove(&id);
        shared.send(TransportEvent::ConnectFailed(id, Some(DisconnectReason::Other(reason))));
        return;
    }

    let mut notifications = match peripheral.notifications().await {
        Ok(stream) => stream,
        Err(e) => {
            locked(&shared.links).remove(&id);
            shared.send(TransportEvent::ConnectFailed(id, Some(DisconnectReason::Other(e.to_string()))));
            return;
        }
    };
    shared.send(TransportEvent::Connected(id));

    while let Some(notification) = notifications.next().await {
        match Characteristic::from_uuid(notification.uuid) {
            Some(characteristic) => {
                shared.send(TransportEvent::ValueUpdated(id, characteristic, notification.value));
            }
            None => debug!(uuid = %notification.uuid, "notification on foreign characteristic"),
        }
    }
}

async fn open_link(peripheral: &Peripheral) -> std::result::Result<(), String> {
    if !peripheral.is_connected().await.unwrap_or(false) {
        peripheral.connect().await.map_err(|e| e.to_string())?;
    }
    peripheral.discover_services().await.map_err(|e| e.to_string())?;

    if !peripheral.services().iter().any(|s| s.uuid == MESH_SERVICE_UUID) {
        return Err("mesh service not found".into());
    }
    for characteristic in [Characteristic::FromNum, Characteristic::LogRadio, Characteristic::LogRadioLegacy] {
        if let Some(c) = gatt_characteristic(peripheral, characteristic) {
            peripheral.subscribe(&c).await.map_err(|e| e.to_string())?;
        }
    }
    Ok(())
}

fn value_error(e: &btleplug::Error) -> ValueError {
    let text = e.to_string();
    let lower = text.to_lowercase();
    if lower.contains("authentication") || lower.contains("encryption") {
        ValueError::InsufficientSecurity
    } else {
        ValueError::Other(text)
    }
}

impl Transport for BtleplugTransport {
    fn is_powered_on(&self) -> bool {
        // An opened adapter is usable until an operation says otherwise.
        true
    }

    fn start_scan(&self) -> std::result::Result<(), TransportError> {
        let shared = self.shared.clone();
        let task = self.shared.handle.spawn(async move {
            let filter = ScanFilter {
                services: vec![MESH_SERVICE_UUID],
            };
            if let Err(e) = shared.adapter.start_scan(filter).await {
                error!(error = %e, "scan failed to start");
                shared.send(TransportEvent::PowerChanged(false));
            }
        });
        if let Some(previous) = locked(&self.shared.scan).replace(task) {
            previous.abort();
        }
        Ok(())
    }

    fn stop_scan(&self) {
        if let Some(task) = locked(&self.shared.scan).take() {
            task.abort();
        }
        let shared = self.shared.clone();
        self.shared.handle.spawn(async move {
            if let Err(e) = shared.adapter.stop_scan().await {
                debug!(error = %e, "stop scan failed");
            }
        });
    }

    fn connect(&self, id: PeripheralId) -> std::result::Result<(), TransportError> {
        let peripheral = self.shared.peripheral(id)?;
        let task = self
            .shared
            .handle
            .spawn(run_link(self.shared.clone(), id, peripheral));
        if let Some(previous) = locked(&self.shared.links).insert(id, task) {
            previous.abort();
        }
        Ok(())
    }

    fn cancel_connect(&self, id: PeripheralId) {
        if let Some(task) = locked(&self.shared.links).remove(&id) {
            task.abort();
        }
        let Ok(peripheral) = self.shared.peripheral(id) else {
            return;
        };
        self.shared.handle.spawn(async move {
            if let Err(e) = peripheral.disconnect().await {
                debug!(peripheral = %id, error = %e, "disconnect failed");
            }
        });
    }

    fn write(
        &self,
        id: PeripheralId,
        characteristic: Characteristic,
        data: Vec<u8>,
    ) -> std::result::Result<(), TransportError> {
        let peripheral = self.shared.peripheral(id)?;
        let gatt = gatt_characteristic(&peripheral, characteristic).ok_or(TransportError::DiscoveryFailed)?;
        self.shared.handle.spawn(async move {
            if let Err(e) = peripheral.write(&gatt, &data, WriteType::WithResponse).await {
                warn!(peripheral = %id, ?characteristic, error = %e, "write failed");
            }
        });
        Ok(())
    }

    fn read(&self, id: PeripheralId, characteristic: Characteristic) -> std::result::Result<(), TransportError> {
        let peripheral = self.shared.peripheral(id)?;
        let gatt = gatt_characteristic(&peripheral, characteristic).ok_or(TransportError::DiscoveryFailed)?;
        let shared = self.shared.clone();
        self.shared.handle.spawn(async move {
            let event = match peripheral.read(&gatt).await {
                Ok(value) => TransportEvent::ValueUpdated(id, characteristic, value),
                Err(e) => TransportEvent::ValueFailed(id, characteristic, value_error(&e)),
            };
            shared.send(event);
        });
        Ok(())
    }

    fn read_rssi(&self, id: PeripheralId) -> std::result::Result<(), TransportError> {
        let peripheral = self.shared.peripheral(id)?;
        let shared = self.shared.clone();
        self.shared.handle.spawn(async move {
            match peripheral.properties().await {
                Ok(Some(props)) => {
                    if let Some(rssi) = props.rssi {
                        shared.send(TransportEvent::RssiUpdated(id, rssi));
                    }
                }
                Ok(None) => {}
                Err(e) => debug!(peripheral = %id, error = %e, "rssi read failed"),
            }
        });
        Ok(())
    }
}

