use heapless::String;
use uuid::Uuid;

use crate::ble::{Advertisement, PeripheralId};
use crate::config::MESH_SERVICE_UUID;

/// AD types carrying 128-bit service UUID lists (incomplete / complete).
const AD_UUID128_INCOMPLETE: u8 = 0x06;
const AD_UUID128_COMPLETE: u8 = 0x07;
/// AD types carrying the shortened / complete local name.
const AD_NAME_SHORT: u8 = 0x08;
const AD_NAME_COMPLETE: u8 = 0x09;

/// Iterate `(ad_type, payload)` structures of raw advertisement data.
fn ad_structures(data: &[u8]) -> impl Iterator<Item = (u8, &[u8])> {
    let mut i = 0;
    std::iter::from_fn(move || {
        let len = *data.get(i)? as usize;
        if len == 0 || i + len >= data.len() {
            return None;
        }
        let ad_type = data[i + 1];
        let payload = &data[i + 2..i + 1 + len];
        i += len + 1;
        Some((ad_type, payload))
    })
}

/// Check if raw advertisement data lists `service` among its 128-bit UUIDs.
pub fn contains_service_uuid(data: &[u8], service: Uuid) -> bool {
    // 128-bit UUIDs are little-endian on air
    let mut wanted = *service.as_bytes();
    wanted.reverse();

    ad_structures(data)
        .filter(|(t, _)| *t == AD_UUID128_INCOMPLETE || *t == AD_UUID128_COMPLETE)
        .any(|(_, uuids)| uuids.chunks_exact(16).any(|chunk| chunk == wanted))
}

/// Check if raw advertisement data contains the mesh radio service.
pub fn contains_mesh_service_uuid(data: &[u8]) -> bool {
    contains_service_uuid(data, MESH_SERVICE_UUID)
}

/// Extract complete/shortened local name from advertisement data.
pub fn extract_device_name(data: &[u8]) -> String<32> {
    for (ad_type, name_bytes) in ad_structures(data) {
        if ad_type == AD_NAME_SHORT || ad_type == AD_NAME_COMPLETE {
            let name = std::string::String::from_utf8_lossy(name_bytes);
            return crate::ble::truncated_name(&name);
        }
    }

    crate::ble::truncated_name("Unknown node")
}

/// Build an [`Advertisement`] from raw data, or `None` for non-mesh devices.
pub fn parse_advertisement(id: PeripheralId, rssi: i16, data: &[u8]) -> Option<Advertisement> {
    if !contains_mesh_service_uuid(data) {
        return None;
    }
    Some(Advertisement {
        id,
        name: extract_device_name(data),
        rssi,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mesh_adv(name: &str) -> Vec<u8> {
        let mut data = vec![0x02, 0x01, 0x06];
        let mut uuid = *MESH_SERVICE_UUID.as_bytes();
        uuid.reverse();
        data.push(17);
        data.push(AD_UUID128_COMPLETE);
        data.extend_from_slice(&uuid);
        data.push(name.len() as u8 + 1);
        data.push(AD_NAME_COMPLETE);
        data.extend_from_slice(name.as_bytes());
        data
    }

    #[test]
    fn finds_mesh_service() {
        assert!(contains_mesh_service_uuid(&mesh_adv("Meshtastic_1a2b")));
    }

    #[test]
    fn rejects_other_services() {
        // HID service only (16-bit list)
        let data = [0x02, 0x01, 0x06, 0x03, 0x03, 0x12, 0x18];
        assert!(!contains_mesh_service_uuid(&data));
    }

    #[test]
    fn truncated_data_is_not_a_match() {
        let data = mesh_adv("x");
        assert!(!contains_mesh_service_uuid(&data[..10]));
        assert!(!contains_mesh_service_uuid(&[]));
    }

    #[test]
    fn extracts_name() {
        assert_eq!(extract_device_name(&mesh_adv("Meshtastic_1a2b")).as_str(), "Meshtastic_1a2b");
    }

    #[test]
    fn missing_name_falls_back() {
        assert_eq!(extract_device_name(&[0x02, 0x01, 0x06]).as_str(), "Unknown node");
    }

    #[test]
    fn parse_skips_foreign_devices() {
        let id = PeripheralId(Uuid::nil());
        assert!(parse_advertisement(id, -70, &[0x02, 0x01, 0x06]).is_none());
        let adv = parse_advertisement(id, -70, &mesh_adv("T-Beam")).unwrap();
        assert_eq!(adv.name.as_str(), "T-Beam");
        assert_eq!(adv.rssi, -70);
    }
}
