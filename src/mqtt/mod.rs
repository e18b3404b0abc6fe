//! Broker bridge - mirrors radio traffic to and from an MQTT broker.
//!
//! This module holds the pure decisions (which broker, which topic, what to
//! do with an inbound publish); [`client::BrokerBridge`] owns the rumqttc
//! session and applies them.

pub mod client;

use prost::Message;
use rumqttc::ConnectReturnCode;

use crate::config::{
    ENCRYPTED_TOPIC_FIRMWARE, MQTT_DEFAULT_HOST, MQTT_DEFAULT_REGION, MQTT_DEFAULT_ROOT,
    MQTT_DEMO_PASSWORD, MQTT_DEMO_USERNAME, MQTT_PORT, MQTT_STATUS_SEGMENT, MQTT_TLS_PORT,
};
use crate::error::{Error, Result};
use crate::mesh::proto::{
    mqtt_client_proxy_message, to_radio, MeshPacket, MqttClientProxyMessage, MqttConfig,
    ServiceEnvelope, ToRadio,
};
use crate::mesh::version_at_least;
use crate::storage::Settings;

pub use client::BrokerBridge;

/// Broker settings as configured on the radio.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BrokerConfig {
    pub enabled: bool,
    /// `host` or `host:port`; empty means the public default.
    pub address: String,
    pub username: String,
    pub password: String,
    pub tls: bool,
    /// Topic root; empty means `msh`.
    pub root: String,
    /// Radio expects the phone to relay its broker traffic.
    pub proxy_to_client: bool,
}

impl From<&MqttConfig> for BrokerConfig {
    fn from(c: &MqttConfig) -> Self {
        Self {
            enabled: c.enabled,
            address: c.address.clone(),
            username: c.username.clone(),
            password: c.password.clone(),
            tls: c.tls_enabled,
            root: c.root.clone(),
            proxy_to_client: c.proxy_to_client_enabled,
        }
    }
}

/// A concrete broker session to open.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BrokerSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub tls: bool,
    /// Subscription filter.
    pub topic: String,
    /// Public demo broker; inbound traffic is looped back locally.
    pub demo: bool,
}

/// Pick the broker for `config`.
///
/// An enabled radio config wins. Without one, a user who never paired a
/// radio gets the public demo broker scoped to `region`. Otherwise there
/// is nothing to connect to.
pub fn resolve(
    config: Option<&BrokerConfig>,
    settings: &Settings,
    region: Option<&str>,
) -> Option<BrokerSettings> {
    if let Some(config) = config.filter(|c| c.enabled) {
        let default_port = if config.tls { MQTT_TLS_PORT } else { MQTT_PORT };
        let (host, port) = split_address(&config.address, default_port);
        let root = if config.root.is_empty() {
            MQTT_DEFAULT_ROOT
        } else {
            config.root.as_str()
        };
        let encrypted = settings
            .firmware_version
            .as_deref()
            .is_some_and(|v| version_at_least(v, ENCRYPTED_TOPIC_FIRMWARE));
        let epoch = if encrypted { "e" } else { "c" };

        return Some(BrokerSettings {
            host,
            port,
            username: config.username.clone(),
            password: config.password.clone(),
            tls: config.tls,
            topic: format!("{root}/2/{epoch}/#"),
            demo: false,
        });
    }

    if settings.preferred_device().is_some() {
        return None;
    }

    let region = region
        .filter(|r| !r.is_empty())
        .unwrap_or(MQTT_DEFAULT_REGION);
    Some(BrokerSettings {
        host: MQTT_DEFAULT_HOST.into(),
        port: MQTT_PORT,
        username: MQTT_DEMO_USERNAME.into(),
        password: MQTT_DEMO_PASSWORD.into(),
        tls: false,
        topic: format!("{MQTT_DEFAULT_ROOT}/{region}/2/e/#"),
        demo: true,
    })
}

fn split_address(address: &str, default_port: u16) -> (String, u16) {
    if address.is_empty() {
        return (MQTT_DEFAULT_HOST.into(), default_port);
    }
    match address.rsplit_once(':') {
        Some((host, port)) => match port.parse() {
            Ok(port) => (host.to_string(), port),
            Err(_) => (address.to_string(), default_port),
        },
        None => (address.to_string(), default_port),
    }
}

/// User-facing text for a refused ConnAck. `None` when accepted.
pub fn connack_refusal(code: ConnectReturnCode) -> Option<&'static str> {
    match code {
        ConnectReturnCode::Success => None,
        ConnectReturnCode::RefusedProtocolVersion => Some("Unacceptable Protocol version"),
        ConnectReturnCode::BadClientId => Some("Invalid Id"),
        ConnectReturnCode::ServiceUnavailable => Some("Invalid Server"),
        ConnectReturnCode::BadUserNamePassword => Some("Invalid Credentials"),
        ConnectReturnCode::NotAuthorized => Some("Authorization Error"),
    }
}

/// What to do with one inbound publish.
#[derive(Clone, Debug, PartialEq)]
pub enum Inbound {
    /// Status topic, not radio traffic.
    Ignore,
    /// Demo mode: feed the packet straight back into the protocol bridge.
    Loopback(MeshPacket),
    /// Write this `ToRadio` frame to the link.
    Forward(Vec<u8>),
}

pub fn route_inbound(topic: &str, payload: &[u8], retained: bool, demo: bool) -> Result<Inbound> {
    if topic.contains(MQTT_STATUS_SEGMENT) {
        return Ok(Inbound::Ignore);
    }

    if demo {
        let envelope = ServiceEnvelope::decode(payload).map_err(|_| Error::EncodingFailure {
            stage: "service envelope",
        })?;
        return Ok(match envelope.packet {
            Some(packet) => Inbound::Loopback(packet),
            None => Inbound::Ignore,
        });
    }

    let frame = ToRadio {
        payload_variant: Some(to_radio::PayloadVariant::MqttClientProxyMessage(
            MqttClientProxyMessage {
                topic: topic.to_string(),
                payload_variant: Some(mqtt_client_proxy_message::PayloadVariant::Data(
                    payload.to_vec(),
                )),
                retained,
            },
        )),
    };
    Ok(Inbound::Forward(frame.encode_to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ble::PeripheralId;
    use crate::mesh::proto::{self, mesh_packet, PortNum};
    use uuid::Uuid;

    fn paired() -> Settings {
        let mut s = Settings::default();
        s.remember_preferred(PeripheralId(Uuid::from_u128(7)));
        s
    }

    // ═══════════════════════════════════════════════════════════════════════
    // resolve
    // ═══════════════════════════════════════════════════════════════════════

    #[test]
    fn disabled_config_without_device_falls_back_to_demo() {
        let config = BrokerConfig::default();
        let s = resolve(Some(&config), &Settings::default(), Some("US")).unwrap();
        assert!(s.demo);
        assert_eq!(s.host, "mqtt.meshtastic.org");
        assert_eq!(s.port, 1883);
        assert_eq!(s.username, "meshdev");
        assert_eq!(s.password, "large4cats");
        assert_eq!(s.topic, "msh/US/2/e/#");
    }

    #[test]
    fn demo_region_defaults_to_de() {
        let s = resolve(None, &Settings::default(), None).unwrap();
        assert_eq!(s.topic, "msh/DE/2/e/#");
        let s = resolve(None, &Settings::default(), Some("")).unwrap();
        assert_eq!(s.topic, "msh/DE/2/e/#");
    }

    #[test]
    fn no_config_with_paired_device_is_none() {
        assert!(resolve(None, &paired(), Some("US")).is_none());
    }

    #[test]
    fn enabled_config_uses_address_and_tls_port() {
        let config = BrokerConfig {
            enabled: true,
            address: "broker.example.net".into(),
            username: "u".into(),
            password: "p".into(),
            tls: true,
            root: "mesh".into(),
            proxy_to_client: true,
        };
        let s = resolve(Some(&config), &paired(), None).unwrap();
        assert!(!s.demo);
        assert_eq!(s.host, "broker.example.net");
        assert_eq!(s.port, 8883);
        assert_eq!(s.topic, "mesh/2/c/#");
    }

    #[test]
    fn explicit_port_and_default_root() {
        let config = BrokerConfig {
            enabled: true,
            address: "10.0.0.2:1884".into(),
            ..Default::default()
        };
        let s = resolve(Some(&config), &paired(), None).unwrap();
        assert_eq!((s.host.as_str(), s.port), ("10.0.0.2", 1884));
        assert_eq!(s.topic, "msh/2/c/#");
    }

    #[test]
    fn encrypted_epoch_follows_firmware() {
        let config = BrokerConfig {
            enabled: true,
            ..Default::default()
        };
        let mut settings = paired();
        settings.firmware_version = Some("2.3.2".into());
        let s = resolve(Some(&config), &settings, None).unwrap();
        assert_eq!(s.host, "mqtt.meshtastic.org");
        assert_eq!(s.topic, "msh/2/e/#");

        settings.firmware_version = Some("2.2.24".into());
        let s = resolve(Some(&config), &settings, None).unwrap();
        assert_eq!(s.topic, "msh/2/c/#");
    }

    // ═══════════════════════════════════════════════════════════════════════
    // inbound routing
    // ═══════════════════════════════════════════════════════════════════════

    #[test]
    fn status_topics_are_ignored() {
        let r = route_inbound("msh/2/stat/!abcd", b"online", false, false).unwrap();
        assert_eq!(r, Inbound::Ignore);
    }

    #[test]
    fn proxy_frame_carries_topic_payload_and_retained() {
        let Inbound::Forward(frame) = route_inbound("msh/2/e/LongFast/!1", b"\x01\x02", true, false).unwrap()
        else {
            panic!("expected forward");
        };
        let decoded = ToRadio::decode(frame.as_slice()).unwrap();
        let Some(to_radio::PayloadVariant::MqttClientProxyMessage(m)) = decoded.payload_variant else {
            panic!("expected proxy message");
        };
        assert_eq!(m.topic, "msh/2/e/LongFast/!1");
        assert_eq!(m.payload(), b"\x01\x02");
        assert!(m.retained);
    }

    #[test]
    fn demo_unwraps_service_envelope() {
        let packet = MeshPacket {
            from: 42,
            payload_variant: Some(mesh_packet::PayloadVariant::Decoded(proto::Data {
                portnum: PortNum::TextMessageApp as i32,
                payload: b"hi".to_vec(),
                ..Default::default()
            })),
            ..Default::default()
        };
        let envelope = ServiceEnvelope {
            packet: Some(packet.clone()),
            channel_id: "LongFast".into(),
            gateway_id: "!1".into(),
        };
        let r = route_inbound("msh/DE/2/e/LongFast/!1", &envelope.encode_to_vec(), false, true).unwrap();
        assert_eq!(r, Inbound::Loopback(packet));
    }

    #[test]
    fn demo_garbage_is_an_encoding_failure() {
        let r = route_inbound("msh/DE/2/e/x", &[0xff, 0xff, 0xff], false, true);
        assert!(matches!(r, Err(Error::EncodingFailure { .. })));
    }

    #[test]
    fn refusal_texts() {
        assert_eq!(connack_refusal(ConnectReturnCode::Success), None);
        assert_eq!(
            connack_refusal(ConnectReturnCode::BadUserNamePassword),
            Some("Invalid Credentials")
        );
        assert_eq!(connack_refusal(ConnectReturnCode::NotAuthorized), Some("Authorization Error"));
    }
}
