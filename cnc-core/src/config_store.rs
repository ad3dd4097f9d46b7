//! Persistierte Konfiguration (JSON)
//!
//! Ein einziges JSON-Dokument mit den Keys
//! `ssid, password, ip, mqtt_broker, mqtt_port, mqtt_topic, mqtt_interval`.
//! Fehlende Keys behalten ihren Default, ein unlesbares Dokument
//! bedeutet: nur Defaults.

use heapless::String;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, StorageError};
use crate::traits::ConfigStorage;
use crate::types::{
    DeviceConfig, HOST_CAPACITY, IP_CAPACITY, PASSWORD_CAPACITY, SSID_CAPACITY, TOPIC_CAPACITY,
};

/// Puffergröße für ein kodiertes Konfigurations-Dokument
pub const CONFIG_DOCUMENT_CAPACITY: usize = 512;

// ============================================================================
// Wire Format
// ============================================================================

#[derive(Serialize)]
struct ConfigDocument<'a> {
    ssid: &'a str,
    password: &'a str,
    ip: &'a str,
    mqtt_broker: &'a str,
    mqtt_port: u16,
    mqtt_topic: &'a str,
    mqtt_interval: u32,
}

impl<'a> ConfigDocument<'a> {
    fn new(config: &'a DeviceConfig, password: &'a str) -> Self {
        Self {
            ssid: config.ssid.as_str(),
            password,
            ip: config.static_ip.as_deref().unwrap_or(""),
            mqtt_broker: config.mqtt_broker.as_deref().unwrap_or(""),
            mqtt_port: config.mqtt_port,
            mqtt_topic: config.mqtt_topic.as_str(),
            mqtt_interval: config.mqtt_interval_seconds,
        }
    }
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct StoredConfig {
    ssid: Option<String<SSID_CAPACITY>>,
    password: Option<String<PASSWORD_CAPACITY>>,
    ip: Option<String<IP_CAPACITY>>,
    mqtt_broker: Option<String<HOST_CAPACITY>>,
    mqtt_port: Option<u16>,
    mqtt_topic: Option<String<TOPIC_CAPACITY>>,
    mqtt_interval: Option<u32>,
}

impl StoredConfig {
    fn overlay(self, defaults: &DeviceConfig) -> DeviceConfig {
        let mut config = defaults.clone();
        if let Some(ssid) = self.ssid {
            config.ssid = ssid;
        }
        if let Some(password) = self.password {
            config.password = password;
        }
        if let Some(ip) = self.ip {
            config.static_ip = Some(ip).filter(|ip| !ip.is_empty());
        }
        if let Some(broker) = self.mqtt_broker {
            config.mqtt_broker = Some(broker).filter(|broker| !broker.is_empty());
        }
        if let Some(port) = self.mqtt_port {
            config.mqtt_port = port;
        }
        if let Some(topic) = self.mqtt_topic {
            config.mqtt_topic = topic;
        }
        if let Some(interval) = self.mqtt_interval {
            config.mqtt_interval_seconds = interval;
        }
        config
    }
}

// ============================================================================
// Encode / Decode
// ============================================================================

/// Vollständiges Dokument inklusive Passwort (nur für den Speicher)
pub fn encode_config(config: &DeviceConfig, out: &mut [u8]) -> Result<usize, ConfigError> {
    serde_json_core::to_slice(&ConfigDocument::new(config, config.password.as_str()), out)
        .map_err(|_| ConfigError::BufferTooSmall)
}

/// Dokument für `GET /config`, das Passwort ist immer leer
pub fn encode_public_config(config: &DeviceConfig, out: &mut [u8]) -> Result<usize, ConfigError> {
    serde_json_core::to_slice(&ConfigDocument::new(config, ""), out)
        .map_err(|_| ConfigError::BufferTooSmall)
}

/// Überlagert `defaults` mit den Keys aus `document`
///
/// Escapes in Strings (`\"`, `\\`) werden aufgelöst, Passwörter dürfen
/// beliebige Zeichen enthalten.
pub fn decode_config(defaults: &DeviceConfig, document: &[u8]) -> Result<DeviceConfig, ConfigError> {
    let mut unescaped = [0u8; CONFIG_DOCUMENT_CAPACITY];
    let (stored, _) = serde_json_core::from_slice_escaped::<StoredConfig>(document, &mut unescaped)
        .map_err(|_| ConfigError::InvalidJson)?;
    Ok(stored.overlay(defaults))
}

// ============================================================================
// Storage
// ============================================================================

/// Lädt die Konfiguration, fällt bei jedem Fehler auf `defaults` zurück
pub fn load_config<S: ConfigStorage>(storage: &mut S, defaults: &DeviceConfig) -> DeviceConfig {
    let mut buf = [0u8; CONFIG_DOCUMENT_CAPACITY];
    let result = storage
        .load(&mut buf)
        .map_err(ConfigError::from)
        .and_then(|document| decode_config(defaults, document));

    match result {
        Ok(config) => {
            info!("Config: Loaded from storage");
            config
        }
        Err(ConfigError::Storage(StorageError::Empty)) => {
            info!("Config: Nothing stored, using defaults");
            defaults.clone()
        }
        Err(e) => {
            warn!("Config: Load failed ({}), using defaults", e);
            defaults.clone()
        }
    }
}

/// Schreibt die komplette Konfiguration
pub fn save_config<S: ConfigStorage>(storage: &mut S, config: &DeviceConfig) -> Result<(), ConfigError> {
    let mut buf = [0u8; CONFIG_DOCUMENT_CAPACITY];
    let len = encode_config(config, &mut buf)?;
    storage.store(&buf[..len])?;
    info!("Config: Saved ({} bytes)", len);
    Ok(())
}
