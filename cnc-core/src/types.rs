//! Core Types für den CNC-Monitor
//!
//! Datenstrukturen ohne Hardware-Dependencies

use core::fmt::Write;
use core::net::Ipv4Addr;
use core::str::FromStr;

use heapless::String;

/// Maximale Länge einer WiFi SSID (IEEE 802.11)
pub const SSID_CAPACITY: usize = 32;
/// Maximale Länge einer WPA2-Passphrase
pub const PASSWORD_CAPACITY: usize = 64;
/// Maximale Länge eines Broker-Hostnamens
pub const HOST_CAPACITY: usize = 64;
/// Maximale Länge eines MQTT-Topics
pub const TOPIC_CAPACITY: usize = 64;
/// Länge einer IPv4-Adresse in Punktnotation ("255.255.255.255")
pub const IP_CAPACITY: usize = 15;

/// MQTT Standard-Port (unverschlüsselt)
pub const DEFAULT_MQTT_PORT: u16 = 1883;
/// Standard-Topic für Status-Meldungen
pub const DEFAULT_MQTT_TOPIC: &str = "cnc1/status";
/// Standard-Publish-Intervall in Sekunden
pub const DEFAULT_MQTT_INTERVAL_SECS: u32 = 5;

/// IPv4-Adresse als Text (für Display, Redirects und JSON)
pub type IpText = String<IP_CAPACITY>;

/// Zustand der überwachten Maschine
///
/// Wird bei jedem Lesen neu vom Digital-Eingang abgeleitet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StatusValue {
    Online,
    Offline,
}

impl StatusValue {
    /// Pin HIGH bedeutet ONLINE (Eingang hat Pull-Down)
    pub fn from_level(high: bool) -> Self {
        if high { Self::Online } else { Self::Offline }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Online => "ONLINE",
            Self::Offline => "OFFLINE",
        }
    }

    /// Wert des `cycle`-Felds im MQTT-Payload
    pub fn cycle(self) -> u8 {
        match self {
            Self::Online => 1,
            Self::Offline => 0,
        }
    }
}

/// Aktiver WiFi-Modus
///
/// Genau einer ist aktiv. ACCESS_POINT wird nie automatisch verlassen,
/// nur ein Reboot nach Neukonfiguration führt zurück in den Station-Modus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NetworkMode {
    Station,
    AccessPoint,
}

/// Gerätekonfiguration
///
/// Wird aus Defaults erzeugt, beim Boot mit dem gespeicherten JSON
/// überlagert und nur durch validierte Formular-Submissions verändert.
/// Das Passwort wird nie an einen HTTP-Client zurückgegeben.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    pub ssid: String<SSID_CAPACITY>,
    pub password: String<PASSWORD_CAPACITY>,
    pub static_ip: Option<String<IP_CAPACITY>>,
    pub mqtt_broker: Option<String<HOST_CAPACITY>>,
    pub mqtt_port: u16,
    pub mqtt_topic: String<TOPIC_CAPACITY>,
    pub mqtt_interval_seconds: u32,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        let mut mqtt_topic = String::new();
        // DEFAULT_MQTT_TOPIC passt immer in TOPIC_CAPACITY
        let _ = mqtt_topic.push_str(DEFAULT_MQTT_TOPIC);

        Self {
            ssid: String::new(),
            password: String::new(),
            static_ip: None,
            mqtt_broker: None,
            mqtt_port: DEFAULT_MQTT_PORT,
            mqtt_topic,
            mqtt_interval_seconds: DEFAULT_MQTT_INTERVAL_SECS,
        }
    }
}

impl DeviceConfig {
    /// Station-Verbindung nur versuchen wenn SSID und Passwort gesetzt sind
    pub fn has_station_credentials(&self) -> bool {
        !self.ssid.is_empty() && !self.password.is_empty()
    }

    /// Broker-Host, falls konfiguriert
    pub fn broker(&self) -> Option<&str> {
        self.mqtt_broker
            .as_ref()
            .map(|broker| broker.as_str())
            .filter(|broker| !broker.is_empty())
    }

    /// Statische Station-Adresse, falls gesetzt und gültig
    pub fn static_address(&self) -> Option<Ipv4Addr> {
        self.static_ip
            .as_ref()
            .and_then(|ip| Ipv4Addr::from_str(ip.as_str()).ok())
    }
}

/// Formatiert eine IPv4-Adresse in Punktnotation
pub fn ip_text(address: Ipv4Addr) -> IpText {
    let mut text = IpText::new();
    let [a, b, c, d] = address.octets();
    // "255.255.255.255" hat genau IP_CAPACITY Zeichen
    let _ = write!(text, "{}.{}.{}.{}", a, b, c, d);
    text
}

/// Kopiert `value` in einen heapless String, `None` wenn zu lang
pub fn bounded<const N: usize>(value: &str) -> Option<String<N>> {
    let mut text = String::new();
    text.push_str(value).ok()?;
    Some(text)
}
