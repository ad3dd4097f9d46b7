// Projekt-Konfiguration: Konstanten und Hardware-Zuordnungen

use core::net::Ipv4Addr;

use cnc_core::DeviceConfig;
use cnc_core::types::bounded;

// ============================================================================
// Hardware
// ============================================================================

/// GPIO-Pin für den Maschinenstatus (Pull-Down, HIGH = ONLINE)
/// Im Code direkt als `peripherals.GPIO21` verwendet
pub const STATUS_GPIO_PIN: u8 = 21;

/// I2C-Pins für das OLED (SDA = GPIO4, SCL = GPIO5)
pub const DISPLAY_SDA_PIN: u8 = 4;
pub const DISPLAY_SCL_PIN: u8 = 5;

/// I2C Taktfrequenz für das SSD1306 in kHz
pub const DISPLAY_I2C_KHZ: u32 = 400;

/// Heap-Größe für WiFi (Bytes)
/// WiFi benötigt dynamischen Speicher für Pakete
pub const WIFI_HEAP_SIZE: usize = 65536; // 64 KB

/// Zusätzliche Heap-Größe (Bytes)
pub const EXTRA_HEAP_SIZE: usize = 32768; // 32 KB

/// Unter dieser Grenze warnt das Housekeeping (Bytes)
pub const LOW_HEAP_WARNING_BYTES: usize = 8192;

// ============================================================================
// Flash
// ============================================================================

/// Start des NVS-Bereichs in der Standard-Partitionstabelle
/// Hier liegt das Konfigurations-JSON: [Länge u16 LE][JSON]
pub const CONFIG_FLASH_OFFSET: u32 = 0x9000;

// ============================================================================
// WiFi Konfiguration
// ============================================================================

/// Adresse des Fallback Access Points (/24)
pub const AP_ADDRESS: Ipv4Addr = Ipv4Addr::new(192, 168, 4, 1);

/// Präfixlänge für AP und statische Station-Adresse
pub const SUBNET_PREFIX_LEN: u8 = 24;

/// Anzahl Sockets pro embassy-net Stack
/// STA: HTTP (1) + MQTT (1) + DNS-Client (1) + DHCP-Client
/// AP:  HTTP (1) + DNS (1) + DHCP-Server (1)
pub const STA_SOCKET_COUNT: usize = 5;
pub const AP_SOCKET_COUNT: usize = 4;

// ============================================================================
// MQTT Konfiguration
// ============================================================================

/// TCP RX/TX Buffer-Größe für die Broker-Verbindung
pub const MQTT_SOCKET_BUFFER_SIZE: usize = 1024;

/// Timeout für TCP-Operationen zum Broker in Sekunden
pub const MQTT_SOCKET_TIMEOUT_SECS: u64 = 10;

/// DNS Query Timeout in Sekunden
pub const DNS_TIMEOUT_SECS: u64 = 10;

// ============================================================================
// HTTP Server Konfiguration
// ============================================================================

/// HTTP Port (kein TLS)
pub const HTTP_PORT: u16 = 80;

/// TCP RX Buffer-Größe in Bytes
/// Für eingehende TCP-Daten vom Client (ein Request)
pub const TCP_RX_BUFFER_SIZE: usize = 1024;

/// TCP TX Buffer-Größe in Bytes
/// Die Seite wird in 512-Byte-Chunks gestreamt
pub const TCP_TX_BUFFER_SIZE: usize = 1536;

/// Timeout für eine HTTP-Verbindung in Sekunden
pub const HTTP_TIMEOUT_SECS: u64 = 5;

// ============================================================================
// Captive DNS / DHCP
// ============================================================================

/// UDP Buffer-Größe für den DNS Responder
pub const DNS_UDP_BUFFER_SIZE: usize = 1024;

/// Anzahl UDP-Metadaten-Slots für den DNS Responder
pub const DNS_UDP_METADATA_COUNT: usize = 4;

/// Paket-Buffer für den DHCP-Server
/// 1500 Bytes = Standard MTU für Ethernet/WiFi
pub const DHCP_PACKET_BUFFER_SIZE: usize = 1500;

/// Wartezeit nach DHCP-Server-Fehler in Millisekunden
pub const DHCP_RESTART_DELAY_MS: u64 = 500;

// ============================================================================
// Fehlerbehandlung
// ============================================================================

/// Wartezeit nach Panic bevor das Gerät neu startet (ms)
pub const PANIC_RESTART_DELAY_MS: u32 = 10_000;

// ============================================================================
// Werkseinstellungen
// ============================================================================

/// Werkseinstellungen aus .env (siehe build.rs)
///
/// Alle Werte sind optional. Fehlende oder ungültige Werte behalten den
/// Default aus cnc-core.
pub fn factory_defaults() -> DeviceConfig {
    let mut config = DeviceConfig::default();

    if let Some(ssid) = option_env!("WIFI_SSID").and_then(bounded) {
        config.ssid = ssid;
    }
    if let Some(password) = option_env!("WIFI_PASSWORD").and_then(bounded) {
        config.password = password;
    }
    config.mqtt_broker = option_env!("MQTT_BROKER").and_then(bounded);
    if let Some(port) = option_env!("MQTT_PORT").and_then(|port| port.parse().ok()) {
        config.mqtt_port = port;
    }
    if let Some(topic) = option_env!("MQTT_TOPIC").and_then(bounded) {
        config.mqtt_topic = topic;
    }
    if let Some(interval) = option_env!("MQTT_INTERVAL").and_then(|secs| secs.parse().ok()) {
        config.mqtt_interval_seconds = interval;
    }

    config
}
