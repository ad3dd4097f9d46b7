//! Hardware Abstraction Traits
//!
//! Diese Traits definieren Schnittstellen für Hardware-Zugriff
//! ohne konkrete Implementierung.
//!
//! # Implementierungen
//! - **Production:** cnc-firmware (esp-radio, embassy-net, esp-storage, SSD1306)
//! - **Testing:** Mocks in cnc-tests

use core::net::Ipv4Addr;

use embedded_hal::digital::InputPin;
use embedded_hal_async::delay::DelayNs;
use embedded_io_async::{Read, Write};

use crate::error::{DnsError, MqttError, StorageError, WifiError};
use crate::types::{NetworkMode, StatusValue};

/// WiFi-Radio (Station und Access Point)
pub trait WifiControl {
    /// Startet eine Station-Verbindung, wartet NICHT auf deren Aufbau
    async fn begin_station(&mut self, ssid: &str, password: &str) -> Result<(), WifiError>;

    /// Station verbunden und IPv4-Konfiguration vorhanden
    fn is_station_connected(&mut self) -> bool;

    /// Aktuelle Station-Adresse
    fn station_address(&self) -> Option<Ipv4Addr>;

    /// Startet den Access Point und liefert dessen Adresse
    async fn start_access_point(&mut self, ssid: &str, password: &str)
    -> Result<Ipv4Addr, WifiError>;

    /// Ein einzelner Scan: ist `ssid` sichtbar?
    async fn scan_for(&mut self, ssid: &str) -> Result<bool, WifiError>;
}

/// Byte-Stream zum MQTT-Broker
///
/// Die Verbindung bleibt über mehrere Supervisor-Ticks bestehen.
pub trait MqttLink: Read + Write {
    /// Löst `host` auf und baut die TCP-Verbindung auf
    async fn open(&mut self, host: &str, port: u16) -> Result<(), MqttError>;

    /// Verwirft die Verbindung sofort
    fn close(&mut self);
}

/// Nicht-blockierender HTTP-Listener
///
/// Liefert pro Aufruf höchstens eine wartende Verbindung. Die Verbindung
/// wird beim Drop geschlossen.
pub trait HttpListener {
    type Connection<'a>: Read + Write
    where
        Self: 'a;

    fn try_accept(&mut self, mode: NetworkMode) -> Option<Self::Connection<'_>>;
}

/// Nicht-blockierender UDP-Socket für den DNS Responder
pub trait DatagramSocket {
    type Endpoint: Copy;

    /// `Ok(None)` wenn kein Paket wartet
    fn try_receive(&mut self, buf: &mut [u8]) -> Result<Option<(usize, Self::Endpoint)>, DnsError>;

    async fn send_to(&mut self, data: &[u8], remote: Self::Endpoint) -> Result<(), DnsError>;
}

/// Persistenter Speicher für das Konfigurations-JSON
pub trait ConfigStorage {
    /// Liest das gespeicherte Dokument in `buf`
    fn load<'b>(&mut self, buf: &'b mut [u8]) -> Result<&'b [u8], StorageError>;

    /// Überschreibt das gespeicherte Dokument komplett
    fn store(&mut self, document: &[u8]) -> Result<(), StorageError>;
}

/// Lokale Anzeige (OLED oder nur Log)
///
/// Rein beratend: kein Rückgabewert, Fehler werden intern verworfen.
pub trait DisplaySink {
    fn show_status(&mut self, status: StatusValue, ssid: &str, ip: &str);

    fn show_connecting(&mut self, ssid: &str, retries_left: u8);

    fn show_access_point(&mut self, ssid: &str, password: &str);

    fn debug_line(&mut self, line: &str);
}

/// System-Funktionen: Uhr, Housekeeping, Neustart
pub trait SystemControl {
    /// Millisekunden seit Boot
    fn uptime_ms(&self) -> u64;

    /// Aufräumarbeiten am Ende jedes Ticks
    fn housekeeping(&mut self);

    /// Startet das Gerät neu, verwirft allen Zustand
    fn restart(&mut self) -> !;
}

/// Bündelt alle Hardware-Typen einer Plattform
pub trait Platform {
    type Wifi: WifiControl;
    type Mqtt: MqttLink;
    type StatusPin: InputPin;
    type Display: DisplaySink;
    type Delay: DelayNs;
    type Listener: HttpListener;
    type DnsSocket: DatagramSocket;
    type Storage: ConfigStorage;
    type System: SystemControl;
}
