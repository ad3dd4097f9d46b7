//! Fehler-Typen
//!
//! Transiente Fehler (WiFi, MQTT, einzelne HTTP-Requests, DNS) werden
//! lokal geloggt und geschluckt. Nur `Fault` und `RestartReason`
//! führen zu einem Neustart des Geräts.

/// Fehler des WiFi-Radios
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WifiError {
    Configuration,
    Start,
    Connect,
    Scan,
}

/// Fehler der MQTT-Verbindung
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MqttError {
    DnsResolutionFailed,
    DnsTimeout,
    ConnectionFailed,
    /// Broker hat CONNECT mit Reason-Code != 0 abgelehnt
    Refused,
    PublishFailed,
}

/// Fehler beim Lesen/Schreiben der persistierten Konfiguration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StorageError {
    /// Kein Dokument gespeichert (gelöschter Flash)
    Empty,
    ReadFailed,
    WriteFailed,
    TooLarge,
}

/// Fehler beim Dekodieren/Kodieren des Konfigurations-JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    Storage(StorageError),
    InvalidJson,
    BufferTooSmall,
}

impl From<StorageError> for ConfigError {
    fn from(error: StorageError) -> Self {
        Self::Storage(error)
    }
}

/// Fehler des DNS-Sockets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DnsError {
    ReceiveFailed,
    SendFailed,
}

/// Fehler einer einzelnen HTTP-Exchange (immer transient)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HttpError {
    ReadFailed,
    WriteFailed,
    ResponseTooLarge,
}

/// Fataler Fehler im Supervisor Loop
///
/// Wird nur vom Supervisor ausgewertet und führt immer zum Neustart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Fault {
    AccessPoint(WifiError),
    Dns(DnsError),
}

impl From<DnsError> for Fault {
    fn from(error: DnsError) -> Self {
        Self::Dns(error)
    }
}

/// Grund für einen geplanten Neustart
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RestartReason {
    /// Neue Konfiguration wurde gespeichert
    ConfigSaved,
    /// Station-Reconnect nach Verbindungsverlust fehlgeschlagen
    ReconnectFailed,
    /// Unbehandelter Fehler im Loop
    Fault(Fault),
}

/// Wartezeit nach gespeicherter Konfiguration (ms)
pub const CONFIG_SAVED_RESTART_DELAY_MS: u32 = 3_000;
/// Wartezeit nach fehlgeschlagenem Reconnect (ms)
pub const RECONNECT_FAILED_RESTART_DELAY_MS: u32 = 3_000;
/// Cooldown nach fatalem Fehler (ms)
pub const FAULT_RESTART_DELAY_MS: u32 = 10_000;

impl RestartReason {
    /// Wartezeit bevor das Gerät neu startet
    pub fn delay_ms(self) -> u32 {
        match self {
            Self::ConfigSaved => CONFIG_SAVED_RESTART_DELAY_MS,
            Self::ReconnectFailed => RECONNECT_FAILED_RESTART_DELAY_MS,
            Self::Fault(_) => FAULT_RESTART_DELAY_MS,
        }
    }
}
