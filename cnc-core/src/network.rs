//! Network Mode Manager
//!
//! Entscheidet beim Boot zwischen Station und Access Point und
//! überwacht im Station-Modus die Verbindung.

use core::net::Ipv4Addr;

use embedded_hal_async::delay::DelayNs;

use crate::error::WifiError;
use crate::traits::{DisplaySink, WifiControl};
use crate::types::DeviceConfig;

/// SSID des Fallback Access Points
pub const AP_SSID: &str = "Neptun-Monitor-AP";
/// WPA2-Passphrase des Fallback Access Points
pub const AP_PASSWORD: &str = "apneptun";

/// Anzahl Statusabfragen beim Station-Connect (je 1 Sekunde)
pub const CONNECT_ATTEMPTS: u8 = 20;
/// Anzahl Scans bei der SSID-Suche (je 1 Sekunde Pause)
pub const SCAN_ATTEMPTS: u8 = 10;
/// Abstand zwischen Connect-Abfragen bzw. Scans
pub const RETRY_INTERVAL_MS: u32 = 1_000;

/// Ergebnis der Verbindungsprüfung im Station-Modus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkCheck {
    /// Verbindung steht
    Healthy,
    /// Verbindung war weg und wurde wiederhergestellt
    Reconnected,
    /// Reconnect fehlgeschlagen, Gerät muss neu starten
    Lost,
}

pub struct NetworkManager<W> {
    wifi: W,
}

impl<W: WifiControl> NetworkManager<W> {
    pub fn new(wifi: W) -> Self {
        Self { wifi }
    }

    pub fn wifi(&self) -> &W {
        &self.wifi
    }

    pub fn station_address(&self) -> Option<Ipv4Addr> {
        self.wifi.station_address()
    }

    /// Versucht eine Station-Verbindung mit den konfigurierten Zugangsdaten
    ///
    /// Fragt den Verbindungsstatus [`CONNECT_ATTEMPTS`] mal im Sekundentakt
    /// ab und zeigt den Fortschritt an. Wirft nie.
    pub async fn connect_station<D: DisplaySink, T: DelayNs>(
        &mut self,
        config: &DeviceConfig,
        display: &mut D,
        delay: &mut T,
    ) -> bool {
        if !config.has_station_credentials() {
            info!("WiFi: No credentials configured");
            return false;
        }

        info!("WiFi: Connecting to '{}'", config.ssid.as_str());
        if let Err(e) = self
            .wifi
            .begin_station(config.ssid.as_str(), config.password.as_str())
            .await
        {
            error!("WiFi: Station start failed: {}", e);
            return false;
        }

        for remaining in (1..=CONNECT_ATTEMPTS).rev() {
            if self.wifi.is_station_connected() {
                info!("WiFi: Connected to '{}'", config.ssid.as_str());
                return true;
            }
            display.show_connecting(config.ssid.as_str(), remaining);
            delay.delay_ms(RETRY_INTERVAL_MS).await;
        }

        if self.wifi.is_station_connected() {
            info!("WiFi: Connected to '{}'", config.ssid.as_str());
            return true;
        }
        warn!("WiFi: Connection to '{}' timed out", config.ssid.as_str());
        false
    }

    /// Startet den Fallback Access Point und liefert dessen Adresse
    pub async fn start_access_point<D: DisplaySink>(
        &mut self,
        display: &mut D,
    ) -> Result<Ipv4Addr, WifiError> {
        info!("WiFi: Starting access point '{}'", AP_SSID);
        let address = self.wifi.start_access_point(AP_SSID, AP_PASSWORD).await?;
        display.show_access_point(AP_SSID, AP_PASSWORD);
        info!("WiFi: Access point active");
        Ok(address)
    }

    /// Prüft die Station-Verbindung, bei Verlust genau ein Reconnect
    pub async fn check_link<D: DisplaySink, T: DelayNs>(
        &mut self,
        config: &DeviceConfig,
        display: &mut D,
        delay: &mut T,
    ) -> LinkCheck {
        if self.wifi.is_station_connected() {
            return LinkCheck::Healthy;
        }

        warn!("WiFi: Connection lost, reconnecting...");
        display.debug_line("WiFi Lost...");
        if self.connect_station(config, display, delay).await {
            display.debug_line("WiFi OK!");
            LinkCheck::Reconnected
        } else {
            error!("WiFi: Reconnect failed");
            display.debug_line("Reconnect failed");
            LinkCheck::Lost
        }
    }

    /// Sucht `target` mit bis zu [`SCAN_ATTEMPTS`] Scans
    ///
    /// Unabhängig vom Verbindungszustand. Scan-Fehler zählen als
    /// "nicht gefunden" für diesen Versuch.
    pub async fn scan_for_ssid<T: DelayNs>(&mut self, target: &str, delay: &mut T) -> bool {
        for attempt in 1..=SCAN_ATTEMPTS {
            match self.wifi.scan_for(target).await {
                Ok(true) => {
                    info!("WiFi: '{}' found (attempt {})", target, attempt);
                    return true;
                }
                Ok(false) => {}
                Err(e) => warn!("WiFi: Scan failed: {}", e),
            }
            if attempt < SCAN_ATTEMPTS {
                delay.delay_ms(RETRY_INTERVAL_MS).await;
            }
        }
        info!("WiFi: '{}' not found", target);
        false
    }
}
