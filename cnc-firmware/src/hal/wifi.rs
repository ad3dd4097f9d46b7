// WiFi Controller - Station und Access Point über esp-radio
use core::net::Ipv4Addr;
use core::task::Poll;

use defmt::{Debug2Format, error, info, warn};
use embassy_futures::poll_once;
use embassy_net::Stack;
use esp_radio::wifi::{
    AccessPointConfig, AuthMethod, ClientConfig, ModeConfig, ScanConfig, WifiController,
};

use cnc_core::{WifiControl, WifiError};

use crate::config::AP_ADDRESS;

/// WiFi-Radio mit Station-Stack
///
/// Der AP-Stack hat eine feste Adresse und braucht hier keinen Zugriff.
pub struct EspWifi {
    controller: WifiController<'static>,
    sta: Stack<'static>,
}

impl EspWifi {
    pub fn new(controller: WifiController<'static>, sta: Stack<'static>) -> Self {
        Self { controller, sta }
    }

    /// Startet das Radio falls nötig
    async fn ensure_started(&mut self) -> Result<(), WifiError> {
        if matches!(self.controller.is_started(), Ok(true)) {
            return Ok(());
        }
        self.controller.start_async().await.map_err(|e| {
            error!("WiFi: Failed to start: {}", Debug2Format(&e));
            WifiError::Start
        })
    }
}

impl WifiControl for EspWifi {
    async fn begin_station(&mut self, ssid: &str, password: &str) -> Result<(), WifiError> {
        let client_config = ModeConfig::Client(
            ClientConfig::default()
                .with_ssid(ssid.into())
                .with_password(password.into()),
        );

        if let Err(e) = self.controller.set_config(&client_config) {
            error!("WiFi: Failed to set configuration: {}", Debug2Format(&e));
            return Err(WifiError::Configuration);
        }
        self.ensure_started().await?;

        // Nur anstoßen: der Aufbau wird über is_station_connected() gepollt
        let kick = poll_once(self.controller.connect_async());
        match kick {
            Poll::Ready(Err(e)) => {
                error!("WiFi: Connect failed: {}", Debug2Format(&e));
                Err(WifiError::Connect)
            }
            Poll::Ready(Ok(())) | Poll::Pending => Ok(()),
        }
    }

    fn is_station_connected(&mut self) -> bool {
        matches!(self.controller.is_connected(), Ok(true)) && self.sta.is_config_up()
    }

    fn station_address(&self) -> Option<Ipv4Addr> {
        self.sta.config_v4().map(|config| config.address.address())
    }

    async fn start_access_point(
        &mut self,
        ssid: &str,
        password: &str,
    ) -> Result<Ipv4Addr, WifiError> {
        // AP+STA: Scans für /scan funktionieren weiterhin
        let ap_config = ModeConfig::ApSta(
            ClientConfig::default(),
            AccessPointConfig::default()
                .with_ssid(ssid.into())
                .with_password(password.into())
                .with_auth_method(AuthMethod::Wpa2Personal),
        );

        if matches!(self.controller.is_started(), Ok(true)) {
            if let Err(e) = self.controller.stop_async().await {
                warn!("WiFi: Stop before AP failed: {}", Debug2Format(&e));
            }
        }
        if let Err(e) = self.controller.set_config(&ap_config) {
            error!("WiFi: Failed to set AP configuration: {}", Debug2Format(&e));
            return Err(WifiError::Configuration);
        }
        self.ensure_started().await?;

        info!("WiFi: AP '{}' started at {}", ssid, Debug2Format(&AP_ADDRESS));
        Ok(AP_ADDRESS)
    }

    async fn scan_for(&mut self, ssid: &str) -> Result<bool, WifiError> {
        self.ensure_started().await?;
        match self
            .controller
            .scan_with_config_async(ScanConfig::default())
            .await
        {
            Ok(ap_infos) => {
                info!("WiFi: Found {} access points", ap_infos.len());
                Ok(ap_infos.iter().any(|ap_info| ap_info.ssid.as_str() == ssid))
            }
            Err(e) => {
                warn!("WiFi: Scan failed: {}", Debug2Format(&e));
                Err(WifiError::Scan)
            }
        }
    }
}
