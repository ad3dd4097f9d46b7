//! Supervisor Loop
//!
//! Der einzige Kontrollfluss des Geräts. Jeder Tick:
//! 1. Station: Link prüfen, MQTT verbinden/publizieren, Display
//! 2. höchstens eine HTTP-Verbindung bedienen
//! 3. Access Point: ein DNS-Zyklus
//! 4. Housekeeping
//! 5. kurze Pause
//!
//! Alle Komponenten gehören dem Supervisor, es gibt keinen globalen Zustand.

use core::net::Ipv4Addr;

use embedded_hal_async::delay::DelayNs;
use embedded_io_async::{Read, Write};

use crate::config_store::{self, CONFIG_DOCUMENT_CAPACITY};
use crate::dns::DnsResponder;
use crate::error::{Fault, HttpError, RestartReason};
use crate::form;
use crate::http::{self, REQUEST_BUFFER_SIZE, Route, ScanReport, StatusReport};
use crate::mqtt::MqttPublisher;
use crate::network::{LinkCheck, NetworkManager};
use crate::status::StatusSource;
use crate::timer::PeriodicTimer;
use crate::traits::{DisplaySink, HttpListener, Platform, SystemControl};
use crate::types::{DeviceConfig, NetworkMode, ip_text};

/// Pause am Ende jedes Ticks
pub const TICK_SLEEP_MS: u32 = 50;
/// Periodisches Neuzeichnen des Status-Screens (nur Station)
pub const DISPLAY_REFRESH_MS: u64 = 5_000;

/// Ergebnis eines Supervisor-Ticks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TickOutcome {
    Continue,
    Restart(RestartReason),
}

/// Laufzeit-Zustand des Geräts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceState {
    pub config: DeviceConfig,
    pub mode: NetworkMode,
    /// Station-Adresse bzw. Adresse des Access Points
    pub address: Option<Ipv4Addr>,
}

/// Alle Hardware-Komponenten einer Plattform
pub struct Board<P: Platform> {
    pub wifi: P::Wifi,
    pub mqtt: P::Mqtt,
    pub status_pin: P::StatusPin,
    pub display: P::Display,
    pub delay: P::Delay,
    pub listener: P::Listener,
    pub dns_socket: P::DnsSocket,
    pub storage: P::Storage,
    pub system: P::System,
    /// Hardware-ID für die MQTT Client-ID
    pub hardware_id: [u8; 6],
    /// HTML der Konfigurationsseite
    pub config_page: &'static [u8],
}

pub struct Supervisor<P: Platform> {
    listener: P::Listener,
    dns: DnsResponder<P::DnsSocket>,
    device: Device<P>,
}

/// Alles außer Listener und DNS: wird pro HTTP-Exchange mutabel geliehen,
/// während die Verbindung den Listener borgt.
struct Device<P: Platform> {
    state: DeviceState,
    network: NetworkManager<P::Wifi>,
    mqtt: MqttPublisher<P::Mqtt>,
    status: StatusSource<P::StatusPin>,
    display: P::Display,
    delay: P::Delay,
    storage: P::Storage,
    system: P::System,
    display_timer: Option<PeriodicTimer>,
    config_page: &'static [u8],
}

/// Ergebnis einer HTTP-Exchange
#[derive(Clone, Copy, PartialEq, Eq)]
enum Exchange {
    Closed,
    RestartRequested,
}

impl<P: Platform> Supervisor<P> {
    /// Boot-Sequenz: Modus wählen, MQTT starten
    ///
    /// `config` ist die aktive Konfiguration, normalerweise das Ergebnis
    /// von [`config_store::load_config`].
    pub async fn boot(board: Board<P>, config: DeviceConfig) -> Result<Self, Fault> {
        let Board {
            wifi,
            mqtt,
            status_pin,
            display,
            delay,
            listener,
            dns_socket,
            storage,
            system,
            hardware_id,
            config_page,
        } = board;

        let mut supervisor = Self {
            listener,
            dns: DnsResponder::new(dns_socket),
            device: Device {
                state: DeviceState {
                    config,
                    mode: NetworkMode::Station,
                    address: None,
                },
                network: NetworkManager::new(wifi),
                mqtt: MqttPublisher::new(mqtt, &hardware_id),
                status: StatusSource::new(status_pin),
                display,
                delay,
                storage,
                system,
                display_timer: None,
                config_page,
            },
        };

        supervisor.select_mode().await?;
        if supervisor.device.state.mode == NetworkMode::Station {
            supervisor.device.start_station_services().await;
        }
        Ok(supervisor)
    }

    /// Station wenn möglich, sonst Access Point mit DNS Responder
    async fn select_mode(&mut self) -> Result<(), Fault> {
        let device = &mut self.device;
        let connected = device
            .network
            .connect_station(&device.state.config, &mut device.display, &mut device.delay)
            .await;

        if connected {
            device.state.mode = NetworkMode::Station;
            device.state.address = device.network.station_address();
            return Ok(());
        }

        warn!("WiFi: Falling back to access point");
        let address = device
            .network
            .start_access_point(&mut device.display)
            .await
            .map_err(Fault::AccessPoint)?;
        device.state.mode = NetworkMode::AccessPoint;
        device.state.address = Some(address);
        self.dns.enable(address);
        info!("DNS: Captive portal answers with {}", ip_text(address).as_str());
        Ok(())
    }

    pub fn state(&self) -> &DeviceState {
        &self.device.state
    }

    pub fn mqtt(&self) -> &MqttPublisher<P::Mqtt> {
        &self.device.mqtt
    }

    pub fn network(&self) -> &NetworkManager<P::Wifi> {
        &self.device.network
    }

    pub fn display(&self) -> &P::Display {
        &self.device.display
    }

    pub fn dns(&self) -> &DnsResponder<P::DnsSocket> {
        &self.dns
    }

    /// Ein Durchlauf des Supervisor Loops
    pub async fn tick(&mut self, now_ms: u64) -> Result<TickOutcome, Fault> {
        let mode = self.device.state.mode;

        // (a) Station: Link, MQTT, Display
        if mode == NetworkMode::Station {
            if let Some(reason) = self.device.supervise_station(now_ms).await {
                return Ok(TickOutcome::Restart(reason));
            }
        }

        // (b) Höchstens eine HTTP-Verbindung
        if let Some(mut connection) = self.listener.try_accept(mode) {
            let exchange = self.device.handle_exchange(&mut connection).await;
            drop(connection);
            if let Exchange::RestartRequested = exchange {
                return Ok(TickOutcome::Restart(RestartReason::ConfigSaved));
            }
        }

        // (c) Access Point: DNS
        if mode == NetworkMode::AccessPoint {
            self.dns.service().await?;
        }

        // (d) Housekeeping
        self.device.system.housekeeping();

        // (e) Pause
        self.device.delay.delay_ms(TICK_SLEEP_MS).await;
        Ok(TickOutcome::Continue)
    }

    /// Endlos-Loop, endet nur mit einem Neustart
    pub async fn run(mut self) -> ! {
        let reason = loop {
            let now_ms = self.device.system.uptime_ms();
            match self.tick(now_ms).await {
                Ok(TickOutcome::Continue) => {}
                Ok(TickOutcome::Restart(reason)) => break reason,
                Err(fault) => {
                    error!("Supervisor: Fatal fault: {}", fault);
                    break RestartReason::Fault(fault);
                }
            }
        };

        warn!("Supervisor: Restarting in {} ms ({})", reason.delay_ms(), reason);
        self.device.delay.delay_ms(reason.delay_ms()).await;
        self.device.system.restart()
    }
}

impl<P: Platform> Device<P> {
    /// MQTT-Session, Intervall-Timer, erster Publish und Status-Screen
    async fn start_station_services(&mut self) {
        let now_ms = self.system.uptime_ms();
        if self.state.config.broker().is_some() {
            let connected = self.mqtt.connect(&self.state.config, &mut self.display).await;
            self.mqtt.start_timer(&self.state.config, now_ms, &mut self.display);
            if connected {
                let status = self.status.read();
                self.mqtt
                    .publish_status(status, &self.state.config.mqtt_topic, true, &mut self.display)
                    .await;
            }
        }
        self.display_timer = Some(PeriodicTimer::new(DISPLAY_REFRESH_MS, now_ms));
        self.refresh_display();
    }

    /// Teil (a) des Ticks, `Some` wenn neu gestartet werden muss
    async fn supervise_station(&mut self, now_ms: u64) -> Option<RestartReason> {
        let link = self
            .network
            .check_link(&self.state.config, &mut self.display, &mut self.delay)
            .await;
        // Höchstens ein Verbindungsversuch pro Tick
        let mut attempted = false;
        match link {
            LinkCheck::Healthy => {}
            LinkCheck::Lost => return Some(RestartReason::ReconnectFailed),
            LinkCheck::Reconnected => {
                self.state.address = self.network.station_address();
                if self.state.config.broker().is_some() {
                    self.mqtt.connect(&self.state.config, &mut self.display).await;
                    attempted = true;
                }
            }
        }

        if !attempted && self.state.config.broker().is_some() && !self.mqtt.is_connected() {
            info!("MQTT: No session, reconnecting");
            self.mqtt.connect(&self.state.config, &mut self.display).await;
        }

        let forced = self.mqtt.timer_due(now_ms);
        if self.mqtt.is_connected() {
            let status = self.status.read();
            self.mqtt
                .publish_status(status, &self.state.config.mqtt_topic, forced, &mut self.display)
                .await;
        }

        if self
            .display_timer
            .as_mut()
            .is_some_and(|timer| timer.poll(now_ms))
        {
            self.refresh_display();
        }
        None
    }

    fn refresh_display(&mut self) {
        let status = self.status.read();
        let ip = self.state.address.map(ip_text);
        self.display.show_status(
            status,
            self.state.config.ssid.as_str(),
            ip.as_ref().map_or("Connecting...", |ip| ip.as_str()),
        );
    }

    // ========================================================================
    // HTTP
    // ========================================================================

    async fn handle_exchange<C: Read + Write>(&mut self, conn: &mut C) -> Exchange {
        match self.serve(conn).await {
            Ok(exchange) => exchange,
            Err(e) => {
                warn!("HTTP: Exchange aborted: {}", e);
                Exchange::Closed
            }
        }
    }

    async fn serve<C: Read + Write>(&mut self, conn: &mut C) -> Result<Exchange, HttpError> {
        let mut buf = [0u8; REQUEST_BUFFER_SIZE];
        let len = conn.read(&mut buf).await.map_err(|_| HttpError::ReadFailed)?;
        if len == 0 {
            return Ok(Exchange::Closed);
        }
        let Ok(text) = core::str::from_utf8(&buf[..len]) else {
            debug!("HTTP: Request is not UTF-8, dropped");
            return Ok(Exchange::Closed);
        };
        let Some(request) = http::parse_request_line(text) else {
            debug!("HTTP: Malformed request line, dropped");
            return Ok(Exchange::Closed);
        };
        info!("HTTP: {} {}", request.method, request.path);

        let mut exchange = Exchange::Closed;
        match http::route(&request, self.state.mode) {
            Route::CaptiveRedirect => {
                let address = self.state.address.unwrap_or(Ipv4Addr::UNSPECIFIED);
                http::send_redirect(conn, address).await?;
            }
            Route::ConfigPage => http::send_page(conn, self.config_page).await?,
            Route::SubmitConfig(query) => exchange = self.submit_config(conn, query).await,
            Route::Status => {
                let (status, gpio_value) = self.status.sample();
                let report = StatusReport {
                    status: status.as_str(),
                    gpio_value,
                };
                http::send_json(conn, &report).await?;
            }
            Route::Config => {
                let mut body = [0u8; CONFIG_DOCUMENT_CAPACITY];
                let len = config_store::encode_public_config(&self.state.config, &mut body)
                    .map_err(|_| HttpError::ResponseTooLarge)?;
                http::send_json_body(conn, &body[..len]).await?;
            }
            Route::Scan(query) => {
                let target = form::form_value(query, "ssid")
                    .and_then(form::decode_value)
                    .unwrap_or_default();
                let found = self.network.scan_for_ssid(&target, &mut self.delay).await;
                http::send_json(conn, &ScanReport { found }).await?;
            }
            Route::NotFound => http::send_not_found(conn).await?,
        }

        // Gespeicherte Konfiguration gilt erst nach dem Neustart
        if conn.flush().await.is_err() && exchange != Exchange::RestartRequested {
            return Err(HttpError::WriteFailed);
        }
        Ok(exchange)
    }

    /// Formular anwenden, speichern und erst danach übernehmen
    ///
    /// Nach erfolgreichem Speichern wird immer neu gestartet, auch wenn
    /// die Bestätigung den Client nicht mehr erreicht.
    async fn submit_config<C: Write>(&mut self, conn: &mut C, query: &str) -> Exchange {
        let updated = form::apply_form(&self.state.config, query);
        match config_store::save_config(&mut self.storage, &updated) {
            Ok(()) => {
                self.state.config = updated;
                self.display.debug_line("Config saved");
                if let Err(e) = http::send_config_saved(conn).await {
                    warn!("HTTP: Confirmation not delivered: {}", e);
                }
                Exchange::RestartRequested
            }
            Err(e) => {
                error!("Config: Save failed: {}", e);
                if let Err(e) = http::send_save_failed(conn).await {
                    warn!("HTTP: Error page not delivered: {}", e);
                }
                Exchange::Closed
            }
        }
    }
}
