//! MQTT Publisher
//!
//! Hält höchstens eine Session zum Broker. Jeder Fehler beendet die
//! Session, der Supervisor baut sie im nächsten Tick neu auf.
//!
//! Die TCP-Verbindung lebt im Link über mehrere Ticks. Der `rust-mqtt`
//! Client wird für jeden Vorgang über dem offenen Link aufgebaut und
//! danach wieder freigegeben.

use core::fmt::Write as _;

use heapless::String;
use rust_mqtt::client::client::MqttClient;
use rust_mqtt::client::client_config::{ClientConfig, MqttVersion};
use rust_mqtt::packet::v5::publish_packet::QualityOfService;
use rust_mqtt::packet::v5::reason_codes::ReasonCode;
use rust_mqtt::utils::rng_generator::CountingRng;
use rust_mqtt::utils::types::EncodedString;

use crate::error::MqttError;
use crate::packet::{self, ClientId};
use crate::timer::PeriodicTimer;
use crate::traits::{DisplaySink, MqttLink};
use crate::types::{DeviceConfig, StatusValue};

/// Puffergröße für Senden und Empfangen (Topic + Payload + Header)
pub const MQTT_BUFFER_SIZE: usize = 256;
/// Keep Alive 0: der Broker trennt nie wegen Inaktivität
pub const KEEP_ALIVE_SECS: u16 = 0;
/// Maximale Anzahl MQTT v5 Properties pro Paket
const MAX_PROPERTIES: usize = 5;

/// Aktive Broker-Session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MqttSession {
    /// Zuletzt erfolgreich publizierter Status (Änderungserkennung)
    pub last_published: Option<StatusValue>,
}

/// Client-Konfiguration: feste Client-ID, kein Keep Alive
fn client_config(client_id: &str) -> ClientConfig<'_, MAX_PROPERTIES, CountingRng> {
    let mut config = ClientConfig::<MAX_PROPERTIES, _>::new(MqttVersion::MQTTv5, CountingRng(20000));
    config.client_id = EncodedString {
        string: client_id,
        len: client_id.len() as u16,
    };
    config.keep_alive = KEEP_ALIVE_SECS;
    config.max_packet_size = MQTT_BUFFER_SIZE as u32;
    config
}

pub struct MqttPublisher<L> {
    link: L,
    client_id: ClientId,
    session: Option<MqttSession>,
    timer: Option<PeriodicTimer>,
    send_buffer: [u8; MQTT_BUFFER_SIZE],
    recv_buffer: [u8; MQTT_BUFFER_SIZE],
}

impl<L: MqttLink> MqttPublisher<L> {
    /// `hardware_id` ist typischerweise die MAC-Adresse
    pub fn new(link: L, hardware_id: &[u8]) -> Self {
        Self {
            link,
            client_id: packet::client_id(hardware_id),
            session: None,
            timer: None,
            send_buffer: [0u8; MQTT_BUFFER_SIZE],
            recv_buffer: [0u8; MQTT_BUFFER_SIZE],
        }
    }

    pub fn client_id(&self) -> &str {
        self.client_id.as_str()
    }

    pub fn session(&self) -> Option<&MqttSession> {
        self.session.as_ref()
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    // ========================================================================
    // Session
    // ========================================================================

    /// Baut eine neue Session auf, eine bestehende wird vorher verworfen
    pub async fn connect<D: DisplaySink>(&mut self, config: &DeviceConfig, display: &mut D) -> bool {
        self.teardown();

        let Some(broker) = config.broker() else {
            debug!("MQTT: No broker configured");
            return false;
        };

        display.debug_line("MQTT Connecting...");
        info!(
            "MQTT: Connecting to {}:{} as '{}'",
            broker,
            config.mqtt_port,
            self.client_id.as_str()
        );

        match self.handshake(broker, config.mqtt_port).await {
            Ok(()) => {
                info!("MQTT: Connected");
                self.session = Some(MqttSession::default());
                display.debug_line("MQTT Connected");
                true
            }
            Err(e) => {
                error!("MQTT: Connect failed: {}", e);
                display.debug_line("MQTT Conn Fail");
                self.teardown();
                false
            }
        }
    }

    async fn handshake(&mut self, broker: &str, port: u16) -> Result<(), MqttError> {
        self.link.open(broker, port).await?;

        let mut client = MqttClient::<_, MAX_PROPERTIES, _>::new(
            &mut self.link,
            &mut self.send_buffer,
            MQTT_BUFFER_SIZE,
            &mut self.recv_buffer,
            MQTT_BUFFER_SIZE,
            client_config(self.client_id.as_str()),
        );
        client.connect_to_broker().await.map_err(|reason| match reason {
            ReasonCode::NetworkError => MqttError::ConnectionFailed,
            _ => MqttError::Refused,
        })
    }

    /// Verwirft die Session und schließt die Verbindung
    pub fn teardown(&mut self) {
        self.session = None;
        self.link.close();
    }

    // ========================================================================
    // Publish
    // ========================================================================

    /// Publiziert `status` bei Änderung oder wenn `forced`
    ///
    /// Ohne Session ein No-Op. `true` nur wenn tatsächlich gesendet wurde.
    /// Ein Sendefehler beendet die Session, der Wert gilt dann als nicht
    /// publiziert.
    pub async fn publish_status<D: DisplaySink>(
        &mut self,
        status: StatusValue,
        topic: &str,
        forced: bool,
        display: &mut D,
    ) -> bool {
        let Some(session) = self.session else {
            return false;
        };
        if !forced && session.last_published == Some(status) {
            return false;
        }

        let payload = packet::status_payload(status);
        info!("MQTT: Publishing to '{}': {}", topic, payload.as_str());

        match self.send_publish(topic, payload.as_bytes()).await {
            Ok(()) => {
                self.session = Some(MqttSession {
                    last_published: Some(status),
                });
                let mut line: String<24> = String::new();
                let _ = write!(line, "MQTT Pub: {}", status.as_str());
                display.debug_line(&line);
                true
            }
            Err(e) => {
                error!("MQTT: Publish failed: {}", e);
                display.debug_line("MQTT Pub Fail");
                self.teardown();
                false
            }
        }
    }

    async fn send_publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), MqttError> {
        let mut client = MqttClient::<_, MAX_PROPERTIES, _>::new(
            &mut self.link,
            &mut self.send_buffer,
            MQTT_BUFFER_SIZE,
            &mut self.recv_buffer,
            MQTT_BUFFER_SIZE,
            client_config(self.client_id.as_str()),
        );
        client
            .send_message(topic, payload, QualityOfService::QoS0, false)
            .await
            .map_err(|_| MqttError::PublishFailed)
    }

    // ========================================================================
    // Periodischer Publish
    // ========================================================================

    /// Startet den Intervall-Timer neu
    ///
    /// Nur aktiv wenn ein Broker konfiguriert und das Intervall > 0 ist.
    pub fn start_timer<D: DisplaySink>(
        &mut self,
        config: &DeviceConfig,
        now_ms: u64,
        display: &mut D,
    ) -> bool {
        self.timer = None;
        if config.broker().is_none() || config.mqtt_interval_seconds == 0 {
            return false;
        }

        let period_ms = u64::from(config.mqtt_interval_seconds) * 1_000;
        self.timer = Some(PeriodicTimer::new(period_ms, now_ms));
        info!("MQTT: Publish timer every {}s", config.mqtt_interval_seconds);

        let mut line: String<24> = String::new();
        let _ = write!(line, "MQTT Timer: {}s", config.mqtt_interval_seconds);
        display.debug_line(&line);
        true
    }

    pub fn timer_active(&self) -> bool {
        self.timer.is_some()
    }

    /// `true` wenn ein erzwungener Publish fällig ist
    pub fn timer_due(&mut self, now_ms: u64) -> bool {
        self.timer.as_mut().is_some_and(|timer| timer.poll(now_ms))
    }
}
