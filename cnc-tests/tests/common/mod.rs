//! Mock-Plattform für die Integration Tests
//!
//! Jeder Mock teilt seinen Zustand über `Rc<RefCell<..>>` mit dem Test,
//! damit der Test nach einem Supervisor-Tick hineinschauen kann.
#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::convert::Infallible;
use std::net::Ipv4Addr;
use std::rc::Rc;

use cnc_core::display::{Screen, ScreenRenderer, TextDisplay};
use cnc_core::types::bounded;
use cnc_core::{
    Board, ConfigStorage, DatagramSocket, DeviceConfig, DnsError, HttpListener, MqttError,
    MqttLink, NetworkMode, Platform, StorageError, Supervisor, SystemControl, WifiControl,
    WifiError,
};
use embedded_io_async::{ErrorKind, ErrorType, Read, Write};

pub const STATION_ADDRESS: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 2);
pub const AP_ADDRESS: Ipv4Addr = Ipv4Addr::new(192, 168, 4, 1);
pub const HARDWARE_ID: [u8; 6] = [0xA0, 0xB1, 0xC2, 0x0D, 0x1E, 0x2F];
pub const CONFIG_PAGE: &[u8] = b"<html><form>config</form></html>";

// ============================================================================
// WiFi
// ============================================================================

#[derive(Default)]
pub struct WifiState {
    pub connected: bool,
    /// Ergebnis von `begin_station`: verbindet sofort oder nie
    pub joins_on_begin: bool,
    pub begin_calls: usize,
    pub ap_started: bool,
    pub fail_access_point: bool,
    /// Ergebnisse der einzelnen Scans, leer = nicht gefunden
    pub scan_results: VecDeque<Result<bool, WifiError>>,
    pub scan_calls: usize,
}

#[derive(Clone, Default)]
pub struct MockWifi(pub Rc<RefCell<WifiState>>);

impl WifiControl for MockWifi {
    async fn begin_station(&mut self, _ssid: &str, _password: &str) -> Result<(), WifiError> {
        let mut state = self.0.borrow_mut();
        state.begin_calls += 1;
        state.connected = state.joins_on_begin;
        Ok(())
    }

    fn is_station_connected(&mut self) -> bool {
        self.0.borrow().connected
    }

    fn station_address(&self) -> Option<Ipv4Addr> {
        self.0.borrow().connected.then_some(STATION_ADDRESS)
    }

    async fn start_access_point(&mut self, _ssid: &str, _password: &str) -> Result<Ipv4Addr, WifiError> {
        let mut state = self.0.borrow_mut();
        if state.fail_access_point {
            return Err(WifiError::Start);
        }
        state.ap_started = true;
        Ok(AP_ADDRESS)
    }

    async fn scan_for(&mut self, _ssid: &str) -> Result<bool, WifiError> {
        let mut state = self.0.borrow_mut();
        state.scan_calls += 1;
        state.scan_results.pop_front().unwrap_or(Ok(false))
    }
}

// ============================================================================
// MQTT Link
// ============================================================================

#[derive(Default)]
pub struct LinkState {
    /// Broker antwortet mit CONNACK Reason-Code 0
    pub accepts: bool,
    /// Reason-Code im CONNACK wenn nicht akzeptiert
    pub refuse_code: u8,
    pub unreachable: bool,
    pub fail_writes: bool,
    pub open: bool,
    pub opens: usize,
    pub closes: usize,
    pub inbound: VecDeque<u8>,
    /// Jeder `write`-Aufruf einzeln
    pub writes: Vec<Vec<u8>>,
}

impl LinkState {
    /// Alle gesendeten PUBLISH-Pakete
    pub fn publishes(&self) -> Vec<&[u8]> {
        self.writes
            .iter()
            .filter(|packet| packet.first() == Some(&0x30))
            .map(|packet| packet.as_slice())
            .collect()
    }

    pub fn connects(&self) -> usize {
        self.writes.iter().filter(|packet| packet.first() == Some(&0x10)).count()
    }
}

#[derive(Clone, Default)]
pub struct MockMqttLink(pub Rc<RefCell<LinkState>>);

impl ErrorType for MockMqttLink {
    type Error = ErrorKind;
}

impl Read for MockMqttLink {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, ErrorKind> {
        let mut state = self.0.borrow_mut();
        let mut len = 0;
        while len < buf.len() {
            match state.inbound.pop_front() {
                Some(byte) => {
                    buf[len] = byte;
                    len += 1;
                }
                None => break,
            }
        }
        Ok(len)
    }
}

impl Write for MockMqttLink {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, ErrorKind> {
        let mut state = self.0.borrow_mut();
        if !state.open || state.fail_writes {
            return Err(ErrorKind::BrokenPipe);
        }
        state.writes.push(buf.to_vec());
        Ok(buf.len())
    }

    async fn flush(&mut self) -> Result<(), ErrorKind> {
        Ok(())
    }
}

impl MqttLink for MockMqttLink {
    async fn open(&mut self, _host: &str, _port: u16) -> Result<(), MqttError> {
        let mut state = self.0.borrow_mut();
        state.opens += 1;
        if state.unreachable {
            return Err(MqttError::ConnectionFailed);
        }
        state.open = true;
        let code = if state.accepts { 0 } else { state.refuse_code };
        // MQTT v5 CONNACK: Flags, Reason-Code, keine Properties
        state.inbound.extend([0x20, 0x03, 0x00, code, 0x00]);
        Ok(())
    }

    fn close(&mut self) {
        let mut state = self.0.borrow_mut();
        state.closes += 1;
        state.open = false;
        state.inbound.clear();
    }
}

// ============================================================================
// Status-Eingang
// ============================================================================

#[derive(Clone, Default)]
pub struct MockPin(pub Rc<Cell<bool>>);

impl embedded_hal::digital::ErrorType for MockPin {
    type Error = Infallible;
}

impl embedded_hal::digital::InputPin for MockPin {
    fn is_high(&mut self) -> Result<bool, Infallible> {
        Ok(self.0.get())
    }

    fn is_low(&mut self) -> Result<bool, Infallible> {
        Ok(!self.0.get())
    }
}

// ============================================================================
// Display
// ============================================================================

/// Merkt sich jede gezeichnete Zeile
#[derive(Clone, Default)]
pub struct RecordingRenderer(pub Rc<RefCell<Vec<String>>>);

impl ScreenRenderer for RecordingRenderer {
    fn render(&mut self, screen: &Screen) {
        self.0.borrow_mut().extend(screen.texts().map(String::from));
    }
}

// ============================================================================
// Delay
// ============================================================================

/// Summiert alle Wartezeiten in Millisekunden
#[derive(Clone, Default)]
pub struct MockDelay(pub Rc<Cell<u64>>);

impl embedded_hal_async::delay::DelayNs for MockDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.0.set(self.0.get() + u64::from(ns) / 1_000_000);
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.0.set(self.0.get() + u64::from(ms));
    }
}

// ============================================================================
// HTTP
// ============================================================================

#[derive(Default)]
pub struct HttpState {
    /// Wartende Requests (roh), einer pro Verbindung
    pub pending: VecDeque<Vec<u8>>,
    /// Antworten der abgeschlossenen Verbindungen
    pub responses: Vec<Vec<u8>>,
    pub accepted_modes: Vec<NetworkMode>,
    /// Client trennt nach dem Request, jedes Schreiben schlägt fehl
    pub client_gone: bool,
}

#[derive(Clone, Default)]
pub struct MockListener(pub Rc<RefCell<HttpState>>);

impl MockListener {
    pub fn queue(&self, request: &str) {
        self.0.borrow_mut().pending.push_back(request.as_bytes().to_vec());
    }

    pub fn last_response(&self) -> String {
        let state = self.0.borrow();
        let response = state.responses.last().expect("no connection served");
        String::from_utf8_lossy(response).into_owned()
    }
}

impl HttpListener for MockListener {
    type Connection<'a>
        = MockConnection
    where
        Self: 'a;

    fn try_accept(&mut self, mode: NetworkMode) -> Option<MockConnection> {
        let mut state = self.0.borrow_mut();
        let request = state.pending.pop_front()?;
        state.accepted_modes.push(mode);
        Some(MockConnection {
            request,
            consumed: false,
            response: Vec::new(),
            shared: self.0.clone(),
        })
    }
}

/// Eine Verbindung, legt ihre Antwort beim Drop ab
pub struct MockConnection {
    request: Vec<u8>,
    consumed: bool,
    response: Vec<u8>,
    shared: Rc<RefCell<HttpState>>,
}

impl Drop for MockConnection {
    fn drop(&mut self) {
        let response = std::mem::take(&mut self.response);
        self.shared.borrow_mut().responses.push(response);
    }
}

impl ErrorType for MockConnection {
    type Error = ErrorKind;
}

impl Read for MockConnection {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, ErrorKind> {
        if self.consumed {
            return Ok(0);
        }
        self.consumed = true;
        let len = self.request.len().min(buf.len());
        buf[..len].copy_from_slice(&self.request[..len]);
        Ok(len)
    }
}

impl Write for MockConnection {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, ErrorKind> {
        if self.shared.borrow().client_gone {
            return Err(ErrorKind::BrokenPipe);
        }
        self.response.extend_from_slice(buf);
        Ok(buf.len())
    }

    async fn flush(&mut self) -> Result<(), ErrorKind> {
        if self.shared.borrow().client_gone {
            return Err(ErrorKind::BrokenPipe);
        }
        Ok(())
    }
}

// ============================================================================
// DNS Socket
// ============================================================================

#[derive(Default)]
pub struct DnsSocketState {
    pub inbound: VecDeque<Result<Vec<u8>, DnsError>>,
    pub sent: Vec<(Vec<u8>, u16)>,
}

#[derive(Clone, Default)]
pub struct MockDnsSocket(pub Rc<RefCell<DnsSocketState>>);

/// Absender-Port aller Test-Anfragen
pub const CLIENT_PORT: u16 = 53_000;

impl DatagramSocket for MockDnsSocket {
    type Endpoint = u16;

    fn try_receive(&mut self, buf: &mut [u8]) -> Result<Option<(usize, u16)>, DnsError> {
        match self.0.borrow_mut().inbound.pop_front() {
            None => Ok(None),
            Some(Err(e)) => Err(e),
            Some(Ok(packet)) => {
                let len = packet.len().min(buf.len());
                buf[..len].copy_from_slice(&packet[..len]);
                Ok(Some((len, CLIENT_PORT)))
            }
        }
    }

    async fn send_to(&mut self, data: &[u8], remote: u16) -> Result<(), DnsError> {
        self.0.borrow_mut().sent.push((data.to_vec(), remote));
        Ok(())
    }
}

// ============================================================================
// Storage
// ============================================================================

#[derive(Default)]
pub struct StorageState {
    pub document: Option<Vec<u8>>,
    pub fail_store: bool,
    pub stores: usize,
}

#[derive(Clone, Default)]
pub struct MockStorage(pub Rc<RefCell<StorageState>>);

impl ConfigStorage for MockStorage {
    fn load<'b>(&mut self, buf: &'b mut [u8]) -> Result<&'b [u8], StorageError> {
        let state = self.0.borrow();
        let document = state.document.as_ref().ok_or(StorageError::Empty)?;
        let target = buf.get_mut(..document.len()).ok_or(StorageError::TooLarge)?;
        target.copy_from_slice(document);
        Ok(target)
    }

    fn store(&mut self, document: &[u8]) -> Result<(), StorageError> {
        let mut state = self.0.borrow_mut();
        if state.fail_store {
            return Err(StorageError::WriteFailed);
        }
        state.stores += 1;
        state.document = Some(document.to_vec());
        Ok(())
    }
}

// ============================================================================
// System
// ============================================================================

#[derive(Clone, Default)]
pub struct MockSystem {
    pub now_ms: Rc<Cell<u64>>,
    pub housekeeping: Rc<Cell<usize>>,
}

impl SystemControl for MockSystem {
    fn uptime_ms(&self) -> u64 {
        self.now_ms.get()
    }

    fn housekeeping(&mut self) {
        self.housekeeping.set(self.housekeeping.get() + 1);
    }

    fn restart(&mut self) -> ! {
        panic!("restart requested");
    }
}

// ============================================================================
// Plattform + Rig
// ============================================================================

pub struct MockPlatform;

impl Platform for MockPlatform {
    type Wifi = MockWifi;
    type Mqtt = MockMqttLink;
    type StatusPin = MockPin;
    type Display = TextDisplay<RecordingRenderer>;
    type Delay = MockDelay;
    type Listener = MockListener;
    type DnsSocket = MockDnsSocket;
    type Storage = MockStorage;
    type System = MockSystem;
}

pub type TestSupervisor = Supervisor<MockPlatform>;

/// Alle Mock-Handles eines Testaufbaus
#[derive(Clone, Default)]
pub struct Rig {
    pub wifi: MockWifi,
    pub mqtt: MockMqttLink,
    pub pin: MockPin,
    pub screen: RecordingRenderer,
    pub delay: MockDelay,
    pub listener: MockListener,
    pub dns: MockDnsSocket,
    pub storage: MockStorage,
    pub system: MockSystem,
}

impl Rig {
    /// Netzwerk erreichbar, Broker nimmt Verbindungen an
    pub fn reachable() -> Self {
        let rig = Self::default();
        rig.wifi.0.borrow_mut().joins_on_begin = true;
        rig.mqtt.0.borrow_mut().accepts = true;
        rig
    }

    pub fn board(&self) -> Board<MockPlatform> {
        Board {
            wifi: self.wifi.clone(),
            mqtt: self.mqtt.clone(),
            status_pin: self.pin.clone(),
            display: TextDisplay::new(self.screen.clone()),
            delay: self.delay.clone(),
            listener: self.listener.clone(),
            dns_socket: self.dns.clone(),
            storage: self.storage.clone(),
            system: self.system.clone(),
            hardware_id: HARDWARE_ID,
            config_page: CONFIG_PAGE,
        }
    }

    pub fn boot(&self, config: DeviceConfig) -> TestSupervisor {
        let result = embassy_futures::block_on(TestSupervisor::boot(self.board(), config));
        match result {
            Ok(supervisor) => supervisor,
            Err(fault) => panic!("boot failed: {:?}", fault),
        }
    }

    pub fn screen_lines(&self) -> Vec<String> {
        self.screen.0.borrow().clone()
    }

    pub fn waited_ms(&self) -> u64 {
        self.delay.0.get()
    }
}

/// Konfiguration mit Zugangsdaten, optional mit Broker
pub fn station_config(broker: Option<&str>) -> DeviceConfig {
    let mut config = DeviceConfig::default();
    config.ssid = bounded("Halle").unwrap();
    config.password = bounded("geheim").unwrap();
    config.mqtt_broker = broker.and_then(bounded);
    config
}

/// Führt einen Tick zum angegebenen Zeitpunkt aus
pub fn tick(supervisor: &mut TestSupervisor, now_ms: u64) -> Result<cnc_core::TickOutcome, cnc_core::Fault> {
    embassy_futures::block_on(supervisor.tick(now_ms))
}
