// Library-Root: Hardware-Anbindung des CNC-Monitors
// Keine Standard-Bibliothek (Embedded System)
#![no_std]

// Module
pub mod config;
pub mod hal;
pub mod tasks;
pub mod web;

use cnc_core::Platform;
use cnc_core::display::TextDisplay;

use crate::hal::{
    DisplayBackend, EspSystem, EspWifi, FlashConfigStorage, HttpServer, TcpMqttLink, UdpDnsSocket,
};

// ============================================================================
// Plattform-Bindung
// ============================================================================
//
// Verbindet die Traits aus cnc-core mit der ESP32-C3 Hardware.
// Der Supervisor ist generisch über `Platform` und kennt nur diese Typen.

/// ESP32-C3 mit esp-radio, embassy-net, esp-storage und SSD1306
pub struct EspPlatform;

impl Platform for EspPlatform {
    type Wifi = EspWifi;
    type Mqtt = TcpMqttLink;
    type StatusPin = esp_hal::gpio::Input<'static>;
    type Display = TextDisplay<DisplayBackend>;
    type Delay = embassy_time::Delay;
    type Listener = HttpServer;
    type DnsSocket = UdpDnsSocket;
    type Storage = FlashConfigStorage;
    type System = EspSystem;
}

/// Supervisor für diese Plattform
pub type CncSupervisor = cnc_core::Supervisor<EspPlatform>;
