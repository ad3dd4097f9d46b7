// Hardware Abstraction Layer (HAL) Module
//
// Implementiert die Traits aus cnc-core für die ESP32-C3 Hardware.
// Jede Datei kapselt genau eine Hardware-Schnittstelle.

pub mod display;
pub mod dns_socket;
pub mod http_server;
pub mod mqtt_link;
pub mod storage;
pub mod system;
pub mod wifi;

pub use display::{DisplayBackend, LogRenderer, OledRenderer};
pub use dns_socket::UdpDnsSocket;
pub use http_server::{HttpConnection, HttpServer};
pub use mqtt_link::TcpMqttLink;
pub use storage::FlashConfigStorage;
pub use system::EspSystem;
pub use wifi::EspWifi;
