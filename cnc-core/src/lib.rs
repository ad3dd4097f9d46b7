//! CNC Core - Platform-agnostic Logic and Traits
//!
//! Diese Crate enthält KEINE Hardware-Dependencies.
//! Sie definiert Traits für jede Hardware-Schnittstelle und die
//! komplette Zustandslogik des Monitors (WiFi-Modus, MQTT, HTTP, DNS).

#![cfg_attr(not(test), no_std)]
#![allow(async_fn_in_trait)]

// Muss zuerst kommen: stellt die Logging-Makros bereit
mod fmt;

pub mod config_store;
pub mod display;
pub mod dns;
pub mod error;
pub mod form;
pub mod http;
pub mod mqtt;
pub mod network;
pub mod packet;
pub mod status;
pub mod supervisor;
pub mod timer;
pub mod traits;
pub mod types;

// Re-exports für einfachen Zugriff
pub use error::{
    ConfigError, DnsError, Fault, HttpError, MqttError, RestartReason, StorageError, WifiError,
};
pub use supervisor::{Board, DeviceState, Supervisor, TickOutcome};
pub use traits::{
    ConfigStorage, DatagramSocket, DisplaySink, HttpListener, MqttLink, Platform, SystemControl,
    WifiControl,
};
pub use types::{DeviceConfig, NetworkMode, StatusValue};
