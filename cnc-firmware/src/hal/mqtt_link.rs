// MQTT Link - TCP-Verbindung zum Broker über den Station-Stack
use core::net::Ipv4Addr;

use defmt::{Debug2Format, info};
use embassy_net::tcp::{Error as TcpError, TcpSocket};
use embassy_net::{IpAddress, Stack, dns::DnsQueryType};
use embassy_time::{Duration, with_timeout};
use embedded_io_async::{ErrorType, Read, Write};

use cnc_core::{MqttError, MqttLink};

use crate::config::{DNS_TIMEOUT_SECS, MQTT_SOCKET_TIMEOUT_SECS};

/// Persistente TCP-Verbindung für den MQTT Publisher
///
/// Der Socket wird einmal mit statischen Buffern angelegt und bei jedem
/// `open()` neu verbunden.
pub struct TcpMqttLink {
    stack: Stack<'static>,
    socket: TcpSocket<'static>,
}

impl TcpMqttLink {
    pub fn new(stack: Stack<'static>, rx_buffer: &'static mut [u8], tx_buffer: &'static mut [u8]) -> Self {
        Self {
            stack,
            socket: TcpSocket::new(stack, rx_buffer, tx_buffer),
        }
    }

    /// IPv4-Literal direkt, sonst DNS-Auflösung über den Station-Stack
    async fn resolve(&self, host: &str) -> Result<Ipv4Addr, MqttError> {
        if let Ok(address) = host.parse::<Ipv4Addr>() {
            return Ok(address);
        }

        info!("MQTT: Resolving '{}'...", host);
        let result = with_timeout(
            Duration::from_secs(DNS_TIMEOUT_SECS),
            self.stack.dns_query(host, DnsQueryType::A),
        )
        .await;

        match result {
            Ok(Ok(addrs)) => {
                for addr in addrs {
                    if let IpAddress::Ipv4(ipv4) = addr {
                        return Ok(ipv4);
                    }
                }
                Err(MqttError::DnsResolutionFailed)
            }
            Ok(Err(_)) => Err(MqttError::DnsResolutionFailed),
            Err(_) => Err(MqttError::DnsTimeout),
        }
    }
}

impl MqttLink for TcpMqttLink {
    async fn open(&mut self, host: &str, port: u16) -> Result<(), MqttError> {
        self.socket.abort();
        let address = self.resolve(host).await?;
        info!("MQTT: Broker at {}:{}", Debug2Format(&address), port);

        self.socket
            .set_timeout(Some(Duration::from_secs(MQTT_SOCKET_TIMEOUT_SECS)));
        self.socket
            .connect((address, port))
            .await
            .map_err(|_| MqttError::ConnectionFailed)?;
        info!("MQTT: TCP connected");
        Ok(())
    }

    fn close(&mut self) {
        self.socket.abort();
    }
}

impl ErrorType for TcpMqttLink {
    type Error = TcpError;
}

impl Read for TcpMqttLink {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        self.socket.read(buf).await
    }
}

impl Write for TcpMqttLink {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.socket.write(buf).await
    }

    async fn flush(&mut self) -> Result<(), Self::Error> {
        self.socket.flush().await
    }
}
