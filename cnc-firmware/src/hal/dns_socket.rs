// DNS Socket - UDP Port 53 auf dem Access-Point-Stack
use core::task::Poll;

use defmt::{debug, error, info};
use embassy_futures::poll_once;
use embassy_net::udp::{RecvError, UdpMetadata, UdpSocket};

use cnc_core::dns::DNS_PORT;
use cnc_core::{DatagramSocket, DnsError};

/// Nicht-blockierender UDP-Socket für den Captive-Portal DNS Responder
pub struct UdpDnsSocket {
    socket: UdpSocket<'static>,
}

impl UdpDnsSocket {
    /// Bindet den Socket auf Port 53
    ///
    /// Schlägt das Binden fehl, bleibt der Socket stumm: der Responder
    /// empfängt dann einfach nie ein Paket.
    pub fn bind(mut socket: UdpSocket<'static>) -> Self {
        match socket.bind(DNS_PORT) {
            Ok(()) => info!("DNS: Socket bound to port {}", DNS_PORT),
            Err(e) => error!("DNS: Failed to bind port {}: {}", DNS_PORT, e),
        }
        Self { socket }
    }
}

impl DatagramSocket for UdpDnsSocket {
    type Endpoint = UdpMetadata;

    fn try_receive(&mut self, buf: &mut [u8]) -> Result<Option<(usize, UdpMetadata)>, DnsError> {
        let received = poll_once(self.socket.recv_from(buf));
        match received {
            Poll::Ready(Ok((len, remote))) => Ok(Some((len, remote))),
            Poll::Ready(Err(RecvError::Truncated)) => {
                debug!("DNS: Oversized packet dropped");
                Ok(None)
            }
            Poll::Pending => Ok(None),
        }
    }

    async fn send_to(&mut self, data: &[u8], remote: UdpMetadata) -> Result<(), DnsError> {
        self.socket
            .send_to(data, remote)
            .await
            .map_err(|_| DnsError::SendFailed)
    }
}
