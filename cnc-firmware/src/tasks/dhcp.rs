// DHCP Server - vergibt Adressen im Access-Point-Netz
//
// Clients bekommen 192.168.4.x, Gateway und DNS zeigen auf den AP selbst.
// Damit landen alle Namensauflösungen beim Captive DNS Responder.

use core::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

use defmt::{Debug2Format, error, info, warn};
use edge_dhcp::io::{self, DEFAULT_SERVER_PORT};
use edge_dhcp::server::{Server, ServerOptions};
use edge_nal::UdpBind;
use edge_nal_embassy::{Udp, UdpBuffers};
use embassy_net::Stack;
use embassy_time::{Duration, Timer};

use crate::config::{AP_ADDRESS, DHCP_PACKET_BUFFER_SIZE, DHCP_RESTART_DELAY_MS};

/// Maximale Anzahl gleichzeitiger Leases
const MAX_LEASES: usize = 16;

/// DHCP Server Task
///
/// Bindet UDP/67 auf dem AP-Stack und startet den Server nach
/// jedem Fehler neu.
#[embassy_executor::task]
pub async fn dhcp_server_task(stack: Stack<'static>) {
    let buffers = UdpBuffers::<1, 1024, 1024, 4>::new();
    let udp = Udp::new(stack, &buffers);

    let local = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, DEFAULT_SERVER_PORT));
    let mut socket = match udp.bind(local).await {
        Ok(socket) => socket,
        Err(e) => {
            error!("DHCP: Failed to bind port {}: {}", DEFAULT_SERVER_PORT, Debug2Format(&e));
            return;
        }
    };

    info!("DHCP: Server listening on {}", Debug2Format(&AP_ADDRESS));

    let mut buf = [0u8; DHCP_PACKET_BUFFER_SIZE];
    let mut gateways = [AP_ADDRESS];
    let dns_servers = [AP_ADDRESS];
    let mut server = Server::<_, MAX_LEASES>::new_with_et(AP_ADDRESS);

    loop {
        let mut options = ServerOptions::new(AP_ADDRESS, Some(&mut gateways));
        options.dns = &dns_servers;
        if let Err(e) = io::server::run(&mut server, &options, &mut socket, &mut buf).await {
            warn!("DHCP: Server error: {}", Debug2Format(&e));
        }
        Timer::after(Duration::from_millis(DHCP_RESTART_DELAY_MS)).await;
    }
}
