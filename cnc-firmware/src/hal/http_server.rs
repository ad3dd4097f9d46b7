// HTTP Server - nicht-blockierender Listener auf Port 80
//
// Ein Listen-Socket pro Stack (Station und Access Point). Der Supervisor
// fragt pro Tick einmal nach einer wartenden Verbindung, ohne zu warten.

use core::task::Poll;

use defmt::{debug, warn};
use embassy_futures::poll_once;
use embassy_net::tcp::{Error as TcpError, State, TcpSocket};
use embassy_time::Duration;
use embedded_io_async::{ErrorType, Read, Write};

use cnc_core::{HttpListener, NetworkMode};

use crate::config::{HTTP_PORT, HTTP_TIMEOUT_SECS};

pub struct HttpServer {
    sta: TcpSocket<'static>,
    ap: TcpSocket<'static>,
}

impl HttpServer {
    pub fn new(sta: TcpSocket<'static>, ap: TcpSocket<'static>) -> Self {
        Self { sta, ap }
    }
}

impl HttpListener for HttpServer {
    type Connection<'a>
        = HttpConnection<'a>
    where
        Self: 'a;

    fn try_accept(&mut self, mode: NetworkMode) -> Option<HttpConnection<'_>> {
        let socket = match mode {
            NetworkMode::Station => &mut self.sta,
            NetworkMode::AccessPoint => &mut self.ap,
        };

        match socket.state() {
            // Handshake seit dem letzten Tick abgeschlossen
            State::Established | State::CloseWait => return Some(HttpConnection::new(socket)),
            State::Closed | State::Listen => {}
            // Vorherige Antwort ist raus, auf den Client wird nicht gewartet
            State::TimeWait | State::FinWait2 => socket.abort(),
            _ => return None,
        }

        let accepted = poll_once(socket.accept(HTTP_PORT));
        match accepted {
            Poll::Ready(Ok(())) => Some(HttpConnection::new(socket)),
            Poll::Ready(Err(e)) => {
                warn!("HTTP: Accept failed: {}", e);
                socket.abort();
                None
            }
            Poll::Pending => None,
        }
    }
}

/// Eine angenommene Verbindung, wird beim Drop geschlossen
pub struct HttpConnection<'a> {
    socket: &'a mut TcpSocket<'static>,
}

impl<'a> HttpConnection<'a> {
    fn new(socket: &'a mut TcpSocket<'static>) -> Self {
        debug!("HTTP: Connection from {}", socket.remote_endpoint());
        socket.set_timeout(Some(Duration::from_secs(HTTP_TIMEOUT_SECS)));
        Self { socket }
    }
}

impl Drop for HttpConnection<'_> {
    fn drop(&mut self) {
        self.socket.close();
    }
}

impl ErrorType for HttpConnection<'_> {
    type Error = TcpError;
}

impl Read for HttpConnection<'_> {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        self.socket.read(buf).await
    }
}

impl Write for HttpConnection<'_> {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.socket.write(buf).await
    }

    async fn flush(&mut self) -> Result<(), Self::Error> {
        self.socket.flush().await
    }
}
