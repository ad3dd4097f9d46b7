//! Captive-Portal DNS Responder
//!
//! Beantwortet im AP-Modus jede Anfrage mit einem A-Record auf die
//! eigene Adresse. Pro Supervisor-Tick wird höchstens ein Paket bedient.

use core::net::Ipv4Addr;

use crate::error::DnsError;
use crate::traits::DatagramSocket;

/// Standard-DNS-Port
pub const DNS_PORT: u16 = 53;
/// Maximale Größe einer DNS-Nachricht über UDP
pub const DNS_PACKET_SIZE: usize = 512;
/// TTL der Antwort in Sekunden
pub const DNS_TTL_SECS: u32 = 60;

const HEADER_LEN: usize = 12;
// QR=1, RD=1, RA=1, RCODE=0
const RESPONSE_FLAGS: u16 = 0x8180;
// Kompressions-Pointer auf den Namen der ersten Frage (Offset 12)
const NAME_POINTER: u16 = 0xC00C;
const TYPE_A: u16 = 1;
const CLASS_IN: u16 = 1;
const ANSWER_LEN: usize = 16;

/// Ende der ersten Frage (Name + QTYPE + QCLASS), `None` wenn nicht abgrenzbar
fn question_end(query: &[u8]) -> Option<usize> {
    let mut cursor = HEADER_LEN;
    loop {
        let label_len = *query.get(cursor)? as usize;
        if label_len == 0 {
            cursor += 1;
            break;
        }
        // Komprimierte Namen kommen in Fragen nicht vor
        if label_len & 0xC0 != 0 {
            return None;
        }
        cursor += 1 + label_len;
    }
    let end = cursor + 4;
    (end <= query.len()).then_some(end)
}

/// Baut die Antwort auf `query` in `response`
///
/// `None` wenn `query` kürzer als ein DNS-Header ist oder `response`
/// zu klein ist.
pub fn build_response(query: &[u8], answer: Ipv4Addr, response: &mut [u8]) -> Option<usize> {
    if query.len() < HEADER_LEN {
        return None;
    }
    let question = &query[HEADER_LEN..question_end(query).unwrap_or(query.len())];
    let total = HEADER_LEN + question.len() + ANSWER_LEN;
    let out = response.get_mut(..total)?;

    // Header
    out[0..2].copy_from_slice(&query[0..2]);
    out[2..4].copy_from_slice(&RESPONSE_FLAGS.to_be_bytes());
    out[4..6].copy_from_slice(&1u16.to_be_bytes());
    out[6..8].copy_from_slice(&1u16.to_be_bytes());
    out[8..12].fill(0);

    // Frage
    let answer_start = HEADER_LEN + question.len();
    out[HEADER_LEN..answer_start].copy_from_slice(question);

    // Antwort
    let record = &mut out[answer_start..];
    record[0..2].copy_from_slice(&NAME_POINTER.to_be_bytes());
    record[2..4].copy_from_slice(&TYPE_A.to_be_bytes());
    record[4..6].copy_from_slice(&CLASS_IN.to_be_bytes());
    record[6..10].copy_from_slice(&DNS_TTL_SECS.to_be_bytes());
    record[10..12].copy_from_slice(&4u16.to_be_bytes());
    record[12..16].copy_from_slice(&answer.octets());

    Some(total)
}

/// DNS Responder über einem nicht-blockierenden UDP-Socket
pub struct DnsResponder<S> {
    socket: S,
    answer: Option<Ipv4Addr>,
}

impl<S: DatagramSocket> DnsResponder<S> {
    /// Inaktiv bis [`Self::enable`] aufgerufen wird
    pub fn new(socket: S) -> Self {
        Self { socket, answer: None }
    }

    /// Aktiviert den Responder mit der Adresse des Access Points
    pub fn enable(&mut self, address: Ipv4Addr) {
        self.answer = Some(address);
    }

    pub fn answer(&self) -> Option<Ipv4Addr> {
        self.answer
    }

    /// Bedient höchstens eine wartende Anfrage
    ///
    /// `Ok(true)` wenn eine Antwort gesendet wurde. Kaputte Pakete und
    /// Sendefehler werden nur geloggt, ein Empfangsfehler des Sockets
    /// wird weitergereicht.
    pub async fn service(&mut self) -> Result<bool, DnsError> {
        let Some(answer) = self.answer else {
            return Ok(false);
        };

        let mut query = [0u8; DNS_PACKET_SIZE];
        let Some((len, remote)) = self.socket.try_receive(&mut query)? else {
            return Ok(false);
        };

        let mut response = [0u8; DNS_PACKET_SIZE + ANSWER_LEN];
        let Some(response_len) = build_response(&query[..len], answer, &mut response) else {
            debug!("DNS: Ignoring short packet ({} bytes)", len);
            return Ok(false);
        };

        if let Err(e) = self.socket.send_to(&response[..response_len], remote).await {
            warn!("DNS: Send failed: {}", e);
            return Ok(false);
        }
        Ok(true)
    }
}
