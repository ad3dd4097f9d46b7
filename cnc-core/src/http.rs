//! HTTP Control Plane - Parser, Routing und Antworten
//!
//! Eine Verbindung, ein Request, eine Antwort, danach wird geschlossen.
//! Keine Keep-Alive-Unterstützung, kein Body außer dem Query-String.

use core::fmt::Write as _;
use core::net::Ipv4Addr;

use embedded_io_async::Write;
use heapless::String;
use serde::Serialize;

use crate::error::HttpError;
use crate::types::{NetworkMode, ip_text};

/// Ein Read pro Request, größere Requests werden abgeschnitten
pub const REQUEST_BUFFER_SIZE: usize = 1024;
/// Chunk-Größe beim Streamen der Konfigurationsseite
pub const PAGE_CHUNK_SIZE: usize = 512;
/// Puffergröße für JSON-Antworten
pub const JSON_BUFFER_SIZE: usize = 512;

/// Pfade mit eigener Route, alles andere ist im AP-Modus ein Redirect
pub const KNOWN_PATHS: [&str; 4] = ["/", "/status", "/scan", "/config"];

const HTML_HEADER: &str = "HTTP/1.1 200 OK\r\nContent-type: text/html\r\n\r\n";
const JSON_HEADER: &str = "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\n\r\n";
const NOT_FOUND: &str = "HTTP/1.1 404 Not Found\r\n\r\n<h1>404</h1>";
const SAVE_FAILED: &str =
    "HTTP/1.1 500 Internal Server Error\r\n\r\n<h1>500</h1><p>Configuration not saved.</p>";
const SAVED_PAGE: &str = "<html><body><h1>Configuration Saved!</h1><p>Device will reboot...</p></body></html>";

// ============================================================================
// Parser
// ============================================================================

/// Erste Zeile eines Requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestLine<'a> {
    pub method: &'a str,
    pub path: &'a str,
    /// Alles nach dem ersten `?`, auch wenn leer
    pub query: Option<&'a str>,
}

/// `None` wenn sich die erste Zeile nicht in Methode, Ziel und Version
/// zerlegen lässt
pub fn parse_request_line(request: &str) -> Option<RequestLine<'_>> {
    let line = request.lines().next()?;
    let mut parts = line.splitn(3, ' ');
    let method = parts.next()?;
    let target = parts.next()?;
    parts.next()?;

    let (path, query) = match target.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (target, None),
    };
    Some(RequestLine {
        method,
        path,
        query,
    })
}

// ============================================================================
// Routing
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route<'a> {
    /// `GET /` ohne Query
    ConfigPage,
    /// `GET /?...`, Query-String ist das Formular
    SubmitConfig(&'a str),
    Status,
    Config,
    /// `GET /scan`, Query-String enthält optional `ssid`
    Scan(&'a str),
    CaptiveRedirect,
    NotFound,
}

/// Ordnet einen Request einer Route zu
///
/// Im AP-Modus hat der Captive-Redirect für unbekannte Pfade Vorrang.
pub fn route<'a>(request: &RequestLine<'a>, mode: NetworkMode) -> Route<'a> {
    let known = KNOWN_PATHS.contains(&request.path);
    if mode == NetworkMode::AccessPoint && !known {
        return Route::CaptiveRedirect;
    }
    if request.method != "GET" {
        return Route::NotFound;
    }

    match (request.path, request.query) {
        ("/", None) => Route::ConfigPage,
        ("/", Some(form)) => Route::SubmitConfig(form),
        ("/status", _) => Route::Status,
        ("/config", _) => Route::Config,
        ("/scan", query) => Route::Scan(query.unwrap_or("")),
        _ => Route::NotFound,
    }
}

// ============================================================================
// JSON Bodies
// ============================================================================

#[derive(Serialize)]
pub struct StatusReport<'a> {
    pub status: &'a str,
    pub gpio_value: u8,
}

#[derive(Serialize)]
pub struct ScanReport {
    pub found: bool,
}

// ============================================================================
// Antworten
// ============================================================================

async fn send<C: Write>(conn: &mut C, bytes: &[u8]) -> Result<(), HttpError> {
    conn.write_all(bytes).await.map_err(|_| HttpError::WriteFailed)
}

/// Streamt die Konfigurationsseite in [`PAGE_CHUNK_SIZE`] Stücken
pub async fn send_page<C: Write>(conn: &mut C, page: &[u8]) -> Result<(), HttpError> {
    send(conn, HTML_HEADER.as_bytes()).await?;
    for chunk in page.chunks(PAGE_CHUNK_SIZE) {
        send(conn, chunk).await?;
    }
    Ok(())
}

/// JSON-Antwort aus einem fertig kodierten Body
pub async fn send_json_body<C: Write>(conn: &mut C, body: &[u8]) -> Result<(), HttpError> {
    send(conn, JSON_HEADER.as_bytes()).await?;
    send(conn, body).await
}

pub async fn send_json<C: Write, T: Serialize>(conn: &mut C, value: &T) -> Result<(), HttpError> {
    let mut body = [0u8; JSON_BUFFER_SIZE];
    let len = serde_json_core::to_slice(value, &mut body).map_err(|_| HttpError::ResponseTooLarge)?;
    send_json_body(conn, &body[..len]).await
}

/// Captive-Portal Redirect auf die eigene Adresse
pub async fn send_redirect<C: Write>(conn: &mut C, address: Ipv4Addr) -> Result<(), HttpError> {
    let mut response: String<64> = String::new();
    write!(
        response,
        "HTTP/1.1 302 Found\r\nLocation: http://{}\r\n\r\n",
        ip_text(address).as_str()
    )
    .map_err(|_| HttpError::ResponseTooLarge)?;
    send(conn, response.as_bytes()).await
}

pub async fn send_not_found<C: Write>(conn: &mut C) -> Result<(), HttpError> {
    send(conn, NOT_FOUND.as_bytes()).await
}

/// Bestätigung nach erfolgreichem Speichern
pub async fn send_config_saved<C: Write>(conn: &mut C) -> Result<(), HttpError> {
    send(conn, HTML_HEADER.as_bytes()).await?;
    send(conn, SAVED_PAGE.as_bytes()).await
}

pub async fn send_save_failed<C: Write>(conn: &mut C) -> Result<(), HttpError> {
    send(conn, SAVE_FAILED.as_bytes()).await
}
