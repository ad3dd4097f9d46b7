//! Anzeige-Modell für das 128x64 OLED
//!
//! Der Core baut nur Textzeilen mit Position, das Zeichnen übernimmt ein
//! [`ScreenRenderer`] der Firmware (OLED oder Log).

use core::fmt::Write as _;

use heapless::{Deque, String, Vec};

use crate::traits::DisplaySink;
use crate::types::StatusValue;

/// Zeichen pro Zeile (6x10 Font auf 128 Pixel)
pub const SCREEN_COLUMNS: usize = 21;
/// Gespeicherte Debug-Zeilen
pub const DEBUG_HISTORY: usize = 10;
/// Sichtbare Debug-Zeilen auf dem Status-Screen
pub const DEBUG_VISIBLE: usize = 2;

pub type ScreenLine = String<SCREEN_COLUMNS>;

/// Kürzt auf [`SCREEN_COLUMNS`] Zeichen, mit "..." am Ende
pub fn truncate_line(text: &str) -> ScreenLine {
    let mut line = ScreenLine::new();
    if text.chars().count() <= SCREEN_COLUMNS {
        let _ = line.push_str(text);
        return line;
    }
    for c in text.chars().take(SCREEN_COLUMNS - 3) {
        let _ = line.push(c);
    }
    let _ = line.push_str("...");
    line
}

fn labeled(label: &str, value: &str) -> ScreenLine {
    let mut text: String<96> = String::new();
    let _ = write!(text, "{}{}", label, value);
    truncate_line(&text)
}

// ============================================================================
// Screens
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextLine {
    /// Obere Kante in Pixeln
    pub y: u8,
    pub text: ScreenLine,
    pub centered: bool,
}

/// Ein kompletter Bildschirm-Inhalt
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Screen {
    pub lines: Vec<TextLine, 8>,
    /// Horizontale Trennlinie bei y
    pub rule_y: Option<u8>,
}

impl Screen {
    fn text(mut self, y: u8, text: ScreenLine) -> Self {
        let _ = self.lines.push(TextLine { y, text, centered: false });
        self
    }

    fn centered(mut self, y: u8, text: ScreenLine) -> Self {
        let _ = self.lines.push(TextLine { y, text, centered: true });
        self
    }

    fn rule(mut self, y: u8) -> Self {
        self.rule_y = Some(y);
        self
    }

    /// Zeilen in Anzeigereihenfolge als Text (für Log und Tests)
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(|line| line.text.as_str())
    }
}

pub fn status_screen<'a>(
    status: StatusValue,
    ssid: &str,
    ip: &str,
    debug: impl Iterator<Item = &'a ScreenLine>,
) -> Screen {
    let mut screen = Screen::default()
        .text(0, labeled("Status: ", status.as_str()))
        .text(10, labeled("SSID: ", ssid))
        .text(20, labeled("IP: ", ip))
        .rule(32)
        .text(35, truncate_line("Debug:"));
    for (row, line) in debug.enumerate() {
        screen = screen.text(45 + 9 * row as u8, line.clone());
    }
    screen
}

pub fn connecting_screen(ssid: &str, retries_left: u8) -> Screen {
    let mut retries: String<8> = String::new();
    let _ = write!(retries, "{}", retries_left);
    Screen::default()
        .text(0, truncate_line("Status: Connecting..."))
        .text(20, labeled("Target: ", ssid))
        .text(40, labeled("Retries left: ", &retries))
}

pub fn access_point_screen(ssid: &str, password: &str) -> Screen {
    Screen::default()
        .centered(0, truncate_line(">> AP FALLBACK <<"))
        .text(15, labeled("SSID: ", ssid))
        .text(25, labeled("Pass: ", password))
        .text(40, truncate_line("Please connect and"))
        .text(50, truncate_line("config new SSID."))
}

// ============================================================================
// Debug-Zeilen
// ============================================================================

/// Ringpuffer der letzten Debug-Meldungen
#[derive(Debug, Default)]
pub struct DebugLines {
    lines: Deque<ScreenLine, DEBUG_HISTORY>,
}

impl DebugLines {
    pub fn push(&mut self, text: &str) {
        if self.lines.is_full() {
            self.lines.pop_front();
        }
        let _ = self.lines.push_back(truncate_line(text));
    }

    /// Die letzten [`DEBUG_VISIBLE`] Zeilen, älteste zuerst
    pub fn recent(&self) -> impl Iterator<Item = &ScreenLine> {
        self.lines.iter().skip(self.lines.len().saturating_sub(DEBUG_VISIBLE))
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

// ============================================================================
// DisplaySink auf Basis eines Renderers
// ============================================================================

/// Zeichnet einen fertigen Screen
pub trait ScreenRenderer {
    fn render(&mut self, screen: &Screen);
}

/// [`DisplaySink`] für beliebige Renderer
///
/// Debug-Zeilen werden gesammelt und beim nächsten Status-Screen
/// angezeigt, aber nicht sofort neu gezeichnet.
pub struct TextDisplay<R> {
    renderer: R,
    debug: DebugLines,
}

impl<R: ScreenRenderer> TextDisplay<R> {
    pub fn new(renderer: R) -> Self {
        Self {
            renderer,
            debug: DebugLines::default(),
        }
    }

    pub fn debug_lines(&self) -> &DebugLines {
        &self.debug
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }
}

impl<R: ScreenRenderer> DisplaySink for TextDisplay<R> {
    fn show_status(&mut self, status: StatusValue, ssid: &str, ip: &str) {
        let screen = status_screen(status, ssid, ip, self.debug.recent());
        self.renderer.render(&screen);
    }

    fn show_connecting(&mut self, ssid: &str, retries_left: u8) {
        self.renderer.render(&connecting_screen(ssid, retries_left));
    }

    fn show_access_point(&mut self, ssid: &str, password: &str) {
        self.renderer.render(&access_point_screen(ssid, password));
    }

    fn debug_line(&mut self, line: &str) {
        info!("Display: {}", line);
        self.debug.push(line);
    }
}
