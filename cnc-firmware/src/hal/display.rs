// Display - SSD1306 OLED (128x64, I2C) oder Log-Ausgabe
//
// cnc-core liefert fertige Screens (Textzeilen mit Position), hier wird
// nur gezeichnet. Ohne Display läuft alles über defmt.

use defmt::{info, warn};
use embedded_graphics::mono_font::MonoTextStyle;
use embedded_graphics::mono_font::ascii::FONT_6X10;
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{Line, PrimitiveStyle};
use embedded_graphics::text::{Baseline, Text};
use esp_hal::Blocking;
use esp_hal::i2c::master::I2c;
use ssd1306::mode::BufferedGraphicsMode;
use ssd1306::prelude::*;
use ssd1306::{I2CDisplayInterface, Ssd1306};

use cnc_core::display::{Screen, ScreenRenderer};

/// Displaybreite in Pixeln
const DISPLAY_WIDTH: i32 = 128;
/// Zeichenbreite des 6x10 Fonts
const CHAR_WIDTH: i32 = 6;

type OledDriver = Ssd1306<
    I2CInterface<I2c<'static, Blocking>>,
    DisplaySize128x64,
    BufferedGraphicsMode<DisplaySize128x64>,
>;

/// SSD1306 über I2C
pub struct OledRenderer {
    display: OledDriver,
}

impl OledRenderer {
    /// Initialisiert das Display, `None` wenn es nicht antwortet
    pub fn new(i2c: I2c<'static, Blocking>) -> Option<Self> {
        let interface = I2CDisplayInterface::new(i2c);
        let mut display = Ssd1306::new(interface, DisplaySize128x64, DisplayRotation::Rotate0)
            .into_buffered_graphics_mode();

        if let Err(e) = display.init() {
            warn!("Display: SSD1306 init failed: {}", defmt::Debug2Format(&e));
            return None;
        }
        display.clear_buffer();
        if display.flush().is_err() {
            warn!("Display: SSD1306 not responding");
            return None;
        }

        info!("Display: SSD1306 initialized");
        Some(Self { display })
    }

    /// Zeichnet in den Framebuffer und überträgt ihn per I2C
    fn draw(&mut self, screen: &Screen) {
        let style = MonoTextStyle::new(&FONT_6X10, BinaryColor::On);
        self.display.clear_buffer();

        // Zeichnen in den Framebuffer schlägt nie fehl, nur flush() spricht I2C
        for line in &screen.lines {
            let x = if line.centered {
                let width = line.text.chars().count() as i32 * CHAR_WIDTH;
                ((DISPLAY_WIDTH - width) / 2).max(0)
            } else {
                0
            };
            let _ = Text::with_baseline(
                line.text.as_str(),
                Point::new(x, i32::from(line.y)),
                style,
                Baseline::Top,
            )
            .draw(&mut self.display);
        }

        if let Some(y) = screen.rule_y {
            let y = i32::from(y);
            let _ = Line::new(Point::new(0, y), Point::new(DISPLAY_WIDTH - 1, y))
                .into_styled(PrimitiveStyle::with_stroke(BinaryColor::On, 1))
                .draw(&mut self.display);
        }

        if let Err(e) = self.display.flush() {
            warn!("Display: Flush failed: {}", defmt::Debug2Format(&e));
        }
    }
}

impl ScreenRenderer for OledRenderer {
    fn render(&mut self, screen: &Screen) {
        self.draw(screen);
    }
}

/// Fallback ohne Display: Screens als Log-Zeilen
pub struct LogRenderer;

impl ScreenRenderer for LogRenderer {
    fn render(&mut self, screen: &Screen) {
        for text in screen.texts() {
            info!("Screen: {}", text);
        }
    }
}

/// Display-Variante, zur Laufzeit gewählt
pub enum DisplayBackend {
    Oled(OledRenderer),
    Log(LogRenderer),
}

impl ScreenRenderer for DisplayBackend {
    fn render(&mut self, screen: &Screen) {
        match self {
            DisplayBackend::Oled(oled) => oled.render(screen),
            DisplayBackend::Log(log) => log.render(screen),
        }
    }
}
