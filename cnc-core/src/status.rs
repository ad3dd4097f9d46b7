//! Status Source - Digital-Eingang der Maschine
//!
//! Kein interner Zustand: jeder Aufruf liest den Pin neu.

use embedded_hal::digital::InputPin;

use crate::types::StatusValue;

/// Liest den Maschinenstatus von einem Pull-Down-Eingang
pub struct StatusSource<P> {
    pin: P,
}

impl<P: InputPin> StatusSource<P> {
    pub fn new(pin: P) -> Self {
        Self { pin }
    }

    /// Liefert Status und rohen Pin-Wert (0/1)
    ///
    /// Ein Lesefehler zählt als LOW (OFFLINE).
    pub fn sample(&mut self) -> (StatusValue, u8) {
        let high = match self.pin.is_high() {
            Ok(high) => high,
            Err(_) => {
                warn!("Status: GPIO read failed, reporting OFFLINE");
                false
            }
        };
        (StatusValue::from_level(high), u8::from(high))
    }

    pub fn read(&mut self) -> StatusValue {
        self.sample().0
    }
}
