// System - Uhr, Heap-Überwachung und Neustart

use defmt::{info, warn};
use embassy_time::Instant;

use cnc_core::SystemControl;

use crate::config::LOW_HEAP_WARNING_BYTES;

/// ESP32-C3 System-Funktionen
pub struct EspSystem {
    /// Warnung nur einmal pro Unterschreitung
    low_heap: bool,
}

impl EspSystem {
    pub fn new() -> Self {
        info!("System: Heap free: {} bytes", esp_alloc::HEAP.free());
        Self { low_heap: false }
    }
}

impl Default for EspSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemControl for EspSystem {
    fn uptime_ms(&self) -> u64 {
        Instant::now().as_millis()
    }

    fn housekeeping(&mut self) {
        let free = esp_alloc::HEAP.free();
        if free < LOW_HEAP_WARNING_BYTES {
            if !self.low_heap {
                warn!("System: Low heap: {} bytes free", free);
                self.low_heap = true;
            }
        } else if self.low_heap {
            info!("System: Heap recovered: {} bytes free", free);
            self.low_heap = false;
        }
    }

    fn restart(&mut self) -> ! {
        info!("System: Restarting...");
        esp_hal::system::software_reset()
    }
}
