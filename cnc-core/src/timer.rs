//! Periodische Software-Timer
//!
//! Ersetzt Hardware-Timer-Callbacks: der Supervisor fragt die Timer in
//! seinem eigenen Loop ab, dadurch laufen "Callbacks" nie parallel zum
//! Hauptzustand.

/// Timer mit fester Periode auf Basis der Uptime in Millisekunden
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodicTimer {
    period_ms: u64,
    next_due_ms: u64,
}

impl PeriodicTimer {
    /// Erste Auslösung nach einer vollen Periode ab `now_ms`
    pub fn new(period_ms: u64, now_ms: u64) -> Self {
        let period_ms = period_ms.max(1);
        Self {
            period_ms,
            next_due_ms: now_ms.saturating_add(period_ms),
        }
    }

    pub fn period_ms(&self) -> u64 {
        self.period_ms
    }

    /// `true` wenn der Timer seit dem letzten Aufruf abgelaufen ist
    ///
    /// Verpasste Perioden werden zu einer Auslösung zusammengefasst.
    pub fn poll(&mut self, now_ms: u64) -> bool {
        if now_ms < self.next_due_ms {
            return false;
        }
        let missed = (now_ms - self.next_due_ms) / self.period_ms;
        self.next_due_ms += (missed + 1) * self.period_ms;
        true
    }
}
