//! 3x4 matrix keypad: raw state decoding and settle-time debouncing.
//!
//! Raw state byte: one bit per row in bits 0..3 (row 1 = bit 0), one bit per
//! column in bits 4..6 (column 1 = bit 4). A single pressed key therefore sets
//! exactly one row bit and one column bit.
//!
//! Debouncing is by settle time, not by sample count, so it does not depend on
//! how often the main loop gets around to polling.

/// Source of raw matrix samples (the GPIO scan on the board).
pub trait KeypadMatrix {
    fn sample(&mut self) -> u8;
}

/// Map a raw matrix state to its key. Anything that is not exactly one key
/// (nothing pressed, several keys, a glitch) decodes to `None`.
pub fn decode(raw: u8) -> Option<char> {
    let key = match raw {
        0b001_0001 => '1', // first row
        0b010_0001 => '2',
        0b100_0001 => '3',
        0b001_0010 => '4', // second row
        0b010_0010 => '5',
        0b100_0010 => '6',
        0b001_0100 => '7', // third row
        0b010_0100 => '8',
        0b100_0100 => '9',
        0b001_1000 => '*', // fourth row
        0b010_1000 => '0',
        0b100_1000 => '#',
        _ => return None,
    };
    Some(key)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebouncePhase {
    /// Raw state changed at `since`.
    Unsettled { since: u64 },
    /// Unchanged since `since`, not yet stable long enough.
    SettledUnreported { since: u64 },
    /// Reported (or decoded to nothing); silent until the raw state changes.
    SettledReported,
}

pub struct InputDebouncer {
    last_raw: u8,
    phase: DebouncePhase,
    settle_ms: u64,
}

impl InputDebouncer {
    pub const fn new(settle_ms: u16) -> Self {
        Self {
            last_raw: 0,
            // Idle keypad at boot is considered already handled
            phase: DebouncePhase::SettledReported,
            settle_ms: settle_ms as u64,
        }
    }

    pub fn phase(&self) -> DebouncePhase {
        self.phase
    }

    /// Feed one raw sample taken at `now_ms`. Returns a key exactly once per
    /// settled press.
    pub fn poll(&mut self, raw: u8, now_ms: u64) -> Option<char> {
        if raw != self.last_raw {
            self.last_raw = raw;
            self.phase = DebouncePhase::Unsettled { since: now_ms };
            return None;
        }

        let since = match self.phase {
            DebouncePhase::SettledReported => return None,
            DebouncePhase::Unsettled { since } | DebouncePhase::SettledUnreported { since } => since,
        };

        if now_ms.saturating_sub(since) < self.settle_ms {
            self.phase = DebouncePhase::SettledUnreported { since };
            return None;
        }

        self.phase = DebouncePhase::SettledReported;
        let key = decode(raw);
        if key.is_none() && raw != 0 {
            log::debug!("keypad: ignoring raw state {:#04x}", raw);
        }
        key
    }
}
