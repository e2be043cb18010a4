//! Indicator outputs: LCD rows or LEDs, auxiliary port bits, and the tone
//! generator.

/// Tone pitches and durations used by the terminal.
pub const LOW_TONE_HZ: u16 = 300;
pub const HIGH_TONE_HZ: u16 = 1200;
pub const DEFAULT_TONE_MS: u16 = 250;
pub const KEY_CLICK_HZ: u16 = 1000;
pub const KEY_CLICK_MS: u16 = 30;
pub const ACCESS_GRANTED_MS: u16 = 100;

/// Bits of the auxiliary port the host may drive with `S<hex>`.
pub const AUX_MASK: u8 = 0x3F;

/// LED combination for terminals built without an LCD.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Leds {
    pub red: bool,
    pub green: bool,
    pub blue: bool,
}

impl Leds {
    pub const OFF: Leds = Leds {
        red: false,
        green: false,
        blue: false,
    };

    /// Parse a colour list such as `RG` or `b` (case-insensitive, unknown
    /// letters ignored).
    pub fn from_letters(letters: &[u8]) -> Self {
        let mut leds = Leds::OFF;
        for &letter in letters {
            match letter.to_ascii_uppercase() {
                b'R' => leds.red = true,
                b'G' => leds.green = true,
                b'B' => leds.blue = true,
                _ => {}
            }
        }
        leds
    }
}

/// Text/LED output. Which half is used depends on the build's
/// `IndicatorKind`; drivers may ignore the other half.
pub trait IndicatorOutput {
    /// Write text to display row 0 or 1, truncated or space-padded to the
    /// display width. Fire-and-forget.
    fn write(&mut self, row: u8, text: &str);

    fn set_leds(&mut self, leds: Leds);

    /// Drive the auxiliary port. Only bits in `AUX_MASK` are passed.
    fn set_aux(&mut self, bits: u8);
}

/// Self-terminating tone output; `play` returns immediately.
pub trait ToneGenerator {
    fn play(&mut self, hz: u16, duration_ms: u16);
}
