//! Build-time configuration and the active capability set.
//!
//! Values come from environment variables at compile time (see `build.rs`);
//! the optional command sets come from Cargo features. Both are plain data so
//! tests can construct any combination.

use crate::serial::DEFAULT_BAUD;

/// Debounce settle time when `TERMINAL_DEBOUNCE_MS` is not set.
pub const DEFAULT_DEBOUNCE_MS: u16 = 50;
pub const DEFAULT_LCD_WIDTH: u8 = 24;

/// Compile-time terminal configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildConfig {
    /// Baud rate used when non-volatile memory holds none.
    pub default_baud: u16,
    pub lcd_width: u8,
    pub debounce_ms: u16,
}

impl BuildConfig {
    /// Get the compile-time configuration.
    pub const fn get() -> Self {
        Self {
            default_baud: match option_env!("TERMINAL_BAUD") {
                Some(s) => parse_or(s, DEFAULT_BAUD),
                None => DEFAULT_BAUD,
            },
            lcd_width: match option_env!("TERMINAL_LCD_WIDTH") {
                Some(s) => parse_or(s, DEFAULT_LCD_WIDTH as u16) as u8,
                None => DEFAULT_LCD_WIDTH,
            },
            debounce_ms: match option_env!("TERMINAL_DEBOUNCE_MS") {
                Some(s) => parse_or(s, DEFAULT_DEBOUNCE_MS),
                None => DEFAULT_DEBOUNCE_MS,
            },
        }
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self::get()
    }
}

/// Parse a decimal number at compile time; non-digits are skipped and 0 means
/// "use the fallback".
pub const fn parse_or(s: &str, fallback: u16) -> u16 {
    let bytes = s.as_bytes();
    let mut result: u16 = 0;
    let mut i = 0;
    while i < bytes.len() {
        let digit = bytes[i];
        if digit >= b'0' && digit <= b'9' {
            result = result.wrapping_mul(10).wrapping_add((digit - b'0') as u16);
        }
        i += 1;
    }
    if result == 0 { fallback } else { result }
}

/// What the indicator port is wired to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorKind {
    /// Two-row character LCD, driven with `M<row><text>`.
    Lcd,
    /// Red/green/blue LEDs, driven with `L[RGB]`.
    Led,
}

/// Optional command sets active in this build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub indicator: IndicatorKind,
    /// `B<baud>`
    pub baud_change: bool,
    /// `N<name>`
    pub rename: bool,
    /// `r` register dump
    pub rfid_debug: bool,
    /// Lock mode: local UID allow-list with first-card enrollment, `a` command
    pub access_list: bool,
}

impl Capabilities {
    /// Capabilities selected by Cargo features.
    pub const fn from_features() -> Self {
        Self {
            indicator: if cfg!(feature = "lcd") {
                IndicatorKind::Lcd
            } else {
                IndicatorKind::Led
            },
            baud_change: cfg!(feature = "baud-change"),
            rename: cfg!(feature = "rename"),
            rfid_debug: cfg!(feature = "rfid-debug"),
            access_list: cfg!(feature = "access-list"),
        }
    }

    /// Everything enabled, LCD output.
    pub const fn all() -> Self {
        Self {
            indicator: IndicatorKind::Lcd,
            baud_change: true,
            rename: true,
            rfid_debug: true,
            access_list: true,
        }
    }

    /// Only the always-present commands, LED output.
    pub const fn minimal() -> Self {
        Self {
            indicator: IndicatorKind::Led,
            baud_change: false,
            rename: false,
            rfid_debug: false,
            access_list: false,
        }
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::from_features()
    }
}
