//! Build script for compile-time configuration injection.
//!
//! Set environment variables before building to configure the firmware:
//!
//!   TERMINAL_BAUD=19200 \
//!   TERMINAL_LCD_WIDTH=16 \
//!   TERMINAL_DEBOUNCE_MS=50 \
//!   cargo build --release --features esp32
//!
//! Optional command sets are Cargo features: `lcd` (otherwise LEDs),
//! `baud-change`, `rename`, `rfid-debug` and `access-list`.

fn main() {
    // Re-run build script if these environment variables change
    println!("cargo::rerun-if-env-changed=TERMINAL_BAUD");
    println!("cargo::rerun-if-env-changed=TERMINAL_LCD_WIDTH");
    println!("cargo::rerun-if-env-changed=TERMINAL_DEBOUNCE_MS");
}
