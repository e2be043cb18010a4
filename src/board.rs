//! ESP32 drivers behind the terminal's collaborator traits.
//!
//! Pin assignment (ESP32 DevKit, console log stays on UART0):
//! - Host link: UART2, GPIO16 RX, GPIO17 TX
//! - MFRC522: SPI2, SCK GPIO18, MISO GPIO19, MOSI GPIO23, CS GPIO5
//! - Keypad: rows GPIO34, GPIO35, GPIO36, GPIO39 (external pull-downs),
//!   columns GPIO25, GPIO26, GPIO27
//! - LCD (HD44780, 4-bit): RS GPIO13, E GPIO12, D4..D7 GPIO14, GPIO15, GPIO4, GPIO2
//! - LEDs (builds without LCD): red GPIO13, green GPIO12, blue GPIO14
//! - Buzzer: GPIO21 via LEDC
//! - Auxiliary port bits 0..3: GPIO22, GPIO32, GPIO33, GPIO0. Bits 4 and 5
//!   are not wired on this board.

use core::cell::RefCell;

use critical_section::Mutex;
use esp_hal::delay::Delay;
use esp_hal::gpio::{AnyPin, Input, Level, Output};
use esp_hal::handler;
use esp_hal::ledc::{channel, timer, LSGlobalClkSource, Ledc, LowSpeed};
use esp_hal::time::Rate;
use esp_hal::uart::{Config as UartConfig, RxConfig, Uart, UartInterrupt};
use esp_hal::Blocking;
use mfrc522::comm::blocking::spi::SpiInterface;
use mfrc522::{AtqA, Initialized, Mfrc522};

use access_terminal::indicator::{IndicatorOutput, Leds, ToneGenerator};
use access_terminal::keypad::KeypadMatrix;
use access_terminal::reader::{CardReader, ReaderError, Uid};
use access_terminal::ring_buffer::{Producer, RX_BUFFER_SIZE};
use access_terminal::serial::Transmitter;

/// Milliseconds since boot.
pub fn now_ms() -> u64 {
    esp_hal::time::Instant::now().duration_since_epoch().as_millis()
}

// ============================================================================
// Host UART
// ============================================================================

// The UART is shared between the RX interrupt and the main loop's transmit
// path; the producer is only ever touched by the interrupt.
/// Host UART settings. Interrupt on every received byte so the FIFO never
/// overflows while the main loop is busy. Baud changes rebuild the whole
/// config through here.
pub fn host_uart_config(baud: u16) -> UartConfig {
    UartConfig::default()
        .with_baudrate(baud as u32)
        .with_rx(RxConfig::default().with_fifo_full_threshold(1))
}

static HOST_UART: Mutex<RefCell<Option<Uart<'static, Blocking>>>> = Mutex::new(RefCell::new(None));
static RX_PRODUCER: Mutex<RefCell<Option<Producer<'static, RX_BUFFER_SIZE>>>> =
    Mutex::new(RefCell::new(None));

/// Drain the RX FIFO into the ring buffer. Full buffer: bytes are counted as
/// dropped, never waited for.
#[handler]
fn host_uart_handler() {
    critical_section::with(|cs| {
        let mut uart = HOST_UART.borrow_ref_mut(cs);
        let mut producer = RX_PRODUCER.borrow_ref_mut(cs);
        let (Some(uart), Some(producer)) = (uart.as_mut(), producer.as_mut()) else {
            return;
        };

        let mut chunk = [0u8; 16];
        while let Ok(n) = uart.read_buffered(&mut chunk) {
            if n == 0 {
                break;
            }
            for &byte in &chunk[..n] {
                producer.try_push(byte);
            }
        }
        uart.clear_interrupts(UartInterrupt::RxFifoFull | UartInterrupt::RxTimeout);
    });
}

/// Install the host UART and the ring buffer producer, then enable RX
/// interrupts. Called once at boot.
pub fn install_host_uart(mut uart: Uart<'static, Blocking>, producer: Producer<'static, RX_BUFFER_SIZE>) {
    uart.set_interrupt_handler(host_uart_handler);
    uart.listen(UartInterrupt::RxFifoFull | UartInterrupt::RxTimeout);
    critical_section::with(|cs| {
        RX_PRODUCER.borrow_ref_mut(cs).replace(producer);
        HOST_UART.borrow_ref_mut(cs).replace(uart);
    });
}

/// Transmit half of the host link.
pub struct HostTransmitter {
    baud: u16,
}

impl HostTransmitter {
    pub fn new(baud: u16) -> Self {
        Self { baud }
    }
}

impl Transmitter for HostTransmitter {
    fn transmit(&mut self, byte: u8) {
        loop {
            let sent = critical_section::with(|cs| match HOST_UART.borrow_ref_mut(cs).as_mut() {
                Some(uart) => matches!(uart.write(&[byte]), Ok(1)),
                None => true,
            });
            if sent {
                return;
            }
            core::hint::spin_loop();
        }
    }

    fn baud(&self) -> u16 {
        self.baud
    }

    fn set_baud(&mut self, baud: u16) {
        let applied = critical_section::with(|cs| match HOST_UART.borrow_ref_mut(cs).as_mut() {
            Some(uart) => {
                // Finish the pending reply at the old rate first
                let _ = uart.flush();
                uart.apply_config(&host_uart_config(baud))
                    .is_ok()
            }
            None => false,
        });
        if applied {
            self.baud = baud;
        } else {
            log::error!("serial: cannot switch to {} baud", baud);
        }
    }
}

// ============================================================================
// Keypad
// ============================================================================

pub struct GpioKeypad {
    rows: [Input<'static>; 4],
    columns: [Output<'static>; 3],
    delay: Delay,
}

impl GpioKeypad {
    pub fn new(rows: [Input<'static>; 4], columns: [Output<'static>; 3]) -> Self {
        Self {
            rows,
            columns,
            delay: Delay::new(),
        }
    }
}

impl KeypadMatrix for GpioKeypad {
    fn sample(&mut self) -> u8 {
        let mut raw = 0u8;
        for (col, column) in self.columns.iter_mut().enumerate() {
            column.set_high();
            self.delay.delay_micros(5);
            let mut row_bits = 0u8;
            for (row, input) in self.rows.iter().enumerate() {
                if input.is_high() {
                    row_bits |= 1 << row;
                }
            }
            if row_bits != 0 {
                raw |= row_bits | (1 << (4 + col));
            }
            column.set_low();
        }
        raw
    }
}

// ============================================================================
// Indicator: HD44780 LCD, LEDs, auxiliary port
// ============================================================================

const LCD_ROW_ADDRESS: [u8; 2] = [0x00, 0x40];

pub struct Hd44780 {
    rs: Output<'static>,
    enable: Output<'static>,
    data: [Output<'static>; 4],
    width: u8,
    delay: Delay,
}

impl Hd44780 {
    pub fn new(rs: Output<'static>, enable: Output<'static>, data: [Output<'static>; 4], width: u8) -> Self {
        let mut lcd = Self {
            rs,
            enable,
            data,
            width,
            delay: Delay::new(),
        };
        lcd.init();
        lcd
    }

    fn init(&mut self) {
        self.delay.delay_millis(50);
        self.rs.set_low();
        // Three times 8-bit mode, then switch to 4-bit
        for _ in 0..3 {
            self.write_nibble(0x03);
            self.delay.delay_millis(5);
        }
        self.write_nibble(0x02);
        self.command(0x28); // 4-bit, 2 lines, 5x8
        self.command(0x0C); // display on, no cursor
        self.command(0x06); // entry mode: increment
        self.command(0x01); // clear
        self.delay.delay_millis(2);
    }

    fn write_nibble(&mut self, nibble: u8) {
        for (bit, pin) in self.data.iter_mut().enumerate() {
            pin.set_level(Level::from(nibble & (1 << bit) != 0));
        }
        self.enable.set_high();
        self.delay.delay_micros(1);
        self.enable.set_low();
        self.delay.delay_micros(50);
    }

    fn write_byte(&mut self, byte: u8, is_data: bool) {
        self.rs.set_level(Level::from(is_data));
        self.write_nibble(byte >> 4);
        self.write_nibble(byte & 0x0F);
    }

    fn command(&mut self, command: u8) {
        self.write_byte(command, false);
    }

    /// Overwrite a whole row, space padded.
    pub fn write_row(&mut self, row: u8, text: &str) {
        self.command(0x80 | LCD_ROW_ADDRESS[(row & 1) as usize]);
        let mut bytes = text.bytes();
        for _ in 0..self.width {
            let byte = bytes.next().unwrap_or(b' ');
            self.write_byte(byte, true);
        }
    }
}

/// The LCD and the LEDs share pins; a build drives one or the other.
pub enum Display {
    Lcd(Hd44780),
    Leds([Output<'static>; 3]),
}

pub struct BoardIndicator {
    display: Display,
    aux: [Output<'static>; 4],
}

impl BoardIndicator {
    pub fn new(display: Display, aux: [Output<'static>; 4]) -> Self {
        Self { display, aux }
    }
}

impl IndicatorOutput for BoardIndicator {
    fn write(&mut self, row: u8, text: &str) {
        if let Display::Lcd(lcd) = &mut self.display {
            lcd.write_row(row, text);
        }
    }

    fn set_leds(&mut self, leds: Leds) {
        if let Display::Leds([red, green, blue]) = &mut self.display {
            red.set_level(Level::from(leds.red));
            green.set_level(Level::from(leds.green));
            blue.set_level(Level::from(leds.blue));
        }
    }

    fn set_aux(&mut self, bits: u8) {
        for (bit, pin) in self.aux.iter_mut().enumerate() {
            pin.set_level(Level::from(bits & (1 << bit) != 0));
        }
    }
}

// ============================================================================
// Tone
// ============================================================================

/// Square wave on the buzzer pin. `play` starts the tone and returns;
/// `service` from the main loop ends it.
pub struct LedcTone {
    ledc: Ledc<'static>,
    pin: AnyPin<'static>,
    stop_at_ms: Option<u64>,
}

impl LedcTone {
    pub fn new(mut ledc: Ledc<'static>, pin: AnyPin<'static>) -> Self {
        ledc.set_global_slow_clock(LSGlobalClkSource::APBClk);
        Self {
            ledc,
            pin,
            stop_at_ms: None,
        }
    }

    fn set_output(&mut self, hz: u16, duty_pct: u8) -> bool {
        use esp_hal::ledc::channel::ChannelIFace;
        use esp_hal::ledc::timer::TimerIFace;

        let mut tone_timer = self.ledc.timer::<LowSpeed>(timer::Number::Timer0);
        let timer_config = timer::config::Config {
            duty: timer::config::Duty::Duty10Bit,
            clock_source: timer::LSClockSource::APBClk,
            frequency: Rate::from_hz(hz.max(1) as u32),
        };
        if tone_timer.configure(timer_config).is_err() {
            return false;
        }

        let mut tone_channel = self.ledc.channel(channel::Number::Channel0, self.pin.reborrow());
        tone_channel
            .configure(channel::config::Config {
                timer: &tone_timer,
                duty_pct,
                pin_config: channel::config::PinConfig::PushPull,
            })
            .is_ok()
    }

    /// Stop the tone once its time is up.
    pub fn service(&mut self, now_ms: u64) {
        if let Some(stop_at) = self.stop_at_ms {
            if now_ms >= stop_at {
                self.stop_at_ms = None;
                self.set_output(1000, 0);
            }
        }
    }
}

impl ToneGenerator for LedcTone {
    fn play(&mut self, hz: u16, duration_ms: u16) {
        if self.set_output(hz, 50) {
            self.stop_at_ms = Some(now_ms() + duration_ms as u64);
        } else {
            log::warn!("tone: cannot play {} Hz", hz);
        }
    }
}

// ============================================================================
// MFRC522
// ============================================================================

/// The reset pin is tied high on this board; `reset` re-runs the driver's
/// soft reset and initialisation.
pub struct Mfrc522Reader<SPI: embedded_hal::spi::SpiDevice> {
    device: Option<Mfrc522<SpiInterface<SPI>, Initialized>>,
    atqa: Option<AtqA>,
}

impl<SPI: embedded_hal::spi::SpiDevice> Mfrc522Reader<SPI> {
    pub fn new(spi: SPI) -> Self {
        let mut reader = Self {
            device: None,
            atqa: None,
        };
        reader.start(SpiInterface::new(spi));
        reader
    }

    fn start(&mut self, interface: SpiInterface<SPI>) {
        match Mfrc522::new(interface).init() {
            Ok(mut device) => {
                if let Ok(version) = device.version() {
                    log::info!("rfid: MFRC522 version {:#04x}", version);
                }
                self.device = Some(device);
            }
            Err(_) => log::error!("rfid: reader init failed"),
        }
    }
}

impl<SPI: embedded_hal::spi::SpiDevice> CardReader for Mfrc522Reader<SPI> {
    fn init(&mut self) {
        self.atqa = None;
    }

    fn reset(&mut self) {
        self.atqa = None;
        match self.device.take() {
            Some(device) => self.start(device.release()),
            None => log::warn!("rfid: reader lost, reset needs a reboot"),
        }
    }

    fn is_card_present(&mut self) -> bool {
        let Some(device) = self.device.as_mut() else {
            return false;
        };
        self.atqa = device.reqa().ok();
        self.atqa.is_some()
    }

    fn read_serial(&mut self) -> Result<Uid, ReaderError> {
        let atqa = self.atqa.take().ok_or(ReaderError::NoCard)?;
        let device = self.device.as_mut().ok_or(ReaderError::Communication)?;
        let uid = device.select(&atqa).map_err(|_| ReaderError::Communication)?;
        Uid::new(uid.as_bytes()).ok_or(ReaderError::Communication)
    }
}
