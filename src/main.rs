//! Access Terminal - ESP32 firmware for an RFID door-access terminal.
//!
//! Architecture:
//! - UART2 RX interrupt (`board`): moves received bytes into the ring buffer
//! - Main loop: `Terminal::poll_once`, tone timing and the watchdog
//!
//! The host link, keypad, display, buzzer, card reader and flash are wired up
//! here and handed to the hardware-independent `access_terminal` crate.

#![no_std]
#![no_main]

use esp_bootloader_esp_idf::esp_app_desc;
esp_app_desc!();

mod board;

use embedded_hal_bus::spi::ExclusiveDevice;
use esp_hal::{
    clock::CpuClock,
    gpio::{Input, InputConfig, Level, Output, OutputConfig},
    ledc::Ledc,
    main,
    spi::{
        master::{Config as SpiConfig, Spi},
        Mode,
    },
    time::{Duration, Rate},
    timer::timg::{MwdtStage, TimerGroup},
    uart::Uart,
};
use esp_println::logger::init_logger;
use esp_storage::FlashStorage;
use static_cell::StaticCell;

use access_terminal::ring_buffer::{RingBuffer, RX_BUFFER_SIZE};
use access_terminal::serial::SerialChannel;
use access_terminal::storage::TerminalStore;
use access_terminal::terminal::{Peripherals, Terminal};
use access_terminal::{BuildConfig, Capabilities, IndicatorKind};

use crate::board::{BoardIndicator, Display, GpioKeypad, Hd44780, HostTransmitter, LedcTone, Mfrc522Reader};

// Terminal settings live in the data region after the app
const STORE_BASE: u32 = 0x3D_0000;

const WATCHDOG_TIMEOUT_SECS: u64 = 5;
const WATCHDOG_FEED_MS: u64 = 1_000;

static RX_BUFFER: StaticCell<RingBuffer<RX_BUFFER_SIZE>> = StaticCell::new();

#[main]
fn main() -> ! {
    init_logger(log::LevelFilter::Info);
    log::info!("Access terminal starting...");

    let config = BuildConfig::get();
    let capabilities = Capabilities::from_features();
    log::info!(
        "config: baud={}, lcd_width={}, debounce={}ms, {:?}",
        config.default_baud,
        config.lcd_width,
        config.debounce_ms,
        capabilities
    );

    // Hardware init
    let hal_config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(hal_config);

    let timg1 = TimerGroup::new(peripherals.TIMG1);
    let mut wdt = timg1.wdt;
    wdt.enable();
    wdt.set_timeout(MwdtStage::Stage0, Duration::from_secs(WATCHDOG_TIMEOUT_SECS));

    // Host link
    let uart = Uart::new(peripherals.UART2, board::host_uart_config(config.default_baud))
        .unwrap()
        .with_rx(peripherals.GPIO16)
        .with_tx(peripherals.GPIO17);

    let rx_buffer = RX_BUFFER.init(RingBuffer::new());
    let (producer, consumer) = rx_buffer.split();
    board::install_host_uart(uart, producer);
    let serial = SerialChannel::new(HostTransmitter::new(config.default_baud), consumer);

    let store = TerminalStore::new(FlashStorage::new(), STORE_BASE, config.default_baud);

    // Keypad matrix
    let input_config = InputConfig::default();
    let rows = [
        Input::new(peripherals.GPIO34, input_config),
        Input::new(peripherals.GPIO35, input_config),
        Input::new(peripherals.GPIO36, input_config),
        Input::new(peripherals.GPIO39, input_config),
    ];
    let output_config = OutputConfig::default();
    let columns = [
        Output::new(peripherals.GPIO25, Level::Low, output_config),
        Output::new(peripherals.GPIO26, Level::Low, output_config),
        Output::new(peripherals.GPIO27, Level::Low, output_config),
    ];
    let keypad = GpioKeypad::new(rows, columns);

    // Display or LEDs, plus the auxiliary port
    let display = match capabilities.indicator {
        IndicatorKind::Lcd => Display::Lcd(Hd44780::new(
            Output::new(peripherals.GPIO13, Level::Low, output_config),
            Output::new(peripherals.GPIO12, Level::Low, output_config),
            [
                Output::new(peripherals.GPIO14, Level::Low, output_config),
                Output::new(peripherals.GPIO15, Level::Low, output_config),
                Output::new(peripherals.GPIO4, Level::Low, output_config),
                Output::new(peripherals.GPIO2, Level::Low, output_config),
            ],
            config.lcd_width,
        )),
        IndicatorKind::Led => Display::Leds([
            Output::new(peripherals.GPIO13, Level::Low, output_config),
            Output::new(peripherals.GPIO12, Level::Low, output_config),
            Output::new(peripherals.GPIO14, Level::Low, output_config),
        ]),
    };
    let aux = [
        Output::new(peripherals.GPIO22, Level::Low, output_config),
        Output::new(peripherals.GPIO32, Level::Low, output_config),
        Output::new(peripherals.GPIO33, Level::Low, output_config),
        Output::new(peripherals.GPIO0, Level::Low, output_config),
    ];
    let indicator = BoardIndicator::new(display, aux);

    let tone = LedcTone::new(Ledc::new(peripherals.LEDC), peripherals.GPIO21.into());

    // MFRC522 on SPI2
    let spi_config = SpiConfig::default()
        .with_frequency(Rate::from_mhz(1))
        .with_mode(Mode::_0);
    let spi = Spi::new(peripherals.SPI2, spi_config)
        .unwrap()
        .with_sck(peripherals.GPIO18)
        .with_miso(peripherals.GPIO19)
        .with_mosi(peripherals.GPIO23);
    let cs = Output::new(peripherals.GPIO5, Level::High, output_config);
    let spi_device = ExclusiveDevice::new_no_delay(spi, cs).unwrap();
    let reader = Mfrc522Reader::new(spi_device);

    let mut terminal = Terminal::new(
        serial,
        store,
        Peripherals {
            reader,
            keypad,
            indicator,
            tone,
        },
        capabilities,
        &config,
    );
    terminal.boot();

    let mut last_watchdog_feed: u64 = 0;
    loop {
        let now = board::now_ms();
        terminal.poll_once(now);
        terminal.tone_mut().service(now);

        if now.saturating_sub(last_watchdog_feed) >= WATCHDOG_FEED_MS {
            wdt.feed();
            last_watchdog_feed = now;
        }
    }
}

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    critical_section::with(|_| {
        log::error!("PANIC: {}", info);
    });

    // Spin without feeding the watchdog; its timeout resets the terminal.
    loop {
        core::hint::spin_loop();
    }
}
