//! Access Terminal - firmware core for an RFID door-access terminal.
//!
//! One serial link to the host carries commands in and keypad/RFID events out.
//! Everything in this crate is hardware-independent and allocation-free; the
//! board binary (`--features esp32`) plugs in the UART, GPIO, LCD, tone and
//! MFRC522 drivers through the traits in `reader`, `indicator`, `keypad` and
//! `serial`.
//!
//! Architecture:
//! - UART RX interrupt: pushes bytes through a `ring_buffer::Producer`, nothing else
//! - Main loop (`terminal`): line assembly, command dispatch, keypad and RFID polling
//!
//! Non-volatile memory is any `embedded_storage::Storage`.

#![no_std]

pub mod access;
pub mod command;
pub mod config;
pub mod guard;
pub mod indicator;
pub mod keypad;
pub mod line;
pub mod parse;
pub mod presence;
pub mod reader;
pub mod ring_buffer;
pub mod serial;
pub mod storage;
pub mod terminal;

pub use config::{BuildConfig, Capabilities, IndicatorKind};
pub use reader::Uid;
pub use terminal::Terminal;
