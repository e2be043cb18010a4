//! Serial channel to the host: blocking transmit, ring-buffered receive.
//!
//! Transmit only ever happens from the main loop, so it is allowed to spin on
//! the hardware. Receive is fed by the UART interrupt through the ring buffer's
//! `Producer`; this side only holds the `Consumer`.

use core::fmt;

use crate::ring_buffer::Consumer;

/// Line speed when nothing valid is stored.
pub const DEFAULT_BAUD: u16 = 9600;

/// Line speeds the terminal accepts for `B<baud>`.
pub const BAUD_RATES: [u16; 10] = [300, 600, 1200, 2400, 4800, 9600, 14400, 19200, 28800, 38400];

pub fn is_valid_baud(baud: u16) -> bool {
    BAUD_RATES.contains(&baud)
}

/// Blocking byte transmitter (the UART TX half).
pub trait Transmitter {
    /// Send one byte, waiting until the hardware can accept it.
    fn transmit(&mut self, byte: u8);

    /// Current line speed.
    fn baud(&self) -> u16;

    /// Switch the line speed. Bytes already handed to `transmit` go out at the
    /// old rate.
    fn set_baud(&mut self, baud: u16);
}

/// Something that yields received bytes without blocking.
pub trait ByteSource {
    fn bytes_pending(&self) -> usize;
    fn try_receive(&mut self) -> Option<u8>;
}

/// What the command dispatcher needs from the link it answers on.
pub trait ReplyChannel: fmt::Write {
    fn send(&mut self, bytes: &[u8]);
    fn dropped_byte_count(&self) -> u16;
    fn baud(&self) -> u16;
    fn set_baud(&mut self, baud: u16);

    /// Terminate the current reply line.
    fn end_line(&mut self) {
        self.send(b"\r\n");
    }

    fn send_line(&mut self, bytes: &[u8]) {
        self.send(bytes);
        self.end_line();
    }
}

/// Host link: transmitter plus the consumer end of the receive buffer.
pub struct SerialChannel<'a, T, const N: usize> {
    tx: T,
    rx: Consumer<'a, N>,
}

impl<'a, T: Transmitter, const N: usize> SerialChannel<'a, T, N> {
    pub fn new(tx: T, rx: Consumer<'a, N>) -> Self {
        Self { tx, rx }
    }

    pub fn transmit(&mut self, byte: u8) {
        self.tx.transmit(byte);
    }

    /// Bytes received and not yet consumed.
    pub fn bytes_pending(&self) -> usize {
        self.rx.available_to_read()
    }

    /// Read one byte, spinning until one arrives.
    /// Callers check `bytes_pending()` first; this is never used on an empty
    /// buffer by the main loop.
    pub fn receive_one(&mut self) -> u8 {
        loop {
            if let Some(byte) = self.rx.pop_if_ready() {
                return byte;
            }
            core::hint::spin_loop();
        }
    }

    pub fn try_receive(&mut self) -> Option<u8> {
        self.rx.pop_if_ready()
    }

    /// Received bytes lost to a full buffer since boot.
    pub fn dropped_byte_count(&self) -> u16 {
        self.rx.dropped()
    }

    pub fn transmitter(&self) -> &T {
        &self.tx
    }

    pub fn transmitter_mut(&mut self) -> &mut T {
        &mut self.tx
    }
}

impl<T: Transmitter, const N: usize> ByteSource for SerialChannel<'_, T, N> {
    fn bytes_pending(&self) -> usize {
        SerialChannel::bytes_pending(self)
    }

    fn try_receive(&mut self) -> Option<u8> {
        SerialChannel::try_receive(self)
    }
}

impl<T: Transmitter, const N: usize> fmt::Write for SerialChannel<'_, T, N> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for &byte in s.as_bytes() {
            self.tx.transmit(byte);
        }
        Ok(())
    }
}

impl<T: Transmitter, const N: usize> ReplyChannel for SerialChannel<'_, T, N> {
    fn send(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.tx.transmit(byte);
        }
    }

    fn dropped_byte_count(&self) -> u16 {
        SerialChannel::dropped_byte_count(self)
    }

    fn baud(&self) -> u16 {
        self.tx.baud()
    }

    fn set_baud(&mut self, baud: u16) {
        log::info!("serial: switching to {} baud", baud);
        self.tx.set_baud(baud);
    }
}
