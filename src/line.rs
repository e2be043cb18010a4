//! Non-blocking line assembly on top of the serial channel.
//!
//! `poll` is the main loop's suspension point for command input: it only
//! consumes what is already buffered and otherwise keeps its partial line for
//! the next call, so keypad and RFID polling never wait on a half-typed
//! command.

use crate::serial::ByteSource;

/// Line buffer size. Lines are cut at `LINE_BUFFER_SIZE - 1` bytes.
pub const LINE_BUFFER_SIZE: usize = 33;

pub struct LineAssembler<const N: usize = LINE_BUFFER_SIZE> {
    buffer: [u8; N],
    len: usize,
}

impl<const N: usize> LineAssembler<N> {
    pub const fn new() -> Self {
        Self {
            buffer: [0; N],
            len: 0,
        }
    }

    /// Longest line that is returned without being cut.
    pub const fn max_line_len(&self) -> usize {
        N - 1
    }

    /// Bytes collected towards the next line.
    pub fn partial_len(&self) -> usize {
        self.len
    }

    /// Drain buffered input and return a completed line, if there is one.
    ///
    /// A line ends at CR or LF (stripped) or when `N - 1` bytes have been
    /// collected (returned as-is, truncation is not an error). Bytes after the
    /// terminator stay in the source. The returned slice is valid until the
    /// next call.
    pub fn poll<S: ByteSource + ?Sized>(&mut self, source: &mut S) -> Option<&[u8]> {
        let limit = N - 1;

        while self.len < limit {
            let Some(byte) = source.try_receive() else {
                return None;
            };
            match byte {
                b'\r' | b'\n' => return Some(self.take()),
                0 => continue,
                _ => {
                    self.buffer[self.len] = byte;
                    self.len += 1;
                }
            }
        }

        log::debug!("line: overlong input cut at {} bytes", limit);
        Some(self.take())
    }

    fn take(&mut self) -> &[u8] {
        let len = self.len;
        self.len = 0;
        &self.buffer[..len]
    }
}

impl<const N: usize> Default for LineAssembler<N> {
    fn default() -> Self {
        Self::new()
    }
}
