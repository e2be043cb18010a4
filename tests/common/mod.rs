//! Host-side stand-ins for the board drivers.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::fmt;

use access_terminal::command::{CommandContext, CommandDispatcher};
use access_terminal::indicator::{IndicatorOutput, Leds, ToneGenerator};
use access_terminal::keypad::KeypadMatrix;
use access_terminal::presence::PresenceTracker;
use access_terminal::reader::{CardReader, ReaderError, Uid};
use access_terminal::serial::{ReplyChannel, Transmitter};
use access_terminal::storage::{TerminalStore, LAYOUT_SIZE};
use access_terminal::Capabilities;
use embedded_storage::{ReadStorage, Storage};

/// Split a transcript into its CR LF terminated lines.
pub fn lines(bytes: &[u8]) -> Vec<String> {
    let text = String::from_utf8_lossy(bytes);
    let mut lines: Vec<String> = text.split("\r\n").map(str::to_owned).collect();
    // Everything is CR LF terminated, so the tail is empty
    assert_eq!(lines.pop().as_deref(), Some(""), "unterminated output: {:?}", text);
    lines
}

// ============================================================================
// Non-volatile memory
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RamStorageError;

/// Byte-addressable memory that starts out erased (0xFF).
pub struct RamStorage {
    pub bytes: Vec<u8>,
    pub fail_writes: bool,
    pub writes: usize,
}

impl RamStorage {
    pub fn erased() -> Self {
        Self::with_size(LAYOUT_SIZE + 16)
    }

    pub fn with_size(size: usize) -> Self {
        Self {
            bytes: vec![0xFF; size],
            fail_writes: false,
            writes: 0,
        }
    }
}

impl ReadStorage for RamStorage {
    type Error = RamStorageError;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        let start = offset as usize;
        let src = self.bytes.get(start..start + bytes.len()).ok_or(RamStorageError)?;
        bytes.copy_from_slice(src);
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.bytes.len()
    }
}

impl Storage for RamStorage {
    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        if self.fail_writes {
            return Err(RamStorageError);
        }
        let start = offset as usize;
        let dst = self
            .bytes
            .get_mut(start..start + bytes.len())
            .ok_or(RamStorageError)?;
        dst.copy_from_slice(bytes);
        self.writes += 1;
        Ok(())
    }
}

pub fn erased_store() -> TerminalStore<RamStorage> {
    TerminalStore::new(RamStorage::erased(), 0, 9600)
}

// ============================================================================
// Serial
// ============================================================================

/// Records transmitted bytes and the point in the output where the line
/// speed changed.
#[derive(Default)]
pub struct MockTransmitter {
    pub output: Vec<u8>,
    pub baud: u16,
    /// `(bytes sent before the switch, new baud)`
    pub baud_changes: Vec<(usize, u16)>,
}

impl MockTransmitter {
    pub fn new(baud: u16) -> Self {
        Self {
            baud,
            ..Default::default()
        }
    }

    pub fn take_lines(&mut self) -> Vec<String> {
        let out = std::mem::take(&mut self.output);
        lines(&out)
    }
}

impl Transmitter for MockTransmitter {
    fn transmit(&mut self, byte: u8) {
        self.output.push(byte);
    }

    fn baud(&self) -> u16 {
        self.baud
    }

    fn set_baud(&mut self, baud: u16) {
        self.baud_changes.push((self.output.len(), baud));
        self.baud = baud;
    }
}

/// Reply channel without a receive side, for driving the dispatcher directly.
pub struct MockLink {
    pub tx: MockTransmitter,
    pub dropped: u16,
}

impl MockLink {
    pub fn new() -> Self {
        Self {
            tx: MockTransmitter::new(9600),
            dropped: 0,
        }
    }
}

impl fmt::Write for MockLink {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.tx.output.extend_from_slice(s.as_bytes());
        Ok(())
    }
}

impl ReplyChannel for MockLink {
    fn send(&mut self, bytes: &[u8]) {
        self.tx.output.extend_from_slice(bytes);
    }

    fn dropped_byte_count(&self) -> u16 {
        self.dropped
    }

    fn baud(&self) -> u16 {
        self.tx.baud
    }

    fn set_baud(&mut self, baud: u16) {
        self.tx.set_baud(baud);
    }
}

// ============================================================================
// Peripherals
// ============================================================================

/// Card reader fed from a script of poll results. An exhausted script means
/// no card.
#[derive(Default)]
pub struct MockReader {
    pub script: VecDeque<Option<Uid>>,
    pub fail_reads: bool,
    pub registers: Option<[u8; 64]>,
    pub init_count: usize,
    pub reset_count: usize,
    current: Option<Uid>,
}

impl MockReader {
    pub fn push_present(&mut self, uid: &[u8]) {
        self.script.push_back(Uid::new(uid));
    }

    pub fn push_absent(&mut self) {
        self.script.push_back(None);
    }
}

impl CardReader for MockReader {
    fn init(&mut self) {
        self.init_count += 1;
    }

    fn reset(&mut self) {
        self.reset_count += 1;
    }

    fn is_card_present(&mut self) -> bool {
        self.current = self.script.pop_front().flatten();
        self.current.is_some()
    }

    fn read_serial(&mut self) -> Result<Uid, ReaderError> {
        if self.fail_reads {
            return Err(ReaderError::Communication);
        }
        self.current.take().ok_or(ReaderError::NoCard)
    }

    fn read_register(&mut self, register: u8) -> Option<u8> {
        self.registers.map(|regs| regs[register as usize & 0x3F])
    }
}

#[derive(Default)]
pub struct MockIndicator {
    pub rows: [String; 2],
    pub leds: Leds,
    pub aux: u8,
    pub writes: usize,
}

impl IndicatorOutput for MockIndicator {
    fn write(&mut self, row: u8, text: &str) {
        self.rows[row as usize] = text.to_owned();
        self.writes += 1;
    }

    fn set_leds(&mut self, leds: Leds) {
        self.leds = leds;
    }

    fn set_aux(&mut self, bits: u8) {
        self.aux = bits;
    }
}

#[derive(Default)]
pub struct MockTone {
    pub played: Vec<(u16, u16)>,
}

impl ToneGenerator for MockTone {
    fn play(&mut self, hz: u16, duration_ms: u16) {
        self.played.push((hz, duration_ms));
    }
}

#[derive(Default)]
pub struct MockKeypad {
    pub raw: u8,
}

impl KeypadMatrix for MockKeypad {
    fn sample(&mut self) -> u8 {
        self.raw
    }
}

// ============================================================================
// Dispatcher bench
// ============================================================================

/// Dispatcher plus every collaborator, for command-level tests.
pub struct Bench {
    pub dispatcher: CommandDispatcher,
    pub link: MockLink,
    pub store: TerminalStore<RamStorage>,
    pub reader: MockReader,
    pub presence: PresenceTracker,
    pub indicator: MockIndicator,
    pub tone: MockTone,
}

impl Bench {
    pub fn new(capabilities: Capabilities) -> Self {
        Self {
            dispatcher: CommandDispatcher::new(capabilities),
            link: MockLink::new(),
            store: erased_store(),
            reader: MockReader::default(),
            presence: PresenceTracker::new(),
            indicator: MockIndicator::default(),
            tone: MockTone::default(),
        }
    }

    /// Dispatch one line and return the reply lines it produced.
    pub fn send(&mut self, line: &str) -> Vec<String> {
        self.send_bytes(line.as_bytes())
    }

    pub fn send_bytes(&mut self, line: &[u8]) -> Vec<String> {
        let mut ctx = CommandContext {
            link: &mut self.link,
            store: &mut self.store,
            reader: &mut self.reader,
            presence: &mut self.presence,
            indicator: &mut self.indicator,
            tone: &mut self.tone,
        };
        self.dispatcher.dispatch(line, &mut ctx);
        if self.link.tx.output.is_empty() {
            return Vec::new();
        }
        self.link.tx.take_lines()
    }
}
