//! RFID card reader contract and the tag identifier type.

use core::fmt;

/// Longest UID an ISO 14443 tag can report (triple size).
pub const MAX_UID_LEN: usize = 10;

/// Serial number read from an RFID tag.
///
/// Equality only looks at the first `size` bytes; UIDs of different size are
/// never equal.
#[derive(Clone, Copy)]
pub struct Uid {
    bytes: [u8; MAX_UID_LEN],
    size: u8,
}

impl Uid {
    /// Build a UID from raw bytes. Returns `None` for more than 10 bytes.
    pub fn new(bytes: &[u8]) -> Option<Self> {
        if bytes.len() > MAX_UID_LEN {
            return None;
        }
        let mut uid = Self {
            bytes: [0; MAX_UID_LEN],
            size: bytes.len() as u8,
        };
        uid.bytes[..bytes.len()].copy_from_slice(bytes);
        Some(uid)
    }

    pub fn size(&self) -> u8 {
        self.size
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.size as usize]
    }
}

impl PartialEq for Uid {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Eq for Uid {}

impl fmt::Debug for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Uid({})", self)
    }
}

/// Upper-case hex without separators, e.g. `AABBCCDD`.
impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.as_bytes() {
            write!(f, "{:02X}", byte)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ReaderError {
    #[error("no card answered")]
    NoCard,
    #[error("reader communication failed")]
    Communication,
    #[error("anticollision failed")]
    Collision,
}

/// External card reader driver (e.g. an MFRC522 on SPI).
pub trait CardReader {
    fn init(&mut self);

    /// Hard reset. Leaves the reader uninitialised; call `init` afterwards.
    fn reset(&mut self);

    /// Whether a tag answered a request in this poll.
    fn is_card_present(&mut self) -> bool;

    /// Read the tag's serial number. Consumes the reader's read state for
    /// this poll.
    fn read_serial(&mut self) -> Result<Uid, ReaderError>;

    /// Raw register value for the diagnostic dump. Drivers without register
    /// access return `None`.
    fn read_register(&mut self, _register: u8) -> Option<u8> {
        None
    }
}

/// Poll the reader once. A failed serial read counts as "no card".
pub fn sample<R: CardReader + ?Sized>(reader: &mut R) -> Option<Uid> {
    if !reader.is_card_present() {
        return None;
    }
    match reader.read_serial() {
        Ok(uid) => Some(uid),
        Err(e) => {
            log::debug!("rfid: serial read failed: {}", e);
            None
        }
    }
}

/// Registers shown by the diagnostic dump (MFRC522 numbering).
pub const DEBUG_REGISTERS: [u8; 50] = [
    0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A, 0x0B, 0x0C, 0x0D, 0x0E, // command/status
    0x11, 0x12, 0x13, 0x14, 0x15, 0x16, 0x17, 0x18, 0x19, 0x1C, 0x1D, 0x1F, // command config
    0x21, 0x22, 0x24, 0x26, 0x27, 0x28, 0x29, 0x2A, 0x2B, 0x2C, 0x2D, 0x2E, 0x2F, // config
    0x31, 0x32, 0x33, 0x34, 0x35, 0x36, 0x37, 0x38, 0x39, 0x3A, 0x3B, // test
];
