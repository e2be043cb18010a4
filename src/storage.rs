//! Terminal configuration and access list in byte-addressable non-volatile
//! memory.
//!
//! Layout (offsets from the store base, never reorder - devices in the field
//! carry this layout):
//!   [0: dummy] [1..33: name, NUL padded] [33..35: baud, LE] [35: flags]
//!   [36: access count] [37..: ACCESS_LIST_CAPACITY * (4 bytes uid + 1 byte flags)]
//!
//! Byte 0 is never used: the first byte of the memory has been seen corrupted
//! after power loss.
//!
//! Erased memory reads as 0xFF. Every accessor recognises that and returns the
//! default instead (empty name, default baud, keyboard tone on, empty access
//! list).

use embedded_storage::Storage;
use heapless::Vec;

use crate::reader::Uid;
use crate::serial::is_valid_baud;

pub const NAME_OFFSET: u32 = 1;
/// Name field size including the terminating NUL.
pub const NAME_FIELD_SIZE: usize = 32;
pub const MAX_NAME_LEN: usize = NAME_FIELD_SIZE - 1;
pub const BAUD_OFFSET: u32 = NAME_OFFSET + NAME_FIELD_SIZE as u32;
pub const FLAGS_OFFSET: u32 = BAUD_OFFSET + 2;
pub const ACCESS_COUNT_OFFSET: u32 = FLAGS_OFFSET + 1;
pub const ACCESS_RECORDS_OFFSET: u32 = ACCESS_COUNT_OFFSET + 1;

pub const ACCESS_UID_LEN: usize = 4;
pub const ACCESS_RECORD_SIZE: usize = ACCESS_UID_LEN + 1;
pub const ACCESS_LIST_CAPACITY: usize = 32;

/// Bytes occupied by the whole layout.
pub const LAYOUT_SIZE: usize =
    ACCESS_RECORDS_OFFSET as usize + ACCESS_LIST_CAPACITY * ACCESS_RECORD_SIZE;

const ERASED: u8 = 0xFF;
const FLAG_KEYBOARD_TONE: u8 = 0x01;

/// Terminal name, at most 31 bytes.
pub type TerminalName = Vec<u8, MAX_NAME_LEN>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("non-volatile memory access failed")]
    Storage,
    #[error("access list is full")]
    AccessListFull,
    #[error("uid shorter than 4 bytes")]
    UidTooShort,
}

/// Persisted terminal settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalConfig {
    pub name: TerminalName,
    pub baud_rate: u16,
    pub keyboard_tone_enabled: bool,
}

/// Access list record flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AccessFlags {
    None = 0x00,
    Admin = 0x01,
}

impl From<u8> for AccessFlags {
    fn from(v: u8) -> Self {
        if v & 0x01 != 0 {
            AccessFlags::Admin
        } else {
            AccessFlags::None
        }
    }
}

/// One allow-list entry: the first four UID bytes and its flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessRecord {
    pub uid: [u8; ACCESS_UID_LEN],
    pub flags: AccessFlags,
}

impl AccessRecord {
    pub fn matches(&self, uid: &Uid) -> bool {
        uid.as_bytes().len() >= ACCESS_UID_LEN && uid.as_bytes()[..ACCESS_UID_LEN] == self.uid
    }
}

/// Typed view of the layout above on top of any `embedded_storage::Storage`.
pub struct TerminalStore<S> {
    storage: S,
    base: u32,
    default_baud: u16,
}

impl<S: Storage> TerminalStore<S> {
    /// `base` is the offset of byte 0 (the dummy byte) inside `storage`.
    pub fn new(storage: S, base: u32, default_baud: u16) -> Self {
        Self {
            storage,
            base,
            default_baud,
        }
    }

    pub fn into_inner(self) -> S {
        self.storage
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    fn read(&mut self, offset: u32, buf: &mut [u8]) -> Result<(), StoreError> {
        self.storage
            .read(self.base + offset, buf)
            .map_err(|_| StoreError::Storage)
    }

    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), StoreError> {
        self.storage
            .write(self.base + offset, bytes)
            .map_err(|_| StoreError::Storage)
    }

    fn read_byte(&mut self, offset: u32) -> Result<u8, StoreError> {
        let mut byte = [0u8; 1];
        self.read(offset, &mut byte)?;
        Ok(byte[0])
    }

    /// Stored terminal name; empty for erased memory.
    pub fn name(&mut self) -> Result<TerminalName, StoreError> {
        let mut buf = [0u8; NAME_FIELD_SIZE];
        self.read(NAME_OFFSET, &mut buf)?;

        let mut name = TerminalName::new();
        if buf[0] == ERASED {
            return Ok(name);
        }
        let len = buf[..MAX_NAME_LEN]
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(MAX_NAME_LEN);
        // Cannot fail: len <= MAX_NAME_LEN
        let _ = name.extend_from_slice(&buf[..len]);
        Ok(name)
    }

    /// Store a name, cut to 31 bytes and NUL padded to the field size.
    pub fn set_name(&mut self, name: &[u8]) -> Result<(), StoreError> {
        let len = name.len().min(MAX_NAME_LEN);
        let mut buf = [0u8; NAME_FIELD_SIZE];
        buf[..len].copy_from_slice(&name[..len]);
        self.write(NAME_OFFSET, &buf)?;
        log::info!("store: name set ({} bytes)", len);
        Ok(())
    }

    /// Stored baud rate, or the default when erased or not a supported rate.
    pub fn baud_rate(&mut self) -> Result<u16, StoreError> {
        let mut buf = [0u8; 2];
        self.read(BAUD_OFFSET, &mut buf)?;
        let baud = u16::from_le_bytes(buf);
        if is_valid_baud(baud) {
            Ok(baud)
        } else {
            if baud != 0xFFFF {
                log::warn!("store: ignoring stored baud {}", baud);
            }
            Ok(self.default_baud)
        }
    }

    pub fn set_baud_rate(&mut self, baud: u16) -> Result<(), StoreError> {
        self.write(BAUD_OFFSET, &baud.to_le_bytes())?;
        log::info!("store: baud rate {} stored", baud);
        Ok(())
    }

    fn flags(&mut self) -> Result<u8, StoreError> {
        let flags = self.read_byte(FLAGS_OFFSET)?;
        Ok(if flags == ERASED { FLAG_KEYBOARD_TONE } else { flags })
    }

    pub fn keyboard_tone(&mut self) -> Result<bool, StoreError> {
        Ok(self.flags()? & FLAG_KEYBOARD_TONE != 0)
    }

    pub fn set_keyboard_tone(&mut self, enabled: bool) -> Result<(), StoreError> {
        let flags = self.flags()?;
        let flags = if enabled {
            flags | FLAG_KEYBOARD_TONE
        } else {
            flags & !FLAG_KEYBOARD_TONE
        };
        self.write(FLAGS_OFFSET, &[flags])
    }

    /// All persisted settings, with defaults substituted for erased fields.
    pub fn config(&mut self) -> Result<TerminalConfig, StoreError> {
        Ok(TerminalConfig {
            name: self.name()?,
            baud_rate: self.baud_rate()?,
            keyboard_tone_enabled: self.keyboard_tone()?,
        })
    }

    // ========================================================================
    // Access list (lock mode)
    // ========================================================================

    /// Number of access records. Erased or out-of-range counts read as 0,
    /// which puts the terminal in enrollment mode.
    pub fn access_count(&mut self) -> Result<u8, StoreError> {
        let count = self.read_byte(ACCESS_COUNT_OFFSET)?;
        if count as usize > ACCESS_LIST_CAPACITY {
            if count != ERASED {
                log::warn!("store: access count {} out of range, treating as empty", count);
            }
            return Ok(0);
        }
        Ok(count)
    }

    pub fn access_record(&mut self, index: u8) -> Result<Option<AccessRecord>, StoreError> {
        if index >= self.access_count()? {
            return Ok(None);
        }
        let mut buf = [0u8; ACCESS_RECORD_SIZE];
        self.read(record_offset(index), &mut buf)?;
        let mut uid = [0u8; ACCESS_UID_LEN];
        uid.copy_from_slice(&buf[..ACCESS_UID_LEN]);
        Ok(Some(AccessRecord {
            uid,
            flags: AccessFlags::from(buf[ACCESS_UID_LEN]),
        }))
    }

    /// First record matching the UID's leading four bytes.
    pub fn find_access(&mut self, uid: &Uid) -> Result<Option<AccessRecord>, StoreError> {
        if uid.as_bytes().len() < ACCESS_UID_LEN {
            return Ok(None);
        }
        let count = self.access_count()?;
        for index in 0..count {
            if let Some(record) = self.access_record(index)? {
                if record.matches(uid) {
                    return Ok(Some(record));
                }
            }
        }
        Ok(None)
    }

    /// Append a record. Does not check for duplicates.
    pub fn append_access(&mut self, uid: &Uid, flags: AccessFlags) -> Result<(), StoreError> {
        let bytes = uid.as_bytes();
        if bytes.len() < ACCESS_UID_LEN {
            return Err(StoreError::UidTooShort);
        }
        let count = self.access_count()?;
        if count as usize >= ACCESS_LIST_CAPACITY {
            return Err(StoreError::AccessListFull);
        }

        let mut record = [0u8; ACCESS_RECORD_SIZE];
        record[..ACCESS_UID_LEN].copy_from_slice(&bytes[..ACCESS_UID_LEN]);
        record[ACCESS_UID_LEN] = flags as u8;
        self.write(record_offset(count), &record)?;

        // Count last: a power loss before this leaves the list unchanged.
        self.write(ACCESS_COUNT_OFFSET, &[count + 1])?;
        log::info!("store: access record {} added ({:?})", count, flags);
        Ok(())
    }
}

fn record_offset(index: u8) -> u32 {
    ACCESS_RECORDS_OFFSET + index as u32 * ACCESS_RECORD_SIZE as u32
}

/// Terminal identity that the host may read and, with the rename capability,
/// change.
pub trait RenameableIdentity {
    fn name(&mut self) -> Result<TerminalName, StoreError>;
    fn rename(&mut self, name: &[u8]) -> Result<(), StoreError>;
}

impl<S: Storage> RenameableIdentity for TerminalStore<S> {
    fn name(&mut self) -> Result<TerminalName, StoreError> {
        TerminalStore::name(self)
    }

    fn rename(&mut self, name: &[u8]) -> Result<(), StoreError> {
        self.set_name(name)
    }
}
