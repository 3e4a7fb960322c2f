//! Tuple binary format constants and header/directory read/write helpers.
//!
//! ## Header (8 bytes)
//!
//! ```text
//! [count: u16 LE][magic: u16 LE = "FU"][payload_len: u32 LE]
//! ```
//!
//! ## Directory entry (8 bytes, `count` of them)
//!
//! ```text
//! [tag: u32 LE][slot: u32 LE]
//! ```
//!
//! The payload area follows the directory and is exactly `payload_len`
//! bytes long, so a tuple is `8 + 8 * count + payload_len` bytes in total.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::ValidationError;

/// Magic number identifying a tuple (ASCII "FU").
pub const TUPLE_MAGIC: u16 = 0x5546;

/// Size of the tuple header in bytes: 2 (`count`) + 2 (`magic`) + 4 (`payload_len`).
pub const HEADER_BYTES: usize = 2 + 2 + 4;

/// Size of one directory entry: 4 (`tag`) + 4 (`slot`).
pub const DIR_ENTRY_BYTES: usize = 4 + 4;

/// Size of the length prefix in front of variable-length payloads.
pub const LEN_PREFIX_BYTES: usize = 4;

/// Largest directory a tuple can carry (the count is a `u16`).
pub const MAX_FIELDS: usize = u16::MAX as usize;

/// Largest tuple a builder will produce (64 MiB).
pub const MAX_TUPLE_BYTES: usize = 64 * 1024 * 1024;

/// Deepest chain of nested tuples below a top-level tuple.
pub const MAX_NESTING_DEPTH: usize = 64;

/// Parsed tuple header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub count: u16,
    pub payload_len: u32,
}

impl Header {
    /// Reads the header from the front of `bytes` and checks the magic.
    pub fn read(bytes: &[u8]) -> Result<Header, ValidationError> {
        if bytes.len() < HEADER_BYTES {
            return Err(ValidationError::TruncatedHeader { len: bytes.len() });
        }
        let magic = LittleEndian::read_u16(&bytes[2..4]);
        if magic != TUPLE_MAGIC {
            return Err(ValidationError::BadMagic(magic));
        }
        Ok(Header {
            count: LittleEndian::read_u16(&bytes[0..2]),
            payload_len: LittleEndian::read_u32(&bytes[4..8]),
        })
    }

    /// Writes the header into the first [`HEADER_BYTES`] of `out`.
    pub fn write(&self, out: &mut [u8]) {
        LittleEndian::write_u16(&mut out[0..2], self.count);
        LittleEndian::write_u16(&mut out[2..4], TUPLE_MAGIC);
        LittleEndian::write_u32(&mut out[4..8], self.payload_len);
    }

    /// Byte offset where the payload area starts.
    #[must_use]
    pub fn payload_start(&self) -> usize {
        HEADER_BYTES + self.count as usize * DIR_ENTRY_BYTES
    }

    /// Total tuple size declared by this header.
    #[must_use]
    pub fn total_len(&self) -> usize {
        self.payload_start() + self.payload_len as usize
    }
}

/// One raw directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirEntry {
    pub tag: u32,
    pub slot: u32,
}

impl DirEntry {
    /// Byte offset of entry `index` inside a tuple.
    #[must_use]
    pub fn offset(index: usize) -> usize {
        HEADER_BYTES + index * DIR_ENTRY_BYTES
    }

    /// Reads entry `index`. The caller has checked that the directory fits.
    #[must_use]
    pub fn read(bytes: &[u8], index: usize) -> DirEntry {
        let at = Self::offset(index);
        DirEntry {
            tag: LittleEndian::read_u32(&bytes[at..at + 4]),
            slot: LittleEndian::read_u32(&bytes[at + 4..at + 8]),
        }
    }

    #[must_use]
    pub fn to_bytes(self) -> [u8; DIR_ENTRY_BYTES] {
        let mut out = [0u8; DIR_ENTRY_BYTES];
        LittleEndian::write_u32(&mut out[0..4], self.tag);
        LittleEndian::write_u32(&mut out[4..8], self.slot);
        out
    }

    /// Overwrites entry `index` in place.
    pub fn write(self, bytes: &mut [u8], index: usize) {
        let at = Self::offset(index);
        bytes[at..at + DIR_ENTRY_BYTES].copy_from_slice(&self.to_bytes());
    }
}

/// Returns the `len`-prefixed body starting at `offset`, or `None` if the
/// prefix or the body runs past `area`.
pub(crate) fn read_prefixed(area: &[u8], offset: usize) -> Option<&[u8]> {
    let body_start = offset.checked_add(LEN_PREFIX_BYTES)?;
    let prefix = area.get(offset..body_start)?;
    let len = LittleEndian::read_u32(prefix) as usize;
    area.get(body_start..body_start.checked_add(len)?)
}
