//! DENIL ("denial of value") sentinels.
//!
//! A fixed-width field holding its type's DENIL pattern is logically absent
//! even though it occupies a directory slot. Variable-length fields have no
//! sentinel: their absence is the absence of a directory entry.

use crate::tag::FieldType;

pub const DENIL_UINT16: u16 = u16::MAX;
pub const DENIL_INT32: i32 = i32::MIN;
pub const DENIL_UINT32: u32 = u32::MAX;
/// A negative quiet NaN.
pub const DENIL_FP32_BITS: u32 = 0xFFFF_FFFF;
pub const DENIL_INT64: i64 = i64::MIN;
pub const DENIL_UINT64: u64 = u64::MAX;
/// A negative quiet NaN.
pub const DENIL_FP64_BITS: u64 = 0xFFFF_FFFF_FFFF_FFFF;
/// The epoch itself, in 32.32 fixed point.
pub const DENIL_DATETIME: u64 = 0;
/// Fill byte of the fixed binary types (96..256 bits).
pub const DENIL_FIXBIN_BYTE: u8 = 0xFF;

/// Reserved bit pattern of one type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denil {
    Bits16(u16),
    Bits32(u32),
    Bits64(u64),
    /// Every byte of a `width`-byte value equals `byte`.
    Fill { byte: u8, width: usize },
}

impl Denil {
    /// Compares little-endian raw bytes against the pattern.
    #[must_use]
    pub fn matches(&self, raw: &[u8]) -> bool {
        match *self {
            Denil::Bits16(bits) => raw == bits.to_le_bytes().as_slice(),
            Denil::Bits32(bits) => raw == bits.to_le_bytes().as_slice(),
            Denil::Bits64(bits) => raw == bits.to_le_bytes().as_slice(),
            Denil::Fill { byte, width } => raw.len() == width && raw.iter().all(|&b| b == byte),
        }
    }
}

/// Sentinel of a fixed-width scalar type. `None` for `Null`, strings, blobs,
/// nested tuples and arrays.
#[must_use]
pub const fn denil_for(ty: FieldType) -> Option<Denil> {
    match ty {
        FieldType::Uint16 => Some(Denil::Bits16(DENIL_UINT16)),
        FieldType::Int32 => Some(Denil::Bits32(DENIL_INT32 as u32)),
        FieldType::Uint32 => Some(Denil::Bits32(DENIL_UINT32)),
        FieldType::Fp32 => Some(Denil::Bits32(DENIL_FP32_BITS)),
        FieldType::Int64 => Some(Denil::Bits64(DENIL_INT64 as u64)),
        FieldType::Uint64 => Some(Denil::Bits64(DENIL_UINT64)),
        FieldType::Fp64 => Some(Denil::Bits64(DENIL_FP64_BITS)),
        FieldType::Datetime => Some(Denil::Bits64(DENIL_DATETIME)),
        FieldType::B96 => Some(Denil::Fill { byte: DENIL_FIXBIN_BYTE, width: 12 }),
        FieldType::B128 => Some(Denil::Fill { byte: DENIL_FIXBIN_BYTE, width: 16 }),
        FieldType::B160 => Some(Denil::Fill { byte: DENIL_FIXBIN_BYTE, width: 20 }),
        FieldType::B256 => Some(Denil::Fill { byte: DENIL_FIXBIN_BYTE, width: 32 }),
        _ => None,
    }
}

/// `true` if `raw` (little-endian value bytes) is the DENIL of `ty`.
#[must_use]
pub fn is_denil(ty: FieldType, raw: &[u8]) -> bool {
    denil_for(ty).is_some_and(|denil| denil.matches(raw))
}
