//! Field tags.
//!
//! A tag identifies a field inside a tuple: an application-chosen column
//! number plus a [`FieldType`]. On the wire it is packed into one `u32`:
//!
//! ```text
//! [column: 16 bits][type code: 5 bits]   (bits 21..32 are zero)
//! ```
//!
//! Packing keeps the natural ordering: tags sort by column first, then by
//! type code.

use std::fmt;

use crate::error::TupleError;

/// Number of bits used by the type code inside a packed tag.
pub const TYPE_BITS: u32 = 5;

/// Type-code bit that marks the array variant of a scalar type.
pub const ARRAY_FLAG: u8 = 0x10;

const TYPE_MASK: u32 = (1 << TYPE_BITS) - 1;

/// Storage type of a field.
///
/// Codes `0..=15` are scalars, `17..=31` their array variants. Code 16
/// (array of null) does not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum FieldType {
    Null = 0,
    Uint16 = 1,
    Int32 = 2,
    Uint32 = 3,
    Fp32 = 4,
    Int64 = 5,
    Uint64 = 6,
    Fp64 = 7,
    /// 32.32 fixed-point seconds since the Unix epoch.
    Datetime = 8,
    B96 = 9,
    B128 = 10,
    B160 = 11,
    B256 = 12,
    Cstr = 13,
    Opaque = 14,
    Nested = 15,
    ArrayUint16 = 17,
    ArrayInt32 = 18,
    ArrayUint32 = 19,
    ArrayFp32 = 20,
    ArrayInt64 = 21,
    ArrayUint64 = 22,
    ArrayFp64 = 23,
    ArrayDatetime = 24,
    ArrayB96 = 25,
    ArrayB128 = 26,
    ArrayB160 = 27,
    ArrayB256 = 28,
    ArrayCstr = 29,
    ArrayOpaque = 30,
    ArrayNested = 31,
}

impl FieldType {
    /// Enumerations are stored as `uint16` and resolved through a schema.
    pub const ENUM: FieldType = FieldType::Uint16;

    /// Array of enumerations.
    pub const ARRAY_ENUM: FieldType = FieldType::ArrayUint16;

    /// Every valid type, in code order.
    pub const ALL: [FieldType; 31] = [
        FieldType::Null,
        FieldType::Uint16,
        FieldType::Int32,
        FieldType::Uint32,
        FieldType::Fp32,
        FieldType::Int64,
        FieldType::Uint64,
        FieldType::Fp64,
        FieldType::Datetime,
        FieldType::B96,
        FieldType::B128,
        FieldType::B160,
        FieldType::B256,
        FieldType::Cstr,
        FieldType::Opaque,
        FieldType::Nested,
        FieldType::ArrayUint16,
        FieldType::ArrayInt32,
        FieldType::ArrayUint32,
        FieldType::ArrayFp32,
        FieldType::ArrayInt64,
        FieldType::ArrayUint64,
        FieldType::ArrayFp64,
        FieldType::ArrayDatetime,
        FieldType::ArrayB96,
        FieldType::ArrayB128,
        FieldType::ArrayB160,
        FieldType::ArrayB256,
        FieldType::ArrayCstr,
        FieldType::ArrayOpaque,
        FieldType::ArrayNested,
    ];

    /// Decodes a 5-bit type code. Returns `None` for code 16 and for codes
    /// wider than five bits.
    #[must_use]
    pub fn from_code(code: u8) -> Option<FieldType> {
        match code {
            0..=15 => Some(Self::ALL[code as usize]),
            17..=31 => Some(Self::ALL[code as usize - 1]),
            _ => None,
        }
    }

    /// Looks a type up by its [`name`](FieldType::name).
    #[must_use]
    pub fn from_name(name: &str) -> Option<FieldType> {
        Self::ALL.iter().copied().find(|ty| ty.name() == name)
    }

    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub const fn is_array(self) -> bool {
        self as u8 & ARRAY_FLAG != 0
    }

    /// `true` for types whose value lives in the directory slot itself.
    #[must_use]
    pub const fn is_inline(self) -> bool {
        matches!(
            self,
            FieldType::Null
                | FieldType::Uint16
                | FieldType::Int32
                | FieldType::Uint32
                | FieldType::Fp32
        )
    }

    /// Width in bytes of fixed-size scalars; `None` for strings, blobs,
    /// nested tuples and arrays.
    #[must_use]
    pub const fn fixed_width(self) -> Option<usize> {
        match self {
            FieldType::Null => Some(0),
            FieldType::Uint16 => Some(2),
            FieldType::Int32 | FieldType::Uint32 | FieldType::Fp32 => Some(4),
            FieldType::Int64 | FieldType::Uint64 | FieldType::Fp64 | FieldType::Datetime => {
                Some(8)
            }
            FieldType::B96 => Some(12),
            FieldType::B128 => Some(16),
            FieldType::B160 => Some(20),
            FieldType::B256 => Some(32),
            _ => None,
        }
    }

    /// Array counterpart of a scalar type.
    ///
    /// # Errors
    ///
    /// [`TupleError::InvalidType`] for `Null` and for types that already
    /// are arrays.
    pub fn array_of(self) -> Result<FieldType, TupleError> {
        if self == FieldType::Null || self.is_array() {
            return Err(TupleError::InvalidType(self.code()));
        }
        FieldType::from_code(self.code() | ARRAY_FLAG).ok_or(TupleError::InvalidType(self.code()))
    }

    /// Scalar type of an array's elements; `None` for scalars.
    #[must_use]
    pub fn element_type(self) -> Option<FieldType> {
        if self.is_array() {
            FieldType::from_code(self.code() & !ARRAY_FLAG)
        } else {
            None
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            FieldType::Null => "null",
            FieldType::Uint16 => "uint16",
            FieldType::Int32 => "int32",
            FieldType::Uint32 => "uint32",
            FieldType::Fp32 => "fp32",
            FieldType::Int64 => "int64",
            FieldType::Uint64 => "uint64",
            FieldType::Fp64 => "fp64",
            FieldType::Datetime => "datetime",
            FieldType::B96 => "b96",
            FieldType::B128 => "b128",
            FieldType::B160 => "b160",
            FieldType::B256 => "b256",
            FieldType::Cstr => "cstr",
            FieldType::Opaque => "opaque",
            FieldType::Nested => "nested",
            FieldType::ArrayUint16 => "uint16[]",
            FieldType::ArrayInt32 => "int32[]",
            FieldType::ArrayUint32 => "uint32[]",
            FieldType::ArrayFp32 => "fp32[]",
            FieldType::ArrayInt64 => "int64[]",
            FieldType::ArrayUint64 => "uint64[]",
            FieldType::ArrayFp64 => "fp64[]",
            FieldType::ArrayDatetime => "datetime[]",
            FieldType::ArrayB96 => "b96[]",
            FieldType::ArrayB128 => "b128[]",
            FieldType::ArrayB160 => "b160[]",
            FieldType::ArrayB256 => "b256[]",
            FieldType::ArrayCstr => "cstr[]",
            FieldType::ArrayOpaque => "opaque[]",
            FieldType::ArrayNested => "nested[]",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Field identifier: column number plus storage type.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tag {
    column: u16,
    ty: FieldType,
}

impl Tag {
    #[must_use]
    pub const fn new(column: u16, ty: FieldType) -> Self {
        Tag { column, ty }
    }

    /// Decodes a packed tag as stored in a tuple directory.
    ///
    /// # Errors
    ///
    /// [`TupleError::InvalidType`] if the type code is unknown or the
    /// column does not fit 16 bits.
    pub fn from_raw(raw: u32) -> Result<Self, TupleError> {
        let code = (raw & TYPE_MASK) as u8;
        let ty = FieldType::from_code(code).ok_or(TupleError::InvalidType(code))?;
        let column = u16::try_from(raw >> TYPE_BITS).map_err(|_| TupleError::InvalidType(code))?;
        Ok(Tag { column, ty })
    }

    /// Packed wire form.
    #[must_use]
    pub const fn raw(self) -> u32 {
        (self.column as u32) << TYPE_BITS | self.ty as u32
    }

    #[must_use]
    pub const fn column(self) -> u16 {
        self.column
    }

    #[must_use]
    pub const fn field_type(self) -> FieldType {
        self.ty
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tag({}:{})", self.column, self.ty)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.column, self.ty)
    }
}

/// Packs a column number and a type into a [`Tag`].
#[must_use]
pub const fn make_tag(column: u16, ty: FieldType) -> Tag {
    Tag::new(column, ty)
}

#[must_use]
pub const fn tag_to_column(tag: Tag) -> u16 {
    tag.column()
}

#[must_use]
pub const fn tag_to_type(tag: Tag) -> FieldType {
    tag.field_type()
}

/// Maps a scalar type to its array counterpart.
///
/// # Errors
///
/// See [`FieldType::array_of`].
pub fn array_type_of(ty: FieldType) -> Result<FieldType, TupleError> {
    ty.array_of()
}
