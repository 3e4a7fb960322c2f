//! Decoded field values.

use byteorder::{ByteOrder, LittleEndian};
use chrono::{DateTime, Utc};

use crate::denil::{
    DENIL_DATETIME, DENIL_FIXBIN_BYTE, DENIL_FP32_BITS, DENIL_FP64_BITS, DENIL_INT32, DENIL_INT64,
    DENIL_UINT16, DENIL_UINT32, DENIL_UINT64,
};
use crate::error::{TupleError, ValidationError};
use crate::format::{read_prefixed, LEN_PREFIX_BYTES};
use crate::tag::FieldType;
use crate::view::TupleView;

const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Point in time as 32.32 fixed-point seconds since the Unix epoch.
///
/// The upper 32 bits are whole seconds, the lower 32 bits the binary
/// fraction of a second. Zero is the DENIL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Datetime(u64);

impl Datetime {
    pub const DENIL: Datetime = Datetime(DENIL_DATETIME);

    #[must_use]
    pub const fn from_fixedpoint(raw: u64) -> Self {
        Datetime(raw)
    }

    #[must_use]
    pub const fn fixedpoint(self) -> u64 {
        self.0
    }

    /// Builds a datetime from whole seconds and nanoseconds. Nanoseconds
    /// past one second are clamped. Converting back with
    /// [`nanos`](Datetime::nanos) returns the same value.
    #[must_use]
    pub fn from_unix(seconds: u32, nanos: u32) -> Self {
        let nanos = u64::from(nanos).min(NANOS_PER_SEC - 1);
        let fraction = (nanos << 32).div_ceil(NANOS_PER_SEC);
        Datetime(u64::from(seconds) << 32 | fraction)
    }

    /// Converts a UTC timestamp; `None` outside the 32-bit seconds range.
    #[must_use]
    pub fn from_utc(time: &DateTime<Utc>) -> Option<Self> {
        let seconds = u32::try_from(time.timestamp()).ok()?;
        Some(Self::from_unix(seconds, time.timestamp_subsec_nanos()))
    }

    #[must_use]
    pub const fn seconds(self) -> u32 {
        (self.0 >> 32) as u32
    }

    #[must_use]
    pub const fn nanos(self) -> u32 {
        ((self.0 & 0xFFFF_FFFF) * NANOS_PER_SEC >> 32) as u32
    }

    #[must_use]
    pub fn to_utc(self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(i64::from(self.seconds()), self.nanos())
    }
}

/// One field occurrence, borrowed from a tuple buffer (or from the caller
/// when inserting).
///
/// `Cstr` holds raw bytes: the format assumes UTF-8 but does not enforce it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value<'a> {
    Null,
    Uint16(u16),
    Int32(i32),
    Uint32(u32),
    Fp32(f32),
    Int64(i64),
    Uint64(u64),
    Fp64(f64),
    Datetime(Datetime),
    B96([u8; 12]),
    B128([u8; 16]),
    B160([u8; 20]),
    B256([u8; 32]),
    Cstr(&'a [u8]),
    Opaque(&'a [u8]),
    Nested(TupleView<'a>),
    Array(ArrayView<'a>),
}

impl<'a> Value<'a> {
    #[must_use]
    pub fn field_type(&self) -> FieldType {
        match self {
            Value::Null => FieldType::Null,
            Value::Uint16(_) => FieldType::Uint16,
            Value::Int32(_) => FieldType::Int32,
            Value::Uint32(_) => FieldType::Uint32,
            Value::Fp32(_) => FieldType::Fp32,
            Value::Int64(_) => FieldType::Int64,
            Value::Uint64(_) => FieldType::Uint64,
            Value::Fp64(_) => FieldType::Fp64,
            Value::Datetime(_) => FieldType::Datetime,
            Value::B96(_) => FieldType::B96,
            Value::B128(_) => FieldType::B128,
            Value::B160(_) => FieldType::B160,
            Value::B256(_) => FieldType::B256,
            Value::Cstr(_) => FieldType::Cstr,
            Value::Opaque(_) => FieldType::Opaque,
            Value::Nested(_) => FieldType::Nested,
            Value::Array(array) => array.field_type(),
        }
    }

    /// `true` if this is a fixed-width value holding its type's DENIL.
    #[must_use]
    pub fn is_denil(&self) -> bool {
        match *self {
            Value::Uint16(v) => v == DENIL_UINT16,
            Value::Int32(v) => v == DENIL_INT32,
            Value::Uint32(v) => v == DENIL_UINT32,
            Value::Fp32(v) => v.to_bits() == DENIL_FP32_BITS,
            Value::Int64(v) => v == DENIL_INT64,
            Value::Uint64(v) => v == DENIL_UINT64,
            Value::Fp64(v) => v.to_bits() == DENIL_FP64_BITS,
            Value::Datetime(v) => v == Datetime::DENIL,
            Value::B96(ref b) => b.iter().all(|&x| x == DENIL_FIXBIN_BYTE),
            Value::B128(ref b) => b.iter().all(|&x| x == DENIL_FIXBIN_BYTE),
            Value::B160(ref b) => b.iter().all(|&x| x == DENIL_FIXBIN_BYTE),
            Value::B256(ref b) => b.iter().all(|&x| x == DENIL_FIXBIN_BYTE),
            _ => false,
        }
    }

    /// The DENIL value of a fixed-width type.
    #[must_use]
    pub fn denil(ty: FieldType) -> Option<Value<'static>> {
        let fill = DENIL_FIXBIN_BYTE;
        Some(match ty {
            FieldType::Uint16 => Value::Uint16(DENIL_UINT16),
            FieldType::Int32 => Value::Int32(DENIL_INT32),
            FieldType::Uint32 => Value::Uint32(DENIL_UINT32),
            FieldType::Fp32 => Value::Fp32(f32::from_bits(DENIL_FP32_BITS)),
            FieldType::Int64 => Value::Int64(DENIL_INT64),
            FieldType::Uint64 => Value::Uint64(DENIL_UINT64),
            FieldType::Fp64 => Value::Fp64(f64::from_bits(DENIL_FP64_BITS)),
            FieldType::Datetime => Value::Datetime(Datetime::DENIL),
            FieldType::B96 => Value::B96([fill; 12]),
            FieldType::B128 => Value::B128([fill; 16]),
            FieldType::B160 => Value::B160([fill; 20]),
            FieldType::B256 => Value::B256([fill; 32]),
            _ => return None,
        })
    }

    /// Bytes of a string or opaque value.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&'a [u8]> {
        match *self {
            Value::Cstr(bytes) | Value::Opaque(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Slot contents for types stored in the directory.
    pub(crate) fn inline_slot(&self) -> Option<u32> {
        match *self {
            Value::Null => Some(0),
            Value::Uint16(v) => Some(u32::from(v)),
            Value::Int32(v) => Some(v as u32),
            Value::Uint32(v) => Some(v),
            Value::Fp32(v) => Some(v.to_bits()),
            _ => None,
        }
    }

    /// Number of bytes [`write_wire`](Value::write_wire) produces.
    pub(crate) fn wire_len(&self) -> usize {
        match self {
            Value::Cstr(bytes) | Value::Opaque(bytes) => LEN_PREFIX_BYTES + bytes.len(),
            Value::Nested(view) => LEN_PREFIX_BYTES + view.as_bytes().len(),
            Value::Array(array) => LEN_PREFIX_BYTES + array.as_bytes().len(),
            other => other.field_type().fixed_width().unwrap_or(0),
        }
    }

    /// Appends the payload form: raw little-endian bytes for fixed-width
    /// types, `len: u32` + bytes for everything else.
    pub(crate) fn write_wire(&self, out: &mut Vec<u8>) {
        // Writes into a Vec cannot fail.
        match *self {
            Value::Null => {}
            Value::Uint16(v) => out.extend_from_slice(&v.to_le_bytes()),
            Value::Int32(v) => out.extend_from_slice(&v.to_le_bytes()),
            Value::Uint32(v) => out.extend_from_slice(&v.to_le_bytes()),
            Value::Fp32(v) => out.extend_from_slice(&v.to_bits().to_le_bytes()),
            Value::Int64(v) => out.extend_from_slice(&v.to_le_bytes()),
            Value::Uint64(v) => out.extend_from_slice(&v.to_le_bytes()),
            Value::Fp64(v) => out.extend_from_slice(&v.to_bits().to_le_bytes()),
            Value::Datetime(v) => out.extend_from_slice(&v.fixedpoint().to_le_bytes()),
            Value::B96(ref b) => out.extend_from_slice(b),
            Value::B128(ref b) => out.extend_from_slice(b),
            Value::B160(ref b) => out.extend_from_slice(b),
            Value::B256(ref b) => out.extend_from_slice(b),
            Value::Cstr(bytes) | Value::Opaque(bytes) => write_prefixed(out, bytes),
            Value::Nested(view) => write_prefixed(out, view.as_bytes()),
            Value::Array(array) => write_prefixed(out, array.as_bytes()),
        }
    }

    /// Rebuilds an inline value from its directory slot.
    pub(crate) fn from_inline(ty: FieldType, slot: u32) -> Option<Value<'static>> {
        match ty {
            FieldType::Null if slot == 0 => Some(Value::Null),
            FieldType::Uint16 => u16::try_from(slot).ok().map(Value::Uint16),
            FieldType::Int32 => Some(Value::Int32(slot as i32)),
            FieldType::Uint32 => Some(Value::Uint32(slot)),
            FieldType::Fp32 => Some(Value::Fp32(f32::from_bits(slot))),
            _ => None,
        }
    }

    /// Decodes a fixed-width value from exactly `width` raw bytes.
    pub(crate) fn from_fixed(ty: FieldType, raw: &[u8]) -> Option<Value<'static>> {
        if ty.fixed_width() != Some(raw.len()) {
            return None;
        }
        Some(match ty {
            FieldType::Null => Value::Null,
            FieldType::Uint16 => Value::Uint16(LittleEndian::read_u16(raw)),
            FieldType::Int32 => Value::Int32(LittleEndian::read_i32(raw)),
            FieldType::Uint32 => Value::Uint32(LittleEndian::read_u32(raw)),
            FieldType::Fp32 => Value::Fp32(f32::from_bits(LittleEndian::read_u32(raw))),
            FieldType::Int64 => Value::Int64(LittleEndian::read_i64(raw)),
            FieldType::Uint64 => Value::Uint64(LittleEndian::read_u64(raw)),
            FieldType::Fp64 => Value::Fp64(f64::from_bits(LittleEndian::read_u64(raw))),
            FieldType::Datetime => Value::Datetime(Datetime(LittleEndian::read_u64(raw))),
            FieldType::B96 => Value::B96(fixbin(raw)),
            FieldType::B128 => Value::B128(fixbin(raw)),
            FieldType::B160 => Value::B160(fixbin(raw)),
            FieldType::B256 => Value::B256(fixbin(raw)),
            _ => return None,
        })
    }

    /// Decodes a variable-length body (the bytes after the length prefix).
    pub(crate) fn from_body(ty: FieldType, body: &'a [u8]) -> Result<Value<'a>, ValidationError> {
        match ty {
            FieldType::Cstr => Ok(Value::Cstr(body)),
            FieldType::Opaque => Ok(Value::Opaque(body)),
            FieldType::Nested => TupleView::new(body).map(Value::Nested),
            other => match other.element_type() {
                Some(elem) => ArrayView::parse(elem, body)
                    .map(Value::Array)
                    .map_err(|element| ValidationError::ArrayOverrun { index: 0, element }),
                None => Err(ValidationError::UnknownType {
                    index: 0,
                    code: other.code(),
                }),
            },
        }
    }
}

fn fixbin<const N: usize>(raw: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&raw[..N]);
    out
}

fn write_prefixed(out: &mut Vec<u8>, bytes: &[u8]) {
    out.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
    out.extend_from_slice(bytes);
}

impl From<u16> for Value<'_> {
    fn from(v: u16) -> Self {
        Value::Uint16(v)
    }
}

impl From<bool> for Value<'_> {
    fn from(v: bool) -> Self {
        Value::Uint16(u16::from(v))
    }
}

impl From<i32> for Value<'_> {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<u32> for Value<'_> {
    fn from(v: u32) -> Self {
        Value::Uint32(v)
    }
}

impl From<f32> for Value<'_> {
    fn from(v: f32) -> Self {
        Value::Fp32(v)
    }
}

impl From<i64> for Value<'_> {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<u64> for Value<'_> {
    fn from(v: u64) -> Self {
        Value::Uint64(v)
    }
}

impl From<f64> for Value<'_> {
    fn from(v: f64) -> Self {
        Value::Fp64(v)
    }
}

impl From<Datetime> for Value<'_> {
    fn from(v: Datetime) -> Self {
        Value::Datetime(v)
    }
}

impl<'a> From<&'a str> for Value<'a> {
    fn from(v: &'a str) -> Self {
        Value::Cstr(v.as_bytes())
    }
}

impl<'a> From<&'a [u8]> for Value<'a> {
    fn from(v: &'a [u8]) -> Self {
        Value::Opaque(v)
    }
}

impl<'a> From<TupleView<'a>> for Value<'a> {
    fn from(v: TupleView<'a>) -> Self {
        Value::Nested(v)
    }
}

impl<'a> From<ArrayView<'a>> for Value<'a> {
    fn from(v: ArrayView<'a>) -> Self {
        Value::Array(v)
    }
}

/// Borrowed body of an array-typed field.
///
/// ```text
/// [count: u32 LE][element 0][element 1]...
/// ```
///
/// Fixed-width elements are packed; variable-length elements each carry
/// their own `len: u32` prefix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArrayView<'a> {
    elem: FieldType,
    count: usize,
    body: &'a [u8],
}

impl<'a> ArrayView<'a> {
    /// Walks `body` and checks that exactly `count` elements fill it.
    /// On failure returns the index of the element that does not fit
    /// (`count` when bytes are left over).
    pub(crate) fn parse(elem: FieldType, body: &'a [u8]) -> Result<Self, usize> {
        let prefix = body.get(..LEN_PREFIX_BYTES).ok_or(0usize)?;
        let count = LittleEndian::read_u32(prefix) as usize;
        let mut pos = LEN_PREFIX_BYTES;
        match elem.fixed_width() {
            Some(width) => {
                let needed = count
                    .checked_mul(width)
                    .and_then(|n| n.checked_add(pos))
                    .ok_or(0usize)?;
                if needed > body.len() {
                    return Err((body.len() - pos) / width.max(1));
                }
                pos = needed;
            }
            None => {
                for element in 0..count {
                    let item = read_prefixed(body, pos).ok_or(element)?;
                    pos += LEN_PREFIX_BYTES + item.len();
                }
            }
        }
        if pos != body.len() {
            return Err(count);
        }
        Ok(ArrayView { elem, count, body })
    }

    /// Encodes `items` into `out` as an array body. Every item must have
    /// type `elem`.
    pub(crate) fn encode(
        elem: FieldType,
        items: &[Value<'_>],
        out: &mut Vec<u8>,
    ) -> Result<(), TupleError> {
        let count = u32::try_from(items.len()).map_err(|_| TupleError::Capacity {
            what: "array elements",
            limit: u32::MAX as usize,
        })?;
        out.extend_from_slice(&count.to_le_bytes());
        for item in items {
            if item.field_type() != elem {
                return Err(TupleError::TypeMismatch {
                    expected: elem,
                    actual: item.field_type(),
                });
            }
            item.write_wire(out);
        }
        Ok(())
    }

    /// Element type.
    #[must_use]
    pub fn element_type(&self) -> FieldType {
        self.elem
    }

    /// Array type of the field holding this body.
    #[must_use]
    pub fn field_type(&self) -> FieldType {
        self.elem.array_of().unwrap_or(FieldType::Null)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.count
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// The encoded body, count prefix included.
    #[must_use]
    pub fn as_bytes(&self) -> &'a [u8] {
        self.body
    }

    pub fn iter(&self) -> ArrayIter<'a> {
        ArrayIter {
            elem: self.elem,
            body: self.body,
            pos: LEN_PREFIX_BYTES,
            element: 0,
            remaining: self.count,
        }
    }
}

impl<'a> IntoIterator for ArrayView<'a> {
    type Item = Result<Value<'a>, TupleError>;
    type IntoIter = ArrayIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the elements of an [`ArrayView`].
pub struct ArrayIter<'a> {
    elem: FieldType,
    body: &'a [u8],
    pos: usize,
    element: usize,
    remaining: usize,
}

impl<'a> Iterator for ArrayIter<'a> {
    type Item = Result<Value<'a>, TupleError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let element = self.element;
        self.element += 1;
        self.remaining -= 1;
        let overrun = || ValidationError::ArrayOverrun { index: 0, element };

        let decoded = match self.elem.fixed_width() {
            Some(width) => {
                let raw = self.body.get(self.pos..self.pos + width);
                self.pos += width;
                raw.and_then(|raw| Value::from_fixed(self.elem, raw))
                    .ok_or_else(overrun)
            }
            None => match read_prefixed(self.body, self.pos) {
                Some(item) => {
                    self.pos += LEN_PREFIX_BYTES + item.len();
                    Value::from_body(self.elem, item)
                }
                None => Err(overrun()),
            },
        };
        Some(decoded.map_err(TupleError::from))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}
