use std::fmt;

use tracing::debug;

use crate::error::{TupleError, ValidationError};
use crate::format::{read_prefixed, DirEntry, Header, HEADER_BYTES, MAX_NESTING_DEPTH};
use crate::tag::{FieldType, Tag, TYPE_BITS};
use crate::value::{ArrayView, Datetime, Value};

const TYPE_MASK: u32 = (1 << TYPE_BITS) - 1;

/// Read-only view over the bytes of one tuple.
///
/// A view is a borrowed slice plus the parsed header, so it is `Copy` and
/// can be handed around freely. Construction with [`new`](TupleView::new)
/// only checks the header; field access decodes lazily and reports bad
/// entries as errors. [`open`](TupleView::open) validates everything up
/// front, nested tuples included.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct TupleView<'a> {
    bytes: &'a [u8],
    header: Header,
}

impl<'a> TupleView<'a> {
    /// Wraps `bytes` after checking the header: size, magic, and that the
    /// declared directory and payload lengths add up to `bytes.len()`.
    ///
    /// # Errors
    ///
    /// `TruncatedHeader`, `BadMagic` or `LengthMismatch`.
    pub fn new(bytes: &'a [u8]) -> Result<Self, ValidationError> {
        let header = Header::read(bytes)?;
        let declared = header.total_len();
        if declared != bytes.len() {
            return Err(ValidationError::LengthMismatch {
                declared,
                actual: bytes.len(),
            });
        }
        Ok(TupleView { bytes, header })
    }

    /// [`new`](TupleView::new) followed by a full [`check`](TupleView::check).
    pub fn open(bytes: &'a [u8]) -> Result<Self, TupleError> {
        let view = Self::new(bytes)?;
        view.check()?;
        Ok(view)
    }

    /// Number of directory entries (field occurrences).
    #[must_use]
    pub fn len(&self) -> usize {
        self.header.count as usize
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.header.count == 0
    }

    #[must_use]
    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    #[must_use]
    pub fn to_vec(&self) -> Vec<u8> {
        self.bytes.to_vec()
    }

    fn payload(&self) -> &'a [u8] {
        &self.bytes[self.header.payload_start()..]
    }

    /// Walks every entry and reports the first structural problem.
    ///
    /// Nested tuples (plain or inside arrays) are checked recursively, at
    /// most [`MAX_NESTING_DEPTH`] levels down; their errors come back
    /// wrapped in [`ValidationError::Nested`]. Payload items of different
    /// fields must not overlap.
    pub fn check(&self) -> Result<(), ValidationError> {
        self.check_at(0)
    }

    /// Checks a tuple about to be embedded one level down.
    pub(crate) fn check_embedded(&self) -> Result<(), ValidationError> {
        self.check_at(1)
    }

    fn check_at(&self, depth: usize) -> Result<(), ValidationError> {
        let result = self.check_entries(depth);
        if let Err(ref err) = result {
            debug!(len = self.bytes.len(), error = %err, "tuple validation failed");
        }
        result
    }

    /// `depth` counts the tuples enclosing this one.
    fn check_entries(&self, depth: usize) -> Result<(), ValidationError> {
        let mut spans = Vec::new();
        for index in 0..self.len() {
            let field = self.decode(index)?;
            if !field.field_type().is_inline() {
                let offset = DirEntry::read(self.bytes, index).slot as usize;
                spans.push((offset, offset + field.value.wire_len(), index));
            }
            let nested = |source: ValidationError| ValidationError::Nested {
                index,
                source: Box::new(source),
            };
            let descend = |inner: TupleView<'_>| {
                if depth >= MAX_NESTING_DEPTH {
                    return Err(ValidationError::TooDeep {
                        index,
                        limit: MAX_NESTING_DEPTH,
                    });
                }
                inner.check_entries(depth + 1).map_err(nested)
            };
            match field.value {
                Value::Nested(inner) => descend(inner)?,
                Value::Array(array) if array.element_type() == FieldType::Nested => {
                    for item in array.iter() {
                        match item {
                            Ok(Value::Nested(inner)) => descend(inner)?,
                            Ok(_) => {}
                            Err(TupleError::Validation(source)) => return Err(nested(source)),
                            Err(_) => {
                                return Err(ValidationError::ArrayOverrun { index, element: 0 })
                            }
                        }
                    }
                }
                _ => {}
            }
        }

        spans.sort_unstable();
        for pair in spans.windows(2) {
            if let [(_, end, _), (start, _, index)] = *pair {
                if start < end {
                    return Err(ValidationError::OverlappingPayload {
                        index,
                        offset: start,
                    });
                }
            }
        }
        Ok(())
    }

    /// Decodes directory entry `index`. Nested bodies get a header check
    /// only.
    fn decode(&self, index: usize) -> Result<Field<'a>, ValidationError> {
        let entry = DirEntry::read(self.bytes, index);
        let code = (entry.tag & TYPE_MASK) as u8;
        let ty = FieldType::from_code(code).ok_or(ValidationError::UnknownType { index, code })?;
        let column = u16::try_from(entry.tag >> TYPE_BITS).map_err(|_| ValidationError::BadTag {
            index,
            raw: entry.tag,
        })?;
        let tag = Tag::new(column, ty);

        if ty.is_inline() {
            let value = Value::from_inline(ty, entry.slot).ok_or(ValidationError::DirtySlot {
                index,
                slot: entry.slot,
            })?;
            return Ok(Field { tag, value, index });
        }

        let payload = self.payload();
        let offset = entry.slot as usize;
        if offset >= payload.len() {
            return Err(ValidationError::OffsetOutOfRange { index, offset });
        }
        let truncated = ValidationError::TruncatedPayload { index, offset };
        let value = match ty.fixed_width() {
            Some(width) => payload
                .get(offset..offset + width)
                .and_then(|raw| Value::from_fixed(ty, raw))
                .ok_or(truncated)?,
            None => {
                let body = read_prefixed(payload, offset).ok_or(truncated)?;
                match Value::from_body(ty, body) {
                    Ok(value) => value,
                    Err(ValidationError::ArrayOverrun { element, .. }) => {
                        return Err(ValidationError::ArrayOverrun { index, element })
                    }
                    Err(source) => {
                        return Err(ValidationError::Nested {
                            index,
                            source: Box::new(source),
                        })
                    }
                }
            }
        };
        Ok(Field { tag, value, index })
    }

    /// Iterates every occurrence in directory (insertion) order.
    pub fn fields(&self) -> Fields<'a> {
        Fields {
            view: *self,
            index: 0,
        }
    }

    /// Iterates the occurrences of one tag, in insertion order.
    pub fn occurrences(&self, tag: Tag) -> impl Iterator<Item = Result<Value<'a>, TupleError>> {
        self.fields().filter_map(move |field| match field {
            Ok(field) if field.tag == tag => Some(Ok(field.value)),
            Ok(_) => None,
            Err(err) => Some(Err(err)),
        })
    }

    /// First occurrence of `tag`.
    pub fn get(&self, tag: Tag) -> Result<Option<Value<'a>>, TupleError> {
        self.occurrences(tag).next().transpose()
    }

    /// First occurrence in `column` stored as `ty`.
    ///
    /// # Errors
    ///
    /// [`TupleError::TypeMismatch`] when the column holds occurrences of
    /// other types only.
    pub fn get_as(&self, column: u16, ty: FieldType) -> Result<Option<Value<'a>>, TupleError> {
        let mut other = None;
        for field in self.fields() {
            let field = field?;
            if field.column() != column {
                continue;
            }
            if field.field_type() == ty {
                return Ok(Some(field.value));
            }
            other.get_or_insert(field.field_type());
        }
        match other {
            Some(actual) => Err(TupleError::TypeMismatch {
                expected: ty,
                actual,
            }),
            None => Ok(None),
        }
    }

    /// Boolean stored as uint16; any non-zero value is `true`.
    pub fn get_bool(&self, column: u16) -> Result<Option<bool>, TupleError> {
        Ok(self.get_u16(column)?.map(|v| v != 0))
    }

    /// Enumeration value (a uint16).
    pub fn get_enum(&self, column: u16) -> Result<Option<u16>, TupleError> {
        self.get_u16(column)
    }

    /// String field as `&str`.
    ///
    /// # Errors
    ///
    /// [`TupleError::InvalidUtf8`] if the bytes are not UTF-8.
    pub fn get_str(&self, column: u16) -> Result<Option<&'a str>, TupleError> {
        match self.get_cstr(column)? {
            Some(bytes) => std::str::from_utf8(bytes)
                .map(Some)
                .map_err(|_| TupleError::InvalidUtf8 { column }),
            None => Ok(None),
        }
    }

    /// Array field whose elements have type `elem`.
    pub fn get_array(
        &self,
        column: u16,
        elem: FieldType,
    ) -> Result<Option<ArrayView<'a>>, TupleError> {
        match self.get_as(column, elem.array_of()?)? {
            Some(Value::Array(array)) => Ok(Some(array)),
            _ => Ok(None),
        }
    }
}

macro_rules! typed_getters {
    ($($name:ident => $variant:ident: $ty:ty),* $(,)?) => {
        impl<'a> TupleView<'a> {
            $(
                #[doc = concat!("First `", stringify!($variant), "` occurrence in `column`.")]
                pub fn $name(&self, column: u16) -> Result<Option<$ty>, TupleError> {
                    match self.get_as(column, FieldType::$variant)? {
                        Some(Value::$variant(v)) => Ok(Some(v)),
                        _ => Ok(None),
                    }
                }
            )*
        }
    };
}

typed_getters! {
    get_u16 => Uint16: u16,
    get_i32 => Int32: i32,
    get_u32 => Uint32: u32,
    get_f32 => Fp32: f32,
    get_i64 => Int64: i64,
    get_u64 => Uint64: u64,
    get_f64 => Fp64: f64,
    get_datetime => Datetime: Datetime,
    get_b96 => B96: [u8; 12],
    get_b128 => B128: [u8; 16],
    get_b160 => B160: [u8; 20],
    get_b256 => B256: [u8; 32],
    get_cstr => Cstr: &'a [u8],
    get_opaque => Opaque: &'a [u8],
    get_nested => Nested: TupleView<'a>,
}

impl fmt::Debug for TupleView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TupleView")
            .field("fields", &self.header.count)
            .field("payload", &self.header.payload_len)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

impl Default for TupleView<'static> {
    /// The empty tuple.
    fn default() -> Self {
        static EMPTY: [u8; HEADER_BYTES] = [0, 0, 0x46, 0x55, 0, 0, 0, 0];
        TupleView {
            bytes: &EMPTY,
            header: Header {
                count: 0,
                payload_len: 0,
            },
        }
    }
}

/// One decoded occurrence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Field<'a> {
    tag: Tag,
    value: Value<'a>,
    index: usize,
}

impl<'a> Field<'a> {
    #[must_use]
    pub fn tag(&self) -> Tag {
        self.tag
    }

    #[must_use]
    pub fn column(&self) -> u16 {
        self.tag.column()
    }

    #[must_use]
    pub fn field_type(&self) -> FieldType {
        self.tag.field_type()
    }

    #[must_use]
    pub fn value(&self) -> Value<'a> {
        self.value
    }

    /// Position in the directory.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }
}

/// Iterator returned by [`TupleView::fields`].
pub struct Fields<'a> {
    view: TupleView<'a>,
    index: usize,
}

impl<'a> Iterator for Fields<'a> {
    type Item = Result<Field<'a>, TupleError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.view.len() {
            return None;
        }
        let index = self.index;
        self.index += 1;
        Some(self.view.decode(index).map_err(TupleError::from))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.view.len() - self.index;
        (left, Some(left))
    }
}

impl<'a> IntoIterator for TupleView<'a> {
    type Item = Result<Field<'a>, TupleError>;
    type IntoIter = Fields<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields()
    }
}
