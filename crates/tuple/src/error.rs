use thiserror::Error;

use crate::tag::FieldType;

/// Structural problems found while walking a tuple buffer.
///
/// `index` is the position of the offending entry in the directory.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The buffer is shorter than the fixed header.
    #[error("tuple too short for header: {len} bytes")]
    TruncatedHeader { len: usize },

    /// The header does not carry the tuple magic.
    #[error("bad tuple magic {0:#06x}")]
    BadMagic(u16),

    /// Header counts disagree with the buffer length.
    #[error("tuple length mismatch: header declares {declared} bytes, buffer has {actual}")]
    LengthMismatch { declared: usize, actual: usize },

    /// The directory entry carries a type code outside the enumeration.
    #[error("field #{index}: unknown type code {code}")]
    UnknownType { index: usize, code: u8 },

    /// The directory entry carries a column number wider than 16 bits.
    #[error("field #{index}: malformed tag {raw:#010x}")]
    BadTag { index: usize, raw: u32 },

    /// An inline slot has bits set outside the value width.
    #[error("field #{index}: inline slot {slot:#x} does not fit its type")]
    DirtySlot { index: usize, slot: u32 },

    /// A payload offset points past the payload area.
    #[error("field #{index}: payload offset {offset} out of range")]
    OffsetOutOfRange { index: usize, offset: usize },

    /// A payload item runs past the end of the payload area.
    #[error("field #{index}: truncated payload at offset {offset}")]
    TruncatedPayload { index: usize, offset: usize },

    /// An array element runs past the end of the array body, or the body
    /// has bytes left after the last element.
    #[error("field #{index}: array element {element} overruns the array body")]
    ArrayOverrun { index: usize, element: usize },

    /// Nested tuples go deeper than [`MAX_NESTING_DEPTH`](crate::MAX_NESTING_DEPTH).
    #[error("field #{index}: nested tuples deeper than {limit} levels")]
    TooDeep { index: usize, limit: usize },

    /// Two directory entries reference overlapping payload bytes.
    #[error("field #{index}: payload at offset {offset} overlaps another field")]
    OverlappingPayload { index: usize, offset: usize },

    /// A nested tuple failed validation.
    #[error("field #{index}: nested tuple is invalid: {source}")]
    Nested {
        index: usize,
        source: Box<ValidationError>,
    },
}

/// Errors returned by tuple construction and access.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TupleError {
    /// The field or byte budget of a builder is exhausted.
    #[error("capacity exceeded: {what} limit is {limit}")]
    Capacity { what: &'static str, limit: usize },

    /// A value or a requested type disagrees with the type of the tag.
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        expected: FieldType,
        actual: FieldType,
    },

    /// The operation has no meaning for this type code.
    #[error("invalid type code {0}")]
    InvalidType(u8),

    /// A string field does not hold UTF-8.
    #[error("column {column}: string is not valid UTF-8")]
    InvalidUtf8 { column: u16 },

    /// Builder bookkeeping is inconsistent. Only reachable through a bug.
    #[error("corrupt tuple: {0}")]
    Corruption(ValidationError),

    /// A view over foreign bytes failed validation.
    #[error("invalid tuple: {0}")]
    Validation(#[from] ValidationError),
}
