//! # Tuple - fast positive tuples
//!
//! Compact, self-describing binary records. A tuple is a flat list of
//! field occurrences, each identified by a [`Tag`] (column number plus
//! [`FieldType`]). Fields are read by tag straight from the buffer, without
//! deserializing the whole record.
//!
//! ## Layout
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │ HEADER (8 bytes)                                               │
//! │                                                               │
//! │ count (u16) | magic (u16) "FU" | payload_len (u32)             │
//! ├───────────────────────────────────────────────────────────────┤
//! │ DIRECTORY (count × 8 bytes, insertion order)                   │
//! │                                                               │
//! │ tag (u32) = column << 5 | type | slot (u32)                    │
//! │                                                               │
//! │ null, uint16, int32, uint32, fp32: value kept in the slot      │
//! │ everything else: slot = offset into the payload                │
//! ├───────────────────────────────────────────────────────────────┤
//! │ PAYLOAD (payload_len bytes)                                    │
//! │                                                               │
//! │ 64-bit scalars, datetime, b96..b256: raw bytes                 │
//! │ cstr, opaque, nested, arrays: len (u32) | bytes                │
//! │ nested = a complete tuple, arrays = count (u32) | elements     │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! All integers are little-endian.
//!
//! ## Absent values
//!
//! Fixed-width types reserve one bit pattern, the DENIL, meaning "no
//! value" (see [`denil`]). Variable-length fields are absent when they have
//! no directory entry.
//!
//! ## Lifecycle
//!
//! A [`TupleBuilder`] is created with field and byte budgets, mutated with
//! `insert`/`upsert`/`erase`, then frozen into a [`TupleView`] borrowing its
//! buffer. Views over foreign bytes come from [`TupleView::open`].

pub mod denil;
mod builder;
mod error;
mod format;
mod tag;
mod value;
mod view;

pub use builder::TupleBuilder;
pub use denil::{denil_for, is_denil, Denil};
pub use error::{TupleError, ValidationError};
pub use format::{
    DIR_ENTRY_BYTES, HEADER_BYTES, LEN_PREFIX_BYTES, MAX_FIELDS, MAX_NESTING_DEPTH, MAX_TUPLE_BYTES,
    TUPLE_MAGIC,
};
pub use tag::{
    array_type_of, make_tag, tag_to_column, tag_to_type, FieldType, Tag, ARRAY_FLAG, TYPE_BITS,
};
pub use value::{ArrayIter, ArrayView, Datetime, Value};
pub use view::{Field, Fields, TupleView};
