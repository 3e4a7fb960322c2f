use byteorder::{ByteOrder, LittleEndian};
use tracing::{debug, trace};

use crate::error::{TupleError, ValidationError};
use crate::format::{
    read_prefixed, DirEntry, Header, DIR_ENTRY_BYTES, HEADER_BYTES, LEN_PREFIX_BYTES, MAX_FIELDS,
    MAX_TUPLE_BYTES,
};
use crate::tag::{FieldType, Tag};
use crate::value::{ArrayView, Datetime, Value};
use crate::view::TupleView;

/// Initial allocation of a fresh builder. The buffer grows on demand up to
/// `max_bytes`.
const INITIAL_CAPACITY: usize = 256;

/// Mutable tuple under construction.
///
/// The builder keeps the tuple in its final wire form at all times:
///
/// ```text
/// [header][directory: count × 8 bytes][payload]
/// ```
///
/// New payload is appended at the end and new directory entries are
/// spliced in before the payload, so payload offsets (relative to the
/// payload start) never move. Erasing or replacing a referenced value
/// leaves its old bytes behind as junk until a shrinking
/// [`freeze`](TupleBuilder::freeze) compacts the payload.
///
/// Every failed mutation leaves the builder unchanged.
#[derive(Debug, Clone)]
pub struct TupleBuilder {
    buf: Vec<u8>,
    count: usize,
    max_fields: usize,
    max_bytes: usize,
    junk: usize,
}

impl TupleBuilder {
    /// Creates an empty builder with the given budgets.
    ///
    /// # Errors
    ///
    /// [`TupleError::Capacity`] if `max_fields` exceeds [`MAX_FIELDS`], or
    /// `max_bytes` is below the header size or above [`MAX_TUPLE_BYTES`].
    pub fn new(max_fields: usize, max_bytes: usize) -> Result<Self, TupleError> {
        if max_fields > MAX_FIELDS {
            return Err(TupleError::Capacity {
                what: "fields",
                limit: MAX_FIELDS,
            });
        }
        if !(HEADER_BYTES..=MAX_TUPLE_BYTES).contains(&max_bytes) {
            return Err(TupleError::Capacity {
                what: "bytes",
                limit: MAX_TUPLE_BYTES,
            });
        }
        let mut buf = Vec::with_capacity(max_bytes.min(INITIAL_CAPACITY));
        buf.resize(HEADER_BYTES, 0);
        let mut builder = TupleBuilder {
            buf,
            count: 0,
            max_fields,
            max_bytes,
            junk: 0,
        };
        builder.sync_header();
        Ok(builder)
    }

    /// Loads an existing tuple for further editing. The tuple is validated
    /// and must fit the given budgets.
    pub fn fetch(
        view: &TupleView<'_>,
        max_fields: usize,
        max_bytes: usize,
    ) -> Result<Self, TupleError> {
        view.check()?;
        let mut builder = Self::new(max_fields, max_bytes)?;
        if view.len() > max_fields {
            return Err(TupleError::Capacity {
                what: "fields",
                limit: max_fields,
            });
        }
        if view.as_bytes().len() > max_bytes {
            return Err(TupleError::Capacity {
                what: "bytes",
                limit: max_bytes,
            });
        }
        builder.buf.clear();
        builder.buf.extend_from_slice(view.as_bytes());
        builder.count = view.len();
        Ok(builder)
    }

    /// Drops every field. The allocation is kept.
    pub fn clear(&mut self) {
        self.buf.truncate(HEADER_BYTES);
        self.count = 0;
        self.junk = 0;
        self.sync_header();
    }

    /// Number of field occurrences.
    #[must_use]
    pub fn len(&self) -> usize {
        self.count
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Current size of the tuple, junk included.
    #[must_use]
    pub fn bytes_used(&self) -> usize {
        self.buf.len()
    }

    /// Payload bytes no longer referenced by any field.
    #[must_use]
    pub fn junk_bytes(&self) -> usize {
        self.junk
    }

    #[must_use]
    pub fn max_fields(&self) -> usize {
        self.max_fields
    }

    #[must_use]
    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Appends one occurrence of `tag`. Inserting the same tag again adds
    /// another occurrence after the existing ones.
    ///
    /// # Errors
    ///
    /// [`TupleError::TypeMismatch`] if `value` is not of the tag's type,
    /// [`TupleError::Capacity`] if the field or byte budget would be
    /// exceeded, [`TupleError::Validation`] if a nested tuple in `value`
    /// is malformed or nests too deep.
    pub fn insert(&mut self, tag: Tag, value: Value<'_>) -> Result<(), TupleError> {
        check_type(tag, &value)?;
        check_embedded(&value)?;
        self.ensure_room(1, payload_len(&value))?;
        let slot = self.append_payload(&value);
        self.insert_entry(
            self.count,
            DirEntry {
                tag: tag.raw(),
                slot,
            },
        );
        trace!(%tag, fields = self.count, bytes = self.buf.len(), "inserted field");
        Ok(())
    }

    /// Replaces every occurrence of `tag` with a single one holding
    /// `value`. The survivor keeps the position of the first occurrence;
    /// without any occurrence this is an [`insert`](TupleBuilder::insert).
    pub fn upsert(&mut self, tag: Tag, value: Value<'_>) -> Result<(), TupleError> {
        check_type(tag, &value)?;
        check_embedded(&value)?;
        let positions = self.positions(tag);
        let Some((&first, rest)) = positions.split_first() else {
            return self.insert(tag, value);
        };

        let ty = tag.field_type();
        let entry = DirEntry::read(&self.buf, first);
        let payload_start = self.payload_start();
        match (value.inline_slot(), ty.fixed_width()) {
            (Some(slot), _) => DirEntry { slot, ..entry }.write(&mut self.buf, first),
            (None, Some(width)) => {
                // Same width: overwrite the old bytes in place.
                let at = payload_start + entry.slot as usize;
                let mut raw = Vec::with_capacity(width);
                value.write_wire(&mut raw);
                let target = self
                    .buf
                    .get_mut(at..at + width)
                    .ok_or(TupleError::Corruption(ValidationError::TruncatedPayload {
                        index: first,
                        offset: entry.slot as usize,
                    }))?;
                target.copy_from_slice(&raw);
            }
            (None, None) => {
                self.ensure_room(0, payload_len(&value))?;
                let old = self.item_len(first)?;
                let slot = self.append_payload(&value);
                self.junk += old;
                DirEntry { slot, ..entry }.write(&mut self.buf, first);
            }
        }

        for &index in rest.iter().rev() {
            self.junk += self.item_len(index)?;
            self.remove_entry(index);
        }
        trace!(%tag, replaced = positions.len(), junk = self.junk, "upserted field");
        Ok(())
    }

    /// Removes every occurrence of `tag` and returns how many there were.
    pub fn erase(&mut self, tag: Tag) -> Result<usize, TupleError> {
        let positions = self.positions(tag);
        let freed = positions
            .iter()
            .map(|&index| self.item_len(index))
            .sum::<Result<usize, TupleError>>()?;
        for &index in positions.iter().rev() {
            self.remove_entry(index);
        }
        self.junk += freed;
        if !positions.is_empty() {
            trace!(%tag, removed = positions.len(), junk = self.junk, "erased field");
        }
        Ok(positions.len())
    }

    /// Embeds a copy of `child` as a nested tuple in `column`.
    pub fn insert_nested(&mut self, column: u16, child: &TupleView<'_>) -> Result<(), TupleError> {
        self.insert(Tag::new(column, FieldType::Nested), Value::Nested(*child))
    }

    pub fn upsert_nested(&mut self, column: u16, child: &TupleView<'_>) -> Result<(), TupleError> {
        self.upsert(Tag::new(column, FieldType::Nested), Value::Nested(*child))
    }

    /// Freezes `child` (shrinking it) and moves it into `column` as a
    /// nested tuple.
    pub fn insert_nested_owned(
        &mut self,
        column: u16,
        child: TupleBuilder,
    ) -> Result<(), TupleError> {
        let bytes = child.into_bytes()?;
        let view = TupleView::new(&bytes).map_err(TupleError::Corruption)?;
        self.insert_nested(column, &view)
    }

    /// Appends one array-typed field holding `items`, all of type `elem`.
    ///
    /// # Errors
    ///
    /// [`TupleError::InvalidType`] if `elem` has no array counterpart,
    /// [`TupleError::TypeMismatch`] if an item is not of type `elem`.
    pub fn insert_array(
        &mut self,
        column: u16,
        elem: FieldType,
        items: &[Value<'_>],
    ) -> Result<(), TupleError> {
        let ty = elem.array_of()?;
        let body = encode_array(elem, items)?;
        let array = parse_encoded(elem, &body, self.count)?;
        self.insert(Tag::new(column, ty), Value::Array(array))
    }

    pub fn upsert_array(
        &mut self,
        column: u16,
        elem: FieldType,
        items: &[Value<'_>],
    ) -> Result<(), TupleError> {
        let ty = elem.array_of()?;
        let body = encode_array(elem, items)?;
        let array = parse_encoded(elem, &body, self.count)?;
        self.upsert(Tag::new(column, ty), Value::Array(array))
    }

    /// Stores a boolean as a uint16 0 or 1.
    pub fn insert_bool(&mut self, column: u16, value: bool) -> Result<(), TupleError> {
        self.insert(Tag::new(column, FieldType::Uint16), value.into())
    }

    pub fn upsert_bool(&mut self, column: u16, value: bool) -> Result<(), TupleError> {
        self.upsert(Tag::new(column, FieldType::Uint16), value.into())
    }

    pub fn insert_enum(&mut self, column: u16, value: u16) -> Result<(), TupleError> {
        self.insert(Tag::new(column, FieldType::ENUM), Value::Uint16(value))
    }

    pub fn upsert_enum(&mut self, column: u16, value: u16) -> Result<(), TupleError> {
        self.upsert(Tag::new(column, FieldType::ENUM), Value::Uint16(value))
    }

    pub fn insert_str(&mut self, column: u16, value: &str) -> Result<(), TupleError> {
        self.insert(Tag::new(column, FieldType::Cstr), value.into())
    }

    pub fn upsert_str(&mut self, column: u16, value: &str) -> Result<(), TupleError> {
        self.upsert(Tag::new(column, FieldType::Cstr), value.into())
    }

    /// Validates the tuple and returns a view over it. With `shrink` the
    /// junk is compacted away and spare capacity released first.
    ///
    /// The view borrows the builder, so no mutation can happen while it is
    /// alive.
    ///
    /// # Errors
    ///
    /// [`TupleError::Corruption`] if the buffer fails validation.
    pub fn freeze(&mut self, shrink: bool) -> Result<TupleView<'_>, TupleError> {
        if shrink {
            self.compact()?;
            self.buf.shrink_to_fit();
        }
        trace!(
            fields = self.count,
            bytes = self.buf.len(),
            junk = self.junk,
            shrink,
            "freezing tuple"
        );
        let view = TupleView::new(&self.buf).map_err(TupleError::Corruption)?;
        view.check().map_err(TupleError::Corruption)?;
        Ok(view)
    }

    /// Shrink-freezes the tuple and hands over its bytes.
    pub fn into_bytes(mut self) -> Result<Vec<u8>, TupleError> {
        self.freeze(true)?;
        Ok(self.buf)
    }

    fn payload_start(&self) -> usize {
        HEADER_BYTES + self.count * DIR_ENTRY_BYTES
    }

    fn sync_header(&mut self) {
        let header = Header {
            count: self.count as u16,
            payload_len: (self.buf.len() - self.payload_start()) as u32,
        };
        header.write(&mut self.buf);
    }

    fn ensure_room(&self, fields: usize, payload: usize) -> Result<(), TupleError> {
        if self.count + fields > self.max_fields {
            debug!(limit = self.max_fields, "tuple field budget exhausted");
            return Err(TupleError::Capacity {
                what: "fields",
                limit: self.max_fields,
            });
        }
        let needed = self.buf.len() + fields * DIR_ENTRY_BYTES + payload;
        if needed > self.max_bytes {
            debug!(needed, limit = self.max_bytes, "tuple byte budget exhausted");
            return Err(TupleError::Capacity {
                what: "bytes",
                limit: self.max_bytes,
            });
        }
        Ok(())
    }

    /// Writes the payload of `value` (if any) and returns the slot.
    fn append_payload(&mut self, value: &Value<'_>) -> u32 {
        if let Some(slot) = value.inline_slot() {
            return slot;
        }
        let offset = self.buf.len() - self.payload_start();
        value.write_wire(&mut self.buf);
        self.sync_header();
        offset as u32
    }

    fn insert_entry(&mut self, index: usize, entry: DirEntry) {
        let at = DirEntry::offset(index);
        let old_len = self.buf.len();
        self.buf.resize(old_len + DIR_ENTRY_BYTES, 0);
        self.buf.copy_within(at..old_len, at + DIR_ENTRY_BYTES);
        self.count += 1;
        entry.write(&mut self.buf, index);
        self.sync_header();
    }

    fn remove_entry(&mut self, index: usize) {
        let at = DirEntry::offset(index);
        let len = self.buf.len();
        self.buf.copy_within(at + DIR_ENTRY_BYTES..len, at);
        self.buf.truncate(len - DIR_ENTRY_BYTES);
        self.count -= 1;
        self.sync_header();
    }

    /// Directory indices holding `tag`, in order.
    fn positions(&self, tag: Tag) -> Vec<usize> {
        let raw = tag.raw();
        (0..self.count)
            .filter(|&index| DirEntry::read(&self.buf, index).tag == raw)
            .collect()
    }

    /// Payload bytes referenced by entry `index` (zero for inline types).
    fn item_len(&self, index: usize) -> Result<usize, TupleError> {
        let entry = DirEntry::read(&self.buf, index);
        let ty = Tag::from_raw(entry.tag)?.field_type();
        if ty.is_inline() {
            return Ok(0);
        }
        if let Some(width) = ty.fixed_width() {
            return Ok(width);
        }
        let payload = &self.buf[self.payload_start()..];
        read_prefixed(payload, entry.slot as usize)
            .map(|body| LEN_PREFIX_BYTES + body.len())
            .ok_or(TupleError::Corruption(ValidationError::TruncatedPayload {
                index,
                offset: entry.slot as usize,
            }))
    }

    /// Rewrites the payload with only the referenced bytes, in directory
    /// order.
    fn compact(&mut self) -> Result<(), TupleError> {
        if self.junk == 0 {
            return Ok(());
        }
        let start = self.payload_start();
        let mut payload = Vec::with_capacity(self.buf.len() - start - self.junk);
        for index in 0..self.count {
            let len = self.item_len(index)?;
            if len == 0 {
                continue;
            }
            let entry = DirEntry::read(&self.buf, index);
            let from = start + entry.slot as usize;
            let item = self.buf.get(from..from + len).ok_or(TupleError::Corruption(
                ValidationError::TruncatedPayload {
                    index,
                    offset: entry.slot as usize,
                },
            ))?;
            let slot = payload.len() as u32;
            payload.extend_from_slice(item);
            LittleEndian::write_u32(
                &mut self.buf[DirEntry::offset(index) + 4..DirEntry::offset(index) + 8],
                slot,
            );
        }
        trace!(reclaimed = self.junk, "compacted tuple payload");
        self.buf.truncate(start);
        self.buf.extend_from_slice(&payload);
        self.junk = 0;
        self.sync_header();
        Ok(())
    }
}

fn check_type(tag: Tag, value: &Value<'_>) -> Result<(), TupleError> {
    let actual = value.field_type();
    if actual != tag.field_type() {
        debug!(%tag, %actual, "rejected value of wrong type");
        return Err(TupleError::TypeMismatch {
            expected: tag.field_type(),
            actual,
        });
    }
    Ok(())
}

/// Validates the tuples `value` would embed, one level below this one.
fn check_embedded(value: &Value<'_>) -> Result<(), TupleError> {
    let result = match value {
        Value::Nested(child) => child.check_embedded().map_err(TupleError::from),
        Value::Array(array) if array.element_type() == FieldType::Nested => {
            array.iter().try_for_each(|item| match item? {
                Value::Nested(child) => child.check_embedded().map_err(TupleError::from),
                _ => Ok(()),
            })
        }
        _ => Ok(()),
    };
    if let Err(ref err) = result {
        debug!(error = %err, "rejected malformed nested tuple");
    }
    result
}

fn payload_len(value: &Value<'_>) -> usize {
    if value.inline_slot().is_some() {
        0
    } else {
        value.wire_len()
    }
}

fn encode_array(elem: FieldType, items: &[Value<'_>]) -> Result<Vec<u8>, TupleError> {
    let mut body = Vec::new();
    ArrayView::encode(elem, items, &mut body)?;
    Ok(body)
}

fn parse_encoded(elem: FieldType, body: &[u8], index: usize) -> Result<ArrayView<'_>, TupleError> {
    ArrayView::parse(elem, body)
        .map_err(|element| TupleError::Corruption(ValidationError::ArrayOverrun { index, element }))
}

macro_rules! typed_setters {
    ($($insert:ident, $upsert:ident => $variant:ident: $ty:ty),* $(,)?) => {
        impl TupleBuilder {
            $(
                #[doc = concat!("Appends a `", stringify!($variant), "` occurrence in `column`.")]
                pub fn $insert(&mut self, column: u16, value: $ty) -> Result<(), TupleError> {
                    self.insert(Tag::new(column, FieldType::$variant), Value::$variant(value))
                }

                #[doc = concat!("Replaces the `", stringify!($variant), "` occurrences in `column`.")]
                pub fn $upsert(&mut self, column: u16, value: $ty) -> Result<(), TupleError> {
                    self.upsert(Tag::new(column, FieldType::$variant), Value::$variant(value))
                }
            )*
        }
    };
}

typed_setters! {
    insert_u16, upsert_u16 => Uint16: u16,
    insert_i32, upsert_i32 => Int32: i32,
    insert_u32, upsert_u32 => Uint32: u32,
    insert_f32, upsert_f32 => Fp32: f32,
    insert_i64, upsert_i64 => Int64: i64,
    insert_u64, upsert_u64 => Uint64: u64,
    insert_f64, upsert_f64 => Fp64: f64,
    insert_datetime, upsert_datetime => Datetime: Datetime,
    insert_b96, upsert_b96 => B96: [u8; 12],
    insert_b128, upsert_b128 => B128: [u8; 16],
    insert_b160, upsert_b160 => B160: [u8; 20],
    insert_b256, upsert_b256 => B256: [u8; 32],
    insert_cstr, upsert_cstr => Cstr: &[u8],
    insert_opaque, upsert_opaque => Opaque: &[u8],
}
