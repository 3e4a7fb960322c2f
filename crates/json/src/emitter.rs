use std::collections::HashMap;
use std::io::Write;

use chrono::SecondsFormat;
use indexmap::IndexMap;
use tracing::trace;
use tuple::{ArrayView, Datetime, FieldType, Tag, TupleError, TupleView, Value};

use crate::error::JsonError;
use crate::escape::{is_identifier, write_escaped, write_hex};
use crate::options::JsonFlags;
use crate::resolver::SchemaResolver;

/// Renders `view` as JSON (or JSON5) text.
///
/// `indent` is the indentation unit for pretty printing; `None` gives
/// compact output without any whitespace. `base_indent` shifts every
/// nested line by that many units, for embedding into surrounding text.
///
/// # Errors
///
/// [`JsonError::Tuple`] if the view fails validation,
/// [`JsonError::Utf8`] if a string payload is not UTF-8 (use
/// [`tuple_to_json_bytes`] to keep such bytes).
pub fn tuple_to_json(
    view: &TupleView<'_>,
    indent: Option<&str>,
    base_indent: usize,
    schema: &dyn SchemaResolver,
    flags: JsonFlags,
) -> Result<String, JsonError> {
    let bytes = tuple_to_json_bytes(view, indent, base_indent, schema, flags)?;
    Ok(String::from_utf8(bytes)?)
}

/// Like [`tuple_to_json`], but returns raw bytes. String payloads are
/// copied without re-encoding.
pub fn tuple_to_json_bytes(
    view: &TupleView<'_>,
    indent: Option<&str>,
    base_indent: usize,
    schema: &dyn SchemaResolver,
    flags: JsonFlags,
) -> Result<Vec<u8>, JsonError> {
    view.check().map_err(TupleError::from)?;
    trace!(fields = view.len(), bytes = view.as_bytes().len(), "emitting tuple as json");
    let mut emitter = Emitter {
        out: Vec::with_capacity(view.as_bytes().len() * 2),
        indent,
        base: base_indent,
        schema,
        flags,
    };
    emitter.tuple(view, 0)?;
    Ok(emitter.out)
}

/// Renders `view` into `out`. Nothing is written unless rendering succeeds.
pub fn write_json<W: Write>(
    mut out: W,
    view: &TupleView<'_>,
    indent: Option<&str>,
    base_indent: usize,
    schema: &dyn SchemaResolver,
    flags: JsonFlags,
) -> Result<(), JsonError> {
    let bytes = tuple_to_json_bytes(view, indent, base_indent, schema, flags)?;
    out.write_all(&bytes)?;
    Ok(())
}

struct Emitter<'s> {
    out: Vec<u8>,
    indent: Option<&'s str>,
    base: usize,
    schema: &'s dyn SchemaResolver,
    flags: JsonFlags,
}

impl Emitter<'_> {
    /// Writes a tuple whose opening brace sits at nesting `level`.
    fn tuple(&mut self, view: &TupleView<'_>, level: usize) -> Result<(), JsonError> {
        if view.is_empty() {
            self.out.extend_from_slice(b"null");
            return Ok(());
        }

        let mut groups: IndexMap<Tag, Vec<Value<'_>>> = IndexMap::new();
        for field in view.fields() {
            let field = field?;
            groups.entry(field.tag()).or_default().push(field.value());
        }

        let schema = self.schema;
        let names: Vec<Option<&str>> = groups
            .keys()
            .map(|&tag| schema.tag_to_name(tag).filter(|name| !name.is_empty()))
            .collect();
        // Unnamed fields of one column sharing a fallback key.
        let mut unnamed: HashMap<u16, usize> = HashMap::new();
        for (tag, name) in groups.keys().zip(&names) {
            if name.is_none() {
                *unnamed.entry(tag.column()).or_default() += 1;
            }
        }

        self.out.push(b'{');
        for (i, ((tag, values), name)) in groups.iter().zip(&names).enumerate() {
            if i > 0 {
                self.out.push(b',');
            }
            self.newline(level + 1);
            let typed = unnamed.get(&tag.column()).is_some_and(|&n| n > 1);
            self.key(*tag, *name, typed);
            self.out.push(b':');
            if self.indent.is_some() {
                self.out.push(b' ');
            }
            match values.as_slice() {
                [single] => self.value(*tag, single, level + 1)?,
                many => {
                    self.out.push(b'[');
                    for (j, value) in many.iter().enumerate() {
                        if j > 0 {
                            self.out.push(b',');
                        }
                        self.newline(level + 2);
                        self.value(*tag, value, level + 2)?;
                    }
                    self.newline(level + 1);
                    self.out.push(b']');
                }
            }
        }
        self.newline(level);
        self.out.push(b'}');
        Ok(())
    }

    fn newline(&mut self, level: usize) {
        if let Some(unit) = self.indent {
            self.out.push(b'\n');
            for _ in 0..self.base + level {
                self.out.extend_from_slice(unit.as_bytes());
            }
        }
    }

    /// Writes the key of `tag`. Without a name the key is `@<column>`, or
    /// `@<column>:<type>` when `typed` (the column has unnamed fields of
    /// several types).
    fn key(&mut self, tag: Tag, name: Option<&str>, typed: bool) {
        match name {
            Some(name) if !self.flags.quote_keys() && is_identifier(name) => {
                self.out.extend_from_slice(name.as_bytes());
            }
            Some(name) => write_escaped(&mut self.out, name.as_bytes(), self.flags),
            None => {
                let fallback = if typed {
                    format!("@{}:{}", tag.column(), tag.field_type())
                } else {
                    format!("@{}", tag.column())
                };
                write_escaped(&mut self.out, fallback.as_bytes(), self.flags);
            }
        }
    }

    fn value(&mut self, tag: Tag, value: &Value<'_>, level: usize) -> Result<(), JsonError> {
        if value.is_denil() {
            self.out.extend_from_slice(b"null");
            return Ok(());
        }
        match *value {
            Value::Null => self.out.extend_from_slice(b"null"),
            Value::Uint16(v) => self.enumeration(tag.column(), v)?,
            Value::Int32(v) => write!(self.out, "{v}")?,
            Value::Uint32(v) => write!(self.out, "{v}")?,
            Value::Int64(v) => write!(self.out, "{v}")?,
            Value::Uint64(v) => write!(self.out, "{v}")?,
            Value::Fp32(v) => self.float(f64::from(v), &v.to_string()),
            Value::Fp64(v) => self.float(v, &v.to_string()),
            Value::Datetime(v) => self.datetime(v)?,
            Value::B96(ref b) => write_hex(&mut self.out, b),
            Value::B128(ref b) => write_hex(&mut self.out, b),
            Value::B160(ref b) => write_hex(&mut self.out, b),
            Value::B256(ref b) => write_hex(&mut self.out, b),
            Value::Opaque(bytes) => write_hex(&mut self.out, bytes),
            Value::Cstr(bytes) => write_escaped(&mut self.out, bytes, self.flags),
            Value::Nested(ref view) => self.tuple(view, level)?,
            Value::Array(ref array) => self.array(tag, array, level)?,
        }
        Ok(())
    }

    fn array(&mut self, tag: Tag, array: &ArrayView<'_>, level: usize) -> Result<(), JsonError> {
        self.out.push(b'[');
        if array.is_empty() {
            self.out.push(b']');
            return Ok(());
        }
        let element_tag = Tag::new(tag.column(), array.element_type());
        for (i, item) in array.iter().enumerate() {
            if i > 0 {
                self.out.push(b',');
            }
            self.newline(level + 1);
            self.value(element_tag, &item?, level + 1)?;
        }
        self.newline(level);
        self.out.push(b']');
        Ok(())
    }

    /// uint16 values go through the enum labels of their column.
    fn enumeration(&mut self, column: u16, value: u16) -> Result<(), JsonError> {
        let schema = self.schema;
        let label = schema.enum_label(Tag::new(column, FieldType::ENUM), value);
        match (label, value) {
            (Some(""), 0) => self.out.extend_from_slice(b"false"),
            (Some(""), 1) => self.out.extend_from_slice(b"true"),
            (Some(label), _) if !label.is_empty() => {
                write_escaped(&mut self.out, label.as_bytes(), self.flags)
            }
            _ => write!(self.out, "{value}")?,
        }
        Ok(())
    }

    /// `text` is the shortest round-trip rendering in the value's own width.
    fn float(&mut self, v: f64, text: &str) {
        if v.is_finite() {
            self.out.extend_from_slice(text.as_bytes());
        } else if !self.flags.json5() {
            self.out.extend_from_slice(b"null");
        } else if v.is_nan() {
            self.out.extend_from_slice(b"NaN");
        } else if v > 0.0 {
            self.out.extend_from_slice(b"Infinity");
        } else {
            self.out.extend_from_slice(b"-Infinity");
        }
    }

    fn datetime(&mut self, v: Datetime) -> Result<(), JsonError> {
        match v.to_utc() {
            Some(utc) => {
                let text = utc.to_rfc3339_opts(SecondsFormat::AutoSi, true);
                write_escaped(&mut self.out, text.as_bytes(), self.flags);
            }
            None => write!(self.out, "{}", v.fixedpoint())?,
        }
        Ok(())
    }
}
