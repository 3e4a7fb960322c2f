//! # Schema - field names and enumeration labels
//!
//! An in-memory dictionary mapping tags to field names and enum values to
//! labels. It implements [`json::SchemaResolver`], so it can be handed to
//! the emitter directly, and it can describe itself as a tuple rendered to
//! JSON ([`SchemaDict::schema_to_json`]).

mod error;

use std::collections::BTreeMap;

use json::{tuple_to_json, JsonFlags, SchemaResolver};
use tracing::debug;
use tuple::denil::DENIL_UINT16;
use tuple::{make_tag, FieldType, Tag, TupleBuilder, MAX_FIELDS, MAX_TUPLE_BYTES};

pub use error::SchemaError;

/// Columns of the tuples produced by [`SchemaDict::schema_to_json`]. Fields
/// sharing a column are told apart by type.
const FIELD_COLUMN: u16 = 0;
const NAME_COLUMN: u16 = 0;
const COLNUM_COLUMN: u16 = 0;
const TYPE_COLUMN: u16 = 0;
const ENUM_DEF_COLUMN: u16 = 1;
const ENUM_VALUE_COLUMN: u16 = 1;

/// Field and enum dictionary.
///
/// Empty field names are allowed: such fields are known to the schema but
/// render with the `@<column>` fallback key. Empty enum labels may repeat;
/// they mark the values 0 and 1 of a boolean.
#[derive(Debug, Clone, Default)]
pub struct SchemaDict {
    names: BTreeMap<Tag, String>,
    tags: BTreeMap<String, Tag>,
    labels: BTreeMap<(Tag, u16), String>,
    values: BTreeMap<(Tag, String), u16>,
}

impl SchemaDict {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers field `name` for `(column, ty)`.
    pub fn add_field(&mut self, name: &str, ty: FieldType, column: u16) -> Result<(), SchemaError> {
        let tag = make_tag(column, ty);
        if self.names.contains_key(&tag) {
            debug!(%tag, "rejected duplicate field tag");
            return Err(SchemaError::DuplicateTag { column, ty });
        }
        if !name.is_empty() && self.tags.contains_key(name) {
            debug!(name, "rejected duplicate field name");
            return Err(SchemaError::DuplicateName(name.to_string()));
        }
        self.define(name, ty, column);
        Ok(())
    }

    /// Registers `label` for enum `value` in `column`.
    pub fn add_enum_value(&mut self, column: u16, label: &str, value: u16) -> Result<(), SchemaError> {
        let tag = make_tag(column, FieldType::ENUM);
        if self.labels.contains_key(&(tag, value)) {
            return Err(SchemaError::DuplicateEnumValue { column, value });
        }
        if !label.is_empty() && self.values.contains_key(&(tag, label.to_string())) {
            return Err(SchemaError::DuplicateEnumLabel {
                column,
                label: label.to_string(),
            });
        }
        self.label(column, label, value);
        Ok(())
    }

    pub fn name_to_tag(&self, name: &str) -> Option<Tag> {
        self.tags.get(name).copied()
    }

    pub fn label_to_value(&self, column: u16, label: &str) -> Option<u16> {
        let tag = make_tag(column, FieldType::ENUM);
        self.values.get(&(tag, label.to_string())).copied()
    }

    /// Registered fields in tag order.
    pub fn fields(&self) -> impl Iterator<Item = (Tag, &str)> {
        self.names.iter().map(|(tag, name)| (*tag, name.as_str()))
    }

    /// Labels of one enum column, in value order.
    pub fn enum_values(&self, column: u16) -> impl Iterator<Item = (u16, &str)> {
        let tag = make_tag(column, FieldType::ENUM);
        self.labels
            .range((tag, 0)..=(tag, u16::MAX))
            .map(|(&(_, value), label)| (value, label.as_str()))
    }

    /// Number of registered fields.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// The dictionary of schema description tuples:
    ///
    /// | name     | type   | column |
    /// |----------|--------|--------|
    /// | `field`  | nested | 0      |
    /// | `name`   | cstr   | 0      |
    /// | `colnum` | uint32 | 0      |
    /// | `type`   | enum   | 0      |
    /// | `enum`   | nested | 1      |
    /// | `value`  | uint16 | 1      |
    ///
    /// `type` is labelled with the name of every field type.
    pub fn dict_of_schema() -> Self {
        let mut dict = Self::new();
        dict.define("field", FieldType::Nested, FIELD_COLUMN);
        dict.define("name", FieldType::Cstr, NAME_COLUMN);
        dict.define("colnum", FieldType::Uint32, COLNUM_COLUMN);
        dict.define("type", FieldType::ENUM, TYPE_COLUMN);
        dict.define("enum", FieldType::Nested, ENUM_DEF_COLUMN);
        dict.define("value", FieldType::Uint16, ENUM_VALUE_COLUMN);
        for ty in FieldType::ALL {
            dict.label(TYPE_COLUMN, ty.name(), u16::from(ty.code()));
        }
        dict
    }

    /// Describes this schema as JSON: one `field` object per registered
    /// field in tag order, with its enum items for enum and enum-array
    /// fields. Rendered with [`dict_of_schema`](SchemaDict::dict_of_schema)
    /// as the resolver.
    pub fn schema_to_json(&self, indent: Option<&str>) -> Result<String, SchemaError> {
        let mut schema = TupleBuilder::new((1 + self.names.len()).min(MAX_FIELDS), MAX_TUPLE_BYTES)?;
        let mut field = TupleBuilder::new(MAX_FIELDS, MAX_TUPLE_BYTES)?;
        let mut item = TupleBuilder::new(2, MAX_TUPLE_BYTES)?;

        for (tag, name) in self.fields() {
            field.clear();
            field.insert_str(NAME_COLUMN, name)?;
            field.insert_u32(COLNUM_COLUMN, u32::from(tag.column()))?;
            field.insert_enum(TYPE_COLUMN, u16::from(tag.field_type().code()))?;
            if matches!(tag.field_type(), FieldType::ENUM | FieldType::ARRAY_ENUM) {
                for (value, label) in self.enum_values(tag.column()) {
                    if value == DENIL_UINT16 {
                        continue;
                    }
                    item.upsert_u16(ENUM_VALUE_COLUMN, value)?;
                    item.upsert_str(NAME_COLUMN, &format!("enum:{label}"))?;
                    field.insert_nested(ENUM_DEF_COLUMN, &item.freeze(false)?)?;
                }
            }
            schema.insert_nested(FIELD_COLUMN, &field.freeze(false)?)?;
        }

        let dict = Self::dict_of_schema();
        let view = schema.freeze(true)?;
        Ok(tuple_to_json(&view, indent, 0, &dict, JsonFlags::default())?)
    }

    fn define(&mut self, name: &str, ty: FieldType, column: u16) {
        let tag = make_tag(column, ty);
        self.names.insert(tag, name.to_string());
        if !name.is_empty() {
            self.tags.insert(name.to_string(), tag);
        }
    }

    fn label(&mut self, column: u16, label: &str, value: u16) {
        let tag = make_tag(column, FieldType::ENUM);
        self.labels.insert((tag, value), label.to_string());
        if !label.is_empty() {
            self.values.insert((tag, label.to_string()), value);
        }
    }
}

impl SchemaResolver for SchemaDict {
    fn tag_to_name(&self, tag: Tag) -> Option<&str> {
        self.names.get(&tag).map(String::as_str)
    }

    fn enum_label(&self, tag: Tag, value: u16) -> Option<&str> {
        self.labels.get(&(tag, value)).map(String::as_str)
    }
}

#[cfg(test)]
mod tests;
