use std::collections::HashMap;

use tuple::{FieldType, Tag, TupleBuilder, TUPLE_MAGIC};

use crate::*;

/// Nine named fields per scalar type (`f<n>_<type>`) and per array type
/// (`a<n>_<type>`), columns 1..=9. Column 9 enums: 0 and 1 have empty
/// labels, 42 is `item42`.
pub struct SchemaX {
    names: HashMap<Tag, String>,
    labels: HashMap<(Tag, u16), String>,
}

impl SchemaX {
    pub fn new() -> Self {
        let mut names = HashMap::new();
        for n in 1..10u16 {
            for ty in FieldType::ALL.iter().copied().filter(|ty| !ty.is_array()) {
                names.insert(Tag::new(n, ty), format!("f{n}_{ty}"));
                if let Ok(array) = ty.array_of() {
                    names.insert(Tag::new(n, array), format!("a{n}_{ty}"));
                }
            }
        }
        let mut labels = HashMap::new();
        let enum_tag = Tag::new(9, FieldType::ENUM);
        labels.insert((enum_tag, 0), String::new());
        labels.insert((enum_tag, 1), String::new());
        labels.insert((enum_tag, 42), "item42".to_string());
        SchemaX { names, labels }
    }
}

impl SchemaResolver for SchemaX {
    fn tag_to_name(&self, tag: Tag) -> Option<&str> {
        self.names.get(&tag).map(String::as_str)
    }

    fn enum_label(&self, tag: Tag, value: u16) -> Option<&str> {
        self.labels.get(&(tag, value)).map(String::as_str)
    }
}

pub fn builder() -> TupleBuilder {
    TupleBuilder::new(67, 12345).unwrap()
}

/// Compact JSON5 through `SchemaX`.
pub fn json(b: &mut TupleBuilder) -> String {
    json_with(b, None, JsonFlags::default())
}

pub fn json_with(b: &mut TupleBuilder, indent: Option<&str>, flags: JsonFlags) -> String {
    let view = b.freeze(false).unwrap();
    tuple_to_json(&view, indent, 0, &SchemaX::new(), flags).unwrap()
}

/// Wraps `child` as the only field (column 1, nested) of a new tuple
/// without going through the builder's checks.
pub fn wrap_nested(child: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&TUPLE_MAGIC.to_le_bytes());
    out.extend_from_slice(&((4 + child.len()) as u32).to_le_bytes());
    out.extend_from_slice(&Tag::new(1, FieldType::Nested).raw().to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&(child.len() as u32).to_le_bytes());
    out.extend_from_slice(child);
    out
}

/// A uint16 field under `levels` nested tuples.
pub fn nested_chain(levels: usize) -> Vec<u8> {
    let mut leaf = builder();
    leaf.insert_u16(1, 1).unwrap();
    (0..levels).fold(leaf.into_bytes().unwrap(), |inner, _| wrap_nested(&inner))
}
