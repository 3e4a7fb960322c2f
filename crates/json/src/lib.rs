//! # Json - tuple to JSON/JSON5 projection
//!
//! Renders a [`tuple::TupleView`] as text, consulting an optional schema
//! through the [`SchemaResolver`] trait.
//!
//! ## Rendering rules
//!
//! | tuple content                  | output                                   |
//! |--------------------------------|------------------------------------------|
//! | no fields (at any depth)       | `null`                                   |
//! | one occurrence of a tag        | the value                                |
//! | several occurrences of a tag   | `[...]` in insertion order               |
//! | DENIL (scalar or element)      | `null`                                   |
//! | uint16 with a label            | `"label"`                                |
//! | uint16 0/1 with an empty label | `false` / `true`                         |
//! | integers                       | exact decimal                            |
//! | floats                         | shortest round-trip decimal, `NaN`/`Infinity` in JSON5 |
//! | datetime                       | `"2017-05-23T14:01:02.500Z"`             |
//! | b96..b256, opaque              | `"0a1b..."` (lowercase hex)              |
//! | cstr                           | escaped string, bytes >= 0x80 verbatim   |
//!
//! Keys are the resolved field names, written bare in JSON5 mode when they
//! are identifiers. Fields without a name get `"@<column>"`.

mod emitter;
mod error;
pub mod escape;
mod options;
mod resolver;

pub use emitter::{tuple_to_json, tuple_to_json_bytes, write_json};
pub use error::JsonError;
pub use escape::escape_json_string;
pub use options::JsonFlags;
pub use resolver::{FnResolver, NoSchema, SchemaResolver};

#[cfg(test)]
mod tests;
