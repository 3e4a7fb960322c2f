use json::JsonError;
use thiserror::Error;
use tuple::{FieldType, TupleError};

/// Errors returned by [`SchemaDict`](crate::SchemaDict).
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("duplicate field tag (column {column}, type {ty})")]
    DuplicateTag { column: u16, ty: FieldType },

    #[error("duplicate field name '{0}'")]
    DuplicateName(String),

    #[error("duplicate enum item (column {column}, value {value})")]
    DuplicateEnumValue { column: u16, value: u16 },

    #[error("duplicate enum item (column {column}, label '{label}')")]
    DuplicateEnumLabel { column: u16, label: String },

    /// Building the schema description tuple failed.
    #[error("tuple error: {0}")]
    Tuple(#[from] TupleError),

    /// Rendering the schema description failed.
    #[error("json error: {0}")]
    Json(#[from] JsonError),
}
