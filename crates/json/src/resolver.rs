use std::marker::PhantomData;

use tuple::Tag;

/// Names and enumeration labels the emitter looks up while rendering.
///
/// Both lookups are called at most once per field (or value) during one
/// emission and are never cached by the emitter.
pub trait SchemaResolver {
    /// Display name of a field. `None` (or an empty name) makes the emitter
    /// fall back to `"@<column>"`.
    fn tag_to_name(&self, tag: Tag) -> Option<&str>;

    /// Label of an enumeration value. `tag` always has the enum type
    /// (uint16), also for elements of enum arrays. An empty label turns 0
    /// and 1 into `false` and `true`.
    fn enum_label(&self, tag: Tag, value: u16) -> Option<&str>;
}

impl<T: SchemaResolver + ?Sized> SchemaResolver for &T {
    fn tag_to_name(&self, tag: Tag) -> Option<&str> {
        (**self).tag_to_name(tag)
    }

    fn enum_label(&self, tag: Tag, value: u16) -> Option<&str> {
        (**self).enum_label(tag, value)
    }
}

/// Resolves nothing: every key is the column fallback and every enum is a
/// plain integer.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSchema;

impl SchemaResolver for NoSchema {
    fn tag_to_name(&self, _tag: Tag) -> Option<&str> {
        None
    }

    fn enum_label(&self, _tag: Tag, _value: u16) -> Option<&str> {
        None
    }
}

/// A resolver made of two lookup closures over some borrowed context.
///
/// ```
/// use json::{FnResolver, SchemaResolver};
/// use tuple::{FieldType, Tag};
///
/// let names = ["id", "label"];
/// let schema = FnResolver::new(
///     |tag: Tag| names.get(tag.column() as usize).copied(),
///     |_tag: Tag, _value: u16| None,
/// );
/// assert_eq!(schema.tag_to_name(Tag::new(1, FieldType::Cstr)), Some("label"));
/// ```
pub struct FnResolver<'a, N, E> {
    names: N,
    labels: E,
    _context: PhantomData<&'a str>,
}

impl<'a, N, E> FnResolver<'a, N, E>
where
    N: Fn(Tag) -> Option<&'a str>,
    E: Fn(Tag, u16) -> Option<&'a str>,
{
    pub fn new(names: N, labels: E) -> Self {
        FnResolver {
            names,
            labels,
            _context: PhantomData,
        }
    }
}

impl<'a, N, E> SchemaResolver for FnResolver<'a, N, E>
where
    N: Fn(Tag) -> Option<&'a str>,
    E: Fn(Tag, u16) -> Option<&'a str>,
{
    fn tag_to_name(&self, tag: Tag) -> Option<&str> {
        (self.names)(tag)
    }

    fn enum_label(&self, tag: Tag, value: u16) -> Option<&str> {
        (self.labels)(tag, value)
    }
}
