// Field schema tables. Built once per record type, consulted on every walk.

use serde_json::Value as Json;

/// Descriptive scalar flavour. Never validated or coerced; only used for
/// schema emission and debug output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    String,
    Integer,
    Number,
    Bool,
    Any,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Scalar(ScalarKind),
    Null,                    // exactly null
    Record(String),          // resolved by name through the registry
    AnyRecord,               // concrete type recovered from the `__type__` tag
    Optional(Box<Shape>),
    List(Box<Shape>),
    Tuple(Box<Shape>),       // homogeneous, variable length
    Set(Box<Shape>),
    Map(Box<Shape>, Box<Shape>),
    Union(Vec<Shape>),       // only `X | null` is understood, see `resolve`
}

impl Shape {
    pub fn string() -> Self { Shape::Scalar(ScalarKind::String) }
    pub fn integer() -> Self { Shape::Scalar(ScalarKind::Integer) }
    pub fn number() -> Self { Shape::Scalar(ScalarKind::Number) }
    pub fn boolean() -> Self { Shape::Scalar(ScalarKind::Bool) }
    pub fn any() -> Self { Shape::Scalar(ScalarKind::Any) }
    pub fn record(name: impl Into<String>) -> Self { Shape::Record(name.into()) }
    pub fn optional(inner: Shape) -> Self { Shape::Optional(Box::new(inner)) }
    pub fn list(item: Shape) -> Self { Shape::List(Box::new(item)) }
    pub fn tuple(item: Shape) -> Self { Shape::Tuple(Box::new(item)) }
    pub fn set(item: Shape) -> Self { Shape::Set(Box::new(item)) }
    pub fn map(key: Shape, value: Shape) -> Self { Shape::Map(Box::new(key), Box::new(value)) }

    /// String-keyed mapping, the only kind a plain structure can carry.
    pub fn string_map(value: Shape) -> Self { Self::map(Shape::string(), value) }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldDefault {
    /// No default: must be present when constructing with `from_dict`.
    Required,
    /// Plain default, materialized through the merge walker.
    Value(Json),
    /// The shape's zero value (empty collection, default record, or null).
    Empty,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub shape: Shape,
    pub default: FieldDefault,
}

impl Field {
    pub fn is_required(&self) -> bool {
        matches!(self.default, FieldDefault::Required)
    }
}

/// A named, ordered set of field declarations.
///
/// ```
/// use json_rec::ir::{RecordType, Shape};
///
/// let address = RecordType::new("Address")
///     .field("street", Shape::string())
///     .field("city", Shape::string())
///     .optional("postal_code", Shape::string());
/// assert_eq!(address.required_fields().count(), 2);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RecordType {
    pub name: String,
    pub fields: Vec<Field>,  // declaration order drives merge and projection order
}

impl RecordType {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), fields: Vec::new() }
    }

    /// Required field (no default).
    pub fn field(self, name: impl Into<String>, shape: Shape) -> Self {
        self.push(name, shape, FieldDefault::Required)
    }

    /// `Optional<shape>` defaulting to null.
    pub fn optional(self, name: impl Into<String>, shape: Shape) -> Self {
        self.push(name, Shape::optional(shape), FieldDefault::Value(Json::Null))
    }

    pub fn with_default(self, name: impl Into<String>, shape: Shape, default: Json) -> Self {
        self.push(name, shape, FieldDefault::Value(default))
    }

    pub fn with_empty_default(self, name: impl Into<String>, shape: Shape) -> Self {
        self.push(name, shape, FieldDefault::Empty)
    }

    pub fn push(mut self, name: impl Into<String>, shape: Shape, default: FieldDefault) -> Self {
        self.fields.push(Field { name: name.into(), shape, default });
        self
    }

    pub fn field_named(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|f| f.is_required())
    }
}
