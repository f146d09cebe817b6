use std::fmt;

use serde_json::Value as Json;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// A value does not have the structural shape the operation needs.
    #[error("type mismatch at {path}: expected {expected}, found {found}")]
    TypeKind {
        expected: &'static str,
        found: String,
        path: FieldPath,
    },

    /// A required field is absent while constructing a record.
    #[error("missing required field `{field}` of `{record}` at {path}")]
    MissingField {
        record: String,
        field: String,
        path: FieldPath,
    },

    #[error("record `{record}` has no field `{field}`")]
    UnknownField { record: String, field: String },

    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Typed (serde) conversion failed; `path` is a serde_path_to_error path.
    #[error("at path {path} → {message}")]
    Typed { path: String, message: String },

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn type_kind(expected: &'static str, found: &Json, path: &FieldPath) -> Self {
        Error::TypeKind { expected, found: json_kind(found).to_string(), path: path.clone() }
    }

    /// Stable short name, used by the CLI report and the fixture runner.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::TypeKind { .. } => "TypeKind",
            Error::MissingField { .. } => "MissingField",
            Error::UnknownField { .. } => "UnknownField",
            Error::Schema(_) => "Schema",
            Error::Typed { .. } => "Typed",
            Error::Json(_) => "Json",
        }
    }
}

/// Errors raised while declaring record types.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SchemaError {
    #[error("record type `{0}` is already registered")]
    DuplicateRecord(String),
    #[error("record type `{record}` declares field `{field}` twice")]
    DuplicateField { record: String, field: String },
    #[error("record type `{record}` declares the reserved field `{field}`")]
    ReservedField { record: String, field: String },
    #[error("field `{field}` of `{record}` declares both a default and an empty default")]
    ConflictingDefault { record: String, field: String },
    #[error("bad type expression `{expr}`: {reason}")]
    BadType { expr: String, reason: String },
}

pub fn json_kind(v: &Json) -> &'static str {
    match v {
        Json::Null => "null",
        Json::Bool(_) => "boolean",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}

// ————————————————————————————————————————————————————————————————————————————
// PATHS
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Field(String),
    Index(usize),
    Key(String),
}

/// Location inside a plain structure, rendered as `addresses.home.street`
/// or `contacts[1].email`. The root renders as `.`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldPath(Vec<Segment>);

impl FieldPath {
    pub fn root() -> Self { Self::default() }

    pub fn segments(&self) -> &[Segment] { &self.0 }

    pub(crate) fn push(&mut self, seg: Segment) { self.0.push(seg); }

    pub(crate) fn pop(&mut self) { self.0.pop(); }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str(".");
        }
        for (i, seg) in self.0.iter().enumerate() {
            match seg {
                Segment::Index(ix) => write!(f, "[{ix}]")?,
                Segment::Field(name) | Segment::Key(name) => {
                    if i > 0 { f.write_str(".")?; }
                    f.write_str(name)?;
                }
            }
        }
        Ok(())
    }
}
