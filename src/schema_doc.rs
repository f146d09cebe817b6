//! Schema documents: record types declared in JSON.
//!
//! ```json
//! {
//!   "options": { "required": "deep" },
//!   "records": {
//!     "Address": {
//!       "street": "string",
//!       "postal_code": "string?",
//!       "tags": { "type": "set<string>", "default_empty": true }
//!     }
//!   }
//! }
//! ```
//!
//! A bare string is a type expression for a required field. A field whose
//! outermost type is optional (`X?`, `optional<X>`, `X | null`) and that
//! declares no default defaults to null.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer};
use serde_json::Value as Json;

use crate::config::Options;
use crate::error::{Result, SchemaError};
use crate::ir::{FieldDefault, RecordType, ScalarKind, Shape};
use crate::registry::Registry;
use crate::typed::path_error;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaDoc {
    #[serde(default)]
    pub options: Options,
    pub records: IndexMap<String, IndexMap<String, FieldSpec>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FieldSpec {
    Bare(String),
    Full(FullField),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FullField {
    #[serde(rename = "type")]
    pub ty: String,
    /// `Some(Json::Null)` for an explicit `"default": null`.
    #[serde(default, deserialize_with = "present")]
    pub default: Option<Json>,
    #[serde(default)]
    pub default_empty: bool,
}

fn present<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Json>, D::Error> {
    Json::deserialize(d).map(Some)
}

impl SchemaDoc {
    pub fn parse(src: &str) -> Result<Self> {
        let de = &mut serde_json::Deserializer::from_str(src);
        serde_path_to_error::deserialize(de).map_err(path_error)
    }

    pub fn from_json(json: Json) -> Result<Self> {
        serde_path_to_error::deserialize(json).map_err(path_error)
    }

    pub fn record_types(&self) -> Result<Vec<RecordType>, SchemaError> {
        let mut out = Vec::with_capacity(self.records.len());
        for (record, fields) in &self.records {
            let mut ty = RecordType::new(record.clone());
            for (name, spec) in fields {
                let (expr, default, empty) = match spec {
                    FieldSpec::Bare(expr) => (expr.as_str(), None, false),
                    FieldSpec::Full(f) => (f.ty.as_str(), f.default.clone(), f.default_empty),
                };
                let shape = parse_type(expr)?;
                let default = match (default, empty) {
                    (Some(_), true) => {
                        return Err(SchemaError::ConflictingDefault {
                            record: record.clone(),
                            field: name.clone(),
                        });
                    }
                    (Some(v), false) => FieldDefault::Value(v),
                    (None, true) => FieldDefault::Empty,
                    (None, false) if is_nullable(&shape) => FieldDefault::Value(Json::Null),
                    (None, false) => FieldDefault::Required,
                };
                ty = ty.push(name.clone(), shape, default);
            }
            out.push(ty);
        }
        Ok(out)
    }

    pub fn into_registry(self) -> Result<Registry, SchemaError> {
        let types = self.record_types()?;
        let mut registry = Registry::with_options(self.options);
        for ty in types {
            registry.register(ty)?;
        }
        Ok(registry)
    }
}

fn is_nullable(shape: &Shape) -> bool {
    match shape {
        Shape::Optional(_) | Shape::Null => true,
        Shape::Union(arms) => arms.iter().any(|a| matches!(a, Shape::Null)),
        _ => false,
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TYPE EXPRESSIONS
// ————————————————————————————————————————————————————————————————————————————

static TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([A-Za-z_][A-Za-z0-9_]*|[<>,|?])").expect("token regex")
});

/// Parse a field type expression:
///
/// ```text
/// ty    := post ('|' post)*
/// post  := atom '?'*
/// atom  := IDENT ('<' ty (',' ty)* '>')?
/// ```
pub fn parse_type(expr: &str) -> Result<Shape, SchemaError> {
    let mut p = Parser { expr, toks: tokenize(expr)?, pos: 0 };
    let shape = p.union()?;
    match p.peek() {
        None => Ok(shape),
        Some(tok) => Err(p.error(format!("unexpected `{tok}`"))),
    }
}

fn tokenize(expr: &str) -> Result<Vec<&str>, SchemaError> {
    let mut toks = Vec::new();
    let mut rest = expr;
    while !rest.trim().is_empty() {
        let Some(caps) = TOKEN.captures(rest) else {
            let bad = rest.trim_start().chars().next().unwrap_or(' ');
            return Err(SchemaError::BadType {
                expr: expr.to_string(),
                reason: format!("unexpected character `{bad}`"),
            });
        };
        let (Some(all), Some(tok)) = (caps.get(0), caps.get(1)) else { break };
        toks.push(tok.as_str());
        rest = &rest[all.end()..];
    }
    Ok(toks)
}

struct Parser<'a> {
    expr: &'a str,
    toks: Vec<&'a str>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a str> { self.toks.get(self.pos).copied() }

    fn eat(&mut self, tok: &str) -> bool {
        if self.peek() == Some(tok) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn error(&self, reason: impl Into<String>) -> SchemaError {
        SchemaError::BadType { expr: self.expr.to_string(), reason: reason.into() }
    }

    fn union(&mut self) -> Result<Shape, SchemaError> {
        let mut arms = vec![self.postfix()?];
        while self.eat("|") {
            arms.push(self.postfix()?);
        }
        Ok(if arms.len() == 1 { arms.remove(0) } else { Shape::Union(arms) })
    }

    fn postfix(&mut self) -> Result<Shape, SchemaError> {
        let mut shape = self.atom()?;
        while self.eat("?") {
            shape = Shape::optional(shape);
        }
        Ok(shape)
    }

    fn atom(&mut self) -> Result<Shape, SchemaError> {
        let name = match self.peek() {
            Some(tok) if is_ident(tok) => tok,
            Some(tok) => return Err(self.error(format!("expected a type name, found `{tok}`"))),
            None => return Err(self.error("expected a type name")),
        };
        self.pos += 1;
        if !self.eat("<") {
            return Ok(simple(name));
        }
        let mut args = vec![self.union()?];
        while self.eat(",") {
            args.push(self.union()?);
        }
        if !self.eat(">") {
            return Err(self.error(format!("unclosed `<` after `{name}`")));
        }
        self.generic(name, args)
    }

    fn generic(&self, name: &str, mut args: Vec<Shape>) -> Result<Shape, SchemaError> {
        let arity = match name {
            "map" | "dict" => 2,
            "list" | "vec" | "tuple" | "set" | "optional" | "option" => 1,
            _ => return Err(self.error(format!("`{name}` takes no type arguments"))),
        };
        if args.len() != arity {
            return Err(self.error(format!("`{name}` takes {arity} type argument(s), got {}", args.len())));
        }
        let first = args.remove(0);
        Ok(match name {
            "map" | "dict" => Shape::map(first, args.remove(0)),
            "list" | "vec" => Shape::list(first),
            "tuple" => Shape::tuple(first),
            "set" => Shape::set(first),
            _ => Shape::optional(first),
        })
    }
}

fn is_ident(tok: &str) -> bool {
    tok.chars().next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
}

fn simple(name: &str) -> Shape {
    match name {
        "string" | "str" => Shape::Scalar(ScalarKind::String),
        "int" | "integer" => Shape::Scalar(ScalarKind::Integer),
        "float" | "number" => Shape::Scalar(ScalarKind::Number),
        "bool" | "boolean" => Shape::Scalar(ScalarKind::Bool),
        "any" => Shape::Scalar(ScalarKind::Any),
        "null" | "none" => Shape::Null,
        "record" => Shape::AnyRecord,
        _ => Shape::Record(name.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_type_expressions() {
        assert_eq!(parse_type("string").unwrap(), Shape::string());
        assert_eq!(parse_type("Address?").unwrap(), Shape::optional(Shape::record("Address")));
        assert_eq!(
            parse_type("map<string, list<Address>>").unwrap(),
            Shape::string_map(Shape::list(Shape::record("Address")))
        );
        assert_eq!(
            parse_type(" Address | null ").unwrap(),
            Shape::Union(vec![Shape::record("Address"), Shape::Null])
        );
        assert_eq!(parse_type("optional<set<int>>").unwrap(), Shape::optional(Shape::set(Shape::integer())));
        assert_eq!(parse_type("list<record>").unwrap(), Shape::list(Shape::AnyRecord));
    }

    #[test]
    fn rejects_malformed_expressions() {
        for bad in ["", "list<", "map<string>", "string<int>", "list<int>>", "a b", "int & str"] {
            let err = parse_type(bad).unwrap_err();
            assert!(matches!(err, SchemaError::BadType { .. }), "{bad}: {err:?}");
        }
    }

    #[test]
    fn builds_a_registry_from_a_document() {
        let doc = SchemaDoc::from_json(json!({
            "options": {"emit_type_tag": false},
            "records": {
                "Address": {
                    "street": "string",
                    "postal_code": "string?",
                    "country": {"type": "string", "default": "USA"},
                    "note": {"type": "string", "default": null},
                    "tags": {"type": "set<string>", "default_empty": true}
                }
            }
        }))
        .unwrap();
        let reg = doc.into_registry().unwrap();
        assert!(!reg.options().emit_type_tag);

        let fields = reg.fields("Address").unwrap();
        let defaults = fields.iter().map(|f| (f.name.as_str(), f.default.clone())).collect::<Vec<_>>();
        assert_eq!(defaults, vec![
            ("street", FieldDefault::Required),
            ("postal_code", FieldDefault::Value(Json::Null)),
            ("country", FieldDefault::Value(json!("USA"))),
            ("note", FieldDefault::Value(Json::Null)),
            ("tags", FieldDefault::Empty),
        ]);
    }

    #[test]
    fn conflicting_defaults_and_bad_documents_fail() {
        let doc = SchemaDoc::from_json(json!({
            "records": {"A": {"x": {"type": "int", "default": 1, "default_empty": true}}}
        }))
        .unwrap();
        assert!(matches!(doc.into_registry(), Err(SchemaError::ConflictingDefault { .. })));

        let err = SchemaDoc::parse(r#"{"records": {}, "extra": 1}"#).unwrap_err();
        assert_eq!(err.kind(), "Typed");
    }
}
