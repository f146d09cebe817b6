//! JSON Schema (draft 2020-12 flavoured) for registered record types.
//!
//! Every reachable record lands in `$defs` and is referenced by `$ref`, so
//! recursive schemas come out finite.

use std::collections::HashSet;

use serde_json::{json, Map, Value as Json};

use crate::config::TYPE_KEY;
use crate::error::{Error, FieldPath, Result};
use crate::ir::{RecordType, ScalarKind, Shape};
use crate::registry::Registry;

pub fn schema_for(registry: &Registry, root: &str) -> Result<Json> {
    if !registry.is_record_type(root) {
        return Err(Error::TypeKind {
            expected: "registered record type",
            found: format!("`{root}`"),
            path: FieldPath::root(),
        });
    }

    let mut defs = Map::new();
    let mut seen = HashSet::new();
    let mut pending = vec![root.to_string()];
    while let Some(name) = pending.pop() {
        if !seen.insert(name.clone()) {
            continue;
        }
        if let Some(ty) = registry.get(&name) {
            defs.insert(name, record_schema(registry, ty, &mut pending));
        }
    }

    Ok(json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "$ref": def_ref(root),
        "$defs": Json::Object(defs),
    }))
}

fn def_ref(name: &str) -> String { format!("#/$defs/{name}") }

fn record_schema(registry: &Registry, ty: &RecordType, pending: &mut Vec<String>) -> Json {
    let mut props = Map::new();
    props.insert(TYPE_KEY.into(), json!({ "const": ty.name }));
    for f in &ty.fields {
        props.insert(f.name.clone(), shape_schema(registry, &f.shape, pending));
    }
    let required = ty.required_fields().map(|f| Json::from(f.name.clone())).collect::<Vec<_>>();

    let mut map = Map::new();
    map.insert("type".into(), Json::from("object"));
    map.insert("properties".into(), Json::Object(props));
    if !required.is_empty() {
        map.insert("required".into(), Json::Array(required));
    }
    Json::Object(map)
}

fn nullable(inner: Json) -> Json {
    json!({ "oneOf": [inner, { "type": "null" }] })
}

fn shape_schema(registry: &Registry, shape: &Shape, pending: &mut Vec<String>) -> Json {
    match shape {
        Shape::Scalar(kind) => match kind {
            ScalarKind::String => json!({ "type": "string" }),
            ScalarKind::Integer => json!({ "type": "integer" }),
            ScalarKind::Number => json!({ "type": "number" }),
            ScalarKind::Bool => json!({ "type": "boolean" }),
            ScalarKind::Any => json!({}),
        },
        Shape::Null => json!({ "type": "null" }),

        // unregistered names are opaque at runtime, so accept anything
        Shape::Record(name) if !registry.is_record_type(name) => json!({}),
        Shape::Record(name) => {
            pending.push(name.clone());
            json!({ "$ref": def_ref(name) })
        }
        Shape::AnyRecord => json!({
            "type": "object",
            "required": [TYPE_KEY],
            "properties": { TYPE_KEY: { "type": "string" } },
        }),

        Shape::Optional(inner) => nullable(shape_schema(registry, inner, pending)),
        Shape::List(item) | Shape::Tuple(item) => json!({
            "type": "array",
            "items": shape_schema(registry, item, pending),
        }),
        Shape::Set(item) => json!({
            "type": "array",
            "items": shape_schema(registry, item, pending),
            "uniqueItems": true,
        }),
        Shape::Map(_, value) => json!({
            "type": "object",
            "additionalProperties": shape_schema(registry, value, pending),
        }),
        Shape::Union(arms) => {
            json!({ "oneOf": arms.iter().map(|a| shape_schema(registry, a, pending)).collect::<Vec<_>>() })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emits_defs_for_reachable_records() {
        let mut reg = Registry::new();
        reg.register(
            RecordType::new("Node")
                .field("label", Shape::string())
                .optional("children", Shape::list(Shape::record("Node")))
                .optional("meta", Shape::string_map(Shape::record("Meta"))),
        )
        .unwrap();
        reg.register(RecordType::new("Meta").field("k", Shape::set(Shape::integer()))).unwrap();
        reg.register(RecordType::new("Unrelated")).unwrap();

        let schema = schema_for(&reg, "Node").unwrap();
        assert_eq!(schema["$ref"], "#/$defs/Node");
        let defs = schema["$defs"].as_object().unwrap();
        assert_eq!(defs.len(), 2);

        let node = &defs["Node"];
        assert_eq!(node["required"], json!(["label"]));
        assert_eq!(node["properties"]["__type__"]["const"], "Node");
        assert_eq!(node["properties"]["children"]["oneOf"][0]["items"]["$ref"], "#/$defs/Node");
        assert_eq!(node["properties"]["children"]["oneOf"][1]["type"], "null");
        assert_eq!(defs["Meta"]["properties"]["k"]["uniqueItems"], true);
    }

    #[test]
    fn unknown_root_is_rejected() {
        assert_eq!(schema_for(&Registry::new(), "Ghost").unwrap_err().kind(), "TypeKind");
    }
}
