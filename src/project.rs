//! Projection walker: record instance → plain structure.

use serde_json::{Map, Value as Json};

use crate::config::{Options, TYPE_KEY};
use crate::value::{Record, Value};

/// Project a record. The `__type__` tag (when enabled) comes first, then
/// fields in declaration order.
pub fn project_record(record: &Record, options: &Options) -> Json {
    let mut map = Map::new();
    if options.emit_type_tag {
        map.insert(TYPE_KEY.into(), Json::from(record.type_name()));
    }
    for (name, value) in record.iter() {
        map.insert(name.to_string(), project(value, options));
    }
    Json::Object(map)
}

/// Sets project to arrays in their stored (first-insertion) order.
pub fn project(value: &Value, options: &Options) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Scalar(j) => j.clone(),
        Value::Record(r) => project_record(r, options),
        Value::List(xs) | Value::Tuple(xs) | Value::Set(xs) => {
            Json::Array(xs.iter().map(|x| project(x, options)).collect())
        }
        Value::Map(m) => Json::Object(
            m.iter().map(|(k, v)| (k.clone(), project(v, options))).collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{RecordType, Shape};
    use crate::registry::Registry;
    use serde_json::json;

    #[test]
    fn nested_records_become_tagged_mappings() {
        let mut reg = Registry::new();
        reg.register(RecordType::new("Contact").field("email", Shape::string())).unwrap();
        reg.register(
            RecordType::new("Person")
                .field("name", Shape::string())
                .optional("contacts", Shape::list(Shape::record("Contact")))
                .optional("tags", Shape::set(Shape::string())),
        )
        .unwrap();
        let p = reg
            .from_dict("Person", &json!({
                "name": "Ann",
                "contacts": [{"email": "a@x"}, null],
                "tags": ["b", "a", "b"],
            }))
            .unwrap();

        let out = project_record(&p, &Options::default());
        assert_eq!(out, json!({
            "__type__": "Person",
            "name": "Ann",
            "contacts": [{"__type__": "Contact", "email": "a@x"}, null],
            "tags": ["b", "a"],
        }));
        // key order: tag, then declaration order
        let keys = out.as_object().unwrap().keys().cloned().collect::<Vec<_>>();
        assert_eq!(keys, ["__type__", "name", "contacts", "tags"]);
    }

    #[test]
    fn tag_can_be_switched_off() {
        let mut reg = Registry::new();
        reg.register(RecordType::new("A").optional("x", Shape::integer())).unwrap();
        let a = reg.instantiate("A").unwrap();
        let opts = Options { emit_type_tag: false, ..Options::default() };
        assert_eq!(project_record(&a, &opts), json!({"x": null}));
    }
}
