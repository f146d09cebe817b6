//! Merge walker: apply a plain mapping onto a record in place.
//!
//! - Keys absent from the data leave their field untouched.
//! - Explicit `null` clears a field, whatever its declared shape.
//! - Nested records merge into the existing instance when its type matches,
//!   otherwise into a fresh default instance.
//! - Collection and mapping fields are rebuilt; their record elements always
//!   start from fresh defaults.
//! - Fields apply in declaration order with no rollback: a failure part-way
//!   leaves earlier fields (and earlier parts of a nested record) updated.

use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value as Json;
use tracing::trace;

use crate::config::RequiredCheck;
use crate::error::{Error, FieldPath, Result, Segment};
use crate::ir::{RecordType, Shape};
use crate::registry::Registry;
use crate::resolve::{Descriptor, RecordTarget};
use crate::value::{Record, Value};

pub(crate) struct Walker<'r> {
    registry: &'r Registry,
    /// Check required fields on the next record merged.
    check_required: bool,
    /// Keep checking below the first record.
    deep: bool,
    path: FieldPath,
}

impl<'r> Walker<'r> {
    /// Permissive walker for `update` and default materialization.
    pub(crate) fn lenient(registry: &'r Registry) -> Self {
        Self { registry, check_required: false, deep: false, path: FieldPath::root() }
    }

    /// Walker for `from_dict`: enforces required fields per the registry's
    /// `RequiredCheck`.
    pub(crate) fn constructing(registry: &'r Registry) -> Self {
        let deep = registry.options().required == RequiredCheck::Deep;
        Self { registry, check_required: true, deep, path: FieldPath::root() }
    }

    pub(crate) fn merge_record(&mut self, target: &mut Record, data: &Json) -> Result<()> {
        let Json::Object(map) = data else {
            return Err(Error::type_kind("object", data, &self.path));
        };
        let ty = Arc::clone(target.record_type());

        if self.check_required {
            if let Some(missing) = ty.required_fields().find(|f| !map.contains_key(&f.name)) {
                return Err(Error::MissingField {
                    record: ty.name.clone(),
                    field: missing.name.clone(),
                    path: self.path.clone(),
                });
            }
            self.check_required = self.deep;
        }

        for field in &ty.fields {
            let Some(raw) = map.get(&field.name) else { continue };
            let Some(slot) = target.get_mut(&field.name) else { continue };
            trace!(record = %ty.name, field = %field.name, "merging field");
            self.path.push(Segment::Field(field.name.clone()));
            let res = self.assign(&field.shape, slot, raw);
            self.path.pop();
            res?;
        }
        Ok(())
    }

    /// Compute the new value of one slot from `raw`, merging into the slot's
    /// current record where that applies.
    pub(crate) fn assign(&mut self, shape: &Shape, slot: &mut Value, raw: &Json) -> Result<()> {
        if raw.is_null() {
            *slot = Value::Null;
            return Ok(());
        }
        let registry = self.registry;
        match registry.classify(shape) {
            Descriptor::Scalar => *slot = Value::Scalar(raw.clone()),
            Descriptor::Optional(inner) => return self.assign(inner, slot, raw),
            Descriptor::NestedRecord(target) => {
                let Some(ty) = record_target(registry, target, raw, slot) else {
                    trace!(path = %self.path, "untagged value for an any-record field, kept opaque");
                    *slot = Value::Scalar(raw.clone());
                    return Ok(());
                };
                let reuse = matches!(&*slot, Value::Record(current) if current.is_instance_of(&ty));
                if reuse {
                    if let Value::Record(current) = slot {
                        self.merge_record(current, raw)?;
                    }
                } else {
                    let mut fresh = registry.instantiate_type(&ty)?;
                    self.merge_record(&mut fresh, raw)?;
                    *slot = Value::Record(fresh);
                }
            }
            Descriptor::Sequence(kind, item) => {
                let xs = raw.as_array().ok_or_else(|| Error::type_kind("array", raw, &self.path))?;
                *slot = kind.wrap(self.elements(item, xs)?);
            }
            Descriptor::Set(item) => {
                let xs = raw.as_array().ok_or_else(|| Error::type_kind("array", raw, &self.path))?;
                let mut out: Vec<Value> = Vec::with_capacity(xs.len());
                for v in self.elements(item, xs)? {
                    if !out.contains(&v) {
                        out.push(v);
                    }
                }
                *slot = Value::Set(out);
            }
            Descriptor::Mapping(_, value) => {
                let m = raw.as_object().ok_or_else(|| Error::type_kind("object", raw, &self.path))?;
                let mut out = IndexMap::with_capacity(m.len());
                for (k, v) in m {
                    self.path.push(Segment::Key(k.clone()));
                    let res = self.element(value, v);
                    self.path.pop();
                    out.insert(k.clone(), res?);
                }
                *slot = Value::Map(out);
            }
        }
        Ok(())
    }

    fn elements(&mut self, item: &Shape, xs: &[Json]) -> Result<Vec<Value>> {
        let mut out = Vec::with_capacity(xs.len());
        for (i, x) in xs.iter().enumerate() {
            self.path.push(Segment::Index(i));
            let res = self.element(item, x);
            self.path.pop();
            out.push(res?);
        }
        Ok(out)
    }

    /// Collection element or mapping value: built from scratch. Elements whose
    /// plain shape does not match the declared one pass through as opaque
    /// scalars instead of failing.
    fn element(&mut self, shape: &Shape, raw: &Json) -> Result<Value> {
        if raw.is_null() {
            return Ok(Value::Null);
        }
        if !fits(self.registry, shape, raw) {
            trace!(path = %self.path, "element does not fit declared shape, kept opaque");
            return Ok(Value::Scalar(raw.clone()));
        }
        let mut slot = Value::Null;
        self.assign(shape, &mut slot, raw)?;
        Ok(slot)
    }
}

fn record_target(
    registry: &Registry,
    target: RecordTarget<'_>,
    raw: &Json,
    slot: &Value,
) -> Option<Arc<RecordType>> {
    match target {
        RecordTarget::Named(ty) => Some(Arc::clone(ty)),
        // tag wins; an untagged partial update keeps the current record's type
        RecordTarget::Tagged => registry
            .resolve_tagged(raw)
            .cloned()
            .or_else(|| slot.as_record().map(|r| Arc::clone(r.record_type()))),
    }
}

fn fits(registry: &Registry, shape: &Shape, raw: &Json) -> bool {
    match registry.classify(shape) {
        Descriptor::Scalar => true,
        Descriptor::Optional(inner) => fits(registry, inner, raw),
        Descriptor::NestedRecord(RecordTarget::Named(_)) | Descriptor::Mapping(..) => raw.is_object(),
        Descriptor::NestedRecord(RecordTarget::Tagged) => registry.resolve_tagged(raw).is_some(),
        Descriptor::Sequence(..) | Descriptor::Set(_) => raw.is_array(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn registry() -> Registry {
        let mut reg = Registry::new();
        reg.register(
            RecordType::new("Address")
                .with_default("street", Shape::string(), json!(""))
                .with_default("city", Shape::string(), json!(""))
                .with_default("country", Shape::string(), json!("")),
        )
        .unwrap();
        reg.register(
            RecordType::new("Contact")
                .with_default("email", Shape::string(), json!(""))
                .with_default("phone", Shape::string(), json!("")),
        )
        .unwrap();
        reg.register(
            RecordType::new("Person")
                .with_default("name", Shape::string(), json!(""))
                .with_default("age", Shape::integer(), json!(0))
                .optional("address", Shape::record("Address"))
                .optional("contacts", Shape::list(Shape::record("Contact")))
                .optional("metadata", Shape::string_map(Shape::string()))
                .optional("nicknames", Shape::set(Shape::string()))
                .optional("scores", Shape::tuple(Shape::integer())),
        )
        .unwrap();
        reg
    }

    fn merge(reg: &Registry, record: &mut Record, data: Json) -> Result<()> {
        Walker::lenient(reg).merge_record(record, &data)
    }

    #[test]
    fn absent_keys_leave_fields_untouched() {
        let reg = registry();
        let mut p = reg.instantiate("Person").unwrap();
        merge(&reg, &mut p, json!({"name": "John", "age": 30})).unwrap();
        merge(&reg, &mut p, json!({"age": 31})).unwrap();
        assert_eq!(p.get("name").and_then(Value::as_str), Some("John"));
        assert_eq!(p.get("age").and_then(Value::as_i64), Some(31));
    }

    #[test]
    fn nested_record_merges_into_existing_instance() {
        let reg = registry();
        let mut p = reg.instantiate("Person").unwrap();
        merge(&reg, &mut p, json!({
            "address": {"street": "123 Main St", "city": "New York", "country": "USA"}
        }))
        .unwrap();
        merge(&reg, &mut p, json!({"address": {"city": "Boston"}})).unwrap();
        assert_eq!(p.lookup("address.city").and_then(Value::as_str), Some("Boston"));
        assert_eq!(p.lookup("address.street").and_then(Value::as_str), Some("123 Main St"));
        assert_eq!(p.lookup("address.country").and_then(Value::as_str), Some("USA"));
    }

    #[test]
    fn null_nested_record_gets_fresh_defaults() {
        let reg = registry();
        let mut p = reg.instantiate("Person").unwrap();
        assert!(p.get("address").unwrap().is_null());
        merge(&reg, &mut p, json!({"address": {"city": "Boston"}})).unwrap();
        assert_eq!(p.lookup("address.city").and_then(Value::as_str), Some("Boston"));
        assert_eq!(p.lookup("address.street").and_then(Value::as_str), Some(""));
    }

    #[test]
    fn explicit_null_overrides_without_merging() {
        let reg = registry();
        let mut p = reg.instantiate("Person").unwrap();
        merge(&reg, &mut p, json!({
            "address": {"city": "Boston"},
            "contacts": [{"email": "a@b.c"}],
        }))
        .unwrap();
        merge(&reg, &mut p, json!({"address": null, "contacts": null, "name": null})).unwrap();
        assert!(p.get("address").unwrap().is_null());
        assert!(p.get("contacts").unwrap().is_null());
        assert!(p.get("name").unwrap().is_null());
    }

    #[test]
    fn list_of_records_is_rebuilt_element_wise() {
        let reg = registry();
        let mut p = reg.instantiate("Person").unwrap();
        merge(&reg, &mut p, json!({"contacts": [
            {"email": "john@example.com", "phone": "123"},
            {"email": "john.doe@work.com", "phone": "456"},
        ]}))
        .unwrap();
        merge(&reg, &mut p, json!({"contacts": [{"email": "new@example.com"}]})).unwrap();

        let contacts = p.get("contacts").and_then(Value::as_items).unwrap();
        assert_eq!(contacts.len(), 1);
        // elements start fresh, so the old phone is gone
        assert_eq!(p.lookup("contacts.0.email").and_then(Value::as_str), Some("new@example.com"));
        assert_eq!(p.lookup("contacts.0.phone").and_then(Value::as_str), Some(""));
    }

    #[test]
    fn record_elements_tolerate_nulls_and_foreign_values() {
        let reg = registry();
        let mut p = reg.instantiate("Person").unwrap();
        merge(&reg, &mut p, json!({"contacts": [null, "raw", {"email": "x@y.z"}]})).unwrap();
        let contacts = p.get("contacts").and_then(Value::as_items).unwrap();
        assert!(contacts[0].is_null());
        assert_eq!(contacts[1], Value::from("raw"));
        assert_eq!(contacts[2].as_record().map(Record::type_name), Some("Contact"));
    }

    #[test]
    fn scalar_collections_keep_their_container_kind() {
        let reg = registry();
        let mut p = reg.instantiate("Person").unwrap();
        merge(&reg, &mut p, json!({
            "nicknames": ["jd", "johnny", "jd"],
            "scores": [3, 1, 3],
            "metadata": {"department": "Engineering"},
        }))
        .unwrap();
        assert_eq!(
            p.get("nicknames"),
            Some(&Value::Set(vec![Value::from("jd"), Value::from("johnny")]))
        );
        assert_eq!(
            p.get("scores"),
            Some(&Value::Tuple(vec![Value::from(3i64), Value::from(1i64), Value::from(3i64)]))
        );
        assert_eq!(p.lookup("metadata.department").and_then(Value::as_str), Some("Engineering"));
    }

    #[test]
    fn extra_keys_are_ignored() {
        let reg = registry();
        let mut p = reg.instantiate("Person").unwrap();
        merge(&reg, &mut p, json!({"name": "A", "shoe_size": 44, "__type__": "Person"})).unwrap();
        assert!(p.get("shoe_size").is_none());
        assert_eq!(p.iter().count(), reg.fields("Person").unwrap().len());
    }

    #[test]
    fn non_mapping_data_is_a_type_kind_error() {
        let reg = registry();
        let mut p = reg.instantiate("Person").unwrap();
        let err = merge(&reg, &mut p, json!([1, 2])).unwrap_err();
        assert_eq!(err.kind(), "TypeKind");

        let err = merge(&reg, &mut p, json!({"contacts": "nope"})).unwrap_err();
        match err {
            Error::TypeKind { expected, found, path } => {
                assert_eq!(expected, "array");
                assert_eq!(found, "string");
                assert_eq!(path.to_string(), "contacts");
            }
            other => panic!("unexpected {other}"),
        }
    }

    #[test]
    fn failure_keeps_fields_applied_before_it() {
        let reg = registry();
        let mut p = reg.instantiate("Person").unwrap();
        // name and age come before address in declaration order
        let err = merge(&reg, &mut p, json!({"address": 7, "name": "Applied", "age": 5}));
        assert!(err.is_err());
        assert_eq!(p.get("name").and_then(Value::as_str), Some("Applied"));
        assert_eq!(p.get("age").and_then(Value::as_i64), Some(5));
        assert!(p.get("address").unwrap().is_null());
    }

    #[test]
    fn required_checks_follow_depth_setting() {
        let mut reg = Registry::new();
        reg.register(RecordType::new("Inner").field("id", Shape::integer())).unwrap();
        reg.register(
            RecordType::new("Outer")
                .field("name", Shape::string())
                .field("items", Shape::list(Shape::record("Inner"))),
        )
        .unwrap();

        let data = json!({"name": "o", "items": [{"id": 1}, {}]});
        let mut outer = reg.instantiate("Outer").unwrap();
        let err = Walker::constructing(&reg).merge_record(&mut outer, &data).unwrap_err();
        match err {
            Error::MissingField { record, field, path } => {
                assert_eq!((record.as_str(), field.as_str()), ("Inner", "id"));
                assert_eq!(path.to_string(), "items[1]");
            }
            other => panic!("unexpected {other}"),
        }

        reg.options_mut().required = RequiredCheck::Shallow;
        let mut outer = reg.instantiate("Outer").unwrap();
        Walker::constructing(&reg).merge_record(&mut outer, &data).unwrap();
        assert!(outer.lookup("items.1.id").unwrap().is_null());
    }

    #[test]
    fn any_record_fields_follow_the_type_tag() {
        let mut reg = registry();
        reg.register(RecordType::new("Holder").optional("thing", Shape::AnyRecord)).unwrap();
        let mut h = reg.instantiate("Holder").unwrap();

        merge(&reg, &mut h, json!({"thing": {"__type__": "Address", "city": "Oslo"}})).unwrap();
        assert_eq!(h.lookup("thing").and_then(Value::as_record).map(Record::type_name), Some("Address"));

        // untagged partial update keeps the current type
        merge(&reg, &mut h, json!({"thing": {"country": "Norway"}})).unwrap();
        assert_eq!(h.lookup("thing.city").and_then(Value::as_str), Some("Oslo"));
        assert_eq!(h.lookup("thing.country").and_then(Value::as_str), Some("Norway"));

        // retagging swaps the instance
        merge(&reg, &mut h, json!({"thing": {"__type__": "Contact", "email": "e"}})).unwrap();
        assert_eq!(h.lookup("thing").and_then(Value::as_record).map(Record::type_name), Some("Contact"));
        assert!(h.lookup("thing.city").is_none());
    }
}
