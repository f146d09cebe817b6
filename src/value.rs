//! Record instances.
//!
//! A [`Record`] is a live value of a registered [`RecordType`]: one slot per
//! declared field, in declaration order. Slots hold a [`Value`], which already
//! knows its container kind, so projection back to plain data is value-driven.

use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value as Json;

use crate::error::{Error, Result};
use crate::ir::RecordType;

#[derive(Debug, Clone)]
pub enum Value {
    Null,
    /// Opaque leaf, copied as-is (may itself be an array or object).
    Scalar(Json),
    Record(Record),
    List(Vec<Value>),
    Tuple(Vec<Value>),
    /// Duplicates collapsed, first-insertion order kept for stable output.
    Set(Vec<Value>),
    Map(IndexMap<String, Value>),
}

impl Value {
    pub fn is_null(&self) -> bool { matches!(self, Value::Null) }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Scalar(j) => crate::error::json_kind(j),
            Value::Record(_) => "record",
            Value::List(_) => "list",
            Value::Tuple(_) => "tuple",
            Value::Set(_) => "set",
            Value::Map(_) => "map",
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self { Value::Record(r) => Some(r), _ => None }
    }

    pub fn as_record_mut(&mut self) -> Option<&mut Record> {
        match self { Value::Record(r) => Some(r), _ => None }
    }

    pub fn as_scalar(&self) -> Option<&Json> {
        match self { Value::Scalar(j) => Some(j), _ => None }
    }

    pub fn as_str(&self) -> Option<&str> { self.as_scalar().and_then(Json::as_str) }

    pub fn as_i64(&self) -> Option<i64> { self.as_scalar().and_then(Json::as_i64) }

    pub fn as_bool(&self) -> Option<bool> { self.as_scalar().and_then(Json::as_bool) }

    /// Elements of a list, tuple or set.
    pub fn as_items(&self) -> Option<&[Value]> {
        match self {
            Value::List(xs) | Value::Tuple(xs) | Value::Set(xs) => Some(xs),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&IndexMap<String, Value>> {
        match self { Value::Map(m) => Some(m), _ => None }
    }

    /// One step of [`Record::lookup`]: a field, a mapping key, or an index.
    fn step(&self, seg: &str) -> Option<&Value> {
        match self {
            Value::Record(r) => r.get(seg),
            Value::Map(m) => m.get(seg),
            Value::List(xs) | Value::Tuple(xs) | Value::Set(xs) => {
                seg.parse::<usize>().ok().and_then(|i| xs.get(i))
            }
            _ => None,
        }
    }
}

/// Set equality ignores order; mappings compare as unordered (IndexMap's `eq`).
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Scalar(a), Value::Scalar(b)) => a == b,
            (Value::Record(a), Value::Record(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Tuple(a), Value::Tuple(b)) => a == b,
            (Value::Set(a), Value::Set(b)) => {
                a.len() == b.len() && a.iter().all(|x| b.contains(x))
            }
            (Value::Map(a), Value::Map(b)) => a == b,
            _ => false,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self { Value::Scalar(Json::from(s)) }
}

impl From<String> for Value {
    fn from(s: String) -> Self { Value::Scalar(Json::from(s)) }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self { Value::Scalar(Json::from(n)) }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self { Value::Scalar(Json::from(n)) }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self { Value::Scalar(Json::from(b)) }
}

impl From<Record> for Value {
    fn from(r: Record) -> Self { Value::Record(r) }
}

// ————————————————————————————————————————————————————————————————————————————
// RECORD
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone)]
pub struct Record {
    ty: Arc<RecordType>,
    slots: IndexMap<String, Value>,
}

impl Record {
    /// Every slot starts out null. Use `Registry::instantiate` for declared
    /// defaults.
    pub fn new(ty: Arc<RecordType>) -> Self {
        let slots = ty.fields.iter().map(|f| (f.name.clone(), Value::Null)).collect();
        Self { ty, slots }
    }

    pub fn type_name(&self) -> &str { &self.ty.name }

    pub fn record_type(&self) -> &Arc<RecordType> { &self.ty }

    pub fn is_instance_of(&self, ty: &RecordType) -> bool { self.ty.name == ty.name }

    pub fn get(&self, field: &str) -> Option<&Value> { self.slots.get(field) }

    pub fn get_mut(&mut self, field: &str) -> Option<&mut Value> { self.slots.get_mut(field) }

    /// Replace a declared field, returning the old value. Unknown names are
    /// rejected rather than creating a stray slot.
    pub fn set(&mut self, field: &str, value: impl Into<Value>) -> Result<Value> {
        match self.slots.get_mut(field) {
            Some(slot) => Ok(std::mem::replace(slot, value.into())),
            None => Err(Error::UnknownField {
                record: self.ty.name.clone(),
                field: field.to_string(),
            }),
        }
    }

    /// `(name, value)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.slots.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Dotted lookup through records, mappings and collections:
    /// `person.lookup("addresses.home.postal_code")`, `lookup("contacts.0.email")`.
    /// Mapping keys containing `.` cannot be reached this way.
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        let mut segs = path.split('.');
        let first = self.get(segs.next()?)?;
        segs.try_fold(first, |v, seg| v.step(seg))
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.ty.name == other.ty.name && self.slots == other.slots
    }
}
