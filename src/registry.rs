//! The registry answers the questions the walkers ask about types: is this a
//! record type, what are its fields, and what does a default instance look
//! like.

use std::collections::HashSet;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value as Json;
use tracing::debug;

use crate::config::{Options, TYPE_KEY};
use crate::error::{Error, FieldPath, Result, SchemaError};
use crate::ir::{Field, FieldDefault, RecordType, Shape};
use crate::merge::Walker;
use crate::resolve::{Descriptor, RecordTarget};
use crate::value::{Record, Value};

#[derive(Debug, Clone, Default)]
pub struct Registry {
    types: IndexMap<String, Arc<RecordType>>,
    options: Options,
}

impl Registry {
    pub fn new() -> Self { Self::default() }

    pub fn with_options(options: Options) -> Self {
        Self { types: IndexMap::new(), options }
    }

    pub fn options(&self) -> &Options { &self.options }

    pub fn options_mut(&mut self) -> &mut Options { &mut self.options }

    /// Add a record type. Field references to other records are resolved
    /// lazily, so types may be registered in any order.
    pub fn register(&mut self, ty: RecordType) -> Result<Arc<RecordType>, SchemaError> {
        if self.types.contains_key(&ty.name) {
            return Err(SchemaError::DuplicateRecord(ty.name));
        }
        let mut seen = HashSet::new();
        for f in &ty.fields {
            if f.name == TYPE_KEY {
                return Err(SchemaError::ReservedField { record: ty.name.clone(), field: f.name.clone() });
            }
            if !seen.insert(f.name.as_str()) {
                return Err(SchemaError::DuplicateField { record: ty.name.clone(), field: f.name.clone() });
            }
        }
        debug!(record = %ty.name, fields = ty.fields.len(), "registered record type");
        let ty = Arc::new(ty);
        self.types.insert(ty.name.clone(), Arc::clone(&ty));
        Ok(ty)
    }

    pub fn is_record_type(&self, name: &str) -> bool { self.types.contains_key(name) }

    pub fn get(&self, name: &str) -> Option<&Arc<RecordType>> { self.types.get(name) }

    pub fn fields(&self, name: &str) -> Option<&[Field]> {
        self.types.get(name).map(|t| t.fields.as_slice())
    }

    pub fn record_types(&self) -> impl Iterator<Item = &Arc<RecordType>> { self.types.values() }

    /// Default instance of a registered type: required fields null, declared
    /// defaults materialized, `Empty` defaults set to the shape's zero value.
    ///
    /// Non-optional record fields with `Empty` defaults instantiate their
    /// target eagerly, so such a field must not close a cycle.
    pub fn instantiate(&self, name: &str) -> Result<Record> {
        match self.types.get(name) {
            Some(ty) => self.instantiate_type(ty),
            None => Err(Error::TypeKind {
                expected: "registered record type",
                found: format!("`{name}`"),
                path: FieldPath::root(),
            }),
        }
    }

    pub(crate) fn instantiate_type(&self, ty: &Arc<RecordType>) -> Result<Record> {
        let mut record = Record::new(Arc::clone(ty));
        for field in &ty.fields {
            let value = match &field.default {
                FieldDefault::Required => continue,
                FieldDefault::Empty => self.empty_value(&field.shape)?,
                FieldDefault::Value(Json::Null) => continue,
                FieldDefault::Value(plain) => {
                    let mut slot = Value::Null;
                    Walker::lenient(self).assign(&field.shape, &mut slot, plain)?;
                    slot
                }
            };
            record.set(&field.name, value)?;
        }
        Ok(record)
    }

    fn empty_value(&self, shape: &Shape) -> Result<Value> {
        Ok(match self.classify(shape) {
            Descriptor::Scalar | Descriptor::Optional(_) => Value::Null,
            Descriptor::NestedRecord(RecordTarget::Named(ty)) => Value::Record(self.instantiate_type(ty)?),
            Descriptor::NestedRecord(RecordTarget::Tagged) => Value::Null,
            Descriptor::Sequence(kind, _) => kind.wrap(Vec::new()),
            Descriptor::Set(_) => Value::Set(Vec::new()),
            Descriptor::Mapping(..) => Value::Map(IndexMap::new()),
        })
    }
}
