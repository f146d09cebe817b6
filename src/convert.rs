//! Entry points: `from_dict`, `update`, `to_dict`.

use serde_json::Value as Json;
use tracing::debug;

use crate::config::Options;
use crate::error::{Error, FieldPath, Result};
use crate::merge::Walker;
use crate::project::project_record;
use crate::registry::Registry;
use crate::value::{Record, Value};

impl Registry {
    /// Build a record of type `type_name` from a plain mapping.
    ///
    /// Fails with `TypeKind` when `type_name` is not registered or `data` is
    /// not a mapping, and with `MissingField` when a required field is absent
    /// (nested records too, unless `RequiredCheck::Shallow`).
    pub fn from_dict(&self, type_name: &str, data: &Json) -> Result<Record> {
        debug!(record = %type_name, "from_dict");
        let Some(ty) = self.get(type_name) else {
            return Err(Error::TypeKind {
                expected: "registered record type",
                found: format!("`{type_name}`"),
                path: FieldPath::root(),
            });
        };
        if !data.is_object() {
            return Err(Error::type_kind("object", data, &FieldPath::root()));
        }
        let mut record = self.instantiate_type(ty)?;
        Walker::constructing(self).merge_record(&mut record, data)?;
        Ok(record)
    }

    /// Merge `data` into `instance`, which must hold a record.
    pub fn update<'v>(&self, instance: &'v mut Value, data: &Json) -> Result<&'v mut Record> {
        match instance {
            Value::Record(record) => self.update_record(record, data),
            other => Err(Error::TypeKind {
                expected: "record instance",
                found: other.kind_name().to_string(),
                path: FieldPath::root(),
            }),
        }
    }

    /// Merge `data` into `record` in place and hand it back.
    ///
    /// Not atomic: on error, fields earlier in declaration order than the
    /// failing one keep their new values.
    pub fn update_record<'v>(&self, record: &'v mut Record, data: &Json) -> Result<&'v mut Record> {
        debug!(record = %record.type_name(), "update");
        if !data.is_object() {
            return Err(Error::type_kind("object", data, &FieldPath::root()));
        }
        Walker::lenient(self).merge_record(record, data)?;
        Ok(record)
    }

    /// Project with this registry's options.
    pub fn to_dict(&self, record: &Record) -> Json {
        project_record(record, self.options())
    }
}

impl Record {
    /// Project with default options (type tag included).
    pub fn to_dict(&self) -> Json {
        project_record(self, &Options::default())
    }
}

/// Project an instance; `TypeKind` unless it holds a record.
pub fn to_dict(instance: &Value) -> Result<Json> {
    match instance {
        Value::Record(r) => Ok(r.to_dict()),
        other => Err(Error::TypeKind {
            expected: "record instance",
            found: other.kind_name().to_string(),
            path: FieldPath::root(),
        }),
    }
}
