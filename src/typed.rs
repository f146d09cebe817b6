//! Bridge between records and serde types.
//!
//! Useful when a schema is registered dynamically but some consumer wants a
//! plain Rust struct: project without the type tag, then let serde take over.

use std::fmt::Display;

use serde::{de::DeserializeOwned, Serialize};

use crate::config::Options;
use crate::error::{Error, Result};
use crate::project::project_record;
use crate::registry::Registry;
use crate::value::Record;

/// Deserialize a record into `T`; errors carry the JSON path of the failure.
pub fn to_typed<T: DeserializeOwned>(record: &Record) -> Result<T> {
    let opts = Options { emit_type_tag: false, ..Options::default() };
    let plain = project_record(record, &opts);
    serde_path_to_error::deserialize(plain).map_err(path_error)
}

/// Serialize `value` and build a `type_name` record from it with `from_dict`.
pub fn from_typed<T: Serialize>(registry: &Registry, type_name: &str, value: &T) -> Result<Record> {
    let plain = serde_json::to_value(value)?;
    registry.from_dict(type_name, &plain)
}

pub(crate) fn path_error<E: Display>(err: serde_path_to_error::Error<E>) -> Error {
    let path = err.path().to_string();
    Error::Typed { path, message: err.into_inner().to_string() }
}
