//! Recursive conversion between typed records and plain JSON data.
//!
//! Record types are declared up front as field schema tables ([`ir`]) and
//! registered in a [`Registry`]. From there:
//!
//! - [`Registry::from_dict`] builds a record from a plain mapping, checking
//!   required fields;
//! - [`Registry::update`] merges a plain mapping into an existing record,
//!   touching only the keys present;
//! - [`Registry::to_dict`] projects a record back to plain data, tagging each
//!   record mapping with its type name under [`TYPE_KEY`].
//!
//! ```
//! use json_rec::{Registry, Value};
//! use json_rec::ir::{RecordType, Shape};
//! use serde_json::json;
//!
//! let mut reg = Registry::new();
//! reg.register(RecordType::new("Address")
//!     .field("street", Shape::string())
//!     .field("city", Shape::string()))?;
//! reg.register(RecordType::new("Person")
//!     .field("name", Shape::string())
//!     .optional("address", Shape::record("Address")))?;
//!
//! let mut person = reg.from_dict("Person", &json!({
//!     "name": "Ann",
//!     "address": {"street": "123 Main St", "city": "New York"},
//! }))?;
//! reg.update_record(&mut person, &json!({"address": {"city": "Boston"}}))?;
//! assert_eq!(person.lookup("address.street").and_then(Value::as_str), Some("123 Main St"));
//! assert_eq!(reg.to_dict(&person)["address"]["__type__"], "Address");
//! # Ok::<(), json_rec::Error>(())
//! ```

pub mod config;
pub mod convert;
pub mod error;
pub mod ir;
pub mod json_schema;
mod merge;
pub mod project;
pub mod registry;
pub mod resolve;
pub mod schema_doc;
pub mod typed;
pub mod value;

pub use config::{Options, RequiredCheck, TYPE_KEY};
pub use convert::to_dict;
pub use error::{Error, FieldPath, Result, SchemaError};
pub use registry::Registry;
pub use value::{Record, Value};
