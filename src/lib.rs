//! Ordered, string-keyed records with a JSON bridge, an object bridge and a
//! runtime coercion engine.
//!
//! ```
//! use assoc_bridge::{AssocList, ListOptions, Value};
//!
//! let mut list = AssocList::with_options(ListOptions::default().overwrite_on_duplicate(true));
//! list.add("name", "widget").unwrap();
//! list.add("count", 3).unwrap();
//! list.add("count", 4).unwrap();
//! assert_eq!(list.index_of_key("count", 0), Some(1));
//! assert_eq!(list.to_json().unwrap(), r#"{"name":"widget","count":4}"#);
//!
//! let parsed = AssocList::from_json_str(r#"{"a":{"b":1}}"#, ListOptions::default()).unwrap();
//! assert_eq!(parsed["a"].as_list().unwrap()["b"], Value::from(1));
//! ```
pub mod coerce;
pub mod diagnostics;
pub mod error;
pub mod ident;
pub mod json;
pub mod list;
pub mod opaque;
pub mod path_de;
pub mod reflect;
pub mod value;

pub use coerce::{coerce, coerce_with, Coerce, CoerceCtx};
pub use diagnostics::{CollectingSink, DiagnosticRecord, DiagnosticSink, Diagnostics};
pub use error::{Cause, Error, ErrorKind, Result};
pub use ident::is_identifier;
pub use json::{from_json, from_json_value, to_json, to_json_pretty, to_json_value};
pub use list::{AssocList, ListOptions};
pub use opaque::Opaque;
pub use reflect::{
    descriptor, from_object, from_static_fields, get_member, set_member, to_new_object, to_object,
    to_static_fields, Bridgeable, DescriptorBuilder, Member, MemberKind, TypeDescriptor,
};
pub use value::Value;
