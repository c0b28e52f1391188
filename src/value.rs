//! Dynamic value stored in an [`AssocList`] slot.
use std::fmt;

use serde_json::Number;

use crate::list::AssocList;
use crate::opaque::Opaque;

/// Equality is by content. Nested lists compare keys and values only, and
/// [`Value::Json`] equals the native value it expands to.
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    Text(String),
    Array(Vec<Value>),
    /// Nested record.
    List(AssocList),
    /// JSON kept in its native form, converted only on demand.
    Json(serde_json::Value),
    Opaque(Opaque),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Name of the variant, used in conversion errors.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(n) if n.is_f64() => "float",
            Value::Number(_) => "integer",
            Value::Text(_) => "text",
            Value::Array(_) => "array",
            Value::List(_) => "list",
            Value::Json(_) => "json",
            Value::Opaque(h) => h.type_name(),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&AssocList> {
        match self {
            Value::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_list_mut(&mut self) -> Option<&mut AssocList> {
        match self {
            Value::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(xs) => Some(xs),
            _ => None,
        }
    }

    pub fn as_opaque(&self) -> Option<&Opaque> {
        match self {
            Value::Opaque(h) => Some(h),
            _ => None,
        }
    }

    pub fn opaque<T: std::any::Any + Send + Sync>(value: T) -> Self {
        Value::Opaque(Opaque::new(value))
    }

    /// Scalar text form used by query strings; `None` for composite values.
    pub(crate) fn scalar_text(&self) -> Option<String> {
        match self {
            Value::Null => Some(String::new()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Number(n) => Some(n.to_string()),
            Value::Text(s) => Some(s.clone()),
            Value::Json(json) => match json {
                serde_json::Value::Null => Some(String::new()),
                serde_json::Value::Bool(b) => Some(b.to_string()),
                serde_json::Value::Number(n) => Some(n.to_string()),
                serde_json::Value::String(s) => Some(s.clone()),
                _ => None,
            },
            Value::Array(_) | Value::List(_) | Value::Opaque(_) => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::List(a), Value::List(b)) => a.same_entries(b),
            (Value::Json(a), Value::Json(b)) => a == b,
            (Value::Opaque(a), Value::Opaque(b)) => a == b,
            (Value::Json(_), Value::Opaque(_)) | (Value::Opaque(_), Value::Json(_)) => false,
            (Value::Json(json), native) | (native, Value::Json(json)) => {
                crate::json::value_to_json(native).is_ok_and(|expanded| &expanded == json)
            }
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match crate::json::value_to_json(self) {
            Ok(json) => write!(f, "{json}"),
            Err(_) => write!(f, "<{}>", self.kind_name()),
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// CONVERSIONS
// ————————————————————————————————————————————————————————————————————————————

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

macro_rules! from_integer {
    ($($t:ty),*) => {$(
        impl From<$t> for Value {
            fn from(n: $t) -> Self {
                Value::Number(Number::from(n))
            }
        }
    )*};
}

from_integer!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl From<f64> for Value {
    /// Non-finite floats have no JSON form and become `Null`.
    fn from(f: f64) -> Self {
        Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
    }
}

impl From<f32> for Value {
    fn from(f: f32) -> Self {
        Value::from(f as f64)
    }
}

impl From<char> for Value {
    fn from(c: char) -> Self {
        Value::Text(c.to_string())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<uuid::Uuid> for Value {
    fn from(id: uuid::Uuid) -> Self {
        Value::Text(id.hyphenated().to_string())
    }
}

impl From<AssocList> for Value {
    fn from(list: AssocList) -> Self {
        Value::List(list)
    }
}

impl From<Opaque> for Value {
    fn from(handle: Opaque) -> Self {
        Value::Opaque(handle)
    }
}

impl From<serde_json::Value> for Value {
    /// Keeps the JSON native. Use [`crate::json::from_json_value`] to expand it.
    fn from(json: serde_json::Value) -> Self {
        Value::Json(json)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map(Into::into).unwrap_or(Value::Null)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(xs: Vec<T>) -> Self {
        Value::Array(xs.into_iter().map(Into::into).collect())
    }
}

impl<V: Into<Value>> From<indexmap::IndexMap<String, V>> for Value {
    /// Map entries land in a permissive list, so any key is accepted.
    fn from(map: indexmap::IndexMap<String, V>) -> Self {
        let mut list = AssocList::with_options(crate::list::ListOptions::permissive());
        for (k, v) in map {
            list.push_unchecked(k, v.into());
        }
        Value::List(list)
    }
}
