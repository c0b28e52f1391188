//! Runtime type coercion.
//!
//! [`coerce`] turns a dynamic [`Value`] into a statically declared type. The
//! order of attempts is fixed:
//!
//! 1. `Option<U>` unwraps; null becomes `None`.
//! 2. Null becomes the target's zero value, when it has one.
//! 3. A value that already holds the target is returned as is.
//! 4. Native JSON is deserialized; text becomes a `Uuid` by parsing; a nested
//!    list builds a record or map; anything else goes through the generic
//!    scalar conversion.
//!
//! Every failure in step 4 surfaces as `TypeConversion` naming both types.
use indexmap::IndexMap;
use uuid::Uuid;

use crate::diagnostics::Diagnostics;
use crate::error::{Cause, Error, Result};
use crate::json::{from_json_value, value_to_json};
use crate::list::{AssocList, ListOptions};
use crate::path_de::from_json_with_path;
use crate::value::Value;

/// Per-call settings threaded through nested conversions.
#[derive(Debug, Clone, Copy)]
pub struct CoerceCtx<'a> {
    /// Forwarded to record construction: skip absent properties.
    pub ignore_missing: bool,
    pub diagnostics: &'a Diagnostics,
}

/// A type a [`Value`] can be coerced into.
///
/// Every hook has a default; implementors override the ones that apply.
/// Records usually only need [`Coerce::from_list`], see
/// [`impl_coerce_record!`](crate::impl_coerce_record).
pub trait Coerce: Sized + Clone + 'static {
    fn type_name() -> String {
        short_type_name(std::any::type_name::<Self>())
    }

    /// Zero value used for a null source. `None` means null is rejected.
    ///
    /// Records keep the default: a bare struct has no null state, and
    /// inventing a default instance would hide missing data. Nullable record
    /// slots are declared as `Option<Record>`, which maps null to `None`.
    fn from_null() -> Option<Self> {
        None
    }

    /// Fast path: the value already holds a `Self`.
    fn from_exact(value: &Value) -> Option<Self> {
        value.as_opaque()?.downcast_ref::<Self>().cloned()
    }

    /// Conversion from native JSON.
    fn from_json(json: &serde_json::Value, ctx: &CoerceCtx<'_>) -> Result<Self, Cause> {
        let expanded = from_json_value(json.clone(), ListOptions::permissive())
            .map_err(Cause::source)?;
        attempt::<Self>(&expanded, ctx)
    }

    /// Construction from a nested list. `None` when the type is not built
    /// from lists.
    fn from_list(_list: &AssocList, _ctx: &CoerceCtx<'_>) -> Option<Result<Self, Cause>> {
        None
    }

    /// Generic scalar conversion, the last resort.
    fn change_type(value: &Value, _ctx: &CoerceCtx<'_>) -> Result<Self, Cause> {
        Err(Cause::msg(format!("no conversion from {}", value.kind_name())))
    }

    /// Full algorithm. Only wrapper types override this.
    fn coerce_value(value: &Value, ctx: &CoerceCtx<'_>) -> Result<Self> {
        if is_null(value) {
            return Self::from_null().ok_or_else(|| {
                fail::<Self>(value, ctx, Cause::msg("null is only accepted by optional targets"))
            });
        }
        attempt::<Self>(value, ctx).map_err(|cause| fail::<Self>(value, ctx, cause))
    }
}

pub fn coerce<T: Coerce>(value: &Value, ignore_missing: bool) -> Result<T> {
    coerce_with(value, ignore_missing, &Diagnostics::none())
}

pub fn coerce_with<T: Coerce>(
    value: &Value,
    ignore_missing: bool,
    diagnostics: &Diagnostics,
) -> Result<T> {
    let ctx = CoerceCtx {
        ignore_missing,
        diagnostics,
    };
    T::coerce_value(value, &ctx)
}

// ————————————————————————————————————————————————————————————————————————————
// DRIVER
// ————————————————————————————————————————————————————————————————————————————

fn is_null(value: &Value) -> bool {
    matches!(value, Value::Null | Value::Json(serde_json::Value::Null))
}

/// Steps 3 and 4 for a non-null value.
fn attempt<T: Coerce>(value: &Value, ctx: &CoerceCtx<'_>) -> Result<T, Cause> {
    if let Some(exact) = T::from_exact(value) {
        return Ok(exact);
    }
    match value {
        Value::Json(json) => T::from_json(json, ctx),
        Value::List(list) => match T::from_list(list, ctx) {
            Some(built) => built,
            None => T::change_type(value, ctx),
        },
        _ => T::change_type(value, ctx),
    }
}

#[track_caller]
fn fail<T: Coerce>(value: &Value, ctx: &CoerceCtx<'_>, cause: Cause) -> Error {
    let to = T::type_name();
    tracing::debug!(from = value.kind_name(), to = %to, "coercion failed");
    ctx.diagnostics.fail(
        "coerce",
        format!("{} -> {to}", value.kind_name()),
        Error::conversion(value.kind_name(), to, cause),
    )
}

/// Strips module paths: `core::option::Option<alloc::string::String>` becomes
/// `Option<String>`.
pub(crate) fn short_type_name(full: &str) -> String {
    let mut out = String::with_capacity(full.len());
    let mut segment = String::new();
    for ch in full.chars() {
        if ch.is_alphanumeric() || ch == '_' || ch == ':' {
            segment.push(ch);
        } else {
            out.push_str(segment.rsplit("::").next().unwrap_or(""));
            segment.clear();
            out.push(ch);
        }
    }
    out.push_str(segment.rsplit("::").next().unwrap_or(""));
    out
}

fn nested(err: Error) -> Cause {
    Cause::source(err)
}

// ————————————————————————————————————————————————————————————————————————————
// WRAPPERS & DYNAMIC TARGETS
// ————————————————————————————————————————————————————————————————————————————

impl<U: Coerce> Coerce for Option<U> {
    fn type_name() -> String {
        format!("Option<{}>", U::type_name())
    }

    fn from_null() -> Option<Self> {
        Some(None)
    }

    fn coerce_value(value: &Value, ctx: &CoerceCtx<'_>) -> Result<Self> {
        if is_null(value) {
            return Ok(None);
        }
        U::coerce_value(value, ctx).map(Some)
    }
}

impl Coerce for Value {
    fn from_null() -> Option<Self> {
        Some(Value::Null)
    }

    fn from_exact(value: &Value) -> Option<Self> {
        Some(value.clone())
    }
}

impl Coerce for serde_json::Value {
    fn from_null() -> Option<Self> {
        Some(serde_json::Value::Null)
    }

    fn from_exact(value: &Value) -> Option<Self> {
        match value {
            Value::Json(json) => Some(json.clone()),
            _ => None,
        }
    }

    fn change_type(value: &Value, _ctx: &CoerceCtx<'_>) -> Result<Self, Cause> {
        value_to_json(value).map_err(nested)
    }
}

impl Coerce for AssocList {
    fn from_null() -> Option<Self> {
        Some(AssocList::new())
    }

    fn from_exact(value: &Value) -> Option<Self> {
        value.as_list().cloned()
    }
}

impl<U: Coerce> Coerce for Vec<U> {
    fn type_name() -> String {
        format!("Vec<{}>", U::type_name())
    }

    fn from_null() -> Option<Self> {
        Some(Vec::new())
    }

    fn change_type(value: &Value, ctx: &CoerceCtx<'_>) -> Result<Self, Cause> {
        match value {
            Value::Array(xs) => xs
                .iter()
                .map(|x| U::coerce_value(x, ctx))
                .collect::<Result<_>>()
                .map_err(nested),
            other => Err(Cause::msg(format!("expected an array, found {}", other.kind_name()))),
        }
    }
}

impl<U: Coerce> Coerce for IndexMap<String, U> {
    fn type_name() -> String {
        format!("IndexMap<String, {}>", U::type_name())
    }

    fn from_null() -> Option<Self> {
        Some(IndexMap::new())
    }

    /// Later duplicates of a key replace earlier ones.
    fn from_list(list: &AssocList, ctx: &CoerceCtx<'_>) -> Option<Result<Self, Cause>> {
        let built = list
            .iter()
            .map(|(k, v)| U::coerce_value(v, ctx).map(|v| (k.to_string(), v)))
            .collect::<Result<IndexMap<_, _>>>()
            .map_err(nested);
        Some(built)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// SCALARS
// ————————————————————————————————————————————————————————————————————————————

impl Coerce for bool {
    fn from_null() -> Option<Self> {
        Some(false)
    }

    fn from_exact(value: &Value) -> Option<Self> {
        value.as_bool()
    }

    fn from_json(json: &serde_json::Value, _ctx: &CoerceCtx<'_>) -> Result<Self, Cause> {
        from_json_with_path(json)
    }

    fn change_type(value: &Value, _ctx: &CoerceCtx<'_>) -> Result<Self, Cause> {
        match value {
            Value::Number(n) => Ok(n.as_f64().is_some_and(|f| f != 0.0)),
            Value::Text(s) => {
                let t = s.trim();
                if t.eq_ignore_ascii_case("true") {
                    Ok(true)
                } else if t.eq_ignore_ascii_case("false") {
                    Ok(false)
                } else {
                    Err(Cause::msg(format!("{s:?} is not a boolean")))
                }
            }
            other => Err(Cause::msg(format!("no conversion from {}", other.kind_name()))),
        }
    }
}

/// Float to integer: round half to even, reject out of range.
fn float_to_int<T: TryFrom<i128>>(f: f64) -> Result<T, Cause> {
    if !f.is_finite() {
        return Err(Cause::msg(format!("{f} is not finite")));
    }
    let rounded = f.round_ties_even();
    if rounded < i128::MIN as f64 || rounded > i128::MAX as f64 {
        return Err(Cause::msg(format!("{f} is out of range")));
    }
    T::try_from(rounded as i128).map_err(|_| Cause::msg(format!("{f} is out of range")))
}

macro_rules! coerce_integer {
    ($($t:ty),*) => {$(
        impl Coerce for $t {
            fn from_null() -> Option<Self> {
                Some(0)
            }

            fn from_exact(value: &Value) -> Option<Self> {
                let Value::Number(n) = value else { return None };
                if let Some(i) = n.as_i64() {
                    <$t>::try_from(i).ok()
                } else {
                    n.as_u64().and_then(|u| <$t>::try_from(u).ok())
                }
            }

            fn from_json(json: &serde_json::Value, _ctx: &CoerceCtx<'_>) -> Result<Self, Cause> {
                from_json_with_path(json)
            }

            fn change_type(value: &Value, _ctx: &CoerceCtx<'_>) -> Result<Self, Cause> {
                match value {
                    Value::Number(n) => {
                        if let Some(i) = n.as_i64() {
                            <$t>::try_from(i).map_err(Cause::source)
                        } else if let Some(u) = n.as_u64() {
                            <$t>::try_from(u).map_err(Cause::source)
                        } else {
                            float_to_int(n.as_f64().unwrap_or(f64::NAN))
                        }
                    }
                    Value::Bool(b) => Ok(<$t>::from(*b)),
                    Value::Text(s) => s.trim().parse::<$t>().map_err(Cause::source),
                    other => Err(Cause::msg(format!("no conversion from {}", other.kind_name()))),
                }
            }
        }
    )*};
}

coerce_integer!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

macro_rules! coerce_float {
    ($($t:ty),*) => {$(
        impl Coerce for $t {
            fn from_null() -> Option<Self> {
                Some(0.0)
            }

            fn from_exact(value: &Value) -> Option<Self> {
                value.as_f64().map(|f| f as $t)
            }

            fn from_json(json: &serde_json::Value, _ctx: &CoerceCtx<'_>) -> Result<Self, Cause> {
                from_json_with_path(json)
            }

            fn change_type(value: &Value, _ctx: &CoerceCtx<'_>) -> Result<Self, Cause> {
                match value {
                    Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
                    Value::Text(s) => s.trim().parse::<$t>().map_err(Cause::source),
                    other => Err(Cause::msg(format!("no conversion from {}", other.kind_name()))),
                }
            }
        }
    )*};
}

coerce_float!(f32, f64);

impl Coerce for char {
    fn from_null() -> Option<Self> {
        Some('\0')
    }

    fn from_exact(value: &Value) -> Option<Self> {
        let mut chars = value.as_str()?.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Some(c),
            _ => None,
        }
    }

    fn from_json(json: &serde_json::Value, _ctx: &CoerceCtx<'_>) -> Result<Self, Cause> {
        from_json_with_path(json)
    }

    fn change_type(value: &Value, _ctx: &CoerceCtx<'_>) -> Result<Self, Cause> {
        match value {
            Value::Number(n) => n
                .as_u64()
                .and_then(|u| u32::try_from(u).ok())
                .and_then(char::from_u32)
                .ok_or_else(|| Cause::msg(format!("{n} is not a character code"))),
            Value::Text(s) => Err(Cause::msg(format!("{s:?} is not a single character"))),
            other => Err(Cause::msg(format!("no conversion from {}", other.kind_name()))),
        }
    }
}

impl Coerce for String {
    fn from_null() -> Option<Self> {
        Some(String::new())
    }

    fn from_exact(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_string)
    }

    fn from_json(json: &serde_json::Value, _ctx: &CoerceCtx<'_>) -> Result<Self, Cause> {
        match json {
            serde_json::Value::String(s) => Ok(s.clone()),
            serde_json::Value::Bool(b) => Ok(b.to_string()),
            serde_json::Value::Number(n) => Ok(n.to_string()),
            other => Err(Cause::msg(format!("cannot render {other} as text"))),
        }
    }

    fn change_type(value: &Value, _ctx: &CoerceCtx<'_>) -> Result<Self, Cause> {
        match value {
            Value::Bool(b) => Ok(b.to_string()),
            Value::Number(n) => Ok(n.to_string()),
            other => Err(Cause::msg(format!("no conversion from {}", other.kind_name()))),
        }
    }
}

impl Coerce for Uuid {
    fn from_null() -> Option<Self> {
        Some(Uuid::nil())
    }

    fn from_json(json: &serde_json::Value, _ctx: &CoerceCtx<'_>) -> Result<Self, Cause> {
        from_json_with_path(json)
    }

    fn change_type(value: &Value, _ctx: &CoerceCtx<'_>) -> Result<Self, Cause> {
        match value {
            Value::Text(s) => Uuid::parse_str(s.trim()).map_err(Cause::source),
            other => Err(Cause::msg(format!("no conversion from {}", other.kind_name()))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    fn is_conversion(err: &Error, to: &str) -> bool {
        matches!(err.kind(), ErrorKind::TypeConversion { to: t, .. } if t == to)
    }

    #[test]
    fn null_into_option_is_none() {
        assert_eq!(coerce::<Option<i32>>(&Value::Null, false).unwrap(), None);
        assert_eq!(coerce::<Option<i32>>(&Value::Json(json!(null)), false).unwrap(), None);
        assert_eq!(coerce::<Option<i32>>(&Value::from(4), false).unwrap(), Some(4));
    }

    #[test]
    fn null_into_value_types_is_zero() {
        assert_eq!(coerce::<i32>(&Value::Null, false).unwrap(), 0);
        assert!(!coerce::<bool>(&Value::Null, false).unwrap());
        assert_eq!(coerce::<String>(&Value::Null, false).unwrap(), "");
        assert_eq!(coerce::<Uuid>(&Value::Null, false).unwrap(), Uuid::nil());
        assert!(coerce::<Vec<u8>>(&Value::Null, false).unwrap().is_empty());
    }

    #[test]
    fn text_into_uuid() {
        let text = "3fa85f64-5717-4562-b3fc-2c963f66afa6";
        let id = coerce::<Uuid>(&Value::from(text), false).unwrap();
        assert_eq!(id.to_string(), text);

        let err = coerce::<Uuid>(&Value::from("not-a-uuid"), false).unwrap_err();
        assert!(is_conversion(&err, "Uuid"));
    }

    #[test]
    fn fast_path_returns_value_unchanged() {
        assert_eq!(coerce::<i32>(&Value::from(42), false).unwrap(), 42);
        assert_eq!(coerce::<Value>(&Value::from("x"), false).unwrap(), Value::from("x"));
        let handle = Value::opaque(Uuid::nil());
        assert_eq!(coerce::<Uuid>(&handle, false).unwrap(), Uuid::nil());
    }

    #[test]
    fn bad_text_into_int_fails() {
        let err = coerce::<i32>(&Value::from("x"), false).unwrap_err();
        match err.kind() {
            ErrorKind::TypeConversion { from, to, .. } => {
                assert_eq!(from, "text");
                assert_eq!(to, "i32");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn change_type_conversions() {
        assert_eq!(coerce::<i64>(&Value::from(" 17 "), false).unwrap(), 17);
        assert_eq!(coerce::<i32>(&Value::from(2.5), false).unwrap(), 2);
        assert_eq!(coerce::<i32>(&Value::from(3.5), false).unwrap(), 4);
        assert_eq!(coerce::<u8>(&Value::from(true), false).unwrap(), 1);
        assert_eq!(coerce::<f64>(&Value::from(3), false).unwrap(), 3.0);
        assert_eq!(coerce::<f32>(&Value::from("1.25"), false).unwrap(), 1.25);
        assert!(coerce::<bool>(&Value::from("TRUE"), false).unwrap());
        assert!(coerce::<bool>(&Value::from(2), false).unwrap());
        assert_eq!(coerce::<String>(&Value::from(12), false).unwrap(), "12");
        assert_eq!(coerce::<char>(&Value::from("z"), false).unwrap(), 'z');
        assert_eq!(coerce::<char>(&Value::from(65), false).unwrap(), 'A');
    }

    #[test]
    fn range_is_checked() {
        assert!(is_conversion(&coerce::<u8>(&Value::from(300), false).unwrap_err(), "u8"));
        assert!(is_conversion(&coerce::<u32>(&Value::from(-1), false).unwrap_err(), "u32"));
        assert!(is_conversion(&coerce::<i8>(&Value::from(1e10), false).unwrap_err(), "i8"));
    }

    #[test]
    fn native_json_is_deserialized() {
        assert_eq!(coerce::<i32>(&Value::Json(json!(9)), false).unwrap(), 9);
        assert_eq!(coerce::<String>(&Value::Json(json!(1.5)), false).unwrap(), "1.5");
        assert_eq!(
            coerce::<Vec<Option<u8>>>(&Value::Json(json!([1, null, 3])), false).unwrap(),
            vec![Some(1), None, Some(3)]
        );
        let err = coerce::<i32>(&Value::Json(json!("nine")), false).unwrap_err();
        assert!(is_conversion(&err, "i32"));
    }

    #[test]
    fn arrays_convert_element_wise() {
        let xs = Value::from(vec![Value::from("1"), Value::from(2), Value::from(3.0)]);
        assert_eq!(coerce::<Vec<i64>>(&xs, false).unwrap(), vec![1, 2, 3]);
        let bad = Value::from(vec![Value::from("1"), Value::from("two")]);
        assert!(is_conversion(&coerce::<Vec<i64>>(&bad, false).unwrap_err(), "Vec<i64>"));
    }

    #[test]
    fn lists_convert_into_maps() {
        let list = AssocList::from_pairs(ListOptions::default(), [("a", 1), ("b", 2)]).unwrap();
        let map = coerce::<IndexMap<String, u16>>(&Value::from(list), false).unwrap();
        assert_eq!(map.keys().collect::<Vec<_>>(), ["a", "b"]);
        assert_eq!(map["b"], 2);
    }

    #[test]
    fn json_objects_convert_into_lists_and_maps() {
        let raw = Value::Json(json!({"x": 1, "y": {"z": true}}));
        let list = coerce::<AssocList>(&raw, false).unwrap();
        assert_eq!(list.keys().collect::<Vec<_>>(), ["x", "y"]);
        let map = coerce::<IndexMap<String, Value>>(&raw, false).unwrap();
        assert!(map["y"].as_list().is_some());
    }

    #[test]
    fn short_names() {
        assert_eq!(short_type_name("core::option::Option<alloc::string::String>"), "Option<String>");
        assert_eq!(short_type_name("i32"), "i32");
        assert_eq!(
            short_type_name("indexmap::map::IndexMap<alloc::string::String, u8>"),
            "IndexMap<String, u8>"
        );
    }
}
