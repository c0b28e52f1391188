//! JSON text ⇄ [`AssocList`].
//!
//! Every JSON object, at any depth and also inside arrays, is loaded as a
//! nested `AssocList` carrying the options of the list being filled. Key order
//! is preserved both ways (`serde_json` is built with `preserve_order`).
use serde_json::{Map, Value as Json};

use crate::diagnostics::Diagnostics;
use crate::error::{Cause, Error, Result};
use crate::list::{AssocList, KeyCheck, ListOptions};
use crate::value::Value;

// ————————————————————————————————————————————————————————————————————————————
// EMIT
// ————————————————————————————————————————————————————————————————————————————

pub fn to_json(list: &AssocList) -> Result<String> {
    Ok(serde_json::to_string(&to_json_value(list)?)?)
}

pub fn to_json_pretty(list: &AssocList) -> Result<String> {
    Ok(serde_json::to_string_pretty(&to_json_value(list)?)?)
}

/// Renders the list as a JSON object. Later duplicates of a key win, since a
/// JSON object cannot hold the same key twice.
pub fn to_json_value(list: &AssocList) -> Result<Json> {
    let mut map = Map::with_capacity(list.len());
    for (key, value) in list {
        let json = value_to_json(value)
            .map_err(|err| list.diagnostics().fail("to_json", format!("key {key:?}"), err))?;
        map.insert(key.to_string(), json);
    }
    Ok(Json::Object(map))
}

pub(crate) fn value_to_json(value: &Value) -> Result<Json> {
    Ok(match value {
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Number(n) => Json::Number(n.clone()),
        Value::Text(s) => Json::String(s.clone()),
        Value::Array(xs) => Json::Array(xs.iter().map(value_to_json).collect::<Result<_>>()?),
        Value::List(list) => to_json_value(list)?,
        Value::Json(json) => json.clone(),
        Value::Opaque(handle) => match handle.to_json() {
            Some(rendered) => rendered.map_err(|err| {
                Error::conversion(handle.type_name(), "json", Cause::source(err))
            })?,
            None => {
                return Err(Error::conversion(
                    handle.type_name(),
                    "json",
                    Cause::msg("opaque value has no JSON form"),
                ));
            }
        },
    })
}

// ————————————————————————————————————————————————————————————————————————————
// LOAD
// ————————————————————————————————————————————————————————————————————————————

/// Parses `text` (a JSON object) and adds its members to `into`, in order.
///
/// Members go through `into`'s add rules. Loading stops at the first rejected
/// member; members added before it stay in `into`.
pub fn from_json(text: &str, into: &mut AssocList) -> Result<()> {
    let json: Json = serde_json::from_str(text)
        .map_err(|err| into.diagnostics().fail("from_json", "parse", err.into()))?;
    match json {
        Json::Object(map) => load_object(map, into),
        other => Err(into.diagnostics().fail(
            "from_json",
            "top level",
            Error::invalid_argument(
                "text",
                format!("expected a JSON object, found {}", json_kind(&other)),
            ),
        )),
    }
}

/// Expands native JSON into a [`Value`], turning objects into lists built
/// with `options`.
pub fn from_json_value(json: Json, options: ListOptions) -> Result<Value> {
    expand(json, options, &Diagnostics::none())
}

fn load_object(map: Map<String, Json>, into: &mut AssocList) -> Result<()> {
    let options = into.options();
    let diagnostics = into.diagnostics().clone();
    for (key, json) in map {
        let value = expand(json, options, &diagnostics)?;
        into.add_checked(key, value, None, false, KeyCheck::Full)?;
    }
    Ok(())
}

fn expand(json: Json, options: ListOptions, diagnostics: &Diagnostics) -> Result<Value> {
    Ok(match json {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(b),
        Json::Number(n) => Value::Number(n),
        Json::String(s) => Value::Text(s),
        Json::Array(xs) => Value::Array(
            xs.into_iter()
                .map(|x| expand(x, options, diagnostics))
                .collect::<Result<_>>()?,
        ),
        Json::Object(map) => {
            let mut nested = AssocList::with_options(options);
            nested.set_diagnostics(diagnostics.clone());
            load_object(map, &mut nested)?;
            Value::List(nested)
        }
    })
}

fn json_kind(json: &Json) -> &'static str {
    match json {
        Json::Null => "null",
        Json::Bool(_) => "a boolean",
        Json::Number(_) => "a number",
        Json::String(_) => "a string",
        Json::Array(_) => "an array",
        Json::Object(_) => "an object",
    }
}

impl AssocList {
    /// Builds a list with `options` from JSON object text.
    pub fn from_json_str(text: &str, options: ListOptions) -> Result<Self> {
        let mut list = AssocList::with_options(options);
        from_json(text, &mut list)?;
        Ok(list)
    }

    pub fn to_json(&self) -> Result<String> {
        to_json(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::opaque::Opaque;
    use serde_json::json;

    #[test]
    fn nested_objects_become_lists() {
        let text = r#"{"a":{"b":{"c":{"d":1}}},"xs":[{"k":true},2]}"#;
        let list = AssocList::from_json_str(text, ListOptions::default()).unwrap();

        let a = list["a"].as_list().unwrap();
        let b = a["b"].as_list().unwrap();
        let c = b["c"].as_list().unwrap();
        assert_eq!(c["d"], Value::from(1));
        assert_eq!(c.options(), ListOptions::default());

        let xs = list["xs"].as_array().unwrap();
        assert_eq!(xs[0].as_list().unwrap()["k"], Value::Bool(true));
        assert_eq!(xs[1], Value::from(2));
    }

    #[test]
    fn round_trip_keeps_order_and_values() {
        let text = r#"{"z":1,"a":"two","m":[1.5,null,false],"n":{"y":{"x":{"w":[{"v":0}]}}}}"#;
        let list = AssocList::from_json_str(text, ListOptions::default()).unwrap();
        let emitted = to_json(&list).unwrap();
        assert_eq!(emitted, text);
        let again = AssocList::from_json_str(&emitted, ListOptions::default()).unwrap();
        assert_eq!(again, list);
        assert_eq!(again.keys().collect::<Vec<_>>(), ["z", "a", "m", "n"]);
    }

    #[test]
    fn round_trip_of_built_list() {
        let inner = AssocList::from_pairs(ListOptions::permissive(), [("b", 1)]).unwrap();
        let list = AssocList::from_pairs(
            ListOptions::default(),
            [
                ("a", Value::from(inner)),
                ("n", Value::Json(json!(5))),
                ("doc", Value::Json(json!({"k": [true, null]}))),
            ],
        )
        .unwrap();

        let mut back = AssocList::new();
        from_json(&to_json(&list).unwrap(), &mut back).unwrap();
        assert_eq!(back, list);
        assert_eq!(back["n"], Value::from(5));
        assert_eq!(back["a"].as_list().unwrap().options(), ListOptions::default());
    }

    #[test]
    fn failed_load_keeps_earlier_members() {
        let mut list = AssocList::new();
        let err = from_json(r#"{"a":1,"b c":2,"d":3}"#, &mut list).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidIdentifier(k) if k == "b c"));
        assert_eq!(list.keys().collect::<Vec<_>>(), ["a"]);
    }

    #[test]
    fn top_level_must_be_object() {
        let mut list = AssocList::new();
        let err = from_json("[1,2]", &mut list).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidArgument { name: "text", .. }));
        let err = from_json("{oops", &mut list).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Json(_)));
    }

    #[test]
    fn nested_keys_follow_list_policy() {
        let err = AssocList::from_json_str(r#"{"ok":{"not ok":1}}"#, ListOptions::default())
            .unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidIdentifier(k) if k == "not ok"));

        let list = AssocList::from_json_str(r#"{"ok":{"not ok":1}}"#, ListOptions::permissive())
            .unwrap();
        assert_eq!(list["ok"].as_list().unwrap()["not ok"], Value::from(1));
    }

    #[test]
    fn from_json_appends_to_existing_entries() {
        let mut list = AssocList::new();
        list.add("first", 0).unwrap();
        from_json(r#"{"second":1}"#, &mut list).unwrap();
        assert_eq!(list.keys().collect::<Vec<_>>(), ["first", "second"]);
        assert!(from_json(r#"{"first":2}"#, &mut list).is_err());
    }

    #[test]
    fn json_and_opaque_values() {
        let mut list = AssocList::new();
        list.add("raw", json!({"k": [1, 2]})).unwrap();
        list.add("tok", Opaque::serializable(vec![1u8, 2])).unwrap();
        assert_eq!(to_json(&list).unwrap(), r#"{"raw":{"k":[1,2]},"tok":[1,2]}"#);

        list.add("plain", Value::opaque(3u8)).unwrap();
        let err = to_json(&list).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::TypeConversion { .. }));
    }

    #[test]
    fn pretty_output_parses_back() {
        let list = AssocList::from_pairs(ListOptions::default(), [("a", 1), ("b", 2)]).unwrap();
        let pretty = to_json_pretty(&list).unwrap();
        assert!(pretty.contains('\n'));
        let parsed: Json = serde_json::from_str(&pretty).unwrap();
        assert_eq!(parsed, json!({"a": 1, "b": 2}));
    }
}
