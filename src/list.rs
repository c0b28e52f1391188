//! Ordered association list.
//!
//! Keys and values live in two index-aligned vectors. The list never reorders
//! entries on its own: insertion position is explicit, and replacing an
//! existing key's value keeps its index.
use std::fmt;
use std::ops::Index;
use std::sync::Arc;

use crate::diagnostics::{DiagnosticSink, Diagnostics};
use crate::error::{Cause, Error, ErrorKind, Result};
use crate::ident::is_identifier;
use crate::value::Value;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// Policy fixed when a list is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListOptions {
    /// A key may appear at most once.
    pub unique_keys: bool,
    /// Every key must be a letter/underscore-led identifier.
    pub identifier_keys_only: bool,
    /// With `unique_keys`, re-adding a key replaces its value in place.
    pub overwrite_on_duplicate: bool,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            unique_keys: true,
            identifier_keys_only: true,
            overwrite_on_duplicate: false,
        }
    }
}

impl ListOptions {
    /// Duplicate keys allowed, any non-blank key accepted.
    pub fn permissive() -> Self {
        Self {
            unique_keys: false,
            identifier_keys_only: false,
            overwrite_on_duplicate: false,
        }
    }

    pub fn unique_keys(mut self, on: bool) -> Self {
        self.unique_keys = on;
        self
    }

    pub fn identifier_keys_only(mut self, on: bool) -> Self {
        self.identifier_keys_only = on;
        self
    }

    pub fn overwrite_on_duplicate(mut self, on: bool) -> Self {
        self.overwrite_on_duplicate = on;
        self
    }
}

#[derive(Clone, Default)]
pub struct AssocList {
    options: ListOptions,
    keys: Vec<String>,
    values: Vec<Value>,
    diagnostics: Diagnostics,
}

/// Whether the identifier grammar is enforced for one insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum KeyCheck {
    Full,
    /// Bulk loads from member descriptors: names are identifiers already.
    SkipIdentifier,
}

// ————————————————————————————————————————————————————————————————————————————
// CONSTRUCTION
// ————————————————————————————————————————————————————————————————————————————

impl AssocList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ListOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// Builds a list from a flat sequence of pairs, applying the `add` rules.
    pub fn from_pairs<K, V, I>(options: ListOptions, pairs: I) -> Result<Self>
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut list = Self::with_options(options);
        for (k, v) in pairs {
            list.add(k, v)?;
        }
        Ok(list)
    }

    /// Routes every failure raised on this list through `sink`.
    pub fn with_diagnostics(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.diagnostics = Diagnostics::with_sink(sink);
        self
    }

    pub(crate) fn set_diagnostics(&mut self, diagnostics: Diagnostics) {
        self.diagnostics = diagnostics;
    }

    pub fn options(&self) -> ListOptions {
        self.options
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn len(&self) -> usize {
        debug_assert_eq!(self.keys.len(), self.values.len());
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn clear(&mut self) {
        self.keys.clear();
        self.values.clear();
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INSERTION
// ————————————————————————————————————————————————————————————————————————————

impl AssocList {
    /// Appends `(key, value)` under the list's uniqueness policy.
    ///
    /// Returns the index the value ended up at, which is the existing index
    /// when a unique-key overwrite happened.
    pub fn add(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Result<usize> {
        self.add_at(key, value, None, false)
    }

    /// Inserts at `index`, clamping anything past the end to an append.
    pub fn insert(
        &mut self,
        index: usize,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<usize> {
        self.add_at(key, value, Some(index), false)
    }

    /// Adds the pair unless an identical pair already exists, in which case
    /// the existing index is returned. Only valid on lists without unique keys.
    pub fn add_unique_pair(
        &mut self,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<usize> {
        self.add_at(key, value, None, true)
    }

    pub fn add_at(
        &mut self,
        key: impl Into<String>,
        value: impl Into<Value>,
        index: Option<usize>,
        unique_pair: bool,
    ) -> Result<usize> {
        self.add_checked(key.into(), value.into(), index, unique_pair, KeyCheck::Full)
    }

    pub(crate) fn add_checked(
        &mut self,
        key: String,
        value: Value,
        index: Option<usize>,
        unique_pair: bool,
        check: KeyCheck,
    ) -> Result<usize> {
        if key.trim().is_empty() {
            return Err(self.diagnostics.fail(
                "add",
                format!("key {key:?}"),
                Error::invalid_argument("key", "must not be empty or whitespace"),
            ));
        }
        if check == KeyCheck::Full && self.options.identifier_keys_only && !is_identifier(&key) {
            return Err(self.diagnostics.fail(
                "add",
                format!("key {key:?}"),
                ErrorKind::InvalidIdentifier(key).into(),
            ));
        }
        if unique_pair && self.options.unique_keys {
            return Err(self.diagnostics.fail(
                "add",
                format!("key {key:?}"),
                ErrorKind::InvalidConfiguration(
                    "unique-pair insertion requested on a list with unique keys".to_string(),
                )
                .into(),
            ));
        }

        if unique_pair {
            if let Some(existing) = self.index_of_pair(&key, &value, 0) {
                tracing::trace!(key = %key, index = existing, "pair already present");
                return Ok(existing);
            }
        } else if self.options.unique_keys {
            if let Some(existing) = self.index_of_key(&key, 0) {
                if !self.options.overwrite_on_duplicate {
                    return Err(self.diagnostics.fail(
                        "add",
                        format!("key {key:?} at index {existing}"),
                        ErrorKind::DuplicateKey(key).into(),
                    ));
                }
                tracing::trace!(key = %key, index = existing, "overwrite");
                self.values[existing] = value;
                return Ok(existing);
            }
        }

        Ok(self.insert_raw(key, value, index))
    }

    fn insert_raw(&mut self, key: String, value: Value, index: Option<usize>) -> usize {
        let at = match index {
            Some(i) if i <= self.keys.len() => i,
            _ => self.keys.len(),
        };
        tracing::trace!(key = %key, index = at, "insert");
        self.keys.insert(at, key);
        self.values.insert(at, value);
        at
    }

    /// Appends without any policy check. Only for lists whose policy cannot be
    /// violated by the caller's data (permissive lists fed from maps).
    pub(crate) fn push_unchecked(&mut self, key: String, value: Value) {
        self.keys.push(key);
        self.values.push(value);
    }

    /// Adds every entry of `other`, in order, under this list's rules.
    ///
    /// Stops at the first failure; entries added before it stay.
    pub fn append(&mut self, other: &AssocList) -> Result<()> {
        for (key, value) in other.iter() {
            self.add(key, value.clone())?;
        }
        Ok(())
    }

    /// Replaces the value at `index`; `false` when out of range.
    pub fn set_value_at(&mut self, index: usize, value: impl Into<Value>) -> bool {
        match self.values.get_mut(index) {
            Some(slot) => {
                *slot = value.into();
                true
            }
            None => false,
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// REMOVAL
// ————————————————————————————————————————————————————————————————————————————

impl AssocList {
    pub fn delete(&mut self, key: &str) -> bool {
        match self.index_of_key(key, 0) {
            Some(i) => self.delete_at(i),
            None => false,
        }
    }

    pub fn delete_at(&mut self, index: usize) -> bool {
        if index >= self.keys.len() {
            return false;
        }
        let key = self.keys.remove(index);
        self.values.remove(index);
        tracing::trace!(key = %key, index, "delete");
        true
    }

    pub fn delete_pair(&mut self, key: &str, value: &Value) -> bool {
        match self.index_of_pair(key, value, 0) {
            Some(i) => self.delete_at(i),
            None => false,
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// LOOKUP
// ————————————————————————————————————————————————————————————————————————————

impl AssocList {
    pub fn index_of_key(&self, key: &str, from: usize) -> Option<usize> {
        self.keys
            .iter()
            .enumerate()
            .skip(from)
            .find_map(|(i, k)| (k == key).then_some(i))
    }

    pub fn index_of_value(&self, value: &Value, from: usize) -> Option<usize> {
        self.values
            .iter()
            .enumerate()
            .skip(from)
            .find_map(|(i, v)| (v == value).then_some(i))
    }

    pub fn index_of_pair(&self, key: &str, value: &Value, from: usize) -> Option<usize> {
        self.keys
            .iter()
            .zip(&self.values)
            .enumerate()
            .skip(from)
            .find_map(|(i, (k, v))| (k == key && v == value).then_some(i))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index_of_key(key, 0).is_some()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.get_from(key, 0)
    }

    /// First value for `key` at or after `from`.
    pub fn get_from(&self, key: &str, from: usize) -> Option<&Value> {
        self.index_of_key(key, from).map(|i| &self.values[i])
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.index_of_key(key, 0).map(|i| &mut self.values[i])
    }

    pub fn key_at(&self, index: usize) -> Option<&str> {
        self.keys.get(index).map(String::as_str)
    }

    pub fn value_at(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn entry_at(&self, index: usize) -> Option<(&str, &Value)> {
        Some((self.key_at(index)?, self.value_at(index)?))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.keys.iter().map(String::as_str)
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> + '_ {
        self.values.iter()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> + '_ {
        self.keys.iter().map(String::as_str).zip(&self.values)
    }

    /// Values are mutable, keys are not.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut Value)> + '_ {
        self.keys.iter().map(String::as_str).zip(self.values.iter_mut())
    }
}

// ————————————————————————————————————————————————————————————————————————————
// RENDERING
// ————————————————————————————————————————————————————————————————————————————

impl AssocList {
    /// `key=value&...`, form-urlencoded, in list order.
    pub fn query_string(&self) -> Result<String> {
        let mut out = url::form_urlencoded::Serializer::new(String::new());
        for (key, value) in self.iter() {
            let Some(text) = value.scalar_text() else {
                return Err(self.diagnostics.fail(
                    "query_string",
                    format!("key {key:?}"),
                    Error::conversion(
                        value.kind_name(),
                        "query string",
                        Cause::msg("only scalar values can be rendered"),
                    ),
                ));
            };
            out.append_pair(key, &text);
        }
        Ok(out.finish())
    }
}

impl fmt::Debug for AssocList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl fmt::Display for AssocList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match crate::json::to_json(self) {
            Ok(text) => f.write_str(&text),
            Err(_) => write!(f, "{self:?}"),
        }
    }
}

impl PartialEq for AssocList {
    fn eq(&self, other: &Self) -> bool {
        self.options == other.options && self.same_entries(other)
    }
}

impl AssocList {
    /// Structural equality: same keys and values in the same order, whatever
    /// the options.
    pub(crate) fn same_entries(&self, other: &AssocList) -> bool {
        self.keys == other.keys && self.values == other.values
    }
}

impl Index<&str> for AssocList {
    type Output = Value;

    fn index(&self, key: &str) -> &Value {
        match self.get(key) {
            Some(v) => v,
            None => panic!("key `{key}` not found in AssocList"),
        }
    }
}

impl<'a> IntoIterator for &'a AssocList {
    type Item = (&'a str, &'a Value);
    type IntoIter = std::iter::Zip<
        std::iter::Map<std::slice::Iter<'a, String>, fn(&String) -> &str>,
        std::slice::Iter<'a, Value>,
    >;

    fn into_iter(self) -> Self::IntoIter {
        let as_str: fn(&String) -> &str = String::as_str;
        self.keys.iter().map(as_str).zip(self.values.iter())
    }
}

impl IntoIterator for AssocList {
    type Item = (String, Value);
    type IntoIter = std::iter::Zip<std::vec::IntoIter<String>, std::vec::IntoIter<Value>>;

    fn into_iter(self) -> Self::IntoIter {
        self.keys.into_iter().zip(self.values)
    }
}
