//! Field reader shared by the entity deserializers
//!
//! Each record type declares the keys it recognises. The reader enforces the
//! forward-compatibility policy for Onionoo documents: unknown keys are
//! ignored (and logged), missing optional fields default to `None` or an empty
//! list, and only a present field with the wrong shape is an error.

use super::error::{EntityKind, ParseError};
use super::flag::Flag;
use super::history::{intervaled_history_from_json, IntervaledHistory};
use super::timestamp;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

type Result<T> = std::result::Result<T, ParseError>;

/// Typed accessor over one JSON object
#[derive(Debug)]
pub struct FieldReader<'a> {
    kind: EntityKind,
    object: &'a Map<String, Value>,
    fields: &'static [&'static str],
}

impl<'a> FieldReader<'a> {
    /// Create a reader for `raw`, which must be a JSON object
    ///
    /// `fields` is the allow-list of keys the record understands.
    pub fn new(
        kind: EntityKind,
        raw: &'a Value,
        fields: &'static [&'static str],
    ) -> Result<Self> {
        let object = raw
            .as_object()
            .ok_or_else(|| ParseError::coercion(kind, "$", raw))?;

        let reader = Self {
            kind,
            object,
            fields,
        };

        let unknown = reader.unknown_keys();
        if !unknown.is_empty() {
            tracing::debug!(kind = %kind, keys = ?unknown, "ignoring unknown fields");
        }

        Ok(reader)
    }

    /// Kind of record being read
    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Keys present in the object but missing from the allow-list
    pub fn unknown_keys(&self) -> Vec<&'a str> {
        self.object
            .keys()
            .filter(|key| !self.recognises(key))
            .map(String::as_str)
            .collect()
    }

    /// Pick the first of several alternative key names that is present
    ///
    /// Falls back to the first name so errors report the canonical key.
    pub fn resolve<'k>(&self, keys: &[&'k str]) -> &'k str {
        keys.iter()
            .copied()
            .find(|key| self.get(key).is_some())
            .unwrap_or(keys[0])
    }

    /// Get a present, non-null value
    pub fn get(&self, key: &str) -> Option<&'a Value> {
        debug_assert!(
            self.recognises(key),
            "field '{key}' missing from the allow-list of {}",
            self.kind
        );
        self.object.get(key).filter(|value| !value.is_null())
    }

    fn recognises(&self, key: &str) -> bool {
        self.fields.iter().any(|field| *field == key)
    }

    fn coercion(&self, key: &str, raw: &Value) -> ParseError {
        ParseError::coercion(self.kind, key, raw)
    }

    fn require<T>(&self, key: &str, value: Option<T>) -> Result<T> {
        value.ok_or_else(|| ParseError::missing(self.kind, key))
    }

    /// Read a required string
    pub fn required_str(&self, key: &str) -> Result<String> {
        let value = self.opt_str(key)?;
        self.require(key, value)
    }

    /// Read a required, non-empty hexadecimal string (fingerprints)
    pub fn required_hex(&self, key: &str) -> Result<String> {
        let value = self.required_str(key)?;
        if value.is_empty() || !value.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(self.coercion(key, &Value::String(value)));
        }
        Ok(value)
    }

    /// Read an optional string
    pub fn opt_str(&self, key: &str) -> Result<Option<String>> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(other) => Err(self.coercion(key, other)),
        }
    }

    /// Read an optional unsigned integer, accepting numeric strings
    pub fn opt_u64(&self, key: &str) -> Result<Option<u64>> {
        match self.get(key) {
            None => Ok(None),
            Some(value) => coerce_u64(value)
                .map(Some)
                .ok_or_else(|| self.coercion(key, value)),
        }
    }

    /// Read a required signed integer, accepting numeric strings
    pub fn required_i64(&self, key: &str) -> Result<i64> {
        let value = match self.get(key) {
            None => None,
            Some(value) => Some(coerce_i64(value).ok_or_else(|| self.coercion(key, value))?),
        };
        self.require(key, value)
    }

    /// Read an optional float, accepting numeric strings
    pub fn opt_f64(&self, key: &str) -> Result<Option<f64>> {
        match self.get(key) {
            None => Ok(None),
            Some(value) => coerce_f64(value)
                .map(Some)
                .ok_or_else(|| self.coercion(key, value)),
        }
    }

    /// Read a required float, accepting numeric strings
    pub fn required_f64(&self, key: &str) -> Result<f64> {
        let value = self.opt_f64(key)?;
        self.require(key, value)
    }

    /// Read an optional boolean, accepting `"true"` and `"false"`
    pub fn opt_bool(&self, key: &str) -> Result<Option<bool>> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(Value::String(s)) if s.eq_ignore_ascii_case("true") => Ok(Some(true)),
            Some(Value::String(s)) if s.eq_ignore_ascii_case("false") => Ok(Some(false)),
            Some(other) => Err(self.coercion(key, other)),
        }
    }

    /// Read an optional UTC timestamp
    pub fn opt_timestamp(&self, key: &str) -> Result<Option<DateTime<Utc>>> {
        match self.get(key) {
            None => Ok(None),
            Some(value @ Value::String(s)) => timestamp::decode_utc(s)
                .map(Some)
                .ok_or_else(|| self.coercion(key, value)),
            Some(other) => Err(self.coercion(key, other)),
        }
    }

    /// Read a required UTC timestamp
    pub fn required_timestamp(&self, key: &str) -> Result<DateTime<Utc>> {
        let value = self.opt_timestamp(key)?;
        self.require(key, value)
    }

    /// Read a list of strings; absent means empty
    pub fn str_list(&self, key: &str) -> Result<Vec<String>> {
        match self.get(key) {
            None => Ok(Vec::new()),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s.clone()),
                    other => Err(self.coercion(key, other)),
                })
                .collect(),
            Some(other) => Err(self.coercion(key, other)),
        }
    }

    /// Read a list of flags; absent means empty, unknown flags are kept
    pub fn flags(&self, key: &str) -> Result<Vec<Flag>> {
        Ok(self
            .str_list(key)?
            .into_iter()
            .map(|name| Flag::from(name.as_str()))
            .collect())
    }

    /// Read an intervaled history; absent means empty
    pub fn histories(&self, key: &str) -> Result<IntervaledHistory> {
        Ok(self
            .nested(key, intervaled_history_from_json)?
            .unwrap_or_default())
    }

    /// Delegate a present field to a nested deserializer
    ///
    /// Errors from `parse` are re-attributed to this record with `key`
    /// prefixed to their field path.
    pub fn nested<T>(
        &self,
        key: &str,
        parse: impl FnOnce(&'a Value) -> Result<T>,
    ) -> Result<Option<T>> {
        self.get(key)
            .map(|value| parse(value).map_err(|err| err.within(self.kind, key)))
            .transpose()
    }
}

fn coerce_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn coerce_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn coerce_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}
