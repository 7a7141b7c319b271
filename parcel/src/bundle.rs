//! String-keyed value map carried by scheduled messages.

use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A string-keyed collection of [`Value`]s.
///
/// Typed getters follow the same default-on-miss policy as parcel reads:
/// an absent or wrong-typed entry yields the type's zero-value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bundle {
    entries: HashMap<String, Value>,
}

impl Bundle {
    /// Creates an empty bundle.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether the bundle has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns whether the bundle contains `key`.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Stores an int under `key`, replacing any previous entry.
    pub fn put_int(&mut self, key: impl Into<String>, value: i32) {
        self.entries.insert(key.into(), Value::Int(value));
    }

    /// Stores a long under `key`, replacing any previous entry.
    pub fn put_long(&mut self, key: impl Into<String>, value: i64) {
        self.entries.insert(key.into(), Value::Long(value));
    }

    /// Stores a float under `key`, replacing any previous entry.
    pub fn put_float(&mut self, key: impl Into<String>, value: f64) {
        self.entries.insert(key.into(), Value::Float(value));
    }

    /// Stores a bool under `key`, replacing any previous entry.
    pub fn put_bool(&mut self, key: impl Into<String>, value: bool) {
        self.entries.insert(key.into(), Value::Bool(value));
    }

    /// Stores a string under `key`, replacing any previous entry.
    pub fn put_string(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), Value::String(value.into()));
    }

    /// Stores a blob under `key`, replacing any previous entry.
    pub fn put_blob(&mut self, key: impl Into<String>, value: Vec<u8>) {
        self.entries.insert(key.into(), Value::Blob(value));
    }

    /// Returns the int stored under `key`, or `0`.
    pub fn get_int(&self, key: &str) -> i32 {
        self.entries.get(key).map(Value::as_int).unwrap_or(0)
    }

    /// Returns the long stored under `key`, or `0`.
    pub fn get_long(&self, key: &str) -> i64 {
        self.entries.get(key).map(Value::as_long).unwrap_or(0)
    }

    /// Returns the float stored under `key`, or `0.0`.
    pub fn get_float(&self, key: &str) -> f64 {
        self.entries.get(key).map(Value::as_float).unwrap_or(0.0)
    }

    /// Returns the bool stored under `key`, or `false`.
    pub fn get_bool(&self, key: &str) -> bool {
        self.entries.get(key).map(Value::as_bool).unwrap_or(false)
    }

    /// Returns the string stored under `key`, or the empty string.
    pub fn get_string(&self, key: &str) -> String {
        self.entries
            .get(key)
            .map(Value::as_string)
            .unwrap_or_default()
    }

    /// Returns the blob stored under `key`, or the empty blob.
    pub fn get_blob(&self, key: &str) -> Vec<u8> {
        self.entries
            .get(key)
            .map(Value::as_blob)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundle_put_and_get() {
        let mut bundle = Bundle::new();
        bundle.put_int("count", 3);
        bundle.put_string("name", "widget");
        bundle.put_bool("visible", true);

        assert_eq!(bundle.len(), 3);
        assert_eq!(bundle.get_int("count"), 3);
        assert_eq!(bundle.get_string("name"), "widget");
        assert!(bundle.get_bool("visible"));
    }

    #[test]
    fn test_bundle_missing_key_degrades() {
        let bundle = Bundle::new();
        assert_eq!(bundle.get_int("absent"), 0);
        assert_eq!(bundle.get_long("absent"), 0);
        assert_eq!(bundle.get_float("absent"), 0.0);
        assert!(!bundle.get_bool("absent"));
        assert_eq!(bundle.get_string("absent"), "");
        assert_eq!(bundle.get_blob("absent"), Vec::<u8>::new());
    }

    #[test]
    fn test_bundle_wrong_type_degrades() {
        let mut bundle = Bundle::new();
        bundle.put_string("key", "not a number");
        assert_eq!(bundle.get_int("key"), 0);
        assert!(!bundle.get_bool("key"));
    }

    #[test]
    fn test_bundle_overwrite() {
        let mut bundle = Bundle::new();
        bundle.put_int("key", 1);
        bundle.put_int("key", 2);
        assert_eq!(bundle.len(), 1);
        assert_eq!(bundle.get_int("key"), 2);
    }

    #[test]
    fn test_bundle_clear() {
        let mut bundle = Bundle::new();
        bundle.put_int("key", 1);
        bundle.clear();
        assert!(bundle.is_empty());
        assert!(!bundle.contains_key("key"));
    }
}
