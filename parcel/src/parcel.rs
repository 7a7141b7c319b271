//! Ordered marshaling buffer with positional read semantics.

use crate::value::Value;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Mutex;
use thiserror::Error;

/// Upper bound on pooled parcels kept for reuse.
const MAX_POOL_SIZE: usize = 32;

/// Process-wide parcel pool, guarded by a single lock.
static POOL: Mutex<Vec<Parcel>> = Mutex::new(Vec::new());

/// Returns the number of parcels currently pooled (test observability).
pub fn pool_size() -> usize {
    POOL.lock().unwrap().len()
}

/// Error types for parcel operations.
///
/// Only interface verification and structured payload codecs fail hard;
/// every plain typed read degrades to the type's zero-value instead.
#[derive(Debug, Error)]
pub enum ParcelError {
    /// The next value was not the expected interface token.
    #[error("interface token mismatch: expected {expected:?}, found {found}")]
    InterfaceMismatch { expected: String, found: String },
    /// The parcel ended before an interface token was read.
    #[error("missing interface token: expected {expected:?}")]
    MissingInterfaceToken { expected: String },
    /// A structured payload failed to encode or decode.
    #[error("payload codec failure: {0}")]
    Codec(#[from] serde_json::Error),
}

/// Reusable marshaling buffer for transaction arguments and results.
///
/// Values are appended in order on the write side; the read cursor moves
/// independently so a reply written by one side can be rewound to
/// position 0 and drained by the other.
#[derive(Debug, Default)]
pub struct Parcel {
    values: Vec<Value>,
    position: usize,
}

impl Parcel {
    /// Creates an empty parcel, bypassing the pool.
    pub fn new() -> Self {
        Self {
            values: Vec::new(),
            position: 0,
        }
    }

    /// Obtains a parcel from the pool, or allocates a fresh one.
    pub fn obtain() -> Self {
        POOL.lock().unwrap().pop().unwrap_or_default()
    }

    /// Clears this parcel and returns it to the pool if there is room.
    pub fn recycle(mut self) {
        self.clear();
        let mut pool = POOL.lock().unwrap();
        if pool.len() < MAX_POOL_SIZE {
            pool.push(self);
        }
    }

    /// Removes all values and resets the cursor to 0.
    pub fn clear(&mut self) {
        self.values.clear();
        self.position = 0;
    }

    /// Returns the number of values written so far.
    pub fn data_size(&self) -> usize {
        self.values.len()
    }

    /// Returns the current read cursor.
    pub fn data_position(&self) -> usize {
        self.position
    }

    /// Moves the read cursor to an absolute position.
    ///
    /// Positions past the end are legal; reads there degrade to
    /// zero-values like any other exhausted read.
    pub fn set_data_position(&mut self, position: usize) {
        self.position = position;
    }

    // ===== Write side =====

    /// Appends a raw value.
    pub fn write_value(&mut self, value: Value) {
        self.values.push(value);
    }

    /// Appends an int.
    pub fn write_int(&mut self, value: i32) {
        self.values.push(Value::Int(value));
    }

    /// Appends a long.
    pub fn write_long(&mut self, value: i64) {
        self.values.push(Value::Long(value));
    }

    /// Appends a float.
    pub fn write_float(&mut self, value: f64) {
        self.values.push(Value::Float(value));
    }

    /// Appends a bool.
    pub fn write_bool(&mut self, value: bool) {
        self.values.push(Value::Bool(value));
    }

    /// Appends a string.
    pub fn write_string(&mut self, value: impl Into<String>) {
        self.values.push(Value::String(value.into()));
    }

    /// Appends a byte blob.
    pub fn write_blob(&mut self, value: Vec<u8>) {
        self.values.push(Value::Blob(value));
    }

    /// Appends the interface token callees verify with
    /// [`Parcel::enforce_interface`].
    pub fn write_interface_token(&mut self, descriptor: impl Into<String>) {
        self.values.push(Value::String(descriptor.into()));
    }

    /// Appends a string list as a length prefix followed by elements.
    ///
    /// `None` is written as the `-1` sentinel, distinct from an empty
    /// list's `0`, so readers can tell "absent" from "empty".
    pub fn write_string_list(&mut self, list: Option<&[String]>) {
        match list {
            None => self.write_int(-1),
            Some(items) => {
                self.write_int(items.len() as i32);
                for item in items {
                    self.write_string(item.clone());
                }
            }
        }
    }

    /// Appends a structured payload as a serialized blob.
    pub fn write_parcelable<T: Serialize>(&mut self, value: &T) -> Result<(), ParcelError> {
        let bytes = serde_json::to_vec(value)?;
        self.values.push(Value::Blob(bytes));
        Ok(())
    }

    // ===== Read side =====

    /// Reads the value at the cursor and advances, if one exists.
    fn next_value(&mut self) -> Option<&Value> {
        let value = self.values.get(self.position)?;
        self.position += 1;
        Some(value)
    }

    /// Reads an int, or `0` on mismatch or exhaustion.
    pub fn read_int(&mut self) -> i32 {
        self.next_value().map(Value::as_int).unwrap_or(0)
    }

    /// Reads a long, or `0` on mismatch or exhaustion.
    pub fn read_long(&mut self) -> i64 {
        self.next_value().map(Value::as_long).unwrap_or(0)
    }

    /// Reads a float, or `0.0` on mismatch or exhaustion.
    pub fn read_float(&mut self) -> f64 {
        self.next_value().map(Value::as_float).unwrap_or(0.0)
    }

    /// Reads a bool, or `false` on mismatch or exhaustion.
    pub fn read_bool(&mut self) -> bool {
        self.next_value().map(Value::as_bool).unwrap_or(false)
    }

    /// Reads a string, or the empty string on mismatch or exhaustion.
    pub fn read_string(&mut self) -> String {
        self.next_value().map(Value::as_string).unwrap_or_default()
    }

    /// Reads a blob, or the empty blob on mismatch or exhaustion.
    pub fn read_blob(&mut self) -> Vec<u8> {
        self.next_value().map(Value::as_blob).unwrap_or_default()
    }

    /// Verifies that the next value is the expected interface token.
    ///
    /// This is the one hard integrity check in the marshaling layer;
    /// callees run it first so foreign or malformed calls are rejected
    /// before any argument is read.
    pub fn enforce_interface(&mut self, descriptor: &str) -> Result<(), ParcelError> {
        match self.next_value() {
            Some(Value::String(token)) if token == descriptor => Ok(()),
            Some(other) => Err(ParcelError::InterfaceMismatch {
                expected: descriptor.to_string(),
                found: format!("{} {}", other.kind(), other),
            }),
            None => Err(ParcelError::MissingInterfaceToken {
                expected: descriptor.to_string(),
            }),
        }
    }

    /// Reads a length-prefixed string list; the `-1` sentinel yields `None`.
    pub fn read_string_list(&mut self) -> Option<Vec<String>> {
        let len = self.read_int();
        if len < 0 {
            return None;
        }
        let mut items = Vec::with_capacity(len as usize);
        for _ in 0..len {
            items.push(self.read_string());
        }
        Some(items)
    }

    /// Reads a structured payload previously written with
    /// [`Parcel::write_parcelable`].
    pub fn read_parcelable<T: DeserializeOwned>(&mut self) -> Result<T, ParcelError> {
        let bytes = self.read_blob();
        Ok(serde_json::from_slice(&bytes)?)
    }
}
