//! Contract tests for the "register and invoke a service" surface.
//!
//! Defines a small settings-style service the way downstream crates are
//! expected to build one: embed a [`Binder`], attach the descriptor in
//! the constructor, answer codes from `FIRST_CALL_TRANSACTION` up, and
//! verify the interface token before reading any argument.

use binder::{Binder, BinderObject, TransactError, FIRST_CALL_TRANSACTION};
use parcel::Parcel;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

/// Interface descriptor validated on every transaction.
pub const SETTINGS_DESCRIPTOR: &str = "kernel.ISettings";

/// Stores one key/value pair. Reply: bool (overwrote an existing key).
pub const CODE_PUT: u32 = FIRST_CALL_TRANSACTION;
/// Reads one value by key. Reply: string (empty when absent).
pub const CODE_GET: u32 = FIRST_CALL_TRANSACTION + 1;
/// Returns the full snapshot as a structured payload.
pub const CODE_SNAPSHOT: u32 = FIRST_CALL_TRANSACTION + 2;
/// One-way: drops every stored pair. No reply.
pub const CODE_CLEAR: u32 = FIRST_CALL_TRANSACTION + 3;

/// Structured reply payload for [`CODE_SNAPSHOT`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingsSnapshot {
    pub entries: Vec<(String, String)>,
}

/// In-process settings service.
pub struct SettingsService {
    binder: Binder,
    entries: Mutex<HashMap<String, String>>,
}

impl SettingsService {
    pub fn new() -> Arc<Self> {
        Arc::new_cyclic(|me: &Weak<SettingsService>| {
            let binder = Binder::new();
            binder.attach_interface(me.clone(), SETTINGS_DESCRIPTOR);
            SettingsService {
                binder,
                entries: Mutex::new(HashMap::new()),
            }
        })
    }

    /// Direct entry point used by co-located callers that took the
    /// `query_local_interface` fast path.
    pub fn get_local(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).cloned()
    }
}

impl BinderObject for SettingsService {
    fn binder(&self) -> &Binder {
        &self.binder
    }

    fn on_transact(
        &self,
        code: u32,
        data: &mut Parcel,
        reply: Option<&mut Parcel>,
        _flags: u32,
    ) -> Result<bool, TransactError> {
        data.enforce_interface(SETTINGS_DESCRIPTOR)?;
        match code {
            CODE_PUT => {
                let key = data.read_string();
                let value = data.read_string();
                if key.is_empty() {
                    return Err(TransactError::MalformedRequest(
                        "put requires a non-empty key".to_string(),
                    ));
                }
                let previous = self.entries.lock().unwrap().insert(key, value);
                if let Some(reply) = reply {
                    reply.write_bool(previous.is_some());
                }
                Ok(true)
            }
            CODE_GET => {
                let key = data.read_string();
                let value = self.get_local(&key).unwrap_or_default();
                if let Some(reply) = reply {
                    reply.write_string(value);
                }
                Ok(true)
            }
            CODE_SNAPSHOT => {
                let mut entries: Vec<(String, String)> = self
                    .entries
                    .lock()
                    .unwrap()
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                entries.sort();
                if let Some(reply) = reply {
                    reply.write_parcelable(&SettingsSnapshot { entries })?;
                }
                Ok(true)
            }
            CODE_CLEAR => {
                self.entries.lock().unwrap().clear();
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

/// Builds a request parcel the way client proxies are expected to.
pub fn new_request() -> Parcel {
    let mut data = Parcel::obtain();
    data.write_interface_token(SETTINGS_DESCRIPTOR);
    data
}
