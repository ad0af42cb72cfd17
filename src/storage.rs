/// Storage adapter over chrome.storage.local / chrome.storage.sync
use crate::error::StorageError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;

/// History lives in local scope only: sync scope caps item size.
pub const HISTORY_KEY: &str = "qrHistory";
pub const SETTINGS_KEY: &str = "settings";
pub const THEME_KEY: &str = "theme";
/// Context-menu request waiting for the popup
pub const PENDING_KEY: &str = "tempData";

/// The two chrome.storage areas the extension writes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Per-device, larger quota
    Local,
    /// Replicated across devices, small per-item quota
    Sync,
}

impl Scope {
    pub fn as_str(self) -> &'static str {
        match self {
            Scope::Local => "local",
            Scope::Sync => "sync",
        }
    }

    /// Map the `areaName` passed to storage.onChanged listeners
    pub fn from_area_name(area: &str) -> Option<Scope> {
        match area {
            "local" => Some(Scope::Local),
            "sync" => Some(Scope::Sync),
            _ => None,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Asynchronous key-value store holding whole JSON values per key
#[allow(async_fn_in_trait)]
pub trait StorageArea {
    async fn get(&self, scope: Scope, key: &str) -> Result<Option<Value>, StorageError>;
    async fn set(&self, scope: Scope, key: &str, value: Value) -> Result<(), StorageError>;
    async fn remove(&self, scope: Scope, key: &str) -> Result<(), StorageError>;
}

/// A key written by some context; `new_value` is `None` when it was removed
#[derive(Debug, Clone, PartialEq)]
pub struct StorageChange {
    pub scope: Scope,
    pub key: String,
    pub new_value: Option<Value>,
}

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(catch, js_namespace = ["chrome", "storage", "local"], js_name = get)]
    fn local_get(keys: &JsValue) -> Result<js_sys::Promise, JsValue>;

    #[wasm_bindgen(catch, js_namespace = ["chrome", "storage", "local"], js_name = set)]
    fn local_set(items: &JsValue) -> Result<js_sys::Promise, JsValue>;

    #[wasm_bindgen(catch, js_namespace = ["chrome", "storage", "local"], js_name = remove)]
    fn local_remove(keys: &JsValue) -> Result<js_sys::Promise, JsValue>;

    #[wasm_bindgen(catch, js_namespace = ["chrome", "storage", "sync"], js_name = get)]
    fn sync_get(keys: &JsValue) -> Result<js_sys::Promise, JsValue>;

    #[wasm_bindgen(catch, js_namespace = ["chrome", "storage", "sync"], js_name = set)]
    fn sync_set(items: &JsValue) -> Result<js_sys::Promise, JsValue>;

    #[wasm_bindgen(catch, js_namespace = ["chrome", "storage", "sync"], js_name = remove)]
    fn sync_remove(keys: &JsValue) -> Result<js_sys::Promise, JsValue>;

    #[wasm_bindgen(catch, js_namespace = ["chrome", "storage", "onChanged"], js_name = addListener)]
    fn add_changed_listener(listener: &Closure<dyn FnMut(JsValue, String)>) -> Result<(), JsValue>;
}

/// The real chrome.storage areas
#[derive(Debug, Clone, Copy, Default)]
pub struct ChromeStorage;

impl StorageArea for ChromeStorage {
    async fn get(&self, scope: Scope, key: &str) -> Result<Option<Value>, StorageError> {
        let fail = |e: JsValue| StorageError::new(scope, key, js_error_message(&e));
        let keys = JsValue::from_str(key);

        let promise = match scope {
            Scope::Local => local_get(&keys),
            Scope::Sync => sync_get(&keys),
        }
        .map_err(fail)?;
        let result = JsFuture::from(promise).await.map_err(fail)?;
        let value = js_sys::Reflect::get(&result, &keys).map_err(fail)?;

        if value.is_undefined() || value.is_null() {
            return Ok(None);
        }

        serde_wasm_bindgen::from_value(value)
            .map(Some)
            .map_err(|e| StorageError::new(scope, key, format!("Failed to parse: {}", e)))
    }

    async fn set(&self, scope: Scope, key: &str, value: Value) -> Result<(), StorageError> {
        let fail = |e: JsValue| StorageError::new(scope, key, js_error_message(&e));

        let value_js = value
            .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
            .map_err(|e| StorageError::new(scope, key, format!("Failed to serialize: {}", e)))?;
        let items = js_sys::Object::new();
        js_sys::Reflect::set(&items, &JsValue::from_str(key), &value_js).map_err(fail)?;

        let promise = match scope {
            Scope::Local => local_set(&items),
            Scope::Sync => sync_set(&items),
        }
        .map_err(fail)?;
        JsFuture::from(promise).await.map_err(fail)?;
        Ok(())
    }

    async fn remove(&self, scope: Scope, key: &str) -> Result<(), StorageError> {
        let fail = |e: JsValue| StorageError::new(scope, key, js_error_message(&e));
        let keys = JsValue::from_str(key);

        let promise = match scope {
            Scope::Local => local_remove(&keys),
            Scope::Sync => sync_remove(&keys),
        }
        .map_err(fail)?;
        JsFuture::from(promise).await.map_err(fail)?;
        Ok(())
    }
}

#[derive(Deserialize)]
struct RawChange {
    #[serde(rename = "newValue", default)]
    new_value: Option<Value>,
}

/// Register a storage.onChanged listener for the lifetime of the page
pub fn subscribe_changes<F>(mut on_change: F)
where
    F: FnMut(Vec<StorageChange>) + 'static,
{
    let listener = Closure::wrap(Box::new(move |changes: JsValue, area: String| {
        let Some(scope) = Scope::from_area_name(&area) else {
            return;
        };

        match serde_wasm_bindgen::from_value::<HashMap<String, RawChange>>(changes) {
            Ok(raw) => on_change(
                raw.into_iter()
                    .map(|(key, change)| StorageChange {
                        scope,
                        key,
                        new_value: change.new_value,
                    })
                    .collect(),
            ),
            Err(e) => log::warn!("Unreadable storage change in {}: {}", area, e),
        }
    }) as Box<dyn FnMut(JsValue, String)>);

    if let Err(e) = add_changed_listener(&listener) {
        log::error!("Failed to subscribe to storage changes: {}", js_error_message(&e));
    }
    listener.forget();
}

pub fn js_error_message(err: &JsValue) -> String {
    if let Some(s) = err.as_string() {
        return s;
    }
    match err.dyn_ref::<js_sys::Error>() {
        Some(e) => String::from(e.message()),
        None => format!("{:?}", err),
    }
}

#[cfg(test)]
pub mod memory {
    use super::*;
    use std::cell::{Cell, RefCell};

    /// In-memory storage with switchable read/write failures
    #[derive(Default)]
    pub struct MemoryStorage {
        data: RefCell<HashMap<(Scope, String), Value>>,
        fail_reads: Cell<bool>,
        fail_writes: Cell<bool>,
        writes: Cell<usize>,
    }

    impl MemoryStorage {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with(self, scope: Scope, key: &str, value: Value) -> Self {
            self.insert(scope, key, value);
            self
        }

        pub fn insert(&self, scope: Scope, key: &str, value: Value) {
            self.data.borrow_mut().insert((scope, key.to_string()), value);
        }

        pub fn value(&self, scope: Scope, key: &str) -> Option<Value> {
            self.data.borrow().get(&(scope, key.to_string())).cloned()
        }

        pub fn fail_reads(&self, fail: bool) {
            self.fail_reads.set(fail);
        }

        pub fn fail_writes(&self, fail: bool) {
            self.fail_writes.set(fail);
        }

        /// Successful set/remove calls so far
        pub fn write_count(&self) -> usize {
            self.writes.get()
        }
    }

    impl StorageArea for MemoryStorage {
        async fn get(&self, scope: Scope, key: &str) -> Result<Option<Value>, StorageError> {
            if self.fail_reads.get() {
                return Err(StorageError::new(scope, key, "read failed"));
            }
            Ok(self.value(scope, key))
        }

        async fn set(&self, scope: Scope, key: &str, value: Value) -> Result<(), StorageError> {
            if self.fail_writes.get() {
                return Err(StorageError::new(scope, key, "write failed"));
            }
            self.insert(scope, key, value);
            self.writes.set(self.writes.get() + 1);
            Ok(())
        }

        async fn remove(&self, scope: Scope, key: &str) -> Result<(), StorageError> {
            if self.fail_writes.get() {
                return Err(StorageError::new(scope, key, "write failed"));
            }
            self.data.borrow_mut().remove(&(scope, key.to_string()));
            self.writes.set(self.writes.get() + 1);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::memory::MemoryStorage;
    use super::*;
    use futures::executor::block_on;
    use serde_json::json;

    #[test]
    fn test_scope_names() {
        assert_eq!(Scope::Local.to_string(), "local");
        assert_eq!(Scope::from_area_name("sync"), Some(Scope::Sync));
        assert_eq!(Scope::from_area_name("managed"), None);
    }

    #[test]
    fn test_memory_storage_scopes_are_separate() {
        let storage = MemoryStorage::new();

        block_on(storage.set(Scope::Local, HISTORY_KEY, json!([]))).unwrap();

        assert_eq!(block_on(storage.get(Scope::Local, HISTORY_KEY)).unwrap(), Some(json!([])));
        assert_eq!(block_on(storage.get(Scope::Sync, HISTORY_KEY)).unwrap(), None);
    }

    #[test]
    fn test_memory_storage_failures() {
        let storage = MemoryStorage::new().with(Scope::Sync, SETTINGS_KEY, json!({}));
        storage.fail_writes(true);

        assert!(block_on(storage.set(Scope::Sync, SETTINGS_KEY, json!({"a": 1}))).is_err());
        assert!(block_on(storage.remove(Scope::Sync, SETTINGS_KEY)).is_err());
        assert_eq!(storage.value(Scope::Sync, SETTINGS_KEY), Some(json!({})));
        assert_eq!(storage.write_count(), 0);

        storage.fail_reads(true);
        assert!(block_on(storage.get(Scope::Sync, SETTINGS_KEY)).is_err());
    }
}
