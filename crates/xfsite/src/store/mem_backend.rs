use super::{BackendKind, KvBackend, RecordKey, HEALTH_CHECK_KEY};
use crate::error::{Result, SiteError};
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Default)]
struct Inner {
    entries: RefCell<HashMap<String, String>>,
    quota_bytes: Cell<Option<u64>>,
    simulate_write_error: Cell<bool>,
}

/// In-memory local medium.
///
/// Values are held serialized, the way the browser medium holds strings, so
/// quota accounting and serialization failures behave like the real thing.
/// Clones share the same storage, which lets a test keep a handle on a backend
/// it has handed to the persistence service.
#[derive(Clone, Default)]
pub struct MemBackend {
    inner: Rc<Inner>,
}

impl MemBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound the total stored bytes (keys plus values).
    pub fn with_quota(self, bytes: u64) -> Self {
        self.inner.quota_bytes.set(Some(bytes));
        self
    }

    /// Enable write error simulation for testing error handling.
    pub fn set_simulate_write_error(&self, simulate: bool) {
        self.inner.simulate_write_error.set(simulate);
    }

    /// Copy of the raw medium contents.
    pub fn snapshot(&self) -> HashMap<String, String> {
        self.inner.entries.borrow().clone()
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.inner.entries.borrow().get(key).cloned()
    }

    /// Store a raw string, bypassing serialization (for corrupt-data tests).
    pub fn put_raw(&self, key: &str, raw: &str) {
        self.inner
            .entries
            .borrow_mut()
            .insert(key.to_string(), raw.to_string());
    }

    fn used_bytes_excluding(&self, key: &str) -> u64 {
        self.inner
            .entries
            .borrow()
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| (k.len() + v.len()) as u64)
            .sum()
    }

    fn write(&self, key: &str, serialized: String) -> Result<()> {
        if self.inner.simulate_write_error.get() {
            return Err(SiteError::Storage("Simulated write error".to_string()));
        }
        if let Some(quota) = self.inner.quota_bytes.get() {
            let needed = (key.len() + serialized.len()) as u64;
            let available = quota.saturating_sub(self.used_bytes_excluding(key));
            if needed > available {
                return Err(SiteError::QuotaExceeded { needed, available });
            }
        }
        self.inner
            .entries
            .borrow_mut()
            .insert(key.to_string(), serialized);
        Ok(())
    }
}

impl KvBackend for MemBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Local
    }

    fn save(&self, key: &RecordKey, value: &Value) -> Result<()> {
        let serialized = serde_json::to_string(value)?;
        self.write(&key.key, serialized)
    }

    fn load(&self, key: &RecordKey) -> Result<Option<Value>> {
        let entries = self.inner.entries.borrow();
        match entries.get(&key.key) {
            Some(raw) => Ok(Some(serde_json::from_str(raw)?)),
            None => Ok(None),
        }
    }

    fn remove(&self, key: &RecordKey) -> Result<()> {
        self.inner.entries.borrow_mut().remove(&key.key);
        Ok(())
    }

    fn health_check(&self) -> bool {
        let check = self.write(HEALTH_CHECK_KEY, "\"test\"".to_string());
        self.inner.entries.borrow_mut().remove(HEALTH_CHECK_KEY);
        check.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn save_load_remove_roundtrip() {
        let backend = MemBackend::new();
        let key = RecordKey::anonymous("k");

        assert_eq!(backend.load(&key).unwrap(), None);
        backend.save(&key, &json!({"a": 1})).unwrap();
        assert_eq!(backend.load(&key).unwrap(), Some(json!({"a": 1})));

        backend.remove(&key).unwrap();
        assert_eq!(backend.load(&key).unwrap(), None);
        // Removing again is fine
        backend.remove(&key).unwrap();
    }

    #[test]
    fn user_id_is_ignored_locally() {
        let backend = MemBackend::new();
        backend
            .save(&RecordKey::new("k", "alice"), &json!({"v": 1}))
            .unwrap();
        assert_eq!(
            backend.load(&RecordKey::new("k", "bob")).unwrap(),
            Some(json!({"v": 1}))
        );
    }

    #[test]
    fn quota_exceeded_is_typed_and_leaves_medium_untouched() {
        let backend = MemBackend::new().with_quota(32);
        let key = RecordKey::anonymous("k");
        backend.save(&key, &json!({"a": 1})).unwrap();
        let before = backend.snapshot();

        let big = json!({"payload": "x".repeat(64)});
        match backend.save(&key, &big) {
            Err(SiteError::QuotaExceeded { needed, available }) => assert!(needed > available),
            other => panic!("Expected QuotaExceeded, got {:?}", other),
        }
        assert_eq!(backend.snapshot(), before);
    }

    #[test]
    fn overwriting_a_key_does_not_double_count_quota() {
        let backend = MemBackend::new().with_quota(40);
        let key = RecordKey::anonymous("k");
        let value = json!({"text": "0123456789"});
        backend.save(&key, &value).unwrap();
        backend.save(&key, &value).unwrap();
    }

    #[test]
    fn simulated_write_error_and_health() {
        let backend = MemBackend::new();
        assert!(backend.health_check());
        backend.set_simulate_write_error(true);
        assert!(backend.save(&RecordKey::anonymous("k"), &json!({})).is_err());
        assert!(!backend.health_check());
        assert!(backend.snapshot().is_empty());
    }

    #[test]
    fn clones_share_storage() {
        let backend = MemBackend::new();
        let handle = backend.clone();
        backend.save(&RecordKey::anonymous("k"), &json!({})).unwrap();
        assert!(handle.raw("k").is_some());
    }

    #[test]
    fn corrupt_entry_is_a_serialization_error() {
        let backend = MemBackend::new();
        backend.put_raw("k", "{not json");
        assert!(matches!(
            backend.load(&RecordKey::anonymous("k")),
            Err(SiteError::Serialization(_))
        ));
    }
}
