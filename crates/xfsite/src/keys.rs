//! Storage keys of the persisted records.

use crate::error::Result;
use crate::schema::roadmap_schema;
use crate::service::{PersistenceService, SaveOptions};
use serde_json::Value;
use tracing::{info, warn};

pub const CONTENT_KEY: &str = "xandeum-content";
pub const ROADMAP_KEY: &str = "xandeum-roadmap-data";

/// Older names the roadmap record was stored under.
pub const LEGACY_ROADMAP_KEYS: &[&str] = &["roadmapData"];

pub const BLOB_PREFIX: &str = "blob-";

pub fn blob_key(hash: &str) -> String {
    format!("{}{}", BLOB_PREFIX, hash)
}

/// Move a roadmap found only under a legacy key to [`ROADMAP_KEY`].
///
/// Does nothing when the canonical record exists. A legacy record that fails
/// the roadmap schema is left where it is. Returns the adopted key.
pub fn adopt_legacy_roadmap(
    service: &PersistenceService,
    user_id: &str,
) -> Result<Option<&'static str>> {
    if !service.load(ROADMAP_KEY, Value::Null, user_id)?.is_null() {
        return Ok(None);
    }

    for legacy in LEGACY_ROADMAP_KEYS {
        let value = service.load(legacy, Value::Null, user_id)?;
        if value.is_null() {
            continue;
        }
        let opts = SaveOptions::with_schema(roadmap_schema()).for_user(user_id);
        if let Err(e) = service.save(ROADMAP_KEY, value, &opts) {
            warn!(key = legacy, error = %e, "legacy roadmap record not adopted");
            continue;
        }
        service.remove(legacy, user_id)?;
        info!(from = legacy, to = ROADMAP_KEY, "legacy roadmap record adopted");
        return Ok(Some(*legacy));
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::store::mem_backend::MemBackend;
    use serde_json::json;
    use std::rc::Rc;

    fn service() -> (MemBackend, PersistenceService) {
        let backend = MemBackend::new();
        let service = PersistenceService::local(Box::new(backend.clone()), Rc::new(SystemClock));
        (backend, service)
    }

    #[test]
    fn adopts_legacy_record() {
        let (backend, service) = service();
        backend.put_raw(
            "roadmapData",
            r#"{"lastUpdated":"2025-12-01","quarters":[]}"#,
        );

        assert_eq!(
            adopt_legacy_roadmap(&service, "anonymous").unwrap(),
            Some("roadmapData")
        );
        assert!(backend.raw("roadmapData").is_none());
        assert_eq!(
            service.load(ROADMAP_KEY, Value::Null, "anonymous").unwrap(),
            json!({"lastUpdated": "2025-12-01", "quarters": []})
        );
    }

    #[test]
    fn canonical_record_wins() {
        let (backend, service) = service();
        service
            .save(
                ROADMAP_KEY,
                json!({"lastUpdated": "2026-01-01", "quarters": []}),
                &SaveOptions::default(),
            )
            .unwrap();
        backend.put_raw("roadmapData", r#"{"lastUpdated":"old","quarters":[]}"#);

        assert_eq!(adopt_legacy_roadmap(&service, "anonymous").unwrap(), None);
        assert!(backend.raw("roadmapData").is_some());
    }

    #[test]
    fn malformed_legacy_record_stays_put() {
        let (backend, service) = service();
        backend.put_raw("roadmapData", r#"{"quarters":"nope"}"#);
        assert_eq!(adopt_legacy_roadmap(&service, "anonymous").unwrap(), None);
        assert!(backend.raw("roadmapData").is_some());
        assert!(backend.raw(ROADMAP_KEY).is_none());
    }
}
