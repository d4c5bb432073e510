use crate::api::SiteApi;
use crate::blobs::{parse_data_url, BlobPayload};
use crate::clock::ManualClock;
use crate::service::PersistenceService;
use crate::store::mem_backend::MemBackend;
use crate::store::remote::{MemRowStore, RemoteBackend};
use chrono::{TimeZone, Utc};
use once_cell::sync::Lazy;
use std::rc::Rc;
use std::time::Duration;

pub const TEST_DEBOUNCE: Duration = Duration::from_millis(1000);

/// An 8-byte PNG signature, enough to exercise the blob store.
pub static PIXEL_PNG: Lazy<BlobPayload> = Lazy::new(|| {
    parse_data_url("data:image/png;base64,iVBORw0KGgo=").expect("valid fixture data URL")
});

/// A [`SiteApi`] over in-memory storage with a manual clock.
///
/// `backend` (and `rows` for remote sites) share storage with the api, so a
/// test can inspect what was written or open a second api over the same data.
pub struct TestSite {
    pub backend: MemBackend,
    pub clock: Rc<ManualClock>,
    pub api: SiteApi,
    rows: Option<MemRowStore>,
    user_id: String,
}

impl Default for TestSite {
    fn default() -> Self {
        Self::new()
    }
}

impl TestSite {
    pub fn new() -> Self {
        let backend = MemBackend::new();
        let clock = Rc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 4, 1, 12, 0, 0).unwrap(),
        ));
        let service = PersistenceService::local(Box::new(backend.clone()), clock.clone());
        let api = SiteApi::open(service, clock.clone(), TEST_DEBOUNCE, "anonymous")
            .expect("failed to open test site");
        Self {
            backend,
            clock,
            api,
            rows: None,
            user_id: "anonymous".to_string(),
        }
    }

    /// A site writing to an in-memory remote row store.
    pub fn with_remote() -> Self {
        Self::with_remote_as("anonymous")
    }

    /// A remote site whose records are written as `user_id`.
    pub fn with_remote_as(user_id: &str) -> Self {
        let backend = MemBackend::new();
        let rows = MemRowStore::new();
        let clock = Rc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 4, 1, 12, 0, 0).unwrap(),
        ));
        let service = PersistenceService::with_remote(
            Box::new(backend.clone()),
            Box::new(RemoteBackend::new(rows.clone(), clock.clone())),
            clock.clone(),
        );
        let api = SiteApi::open(service, clock.clone(), TEST_DEBOUNCE, user_id)
            .expect("failed to open test site");
        Self {
            backend,
            clock,
            api,
            rows: Some(rows),
            user_id: user_id.to_string(),
        }
    }

    pub fn rows(&self) -> &MemRowStore {
        self.rows.as_ref().expect("site has no remote store")
    }

    /// A fresh local service over the same medium.
    pub fn local_service(&self) -> PersistenceService {
        PersistenceService::local(Box::new(self.backend.clone()), self.clock.clone())
    }

    /// A fresh remote service over the same medium and rows.
    pub fn remote_service(&self) -> PersistenceService {
        PersistenceService::with_remote(
            Box::new(self.backend.clone()),
            Box::new(RemoteBackend::new(self.rows().clone(), self.clock.clone())),
            self.clock.clone(),
        )
    }

    /// A second api over the same storage, as after a restart.
    pub fn reopen(&self) -> SiteApi {
        let service = match self.rows {
            Some(_) => self.remote_service(),
            None => self.local_service(),
        };
        SiteApi::open(service, self.clock.clone(), TEST_DEBOUNCE, self.user_id.as_str())
            .expect("failed to reopen test site")
    }
}
