use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;
use xfsite::api::SiteApi;
use xfsite::clock::ManualClock;
use xfsite::commands::content::NewSection;
use xfsite::commands::roadmap::{QuarterPatch, TaskPatch};
use xfsite::error::{Result, SiteError};
use xfsite::keys::{CONTENT_KEY, ROADMAP_KEY};
use xfsite::model::DocId;
use xfsite::schema::roadmap_schema;
use xfsite::service::{PersistenceService, SaveOptions};
use xfsite::store::mem_backend::MemBackend;
use xfsite::store::remote::{MemRowStore, RemoteBackend};
use xfsite::store::{BackendKind, KvBackend, RecordKey};

/// Local backend that records every write it performs.
#[derive(Clone)]
struct CountingBackend {
    inner: MemBackend,
    saves: Rc<RefCell<Vec<(String, Value)>>>,
}

impl CountingBackend {
    fn new(inner: MemBackend) -> Self {
        Self {
            inner,
            saves: Rc::new(RefCell::new(Vec::new())),
        }
    }

    fn saves_of(&self, key: &str) -> Vec<Value> {
        self.saves
            .borrow()
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
            .collect()
    }
}

impl KvBackend for CountingBackend {
    fn kind(&self) -> BackendKind {
        self.inner.kind()
    }

    fn save(&self, key: &RecordKey, value: &Value) -> Result<()> {
        self.saves
            .borrow_mut()
            .push((key.key.clone(), value.clone()));
        self.inner.save(key, value)
    }

    fn load(&self, key: &RecordKey) -> Result<Option<Value>> {
        self.inner.load(key)
    }

    fn remove(&self, key: &RecordKey) -> Result<()> {
        self.inner.remove(key)
    }

    fn health_check(&self) -> bool {
        self.inner.health_check()
    }
}

fn clock() -> Rc<ManualClock> {
    Rc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2026, 6, 15, 9, 0, 0).unwrap(),
    ))
}

fn open_site(backend: &MemBackend, clock: &Rc<ManualClock>) -> SiteApi {
    let service = PersistenceService::local(Box::new(backend.clone()), clock.clone());
    SiteApi::open(
        service,
        clock.clone(),
        Duration::from_millis(1000),
        "anonymous",
    )
    .unwrap()
}

fn stored(backend: &MemBackend, key: &str) -> Value {
    serde_json::from_str(&backend.raw(key).unwrap()).unwrap()
}

#[test]
fn save_then_load_round_trips_without_metadata() {
    let backend = MemBackend::new();
    let service = PersistenceService::local(Box::new(backend.clone()), clock());

    let samples = [
        json!({}),
        json!({"title": "Hello", "n": 3, "flag": true}),
        json!({"nested": {"list": [1, 2, {"deep": null}]}, "unicode": "Xandeum ✓"}),
        json!({"_metadata": "caller supplied", "v": 1}),
    ];
    for (i, data) in samples.iter().enumerate() {
        let key = format!("k{}", i);
        service
            .save(&key, data.clone(), &SaveOptions::default())
            .unwrap();
        let loaded = service.load(&key, Value::Null, "anonymous").unwrap();

        let mut expected = data.clone();
        expected.as_object_mut().unwrap().remove("_metadata");
        assert_eq!(loaded, expected);
    }
}

#[test]
fn rejected_save_leaves_medium_unchanged() {
    let backend = MemBackend::new();
    let service = PersistenceService::local(Box::new(backend.clone()), clock());
    service
        .save(
            ROADMAP_KEY,
            json!({"lastUpdated": "2026-01-01", "quarters": []}),
            &SaveOptions::with_schema(roadmap_schema()),
        )
        .unwrap();
    let before = backend.snapshot();

    for bad in [
        json!(null),
        json!("string"),
        json!({"quarters": []}),
        json!({"lastUpdated": "2026-01-02", "quarters": "none"}),
    ] {
        let result = service.save(
            ROADMAP_KEY,
            bad,
            &SaveOptions::with_schema(roadmap_schema()),
        );
        assert!(matches!(result, Err(SiteError::Validation(_))));
        assert_eq!(backend.snapshot(), before);
    }
}

#[test]
fn burst_of_edits_is_one_write_of_the_last_state() {
    let medium = MemBackend::new();
    let counting = CountingBackend::new(medium);
    let clock = clock();
    let service = PersistenceService::local(Box::new(counting.clone()), clock.clone());
    let mut site = SiteApi::open(
        service,
        clock.clone(),
        Duration::from_millis(1000),
        "anonymous",
    )
    .unwrap();

    for n in 1..=10 {
        site.update_document_meta(DocId::TechnicalWhitepaper, Some(format!("Title {}", n)), None)
            .unwrap();
        clock.advance_ms(50);
    }
    assert!(counting.saves_of(CONTENT_KEY).is_empty());

    clock.advance_ms(1000);
    site.tick().unwrap();
    let writes = counting.saves_of(CONTENT_KEY);
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0]["technicalWhitepaper"]["title"], "Title 10");

    // Nothing left to write
    clock.advance_ms(5000);
    site.tick().unwrap();
    assert_eq!(counting.saves_of(CONTENT_KEY).len(), 1);
}

#[test]
fn update_task_clamps_stored_progress() {
    let backend = MemBackend::new();
    let clock = clock();
    let mut site = open_site(&backend, &clock);

    site.update_task(
        "core-ui",
        TaskPatch {
            progress: Some(150),
            ..Default::default()
        },
    )
    .unwrap();
    site.update_task(
        "authentication",
        TaskPatch {
            progress: Some(-5),
            ..Default::default()
        },
    )
    .unwrap();
    site.flush().unwrap();

    let record = stored(&backend, ROADMAP_KEY);
    let progress = |id: &str| {
        record["quarters"]
            .as_array()
            .unwrap()
            .iter()
            .flat_map(|q| q["tasks"].as_array().unwrap().iter())
            .find(|t| t["id"] == id)
            .unwrap()["progress"]
            .clone()
    };
    assert_eq!(progress("core-ui"), json!(100));
    assert_eq!(progress("authentication"), json!(0));
}

#[test]
fn delete_quarter_leaves_no_orphan_tasks() {
    let backend = MemBackend::new();
    let clock = clock();
    let mut site = open_site(&backend, &clock);
    let doomed: Vec<String> = site
        .roadmap()
        .quarter("q1-2026")
        .unwrap()
        .tasks
        .iter()
        .map(|t| t.id.clone())
        .collect();
    assert!(!doomed.is_empty());

    site.delete_quarter("q1-2026").unwrap();
    site.flush().unwrap();

    let reopened = open_site(&backend, &clock);
    assert!(reopened.roadmap().quarter("q1-2026").is_none());
    for id in &doomed {
        assert!(!reopened.roadmap().has_task_id(id), "orphan task {}", id);
    }
}

#[test]
fn malformed_import_changes_nothing() {
    let backend = MemBackend::new();
    let clock = clock();
    let mut site = open_site(&backend, &clock);
    site.update_document_meta(DocId::FinancialFeatures, Some("Edited".into()), None)
        .unwrap();
    site.flush().unwrap();

    let state_before = site.content().clone();
    let record_before = backend.raw(CONTENT_KEY).unwrap();

    for raw in ["", "{", "{\"technicalWhitepaper\": []}", "null"] {
        let result = site.import_content(raw);
        assert!(matches!(result, Err(SiteError::Parse(_))), "accepted {:?}", raw);
        assert_eq!(site.content(), &state_before);
        assert_eq!(backend.raw(CONTENT_KEY).unwrap(), record_before);
    }
    assert!(!site.has_pending_writes());
}

#[test]
fn added_section_survives_export_reset_import() {
    let backend = MemBackend::new();
    let clock = clock();
    let mut site = open_site(&backend, &clock);

    site.add_section(
        DocId::TechnicalWhitepaper,
        NewSection {
            title: "New".into(),
            content: "Body".into(),
            ..Default::default()
        },
    )
    .unwrap();
    let exported = site.export_content().unwrap().export.unwrap();
    assert_eq!(exported.file_name, "xandeum-content-export-2026-06-15.json");

    site.reset_content(None).unwrap();
    assert!(!site
        .content()
        .technical_whitepaper
        .sections
        .iter()
        .any(|s| s.title == "New"));

    site.import_content(&exported.contents).unwrap();
    assert!(site
        .content()
        .technical_whitepaper
        .sections
        .iter()
        .any(|s| s.title == "New" && s.content == "Body"));

    // And it was persisted
    let reopened = open_site(&backend, &clock);
    assert!(reopened
        .content()
        .technical_whitepaper
        .sections
        .iter()
        .any(|s| s.title == "New" && s.content == "Body"));
}

#[test]
fn health_check_survives_unreachable_remote() {
    let rows = MemRowStore::new();
    rows.set_unreachable(true);
    let clock = clock();
    let service = PersistenceService::with_remote(
        Box::new(MemBackend::new()),
        Box::new(RemoteBackend::new(rows, clock.clone())),
        clock,
    );

    let health = service.health_check();
    assert!(health.local);
    assert_eq!(health.remote, Some(false));
}

#[test]
fn failed_local_health_is_reported_not_raised() {
    let backend = MemBackend::new();
    backend.set_simulate_write_error(true);
    let service = PersistenceService::local(Box::new(backend), clock());
    let health = service.health_check();
    assert!(!health.local);
    assert_eq!(health.remote, None);
}

#[test]
fn quota_failure_surfaces_from_flush() {
    let backend = MemBackend::new().with_quota(256);
    let clock = clock();
    let mut site = open_site(&backend, &clock);
    site.update_document_meta(DocId::TechnicalWhitepaper, Some("x".into()), None)
        .unwrap();
    assert!(matches!(
        site.flush(),
        Err(SiteError::QuotaExceeded { .. })
    ));
    assert!(backend.raw(CONTENT_KEY).is_none());
}

#[test]
fn remote_site_round_trips_through_rows() {
    let rows = MemRowStore::new();
    let clock = clock();
    let open = |rows: &MemRowStore| {
        let service = PersistenceService::with_remote(
            Box::new(MemBackend::new()),
            Box::new(RemoteBackend::new(rows.clone(), clock.clone())),
            clock.clone(),
        );
        SiteApi::open(service, clock.clone(), Duration::from_millis(0), "alice").unwrap()
    };

    let mut site = open(&rows);
    let patch = QuarterPatch {
        id: Some("h2-2026".into()),
        name: Some("Second half".into()),
    };
    site.update_quarter("q2-2026", patch).unwrap();
    site.flush().unwrap();
    assert_eq!(rows.row_count(ROADMAP_KEY), 1);

    let reopened = open(&rows);
    assert!(reopened.roadmap().quarter("q2-2026").is_none());
    assert_eq!(
        reopened.roadmap().quarter("h2-2026").unwrap().name,
        "Second half"
    );

    let backup = site.backup().unwrap().backup.unwrap();
    assert!(backup.data.contains_key(ROADMAP_KEY));
    site.delete_quarter("h2-2026").unwrap();
    site.flush().unwrap();
    site.restore(&backup).unwrap();
    assert!(open(&rows).roadmap().quarter("h2-2026").is_some());
    assert_eq!(rows.row_count(ROADMAP_KEY), 1);
}
