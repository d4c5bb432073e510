use super::{BackendKind, KvBackend, RecordKey};
use crate::clock::Clock;
use crate::error::{Result, SiteError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use tracing::{debug, warn};

/// One stored row of a remote table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub user_id: String,
    pub data: Value,
    pub updated_at: DateTime<Utc>,
}

/// Table-oriented storage with one row per user.
pub trait RowStore {
    /// Insert, or replace the row with the same `user_id`.
    fn upsert(&self, table: &str, row: &Row) -> Result<()>;

    /// Data of the most recently updated row for `user_id`, if any.
    fn select_latest(&self, table: &str, user_id: &str) -> Result<Option<Value>>;

    fn delete(&self, table: &str, user_id: &str) -> Result<()>;

    /// Cheap reachability query.
    fn ping(&self) -> Result<()>;
}

/// Remote backend: the record key names the table, the user id picks the row.
pub struct RemoteBackend<R: RowStore> {
    rows: R,
    clock: Rc<dyn Clock>,
}

impl<R: RowStore> RemoteBackend<R> {
    pub fn new(rows: R, clock: Rc<dyn Clock>) -> Self {
        Self { rows, clock }
    }

    pub fn rows(&self) -> &R {
        &self.rows
    }
}

impl<R: RowStore> KvBackend for RemoteBackend<R> {
    fn kind(&self) -> BackendKind {
        BackendKind::Remote
    }

    fn save(&self, key: &RecordKey, value: &Value) -> Result<()> {
        let row = Row {
            user_id: key.user_id.clone(),
            data: value.clone(),
            updated_at: self.clock.now(),
        };
        self.rows.upsert(&key.key, &row)?;
        debug!(table = %key.key, user = %key.user_id, "remote row upserted");
        Ok(())
    }

    fn load(&self, key: &RecordKey) -> Result<Option<Value>> {
        self.rows.select_latest(&key.key, &key.user_id)
    }

    fn remove(&self, key: &RecordKey) -> Result<()> {
        self.rows.delete(&key.key, &key.user_id)
    }

    fn health_check(&self) -> bool {
        match self.rows.ping() {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "remote health check failed");
                false
            }
        }
    }
}

#[derive(Default)]
struct MemRowsInner {
    tables: RefCell<HashMap<String, Vec<Row>>>,
    unreachable: Cell<bool>,
}

/// In-memory [`RowStore`] for tests. Clones share the same tables.
#[derive(Clone, Default)]
pub struct MemRowStore {
    inner: Rc<MemRowsInner>,
}

impl MemRowStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail as if the network were down.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.inner.unreachable.set(unreachable);
    }

    pub fn row_count(&self, table: &str) -> usize {
        self.inner
            .tables
            .borrow()
            .get(table)
            .map_or(0, |rows| rows.len())
    }

    /// Push a row without replacing existing ones (for recency tests).
    pub fn push_row(&self, table: &str, row: Row) {
        self.inner
            .tables
            .borrow_mut()
            .entry(table.to_string())
            .or_default()
            .push(row);
    }

    fn check_reachable(&self) -> Result<()> {
        if self.inner.unreachable.get() {
            return Err(SiteError::Remote("connection refused".to_string()));
        }
        Ok(())
    }
}

impl RowStore for MemRowStore {
    fn upsert(&self, table: &str, row: &Row) -> Result<()> {
        self.check_reachable()?;
        let mut tables = self.inner.tables.borrow_mut();
        let rows = tables.entry(table.to_string()).or_default();
        rows.retain(|r| r.user_id != row.user_id);
        rows.push(row.clone());
        Ok(())
    }

    fn select_latest(&self, table: &str, user_id: &str) -> Result<Option<Value>> {
        self.check_reachable()?;
        let tables = self.inner.tables.borrow();
        Ok(tables.get(table).and_then(|rows| {
            rows.iter()
                .filter(|r| r.user_id == user_id)
                .max_by_key(|r| r.updated_at)
                .map(|r| r.data.clone())
        }))
    }

    fn delete(&self, table: &str, user_id: &str) -> Result<()> {
        self.check_reachable()?;
        if let Some(rows) = self.inner.tables.borrow_mut().get_mut(table) {
            rows.retain(|r| r.user_id != user_id);
        }
        Ok(())
    }

    fn ping(&self) -> Result<()> {
        self.check_reachable()
    }
}
