//! # Storage Layer
//!
//! This module defines the key-value abstraction that every persisted record
//! goes through. The [`KvBackend`] trait lets the persistence service work with
//! a local medium or a remote table store without knowing which.
//!
//! ## Design Rationale
//!
//! Storage is abstracted behind a trait to:
//! - Enable **testing** with [`mem_backend::MemBackend`] (no filesystem needed)
//! - Make the remote store a **construction-time choice** instead of a branch
//!   buried in every call
//! - Keep the content model **decoupled** from persistence details
//!
//! ## Implementations
//!
//! - [`fs_backend::FsBackend`]: the local medium. One JSON file per key in a
//!   data directory, written atomically, bounded by a byte quota.
//! - [`mem_backend::MemBackend`]: in-memory local medium for tests, with quota
//!   and write-failure simulation.
//! - [`remote::RemoteBackend`]: user-row storage keyed by `(table, user_id)`
//!   over a [`remote::RowStore`] (HTTP in production, in-memory in tests).
//!
//! ## Keys
//!
//! A [`RecordKey`] pairs the logical key with a user id. Local backends are
//! single-user and ignore the user id; the remote backend uses the key as the
//! table name and the user id to pick the row.
//!
//! ## Failure Model
//!
//! Absence is not a failure: `load` returns `Ok(None)` and `remove` of a
//! missing key is `Ok(())`. Everything else (medium I/O, quota, network,
//! timeouts) comes back as a typed [`crate::error::SiteError`].

use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

pub mod fs_backend;
pub mod mem_backend;
pub mod remote;
pub mod rest;

/// Key used by local health checks.
pub const HEALTH_CHECK_KEY: &str = "_health_check_test";

pub const ANONYMOUS_USER: &str = "anonymous";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordKey {
    pub key: String,
    pub user_id: String,
}

impl RecordKey {
    pub fn new(key: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            user_id: user_id.into(),
        }
    }

    pub fn anonymous(key: impl Into<String>) -> Self {
        Self::new(key, ANONYMOUS_USER)
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.key, self.user_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BackendKind {
    Local,
    Remote,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Local => f.write_str("local"),
            BackendKind::Remote => f.write_str("remote"),
        }
    }
}

/// Abstract interface for raw record I/O.
///
/// Implementations store whole JSON values; they never inspect or modify them.
pub trait KvBackend {
    fn kind(&self) -> BackendKind;

    /// Store `value` under `key`, replacing whatever was there.
    fn save(&self, key: &RecordKey, value: &Value) -> Result<()>;

    /// Returns `Ok(None)` when nothing is stored under `key`.
    fn load(&self, key: &RecordKey) -> Result<Option<Value>>;

    /// Removing an absent key succeeds.
    fn remove(&self, key: &RecordKey) -> Result<()>;

    /// Check reachability with a trivial round trip. Never panics.
    fn health_check(&self) -> bool;
}
