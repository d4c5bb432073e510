//! # xfsite
//!
//! Content and roadmap persistence for the Xandeum Finance site: the pages'
//! editable documents, the product roadmap, and the storage they live in.
//!
//! ## Architecture
//!
//! The crate is UI-agnostic. Clients (the `xfsite` CLI) talk to [`api::SiteApi`]
//! and render the [`commands::CmdResult`]s it returns. From the inside out:
//!
//! 1. [`store`]: the key-value adapter. [`store::KvBackend`] with a file
//!    backend, an in-memory backend and a remote row-store backend.
//! 2. [`schema`]: shallow shape checks run before a record is written.
//! 3. [`service`]: save/load/remove/backup/restore/migrate/health over the
//!    active backend, with `_metadata` stamping and local fallback.
//! 4. [`debounce`]: coalesces bursts of writes to one key into one write.
//! 5. [`commands`]: the editing operations on the in-memory model.
//! 6. [`api`]: owns the state, runs commands and schedules writes.
//!
//! Supporting modules: [`model`] (the records), [`seed`] (built-in content),
//! [`blobs`] (content-addressed images), [`keys`] (storage key names),
//! [`config`] (layered settings) and [`clock`] (injectable time).
//!
//! ## Threading
//!
//! Everything is single-threaded and synchronous. Backends use interior
//! mutability (`RefCell`, `Cell`) and are shared through `Rc`; deferred writes
//! only happen when the owner calls [`api::SiteApi::tick`] or
//! [`api::SiteApi::flush`].
//!
//! ## Errors
//!
//! Every fallible operation returns [`error::Result`]. Absent records are not
//! errors: loads return the default and removes succeed.

pub mod api;
pub mod blobs;
pub mod clock;
pub mod commands;
pub mod config;
pub mod debounce;
pub mod error;
pub mod keys;
pub mod model;
pub mod schema;
pub mod seed;
pub mod service;
pub mod store;

#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;
