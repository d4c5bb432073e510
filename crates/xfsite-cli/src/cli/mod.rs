//! # CLI Behavior
//!
//! This is **one possible UI client** for xfsite, the terminal version of the
//! site's admin mode. It is the only place that knows about terminal I/O,
//! exit codes and output formatting.
//!
//! ## One Command, One Session
//!
//! The site keeps one edit session in memory. A process lives for a single
//! command, so `section edit` and `image attach|remove` open the section,
//! apply their changes to the draft and save it in the same invocation.
//!
//! ## Confirmation
//!
//! `section delete`, `quarter delete` and `reset` refuse to run without
//! `--yes`. The library treats deletes as single irreversible calls and leaves
//! asking to the client.
//!
//! ## Logging
//!
//! Diagnostics go to stderr through `tracing-subscriber`, filtered by
//! `XFSITE_LOG` (default `warn`, `-v` for `debug`). Command output goes to
//! stdout.
//!
//! ## Module Structure
//!
//! - `setup`: argument parsing via clap
//! - `commands`: context setup and per-command handlers
//! - `render`: output formatting

mod commands;
mod render;
pub mod setup;

pub use commands::run;
