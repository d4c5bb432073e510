//! # xfsite CLI
//!
//! The admin front end for the Xandeum Finance site. The binary is thin: this
//! file only invokes `cli::run()` and handles process termination. Everything
//! that touches state lives in the `xfsite` library.
//!
//! ## Layering
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  CLI Layer (crates/xfsite-cli/src/cli/)                     │
//! │  - clap argument parsing (setup.rs)                         │
//! │  - config, backends and dispatch (commands.rs)              │
//! │  - terminal rendering with colored (render.rs)              │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  API Layer (crates/xfsite/src/api.rs)                       │
//! │  - Owns content, roadmap, edit session and pending writes   │
//! │  - Returns structured `CmdResult` values                    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Commands, persistence service and storage backends        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each invocation opens the site, runs one command and flushes every pending
//! write before exiting, so the debounce window never outlives the process.
//!
//! ## Testing Approach
//!
//! Behavior is tested in the library. The tests under `tests/` run the built
//! binary against a temporary data directory and check what it prints and
//! what it leaves on disk.

mod cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
