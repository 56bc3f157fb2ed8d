//! # CLI Behavior
//!
//! This is **one possible UI client** for mochi, not the application itself.
//! The CLI is the only place that knows about terminal I/O, exit codes and
//! output formatting.
//!
//! For the overall architecture, see the crate-level documentation in `mochi`.
//!
//! ## Credentials On Demand
//!
//! The API key is resolved only when a command talks to the service, in this
//! order: `--api-key`, `MOCHI_API_KEY`, `--profile`, the active profile.
//! `config`, `import-export validate` and `import-export extract-media` work
//! offline and never ask for one.
//!
//! ## Output
//!
//! `--output text` (the default) prints coloured listings and messages.
//! `--output json` prints the whole command result as one JSON document, and
//! `--json-errors` does the same for failures on stderr. Logs always go to
//! stderr; `-v` raises them to debug and `RUST_LOG` overrides both.
//!
//! ## Import Outcome
//!
//! An import that creates some items and fails on others still exits 0. The
//! failures are printed one per line after a warning summary.
//!
//! ## Module Structure
//!
//! - `commands`: Context wiring and per-command handlers
//! - `print`: Output formatting (listings, colours, messages)
//! - `setup`: Argument parsing via clap, grouped help text

mod commands;
mod print;
mod setup;

pub use commands::{run, ErrorStyle};
pub use print::report_error;
