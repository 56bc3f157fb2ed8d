//! # Mochi CLI
//!
//! The binary is intentionally thin: the CLI lives in `cli/`, while this file
//! only invokes `cli::run()` and handles process termination.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  CLI Layer (src/mochi/cli/)                                 │
//! │  - clap argument parsing and grouped help (setup.rs)        │
//! │  - Context wiring and dispatch (commands.rs)                │
//! │  - Terminal output (print.rs)                               │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  API Layer (src/mochi/api.rs)                               │
//! │  - Dispatches to command modules                            │
//! │  - Returns structured `CmdResult` values                    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything from `api.rs` inward is UI agnostic. Exit status is 0 on
//! success and 1 on any returned error.

mod cli;

fn main() {
    let (style, result) = cli::run();
    if let Err(e) = result {
        cli::report_error(&e, style);
        std::process::exit(1);
    }
}
