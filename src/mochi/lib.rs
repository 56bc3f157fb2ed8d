//! # Mochi Architecture
//!
//! `mochi` is a library for working with a Mochi flashcard account, with a
//! command-line client on top. Its centre is the **interchange** subsystem: the
//! portable `.mochi` archive and the machinery that moves decks and cards
//! between an archive and the live service.
//!
//! ## The Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  CLI Layer (cli/, wired by main.rs)                         │
//! │  - Parses arguments, formats output, handles terminal I/O   │
//! │  - The ONLY place that knows about stdout/stderr/exit codes │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  API Layer (api.rs)                                         │
//! │  - Thin facade over commands                                │
//! │  - Returns structured Result types                          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Command Layer (commands/*.rs)                              │
//! │  - Decks, cards, due, attachments, profiles, transfer       │
//! │  - Operates on Rust types, returns CmdResult                │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌──────────────────────────────┐  ┌──────────────────────────┐
//! │  Interchange (interchange/)  │  │  Remote (remote/)        │
//! │  - Archive schema, validator │─►│  - RemoteClient trait    │
//! │  - Exporter, importer, media │  │  - HttpClient, in-memory │
//! └──────────────────────────────┘  └──────────────────────────┘
//! ```
//!
//! ## Key Principle: No I/O Assumptions in Core
//!
//! From `api.rs` inward, code takes regular Rust arguments and returns
//! `Result<CmdResult>` or plain data. It never writes to stdout or stderr and
//! never exits the process. Diagnostics go through `tracing`; the binary
//! decides where they end up.
//!
//! ## Testing Strategy
//!
//! 1. **Interchange** and **commands**: thorough unit tests driven through
//!    [`remote::memory::InMemoryRemote`], which pages, counts calls and fails
//!    on demand. No network is touched.
//! 2. **API** (`api.rs`): dispatch tests.
//! 3. **CLI**: end-to-end tests in `tests/` running the binary on offline
//!    commands.
//!
//! ## Module Overview
//!
//! - [`api`]: The API facade, entry point for all operations
//! - [`commands`]: Logic for each command
//! - [`interchange`]: The `.mochi` archive: schema, validation, export, import, media
//! - [`remote`]: Service abstraction and implementations
//! - [`model`]: Live service types (`Card`, `Deck`, `Template`, `Page`)
//! - [`config`]: API-key profiles
//! - [`error`]: Error types
//! - `cli`: Argument parsing and printing for the binary (not part of the lib API)

pub mod api;
pub mod commands;
pub mod config;
pub mod error;
pub mod interchange;
pub mod model;
pub mod remote;
