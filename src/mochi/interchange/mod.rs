//! # Interchange
//!
//! The portable `.mochi` archive: its document schema, the consistency rules a
//! document must satisfy, and the conversion between an archive and the live
//! service.
//!
//! ## Data Flow
//!
//! ```text
//! export:  RemoteClient ──► Exporter ──► ArchiveDocument ──► validate ──► archive (zip)
//! import:  archive (zip) ──► ArchiveDocument ──► validate ──► Importer ──► RemoteClient
//! media:   archive (zip) ──► extract_media ──► local directory
//! ```
//!
//! An [`ArchiveDocument`] only ever exists whole and in memory. The archive file
//! is the only durable artifact; it is written to a temporary sibling and renamed
//! into place once complete.
//!
//! ## Failure Asymmetry
//!
//! Export is all-or-nothing: any failed remote call aborts it and no document
//! is returned. Import is a best-effort replay: each failed creation is recorded
//! in [`ImportResult::errors`] and the replay moves on to the next sibling.
//!
//! ## Archive Container
//!
//! A zip file with one schema entry named `data.json`. An entry named
//! `data.edn` is recognized by name but parsed with the same JSON grammar.
//! Every other entry is an opaque media file addressed by its relative path.

pub mod archive;
pub mod export;
pub mod import;
pub mod media;
pub mod schema;
pub mod validate;

pub use archive::{read_document, validate_container, write_archive, DATA_EDN, DATA_JSON};
pub use export::Exporter;
pub use import::{ImportResult, Importer};
pub use media::extract_media;
pub use schema::{
    ArchiveCard, ArchiveDeck, ArchiveDocument, ArchiveField, ArchiveFormat, ArchiveReview,
    ArchiveTemplate, ExportOptions, ImportOptions, SCHEMA_VERSION,
};
pub use validate::{validate, ValidationError};
