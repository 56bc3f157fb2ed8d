//! Archive transfer: export, import, validate and media extraction.

use crate::commands::{CmdMessage, CmdResult, ExportSummary};
use crate::error::{MochiError, Result};
use crate::interchange::{
    self, validate_container, ArchiveDocument, ExportOptions, Exporter, ImportOptions, Importer,
};
use crate::remote::RemoteClient;
use std::path::{Path, PathBuf};

/// What to put in an exported archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportScope {
    Deck(String),
    AllDecks,
    Cards {
        ids: Vec<String>,
        deck_id: Option<String>,
    },
}

#[derive(Debug, Clone)]
pub struct ExportRequest {
    pub scope: ExportScope,
    pub path: PathBuf,
    pub options: ExportOptions,
    /// Local files stored next to the document.
    pub media: Vec<PathBuf>,
    pub dry_run: bool,
}

#[derive(Debug, Clone)]
pub struct ImportRequest {
    pub path: PathBuf,
    pub options: ImportOptions,
    /// Where media entries go after a successful import.
    pub media_dir: PathBuf,
}

pub fn export<R: RemoteClient + ?Sized>(remote: &R, request: &ExportRequest) -> Result<CmdResult> {
    let exporter = Exporter::new(remote);
    let document = match &request.scope {
        ExportScope::Deck(id) => exporter.export_deck(id, &request.options)?,
        ExportScope::AllDecks => exporter.export_all_decks(&request.options)?,
        ExportScope::Cards { ids, deck_id } => {
            exporter.export_cards(ids, deck_id.as_deref(), &request.options)?
        }
    };

    let summary = ExportSummary {
        path: request.path.clone(),
        decks: document.deck_count(),
        cards: document.card_count(),
        media: request.media.len(),
        dry_run: request.dry_run,
    };

    let mut result = CmdResult::default();
    if request.dry_run {
        result.add_message(CmdMessage::info(format!(
            "Dry run: would export {} decks and {} cards to {}",
            summary.decks,
            summary.cards,
            request.path.display()
        )));
        return Ok(result.with_export(summary));
    }

    interchange::write_archive(
        &document,
        &request.path,
        request.options.format,
        &request.media,
    )?;
    result.add_message(CmdMessage::success(format!(
        "Exported {} decks and {} cards to {}",
        summary.decks,
        summary.cards,
        request.path.display()
    )));
    Ok(result.with_export(summary))
}

/// Import an archive, then extract its media unless skipped or dry-running.
///
/// Per-item failures come back as error messages in an `Ok` result.
pub fn import<R: RemoteClient + ?Sized>(remote: &R, request: &ImportRequest) -> Result<CmdResult> {
    ensure_exists(&request.path)?;
    validate_container(&request.path)?;

    let mut outcome = Importer::new(remote).import_from_archive(&request.path, &request.options)?;
    let mut result = CmdResult::default();

    if request.options.dry_run {
        result.add_message(CmdMessage::info(format!(
            "Dry run: would create {} decks, {} cards and {} templates",
            outcome.decks_created, outcome.cards_created, outcome.templates_created
        )));
        return Ok(result.with_import(outcome));
    }

    if !request.options.skip_media {
        match interchange::extract_media(&request.path, &request.media_dir) {
            Ok(files) => outcome.media_files = files,
            Err(e) => result.add_message(CmdMessage::warning(format!(
                "Media extraction failed: {}",
                e
            ))),
        }
    }

    let summary = format!(
        "Imported {} decks, {} cards and {} templates",
        outcome.decks_created, outcome.cards_created, outcome.templates_created
    );
    if outcome.has_errors() {
        result.add_message(CmdMessage::warning(format!(
            "{} with {} errors",
            summary,
            outcome.errors.len()
        )));
        for error in &outcome.errors {
            result.add_message(CmdMessage::error(error.clone()));
        }
    } else {
        result.add_message(CmdMessage::success(summary));
    }
    if !outcome.media_files.is_empty() {
        result.add_message(CmdMessage::info(format!(
            "Extracted {} media files to {}",
            outcome.media_files.len(),
            request.media_dir.display()
        )));
    }

    Ok(result.with_import(outcome))
}

/// Check the container, then the document inside it.
///
/// With `container_only`, stop after confirming the archive holds a schema
/// entry; the document is neither parsed nor validated.
pub fn validate(path: &Path, container_only: bool) -> Result<CmdResult> {
    ensure_exists(path)?;
    validate_container(path)?;
    if container_only {
        let mut result = CmdResult::default();
        result.add_message(CmdMessage::success(format!(
            "{} is a valid .mochi container",
            path.display()
        )));
        return Ok(result);
    }

    let document: ArchiveDocument = interchange::read_document(path)?;
    interchange::validate(&document)?;

    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!(
        "{} is valid: {} decks, {} cards, {} templates",
        path.display(),
        document.deck_count(),
        document.card_count(),
        document.template_count()
    )));
    Ok(result)
}

pub fn extract_media(path: &Path, dest: &Path) -> Result<CmdResult> {
    ensure_exists(path)?;
    let files = interchange::extract_media(path, dest)?;
    let mut result = CmdResult::default();
    if files.is_empty() {
        result.add_message(CmdMessage::info("No media files in archive."));
    } else {
        result.add_message(CmdMessage::success(format!(
            "Extracted {} media files to {}",
            files.len(),
            dest.display()
        )));
    }
    Ok(result.with_media_files(files))
}

fn ensure_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(MochiError::NotFound(format!("file {}", path.display())));
    }
    Ok(())
}

/// Default media directory for an archive: `<stem>-media` under `base`.
pub fn default_media_dir(archive: &Path, base: &Path) -> PathBuf {
    let stem = archive
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "mochi".to_string());
    base.join(format!("{}-media", stem))
}
