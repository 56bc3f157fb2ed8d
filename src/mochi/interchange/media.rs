use super::archive::{is_schema_entry, open_archive};
use crate::error::{MochiError, Result};
use std::fs::{self, File};
use std::io::{self, Read, Seek};
use std::path::{Path, PathBuf};
use zip::ZipArchive;

/// Copy every media entry of an archive into `dest`, keeping relative paths.
///
/// Returns the names of the entries written. Schema entries and directories
/// are skipped. Write failures are logged and never abort the call: a single
/// entry that cannot be written is skipped without affecting the others, and a
/// `dest` that cannot be created yields an empty list. Only failing to open the
/// archive is an error. Entries whose path would land outside `dest` are
/// refused.
pub fn extract_media(archive_path: &Path, dest: &Path) -> Result<Vec<String>> {
    let mut archive = open_archive(archive_path)?;
    if let Err(e) = fs::create_dir_all(dest) {
        tracing::warn!(dest = %dest.display(), error = %e, "cannot create media directory");
        return Ok(Vec::new());
    }

    let mut extracted = Vec::new();
    for index in 0..archive.len() {
        match extract_entry(&mut archive, index, dest) {
            Ok(Some(name)) => extracted.push(name),
            Ok(None) => {}
            Err(e) => tracing::warn!(index, error = %e, "skipping media entry"),
        }
    }

    tracing::info!(count = extracted.len(), dest = %dest.display(), "extracted media");
    Ok(extracted)
}

fn extract_entry<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    index: usize,
    dest: &Path,
) -> Result<Option<String>> {
    let mut entry = archive.by_index(index)?;
    let name = entry.name().to_string();
    if entry.is_dir() || is_schema_entry(&name) {
        return Ok(None);
    }

    let relative: PathBuf = entry
        .enclosed_name()
        .ok_or_else(|| MochiError::InvalidPath(format!("unsafe entry path: {}", name)))?;
    let out_path = dest.join(relative);
    if let Some(parent) = out_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut out = File::create(&out_path)?;
    if let Err(e) = io::copy(&mut entry, &mut out) {
        drop(out);
        let _ = fs::remove_file(&out_path);
        return Err(e.into());
    }
    Ok(Some(name))
}
