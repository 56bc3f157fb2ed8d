//! The `.mochi` zip container.
//!
//! Reading locates the schema entry and parses it. Writing serializes a
//! validated document into a temporary sibling of the destination, then renames
//! it into place, so a failed write never leaves a truncated archive behind.

use super::schema::{ArchiveDocument, ArchiveFormat};
use super::validate::validate;
use crate::error::{MochiError, Result};
use std::fs::{self, File};
use std::io::{Read, Seek, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

pub const DATA_JSON: &str = "data.json";
pub const DATA_EDN: &str = "data.edn";

/// True for the entry names that hold the document rather than media.
pub fn is_schema_entry(name: &str) -> bool {
    name == DATA_JSON || name == DATA_EDN
}

pub fn open_archive(path: &Path) -> Result<ZipArchive<File>> {
    let file = File::open(path)?;
    Ok(ZipArchive::new(file)?)
}

fn schema_entry_index<R: Read + Seek>(archive: &ZipArchive<R>) -> Option<usize> {
    archive
        .index_for_name(DATA_JSON)
        .or_else(|| archive.index_for_name(DATA_EDN))
}

/// Read and parse the document inside an archive.
///
/// Fails with [`MochiError::NoDataEntry`] when neither `data.json` nor
/// `data.edn` is present. Both are parsed as JSON. The document is returned
/// unvalidated.
pub fn read_document(path: &Path) -> Result<ArchiveDocument> {
    let mut archive = open_archive(path)?;
    read_document_from(&mut archive)
}

pub fn read_document_from<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<ArchiveDocument> {
    let index = schema_entry_index(archive).ok_or(MochiError::NoDataEntry)?;
    let mut entry = archive.by_index(index)?;
    let mut contents = String::new();
    entry.read_to_string(&mut contents)?;
    Ok(serde_json::from_str(&contents)?)
}

/// Check that a file is a readable zip holding a schema entry.
///
/// Says nothing about the document itself; see [`validate`] for that.
pub fn validate_container(path: &Path) -> Result<()> {
    let archive = open_archive(path)?;
    schema_entry_index(&archive)
        .map(|_| ())
        .ok_or(MochiError::NoDataEntry)
}

/// Encode the document text for the schema entry.
pub fn encode_document(document: &ArchiveDocument, format: ArchiveFormat) -> Result<Vec<u8>> {
    if format == ArchiveFormat::Edn {
        tracing::warn!("EDN encoding is not supported; writing JSON to {}", DATA_JSON);
    }
    Ok(serde_json::to_vec_pretty(document)?)
}

/// Validate `document` and write it, plus any media files, to `dest`.
///
/// Media files are stored at the archive root under their file names. A media
/// file may not be named like a schema entry, and no two media files may share
/// a file name.
pub fn write_archive(
    document: &ArchiveDocument,
    dest: &Path,
    format: ArchiveFormat,
    media: &[PathBuf],
) -> Result<()> {
    validate(document)?;
    media_entry_names(media)?;
    let data = encode_document(document, format)?;

    let tmp = temp_sibling(dest)?;
    let written = File::create(&tmp)
        .map_err(MochiError::from)
        .and_then(|file| write_container(file, &data, media))
        .and_then(|file| file.sync_all().map_err(MochiError::from))
        .and_then(|_| fs::rename(&tmp, dest).map_err(MochiError::from));

    if let Err(e) = written {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }

    tracing::info!(
        path = %dest.display(),
        decks = document.deck_count(),
        cards = document.card_count(),
        media = media.len(),
        "wrote archive"
    );
    Ok(())
}

/// Write the zip container to any seekable sink and hand the sink back.
pub fn write_container<W: Write + Seek>(writer: W, data: &[u8], media: &[PathBuf]) -> Result<W> {
    let names = media_entry_names(media)?;
    let mut zip = ZipWriter::new(writer);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    zip.start_file(DATA_JSON, options)?;
    zip.write_all(data)?;

    for (path, name) in media.iter().zip(&names) {
        let bytes = fs::read(path)?;
        zip.start_file(name.as_str(), options)?;
        zip.write_all(&bytes)?;
    }

    Ok(zip.finish()?)
}

/// Entry names for the media files, checked before anything is written.
fn media_entry_names(media: &[PathBuf]) -> Result<Vec<String>> {
    let mut names: Vec<String> = Vec::with_capacity(media.len());
    for path in media {
        let name = media_entry_name(path)?;
        if names.contains(&name) {
            return Err(MochiError::InvalidPath(format!(
                "two media files share the name {}: {}",
                name,
                path.display()
            )));
        }
        names.push(name);
    }
    Ok(names)
}

fn media_entry_name(path: &Path) -> Result<String> {
    let name = path.file_name().and_then(|n| n.to_str()).ok_or_else(|| {
        MochiError::InvalidPath(format!("invalid media file path: {}", path.display()))
    })?;
    if is_schema_entry(name) {
        return Err(MochiError::InvalidPath(format!(
            "media file name collides with the document entry: {}",
            name
        )));
    }
    Ok(name.to_string())
}

fn temp_sibling(dest: &Path) -> Result<PathBuf> {
    let file_name = dest
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            MochiError::InvalidPath(format!("invalid archive path: {}", dest.display()))
        })?;
    let tmp_name = format!(".{}.{}.tmp", file_name, Uuid::new_v4().simple());
    Ok(dest.with_file_name(tmp_name))
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::io::Write;
    use std::path::Path;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    /// Write a zip with the given `(name, contents)` entries.
    pub fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
        let file = std::fs::File::create(path).unwrap();
        let mut zip = ZipWriter::new(file);
        for (name, contents) in entries {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(contents).unwrap();
        }
        zip.finish().unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::write_zip;
    use super::*;
    use crate::interchange::schema::{ArchiveCard, ArchiveDeck};
    use crate::interchange::validate::ValidationError;
    use std::io::Cursor;
    use tempfile::tempdir;

    fn sample() -> ArchiveDocument {
        ArchiveDocument {
            decks: vec![ArchiveDeck {
                id: Some("d1".into()),
                name: "Spanish".into(),
                cards: vec![ArchiveCard {
                    content: "hola".into(),
                    deck_id: Some("d1".into()),
                    ..Default::default()
                }],
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.mochi");
        write_archive(&sample(), &path, ArchiveFormat::Json, &[]).unwrap();

        assert_eq!(read_document(&path).unwrap(), sample());
        validate_container(&path).unwrap();
    }

    #[test]
    fn test_write_leaves_no_temp_files() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.mochi");
        write_archive(&sample(), &path, ArchiveFormat::Json, &[]).unwrap();

        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["out.mochi".to_string()]);
    }

    #[test]
    fn test_invalid_document_is_not_written() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.mochi");
        let doc = ArchiveDocument {
            version: 1,
            ..Default::default()
        };

        let err = write_archive(&doc, &path, ArchiveFormat::Json, &[]).unwrap_err();
        assert!(matches!(
            err,
            MochiError::Validation(ValidationError::UnsupportedVersion(1))
        ));
        assert!(!path.exists());
    }

    #[test]
    fn test_failed_write_keeps_previous_archive() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.mochi");
        fs::write(&path, b"previous").unwrap();
        let missing_media = vec![dir.path().join("nope.png")];

        assert!(write_archive(&sample(), &path, ArchiveFormat::Json, &missing_media).is_err());
        assert_eq!(fs::read(&path).unwrap(), b"previous");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_edn_format_still_writes_json_entry() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.mochi");
        write_archive(&sample(), &path, ArchiveFormat::Edn, &[]).unwrap();

        let archive = open_archive(&path).unwrap();
        assert!(archive.index_for_name(DATA_JSON).is_some());
        assert!(archive.index_for_name(DATA_EDN).is_none());
    }

    #[test]
    fn test_media_files_are_attached() {
        let dir = tempdir().unwrap();
        let image = dir.path().join("cat.png");
        fs::write(&image, b"\x89PNG").unwrap();

        let data = encode_document(&sample(), ArchiveFormat::Json).unwrap();
        let cursor = write_container(Cursor::new(Vec::new()), &data, &[image]).unwrap();

        let mut archive = ZipArchive::new(cursor).unwrap();
        assert!(archive.index_for_name("cat.png").is_some());
        assert_eq!(read_document_from(&mut archive).unwrap(), sample());
    }

    #[test]
    fn test_media_named_like_schema_entry_is_rejected() {
        let dir = tempdir().unwrap();
        let clash = dir.path().join(DATA_JSON);
        fs::write(&clash, b"{}").unwrap();

        let result = write_container(Cursor::new(Vec::new()), b"{}", &[clash]);
        assert!(matches!(result, Err(MochiError::InvalidPath(_))));
    }

    #[test]
    fn test_duplicate_media_names_are_rejected_before_writing() {
        let dir = tempdir().unwrap();
        for sub in ["a", "b"] {
            fs::create_dir(dir.path().join(sub)).unwrap();
            fs::write(dir.path().join(sub).join("cat.png"), sub).unwrap();
        }
        let media = vec![dir.path().join("a/cat.png"), dir.path().join("b/cat.png")];
        let path = dir.path().join("out.mochi");

        let err = write_archive(&sample(), &path, ArchiveFormat::Json, &media).unwrap_err();
        match err {
            MochiError::InvalidPath(message) => assert!(message.contains("cat.png")),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!path.exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[test]
    fn test_archive_path_without_file_name_is_invalid() {
        assert!(matches!(
            write_archive(&sample(), Path::new("/"), ArchiveFormat::Json, &[]),
            Err(MochiError::InvalidPath(_))
        ));
    }

    #[test]
    fn test_missing_schema_entry() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bare.mochi");
        write_zip(&path, &[("images/cat.png", b"png")]);

        assert!(matches!(read_document(&path), Err(MochiError::NoDataEntry)));
        assert!(matches!(
            validate_container(&path),
            Err(MochiError::NoDataEntry)
        ));
    }

    #[test]
    fn test_edn_entry_is_parsed_as_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("legacy.mochi");
        write_zip(&path, &[(DATA_EDN, br#"{"version": 2}"#)]);

        let doc = read_document(&path).unwrap();
        assert_eq!(doc.version, 2);
    }

    #[test]
    fn test_not_a_zip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("plain.mochi");
        fs::write(&path, b"just text").unwrap();

        assert!(matches!(
            validate_container(&path),
            Err(MochiError::Archive(_))
        ));
    }

    #[test]
    fn test_malformed_document_is_serialization_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.mochi");
        write_zip(&path, &[(DATA_JSON, b"{not json")]);

        assert!(matches!(
            read_document(&path),
            Err(MochiError::Serialization(_))
        ));
    }
}
