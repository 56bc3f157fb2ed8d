use crate::commands::{CmdMessage, CmdResult};
use crate::error::{MochiError, Result};
use crate::remote::RemoteClient;
use std::fs;
use std::path::Path;

/// Upload a local file to a card. The attachment is named after the file.
pub fn add<R: RemoteClient + ?Sized>(
    remote: &R,
    card_id: &str,
    path: &Path,
    dry_run: bool,
) -> Result<CmdResult> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| MochiError::InvalidPath(format!("not a file: {}", path.display())))?;
    if !path.is_file() {
        return Err(MochiError::NotFound(format!("file {}", path.display())));
    }

    let mut result = CmdResult::default();
    if dry_run {
        result.add_message(CmdMessage::info(format!(
            "Dry run: would attach {} to card {}",
            file_name, card_id
        )));
        return Ok(result);
    }

    let data = fs::read(path)?;
    remote.add_attachment(card_id, file_name, data)?;
    result.add_message(CmdMessage::success(format!(
        "Attachment added to card {}",
        card_id
    )));
    Ok(result)
}

pub fn delete<R: RemoteClient + ?Sized>(
    remote: &R,
    card_id: &str,
    file_name: &str,
    dry_run: bool,
) -> Result<CmdResult> {
    if file_name.is_empty() || file_name.contains('/') {
        return Err(MochiError::InvalidPath(format!(
            "invalid attachment name: {}",
            file_name
        )));
    }

    let mut result = CmdResult::default();
    if dry_run {
        result.add_message(CmdMessage::info(format!(
            "Dry run: would delete {} from card {}",
            file_name, card_id
        )));
        return Ok(result);
    }

    remote.delete_attachment(card_id, file_name)?;
    result.add_message(CmdMessage::success(format!(
        "Attachment deleted from card {}",
        card_id
    )));
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Card;
    use crate::remote::memory::InMemoryRemote;
    use tempfile::tempdir;

    fn remote_with_card() -> (InMemoryRemote, String) {
        let remote = InMemoryRemote::new();
        let card = remote.seed_card(Card {
            content: "hola".into(),
            deck_id: "deck-x".into(),
            ..Default::default()
        });
        (remote, card.id)
    }

    #[test]
    fn test_add_uses_file_name() {
        let dir = tempdir().unwrap();
        let image = dir.path().join("cat.png");
        fs::write(&image, b"png").unwrap();
        let (remote, card_id) = remote_with_card();

        let result = add(&remote, &card_id, &image, false).unwrap();
        assert_eq!(remote.attachments(&card_id), vec!["cat.png".to_string()]);
        assert_eq!(
            result.messages[0].content,
            format!("Attachment added to card {}", card_id)
        );
    }

    #[test]
    fn test_add_dry_run_uploads_nothing() {
        let dir = tempdir().unwrap();
        let image = dir.path().join("cat.png");
        fs::write(&image, b"png").unwrap();
        let (remote, card_id) = remote_with_card();

        add(&remote, &card_id, &image, true).unwrap();
        assert!(remote.attachments(&card_id).is_empty());
    }

    #[test]
    fn test_add_missing_file() {
        let dir = tempdir().unwrap();
        let (remote, card_id) = remote_with_card();
        assert!(matches!(
            add(&remote, &card_id, &dir.path().join("nope.png"), false),
            Err(MochiError::NotFound(_))
        ));
    }

    #[test]
    fn test_delete_attachment() {
        let (remote, card_id) = remote_with_card();
        remote
            .add_attachment(&card_id, "cat.png", b"png".to_vec())
            .unwrap();

        delete(&remote, &card_id, "cat.png", false).unwrap();
        assert!(remote.attachments(&card_id).is_empty());
        assert!(matches!(
            delete(&remote, &card_id, "../cat.png", false),
            Err(MochiError::InvalidPath(_))
        ));
    }
}
