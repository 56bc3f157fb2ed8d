use crate::commands::{CmdMessage, CmdResult};
use crate::error::{MochiError, Result};
use crate::model::{DeckUpdate, NewDeck};
use crate::remote::{fetch_all_decks, RemoteClient};

pub fn list<R: RemoteClient + ?Sized>(remote: &R) -> Result<CmdResult> {
    let decks = fetch_all_decks(remote)?;
    let mut result = CmdResult::default();
    if decks.is_empty() {
        result.add_message(CmdMessage::info("No decks found."));
    }
    Ok(result.with_decks(decks))
}

pub fn get<R: RemoteClient + ?Sized>(remote: &R, id: &str) -> Result<CmdResult> {
    let deck = remote.get_deck(id)?;
    Ok(CmdResult::default().with_decks(vec![deck]))
}

pub fn create<R: RemoteClient + ?Sized>(
    remote: &R,
    deck: NewDeck,
    dry_run: bool,
) -> Result<CmdResult> {
    if deck.name.trim().is_empty() {
        return Err(MochiError::Api("Deck name cannot be empty".into()));
    }

    let mut result = CmdResult::default();
    if dry_run {
        let parent = deck
            .parent_id
            .as_deref()
            .map(|p| format!(" under {}", p))
            .unwrap_or_default();
        result.add_message(CmdMessage::info(format!(
            "Dry run: would create deck '{}'{}",
            deck.name, parent
        )));
        return Ok(result);
    }

    let created = remote.create_deck(&deck)?;
    result.add_message(CmdMessage::success(format!(
        "Created deck '{}' ({})",
        created.name, created.id
    )));
    Ok(result.with_decks(vec![created]))
}

/// Change a deck's name, parent, sort order or archived flag.
///
/// The deck is fetched first so an unknown id fails before anything is sent.
pub fn update<R: RemoteClient + ?Sized>(
    remote: &R,
    id: &str,
    update: DeckUpdate,
    dry_run: bool,
) -> Result<CmdResult> {
    if update.is_empty() {
        return Err(MochiError::Api("Nothing to update".into()));
    }
    if update.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        return Err(MochiError::Api("Deck name cannot be empty".into()));
    }

    let current = remote.get_deck(id)?;
    let mut result = CmdResult::default();
    if dry_run {
        result.add_message(CmdMessage::info(format!(
            "Dry run: would update deck '{}' ({})",
            current.name, current.id
        )));
        return Ok(result);
    }

    let updated = remote.update_deck(id, &update)?;
    result.add_message(CmdMessage::success(format!(
        "Updated deck '{}' ({})",
        updated.name, updated.id
    )));
    Ok(result.with_decks(vec![updated]))
}

pub fn delete<R: RemoteClient + ?Sized>(remote: &R, id: &str, dry_run: bool) -> Result<CmdResult> {
    let deck = remote.get_deck(id)?;
    let mut result = CmdResult::default();
    if dry_run {
        result.add_message(CmdMessage::info(format!(
            "Dry run: would delete deck '{}' ({})",
            deck.name, deck.id
        )));
        return Ok(result);
    }

    remote.delete_deck(id)?;
    result.add_message(CmdMessage::success(format!(
        "Deleted deck '{}' ({})",
        deck.name, deck.id
    )));
    Ok(result)
}
