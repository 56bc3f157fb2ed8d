use crate::commands::{CmdMessage, CmdResult};
use crate::error::{MochiError, Result};
use crate::model::{CardUpdate, NewCard};
use crate::remote::{search_cards, RemoteClient};

/// One page of cards; the bookmark for the next page is carried in the result.
pub fn list<R: RemoteClient + ?Sized>(
    remote: &R,
    deck_id: Option<&str>,
    limit: Option<usize>,
    bookmark: Option<&str>,
) -> Result<CmdResult> {
    let page = remote.list_cards(deck_id, limit, bookmark)?;
    let next = page.next_bookmark().map(str::to_string);

    let mut result = CmdResult::default();
    if page.docs.is_empty() {
        result.add_message(CmdMessage::info("No cards found."));
    }
    Ok(result.with_cards(page.docs).with_bookmark(next))
}

pub fn get<R: RemoteClient + ?Sized>(remote: &R, id: &str) -> Result<CmdResult> {
    let card = remote.get_card(id)?;
    Ok(CmdResult::default().with_cards(vec![card]))
}

pub fn create<R: RemoteClient + ?Sized>(
    remote: &R,
    card: NewCard,
    dry_run: bool,
) -> Result<CmdResult> {
    if card.deck_id.is_empty() {
        return Err(MochiError::Api("A deck id is required to create a card".into()));
    }
    if card.content.trim().is_empty() {
        return Err(MochiError::Api("Card content cannot be empty".into()));
    }

    let mut result = CmdResult::default();
    if dry_run {
        result.add_message(CmdMessage::info(format!(
            "Dry run: would create a card in deck {}",
            card.deck_id
        )));
        return Ok(result);
    }

    let created = remote.create_card(&card)?;
    result.add_message(CmdMessage::success(format!("Created card {}", created.id)));
    Ok(result.with_cards(vec![created]))
}

/// Change a card's content, name, deck, template or archived flag.
pub fn update<R: RemoteClient + ?Sized>(
    remote: &R,
    id: &str,
    update: CardUpdate,
    dry_run: bool,
) -> Result<CmdResult> {
    if update.is_empty() {
        return Err(MochiError::Api("Nothing to update".into()));
    }
    if update.content.as_deref().is_some_and(|c| c.trim().is_empty()) {
        return Err(MochiError::Api("Card content cannot be empty".into()));
    }

    remote.get_card(id)?;
    let mut result = CmdResult::default();
    if dry_run {
        result.add_message(CmdMessage::info(format!("Dry run: would update card {}", id)));
        return Ok(result);
    }

    let updated = remote.update_card(id, &update)?;
    result.add_message(CmdMessage::success(format!("Updated card {}", updated.id)));
    Ok(result.with_cards(vec![updated]))
}

pub fn delete<R: RemoteClient + ?Sized>(remote: &R, id: &str, dry_run: bool) -> Result<CmdResult> {
    remote.get_card(id)?;
    let mut result = CmdResult::default();
    if dry_run {
        result.add_message(CmdMessage::info(format!("Dry run: would delete card {}", id)));
        return Ok(result);
    }

    remote.delete_card(id)?;
    result.add_message(CmdMessage::success(format!("Deleted card {}", id)));
    Ok(result)
}

/// Cards whose content or name contains `query`, ignoring case.
pub fn search<R: RemoteClient + ?Sized>(
    remote: &R,
    query: &str,
    deck_id: Option<&str>,
) -> Result<CmdResult> {
    if query.trim().is_empty() {
        return Err(MochiError::Api("Search query cannot be empty".into()));
    }

    let cards = search_cards(remote, query, deck_id)?;
    let mut result = CmdResult::default();
    if cards.is_empty() {
        result.add_message(CmdMessage::info(format!("No cards match '{}'.", query)));
    }
    Ok(result.with_cards(cards))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Card;
    use crate::remote::memory::InMemoryRemote;

    #[test]
    fn test_list_returns_bookmark_for_next_page() {
        let remote = InMemoryRemote::new().with_page_size(2);
        let deck = remote.seed_deck("Spanish", None);
        remote.seed_cards(&deck.id, 3);

        let first = list(&remote, Some(&deck.id), None, None).unwrap();
        assert_eq!(first.cards.len(), 2);
        assert_eq!(first.bookmark.as_deref(), Some("2"));

        let second = list(&remote, Some(&deck.id), None, first.bookmark.as_deref()).unwrap();
        assert_eq!(second.cards.len(), 1);
        assert_eq!(second.bookmark, None);
    }

    #[test]
    fn test_create_requires_deck() {
        let remote = InMemoryRemote::new();
        let card = NewCard {
            content: "hola".into(),
            ..Default::default()
        };
        assert!(matches!(
            create(&remote, card, false),
            Err(MochiError::Api(_))
        ));
    }

    #[test]
    fn test_create_and_get() {
        let remote = InMemoryRemote::new();
        let deck = remote.seed_deck("Spanish", None);
        let card = NewCard {
            content: "hola\n---\nhello".into(),
            deck_id: deck.id.clone(),
            ..Default::default()
        };

        let created = create(&remote, card, false).unwrap();
        let fetched = get(&remote, &created.cards[0].id).unwrap();
        assert_eq!(fetched.cards[0].deck_id, deck.id);
    }

    fn seeded() -> (InMemoryRemote, String) {
        let remote = InMemoryRemote::new();
        let deck = remote.seed_deck("Spanish", None);
        let card = remote.seed_card(Card {
            content: "hola".into(),
            deck_id: deck.id.clone(),
            ..Default::default()
        });
        (remote, card.id)
    }

    #[test]
    fn test_update_changes_only_given_fields() {
        let (remote, id) = seeded();
        let change = CardUpdate {
            name: Some("greeting".into()),
            ..Default::default()
        };

        let result = update(&remote, &id, change, false).unwrap();
        assert_eq!(result.cards[0].name.as_deref(), Some("greeting"));
        assert_eq!(result.cards[0].content, "hola");
        assert_eq!(result.messages[0].content, format!("Updated card {}", id));
    }

    #[test]
    fn test_update_rejects_empty_change_and_blank_content() {
        let (remote, id) = seeded();
        assert!(update(&remote, &id, CardUpdate::default(), false).is_err());
        let blank = CardUpdate {
            content: Some("  ".into()),
            ..Default::default()
        };
        assert!(matches!(
            update(&remote, &id, blank, false),
            Err(MochiError::Api(_))
        ));
    }

    #[test]
    fn test_update_dry_run_keeps_card() {
        let (remote, id) = seeded();
        let change = CardUpdate {
            archived: Some(true),
            ..Default::default()
        };
        update(&remote, &id, change, true).unwrap();
        assert!(!remote.cards()[0].archived);
    }

    #[test]
    fn test_delete_card() {
        let (remote, id) = seeded();

        delete(&remote, &id, true).unwrap();
        assert_eq!(remote.cards().len(), 1);

        delete(&remote, &id, false).unwrap();
        assert!(remote.cards().is_empty());
        assert!(matches!(
            delete(&remote, &id, false),
            Err(MochiError::NotFound(_))
        ));
    }

    #[test]
    fn test_search_reports_no_matches() {
        let (remote, _) = seeded();

        let found = search(&remote, "HOLA", None).unwrap();
        assert_eq!(found.cards.len(), 1);

        let missing = search(&remote, "ciao", None).unwrap();
        assert!(missing.cards.is_empty());
        assert_eq!(missing.messages[0].content, "No cards match 'ciao'.");
    }

    #[test]
    fn test_create_dry_run() {
        let remote = InMemoryRemote::new();
        let card = NewCard {
            content: "hola".into(),
            deck_id: "d1".into(),
            ..Default::default()
        };
        create(&remote, card, true).unwrap();
        assert_eq!(remote.create_card_calls(), 0);
    }
}
