use super::schema::{ArchiveDocument, SCHEMA_VERSION};
use std::collections::HashSet;
use thiserror::Error;

/// The first consistency rule a document breaks.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("unsupported version: {0} (only version {SCHEMA_VERSION} is supported)")]
    UnsupportedVersion(i64),

    #[error("duplicate deck ID: {0}")]
    DuplicateDeckId(String),

    #[error("top-level card must have deck-id: {0}")]
    MissingDeckReference(String),

    #[error("card references non-existent deck: {0}")]
    DanglingDeckReference(String),

    #[error("nested card deck-id mismatch: card has {card_deck}, parent deck is {parent_deck}")]
    DeckReferenceMismatch {
        card_deck: String,
        parent_deck: String,
    },
}

/// Check a document against the archive rules, reporting the first violation.
///
/// Rules run in a fixed order, so a document breaking several always reports
/// the same one:
///
/// 1. `version` is 2
/// 2. deck identifiers are unique (decks without one are exempt)
/// 3. every top-level card names a deck
/// 4. every top-level card's deck is defined in the document
/// 5. a nested card that names a deck names its parent
///
/// Pure: touches nothing but the document.
pub fn validate(doc: &ArchiveDocument) -> Result<(), ValidationError> {
    if doc.version != SCHEMA_VERSION {
        return Err(ValidationError::UnsupportedVersion(doc.version));
    }

    let mut deck_ids = HashSet::new();
    for id in doc.decks.iter().filter_map(|d| d.id()) {
        if !deck_ids.insert(id) {
            return Err(ValidationError::DuplicateDeckId(id.to_string()));
        }
    }

    if let Some(card) = doc.cards.iter().find(|c| c.deck_id().is_none()) {
        return Err(ValidationError::MissingDeckReference(card.label()));
    }

    for card in &doc.cards {
        if let Some(deck_ref) = card.deck_id() {
            if !deck_ids.contains(deck_ref) {
                return Err(ValidationError::DanglingDeckReference(deck_ref.to_string()));
            }
        }
    }

    for deck in &doc.decks {
        let parent = deck.id().unwrap_or_default();
        for card in &deck.cards {
            match card.deck_id() {
                Some(card_deck) if card_deck != parent => {
                    return Err(ValidationError::DeckReferenceMismatch {
                        card_deck: card_deck.to_string(),
                        parent_deck: parent.to_string(),
                    });
                }
                _ => {}
            }
        }
    }

    Ok(())
}
