use super::schema::{
    ArchiveCard, ArchiveDeck, ArchiveDocument, ArchiveReview, ExportOptions, SCHEMA_VERSION,
};
use crate::error::Result;
use crate::model::{Card, Deck, Review};
use crate::remote::{fetch_all_cards, fetch_all_decks, RemoteClient};
use serde_json::Value;
use std::collections::HashSet;

/// Timestamp layout for archived reviews, always UTC.
pub const REVIEW_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Builds archive documents from the live service.
///
/// Every export is all-or-nothing: the first failed remote call aborts it.
/// Templates are never exported.
pub struct Exporter<'a, R: RemoteClient + ?Sized> {
    remote: &'a R,
}

impl<'a, R: RemoteClient + ?Sized> Exporter<'a, R> {
    pub fn new(remote: &'a R) -> Self {
        Self { remote }
    }

    /// Export one deck with all of its cards.
    pub fn export_deck(&self, deck_id: &str, opts: &ExportOptions) -> Result<ArchiveDocument> {
        let deck = self.remote.get_deck(deck_id)?;
        let deck = self.collect_deck(&deck, opts)?;

        Ok(ArchiveDocument {
            version: SCHEMA_VERSION,
            decks: vec![deck],
            ..Default::default()
        })
    }

    /// Export every deck the account can see, parents ahead of their children.
    pub fn export_all_decks(&self, opts: &ExportOptions) -> Result<ArchiveDocument> {
        let decks = parents_first(fetch_all_decks(self.remote)?);

        let mut exported = Vec::with_capacity(decks.len());
        for deck in &decks {
            exported.push(self.collect_deck(deck, opts)?);
        }

        Ok(ArchiveDocument {
            version: SCHEMA_VERSION,
            decks: exported,
            ..Default::default()
        })
    }

    /// Export a hand-picked set of cards as top-level cards.
    ///
    /// Cards that cannot be fetched are skipped. When `deck_id` is given every
    /// card is filed under it, and the deck itself is exported (without its
    /// other cards) so the document stays self-contained. Otherwise each card's
    /// own deck is exported alongside it.
    pub fn export_cards(
        &self,
        card_ids: &[String],
        deck_id: Option<&str>,
        opts: &ExportOptions,
    ) -> Result<ArchiveDocument> {
        let mut cards = Vec::new();
        for id in card_ids {
            match self.remote.get_card(id) {
                Ok(card) => cards.push(card),
                Err(e) => tracing::warn!(card = %id, error = %e, "skipping card"),
            }
        }

        let mut deck_ids: Vec<String> = Vec::new();
        let mut archived = Vec::with_capacity(cards.len());
        for card in &cards {
            let mut entry = card_to_archive(card, opts.include_reviews);
            if let Some(target) = deck_id {
                entry.deck_id = Some(target.to_string());
            }
            if let Some(d) = entry.deck_id.clone() {
                if !deck_ids.contains(&d) {
                    deck_ids.push(d);
                }
            }
            archived.push(entry);
        }

        let mut decks = Vec::with_capacity(deck_ids.len());
        for id in &deck_ids {
            decks.push(deck_to_archive(&self.remote.get_deck(id)?, Vec::new()));
        }

        Ok(ArchiveDocument {
            version: SCHEMA_VERSION,
            decks,
            cards: archived,
            ..Default::default()
        })
    }

    fn collect_deck(&self, deck: &Deck, opts: &ExportOptions) -> Result<ArchiveDeck> {
        let cards = fetch_all_cards(self.remote, &deck.id)?;
        tracing::debug!(deck = %deck.id, cards = cards.len(), "collected deck");

        let cards = cards
            .iter()
            .map(|c| card_to_archive(c, opts.include_reviews))
            .collect();
        Ok(deck_to_archive(deck, cards))
    }
}

pub fn deck_to_archive(deck: &Deck, cards: Vec<ArchiveCard>) -> ArchiveDeck {
    ArchiveDeck {
        id: Some(deck.id.clone()).filter(|s| !s.is_empty()),
        name: deck.name.clone(),
        parent_id: deck.parent_id.clone().filter(|s| !s.is_empty()),
        cards,
    }
}

/// Convert a live card to its archive record.
///
/// Field values become plain JSON strings keyed by field id. Reviews are
/// carried only when asked for.
pub fn card_to_archive(card: &Card, include_reviews: bool) -> ArchiveCard {
    let fields = card
        .fields
        .values()
        .map(|f| (f.id.clone(), Value::String(f.value.clone())))
        .collect();

    let reviews = if include_reviews {
        card.reviews.iter().map(review_to_archive).collect()
    } else {
        Vec::new()
    };

    ArchiveCard {
        id: Some(card.id.clone()).filter(|s| !s.is_empty()),
        name: card.name.clone().filter(|s| !s.is_empty()),
        content: card.content.clone(),
        deck_id: Some(card.deck_id.clone()).filter(|s| !s.is_empty()),
        template_id: None,
        pos: Some(card.pos.clone()).filter(|s| !s.is_empty()),
        fields,
        reviews,
    }
}

fn review_to_archive(review: &Review) -> ArchiveReview {
    ArchiveReview {
        date: review.date.format(REVIEW_TIME_FORMAT).to_string(),
        due: review.due.format(REVIEW_TIME_FORMAT).to_string(),
        interval: 0,
        remembered: review.remembered,
    }
}

/// Reorder decks so that a parent listed in the same batch comes before its
/// children. Relative order is otherwise kept; decks caught in a parent cycle
/// are appended as listed.
fn parents_first(decks: Vec<Deck>) -> Vec<Deck> {
    let listed: HashSet<String> = decks.iter().map(|d| d.id.clone()).collect();
    let mut placed: HashSet<String> = HashSet::new();
    let mut pending = decks;
    let mut ordered = Vec::with_capacity(pending.len());

    while !pending.is_empty() {
        let (ready, waiting): (Vec<Deck>, Vec<Deck>) = pending.into_iter().partition(|d| {
            match d.parent_id.as_deref() {
                Some(p) if listed.contains(p) && p != d.id => placed.contains(p),
                _ => true,
            }
        });

        if ready.is_empty() {
            ordered.extend(waiting);
            break;
        }
        placed.extend(ready.iter().map(|d| d.id.clone()));
        ordered.extend(ready);
        pending = waiting;
    }

    ordered
}
