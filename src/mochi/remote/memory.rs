use super::RemoteClient;
use crate::error::{MochiError, Result};
use crate::model::{
    Card, CardUpdate, Deck, DeckUpdate, NewCard, NewDeck, NewTemplate, Page, Template,
};
use chrono::NaiveDate;
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashSet};

/// Bookmark behaviours seen from the real service on the final page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BookmarkQuirk {
    /// The final page carries an empty bookmark.
    #[default]
    None,
    /// The final data page still carries a bookmark; following it yields an
    /// empty page that echoes the same bookmark.
    TrailingEmptyPage,
    /// The final page repeats the bookmark it was requested with.
    RepeatLast,
}

/// In-memory Mochi service for testing.
///
/// Uses `RefCell`/`Cell` for interior mutability since the interchange core is
/// single-threaded, which lets [`RemoteClient`] keep `&self` methods.
///
/// Identifiers are assigned sequentially (`deck-1`, `card-1`, ...) so tests can
/// predict them. Bookmarks are stringified offsets into the listing.
///
/// A card is due on a date when its latest review is due on or before that
/// date; unreviewed and archived cards are never due.
pub struct InMemoryRemote {
    decks: RefCell<Vec<Deck>>,
    cards: RefCell<Vec<Card>>,
    templates: RefCell<Vec<Template>>,
    /// Attachment bytes keyed by card id, then file name.
    attachments: RefCell<BTreeMap<String, BTreeMap<String, Vec<u8>>>>,
    page_size: usize,
    bookmark_quirk: BookmarkQuirk,
    next_id: Cell<usize>,
    list_card_calls: Cell<usize>,
    create_deck_calls: Cell<usize>,
    create_card_calls: Cell<usize>,
    create_template_calls: Cell<usize>,
    failing_deck_names: RefCell<HashSet<String>>,
    failing_card_contents: RefCell<HashSet<String>>,
    failing_template_names: RefCell<HashSet<String>>,
    failing_card_page: Cell<Option<usize>>,
}

impl Default for InMemoryRemote {
    fn default() -> Self {
        Self {
            decks: RefCell::new(Vec::new()),
            cards: RefCell::new(Vec::new()),
            templates: RefCell::new(Vec::new()),
            attachments: RefCell::new(BTreeMap::new()),
            page_size: 100,
            bookmark_quirk: BookmarkQuirk::None,
            next_id: Cell::new(1),
            list_card_calls: Cell::new(0),
            create_deck_calls: Cell::new(0),
            create_card_calls: Cell::new(0),
            create_template_calls: Cell::new(0),
            failing_deck_names: RefCell::new(HashSet::new()),
            failing_card_contents: RefCell::new(HashSet::new()),
            failing_template_names: RefCell::new(HashSet::new()),
            failing_card_page: Cell::new(None),
        }
    }
}

impl InMemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Largest page the service will return, whatever limit is requested.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_bookmark_quirk(mut self, quirk: BookmarkQuirk) -> Self {
        self.bookmark_quirk = quirk;
        self
    }

    fn fresh_id(&self, prefix: &str) -> String {
        let n = self.next_id.get();
        self.next_id.set(n + 1);
        format!("{}-{}", prefix, n)
    }

    /// Insert a deck directly, bypassing call counters and failure rules.
    pub fn seed_deck(&self, name: &str, parent_id: Option<&str>) -> Deck {
        let deck = Deck {
            id: self.fresh_id("deck"),
            name: name.to_string(),
            parent_id: parent_id.map(str::to_string),
            ..Default::default()
        };
        self.decks.borrow_mut().push(deck.clone());
        deck
    }

    /// Insert a card directly.
    pub fn seed_card(&self, card: Card) -> Card {
        let mut card = card;
        if card.id.is_empty() {
            card.id = self.fresh_id("card");
        }
        self.cards.borrow_mut().push(card.clone());
        card
    }

    /// Insert `count` numbered cards into a deck.
    pub fn seed_cards(&self, deck_id: &str, count: usize) {
        for i in 0..count {
            self.seed_card(Card {
                content: format!("Card {}", i + 1),
                deck_id: deck_id.to_string(),
                pos: format!("{:04}", i),
                ..Default::default()
            });
        }
    }

    pub fn seed_template(&self, name: &str) -> Template {
        let template = Template {
            id: self.fresh_id("template"),
            name: name.to_string(),
            ..Default::default()
        };
        self.templates.borrow_mut().push(template.clone());
        template
    }

    /// Make `create_deck` reject decks with this name.
    pub fn fail_deck_named(&self, name: &str) {
        self.failing_deck_names.borrow_mut().insert(name.to_string());
    }

    /// Make `create_card` reject cards with this content.
    pub fn fail_card_content(&self, content: &str) {
        self.failing_card_contents
            .borrow_mut()
            .insert(content.to_string());
    }

    /// Make `create_template` reject templates with this name.
    pub fn fail_template_named(&self, name: &str) {
        self.failing_template_names
            .borrow_mut()
            .insert(name.to_string());
    }

    /// Make the n-th (1-based) `list_cards` call fail.
    pub fn fail_card_page(&self, call: usize) {
        self.failing_card_page.set(Some(call));
    }

    pub fn list_card_calls(&self) -> usize {
        self.list_card_calls.get()
    }

    pub fn create_deck_calls(&self) -> usize {
        self.create_deck_calls.get()
    }

    pub fn create_card_calls(&self) -> usize {
        self.create_card_calls.get()
    }

    pub fn create_template_calls(&self) -> usize {
        self.create_template_calls.get()
    }

    pub fn templates(&self) -> Vec<Template> {
        self.templates.borrow().clone()
    }

    /// File names attached to a card, sorted.
    pub fn attachments(&self, card_id: &str) -> Vec<String> {
        self.attachments
            .borrow()
            .get(card_id)
            .map(|files| files.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn decks(&self) -> Vec<Deck> {
        self.decks.borrow().clone()
    }

    pub fn cards(&self) -> Vec<Card> {
        self.cards.borrow().clone()
    }

    pub fn cards_in(&self, deck_id: &str) -> Vec<Card> {
        self.cards
            .borrow()
            .iter()
            .filter(|c| c.deck_id == deck_id)
            .cloned()
            .collect()
    }

    fn paginate<T: Clone>(
        &self,
        items: &[T],
        limit: Option<usize>,
        bookmark: Option<&str>,
    ) -> Result<Page<T>> {
        let start = match bookmark {
            Some(b) => b.parse::<usize>().map_err(|_| MochiError::Remote {
                status: 400,
                message: format!("invalid bookmark: {}", b),
            })?,
            None => 0,
        };
        let size = limit.unwrap_or(self.page_size).min(self.page_size).max(1);
        let end = (start + size).min(items.len());
        let docs = items.get(start..end).map(<[T]>::to_vec).unwrap_or_default();
        let bookmark = if end < items.len() {
            Some(end.to_string())
        } else {
            match self.bookmark_quirk {
                BookmarkQuirk::None => Some(String::new()),
                BookmarkQuirk::TrailingEmptyPage => Some(end.to_string()),
                BookmarkQuirk::RepeatLast => Some(bookmark.unwrap_or_default().to_string()),
            }
        };
        Ok(Page::new(docs, bookmark))
    }

    fn ensure_card(&self, id: &str) -> Result<()> {
        if self.cards.borrow().iter().any(|c| c.id == id) {
            Ok(())
        } else {
            Err(MochiError::NotFound(format!("card {}", id)))
        }
    }
}

fn is_due(card: &Card, date: NaiveDate) -> bool {
    !card.archived
        && card
            .reviews
            .iter()
            .max_by_key(|r| r.date)
            .is_some_and(|r| r.due.date_naive() <= date)
}

impl RemoteClient for InMemoryRemote {
    fn list_cards(
        &self,
        deck_id: Option<&str>,
        limit: Option<usize>,
        bookmark: Option<&str>,
    ) -> Result<Page<Card>> {
        let call = self.list_card_calls.get() + 1;
        self.list_card_calls.set(call);
        if self.failing_card_page.get() == Some(call) {
            return Err(MochiError::Remote {
                status: 500,
                message: "Simulated listing failure".to_string(),
            });
        }

        let cards: Vec<Card> = self
            .cards
            .borrow()
            .iter()
            .filter(|c| deck_id.map_or(true, |d| c.deck_id == d))
            .cloned()
            .collect();
        self.paginate(&cards, limit, bookmark)
    }

    fn get_card(&self, id: &str) -> Result<Card> {
        self.cards
            .borrow()
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| MochiError::NotFound(format!("card {}", id)))
    }

    fn create_card(&self, card: &NewCard) -> Result<Card> {
        self.create_card_calls.set(self.create_card_calls.get() + 1);
        if self.failing_card_contents.borrow().contains(&card.content) {
            return Err(MochiError::Remote {
                status: 422,
                message: format!("rejected card content '{}'", card.content),
            });
        }
        if card.deck_id.is_empty() {
            return Err(MochiError::Remote {
                status: 400,
                message: "deck-id is required".to_string(),
            });
        }

        let created = Card {
            id: self.fresh_id("card"),
            content: card.content.clone(),
            name: card.name.clone(),
            deck_id: card.deck_id.clone(),
            template_id: card.template_id.clone(),
            pos: card.pos.clone().unwrap_or_default(),
            fields: card.fields.clone(),
            manual_tags: card.manual_tags.clone(),
            ..Default::default()
        };
        self.cards.borrow_mut().push(created.clone());
        Ok(created)
    }

    fn update_card(&self, id: &str, update: &CardUpdate) -> Result<Card> {
        let mut cards = self.cards.borrow_mut();
        let card = cards
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| MochiError::NotFound(format!("card {}", id)))?;
        update.apply_to(card);
        Ok(card.clone())
    }

    fn delete_card(&self, id: &str) -> Result<()> {
        self.ensure_card(id)?;
        self.cards.borrow_mut().retain(|c| c.id != id);
        self.attachments.borrow_mut().remove(id);
        Ok(())
    }

    fn add_attachment(&self, card_id: &str, file_name: &str, data: Vec<u8>) -> Result<()> {
        self.ensure_card(card_id)?;
        self.attachments
            .borrow_mut()
            .entry(card_id.to_string())
            .or_default()
            .insert(file_name.to_string(), data);
        Ok(())
    }

    fn delete_attachment(&self, card_id: &str, file_name: &str) -> Result<()> {
        self.ensure_card(card_id)?;
        self.attachments
            .borrow_mut()
            .get_mut(card_id)
            .and_then(|files| files.remove(file_name))
            .map(|_| ())
            .ok_or_else(|| {
                MochiError::NotFound(format!("attachment {} on card {}", file_name, card_id))
            })
    }

    fn due_cards(&self, date: NaiveDate, deck_id: Option<&str>) -> Result<Vec<Card>> {
        if let Some(deck) = deck_id {
            self.get_deck(deck)?;
        }
        Ok(self
            .cards
            .borrow()
            .iter()
            .filter(|c| deck_id.map_or(true, |d| c.deck_id == d))
            .filter(|c| is_due(c, date))
            .cloned()
            .collect())
    }

    fn list_decks(&self, bookmark: Option<&str>) -> Result<Page<Deck>> {
        let decks = self.decks.borrow().clone();
        self.paginate(&decks, None, bookmark)
    }

    fn get_deck(&self, id: &str) -> Result<Deck> {
        self.decks
            .borrow()
            .iter()
            .find(|d| d.id == id)
            .cloned()
            .ok_or_else(|| MochiError::NotFound(format!("deck {}", id)))
    }

    fn create_deck(&self, deck: &NewDeck) -> Result<Deck> {
        self.create_deck_calls.set(self.create_deck_calls.get() + 1);
        if self.failing_deck_names.borrow().contains(&deck.name) {
            return Err(MochiError::Remote {
                status: 422,
                message: format!("rejected deck name '{}'", deck.name),
            });
        }

        let created = Deck {
            id: self.fresh_id("deck"),
            name: deck.name.clone(),
            parent_id: deck.parent_id.clone(),
            sort: deck.sort.unwrap_or_default(),
            ..Default::default()
        };
        self.decks.borrow_mut().push(created.clone());
        Ok(created)
    }

    fn update_deck(&self, id: &str, update: &DeckUpdate) -> Result<Deck> {
        let mut decks = self.decks.borrow_mut();
        let deck = decks
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| MochiError::NotFound(format!("deck {}", id)))?;
        update.apply_to(deck);
        Ok(deck.clone())
    }

    fn delete_deck(&self, id: &str) -> Result<()> {
        self.get_deck(id)?;
        self.decks.borrow_mut().retain(|d| d.id != id);
        Ok(())
    }

    fn list_templates(&self, bookmark: Option<&str>) -> Result<Page<Template>> {
        let templates = self.templates.borrow().clone();
        self.paginate(&templates, None, bookmark)
    }

    fn get_template(&self, id: &str) -> Result<Template> {
        self.templates
            .borrow()
            .iter()
            .find(|t| t.id == id)
            .cloned()
            .ok_or_else(|| MochiError::NotFound(format!("template {}", id)))
    }

    fn create_template(&self, template: &NewTemplate) -> Result<Template> {
        self.create_template_calls
            .set(self.create_template_calls.get() + 1);
        if self.failing_template_names.borrow().contains(&template.name) {
            return Err(MochiError::Remote {
                status: 422,
                message: format!("rejected template name '{}'", template.name),
            });
        }

        let created = Template {
            id: self.fresh_id("template"),
            name: template.name.clone(),
            content: template.content.clone(),
            pos: template.pos.clone().unwrap_or_default(),
            fields: template.fields.clone(),
        };
        self.templates.borrow_mut().push(created.clone());
        Ok(created)
    }
}
