//! # Remote Layer
//!
//! The [`RemoteClient`] trait is the narrow contract the rest of the crate needs
//! from the Mochi service: paginated listing, fetch by id and creation for
//! cards, decks and templates, plus updates and deletes of cards and decks,
//! card attachments and the due-cards listing.
//!
//! ## Implementations
//!
//! - [`http::HttpClient`]: production client speaking to the service over HTTPS.
//! - [`memory::InMemoryRemote`]: in-memory service for tests, with configurable
//!   page size, injected failures and call counters.
//!
//! ## Pagination Contract
//!
//! Listing calls return a [`Page`]. An absent or empty bookmark signals the final
//! page; callers must not request further pages after that. See
//! [`Page::next_bookmark`].
//!
//! All calls are blocking. Timeouts and transport policy belong to the
//! implementation, not to callers.

use crate::error::Result;
use crate::model::{
    Card, CardUpdate, Deck, DeckUpdate, NewCard, NewDeck, NewTemplate, Page, Template,
};
use chrono::NaiveDate;

pub mod http;
pub mod memory;

/// Page size used when walking a full card listing.
pub const CARD_PAGE_LIMIT: usize = 100;

pub trait RemoteClient {
    /// List cards, optionally restricted to one deck.
    fn list_cards(
        &self,
        deck_id: Option<&str>,
        limit: Option<usize>,
        bookmark: Option<&str>,
    ) -> Result<Page<Card>>;

    fn get_card(&self, id: &str) -> Result<Card>;

    fn create_card(&self, card: &NewCard) -> Result<Card>;

    fn update_card(&self, id: &str, update: &CardUpdate) -> Result<Card>;

    fn delete_card(&self, id: &str) -> Result<()>;

    /// Attach a file to a card under `file_name`.
    fn add_attachment(&self, card_id: &str, file_name: &str, data: Vec<u8>) -> Result<()>;

    fn delete_attachment(&self, card_id: &str, file_name: &str) -> Result<()>;

    /// Cards due for review on `date`, optionally restricted to one deck.
    fn due_cards(&self, date: NaiveDate, deck_id: Option<&str>) -> Result<Vec<Card>>;

    fn list_decks(&self, bookmark: Option<&str>) -> Result<Page<Deck>>;

    fn get_deck(&self, id: &str) -> Result<Deck>;

    fn create_deck(&self, deck: &NewDeck) -> Result<Deck>;

    fn update_deck(&self, id: &str, update: &DeckUpdate) -> Result<Deck>;

    fn delete_deck(&self, id: &str) -> Result<()>;

    fn list_templates(&self, bookmark: Option<&str>) -> Result<Page<Template>>;

    fn get_template(&self, id: &str) -> Result<Template>;

    fn create_template(&self, template: &NewTemplate) -> Result<Template>;
}

/// Walk every page of the deck listing.
///
/// Any failing page aborts the walk; no partial listing is returned.
pub fn fetch_all_decks<R: RemoteClient + ?Sized>(remote: &R) -> Result<Vec<Deck>> {
    collect_pages("deck", |bookmark| remote.list_decks(bookmark))
}

/// Walk every page of one deck's card listing, [`CARD_PAGE_LIMIT`] at a time.
pub fn fetch_all_cards<R: RemoteClient + ?Sized>(remote: &R, deck_id: &str) -> Result<Vec<Card>> {
    collect_pages("card", |bookmark| {
        remote.list_cards(Some(deck_id), Some(CARD_PAGE_LIMIT), bookmark)
    })
}

/// Cards whose content or name contains `query`, ignoring case.
///
/// The service has no search endpoint, so this walks the whole card listing
/// (optionally one deck's) and filters locally.
pub fn search_cards<R: RemoteClient + ?Sized>(
    remote: &R,
    query: &str,
    deck_id: Option<&str>,
) -> Result<Vec<Card>> {
    let needle = query.to_lowercase();
    let cards = collect_pages("card", |bookmark| {
        remote.list_cards(deck_id, Some(CARD_PAGE_LIMIT), bookmark)
    })?;
    Ok(cards
        .into_iter()
        .filter(|card| {
            card.content.to_lowercase().contains(&needle)
                || card
                    .name
                    .as_deref()
                    .is_some_and(|n| n.to_lowercase().contains(&needle))
        })
        .collect())
}

pub fn fetch_all_templates<R: RemoteClient + ?Sized>(remote: &R) -> Result<Vec<Template>> {
    collect_pages("template", |bookmark| remote.list_templates(bookmark))
}

/// Follow bookmarks until the service signals the final page.
fn collect_pages<T, F>(kind: &str, mut fetch: F) -> Result<Vec<T>>
where
    F: FnMut(Option<&str>) -> Result<Page<T>>,
{
    let mut items = Vec::new();
    let mut bookmark: Option<String> = None;

    loop {
        let page = fetch(bookmark.as_deref())?;
        tracing::debug!(kind, count = page.docs.len(), bookmark = ?page.bookmark, "fetched page");
        let exhausted = page.docs.is_empty();
        let next = page.next_bookmark().map(str::to_string);
        items.extend(page.docs);

        match next {
            // The service echoes a bookmark on its final, empty page.
            Some(b) if !exhausted && bookmark.as_deref() != Some(b.as_str()) => {
                bookmark = Some(b)
            }
            _ => break,
        }
    }

    Ok(items)
}
