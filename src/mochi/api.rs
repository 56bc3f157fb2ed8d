//! # API Facade
//!
//! The API layer is a **thin facade** over the command layer. It is the single
//! entry point for every mochi operation, whatever UI drives it.
//!
//! The facade dispatches to the command functions and returns structured
//! [`CmdResult`] values. It holds no business logic, performs no terminal I/O
//! and formats nothing.
//!
//! ## Generic Over RemoteClient
//!
//! `MochiApi<R: RemoteClient>` is generic over the service backend:
//! - Production: `MochiApi<HttpClient>`
//! - Testing: `MochiApi<InMemoryRemote>`
//!
//! Operations that never touch the service (profiles, archive validation and
//! media extraction) are free functions so they work without an API key.

use crate::commands;
use crate::commands::transfer::{ExportRequest, ImportRequest};
use crate::error::Result;
use crate::model::{CardUpdate, DeckUpdate, NewCard, NewDeck};
use crate::remote::RemoteClient;
use chrono::NaiveDate;
use std::path::Path;

pub struct MochiApi<R: RemoteClient> {
    remote: R,
}

impl<R: RemoteClient> MochiApi<R> {
    pub fn new(remote: R) -> Self {
        Self { remote }
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    pub fn list_decks(&self) -> Result<CmdResult> {
        commands::deck::list(&self.remote)
    }

    pub fn get_deck(&self, id: &str) -> Result<CmdResult> {
        commands::deck::get(&self.remote, id)
    }

    pub fn create_deck(&self, deck: NewDeck, dry_run: bool) -> Result<CmdResult> {
        commands::deck::create(&self.remote, deck, dry_run)
    }

    pub fn update_deck(&self, id: &str, update: DeckUpdate, dry_run: bool) -> Result<CmdResult> {
        commands::deck::update(&self.remote, id, update, dry_run)
    }

    pub fn delete_deck(&self, id: &str, dry_run: bool) -> Result<CmdResult> {
        commands::deck::delete(&self.remote, id, dry_run)
    }

    pub fn list_cards(
        &self,
        deck_id: Option<&str>,
        limit: Option<usize>,
        bookmark: Option<&str>,
    ) -> Result<CmdResult> {
        commands::card::list(&self.remote, deck_id, limit, bookmark)
    }

    pub fn get_card(&self, id: &str) -> Result<CmdResult> {
        commands::card::get(&self.remote, id)
    }

    pub fn create_card(&self, card: NewCard, dry_run: bool) -> Result<CmdResult> {
        commands::card::create(&self.remote, card, dry_run)
    }

    pub fn update_card(&self, id: &str, update: CardUpdate, dry_run: bool) -> Result<CmdResult> {
        commands::card::update(&self.remote, id, update, dry_run)
    }

    pub fn delete_card(&self, id: &str, dry_run: bool) -> Result<CmdResult> {
        commands::card::delete(&self.remote, id, dry_run)
    }

    pub fn search_cards(&self, query: &str, deck_id: Option<&str>) -> Result<CmdResult> {
        commands::card::search(&self.remote, query, deck_id)
    }

    pub fn due_cards(&self, date: NaiveDate, deck_id: Option<&str>) -> Result<CmdResult> {
        commands::due::list(&self.remote, date, deck_id)
    }

    pub fn count_due(&self, date: NaiveDate, deck_id: Option<&str>) -> Result<CmdResult> {
        commands::due::count(&self.remote, date, deck_id)
    }

    pub fn add_attachment(&self, card_id: &str, path: &Path, dry_run: bool) -> Result<CmdResult> {
        commands::attachment::add(&self.remote, card_id, path, dry_run)
    }

    pub fn delete_attachment(
        &self,
        card_id: &str,
        file_name: &str,
        dry_run: bool,
    ) -> Result<CmdResult> {
        commands::attachment::delete(&self.remote, card_id, file_name, dry_run)
    }

    pub fn list_templates(&self) -> Result<CmdResult> {
        commands::template::list(&self.remote)
    }

    pub fn get_template(&self, id: &str) -> Result<CmdResult> {
        commands::template::get(&self.remote, id)
    }

    pub fn export(&self, request: &ExportRequest) -> Result<CmdResult> {
        commands::transfer::export(&self.remote, request)
    }

    pub fn import(&self, request: &ImportRequest) -> Result<CmdResult> {
        commands::transfer::import(&self.remote, request)
    }
}

pub fn config(config_dir: &Path, action: ConfigAction) -> Result<CmdResult> {
    commands::config::run(config_dir, action)
}

pub fn validate_archive(path: &Path, container_only: bool) -> Result<CmdResult> {
    commands::transfer::validate(path, container_only)
}

pub fn extract_media(path: &Path, dest: &Path) -> Result<CmdResult> {
    commands::transfer::extract_media(path, dest)
}

pub use crate::commands::config::ConfigAction;
pub use crate::commands::transfer::{default_media_dir, ExportScope};
pub use commands::{
    CmdMessage, CmdResult, DueSummary, ExportSummary, MessageLevel, ProfileEntry,
};
