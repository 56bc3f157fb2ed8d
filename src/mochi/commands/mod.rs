use crate::interchange::ImportResult;
use crate::model::{Card, Deck, Template};
use chrono::NaiveDate;
use serde::Serialize;
use std::path::PathBuf;

pub mod attachment;
pub mod card;
pub mod config;
pub mod deck;
pub mod due;
pub mod template;
pub mod transfer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CmdMessage {
    pub level: MessageLevel,
    pub content: String,
}

impl CmdMessage {
    pub fn info(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Info,
            content: content.into(),
        }
    }

    pub fn success(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Success,
            content: content.into(),
        }
    }

    pub fn warning(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Warning,
            content: content.into(),
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Error,
            content: content.into(),
        }
    }
}

/// What an export wrote, or would write on a dry run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExportSummary {
    pub path: PathBuf,
    pub decks: usize,
    pub cards: usize,
    pub media: usize,
    pub dry_run: bool,
}

/// How many cards are due on a date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DueSummary {
    pub date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deck_id: Option<String>,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileEntry {
    pub name: String,
    pub active: bool,
}

#[derive(Debug, Default, Serialize)]
pub struct CmdResult {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub decks: Vec<Deck>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cards: Vec<Card>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub templates: Vec<Template>,
    /// Cursor for the next page of a single-page listing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bookmark: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub import: Option<ImportResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub export: Option<ExportSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due: Option<DueSummary>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub media_files: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub profiles: Vec<ProfileEntry>,
    pub messages: Vec<CmdMessage>,
}

impl CmdResult {
    pub fn add_message(&mut self, message: CmdMessage) {
        self.messages.push(message);
    }

    pub fn with_decks(mut self, decks: Vec<Deck>) -> Self {
        self.decks = decks;
        self
    }

    pub fn with_cards(mut self, cards: Vec<Card>) -> Self {
        self.cards = cards;
        self
    }

    pub fn with_templates(mut self, templates: Vec<Template>) -> Self {
        self.templates = templates;
        self
    }

    pub fn with_bookmark(mut self, bookmark: Option<String>) -> Self {
        self.bookmark = bookmark;
        self
    }

    pub fn with_import(mut self, import: ImportResult) -> Self {
        self.import = Some(import);
        self
    }

    pub fn with_export(mut self, export: ExportSummary) -> Self {
        self.export = Some(export);
        self
    }

    pub fn with_due(mut self, due: DueSummary) -> Self {
        self.due = Some(due);
        self
    }

    pub fn with_media_files(mut self, files: Vec<String>) -> Self {
        self.media_files = files;
        self
    }

    pub fn with_profiles(mut self, profiles: Vec<ProfileEntry>) -> Self {
        self.profiles = profiles;
        self
    }

    /// True when any message reports a failure.
    pub fn has_errors(&self) -> bool {
        self.messages
            .iter()
            .any(|m| m.level == MessageLevel::Error)
    }
}
