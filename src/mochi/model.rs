//! Live objects as the Mochi service returns them.
//!
//! These mirror the service's JSON (kebab-case keys, `?`-suffixed booleans).
//! They are distinct from the archive records in [`crate::interchange`], which
//! describe the portable `.mochi` document instead of the live object graph.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Card {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub deck_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
    #[serde(default)]
    pub pos: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, Field>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub manual_tags: Vec<String>,
    #[serde(default, rename = "archived?")]
    pub archived: bool,
    #[serde(default, rename = "new?")]
    pub is_new: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reviews: Vec<Review>,
}

/// A template field value on a card.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub id: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub date: DateTime<Utc>,
    pub due: DateTime<Utc>,
    #[serde(default, rename = "remembered?")]
    pub remembered: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Deck {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub sort: i64,
    #[serde(default, rename = "archived?")]
    pub archived: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Template {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub pos: String,
    #[serde(default)]
    pub fields: BTreeMap<String, TemplateField>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplateField {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pos: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<serde_json::Map<String, serde_json::Value>>,
}

/// Payload for creating a card. Only populated fields are sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct NewCard {
    pub content: String,
    pub deck_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pos: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, Field>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub manual_tags: Vec<String>,
}

/// Payload for creating a deck.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct NewDeck {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<i64>,
}

/// Partial card update. Only populated fields are sent; absent ones keep their
/// current value on the service.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct CardUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deck_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<BTreeMap<String, Field>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manual_tags: Option<Vec<String>>,
    #[serde(rename = "archived?", skip_serializing_if = "Option::is_none")]
    pub archived: Option<bool>,
}

impl CardUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply the populated fields to a card.
    pub fn apply_to(&self, card: &mut Card) {
        if let Some(content) = &self.content {
            card.content = content.clone();
        }
        if let Some(name) = &self.name {
            card.name = Some(name.clone());
        }
        if let Some(deck_id) = &self.deck_id {
            card.deck_id = deck_id.clone();
        }
        if let Some(template_id) = &self.template_id {
            card.template_id = Some(template_id.clone());
        }
        if let Some(fields) = &self.fields {
            card.fields = fields.clone();
        }
        if let Some(tags) = &self.manual_tags {
            card.manual_tags = tags.clone();
        }
        if let Some(archived) = self.archived {
            card.archived = archived;
        }
    }
}

/// Partial deck update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct DeckUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<i64>,
    #[serde(rename = "archived?", skip_serializing_if = "Option::is_none")]
    pub archived: Option<bool>,
}

impl DeckUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply_to(&self, deck: &mut Deck) {
        if let Some(name) = &self.name {
            deck.name = name.clone();
        }
        if let Some(parent_id) = &self.parent_id {
            deck.parent_id = Some(parent_id.clone()).filter(|p| !p.is_empty());
        }
        if let Some(sort) = self.sort {
            deck.sort = sort;
        }
        if let Some(archived) = self.archived {
            deck.archived = archived;
        }
    }
}

/// Payload for creating a template.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NewTemplate {
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pos: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, TemplateField>,
}

/// Body of the due-cards listing.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DueCards {
    #[serde(default)]
    pub cards: Vec<Card>,
}

/// One page of a listing call.
///
/// An absent or empty `bookmark` marks the final page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bookmark: Option<String>,
    #[serde(default = "Vec::new", alias = "cards")]
    pub docs: Vec<T>,
}

impl<T> Page<T> {
    pub fn new(docs: Vec<T>, bookmark: Option<String>) -> Self {
        Self { bookmark, docs }
    }

    /// The cursor for the next request, if there is one.
    pub fn next_bookmark(&self) -> Option<&str> {
        self.bookmark.as_deref().filter(|b| !b.is_empty())
    }
}
