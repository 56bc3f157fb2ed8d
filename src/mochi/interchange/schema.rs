use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// The only document version this crate reads or writes.
pub const SCHEMA_VERSION: i64 = 2;

/// Root of a `.mochi` document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveDocument {
    #[serde(default)]
    pub version: i64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub decks: Vec<ArchiveDeck>,
    /// Cards not nested in any deck. Each must name its deck.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cards: Vec<ArchiveCard>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub templates: Vec<ArchiveTemplate>,
}

impl Default for ArchiveDocument {
    fn default() -> Self {
        Self {
            version: SCHEMA_VERSION,
            decks: Vec::new(),
            cards: Vec::new(),
            templates: Vec::new(),
        }
    }
}

impl ArchiveDocument {
    pub fn deck_count(&self) -> usize {
        self.decks.len()
    }

    /// Nested plus top-level cards.
    pub fn card_count(&self) -> usize {
        self.cards.len() + self.decks.iter().map(|d| d.cards.len()).sum::<usize>()
    }

    pub fn template_count(&self) -> usize {
        self.templates.len()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ArchiveDeck {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cards: Vec<ArchiveCard>,
}

impl ArchiveDeck {
    /// The deck identifier, treating `""` as absent.
    pub fn id(&self) -> Option<&str> {
        non_empty(&self.id)
    }

    pub fn parent_id(&self) -> Option<&str> {
        non_empty(&self.parent_id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ArchiveCard {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deck_id: Option<String>,
    /// Read on import and remapped to the created template; export never
    /// writes it since templates are not exported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pos: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reviews: Vec<ArchiveReview>,
}

impl ArchiveCard {
    pub fn id(&self) -> Option<&str> {
        non_empty(&self.id)
    }

    /// The deck reference, treating `""` as absent.
    pub fn deck_id(&self) -> Option<&str> {
        non_empty(&self.deck_id)
    }

    pub fn template_id(&self) -> Option<&str> {
        non_empty(&self.template_id)
    }

    /// A short human label for messages: name, then id, then content.
    pub fn label(&self) -> String {
        if let Some(name) = non_empty(&self.name) {
            return name.to_string();
        }
        if let Some(id) = self.id() {
            return id.to_string();
        }
        let first_line = self.content.lines().next().unwrap_or_default();
        first_line.chars().take(40).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveReview {
    pub date: String,
    pub due: String,
    #[serde(default)]
    pub interval: i64,
    #[serde(default, rename = "remembered?")]
    pub remembered: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArchiveTemplate {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pos: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, ArchiveField>,
}

/// A field definition inside a template.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ArchiveField {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pos: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<serde_json::Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub boolean_default: bool,
}

/// Selector for the schema entry's encoding.
///
/// Only JSON is produced or consumed. `Edn` is accepted and yields the same
/// JSON text in `data.json`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ArchiveFormat {
    #[default]
    Json,
    Edn,
}

impl FromStr for ArchiveFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(ArchiveFormat::Json),
            "edn" => Ok(ArchiveFormat::Edn),
            other => Err(format!("unknown archive format: {} (use json or edn)", other)),
        }
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArchiveFormat::Json => write!(f, "json"),
            ArchiveFormat::Edn => write!(f, "edn"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportOptions {
    pub format: ArchiveFormat,
    /// Carry each card's review history into the archive.
    pub include_reviews: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportOptions {
    /// Force every created card into this deck.
    pub deck_id: Option<String>,
    /// Force every created card onto this template.
    pub template_id: Option<String>,
    pub skip_media: bool,
    /// Count what would be created without calling the service.
    pub dry_run: bool,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_documented_shape() {
        let json = r#"{
            "version": 2,
            "decks": [{"id": "d1", "name": "Spanish", "cards": [{"content": "hola"}]}],
            "cards": [{"content": "adios", "deck-id": "d1", "fields": {"f1": 3}}],
            "templates": [{"id": "t1", "name": "Vocab", "fields": {"f1": {"id": "f1", "name": "Word", "type": "text"}}}]
        }"#;
        let doc: ArchiveDocument = serde_json::from_str(json).unwrap();
        assert_eq!(doc.deck_count(), 1);
        assert_eq!(doc.card_count(), 2);
        assert_eq!(doc.template_count(), 1);
        assert_eq!(doc.cards[0].deck_id(), Some("d1"));
        assert_eq!(doc.cards[0].template_id(), None);
        assert_eq!(doc.templates[0].fields["f1"].kind.as_deref(), Some("text"));
    }

    #[test]
    fn test_missing_version_reads_as_zero() {
        let doc: ArchiveDocument = serde_json::from_str(r#"{"decks": []}"#).unwrap();
        assert_eq!(doc.version, 0);
    }

    #[test]
    fn test_empty_ids_read_as_absent() {
        let deck: ArchiveDeck =
            serde_json::from_str(r#"{"id": "", "name": "x", "parent-id": ""}"#).unwrap();
        assert_eq!(deck.id(), None);
        assert_eq!(deck.parent_id(), None);
    }

    #[test]
    fn test_serialization_uses_kebab_keys_and_omits_empties() {
        let card = ArchiveCard {
            content: "q".into(),
            deck_id: Some("d1".into()),
            reviews: vec![ArchiveReview {
                date: "2024-01-01T00:00:00Z".into(),
                due: "2024-01-02T00:00:00Z".into(),
                interval: 0,
                remembered: true,
            }],
            ..Default::default()
        };
        let json = serde_json::to_string(&card).unwrap();
        assert!(json.contains(r#""deck-id":"d1""#));
        assert!(json.contains(r#""remembered?":true"#));
        assert!(!json.contains("fields"));
        assert!(!json.contains("\"name\""));
    }

    #[test]
    fn test_card_label_falls_back_to_content() {
        let card = ArchiveCard {
            content: "What is the capital of France?\nParis".into(),
            ..Default::default()
        };
        assert_eq!(card.label(), "What is the capital of France?");
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("JSON".parse::<ArchiveFormat>().unwrap(), ArchiveFormat::Json);
        assert_eq!("edn".parse::<ArchiveFormat>().unwrap(), ArchiveFormat::Edn);
        assert!("yaml".parse::<ArchiveFormat>().is_err());
    }
}
