use super::archive::read_document;
use super::schema::{ArchiveCard, ArchiveDocument, ArchiveTemplate, ImportOptions};
use super::validate::validate;
use crate::error::Result;
use crate::model::{Field, NewCard, NewDeck, NewTemplate, TemplateField};
use crate::remote::RemoteClient;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

/// Outcome of an import or of its dry-run preview.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportResult {
    pub decks_created: usize,
    pub cards_created: usize,
    pub templates_created: usize,
    /// One message per failed creation, in the order they happened.
    pub errors: Vec<String>,
    /// Media entries written next to the archive, when extraction ran.
    pub media_files: Vec<String>,
}

impl ImportResult {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Archive ids mapped to the ids the service assigned during one import.
#[derive(Debug, Default)]
struct IdRemap {
    ids: HashMap<String, String>,
}

impl IdRemap {
    fn record(&mut self, archive_id: &str, live_id: &str) {
        self.ids.insert(archive_id.to_string(), live_id.to_string());
    }

    fn resolve(&self, archive_id: &str) -> Option<&str> {
        self.ids.get(archive_id).map(String::as_str)
    }
}

/// Replays an archive document against the live service.
///
/// Templates are created first so cards can be pointed at their new ids, then
/// decks with their nested cards, then top-level cards.
///
/// The replay is best-effort: a template or deck that cannot be created is
/// reported (a failed deck's nested cards are skipped); a card that cannot be
/// created is reported and the next one is attempted. Only a document that
/// fails validation aborts before any remote call.
pub struct Importer<'a, R: RemoteClient + ?Sized> {
    remote: &'a R,
}

impl<'a, R: RemoteClient + ?Sized> Importer<'a, R> {
    pub fn new(remote: &'a R) -> Self {
        Self { remote }
    }

    pub fn import_from_archive(&self, path: &Path, opts: &ImportOptions) -> Result<ImportResult> {
        let document = read_document(path)?;
        self.import_document(&document, opts)
    }

    /// Validate the document, then either preview it or replay it.
    pub fn import_document(
        &self,
        document: &ArchiveDocument,
        opts: &ImportOptions,
    ) -> Result<ImportResult> {
        validate(document)?;

        if opts.dry_run {
            return Ok(preview(document));
        }

        let mut result = ImportResult::default();
        let mut remap = IdRemap::default();
        let mut templates = IdRemap::default();

        for template in &document.templates {
            match self.remote.create_template(&template_to_new(template)) {
                Ok(created) => {
                    result.templates_created += 1;
                    if !template.id.is_empty() {
                        templates.record(&template.id, &created.id);
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        template = %template.name,
                        error = %e,
                        "template creation failed"
                    );
                    result.errors.push(format!(
                        "Failed to create template '{}': {}",
                        template.name, e
                    ));
                }
            }
        }
        let template_ref = |card: &ArchiveCard| {
            card.template_id().map(|t| templates.resolve(t).unwrap_or(t).to_string())
        };

        // Decks are created in document order; a parent must appear before
        // its children to be remapped.
        for deck in &document.decks {
            let parent_id = deck.parent_id().map(|p| match remap.resolve(p) {
                Some(live) => live.to_string(),
                None => {
                    if document.decks.iter().any(|d| d.id() == Some(p)) {
                        tracing::warn!(
                            deck = %deck.name,
                            parent = %p,
                            "parent deck not created yet; keeping archive id"
                        );
                    }
                    p.to_string()
                }
            });

            let new_deck = NewDeck {
                name: deck.name.clone(),
                parent_id,
                sort: None,
            };
            let created = match self.remote.create_deck(&new_deck) {
                Ok(created) => created,
                Err(e) => {
                    tracing::warn!(deck = %deck.name, error = %e, "deck creation failed");
                    result
                        .errors
                        .push(format!("Failed to create deck '{}': {}", deck.name, e));
                    continue;
                }
            };
            result.decks_created += 1;
            if let Some(archive_id) = deck.id() {
                remap.record(archive_id, &created.id);
            }

            for card in &deck.cards {
                let deck_ref = card
                    .deck_id()
                    .and_then(|r| remap.resolve(r))
                    .unwrap_or(created.id.as_str());
                let new_card = build_card(card, deck_ref, template_ref(card), opts);
                match self.remote.create_card(&new_card) {
                    Ok(_) => result.cards_created += 1,
                    Err(e) => {
                        tracing::warn!(deck = %deck.name, error = %e, "card creation failed");
                        result.errors.push(format!(
                            "Failed to create card in deck '{}': {}",
                            deck.name, e
                        ));
                    }
                }
            }
        }

        for card in &document.cards {
            let deck_ref = card
                .deck_id()
                .map(|r| remap.resolve(r).unwrap_or(r))
                .unwrap_or_default();
            let new_card = build_card(card, deck_ref, template_ref(card), opts);
            match self.remote.create_card(&new_card) {
                Ok(_) => result.cards_created += 1,
                Err(e) => {
                    tracing::warn!(card = %card.label(), error = %e, "card creation failed");
                    result.errors.push(format!("Failed to create card: {}", e));
                }
            }
        }

        tracing::info!(
            decks = result.decks_created,
            cards = result.cards_created,
            templates = result.templates_created,
            errors = result.errors.len(),
            "import finished"
        );
        Ok(result)
    }
}

/// Count what an import would create, without touching the service.
pub fn preview(document: &ArchiveDocument) -> ImportResult {
    ImportResult {
        decks_created: document.deck_count(),
        cards_created: document.card_count(),
        templates_created: document.template_count(),
        ..Default::default()
    }
}

fn template_to_new(template: &ArchiveTemplate) -> NewTemplate {
    let fields = template
        .fields
        .iter()
        .map(|(key, field)| {
            let converted = TemplateField {
                id: if field.id.is_empty() {
                    key.clone()
                } else {
                    field.id.clone()
                },
                name: Some(field.name.clone()).filter(|n| !n.is_empty()),
                kind: field.kind.clone(),
                pos: field.pos.clone(),
                content: None,
                options: field.options.clone(),
            };
            (key.clone(), converted)
        })
        .collect();

    NewTemplate {
        name: template.name.clone(),
        content: template.content.clone().unwrap_or_default(),
        pos: template.pos.clone().filter(|p| !p.is_empty()),
        fields,
    }
}

/// Build the create payload. The caller's template override wins over the
/// card's own (already remapped) template reference.
fn build_card(
    card: &ArchiveCard,
    deck_ref: &str,
    template_ref: Option<String>,
    opts: &ImportOptions,
) -> NewCard {
    let fields = card
        .fields
        .iter()
        .map(|(id, value)| {
            let field = Field {
                id: id.clone(),
                value: field_text(value),
            };
            (id.clone(), field)
        })
        .collect();

    NewCard {
        content: card.content.clone(),
        deck_id: opts
            .deck_id
            .clone()
            .unwrap_or_else(|| deck_ref.to_string()),
        name: card.name.clone().filter(|n| !n.is_empty()),
        template_id: opts.template_id.clone().or(template_ref),
        pos: card.pos.clone().filter(|p| !p.is_empty()),
        fields,
        manual_tags: Vec::new(),
    }
}

/// Render an archived field value as the text the service stores.
fn field_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MochiError;
    use crate::interchange::export::Exporter;
    use crate::interchange::schema::{ArchiveDeck, ArchiveField, ExportOptions};
    use crate::interchange::validate::ValidationError;
    use crate::remote::memory::InMemoryRemote;
    use serde_json::json;

    fn card(content: &str) -> ArchiveCard {
        ArchiveCard {
            content: content.to_string(),
            ..Default::default()
        }
    }

    fn deck(id: &str, name: &str, cards: &[&str]) -> ArchiveDeck {
        ArchiveDeck {
            id: Some(id.to_string()),
            name: name.to_string(),
            cards: cards.iter().map(|c| card(c)).collect(),
            ..Default::default()
        }
    }

    fn two_decks() -> ArchiveDocument {
        ArchiveDocument {
            decks: vec![
                deck("es", "Spanish", &["hola", "adios", "gracias"]),
                deck("fr", "French", &["bonjour", "merci"]),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_dry_run_counts_without_remote_calls() {
        let remote = InMemoryRemote::new();
        let opts = ImportOptions {
            dry_run: true,
            ..Default::default()
        };

        let result = Importer::new(&remote)
            .import_document(&two_decks(), &opts)
            .unwrap();

        assert_eq!(result.decks_created, 2);
        assert_eq!(result.cards_created, 5);
        assert!(result.errors.is_empty());
        assert_eq!(remote.create_deck_calls(), 0);
        assert_eq!(remote.create_card_calls(), 0);
    }

    #[test]
    fn test_dry_run_counts_templates() {
        let mut doc = two_decks();
        doc.templates.push(Default::default());
        assert_eq!(preview(&doc).templates_created, 1);
    }

    #[test]
    fn test_invalid_document_aborts_before_remote_calls() {
        let remote = InMemoryRemote::new();
        let doc = ArchiveDocument {
            cards: vec![ArchiveCard {
                content: "lost".into(),
                deck_id: Some("nonexistent-deck".into()),
                ..Default::default()
            }],
            ..Default::default()
        };

        let err = Importer::new(&remote)
            .import_document(&doc, &ImportOptions::default())
            .unwrap_err();
        assert!(matches!(
            err,
            MochiError::Validation(ValidationError::DanglingDeckReference(_))
        ));
        assert_eq!(remote.create_deck_calls(), 0);
        assert_eq!(remote.create_card_calls(), 0);
    }

    #[test]
    fn test_failed_deck_skips_its_cards_and_continues() {
        let remote = InMemoryRemote::new();
        remote.fail_deck_named("Spanish");

        let result = Importer::new(&remote)
            .import_document(&two_decks(), &ImportOptions::default())
            .unwrap();

        assert_eq!(result.decks_created, 1);
        assert_eq!(result.cards_created, 2);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].starts_with("Failed to create deck 'Spanish':"));
        assert_eq!(remote.create_card_calls(), 2);
        assert_eq!(remote.decks()[0].name, "French");
    }

    #[test]
    fn test_failed_card_is_reported_and_siblings_continue() {
        let remote = InMemoryRemote::new();
        remote.fail_card_content("adios");

        let result = Importer::new(&remote)
            .import_document(&two_decks(), &ImportOptions::default())
            .unwrap();

        assert_eq!(result.decks_created, 2);
        assert_eq!(result.cards_created, 4);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].starts_with("Failed to create card in deck 'Spanish':"));
    }

    #[test]
    fn test_nested_cards_land_in_new_deck() {
        let remote = InMemoryRemote::new();
        let mut doc = two_decks();
        doc.decks[0].cards[0].deck_id = Some("es".into());

        Importer::new(&remote)
            .import_document(&doc, &ImportOptions::default())
            .unwrap();

        let spanish = remote
            .decks()
            .into_iter()
            .find(|d| d.name == "Spanish")
            .unwrap();
        assert_ne!(spanish.id, "es");
        assert_eq!(remote.cards_in(&spanish.id).len(), 3);
    }

    #[test]
    fn test_top_level_cards_are_remapped() {
        let remote = InMemoryRemote::new();
        let doc = ArchiveDocument {
            decks: vec![deck("es", "Spanish", &[])],
            cards: vec![ArchiveCard {
                content: "hola".into(),
                deck_id: Some("es".into()),
                ..Default::default()
            }],
            ..Default::default()
        };

        let result = Importer::new(&remote)
            .import_document(&doc, &ImportOptions::default())
            .unwrap();

        assert_eq!(result.cards_created, 1);
        let created = &remote.cards()[0];
        assert_eq!(created.deck_id, remote.decks()[0].id);
    }

    #[test]
    fn test_unmapped_top_level_card_keeps_archive_deck_id() {
        let remote = InMemoryRemote::new();
        remote.fail_deck_named("Spanish");
        let doc = ArchiveDocument {
            decks: vec![deck("es", "Spanish", &[])],
            cards: vec![ArchiveCard {
                content: "hola".into(),
                deck_id: Some("es".into()),
                ..Default::default()
            }],
            ..Default::default()
        };

        let result = Importer::new(&remote)
            .import_document(&doc, &ImportOptions::default())
            .unwrap();

        assert_eq!(result.decks_created, 0);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(remote.create_card_calls(), 1);
        assert_eq!(remote.cards()[0].deck_id, "es");
    }

    #[test]
    fn test_parent_ids_are_remapped() {
        let remote = InMemoryRemote::new();
        let mut child = deck("es", "Spanish", &["hola"]);
        child.parent_id = Some("lang".into());
        let doc = ArchiveDocument {
            decks: vec![deck("lang", "Languages", &[]), child],
            ..Default::default()
        };

        Importer::new(&remote)
            .import_document(&doc, &ImportOptions::default())
            .unwrap();

        let decks = remote.decks();
        assert_eq!(decks[1].parent_id.as_deref(), Some(decks[0].id.as_str()));
    }

    #[test]
    fn test_overrides_apply_to_every_card() {
        let remote = InMemoryRemote::new();
        let target = remote.seed_deck("Inbox", None);
        let opts = ImportOptions {
            deck_id: Some(target.id.clone()),
            template_id: Some("tmpl-1".into()),
            ..Default::default()
        };

        let result = Importer::new(&remote)
            .import_document(&two_decks(), &opts)
            .unwrap();

        assert_eq!(result.cards_created, 5);
        assert_eq!(remote.cards_in(&target.id).len(), 5);
        assert!(remote
            .cards()
            .iter()
            .all(|c| c.template_id.as_deref() == Some("tmpl-1")));
    }

    fn vocab_template() -> ArchiveTemplate {
        let mut fields = std::collections::BTreeMap::new();
        fields.insert(
            "word".to_string(),
            ArchiveField {
                id: "word".into(),
                name: "Word".into(),
                kind: Some("text".into()),
                ..Default::default()
            },
        );
        ArchiveTemplate {
            id: "tmpl-old".into(),
            name: "Vocab".into(),
            content: Some("<< Word >>".into()),
            fields,
            ..Default::default()
        }
    }

    #[test]
    fn test_templates_created_match_dry_run_count() {
        let mut doc = two_decks();
        doc.templates.push(vocab_template());

        let dry = Importer::new(&InMemoryRemote::new())
            .import_document(
                &doc,
                &ImportOptions {
                    dry_run: true,
                    ..Default::default()
                },
            )
            .unwrap();

        let remote = InMemoryRemote::new();
        let real = Importer::new(&remote)
            .import_document(&doc, &ImportOptions::default())
            .unwrap();

        assert_eq!(real.templates_created, 1);
        assert_eq!(real.templates_created, dry.templates_created);
        let created = &remote.templates()[0];
        assert_eq!(created.name, "Vocab");
        assert_eq!(created.fields["word"].name.as_deref(), Some("Word"));
    }

    #[test]
    fn test_card_template_ids_are_remapped() {
        let remote = InMemoryRemote::new();
        let mut doc = two_decks();
        doc.templates.push(vocab_template());
        doc.decks[0].cards[0].template_id = Some("tmpl-old".into());
        doc.decks[1].cards[0].template_id = Some("tmpl-elsewhere".into());

        Importer::new(&remote)
            .import_document(&doc, &ImportOptions::default())
            .unwrap();

        let live = remote.templates()[0].id.clone();
        assert_ne!(live, "tmpl-old");
        let by_content = |content: &str| {
            remote
                .cards()
                .into_iter()
                .find(|c| c.content == content)
                .unwrap()
        };
        assert_eq!(by_content("hola").template_id.as_deref(), Some(live.as_str()));
        assert_eq!(
            by_content("bonjour").template_id.as_deref(),
            Some("tmpl-elsewhere")
        );
        assert_eq!(by_content("adios").template_id, None);
    }

    #[test]
    fn test_template_override_beats_remap() {
        let remote = InMemoryRemote::new();
        let mut doc = two_decks();
        doc.templates.push(vocab_template());
        doc.decks[0].cards[0].template_id = Some("tmpl-old".into());
        let opts = ImportOptions {
            template_id: Some("forced".into()),
            ..Default::default()
        };

        Importer::new(&remote).import_document(&doc, &opts).unwrap();
        assert!(remote
            .cards()
            .iter()
            .all(|c| c.template_id.as_deref() == Some("forced")));
    }

    #[test]
    fn test_failed_template_is_reported_and_import_continues() {
        let remote = InMemoryRemote::new();
        remote.fail_template_named("Vocab");
        let mut doc = two_decks();
        doc.templates.push(vocab_template());

        let result = Importer::new(&remote)
            .import_document(&doc, &ImportOptions::default())
            .unwrap();

        assert_eq!(result.templates_created, 0);
        assert_eq!(result.decks_created, 2);
        assert_eq!(result.cards_created, 5);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].starts_with("Failed to create template 'Vocab':"));
        assert_eq!(remote.create_template_calls(), 1);
    }

    #[test]
    fn test_field_values_become_text() {
        let mut archived = card("q");
        archived.fields.insert("a".into(), json!("plain"));
        archived.fields.insert("b".into(), json!(42));
        archived.fields.insert("c".into(), json!(true));
        archived.fields.insert("d".into(), Value::Null);

        let new_card = build_card(&archived, "d1", None, &ImportOptions::default());
        assert_eq!(new_card.deck_id, "d1");
        assert_eq!(new_card.fields["a"].value, "plain");
        assert_eq!(new_card.fields["b"].value, "42");
        assert_eq!(new_card.fields["c"].value, "true");
        assert_eq!(new_card.fields["d"].value, "");
    }

    #[test]
    fn test_round_trip_through_archive() {
        let source = InMemoryRemote::new();
        let deck = source.seed_deck("Spanish", None);
        source.seed_cards(&deck.id, 3);

        let doc = Exporter::new(&source)
            .export_deck(&deck.id, &ExportOptions::default())
            .unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spanish.mochi");
        crate::interchange::write_archive(&doc, &path, Default::default(), &[]).unwrap();

        let target = InMemoryRemote::new();
        let result = Importer::new(&target)
            .import_from_archive(&path, &ImportOptions::default())
            .unwrap();

        assert_eq!(result.decks_created, 1);
        assert_eq!(result.cards_created, 3);
        let imported = &target.decks()[0];
        assert_eq!(imported.name, "Spanish");
        let contents: Vec<_> = target
            .cards_in(&imported.id)
            .into_iter()
            .map(|c| c.content)
            .collect();
        assert_eq!(contents, vec!["Card 1", "Card 2", "Card 3"]);
    }
}
