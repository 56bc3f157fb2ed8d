use colored::Colorize;
use mochi::api::{CmdMessage, CmdResult, MessageLevel, ProfileEntry};
use super::commands::ErrorStyle;
use mochi::error::MochiError;
use mochi::model::{Card, Deck, Template};
use serde_json::json;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const LINE_WIDTH: usize = 100;
const ID_WIDTH: usize = 12;
const ACTIVE_MARKER: &str = "*";

/// Messages go to stdout; with `quiet`, only warnings and errors are shown.
pub(super) fn print_messages(messages: &[CmdMessage], quiet: bool) {
    for message in messages {
        match message.level {
            MessageLevel::Info if !quiet => println!("{}", message.content.dimmed()),
            MessageLevel::Success if !quiet => println!("{}", message.content.green()),
            MessageLevel::Warning => println!("{}", message.content.yellow()),
            MessageLevel::Error => println!("{}", message.content.red()),
            _ => {}
        }
    }
}

/// Render everything a command returned as human-readable text.
pub(super) fn print_result(result: &CmdResult, quiet: bool) {
    print_decks(&result.decks);
    print_cards(&result.cards);
    print_templates(&result.templates);
    print_profiles(&result.profiles);
    for file in &result.media_files {
        println!("{}", file);
    }
    if let Some(import) = &result.import {
        for file in &import.media_files {
            println!("{}", file.dimmed());
        }
    }
    print_messages(&result.messages, quiet);
    if let Some(bookmark) = &result.bookmark {
        if !quiet {
            println!("{} {}", "Next page:".dimmed(), bookmark);
        }
    }
}

pub(super) fn print_json(result: &CmdResult) -> serde_json::Result<()> {
    println!("{}", serde_json::to_string_pretty(result)?);
    Ok(())
}

/// Failures go to stderr, as `{"error": ...}` when JSON errors were requested.
pub fn report_error(error: &MochiError, style: ErrorStyle) {
    if style.json {
        eprintln!("{}", json!({ "error": error.to_string() }));
    } else {
        eprintln!("{} {}", "Error:".red(), error);
    }
}

fn print_decks(decks: &[Deck]) {
    for deck in decks {
        let parent = deck
            .parent_id
            .as_deref()
            .map(|p| format!("  (in {})", p))
            .unwrap_or_default();
        let name = if deck.archived {
            deck.name.dimmed()
        } else {
            deck.name.bold()
        };
        println!("{}  {}{}", pad_id(&deck.id).yellow(), name, parent.dimmed());
    }
}

pub(super) fn print_cards(cards: &[Card]) {
    for card in cards {
        let label = card.name.clone().unwrap_or_else(|| first_line(&card.content));
        let available = LINE_WIDTH.saturating_sub(ID_WIDTH + 2);
        println!(
            "{}  {}",
            pad_id(&card.id).yellow(),
            truncate_to_width(&label, available)
        );
    }
}

pub(super) fn print_full_card(card: &Card) {
    let title = card.name.clone().unwrap_or_else(|| first_line(&card.content));
    println!("{} {}", card.id.yellow(), title.bold());
    println!("{}", format!("deck {}", card.deck_id).dimmed());
    println!("--------------------------------");
    println!("{}", card.content);
    for field in card.fields.values() {
        println!("{} {}", format!("{}:", field.id).dimmed(), field.value);
    }
}

fn print_templates(templates: &[Template]) {
    for template in templates {
        let fields: Vec<_> = template
            .fields
            .values()
            .map(|f| f.name.clone().unwrap_or_else(|| f.id.clone()))
            .collect();
        println!(
            "{}  {}  {}",
            pad_id(&template.id).yellow(),
            template.name.bold(),
            fields.join(", ").dimmed()
        );
    }
}

fn print_profiles(profiles: &[ProfileEntry]) {
    for profile in profiles {
        if profile.active {
            println!("{} {}", ACTIVE_MARKER.green(), profile.name.green());
        } else {
            println!("  {}", profile.name);
        }
    }
}

fn first_line(content: &str) -> String {
    content.lines().next().unwrap_or_default().to_string()
}

fn pad_id(id: &str) -> String {
    let shown = truncate_to_width(id, ID_WIDTH);
    let padding = ID_WIDTH.saturating_sub(shown.width());
    format!("{}{}", shown, " ".repeat(padding))
}

fn truncate_to_width(s: &str, max_width: usize) -> String {
    if s.width() <= max_width {
        return s.to_string();
    }

    let mut result = String::new();
    let mut current_width = 0;
    for c in s.chars() {
        let char_width = c.width().unwrap_or(0);
        if current_width + char_width > max_width.saturating_sub(1) {
            result.push('…');
            return result;
        }
        result.push(c);
        current_width += char_width;
    }

    result
}
