use crate::commands::{CmdMessage, CmdResult, DueSummary};
use crate::error::Result;
use crate::remote::RemoteClient;
use chrono::NaiveDate;

/// Cards due for review on `date`.
pub fn list<R: RemoteClient + ?Sized>(
    remote: &R,
    date: NaiveDate,
    deck_id: Option<&str>,
) -> Result<CmdResult> {
    let cards = remote.due_cards(date, deck_id)?;
    let summary = summary(date, deck_id, cards.len());

    let mut result = CmdResult::default();
    if cards.is_empty() {
        result.add_message(CmdMessage::info(format!("No cards due on {}", date)));
    } else {
        result.add_message(CmdMessage::info(format!("Cards due on {}:", date)));
    }
    Ok(result.with_cards(cards).with_due(summary))
}

pub fn count<R: RemoteClient + ?Sized>(
    remote: &R,
    date: NaiveDate,
    deck_id: Option<&str>,
) -> Result<CmdResult> {
    let total = remote.due_cards(date, deck_id)?.len();
    let scope = deck_id
        .map(|d| format!(" in deck {}", d))
        .unwrap_or_default();

    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!(
        "{} cards due on {}{}",
        total, date, scope
    )));
    Ok(result.with_due(summary(date, deck_id, total)))
}

fn summary(date: NaiveDate, deck_id: Option<&str>, count: usize) -> DueSummary {
    DueSummary {
        date,
        deck_id: deck_id.map(str::to_string),
        count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Card, Review};
    use crate::remote::memory::InMemoryRemote;
    use chrono::{TimeZone, Utc};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    fn remote_with_due_card() -> (InMemoryRemote, String) {
        let remote = InMemoryRemote::new();
        let deck = remote.seed_deck("Spanish", None);
        remote.seed_card(Card {
            content: "hola".into(),
            deck_id: deck.id.clone(),
            reviews: vec![Review {
                date: Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap(),
                due: Utc.with_ymd_and_hms(2024, 5, 3, 8, 0, 0).unwrap(),
                remembered: true,
            }],
            ..Default::default()
        });
        remote.seed_cards(&deck.id, 2);
        (remote, deck.id)
    }

    #[test]
    fn test_list_due_cards() {
        let (remote, deck_id) = remote_with_due_card();

        let result = list(&remote, day(3), Some(&deck_id)).unwrap();
        assert_eq!(result.cards.len(), 1);
        assert_eq!(result.messages[0].content, "Cards due on 2024-05-03:");
        assert_eq!(result.due.unwrap().count, 1);
    }

    #[test]
    fn test_list_nothing_due() {
        let (remote, _) = remote_with_due_card();

        let result = list(&remote, day(2), None).unwrap();
        assert!(result.cards.is_empty());
        assert_eq!(result.messages[0].content, "No cards due on 2024-05-02");
    }

    #[test]
    fn test_count_names_the_deck() {
        let (remote, deck_id) = remote_with_due_card();

        let scoped = count(&remote, day(9), Some(&deck_id)).unwrap();
        assert_eq!(
            scoped.messages[0].content,
            format!("1 cards due on 2024-05-09 in deck {}", deck_id)
        );
        assert!(scoped.cards.is_empty());

        let all = count(&remote, day(9), None).unwrap();
        assert_eq!(all.messages[0].content, "1 cards due on 2024-05-09");
    }
}
