use super::RemoteClient;
use crate::error::{MochiError, Result};
use crate::model::{
    Card, CardUpdate, Deck, DeckUpdate, DueCards, NewCard, NewDeck, NewTemplate, Page, Template,
};
use chrono::NaiveDate;
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://app.mochi.cards/api";
const TIMEOUT: Duration = Duration::from_secs(30);
const USER_AGENT: &str = concat!("mochi-cli/", env!("CARGO_PKG_VERSION"));

/// Blocking client for the Mochi REST API.
///
/// Authenticates with HTTP basic auth: the API key is the user name and the
/// password is empty.
pub struct HttpClient {
    client: Client,
    base_url: String,
    api_key: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    errors: serde_json::Value,
}

impl HttpClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(api_key: impl Into<String>, base_url: &str) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_string();
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(MochiError::Config(format!(
                "API URL must start with http:// or https://: {}",
                base_url
            )));
        }

        let client = Client::builder()
            .timeout(TIMEOUT)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url,
            api_key: api_key.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, self.url(path))
            .basic_auth(&self.api_key, Some(""))
            .header(reqwest::header::ACCEPT, "application/json")
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.request(Method::GET, path)
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.request(Method::POST, path)
    }

    fn delete(&self, path: &str) -> RequestBuilder {
        self.request(Method::DELETE, path)
    }

    fn send<T: DeserializeOwned>(&self, request: RequestBuilder, what: &str) -> Result<T> {
        let response = request.send()?;
        let response = check_status(response, what)?;
        let body = response.text()?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Send a request whose answer body is not needed.
    fn send_empty(&self, request: RequestBuilder, what: &str) -> Result<()> {
        let response = request.send()?;
        check_status(response, what)?;
        Ok(())
    }
}

fn check_status(response: Response, what: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::NOT_FOUND {
        return Err(MochiError::NotFound(what.to_string()));
    }
    let body = response.text().unwrap_or_default();
    Err(remote_error(status.as_u16(), &body))
}

/// Build the error for a non-2xx answer, preferring the service's `errors` value.
fn remote_error(status: u16, body: &str) -> MochiError {
    let message = match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => parsed.errors.to_string(),
        Err(_) => body.trim().to_string(),
    };
    MochiError::Remote { status, message }
}

fn listing_query(
    deck_id: Option<&str>,
    limit: Option<usize>,
    bookmark: Option<&str>,
) -> Vec<(&'static str, String)> {
    let mut query = Vec::new();
    if let Some(deck) = deck_id.filter(|d| !d.is_empty()) {
        query.push(("deck-id", deck.to_string()));
    }
    if let Some(limit) = limit.filter(|l| *l > 0) {
        query.push(("limit", limit.to_string()));
    }
    if let Some(bookmark) = bookmark.filter(|b| !b.is_empty()) {
        query.push(("bookmark", bookmark.to_string()));
    }
    query
}

fn due_path(deck_id: Option<&str>) -> String {
    match deck_id.filter(|d| !d.is_empty()) {
        Some(deck) => format!("due/{}", deck),
        None => "due".to_string(),
    }
}

impl RemoteClient for HttpClient {
    fn list_cards(
        &self,
        deck_id: Option<&str>,
        limit: Option<usize>,
        bookmark: Option<&str>,
    ) -> Result<Page<Card>> {
        let query = listing_query(deck_id, limit, bookmark);
        self.send(self.get("cards").query(&query), "cards")
    }

    fn get_card(&self, id: &str) -> Result<Card> {
        self.send(self.get(&format!("cards/{}", id)), &format!("card {}", id))
    }

    fn create_card(&self, card: &NewCard) -> Result<Card> {
        tracing::debug!(deck = %card.deck_id, "creating card");
        self.send(self.post("cards").json(card), "cards")
    }

    fn update_card(&self, id: &str, update: &CardUpdate) -> Result<Card> {
        tracing::debug!(card = %id, "updating card");
        self.send(
            self.post(&format!("cards/{}", id)).json(update),
            &format!("card {}", id),
        )
    }

    fn delete_card(&self, id: &str) -> Result<()> {
        tracing::debug!(card = %id, "deleting card");
        self.send_empty(self.delete(&format!("cards/{}", id)), &format!("card {}", id))
    }

    fn add_attachment(&self, card_id: &str, file_name: &str, data: Vec<u8>) -> Result<()> {
        tracing::debug!(
            card = %card_id,
            file = %file_name,
            bytes = data.len(),
            "uploading attachment"
        );
        let part = Part::bytes(data).file_name(file_name.to_string());
        let form = Form::new().part("file", part);
        self.send_empty(
            self.post(&format!("cards/{}/attachments/{}", card_id, file_name))
                .multipart(form),
            &format!("card {}", card_id),
        )
    }

    fn delete_attachment(&self, card_id: &str, file_name: &str) -> Result<()> {
        self.send_empty(
            self.delete(&format!("cards/{}/attachments/{}", card_id, file_name)),
            &format!("attachment {} on card {}", file_name, card_id),
        )
    }

    fn due_cards(&self, date: NaiveDate, deck_id: Option<&str>) -> Result<Vec<Card>> {
        let query = [("date", date.format("%Y-%m-%d").to_string())];
        let due: DueCards = self.send(self.get(&due_path(deck_id)).query(&query), "due cards")?;
        Ok(due.cards)
    }

    fn list_decks(&self, bookmark: Option<&str>) -> Result<Page<Deck>> {
        let query = listing_query(None, None, bookmark);
        self.send(self.get("decks").query(&query), "decks")
    }

    fn get_deck(&self, id: &str) -> Result<Deck> {
        self.send(self.get(&format!("decks/{}", id)), &format!("deck {}", id))
    }

    fn create_deck(&self, deck: &NewDeck) -> Result<Deck> {
        tracing::debug!(name = %deck.name, "creating deck");
        self.send(self.post("decks").json(deck), "decks")
    }

    fn update_deck(&self, id: &str, update: &DeckUpdate) -> Result<Deck> {
        tracing::debug!(deck = %id, "updating deck");
        self.send(
            self.post(&format!("decks/{}", id)).json(update),
            &format!("deck {}", id),
        )
    }

    fn delete_deck(&self, id: &str) -> Result<()> {
        tracing::debug!(deck = %id, "deleting deck");
        self.send_empty(self.delete(&format!("decks/{}", id)), &format!("deck {}", id))
    }

    fn list_templates(&self, bookmark: Option<&str>) -> Result<Page<Template>> {
        let query = listing_query(None, None, bookmark);
        self.send(self.get("templates").query(&query), "templates")
    }

    fn get_template(&self, id: &str) -> Result<Template> {
        self.send(
            self.get(&format!("templates/{}", id)),
            &format!("template {}", id),
        )
    }

    fn create_template(&self, template: &NewTemplate) -> Result<Template> {
        tracing::debug!(name = %template.name, "creating template");
        self.send(self.post("templates").json(template), "templates")
    }
}
