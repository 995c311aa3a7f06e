//! HTTP transport for the remote card service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{RemoteCardRef, RemoteDeck, RemoteError, RemoteResult, RemoteService};
use crate::util::{compact_text, is_http_url, normalize_text_option};
use crate::{Error, Result};

/// Base URL used when none is configured.
pub const DEFAULT_API_BASE_URL: &str = "https://app.mochi.cards/api";

const HTTP_TIMEOUT_SECS: u64 = 30;
const MAX_DECK_PAGES: usize = 100;

/// JSON API client authenticated with HTTP basic auth (API key as user name).
#[derive(Clone)]
pub struct HttpCardService {
    base_url: String,
    api_key: String,
    client: Client,
}

impl std::fmt::Debug for HttpCardService {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("HttpCardService")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy)]
enum Operation {
    CreateCard,
    UpdateCard,
    ListDecks,
}

#[derive(Debug, Serialize)]
struct CreateCardBody<'a> {
    content: &'a str,
    #[serde(rename = "deck-id")]
    deck_id: &'a str,
    #[serde(rename = "manual-tags")]
    manual_tags: &'a [String],
}

#[derive(Debug, Serialize)]
struct UpdateCardBody<'a> {
    content: &'a str,
    #[serde(rename = "manual-tags")]
    manual_tags: &'a [String],
}

#[derive(Debug, Deserialize)]
struct DeckPage {
    #[serde(default)]
    docs: Vec<DeckDoc>,
    #[serde(default)]
    bookmark: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DeckDoc {
    id: String,
    name: String,
    #[serde(default, rename = "trashed?")]
    trashed: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
    error: Option<String>,
    errors: Option<Value>,
}

impl HttpCardService {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let base_url = normalize_base_url(base_url.into())?;
        let api_key = normalize_text_option(Some(api_key.into()))
            .ok_or_else(|| Error::Config("API key must not be empty".to_string()))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()
            .map_err(|error| Error::Config(format!("failed to build HTTP client: {error}")))?;

        Ok(Self {
            base_url,
            api_key,
            client,
        })
    }

    async fn send(&self, request: RequestBuilder, operation: Operation) -> RemoteResult<Value> {
        let response = request
            .basic_auth(&self.api_key, None::<&str>)
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|error| RemoteError::Service(format!("request failed: {error}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| RemoteError::Service(format!("failed to read response: {error}")))?;

        if !status.is_success() {
            return Err(map_status_error(status, &body, operation));
        }
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body)
            .map_err(|error| RemoteError::Service(format!("invalid JSON response: {error}")))
    }
}

#[async_trait]
impl RemoteService for HttpCardService {
    async fn create_card(
        &self,
        content: &str,
        deck_id: &str,
        tags: &[String],
    ) -> RemoteResult<RemoteCardRef> {
        let deck_id = deck_id.trim();
        if deck_id.is_empty() {
            return Err(RemoteError::DeckNotFound(
                "no deck id configured for card".to_string(),
            ));
        }

        let body = CreateCardBody {
            content,
            deck_id,
            manual_tags: tags,
        };
        let request = self
            .client
            .post(format!("{}/cards/", self.base_url))
            .json(&body);
        let response = self.send(request, Operation::CreateCard).await.map_err(|error| {
            match error {
                RemoteError::DeckNotFound(_) => RemoteError::DeckNotFound(deck_id.to_string()),
                other => other,
            }
        })?;
        Ok(RemoteCardRef::from_response(&response))
    }

    async fn update_card(
        &self,
        remote_id: &str,
        content: &str,
        tags: &[String],
    ) -> RemoteResult<RemoteCardRef> {
        let body = UpdateCardBody {
            content,
            manual_tags: tags,
        };
        let request = self
            .client
            .post(format!("{}/cards/{}", self.base_url, remote_id.trim()))
            .json(&body);
        let response = self.send(request, Operation::UpdateCard).await?;
        let card = RemoteCardRef::from_response(&response);
        if card.is_unknown() {
            Ok(RemoteCardRef {
                id: remote_id.to_string(),
            })
        } else {
            Ok(card)
        }
    }

    async fn list_decks(&self) -> RemoteResult<Vec<RemoteDeck>> {
        let mut decks = Vec::new();
        let mut bookmark: Option<String> = None;

        for _page in 0..MAX_DECK_PAGES {
            let mut request = self.client.get(format!("{}/decks/", self.base_url));
            if let Some(bookmark) = &bookmark {
                request = request.query(&[("bookmark", bookmark)]);
            }

            let response = self.send(request, Operation::ListDecks).await?;
            let page: DeckPage = serde_json::from_value(response)
                .map_err(|error| RemoteError::Service(format!("invalid deck list: {error}")))?;

            let page_len = page.docs.len();
            decks.extend(
                page.docs
                    .into_iter()
                    .filter(|doc| doc.trashed.is_none())
                    .map(|doc| RemoteDeck {
                        id: doc.id,
                        name: doc.name,
                    }),
            );

            let next = normalize_text_option(page.bookmark);
            if page_len == 0 || next.is_none() || next == bookmark {
                return Ok(decks);
            }
            bookmark = next;
        }

        tracing::warn!(
            pages = MAX_DECK_PAGES,
            "Deck listing did not terminate, returning partial result"
        );
        Ok(decks)
    }
}

fn map_status_error(status: StatusCode, body: &str, operation: Operation) -> RemoteError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return RemoteError::RateLimited;
    }
    if status == StatusCode::NOT_FOUND && matches!(operation, Operation::CreateCard) {
        return RemoteError::DeckNotFound(parse_api_error(status, body));
    }
    RemoteError::Service(parse_api_error(status, body))
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        let message = payload
            .message
            .or(payload.error)
            .or_else(|| payload.errors.map(|errors| errors.to_string()));
        if let Some(message) = message {
            return format!("{} ({})", compact_text(&message), status.as_u16());
        }
    }

    let trimmed = compact_text(body);
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", trimmed, status.as_u16())
    }
}

fn normalize_base_url(raw: String) -> Result<String> {
    let base_url = normalize_text_option(Some(raw))
        .ok_or_else(|| Error::Config("API base URL must not be empty".to_string()))?;
    if is_http_url(&base_url) {
        Ok(base_url.trim_end_matches('/').to_string())
    } else {
        Err(Error::Config(
            "API base URL must include http:// or https://".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header_exists, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn service(server: &MockServer) -> HttpCardService {
        HttpCardService::new(server.uri(), "secret-key").unwrap()
    }

    #[test]
    fn normalize_base_url_rejects_invalid_values() {
        assert!(normalize_base_url(String::new()).is_err());
        assert!(normalize_base_url("api.example.com".to_string()).is_err());
        assert_eq!(
            normalize_base_url(" https://api.example.com/api/ ".to_string()).unwrap(),
            "https://api.example.com/api"
        );
    }

    #[test]
    fn empty_api_key_is_rejected() {
        assert!(HttpCardService::new(DEFAULT_API_BASE_URL, "  ").is_err());
    }

    #[test]
    fn debug_redacts_api_key() {
        let service = HttpCardService::new(DEFAULT_API_BASE_URL, "top-secret").unwrap();
        let rendered = format!("{service:?}");
        assert!(!rendered.contains("top-secret"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn parse_api_error_prefers_message_field() {
        assert_eq!(
            parse_api_error(StatusCode::BAD_REQUEST, r#"{"message":"bad deck"}"#),
            "bad deck (400)"
        );
        assert_eq!(
            parse_api_error(StatusCode::BAD_GATEWAY, ""),
            "HTTP 502"
        );
        assert_eq!(
            parse_api_error(StatusCode::INTERNAL_SERVER_ERROR, "oops"),
            "oops (500)"
        );
    }

    #[tokio::test]
    async fn create_card_posts_body_and_reads_nested_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/cards/"))
            .and(header_exists("authorization"))
            .and(body_json(json!({
                "content": "q\n---\na",
                "deck-id": "deck-1",
                "manual-tags": ["geo"],
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"card": {"id": "r-9"}})))
            .expect(1)
            .mount(&server)
            .await;

        let card = service(&server)
            .create_card("q\n---\na", "deck-1", &["geo".to_string()])
            .await
            .unwrap();
        assert_eq!(card.id, "r-9");
    }

    #[tokio::test]
    async fn create_card_without_deck_fails_before_sending() {
        let server = MockServer::start().await;
        let error = service(&server)
            .create_card("content", "  ", &[])
            .await
            .unwrap_err();
        assert!(matches!(error, RemoteError::DeckNotFound(_)));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn status_codes_map_to_error_kinds() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/cards/"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/cards/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
            .mount(&server)
            .await;

        let client = service(&server);
        assert_eq!(
            client.create_card("c", "deck", &[]).await.unwrap_err(),
            RemoteError::RateLimited
        );
        let update_error = client.update_card("missing", "c", &[]).await.unwrap_err();
        assert_eq!(
            update_error,
            RemoteError::Service("not found (404)".to_string())
        );
    }

    #[tokio::test]
    async fn create_card_not_found_means_unknown_deck() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/cards/"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let error = service(&server)
            .create_card("c", "gone", &[])
            .await
            .unwrap_err();
        assert_eq!(error, RemoteError::DeckNotFound("gone".to_string()));
    }

    #[tokio::test]
    async fn update_card_keeps_requested_id_when_response_is_bare() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/cards/abc"))
            .and(body_json(json!({"content": "new", "manual-tags": []})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let card = service(&server)
            .update_card("abc", "new", &[])
            .await
            .unwrap();
        assert_eq!(card.id, "abc");
    }

    #[tokio::test]
    async fn list_decks_follows_bookmarks_and_skips_trashed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/decks/"))
            .and(query_param("bookmark", "page-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "docs": [{"id": "d3", "name": "History"}],
                "bookmark": "page-3",
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/decks/"))
            .and(query_param("bookmark", "page-3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "docs": [],
                "bookmark": "page-3",
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/decks/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "docs": [
                    {"id": "d1", "name": "Geography"},
                    {"id": "d2", "name": "Old", "trashed?": "2024-01-01"},
                ],
                "bookmark": "page-2",
            })))
            .mount(&server)
            .await;

        let decks = service(&server).list_decks().await.unwrap();
        assert_eq!(
            decks,
            vec![
                RemoteDeck {
                    id: "d1".to_string(),
                    name: "Geography".to_string(),
                },
                RemoteDeck {
                    id: "d3".to_string(),
                    name: "History".to_string(),
                },
            ]
        );
    }
}
