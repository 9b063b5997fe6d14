//! Minimal Telegram Bot API client
//!
//! Only the two calls the bot needs: `getUpdates` (long polling) and
//! `sendMessage`.

use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::debug;

/// Default Bot API host
pub const DEFAULT_API_BASE_URL: &str = "https://api.telegram.org";

/// Slack added on top of the long-poll timeout for the HTTP request itself
const REQUEST_SLACK: Duration = Duration::from_secs(10);

const SEND_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Bot API error {code}: {description}")]
    Api { code: i32, description: String },
}

/// Envelope every Bot API response is wrapped in
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    error_code: Option<i32>,
    description: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Message {
    pub message_id: i64,
    #[serde(default)]
    pub from: Option<User>,
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct User {
    pub id: i64,
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

impl User {
    pub fn display_name(&self) -> String {
        match &self.last_name {
            Some(last) if !last.is_empty() => format!("{} {}", self.first_name, last),
            _ => self.first_name.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Chat {
    pub id: i64,
}

pub struct TelegramClient {
    http: Client,
    /// `{api_base_url}/bot{token}`
    endpoint: String,
}

impl TelegramClient {
    pub fn new(api_base_url: &str, token: &str) -> Result<Self, TelegramError> {
        let http = Client::builder()
            .user_agent(concat!("uptime-watch/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            endpoint: format!("{}/bot{}", api_base_url.trim_end_matches('/'), token),
        })
    }

    /// Long-poll for updates with id >= `offset`.
    pub async fn get_updates(
        &self,
        offset: i64,
        timeout: Duration,
    ) -> Result<Vec<Update>, TelegramError> {
        let body = json!({
            "offset": offset,
            "timeout": timeout.as_secs(),
            "allowed_updates": ["message"],
        });
        self.call("getUpdates", &body, timeout + REQUEST_SLACK).await
    }

    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), TelegramError> {
        let body = json!({
            "chat_id": chat_id,
            "text": text,
            "disable_web_page_preview": true,
        });
        self.call::<serde_json::Value>("sendMessage", &body, SEND_TIMEOUT)
            .await
            .map(|_| ())
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: &serde_json::Value,
        timeout: Duration,
    ) -> Result<T, TelegramError> {
        debug!(method, "Calling Bot API");

        // Error replies carry a JSON envelope too, so the status code is
        // not checked separately.
        let response: ApiResponse<T> = self
            .http
            .post(format!("{}/{}", self.endpoint, method))
            .json(body)
            .timeout(timeout)
            .send()
            .await?
            .json()
            .await?;

        match response {
            ApiResponse {
                ok: true,
                result: Some(result),
                ..
            } => Ok(result),
            other => Err(TelegramError::Api {
                code: other.error_code.unwrap_or_default(),
                description: other
                    .description
                    .unwrap_or_else(|| "missing result".to_string()),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn get_updates_parses_messages() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/botTOKEN/getUpdates"))
            .and(body_partial_json(json!({ "offset": 7 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "result": [{
                    "update_id": 7,
                    "message": {
                        "message_id": 1,
                        "from": {
                            "id": 42,
                            "first_name": "Ada",
                            "last_name": "Lovelace",
                            "username": "ada"
                        },
                        "chat": { "id": 42, "type": "private" },
                        "date": 0,
                        "text": "/list"
                    }
                }, {
                    "update_id": 8,
                    "edited_message": {}
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = TelegramClient::new(&server.uri(), "TOKEN").unwrap();
        let updates = client.get_updates(7, Duration::from_secs(0)).await.unwrap();

        assert_eq!(updates.len(), 2);
        let message = updates[0].message.as_ref().unwrap();
        assert_eq!(message.text.as_deref(), Some("/list"));
        assert_eq!(message.chat.id, 42);
        let from = message.from.as_ref().unwrap();
        assert_eq!(from.display_name(), "Ada Lovelace");
        assert_eq!(from.username.as_deref(), Some("ada"));
        assert!(updates[1].message.is_none());
    }

    #[tokio::test]
    async fn send_message_posts_chat_and_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/botTOKEN/sendMessage"))
            .and(body_partial_json(json!({ "chat_id": 42, "text": "hello" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "result": { "message_id": 5 }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = TelegramClient::new(&server.uri(), "TOKEN").unwrap();
        client.send_message(42, "hello").await.unwrap();
    }

    #[tokio::test]
    async fn api_errors_carry_code_and_description() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "ok": false,
                "error_code": 403,
                "description": "Forbidden: bot was blocked by the user"
            })))
            .mount(&server)
            .await;

        let client = TelegramClient::new(&server.uri(), "TOKEN").unwrap();
        let err = client.send_message(42, "hello").await.unwrap_err();

        match err {
            TelegramError::Api { code, description } => {
                assert_eq!(code, 403);
                assert!(description.contains("blocked"));
            }
            other => panic!("expected Api error, got {:?}", other),
        }
    }

    #[test]
    fn display_name_skips_missing_last_name() {
        let user = User {
            id: 1,
            first_name: "Ada".into(),
            last_name: None,
            username: None,
        };
        assert_eq!(user.display_name(), "Ada");
    }
}
