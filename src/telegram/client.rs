//! HTTP client for the Bot API

use super::types::{BotCommand, ReplyMarkup, Update};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Transport error with classification
#[derive(Debug, Error)]
#[error("{message}")]
pub struct TelegramError {
    pub kind: TelegramErrorKind,
    pub message: String,
    pub retry_after: Option<Duration>,
}

impl TelegramError {
    pub fn new(kind: TelegramErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            retry_after: None,
        }
    }

    pub fn with_retry_after(mut self, duration: Duration) -> Self {
        self.retry_after = Some(duration);
        self
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(TelegramErrorKind::Network, message)
    }

    pub fn rate_limit(message: impl Into<String>) -> Self {
        Self::new(TelegramErrorKind::RateLimit, message)
    }

    pub fn api(message: impl Into<String>) -> Self {
        Self::new(TelegramErrorKind::Api, message)
    }

    pub fn server(message: impl Into<String>) -> Self {
        Self::new(TelegramErrorKind::Server, message)
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(TelegramErrorKind::Decode, message)
    }
}

/// Error classification for retry decisions in the poll loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelegramErrorKind {
    /// Timeouts and connection failures - retryable
    Network,
    /// 429 - retryable after the advertised delay
    RateLimit,
    /// The API rejected the request (4xx) - not retryable
    Api,
    /// Telegram-side failure (5xx) - retryable
    Server,
    /// Unparseable response body
    Decode,
}

impl TelegramErrorKind {
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            TelegramErrorKind::Network | TelegramErrorKind::RateLimit | TelegramErrorKind::Server
        )
    }
}

/// Envelope every Bot API response arrives in. Missing `Option` fields
/// deserialize to `None`; a `#[serde(default)]` here would force a
/// `T: Default` bound the generic callers cannot meet.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
    error_code: Option<i64>,
    parameters: Option<ResponseParameters>,
}

#[derive(Debug, Deserialize)]
struct ResponseParameters {
    retry_after: Option<u64>,
}

#[derive(Serialize)]
struct GetUpdatesRequest<'a> {
    offset: i64,
    timeout: u64,
    allowed_updates: &'a [&'a str],
}

#[derive(Serialize)]
struct SendMessageRequest<'a> {
    chat_id: i64,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_markup: Option<&'a ReplyMarkup>,
}

#[derive(Serialize)]
struct EditMessageTextRequest<'a> {
    chat_id: i64,
    message_id: i64,
    text: &'a str,
}

#[derive(Serialize)]
struct AnswerCallbackQueryRequest<'a> {
    callback_query_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
}

#[derive(Serialize)]
struct SetMyCommandsRequest<'a> {
    commands: &'a [BotCommand],
}

/// Typed client over the Bot API methods the bot uses
pub struct BotApi {
    client: Client,
    base_url: String,
}

impl BotApi {
    pub fn new(token: &str) -> Self {
        // Request timeout must outlast the long-poll window
        let client = Client::builder()
            .timeout(Duration::from_secs(90))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: format!("https://api.telegram.org/bot{token}"),
        }
    }

    /// Long-poll for updates past `offset`
    pub async fn get_updates(
        &self,
        offset: i64,
        timeout_secs: u64,
    ) -> Result<Vec<Update>, TelegramError> {
        self.call(
            "getUpdates",
            &GetUpdatesRequest {
                offset,
                timeout: timeout_secs,
                allowed_updates: &["message", "callback_query"],
            },
        )
        .await
    }

    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        reply_markup: Option<&ReplyMarkup>,
    ) -> Result<(), TelegramError> {
        let _: serde_json::Value = self
            .call(
                "sendMessage",
                &SendMessageRequest {
                    chat_id,
                    text,
                    reply_markup,
                },
            )
            .await?;
        Ok(())
    }

    pub async fn edit_message_text(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
    ) -> Result<(), TelegramError> {
        let _: serde_json::Value = self
            .call(
                "editMessageText",
                &EditMessageTextRequest {
                    chat_id,
                    message_id,
                    text,
                },
            )
            .await?;
        Ok(())
    }

    pub async fn answer_callback_query(
        &self,
        callback_query_id: &str,
        text: Option<&str>,
    ) -> Result<(), TelegramError> {
        let _: serde_json::Value = self
            .call(
                "answerCallbackQuery",
                &AnswerCallbackQueryRequest {
                    callback_query_id,
                    text,
                },
            )
            .await?;
        Ok(())
    }

    pub async fn set_my_commands(&self, commands: &[BotCommand]) -> Result<(), TelegramError> {
        let _: serde_json::Value = self
            .call("setMyCommands", &SetMyCommandsRequest { commands })
            .await?;
        Ok(())
    }

    async fn call<T, B>(&self, method: &str, body: &B) -> Result<T, TelegramError>
    where
        T: DeserializeOwned,
        B: Serialize,
    {
        let url = format!("{}/{method}", self.base_url);
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TelegramError::network(format!("Request timeout: {e}"))
                } else if e.is_connect() {
                    TelegramError::network(format!("Connection failed: {e}"))
                } else {
                    TelegramError::network(format!("Request failed: {e}"))
                }
            })?;

        let envelope: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| TelegramError::decode(format!("Malformed response from {method}: {e}")))?;

        if envelope.ok {
            envelope
                .result
                .ok_or_else(|| TelegramError::decode(format!("Missing result from {method}")))
        } else {
            Err(classify_api_error(method, &envelope))
        }
    }
}

fn classify_api_error<T>(method: &str, envelope: &ApiResponse<T>) -> TelegramError {
    let code = envelope.error_code.unwrap_or(0);
    let description = envelope.description.as_deref().unwrap_or("unknown error");
    let message = format!("{method} failed: {code} {description}");

    match code {
        429 => {
            let mut err = TelegramError::rate_limit(message);
            if let Some(retry) = envelope.parameters.as_ref().and_then(|p| p.retry_after) {
                err = err.with_retry_after(Duration::from_secs(retry));
            }
            err
        }
        400..=499 => TelegramError::api(message),
        _ => TelegramError::server(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_rate_limit_with_retry_after() {
        let envelope: ApiResponse<serde_json::Value> = serde_json::from_str(
            r#"{"ok":false,"error_code":429,"description":"Too Many Requests: retry after 7","parameters":{"retry_after":7}}"#,
        )
        .unwrap();

        let err = classify_api_error("sendMessage", &envelope);
        assert_eq!(err.kind, TelegramErrorKind::RateLimit);
        assert_eq!(err.retry_after, Some(Duration::from_secs(7)));
        assert!(err.kind.is_retryable());
    }

    #[test]
    fn test_classify_client_error() {
        let envelope: ApiResponse<serde_json::Value> = serde_json::from_str(
            r#"{"ok":false,"error_code":400,"description":"Bad Request: message is not modified"}"#,
        )
        .unwrap();

        let err = classify_api_error("editMessageText", &envelope);
        assert_eq!(err.kind, TelegramErrorKind::Api);
        assert!(!err.kind.is_retryable());
        assert!(err.to_string().contains("message is not modified"));
    }

    #[test]
    fn test_classify_server_error() {
        let envelope: ApiResponse<serde_json::Value> =
            serde_json::from_str(r#"{"ok":false,"error_code":502,"description":"Bad Gateway"}"#)
                .unwrap();

        let err = classify_api_error("getUpdates", &envelope);
        assert_eq!(err.kind, TelegramErrorKind::Server);
        assert!(err.kind.is_retryable());
    }

    #[test]
    fn test_error_envelope_without_result() {
        // Error envelopes omit `result` entirely; it must come back as
        // None even for payload types that have no Default impl.
        let envelope: ApiResponse<Update> =
            serde_json::from_str(r#"{"ok":false,"error_code":401,"description":"Unauthorized"}"#)
                .unwrap();

        assert!(!envelope.ok);
        assert!(envelope.result.is_none());
        assert_eq!(envelope.description.as_deref(), Some("Unauthorized"));
    }

    #[test]
    fn test_ok_envelope_parses_updates() {
        let envelope: ApiResponse<Vec<Update>> = serde_json::from_str(
            r#"{"ok":true,"result":[{"update_id":1,"message":{"message_id":2,"chat":{"id":3},"date":0,"text":"hi"}}]}"#,
        )
        .unwrap();

        assert!(envelope.ok);
        assert_eq!(envelope.result.unwrap().len(), 1);
    }
}
