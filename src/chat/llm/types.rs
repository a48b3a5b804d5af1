//! Wire types shared by the provider adapters.
//!
//! Most engines speak the OpenAI chat-completions dialect; the request and
//! response shapes below cover all of them, including the looser error
//! payloads some vendors return.

use reqwest::{Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::chat::message::ChatMessage;
use crate::error::Error;
use crate::Result;

/// Chat-completions request body.
#[derive(Debug, Serialize)]
pub struct CompletionRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<&'a str>,
    pub messages: &'a [ChatMessage],
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
}

/// Chat-completions response, success or failure.
#[derive(Debug, Default, Deserialize)]
pub struct CompletionResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub error: Option<ApiError>,
}

impl CompletionResponse {
    /// Text of the first completion, if there is one.
    pub fn first_text(&self) -> Option<&str> {
        self.choices.first()?.message.as_ref()?.content.as_deref()
    }
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

/// Vendor error payload: `{"message": ...}` or a bare string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ApiError {
    Detailed { message: String },
    Plain(String),
}

impl ApiError {
    pub fn message(&self) -> &str {
        match self {
            ApiError::Detailed { message } => message,
            ApiError::Plain(message) => message,
        }
    }
}

/// Coze v2 chat request body.
#[derive(Debug, Serialize)]
pub struct CozeRequest<'a> {
    pub bot_id: &'a str,
    pub user: &'a str,
    pub query: &'a str,
    pub chat_history: &'a [ChatMessage],
    pub stream: bool,
}

/// Coze v2 chat response. Gateways in front of Coze may answer with an
/// OpenAI-style `error` object instead of `msg`.
#[derive(Debug, Deserialize)]
pub struct CozeResponse {
    #[serde(default)]
    pub msg: String,
    #[serde(default)]
    pub messages: Vec<CozeMessage>,
    #[serde(default)]
    pub error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
pub struct CozeMessage {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub content: String,
}

/// Maximum response body echoed back in error strings.
const MAX_ERROR_BODY: usize = 300;

/// Read a chat-completions response into the first completion's text.
///
/// A parseable vendor error becomes [`Error::Provider`]; anything else that
/// is not a completion becomes a plain error.
pub async fn read_completion(provider: &str, response: Response) -> Result<String> {
    let status = response.status();
    let body = response.text().await?;
    debug!("{} responded {} ({} bytes)", provider, status, body.len());

    let parsed: CompletionResponse = match serde_json::from_str(&body) {
        Ok(parsed) => parsed,
        Err(e) if status.is_success() => return Err(Error::Json(e)),
        Err(_) => return Err(http_error(status, &body)),
    };

    if let Some(text) = parsed.first_text() {
        return Ok(text.to_string());
    }

    match parsed.error {
        Some(err) => Err(Error::provider(provider, err.message())),
        None if status.is_success() => Err(Error::Other("response contained no completion".to_string())),
        None => Err(http_error(status, &body)),
    }
}

/// Plain error for a response that carries nothing the adapter understands.
pub(crate) fn http_error(status: StatusCode, body: &str) -> Error {
    Error::Other(format!("HTTP {}: {}", status.as_u16(), truncate(body)))
}

fn truncate(body: &str) -> &str {
    match body.char_indices().nth(MAX_ERROR_BODY) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}
