//! OpenAI-compatible chat adapter.
//!
//! One implementation serves every engine that speaks the chat-completions
//! dialect; engines differ only in base URL, default model and which
//! credential goes into the bearer header.

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::error::Error;
use crate::Result;

use super::types::{read_completion, CompletionRequest};
use super::{ChatAdapter, ChatRequest};

/// Where the API lives.
#[derive(Debug, Clone, Copy)]
pub enum BaseUrl {
    /// Vendor endpoint; a participant's `base_url` still overrides it
    Fixed(&'static str),
    /// Must come from the participant's `base_url`
    Configured,
}

/// Which credential is sent as the bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BearerSource {
    ApiKey,
    /// API password, falling back to the key
    ApiPassword,
}

/// Static description of one OpenAI-compatible engine.
#[derive(Debug, Clone, Copy)]
pub struct Profile {
    pub name: &'static str,
    pub base_url: BaseUrl,
    pub default_model: Option<&'static str>,
    pub bearer: BearerSource,
    pub max_tokens: Option<u32>,
    pub stream_flag: bool,
}

impl Profile {
    pub const fn fixed(name: &'static str, base_url: &'static str) -> Self {
        Self {
            name,
            base_url: BaseUrl::Fixed(base_url),
            default_model: None,
            bearer: BearerSource::ApiKey,
            max_tokens: None,
            stream_flag: false,
        }
    }

    pub const fn configured(name: &'static str) -> Self {
        Self {
            base_url: BaseUrl::Configured,
            ..Self::fixed(name, "")
        }
    }

    pub const fn with_default_model(mut self, model: &'static str) -> Self {
        self.default_model = Some(model);
        self
    }
}

/// Chat adapter for one OpenAI-compatible engine.
#[derive(Clone)]
pub struct OpenAiCompatible {
    profile: Profile,
    client: Client,
}

impl OpenAiCompatible {
    pub fn new(profile: Profile, client: Client) -> Self {
        Self { profile, client }
    }

    fn build_url(&self, request: &ChatRequest<'_>) -> Result<String> {
        let configured = request.participant.base_url.trim();
        let base = match self.profile.base_url {
            _ if !configured.is_empty() => configured,
            BaseUrl::Fixed(url) => url,
            BaseUrl::Configured => {
                return Err(Error::Config(format!(
                    "base_url is required for engine {}",
                    self.profile.name
                )))
            }
        };
        Ok(format!("{}/chat/completions", base.trim_end_matches('/')))
    }

    fn bearer<'a>(&self, request: &ChatRequest<'a>) -> Option<&'a str> {
        let credential = request.participant.credential();
        match self.profile.bearer {
            BearerSource::ApiKey => credential.api_key(),
            BearerSource::ApiPassword => credential.bearer_token(),
        }
    }
}

#[async_trait]
impl ChatAdapter for OpenAiCompatible {
    fn name(&self) -> &str {
        self.profile.name
    }

    async fn send_chat(&self, request: &ChatRequest<'_>) -> Result<String> {
        let url = self.build_url(request)?;
        let body = CompletionRequest {
            model: request.model(self.profile.default_model),
            messages: request.messages,
            temperature: request.participant.temperature,
            max_tokens: self.profile.max_tokens,
            stream: self.profile.stream_flag.then_some(false),
        };

        debug!(
            "{} request to {} with {} messages",
            self.profile.name,
            url,
            request.messages.len()
        );

        let mut req = self.client.post(&url).json(&body);
        if let Some(token) = self.bearer(request) {
            req = req.bearer_auth(token);
        }

        let response = req.send().await?;
        read_completion(self.profile.name, response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::llm::stub;
    use crate::chat::message::ChatMessage;
    use crate::config::ParticipantConfig;

    fn adapter(profile: Profile) -> OpenAiCompatible {
        OpenAiCompatible::new(profile, Client::new())
    }

    #[tokio::test]
    async fn test_success_extracts_first_completion() {
        let (url, server) = stub::serve_once(
            200,
            r#"{"choices": [{"message": {"content": "first"}}, {"message": {"content": "second"}}]}"#,
        )
        .await;

        let mut participant = ParticipantConfig::new("p", "DeepSeek", "deepseek-chat");
        participant.base_url = url;
        participant.api_key = "sk-test".to_string();
        participant.temperature = 0.3;
        let messages = vec![ChatMessage::user("hello")];

        let reply = adapter(Profile::fixed("DeepSeek", "https://api.deepseek.com"))
            .send_chat(&ChatRequest { participant: &participant, messages: &messages })
            .await
            .unwrap();
        assert_eq!(reply, "first");

        let captured = server.await.unwrap();
        assert!(captured.head.starts_with("POST /chat/completions"));
        assert!(captured.header("authorization").unwrap().ends_with("sk-test"));
        assert_eq!(captured.body["model"], "deepseek-chat");
        assert_eq!(captured.body["messages"][0]["content"], "hello");
        assert!(captured.body.get("max_tokens").is_none());
    }

    #[tokio::test]
    async fn test_provider_error_payload() {
        let (url, _server) =
            stub::serve_once(401, r#"{"error": {"message": "invalid api key"}}"#).await;
        let mut participant = ParticipantConfig::new("p", "Qwen", "qwen-max");
        participant.base_url = url;
        let messages = vec![ChatMessage::user("hello")];

        let err = adapter(Profile::fixed("Qwen", "https://example.invalid"))
            .send_chat(&ChatRequest { participant: &participant, messages: &messages })
            .await
            .unwrap_err();
        assert!(err.is_provider());
        assert_eq!(err.to_string(), "invalid api key");
    }

    #[tokio::test]
    async fn test_xinghuo_profile_uses_password_and_defaults() {
        let (url, server) =
            stub::serve_once(200, r#"{"choices": [{"message": {"content": "ok"}}]}"#).await;
        let mut participant = ParticipantConfig::new("p", "XingHuo", "");
        participant.base_url = url;
        participant.api_key = "key".to_string();
        participant.api_password = "password".to_string();
        let messages = vec![ChatMessage::user("hello")];

        let profile = Profile {
            bearer: BearerSource::ApiPassword,
            max_tokens: Some(4096),
            stream_flag: true,
            ..Profile::fixed("XingHuo", "https://example.invalid").with_default_model("generalv3.5")
        };
        adapter(profile)
            .send_chat(&ChatRequest { participant: &participant, messages: &messages })
            .await
            .unwrap();

        let captured = server.await.unwrap();
        assert_eq!(captured.header("authorization"), Some("Bearer password"));
        assert_eq!(captured.body["model"], "generalv3.5");
        assert_eq!(captured.body["max_tokens"], 4096);
        assert_eq!(captured.body["stream"], false);
    }

    #[tokio::test]
    async fn test_configured_base_url_required() {
        let participant = ParticipantConfig::new("p", "Ollama", "llama3");
        let messages = vec![ChatMessage::user("hello")];
        let err = adapter(Profile::configured("Ollama"))
            .send_chat(&ChatRequest { participant: &participant, messages: &messages })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_url_override_and_trailing_slash() {
        let adapter = adapter(Profile::fixed("Yi", "https://api.lingyiwanwu.com/v1/"));
        let mut participant = ParticipantConfig::new("p", "Yi", "yi-large");
        let request = ChatRequest { participant: &participant, messages: &[] };
        assert_eq!(
            adapter.build_url(&request).unwrap(),
            "https://api.lingyiwanwu.com/v1/chat/completions"
        );

        participant.base_url = "http://proxy.local/v1".to_string();
        let request = ChatRequest { participant: &participant, messages: &[] };
        assert_eq!(adapter.build_url(&request).unwrap(), "http://proxy.local/v1/chat/completions");
    }
}
