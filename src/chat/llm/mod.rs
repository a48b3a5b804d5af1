//! Provider adapter layer.
//!
//! This module provides:
//! - [`ChatAdapter`] trait for swappable chat-completion providers
//! - [`ProviderRegistry`] mapping engine identifiers to adapters
//! - Concrete implementations: OpenAI-compatible family, Azure OpenAI, Coze
//!
//! # Adding a New Provider
//!
//! 1. OpenAI-compatible vendors only need a [`Profile`] in
//!    `ProviderRegistry::with_client()`
//! 2. Anything else: implement `ChatAdapter` in a new file and register it
//!    under its engine identifier

mod types;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::warn;

use crate::config::ParticipantConfig;
use crate::Result;

use super::message::ChatMessage;

pub use types::*;

pub mod azure;
pub mod coze;
pub mod openai;

#[cfg(test)]
pub(crate) mod stub;

pub use azure::AzureOpenAi;
pub use coze::Coze;
pub use openai::{BaseUrl, BearerSource, OpenAiCompatible, Profile};

/// One outbound chat call: who is asking and the normalized messages.
#[derive(Debug, Clone, Copy)]
pub struct ChatRequest<'a> {
    /// Endpoint, credential, model, version and temperature
    pub participant: &'a ParticipantConfig,
    pub messages: &'a [ChatMessage],
}

impl<'a> ChatRequest<'a> {
    /// Configured model, else the engine default.
    pub fn model(&self, default: Option<&'a str>) -> Option<&'a str> {
        let model = self.participant.model.as_str();
        if model.is_empty() { default } else { Some(model) }
    }
}

/// Chat adapter trait - one strategy per provider family.
///
/// Implementations make exactly one outbound call and return the first
/// completion's text. Vendor error payloads come back as
/// [`Error::Provider`](crate::error::Error::Provider); everything else is a
/// transport-level error.
#[async_trait]
pub trait ChatAdapter: Send + Sync {
    /// Provider name used in user-visible error strings.
    fn name(&self) -> &str;

    async fn send_chat(&self, request: &ChatRequest<'_>) -> Result<String>;
}

/// Engine identifier → adapter lookup.
///
/// # Example
///
/// ```ignore
/// let registry = ProviderRegistry::with_defaults(Duration::from_secs(120));
/// let adapter = registry.get("DeepSeek").expect("registered");
/// ```
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    adapters: HashMap<String, Arc<dyn ChatAdapter>>,
}

/// OpenAI-compatible engines with a vendor base URL.
const HOSTED_PROFILES: &[Profile] = &[
    Profile::fixed("Qwen", "https://dashscope.aliyuncs.com/compatible-mode/v1"),
    Profile::fixed("QianFan", "https://qianfan.baidubce.com/v2"),
    Profile::fixed("DeepSeek", "https://api.deepseek.com"),
    Profile::fixed("Moonshot", "https://api.moonshot.cn/v1"),
    Profile::fixed("Yi", "https://api.lingyiwanwu.com/v1"),
    Profile::fixed("Groq", "https://api.groq.com/openai/v1"),
    Profile::fixed("MiniMax", "https://api.minimax.chat/v1"),
    Profile::fixed("Stepfun", "https://api.stepfun.com/v1"),
    Profile::fixed("302AI", "https://api.302.ai/v1"),
    Profile::fixed("siliconflow", "https://api.siliconflow.cn/v1"),
    Profile::fixed("ChatGLM", "https://open.bigmodel.cn/api/paas/v4").with_default_model("glm-4"),
];

const XINGHUO: Profile = Profile {
    bearer: BearerSource::ApiPassword,
    max_tokens: Some(4096),
    stream_flag: true,
    ..Profile::fixed("XingHuo", "https://spark-api-open.xf-yun.com/v1").with_default_model("generalv3.5")
};

impl ProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in engine, sharing one HTTP client.
    pub fn with_defaults(timeout: Duration) -> Self {
        let client = Client::builder().timeout(timeout).build().unwrap_or_else(|e| {
            warn!("Falling back to default HTTP client: {}", e);
            Client::new()
        });
        Self::with_client(client)
    }

    pub fn with_client(client: Client) -> Self {
        let mut registry = Self::new();

        for profile in HOSTED_PROFILES {
            let engine = match profile.name {
                // Engine ids differ from display names for a few vendors.
                "QianFan" => "Qianfan",
                name => name,
            };
            registry.register(engine, OpenAiCompatible::new(*profile, client.clone()));
        }
        registry.register("XingHuo", OpenAiCompatible::new(XINGHUO, client.clone()));

        let openai: Arc<dyn ChatAdapter> =
            Arc::new(OpenAiCompatible::new(Profile::configured("OpenAI"), client.clone()));
        registry.register_shared("OpenAI", openai.clone());
        registry.register_shared("OpenAI-compatible", openai);
        registry.register(
            "Ollama",
            OpenAiCompatible::new(Profile::configured("Ollama"), client.clone()),
        );

        registry.register("AzureOpenAI", AzureOpenAi::new(client.clone()));
        registry.register("CoZe", Coze::new(client));

        registry
    }

    /// Register an adapter under an engine identifier.
    pub fn register<A: ChatAdapter + 'static>(&mut self, engine: &str, adapter: A) {
        self.register_shared(engine, Arc::new(adapter));
    }

    pub fn register_shared(&mut self, engine: &str, adapter: Arc<dyn ChatAdapter>) {
        self.adapters.insert(engine.to_string(), adapter);
    }

    pub fn get(&self, engine: &str) -> Option<Arc<dyn ChatAdapter>> {
        self.adapters.get(engine).cloned()
    }

    pub fn has(&self, engine: &str) -> bool {
        self.adapters.contains_key(engine)
    }

    /// Registered engine identifiers, sorted.
    pub fn engines(&self) -> Vec<&str> {
        let mut engines: Vec<&str> = self.adapters.keys().map(|s| s.as_str()).collect();
        engines.sort_unstable();
        engines
    }
}

/// Fake adapter for testing: replays scripted replies and records requests.
#[cfg(test)]
pub struct FakeAdapter {
    name: String,
    replies: std::sync::Mutex<std::collections::VecDeque<Result<String>>>,
    calls: std::sync::Mutex<Vec<FakeCall>>,
}

/// A request seen by [`FakeAdapter`].
#[cfg(test)]
#[derive(Debug, Clone)]
pub struct FakeCall {
    pub participant_id: String,
    pub messages: Vec<ChatMessage>,
}

#[cfg(test)]
impl FakeAdapter {
    /// Create with predefined text replies. When they run out, replies echo
    /// the participant id.
    pub fn new(replies: Vec<&str>) -> Self {
        Self::scripted(replies.into_iter().map(|r| Ok(r.to_string())).collect())
    }

    pub fn scripted(replies: Vec<Result<String>>) -> Self {
        Self {
            name: "Fake".to_string(),
            replies: std::sync::Mutex::new(replies.into()),
            calls: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<FakeCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl ChatAdapter for FakeAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send_chat(&self, request: &ChatRequest<'_>) -> Result<String> {
        self.calls.lock().unwrap().push(FakeCall {
            participant_id: request.participant.id.clone(),
            messages: request.messages.to_vec(),
        });
        let mut replies = self.replies.lock().unwrap();
        replies
            .pop_front()
            .unwrap_or_else(|| Ok(format!("reply from {}", request.participant.id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fake_adapter() {
        let adapter = FakeAdapter::new(vec!["Hello!", "World!"]);
        let participant = ParticipantConfig::new("p", "Fake", "m");
        let request = ChatRequest { participant: &participant, messages: &[] };

        assert_eq!(adapter.send_chat(&request).await.unwrap(), "Hello!");
        assert_eq!(adapter.send_chat(&request).await.unwrap(), "World!");
        assert_eq!(adapter.send_chat(&request).await.unwrap(), "reply from p");
        assert_eq!(adapter.calls().len(), 3);
    }

    #[test]
    fn test_default_engines_registered() {
        let registry = ProviderRegistry::with_client(Client::new());
        for engine in [
            "AzureOpenAI", "ChatGLM", "CoZe", "Qwen", "Ollama", "Qianfan", "XingHuo",
            "DeepSeek", "Moonshot", "Yi", "Groq", "MiniMax", "Stepfun", "302AI",
            "siliconflow", "OpenAI", "OpenAI-compatible",
        ] {
            assert!(registry.has(engine), "missing {engine}");
        }
        assert_eq!(registry.get("Qianfan").unwrap().name(), "QianFan");
        assert_eq!(registry.get("OpenAI-compatible").unwrap().name(), "OpenAI");
        assert!(registry.get("Gemini").is_none());
    }

    #[test]
    fn test_request_model_fallback() {
        let mut participant = ParticipantConfig::new("p", "ChatGLM", "");
        let request = ChatRequest { participant: &participant, messages: &[] };
        assert_eq!(request.model(Some("glm-4")), Some("glm-4"));
        assert_eq!(request.model(None), None);

        participant.model = "glm-4-plus".to_string();
        let request = ChatRequest { participant: &participant, messages: &[] };
        assert_eq!(request.model(Some("glm-4")), Some("glm-4-plus"));
    }
}
