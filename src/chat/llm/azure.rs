//! Azure OpenAI chat adapter (api-key header, deployment-scoped URL).

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::error::Error;
use crate::Result;

use super::types::{read_completion, CompletionRequest};
use super::{ChatAdapter, ChatRequest};

const DEFAULT_API_VERSION: &str = "2024-02-01";

/// Azure OpenAI client. The participant's `model` names the deployment.
#[derive(Clone)]
pub struct AzureOpenAi {
    client: Client,
}

impl AzureOpenAi {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn build_url(&self, request: &ChatRequest<'_>) -> Result<String> {
        let participant = request.participant;
        let endpoint = participant.api_endpoint.trim().trim_end_matches('/');
        if endpoint.is_empty() {
            return Err(Error::Config("api_endpoint is required for AzureOpenAI".to_string()));
        }

        let version = participant
            .api_version
            .as_deref()
            .filter(|v| !v.is_empty())
            .unwrap_or(DEFAULT_API_VERSION);

        Ok(format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            endpoint, participant.model, version
        ))
    }
}

#[async_trait]
impl ChatAdapter for AzureOpenAi {
    fn name(&self) -> &str {
        "AzureOpenAI"
    }

    async fn send_chat(&self, request: &ChatRequest<'_>) -> Result<String> {
        let url = self.build_url(request)?;
        // The deployment already pins the model.
        let body = CompletionRequest {
            model: None,
            messages: request.messages,
            temperature: request.participant.temperature,
            max_tokens: None,
            stream: None,
        };

        debug!("AzureOpenAI request with {} messages", request.messages.len());

        let mut req = self.client.post(&url).json(&body);
        if let Some(key) = request.participant.credential().api_key() {
            req = req.header("api-key", key);
        }
        let response = req.send().await?;

        read_completion(self.name(), response).await
    }
}
