//! Chat router - one participant's uniform entry point to its provider.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::{ConversationConfig, ParticipantConfig};
use crate::error::Error;
use crate::group::filter_for;

use super::llm::{ChatAdapter, ChatRequest, ProviderRegistry};
use super::message::{HistoryItem, Message};
use super::normalizer::{fix, join, window};

/// Prefix of the reply for engines nobody registered.
pub const UNSUPPORTED_ENGINE: &str = "Unsupported engine";

/// Routes a participant's conversation to its provider adapter.
///
/// Always answers with a string: provider and transport failures come back
/// as readable error text so the conversation keeps moving.
#[derive(Clone)]
pub struct ChatRouter {
    participant: ParticipantConfig,
    conversation: ConversationConfig,
    adapter: Option<Arc<dyn ChatAdapter>>,
}

impl ChatRouter {
    /// Resolve the participant's engine against the registry.
    pub fn new(
        participant: ParticipantConfig,
        conversation: ConversationConfig,
        registry: &ProviderRegistry,
    ) -> Self {
        let adapter = registry.get(&participant.engine);
        if adapter.is_none() {
            warn!("No adapter registered for engine '{}'", participant.engine);
        }
        Self {
            participant,
            conversation,
            adapter,
        }
    }

    pub fn participant(&self) -> &ParticipantConfig {
        &self.participant
    }

    pub fn is_supported(&self) -> bool {
        self.adapter.is_some()
    }

    /// Private chat: the last `history_length` entries plus the prompt.
    pub async fn send_private(&self, prompt: &str, history: &[HistoryItem]) -> String {
        let size = self.participant.private_window(&self.conversation);
        self.dispatch(prompt, window(history, size)).await
    }

    /// Group chat: this participant's filtered view of the shared history.
    pub async fn send_group(&self, prompt: &str, group_history: &[Message]) -> String {
        let size = self.participant.group_window(&self.conversation);
        let view: Vec<HistoryItem> = filter_for(group_history, &self.participant.id, size)
            .into_iter()
            .map(HistoryItem::Message)
            .collect();
        self.dispatch(prompt, &view).await
    }

    async fn dispatch(&self, prompt: &str, history: &[HistoryItem]) -> String {
        let Some(adapter) = &self.adapter else {
            return format!("{}: {}", UNSUPPORTED_ENGINE, self.participant.engine);
        };

        let system = self.participant.effective_system_prompt(&self.conversation);
        let messages = fix(&join(system, prompt, history));
        if messages.is_empty() {
            return format!("[{}] Error: no messages to send", adapter.name());
        }

        info!(
            "Dispatching {} messages for '{}' via {}",
            messages.len(),
            self.participant.id,
            adapter.name()
        );
        debug!("Outbound messages: {:?}", messages);

        let request = ChatRequest {
            participant: &self.participant,
            messages: &messages,
        };
        match adapter.send_chat(&request).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!("{} call for '{}' failed: {}", adapter.name(), self.participant.id, e);
                render_failure(adapter.name(), &e)
            }
        }
    }
}

/// Visible text for a failed provider call.
pub fn render_failure(provider: &str, err: &Error) -> String {
    if err.is_provider() {
        format!("[{}] Error: {}", provider, err)
    } else {
        format!("[{}] API error: {}", provider, err)
    }
}
