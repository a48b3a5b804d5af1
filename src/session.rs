//! Session - owns configuration, registries and every conversation thread.

use std::collections::HashMap;
use std::time::Duration;

use tracing::info;

use crate::chat::llm::ProviderRegistry;
use crate::chat::message::Message;
use crate::chat::router::ChatRouter;
use crate::config::{Config, ParticipantConfig};
use crate::group::{AutoSpeakPolicy, GroupHistory, HistoryThread, Threads, TurnOutcome};
use crate::tools::{InvokeOutcome, ToolInvoker, ToolRegistry};

const PRIVATE_THREAD_PREFIX: &str = "Topic";
const GROUP_THREAD_PREFIX: &str = "Group";

/// Read-only view of what a turn needs.
#[derive(Clone, Copy)]
pub struct TurnContext<'a> {
    pub config: &'a Config,
    pub providers: &'a ProviderRegistry,
    pub tools: &'a ToolRegistry,
}

impl<'a> TurnContext<'a> {
    pub fn router_for(&self, participant: &ParticipantConfig) -> ChatRouter {
        ChatRouter::new(
            participant.clone(),
            self.config.conversation.clone(),
            self.providers,
        )
    }
}

/// A private reply from one participant.
#[derive(Debug, Clone, PartialEq)]
pub struct PrivateReply {
    pub participant_id: String,
    pub participant_name: String,
    pub content: String,
}

/// One user's conversations: a private thread book per participant and a
/// group thread book.
pub struct Session {
    config: Config,
    providers: ProviderRegistry,
    tools: ToolRegistry,
    private: HashMap<String, Threads<HistoryThread>>,
    group: Threads<GroupHistory>,
}

impl Session {
    /// Session with the built-in engines and tools.
    pub fn new(config: Config) -> Self {
        let providers = ProviderRegistry::with_defaults(Duration::from_secs(config.request_timeout_secs));
        let tools = ToolRegistry::with_defaults(&config, &providers);
        Self::with_registries(config, providers, tools)
    }

    pub fn with_registries(config: Config, providers: ProviderRegistry, tools: ToolRegistry) -> Self {
        Self {
            config,
            providers,
            tools,
            private: HashMap::new(),
            group: Threads::new(GROUP_THREAD_PREFIX),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn providers(&self) -> &ProviderRegistry {
        &self.providers
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Every enabled participant answers `prompt` from its own current thread.
    ///
    /// A blank prompt is ignored: nothing is sent or stored.
    pub async fn private_turn(&mut self, prompt: &str) -> Vec<PrivateReply> {
        if prompt.trim().is_empty() {
            return Vec::new();
        }
        let ctx = TurnContext {
            config: &self.config,
            providers: &self.providers,
            tools: &self.tools,
        };
        let mut replies = Vec::new();

        for participant in ctx.config.enabled_participants() {
            let thread = self
                .private
                .entry(participant.id.clone())
                .or_insert_with(|| Threads::new(PRIVATE_THREAD_PREFIX))
                .current_mut();

            let reply = ctx
                .router_for(participant)
                .send_private(prompt, &thread.items())
                .await;

            thread.push(Message::user(prompt));
            thread.push(Message::from_participant(
                &participant.id,
                participant.display_name(),
                reply.clone(),
            ));
            replies.push(PrivateReply {
                participant_id: participant.id.clone(),
                participant_name: participant.display_name().to_string(),
                content: reply,
            });
        }

        replies
    }

    /// Record `input` in the current group thread and let the policy run the turn.
    pub async fn group_turn(&mut self, input: &str) -> TurnOutcome {
        let ctx = TurnContext {
            config: &self.config,
            providers: &self.providers,
            tools: &self.tools,
        };
        AutoSpeakPolicy::new(ctx)
            .run_turn(self.group.current_mut(), input)
            .await
    }

    /// Run a tool by hand against the current group thread.
    pub async fn use_tool(&mut self, tool_id: &str) -> InvokeOutcome {
        let ctx = TurnContext {
            config: &self.config,
            providers: &self.providers,
            tools: &self.tools,
        };
        ToolInvoker::new(ctx)
            .invoke(tool_id, self.group.current_mut(), false)
            .await
    }

    pub fn group(&self) -> &GroupHistory {
        self.group.current()
    }

    pub fn group_threads(&self) -> &Threads<GroupHistory> {
        &self.group
    }

    pub fn group_threads_mut(&mut self) -> &mut Threads<GroupHistory> {
        &mut self.group
    }

    pub fn private_thread(&self, participant_id: &str) -> Option<&HistoryThread> {
        self.private.get(participant_id).map(|t| t.current())
    }

    pub fn new_group_thread(&mut self) -> bool {
        self.group.new_thread()
    }

    pub fn new_private_thread(&mut self, participant_id: &str) -> bool {
        self.private
            .get_mut(participant_id)
            .is_some_and(|threads| threads.new_thread())
    }

    /// Start a new private thread for every participant that has one in use.
    /// Returns how many were started.
    pub fn new_private_threads(&mut self) -> usize {
        let started = self
            .private
            .values_mut()
            .map(|threads| threads.new_thread())
            .filter(|started| *started)
            .count();
        info!("Started {} new private thread(s)", started);
        started
    }

    /// Drop every group thread, leaving one empty thread.
    pub fn clear_group_threads(&mut self) {
        info!("Clearing {} group thread(s)", self.group.len());
        self.group.clear();
    }

    /// Drop every participant's private threads.
    pub fn clear_private_threads(&mut self) {
        info!("Clearing private threads of {} participant(s)", self.private.len());
        for threads in self.private.values_mut() {
            threads.clear();
        }
    }
}
