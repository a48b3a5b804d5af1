//! Tool invocation - runs a tool and turns its results into group messages

use std::panic::AssertUnwindSafe;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use tracing::{debug, error, info, warn};

use crate::error::Error;
use crate::group::GroupHistory;
use crate::session::TurnContext;

use super::{ToolInput, ToolResult};

/// Delegation hops allowed before a nested tool call is refused.
pub const MAX_DELEGATION_DEPTH: usize = 2;

/// Placeholder appended when a tool produced nothing.
const NO_RESULT: &str = "(no result)";

/// How an invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvokeOutcome {
    Completed,
    /// No tool registered under the id
    Unavailable,
    /// The tool returned an error or panicked
    Failed,
}

impl InvokeOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(self, InvokeOutcome::Completed)
    }
}

/// Runs tools against the group history of a turn.
///
/// Every outcome lands in the history as a visible message; nothing is
/// returned as an error.
pub struct ToolInvoker<'a> {
    ctx: TurnContext<'a>,
}

impl<'a> ToolInvoker<'a> {
    pub fn new(ctx: TurnContext<'a>) -> Self {
        Self { ctx }
    }

    /// Run `tool_id` and append its results to `history`.
    ///
    /// In planning mode delegated participants get a framing message and a
    /// role-play instruction; otherwise they only get the relay prompt.
    pub async fn invoke(&self, tool_id: &str, history: &mut GroupHistory, planning: bool) -> InvokeOutcome {
        self.invoke_at(tool_id, history, planning, 0).await
    }

    fn invoke_at<'b>(
        &'b self,
        tool_id: &'b str,
        history: &'b mut GroupHistory,
        planning: bool,
        depth: usize,
    ) -> BoxFuture<'b, InvokeOutcome> {
        async move {
            let Some(tool) = self.ctx.tools.get(tool_id) else {
                warn!("Tool not found: {}", tool_id);
                history.push_tool(tool_id, format!("Tool not found: {}", tool_id));
                return InvokeOutcome::Unavailable;
            };

            let input = ToolInput {
                parameters: self.ctx.config.tool_parameters(tool_id),
                last_message: history.last_content().to_string(),
                group_prompt: self.ctx.config.conversation.group_user_prompt.clone(),
                group_history: history.messages().to_vec(),
            };

            info!("Running tool '{}' (depth {}, planning: {})", tool_id, depth, planning);
            let results = match AssertUnwindSafe(tool.run(input)).catch_unwind().await {
                Ok(Ok(results)) => results,
                Ok(Err(e)) => return self.fail(tool_id, history, &e.to_string()),
                Err(panic) => {
                    let detail = panic
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| panic.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "tool panicked".to_string());
                    return self.fail(tool_id, history, &detail);
                }
            };
            debug!("Tool '{}' returned {:?}", tool_id, results);

            if results.iter().all(ToolResult::is_empty) {
                history.push_tool(tool_id, NO_RESULT);
                return InvokeOutcome::Completed;
            }

            for result in results {
                match result {
                    ToolResult::Text(text) if !text.is_empty() => history.push_tool(tool_id, text),
                    ToolResult::Text(_) | ToolResult::Empty => {}
                    ToolResult::CallParticipant { id, prompt } => {
                        self.delegate(tool_id, &id, &prompt, history, planning).await;
                    }
                    ToolResult::CallTool { id } => {
                        if depth + 1 >= MAX_DELEGATION_DEPTH {
                            warn!("Refusing nested call from '{}' to '{}'", tool_id, id);
                            let err = Error::RecursionLimit(MAX_DELEGATION_DEPTH);
                            history.push_tool(tool_id, err.to_string());
                            continue;
                        }
                        self.invoke_at(&id, history, false, depth + 1).await;
                    }
                }
            }

            InvokeOutcome::Completed
        }
        .boxed()
    }

    /// Hand the floor to a participant on behalf of `tool_id`.
    async fn delegate(
        &self,
        tool_id: &str,
        participant_id: &str,
        prompt: &str,
        history: &mut GroupHistory,
        planning: bool,
    ) {
        let Some(participant) = self.ctx.config.participant(participant_id) else {
            warn!("Tool '{}' called unknown participant '{}'", tool_id, participant_id);
            history.push_tool(tool_id, format!("Participant not found: {}", participant_id));
            return;
        };

        let relay = self.ctx.config.conversation.relay_prompt();
        let router = self.ctx.router_for(participant);

        let reply = if planning {
            let framing = format!(
                "Next, from the perspective of 【{}】: {}",
                participant.display_name(),
                prompt
            );
            history.push_tool(tool_id, framing.clone());
            router.send_group(&role_play(&framing, relay), history.messages()).await
        } else {
            router.send_group(relay.unwrap_or_default(), history.messages()).await
        };

        history.push_reply(participant, reply);
    }

    fn fail(&self, tool_id: &str, history: &mut GroupHistory, detail: &str) -> InvokeOutcome {
        error!("Tool '{}' failed: {}", tool_id, detail);
        history.push_tool(tool_id, format!("Tool execution failed: {}", detail));
        InvokeOutcome::Failed
    }
}

/// Wrap a framing line into an in-character instruction.
fn role_play(framing: &str, relay: Option<&str>) -> String {
    let prompt = format!(
        "Stay in character and keep the discussion going from the context above. \
         Be concise, state only your core points in a clear format, in about 200 characters. {}",
        framing
    );
    match relay {
        Some(relay) => format!("{}\n\nReply requirements:\n{}", prompt, relay),
        None => prompt,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;
    use serde_json::Value;

    use crate::chat::llm::{FakeAdapter, ProviderRegistry};
    use crate::chat::message::{ChatMessage, Role};
    use crate::config::{Config, ParticipantConfig};
    use crate::tools::{StaticTool, Tool, ToolRegistry};
    use crate::Result;

    struct PanickyTool;

    #[async_trait]
    impl Tool for PanickyTool {
        fn id(&self) -> &str { "panicky" }
        fn description(&self) -> &str { "Always panics" }
        fn parameters(&self) -> Value { serde_json::json!({}) }

        async fn run(&self, _input: ToolInput) -> Result<Vec<ToolResult>> {
            panic!("boom");
        }
    }

    struct FailingTool;

    #[async_trait]
    impl Tool for FailingTool {
        fn id(&self) -> &str { "failing" }
        fn description(&self) -> &str { "Always errors" }
        fn parameters(&self) -> Value { serde_json::json!({}) }

        async fn run(&self, _input: ToolInput) -> Result<Vec<ToolResult>> {
            Err(Error::Tool("search backend down".to_string()))
        }
    }

    fn static_tool(id: &str, results: Vec<ToolResult>) -> StaticTool {
        StaticTool { id: id.to_string(), results }
    }

    fn setup(relay: &str) -> (Config, ProviderRegistry, Arc<FakeAdapter>) {
        let mut config = Config::default();
        let mut a = ParticipantConfig::new("A", "Fake", "m");
        a.name = "Alice".to_string();
        config.participants = vec![a, ParticipantConfig::new("B", "Fake", "m")];
        config.conversation.group_user_prompt = relay.to_string();

        let fake = Arc::new(FakeAdapter::new(vec![]));
        let mut providers = ProviderRegistry::new();
        providers.register_shared("Fake", fake.clone());
        (config, providers, fake)
    }

    fn ctx<'a>(config: &'a Config, providers: &'a ProviderRegistry, tools: &'a ToolRegistry) -> TurnContext<'a> {
        TurnContext { config, providers, tools }
    }

    #[tokio::test]
    async fn test_call_participant_without_planning() {
        let (config, providers, fake) = setup("");
        let mut tools = ToolRegistry::new();
        tools.register(static_tool("t", vec![ToolResult::call_participant("A", "")]));

        let mut history = GroupHistory::default();
        history.push_user("hi");
        let outcome = ToolInvoker::new(ctx(&config, &providers, &tools))
            .invoke("t", &mut history, false)
            .await;

        assert_eq!(outcome, InvokeOutcome::Completed);
        let calls = fake.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].participant_id, "A");
        assert_eq!(calls[0].messages, vec![ChatMessage::user("hi")]);

        assert_eq!(history.len(), 2);
        let reply = history.last().unwrap();
        assert_eq!(reply.participant_id.as_deref(), Some("A"));
        assert_eq!(reply.content, "reply from A");
    }

    #[tokio::test]
    async fn test_planning_frames_and_wraps_prompt() {
        let (config, providers, fake) = setup("Answer in English.");
        let mut tools = ToolRegistry::new();
        tools.register(static_tool("plan", vec![ToolResult::call_participant("A", "argue for it")]));

        let mut history = GroupHistory::default();
        history.push_user("topic");
        ToolInvoker::new(ctx(&config, &providers, &tools))
            .invoke("plan", &mut history, true)
            .await;

        let framing = &history.messages()[1];
        assert_eq!(framing.tool.as_deref(), Some("plan"));
        assert_eq!(framing.content, "Next, from the perspective of 【Alice】: argue for it");

        let sent = &fake.calls()[0].messages;
        let prompt = &sent.last().unwrap().content;
        assert_eq!(sent.last().unwrap().role, Role::User);
        assert!(prompt.contains("Next, from the perspective of 【Alice】: argue for it"));
        assert!(prompt.ends_with("\n\nReply requirements:\nAnswer in English."));
        // Framing is tool output, which the participant's view leaves out.
        assert_eq!(sent.len(), 2);

        assert_eq!(history.len(), 3);
        assert_eq!(history.messages()[2].participant_id.as_deref(), Some("A"));
    }

    #[tokio::test]
    async fn test_text_and_empty_results() {
        let (config, providers, _) = setup("");
        let mut tools = ToolRegistry::new();
        tools.register(static_tool("text", vec![ToolResult::text("found"), ToolResult::Empty]));
        tools.register(static_tool("nothing", vec![ToolResult::Empty, ToolResult::text("")]));
        tools.register(static_tool("silent", vec![]));
        let invoker = ToolInvoker::new(ctx(&config, &providers, &tools));

        let mut history = GroupHistory::default();
        invoker.invoke("text", &mut history, false).await;
        invoker.invoke("nothing", &mut history, false).await;
        invoker.invoke("silent", &mut history, false).await;

        let contents: Vec<&str> = history.messages().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["found", NO_RESULT, NO_RESULT]);
        assert!(history.messages().iter().all(|m| m.role == Role::Assistant && m.tool.is_some()));
    }

    #[tokio::test]
    async fn test_unknown_tool_and_participant() {
        let (config, providers, fake) = setup("");
        let mut tools = ToolRegistry::new();
        tools.register(static_tool("t", vec![ToolResult::call_participant("Z", "")]));
        let invoker = ToolInvoker::new(ctx(&config, &providers, &tools));

        let mut history = GroupHistory::default();
        assert_eq!(invoker.invoke("missing", &mut history, false).await, InvokeOutcome::Unavailable);
        assert_eq!(history.last_content(), "Tool not found: missing");

        assert!(invoker.invoke("t", &mut history, false).await.succeeded());
        assert_eq!(history.last_content(), "Participant not found: Z");
        assert!(fake.calls().is_empty());
    }

    #[tokio::test]
    async fn test_failures_become_messages() {
        let (config, providers, _) = setup("");
        let mut tools = ToolRegistry::new();
        tools.register(FailingTool);
        tools.register(PanickyTool);
        let invoker = ToolInvoker::new(ctx(&config, &providers, &tools));

        let mut history = GroupHistory::default();
        assert_eq!(invoker.invoke("failing", &mut history, false).await, InvokeOutcome::Failed);
        assert_eq!(
            history.last_content(),
            "Tool execution failed: Tool error: search backend down"
        );

        assert_eq!(invoker.invoke("panicky", &mut history, false).await, InvokeOutcome::Failed);
        assert_eq!(history.last_content(), "Tool execution failed: boom");
    }

    #[tokio::test]
    async fn test_nested_tool_call_is_bounded() {
        let (config, providers, _) = setup("");
        let mut tools = ToolRegistry::new();
        tools.register(static_tool("outer", vec![ToolResult::call_tool("inner")]));
        tools.register(static_tool("inner", vec![ToolResult::text("inner ran"), ToolResult::call_tool("outer")]));
        let invoker = ToolInvoker::new(ctx(&config, &providers, &tools));

        let mut history = GroupHistory::default();
        assert!(invoker.invoke("outer", &mut history, false).await.succeeded());

        let contents: Vec<&str> = history.messages().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents.len(), 2);
        assert_eq!(contents[0], "inner ran");
        assert!(contents[1].contains("recursion limit reached"));
        assert_eq!(history.messages()[1].tool.as_deref(), Some("inner"));
    }

    #[tokio::test]
    async fn test_self_delegating_tool_terminates() {
        let (config, providers, _) = setup("");
        let mut tools = ToolRegistry::new();
        tools.register(static_tool("loop", vec![ToolResult::call_tool("loop"), ToolResult::call_tool("loop")]));
        let invoker = ToolInvoker::new(ctx(&config, &providers, &tools));

        let mut history = GroupHistory::default();
        invoker.invoke("loop", &mut history, false).await;
        assert_eq!(history.len(), 4);
        assert!(history.messages().iter().all(|m| m.content.contains("recursion limit reached")));
    }
}
