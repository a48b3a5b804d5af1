//! Planning tool: asks a planner participant who should speak next.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Deserializer, Value};
use tracing::{debug, info};

use crate::chat::llm::ProviderRegistry;
use crate::chat::message::Role;
use crate::chat::router::ChatRouter;
use crate::config::{Config, ConversationConfig, ParticipantConfig};
use crate::error::Error;
use crate::Result;

use super::{Tool, ToolInput, ToolResult};

pub const PILOT_TOOL_ID: &str = "chat_pilot";

/// Group messages shown to the planner.
const RECENT_MESSAGES: usize = 10;

const PILOT_SYSTEM_PROMPT: &str = "You moderate a group discussion between several assistants. \
Given the roster and the latest messages, decide who should speak next and what angle each \
speaker should take. Answer only with a JSON array like \
[{\"id\": \"<participant id>\", \"prompt\": \"<what to focus on>\"}], ordered by speaking turn.";

/// One planned speaker as the planner writes it.
#[derive(Debug, Deserialize)]
struct PlannedTurn {
    id: String,
    #[serde(default)]
    prompt: String,
}

/// Chooses speakers for a group turn through a planner model.
pub struct PilotTool {
    planner: ChatRouter,
    /// (id, display name) of every enabled participant
    roster: Vec<(String, String)>,
}

impl PilotTool {
    pub fn new(mut planner: ParticipantConfig, config: &Config, providers: &ProviderRegistry) -> Self {
        if planner.system_prompt.trim().is_empty() {
            planner.system_prompt = PILOT_SYSTEM_PROMPT.to_string();
        }
        let roster = config
            .enabled_participants()
            .into_iter()
            .map(|p| (p.id.clone(), p.display_name().to_string()))
            .collect();

        Self {
            planner: ChatRouter::new(planner, ConversationConfig::default(), providers),
            roster,
        }
    }

    fn render_prompt(&self, input: &ToolInput) -> String {
        let roster: Vec<String> = self
            .roster
            .iter()
            .map(|(id, name)| format!("- {} (id: {})", name, id))
            .collect();

        let start = input.group_history.len().saturating_sub(RECENT_MESSAGES);
        let transcript: Vec<String> = input.group_history[start..]
            .iter()
            .filter(|m| m.tool.is_none())
            .map(|m| match (&m.role, &m.participant_name) {
                (Role::Assistant, Some(name)) => format!("{}: {}", name, m.content),
                (role, _) => format!("{}: {}", role.as_str(), m.content),
            })
            .collect();

        let mut prompt = format!(
            "Participants:\n{}\n\nRecent messages:\n{}",
            roster.join("\n"),
            transcript.join("\n")
        );
        if !input.group_prompt.is_empty() {
            prompt.push_str(&format!("\n\nReply requirements for speakers:\n{}", input.group_prompt));
        }
        prompt
    }

    /// Read the first JSON array in the planner's reply that names a known
    /// participant. Bracketed prose before the array is skipped.
    fn parse_plan(&self, reply: &str) -> Result<Vec<ToolResult>> {
        let mut last_error = None;
        let mut parsed_any = false;

        for (start, _) in reply.match_indices('[') {
            let turns = match Deserializer::from_str(&reply[start..])
                .into_iter::<Vec<PlannedTurn>>()
                .next()
            {
                Some(Ok(turns)) => turns,
                Some(Err(e)) => {
                    last_error = Some(e);
                    continue;
                }
                None => continue,
            };
            parsed_any = true;

            let plan: Vec<ToolResult> = turns
                .into_iter()
                .filter(|turn| self.roster.iter().any(|(id, _)| *id == turn.id))
                .map(|turn| ToolResult::CallParticipant { id: turn.id, prompt: turn.prompt })
                .collect();
            if !plan.is_empty() {
                return Ok(plan);
            }
        }

        if parsed_any {
            return Err(Error::Tool("plan names no known participant".to_string()));
        }
        match last_error {
            Some(e) => Err(Error::Tool(format!("unreadable plan: {}", e))),
            None => Err(Error::Tool(format!("planner gave no plan: {}", reply))),
        }
    }
}

#[async_trait]
impl Tool for PilotTool {
    fn id(&self) -> &str {
        PILOT_TOOL_ID
    }

    fn name(&self) -> &str {
        "Chat pilot"
    }

    fn description(&self) -> &str {
        "Plans which participants speak next and from what angle"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn run(&self, input: ToolInput) -> Result<Vec<ToolResult>> {
        let prompt = self.render_prompt(&input);
        debug!("Planner prompt: {}", prompt);

        let reply = self.planner.send_private(&prompt, &[]).await;
        let plan = self.parse_plan(&reply)?;
        info!("Planner chose {} speaker(s)", plan.len());
        Ok(plan)
    }
}
