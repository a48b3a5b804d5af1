//! Tools module - pluggable group-chat capabilities
//!
//! A tool reads the group conversation and either contributes text or asks
//! for a participant (or another tool) to take over. The invoker turns those
//! results into history entries.

mod invoker;
mod pilot;
mod runner;

pub use invoker::{InvokeOutcome, ToolInvoker, MAX_DELEGATION_DEPTH};
pub use pilot::{PilotTool, PILOT_TOOL_ID};
pub use runner::ToolRegistry;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::chat::message::Message;
use crate::Result;

/// Everything a tool gets to look at.
#[derive(Debug, Clone)]
pub struct ToolInput {
    /// Configured parameters for this tool
    pub parameters: Value,
    /// Content of the latest group message
    pub last_message: String,
    /// Relay prompt of the conversation
    pub group_prompt: String,
    pub group_history: Vec<Message>,
}

/// One item of a tool's output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolResult {
    Text(String),
    CallParticipant { id: String, prompt: String },
    CallTool { id: String },
    Empty,
}

/// Delegation directives as tools emit them.
#[derive(Deserialize)]
#[serde(tag = "type")]
enum Directive {
    #[serde(rename = "call_bot")]
    CallBot {
        id: String,
        #[serde(default)]
        prompt: String,
    },
    #[serde(rename = "call_tool")]
    CallTool { id: String },
}

impl ToolResult {
    pub fn text(content: impl Into<String>) -> Self {
        ToolResult::Text(content.into())
    }

    pub fn call_participant(id: &str, prompt: impl Into<String>) -> Self {
        ToolResult::CallParticipant {
            id: id.to_string(),
            prompt: prompt.into(),
        }
    }

    pub fn call_tool(id: &str) -> Self {
        ToolResult::CallTool { id: id.to_string() }
    }

    /// Read one output item: a string, or a `{type: "call_bot" | "call_tool", ...}`
    /// directive. Anything unrecognized is `Empty`.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::String(s) if s.is_empty() => ToolResult::Empty,
            Value::String(s) => ToolResult::Text(s),
            other @ Value::Object(_) => match serde_json::from_value(other) {
                Ok(Directive::CallBot { id, prompt }) => ToolResult::CallParticipant { id, prompt },
                Ok(Directive::CallTool { id }) => ToolResult::CallTool { id },
                Err(_) => ToolResult::Empty,
            },
            _ => ToolResult::Empty,
        }
    }

    /// Read a whole tool output: a single item or a list of them.
    pub fn parse_output(value: Value) -> Vec<ToolResult> {
        match value {
            Value::Array(items) => items.into_iter().map(Self::from_value).collect(),
            Value::Null => vec![ToolResult::Empty],
            other => vec![Self::from_value(other)],
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            ToolResult::Empty => true,
            ToolResult::Text(content) => content.is_empty(),
            _ => false,
        }
    }
}

/// Static description of a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub id: String,
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Tool trait - interface for all group tools
#[async_trait]
pub trait Tool: Send + Sync {
    /// Identifier used by directives and configuration
    fn id(&self) -> &str;

    /// Display name
    fn name(&self) -> &str {
        self.id()
    }

    /// Description of what the tool does
    fn description(&self) -> &str;

    /// JSON Schema for parameters
    fn parameters(&self) -> Value;

    /// Run against the current group conversation
    async fn run(&self, input: ToolInput) -> Result<Vec<ToolResult>>;

    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            id: self.id().to_string(),
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }
}

/// Tool replaying a fixed output, for tests.
#[cfg(test)]
pub struct StaticTool {
    pub id: String,
    pub results: Vec<ToolResult>,
}

#[cfg(test)]
#[async_trait]
impl Tool for StaticTool {
    fn id(&self) -> &str { &self.id }
    fn description(&self) -> &str { "Static tool for testing" }
    fn parameters(&self) -> Value { serde_json::json!({"type": "object"}) }

    async fn run(&self, _input: ToolInput) -> Result<Vec<ToolResult>> {
        Ok(self.results.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_directives() {
        assert_eq!(
            ToolResult::from_value(json!({"type": "call_bot", "id": "a", "prompt": "go"})),
            ToolResult::call_participant("a", "go")
        );
        assert_eq!(
            ToolResult::from_value(json!({"type": "call_tool", "id": "web_search"})),
            ToolResult::call_tool("web_search")
        );
        assert_eq!(ToolResult::from_value(json!({"type": "call_bot"})), ToolResult::Empty);
        assert_eq!(ToolResult::from_value(json!(12)), ToolResult::Empty);
    }

    #[test]
    fn test_parse_output_shapes() {
        assert_eq!(ToolResult::parse_output(json!("found it")), vec![ToolResult::text("found it")]);
        assert_eq!(ToolResult::parse_output(json!(null)), vec![ToolResult::Empty]);
        assert_eq!(
            ToolResult::parse_output(json!(["a", {"type": "call_bot", "id": "x"}, ""])),
            vec![
                ToolResult::text("a"),
                ToolResult::call_participant("x", ""),
                ToolResult::Empty,
            ]
        );
    }

    #[test]
    fn test_descriptor() {
        let tool = StaticTool { id: "echo".to_string(), results: vec![] };
        let descriptor = tool.descriptor();
        assert_eq!(descriptor.id, "echo");
        assert_eq!(descriptor.name, "echo");
    }
}
