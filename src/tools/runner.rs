//! Tool registry - manages group tools by id

use std::collections::HashMap;

use tracing::info;

use crate::chat::llm::ProviderRegistry;
use crate::config::Config;

use super::pilot::PilotTool;
use super::{Tool, ToolDescriptor};

/// Registered tools, keyed by id
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Create a registry with the built-in tools the config enables
    pub fn with_defaults(config: &Config, providers: &ProviderRegistry) -> Self {
        let mut registry = Self::new();

        if let Some(planner) = &config.planner {
            info!("Planning tool enabled with planner '{}'", planner.id);
            registry.register(PilotTool::new(planner.clone(), config, providers));
        }

        registry
    }

    /// Register a tool
    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        self.tools.insert(tool.id().to_string(), Box::new(tool));
    }

    pub fn get(&self, id: &str) -> Option<&dyn Tool> {
        self.tools.get(id).map(|t| t.as_ref())
    }

    /// Check if a tool exists
    pub fn has(&self, id: &str) -> bool {
        self.tools.contains_key(id)
    }

    /// Descriptors of every registered tool
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        let mut descriptors: Vec<ToolDescriptor> =
            self.tools.values().map(|t| t.descriptor()).collect();
        descriptors.sort_by(|a, b| a.id.cmp(&b.id));
        descriptors
    }

    /// List registered tool ids, sorted
    pub fn tool_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.tools.keys().map(|s| s.as_str()).collect();
        ids.sort_unstable();
        ids
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
