//! Configuration management
//!
//! Participant and conversation settings arrive as plain key-value JSON, the
//! same shape the session layer persists, so every field has a serde default.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use crate::Result;
use crate::error::Error;

/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "ROUNDTABLE_CONFIG";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Participants in configured (speaking) order
    #[serde(default)]
    pub participants: Vec<ParticipantConfig>,

    /// Global conversation overrides
    #[serde(default)]
    pub conversation: ConversationConfig,

    /// Participant used by the planning tool to pick speakers
    #[serde(default)]
    pub planner: Option<ParticipantConfig>,

    /// Per-tool parameters, keyed by tool id
    #[serde(default)]
    pub tools: HashMap<String, Value>,

    /// HTTP deadline for provider calls
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Config {
    /// Participants with `enable` set, in configured order.
    pub fn enabled_participants(&self) -> Vec<&ParticipantConfig> {
        self.participants.iter().filter(|p| p.enable).collect()
    }

    /// Look up a participant by id.
    pub fn participant(&self, id: &str) -> Option<&ParticipantConfig> {
        self.participants.iter().find(|p| p.id == id)
    }

    /// Configured parameters for a tool (empty object if none).
    pub fn tool_parameters(&self, tool_id: &str) -> Value {
        self.tools
            .get(tool_id)
            .cloned()
            .unwrap_or_else(|| Value::Object(Default::default()))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            participants: Vec::new(),
            conversation: ConversationConfig::default(),
            planner: None,
            tools: HashMap::new(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// One conversational agent ("bot").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantConfig {
    pub id: String,

    #[serde(default)]
    pub name: String,

    /// Engine identifier, resolved against the provider registry
    #[serde(default)]
    pub engine: String,

    /// Resource endpoint (Azure style deployments)
    #[serde(default)]
    pub api_endpoint: String,

    /// Base URL for engines without a fixed one (OpenAI, Ollama)
    #[serde(default)]
    pub base_url: String,

    #[serde(default)]
    pub api_key: String,

    /// Secret half of a key pair, or a standalone API password
    #[serde(default)]
    pub api_password: String,

    #[serde(default)]
    pub model: String,

    /// Deployment or API version string
    #[serde(default)]
    pub api_version: Option<String>,

    #[serde(default)]
    pub system_prompt: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Private-chat window override
    #[serde(default)]
    pub history_length: Option<usize>,

    /// Group-chat window override
    #[serde(default)]
    pub group_history_length: Option<usize>,

    #[serde(default = "default_true")]
    pub enable: bool,
}

/// Credential material a participant carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Credential<'a> {
    None,
    Key(&'a str),
    KeyPair { key: &'a str, secret: &'a str },
    Bearer(&'a str),
}

impl<'a> Credential<'a> {
    /// Key sent as an API key header or bearer key.
    pub fn api_key(&self) -> Option<&'a str> {
        match *self {
            Credential::Key(key) | Credential::KeyPair { key, .. } => Some(key),
            Credential::Bearer(_) | Credential::None => None,
        }
    }

    /// Token for vendors that prefer the secret; falls back to the key.
    pub fn bearer_token(&self) -> Option<&'a str> {
        match *self {
            Credential::Bearer(token) | Credential::KeyPair { secret: token, .. } => Some(token),
            Credential::Key(key) => Some(key),
            Credential::None => None,
        }
    }
}

impl ParticipantConfig {
    /// Create a participant with defaults for everything but identity and routing.
    pub fn new(id: &str, engine: &str, model: &str) -> Self {
        Self {
            id: id.to_string(),
            name: id.to_string(),
            engine: engine.to_string(),
            api_endpoint: String::new(),
            base_url: String::new(),
            api_key: String::new(),
            api_password: String::new(),
            model: model.to_string(),
            api_version: None,
            system_prompt: String::new(),
            temperature: default_temperature(),
            history_length: None,
            group_history_length: None,
            enable: true,
        }
    }

    /// Display name, falling back to the id.
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() { &self.id } else { &self.name }
    }

    pub fn credential(&self) -> Credential<'_> {
        match (self.api_key.is_empty(), self.api_password.is_empty()) {
            (false, false) => Credential::KeyPair {
                key: &self.api_key,
                secret: &self.api_password,
            },
            (false, true) => Credential::Key(&self.api_key),
            (true, false) => Credential::Bearer(&self.api_password),
            (true, true) => Credential::None,
        }
    }

    /// Effective system prompt; the forced conversation prompt wins.
    pub fn effective_system_prompt<'a>(&'a self, conversation: &'a ConversationConfig) -> Option<&'a str> {
        [conversation.force_system_prompt.as_str(), self.system_prompt.as_str()]
            .into_iter()
            .find(|p| !p.trim().is_empty())
    }

    pub fn private_window(&self, conversation: &ConversationConfig) -> usize {
        self.history_length.unwrap_or(conversation.history_length)
    }

    pub fn group_window(&self, conversation: &ConversationConfig) -> usize {
        self.group_history_length
            .unwrap_or(conversation.group_history_length)
    }
}

/// Global overrides shared by every participant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationConfig {
    /// Takes precedence over each participant's own system prompt
    #[serde(default)]
    pub force_system_prompt: String,

    /// Relay prompt sent along with group turns
    #[serde(default)]
    pub group_user_prompt: String,

    #[serde(default = "default_history_length")]
    pub history_length: usize,

    #[serde(default = "default_group_history_length")]
    pub group_history_length: usize,

    /// Participants answer group turns on their own
    #[serde(default = "default_true")]
    pub auto_speak: bool,

    /// Skip planning; everyone answers
    #[serde(default)]
    pub all_speak: bool,

    /// Tool consulted to pick speakers
    #[serde(default = "default_planner_tool")]
    pub planner_tool: String,

    /// Fetch unconditional-round replies concurrently
    #[serde(default)]
    pub parallel_dispatch: bool,
}

impl ConversationConfig {
    /// Relay prompt, if one is set.
    pub fn relay_prompt(&self) -> Option<&str> {
        let prompt = self.group_user_prompt.trim();
        (!prompt.is_empty()).then_some(prompt)
    }
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            force_system_prompt: String::new(),
            group_user_prompt: String::new(),
            history_length: default_history_length(),
            group_history_length: default_group_history_length(),
            auto_speak: true,
            all_speak: false,
            planner_tool: default_planner_tool(),
            parallel_dispatch: false,
        }
    }
}

fn default_temperature() -> f32 {
    1.0
}

fn default_history_length() -> usize {
    10
}

fn default_group_history_length() -> usize {
    20
}

fn default_planner_tool() -> String {
    "chat_pilot".to_string()
}

fn default_request_timeout() -> u64 {
    120
}

fn default_true() -> bool {
    true
}

/// Get the config directory path
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".roundtable")
}

/// Get the config file path (honours `ROUNDTABLE_CONFIG`)
pub fn config_path() -> PathBuf {
    std::env::var_os(CONFIG_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| config_dir().join("config.json"))
}

/// Load configuration from the default location
pub fn load() -> Result<Config> {
    load_from(&config_path())
}

/// Load configuration from a specific file
pub fn load_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Err(Error::Config(format!(
            "Config not found at {:?}. Run 'roundtable init' first.",
            path
        )));
    }

    let content = std::fs::read_to_string(path)?;
    let config: Config = serde_json::from_str(&content)?;
    Ok(config)
}

/// Save configuration to the default location
pub fn save(config: &Config) -> Result<()> {
    save_to(config, &config_path())
}

/// Save configuration to a specific file
pub fn save_to(config: &Config, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let content = serde_json::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Starter configuration written by `roundtable init`.
pub fn sample() -> Config {
    let mut analyst = ParticipantConfig::new("analyst", "DeepSeek", "deepseek-chat");
    analyst.name = "Analyst".to_string();
    analyst.system_prompt = "You are a careful analyst. Question assumptions.".to_string();

    let mut local = ParticipantConfig::new("local", "Ollama", "qwen2.5:7b");
    local.name = "Local".to_string();
    local.base_url = "http://127.0.0.1:11434/v1".to_string();
    local.api_key = "ollama".to_string();
    local.system_prompt = "You are an optimistic product thinker.".to_string();

    let mut planner = ParticipantConfig::new("planner", "Ollama", "qwen2.5:7b");
    planner.base_url = local.base_url.clone();
    planner.api_key = "ollama".to_string();
    planner.temperature = 0.2;

    Config {
        participants: vec![analyst, local],
        conversation: ConversationConfig::default(),
        planner: Some(planner),
        tools: HashMap::new(),
        request_timeout_secs: default_request_timeout(),
    }
}

/// Write the starter configuration unless one already exists.
pub fn init() -> Result<PathBuf> {
    let path = config_path();
    if path.exists() {
        return Err(Error::Config(format!("Config already exists at {:?}", path)));
    }
    save_to(&sample(), &path)?;
    Ok(path)
}
