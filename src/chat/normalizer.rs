//! Message normalization for provider dispatch.
//!
//! Every adapter receives the output of [`join`] followed by [`fix`]:
//! - optional system prompt first
//! - history entries of any stored shape, flattened to role/content pairs
//! - never an empty content
//! - always ending on a `user` message

use serde_json::Value;
use tracing::debug;

use super::message::{content_text, ChatMessage, HistoryItem, Role};

/// Keep only the most recent `size` entries.
pub fn window<T>(history: &[T], size: usize) -> &[T] {
    if history.len() > size {
        &history[history.len() - size..]
    } else {
        history
    }
}

/// Build the message list: system prompt, flattened history, then the prompt.
pub fn join(system_prompt: Option<&str>, prompt: &str, history: &[HistoryItem]) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 2);

    if let Some(system) = system_prompt.filter(|s| !s.is_empty()) {
        messages.push(ChatMessage::new(Role::System, system));
    }

    for item in history {
        push_item(&mut messages, item);
    }

    if !prompt.is_empty() {
        messages.push(ChatMessage::user(prompt));
    }

    messages
}

fn push_item(messages: &mut Vec<ChatMessage>, item: &HistoryItem) {
    match item {
        HistoryItem::Message(msg) => {
            if !msg.content.is_empty() {
                messages.push(ChatMessage::new(msg.role, msg.content.clone()));
            }
        }
        HistoryItem::Legacy { user, response } => {
            push_exchange(messages, user, response.as_deref());
        }
        HistoryItem::Text(text) => {
            if !text.is_empty() {
                messages.push(ChatMessage::user(text.clone()));
            }
        }
        HistoryItem::Raw(Value::Object(map)) => {
            let role = map.get("role").and_then(Value::as_str).and_then(Role::parse);
            let content = map.get("content").and_then(content_text);

            match (role, content) {
                (Some(role), Some(content)) => messages.push(ChatMessage::new(role, content)),
                _ if map.contains_key("user") => {
                    let user = map.get("user").and_then(content_text).unwrap_or_default();
                    let response = map.get("response").and_then(content_text);
                    push_exchange(messages, &user, response.as_deref());
                }
                _ => debug!("Dropping history entry without usable role/content"),
            }
        }
        HistoryItem::Raw(Value::String(text)) => {
            if !text.is_empty() {
                messages.push(ChatMessage::user(text.clone()));
            }
        }
        HistoryItem::Raw(_) => debug!("Dropping non-object history entry"),
    }
}

fn push_exchange(messages: &mut Vec<ChatMessage>, user: &str, response: Option<&str>) {
    if !user.is_empty() {
        messages.push(ChatMessage::user(user));
    }
    if let Some(response) = response.filter(|r| !r.is_empty()) {
        messages.push(ChatMessage::new(Role::Assistant, response));
    }
}

/// Drop empty messages and make sure the list ends on a `user` message.
pub fn fix(messages: &[ChatMessage]) -> Vec<ChatMessage> {
    let mut fixed: Vec<ChatMessage> = messages
        .iter()
        .filter(|m| !m.content.is_empty())
        .cloned()
        .collect();

    if let Some(last) = fixed.last_mut() {
        if last.role != Role::User {
            debug!("Last message had role {}, forcing user", last.role.as_str());
            last.role = Role::User;
        }
    }

    fixed
}

/// [`fix`] for untyped input: skips anything that is not a role/content
/// object and reads unknown roles as `user`.
pub fn fix_raw(values: &[Value]) -> Vec<ChatMessage> {
    let typed: Vec<ChatMessage> = values
        .iter()
        .filter_map(|value| {
            let map = value.as_object()?;
            let role = map.get("role").and_then(Value::as_str).filter(|r| !r.is_empty())?;
            let content = map.get("content").and_then(content_text)?;
            Some(ChatMessage::new(Role::parse_lenient(role), content))
        })
        .collect();

    fix(&typed)
}
