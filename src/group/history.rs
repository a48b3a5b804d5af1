//! Conversation logs and the thread books that hold them.
//!
//! Logs are append-only; the only way to shrink one is [`Threads::clear`],
//! which the session layer calls for bulk truncation.

use serde::{Deserialize, Serialize};

use crate::chat::message::{HistoryItem, Message, Role};
use crate::config::ParticipantConfig;
use crate::error::Error;
use crate::Result;

/// A log that can live in a [`Threads`] book.
pub trait Transcript {
    fn named(name: String) -> Self;
    fn name(&self) -> &str;
    fn is_empty(&self) -> bool;
}

/// One private conversation with one participant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryThread {
    pub name: String,
    messages: Vec<Message>,
}

impl HistoryThread {
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// The thread as router input.
    pub fn items(&self) -> Vec<HistoryItem> {
        self.messages.iter().map(HistoryItem::from).collect()
    }
}

impl Transcript for HistoryThread {
    fn named(name: String) -> Self {
        Self { name, messages: Vec::new() }
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// The shared log of a group conversation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupHistory {
    pub name: String,
    messages: Vec<Message>,
}

impl GroupHistory {
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Content of the latest message, or empty.
    pub fn last_content(&self) -> &str {
        self.last().map(|m| m.content.as_str()).unwrap_or_default()
    }

    pub fn last_is_user(&self) -> bool {
        self.last().is_some_and(|m| m.role == Role::User)
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.push(Message::user(content));
    }

    /// Append a reply attributed to `participant`.
    pub fn push_reply(&mut self, participant: &ParticipantConfig, content: impl Into<String>) {
        self.push(Message::from_participant(
            &participant.id,
            participant.display_name(),
            content,
        ));
    }

    pub fn push_tool(&mut self, tool_id: &str, content: impl Into<String>) {
        self.push(Message::from_tool(tool_id, content));
    }
}

impl Transcript for GroupHistory {
    fn named(name: String) -> Self {
        Self { name, messages: Vec::new() }
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// A book of switchable threads with exactly one current thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Threads<T> {
    threads: Vec<T>,
    current: usize,
    prefix: String,
}

impl<T: Transcript> Threads<T> {
    /// A book holding one empty thread.
    pub fn new(prefix: &str) -> Self {
        Self {
            threads: vec![T::named(format!("{} 1", prefix))],
            current: 0,
            prefix: prefix.to_string(),
        }
    }

    pub fn current(&self) -> &T {
        &self.threads[self.current]
    }

    pub fn current_mut(&mut self) -> &mut T {
        &mut self.threads[self.current]
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    /// Start a fresh thread and make it current.
    ///
    /// Refused (returns `false`) while the current thread is still empty.
    pub fn new_thread(&mut self) -> bool {
        if self.current().is_empty() {
            return false;
        }
        let name = format!("{} {}", self.prefix, self.threads.len() + 1);
        self.threads.push(T::named(name));
        self.current = self.threads.len() - 1;
        true
    }

    pub fn switch(&mut self, index: usize) -> Result<()> {
        if index >= self.threads.len() {
            return Err(Error::Other(format!(
                "No thread {} ({} available)",
                index,
                self.threads.len()
            )));
        }
        self.current = index;
        Ok(())
    }

    pub fn names(&self) -> Vec<&str> {
        self.threads.iter().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.threads.len()
    }

    /// Drop every thread and start over with one empty thread.
    pub fn clear(&mut self) {
        let prefix = std::mem::take(&mut self.prefix);
        *self = Self::new(&prefix);
    }
}
