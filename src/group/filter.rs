//! Per-participant view of the shared group history.

use crate::chat::message::{Message, Role};
use crate::chat::normalizer::window;

/// What `participant_id` gets to see of the last `window_size` entries:
/// every user turn plus its own replies, provenance stripped. Other
/// participants' replies, tool output and system entries are left out.
pub fn filter_for(history: &[Message], participant_id: &str, window_size: usize) -> Vec<Message> {
    window(history, window_size)
        .iter()
        .filter_map(|msg| match msg.role {
            Role::User => Some(msg.clone()),
            Role::Assistant if msg.is_reply_of(participant_id) => Some(msg.without_provenance()),
            _ => None,
        })
        .collect()
}
