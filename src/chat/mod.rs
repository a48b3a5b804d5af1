//! Chat layer: messages, normalization, provider adapters and routing.

pub mod llm;
pub mod message;
pub mod normalizer;
pub mod router;

pub use message::{ChatMessage, HistoryItem, Message, Role};
pub use router::{ChatRouter, UNSUPPORTED_ENGINE};
