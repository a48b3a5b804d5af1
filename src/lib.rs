//! Roundtable - multi-provider chat dispatch and group conversations
//!
//! This library routes a participant's conversation to any of its supported
//! chat-completion providers and runs group conversations where several
//! participants, and the tools they share, take turns on one history.

pub mod chat;
pub mod cli;
pub mod config;
pub mod error;
pub mod group;
pub mod session;
pub mod tools;
pub mod ui;

pub use error::{Error, Result};
pub use session::{Session, TurnContext};
