//! Group conversations: shared history, per-participant views and turn-taking.

mod filter;
mod history;
mod policy;

pub use filter::filter_for;
pub use history::{GroupHistory, HistoryThread, Threads, Transcript};
pub use policy::{AutoSpeakPolicy, TurnOutcome, TurnTask};
