//! Auto-speak policy - decides who answers a group turn and runs it

use std::collections::VecDeque;

use futures_util::future::join_all;
use tracing::{debug, info, warn};

use crate::config::ParticipantConfig;
use crate::session::TurnContext;
use crate::tools::ToolInvoker;

use super::history::GroupHistory;

/// One step of a group turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnTask {
    /// Ask the planning tool to pick speakers
    Plan { tool_id: String },
    /// One participant answers against the live history
    Speak { participant_id: String },
    /// Several participants answer concurrently against one snapshot
    Round { participant_ids: Vec<String> },
}

/// What happened during a turn.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TurnOutcome {
    /// The planning tool ran and completed
    pub planned: bool,
    /// Planning was skipped or failed and everyone answered instead
    pub fell_back: bool,
    /// Participant replies appended
    pub replies: usize,
}

/// Turn coordinator for group conversations.
pub struct AutoSpeakPolicy<'a> {
    ctx: TurnContext<'a>,
}

impl<'a> AutoSpeakPolicy<'a> {
    pub fn new(ctx: TurnContext<'a>) -> Self {
        Self { ctx }
    }

    /// Tasks for a turn, before anything runs.
    pub fn plan(&self) -> Vec<TurnTask> {
        let conversation = &self.ctx.config.conversation;
        if !conversation.auto_speak {
            return Vec::new();
        }

        let enabled = self.ctx.config.enabled_participants();
        if enabled.len() > 1 && !conversation.all_speak {
            vec![TurnTask::Plan { tool_id: conversation.planner_tool.clone() }]
        } else {
            self.everyone()
        }
    }

    /// Every enabled participant once, in configured order.
    fn everyone(&self) -> Vec<TurnTask> {
        let ids: Vec<String> = self
            .ctx
            .config
            .enabled_participants()
            .into_iter()
            .map(|p| p.id.clone())
            .collect();

        if self.ctx.config.conversation.parallel_dispatch && ids.len() > 1 {
            vec![TurnTask::Round { participant_ids: ids }]
        } else {
            ids.into_iter()
                .map(|participant_id| TurnTask::Speak { participant_id })
                .collect()
        }
    }

    /// Record the user's message and run the turn it triggers.
    pub async fn run_turn(&self, history: &mut GroupHistory, input: &str) -> TurnOutcome {
        history.push_user(input);

        let mut outcome = TurnOutcome::default();
        let mut tasks: VecDeque<TurnTask> = self.plan().into();
        info!("Group turn with {} task(s)", tasks.len());

        while let Some(task) = tasks.pop_front() {
            debug!("Running {:?}", task);
            match task {
                TurnTask::Plan { tool_id } => {
                    let planned = if self.ctx.tools.has(&tool_id) {
                        let before = history.len();
                        let result = ToolInvoker::new(self.ctx).invoke(&tool_id, history, true).await;
                        outcome.replies += count_replies(history, before);
                        result.succeeded()
                    } else {
                        warn!("Planning tool '{}' is not registered", tool_id);
                        false
                    };

                    if planned {
                        outcome.planned = true;
                    } else {
                        info!("Falling back to every participant answering");
                        outcome.fell_back = true;
                        tasks.extend(self.everyone());
                    }
                }
                TurnTask::Speak { participant_id } => {
                    if let Some(participant) = self.ctx.config.participant(&participant_id) {
                        self.speak(participant, history).await;
                        outcome.replies += 1;
                    }
                }
                TurnTask::Round { participant_ids } => {
                    outcome.replies += self.round(&participant_ids, history).await;
                }
            }
        }

        outcome
    }

    async fn speak(&self, participant: &ParticipantConfig, history: &mut GroupHistory) {
        let prompt = self.relay_for(history.last_is_user());
        let reply = self
            .ctx
            .router_for(participant)
            .send_group(prompt, history.messages())
            .await;
        history.push_reply(participant, reply);
    }

    /// Fetch every reply from the same snapshot, then append in order.
    ///
    /// Views match the sequential order because participants never see each
    /// other's replies.
    async fn round(&self, participant_ids: &[String], history: &mut GroupHistory) -> usize {
        let speakers: Vec<&ParticipantConfig> = participant_ids
            .iter()
            .filter_map(|id| self.ctx.config.participant(id))
            .collect();

        let snapshot = history.messages().to_vec();
        let starts_after_user = history.last_is_user();
        let routers: Vec<_> = speakers.iter().map(|p| self.ctx.router_for(p)).collect();

        let replies = join_all(routers.iter().enumerate().map(|(i, router)| {
            let prompt = self.relay_for(i == 0 && starts_after_user);
            router.send_group(prompt, &snapshot)
        }))
        .await;

        for (participant, reply) in speakers.iter().zip(replies) {
            history.push_reply(participant, reply);
        }
        speakers.len()
    }

    /// Relay prompt, omitted right after the user's own message.
    fn relay_for(&self, after_user: bool) -> &'a str {
        if after_user {
            return "";
        }
        self.ctx.config.conversation.relay_prompt().unwrap_or_default()
    }
}

fn count_replies(history: &GroupHistory, since: usize) -> usize {
    history.messages()[since..]
        .iter()
        .filter(|m| m.participant_id.is_some())
        .count()
}
