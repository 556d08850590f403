//! Two-party prep dialogue session.
//!
//! The phase is derived from the cumulative number of user messages and is
//! committed when the facilitator's reply lands. The first reply that lands in
//! [`PrepPhase::Ready`] is the invitation synthesis; it happens once per session.

use super::message::{PrepMessage, PrepSender};
use super::outcome::Outcome;
use super::phase::{PhaseThresholds, PrepPhase};
use crate::response::{PrepResponses, ResponseCursor, SelectionPolicy};
use crate::synthesis::InvitationSynthesizer;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

const GREETING_ID: &str = "greeting";

/// Lifecycle of the invitation preview.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvitationState {
    /// Synthesis has not happened yet.
    #[default]
    NotReady,
    /// Summary is shown for review.
    Previewing,
    /// The user asked to revise; the preview is hidden until the next reply.
    Revising,
    /// The user approved the summary.
    Accepted,
}

impl InvitationState {
    pub fn is_ready(&self) -> bool {
        !matches!(self, InvitationState::NotReady)
    }
}

/// What kind of facilitator reply was delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    Canned,
    Synthesis,
}

/// Immutable view of a prep dialogue, published after every mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrepSnapshot {
    pub session_id: String,
    pub messages: Vec<PrepMessage>,
    pub phase: PrepPhase,
    pub thinking: bool,
    pub invitation_ready: bool,
    pub invitation: InvitationState,
    pub summary: Option<String>,
    pub user_message_count: usize,
    /// A facilitator reply is scheduled but has not landed yet.
    pub awaiting_reply: bool,
}

impl PrepSnapshot {
    pub fn accepts_user_input(&self) -> bool {
        !self.awaiting_reply
    }
}

#[derive(Debug, Clone)]
pub struct PrepSession {
    id: String,
    started_at: DateTime<Utc>,
    messages: Vec<PrepMessage>,
    phase: PrepPhase,
    thinking: bool,
    user_message_count: usize,
    cursors: [ResponseCursor; 3],
    invitation: InvitationState,
    summary: Option<String>,
    pending_phase: Option<PrepPhase>,
}

impl PrepSession {
    /// Creates a fresh session opened by the facilitator's `greeting`.
    pub fn new(id: impl Into<String>, greeting: &str) -> Self {
        Self::starting_at(id, greeting, Utc::now())
    }

    /// Creates a fresh session that started at `started_at`.
    ///
    /// The greeting has the stable id `greeting` and is dated `started_at`.
    pub fn starting_at(id: impl Into<String>, greeting: &str, started_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            started_at,
            messages: vec![PrepMessage {
                id: GREETING_ID.to_string(),
                sender: PrepSender::Ai,
                content: greeting.to_string(),
                timestamp: started_at,
                phase: PrepPhase::Understanding,
            }],
            phase: PrepPhase::Understanding,
            thinking: false,
            user_message_count: 0,
            cursors: [ResponseCursor::new(); 3],
            invitation: InvitationState::NotReady,
            summary: None,
            pending_phase: None,
        }
    }

    /// The initial state of this session: same id and start time, fresh everything else.
    pub fn restarted(&self, greeting: &str) -> Self {
        Self::starting_at(self.id.clone(), greeting, self.started_at)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn messages(&self) -> &[PrepMessage] {
        &self.messages
    }

    pub fn phase(&self) -> PrepPhase {
        self.phase
    }

    pub fn thinking(&self) -> bool {
        self.thinking
    }

    pub fn user_message_count(&self) -> usize {
        self.user_message_count
    }

    pub fn invitation(&self) -> InvitationState {
        self.invitation
    }

    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    /// Phase the pending reply will commit, if a reply is in flight.
    pub fn pending_phase(&self) -> Option<PrepPhase> {
        self.pending_phase
    }

    pub fn cursor(&self, phase: PrepPhase) -> ResponseCursor {
        self.cursors[phase.ordinal()]
    }

    /// Appends the user's message, tagged with the current phase, and computes
    /// the phase the facilitator's reply will commit.
    ///
    /// Rejected while a previous reply is still in flight.
    pub fn submit_user_message(&mut self, content: &str, thresholds: &PhaseThresholds) -> Outcome {
        if content.trim().is_empty() {
            return Outcome::Ignored;
        }
        if self.pending_phase.is_some() {
            return Outcome::Rejected;
        }

        self.messages
            .push(PrepMessage::new(PrepSender::User, content, self.phase));
        self.user_message_count += 1;
        self.pending_phase = Some(self.phase.advance_for(self.user_message_count, thresholds));
        Outcome::Accepted
    }

    pub fn start_thinking(&mut self) {
        self.thinking = true;
    }

    /// Delivers the facilitator's reply for the pending submission and commits
    /// its phase.
    ///
    /// Returns `None` when no submission is pending.
    pub fn deliver_reply<R: Rng + ?Sized>(
        &mut self,
        responses: &PrepResponses,
        policy: SelectionPolicy,
        rng: &mut R,
        synthesizer: &dyn InvitationSynthesizer,
    ) -> Option<ReplyKind> {
        let next_phase = self.pending_phase.take()?;

        let (content, kind) =
            if next_phase == PrepPhase::Ready && !self.invitation.is_ready() {
                let synthesis = synthesizer.synthesize(&self.messages);
                self.invitation = InvitationState::Previewing;
                self.summary = Some(synthesis.summary);
                (synthesis.message, ReplyKind::Synthesis)
            } else {
                if self.invitation == InvitationState::Revising {
                    self.invitation = InvitationState::Previewing;
                }
                let cursor = &mut self.cursors[next_phase.ordinal()];
                let content = responses
                    .for_phase(next_phase)
                    .select(policy, cursor, rng)
                    .to_string();
                (content, ReplyKind::Canned)
            };

        self.messages
            .push(PrepMessage::new(PrepSender::Ai, content, next_phase));
        self.thinking = false;
        self.phase = self.phase.max(next_phase);
        Some(kind)
    }

    /// Hides the invitation preview so the user can keep refining.
    pub fn revise_invitation(&mut self) -> Outcome {
        if self.invitation != InvitationState::Previewing {
            return Outcome::Rejected;
        }
        self.invitation = InvitationState::Revising;
        Outcome::Accepted
    }

    pub fn accept_invitation(&mut self) -> Outcome {
        if self.invitation != InvitationState::Previewing {
            return Outcome::Rejected;
        }
        self.invitation = InvitationState::Accepted;
        Outcome::Accepted
    }

    pub fn snapshot(&self) -> PrepSnapshot {
        PrepSnapshot {
            session_id: self.id.clone(),
            messages: self.messages.clone(),
            phase: self.phase,
            thinking: self.thinking,
            invitation_ready: self.invitation.is_ready(),
            invitation: self.invitation,
            summary: self.summary.clone(),
            user_message_count: self.user_message_count,
            awaiting_reply: self.pending_phase.is_some(),
        }
    }
}
