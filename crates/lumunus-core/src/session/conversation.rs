//! Three-party conversation session.
//!
//! `ConversationSession` owns everything one facilitated conversation needs:
//! the transcript, whose turn it is, the AI takeover flag, the thinking
//! indicator and the per-speaker response cursors. It contains no timing; the
//! execution layer calls these transitions from scheduled steps.

use super::message::{Message, Role};
use super::outcome::Outcome;
use crate::config::SeedMessage;
use crate::response::{ResponseCursor, SelectionPolicy, TurnResponses};
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Immutable view of a conversation, published after every mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationSnapshot {
    pub session_id: String,
    pub messages: Vec<Message>,
    pub current_turn: Role,
    pub ai_takeover: bool,
    pub thinking: Option<Role>,
}

impl ConversationSnapshot {
    /// Whether the presentation layer should offer the input box.
    pub fn accepts_user_input(&self) -> bool {
        self.current_turn == Role::User && !self.ai_takeover
    }
}

#[derive(Debug, Clone)]
pub struct ConversationSession {
    id: String,
    started_at: DateTime<Utc>,
    messages: Vec<Message>,
    current_turn: Role,
    ai_takeover: bool,
    thinking: Option<Role>,
    other_cursor: ResponseCursor,
    ai_cursor: ResponseCursor,
}

impl ConversationSession {
    /// Creates a fresh session whose transcript starts with `seed`.
    pub fn new(id: impl Into<String>, seed: &[SeedMessage]) -> Self {
        Self::starting_at(id, seed, Utc::now())
    }

    /// Creates a fresh session that started at `started_at`.
    ///
    /// Seed messages get stable ids (`seed-0`, `seed-1`, ...) and are dated
    /// `offset_secs` before `started_at`, so two sessions built from the same
    /// inputs are identical.
    pub fn starting_at(
        id: impl Into<String>,
        seed: &[SeedMessage],
        started_at: DateTime<Utc>,
    ) -> Self {
        let messages = seed
            .iter()
            .enumerate()
            .map(|(index, s)| Message {
                id: format!("seed-{index}"),
                sender: s.sender,
                content: s.content.clone(),
                timestamp: s.dated_before(started_at).unwrap_or(started_at),
            })
            .collect();

        Self {
            id: id.into(),
            started_at,
            messages,
            current_turn: Role::User,
            ai_takeover: false,
            thinking: None,
            other_cursor: ResponseCursor::new(),
            ai_cursor: ResponseCursor::new(),
        }
    }

    /// The initial state of this session: same id and start time, fresh everything else.
    pub fn restarted(&self, seed: &[SeedMessage]) -> Self {
        Self::starting_at(self.id.clone(), seed, self.started_at)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn current_turn(&self) -> Role {
        self.current_turn
    }

    pub fn ai_takeover(&self) -> bool {
        self.ai_takeover
    }

    pub fn thinking(&self) -> Option<Role> {
        self.thinking
    }

    /// Cursor of a simulated speaker. The user has none.
    pub fn cursor(&self, role: Role) -> Option<ResponseCursor> {
        match role {
            Role::User => None,
            Role::Other => Some(self.other_cursor),
            Role::Ai => Some(self.ai_cursor),
        }
    }

    pub fn accepts_user_input(&self) -> bool {
        self.current_turn == Role::User && !self.ai_takeover
    }

    /// Checks turn discipline and content before a user action.
    fn guard_user_action(&self, content: Option<&str>) -> Outcome {
        if content.is_some_and(|c| c.trim().is_empty()) {
            return Outcome::Ignored;
        }
        if !self.accepts_user_input() {
            return Outcome::Rejected;
        }
        Outcome::Accepted
    }

    /// Appends the user's message and hands the turn to `other`.
    ///
    /// Empty input is ignored. Input outside the user's turn is rejected.
    pub fn submit_user_message(&mut self, content: &str) -> Outcome {
        let outcome = self.guard_user_action(Some(content));
        if outcome.is_accepted() {
            self.messages.push(Message::new(Role::User, content));
            self.current_turn = Role::Other;
        }
        outcome
    }

    /// Hands the turn to `other` without a user message; `other` starts thinking.
    pub fn pass_turn(&mut self) -> Outcome {
        let outcome = self.guard_user_action(None);
        if outcome.is_accepted() {
            self.current_turn = Role::Other;
            self.thinking = Some(Role::Other);
        }
        outcome
    }

    pub fn start_thinking(&mut self, role: Role) {
        self.thinking = Some(role);
    }

    /// Appends the next canned reply for `role` and clears the thinking indicator.
    ///
    /// Returns `None` for [`Role::User`], which has no canned replies.
    pub fn deliver_reply<R: Rng + ?Sized>(
        &mut self,
        role: Role,
        responses: &TurnResponses,
        policy: SelectionPolicy,
        rng: &mut R,
    ) -> Option<&Message> {
        let list = responses.for_role(role)?;
        let cursor = match role {
            Role::Other => &mut self.other_cursor,
            Role::Ai => &mut self.ai_cursor,
            Role::User => return None,
        };
        let content = list.select(policy, cursor, rng).to_string();

        self.thinking = None;
        self.messages.push(Message::new(role, content));
        self.messages.last()
    }

    /// The facilitator takes the floor: turn, takeover flag and thinking at once.
    pub fn begin_ai_takeover(&mut self) {
        self.current_turn = Role::Ai;
        self.ai_takeover = true;
        self.thinking = Some(Role::Ai);
    }

    /// Ends any takeover and gives the turn back to the user.
    pub fn return_to_user(&mut self) {
        self.ai_takeover = false;
        self.current_turn = Role::User;
    }

    pub fn snapshot(&self) -> ConversationSnapshot {
        ConversationSnapshot {
            session_id: self.id.clone(),
            messages: self.messages.clone(),
            current_turn: self.current_turn,
            ai_takeover: self.ai_takeover,
            thinking: self.thinking,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn responses() -> TurnResponses {
        TurnResponses::new(
            vec!["o1".into(), "o2".into()],
            vec!["a1".into(), "a2".into(), "a3".into()],
        )
        .unwrap()
    }

    #[test]
    fn test_new_session_starts_with_user() {
        let seed = vec![SeedMessage {
            sender: Role::Ai,
            content: "Welcome".to_string(),
            offset_secs: 180,
        }];
        let session = ConversationSession::new("s-1", &seed);

        assert_eq!(session.current_turn(), Role::User);
        assert!(!session.ai_takeover());
        assert_eq!(session.thinking(), None);
        assert_eq!(session.messages().len(), 1);
        assert!(session.messages()[0].timestamp < Utc::now());
        assert_eq!(session.cursor(Role::Other), Some(ResponseCursor::new()));
    }

    #[test]
    fn test_unrepresentable_offset_dates_seed_at_start() {
        let seed = vec![SeedMessage {
            sender: Role::Other,
            content: "Long ago".to_string(),
            offset_secs: u64::MAX,
        }];
        let started_at = Utc::now();
        let session = ConversationSession::starting_at("s-1", &seed, started_at);

        assert_eq!(session.messages()[0].timestamp, started_at);
    }

    #[test]
    fn test_restart_is_identical_to_fresh_session() {
        let seed = vec![SeedMessage {
            sender: Role::Other,
            content: "Hi".to_string(),
            offset_secs: 60,
        }];
        let fresh = ConversationSession::new("s-1", &seed);
        let mut used = fresh.clone();
        let _ = used.submit_user_message("hello");
        used.begin_ai_takeover();

        let restarted = used.restarted(&seed);
        assert_eq!(restarted.snapshot(), fresh.snapshot());
        assert_eq!(restarted.messages()[0].id, "seed-0");
    }

    #[test]
    fn test_blank_input_is_ignored() {
        let mut session = ConversationSession::new("s-1", &[]);
        assert_eq!(session.submit_user_message("   \n\t"), Outcome::Ignored);
        assert!(session.messages().is_empty());
        assert_eq!(session.current_turn(), Role::User);
    }

    #[test]
    fn test_submit_outside_turn_is_rejected() {
        let mut session = ConversationSession::new("s-1", &[]);
        assert_eq!(session.submit_user_message("hello"), Outcome::Accepted);
        assert_eq!(session.submit_user_message("again"), Outcome::Rejected);
        assert_eq!(session.messages().len(), 1);
        assert_eq!(session.current_turn(), Role::Other);
    }

    #[test]
    fn test_takeover_blocks_pass() {
        let mut session = ConversationSession::new("s-1", &[]);
        session.begin_ai_takeover();
        assert_eq!(session.pass_turn(), Outcome::Rejected);
        session.return_to_user();
        assert_eq!(session.pass_turn(), Outcome::Accepted);
        assert_eq!(session.thinking(), Some(Role::Other));
    }

    #[test]
    fn test_deliver_reply_advances_only_that_cursor() {
        let mut session = ConversationSession::new("s-1", &[]);
        let responses = responses();
        let mut rng = StdRng::seed_from_u64(1);

        session.start_thinking(Role::Other);
        let content = session
            .deliver_reply(Role::Other, &responses, SelectionPolicy::Cyclic, &mut rng)
            .map(|m| m.content.clone());

        assert_eq!(content.as_deref(), Some("o1"));
        assert_eq!(session.thinking(), None);
        assert_eq!(session.cursor(Role::Other).map(|c| c.value()), Some(1));
        assert_eq!(session.cursor(Role::Ai).map(|c| c.value()), Some(0));
        assert!(
            session
                .deliver_reply(Role::User, &responses, SelectionPolicy::Cyclic, &mut rng)
                .is_none()
        );
    }

    #[test]
    fn test_snapshot_reflects_takeover() {
        let mut session = ConversationSession::new("s-1", &[]);
        session.begin_ai_takeover();
        let snapshot = session.snapshot();
        assert_eq!(snapshot.current_turn, Role::Ai);
        assert!(snapshot.ai_takeover);
        assert_eq!(snapshot.thinking, Some(Role::Ai));
        assert!(!snapshot.accepts_user_input());
    }
}
