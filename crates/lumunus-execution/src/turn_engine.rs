//! Three-party turn choreography.
//!
//! A user message starts a fixed sequence of delayed steps:
//!
//! 1. the user message is appended and the turn moves to `other`
//! 2. `other` starts thinking
//! 3. `other` replies, then the facilitator immediately takes over
//! 4. the facilitator replies
//! 5. the takeover ends and the turn returns to the user
//!
//! A pass skips the user message and the facilitator: `other` thinks and
//! replies, then the turn returns to the user.

use crate::lock;
use crate::scheduler::{Scheduler, TaskHandle};
use crate::subscription::{Listeners, Subscription};
use lumunus_core::Result;
use lumunus_core::config::TurnConfig;
use lumunus_core::participant::ParticipantTable;
use lumunus_core::response::TurnResponses;
use lumunus_core::session::{ConversationSession, ConversationSnapshot, Outcome, Role};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TurnStep {
    OtherThinking,
    OtherReply { passed: bool },
    AiReply,
    Release,
}

struct TurnState {
    session: ConversationSession,
    generation: u64,
    in_flight: Option<TaskHandle>,
    rng: StdRng,
}

struct TurnShared {
    state: Mutex<TurnState>,
    scheduler: Arc<dyn Scheduler>,
    listeners: Listeners<ConversationSnapshot>,
    responses: TurnResponses,
    config: TurnConfig,
}

/// Drives a [`ConversationSession`] through the turn choreography.
pub struct TurnEngine {
    shared: Arc<TurnShared>,
}

pub(crate) fn seeded_rng(seed: Option<u64>) -> StdRng {
    seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64)
}

impl TurnEngine {
    /// Creates an engine bound to a fresh session with a random id.
    ///
    /// # Errors
    ///
    /// Returns [`lumunus_core::LumunusError::EmptyResponseList`] if either
    /// response list is empty, and a config error if a response entry or seed
    /// message is blank or a seed offset is out of range.
    pub fn new(config: TurnConfig, scheduler: Arc<dyn Scheduler>) -> Result<Self> {
        Self::with_session_id(Uuid::new_v4().to_string(), config, scheduler)
    }

    pub fn with_session_id(
        session_id: impl Into<String>,
        config: TurnConfig,
        scheduler: Arc<dyn Scheduler>,
    ) -> Result<Self> {
        let responses = config.responses()?;
        config.validate()?;
        let session = ConversationSession::new(session_id, &config.seed_messages);
        info!(session_id = session.id(), "Turn session bound");

        let state = TurnState {
            session,
            generation: 0,
            in_flight: None,
            rng: seeded_rng(config.seed),
        };
        Ok(Self {
            shared: Arc::new(TurnShared {
                state: Mutex::new(state),
                scheduler,
                listeners: Listeners::new(),
                responses,
                config,
            }),
        })
    }

    pub fn session_id(&self) -> String {
        lock(&self.shared.state).session.id().to_string()
    }

    pub fn snapshot(&self) -> ConversationSnapshot {
        lock(&self.shared.state).session.snapshot()
    }

    pub fn participants(&self) -> &ParticipantTable {
        &self.shared.config.participants
    }

    /// Whether a choreography step is scheduled.
    pub fn is_busy(&self) -> bool {
        lock(&self.shared.state).in_flight.is_some()
    }

    /// Registers `listener` for every snapshot published from now on.
    ///
    /// Snapshots arrive in mutation order. Listeners run after the engine lock
    /// is released and may call back into the engine; a snapshot produced by
    /// such a call is delivered once the current listener returns.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&ConversationSnapshot) + Send + Sync + 'static,
    {
        self.shared.listeners.subscribe(listener)
    }

    /// Appends a user message and starts the choreography.
    ///
    /// Blank input is ignored. Input outside the user's turn, including during
    /// an AI takeover, is rejected.
    pub fn send_message(&self, content: &str) -> Outcome {
        let outcome = self.shared.submit(content);
        self.shared.listeners.flush();
        outcome
    }

    /// Gives the floor to `other` without a user message.
    pub fn pass_turn(&self) -> Outcome {
        let outcome = self.shared.pass();
        self.shared.listeners.flush();
        outcome
    }

    /// Restores the initial state of the bound session and cancels pending steps.
    pub fn reset_session(&self) {
        {
            let mut state = lock(&self.shared.state);
            let session = state.session.restarted(&self.shared.config.seed_messages);
            self.shared.replace_session(&mut state, session);
            info!(
                session_id = state.session.id(),
                generation = state.generation,
                "Turn session reset"
            );
        }
        self.shared.listeners.flush();
    }

    /// Binds the engine to `session_id`.
    ///
    /// Returns `false`, leaving state untouched, when that id is already bound.
    pub fn bind_session(&self, session_id: impl Into<String>) -> bool {
        let session_id = session_id.into();
        {
            let mut state = lock(&self.shared.state);
            if state.session.id() == session_id {
                return false;
            }

            let session = ConversationSession::new(session_id, &self.shared.config.seed_messages);
            self.shared.replace_session(&mut state, session);
            info!(
                session_id = state.session.id(),
                generation = state.generation,
                "Turn session bound"
            );
        }
        self.shared.listeners.flush();
        true
    }
}

impl Drop for TurnEngine {
    fn drop(&mut self) {
        let mut state = lock(&self.shared.state);
        if let Some(handle) = state.in_flight.take() {
            self.shared.scheduler.cancel(handle);
        }
    }
}

impl TurnShared {
    fn submit(self: &Arc<Self>, content: &str) -> Outcome {
        let mut state = lock(&self.state);
        let outcome = state.session.submit_user_message(content);
        match outcome {
            Outcome::Accepted => {
                debug!(
                    session_id = state.session.id(),
                    generation = state.generation,
                    "User message accepted"
                );
                self.publish(&state);
                let delay = self.config.delays.other_thinking();
                self.schedule(&mut state, delay, TurnStep::OtherThinking);
            }
            Outcome::Ignored => {
                debug!(session_id = state.session.id(), "Ignored blank message");
            }
            Outcome::Rejected => {
                debug!(
                    session_id = state.session.id(),
                    role = %state.session.current_turn(),
                    ai_takeover = state.session.ai_takeover(),
                    "Rejected message outside the user's turn"
                );
            }
        }
        outcome
    }

    fn pass(self: &Arc<Self>) -> Outcome {
        let mut state = lock(&self.state);
        let outcome = state.session.pass_turn();
        if outcome.is_accepted() {
            debug!(
                session_id = state.session.id(),
                generation = state.generation,
                "User passed the turn"
            );
            self.publish(&state);
            let delay = self.config.delays.pass_reply();
            self.schedule(&mut state, delay, TurnStep::OtherReply { passed: true });
        } else {
            debug!(
                session_id = state.session.id(),
                role = %state.session.current_turn(),
                "Rejected pass outside the user's turn"
            );
        }
        outcome
    }

    fn publish(&self, state: &TurnState) {
        self.listeners.enqueue(state.session.snapshot());
    }

    fn schedule(self: &Arc<Self>, state: &mut TurnState, delay: Duration, step: TurnStep) {
        let generation = state.generation;
        let shared = Arc::downgrade(self);
        let handle = self.scheduler.after(
            delay,
            Box::new(move || {
                if let Some(shared) = shared.upgrade() {
                    shared.run_step(generation, step);
                }
            }),
        );
        state.in_flight = Some(handle);
    }

    fn replace_session(&self, state: &mut TurnState, session: ConversationSession) {
        if let Some(handle) = state.in_flight.take() {
            self.scheduler.cancel(handle);
        }
        state.generation += 1;
        state.session = session;
        if let Some(seed) = self.config.seed {
            state.rng = StdRng::seed_from_u64(seed);
        }
        self.publish(state);
    }

    fn deliver(&self, state: &mut TurnState, role: Role) {
        let TurnState { session, rng, .. } = state;
        session.deliver_reply(role, &self.responses, self.config.policy, rng);
    }

    fn run_step(self: &Arc<Self>, generation: u64, step: TurnStep) {
        self.advance(generation, step);
        self.listeners.flush();
    }

    fn advance(self: &Arc<Self>, generation: u64, step: TurnStep) {
        let mut state = lock(&self.state);
        if state.generation != generation {
            debug!(
                session_id = state.session.id(),
                generation,
                current_generation = state.generation,
                ?step,
                "Discarded stale turn step"
            );
            return;
        }
        state.in_flight = None;
        debug!(session_id = state.session.id(), generation, ?step, "Turn step");

        let delays = self.config.delays;
        match step {
            TurnStep::OtherThinking => {
                state.session.start_thinking(Role::Other);
                self.publish(&state);
                self.schedule(
                    &mut state,
                    delays.other_reply(),
                    TurnStep::OtherReply { passed: false },
                );
            }
            TurnStep::OtherReply { passed: true } => {
                self.deliver(&mut state, Role::Other);
                self.publish(&state);
                self.schedule(&mut state, delays.pass_release(), TurnStep::Release);
            }
            TurnStep::OtherReply { passed: false } => {
                self.deliver(&mut state, Role::Other);
                self.publish(&state);
                state.session.begin_ai_takeover();
                self.publish(&state);
                self.schedule(&mut state, delays.ai_reply(), TurnStep::AiReply);
            }
            TurnStep::AiReply => {
                self.deliver(&mut state, Role::Ai);
                self.publish(&state);
                self.schedule(&mut state, delays.ai_release(), TurnStep::Release);
            }
            TurnStep::Release => {
                state.session.return_to_user();
                self.publish(&state);
            }
        }
    }
}
