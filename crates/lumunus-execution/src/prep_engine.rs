//! Two-party prep dialogue choreography.
//!
//! Each user message schedules two steps: the facilitator starts thinking, then
//! replies. The reply commits the phase computed when the message was sent.

use crate::lock;
use crate::scheduler::{Scheduler, TaskHandle};
use crate::subscription::{Listeners, Subscription};
use crate::turn_engine::seeded_rng;
use lumunus_core::Result;
use lumunus_core::config::PrepConfig;
use lumunus_core::response::PrepResponses;
use lumunus_core::session::{Outcome, PrepSession, PrepSnapshot, ReplyKind};
use lumunus_core::synthesis::InvitationSynthesizer;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PrepStep {
    Thinking,
    Reply,
}

struct PrepState {
    session: PrepSession,
    generation: u64,
    in_flight: Option<TaskHandle>,
    rng: StdRng,
}

struct PrepShared {
    state: Mutex<PrepState>,
    scheduler: Arc<dyn Scheduler>,
    listeners: Listeners<PrepSnapshot>,
    responses: PrepResponses,
    synthesizer: Arc<dyn InvitationSynthesizer>,
    config: PrepConfig,
}

/// Drives a [`PrepSession`] through its phases.
pub struct PrepEngine {
    shared: Arc<PrepShared>,
}

impl PrepEngine {
    /// Creates an engine bound to a fresh session with a random id, using the
    /// configured fixed synthesis.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for empty response lists, invalid
    /// thresholds or an empty greeting.
    pub fn new(config: PrepConfig, scheduler: Arc<dyn Scheduler>) -> Result<Self> {
        Self::with_session_id(Uuid::new_v4().to_string(), config, scheduler)
    }

    pub fn with_session_id(
        session_id: impl Into<String>,
        config: PrepConfig,
        scheduler: Arc<dyn Scheduler>,
    ) -> Result<Self> {
        let synthesizer = Arc::new(config.synthesizer());
        Self::with_synthesizer(session_id, config, scheduler, synthesizer)
    }

    /// Creates an engine whose one-time synthesis is produced by `synthesizer`.
    pub fn with_synthesizer(
        session_id: impl Into<String>,
        config: PrepConfig,
        scheduler: Arc<dyn Scheduler>,
        synthesizer: Arc<dyn InvitationSynthesizer>,
    ) -> Result<Self> {
        config.validate()?;
        let responses = config.responses()?;
        let session = PrepSession::new(session_id, &config.greeting);
        info!(session_id = session.id(), "Prep session bound");

        let state = PrepState {
            session,
            generation: 0,
            in_flight: None,
            rng: seeded_rng(config.seed),
        };
        Ok(Self {
            shared: Arc::new(PrepShared {
                state: Mutex::new(state),
                scheduler,
                listeners: Listeners::new(),
                responses,
                synthesizer,
                config,
            }),
        })
    }

    pub fn session_id(&self) -> String {
        lock(&self.shared.state).session.id().to_string()
    }

    pub fn snapshot(&self) -> PrepSnapshot {
        lock(&self.shared.state).session.snapshot()
    }

    pub fn is_busy(&self) -> bool {
        lock(&self.shared.state).in_flight.is_some()
    }

    /// Registers `listener` for every snapshot published from now on.
    ///
    /// Snapshots arrive in mutation order. Listeners run after the engine lock
    /// is released and may call back into the engine.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&PrepSnapshot) + Send + Sync + 'static,
    {
        self.shared.listeners.subscribe(listener)
    }

    /// Appends a user message and schedules the facilitator's reply.
    ///
    /// Blank input is ignored. A message sent while a reply is still pending is
    /// rejected.
    pub fn send_message(&self, content: &str) -> Outcome {
        let outcome = self.shared.submit(content);
        self.shared.listeners.flush();
        outcome
    }

    /// Hides the invitation preview so the user can keep refining.
    pub fn revise_invitation(&self) -> Outcome {
        let outcome = {
            let mut state = lock(&self.shared.state);
            let outcome = state.session.revise_invitation();
            if outcome.is_accepted() {
                debug!(session_id = state.session.id(), "Invitation under revision");
                self.shared.publish(&state);
            }
            outcome
        };
        self.shared.listeners.flush();
        outcome
    }

    pub fn accept_invitation(&self) -> Outcome {
        let outcome = {
            let mut state = lock(&self.shared.state);
            let outcome = state.session.accept_invitation();
            if outcome.is_accepted() {
                info!(session_id = state.session.id(), "Invitation accepted");
                self.shared.publish(&state);
            }
            outcome
        };
        self.shared.listeners.flush();
        outcome
    }

    /// Restores the greeting-only state and cancels the pending reply.
    pub fn reset_session(&self) {
        {
            let mut state = lock(&self.shared.state);
            let session = state.session.restarted(&self.shared.config.greeting);
            self.shared.replace_session(&mut state, session);
            info!(
                session_id = state.session.id(),
                generation = state.generation,
                "Prep session reset"
            );
        }
        self.shared.listeners.flush();
    }

    /// Binds the engine to `session_id`, resetting only if the id changed.
    pub fn bind_session(&self, session_id: impl Into<String>) -> bool {
        let session_id = session_id.into();
        {
            let mut state = lock(&self.shared.state);
            if state.session.id() == session_id {
                return false;
            }

            let session = PrepSession::new(session_id, &self.shared.config.greeting);
            self.shared.replace_session(&mut state, session);
            info!(
                session_id = state.session.id(),
                generation = state.generation,
                "Prep session bound"
            );
        }
        self.shared.listeners.flush();
        true
    }
}

impl Drop for PrepEngine {
    fn drop(&mut self) {
        let mut state = lock(&self.shared.state);
        if let Some(handle) = state.in_flight.take() {
            self.shared.scheduler.cancel(handle);
        }
    }
}

impl PrepShared {
    fn submit(self: &Arc<Self>, content: &str) -> Outcome {
        let mut state = lock(&self.state);
        let outcome = state
            .session
            .submit_user_message(content, &self.config.thresholds);
        match outcome {
            Outcome::Accepted => {
                debug!(
                    session_id = state.session.id(),
                    generation = state.generation,
                    count = state.session.user_message_count(),
                    "Prep message accepted"
                );
                self.publish(&state);
                let delay = self.config.delays.thinking();
                self.schedule(&mut state, delay, PrepStep::Thinking);
            }
            Outcome::Ignored => {
                debug!(session_id = state.session.id(), "Ignored blank message");
            }
            Outcome::Rejected => {
                debug!(
                    session_id = state.session.id(),
                    "Rejected prep message while a reply is pending"
                );
            }
        }
        outcome
    }

    fn publish(&self, state: &PrepState) {
        self.listeners.enqueue(state.session.snapshot());
    }

    fn schedule(self: &Arc<Self>, state: &mut PrepState, delay: Duration, step: PrepStep) {
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

    fn replace_session(&self, state: &mut PrepState, session: PrepSession) {
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

    fn run_step(self: &Arc<Self>, generation: u64, step: PrepStep) {
        self.advance(generation, step);
        self.listeners.flush();
    }

    fn advance(self: &Arc<Self>, generation: u64, step: PrepStep) {
        let mut state = lock(&self.state);
        if state.generation != generation {
            debug!(
                session_id = state.session.id(),
                generation,
                current_generation = state.generation,
                ?step,
                "Discarded stale prep step"
            );
            return;
        }
        state.in_flight = None;
        debug!(session_id = state.session.id(), generation, ?step, "Prep step");

        match step {
            PrepStep::Thinking => {
                state.session.start_thinking();
                self.publish(&state);
                self.schedule(&mut state, self.config.delays.reply(), PrepStep::Reply);
            }
            PrepStep::Reply => {
                let previous = state.session.phase();
                let PrepState { session, rng, .. } = &mut *state;
                let kind = session.deliver_reply(
                    &self.responses,
                    self.config.policy,
                    rng,
                    self.synthesizer.as_ref(),
                );

                let phase = state.session.phase();
                if phase != previous {
                    info!(
                        session_id = state.session.id(),
                        from = %previous,
                        to = %phase,
                        "Prep phase advanced"
                    );
                }
                if kind == Some(ReplyKind::Synthesis) {
                    info!(session_id = state.session.id(), "Invitation synthesized");
                }
                self.publish(&state);
            }
        }
    }
}
