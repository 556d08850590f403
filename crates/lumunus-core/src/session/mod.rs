//! Session domain module.
//!
//! This module contains the two session aggregates and the types they are
//! built from.
//!
//! # Module Structure
//!
//! - `message`: Conversation message types (`Role`, `Message`, `PrepMessage`)
//! - `phase`: Prep dialogue phases (`PrepPhase`, `PhaseThresholds`)
//! - `outcome`: Result of a caller request (`Outcome`)
//! - `conversation`: Three-party session (`ConversationSession`)
//! - `prep`: Two-party prep session (`PrepSession`)
//!
//! Sessions hold state and pure transitions only. Timing lives in
//! `lumunus-execution`.

mod conversation;
mod message;
mod outcome;
mod phase;
mod prep;

// Re-export public API
pub use conversation::{ConversationSession, ConversationSnapshot};
pub use message::{Message, PrepMessage, PrepSender, Role};
pub use outcome::Outcome;
pub use phase::{PhaseThresholds, PrepPhase, StepStatus};
pub use prep::{InvitationState, PrepSession, PrepSnapshot, ReplyKind};
