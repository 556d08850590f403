//! Conversation message types.
//!
//! Messages are immutable once created. They are produced by the engines in
//! response to user input or a scheduled simulated reply.

use super::phase::PrepPhase;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A participant of the three-party conversation.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Role {
    /// The local human participant.
    User,
    /// The simulated conversation partner.
    Other,
    /// The facilitator.
    Ai,
}

/// One utterance in the three-party conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Opaque unique identifier (UUID v4).
    pub id: String,
    pub sender: Role,
    /// Non-empty text.
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(sender: Role, content: impl Into<String>) -> Self {
        Self::at(sender, content, Utc::now())
    }

    pub fn at(sender: Role, content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            sender,
            content: content.into(),
            timestamp,
        }
    }
}

/// Author of a prep dialogue message. The prep dialogue has no `other` party.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PrepSender {
    User,
    Ai,
}

impl From<PrepSender> for Role {
    fn from(sender: PrepSender) -> Self {
        match sender {
            PrepSender::User => Role::User,
            PrepSender::Ai => Role::Ai,
        }
    }
}

/// One utterance in the prep dialogue, tagged with the phase it was produced in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrepMessage {
    pub id: String,
    pub sender: PrepSender,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub phase: PrepPhase,
}

impl PrepMessage {
    pub fn new(sender: PrepSender, content: impl Into<String>, phase: PrepPhase) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            sender,
            content: content.into(),
            timestamp: Utc::now(),
            phase,
        }
    }
}
