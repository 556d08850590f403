//! Prep dialogue phases.

use serde::{Deserialize, Serialize};

/// Coarse stage of the prep dialogue.
///
/// Ordered `Understanding < Framing < Ready`. A session's phase never moves
/// backwards; only replacing the session returns it to `Understanding`.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PrepPhase {
    #[default]
    Understanding,
    Framing,
    Ready,
}

/// Rendering state of one step of the phase progress indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Completed,
    Active,
    Upcoming,
}

impl PrepPhase {
    /// Human-readable label for progress displays.
    pub fn label(&self) -> &'static str {
        match self {
            PrepPhase::Understanding => "Understanding",
            PrepPhase::Framing => "Framing",
            PrepPhase::Ready => "Ready to Invite",
        }
    }

    /// Zero-based position in the phase order.
    pub fn ordinal(&self) -> usize {
        match self {
            PrepPhase::Understanding => 0,
            PrepPhase::Framing => 1,
            PrepPhase::Ready => 2,
        }
    }

    /// How `step` should be drawn while the session is in `self`.
    pub fn step_status(&self, step: PrepPhase) -> StepStatus {
        match step.cmp(self) {
            std::cmp::Ordering::Less => StepStatus::Completed,
            std::cmp::Ordering::Equal => StepStatus::Active,
            std::cmp::Ordering::Greater => StepStatus::Upcoming,
        }
    }

    /// Phase implied by a cumulative count of user-authored messages.
    pub fn for_user_message_count(count: usize, thresholds: &PhaseThresholds) -> Self {
        if count >= thresholds.ready_at {
            PrepPhase::Ready
        } else if count >= thresholds.framing_at {
            PrepPhase::Framing
        } else {
            PrepPhase::Understanding
        }
    }

    /// The phase to move to after the `count`th user message.
    ///
    /// Never lower than `self`.
    pub fn advance_for(self, count: usize, thresholds: &PhaseThresholds) -> Self {
        self.max(Self::for_user_message_count(count, thresholds))
    }
}

/// User-message counts at which the prep dialogue changes phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseThresholds {
    pub framing_at: usize,
    pub ready_at: usize,
}

impl Default for PhaseThresholds {
    fn default() -> Self {
        Self {
            framing_at: 3,
            ready_at: 5,
        }
    }
}
